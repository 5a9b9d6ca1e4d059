// src/control/core.rs

//! Pure tick-driven control loop.
//!
//! [`ControlLoop`] owns the job, the scheduling engine, both agents and the
//! two oracles. Each call to [`ControlLoop::step`] processes one time unit
//! and returns a [`TickReport`] describing what happened. There are no
//! channels, no Tokio types and no IO here; the async shell lives in
//! [`super::runtime`].

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::anyhow;
use tracing::{debug, info, warn};

use crate::errors::{CoplanError, Result};
use crate::job::{Finish, Job, RunArtifact, ScheduleExport};
use crate::planner::{Plan, PlannerOptions, SchedulingEngine};
use crate::sim::{AcceptanceOracle, DurationOracle, ExecutionStatus};
use crate::types::{AgentKind, Question, TaskId, TaskStatus};

use super::agent::Agent;

/// Something that happened during one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickEvent {
    Started {
        agent: AgentKind,
        task: TaskId,
    },
    Completed {
        agent: AgentKind,
        task: TaskId,
        finish: i64,
    },
    /// The agent holds its object until the coworker finishes a prerequisite.
    Waiting {
        agent: AgentKind,
        task: TaskId,
        waited: i64,
    },
    Declined {
        agent: AgentKind,
        task: TaskId,
    },
    Reassigned {
        task: TaskId,
        from: AgentKind,
        to: AgentKind,
    },
    Replanned {
        makespan: i64,
    },
}

/// Events of the tick that ran at `time`.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub time: i64,
    pub events: Vec<TickEvent>,
    /// Every task of the job is completed.
    pub finished: bool,
}

/// Reactive execution of one job by the robot and the human.
pub struct ControlLoop<D, A> {
    job: Job,
    engine: SchedulingEngine,
    agents: Vec<Agent>,
    durations: D,
    acceptance: A,
    time: i64,
    last_offered: Option<Vec<TaskId>>,
    initial: ScheduleExport,
    tick_limit: i64,
}

impl<D, A> std::fmt::Debug for ControlLoop<D, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlLoop")
            .field("time", &self.time)
            .field("progress", &self.job.progress())
            .field("agents", &self.agents)
            .finish_non_exhaustive()
    }
}

impl<D, A> ControlLoop<D, A>
where
    D: DurationOracle,
    A: AcceptanceOracle,
{
    /// Solve the initial plan and hand the queues to the agents.
    pub fn new(mut job: Job, durations: D, acceptance: A, options: PlannerOptions) -> Result<Self> {
        let mut engine = SchedulingEngine::new(&job, &durations, &acceptance, options)?;
        let plan = engine.solve(&mut job)?;
        engine.fix_assignments(&job);

        let agents = AgentKind::ALL
            .iter()
            .map(|kind| {
                let mut agent = Agent::new(*kind);
                agent.refresh_tasks(plan.queue(*kind));
                agent
            })
            .collect();

        let initial = ScheduleExport::from_job(&job);
        let tick_limit = engine.horizon().saturating_mul(10).saturating_add(100);
        info!(
            tasks = job.len(),
            makespan = plan.makespan,
            objective = plan.objective,
            "initial schedule ready"
        );

        Ok(Self {
            job,
            engine,
            agents,
            durations,
            acceptance,
            time: 0,
            last_offered: None,
            initial,
            tick_limit,
        })
    }

    pub fn time(&self) -> i64 {
        self.time
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    pub fn engine(&self) -> &SchedulingEngine {
        &self.engine
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agent(&self, kind: AgentKind) -> &Agent {
        &self.agents[self.index_of(kind)]
    }

    /// Schedule export taken right after the initial solve.
    pub fn initial_export(&self) -> &ScheduleExport {
        &self.initial
    }

    pub fn is_finished(&self) -> bool {
        self.job.is_complete()
    }

    /// Process one time unit.
    pub fn step(&mut self) -> Result<TickReport> {
        let now = self.time;
        let mut events = Vec::new();

        if self.job.is_complete() {
            return Ok(TickReport {
                time: now,
                events,
                finished: true,
            });
        }

        self.poll_busy_agents(&mut events)?;

        for idx in 0..self.agents.len() {
            if !self.agents[idx].is_idle() || self.job.is_complete() {
                continue;
            }
            let kind = self.agents[idx].kind();
            let selection = self.agents[idx].find_next_task(&mut self.job, &mut self.acceptance)?;

            for task in selection.declined {
                events.push(TickEvent::Declined { agent: kind, task });
                self.reassign(task, kind.coworker(), &mut events)?;
            }

            match selection.task {
                Some(task) => self.begin(idx, task, &mut events)?,
                None => self.steal_from_coworker(idx, &mut events)?,
            }
        }

        self.time += 1;
        self.shift_schedule();

        Ok(TickReport {
            time: now,
            events,
            finished: self.job.is_complete(),
        })
    }

    /// Step until the job is complete.
    pub fn run(&mut self) -> Result<RunArtifact> {
        let never = AtomicBool::new(false);
        self.run_until(&never)
    }

    /// Step until the job is complete or `stop` is raised between ticks.
    pub fn run_until(&mut self, stop: &AtomicBool) -> Result<RunArtifact> {
        while !self.job.is_complete() {
            if stop.load(Ordering::SeqCst) {
                warn!(time = self.time, progress = self.job.progress(), "run interrupted");
                return Err(CoplanError::Interrupted);
            }
            if self.time > self.tick_limit {
                return Err(CoplanError::Other(anyhow!(
                    "job not finished after {} ticks (progress {}%)",
                    self.time,
                    self.job.progress()
                )));
            }
            let report = self.step()?;
            if !report.events.is_empty() {
                debug!(time = report.time, events = ?report.events, "tick");
            }
        }

        info!(
            time = self.time,
            makespan = self.job.current_makespan(),
            "job completed"
        );
        Ok(RunArtifact(
            self.initial.clone(),
            ScheduleExport::from_job(&self.job),
        ))
    }

    fn index_of(&self, kind: AgentKind) -> usize {
        self.agents
            .iter()
            .position(|agent| agent.kind() == kind)
            .unwrap_or(0)
    }

    fn poll_busy_agents(&mut self, events: &mut Vec<TickEvent>) -> Result<()> {
        for idx in 0..self.agents.len() {
            let kind = self.agents[idx].kind();
            let Some(task) = self.agents[idx].current() else {
                continue;
            };

            match self.durations.query(&self.job, kind, self.time) {
                ExecutionStatus::Completed(timing) => {
                    let finish = timing.total;
                    self.agents[idx].complete_task(&mut self.job, timing)?;
                    info!(
                        time = self.time,
                        agent = %kind,
                        task,
                        finish,
                        progress = self.job.progress(),
                        "task completed"
                    );
                    events.push(TickEvent::Completed {
                        agent: kind,
                        task,
                        finish,
                    });
                }
                ExecutionStatus::Waiting(waited) => {
                    self.agents[idx].record_waiting(waited);
                    events.push(TickEvent::Waiting {
                        agent: kind,
                        task,
                        waited,
                    });
                }
                ExecutionStatus::Idle => {
                    warn!(agent = %kind, task, "busy agent has no running task");
                }
                ExecutionStatus::Preparation
                | ExecutionStatus::Execution
                | ExecutionStatus::Completion => {}
            }
        }
        Ok(())
    }

    fn begin(&mut self, idx: usize, task: TaskId, events: &mut Vec<TickEvent>) -> Result<()> {
        let kind = self.agents[idx].kind();
        self.agents[idx].begin_task(&mut self.job, task, self.time)?;
        self.durations.begin(&self.job, task, kind, self.time);
        self.job.refresh_availability()?;
        events.push(TickEvent::Started { agent: kind, task });
        Ok(())
    }

    /// Move `task` to `to`, then re-plan and hand out fresh queues.
    fn reassign(&mut self, task: TaskId, to: AgentKind, events: &mut Vec<TickEvent>) -> Result<()> {
        let from = self.job.task(task).assigned.unwrap_or(to.coworker());
        self.job.task_mut(task).assigned = Some(to);
        self.engine.set_new_agent(task, to);
        self.engine.refresh(&self.job, self.time);
        let plan = self.engine.solve(&mut self.job)?;
        self.push_queues(&plan);

        info!(time = self.time, task, %from, %to, makespan = plan.makespan, "task reassigned");
        events.push(TickEvent::Reassigned { task, from, to });
        events.push(TickEvent::Replanned {
            makespan: plan.makespan,
        });
        Ok(())
    }

    fn push_queues(&mut self, plan: &Plan) {
        for agent in &mut self.agents {
            agent.refresh_tasks(plan.queue(agent.kind()));
        }
    }

    /// Offer the idle agent the coworker's available universal tasks when
    /// taking one over shortens the projected makespan.
    fn steal_from_coworker(&mut self, idx: usize, events: &mut Vec<TickEvent>) -> Result<()> {
        let kind = self.agents[idx].kind();
        let coworker = self.index_of(kind.coworker());
        let offered = self.agents[coworker].available_universal_tasks(&self.job);

        if offered.is_empty() || self.last_offered.as_deref() == Some(offered.as_slice()) {
            return Ok(());
        }
        self.last_offered = Some(offered.clone());

        let candidates: Vec<TaskId> = offered
            .into_iter()
            .filter(|task| !self.agents[idx].rejected().contains(task))
            .collect();
        if candidates.is_empty() {
            return Ok(());
        }

        self.engine.refresh(&self.job, self.time);
        let ranked = self.engine.evaluate_reassignments(&candidates, kind);
        let current = self.job.current_makespan();
        let Some(best) = ranked.first() else {
            return Ok(());
        };
        if best.makespan >= current {
            debug!(
                agent = %kind,
                best = best.makespan,
                current,
                "no reassignment improves the makespan"
            );
            return Ok(());
        }

        for candidate in ranked {
            let accepted = self
                .acceptance
                .ask(Question::ChangeAgent, self.job.task(candidate.task), kind);
            if accepted {
                self.reassign(candidate.task, kind, events)?;
                self.begin(idx, candidate.task, events)?;
                return Ok(());
            }
            self.agents[idx].record_rejection(candidate.task);
            events.push(TickEvent::Declined {
                agent: kind,
                task: candidate.task,
            });
        }
        Ok(())
    }

    /// Absorb overruns observed at the new time: an in-progress task whose
    /// planned finish has passed ends now, and the pending tasks after it in
    /// the same queue slide by one unit.
    fn shift_schedule(&mut self) {
        let now = self.time;
        for agent in &self.agents {
            let mut shift = false;
            for &id in agent.queue() {
                let task = self.job.task_mut(id);
                match (task.status(), task.finish) {
                    (TaskStatus::InProgress, Some(Finish::Planned(end))) if end < now => {
                        task.finish = Some(Finish::Planned(now));
                        shift = true;
                    }
                    (status, Some(Finish::Planned(end))) if shift && status.is_pending() => {
                        task.start = task.start.map(|start| start + 1);
                        task.finish = Some(Finish::Planned(end + 1));
                    }
                    _ => {}
                }
            }
        }
    }
}
