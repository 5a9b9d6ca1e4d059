// src/planner/engine.rs

use std::collections::BTreeMap;

use tracing::{debug, error, info, trace, warn};

use crate::errors::{CoplanError, Result};
use crate::job::{Finish, Job, Task};
use crate::planner::backend;
use crate::planner::model::{
    ConstraintId, LinearConstraint, Literal, Scenario, ScheduleModel, VarId,
};
use crate::planner::registry::{BorderSlot, ConstraintRegistry};
use crate::planner::{Plan, PlannerOptions, Reassignment};
use crate::sim::{AcceptanceOracle, DurationOracle, PhaseDurations};
use crate::types::{AgentKind, TaskId, TaskStatus};

/// Model variables of one task.
#[derive(Debug, Clone, Copy)]
struct TaskVars {
    start: VarId,
    end: VarId,
    duration: VarId,
    /// True when the human executes the task.
    human: Literal,
}

impl TaskVars {
    fn assigned_to(&self, agent: AgentKind) -> Literal {
        match agent {
            AgentKind::Human => self.human,
            AgentKind::Robot => !self.human,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Estimates {
    human: PhaseDurations,
    robot: PhaseDurations,
}

impl Estimates {
    fn of(&self, agent: AgentKind) -> PhaseDurations {
        match agent {
            AgentKind::Human => self.human,
            AgentKind::Robot => self.robot,
        }
    }
}

/// Constraint model of a job plus the bookkeeping to re-solve it as the job
/// executes.
///
/// Variables are created once. Realized tasks get their bounds collapsed
/// and their duration-selection and border constraints removed; pending
/// tasks get their start pushed to the current time. Every solve hands the
/// active model to Pumpkin.
#[derive(Debug)]
pub struct SchedulingEngine {
    model: ScheduleModel,
    vars: Vec<TaskVars>,
    estimates: Vec<Estimates>,
    worst_case: Vec<i64>,
    /// Largest handoff margin a task imposes on its dependents.
    handoff_slack: Vec<i64>,
    duration_selection: Vec<Vec<ConstraintId>>,
    fix_agent: Vec<Option<ConstraintId>>,
    borders: ConstraintRegistry,
    makespan: VarId,
    finalized: Vec<bool>,
    horizon: i64,
    options: PlannerOptions,
}

impl SchedulingEngine {
    /// Build the full model for `job`.
    pub fn new<D, A>(job: &Job, durations: &D, acceptance: &A, options: PlannerOptions) -> Result<Self>
    where
        D: DurationOracle + ?Sized,
        A: AcceptanceOracle + ?Sized,
    {
        let tasks = job.tasks();
        let n = tasks.len();

        let mut estimates = Vec::with_capacity(n);
        let mut worst_case = Vec::with_capacity(n);
        for task in tasks {
            let est = Estimates {
                human: durations.estimate(task, AgentKind::Human),
                robot: durations.estimate(task, AgentKind::Robot),
            };
            let eligible: Vec<AgentKind> = AgentKind::ALL
                .into_iter()
                .filter(|agent| task.requirement.allows(*agent))
                .collect();
            for agent in &eligible {
                if est.of(*agent).total() <= 0 {
                    return Err(CoplanError::InvalidJob(format!(
                        "task {}: {} has no duration for object '{}' at '{}'",
                        task.id, agent, task.action.object, task.action.place
                    )));
                }
            }
            worst_case.push(eligible.iter().map(|a| est.of(*a).total()).max().unwrap_or(0));
            estimates.push(est);
        }
        let horizon: i64 = worst_case.iter().sum();

        let mut model = ScheduleModel::new();
        let mut vars = Vec::with_capacity(n);
        let mut duration_selection = Vec::with_capacity(n);
        let mut fix_agent = vec![None; n];
        let mut costs = Vec::new();

        for (task, est) in tasks.iter().zip(&estimates) {
            let i = task.id;
            let start = model.new_int_var(0, horizon, format!("start_{i}"));
            let end = model.new_int_var(0, horizon, format!("end_{i}"));
            let (h, r) = (est.human.total(), est.robot.total());
            let duration = model.new_int_var(h.min(r), h.max(r), format!("duration_{i}"));
            let human = model.new_bool_var(format!("task_{i}_human"));

            match task.requirement.fixed_agent() {
                Some(agent) => {
                    let literal = if agent.indicator() { human } else { !human };
                    fix_agent[i] = Some(model.pin(literal));
                }
                None => {
                    let penalty = rejection_penalty(acceptance.reject_probability(task), &options);
                    let cost = model.new_int_var(0, penalty, format!("rejection_{i}"));
                    model.add(LinearConstraint::eq(vec![(1, cost)], penalty).only_enforce_if(&[human]));
                    model.add(LinearConstraint::eq(vec![(1, cost)], 0).only_enforce_if(&[!human]));
                    costs.push(cost);
                }
            }

            duration_selection.push(vec![
                model.add(
                    LinearConstraint::eq(vec![(1, duration)], est.human.total())
                        .only_enforce_if(&[human]),
                ),
                model.add(
                    LinearConstraint::eq(vec![(1, duration)], est.robot.total())
                        .only_enforce_if(&[!human]),
                ),
            ]);
            model.add(LinearConstraint::eq(
                vec![(1, end), (-1, start), (-1, duration)],
                0,
            ));
            model.add(LinearConstraint::ge(vec![(1, end), (-1, start)], 1));

            vars.push(TaskVars {
                start,
                end,
                duration,
                human,
            });
        }

        // One same-agent literal and one ordering literal per unordered pair.
        let mut same_agent: BTreeMap<(TaskId, TaskId), Literal> = BTreeMap::new();
        let mut order: BTreeMap<(TaskId, TaskId), Literal> = BTreeMap::new();
        for i in 0..n {
            for j in (i + 1)..n {
                let s = model.new_bool_var(format!("same_agent_{i}_{j}"));
                let (hi, hj) = (vars[i].human.var(), vars[j].human.var());
                model.add(LinearConstraint::eq(vec![(1, hi), (-1, hj)], 0).only_enforce_if(&[s]));
                model.add(LinearConstraint::eq(vec![(1, hi), (1, hj)], 1).only_enforce_if(&[!s]));
                same_agent.insert((i, j), s);

                let after = model.new_bool_var(format!("{j}_after_{i}"));
                order.insert((i, j), after);
            }
        }

        let mut borders = ConstraintRegistry::new(n);
        let mut handoff_slack = vec![0; n];
        for i in 0..n {
            let dependents = job.graph().dependents_of(i);
            for j in 0..n {
                if i == j {
                    continue;
                }
                let key = (i.min(j), i.max(j));
                let s = same_agent[&key];
                let (vi, vj) = (vars[i], vars[j]);

                if dependents.binary_search(&j).is_ok() {
                    let (ei, ej) = (estimates[i], estimates[j]);
                    let from_human = (ei.human.preparation + ei.human.completion
                        - ej.robot.preparation)
                        .max(0);
                    let from_robot = (ei.robot.preparation + ei.robot.completion
                        - ej.human.preparation)
                        .max(0);
                    handoff_slack[i] = handoff_slack[i].max(from_human).max(from_robot);

                    let sequential = model.add(
                        LinearConstraint::ge(vec![(1, vj.start), (-1, vi.end)], 0)
                            .only_enforce_if(&[s]),
                    );
                    borders.insert(i, j, BorderSlot::Sequential, sequential);

                    let handoff_h = model.add(
                        LinearConstraint::ge(vec![(1, vj.end), (-1, vi.end)], from_human)
                            .only_enforce_if(&[!s, vi.human]),
                    );
                    borders.insert(i, j, BorderSlot::HandoffFromHuman, handoff_h);

                    let handoff_r = model.add(
                        LinearConstraint::ge(vec![(1, vj.end), (-1, vi.end)], from_robot)
                            .only_enforce_if(&[!s, !vi.human]),
                    );
                    borders.insert(i, j, BorderSlot::HandoffFromRobot, handoff_r);
                } else {
                    // after(i, j): j runs after i. Shared by both directions.
                    let after = if i < j { order[&key] } else { !order[&key] };

                    let after_id = model.add(
                        LinearConstraint::ge(vec![(1, vj.start), (-1, vi.end)], 0)
                            .only_enforce_if(&[s, after]),
                    );
                    borders.insert(i, j, BorderSlot::After, after_id);

                    let before_id = model.add(
                        LinearConstraint::ge(vec![(1, vi.start), (-1, vj.end)], 0)
                            .only_enforce_if(&[s, !after]),
                    );
                    borders.insert(i, j, BorderSlot::Before, before_id);
                }
            }
        }

        let makespan = model.new_int_var(0, horizon, "makespan");
        model.add_max_equality(makespan, vars.iter().map(|v| v.end).collect());

        let mut objective = vec![(1, makespan)];
        if !costs.is_empty() {
            let max_penalty = costs.iter().map(|c| model.bounds(*c).1).max().unwrap_or(0);
            let max_cost = model.new_int_var(0, max_penalty, "max_rejection_cost");
            model.add_max_equality(max_cost, costs);
            objective.push((1, max_cost));
        }
        model.minimize(objective);
        // Among optimal plans, start everything as early as possible.
        model.break_ties_by(vars.iter().map(|v| (1, v.start)).collect());

        let engine = Self {
            model,
            vars,
            estimates,
            worst_case,
            handoff_slack,
            duration_selection,
            fix_agent,
            borders,
            makespan,
            finalized: vec![false; n],
            horizon,
            options,
        };

        info!(
            tasks = n,
            horizon,
            variables = engine.model.num_variables(),
            constraints = engine.model.num_constraints(),
            "scheduling model built"
        );
        Ok(engine)
    }

    pub fn horizon(&self) -> i64 {
        self.horizon
    }

    pub fn model(&self) -> &ScheduleModel {
        &self.model
    }

    /// Handle of the constraint pinning `task` to its agent, if any.
    pub fn fixed_assignment(&self, task: TaskId) -> Option<ConstraintId> {
        self.fix_agent[task]
    }

    pub fn border(&self, i: TaskId, j: TaskId, slot: BorderSlot) -> Option<ConstraintId> {
        self.borders.get(i, j, slot)
    }

    /// Planned total duration of `task` for `agent`.
    pub fn planned_duration(&self, task: TaskId, agent: AgentKind) -> i64 {
        self.estimates[task].of(agent).total()
    }

    /// Solve the live model and write the plan back into `job`.
    pub fn solve(&mut self, job: &mut Job) -> Result<Plan> {
        let outcome = backend::solve(
            &self.model,
            &Scenario::default(),
            &self.options.solve_limits,
        );
        let status = outcome.status;

        let Some(solution) = outcome.solution.filter(|_| status.has_solution()) else {
            error!(
                ?status,
                horizon = self.horizon,
                variables = self.model.num_variables(),
                constraints = self.model.num_constraints(),
                "no feasible schedule"
            );
            return Err(CoplanError::NoFeasibleSchedule {
                status,
                horizon: self.horizon,
                variables: self.model.num_variables(),
                constraints: self.model.num_constraints(),
            });
        };

        let mut human = Vec::new();
        let mut robot = Vec::new();
        for id in 0..job.len() {
            let v = self.vars[id];
            let agent = AgentKind::from_indicator(solution.literal(v.human));
            let start = solution.value(v.start);
            let end = solution.value(v.end);

            let task = job.task_mut(id);
            match task.status() {
                TaskStatus::Blocked | TaskStatus::Available => {
                    task.start = Some(start);
                    task.finish = Some(Finish::Planned(end));
                    task.assigned = Some(agent);
                }
                TaskStatus::InProgress => {
                    task.finish = Some(Finish::Planned(end));
                }
                TaskStatus::Completed => {}
            }

            match agent {
                AgentKind::Human => human.push((start, id)),
                AgentKind::Robot => robot.push((start, id)),
            }
        }
        human.sort_by_key(|(start, _)| *start);
        robot.sort_by_key(|(start, _)| *start);

        let plan = Plan {
            human: human.into_iter().map(|(_, id)| id).collect(),
            robot: robot.into_iter().map(|(_, id)| id).collect(),
            status,
            objective: solution.objective(),
            makespan: solution.value(self.makespan),
            stats: outcome.stats,
        };

        info!(
            ?status,
            objective = plan.objective,
            makespan = plan.makespan,
            nodes = plan.stats.nodes,
            rounds = plan.stats.rounds,
            elapsed_ms = plan.stats.wall_time.as_millis() as u64,
            "schedule solved"
        );
        debug!(human = ?plan.human, robot = ?plan.robot, "agent queues");
        Ok(plan)
    }

    /// Pin every universal task to the agent it is currently assigned to.
    pub fn fix_assignments(&mut self, job: &Job) {
        for task in job.tasks().iter().filter(|t| t.is_universal()) {
            if self.fix_agent[task.id].is_some() {
                continue;
            }
            let Some(agent) = task.assigned else {
                warn!(task = task.id, "universal task has no assignment to pin");
                continue;
            };
            let literal = self.vars[task.id].assigned_to(agent);
            self.fix_agent[task.id] = Some(self.model.pin(literal));
        }
    }

    /// Replace the fixed assignment of `task` with `agent`.
    pub fn set_new_agent(&mut self, task: TaskId, agent: AgentKind) {
        if let Some(old) = self.fix_agent[task].take() {
            self.model.remove(old);
        }
        let literal = self.vars[task].assigned_to(agent);
        self.fix_agent[task] = Some(self.model.pin(literal));
        debug!(task, %agent, "assignment changed");
    }

    /// Freeze what has happened up to `current_time`.
    pub fn refresh(&mut self, job: &Job, current_time: i64) {
        self.grow_horizon(job, current_time);

        for task in job.tasks() {
            let i = task.id;
            if self.finalized[i] {
                continue;
            }
            let v = self.vars[i];

            match task.status() {
                TaskStatus::Completed => {
                    let (Some(start), Some(end)) = (task.start, task.finish_time()) else {
                        warn!(task = i, "completed task without timing; skipped");
                        continue;
                    };
                    self.model.fix(v.start, start);
                    self.model.fix(v.end, end);
                    self.model.fix(v.duration, end - start);
                    self.finalized[i] = true;
                    self.retire(i);
                    trace!(task = i, start, end, "task finalized");
                }
                TaskStatus::InProgress => {
                    let Some(start) = task.start else {
                        warn!(task = i, "task in progress without start; skipped");
                        continue;
                    };
                    let projected = self.projected_finish(task, start);
                    let duration = (projected.max(current_time) - start).max(1);
                    self.model.fix(v.start, start);
                    self.model.fix(v.duration, duration);
                    self.model.fix(v.end, start + duration);
                    self.retire(i);
                }
                TaskStatus::Blocked | TaskStatus::Available => {
                    let lo = current_time.max(0);
                    self.model.set_bounds(v.start, lo, self.horizon);
                }
            }
        }

        debug!(
            current_time,
            horizon = self.horizon,
            constraints = self.model.num_constraints(),
            "engine refreshed"
        );
    }

    /// Solve once per candidate with `task` moved to `agent`, leaving the live
    /// model untouched. Sorted by makespan, then objective, then input order.
    pub fn evaluate_reassignments(&self, candidates: &[TaskId], agent: AgentKind) -> Vec<Reassignment> {
        let mut results = Vec::new();
        for &task in candidates {
            let scenario = Scenario {
                disabled: self.fix_agent[task].into_iter().collect(),
                assumptions: vec![self.vars[task].assigned_to(agent)],
                primary_only: true,
            };
            let outcome = backend::solve(&self.model, &scenario, &self.options.what_if_limits);
            match outcome.solution.filter(|_| outcome.status.has_solution()) {
                Some(solution) => {
                    let candidate = Reassignment {
                        task,
                        objective: solution.objective(),
                        makespan: solution.value(self.makespan),
                    };
                    debug!(
                        task,
                        %agent,
                        objective = candidate.objective,
                        makespan = candidate.makespan,
                        "what-if evaluated"
                    );
                    results.push(candidate);
                }
                None => {
                    debug!(task, %agent, status = ?outcome.status, "what-if has no schedule");
                }
            }
        }
        results.sort_by_key(|r| (r.makespan, r.objective));
        results
    }

    pub fn num_constraints(&self) -> usize {
        self.model.num_constraints()
    }

    pub fn num_variables(&self) -> usize {
        self.model.num_variables()
    }

    /// Actual start plus the planned duration of the executing agent.
    fn projected_finish(&self, task: &Task, start: i64) -> i64 {
        let agent = task.assigned.unwrap_or(AgentKind::Robot);
        start + self.planned_duration(task.id, agent)
    }

    /// Drop the duration-selection and `(task, *)` border constraints.
    fn retire(&mut self, task: TaskId) {
        let mut handles = self.duration_selection[task].clone();
        handles.extend(self.borders.take_from(task));

        let mut removed = 0;
        let mut stale = 0;
        for id in handles {
            if self.model.remove(id) {
                removed += 1;
            } else {
                stale += 1;
            }
        }
        trace!(task, removed, stale, "constraints retired");
    }

    /// Keep the horizon above what the remaining work can need.
    fn grow_horizon(&mut self, job: &Job, current_time: i64) {
        let frontier = job
            .tasks()
            .iter()
            .filter(|t| t.status().is_settled())
            .filter_map(|t| t.finish_time())
            .fold(current_time, i64::max);
        let remaining: i64 = job
            .tasks()
            .iter()
            .filter(|t| t.status().is_pending())
            .map(|t| self.worst_case[t.id] + self.handoff_slack[t.id])
            .sum();
        let required = frontier + remaining;
        if required <= self.horizon {
            return;
        }

        debug!(old = self.horizon, new = required, "horizon grown");
        self.horizon = required;
        for task in job.tasks() {
            if self.finalized[task.id] || task.status().is_settled() {
                continue;
            }
            let v = self.vars[task.id];
            let (lo, _) = self.model.bounds(v.start);
            self.model.set_bounds(v.start, lo, required);
            self.model.set_bounds(v.end, 0, required);
        }
        self.model.set_bounds(self.makespan, 0, required);
    }
}

fn rejection_penalty(probability: f64, options: &PlannerOptions) -> i64 {
    let scaled = probability * options.rejection_weight * options.rejection_resolution as f64;
    (scaled.round() as i64).max(0)
}
