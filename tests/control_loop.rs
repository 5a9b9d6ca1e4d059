// tests/control_loop.rs

mod common;

use coplan::control::TickEvent;
use coplan::types::{AgentKind, Question, TaskStatus};
use coplan_test_utils::builders::JobBuilder;
use coplan_test_utils::init_tracing;
use coplan_test_utils::oracles::{ScriptedAcceptance, ScriptedDurations};

use common::{control_for, parallel_job, stealing_job};

#[test]
fn agents_are_served_robot_first() {
    let (job, durations) = parallel_job();
    let control = control_for(job, durations, ScriptedAcceptance::new()).unwrap();

    let kinds: Vec<_> = control.agents().iter().map(|a| a.kind()).collect();
    assert_eq!(kinds, vec![AgentKind::Robot, AgentKind::Human]);
    assert_eq!(control.agent(AgentKind::Robot).queue(), &[0]);
    assert_eq!(control.agent(AgentKind::Human).queue(), &[1]);
}

#[test]
fn first_tick_starts_both_agents() {
    init_tracing();
    let (job, durations) = parallel_job();
    let mut control = control_for(job, durations, ScriptedAcceptance::new()).unwrap();

    let report = control.step().unwrap();

    assert_eq!(report.time, 0);
    assert_eq!(
        report.events,
        vec![
            TickEvent::Started {
                agent: AgentKind::Robot,
                task: 0
            },
            TickEvent::Started {
                agent: AgentKind::Human,
                task: 1
            },
        ]
    );
    assert_eq!(control.time(), 1);
    assert_eq!(control.job().task(0).status(), TaskStatus::InProgress);
    assert_eq!(control.agent(AgentKind::Robot).current(), Some(0));
}

#[test]
fn run_finishes_parallel_job_at_makespan() {
    init_tracing();
    let (job, durations) = parallel_job();
    let mut control = control_for(job, durations, ScriptedAcceptance::new()).unwrap();

    let artifact = control.run().unwrap();

    assert!(control.is_finished());
    assert_eq!(control.job().progress(), 100.0);
    assert_eq!(control.job().current_makespan(), 5);
    let rows = artifact.last().rows();
    assert!(rows.iter().all(|r| r.status == TaskStatus::Completed));
    assert_eq!(rows[0].end, Some(5));
    assert_eq!(rows[1].end, Some(3));
    assert_eq!(artifact.initial().status, vec![TaskStatus::Available; 2]);
}

#[test]
fn dependent_task_waits_for_its_prerequisite_to_start() {
    let job = JobBuilder::new().robot(&[]).human(&[0]).build();
    let durations = ScriptedDurations::new()
        .with(0, AgentKind::Robot, 4)
        .with(1, AgentKind::Human, 2);
    let mut control = control_for(job, durations, ScriptedAcceptance::new()).unwrap();

    assert_eq!(control.job().task(1).status(), TaskStatus::Blocked);
    control.step().unwrap();
    // The robot commenced task 0 within the same tick.
    assert_eq!(control.job().task(1).status(), TaskStatus::InProgress);
    control.run().unwrap();

    let job = control.job();
    assert!(job.task(1).start.unwrap() >= job.task(0).start.unwrap());
}

#[test]
fn declined_task_moves_to_the_robot() {
    init_tracing();
    let job = JobBuilder::new().either(&[]).build();
    let durations = ScriptedDurations::new()
        .with(0, AgentKind::Human, 2)
        .with(0, AgentKind::Robot, 5);
    let acceptance = ScriptedAcceptance::new().declining(Question::ExecuteTask, 0);
    let log = acceptance.log();
    let mut control = control_for(job, durations, acceptance).unwrap();
    assert_eq!(control.agent(AgentKind::Human).queue(), &[0]);

    let report = control.step().unwrap();

    assert!(report.events.contains(&TickEvent::Declined {
        agent: AgentKind::Human,
        task: 0
    }));
    assert!(report.events.contains(&TickEvent::Reassigned {
        task: 0,
        from: AgentKind::Human,
        to: AgentKind::Robot
    }));
    assert_eq!(control.job().task(0).assigned, Some(AgentKind::Robot));
    assert_eq!(control.agent(AgentKind::Robot).queue(), &[0]);
    assert_eq!(control.agent(AgentKind::Human).rejected(), &[0]);
    assert_eq!(log.count(Question::ExecuteTask, 0), 1);

    control.run().unwrap();
    assert_eq!(control.job().current_makespan(), 6);
}

#[test]
fn declined_steal_keeps_task_with_robot_and_is_not_offered_again() {
    init_tracing();
    let (job, durations, acceptance) = stealing_job();
    let acceptance = acceptance.declining(Question::ChangeAgent, 1);
    let log = acceptance.log();
    let mut control = control_for(job, durations, acceptance).unwrap();

    assert_eq!(control.agent(AgentKind::Robot).queue(), &[0, 1]);
    assert_eq!(control.agent(AgentKind::Human).queue(), &[2]);
    assert_eq!(control.job().current_makespan(), 13);

    control.step().unwrap();
    let report = control.step().unwrap();
    assert!(report.events.contains(&TickEvent::Declined {
        agent: AgentKind::Human,
        task: 1
    }));

    for _ in 0..3 {
        let report = control.step().unwrap();
        assert!(report.events.is_empty());
    }

    control.run().unwrap();
    assert_eq!(control.agent(AgentKind::Human).rejected(), &[1]);
    assert_eq!(log.count(Question::ChangeAgent, 1), 1);
    assert_eq!(control.job().task(1).assigned, Some(AgentKind::Robot));
    assert_eq!(control.job().current_makespan(), 13);
}

#[test]
fn accepted_steal_moves_task_to_idle_human() {
    init_tracing();
    let (job, durations, acceptance) = stealing_job();
    let mut control = control_for(job, durations, acceptance).unwrap();

    control.step().unwrap();
    let report = control.step().unwrap();

    assert!(report.events.contains(&TickEvent::Reassigned {
        task: 1,
        from: AgentKind::Robot,
        to: AgentKind::Human
    }));
    assert!(report.events.contains(&TickEvent::Started {
        agent: AgentKind::Human,
        task: 1
    }));
    assert_eq!(control.agent(AgentKind::Human).current(), Some(1));

    control.run().unwrap();
    assert_eq!(control.job().task(1).assigned, Some(AgentKind::Human));
    assert_eq!(control.job().current_makespan(), 10);
}

#[test]
fn overrun_is_absorbed_by_shifting_the_queue() {
    let job = JobBuilder::new().robot(&[]).robot(&[]).build();
    let durations = ScriptedDurations::new()
        .with(0, AgentKind::Robot, 3)
        .with(1, AgentKind::Robot, 2)
        .with_overrun(0, 2);
    let mut control = control_for(job, durations, ScriptedAcceptance::new()).unwrap();
    assert_eq!(control.agent(AgentKind::Robot).queue(), &[0, 1]);

    // Ticks 0..=3: the robot runs task 0, planned to end at 3.
    for _ in 0..4 {
        control.step().unwrap();
    }
    let job = control.job();
    assert_eq!(job.task(0).status(), TaskStatus::InProgress);
    assert_eq!(job.task(0).finish_time(), Some(4));
    assert_eq!(job.task(1).start, Some(4));
    assert_eq!(job.task(1).finish_time(), Some(6));

    control.run().unwrap();
    assert_eq!(control.job().task(0).finish_time(), Some(5));
    assert_eq!(control.job().task(1).start, Some(5));
    assert_eq!(control.job().current_makespan(), 7);
}

#[test]
fn status_invariants_hold_every_tick() {
    let job = JobBuilder::new()
        .robot(&[])
        .either(&[0])
        .human(&[])
        .either(&[1, 2])
        .robot(&[2])
        .build();
    let durations = ScriptedDurations::new()
        .with(0, AgentKind::Robot, 4)
        .with_both(1, 3)
        .with(2, AgentKind::Human, 2)
        .with(3, AgentKind::Human, 2)
        .with(3, AgentKind::Robot, 5)
        .with(4, AgentKind::Robot, 1)
        .with_overrun(1, 1);
    let acceptance = ScriptedAcceptance::new().with_probability(3, 0.5);
    let mut control = control_for(job, durations, acceptance).unwrap();

    let mut last_progress = 0.0;
    while !control.is_finished() {
        control.step().unwrap();
        let job = control.job();
        assert!(job.completed().is_disjoint(job.in_progress()));
        assert!(job.completed().len() <= job.len());
        assert!(job.progress() >= last_progress);
        last_progress = job.progress();

        for task in job.tasks() {
            if task.status().is_settled() {
                for dep in &task.conditions {
                    let prerequisite = job.task(*dep);
                    assert!(prerequisite.status().is_settled());
                    assert!(prerequisite.start.unwrap() <= task.start.unwrap());
                }
            }
        }
        assert!(control.time() < 200, "run did not converge");
    }
    assert_eq!(last_progress, 100.0);
}
