// tests/planner_scenarios.rs

mod common;

use coplan::errors::CoplanError;
use coplan::job::{Finish, Timing};
use coplan::planner::{BorderSlot, SchedulingEngine, SolveStatus};
use coplan::sim::PhaseDurations;
use coplan::types::{AgentKind, TaskStatus};
use coplan_test_utils::builders::JobBuilder;
use coplan_test_utils::init_tracing;
use coplan_test_utils::oracles::{ScriptedAcceptance, ScriptedDurations};

use common::{chain_job, engine_for, options, parallel_job};

fn timing(total: i64, execution: i64) -> Timing {
    Timing {
        total,
        preparation: 0,
        execution,
        completion: 0,
    }
}

#[test]
fn independent_tasks_on_different_agents_run_in_parallel() {
    init_tracing();
    let (mut job, durations) = parallel_job();
    let mut engine = engine_for(&job, &durations).unwrap();

    let plan = engine.solve(&mut job).unwrap();

    assert_eq!(plan.status, SolveStatus::Optimal);
    assert_eq!(plan.makespan, 5);
    assert_eq!(job.task(0).start, Some(0));
    assert_eq!(job.task(1).start, Some(0));
    assert_eq!(job.task(0).finish_time(), Some(5));
    assert_eq!(job.task(1).finish_time(), Some(3));
    assert_eq!(plan.robot, vec![0]);
    assert_eq!(plan.human, vec![1]);
}

#[test]
fn chain_on_one_agent_is_sequential() {
    init_tracing();
    let (mut job, durations) = chain_job();
    let mut engine = engine_for(&job, &durations).unwrap();

    let plan = engine.solve(&mut job).unwrap();

    assert_eq!(plan.makespan, 8);
    assert!(job.task(1).start.unwrap() >= 5);
    assert_eq!(plan.robot, vec![0, 1]);
    assert!(plan.human.is_empty());
    assert!(engine.border(0, 1, BorderSlot::Sequential).is_some());
    assert!(engine.border(0, 1, BorderSlot::After).is_none());
}

#[test]
fn horizon_is_sum_of_worst_cases() {
    let job = JobBuilder::new().robot(&[]).either(&[]).build();
    let durations = ScriptedDurations::new()
        .with(0, AgentKind::Robot, 4)
        .with(1, AgentKind::Human, 6)
        .with(1, AgentKind::Robot, 2);
    let engine = engine_for(&job, &durations).unwrap();
    assert_eq!(engine.horizon(), 10);
    assert_eq!(engine.planned_duration(1, AgentKind::Human), 6);
}

#[test]
fn missing_duration_for_eligible_agent_is_rejected() {
    let job = JobBuilder::new().either(&[]).build();
    let durations = ScriptedDurations::new().with(0, AgentKind::Robot, 4);
    let result = engine_for(&job, &durations);
    assert!(matches!(result, Err(CoplanError::InvalidJob(_))));
}

#[test]
fn universal_task_goes_to_faster_agent_without_rejection_cost() {
    let mut job = JobBuilder::new().either(&[]).build();
    let durations = ScriptedDurations::new()
        .with(0, AgentKind::Human, 3)
        .with(0, AgentKind::Robot, 7);
    let mut engine = engine_for(&job, &durations).unwrap();

    let plan = engine.solve(&mut job).unwrap();
    assert_eq!(plan.human, vec![0]);
    assert_eq!(job.task(0).assigned, Some(AgentKind::Human));
    assert_eq!(plan.objective, 3);
}

#[test]
fn rejection_cost_pushes_task_to_the_robot() {
    let mut job = JobBuilder::new().either(&[]).build();
    let durations = ScriptedDurations::new()
        .with(0, AgentKind::Human, 3)
        .with(0, AgentKind::Robot, 7);
    let acceptance = ScriptedAcceptance::new().with_probability(0, 0.8);
    let mut engine = SchedulingEngine::new(&job, &durations, &acceptance, options()).unwrap();

    // Human: 3 + 8 = 11, robot: 7 + 0 = 7.
    let plan = engine.solve(&mut job).unwrap();
    assert_eq!(plan.robot, vec![0]);
    assert_eq!(plan.objective, 7);
}

#[test]
fn overrun_moves_dependent_successor() {
    init_tracing();
    let mut job = JobBuilder::new().robot(&[]).robot(&[0]).human(&[]).build();
    let durations = ScriptedDurations::new()
        .with(0, AgentKind::Robot, 5)
        .with(1, AgentKind::Robot, 3)
        .with(2, AgentKind::Human, 4);
    let mut engine = engine_for(&job, &durations).unwrap();
    let first = engine.solve(&mut job).unwrap();
    assert_eq!(first.makespan, 8);
    let planned_successor_start = job.task(1).start.unwrap();
    let human_plan = (job.task(2).start, job.task(2).finish_time());

    job.start_task(0, 0).unwrap();
    job.start_task(2, human_plan.0.unwrap()).unwrap();
    job.refresh_availability().unwrap();
    job.complete_task(2, timing(human_plan.1.unwrap(), 4)).unwrap();
    // Two units late.
    job.complete_task(0, timing(7, 7)).unwrap();

    engine.refresh(&job, 7);
    let second = engine.solve(&mut job).unwrap();

    assert!(job.task(1).start.unwrap() >= planned_successor_start + 2);
    assert_eq!(second.makespan, 10);
    assert_eq!((job.task(2).start, job.task(2).finish_time()), human_plan);
    assert_eq!(job.task(0).finish, Some(Finish::Observed(timing(7, 7))));
}

#[test]
fn in_progress_task_keeps_start_and_projects_finish() {
    let (mut job, durations) = chain_job();
    let mut engine = engine_for(&job, &durations).unwrap();
    engine.solve(&mut job).unwrap();

    job.start_task(0, 0).unwrap();
    job.refresh_availability().unwrap();
    // Still running past its planned finish of 5.
    engine.refresh(&job, 6);
    engine.solve(&mut job).unwrap();

    assert_eq!(job.task(0).status(), TaskStatus::InProgress);
    assert_eq!(job.task(0).start, Some(0));
    assert_eq!(job.task(0).finish_time(), Some(6));
    assert!(job.task(1).start.unwrap() >= 6);
}

#[test]
fn early_start_projects_finish_from_actual_start() {
    init_tracing();
    let mut job = JobBuilder::new().robot(&[]).robot(&[]).build();
    let durations = ScriptedDurations::new()
        .with(0, AgentKind::Robot, 5)
        .with(1, AgentKind::Robot, 3);
    let mut engine = engine_for(&job, &durations).unwrap();
    assert_eq!(engine.solve(&mut job).unwrap().makespan, 8);

    // Task 0 finishes two units early and task 1 follows at once.
    job.start_task(0, 0).unwrap();
    job.complete_task(0, timing(3, 3)).unwrap();
    job.start_task(1, 3).unwrap();
    assert_eq!(job.task(1).finish_time(), Some(6));

    engine.refresh(&job, 4);
    let plan = engine.solve(&mut job).unwrap();

    assert_eq!(job.task(1).start, Some(3));
    assert_eq!(job.task(1).finish_time(), Some(6));
    assert_eq!(plan.makespan, 6);
}

#[test]
fn handoff_between_agents_waits_for_phases() {
    init_tracing();
    let mut job = JobBuilder::new().robot(&[]).human(&[0]).build();
    let durations = ScriptedDurations::new()
        .with_phases(
            0,
            AgentKind::Robot,
            PhaseDurations {
                preparation: 2,
                execution: 3,
                completion: 2,
            },
        )
        .with_phases(
            1,
            AgentKind::Human,
            PhaseDurations {
                preparation: 1,
                execution: 2,
                completion: 1,
            },
        );
    let mut engine = engine_for(&job, &durations).unwrap();

    let plan = engine.solve(&mut job).unwrap();

    // Margin: robot preparation + completion - human preparation = 3.
    assert_eq!(plan.status, SolveStatus::Optimal);
    assert_eq!(job.task(0).finish_time(), Some(7));
    assert_eq!(job.task(1).finish_time(), Some(10));
    assert_eq!(plan.makespan, 10);
    assert!(engine.border(0, 1, BorderSlot::HandoffFromRobot).is_some());
}

#[test]
fn second_refresh_is_a_no_op() {
    let (mut job, durations) = chain_job();
    let mut engine = engine_for(&job, &durations).unwrap();
    engine.solve(&mut job).unwrap();

    job.start_task(0, 0).unwrap();
    job.complete_task(0, timing(5, 5)).unwrap();
    job.refresh_availability().unwrap();

    engine.refresh(&job, 5);
    let constraints = engine.num_constraints();
    let variables = engine.num_variables();
    assert!(engine.border(0, 1, BorderSlot::Sequential).is_none());

    engine.refresh(&job, 5);
    assert_eq!(engine.num_constraints(), constraints);
    assert_eq!(engine.num_variables(), variables);

    let plan = engine.solve(&mut job).unwrap();
    assert_eq!(plan.makespan, 8);
    assert_eq!(job.task(1).start, Some(5));
}

#[test]
fn what_if_evaluation_leaves_live_model_untouched() {
    init_tracing();
    let mut job = JobBuilder::new().robot(&[]).either(&[]).either(&[]).build();
    let durations = ScriptedDurations::new()
        .with(0, AgentKind::Robot, 6)
        .with_both(1, 4)
        .with_both(2, 2);
    let mut engine = engine_for(&job, &durations).unwrap();
    let before = engine.solve(&mut job).unwrap();
    engine.fix_assignments(&job);

    let constraints = engine.num_constraints();
    let pinned = engine.fixed_assignment(1).unwrap();
    let assigned_1 = job.task(1).assigned.unwrap();

    let results = engine.evaluate_reassignments(&[1, 2], assigned_1.coworker());

    assert_eq!(engine.num_constraints(), constraints);
    assert!(engine.model().is_active(pinned));
    assert_eq!(engine.fixed_assignment(1), Some(pinned));
    assert!(!results.is_empty());
    assert!(results.windows(2).all(|w| w[0].makespan <= w[1].makespan));

    let after = engine.solve(&mut job).unwrap();
    assert_eq!(after.makespan, before.makespan);
    assert_eq!(job.task(1).assigned, Some(assigned_1));
}

#[test]
fn set_new_agent_moves_the_task() {
    let mut job = JobBuilder::new().either(&[]).build();
    let durations = ScriptedDurations::new().with_both(0, 4);
    let mut engine = engine_for(&job, &durations).unwrap();
    engine.solve(&mut job).unwrap();
    engine.fix_assignments(&job);

    let old = engine.fixed_assignment(0).unwrap();
    let to = job.task(0).assigned.unwrap().coworker();
    job.task_mut(0).assigned = Some(to);
    engine.set_new_agent(0, to);
    engine.refresh(&job, 0);
    let plan = engine.solve(&mut job).unwrap();

    assert!(!engine.model().is_active(old));
    assert_eq!(plan.queue(to), &[0]);
    assert_eq!(job.task(0).assigned, Some(to));
}
