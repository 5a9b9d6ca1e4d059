// tests/simulation.rs

use std::collections::BTreeMap;

use coplan::job::{Action, Job, Task};
use coplan::sim::{
    AcceptanceOracle, DurationOracle, ExecutionStatus, PhaseDurations, SimulatedAcceptance,
    SimulatedWorkers, default_rejection_table, nominal_phases,
};
use coplan::types::{AgentKind, AgentRequirement, Question};

fn action(object: &str, place: &str) -> Action {
    Action {
        object: object.to_string(),
        place: place.to_string(),
    }
}

fn task(id: usize, object: &str, place: &str, requirement: AgentRequirement, after: &[usize]) -> Task {
    Task::new(id, action(object, place), after.to_vec(), requirement)
}

#[test]
fn nominal_tables_cover_own_and_shared_cubes() {
    let robot = nominal_phases(AgentKind::Robot, &action("r1", "A1")).unwrap();
    assert_eq!(
        robot,
        PhaseDurations {
            preparation: 6,
            execution: 5,
            completion: 2
        }
    );
    let human = nominal_phases(AgentKind::Human, &action("h1", "A1")).unwrap();
    assert_eq!(human.total(), 15);

    assert!(nominal_phases(AgentKind::Human, &action("r1", "A1")).is_none());
    assert!(nominal_phases(AgentKind::Robot, &action("h1", "A1")).is_none());
    assert!(nominal_phases(AgentKind::Robot, &action("a2", "C3")).is_some());
    assert!(nominal_phases(AgentKind::Human, &action("a7", "C3")).is_some());
    assert!(nominal_phases(AgentKind::Robot, &action("r1", "E1")).is_none());
    assert!(nominal_phases(AgentKind::Robot, &action("r9", "A1")).is_none());
}

#[test]
fn estimates_are_deterministic_and_positive() {
    let t = task(3, "a5", "B2", AgentRequirement::Either, &[]);
    let a = SimulatedWorkers::new(7, 0.5);
    let b = SimulatedWorkers::new(7, 0.5);

    for agent in [AgentKind::Human, AgentKind::Robot] {
        let pa = a.estimate(&t, agent);
        assert_eq!(pa, b.estimate(&t, agent));
        assert!(pa.preparation >= 1 && pa.execution >= 1 && pa.completion >= 1);
    }

    let robot_only = task(0, "r2", "A1", AgentRequirement::Robot, &[]);
    assert_eq!(a.estimate(&robot_only, AgentKind::Human), PhaseDurations::default());
}

#[test]
fn sampled_phases_centre_on_nominal_and_stretch_when_delayed() {
    let t = task(0, "r1", "A1", AgentRequirement::Robot, &[]);
    let mean_execution = |fail_probability: f64| -> f64 {
        let total: i64 = (0..200)
            .map(|seed| {
                SimulatedWorkers::new(seed, fail_probability)
                    .estimate(&t, AgentKind::Robot)
                    .execution
            })
            .sum();
        total as f64 / 200.0
    };

    // Nominal execution is 5; sampling truncates towards zero.
    let on_time = mean_execution(0.0);
    assert!((3.5..=5.5).contains(&on_time), "mean {on_time}");
    let delayed = mean_execution(1.0);
    assert!(delayed > 12.0, "mean {delayed}");
}

#[test]
fn execution_walks_through_phases_to_completion() {
    let job = Job::new(vec![task(0, "r1", "A1", AgentRequirement::Robot, &[])]).unwrap();
    let mut workers = SimulatedWorkers::new(1, 0.0);
    let expected = workers.estimate(job.task(0), AgentKind::Robot);

    workers.begin(&job, 0, AgentKind::Robot, 2);
    let mut seen = Vec::new();
    let mut completed = None;
    for now in 2..200 {
        match workers.query(&job, AgentKind::Robot, now) {
            ExecutionStatus::Completed(timing) => {
                completed = Some(timing);
                break;
            }
            status => seen.push(status),
        }
    }

    let timing = completed.expect("task completes");
    assert_eq!(timing.total, 2 + expected.total());
    assert_eq!(timing.preparation, expected.preparation);
    assert_eq!(seen.first(), Some(&ExecutionStatus::Preparation));
    assert!(seen.contains(&ExecutionStatus::Execution));
    assert!(seen.contains(&ExecutionStatus::Completion));
    assert_eq!(workers.query(&job, AgentKind::Robot, 300), ExecutionStatus::Idle);
}

#[test]
fn dependent_task_waits_for_coworker_handoff() {
    let mut job = Job::new(vec![
        task(0, "r1", "A1", AgentRequirement::Robot, &[]),
        task(1, "h1", "A2", AgentRequirement::Human, &[0]),
    ])
    .unwrap();
    let mut workers = SimulatedWorkers::new(3, 0.0);
    let robot = workers.estimate(job.task(0), AgentKind::Robot);
    let human = workers.estimate(job.task(1), AgentKind::Human);

    job.start_task(0, 0).unwrap();
    workers.begin(&job, 0, AgentKind::Robot, 0);
    job.refresh_availability().unwrap();
    job.start_task(1, 0).unwrap();
    workers.begin(&job, 1, AgentKind::Human, 0);

    let mut waited = false;
    let mut human_done = None;
    for now in 0..200 {
        workers.query(&job, AgentKind::Robot, now);
        match workers.query(&job, AgentKind::Human, now) {
            ExecutionStatus::Waiting(_) => waited = true,
            ExecutionStatus::Completed(timing) => {
                human_done = Some(timing.total);
                break;
            }
            _ => {}
        }
    }

    let released = robot.preparation + robot.execution;
    let done = human_done.expect("human completes");
    if human.preparation < released {
        assert!(waited);
        assert!(done >= released + human.execution + human.completion);
    } else {
        assert_eq!(done, human.total());
    }
}

#[test]
fn robot_always_accepts() {
    let table: BTreeMap<usize, f64> = [(0, 1.0)].into_iter().collect();
    let mut acceptance = SimulatedAcceptance::new(5, table, 1.0);
    let t = task(0, "a1", "A1", AgentRequirement::Either, &[]);
    assert!(acceptance.ask(Question::ExecuteTask, &t, AgentKind::Robot));
    assert!(acceptance.ask(Question::ChangeAgent, &t, AgentKind::Robot));
    assert!(!acceptance.ask(Question::ExecuteTask, &t, AgentKind::Human));
}

#[test]
fn human_answers_are_deterministic_per_question() {
    let mut acceptance = SimulatedAcceptance::new(9, default_rejection_table(), 0.2);
    for id in 0..16 {
        let t = task(id, "a1", "A1", AgentRequirement::Either, &[]);
        for question in [Question::ExecuteTask, Question::ChangeAgent] {
            let first = acceptance.ask(question, &t, AgentKind::Human);
            let again = acceptance.ask(question, &t, AgentKind::Human);
            assert_eq!(first, again);
        }
    }
}

#[test]
fn rejection_table_and_default() {
    let table = default_rejection_table();
    assert_eq!(table.len(), 16);
    assert_eq!(table[&3], 0.8);
    assert_eq!(table[&9], 0.8);

    let acceptance = SimulatedAcceptance::new(0, table, 0.35);
    let known = task(3, "a1", "A1", AgentRequirement::Either, &[]);
    let unknown = task(40, "a1", "A1", AgentRequirement::Either, &[]);
    assert_eq!(acceptance.reject_probability(&known), 0.8);
    assert_eq!(acceptance.reject_probability(&unknown), 0.35);

    let mut never = SimulatedAcceptance::new(0, BTreeMap::new(), 0.0);
    assert!(never.ask(Question::ChangeAgent, &unknown, AgentKind::Human));
}
