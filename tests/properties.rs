// tests/properties.rs

mod common;

use std::collections::BTreeSet;

use proptest::prelude::*;

use coplan::job::Job;
use coplan::types::{AgentKind, AgentRequirement};
use coplan_test_utils::builders::TaskBuilder;
use coplan_test_utils::oracles::{ScriptedAcceptance, ScriptedDurations};

use common::{control_for, engine_for};

#[derive(Debug, Clone)]
struct TaskShape {
    requirement: AgentRequirement,
    raw_deps: Vec<usize>,
    human: i64,
    robot: i64,
}

fn requirement_strategy() -> impl Strategy<Value = AgentRequirement> {
    prop_oneof![
        Just(AgentRequirement::Robot),
        Just(AgentRequirement::Human),
        Just(AgentRequirement::Either),
    ]
}

// Task i may only depend on tasks 0..i, so every generated job is acyclic.
fn job_strategy(max_tasks: usize) -> impl Strategy<Value = (Job, ScriptedDurations)> {
    proptest::collection::vec(
        (
            requirement_strategy(),
            proptest::collection::vec(any::<usize>(), 0..3),
            1..6i64,
            1..6i64,
        )
            .prop_map(|(requirement, raw_deps, human, robot)| TaskShape {
                requirement,
                raw_deps,
                human,
                robot,
            }),
        1..=max_tasks,
    )
    .prop_map(|shapes| {
        let mut tasks = Vec::new();
        let mut durations = ScriptedDurations::new();
        for (i, shape) in shapes.into_iter().enumerate() {
            let deps: BTreeSet<usize> = if i == 0 {
                BTreeSet::new()
            } else {
                shape.raw_deps.iter().map(|d| d % i).collect()
            };
            let mut task = TaskBuilder::new(i).requirement(shape.requirement);
            for dep in deps {
                task = task.after(dep);
            }
            tasks.push(task.build());

            if shape.requirement.allows(AgentKind::Human) {
                durations = durations.with(i, AgentKind::Human, shape.human);
            }
            if shape.requirement.allows(AgentKind::Robot) {
                durations = durations.with(i, AgentKind::Robot, shape.robot);
            }
        }
        let job = Job::new(tasks).expect("generated job is valid");
        (job, durations)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn plan_respects_conditions_and_agent_capacity((job, durations) in job_strategy(5)) {
        let mut job = job;
        let mut engine = engine_for(&job, &durations).unwrap();
        let plan = engine.solve(&mut job).unwrap();
        prop_assert!(plan.status.has_solution());

        for task in job.tasks() {
            let agent = task.assigned.expect("every task is assigned");
            prop_assert!(task.requirement.allows(agent));
            let start = task.start.expect("planned start");
            let end = task.finish_time().expect("planned end");
            prop_assert!(end <= plan.makespan);

            for dep in &task.conditions {
                let prerequisite = job.task(*dep);
                let prerequisite_end = prerequisite.finish_time().unwrap();
                if prerequisite.assigned == Some(agent) {
                    prop_assert!(prerequisite_end <= start);
                } else {
                    prop_assert!(prerequisite_end <= end);
                }
            }
        }

        for agent in AgentKind::ALL {
            let queue = plan.queue(agent);
            for pair in queue.windows(2) {
                let (a, b) = (job.task(pair[0]), job.task(pair[1]));
                prop_assert!(a.finish_time().unwrap() <= b.start.unwrap());
            }
        }
    }

    #[test]
    fn control_loop_finishes_with_monotonic_progress((job, durations) in job_strategy(4)) {
        let len = job.len();
        let mut control = control_for(job, durations, ScriptedAcceptance::new()).unwrap();

        let mut last = 0.0;
        while !control.is_finished() {
            control.step().unwrap();
            let progress = control.job().progress();
            prop_assert!(progress >= last);
            last = progress;
            prop_assert!(control.time() < 500, "run did not converge");
        }
        prop_assert_eq!(control.job().completed().len(), len);

        // Execution only releases a task once its conditions have started.
        let job = control.job();
        for task in job.tasks() {
            for dep in &task.conditions {
                let prerequisite = job.task(*dep);
                prop_assert!(prerequisite.start.unwrap() <= task.start.unwrap());
                if prerequisite.assigned == task.assigned {
                    prop_assert!(prerequisite.finish_time().unwrap() <= task.start.unwrap());
                }
            }
        }
    }
}
