#![allow(dead_code)]

use coplan::control::ControlLoop;
use coplan::errors::Result;
use coplan::job::Job;
use coplan::planner::{PlannerOptions, SchedulingEngine};
use coplan::types::AgentKind;
use coplan_test_utils::bounded_options;
use coplan_test_utils::builders::JobBuilder;
use coplan_test_utils::oracles::{ScriptedAcceptance, ScriptedDurations};

/// Node budget large enough to prove optimality on the small jobs below.
pub const SMALL_BUDGET: u64 = 50_000;

pub fn options() -> PlannerOptions {
    bounded_options(SMALL_BUDGET)
}

/// Robot task 0 (5 units) and human task 1 (3 units), independent.
pub fn parallel_job() -> (Job, ScriptedDurations) {
    let job = JobBuilder::new().robot(&[]).human(&[]).build();
    let durations = ScriptedDurations::new()
        .with(0, AgentKind::Robot, 5)
        .with(1, AgentKind::Human, 3);
    (job, durations)
}

/// Robot task 0 (5 units) then robot task 1 (3 units) depending on it.
pub fn chain_job() -> (Job, ScriptedDurations) {
    let job = JobBuilder::new().robot(&[]).robot(&[0]).build();
    let durations = ScriptedDurations::new()
        .with(0, AgentKind::Robot, 5)
        .with(1, AgentKind::Robot, 3);
    (job, durations)
}

/// Robot 0 (10), universal 1 (3 on either, after 0), human 2 (1).
///
/// The human is unlikely to accept task 1, so the plan gives it to the
/// robot; once the human runs out of work, moving task 1 over would
/// shorten the makespan from 13 to 10.
pub fn stealing_job() -> (Job, ScriptedDurations, ScriptedAcceptance) {
    let job = JobBuilder::new().robot(&[]).either(&[0]).human(&[]).build();
    let durations = ScriptedDurations::new()
        .with(0, AgentKind::Robot, 10)
        .with_both(1, 3)
        .with(2, AgentKind::Human, 1);
    let acceptance = ScriptedAcceptance::new().with_probability(1, 0.9);
    (job, durations, acceptance)
}

pub fn engine_for(job: &Job, durations: &ScriptedDurations) -> Result<SchedulingEngine> {
    SchedulingEngine::new(job, durations, &ScriptedAcceptance::new(), options())
}

pub fn control_for(
    job: Job,
    durations: ScriptedDurations,
    acceptance: ScriptedAcceptance,
) -> Result<ControlLoop<ScriptedDurations, ScriptedAcceptance>> {
    ControlLoop::new(job, durations, acceptance, options())
}
