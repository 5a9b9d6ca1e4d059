// src/planner/backend.rs

//! Solving a [`ScheduleModel`] with Pumpkin.
//!
//! Every round lowers the active constraints onto a fresh [`Solver`]. The
//! objective is minimised by repeated satisfaction: each solution found
//! adds `objective <= best - 1` to the next round, until a round is
//! unsatisfiable (optimal) or the budget runs out.

use std::iter;
use std::time::{Duration, Instant};

use pumpkin_core::Solver;
use pumpkin_core::constraints;
use pumpkin_core::results::{ProblemSolution, SatisfactionResult};
use pumpkin_core::termination::TerminationCondition;
use pumpkin_core::variables::{
    AffineView, DomainId, Literal as SolverLiteral, TransformableVariable,
};
use tracing::{debug, trace};

use super::model::{
    Constraint, LinearConstraint, Literal, Relation, Scenario, ScheduleModel, VarId, VarKind,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// Best solution found and proven optimal.
    Optimal,
    /// A solution was found but the budget ran out first.
    Feasible,
    /// No solution exists.
    Infeasible,
    /// The budget ran out before any solution was found.
    Unknown,
}

impl SolveStatus {
    pub fn has_solution(self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::Feasible)
    }
}

/// Budget for a single solve, shared by all of its rounds.
#[derive(Debug, Clone, Copy)]
pub struct SearchLimits {
    pub max_time: Duration,
    /// Search steps (decisions and conflicts) across all rounds.
    pub max_nodes: Option<u64>,
}

impl SearchLimits {
    pub fn with_time(max_time: Duration) -> Self {
        Self {
            max_time,
            max_nodes: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SolveStats {
    pub nodes: u64,
    pub rounds: u64,
    pub solutions: u64,
    pub wall_time: Duration,
}

/// Values of every model variable.
#[derive(Debug, Clone)]
pub struct Solution {
    values: Vec<i64>,
    objective: i64,
}

impl Solution {
    pub fn value(&self, var: VarId) -> i64 {
        self.values[var.index()]
    }

    pub fn literal(&self, literal: Literal) -> bool {
        (self.values[literal.var().index()] == 1) == literal.is_positive()
    }

    pub fn objective(&self) -> i64 {
        self.objective
    }
}

#[derive(Debug, Clone)]
pub struct SolveOutcome {
    pub status: SolveStatus,
    pub solution: Option<Solution>,
    pub stats: SolveStats,
}

/// Minimise the model's objective with `scenario` applied.
///
/// When the objective is proven optimal and the scenario allows it, a second
/// descent minimises the model's tie-break terms without giving up any of
/// the objective.
pub fn solve(model: &ScheduleModel, scenario: &Scenario, limits: &SearchLimits) -> SolveOutcome {
    let started = Instant::now();
    let mut budget = SearchBudget::new(limits, started);
    let mut stats = SolveStats::default();

    let (status, best) =
        descend(model, scenario, &model.objective, &[], &mut budget, &mut stats);
    let mut solution = best.map(|values| Solution::new(values, model));

    let refine = status == SolveStatus::Optimal && !scenario.primary_only;
    if let Some(primary) = solution.as_ref().filter(|_| refine).map(|s| s.objective) {
        if !model.tie_break.is_empty() {
            let hold = [LinearConstraint::le(model.objective.clone(), primary)];
            let (_, refined) =
                descend(model, scenario, &model.tie_break, &hold, &mut budget, &mut stats);
            if let Some(values) = refined {
                solution = Some(Solution::new(values, model));
            }
        }
    }

    stats.nodes = budget.polls;
    stats.wall_time = started.elapsed();
    debug!(
        ?status,
        rounds = stats.rounds,
        nodes = stats.nodes,
        elapsed_ms = stats.wall_time.as_millis() as u64,
        "search finished"
    );
    SolveOutcome {
        status,
        solution,
        stats,
    }
}

/// Rounds of satisfaction with `Σ terms <= best - 1` added after every
/// solution. Returns the status for `terms` and the best values found.
fn descend(
    model: &ScheduleModel,
    scenario: &Scenario,
    terms: &[(i64, VarId)],
    hold: &[LinearConstraint],
    budget: &mut SearchBudget,
    stats: &mut SolveStats,
) -> (SolveStatus, Option<Vec<i64>>) {
    let mut best: Option<(i64, Vec<i64>)> = None;

    let status = loop {
        let mut extra = hold.to_vec();
        if let Some((value, _)) = &best {
            extra.push(LinearConstraint::le(terms.to_vec(), value - 1));
        }
        let Some(mut round) = Round::lower(model, scenario, &extra) else {
            trace!(bound = ?best.as_ref().map(|b| b.0), "model refuted while posting");
            break exhausted(best.is_some());
        };
        stats.rounds += 1;

        match round.search(budget) {
            Step::Found(values) => {
                let value = weigh(terms, &values);
                debug!(value, round = stats.rounds, nodes = budget.polls, "improving solution");
                stats.solutions += 1;
                best = Some((value, values));
                if terms.is_empty() {
                    break SolveStatus::Optimal;
                }
            }
            Step::Exhausted => break exhausted(best.is_some()),
            Step::OutOfBudget => {
                break if best.is_some() {
                    SolveStatus::Feasible
                } else {
                    SolveStatus::Unknown
                };
            }
        }
    };
    (status, best.map(|(_, values)| values))
}

fn exhausted(found: bool) -> SolveStatus {
    if found {
        SolveStatus::Optimal
    } else {
        SolveStatus::Infeasible
    }
}

fn weigh(terms: &[(i64, VarId)], values: &[i64]) -> i64 {
    terms
        .iter()
        .map(|(coef, var)| coef * values[var.index()])
        .sum()
}

impl Solution {
    fn new(values: Vec<i64>, model: &ScheduleModel) -> Self {
        let objective = weigh(&model.objective, &values);
        Self { values, objective }
    }
}

/// Stops on the wall-clock deadline or after `max_nodes` polls.
struct SearchBudget {
    deadline: Instant,
    max_polls: Option<u64>,
    polls: u64,
}

impl SearchBudget {
    fn new(limits: &SearchLimits, started: Instant) -> Self {
        Self {
            deadline: started + limits.max_time,
            max_polls: limits.max_nodes,
            polls: 0,
        }
    }
}

impl TerminationCondition for SearchBudget {
    fn should_stop(&mut self) -> bool {
        self.polls += 1;
        self.max_polls.is_some_and(|max| self.polls > max) || Instant::now() >= self.deadline
    }
}

enum Step {
    Found(Vec<i64>),
    Exhausted,
    OutOfBudget,
}

#[derive(Clone, Copy)]
enum Handle {
    Int(DomainId),
    Bool(SolverLiteral),
}

/// One Pumpkin solver holding the lowered model.
struct Round {
    solver: Solver,
    handles: Vec<Handle>,
}

impl Round {
    /// `None` when posting already refutes the model.
    fn lower(
        model: &ScheduleModel,
        scenario: &Scenario,
        extra: &[LinearConstraint],
    ) -> Option<Self> {
        let mut round = Round {
            solver: Solver::default(),
            handles: Vec::with_capacity(model.num_variables()),
        };

        for var in &model.variables {
            if var.lo > var.hi {
                return None;
            }
            let handle = match var.kind {
                VarKind::Integer => Handle::Int(
                    round
                        .solver
                        .new_bounded_integer(narrow(var.lo), narrow(var.hi)),
                ),
                VarKind::Boolean => Handle::Bool(round.solver.new_literal()),
            };
            round.handles.push(handle);
        }

        for (idx, var) in model.variables.iter().enumerate() {
            if var.kind == VarKind::Boolean && var.lo == var.hi {
                let literal = Literal {
                    var: VarId(idx),
                    positive: var.lo == 1,
                };
                round.require(literal)?;
            }
        }
        for assumption in &scenario.assumptions {
            round.require(*assumption)?;
        }
        for constraint in model.active_constraints(scenario) {
            match constraint {
                Constraint::Linear(lin) => round.post_linear(lin)?,
                Constraint::MaxEquality { target, vars } => round.post_max(*target, vars)?,
            }
        }
        for lin in extra {
            round.post_linear(lin)?;
        }
        Some(round)
    }

    fn search(&mut self, budget: &mut SearchBudget) -> Step {
        let mut brancher = self.solver.default_brancher();
        match self.solver.satisfy(&mut brancher, budget) {
            SatisfactionResult::Satisfiable(satisfiable) => {
                let solution = satisfiable.solution();
                let values = self
                    .handles
                    .iter()
                    .map(|handle| match handle {
                        Handle::Int(domain) => i64::from(solution.get_integer_value(*domain)),
                        Handle::Bool(literal) => i64::from(solution.get_literal_value(*literal)),
                    })
                    .collect();
                Step::Found(values)
            }
            SatisfactionResult::Unsatisfiable(..) => Step::Exhausted,
            SatisfactionResult::Unknown(..) => Step::OutOfBudget,
        }
    }

    fn literal(&self, literal: Literal) -> Option<SolverLiteral> {
        match self.handles[literal.var().index()] {
            Handle::Bool(l) if literal.is_positive() => Some(l),
            Handle::Bool(l) => Some(!l),
            Handle::Int(_) => None,
        }
    }

    fn int(&self, var: VarId) -> Option<DomainId> {
        match self.handles[var.index()] {
            Handle::Int(domain) => Some(domain),
            Handle::Bool(_) => None,
        }
    }

    fn term(&self, coef: i64, var: VarId) -> AffineView<DomainId> {
        match self.handles[var.index()] {
            Handle::Int(domain) => domain.scaled(narrow(coef)),
            Handle::Bool(literal) => literal.get_integer_variable().scaled(narrow(coef)),
        }
    }

    fn require(&mut self, literal: Literal) -> Option<()> {
        let literal = self.literal(literal)?;
        let tag = self.solver.new_constraint_tag();
        self.solver
            .add_clause([literal.get_true_predicate()], tag)
            .ok()
    }

    /// Single literal that implies every literal in `enforcement`.
    fn enforcement(&mut self, enforcement: &[Literal]) -> Option<Option<SolverLiteral>> {
        match enforcement {
            [] => Some(None),
            [single] => self.literal(*single).map(Some),
            many => {
                let literals = many
                    .iter()
                    .map(|l| self.literal(*l))
                    .collect::<Option<Vec<_>>>()?;
                let conjunction = self.solver.new_literal();
                let clause: Vec<_> = literals
                    .iter()
                    .map(|l| (!*l).get_true_predicate())
                    .chain(iter::once(conjunction.get_true_predicate()))
                    .collect();
                let tag = self.solver.new_constraint_tag();
                self.solver.add_clause(clause, tag).ok()?;
                Some(Some(conjunction))
            }
        }
    }

    fn post_linear(&mut self, lin: &LinearConstraint) -> Option<()> {
        let enforcement = self.enforcement(&lin.enforcement)?;
        let tag = self.solver.new_constraint_tag();

        match lin.relation {
            Relation::AtMost => {
                let terms = self.terms(lin, 1);
                let constraint = constraints::less_than_or_equals(terms, narrow(lin.rhs), tag);
                post(constraint, &mut self.solver, enforcement)
            }
            Relation::AtLeast => {
                let terms = self.terms(lin, -1);
                let constraint = constraints::less_than_or_equals(terms, narrow(-lin.rhs), tag);
                post(constraint, &mut self.solver, enforcement)
            }
            Relation::Equal => {
                let terms = self.terms(lin, 1);
                let constraint = constraints::equals(terms, narrow(lin.rhs), tag);
                post(constraint, &mut self.solver, enforcement)
            }
        }
    }

    fn terms(&self, lin: &LinearConstraint, sign: i64) -> Vec<AffineView<DomainId>> {
        lin.terms
            .iter()
            .map(|(coef, var)| self.term(sign * coef, *var))
            .collect()
    }

    /// `target >= v` for every `v`, and `target <= v` for at least one.
    fn post_max(&mut self, target: VarId, vars: &[VarId]) -> Option<()> {
        let target = self.int(target)?;
        let vars = vars
            .iter()
            .map(|v| self.int(*v))
            .collect::<Option<Vec<_>>>()?;

        let mut witnesses = Vec::with_capacity(vars.len());
        for var in vars {
            let tag = self.solver.new_constraint_tag();
            let below =
                constraints::less_than_or_equals(vec![var.scaled(1), target.scaled(-1)], 0, tag);
            post(below, &mut self.solver, None)?;

            let witness = self.solver.new_literal();
            let tag = self.solver.new_constraint_tag();
            let reached =
                constraints::less_than_or_equals(vec![target.scaled(1), var.scaled(-1)], 0, tag);
            post(reached, &mut self.solver, Some(witness))?;
            witnesses.push(witness.get_true_predicate());
        }
        if witnesses.is_empty() {
            return Some(());
        }
        let tag = self.solver.new_constraint_tag();
        self.solver.add_clause(witnesses, tag).ok()
    }
}

fn post<C: constraints::Constraint>(
    constraint: C,
    solver: &mut Solver,
    enforcement: Option<SolverLiteral>,
) -> Option<()> {
    match enforcement {
        None => constraint.post(solver).ok(),
        Some(literal) => constraint.implied_by(solver, literal).ok(),
    }
}

fn narrow(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}
