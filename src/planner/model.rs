// src/planner/model.rs

//! Editable record of the scheduling model.
//!
//! Pumpkin has no way to retract a posted constraint, so the engine keeps
//! its variables and constraints here, edits them as the job executes and
//! lowers the active set onto a fresh solver for every solve (see
//! [`backend`](super::backend)).

use std::ops::Not;

/// Handle to a model variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub(crate) usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Handle to a recorded constraint.
///
/// Handles stay valid after removal; removing twice is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstraintId(pub(crate) usize);

/// A boolean variable or its negation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Literal {
    pub(crate) var: VarId,
    pub(crate) positive: bool,
}

impl Literal {
    pub fn var(self) -> VarId {
        self.var
    }

    pub fn is_positive(self) -> bool {
        self.positive
    }
}

impl Not for Literal {
    type Output = Literal;

    fn not(self) -> Literal {
        Literal {
            var: self.var,
            positive: !self.positive,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VarKind {
    Integer,
    Boolean,
}

#[derive(Debug, Clone)]
pub(crate) struct Variable {
    pub(crate) name: String,
    pub(crate) kind: VarKind,
    pub(crate) lo: i64,
    pub(crate) hi: i64,
}

/// `Σ coef·var` compared against `rhs`, binding only when every literal in
/// `enforcement` holds.
#[derive(Debug, Clone)]
pub struct LinearConstraint {
    pub(crate) terms: Vec<(i64, VarId)>,
    pub(crate) relation: Relation,
    pub(crate) rhs: i64,
    pub(crate) enforcement: Vec<Literal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    AtMost,
    AtLeast,
    Equal,
}

impl LinearConstraint {
    fn new(terms: Vec<(i64, VarId)>, relation: Relation, rhs: i64) -> Self {
        Self {
            terms,
            relation,
            rhs,
            enforcement: Vec::new(),
        }
    }

    /// `Σ terms >= rhs`.
    pub fn ge(terms: Vec<(i64, VarId)>, rhs: i64) -> Self {
        Self::new(terms, Relation::AtLeast, rhs)
    }

    /// `Σ terms <= rhs`.
    pub fn le(terms: Vec<(i64, VarId)>, rhs: i64) -> Self {
        Self::new(terms, Relation::AtMost, rhs)
    }

    /// `Σ terms == rhs`.
    pub fn eq(terms: Vec<(i64, VarId)>, rhs: i64) -> Self {
        Self::new(terms, Relation::Equal, rhs)
    }

    /// Half-reification: the constraint only binds when all `literals` hold.
    pub fn only_enforce_if(mut self, literals: &[Literal]) -> Self {
        self.enforcement.extend_from_slice(literals);
        self
    }
}

#[derive(Debug, Clone)]
pub enum Constraint {
    Linear(LinearConstraint),
    /// `target == max(vars)`.
    MaxEquality { target: VarId, vars: Vec<VarId> },
}

impl From<LinearConstraint> for Constraint {
    fn from(lin: LinearConstraint) -> Self {
        Constraint::Linear(lin)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ConstraintSlot {
    pub(crate) constraint: Constraint,
    pub(crate) active: bool,
}

/// Facts for a single solve that leave the model untouched.
#[derive(Debug, Clone, Default)]
pub struct Scenario {
    pub disabled: Vec<ConstraintId>,
    pub assumptions: Vec<Literal>,
    /// Stop once the objective is settled; skip the tie-break descent.
    pub primary_only: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ScheduleModel {
    pub(crate) variables: Vec<Variable>,
    pub(crate) constraints: Vec<ConstraintSlot>,
    /// Minimised `Σ coef·var`.
    pub(crate) objective: Vec<(i64, VarId)>,
    /// Minimised among solutions with an optimal objective.
    pub(crate) tie_break: Vec<(i64, VarId)>,
}

impl ScheduleModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_int_var(&mut self, lo: i64, hi: i64, name: impl Into<String>) -> VarId {
        self.push_var(VarKind::Integer, lo, hi, name.into())
    }

    pub fn new_bool_var(&mut self, name: impl Into<String>) -> Literal {
        let var = self.push_var(VarKind::Boolean, 0, 1, name.into());
        Literal {
            var,
            positive: true,
        }
    }

    fn push_var(&mut self, kind: VarKind, lo: i64, hi: i64, name: String) -> VarId {
        let id = VarId(self.variables.len());
        self.variables.push(Variable { name, kind, lo, hi });
        id
    }

    pub fn add(&mut self, constraint: impl Into<Constraint>) -> ConstraintId {
        let id = ConstraintId(self.constraints.len());
        self.constraints.push(ConstraintSlot {
            constraint: constraint.into(),
            active: true,
        });
        id
    }

    pub fn add_max_equality(&mut self, target: VarId, vars: Vec<VarId>) -> ConstraintId {
        self.add(Constraint::MaxEquality { target, vars })
    }

    /// `literal` must hold.
    pub fn pin(&mut self, literal: Literal) -> ConstraintId {
        let value = if literal.positive { 1 } else { 0 };
        self.add(LinearConstraint::eq(vec![(1, literal.var)], value))
    }

    /// Deactivate a constraint. Returns `false` when it was already removed.
    pub fn remove(&mut self, id: ConstraintId) -> bool {
        match self.constraints.get_mut(id.0) {
            Some(slot) if slot.active => {
                slot.active = false;
                true
            }
            _ => false,
        }
    }

    pub fn is_active(&self, id: ConstraintId) -> bool {
        self.constraints.get(id.0).is_some_and(|slot| slot.active)
    }

    pub fn minimize(&mut self, terms: Vec<(i64, VarId)>) {
        self.objective = terms;
    }

    pub fn break_ties_by(&mut self, terms: Vec<(i64, VarId)>) {
        self.tie_break = terms;
    }

    pub fn bounds(&self, var: VarId) -> (i64, i64) {
        let v = &self.variables[var.0];
        (v.lo, v.hi)
    }

    /// Replace a variable's bounds (used to freeze observed facts).
    pub fn set_bounds(&mut self, var: VarId, lo: i64, hi: i64) {
        let v = &mut self.variables[var.0];
        v.lo = lo;
        v.hi = hi;
    }

    pub fn fix(&mut self, var: VarId, value: i64) {
        self.set_bounds(var, value, value);
    }

    pub fn name(&self, var: VarId) -> &str {
        &self.variables[var.0].name
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    /// Number of constraints still active.
    pub fn num_constraints(&self) -> usize {
        self.constraints.iter().filter(|slot| slot.active).count()
    }

    pub(crate) fn active_constraints<'a>(
        &'a self,
        scenario: &'a Scenario,
    ) -> impl Iterator<Item = &'a Constraint> + 'a {
        self.constraints
            .iter()
            .enumerate()
            .filter(move |(idx, slot)| {
                slot.active && !scenario.disabled.contains(&ConstraintId(*idx))
            })
            .map(|(_, slot)| &slot.constraint)
    }
}

