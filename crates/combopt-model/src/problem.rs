use tracing::debug;

use crate::error::ModelError;
use crate::expr::{LinearExpr, VarId};

/// Upper bound used for variables without a natural limit.
///
/// Solvers expect a finite number here, so "unbounded" is the largest finite
/// `f64` rather than infinity.
pub const UNBOUNDED: f64 = f64::MAX;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    Continuous,
    Integer,
}

/// A registered decision variable
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    /// Human-readable name, e.g. `open[3]`
    pub name: String,
    pub kind: VariableKind,
    pub lower: f64,
    pub upper: f64,
}

impl Variable {
    /// Integer variable with bounds [0, 1]
    pub fn is_binary(&self) -> bool {
        self.kind == VariableKind::Integer && self.lower == 0.0 && self.upper == 1.0
    }

    pub fn has_upper_bound(&self) -> bool {
        self.upper < UNBOUNDED
    }
}

/// A contiguous block of variables declared together, e.g. "plant open" per site.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarGroup {
    name: String,
    first: usize,
    len: usize,
}

impl VarGroup {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, i: usize) -> Option<VarId> {
        (i < self.len).then_some(VarId(self.first + i))
    }

    /// Variable `i` of the group.
    ///
    /// # Panics
    /// Panics if `i` is outside the group, like slice indexing.
    pub fn at(&self, i: usize) -> VarId {
        assert!(i < self.len, "index {} out of range for group '{}' of {}", i, self.name, self.len);
        VarId(self.first + i)
    }

    pub fn iter(&self) -> impl Iterator<Item = VarId> + '_ {
        (self.first..self.first + self.len).map(VarId)
    }

    pub fn contains(&self, var: VarId) -> bool {
        var.0 >= self.first && var.0 < self.first + self.len
    }

    /// Position of `var` inside the group.
    pub fn position(&self, var: VarId) -> Option<usize> {
        self.contains(var).then(|| var.0 - self.first)
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintOp {
    /// Less than or equal (<=)
    Le,
    /// Greater than or equal (>=)
    Ge,
    /// Equal (=)
    Eq,
}

impl ConstraintOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ConstraintOp::Le => "<=",
            ConstraintOp::Ge => ">=",
            ConstraintOp::Eq => "=",
        }
    }

    /// Whether `lhs op rhs` holds within `tolerance`.
    pub fn holds(self, lhs: f64, rhs: f64, tolerance: f64) -> bool {
        match self {
            ConstraintOp::Le => lhs <= rhs + tolerance,
            ConstraintOp::Ge => lhs >= rhs - tolerance,
            ConstraintOp::Eq => (lhs - rhs).abs() <= tolerance,
        }
    }
}

/// A constraint frozen into a model. Only readable once added.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    name: String,
    expr: LinearExpr,
    op: ConstraintOp,
    rhs: f64,
}

impl Constraint {
    /// Name/label for the constraint (for diagnostics)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Left-hand side. Never carries a constant term; it is folded into the rhs.
    pub fn expr(&self) -> &LinearExpr {
        &self.expr
    }

    pub fn op(&self) -> ConstraintOp {
        self.op
    }

    pub fn rhs(&self) -> f64 {
        self.rhs
    }

    /// Check the constraint against a full value vector.
    pub fn is_satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        self.expr
            .evaluate(values)
            .is_some_and(|lhs| self.op.holds(lhs, self.rhs, tolerance))
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Minimize,
    Maximize,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Objective {
    pub sense: Sense,
    pub expr: LinearExpr,
}

/// A fully specified linear / integer model, ready for a [`crate::Solver`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    name: String,
    variables: Vec<Variable>,
    constraints: Vec<Constraint>,
    objective: Objective,
}

impl Model {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Every variable id, in declaration order.
    pub fn var_ids(&self) -> impl Iterator<Item = VarId> + '_ {
        (0..self.variables.len()).map(VarId)
    }

    pub fn variable(&self, var: VarId) -> Option<&Variable> {
        self.variables.get(var.0)
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn num_integer_variables(&self) -> usize {
        self.variables
            .iter()
            .filter(|v| v.kind == VariableKind::Integer)
            .count()
    }

    /// The LP relaxation: every integer variable becomes continuous over the same bounds.
    pub fn relaxed(&self) -> Model {
        let mut relaxed = self.clone();
        relaxed.name = format!("{} (LP relaxation)", self.name);
        for var in &mut relaxed.variables {
            var.kind = VariableKind::Continuous;
        }
        relaxed
    }

    /// Re-check the invariants the builder enforces.
    pub fn validate(&self) -> Result<(), ModelError> {
        for var in &self.variables {
            check_bounds(&var.name, var.lower, var.upper)?;
        }
        for c in &self.constraints {
            check_expr(&c.name, &c.expr, self.variables.len())?;
            if !c.rhs.is_finite() {
                return Err(ModelError::NonFiniteRhs(c.name.clone()));
            }
        }
        check_expr("objective", &self.objective.expr, self.variables.len())
    }

    /// Whether every constraint and bound holds for `values`.
    pub fn is_feasible(&self, values: &[f64], tolerance: f64) -> bool {
        values.len() == self.variables.len()
            && self.variables.iter().zip(values).all(|(var, &x)| {
                x >= var.lower - tolerance
                    && x <= var.upper + tolerance
                    && (var.kind == VariableKind::Continuous || (x - x.round()).abs() <= tolerance)
            })
            && self.constraints.iter().all(|c| c.is_satisfied(values, tolerance))
    }
}

/// Accumulates variables and constraints for exactly one model.
///
/// Constraint assembly is append-only: once an expression is handed to
/// [`ModelBuilder::add_constraint`] it is frozen into the model.
#[derive(Debug)]
pub struct ModelBuilder {
    name: String,
    variables: Vec<Variable>,
    constraints: Vec<Constraint>,
    objective: Option<Objective>,
}

impl ModelBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: Vec::new(),
            constraints: Vec::new(),
            objective: None,
        }
    }

    pub fn add_variable(
        &mut self,
        name: impl Into<String>,
        kind: VariableKind,
        lower: f64,
        upper: f64,
    ) -> Result<VarId, ModelError> {
        let name = name.into();
        check_bounds(&name, lower, upper)?;
        self.variables.push(Variable { name, kind, lower, upper });
        Ok(VarId(self.variables.len() - 1))
    }

    pub fn add_binary(&mut self, name: impl Into<String>) -> VarId {
        self.variables.push(Variable {
            name: name.into(),
            kind: VariableKind::Integer,
            lower: 0.0,
            upper: 1.0,
        });
        VarId(self.variables.len() - 1)
    }

    pub fn add_continuous(&mut self, name: impl Into<String>, lower: f64, upper: f64) -> Result<VarId, ModelError> {
        self.add_variable(name, VariableKind::Continuous, lower, upper)
    }

    /// Declare `len` variables named `name[0]`, `name[1]`, ...
    pub fn add_group(
        &mut self,
        name: impl Into<String>,
        len: usize,
        kind: VariableKind,
        lower: f64,
        upper: f64,
    ) -> Result<VarGroup, ModelError> {
        let name = name.into();
        check_bounds(&name, lower, upper)?;
        let first = self.variables.len();
        self.variables.extend((0..len).map(|i| Variable {
            name: format!("{}[{}]", name, i),
            kind,
            lower,
            upper,
        }));
        Ok(VarGroup { name, first, len })
    }

    pub fn add_binary_group(&mut self, name: impl Into<String>, len: usize) -> VarGroup {
        let name = name.into();
        let first = self.variables.len();
        self.variables.extend((0..len).map(|i| Variable {
            name: format!("{}[{}]", name, i),
            kind: VariableKind::Integer,
            lower: 0.0,
            upper: 1.0,
        }));
        VarGroup { name, first, len }
    }

    /// Freeze `expr op rhs` into the model. A constant term in `expr` is moved to the rhs.
    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        mut expr: LinearExpr,
        op: ConstraintOp,
        rhs: f64,
    ) -> Result<(), ModelError> {
        let name = name.into();
        check_expr(&name, &expr, self.variables.len())?;
        let rhs = rhs - expr.take_constant();
        if !rhs.is_finite() {
            return Err(ModelError::NonFiniteRhs(name));
        }
        self.constraints.push(Constraint { name, expr, op, rhs });
        Ok(())
    }

    pub fn add_le(&mut self, name: impl Into<String>, expr: LinearExpr, rhs: f64) -> Result<(), ModelError> {
        self.add_constraint(name, expr, ConstraintOp::Le, rhs)
    }

    pub fn add_ge(&mut self, name: impl Into<String>, expr: LinearExpr, rhs: f64) -> Result<(), ModelError> {
        self.add_constraint(name, expr, ConstraintOp::Ge, rhs)
    }

    pub fn add_eq(&mut self, name: impl Into<String>, expr: LinearExpr, rhs: f64) -> Result<(), ModelError> {
        self.add_constraint(name, expr, ConstraintOp::Eq, rhs)
    }

    /// Accounting identity `var = expr`, stored as `expr - var = 0`.
    pub fn define(&mut self, name: impl Into<String>, var: VarId, expr: &LinearExpr) -> Result<(), ModelError> {
        let mut identity = expr.clone();
        identity.add_term(-1.0, var);
        self.add_eq(name, identity, 0.0)
    }

    pub fn minimize(&mut self, expr: LinearExpr) -> Result<(), ModelError> {
        self.set_objective(Sense::Minimize, expr)
    }

    pub fn maximize(&mut self, expr: LinearExpr) -> Result<(), ModelError> {
        self.set_objective(Sense::Maximize, expr)
    }

    pub fn set_objective(&mut self, sense: Sense, expr: LinearExpr) -> Result<(), ModelError> {
        check_expr("objective", &expr, self.variables.len())?;
        self.objective = Some(Objective { sense, expr });
        Ok(())
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn build(self) -> Result<Model, ModelError> {
        let objective = self
            .objective
            .ok_or_else(|| ModelError::MissingObjective(self.name.clone()))?;
        debug!(
            model = %self.name,
            variables = self.variables.len(),
            constraints = self.constraints.len(),
            "model built"
        );
        Ok(Model {
            name: self.name,
            variables: self.variables,
            constraints: self.constraints,
            objective,
        })
    }
}

fn check_bounds(name: &str, lower: f64, upper: f64) -> Result<(), ModelError> {
    if lower.is_nan() || upper.is_nan() || lower > upper || lower.is_infinite() && lower > 0.0 {
        return Err(ModelError::InvalidBounds {
            name: name.to_string(),
            lower,
            upper,
        });
    }
    Ok(())
}

fn check_expr(context: &str, expr: &LinearExpr, num_variables: usize) -> Result<(), ModelError> {
    for (var, coef) in expr.terms() {
        if var.0 >= num_variables {
            return Err(ModelError::UnknownVariable {
                constraint: context.to_string(),
                var,
            });
        }
        if !coef.is_finite() {
            return Err(ModelError::NonFiniteCoefficient {
                context: context.to_string(),
                var,
            });
        }
    }
    if !expr.constant_term().is_finite() {
        return Err(ModelError::NonFiniteRhs(context.to_string()));
    }
    Ok(())
}
