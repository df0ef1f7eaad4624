//! Conditional activation ("big-M") constraints.
//!
//! A gate is a binary variable. The gated expression may only be non-zero
//! when the gate is 1:
//!
//! ```text
//! gated <= bound * gate        (upper activation)
//! gated >= bound * gate        (lower activation, minimum commitment)
//! ```
//!
//! `bound` must be an upper bound on `gated` for the upper form to be exact,
//! e.g. a plant's capacity or 1 for another binary.

use crate::error::ModelError;
use crate::expr::{LinearExpr, VarId};
use crate::problem::{ConstraintOp, ModelBuilder};

impl ModelBuilder {
    /// `gated <= bound * gate`: no activity unless the gate is open.
    pub fn add_activation_upper(
        &mut self,
        name: impl Into<String>,
        gate: VarId,
        gated: &LinearExpr,
        bound: f64,
    ) -> Result<(), ModelError> {
        self.add_activation(name, gate, gated, bound, ConstraintOp::Le)
    }

    /// `gated >= bound * gate`: at least `bound` of activity once the gate is open.
    pub fn add_activation_lower(
        &mut self,
        name: impl Into<String>,
        gate: VarId,
        gated: &LinearExpr,
        bound: f64,
    ) -> Result<(), ModelError> {
        self.add_activation(name, gate, gated, bound, ConstraintOp::Ge)
    }

    fn add_activation(
        &mut self,
        name: impl Into<String>,
        gate: VarId,
        gated: &LinearExpr,
        bound: f64,
        op: ConstraintOp,
    ) -> Result<(), ModelError> {
        let name = name.into();
        if !bound.is_finite() {
            return Err(ModelError::NonFiniteCoefficient { context: name, var: gate });
        }
        let mut expr = gated.clone();
        expr.add_term(-bound, gate);
        self.add_constraint(name, expr, op, 0.0)
    }
}
