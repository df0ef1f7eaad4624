use std::collections::BTreeMap;
use std::fmt;

/// Stable index of a decision variable inside one model.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(pub(crate) usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

/// A linear expression `sum(coef * var) + constant`.
///
/// Terms are accumulated: adding a variable that is already present adds to
/// its coefficient instead of replacing it. Zero coefficients are kept so the
/// caller can see every variable it mentioned.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    terms: BTreeMap<VarId, f64>,
    constant: f64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    /// An expression holding only a constant term.
    pub fn constant(value: f64) -> Self {
        Self {
            terms: BTreeMap::new(),
            constant: value,
        }
    }

    /// `1.0 * var`
    pub fn var(var: VarId) -> Self {
        let mut expr = Self::new();
        expr.add_term(1.0, var);
        expr
    }

    /// Sum of the given variables, each with coefficient 1.
    pub fn sum<I: IntoIterator<Item = VarId>>(vars: I) -> Self {
        let mut expr = Self::new();
        for var in vars {
            expr.add_term(1.0, var);
        }
        expr
    }

    pub fn add_term(&mut self, coefficient: f64, var: VarId) -> &mut Self {
        *self.terms.entry(var).or_insert(0.0) += coefficient;
        self
    }

    /// Builder-style variant of [`LinearExpr::add_term`].
    pub fn with_term(mut self, coefficient: f64, var: VarId) -> Self {
        self.add_term(coefficient, var);
        self
    }

    pub fn add_constant(&mut self, value: f64) -> &mut Self {
        self.constant += value;
        self
    }

    /// Add every term of `other`, scaled by `factor`.
    pub fn add_scaled(&mut self, factor: f64, other: &LinearExpr) -> &mut Self {
        for (&var, &coef) in &other.terms {
            self.add_term(factor * coef, var);
        }
        self.constant += factor * other.constant;
        self
    }

    /// Remove and return the constant term.
    pub(crate) fn take_constant(&mut self) -> f64 {
        std::mem::take(&mut self.constant)
    }

    pub fn coefficient(&self, var: VarId) -> Option<f64> {
        self.terms.get(&var).copied()
    }

    pub fn terms(&self) -> impl Iterator<Item = (VarId, f64)> + '_ {
        self.terms.iter().map(|(&v, &c)| (v, c))
    }

    pub fn constant_term(&self) -> f64 {
        self.constant
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Evaluate the expression against a full value vector indexed by variable.
    /// Returns `None` when a referenced variable has no value.
    pub fn evaluate(&self, values: &[f64]) -> Option<f64> {
        let mut total = self.constant;
        for (&var, &coef) in &self.terms {
            total += coef * values.get(var.0)?;
        }
        Some(total)
    }
}

impl fmt::Display for LinearExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (var, coef) in self.terms() {
            if first {
                write!(f, "{} {}", coef, var)?;
                first = false;
            } else if coef < 0.0 {
                write!(f, " - {} {}", -coef, var)?;
            } else {
                write!(f, " + {} {}", coef, var)?;
            }
        }
        if first {
            write!(f, "{}", self.constant)
        } else if self.constant != 0.0 {
            write!(f, " + {}", self.constant)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terms_accumulate() {
        let x = VarId(0);
        let y = VarId(1);
        let mut expr = LinearExpr::new();
        expr.add_term(2.0, x).add_term(3.0, y).add_term(-0.5, x);

        assert_eq!(expr.len(), 2);
        assert_eq!(expr.coefficient(x), Some(1.5));
        assert_eq!(expr.coefficient(y), Some(3.0));
    }

    #[test]
    fn test_add_scaled() {
        let x = VarId(0);
        let y = VarId(1);
        let base = LinearExpr::sum([x, y]);
        let mut expr = LinearExpr::constant(4.0).with_term(1.0, x);
        expr.add_scaled(-2.0, &base);

        assert_eq!(expr.coefficient(x), Some(-1.0));
        assert_eq!(expr.coefficient(y), Some(-2.0));
        assert_eq!(expr.constant_term(), 4.0);
    }

    #[test]
    fn test_evaluate() {
        let expr = LinearExpr::constant(1.0)
            .with_term(2.0, VarId(0))
            .with_term(-1.0, VarId(2));

        assert_eq!(expr.evaluate(&[3.0, 100.0, 4.0]), Some(3.0));
        assert_eq!(expr.evaluate(&[3.0]), None);
    }

    #[test]
    fn test_display() {
        let expr = LinearExpr::new()
            .with_term(1.0, VarId(1))
            .with_term(-1.0, VarId(0));
        assert_eq!(expr.to_string(), "-1 x0 + 1 x1");
        assert_eq!(LinearExpr::constant(7.0).to_string(), "7");
    }
}
