//! Multi-period capital budgeting.
//!
//! Each project may be selected and then funded for a fraction of its
//! cashflow profile. Unspent cash is carried to the next period with
//! interest, and one extra period compounds the final balance. The model
//! maximises the capital at the end of that terminal period.

use combopt_model::{LinearExpr, Model, ModelBuilder, SolveResult, UNBOUNDED, VarGroup, VarId, VariableKind};
use tracing::debug;

use crate::error::{InvalidInstanceError, expect_finite, expect_len};
use crate::report::Report;

pub const DEFAULT_INTEREST_FACTOR: f64 = 1.1;
pub const DEFAULT_MIN_COMMITMENT: f64 = 0.1;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectPair {
    pub first: usize,
    pub second: usize,
}

/// The fraction invested in `capped` may not exceed the fraction invested in `by`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FractionCap {
    pub capped: usize,
    pub by: usize,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct CapitalBudgetInstance {
    /// New money available at the start of each period
    #[cfg_attr(feature = "serde", serde(default))]
    pub budgets: Vec<f64>,
    /// `payouts[project][period]`; negative entries are outlays
    #[cfg_attr(feature = "serde", serde(default))]
    pub payouts: Vec<Vec<f64>>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub min_projects: usize,
    pub max_projects: usize,
    /// At most one project of each pair is selected
    #[cfg_attr(feature = "serde", serde(default))]
    pub exclusive_pairs: Vec<ProjectPair>,
    /// At least one project of each pair is selected
    #[cfg_attr(feature = "serde", serde(default))]
    pub at_least_one_pairs: Vec<ProjectPair>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub fraction_caps: Vec<FractionCap>,
    /// Growth of cash carried over one period
    #[cfg_attr(feature = "serde", serde(default = "default_interest_factor"))]
    pub interest_factor: f64,
    /// Smallest fraction of a selected project that must be funded
    #[cfg_attr(feature = "serde", serde(default = "default_min_commitment"))]
    pub min_commitment: f64,
    /// Also require each period's project cashflow to stay within that period's budget
    #[cfg_attr(feature = "serde", serde(default))]
    pub cap_outflow_by_budget: bool,
}

#[cfg(feature = "serde")]
fn default_interest_factor() -> f64 {
    DEFAULT_INTEREST_FACTOR
}

#[cfg(feature = "serde")]
fn default_min_commitment() -> f64 {
    DEFAULT_MIN_COMMITMENT
}

impl CapitalBudgetInstance {
    /// Instance without side constraints: any number of projects may be selected.
    pub fn new(budgets: Vec<f64>, payouts: Vec<Vec<f64>>) -> Self {
        let max_projects = payouts.len();
        Self {
            budgets,
            payouts,
            min_projects: 0,
            max_projects,
            exclusive_pairs: Vec::new(),
            at_least_one_pairs: Vec::new(),
            fraction_caps: Vec::new(),
            interest_factor: DEFAULT_INTEREST_FACTOR,
            min_commitment: DEFAULT_MIN_COMMITMENT,
            cap_outflow_by_budget: false,
        }
    }

    pub fn num_projects(&self) -> usize {
        self.payouts.len()
    }

    pub fn num_periods(&self) -> usize {
        self.budgets.len()
    }

    fn check_project(&self, what: &str, project: usize) -> Result<(), InvalidInstanceError> {
        if project >= self.num_projects() {
            return Err(InvalidInstanceError::index(what, project, self.num_projects()));
        }
        Ok(())
    }

    fn check_pair(&self, what: &str, first: usize, second: usize) -> Result<(), InvalidInstanceError> {
        self.check_project(what, first)?;
        self.check_project(what, second)?;
        if first == second {
            return Err(InvalidInstanceError::parameter(
                "project pair",
                format!("{} pairs project {} with itself", what, first),
            ));
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), InvalidInstanceError> {
        let periods = self.num_periods();
        if periods == 0 {
            return Err(InvalidInstanceError::parameter("budgets", "at least one period is required"));
        }
        expect_finite("budgets", &self.budgets)?;
        for (project, row) in self.payouts.iter().enumerate() {
            expect_len(format!("payouts of project {} (one per period)", project).as_str(), row, periods)?;
            expect_finite("payouts", row)?;
        }

        if self.min_projects > self.max_projects {
            return Err(InvalidInstanceError::parameter(
                "min_projects",
                format!("minimum {} exceeds maximum {}", self.min_projects, self.max_projects),
            ));
        }
        if self.min_projects > self.num_projects() {
            return Err(InvalidInstanceError::parameter(
                "min_projects",
                format!("minimum {} exceeds the {} available projects", self.min_projects, self.num_projects()),
            ));
        }

        for pair in &self.exclusive_pairs {
            self.check_pair("exclusive pair", pair.first, pair.second)?;
        }
        for pair in &self.at_least_one_pairs {
            self.check_pair("at-least-one pair", pair.first, pair.second)?;
        }
        for cap in &self.fraction_caps {
            self.check_pair("fraction cap", cap.capped, cap.by)?;
        }

        if !self.interest_factor.is_finite() || self.interest_factor <= 0.0 {
            return Err(InvalidInstanceError::parameter(
                "interest_factor",
                format!("{} is not a positive number", self.interest_factor),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_commitment) {
            return Err(InvalidInstanceError::parameter(
                "min_commitment",
                format!("{} is outside [0, 1]", self.min_commitment),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CapitalBudgetModel {
    pub model: Model,
    pub selected: VarGroup,
    pub fraction: VarGroup,
    /// Cash at the end of each period, plus the terminal compounding period
    pub cash: VarGroup,
    min_projects: usize,
    max_projects: usize,
}

pub fn build_capital_budget_model(instance: &CapitalBudgetInstance) -> Result<CapitalBudgetModel, InvalidInstanceError> {
    instance.validate()?;
    let projects = instance.num_projects();
    let periods = instance.num_periods();
    let r = instance.interest_factor;

    let mut builder = ModelBuilder::new("capital budgeting");
    let selected = builder.add_binary_group("selected", projects);
    let fraction = builder.add_group("fraction", projects, VariableKind::Continuous, 0.0, 1.0)?;
    let cash = builder.add_group("cash", periods + 1, VariableKind::Continuous, 0.0, UNBOUNDED)?;

    let cashflow = |period: usize| {
        let mut flow = LinearExpr::new();
        for (p, row) in instance.payouts.iter().enumerate() {
            flow.add_term(row[period], fraction.at(p));
        }
        flow
    };

    for (t, &budget) in instance.budgets.iter().enumerate() {
        let mut balance = cashflow(t);
        balance.add_term(-1.0, cash.at(t));
        if t > 0 {
            balance.add_term(r, cash.at(t - 1));
        }
        builder.add_eq(format!("balance[{}]", t), balance, -budget)?;
    }
    let terminal = LinearExpr::var(cash.at(periods)).with_term(-r, cash.at(periods - 1));
    builder.add_eq("compounding", terminal, 0.0)?;

    if instance.cap_outflow_by_budget {
        for (t, &budget) in instance.budgets.iter().enumerate() {
            builder.add_ge(format!("outflow[{}]", t), cashflow(t), -budget)?;
        }
    }

    for p in 0..projects {
        let invested = LinearExpr::var(fraction.at(p));
        builder.add_activation_upper(format!("funded only if selected[{}]", p), selected.at(p), &invested, 1.0)?;
        builder.add_activation_lower(
            format!("minimum commitment[{}]", p),
            selected.at(p),
            &invested,
            instance.min_commitment,
        )?;
    }

    let count = LinearExpr::sum(selected.iter());
    builder.add_ge("min projects", count.clone(), instance.min_projects as f64)?;
    builder.add_le("max projects", count, instance.max_projects as f64)?;

    for (k, pair) in instance.exclusive_pairs.iter().enumerate() {
        let both = LinearExpr::sum([selected.at(pair.first), selected.at(pair.second)]);
        builder.add_le(format!("exclusive[{}]", k), both, 1.0)?;
    }
    for (k, pair) in instance.at_least_one_pairs.iter().enumerate() {
        let either = LinearExpr::sum([selected.at(pair.first), selected.at(pair.second)]);
        builder.add_ge(format!("at least one[{}]", k), either, 1.0)?;
    }
    for (k, cap) in instance.fraction_caps.iter().enumerate() {
        let gap = LinearExpr::var(fraction.at(cap.capped)).with_term(-1.0, fraction.at(cap.by));
        builder.add_le(format!("fraction cap[{}]", k), gap, 0.0)?;
    }

    builder.maximize(LinearExpr::var(cash.at(periods)))?;

    debug!(
        projects,
        periods,
        constraints = builder.num_constraints(),
        "capital budgeting model assembled"
    );
    Ok(CapitalBudgetModel {
        model: builder.build()?,
        selected,
        fraction,
        cash,
        min_projects: instance.min_projects,
        max_projects: instance.max_projects,
    })
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct InvestmentPlan {
    pub terminal_capital: f64,
    pub selected: Vec<bool>,
    pub fractions: Vec<f64>,
    /// Capital at the end of every period, terminal period last
    pub capital: Vec<f64>,
}

impl CapitalBudgetModel {
    pub fn label(&self, var: VarId) -> String {
        if let Some(p) = self.selected.position(var) {
            format!("project {} selected", p)
        } else if let Some(p) = self.fraction.position(var) {
            format!("fraction invested in project {}", p)
        } else if let Some(t) = self.cash.position(var) {
            format!("capital at end of period {}", t)
        } else {
            var.to_string()
        }
    }

    pub fn extract(&self, result: &SolveResult) -> Option<InvestmentPlan> {
        let values = |group: &VarGroup| group.iter().map(|v| result.value(v)).collect::<Option<Vec<_>>>();
        let capital = values(&self.cash)?;
        Some(InvestmentPlan {
            terminal_capital: *capital.last()?,
            selected: values(&self.selected)?.into_iter().map(|x| x > 0.5).collect(),
            fractions: values(&self.fraction)?,
            capital,
        })
    }

    pub fn report(&self, result: &SolveResult) -> Report {
        Report::from_solve(&self.model, result, |v| self.label(v))
            .with_parameter("projects", self.selected.len())
            .with_parameter("periods", self.cash.len() - 1)
            .with_parameter("selected between", format!("{}..={}", self.min_projects, self.max_projects))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use combopt_model::{GoodLpSolver, SolutionStatus, Solver};

    /// Two periods, 10 to spend up front. Project 0 returns 15 on 10, project 1 returns 12.
    fn two_projects() -> CapitalBudgetInstance {
        CapitalBudgetInstance::new(vec![10.0, 0.0], vec![vec![-10.0, 15.0], vec![-10.0, 12.0]])
    }

    fn solve(instance: &CapitalBudgetInstance) -> (CapitalBudgetModel, SolveResult) {
        let cb = build_capital_budget_model(instance).unwrap();
        let result = GoodLpSolver::new().solve(&cb.model);
        (cb, result)
    }

    #[test]
    fn test_model_structure() {
        let cb = build_capital_budget_model(&two_projects()).unwrap();
        // 2 selected, 2 fractions, 3 cash balances
        assert_eq!(cb.model.num_variables(), 7);
        // 2 balances, compounding, 2x2 activation, 2 cardinality
        assert_eq!(cb.model.num_constraints(), 9);
        assert_eq!(cb.label(cb.fraction.at(1)), "fraction invested in project 1");
        assert_eq!(cb.label(cb.cash.at(2)), "capital at end of period 2");
        assert_eq!(cb.label(cb.selected.at(0)), "project 0 selected");
    }

    #[test]
    fn test_best_project_fully_funded() {
        let (cb, result) = solve(&two_projects());
        assert!(result.is_optimal(), "status {}", result.status);
        let plan = cb.extract(&result).unwrap();

        // cash[1] = 15, then one more period of 10% interest
        assert!((plan.terminal_capital - 16.5).abs() < 1e-6, "capital = {}", plan.terminal_capital);
        assert_eq!(plan.selected, vec![true, false]);
        assert!((plan.fractions[0] - 1.0).abs() < 1e-6);
        assert!(plan.fractions[1].abs() < 1e-9);
        assert!((plan.capital[1] * 1.1 - plan.capital[2]).abs() < 1e-6);
    }

    #[test]
    fn test_minimum_commitment_when_forced() {
        let mut instance = two_projects();
        instance.min_projects = 2;
        let (cb, result) = solve(&instance);
        let plan = cb.extract(&result).unwrap();

        assert_eq!(plan.selected, vec![true, true]);
        assert!((plan.fractions[1] - 0.1).abs() < 1e-6, "fraction = {}", plan.fractions[1]);
        // 1.1 * (11 + 4 * 0.9 + 0.1)
        assert!((plan.terminal_capital - 16.17).abs() < 1e-6, "capital = {}", plan.terminal_capital);
    }

    #[test]
    fn test_side_constraints() {
        let mut instance = two_projects();
        instance.min_projects = 2;
        instance.exclusive_pairs.push(ProjectPair { first: 0, second: 1 });
        let (_, result) = solve(&instance);
        assert_eq!(result.status, SolutionStatus::Infeasible);

        let mut instance = two_projects();
        instance.fraction_caps.push(FractionCap { capped: 0, by: 1 });
        instance.at_least_one_pairs.push(ProjectPair { first: 0, second: 1 });
        let (cb, result) = solve(&instance);
        let plan = cb.extract(&result).unwrap();
        assert!(plan.fractions[0] <= plan.fractions[1] + 1e-6);
        // an even split keeps the budget: 1.1 * (11 + 4 * 0.5 + 0.5)
        assert!((plan.terminal_capital - 14.85).abs() < 1e-6, "capital = {}", plan.terminal_capital);
    }

    #[test]
    fn test_cash_balance_limits_funding() {
        let instance = CapitalBudgetInstance::new(vec![10.0, 0.0], vec![vec![-20.0, 40.0]]);
        let (cb, result) = solve(&instance);
        // cash[0] = 10 - 20 f must stay non-negative
        assert!((cb.extract(&result).unwrap().fractions[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_outflow_cap() {
        // The period-1 outlay can only be paid from carried-over cash
        let mut instance = CapitalBudgetInstance::new(vec![10.0, 0.0, 0.0], vec![vec![0.0, -11.0, 30.0]]);
        let (cb, result) = solve(&instance);
        let plan = cb.extract(&result).unwrap();
        assert!((plan.fractions[0] - 1.0).abs() < 1e-6, "fraction = {}", plan.fractions[0]);

        instance.cap_outflow_by_budget = true;
        let cb = build_capital_budget_model(&instance).unwrap();
        assert_eq!(cb.model.num_constraints(), 4 + 3 + 2 + 2);
        let plan = cb.extract(&GoodLpSolver::new().solve(&cb.model)).unwrap();
        assert!(plan.fractions[0].abs() < 1e-9, "fraction = {}", plan.fractions[0]);
        assert!((plan.terminal_capital - 10.0 * 1.1 * 1.1 * 1.1).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_instances() {
        let mut instance = two_projects();
        instance.payouts[1].push(3.0);
        assert!(matches!(
            build_capital_budget_model(&instance),
            Err(InvalidInstanceError::DimensionMismatch { expected: 2, found: 3, .. })
        ));

        let mut instance = two_projects();
        instance.min_projects = 2;
        instance.max_projects = 1;
        assert!(matches!(
            build_capital_budget_model(&instance),
            Err(InvalidInstanceError::InvalidParameter { name: "min_projects", .. })
        ));

        let mut instance = two_projects();
        instance.exclusive_pairs.push(ProjectPair { first: 0, second: 5 });
        assert!(matches!(
            build_capital_budget_model(&instance),
            Err(InvalidInstanceError::IndexOutOfRange { index: 5, len: 2, .. })
        ));

        let mut instance = two_projects();
        instance.min_commitment = 1.5;
        assert!(matches!(
            build_capital_budget_model(&instance),
            Err(InvalidInstanceError::InvalidParameter { name: "min_commitment", .. })
        ));

        let instance = CapitalBudgetInstance::new(vec![], vec![]);
        assert!(matches!(
            build_capital_budget_model(&instance),
            Err(InvalidInstanceError::InvalidParameter { name: "budgets", .. })
        ));
    }
}
