//! Capacitated facility location.
//!
//! Choose which plants to build and how much of each product every built
//! plant makes, so that demand is met exactly at minimum build plus
//! production cost.

use combopt_model::{LinearExpr, Model, ModelBuilder, SolveResult, UNBOUNDED, VarGroup, VarId, VariableKind};
use tracing::debug;

use crate::error::{InvalidInstanceError, expect_len, expect_non_negative};
use crate::report::Report;

/// Build costs are quoted in thousands.
pub const DEFAULT_BUILD_COST_SCALE: f64 = 1000.0;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct FacilityInstance {
    /// Fixed cost of building each site, in units of `build_cost_scale`
    pub build_costs: Vec<f64>,
    /// Total production capacity of each site
    pub capacities: Vec<f64>,
    /// Required amount of each product
    pub demand: Vec<f64>,
    /// `unit_costs[site][product]`
    pub unit_costs: Vec<Vec<f64>>,
    #[cfg_attr(feature = "serde", serde(default = "default_build_cost_scale"))]
    pub build_cost_scale: f64,
}

#[cfg(feature = "serde")]
fn default_build_cost_scale() -> f64 {
    DEFAULT_BUILD_COST_SCALE
}

impl FacilityInstance {
    pub fn num_sites(&self) -> usize {
        self.build_costs.len()
    }

    pub fn num_products(&self) -> usize {
        self.demand.len()
    }

    fn validate(&self) -> Result<(), InvalidInstanceError> {
        let sites = self.num_sites();
        expect_len("capacities (one per site)", &self.capacities, sites)?;
        expect_len("unit cost rows (one per site)", &self.unit_costs, sites)?;
        for (site, row) in self.unit_costs.iter().enumerate() {
            expect_len(format!("unit costs of site {} (one per product)", site).as_str(), row, self.num_products())?;
            expect_non_negative("unit_costs", row)?;
        }
        expect_non_negative("build_costs", &self.build_costs)?;
        expect_non_negative("capacities", &self.capacities)?;
        expect_non_negative("demand", &self.demand)?;
        if !self.build_cost_scale.is_finite() || self.build_cost_scale <= 0.0 {
            return Err(InvalidInstanceError::parameter(
                "build_cost_scale",
                format!("{} is not a positive number", self.build_cost_scale),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct FacilityModel {
    pub model: Model,
    /// Plant open indicator per site
    pub open: VarGroup,
    /// Production per site and product, at `site * products + product`
    pub production: VarGroup,
    pub total_cost: VarId,
    products: usize,
}

/// Build the facility-location model.
///
/// Production at a site is gated by its open indicator with the site's
/// capacity as the bound, and each product's production sums to its demand.
/// The objective minimises an auxiliary `total cost` variable tied to the
/// cost expression by an equality.
pub fn build_facility_model(instance: &FacilityInstance) -> Result<FacilityModel, InvalidInstanceError> {
    instance.validate()?;
    let sites = instance.num_sites();
    let products = instance.num_products();

    let mut builder = ModelBuilder::new("facility location");
    let open = builder.add_binary_group("open", sites);
    let production = builder.add_group("produce", sites * products, VariableKind::Continuous, 0.0, UNBOUNDED)?;
    let total_cost = builder.add_continuous("total cost", 0.0, UNBOUNDED)?;

    let produced = |site: usize, product: usize| production.at(site * products + product);

    for site in 0..sites {
        let site_output = LinearExpr::sum((0..products).map(|p| produced(site, p)));
        builder.add_activation_upper(
            format!("capacity[{}]", site),
            open.at(site),
            &site_output,
            instance.capacities[site],
        )?;
    }

    for (product, &demand) in instance.demand.iter().enumerate() {
        let supply = LinearExpr::sum((0..sites).map(|s| produced(s, product)));
        builder.add_eq(format!("demand[{}]", product), supply, demand)?;
    }

    let mut cost = LinearExpr::new();
    for site in 0..sites {
        cost.add_term(instance.build_costs[site] * instance.build_cost_scale, open.at(site));
        for product in 0..products {
            cost.add_term(instance.unit_costs[site][product], produced(site, product));
        }
    }
    builder.define("total cost", total_cost, &cost)?;
    builder.minimize(LinearExpr::var(total_cost))?;

    debug!(sites, products, "facility model assembled");
    Ok(FacilityModel {
        model: builder.build()?,
        open,
        production,
        total_cost,
        products,
    })
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SitePlan {
    pub open: bool,
    /// Amount of each product made at the site
    pub production: Vec<f64>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct FacilityPlan {
    pub total_cost: f64,
    pub sites: Vec<SitePlan>,
}

impl FacilityModel {
    pub fn num_products(&self) -> usize {
        self.products
    }

    pub fn production_var(&self, site: usize, product: usize) -> VarId {
        self.production.at(site * self.products + product)
    }

    pub fn label(&self, var: VarId) -> String {
        if let Some(site) = self.open.position(var) {
            format!("plant {} open", site)
        } else if let Some(k) = self.production.position(var) {
            format!("plant {} product {} produced", k / self.products, k % self.products)
        } else if var == self.total_cost {
            "total cost".to_string()
        } else {
            var.to_string()
        }
    }

    /// The plan behind an optimal result; `None` for any other status.
    pub fn extract(&self, result: &SolveResult) -> Option<FacilityPlan> {
        let sites = self
            .open
            .iter()
            .enumerate()
            .map(|(site, open)| {
                Some(SitePlan {
                    open: result.value(open)? > 0.5,
                    production: (0..self.products)
                        .map(|p| result.value(self.production_var(site, p)))
                        .collect::<Option<Vec<_>>>()?,
                })
            })
            .collect::<Option<Vec<_>>>()?;
        Some(FacilityPlan {
            total_cost: result.value(self.total_cost)?,
            sites,
        })
    }

    pub fn report(&self, result: &SolveResult) -> Report {
        Report::from_solve(&self.model, result, |v| self.label(v))
            .with_parameter("sites", self.open.len())
            .with_parameter("products", self.products)
    }
}
