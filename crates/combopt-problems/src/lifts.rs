//! Lift connectivity feasibility.
//!
//! Can `lifts` lifts, each stopping at no more than `stops_per_lift` floors,
//! connect every ordered pair of floors directly? The objective is constant,
//! so the answer is the solve status.

use combopt_model::{LinearExpr, Model, ModelBuilder, SolutionStatus, SolveResult, Solver, VarGroup, VarId};
use tracing::{debug, info};

use crate::error::InvalidInstanceError;
use crate::report::Report;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiftInstance {
    pub lifts: usize,
    pub stops_per_lift: usize,
    pub floors: usize,
}

impl LiftInstance {
    fn validate(&self) -> Result<(), InvalidInstanceError> {
        if self.lifts == 0 {
            return Err(InvalidInstanceError::parameter("lifts", "at least one lift is required"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct LiftModel {
    pub model: Model,
    /// `connection[(f1 * floors + f2) * lifts + l]`
    pub connection: VarGroup,
    /// `stop[f * lifts + l]`
    pub stop: VarGroup,
    instance: LiftInstance,
}

pub fn build_lift_model(instance: &LiftInstance) -> Result<LiftModel, InvalidInstanceError> {
    instance.validate()?;
    let LiftInstance {
        lifts,
        stops_per_lift,
        floors,
    } = *instance;

    let mut builder = ModelBuilder::new("lift connectivity");
    let connection = builder.add_binary_group("connection", floors * floors * lifts);
    let stop = builder.add_binary_group("stop", floors * lifts);
    let connects = |f1: usize, f2: usize, l: usize| connection.at((f1 * floors + f2) * lifts + l);
    let stops_at = |f: usize, l: usize| stop.at(f * lifts + l);

    for f1 in 0..floors {
        for f2 in 0..floors {
            builder.add_ge(
                format!("served[{},{}]", f1, f2),
                LinearExpr::sum((0..lifts).map(|l| connects(f1, f2, l))),
                1.0,
            )?;
        }
    }

    for l in 0..lifts {
        builder.add_le(
            format!("stop budget[{}]", l),
            LinearExpr::sum((0..floors).map(|f| stops_at(f, l))),
            stops_per_lift as f64,
        )?;
    }

    for f1 in 0..floors {
        for f2 in 0..floors {
            for l in 0..lifts {
                let link = LinearExpr::var(connects(f1, f2, l));
                builder.add_activation_upper(format!("link[{},{},{}] from", f1, f2, l), stops_at(f1, l), &link, 1.0)?;
                if f2 != f1 {
                    builder.add_activation_upper(format!("link[{},{},{}] to", f1, f2, l), stops_at(f2, l), &link, 1.0)?;
                }
            }
        }
    }

    builder.maximize(LinearExpr::new())?;

    debug!(lifts, stops_per_lift, floors, "lift model assembled");
    Ok(LiftModel {
        model: builder.build()?,
        connection,
        stop,
        instance: *instance,
    })
}

/// Floors each lift stops at, one list per lift.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiftLayout {
    pub stops: Vec<Vec<usize>>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum LiftFeasibility {
    Feasible(LiftLayout),
    Infeasible,
    /// The solver gave no verdict, e.g. it timed out
    Undetermined(SolutionStatus),
}

impl LiftFeasibility {
    pub fn is_feasible(&self) -> bool {
        matches!(self, LiftFeasibility::Feasible(_))
    }
}

impl LiftModel {
    pub fn label(&self, var: VarId) -> String {
        let LiftInstance { lifts, floors, .. } = self.instance;
        if let Some(k) = self.connection.position(var) {
            let (pair, l) = (k / lifts, k % lifts);
            format!("lift {} connects floors {} and {}", l, pair / floors, pair % floors)
        } else if let Some(k) = self.stop.position(var) {
            format!("lift {} stops at floor {}", k % lifts, k / lifts)
        } else {
            var.to_string()
        }
    }

    /// Read the verdict from the solve status.
    pub fn feasibility(&self, result: &SolveResult) -> LiftFeasibility {
        match &result.status {
            SolutionStatus::Optimal => {
                let LiftInstance { lifts, floors, .. } = self.instance;
                let stops = (0..lifts)
                    .map(|l| {
                        (0..floors)
                            .filter(|&f| result.value(self.stop.at(f * lifts + l)).is_some_and(|x| x > 0.5))
                            .collect()
                    })
                    .collect();
                LiftFeasibility::Feasible(LiftLayout { stops })
            }
            SolutionStatus::Infeasible => LiftFeasibility::Infeasible,
            other => LiftFeasibility::Undetermined(other.clone()),
        }
    }

    pub fn report(&self, result: &SolveResult) -> Report {
        let report = Report::from_solve(&self.model, result, |v| self.label(v))
            .with_parameter("lifts", self.instance.lifts)
            .with_parameter("stops per lift", self.instance.stops_per_lift)
            .with_parameter("floors", self.instance.floors);
        match self.feasibility(result) {
            LiftFeasibility::Feasible(layout) => {
                let mut report = report.with_note("Every pair of floors is connected by a single lift.");
                for (l, floors) in layout.stops.iter().enumerate() {
                    report = report.with_note(format!("lift {} stops at {:?}", l, floors));
                }
                report
            }
            LiftFeasibility::Infeasible => report.with_note(format!(
                "{} floors cannot all be connected with {} lifts of {} stops",
                self.instance.floors, self.instance.lifts, self.instance.stops_per_lift
            )),
            LiftFeasibility::Undetermined(_) => report,
        }
    }
}

pub fn check_lift_feasibility(
    instance: &LiftInstance,
    solver: &dyn Solver,
) -> Result<LiftFeasibility, InvalidInstanceError> {
    let lm = build_lift_model(instance)?;
    Ok(lm.feasibility(&solver.solve(&lm.model)))
}

/// Why a floor-count search stopped.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum SearchEnd {
    /// This many floors cannot be served
    Infeasible(usize),
    LimitReached,
    Undetermined { floors: usize, status: SolutionStatus },
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct FloorSearch {
    /// Largest floor count found servable, `None` if not even one floor is
    pub max_floors: Option<usize>,
    pub ended: SearchEnd,
}

/// Try 1, 2, ... floors up to `limit` and stop at the first count that is not servable.
pub fn max_servable_floors(
    lifts: usize,
    stops_per_lift: usize,
    limit: usize,
    solver: &dyn Solver,
) -> Result<FloorSearch, InvalidInstanceError> {
    let mut max_floors = None;
    for floors in 1..=limit {
        let instance = LiftInstance {
            lifts,
            stops_per_lift,
            floors,
        };
        let ended = match check_lift_feasibility(&instance, solver)? {
            LiftFeasibility::Feasible(_) => {
                info!(floors, "floor count is servable");
                max_floors = Some(floors);
                continue;
            }
            LiftFeasibility::Infeasible => SearchEnd::Infeasible(floors),
            LiftFeasibility::Undetermined(status) => SearchEnd::Undetermined { floors, status },
        };
        return Ok(FloorSearch { max_floors, ended });
    }
    Ok(FloorSearch {
        max_floors,
        ended: SearchEnd::LimitReached,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use combopt_model::GoodLpSolver;

    fn instance(lifts: usize, stops_per_lift: usize, floors: usize) -> LiftInstance {
        LiftInstance {
            lifts,
            stops_per_lift,
            floors,
        }
    }

    #[test]
    fn test_model_structure() {
        let lm = build_lift_model(&instance(2, 2, 3)).unwrap();
        assert_eq!(lm.model.num_variables(), 3 * 3 * 2 + 3 * 2);
        // 9 pairs served, 2 stop budgets, gating: 3 same-floor pairs once and 6 others twice, per lift
        assert_eq!(lm.model.num_constraints(), 9 + 2 + (3 + 6 * 2) * 2);
        // pair (1, 2) is pair index 5
        assert_eq!(lm.label(lm.connection.at(5 * 2 + 1)), "lift 1 connects floors 1 and 2");
        assert_eq!(lm.label(lm.stop.at(2 * 2)), "lift 0 stops at floor 2");
    }

    #[test]
    fn test_single_lift() {
        let solver = GoodLpSolver::new();
        match check_lift_feasibility(&instance(1, 3, 3), &solver).unwrap() {
            LiftFeasibility::Feasible(layout) => assert_eq!(layout.stops, vec![vec![0, 1, 2]]),
            other => panic!("expected a layout, got {:?}", other),
        }
        assert_eq!(
            check_lift_feasibility(&instance(1, 3, 4), &solver).unwrap(),
            LiftFeasibility::Infeasible
        );
    }

    #[test]
    fn test_two_lifts_two_stops() {
        let solver = GoodLpSolver::new();
        assert!(check_lift_feasibility(&instance(2, 2, 2), &solver).unwrap().is_feasible());
        // three floor pairs need three lifts of two stops
        assert_eq!(
            check_lift_feasibility(&instance(2, 2, 3), &solver).unwrap(),
            LiftFeasibility::Infeasible
        );
    }

    #[test]
    fn test_infeasible_report() {
        let lm = build_lift_model(&instance(1, 2, 3)).unwrap();
        let result = GoodLpSolver::new().solve(&lm.model);
        let text = lm.report(&result).to_string();
        assert!(text.contains("INFEASIBLE"));
        assert!(text.contains("floors=3"));
    }

    #[test]
    fn test_floor_search() {
        let search = max_servable_floors(1, 3, 10, &GoodLpSolver::new()).unwrap();
        assert_eq!(search.max_floors, Some(3));
        assert_eq!(search.ended, SearchEnd::Infeasible(4));

        let search = max_servable_floors(3, 5, 2, &GoodLpSolver::new()).unwrap();
        assert_eq!(search.max_floors, Some(2));
        assert_eq!(search.ended, SearchEnd::LimitReached);
    }

    #[test]
    fn test_no_lifts_rejected() {
        assert!(matches!(
            build_lift_model(&instance(0, 3, 3)),
            Err(InvalidInstanceError::InvalidParameter { name: "lifts", .. })
        ));
    }
}
