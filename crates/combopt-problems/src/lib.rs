pub mod capital_budget;
pub mod crashing;
pub mod dominating_set;
pub mod error;
pub mod facility;
pub mod graph;
pub mod lifts;
pub mod reader;
pub mod report;
pub mod shortest_path;

pub use capital_budget::{
    CapitalBudgetInstance, CapitalBudgetModel, FractionCap, InvestmentPlan, ProjectPair, build_capital_budget_model,
};
pub use crashing::{CrashingInstance, CrashingModel, CrashingSchedule, TaskMode, TaskPath, build_crashing_model};
pub use dominating_set::{DominatingSetModel, RelaxationError, build_dominating_set_model, compare_relaxation, gap_row};
pub use error::{InvalidInstanceError, MalformedInputError};
pub use facility::{FacilityInstance, FacilityModel, FacilityPlan, SitePlan, build_facility_model};
pub use graph::{Edge, Graph, GraphData, Node};
pub use lifts::{
    FloorSearch, LiftFeasibility, LiftInstance, LiftLayout, LiftModel, SearchEnd, build_lift_model,
    check_lift_feasibility, max_servable_floors,
};
pub use reader::{ReadError, read_budget, read_graph, read_payouts};
pub use report::{GapMeasurement, GapRow, Report, ReportEntry, TableFormat, integrality_gap, write_gap_table};
pub use shortest_path::{EdgeOrientation, ShortestPathModel, build_shortest_path_model, shortest_distances};
