mod config;

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use combopt_model::{GoodLpSolver, Solver};
use combopt_problems::{
    CapitalBudgetInstance, CrashingInstance, EdgeOrientation, FacilityInstance, GapRow, Graph, LiftInstance, Report,
    SearchEnd, build_capital_budget_model, build_crashing_model, build_facility_model, build_lift_model,
    build_shortest_path_model, gap_row, max_servable_floors, read_budget, read_graph, read_payouts, write_gap_table,
};
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::config::{Settings, parse_time_limit};

#[derive(Parser)]
#[command(name = "combopt")]
#[command(about = "Build and solve small combinatorial optimisation models", long_about = None)]
struct Cli {
    /// Settings file (logging, solver, report)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Pretty)]
    format: OutputFormat,
    /// Per-solve time limit in seconds, overriding the settings file
    #[arg(long, global = true)]
    time_limit: Option<f64>,
    /// Field separator in graph files, overriding the settings file
    #[arg(long, global = true)]
    graph_delimiter: Option<char>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Pretty,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Capacitated facility location from a TOML instance
    Facility {
        instance: PathBuf,
    },
    /// Task crashing from a TOML instance
    Crashing {
        instance: PathBuf,
    },
    /// Multi-period capital budgeting
    Budget {
        /// TOML instance with the side constraints
        instance: PathBuf,
        /// Budget file (period count, then one budget per period)
        #[arg(long)]
        budget: Option<PathBuf>,
        /// Payout matrix file (rows, columns, then the rows)
        #[arg(long)]
        payouts: Option<PathBuf>,
    },
    /// Shortest path through the LP dual
    ShortestPath {
        graph: PathBuf,
        #[arg(long)]
        source: usize,
        #[arg(long)]
        dest: usize,
        /// Treat every edge as usable in both directions
        #[arg(long)]
        undirected: bool,
    },
    /// Compare ILP and LP optima of the dominating-set model over graph files
    DominatingSet {
        #[arg(required = true)]
        graphs: Vec<PathBuf>,
        /// Table file, overriding the settings file
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        delimiter: Option<char>,
        /// Write decimals with a comma (true) or a period (false)
        #[arg(long)]
        decimal_comma: Option<bool>,
    },
    /// Lift connectivity feasibility
    Lifts {
        #[arg(long)]
        lifts: usize,
        #[arg(long)]
        stops: usize,
        #[arg(long, required_unless_present = "search")]
        floors: Option<usize>,
        /// Search for the largest servable floor count up to this limit
        #[arg(long, conflicts_with = "floors")]
        search: Option<usize>,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    let time_limit = match cli.time_limit {
        Some(secs) => Some(parse_time_limit(secs).context("--time-limit")?),
        None => settings.solver.time_limit(),
    };
    settings.logging.init();

    let solver = match time_limit {
        Some(limit) => GoodLpSolver::new().with_time_limit(limit),
        None => GoodLpSolver::new(),
    };
    let format = cli.format;
    let graph_delimiter = cli.graph_delimiter.or(settings.input.delimiter);

    match cli.command {
        Commands::Facility { instance } => {
            let instance: FacilityInstance = load_toml(&instance)?;
            let fm = build_facility_model(&instance)?;
            emit_report(&fm.report(&solver.solve(&fm.model)), format)
        }
        Commands::Crashing { instance } => {
            let instance: CrashingInstance = load_toml(&instance)?;
            let cm = build_crashing_model(&instance)?;
            emit_report(&cm.report(&solver.solve(&cm.model)), format)
        }
        Commands::Budget {
            instance,
            budget,
            payouts,
        } => {
            let mut instance: CapitalBudgetInstance = load_toml(&instance)?;
            if let Some(path) = budget {
                instance.budgets = read_budget(path)?;
            }
            if let Some(path) = payouts {
                instance.payouts = read_payouts(path)?;
            }
            let cb = build_capital_budget_model(&instance)?;
            emit_report(&cb.report(&solver.solve(&cb.model)), format)
        }
        Commands::ShortestPath {
            graph,
            source,
            dest,
            undirected,
        } => {
            let graph = load_graph(&graph, graph_delimiter)?;
            let orientation = if undirected {
                EdgeOrientation::Undirected
            } else {
                EdgeOrientation::Directed
            };
            let sp = build_shortest_path_model(&graph, source, dest, orientation)?;
            emit_report(&sp.report(&solver.solve(&sp.model)), format)
        }
        Commands::DominatingSet {
            graphs,
            output,
            delimiter,
            decimal_comma,
        } => {
            let mut table = settings.report.table_format();
            if let Some(d) = delimiter {
                table.delimiter = d;
            }
            if let Some(comma) = decimal_comma {
                table.decimal_comma = comma;
            }
            let output = output.unwrap_or_else(|| settings.report.output.clone());

            let rows: Vec<GapRow> = graphs
                .iter()
                .map(|path| measure_graph(path, graph_delimiter, &solver))
                .collect();
            let file = File::create(&output).with_context(|| format!("cannot create {}", output.display()))?;
            write_gap_table(&rows, &table, BufWriter::new(file))
                .with_context(|| format!("cannot write {}", output.display()))?;
            info!(instances = rows.len(), output = %output.display(), "comparison table written");

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
                OutputFormat::Pretty => {
                    for row in &rows {
                        match &row.outcome {
                            Ok(m) => println!(
                                "{}: ILP {} ({:.1} ms), LP {} ({:.1} ms), ratio {}",
                                row.instance,
                                m.ilp_objective,
                                m.ilp_ms,
                                m.lp_objective,
                                m.lp_ms,
                                m.ratio.map_or_else(|| "n/a".to_string(), |r| format!("{:.4}", r))
                            ),
                            Err(reason) => println!("{}: failed: {}", row.instance, reason),
                        }
                    }
                    println!("Table written to {}", output.display());
                }
            }
            Ok(())
        }
        Commands::Lifts {
            lifts,
            stops,
            floors,
            search,
        } => match (search, floors) {
            (Some(limit), _) => {
                let result = max_servable_floors(lifts, stops, limit, &solver)?;
                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
                    OutputFormat::Pretty => {
                        match result.max_floors {
                            Some(n) => println!("{} lifts with {} stops each serve up to {} floors", lifts, stops, n),
                            None => println!("{} lifts with {} stops each cannot serve a single floor", lifts, stops),
                        }
                        match result.ended {
                            SearchEnd::Infeasible(n) => println!("{} floors are not servable", n),
                            SearchEnd::LimitReached => println!("Search stopped at the limit of {} floors", limit),
                            SearchEnd::Undetermined { floors, status } => {
                                println!("No verdict for {} floors: {}", floors, status)
                            }
                        }
                    }
                }
                Ok(())
            }
            (None, Some(floors)) => {
                let lm = build_lift_model(&LiftInstance {
                    lifts,
                    stops_per_lift: stops,
                    floors,
                })?;
                emit_report(&lm.report(&solver.solve(&lm.model)), format)
            }
            (None, None) => anyhow::bail!("either --floors or --search is required"),
        },
    }
}

fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("invalid instance in {}", path.display()))
}

fn load_graph(path: &Path, delimiter: Option<char>) -> Result<Graph> {
    let data = read_graph(path, delimiter)?;
    Graph::load(data).with_context(|| format!("invalid graph in {}", path.display()))
}

/// One table row per graph file; a file that fails to load becomes a failed row.
fn measure_graph(path: &Path, delimiter: Option<char>, solver: &dyn Solver) -> GapRow {
    let name = path
        .file_stem()
        .map_or_else(|| path.display().to_string(), |s| s.to_string_lossy().into_owned());
    match load_graph(path, delimiter) {
        Ok(graph) => {
            let row = gap_row(name, &graph, solver);
            if let Err(reason) = &row.outcome {
                warn!(instance = %row.instance, %reason, "instance could not be measured");
            }
            row
        }
        Err(e) => {
            warn!(instance = %name, error = %format!("{:#}", e), "instance skipped");
            GapRow {
                instance: name,
                outcome: Err(format!("{:#}", e)),
            }
        }
    }
}

fn emit_report(report: &Report, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Pretty => print!("{}", report),
    }
    if !report.is_optimal() {
        warn!(model = %report.title, status = %report.status, "no optimal solution");
    }
    Ok(())
}
