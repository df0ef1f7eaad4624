//! Result extraction and formatting.
//!
//! [`Report`] maps variable values back to readable names. The gap table
//! compares integer and relaxed solves of the same instance and writes one
//! delimited row per instance.

use std::fmt;
use std::io;

use combopt_model::{Model, SolutionStatus, SolveResult, VarId};

/// Values closer to zero than this are left out of reports.
const DISPLAY_EPSILON: f64 = 1e-9;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ReportEntry {
    pub label: String,
    pub value: f64,
}

/// Human-readable outcome of one solve
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub title: String,
    pub status: SolutionStatus,
    /// Objective value, only when optimal
    pub objective: Option<f64>,
    pub elapsed_ms: f64,
    /// Instance parameters, printed so a non-optimal outcome can be diagnosed
    pub parameters: Vec<(String, String)>,
    /// Variable values in declaration order
    pub entries: Vec<ReportEntry>,
    pub notes: Vec<String>,
}

impl Report {
    pub fn from_solve(model: &Model, result: &SolveResult, label: impl Fn(VarId) -> String) -> Self {
        let entries = if result.is_optimal() {
            model
                .var_ids()
                .filter_map(|v| result.value(v).map(|value| ReportEntry { label: label(v), value }))
                .collect()
        } else {
            Vec::new()
        };
        Self {
            title: model.name().to_string(),
            status: result.status.clone(),
            objective: result.objective(),
            elapsed_ms: result.elapsed_ms(),
            parameters: Vec::new(),
            entries,
            notes: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl fmt::Display) -> Self {
        self.parameters.push((name.into(), value.to_string()));
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn is_optimal(&self) -> bool {
        self.status == SolutionStatus::Optimal
    }

    pub fn entry(&self, label: &str) -> Option<f64> {
        self.entries.iter().find(|e| e.label == label).map(|e| e.value)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Model: {}", self.title)?;
        if !self.parameters.is_empty() {
            let params: Vec<String> = self.parameters.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            writeln!(f, "Parameters: {}", params.join(", "))?;
        }

        match &self.status {
            SolutionStatus::Optimal => {
                writeln!(f, "Status: OPTIMAL")?;
                if let Some(objective) = self.objective {
                    writeln!(f, "Objective: {:.4}", objective)?;
                }
                writeln!(f, "Run time: {:.1} ms", self.elapsed_ms)?;
                writeln!(f)?;
                for entry in self.entries.iter().filter(|e| e.value.abs() > DISPLAY_EPSILON) {
                    writeln!(f, "  {:40} {:>14.4}", entry.label, entry.value)?;
                }
            }
            SolutionStatus::Infeasible => {
                writeln!(f, "Status: INFEASIBLE")?;
                writeln!(f, "No solution exists that satisfies all constraints.")?;
            }
            SolutionStatus::Unbounded => {
                writeln!(f, "Status: UNBOUNDED")?;
                writeln!(f, "The problem has no finite optimal solution.")?;
            }
            SolutionStatus::Error(failure) => {
                writeln!(f, "Status: ERROR")?;
                writeln!(f, "Solver failed: {}", failure)?;
            }
        }

        for note in &self.notes {
            writeln!(f, "{}", note)?;
        }
        Ok(())
    }
}

/// ILP versus LP-relaxation measurement for one instance.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct GapMeasurement {
    pub ilp_objective: f64,
    pub ilp_ms: f64,
    pub lp_objective: f64,
    pub lp_ms: f64,
    /// ILP / LP; `None` when undefined
    pub ratio: Option<f64>,
}

/// Integrality gap `ilp / lp`.
///
/// Both zero gives 1. A zero relaxation under a non-zero integer optimum
/// has no finite ratio and gives `None`.
pub fn integrality_gap(ilp_objective: f64, lp_objective: f64) -> Option<f64> {
    if lp_objective.abs() <= DISPLAY_EPSILON {
        return (ilp_objective.abs() <= DISPLAY_EPSILON).then_some(1.0);
    }
    Some(ilp_objective / lp_objective)
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct GapRow {
    pub instance: String,
    /// The measurement, or why the instance could not be measured
    pub outcome: Result<GapMeasurement, String>,
}

/// Delimiter and decimal mark for delimited tables.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableFormat {
    pub delimiter: char,
    pub decimal_comma: bool,
}

impl Default for TableFormat {
    fn default() -> Self {
        Self {
            delimiter: ';',
            decimal_comma: true,
        }
    }
}

impl TableFormat {
    pub fn number(&self, value: f64) -> String {
        let text = value.to_string();
        if self.decimal_comma { text.replace('.', ",") } else { text }
    }

    fn field(&self, text: &str) -> String {
        if text.contains(self.delimiter) || text.contains('"') || text.contains('\n') {
            format!("\"{}\"", text.replace('"', "\"\""))
        } else {
            text.to_string()
        }
    }

    fn row(&self, fields: &[String]) -> String {
        let fields: Vec<String> = fields.iter().map(|f| self.field(f)).collect();
        fields.join(&self.delimiter.to_string())
    }
}

pub const GAP_TABLE_HEADER: [&str; 6] = [
    "Instance",
    "Optimal Value (ILP)",
    "Run time ILP (ms)",
    "Optimal value (LP)",
    "Run time LP (ms)",
    "ratio ILP/LP",
];

/// Write the comparison table, one row per instance.
pub fn write_gap_table<W: io::Write>(rows: &[GapRow], format: &TableFormat, mut out: W) -> io::Result<()> {
    let header: Vec<String> = GAP_TABLE_HEADER.iter().map(|h| h.to_string()).collect();
    writeln!(out, "{}", format.row(&header))?;

    for row in rows {
        let fields = match &row.outcome {
            Ok(m) => vec![
                row.instance.clone(),
                format.number(m.ilp_objective),
                format.number(m.ilp_ms),
                format.number(m.lp_objective),
                format.number(m.lp_ms),
                m.ratio.map_or_else(|| "n/a".to_string(), |r| format.number(r)),
            ],
            Err(reason) => vec![row.instance.clone(), reason.clone()],
        };
        writeln!(out, "{}", format.row(&fields))?;
    }
    out.flush()
}
