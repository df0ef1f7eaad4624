//! Readers for the plain-text instance formats.
//!
//! Graph files:
//!
//! ```text
//! 3            node count
//! 2            edge count
//! 0<TAB>1.5    one "id, weight" record per node
//! 1<TAB>2
//! 2<TAB>1
//! 0<TAB>1<TAB>5   one "from, to[, weight]" record per edge
//! 1<TAB>2<TAB>3
//! ```
//!
//! Budget files hold whitespace-separated numbers: the period count followed
//! by one budget per period. Payout matrices hold the row count, the column
//! count, then one whitespace-separated row per project.
//!
//! A record past the declared edge count is a syntax error on its line, which
//! usually means a node line too many. Short files parse, and the missing
//! records are reported by [`Graph::load`](crate::Graph::load).

use std::path::Path;

use crate::error::MalformedInputError;
use crate::graph::{Edge, GraphData, Node};

/// Edge weight used when an edge record has only two fields.
pub const DEFAULT_EDGE_WEIGHT: f64 = 1.0;

/// Line-oriented cursor over non-blank lines, keeping 1-based line numbers.
struct Records<'a> {
    lines: Vec<(usize, &'a str)>,
    pos: usize,
}

impl<'a> Records<'a> {
    fn new(source: &'a str) -> Self {
        let lines = source
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty())
            .collect();
        Self { lines, pos: 0 }
    }

    fn is_done(&self) -> bool {
        self.pos >= self.lines.len()
    }

    fn advance(&mut self) -> Option<(usize, &'a str)> {
        let line = self.lines.get(self.pos).copied();
        self.pos += 1;
        line
    }

    fn expect_line(&mut self, what: &str) -> Result<(usize, &'a str), MalformedInputError> {
        self.advance()
            .ok_or_else(|| MalformedInputError::UnexpectedEof(what.to_string()))
    }

    fn expect_count(&mut self, what: &str) -> Result<usize, MalformedInputError> {
        let (line, text) = self.expect_line(what)?;
        parse_usize(line, text, what)
    }
}

fn syntax(line: usize, message: impl Into<String>) -> MalformedInputError {
    MalformedInputError::Syntax {
        line,
        message: message.into(),
    }
}

fn parse_usize(line: usize, text: &str, what: &str) -> Result<usize, MalformedInputError> {
    text.trim()
        .parse()
        .map_err(|_| syntax(line, format!("expected {} as a non-negative integer, found '{}'", what, text)))
}

fn parse_f64(line: usize, text: &str, what: &str) -> Result<f64, MalformedInputError> {
    let value: f64 = text
        .trim()
        .parse()
        .map_err(|_| syntax(line, format!("expected {} as a number, found '{}'", what, text)))?;
    if !value.is_finite() {
        return Err(syntax(line, format!("{} must be finite, found '{}'", what, text)));
    }
    Ok(value)
}

fn split_fields(text: &str, delimiter: Option<char>) -> Vec<&str> {
    match delimiter {
        Some(d) => text.split(d).map(str::trim).filter(|f| !f.is_empty()).collect(),
        None => text.split_whitespace().collect(),
    }
}

/// Parse a graph file. `delimiter` of `None` splits on any whitespace.
pub fn parse_graph(source: &str, delimiter: Option<char>) -> Result<GraphData, MalformedInputError> {
    let mut records = Records::new(source);
    let declared_nodes = records.expect_count("node count")?;
    let declared_edges = records.expect_count("edge count")?;

    let mut nodes = Vec::with_capacity(declared_nodes);
    while nodes.len() < declared_nodes && !records.is_done() {
        let (line, text) = records.expect_line("node record")?;
        let fields = split_fields(text, delimiter);
        if fields.len() != 2 {
            return Err(syntax(
                line,
                format!("node record needs 2 fields (id, weight), found {}", fields.len()),
            ));
        }
        nodes.push(Node {
            id: parse_usize(line, fields[0], "node id")?,
            weight: parse_f64(line, fields[1], "node weight")?,
        });
    }

    let mut edges = Vec::with_capacity(declared_edges);
    while let Some((line, text)) = records.advance() {
        if edges.len() == declared_edges {
            return Err(syntax(
                line,
                format!(
                    "record past the declared {} nodes and {} edges; check the node count",
                    declared_nodes, declared_edges
                ),
            ));
        }
        let fields = split_fields(text, delimiter);
        let weight = match fields.len() {
            2 => DEFAULT_EDGE_WEIGHT,
            3 => parse_f64(line, fields[2], "edge weight")?,
            n => {
                return Err(syntax(
                    line,
                    format!("edge record needs 2 or 3 fields (from, to[, weight]), found {}", n),
                ));
            }
        };
        edges.push(Edge {
            from: parse_usize(line, fields[0], "edge endpoint")?,
            to: parse_usize(line, fields[1], "edge endpoint")?,
            weight,
        });
    }

    Ok(GraphData {
        declared_nodes,
        declared_edges,
        nodes,
        edges,
    })
}

/// Parse a budget file: period count then one budget per period.
pub fn parse_budget(source: &str) -> Result<Vec<f64>, MalformedInputError> {
    let mut tokens = source
        .lines()
        .enumerate()
        .flat_map(|(i, line)| line.split_whitespace().map(move |t| (i + 1, t)));

    let (line, first) = tokens
        .next()
        .ok_or_else(|| MalformedInputError::UnexpectedEof("period count".to_string()))?;
    let periods = parse_usize(line, first, "period count")?;

    let budgets = tokens
        .map(|(line, t)| parse_f64(line, t, "budget"))
        .collect::<Result<Vec<_>, _>>()?;
    if budgets.len() != periods {
        return Err(MalformedInputError::CountMismatch {
            what: "budget periods",
            declared: periods,
            found: budgets.len(),
        });
    }
    Ok(budgets)
}

/// Parse a payout matrix: row count, column count, then the rows.
pub fn parse_payouts(source: &str) -> Result<Vec<Vec<f64>>, MalformedInputError> {
    let mut records = Records::new(source);
    let rows = records.expect_count("row count")?;
    let cols = records.expect_count("column count")?;

    let mut matrix = Vec::with_capacity(rows);
    while let Some((line, text)) = records.advance() {
        let row = text
            .split_whitespace()
            .map(|t| parse_f64(line, t, "payout"))
            .collect::<Result<Vec<_>, _>>()?;
        if row.len() != cols {
            return Err(MalformedInputError::CountMismatch {
                what: "payout columns",
                declared: cols,
                found: row.len(),
            });
        }
        matrix.push(row);
    }
    if matrix.len() != rows {
        return Err(MalformedInputError::CountMismatch {
            what: "payout rows",
            declared: rows,
            found: matrix.len(),
        });
    }
    Ok(matrix)
}

/// Errors from reading an instance file from disk.
#[derive(thiserror::Error, Debug)]
pub enum ReadError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: {source}")]
    Malformed {
        path: String,
        #[source]
        source: MalformedInputError,
    },
}

fn read_with<T>(
    path: &Path,
    parse: impl FnOnce(&str) -> Result<T, MalformedInputError>,
) -> Result<T, ReadError> {
    let display = path.display().to_string();
    let source = std::fs::read_to_string(path).map_err(|source| ReadError::Io {
        path: display.clone(),
        source,
    })?;
    parse(&source).map_err(|source| ReadError::Malformed { path: display, source })
}

pub fn read_graph(path: impl AsRef<Path>, delimiter: Option<char>) -> Result<GraphData, ReadError> {
    read_with(path.as_ref(), |s| parse_graph(s, delimiter))
}

pub fn read_budget(path: impl AsRef<Path>) -> Result<Vec<f64>, ReadError> {
    read_with(path.as_ref(), parse_budget)
}

pub fn read_payouts(path: impl AsRef<Path>) -> Result<Vec<Vec<f64>>, ReadError> {
    read_with(path.as_ref(), parse_payouts)
}
