//! Project crashing: run every task either in normal or in fast mode so
//! that each enumerated path finishes by its deadline at minimum cost.

use combopt_model::{LinearExpr, Model, ModelBuilder, SolveResult, UNBOUNDED, VarGroup, VarId};
use tracing::debug;

use crate::error::{InvalidInstanceError, expect_len, expect_non_negative};
use crate::report::Report;

/// An explicit sequence of tasks that must complete within `deadline`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct TaskPath {
    pub tasks: Vec<usize>,
    pub deadline: f64,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct CrashingInstance {
    pub normal_duration: Vec<f64>,
    pub fast_duration: Vec<f64>,
    pub normal_cost: Vec<f64>,
    pub fast_cost: Vec<f64>,
    pub paths: Vec<TaskPath>,
}

impl CrashingInstance {
    pub fn num_tasks(&self) -> usize {
        self.normal_duration.len()
    }

    fn validate(&self) -> Result<(), InvalidInstanceError> {
        let tasks = self.num_tasks();
        expect_len("fast durations (one per task)", &self.fast_duration, tasks)?;
        expect_len("normal costs (one per task)", &self.normal_cost, tasks)?;
        expect_len("fast costs (one per task)", &self.fast_cost, tasks)?;
        expect_non_negative("normal_duration", &self.normal_duration)?;
        expect_non_negative("fast_duration", &self.fast_duration)?;
        expect_non_negative("normal_cost", &self.normal_cost)?;
        expect_non_negative("fast_cost", &self.fast_cost)?;
        for (k, path) in self.paths.iter().enumerate() {
            if let Some(&task) = path.tasks.iter().find(|&&t| t >= tasks) {
                return Err(InvalidInstanceError::index(format!("task on path {}", k), task, tasks));
            }
            if !path.deadline.is_finite() {
                return Err(InvalidInstanceError::parameter(
                    "deadline",
                    format!("path {} has deadline {}", k, path.deadline),
                ));
            }
        }
        Ok(())
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskMode {
    Normal,
    Fast,
}

#[derive(Debug, Clone)]
pub struct CrashingModel {
    pub model: Model,
    pub normal: VarGroup,
    pub fast: VarGroup,
    pub total_cost: VarId,
    paths: Vec<TaskPath>,
    normal_duration: Vec<f64>,
    fast_duration: Vec<f64>,
}

/// Build the crashing model: one mode per task, every path within its deadline.
///
/// A task listed twice on a path counts twice towards that path's duration.
pub fn build_crashing_model(instance: &CrashingInstance) -> Result<CrashingModel, InvalidInstanceError> {
    instance.validate()?;
    let tasks = instance.num_tasks();

    let mut builder = ModelBuilder::new("task crashing");
    let normal = builder.add_binary_group("normal", tasks);
    let fast = builder.add_binary_group("fast", tasks);
    let total_cost = builder.add_continuous("total cost", 0.0, UNBOUNDED)?;

    for task in 0..tasks {
        builder.add_eq(
            format!("one mode[{}]", task),
            LinearExpr::sum([normal.at(task), fast.at(task)]),
            1.0,
        )?;
    }

    for (k, path) in instance.paths.iter().enumerate() {
        let mut duration = LinearExpr::new();
        for &task in &path.tasks {
            duration.add_term(instance.normal_duration[task], normal.at(task));
            duration.add_term(instance.fast_duration[task], fast.at(task));
        }
        builder.add_le(format!("deadline[{}]", k), duration, path.deadline)?;
    }

    let mut cost = LinearExpr::new();
    for task in 0..tasks {
        cost.add_term(instance.normal_cost[task], normal.at(task));
        cost.add_term(instance.fast_cost[task], fast.at(task));
    }
    builder.define("total cost", total_cost, &cost)?;
    builder.minimize(LinearExpr::var(total_cost))?;

    debug!(tasks, paths = instance.paths.len(), "crashing model assembled");
    Ok(CrashingModel {
        model: builder.build()?,
        normal,
        fast,
        total_cost,
        paths: instance.paths.clone(),
        normal_duration: instance.normal_duration.clone(),
        fast_duration: instance.fast_duration.clone(),
    })
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct CrashingSchedule {
    pub total_cost: f64,
    pub modes: Vec<TaskMode>,
    /// Duration of each declared path under the chosen modes
    pub path_durations: Vec<f64>,
}

impl CrashingModel {
    pub fn label(&self, var: VarId) -> String {
        if let Some(task) = self.normal.position(var) {
            format!("task {} normal", task)
        } else if let Some(task) = self.fast.position(var) {
            format!("task {} fast", task)
        } else if var == self.total_cost {
            "total cost".to_string()
        } else {
            var.to_string()
        }
    }

    pub fn extract(&self, result: &SolveResult) -> Option<CrashingSchedule> {
        let modes = self
            .fast
            .iter()
            .map(|v| result.value(v).map(|x| if x > 0.5 { TaskMode::Fast } else { TaskMode::Normal }))
            .collect::<Option<Vec<_>>>()?;
        let path_durations: Vec<f64> = self
            .paths
            .iter()
            .map(|path| {
                path.tasks
                    .iter()
                    .map(|&t| match modes[t] {
                        TaskMode::Normal => self.normal_duration[t],
                        TaskMode::Fast => self.fast_duration[t],
                    })
                    .sum::<f64>()
            })
            .collect();
        Some(CrashingSchedule {
            total_cost: result.value(self.total_cost)?,
            modes,
            path_durations,
        })
    }

    pub fn report(&self, result: &SolveResult) -> Report {
        let mut report = Report::from_solve(&self.model, result, |v| self.label(v))
            .with_parameter("tasks", self.normal.len())
            .with_parameter("paths", self.paths.len());
        if let Some(schedule) = self.extract(result) {
            for (k, (path, duration)) in self.paths.iter().zip(&schedule.path_durations).enumerate() {
                report = report.with_note(format!("path {}: {} of {} days", k, duration, path.deadline));
            }
        }
        report
    }
}
