//! External-solver interface for the Simple Temporal Network
//!
//! The network renders to a solver request: one integer variable per time
//! point plus lower/upper bound matrices over every ordered pair. The
//! solver answers with a JSON document `{status, timepoints}`; a
//! satisfiable answer populates the network's solved-times metadata.

use super::stn::{Stn, INF};
use crate::error::{PlannerError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Solver verdict on a rendered network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolverStatus {
    #[serde(rename = "SATISFIABLE")]
    Satisfiable,
    #[serde(rename = "UNSATISFIABLE")]
    Unsatisfiable,
}

/// The rendered constraint problem handed to a solver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverRequest {
    pub num_time_points: usize,
    pub time_points: Vec<String>,
    /// `lower_bounds[i][j] <= t(j) - t(i)`
    pub lower_bounds: Vec<Vec<i64>>,
    /// `t(j) - t(i) <= upper_bounds[i][j]`
    pub upper_bounds: Vec<Vec<i64>>,
}

/// A solver's answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverResponse {
    pub status: SolverStatus,
    /// One integer per time point, in request order; empty when unsatisfiable
    #[serde(default)]
    pub timepoints: Vec<i64>,
}

impl SolverResponse {
    /// Parse a solver's JSON answer
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| PlannerError::malformed_input(format!("solver response: {e}")))
    }

    /// Render to JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// A black-box temporal constraint solver
pub trait TemporalSolver {
    fn solve(&self, request: &SolverRequest) -> Result<SolverResponse>;
}

/// Built-in solver running the shortest-path closure directly on the
/// request matrices. Used when no external solver is wired up.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShortestPathSolver;

impl TemporalSolver for ShortestPathSolver {
    fn solve(&self, request: &SolverRequest) -> Result<SolverResponse> {
        let n = request.num_time_points;
        if request.lower_bounds.len() != n || request.upper_bounds.len() != n {
            return Err(PlannerError::malformed_input(
                "solver request matrices do not match num_time_points",
            ));
        }

        let mut d = vec![vec![INF; n]; n];
        for (i, row) in d.iter_mut().enumerate() {
            row[i] = 0;
        }
        for i in 0..n {
            for j in 0..n {
                d[i][j] = d[i][j].min(request.upper_bounds[i][j]);
                d[j][i] = d[j][i].min(request.lower_bounds[i][j].saturating_neg());
            }
        }
        for k in 0..n {
            for i in 0..n {
                if d[i][k] >= INF {
                    continue;
                }
                for j in 0..n {
                    let via = d[i][k].saturating_add(d[k][j]);
                    if via < d[i][j] {
                        d[i][j] = via;
                    }
                }
            }
        }

        if (0..n).any(|i| d[i][i] < 0) {
            return Ok(SolverResponse {
                status: SolverStatus::Unsatisfiable,
                timepoints: Vec::new(),
            });
        }

        // Earliest times relative to the first point
        let timepoints = (0..n).map(|i| d[i][0].saturating_neg()).collect();
        Ok(SolverResponse {
            status: SolverStatus::Satisfiable,
            timepoints,
        })
    }
}

impl Stn {
    /// Render this network to a solver request
    pub fn to_solver_request(&self) -> SolverRequest {
        let time_points: Vec<String> = self.time_points().into_iter().cloned().collect();
        let n = time_points.len();
        let mut lower_bounds = vec![vec![-INF; n]; n];
        let mut upper_bounds = vec![vec![INF; n]; n];
        for (i, row_lo) in lower_bounds.iter_mut().enumerate() {
            row_lo[i] = 0;
        }
        for (i, row_hi) in upper_bounds.iter_mut().enumerate() {
            row_hi[i] = 0;
        }

        for (i, p) in time_points.iter().enumerate() {
            for (j, q) in time_points.iter().enumerate() {
                if i == j {
                    continue;
                }
                let bound = self.get_constraint(p, q);
                lower_bounds[i][j] = bound.lo;
                upper_bounds[i][j] = bound.hi;
            }
        }

        SolverRequest {
            num_time_points: n,
            time_points,
            lower_bounds,
            upper_bounds,
        }
    }

    /// Consume a solver response: updates the consistency verdict and, when
    /// satisfiable, records the solved time of every point.
    pub fn apply_solver_response(&mut self, request: &SolverRequest, response: &SolverResponse) -> Result<()> {
        match response.status {
            SolverStatus::Unsatisfiable => {
                self.record_solution(IndexMap::new(), false);
                Ok(())
            }
            SolverStatus::Satisfiable => {
                if response.timepoints.len() != request.time_points.len() {
                    return Err(PlannerError::malformed_input(format!(
                        "solver returned {} times for {} points",
                        response.timepoints.len(),
                        request.time_points.len()
                    )));
                }
                let times = request
                    .time_points
                    .iter()
                    .cloned()
                    .zip(response.timepoints.iter().copied())
                    .collect();
                self.record_solution(times, true);
                Ok(())
            }
        }
    }

    /// Render, solve, and consume in one step. Returns the consistency
    /// verdict.
    pub fn solve_with(&mut self, solver: &dyn TemporalSolver) -> Result<bool> {
        let request = self.to_solver_request();
        let response = solver.solve(&request)?;
        self.apply_solver_response(&request, &response)?;
        Ok(response.status == SolverStatus::Satisfiable)
    }
}
