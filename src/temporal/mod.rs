//! Temporal reasoning for tempoplan
//!
//! This module holds everything time-related: duration specifications and
//! ISO 8601 parsing, the Simple Temporal Network the planner schedules
//! against, the external-solver interface, and the durative-action
//! converter that lowers condition/effect bundles into plain actions plus
//! method decompositions.

pub mod duration;
pub mod stn;
pub mod solver;
pub mod durative;

pub use duration::{parse_iso8601, DurationSpec};
pub use stn::{Bound, Interval, Stn, DEFAULT_SEGMENT_SIZE, ORIGIN_POINT};
pub use solver::{ShortestPathSolver, SolverRequest, SolverResponse, SolverStatus, TemporalSolver};
pub use durative::{ConditionBundle, DurativeAction, DurativeConversion, EffectBundle};

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// How a group of scheduled intervals is laid out in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionPattern {
    /// Each interval starts no earlier than the previous one ends
    Sequential,
    /// All intervals start at the same instant
    Parallel,
    /// Each interval starts while the previous one is still running
    Overlapping,
}

impl ExecutionPattern {
    /// Constrain the layout of `intervals` (already added to `stn`)
    /// according to this pattern.
    pub fn apply(&self, stn: &mut Stn, intervals: &[Interval]) -> Result<()> {
        for pair in intervals.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            match self {
                Self::Sequential => {
                    stn.add_constraint(&prev.end, &next.start, Bound::at_least(0))?;
                }
                Self::Parallel => {
                    stn.add_constraint(&prev.start, &next.start, Bound::exact(0))?;
                }
                Self::Overlapping => {
                    stn.add_constraint(&prev.start, &next.start, Bound::at_least(0))?;
                    stn.add_constraint(&next.start, &prev.end, Bound::at_least(0))?;
                }
            }
        }
        Ok(())
    }
}

/// A scheduling restriction attached to a single action, anchored at the
/// schedule origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemporalConstraint {
    /// The action must end within `seconds` of the origin
    Deadline(i64),
    /// The action must not start before `seconds` after the origin
    NotBefore(i64),
    /// The action must start inside the window `[lo, hi]` after the origin
    FixedInterval(i64, i64),
}

impl TemporalConstraint {
    /// Encode this restriction into the network for an action scheduled
    /// on `(start, end)`.
    pub fn apply(&self, stn: &mut Stn, origin: &str, start: &str, end: &str) -> Result<()> {
        match self {
            Self::Deadline(seconds) => stn.add_constraint(origin, end, Bound::new(0, *seconds)),
            Self::NotBefore(seconds) => stn.add_constraint(origin, start, Bound::at_least(*seconds)),
            Self::FixedInterval(lo, hi) => stn.add_constraint(origin, start, Bound::new(*lo, *hi)),
        }
    }
}
