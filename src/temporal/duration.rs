//! Duration specifications and ISO 8601 parsing

use crate::core::{GoalTriple, State, StateValue};
use crate::error::{PlannerError, Result};
use indexmap::IndexMap;
use std::sync::Arc;

/// Type alias for caller-supplied duration functions
pub type CalculatedFn = Arc<dyn Fn(&State, &[StateValue]) -> u64 + Send + Sync>;

/// How long an action takes, in seconds.
#[derive(Clone)]
pub enum DurationSpec {
    /// A constant number of seconds
    Fixed(u64),
    /// A bounded range; calculation uses the average, the constraint
    /// network receives both bounds
    Variable { min: u64, max: u64 },
    /// The first fact triple satisfied in the state selects the duration
    Conditional(Vec<(GoalTriple, u64)>),
    /// `base_seconds / efficiency(skill)`, where the skill is the value the
    /// state stores under `(resource_type, acting entity)`
    ResourceDependent {
        resource_type: String,
        base_seconds: u64,
        efficiency: IndexMap<String, f64>,
    },
    /// A caller-supplied pure function of state and arguments
    Calculated(CalculatedFn),
}

impl DurationSpec {
    /// Instantaneous duration
    pub fn zero() -> Self {
        Self::Fixed(0)
    }

    /// The concrete duration for an action applied with `args` in `state`
    pub fn calculate(&self, state: &State, args: &[StateValue]) -> u64 {
        match self {
            Self::Fixed(seconds) => *seconds,
            Self::Variable { min, max } => (min + max) / 2,
            Self::Conditional(branches) => {
                for ((predicate, subject, value), seconds) in branches {
                    if state.matches(predicate, subject, value) {
                        return *seconds;
                    }
                }
                #[cfg(debug_assertions)]
                eprintln!("tempoplan: no conditional duration branch matched, using 0");
                0
            }
            Self::ResourceDependent {
                resource_type,
                base_seconds,
                efficiency,
            } => {
                let skill = args
                    .first()
                    .and_then(|entity| entity.as_str())
                    .and_then(|entity| state.get(resource_type, entity))
                    .and_then(|value| value.as_str());
                let factor = skill
                    .and_then(|skill| efficiency.get(skill))
                    .copied()
                    .unwrap_or(1.0);
                if factor <= 0.0 {
                    *base_seconds
                } else {
                    (*base_seconds as f64 / factor).round() as u64
                }
            }
            Self::Calculated(calc) => calc(state, args),
        }
    }

    /// The `[lo, hi]` bounds handed to the constraint network
    pub fn bounds(&self, state: &State, args: &[StateValue]) -> (u64, u64) {
        match self {
            Self::Variable { min, max } => (*min, *max),
            _ => {
                let seconds = self.calculate(state, args);
                (seconds, seconds)
            }
        }
    }
}

impl std::fmt::Debug for DurationSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fixed(seconds) => write!(f, "Fixed({seconds})"),
            Self::Variable { min, max } => write!(f, "Variable({min}..{max})"),
            Self::Conditional(branches) => write!(f, "Conditional({} branches)", branches.len()),
            Self::ResourceDependent { resource_type, base_seconds, .. } => {
                write!(f, "ResourceDependent({resource_type}, base {base_seconds})")
            }
            Self::Calculated(_) => write!(f, "Calculated(..)"),
        }
    }
}

impl Default for DurationSpec {
    fn default() -> Self {
        Self::zero()
    }
}

/// Parse a duration string into seconds.
///
/// The accepted grammar is exactly `PT<n>H<n>M<n>S` with any non-empty
/// subset of the hour/minute/second components in that order, or a bare
/// non-negative integer meaning seconds. Date components (`P1D`, `P2W`),
/// fractional fields, and anything else are rejected with a
/// `malformed_input` error.
pub fn parse_iso8601(input: &str) -> Result<u64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(PlannerError::malformed_input("empty duration string"));
    }

    // Bare integer seconds
    if trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return trimmed
            .parse::<u64>()
            .map_err(|e| PlannerError::malformed_input(format!("duration '{trimmed}': {e}")));
    }

    let rest = trimmed.strip_prefix("PT").ok_or_else(|| {
        PlannerError::malformed_input(format!(
            "duration '{trimmed}' is not PT<n>H<n>M<n>S or plain seconds"
        ))
    })?;
    if rest.is_empty() {
        return Err(PlannerError::malformed_input(format!(
            "duration '{trimmed}' has no components"
        )));
    }

    let mut total: u64 = 0;
    let mut number = String::new();
    // Components must appear in H, M, S order, each at most once
    let mut last_unit_rank = 0u8;
    for ch in rest.chars() {
        if ch.is_ascii_digit() {
            number.push(ch);
            continue;
        }
        let (rank, factor) = match ch {
            'H' => (1u8, 3600u64),
            'M' => (2, 60),
            'S' => (3, 1),
            other => {
                return Err(PlannerError::malformed_input(format!(
                    "duration '{trimmed}': unsupported designator '{other}'"
                )))
            }
        };
        if number.is_empty() {
            return Err(PlannerError::malformed_input(format!(
                "duration '{trimmed}': designator '{ch}' without a value"
            )));
        }
        if rank <= last_unit_rank {
            return Err(PlannerError::malformed_input(format!(
                "duration '{trimmed}': components out of order"
            )));
        }
        last_unit_rank = rank;
        let value: u64 = number
            .parse()
            .map_err(|e| PlannerError::malformed_input(format!("duration '{trimmed}': {e}")))?;
        total = total
            .checked_add(value.saturating_mul(factor))
            .ok_or_else(|| {
                PlannerError::malformed_input(format!("duration '{trimmed}' overflows"))
            })?;
        number.clear();
    }
    if !number.is_empty() {
        return Err(PlannerError::malformed_input(format!(
            "duration '{trimmed}': trailing digits without a designator"
        )));
    }

    Ok(total)
}

/// Parse a duration string, falling back to `Fixed(0)` on malformed input.
/// The failure is reported in debug builds only.
pub fn parse_iso8601_lenient(input: &str) -> DurationSpec {
    match parse_iso8601(input) {
        Ok(seconds) => DurationSpec::Fixed(seconds),
        Err(_err) => {
            #[cfg(debug_assertions)]
            eprintln!("tempoplan: {_err}, defaulting to zero duration");
            DurationSpec::Fixed(0)
        }
    }
}
