//! Demonstration domains for tempoplan

pub mod blocks;
pub mod travel;

pub use blocks::create_blocks_domain;
pub use travel::{create_travel_domain, create_travel_state};

use crate::core::{State, StateValue};

/// Look up the distance between two places, stored as a `distance` fact
/// keyed `from:to` (either direction).
pub fn distance(state: &State, from: &str, to: &str) -> Option<f64> {
    state
        .get("distance", &format!("{from}:{to}"))
        .or_else(|| state.get("distance", &format!("{to}:{from}")))
        .and_then(|value| value.as_f64())
}

/// Taxi fare for a trip of the given distance
pub fn taxi_rate(dist: f64) -> f64 {
    1.5 + 0.5 * dist
}

/// Helper to get a fact as a string
pub fn get_str(state: &State, predicate: &str, subject: &str) -> Option<String> {
    state
        .get(predicate, subject)
        .and_then(|value| value.as_str().map(str::to_string))
}

/// Helper to get a fact as a float
pub fn get_f64(state: &State, predicate: &str, subject: &str) -> Option<f64> {
    state.get(predicate, subject).and_then(StateValue::as_f64)
}

/// Helper to get a fact as an integer
pub fn get_u64(state: &State, predicate: &str, subject: &str) -> Option<u64> {
    state.get(predicate, subject).and_then(StateValue::as_u64)
}

/// Helper to get a fact as a boolean
pub fn get_bool(state: &State, predicate: &str, subject: &str) -> Option<bool> {
    state.get(predicate, subject).and_then(StateValue::as_bool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_lookup_both_directions() {
        let mut state = State::new("s");
        state.set("distance", "home_a:park", 8.0.into());

        assert_eq!(distance(&state, "home_a", "park"), Some(8.0));
        assert_eq!(distance(&state, "park", "home_a"), Some(8.0));
        assert_eq!(distance(&state, "home_a", "station"), None);
    }

    #[test]
    fn test_taxi_rate() {
        assert_eq!(taxi_rate(0.0), 1.5);
        assert_eq!(taxi_rate(1.0), 2.0);
        assert_eq!(taxi_rate(8.0), 5.5);
    }

    #[test]
    fn test_fact_getters() {
        let mut state = State::new("s");
        state.set("location", "alice", "park".into());
        state.set("cash", "alice", 14.5.into());
        state.set("steps", "bob", 2.into());
        state.set("clear", "a", true.into());

        assert_eq!(get_str(&state, "location", "alice"), Some("park".to_string()));
        assert_eq!(get_f64(&state, "cash", "alice"), Some(14.5));
        assert_eq!(get_u64(&state, "steps", "bob"), Some(2));
        assert_eq!(get_bool(&state, "clear", "a"), Some(true));
        assert_eq!(get_str(&state, "cash", "alice"), None);
    }
}
