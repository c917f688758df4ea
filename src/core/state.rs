//! Relational state representation for tempoplan

use super::{GoalTriple, StateValue};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Optional restriction on the subjects a quantifier ranges over
pub type SubjectFilter = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// A condition the state can be asked to evaluate
#[derive(Clone)]
pub enum Condition {
    /// A plain fact triple `(predicate, subject, value)`
    Fact(String, String, StateValue),
    /// Some subject (optionally restricted by the filter) maps `predicate` to `value`
    Exists {
        predicate: String,
        value: StateValue,
        filter: Option<SubjectFilter>,
    },
    /// Every subject accepted by the filter maps `predicate` to `value`.
    /// Vacuously true when the filter accepts no known subject.
    Forall {
        predicate: String,
        value: StateValue,
        filter: SubjectFilter,
    },
}

impl std::fmt::Debug for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fact(p, s, v) => write!(f, "Fact({p}, {s}, {v})"),
            Self::Exists { predicate, value, .. } => write!(f, "Exists({predicate}, {value})"),
            Self::Forall { predicate, value, .. } => write!(f, "Forall({predicate}, {value})"),
        }
    }
}

/// Represents a world state as a relational fact store.
///
/// Facts are keyed `(predicate, subject)` and map to an opaque value, e.g.
/// `("location", "alice") -> "park"`. At most one value exists per key;
/// removing a key means the fact is unknown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// Name of the state, used in trace output
    pub name: String,
    /// Facts as nested maps: predicate -> subject -> value
    facts: IndexMap<String, IndexMap<String, StateValue>>,
}

impl State {
    /// Create a new empty state with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            facts: IndexMap::new(),
        }
    }

    /// Create a state from a list of fact triples
    pub fn from_triples(name: impl Into<String>, triples: Vec<GoalTriple>) -> Self {
        let mut state = Self::new(name);
        for (predicate, subject, value) in triples {
            state.set(predicate, subject, value);
        }
        state
    }

    /// Set a fact value, replacing any previous value under the same key
    pub fn set(
        &mut self,
        predicate: impl Into<String>,
        subject: impl Into<String>,
        value: StateValue,
    ) {
        self.facts
            .entry(predicate.into())
            .or_default()
            .insert(subject.into(), value);
    }

    /// Get a fact value, or `None` when the fact is unknown
    pub fn get(&self, predicate: &str, subject: &str) -> Option<&StateValue> {
        self.facts
            .get(predicate)
            .and_then(|subjects| subjects.get(subject))
    }

    /// Remove a fact, making it unknown. Returns the removed value, if any.
    pub fn remove(&mut self, predicate: &str, subject: &str) -> Option<StateValue> {
        self.facts
            .get_mut(predicate)
            .and_then(|subjects| subjects.shift_remove(subject))
    }

    /// Equality test against the stored value. An unknown fact matches nothing.
    pub fn matches(&self, predicate: &str, subject: &str, value: &StateValue) -> bool {
        self.get(predicate, subject) == Some(value)
    }

    /// Check if any fact exists under a predicate
    pub fn has_predicate(&self, predicate: &str) -> bool {
        self.facts.contains_key(predicate)
    }

    /// Check if a fact exists under `(predicate, subject)`
    pub fn has_fact(&self, predicate: &str, subject: &str) -> bool {
        self.facts
            .get(predicate)
            .is_some_and(|subjects| subjects.contains_key(subject))
    }

    /// All predicates with at least one fact
    pub fn predicates(&self) -> Vec<&String> {
        self.facts.keys().collect()
    }

    /// All subjects `s` where `get(predicate, s) == value`, in insertion order
    pub fn subjects_with(&self, predicate: &str, value: &StateValue) -> Vec<&String> {
        self.facts
            .get(predicate)
            .map(|subjects| {
                subjects
                    .iter()
                    .filter(|(_, v)| *v == value)
                    .map(|(s, _)| s)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All subjects carrying any value for `predicate`, in insertion order
    pub fn subjects_with_predicate(&self, predicate: &str) -> Vec<&String> {
        self.facts
            .get(predicate)
            .map(|subjects| subjects.keys().collect())
            .unwrap_or_default()
    }

    /// Existential quantifier: does some subject (restricted by `filter`,
    /// when given) map `predicate` to `value`?
    pub fn exists(&self, predicate: &str, value: &StateValue, filter: Option<&SubjectFilter>) -> bool {
        match self.facts.get(predicate) {
            Some(subjects) => subjects.iter().any(|(s, v)| {
                v == value && filter.is_none_or(|accept| accept(s))
            }),
            None => false,
        }
    }

    /// Universal quantifier over the subjects accepted by `filter`.
    /// Vacuously true when the filter accepts no subject known under `predicate`.
    pub fn forall(&self, predicate: &str, value: &StateValue, filter: &SubjectFilter) -> bool {
        match self.facts.get(predicate) {
            Some(subjects) => subjects
                .iter()
                .filter(|(s, _)| filter(s))
                .all(|(_, v)| v == value),
            None => true,
        }
    }

    /// Evaluate a condition against this state. Unknown shapes evaluate to
    /// `false` (with a warning in debug builds) rather than crashing.
    pub fn evaluate_condition(&self, condition: &Condition) -> bool {
        match condition {
            Condition::Fact(predicate, subject, value) => self.matches(predicate, subject, value),
            Condition::Exists { predicate, value, filter } => {
                self.exists(predicate, value, filter.as_ref())
            }
            Condition::Forall { predicate, value, filter } => self.forall(predicate, value, filter),
        }
    }

    /// Evaluate a condition given as a raw JSON value; the supported shapes
    /// are a three-element `[predicate, subject, value]` array and objects
    /// `{"exists": ...}` / `{"forall": ...}`. Anything else is `false`.
    pub fn evaluate_condition_value(&self, condition: &StateValue) -> bool {
        if let StateValue::Array(triple) = condition {
            if triple.len() == 3 {
                if let (Some(predicate), Some(subject)) = (triple[0].as_str(), triple[1].as_str()) {
                    return self.matches(predicate, subject, &triple[2]);
                }
            }
        }
        #[cfg(debug_assertions)]
        eprintln!("tempoplan: unrecognised condition shape {condition}, treating as false");
        false
    }

    /// The entire subject map for a predicate
    pub fn fact_map(&self, predicate: &str) -> Option<&IndexMap<String, StateValue>> {
        self.facts.get(predicate)
    }

    /// Replace the entire subject map for a predicate
    pub fn set_fact_map(
        &mut self,
        predicate: impl Into<String>,
        subjects: IndexMap<String, StateValue>,
    ) {
        self.facts.insert(predicate.into(), subjects);
    }

    /// Create a deep copy with an optional new name
    pub fn copy(&self, new_name: Option<String>) -> Self {
        let mut copy = self.clone();
        if let Some(name) = new_name {
            copy.name = name;
        }
        copy
    }

    /// Check if this state satisfies a single goal triple
    pub fn satisfies_goal(&self, predicate: &str, subject: &str, desired: &StateValue) -> bool {
        self.matches(predicate, subject, desired)
    }

    /// Display the state in a human-readable format
    pub fn display(&self, heading: Option<&str>) {
        let heading = heading.unwrap_or("State");
        let title = format!("{} {}:", heading, self.name);
        let dashes = "-".repeat(title.len());

        println!("{title}");
        println!("{dashes}");

        if self.facts.is_empty() {
            println!("  (no facts)");
        } else {
            for (predicate, subjects) in &self.facts {
                println!("  - {predicate} = {{");
                for (subject, value) in subjects {
                    println!("      '{subject}': {value},");
                }
                println!("    }}");
            }
        }
        println!();
    }

    /// Convert to a JSON representation
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Create from a JSON representation
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<State {}>", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(names: &'static [&'static str]) -> SubjectFilter {
        Arc::new(move |s: &str| names.contains(&s))
    }

    #[test]
    fn test_state_creation() {
        let state = State::new("test_state");
        assert_eq!(state.name, "test_state");
        assert!(state.predicates().is_empty());
    }

    #[test]
    fn test_set_get_remove() {
        let mut state = State::new("test");

        state.set("location", "alice", "home".into());
        state.set("location", "bob", "park".into());
        state.set("cash", "alice", 20.into());

        assert_eq!(state.get("location", "alice"), Some(&"home".into()));
        assert_eq!(state.get("location", "bob"), Some(&"park".into()));
        assert_eq!(state.get("cash", "alice"), Some(&20.into()));
        assert_eq!(state.get("location", "charlie"), None);

        assert!(state.has_predicate("location"));
        assert!(state.has_fact("location", "alice"));
        assert!(!state.has_fact("location", "charlie"));

        assert_eq!(state.remove("location", "alice"), Some("home".into()));
        assert_eq!(state.get("location", "alice"), None);
        assert_eq!(state.remove("location", "alice"), None);
    }

    #[test]
    fn test_last_write_wins() {
        let mut state = State::new("test");
        state.set("pos", "a", "table".into());
        state.set("pos", "a", "b".into());
        assert_eq!(state.get("pos", "a"), Some(&"b".into()));

        // Writing twice is the same as writing the final value once
        let mut direct = State::new("test");
        direct.set("pos", "a", "b".into());
        assert_eq!(state.get("pos", "a"), direct.get("pos", "a"));
    }

    #[test]
    fn test_matches() {
        let mut state = State::new("test");
        state.set("location", "alice", "home".into());

        assert!(state.matches("location", "alice", &"home".into()));
        assert!(!state.matches("location", "alice", &"park".into()));
        assert!(!state.matches("location", "bob", &"home".into()));
    }

    #[test]
    fn test_from_triples() {
        let state = State::from_triples(
            "s0",
            vec![
                ("pos".into(), "a".into(), "table".into()),
                ("pos".into(), "b".into(), "a".into()),
                ("clear".into(), "b".into(), true.into()),
            ],
        );
        assert_eq!(state.get("pos", "b"), Some(&"a".into()));
        assert!(state.matches("clear", "b", &true.into()));
    }

    #[test]
    fn test_subjects_with() {
        let mut state = State::new("test");
        state.set("pos", "a", "table".into());
        state.set("pos", "b", "table".into());
        state.set("pos", "c", "a".into());

        let on_table = state.subjects_with("pos", &"table".into());
        assert_eq!(on_table, vec!["a", "b"]);

        let all = state.subjects_with_predicate("pos");
        assert_eq!(all, vec!["a", "b", "c"]);

        assert!(state.subjects_with("pos", &"hand".into()).is_empty());
        assert!(state.subjects_with("color", &"red".into()).is_empty());
    }

    #[test]
    fn test_exists() {
        let mut state = State::new("test");
        state.set("clear", "a", true.into());
        state.set("clear", "b", false.into());

        assert!(state.exists("clear", &true.into(), None));
        assert!(!state.exists("clear", &"yes".into(), None));

        let only_b = filter(&["b"]);
        assert!(!state.exists("clear", &true.into(), Some(&only_b)));
        assert!(state.exists("clear", &false.into(), Some(&only_b)));
    }

    #[test]
    fn test_forall() {
        let mut state = State::new("test");
        state.set("clear", "a", true.into());
        state.set("clear", "b", true.into());
        state.set("clear", "c", false.into());

        assert!(state.forall("clear", &true.into(), &filter(&["a", "b"])));
        assert!(!state.forall("clear", &true.into(), &filter(&["a", "c"])));

        // Vacuously true: the filter accepts no known subject
        assert!(state.forall("clear", &true.into(), &filter(&["z"])));
        assert!(state.forall("color", &"red".into(), &filter(&["a"])));
    }

    #[test]
    fn test_evaluate_condition() {
        let mut state = State::new("test");
        state.set("location", "alice", "park".into());
        state.set("location", "bob", "park".into());

        assert!(state.evaluate_condition(&Condition::Fact(
            "location".into(),
            "alice".into(),
            "park".into()
        )));
        assert!(state.evaluate_condition(&Condition::Exists {
            predicate: "location".into(),
            value: "park".into(),
            filter: None,
        }));
        assert!(state.evaluate_condition(&Condition::Forall {
            predicate: "location".into(),
            value: "park".into(),
            filter: filter(&["alice", "bob"]),
        }));
    }

    #[test]
    fn test_evaluate_condition_value_unknown_shape() {
        let state = State::new("test");
        // Malformed shapes never crash, they evaluate to false
        assert!(!state.evaluate_condition_value(&serde_json::json!({"when": "now"})));
        assert!(!state.evaluate_condition_value(&serde_json::json!(["only", "two"])));
        assert!(!state.evaluate_condition_value(&serde_json::json!(42)));
    }

    #[test]
    fn test_json_round_trip() {
        let mut state = State::new("test");
        state.set("cash", "alice", 14.5.into());

        let json = state.to_json().unwrap();
        let restored = State::from_json(&json).unwrap();
        assert_eq!(restored, state);
    }
}
