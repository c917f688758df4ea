//! Multigoal representation for tempoplan

use super::{GoalTriple, StateValue};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Represents a conjunctive goal: an ordered set of goal triples that must
/// all hold in the same state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Multigoal {
    /// Name of the multigoal, used in trace output
    pub name: String,
    /// Goals as nested maps: predicate -> subject -> desired value
    pub goals: IndexMap<String, IndexMap<String, StateValue>>,
}

impl Multigoal {
    /// Create a new empty multigoal with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            goals: IndexMap::new(),
        }
    }

    /// Set a goal value
    pub fn set_goal(
        &mut self,
        predicate: impl Into<String>,
        subject: impl Into<String>,
        value: StateValue,
    ) {
        self.goals
            .entry(predicate.into())
            .or_default()
            .insert(subject.into(), value);
    }

    /// Get a goal value
    pub fn get_goal(&self, predicate: &str, subject: &str) -> Option<&StateValue> {
        self.goals
            .get(predicate)
            .and_then(|subjects| subjects.get(subject))
    }

    /// Check if a goal exists for `(predicate, subject)`
    pub fn has_goal(&self, predicate: &str, subject: &str) -> bool {
        self.goals
            .get(predicate)
            .is_some_and(|subjects| subjects.contains_key(subject))
    }

    /// Check if this multigoal is empty (has no goals)
    pub fn is_empty(&self) -> bool {
        self.goals.values().all(|subjects| subjects.is_empty())
    }

    /// The total number of individual goals
    pub fn goal_count(&self) -> usize {
        self.goals.values().map(|subjects| subjects.len()).sum()
    }

    /// Check if this multigoal is satisfied by the given state
    pub fn is_satisfied_by(&self, state: &crate::core::State) -> bool {
        self.goals.iter().all(|(predicate, subjects)| {
            subjects
                .iter()
                .all(|(subject, desired)| state.satisfies_goal(predicate, subject, desired))
        })
    }

    /// A copy of this multigoal with the goals already satisfied by `state`
    /// removed, pruning left-to-right in declaration order.
    pub fn prune(&self, state: &crate::core::State) -> Multigoal {
        let mut remainder = Multigoal::new(self.name.clone());
        for (predicate, subjects) in &self.goals {
            for (subject, desired) in subjects {
                if !state.satisfies_goal(predicate, subject, desired) {
                    remainder.set_goal(predicate.clone(), subject.clone(), desired.clone());
                }
            }
        }
        remainder
    }

    /// All goals not satisfied by the given state, in declaration order
    pub fn unsatisfied_goals(&self, state: &crate::core::State) -> Vec<GoalTriple> {
        let mut unsatisfied = Vec::new();
        for (predicate, subjects) in &self.goals {
            for (subject, desired) in subjects {
                if !state.satisfies_goal(predicate, subject, desired) {
                    unsatisfied.push((predicate.clone(), subject.clone(), desired.clone()));
                }
            }
        }
        unsatisfied
    }

    /// Create a multigoal from individual goal triples
    pub fn from_goals(name: impl Into<String>, goals: Vec<GoalTriple>) -> Self {
        let mut multigoal = Self::new(name);
        for (predicate, subject, value) in goals {
            multigoal.set_goal(predicate, subject, value);
        }
        multigoal
    }

    /// Convert this multigoal to a list of goal triples, in declaration order
    pub fn to_goals(&self) -> Vec<GoalTriple> {
        let mut goals = Vec::new();
        for (predicate, subjects) in &self.goals {
            for (subject, value) in subjects {
                goals.push((predicate.clone(), subject.clone(), value.clone()));
            }
        }
        goals
    }

    /// Create a deep copy with an optional new name
    pub fn copy(&self, new_name: Option<String>) -> Self {
        let mut copy = self.clone();
        if let Some(name) = new_name {
            copy.name = name;
        }
        copy
    }

    /// Display the multigoal in a human-readable format
    pub fn display(&self, heading: Option<&str>) {
        let heading = heading.unwrap_or("Multigoal");
        let title = format!("{} {}:", heading, self.name);
        let dashes = "-".repeat(title.len());

        println!("{title}");
        println!("{dashes}");

        if self.is_empty() {
            println!("  (no goals)");
        } else {
            for (predicate, subjects) in &self.goals {
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

impl std::fmt::Display for Multigoal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<Multigoal {}>", self.name)
    }
}
