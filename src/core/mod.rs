//! Core data structures for tempoplan

pub mod state;
pub mod multigoal;
pub mod domain;

pub use state::{Condition, State, SubjectFilter};
pub use multigoal::Multigoal;
pub use domain::{ActionSpec, Domain, EntityRequirement, MultigoalResponse};

use serde::{Deserialize, Serialize};

/// Type alias for fact values. Fact values are opaque to the planner:
/// strings, numbers, booleans, lists, and objects all work.
pub type StateValue = serde_json::Value;

/// A single goal triple: the state must map `(predicate, subject)` to `value`.
pub type GoalTriple = (String, String, StateValue);

/// Represents one todo item handed to the planner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Todo {
    /// A compound task with name and arguments, expanded by task methods
    Task(String, Vec<StateValue>),
    /// A primitive action invocation with name and arguments
    Action(String, Vec<StateValue>),
    /// A single goal `(predicate, subject, value)`
    Goal(String, String, StateValue),
    /// A conjunction of goals to be simultaneously satisfied
    Multigoal(Multigoal),
}

impl Todo {
    /// Create a new task
    pub fn task(name: impl Into<String>, args: Vec<StateValue>) -> Self {
        Self::Task(name.into(), args)
    }

    /// Create a new action invocation
    pub fn action(name: impl Into<String>, args: Vec<StateValue>) -> Self {
        Self::Action(name.into(), args)
    }

    /// Create a new goal
    pub fn goal(
        predicate: impl Into<String>,
        subject: impl Into<String>,
        value: StateValue,
    ) -> Self {
        Self::Goal(predicate.into(), subject.into(), value)
    }

    /// Create a new multigoal
    pub fn multigoal(multigoal: Multigoal) -> Self {
        Self::Multigoal(multigoal)
    }

    /// Get the name of this todo item
    pub fn name(&self) -> &str {
        match self {
            Self::Task(name, _) | Self::Action(name, _) | Self::Goal(name, _, _) => name,
            Self::Multigoal(mg) => &mg.name,
        }
    }

    /// Check if this is a task
    pub fn is_task(&self) -> bool {
        matches!(self, Self::Task(_, _))
    }

    /// Check if this is an action invocation
    pub fn is_action(&self) -> bool {
        matches!(self, Self::Action(_, _))
    }

    /// Check if this is a goal
    pub fn is_goal(&self) -> bool {
        matches!(self, Self::Goal(_, _, _))
    }

    /// Check if this is a multigoal
    pub fn is_multigoal(&self) -> bool {
        matches!(self, Self::Multigoal(_))
    }
}

impl std::fmt::Display for Todo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Task(name, args) | Self::Action(name, args) => {
                write!(f, "({name}")?;
                for arg in args {
                    write!(f, " {}", value_to_string(arg))?;
                }
                write!(f, ")")
            }
            Self::Goal(predicate, subject, value) => {
                write!(f, "({predicate} {subject} {})", value_to_string(value))
            }
            Self::Multigoal(mg) => write!(f, "{mg}"),
        }
    }
}

/// Type alias for a todo list (sequence of tasks, goals, and actions)
pub type TodoList = Vec<Todo>;

/// Type alias for a linear plan (sequence of primitive actions)
pub type Plan = Vec<Todo>;

/// Helper to create a StateValue from a string
pub fn string_value(s: impl Into<String>) -> StateValue {
    StateValue::String(s.into())
}

/// Helper to create a StateValue from an integer
pub fn int_value(i: i64) -> StateValue {
    StateValue::Number(serde_json::Number::from(i))
}

/// Helper to create a StateValue from a float
pub fn float_value(f: f64) -> StateValue {
    StateValue::Number(serde_json::Number::from_f64(f).unwrap_or(serde_json::Number::from(0)))
}

/// Helper to create a StateValue from a boolean
pub fn bool_value(b: bool) -> StateValue {
    StateValue::Bool(b)
}

/// Convert a StateValue to a string without quotes around strings
pub fn value_to_string(value: &StateValue) -> String {
    match value {
        StateValue::String(s) => s.clone(),
        StateValue::Number(n) => n.to_string(),
        StateValue::Bool(b) => b.to_string(),
        StateValue::Null => "null".to_string(),
        StateValue::Array(arr) => format!(
            "[{}]",
            arr.iter().map(value_to_string).collect::<Vec<_>>().join(", ")
        ),
        StateValue::Object(obj) => format!(
            "{{{}}}",
            obj.iter()
                .map(|(k, v)| format!("{}: {}", k, value_to_string(v)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

/// Convert a todo list to a string representation for tracing
pub fn todo_list_to_string(todo_list: &[Todo]) -> String {
    let items: Vec<String> = todo_list.iter().map(|t| t.to_string()).collect();
    format!("[{}]", items.join(", "))
}
