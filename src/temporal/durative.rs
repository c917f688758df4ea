//! Durative-action conversion
//!
//! A durative action bundles conditions at three anchors (`at_start`,
//! `over_all`, `at_end`) with effects at two (`at_start`, `at_end`).
//! Conversion lowers it to a plain timed action plus a task-method
//! decomposition: the `at_start` conditions reified as goals, then the
//! action invocation, then the `at_end` conditions reified as goals.
//! `over_all` conditions become monitors the executor consults at each
//! primitive step inside the method's scope.

use crate::core::{EntityRequirement, GoalTriple, State, Todo, TodoList};
use crate::error::{PlannerError, Result};
use crate::temporal::duration::DurationSpec;

/// Conditions anchored to the three phases of a durative action
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionBundle {
    pub at_start: Vec<GoalTriple>,
    pub over_all: Vec<GoalTriple>,
    pub at_end: Vec<GoalTriple>,
}

/// Effects anchored to the start and end of a durative action
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectBundle {
    pub at_start: Vec<GoalTriple>,
    pub at_end: Vec<GoalTriple>,
}

impl EffectBundle {
    /// Apply both phases to a state, start effects first
    pub fn apply(&self, state: &mut State) {
        for (predicate, subject, value) in self.at_start.iter().chain(self.at_end.iter()) {
            state.set(predicate.clone(), subject.clone(), value.clone());
        }
    }

    /// Whether the bundle changes nothing
    pub fn is_empty(&self) -> bool {
        self.at_start.is_empty() && self.at_end.is_empty()
    }
}

/// A high-level action with duration and anchored condition/effect bundles
#[derive(Debug, Clone)]
pub struct DurativeAction {
    pub name: String,
    pub duration: DurationSpec,
    pub entity_requirements: Vec<EntityRequirement>,
    pub conditions: ConditionBundle,
    pub effects: EffectBundle,
}

impl DurativeAction {
    /// Create a durative action with no conditions, effects, or entity
    /// requirements
    pub fn new(name: impl Into<String>, duration: DurationSpec) -> Self {
        Self {
            name: name.into(),
            duration,
            entity_requirements: Vec::new(),
            conditions: ConditionBundle::default(),
            effects: EffectBundle::default(),
        }
    }

    /// Add an `at_start` condition
    pub fn condition_at_start(mut self, predicate: &str, subject: &str, value: impl Into<crate::core::StateValue>) -> Self {
        self.conditions.at_start.push((predicate.into(), subject.into(), value.into()));
        self
    }

    /// Add an `over_all` condition
    pub fn condition_over_all(mut self, predicate: &str, subject: &str, value: impl Into<crate::core::StateValue>) -> Self {
        self.conditions.over_all.push((predicate.into(), subject.into(), value.into()));
        self
    }

    /// Add an `at_end` condition
    pub fn condition_at_end(mut self, predicate: &str, subject: &str, value: impl Into<crate::core::StateValue>) -> Self {
        self.conditions.at_end.push((predicate.into(), subject.into(), value.into()));
        self
    }

    /// Add an `at_start` effect
    pub fn effect_at_start(mut self, predicate: &str, subject: &str, value: impl Into<crate::core::StateValue>) -> Self {
        self.effects.at_start.push((predicate.into(), subject.into(), value.into()));
        self
    }

    /// Add an `at_end` effect
    pub fn effect_at_end(mut self, predicate: &str, subject: &str, value: impl Into<crate::core::StateValue>) -> Self {
        self.effects.at_end.push((predicate.into(), subject.into(), value.into()));
        self
    }

    /// Add an entity requirement
    pub fn require_entity(mut self, requirement: EntityRequirement) -> Self {
        self.entity_requirements.push(requirement);
        self
    }

    /// Lower this durative action into a simple action plus a method
    /// decomposition. The expansion preserves the original's
    /// state-transition semantics: once every sub-todo of the method
    /// succeeds, the state equals the result of applying the effect
    /// bundles directly.
    pub fn convert(&self) -> Result<DurativeConversion> {
        if self.name.is_empty() {
            return Err(PlannerError::malformed_input("durative action without a name"));
        }

        let action_name = format!("{}_span", self.name);

        let mut method_todos: TodoList = Vec::new();
        for (predicate, subject, value) in &self.conditions.at_start {
            method_todos.push(Todo::goal(predicate.clone(), subject.clone(), value.clone()));
        }
        method_todos.push(Todo::action(action_name.clone(), Vec::new()));
        for (predicate, subject, value) in &self.conditions.at_end {
            method_todos.push(Todo::goal(predicate.clone(), subject.clone(), value.clone()));
        }

        Ok(DurativeConversion {
            task_name: self.name.clone(),
            action_name,
            duration: self.duration.clone(),
            entity_requirements: self.entity_requirements.clone(),
            method_todos,
            monitors: self.conditions.over_all.clone(),
            effects: self.effects.clone(),
        })
    }
}

/// The lowered form of a durative action. The simple action keeps only
/// name, duration, and entity requirements; the effect bundles are wired
/// into its registered effect function so the expansion stays faithful to
/// the original.
#[derive(Debug, Clone)]
pub struct DurativeConversion {
    /// Name of the decomposition task
    pub task_name: String,
    /// Name of the lowered simple action
    pub action_name: String,
    pub duration: DurationSpec,
    pub entity_requirements: Vec<EntityRequirement>,
    /// `at_start` goals, then the action invocation, then `at_end` goals
    pub method_todos: TodoList,
    /// `over_all` conditions, checked at every primitive step in scope
    pub monitors: Vec<GoalTriple>,
    pub effects: EffectBundle,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{string_value, Domain, State};
    use crate::planning::PlannerBuilder;

    fn scan_action() -> DurativeAction {
        DurativeAction::new("scan_area", DurationSpec::Fixed(5))
            .condition_at_start("position", "robot1", "survey_site")
            .condition_over_all("powered", "robot1", true)
            .condition_at_end("position", "robot1", "survey_site")
            .effect_at_start("busy", "robot1", true)
            .effect_at_end("scanned", "survey_site", true)
    }

    #[test]
    fn test_conversion_shape() {
        let conversion = scan_action().convert().unwrap();

        assert_eq!(conversion.task_name, "scan_area");
        assert_eq!(conversion.action_name, "scan_area_span");
        assert_eq!(conversion.monitors.len(), 1);
        assert_eq!(conversion.method_todos.len(), 3);

        // Goals bracket the action invocation
        assert!(conversion.method_todos[0].is_goal());
        assert!(conversion.method_todos[1].is_action());
        assert!(conversion.method_todos[2].is_goal());
        assert_eq!(conversion.method_todos[1].name(), "scan_area_span");
    }

    #[test]
    fn test_effect_bundle_apply_order() {
        let mut bundle = EffectBundle::default();
        bundle.at_start.push(("phase".into(), "x".into(), "started".into()));
        bundle.at_end.push(("phase".into(), "x".into(), "finished".into()));

        let mut state = State::new("s");
        bundle.apply(&mut state);
        // End effects land after start effects
        assert_eq!(state.get("phase", "x"), Some(&"finished".into()));
    }

    #[test]
    fn test_unnamed_action_rejected() {
        let action = DurativeAction::new("", DurationSpec::zero());
        assert_eq!(action.convert().unwrap_err().kind(), "malformed_input");
    }

    /// Executing the converted method ends in the same state as applying
    /// the original's effects directly.
    #[test]
    fn test_expansion_preserves_semantics() {
        let durative = scan_action();

        let mut domain = Domain::new("survey");
        domain.declare_durative_action(durative.clone()).unwrap();
        // The at_start condition is achievable by moving the robot
        domain
            .declare_unigoal_method("position", |_state: &State, subject: &str, value: &crate::core::StateValue| {
                Some(vec![Todo::action(
                    "goto",
                    vec![string_value(subject), value.clone()],
                )])
            })
            .unwrap();
        domain
            .declare_action("goto", |state: &mut State, args: &[crate::core::StateValue]| {
                if let (Some(robot), Some(place)) = (args[0].as_str(), args[1].as_str()) {
                    state.set("position", robot, string_value(place));
                    return Some(state.clone());
                }
                None
            })
            .unwrap();

        let mut state = State::new("initial");
        state.set("position", "robot1", "dock".into());
        state.set("powered", "robot1", true.into());

        let planner = PlannerBuilder::new()
            .with_domain(domain)
            .with_verbose_level(0)
            .unwrap()
            .build()
            .unwrap();
        let result = planner
            .plan(state.clone(), vec![Todo::task("scan_area", vec![])])
            .unwrap();

        // Direct application of the original durative action's semantics
        let mut expected = state.clone();
        expected.set("position", "robot1", "survey_site".into());
        durative.effects.apply(&mut expected);

        for (predicate, subject, value) in [
            ("position", "robot1", string_value("survey_site")),
            ("busy", "robot1", true.into()),
            ("scanned", "survey_site", true.into()),
        ] {
            assert_eq!(result.final_state.get(predicate, subject), Some(&value));
            assert_eq!(expected.get(predicate, subject), Some(&value));
        }
    }
}
