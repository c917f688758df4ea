//! Domain representation for tempoplan

use super::{GoalTriple, Multigoal, State, StateValue, Todo, TodoList};
use crate::error::Result;
use crate::temporal::duration::DurationSpec;
use crate::temporal::durative::DurativeAction;
use crate::temporal::TemporalConstraint;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Type alias for action effect functions.
/// Effects take a mutable state and arguments, return `Option<State>`
/// (`None` if not applicable).
pub type ActionFn = Arc<dyn Fn(&mut State, &[StateValue]) -> Option<State> + Send + Sync>;

/// Type alias for command functions.
/// Commands are like actions but for execution (not planning).
pub type CommandFn = Arc<dyn Fn(&mut State, &[StateValue]) -> Option<State> + Send + Sync>;

/// Type alias for precondition functions
pub type PreconditionFn = Arc<dyn Fn(&State, &[StateValue]) -> bool + Send + Sync>;

/// Type alias for task method functions.
/// Task methods take a state and arguments, return `Option<TodoList>`
/// (`None` if not applicable).
pub type TaskMethodFn = Arc<dyn Fn(&State, &[StateValue]) -> Option<TodoList> + Send + Sync>;

/// Type alias for unigoal method functions.
/// Unigoal methods take a state, subject, and desired value.
pub type UnigoalMethodFn = Arc<dyn Fn(&State, &str, &StateValue) -> Option<TodoList> + Send + Sync>;

/// Type alias for multigoal method functions
pub type MultigoalMethodFn = Arc<dyn Fn(&State, &Multigoal) -> Option<MultigoalResponse> + Send + Sync>;

/// Type alias for multitodo method functions; each rewrites a todo list
pub type MultitodoMethodFn = Arc<dyn Fn(&State, &[Todo]) -> Option<TodoList> + Send + Sync>;

/// What a multigoal method may answer with
#[derive(Debug, Clone, PartialEq)]
pub enum MultigoalResponse {
    /// A decomposition into sub-todos
    Todos(TodoList),
    /// A reduced multigoal the planner loops on
    Remainder(Multigoal),
}

/// An entity an action needs in order to run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRequirement {
    pub entity_type: String,
    pub capabilities: Vec<String>,
}

impl EntityRequirement {
    pub fn new(entity_type: impl Into<String>, capabilities: Vec<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            capabilities,
        }
    }
}

/// Everything the domain knows about one action
#[derive(Clone)]
pub struct ActionSpec {
    /// Expected argument count, checked before the precondition when set
    pub arity: Option<usize>,
    pub duration: DurationSpec,
    pub entity_requirements: Vec<EntityRequirement>,
    pub temporal_constraints: Vec<TemporalConstraint>,
    precondition: Option<PreconditionFn>,
    effect: ActionFn,
}

impl ActionSpec {
    /// Create an action spec from its effect function, with zero duration
    /// and no further restrictions
    pub fn new<F>(effect: F) -> Self
    where
        F: Fn(&mut State, &[StateValue]) -> Option<State> + Send + Sync + 'static,
    {
        Self {
            arity: None,
            duration: DurationSpec::zero(),
            entity_requirements: Vec::new(),
            temporal_constraints: Vec::new(),
            precondition: None,
            effect: Arc::new(effect),
        }
    }

    pub fn with_arity(mut self, arity: usize) -> Self {
        self.arity = Some(arity);
        self
    }

    pub fn with_duration(mut self, duration: DurationSpec) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_entity_requirement(mut self, requirement: EntityRequirement) -> Self {
        self.entity_requirements.push(requirement);
        self
    }

    pub fn with_temporal_constraint(mut self, constraint: TemporalConstraint) -> Self {
        self.temporal_constraints.push(constraint);
        self
    }

    pub fn with_precondition<F>(mut self, precondition: F) -> Self
    where
        F: Fn(&State, &[StateValue]) -> bool + Send + Sync + 'static,
    {
        self.precondition = Some(Arc::new(precondition));
        self
    }

    /// Evaluate the declared precondition (and arity) against a state.
    /// Actions without a declared precondition pass; their effect function
    /// may still refuse by returning `None`.
    pub fn precondition_met(&self, state: &State, args: &[StateValue]) -> bool {
        if let Some(arity) = self.arity {
            if args.len() != arity {
                return false;
            }
        }
        match &self.precondition {
            Some(precondition) => precondition(state, args),
            None => true,
        }
    }

    /// Apply the effect to a copy of `state`, producing the successor state
    /// or `None` when the action refuses
    pub fn apply(&self, state: &State, args: &[StateValue]) -> Option<State> {
        let mut successor = state.clone();
        (self.effect)(&mut successor, args)
    }
}

impl std::fmt::Debug for ActionSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionSpec")
            .field("arity", &self.arity)
            .field("duration", &self.duration)
            .field("entity_requirements", &self.entity_requirements)
            .field("temporal_constraints", &self.temporal_constraints)
            .field("has_precondition", &self.precondition.is_some())
            .finish()
    }
}

/// Represents a planning domain containing actions, commands, and methods
#[derive(Clone)]
pub struct Domain {
    /// Name of the domain
    pub name: String,
    /// Map of action names to their specs
    actions: IndexMap<String, ActionSpec>,
    /// Map of command names to command functions
    commands: IndexMap<String, CommandFn>,
    /// Map of task names to lists of task method functions
    task_methods: IndexMap<String, Vec<TaskMethodFn>>,
    /// Map of goal predicates to lists of unigoal method functions
    unigoal_methods: IndexMap<String, Vec<UnigoalMethodFn>>,
    /// List of multigoal method functions
    multigoal_methods: Vec<MultigoalMethodFn>,
    /// List of multitodo method functions
    multitodo_methods: Vec<MultitodoMethodFn>,
    /// Over-all monitors, keyed by the task whose scope they guard
    monitors: IndexMap<String, Vec<GoalTriple>>,
}

impl Domain {
    /// Create a new domain with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            actions: IndexMap::new(),
            commands: IndexMap::new(),
            task_methods: IndexMap::new(),
            unigoal_methods: IndexMap::new(),
            multigoal_methods: Vec::new(),
            multitodo_methods: Vec::new(),
            monitors: IndexMap::new(),
        }
    }

    /// Declare a single action from its effect function
    pub fn declare_action<F>(&mut self, name: impl Into<String>, effect: F) -> Result<()>
    where
        F: Fn(&mut State, &[StateValue]) -> Option<State> + Send + Sync + 'static,
    {
        self.actions.insert(name.into(), ActionSpec::new(effect));
        Ok(())
    }

    /// Declare a single action with a full spec
    pub fn declare_action_spec(&mut self, name: impl Into<String>, spec: ActionSpec) -> Result<()> {
        self.actions.insert(name.into(), spec);
        Ok(())
    }

    /// Declare a single command
    pub fn declare_command<F>(&mut self, name: impl Into<String>, command: F) -> Result<()>
    where
        F: Fn(&mut State, &[StateValue]) -> Option<State> + Send + Sync + 'static,
    {
        self.commands.insert(name.into(), Arc::new(command));
        Ok(())
    }

    /// Declare task methods for a specific task name, appended in order
    pub fn declare_task_methods<F>(&mut self, task_name: impl Into<String>, methods: Vec<F>) -> Result<()>
    where
        F: Fn(&State, &[StateValue]) -> Option<TodoList> + Send + Sync + 'static,
    {
        let task_name = task_name.into();
        let method_fns: Vec<TaskMethodFn> = methods
            .into_iter()
            .map(|f| Arc::new(f) as TaskMethodFn)
            .collect();

        self.task_methods.entry(task_name).or_default().extend(method_fns);
        Ok(())
    }

    /// Declare a single task method
    pub fn declare_task_method<F>(&mut self, task_name: impl Into<String>, method: F) -> Result<()>
    where
        F: Fn(&State, &[StateValue]) -> Option<TodoList> + Send + Sync + 'static,
    {
        self.task_methods
            .entry(task_name.into())
            .or_default()
            .push(Arc::new(method));
        Ok(())
    }

    /// Declare unigoal methods for a goal predicate, appended in order
    pub fn declare_unigoal_methods<F>(&mut self, predicate: impl Into<String>, methods: Vec<F>) -> Result<()>
    where
        F: Fn(&State, &str, &StateValue) -> Option<TodoList> + Send + Sync + 'static,
    {
        let predicate = predicate.into();
        let method_fns: Vec<UnigoalMethodFn> = methods
            .into_iter()
            .map(|f| Arc::new(f) as UnigoalMethodFn)
            .collect();

        self.unigoal_methods.entry(predicate).or_default().extend(method_fns);
        Ok(())
    }

    /// Declare a single unigoal method
    pub fn declare_unigoal_method<F>(&mut self, predicate: impl Into<String>, method: F) -> Result<()>
    where
        F: Fn(&State, &str, &StateValue) -> Option<TodoList> + Send + Sync + 'static,
    {
        self.unigoal_methods
            .entry(predicate.into())
            .or_default()
            .push(Arc::new(method));
        Ok(())
    }

    /// Declare a single multigoal method
    pub fn declare_multigoal_method<F>(&mut self, method: F) -> Result<()>
    where
        F: Fn(&State, &Multigoal) -> Option<MultigoalResponse> + Send + Sync + 'static,
    {
        self.multigoal_methods.push(Arc::new(method));
        Ok(())
    }

    /// Declare multiple multigoal methods, appended in order
    pub fn declare_multigoal_methods<F>(&mut self, methods: Vec<F>) -> Result<()>
    where
        F: Fn(&State, &Multigoal) -> Option<MultigoalResponse> + Send + Sync + 'static,
    {
        for method in methods {
            self.multigoal_methods.push(Arc::new(method));
        }
        Ok(())
    }

    /// Declare a single multitodo method
    pub fn declare_multitodo_method<F>(&mut self, method: F) -> Result<()>
    where
        F: Fn(&State, &[Todo]) -> Option<TodoList> + Send + Sync + 'static,
    {
        self.multitodo_methods.push(Arc::new(method));
        Ok(())
    }

    /// Declare a durative action: lowers it to a simple action plus a task
    /// method and registers its over-all monitors.
    pub fn declare_durative_action(&mut self, durative: DurativeAction) -> Result<()> {
        let conversion = durative.convert()?;

        let effects = conversion.effects.clone();
        let spec = ActionSpec::new(move |state: &mut State, _args: &[StateValue]| {
            effects.apply(state);
            Some(state.clone())
        })
        .with_duration(conversion.duration.clone());
        let spec = conversion
            .entity_requirements
            .iter()
            .cloned()
            .fold(spec, ActionSpec::with_entity_requirement);
        self.declare_action_spec(conversion.action_name.clone(), spec)?;

        let method_todos = conversion.method_todos.clone();
        self.declare_task_method(conversion.task_name.clone(), move |_state: &State, _args: &[StateValue]| {
            Some(method_todos.clone())
        })?;

        if !conversion.monitors.is_empty() {
            self.monitors
                .entry(conversion.task_name)
                .or_default()
                .extend(conversion.monitors);
        }
        Ok(())
    }

    /// Get an action spec by name
    pub fn get_action(&self, name: &str) -> Option<&ActionSpec> {
        self.actions.get(name)
    }

    /// Get a command by name
    pub fn get_command(&self, name: &str) -> Option<&CommandFn> {
        self.commands.get(name)
    }

    /// Get task methods for a task name, in declaration order
    pub fn get_task_methods(&self, task_name: &str) -> Option<&Vec<TaskMethodFn>> {
        self.task_methods.get(task_name)
    }

    /// Get unigoal methods for a goal predicate, in declaration order
    pub fn get_unigoal_methods(&self, predicate: &str) -> Option<&Vec<UnigoalMethodFn>> {
        self.unigoal_methods.get(predicate)
    }

    /// Get all multigoal methods, in declaration order
    pub fn get_multigoal_methods(&self) -> &Vec<MultigoalMethodFn> {
        &self.multigoal_methods
    }

    /// Get all multitodo methods, in declaration order
    pub fn get_multitodo_methods(&self) -> &Vec<MultitodoMethodFn> {
        &self.multitodo_methods
    }

    /// Over-all monitors guarding a task's scope
    pub fn get_monitors(&self, task_name: &str) -> Option<&Vec<GoalTriple>> {
        self.monitors.get(task_name)
    }

    /// Run every registered multitodo method, in order, over a todo list.
    /// Methods answering `None` leave the list unchanged.
    pub fn rewrite_todos(&self, state: &State, todos: TodoList) -> TodoList {
        self.multitodo_methods
            .iter()
            .fold(todos, |current, method| {
                method(state, &current).unwrap_or(current)
            })
    }

    /// Check if an action exists
    pub fn has_action(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    /// Check if a command exists
    pub fn has_command(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Check if task methods exist for a task name
    pub fn has_task_methods(&self, task_name: &str) -> bool {
        self.task_methods.contains_key(task_name)
    }

    /// Check if unigoal methods exist for a goal predicate
    pub fn has_unigoal_methods(&self, predicate: &str) -> bool {
        self.unigoal_methods.contains_key(predicate)
    }

    /// Get all action names
    pub fn action_names(&self) -> Vec<&String> {
        self.actions.keys().collect()
    }

    /// Get all command names
    pub fn command_names(&self) -> Vec<&String> {
        self.commands.keys().collect()
    }

    /// Get all task names
    pub fn task_names(&self) -> Vec<&String> {
        self.task_methods.keys().collect()
    }

    /// Get all goal predicates with unigoal methods
    pub fn unigoal_predicates(&self) -> Vec<&String> {
        self.unigoal_methods.keys().collect()
    }

    /// Create a copy of the domain with an optional new name
    pub fn copy(&self, new_name: Option<String>) -> Self {
        let mut copy = self.clone();
        if let Some(name) = new_name {
            copy.name = name;
        }
        copy
    }

    /// Display domain information
    pub fn display(&self) {
        println!("\nDomain name: {}", self.name);
        self.print_actions();
        self.print_commands();
        self.print_methods();
    }

    /// Print all actions
    pub fn print_actions(&self) {
        if self.actions.is_empty() {
            println!("-- There are no actions --");
        } else {
            let action_names: Vec<String> = self.actions.keys().cloned().collect();
            println!("-- Actions: {}", action_names.join(", "));
        }
    }

    /// Print all commands
    pub fn print_commands(&self) {
        if self.commands.is_empty() {
            println!("-- There are no commands --");
        } else {
            let command_names: Vec<String> = self.commands.keys().cloned().collect();
            println!("-- Commands: {}", command_names.join(", "));
        }
    }

    /// Print all methods
    pub fn print_methods(&self) {
        if self.task_methods.is_empty() {
            println!("-- There are no task methods --");
        } else {
            println!("\nTask name:         Relevant task methods:");
            println!("---------------    ----------------------");
            for (task_name, methods) in &self.task_methods {
                println!("{:<19}{} methods", task_name, methods.len());
            }
            println!();
        }

        if self.unigoal_methods.is_empty() {
            println!("-- There are no unigoal methods --");
        } else {
            println!("Goal predicate:    Relevant unigoal methods:");
            println!("---------------    -------------------------");
            for (predicate, methods) in &self.unigoal_methods {
                println!("{:<19}{} methods", predicate, methods.len());
            }
            println!();
        }

        if self.multigoal_methods.is_empty() {
            println!("-- There are no multigoal methods --");
        } else {
            println!("-- Multigoal methods: {} methods", self.multigoal_methods.len());
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<Domain {}>", self.name)
    }
}

impl std::fmt::Debug for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Domain")
            .field("name", &self.name)
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .field("commands", &self.commands.keys().collect::<Vec<_>>())
            .field("task_methods", &self.task_methods.keys().collect::<Vec<_>>())
            .field("unigoal_methods", &self.unigoal_methods.keys().collect::<Vec<_>>())
            .field("multigoal_methods_count", &self.multigoal_methods.len())
            .field("multitodo_methods_count", &self.multitodo_methods.len())
            .finish()
    }
}
