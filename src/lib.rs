//! # tempoplan
//!
//! tempoplan is a hybrid hierarchical task-network (HTN) planner with
//! temporal reasoning. Given a domain (actions, task methods, unigoal
//! methods, multigoal methods), an initial relational state, and a todo
//! list of tasks, goals, or multigoals, it produces a **solution tree** of
//! primitive actions that drives the state to satisfy every goal, together
//! with an action schedule consistent with a **Simple Temporal Network**
//! over the actions' start and end points.
//!
//! ## Planning
//!
//! Domains are plain values built with a declaration API; methods are
//! first-class function values tried in declaration order:
//!
//! ```rust
//! use tempoplan::{Domain, State, Todo, PlannerBuilder, core::string_value};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut domain = Domain::new("logistics");
//!
//! domain.declare_action("drive", |state, args| {
//!     let (Some(truck), Some(place)) = (args[0].as_str(), args[1].as_str()) else {
//!         return None;
//!     };
//!     state.set("location", truck, string_value(place));
//!     Some(state.clone())
//! })?;
//!
//! domain.declare_task_method("deliver", |state, args| {
//!     let (Some(truck), Some(place)) = (args[0].as_str(), args[1].as_str()) else {
//!         return None;
//!     };
//!     if state.matches("location", truck, &string_value(place)) {
//!         return Some(vec![]);
//!     }
//!     Some(vec![Todo::action("drive", vec![args[0].clone(), args[1].clone()])])
//! })?;
//!
//! let planner = PlannerBuilder::new()
//!     .with_domain(domain)
//!     .with_verbose_level(0)?
//!     .build()?;
//!
//! let mut state = State::new("initial");
//! state.set("location", "truck1", string_value("depot"));
//!
//! let result = planner.plan(
//!     state,
//!     vec![Todo::task("deliver", vec![string_value("truck1"), string_value("dock")])],
//! )?;
//! assert_eq!(result.tree.plan().len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Goals and multigoals
//!
//! Besides tasks, todo items can be single goals `(predicate, subject,
//! value)` handled by unigoal methods, or multigoals handled by multigoal
//! methods. Goals already satisfied by the state are skipped; after a
//! method's expansion completes, the planner verifies the goal actually
//! holds and otherwise moves to the next method.
//!
//! ## Temporal reasoning
//!
//! Every applied action is scheduled as an interval in a Simple Temporal
//! Network, chained in plan order. Durations come from a
//! [`temporal::DurationSpec`] on the action (fixed, bounded, conditional
//! on the state, resource-dependent, or computed), and per-action
//! deadlines and release times become constraints anchored at the schedule
//! origin. Durative actions with `at_start`/`over_all`/`at_end` bundles
//! are lowered to a plain action plus a method decomposition by
//! [`temporal::DurativeAction::convert`].
//!
//! ## Lazy execution
//!
//! [`Planner::run_lazy`] plans and then walks the solution tree, running
//! each primitive's command (`c_<action>`, falling back to the action)
//! against the live state. When a command fails, the executor re-refines
//! the smallest enclosing subtree that still has untried methods, using
//! the post-failure state; only when no subtree can be re-refined does the
//! failure surface.

pub mod core;
pub mod temporal;
pub mod planning;
pub mod domains;
pub mod error;

// Re-export main types for convenience
pub use core::{ActionSpec, Domain, Multigoal, MultigoalResponse, State, Todo};
pub use error::{PlannerError, Result};
pub use planning::{
    plan, run_lazy, run_lazy_tree, CancelToken, ExecutionResult, PlanOptions, PlanResult, Planner,
    PlannerBuilder, SolutionTree,
};
pub use temporal::{DurationSpec, Stn};

/// Current version of tempoplan
pub const VERSION: &str = "0.3.0";
