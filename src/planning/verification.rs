//! Goal verification
//!
//! After a unigoal or multigoal method's expansion completes, the planner
//! checks that the goal actually holds in the resulting state. A method
//! that "succeeds" without achieving its goal is treated exactly like a
//! failed method, so the planner moves on to the next alternative.

use crate::core::{GoalTriple, Multigoal, State, StateValue};

/// Whether a unigoal method achieved its goal
pub fn goal_achieved(state: &State, predicate: &str, subject: &str, desired: &StateValue) -> bool {
    state.satisfies_goal(predicate, subject, desired)
}

/// The goals of a multigoal that a method's expansion left unachieved,
/// in declaration order
pub fn goals_not_achieved(state: &State, multigoal: &Multigoal) -> Vec<GoalTriple> {
    multigoal.unsatisfied_goals(state)
}
