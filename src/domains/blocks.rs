//! Blocks world domain
//!
//! A near-optimal blocks-world domain built on the algorithm from:
//!
//! > N. Gupta and D. S. Nau. "On the complexity of blocks-world planning."
//! > *Artificial Intelligence* 56(2-3):223-254, 1992.
//!
//! Facts: `pos(block)` is `"table"`, `"hand"`, or another block;
//! `clear(block)` is a boolean; `holding(hand)` is `false` or a block name.
//! The multigoal method repeatedly picks a clear block that can move
//! straight to its final position, or failing that parks a waiting block
//! on the table.

use super::get_bool;
use crate::core::{string_value, Domain, Multigoal, MultigoalResponse, State, StateValue, Todo};
use crate::error::Result;

/// Create the blocks world domain with its actions, task methods, and
/// multigoal method
pub fn create_blocks_domain() -> Result<Domain> {
    let mut domain = Domain::new("blocks");
    declare_actions(&mut domain)?;
    declare_methods(&mut domain)?;
    Ok(domain)
}

fn declare_actions(domain: &mut Domain) -> Result<()> {
    // pickup: take a clear block from the table
    domain.declare_action("pickup", |state: &mut State, args: &[StateValue]| {
        let block = args.first()?.as_str()?;
        if state.matches("pos", block, &"table".into())
            && state.matches("clear", block, &true.into())
            && state.matches("holding", "hand", &false.into())
        {
            state.set("pos", block, string_value("hand"));
            state.set("clear", block, false.into());
            state.set("holding", "hand", string_value(block));
            return Some(state.clone());
        }
        None
    })?;

    // unstack: take a clear block off another block
    domain.declare_action("unstack", |state: &mut State, args: &[StateValue]| {
        let block = args.first()?.as_str()?;
        let under = args.get(1)?.as_str()?;
        if under != "table"
            && state.matches("pos", block, &string_value(under))
            && state.matches("clear", block, &true.into())
            && state.matches("holding", "hand", &false.into())
        {
            state.set("pos", block, string_value("hand"));
            state.set("clear", block, false.into());
            state.set("holding", "hand", string_value(block));
            state.set("clear", under, true.into());
            return Some(state.clone());
        }
        None
    })?;

    // putdown: put the held block on the table
    domain.declare_action("putdown", |state: &mut State, args: &[StateValue]| {
        let block = args.first()?.as_str()?;
        if state.matches("pos", block, &"hand".into()) {
            state.set("pos", block, string_value("table"));
            state.set("clear", block, true.into());
            state.set("holding", "hand", false.into());
            return Some(state.clone());
        }
        None
    })?;

    // stack: put the held block on a clear block
    domain.declare_action("stack", |state: &mut State, args: &[StateValue]| {
        let block = args.first()?.as_str()?;
        let target = args.get(1)?.as_str()?;
        if state.matches("pos", block, &"hand".into())
            && state.matches("clear", target, &true.into())
        {
            state.set("pos", block, string_value(target));
            state.set("clear", block, true.into());
            state.set("holding", "hand", false.into());
            state.set("clear", target, false.into());
            return Some(state.clone());
        }
        None
    })?;

    Ok(())
}

fn declare_methods(domain: &mut Domain) -> Result<()> {
    domain.declare_task_method("take", |state: &State, args: &[StateValue]| {
        let block = args.first()?.as_str()?;
        m_take(state, block)
    })?;

    domain.declare_task_method("put", |state: &State, args: &[StateValue]| {
        let block = args.first()?.as_str()?;
        let target = args.get(1)?.as_str()?;
        m_put(state, block, target)
    })?;

    domain.declare_multigoal_method(|state: &State, multigoal: &Multigoal| {
        m_moveblocks(state, multigoal).map(MultigoalResponse::Todos)
    })?;

    Ok(())
}

/// Whether a block (and everything under it) will never need to move
fn is_done(block: &str, state: &State, multigoal: &Multigoal) -> bool {
    if block == "table" {
        return true;
    }
    if let Some(goal_pos) = multigoal.get_goal("pos", block) {
        if state.get("pos", block) != Some(goal_pos) {
            return false;
        }
    }
    match state.get("pos", block).and_then(|pos| pos.as_str()) {
        Some("table") => true,
        Some("hand") | None => true,
        Some(under) => is_done(under, state, multigoal),
    }
}

/// Planning status of one block under the Gupta-Nau classification
fn status(block: &str, state: &State, multigoal: &Multigoal) -> &'static str {
    if is_done(block, state, multigoal) {
        return "done";
    }
    if get_bool(state, "clear", block) != Some(true) {
        return "inaccessible";
    }
    let Some(goal_pos) = multigoal.get_goal("pos", block).and_then(|pos| pos.as_str()) else {
        return "move-to-table";
    };
    if goal_pos == "table" {
        return "move-to-table";
    }
    if is_done(goal_pos, state, multigoal) && get_bool(state, "clear", goal_pos) == Some(true) {
        return "move-to-block";
    }
    "waiting"
}

/// All currently clear blocks, in fact-declaration order
fn all_clear_blocks(state: &State) -> Vec<String> {
    state
        .subjects_with("clear", &true.into())
        .into_iter()
        .cloned()
        .collect()
}

/// The Gupta-Nau multigoal method: move one block, then re-achieve the
/// remaining goals
fn m_moveblocks(state: &State, multigoal: &Multigoal) -> Option<Vec<Todo>> {
    // A clear block that can go straight to its final position
    for block in all_clear_blocks(state) {
        match status(&block, state, multigoal) {
            "move-to-block" => {
                let target = multigoal.get_goal("pos", &block)?;
                return Some(vec![
                    Todo::task("take", vec![string_value(&block)]),
                    Todo::task("put", vec![string_value(&block), target.clone()]),
                    Todo::multigoal(multigoal.clone()),
                ]);
            }
            "move-to-table" => {
                return Some(vec![
                    Todo::task("take", vec![string_value(&block)]),
                    Todo::task("put", vec![string_value(&block), string_value("table")]),
                    Todo::multigoal(multigoal.clone()),
                ]);
            }
            _ => {}
        }
    }

    // Nothing can reach its final position; park a waiting stacked block
    // on the table to clear the way
    for block in all_clear_blocks(state) {
        if status(&block, state, multigoal) == "waiting"
            && !state.matches("pos", &block, &"table".into())
        {
            return Some(vec![
                Todo::task("take", vec![string_value(&block)]),
                Todo::task("put", vec![string_value(&block), string_value("table")]),
                Todo::multigoal(multigoal.clone()),
            ]);
        }
    }

    // No block needs moving
    Some(vec![])
}

/// take: pickup from the table or unstack from another block
fn m_take(state: &State, block: &str) -> Option<Vec<Todo>> {
    if get_bool(state, "clear", block) != Some(true) {
        return None;
    }
    match state.get("pos", block).and_then(|pos| pos.as_str()) {
        Some("table") => Some(vec![Todo::action("pickup", vec![string_value(block)])]),
        Some(under) if under != "hand" => Some(vec![Todo::action(
            "unstack",
            vec![string_value(block), string_value(under)],
        )]),
        _ => None,
    }
}

/// put: putdown on the table or stack on another block
fn m_put(state: &State, block: &str, target: &str) -> Option<Vec<Todo>> {
    if !state.matches("pos", block, &"hand".into()) {
        return None;
    }
    if target == "table" {
        Some(vec![Todo::action("putdown", vec![string_value(block)])])
    } else {
        Some(vec![Todo::action(
            "stack",
            vec![string_value(block), string_value(target)],
        )])
    }
}
