//! Main executable for tempoplan demonstrations

use tempoplan::domains::{create_blocks_domain, create_travel_domain, create_travel_state};
use tempoplan::{Multigoal, PlannerBuilder, Todo};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("tempoplan - HTN planning with temporal reasoning");
    println!("================================================");

    // Travel: Alice takes a taxi to the park
    let planner = PlannerBuilder::new()
        .with_domain(create_travel_domain()?)
        .with_verbose_level(1)?
        .build()?;
    let result = planner.plan(
        create_travel_state(),
        vec![Todo::goal("location", "alice", "park".into())],
    )?;
    result.tree.display();

    // Blocks: the Sussman anomaly
    let mut state = tempoplan::State::from_triples(
        "sussman",
        vec![
            ("pos".into(), "c".into(), "a".into()),
            ("pos".into(), "a".into(), "table".into()),
            ("pos".into(), "b".into(), "table".into()),
            ("clear".into(), "c".into(), true.into()),
            ("clear".into(), "a".into(), false.into()),
            ("clear".into(), "b".into(), true.into()),
        ],
    );
    state.set("holding", "hand", false.into());

    let mut goal = Multigoal::new("a_on_b_on_c");
    goal.set_goal("pos", "a", "b".into());
    goal.set_goal("pos", "b", "c".into());

    let planner = PlannerBuilder::new()
        .with_domain(create_blocks_domain()?)
        .with_verbose_level(1)?
        .build()?;
    let result = planner.plan(state, vec![Todo::multigoal(goal)])?;
    result.tree.display();

    Ok(())
}
