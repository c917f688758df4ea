//! Simple travel domain
//!
//! People move between places by walking short distances step by step, or
//! by calling a taxi, riding it one distance unit at a time, and paying
//! the driver at the destination. Fares follow `taxi_rate`: a flag fall of
//! 1.5 plus 0.5 per unit, accumulated while riding.

use super::{distance, get_f64, get_str, get_u64, taxi_rate};
use crate::core::{string_value, ActionSpec, Domain, State, StateValue, Todo};
use crate::error::Result;
use crate::temporal::DurationSpec;

/// Distances up to this many units are walked
const WALK_LIMIT: f64 = 4.0;

/// Create the travel domain
pub fn create_travel_domain() -> Result<Domain> {
    let mut domain = Domain::new("travel");
    declare_actions(&mut domain)?;
    declare_methods(&mut domain)?;
    Ok(domain)
}

/// A ready-made initial state: Alice at `home_a` (8 units from the park),
/// Bob at `home_b` (2 units from the park), one taxi at the station.
pub fn create_travel_state() -> State {
    State::from_triples(
        "travel_initial",
        vec![
            ("location".into(), "alice".into(), "home_a".into()),
            ("location".into(), "bob".into(), "home_b".into()),
            ("location".into(), "taxi1".into(), "station".into()),
            ("is_taxi".into(), "taxi1".into(), true.into()),
            ("cash".into(), "alice".into(), 20.0.into()),
            ("cash".into(), "bob".into(), 15.0.into()),
            ("owe".into(), "alice".into(), 0.0.into()),
            ("owe".into(), "bob".into(), 0.0.into()),
            ("distance".into(), "home_a:park".into(), 8.0.into()),
            ("distance".into(), "home_b:park".into(), 2.0.into()),
            ("distance".into(), "home_a:home_b".into(), 7.0.into()),
            ("distance".into(), "station:home_a".into(), 1.0.into()),
            ("distance".into(), "station:home_b".into(), 7.0.into()),
            ("distance".into(), "station:park".into(), 9.0.into()),
        ],
    )
}

fn declare_actions(domain: &mut Domain) -> Result<()> {
    // walk_step: advance one unit on foot; the walker's location flips to
    // the destination on the final step
    domain.declare_action_spec(
        "walk_step",
        ActionSpec::new(|state: &mut State, args: &[StateValue]| {
            let person = args.first()?.as_str()?;
            let from = args.get(1)?.as_str()?;
            let to = args.get(2)?.as_str()?;
            let units = distance(state, from, to)?.ceil() as u64;
            let walked = get_u64(state, "walked", person).unwrap_or(0) + 1;
            if walked >= units {
                state.remove("walked", person);
                state.set("location", person, string_value(to));
            } else {
                state.set("walked", person, walked.into());
            }
            Some(state.clone())
        })
        .with_arity(3)
        .with_precondition(|state: &State, args: &[StateValue]| {
            let (Some(person), Some(from)) = (args[0].as_str(), args[1].as_str()) else {
                return false;
            };
            get_str(state, "location", person).as_deref() == Some(from)
        })
        .with_duration(DurationSpec::Fixed(600)),
    )?;

    // call_taxi: the taxi drives to the caller, who boards and owes the
    // flag fall
    domain.declare_action_spec(
        "call_taxi",
        ActionSpec::new(|state: &mut State, args: &[StateValue]| {
            let person = args.first()?.as_str()?;
            let taxi = args.get(1)?.as_str()?;
            let here = get_str(state, "location", person)?;
            state.set("location", taxi, string_value(&here));
            state.set("riding", person, string_value(taxi));
            state.set("owe", person, 1.5.into());
            Some(state.clone())
        })
        .with_arity(2)
        .with_precondition(|state: &State, args: &[StateValue]| {
            let (Some(person), Some(taxi)) = (args[0].as_str(), args[1].as_str()) else {
                return false;
            };
            state.matches("is_taxi", taxi, &true.into())
                && state.has_fact("location", person)
                && !state.has_fact("riding", person)
        })
        .with_duration(DurationSpec::Variable { min: 120, max: 600 }),
    )?;

    // ride_step: one unit in the taxi; the meter ticks every unit and the
    // rider (and taxi) arrive on the final step
    domain.declare_action_spec(
        "ride_step",
        ActionSpec::new(|state: &mut State, args: &[StateValue]| {
            let person = args.first()?.as_str()?;
            let to = args.get(1)?.as_str()?;
            let taxi = get_str(state, "riding", person)?;
            let here = get_str(state, "location", person)?;
            let units = distance(state, &here, to)?.ceil() as u64;
            let owed = get_f64(state, "owe", person).unwrap_or(0.0);
            state.set("owe", person, (owed + 0.5).into());
            let ridden = get_u64(state, "ridden", person).unwrap_or(0) + 1;
            if ridden >= units {
                state.remove("ridden", person);
                state.set("location", person, string_value(to));
                state.set("location", &taxi, string_value(to));
            } else {
                state.set("ridden", person, ridden.into());
            }
            Some(state.clone())
        })
        .with_arity(2)
        .with_precondition(|state: &State, args: &[StateValue]| {
            args[0].as_str().is_some_and(|person| state.has_fact("riding", person))
        })
        .with_duration(DurationSpec::Fixed(120)),
    )?;

    // pay_driver: settle the fare on arrival and leave the taxi
    domain.declare_action_spec(
        "pay_driver",
        ActionSpec::new(|state: &mut State, args: &[StateValue]| {
            let person = args.first()?.as_str()?;
            let owed = get_f64(state, "owe", person)?;
            let cash = get_f64(state, "cash", person)?;
            if cash < owed {
                return None;
            }
            state.set("cash", person, (cash - owed).into());
            state.set("owe", person, 0.0.into());
            state.remove("riding", person);
            Some(state.clone())
        })
        .with_arity(2)
        .with_precondition(|state: &State, args: &[StateValue]| {
            let (Some(person), Some(place)) = (args[0].as_str(), args[1].as_str()) else {
                return false;
            };
            get_str(state, "location", person).as_deref() == Some(place)
        })
        .with_duration(DurationSpec::Fixed(60)),
    )?;

    Ok(())
}

fn declare_methods(domain: &mut Domain) -> Result<()> {
    // Walking, preferred for short distances
    domain.declare_task_method("travel", |state: &State, args: &[StateValue]| {
        let person = args.first()?.as_str()?;
        let destination = args.get(1)?.as_str()?;
        let here = get_str(state, "location", person)?;
        if here == destination {
            return Some(vec![]);
        }
        let dist = distance(state, &here, destination)?;
        if dist > WALK_LIMIT {
            return None;
        }
        let steps = dist.ceil() as usize;
        Some(vec![
            Todo::action(
                "walk_step",
                vec![
                    string_value(person),
                    string_value(&here),
                    string_value(destination),
                ],
            );
            steps
        ])
    })?;

    // Taking a taxi, when the traveller can afford the fare
    domain.declare_task_method("travel", |state: &State, args: &[StateValue]| {
        let person = args.first()?.as_str()?;
        let destination = args.get(1)?.as_str()?;
        let here = get_str(state, "location", person)?;
        if here == destination {
            return Some(vec![]);
        }
        let dist = distance(state, &here, destination)?;
        let cash = get_f64(state, "cash", person)?;
        if cash < taxi_rate(dist) {
            return None;
        }
        let taxi = state
            .subjects_with("is_taxi", &true.into())
            .first()
            .map(|t| t.to_string())?;

        let mut todos = vec![Todo::action(
            "call_taxi",
            vec![string_value(person), string_value(taxi)],
        )];
        for _ in 0..dist.ceil() as usize {
            todos.push(Todo::action(
                "ride_step",
                vec![string_value(person), string_value(destination)],
            ));
        }
        todos.push(Todo::action(
            "pay_driver",
            vec![string_value(person), string_value(destination)],
        ));
        Some(todos)
    })?;

    // Reaching a location goal means travelling there
    domain.declare_unigoal_method("location", |_state: &State, subject: &str, value: &StateValue| {
        Some(vec![Todo::task(
            "travel",
            vec![string_value(subject), value.clone()],
        )])
    })?;

    Ok(())
}
