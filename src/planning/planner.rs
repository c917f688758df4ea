//! The HTN refinement planner
//!
//! Depth-first refinement with backtracking. Each todo is dispatched by
//! kind: primitive actions check their precondition and apply their effect;
//! tasks, goals, and multigoals enumerate their registered methods in
//! declaration order, recursing into the sub-todos each method proposes.
//! A failed alternative truncates the subtree it built, restores the
//! temporal network, and moves the node's method cursor to the next
//! candidate. Every applied action is scheduled against the session's
//! Simple Temporal Network; a plan whose schedule is inconsistent is
//! rejected.

use super::tree::{NodeId, NodePayload, NodeStatus, SolutionTree};
use super::verification::{goal_achieved, goals_not_achieved};
use super::Planner;
use crate::core::{todo_list_to_string, Multigoal, MultigoalResponse, State, StateValue, Todo};
use crate::error::{PlannerError, Result};
use crate::temporal::{Bound, Interval, Stn, ORIGIN_POINT};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

/// Outcome of a successful planning run
#[derive(Debug, Clone)]
pub struct PlanResult {
    /// The tree of expansions terminating in primitive actions
    pub tree: SolutionTree,
    /// The state after applying all primitives in DFS order
    pub final_state: State,
    /// The schedule: one interval per primitive, chained in plan order
    pub stn: Stn,
}

/// Mutable state of one planning run
pub(crate) struct Session {
    pub tree: SolutionTree,
    pub stn: Stn,
    /// End point of the most recently scheduled action
    pub last_end: Option<String>,
    pub started: Instant,
}

impl Session {
    pub(crate) fn new(tree: SolutionTree) -> Self {
        let mut stn = Stn::new();
        stn.add_time_point(ORIGIN_POINT);
        Self {
            tree,
            stn,
            last_end: None,
            started: Instant::now(),
        }
    }
}

/// Snapshot taken before a method attempt, restored when it fails
struct Checkpoint {
    tree_len: usize,
    stn: Stn,
    last_end: Option<String>,
}

impl Checkpoint {
    fn take(session: &Session) -> Self {
        Self {
            tree_len: session.tree.len(),
            stn: session.stn.clone(),
            last_end: session.last_end.clone(),
        }
    }

    fn restore(self, session: &mut Session) {
        session.tree.truncate(self.tree_len);
        session.stn = self.stn;
        session.last_end = self.last_end;
    }
}

impl Planner {
    /// Find a solution tree achieving the given todos.
    ///
    /// Returns the tree, the projected final state, and the action
    /// schedule, or an error when the root exhausts its alternatives, a
    /// limit is hit, the caller cancels, or the schedule is inconsistent.
    pub fn plan(&self, state: State, todos: Vec<Todo>) -> Result<PlanResult> {
        if self.is_verbose(1) {
            println!("plan> verbose={}:", self.options.verbose_level);
            println!("plan> state = {}", state.name);
            println!("plan> todos = {}", todo_list_to_string(&todos));
        }

        let (tree, root) = SolutionTree::new_root(todos.clone());
        let mut session = Session::new(tree);

        let final_state = match self.seek(&mut session, root, state, &todos, 0) {
            Ok(final_state) => final_state,
            Err(err) if err.is_recoverable() => {
                self.vprint(1, "plan> result = no plan");
                return Err(PlannerError::no_plan(err.to_string()));
            }
            Err(err) => return Err(err),
        };

        session.tree.set_status(root, NodeStatus::Expanded);
        if !session.stn.consistent() {
            return Err(PlannerError::inconsistent_stn(
                "the plan's temporal constraints admit no schedule",
            ));
        }

        if self.is_verbose(1) {
            println!("plan> result = {}", todo_list_to_string(&session.tree.plan()));
        }
        Ok(PlanResult {
            tree: session.tree,
            final_state,
            stn: session.stn,
        })
    }

    /// Refine a todo list left to right, threading the state through
    pub(crate) fn seek(
        &self,
        session: &mut Session,
        parent: NodeId,
        state: State,
        todos: &[Todo],
        depth: usize,
    ) -> Result<State> {
        let mut current = state;
        for todo in todos {
            current = self.refine(session, parent, current, todo, depth)?;
        }
        Ok(current)
    }

    /// Refine one todo, dispatching on its kind
    fn refine(
        &self,
        session: &mut Session,
        parent: NodeId,
        state: State,
        todo: &Todo,
        depth: usize,
    ) -> Result<State> {
        self.check_interrupts(session)?;
        if depth >= self.options.deepening_limit {
            return Err(PlannerError::depth_exceeded(self.options.deepening_limit));
        }
        if self.is_verbose(2) {
            println!("plan> depth {depth} item {todo}");
        }

        match todo {
            Todo::Action(name, args) => self.apply_action(session, parent, state, name, args, depth),
            Todo::Task(name, args) => {
                if self.domain.has_action(name) {
                    self.apply_action(session, parent, state, name, args, depth)
                } else if self.domain.has_task_methods(name) {
                    let payload = NodePayload::Task {
                        name: name.clone(),
                        args: args.clone(),
                        state_before: state.clone(),
                    };
                    let node = session.tree.add_child(parent, payload)?;
                    self.expand_task_node(session, node, state, name, args, depth, 0)
                } else {
                    Err(PlannerError::unknown_item(todo.to_string(), depth))
                }
            }
            Todo::Goal(predicate, subject, value) => {
                if state.satisfies_goal(predicate, subject, value) {
                    self.vprint(3, &format!("plan> depth {depth} goal already achieved"));
                    return Ok(state);
                }
                if !self.domain.has_unigoal_methods(predicate) {
                    return Err(PlannerError::unknown_item(todo.to_string(), depth));
                }
                let payload = NodePayload::Goal {
                    predicate: predicate.clone(),
                    subject: subject.clone(),
                    value: value.clone(),
                    state_before: state.clone(),
                };
                let node = session.tree.add_child(parent, payload)?;
                self.expand_goal_node(session, node, state, predicate, subject, value, depth, 0)
            }
            Todo::Multigoal(multigoal) => {
                let remaining = multigoal.prune(&state);
                if remaining.is_empty() {
                    self.vprint(3, &format!("plan> depth {depth} multigoal already achieved"));
                    return Ok(state);
                }
                let payload = NodePayload::Multigoal {
                    multigoal: remaining.clone(),
                    state_before: state.clone(),
                };
                let node = session.tree.add_child(parent, payload)?;
                self.expand_multigoal_node(session, node, state, &remaining, depth, 0)
            }
        }
    }

    /// Check the action's precondition, apply its effect, and schedule it
    fn apply_action(
        &self,
        session: &mut Session,
        parent: NodeId,
        state: State,
        name: &str,
        args: &[StateValue],
        depth: usize,
    ) -> Result<State> {
        let Some(spec) = self.domain.get_action(name) else {
            return Err(PlannerError::unknown_item(
                Todo::action(name, args.to_vec()).to_string(),
                depth,
            ));
        };

        if !spec.precondition_met(&state, args) {
            self.vprint(3, &format!("plan> depth {depth} action {name}: precondition unmet"));
            return Err(PlannerError::precondition_unmet(
                name,
                format!("in state {}", state.name),
            ));
        }
        let Some(new_state) = spec.apply(&state, args) else {
            self.vprint(3, &format!("plan> depth {depth} action {name}: not applicable"));
            return Err(PlannerError::precondition_unmet(
                name,
                format!("effect refused in state {}", state.name),
            ));
        };
        self.vprint(3, &format!("plan> depth {depth} action {name}: applied"));

        // Schedule: one interval per primitive, chained after the previous
        // action's end (or the origin).
        let id_hint = session.tree.len();
        let start_point = format!("t{id_hint}_start");
        let end_point = format!("t{id_hint}_end");
        let (lo, hi) = spec.duration.bounds(&state, args);
        session.stn.add_interval(
            Interval::new(
                format!("act{id_hint}"),
                start_point.clone(),
                end_point.clone(),
                clamp_seconds(lo),
                clamp_seconds(hi),
            )
            .with_metadata("action", name.into()),
        )?;
        let previous = session
            .last_end
            .clone()
            .unwrap_or_else(|| ORIGIN_POINT.to_string());
        session
            .stn
            .add_constraint(previous, start_point.clone(), Bound::at_least(0))?;
        for constraint in &spec.temporal_constraints {
            constraint.apply(&mut session.stn, ORIGIN_POINT, &start_point, &end_point)?;
        }
        session.last_end = Some(end_point.clone());

        let node = session.tree.add_child(
            parent,
            NodePayload::Primitive {
                name: name.to_string(),
                args: args.to_vec(),
                state_before: state,
                state_after: new_state.clone(),
                start_point,
                end_point,
            },
        )?;
        session.tree.set_status(node, NodeStatus::Expanded);
        Ok(new_state)
    }

    /// Try a task's methods from `from_method` onwards on an existing node
    pub(crate) fn expand_task_node(
        &self,
        session: &mut Session,
        node: NodeId,
        state: State,
        name: &str,
        args: &[StateValue],
        depth: usize,
        from_method: usize,
    ) -> Result<State> {
        let Some(methods) = self.domain.get_task_methods(name) else {
            return Err(PlannerError::unknown_item(name.to_string(), depth));
        };
        let methods = methods.clone();
        if self.is_verbose(3) {
            println!("plan> depth {depth} task {name}: {} methods", methods.len());
        }

        let mut tried = 0usize;
        for (index, method) in methods.iter().enumerate().skip(from_method) {
            self.check_interrupts(session)?;
            if tried >= self.options.method_tries_limit {
                session.tree.set_status(node, NodeStatus::Failed);
                return Err(PlannerError::method_tries_exceeded(
                    Todo::task(name, args.to_vec()).to_string(),
                    self.options.method_tries_limit,
                ));
            }
            tried += 1;

            let subtodos = match catch_unwind(AssertUnwindSafe(|| method(&state, args))) {
                Ok(Some(subtodos)) => subtodos,
                Ok(None) => {
                    self.vprint(3, &format!("plan> depth {depth} method {index}: not applicable"));
                    continue;
                }
                Err(_) => {
                    self.vprint(1, &format!("plan> depth {depth} method {index} for task {name} panicked; skipping"));
                    continue;
                }
            };
            let subtodos = self.domain.rewrite_todos(&state, subtodos);
            if self.is_verbose(3) {
                println!(
                    "plan> depth {depth} method {index} subtodos: {}",
                    todo_list_to_string(&subtodos)
                );
            }

            let checkpoint = Checkpoint::take(session);
            if let Some(n) = session.tree.node_mut(node) {
                n.method_index = Some(index);
                n.method_cursor = index + 1;
            }
            match self.seek(session, node, state.clone(), &subtodos, depth + 1) {
                Ok(result_state) => {
                    session.tree.set_status(node, NodeStatus::Expanded);
                    return Ok(result_state);
                }
                Err(err) if err.is_recoverable() => {
                    self.vprint(3, &format!("plan> depth {depth} method {index} failed: {err}"));
                    checkpoint.restore(session);
                }
                Err(err) => return Err(err),
            }
        }

        session.tree.set_status(node, NodeStatus::Failed);
        Err(PlannerError::no_method_applicable(
            Todo::task(name, args.to_vec()).to_string(),
            depth,
        ))
    }

    /// Try a goal's unigoal methods from `from_method` onwards on an
    /// existing node, verifying achievement when enabled
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn expand_goal_node(
        &self,
        session: &mut Session,
        node: NodeId,
        state: State,
        predicate: &str,
        subject: &str,
        value: &StateValue,
        depth: usize,
        from_method: usize,
    ) -> Result<State> {
        let goal = Todo::goal(predicate, subject, value.clone());
        let Some(methods) = self.domain.get_unigoal_methods(predicate) else {
            return Err(PlannerError::unknown_item(goal.to_string(), depth));
        };
        let methods = methods.clone();
        if self.is_verbose(3) {
            println!("plan> depth {depth} goal {goal}: {} methods", methods.len());
        }

        let mut tried = 0usize;
        for (index, method) in methods.iter().enumerate().skip(from_method) {
            self.check_interrupts(session)?;
            if tried >= self.options.method_tries_limit {
                session.tree.set_status(node, NodeStatus::Failed);
                return Err(PlannerError::method_tries_exceeded(
                    goal.to_string(),
                    self.options.method_tries_limit,
                ));
            }
            tried += 1;

            let subtodos = match catch_unwind(AssertUnwindSafe(|| method(&state, subject, value))) {
                Ok(Some(subtodos)) => subtodos,
                Ok(None) => continue,
                Err(_) => {
                    self.vprint(1, &format!("plan> depth {depth} method {index} for goal {goal} panicked; skipping"));
                    continue;
                }
            };
            let subtodos = self.domain.rewrite_todos(&state, subtodos);

            let checkpoint = Checkpoint::take(session);
            if let Some(n) = session.tree.node_mut(node) {
                n.method_index = Some(index);
                n.method_cursor = index + 1;
            }
            match self.seek(session, node, state.clone(), &subtodos, depth + 1) {
                Ok(result_state) => {
                    if self.options.verify_goals
                        && !goal_achieved(&result_state, predicate, subject, value)
                    {
                        self.vprint(3, &format!("plan> depth {depth} method {index} did not achieve {goal}"));
                        checkpoint.restore(session);
                        continue;
                    }
                    session.tree.set_status(node, NodeStatus::Expanded);
                    return Ok(result_state);
                }
                Err(err) if err.is_recoverable() => {
                    self.vprint(3, &format!("plan> depth {depth} method {index} failed: {err}"));
                    checkpoint.restore(session);
                }
                Err(err) => return Err(err),
            }
        }

        session.tree.set_status(node, NodeStatus::Failed);
        Err(PlannerError::no_method_applicable(goal.to_string(), depth))
    }

    /// Try the multigoal methods from `from_method` onwards on an existing
    /// node. A method may answer with sub-todos or with a reduced multigoal
    /// the planner loops on.
    pub(crate) fn expand_multigoal_node(
        &self,
        session: &mut Session,
        node: NodeId,
        state: State,
        multigoal: &Multigoal,
        depth: usize,
        from_method: usize,
    ) -> Result<State> {
        let methods = self.domain.get_multigoal_methods().clone();
        if self.is_verbose(3) {
            println!("plan> depth {depth} {multigoal}: {} methods", methods.len());
        }

        let mut tried = 0usize;
        for (index, method) in methods.iter().enumerate().skip(from_method) {
            self.check_interrupts(session)?;
            if tried >= self.options.method_tries_limit {
                session.tree.set_status(node, NodeStatus::Failed);
                return Err(PlannerError::method_tries_exceeded(
                    multigoal.to_string(),
                    self.options.method_tries_limit,
                ));
            }
            tried += 1;

            let response = match catch_unwind(AssertUnwindSafe(|| method(&state, multigoal))) {
                Ok(Some(response)) => response,
                Ok(None) => continue,
                Err(_) => {
                    self.vprint(1, &format!("plan> depth {depth} method {index} for {multigoal} panicked; skipping"));
                    continue;
                }
            };
            let subtodos = match response {
                MultigoalResponse::Todos(todos) => self.domain.rewrite_todos(&state, todos),
                MultigoalResponse::Remainder(remainder) => vec![Todo::multigoal(remainder)],
            };

            let checkpoint = Checkpoint::take(session);
            if let Some(n) = session.tree.node_mut(node) {
                n.method_index = Some(index);
                n.method_cursor = index + 1;
            }
            match self.seek(session, node, state.clone(), &subtodos, depth + 1) {
                Ok(result_state) => {
                    if self.options.verify_goals {
                        let missing = goals_not_achieved(&result_state, multigoal);
                        if !missing.is_empty() {
                            self.vprint(3, &format!(
                                "plan> depth {depth} method {index} left {} goals unachieved",
                                missing.len()
                            ));
                            checkpoint.restore(session);
                            continue;
                        }
                    }
                    session.tree.set_status(node, NodeStatus::Expanded);
                    return Ok(result_state);
                }
                Err(err) if err.is_recoverable() => {
                    self.vprint(3, &format!("plan> depth {depth} method {index} failed: {err}"));
                    checkpoint.restore(session);
                }
                Err(err) => return Err(err),
            }
        }

        session.tree.set_status(node, NodeStatus::Failed);
        Err(PlannerError::no_method_applicable(multigoal.to_string(), depth))
    }

    /// Cancellation and deadline checks, run between expansions and between
    /// method attempts
    fn check_interrupts(&self, session: &Session) -> Result<()> {
        if let Some(token) = &self.options.cancel {
            if token.is_cancelled() {
                return Err(PlannerError::cancelled("cancellation token set"));
            }
        }
        if let Some(deadline) = self.options.deadline {
            if session.started.elapsed() > deadline {
                return Err(PlannerError::cancelled(format!(
                    "deadline of {deadline:?} exceeded"
                )));
            }
        }
        Ok(())
    }
}

/// Durations come in as `u64` seconds; the network works in `i64`
fn clamp_seconds(seconds: u64) -> i64 {
    seconds.min(i64::MAX as u64) as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{string_value, Domain};
    use crate::planning::{CancelToken, PlannerBuilder};
    use crate::temporal::DurationSpec;

    fn quiet(domain: Domain) -> Planner {
        PlannerBuilder::new()
            .with_domain(domain)
            .with_verbose_level(0)
            .unwrap()
            .build()
            .unwrap()
    }

    /// A domain where `transport` decomposes into a `move` action
    fn transport_domain() -> Domain {
        let mut domain = Domain::new("transport");
        domain
            .declare_action("move", |state: &mut State, args: &[StateValue]| {
                if let (Some(thing), Some(place)) = (args[0].as_str(), args[1].as_str()) {
                    state.set("location", thing, string_value(place));
                    return Some(state.clone());
                }
                None
            })
            .unwrap();
        domain
            .declare_task_method("transport", |state: &State, args: &[StateValue]| {
                let (Some(thing), Some(place)) = (args[0].as_str(), args[1].as_str()) else {
                    return None;
                };
                if state.matches("location", thing, &string_value(place)) {
                    return Some(vec![]);
                }
                Some(vec![Todo::action(
                    "move",
                    vec![string_value(thing), string_value(place)],
                )])
            })
            .unwrap();
        domain
    }

    #[test]
    fn test_empty_todos() {
        let planner = quiet(Domain::new("empty"));
        let mut state = State::new("s");
        state.set("location", "box", "shelf".into());

        let result = planner.plan(state.clone(), vec![]).unwrap();
        assert!(result.tree.is_empty());
        assert_eq!(result.final_state, state);
        assert!(result.tree.plan().is_empty());
    }

    #[test]
    fn test_task_decomposition() {
        let planner = quiet(transport_domain());
        let mut state = State::new("s");
        state.set("location", "box", "shelf".into());

        let result = planner
            .plan(state, vec![Todo::task("transport", vec!["box".into(), "floor".into()])])
            .unwrap();

        let plan = result.tree.plan();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0], Todo::action("move", vec!["box".into(), "floor".into()]));
        assert_eq!(result.final_state.get("location", "box"), Some(&"floor".into()));
    }

    #[test]
    fn test_primitives_replay_to_final_state() {
        let planner = quiet(transport_domain());
        let mut state = State::new("s");
        state.set("location", "box", "shelf".into());
        state.set("location", "crate", "shelf".into());

        let result = planner
            .plan(
                state.clone(),
                vec![
                    Todo::task("transport", vec!["box".into(), "floor".into()]),
                    Todo::task("transport", vec!["crate".into(), "floor".into()]),
                ],
            )
            .unwrap();

        // Snapshots chain: each primitive's state_before is its
        // predecessor's state_after, starting from the initial state
        let mut replayed = state;
        for id in result.tree.primitive_actions_dfs() {
            let NodePayload::Primitive { state_before, state_after, .. } =
                &result.tree.node(id).unwrap().payload
            else {
                panic!("expected a primitive node");
            };
            assert_eq!(state_before, &replayed);
            replayed = state_after.clone();
        }
        assert_eq!(replayed, result.final_state);
    }

    #[test]
    fn test_goal_already_satisfied_is_a_no_op() {
        let planner = quiet(transport_domain());
        let mut state = State::new("s");
        state.set("location", "box", "floor".into());

        // No unigoal method exists for "location", but none is needed
        let result = planner
            .plan(state, vec![Todo::goal("location", "box", "floor".into())])
            .unwrap();
        assert!(result.tree.is_empty());
    }

    #[test]
    fn test_backtracking_over_failing_method() {
        let mut domain = Domain::new("flaky");
        domain
            .declare_action("succeed", |state: &mut State, _args: &[StateValue]| {
                state.set("done", "job", true.into());
                Some(state.clone())
            })
            .unwrap();
        domain
            .declare_action("fail", |_state: &mut State, _args: &[StateValue]| None)
            .unwrap();
        // The first method leads to a dead end, the second works
        domain
            .declare_task_methods(
                "job",
                vec![
                    |_state: &State, _args: &[StateValue]| Some(vec![Todo::action("fail", vec![])]),
                    |_state: &State, _args: &[StateValue]| Some(vec![Todo::action("succeed", vec![])]),
                ],
            )
            .unwrap();

        let planner = quiet(domain);
        let result = planner.plan(State::new("s"), vec![Todo::task("job", vec![])]).unwrap();

        let plan = result.tree.plan();
        assert_eq!(plan, vec![Todo::action("succeed", vec![])]);

        // The expansion node records the winning method
        let job_node = result.tree.children(result.tree.root())[0];
        assert_eq!(result.tree.node(job_node).unwrap().method_index, Some(1));
        // The dead end's primitive was pruned
        assert_eq!(result.tree.primitive_actions_dfs().len(), 1);
    }

    #[test]
    fn test_no_plan_when_all_methods_fail() {
        let mut domain = Domain::new("hopeless");
        domain
            .declare_action("fail", |_state: &mut State, _args: &[StateValue]| None)
            .unwrap();
        domain
            .declare_task_method("job", |_state: &State, _args: &[StateValue]| {
                Some(vec![Todo::action("fail", vec![])])
            })
            .unwrap();

        let planner = quiet(domain);
        let err = planner
            .plan(State::new("s"), vec![Todo::task("job", vec![])])
            .unwrap_err();
        assert_eq!(err.kind(), "no_plan");
    }

    #[test]
    fn test_unknown_item_surfaces() {
        let planner = quiet(Domain::new("empty"));
        let err = planner
            .plan(State::new("s"), vec![Todo::task("nonsense", vec![])])
            .unwrap_err();
        assert_eq!(err.kind(), "unknown_item");
    }

    #[test]
    fn test_depth_limit_on_circular_expansion() {
        let mut domain = Domain::new("circular");
        // "spin" expands into itself forever
        domain
            .declare_task_method("spin", |_state: &State, _args: &[StateValue]| {
                Some(vec![Todo::task("spin", vec![])])
            })
            .unwrap();

        let planner = PlannerBuilder::new()
            .with_domain(domain)
            .with_verbose_level(0)
            .unwrap()
            .with_deepening_limit(25)
            .build()
            .unwrap();
        let err = planner
            .plan(State::new("s"), vec![Todo::task("spin", vec![])])
            .unwrap_err();
        assert_eq!(err.kind(), "depth_exceeded");
    }

    #[test]
    fn test_method_tries_limit() {
        let mut domain = Domain::new("many_methods");
        domain
            .declare_action("fail", |_state: &mut State, _args: &[StateValue]| None)
            .unwrap();
        for _ in 0..10 {
            domain
                .declare_task_method("job", |_state: &State, _args: &[StateValue]| {
                    Some(vec![Todo::action("fail", vec![])])
                })
                .unwrap();
        }

        let planner = PlannerBuilder::new()
            .with_domain(domain)
            .with_verbose_level(0)
            .unwrap()
            .with_method_tries_limit(3)
            .build()
            .unwrap();
        // The limit makes the node fail early; the root then has no
        // alternatives, so the planner reports no plan
        let err = planner
            .plan(State::new("s"), vec![Todo::task("job", vec![])])
            .unwrap_err();
        assert_eq!(err.kind(), "no_plan");
    }

    #[test]
    fn test_cancellation() {
        let mut domain = Domain::new("circular");
        domain
            .declare_task_method("spin", |_state: &State, _args: &[StateValue]| {
                Some(vec![Todo::task("spin", vec![])])
            })
            .unwrap();

        let token = CancelToken::new();
        token.cancel();
        let planner = PlannerBuilder::new()
            .with_domain(domain)
            .with_verbose_level(0)
            .unwrap()
            .with_cancel_token(token)
            .build()
            .unwrap();
        let err = planner
            .plan(State::new("s"), vec![Todo::task("spin", vec![])])
            .unwrap_err();
        assert_eq!(err.kind(), "cancelled");
    }

    #[test]
    fn test_panicking_method_is_skipped() {
        let mut domain = Domain::new("panicky");
        domain
            .declare_action("succeed", |state: &mut State, _args: &[StateValue]| {
                state.set("done", "job", true.into());
                Some(state.clone())
            })
            .unwrap();
        domain
            .declare_task_methods(
                "job",
                vec![
                    |_state: &State, _args: &[StateValue]| -> Option<Vec<Todo>> {
                        panic!("user method blew up")
                    },
                    |_state: &State, _args: &[StateValue]| Some(vec![Todo::action("succeed", vec![])]),
                ],
            )
            .unwrap();

        let planner = quiet(domain);
        let result = planner.plan(State::new("s"), vec![Todo::task("job", vec![])]).unwrap();
        assert_eq!(result.tree.plan(), vec![Todo::action("succeed", vec![])]);
    }

    #[test]
    fn test_goal_verification_rejects_lying_method() {
        let mut domain = Domain::new("liar");
        // This method claims to achieve the goal but does nothing
        domain
            .declare_unigoal_method("location", |_state: &State, _subject: &str, _value: &StateValue| {
                Some(vec![])
            })
            .unwrap();

        let planner = quiet(domain.clone());
        let err = planner
            .plan(
                State::new("s"),
                vec![Todo::goal("location", "box", "floor".into())],
            )
            .unwrap_err();
        assert_eq!(err.kind(), "no_plan");

        // With verification off the lie goes through
        let trusting = PlannerBuilder::new()
            .with_domain(domain)
            .with_verbose_level(0)
            .unwrap()
            .with_goal_verification(false)
            .build()
            .unwrap();
        assert!(trusting
            .plan(
                State::new("s"),
                vec![Todo::goal("location", "box", "floor".into())],
            )
            .is_ok());
    }

    #[test]
    fn test_multigoal_remainder_loops() {
        let mut domain = Domain::new("reducer");
        domain
            .declare_action("achieve_one", |state: &mut State, args: &[StateValue]| {
                let (Some(predicate), Some(subject)) = (args[0].as_str(), args[1].as_str()) else {
                    return None;
                };
                state.set(predicate, subject, args[2].clone());
                Some(state.clone())
            })
            .unwrap();
        // Peel off the first unsatisfied goal, return the rest as a remainder
        domain
            .declare_multigoal_method(|state: &State, multigoal: &Multigoal| {
                let mut unsatisfied = multigoal.unsatisfied_goals(state);
                if unsatisfied.is_empty() {
                    return Some(MultigoalResponse::Todos(vec![]));
                }
                let (predicate, subject, value) = unsatisfied.remove(0);
                let mut todos = vec![Todo::action(
                    "achieve_one",
                    vec![string_value(&predicate), string_value(&subject), value],
                )];
                if !unsatisfied.is_empty() {
                    todos.push(Todo::multigoal(Multigoal::from_goals(
                        multigoal.name.clone(),
                        unsatisfied,
                    )));
                }
                Some(MultigoalResponse::Todos(todos))
            })
            .unwrap();

        let mut multigoal = Multigoal::new("both");
        multigoal.set_goal("location", "box", "floor".into());
        multigoal.set_goal("location", "crate", "shelf".into());

        let planner = quiet(domain);
        let result = planner
            .plan(State::new("s"), vec![Todo::multigoal(multigoal)])
            .unwrap();
        assert_eq!(result.tree.plan().len(), 2);
        assert_eq!(result.final_state.get("location", "box"), Some(&"floor".into()));
        assert_eq!(result.final_state.get("location", "crate"), Some(&"shelf".into()));
    }

    #[test]
    fn test_schedule_chains_primitives() {
        let mut domain = Domain::new("timed");
        domain
            .declare_action_spec(
                "work",
                crate::core::ActionSpec::new(|state: &mut State, _args: &[StateValue]| {
                    Some(state.clone())
                })
                .with_duration(DurationSpec::Fixed(60)),
            )
            .unwrap();

        let planner = quiet(domain);
        let mut result = planner
            .plan(
                State::new("s"),
                vec![Todo::action("work", vec![]), Todo::action("work", vec![])],
            )
            .unwrap();

        assert!(result.stn.consistent());
        let primitives = result.tree.primitive_actions_dfs();
        assert_eq!(primitives.len(), 2);

        // The second action starts at least one duration after the first
        let (NodePayload::Primitive { start_point: first_start, .. },
             NodePayload::Primitive { start_point: second_start, .. }) = (
            &result.tree.node(primitives[0]).unwrap().payload,
            &result.tree.node(primitives[1]).unwrap().payload,
        ) else {
            panic!("expected primitive nodes");
        };
        let gap = result.stn.derived_constraint(first_start, second_start).unwrap();
        assert!(gap.lo >= 60);
    }

    #[test]
    fn test_determinism_same_plan_twice() {
        let planner = quiet(transport_domain());
        let mut state = State::new("s");
        state.set("location", "box", "shelf".into());
        let todos = vec![Todo::task("transport", vec!["box".into(), "floor".into()])];

        let first = planner.plan(state.clone(), todos.clone()).unwrap();
        let second = planner.plan(state, todos).unwrap();
        assert_eq!(first.tree, second.tree);
        assert_eq!(first.final_state, second.final_state);
    }
}
