//! Lazy execution
//!
//! Walks a solution tree in depth-first order, running each primitive's
//! command (falling back to its action) against the live state. Over-all
//! monitors registered for an enclosing durative task are checked before
//! every primitive in that task's scope. When a primitive fails, the
//! executor re-refines the smallest enclosing subtree whose method cursor
//! still has alternatives, replanning from the post-failure state; when no
//! such subtree exists the failure surfaces.

use super::planner::Session;
use super::tree::{NodeId, NodePayload, NodeStatus, SolutionTree};
use super::Planner;
use crate::core::{GoalTriple, State, Todo};
use crate::error::{PlannerError, Result};

/// Outcome of a successful lazy-execution run
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// The executed tree, including any re-refined subtrees
    pub tree: SolutionTree,
    /// The state after the last primitive ran
    pub final_state: State,
}

/// Mutable bookkeeping threaded through the execution walk
struct ExecutionContext {
    /// Currently active over-all monitors, innermost last
    monitors: Vec<GoalTriple>,
    /// Re-refinements spent so far
    retries: usize,
}

impl Planner {
    /// Plan and execute in one call
    pub fn run_lazy(&self, state: State, todos: Vec<Todo>) -> Result<ExecutionResult> {
        let planned = self.plan(state.clone(), todos)?;
        self.run_lazy_tree(state, planned.tree)
    }

    /// Execute a pre-planned solution tree against `state`, re-refining
    /// failing subtrees as needed
    pub fn run_lazy_tree(&self, state: State, tree: SolutionTree) -> Result<ExecutionResult> {
        if self.is_verbose(1) {
            println!("exec> run_lazy_tree, initial state: {}", state.name);
        }

        let mut session = Session::new(tree);
        let mut current = state;
        let mut context = ExecutionContext {
            monitors: Vec::new(),
            retries: 0,
        };

        let root = session.tree.root();
        self.execute_node(&mut session, root, &mut current, &mut context)?;
        session.tree.set_status(root, NodeStatus::Executed);

        if self.is_verbose(1) {
            println!("exec> all primitives executed, final state: {}", current.name);
        }
        Ok(ExecutionResult {
            tree: session.tree,
            final_state: current,
        })
    }

    fn execute_node(
        &self,
        session: &mut Session,
        id: NodeId,
        state: &mut State,
        context: &mut ExecutionContext,
    ) -> Result<()> {
        let payload = match session.tree.node(id) {
            Some(node) => node.payload.clone(),
            None => return Err(PlannerError::internal(format!("executing missing node {id}"))),
        };

        match payload {
            NodePayload::Root { .. } => {
                let children = session.tree.children(id).to_vec();
                for child in children {
                    self.execute_node(session, child, state, context)?;
                }
                Ok(())
            }
            NodePayload::Primitive { name, args, .. } => {
                self.execute_primitive(session, id, &name, &args, state, context)
            }
            NodePayload::Task { name, args, .. } => {
                let scope_monitors = self
                    .domain
                    .get_monitors(&name)
                    .cloned()
                    .unwrap_or_default();
                context.monitors.extend(scope_monitors.iter().cloned());

                let outcome = self.execute_expansion(session, id, state, context, |planner, session, state, cursor| {
                    planner.expand_task_node(session, id, state, &name, &args, 0, cursor)
                });

                context
                    .monitors
                    .truncate(context.monitors.len() - scope_monitors.len());
                outcome
            }
            NodePayload::Goal { predicate, subject, value, .. } => {
                // A goal that already holds needs no execution at all
                if state.satisfies_goal(&predicate, &subject, &value) {
                    session.tree.detach_children(id);
                    session.tree.set_status(id, NodeStatus::Executed);
                    return Ok(());
                }
                self.execute_expansion(session, id, state, context, |planner, session, state, cursor| {
                    planner.expand_goal_node(session, id, state, &predicate, &subject, &value, 0, cursor)
                })
            }
            NodePayload::Multigoal { multigoal, .. } => {
                if multigoal.is_satisfied_by(state) {
                    session.tree.detach_children(id);
                    session.tree.set_status(id, NodeStatus::Executed);
                    return Ok(());
                }
                self.execute_expansion(session, id, state, context, |planner, session, state, cursor| {
                    planner.expand_multigoal_node(session, id, state, &multigoal, 0, cursor)
                })
            }
        }
    }

    /// Execute an expansion node's children, re-refining from the method
    /// cursor when a descendant primitive fails
    fn execute_expansion<F>(
        &self,
        session: &mut Session,
        id: NodeId,
        state: &mut State,
        context: &mut ExecutionContext,
        replan: F,
    ) -> Result<()>
    where
        F: Fn(&Planner, &mut Session, State, usize) -> Result<State>,
    {
        loop {
            let children = session.tree.children(id).to_vec();
            let mut failure = None;
            for child in children {
                if let Err(err) = self.execute_node(session, child, state, context) {
                    if matches!(err, PlannerError::ExecutionFailure { .. }) {
                        failure = Some(err);
                        break;
                    }
                    return Err(err);
                }
            }

            let Some(failure) = failure else {
                session.tree.set_status(id, NodeStatus::Executed);
                return Ok(());
            };

            // Re-refine the smallest enclosing subtree: this node replays
            // from its next untried method against the post-failure state.
            if context.retries >= self.options.max_execution_retries {
                return Err(failure);
            }
            let cursor = session
                .tree
                .node(id)
                .map(|node| node.method_cursor)
                .unwrap_or(usize::MAX);
            context.retries += 1;
            if self.is_verbose(1) {
                println!("exec> {failure}; re-refining from method {cursor}");
            }

            session.tree.detach_children(id);
            match replan(self, session, state.clone(), cursor) {
                Ok(_projected) => continue,
                Err(err) if err.is_recoverable() => {
                    // No alternative here; let an enclosing subtree try
                    self.vprint(2, &format!("exec> re-refinement failed: {err}"));
                    return Err(failure);
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Run one primitive: monitors first, then the command (falling back to
    /// the action when no command is registered)
    fn execute_primitive(
        &self,
        session: &mut Session,
        id: NodeId,
        name: &str,
        args: &[crate::core::StateValue],
        state: &mut State,
        context: &mut ExecutionContext,
    ) -> Result<()> {
        for (predicate, subject, value) in &context.monitors {
            if !state.matches(predicate, subject, value) {
                return Err(PlannerError::execution_failure(
                    name,
                    format!("over-all condition ({predicate} {subject} {value}) no longer holds"),
                ));
            }
        }

        let command_name = format!("c_{name}");
        let before = state.clone();
        let after = if let Some(command) = self.domain.get_command(&command_name) {
            if self.is_verbose(2) {
                println!("exec> command {command_name}");
            }
            let mut scratch = state.clone();
            command(&mut scratch, args)
        } else if let Some(spec) = self.domain.get_action(name) {
            if self.is_verbose(2) {
                println!("exec> {command_name} not defined, using action {name} instead");
            }
            if spec.precondition_met(state, args) {
                spec.apply(state, args)
            } else {
                None
            }
        } else {
            return Err(PlannerError::execution_failure(
                name,
                "no command or action registered",
            ));
        };

        match after {
            Some(new_state) => {
                *state = new_state.clone();
                if let Some(node) = session.tree.node_mut(id) {
                    let (start_point, end_point) = match &node.payload {
                        NodePayload::Primitive { start_point, end_point, .. } => {
                            (start_point.clone(), end_point.clone())
                        }
                        _ => (String::new(), String::new()),
                    };
                    // Snapshots now reflect what execution actually did
                    node.payload = NodePayload::Primitive {
                        name: name.to_string(),
                        args: args.to_vec(),
                        state_before: before,
                        state_after: new_state,
                        start_point,
                        end_point,
                    };
                    node.status = NodeStatus::Executed;
                }
                Ok(())
            }
            None => Err(PlannerError::execution_failure(
                name,
                format!("command refused in state {}", state.name),
            )),
        }
    }
}
