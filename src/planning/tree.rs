//! Solution tree
//!
//! The planner's output: a tree of expansions terminating in primitive
//! actions. Nodes live in an arena addressed by integer ids, with parent
//! and children links as id lists; backtracking prunes by id-range
//! truncation, so a node's descendants always carry larger ids while
//! planning is in progress.

use crate::core::{Multigoal, Plan, State, StateValue, Todo, TodoList};
use crate::error::{PlannerError, Result};
use serde::{Deserialize, Serialize};

/// Index of a node in the solution tree arena
pub type NodeId = usize;

/// Lifecycle of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeStatus {
    /// Created but not yet refined
    Unexpanded,
    /// Refined into children (or applied, for primitives)
    Expanded,
    /// All alternatives failed
    Failed,
    /// Carried out by the executor
    Executed,
}

/// Kind-specific node contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodePayload {
    /// The root holds the original todo list
    Root { todos: TodoList },
    /// A task refined by one of its task methods
    Task {
        name: String,
        args: Vec<StateValue>,
        state_before: State,
    },
    /// A goal refined by one of its predicate's unigoal methods
    Goal {
        predicate: String,
        subject: String,
        value: StateValue,
        state_before: State,
    },
    /// A multigoal refined by one of the multigoal methods
    Multigoal {
        multigoal: Multigoal,
        state_before: State,
    },
    /// A scheduled primitive action
    Primitive {
        name: String,
        args: Vec<StateValue>,
        state_before: State,
        state_after: State,
        start_point: String,
        end_point: String,
    },
}

impl NodePayload {
    /// Short label for display
    pub fn label(&self) -> String {
        match self {
            Self::Root { todos } => format!("root ({} todos)", todos.len()),
            Self::Task { name, args, .. } => Todo::task(name.clone(), args.clone()).to_string(),
            Self::Goal { predicate, subject, value, .. } => {
                Todo::goal(predicate.clone(), subject.clone(), value.clone()).to_string()
            }
            Self::Multigoal { multigoal, .. } => multigoal.to_string(),
            Self::Primitive { name, args, .. } => {
                Todo::action(name.clone(), args.clone()).to_string()
            }
        }
    }

    /// Whether this is a primitive leaf
    pub fn is_primitive(&self) -> bool {
        matches!(self, Self::Primitive { .. })
    }
}

/// One node of the solution tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub status: NodeStatus,
    /// Index of the method that produced this node's children, once chosen
    pub method_index: Option<usize>,
    /// Index of the next method to try on backtrack
    pub method_cursor: usize,
    pub payload: NodePayload,
}

/// Node-indexed tree of expansions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionTree {
    nodes: Vec<Node>,
}

impl SolutionTree {
    /// Create a tree whose root holds the original todos
    pub fn new_root(todos: TodoList) -> (Self, NodeId) {
        let root = Node {
            id: 0,
            parent: None,
            children: Vec::new(),
            status: NodeStatus::Unexpanded,
            method_index: None,
            method_cursor: 0,
            payload: NodePayload::Root { todos },
        };
        (Self { nodes: vec![root] }, 0)
    }

    /// The root's id
    pub fn root(&self) -> NodeId {
        0
    }

    /// Number of nodes in the arena
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree holds only a bare root (or nothing)
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Append a child node under `parent`
    pub fn add_child(&mut self, parent: NodeId, payload: NodePayload) -> Result<NodeId> {
        if parent >= self.nodes.len() {
            return Err(PlannerError::internal(format!(
                "add_child: parent node {parent} does not exist"
            )));
        }
        let id = self.nodes.len();
        self.nodes.push(Node {
            id,
            parent: Some(parent),
            children: Vec::new(),
            status: NodeStatus::Unexpanded,
            method_index: None,
            method_cursor: 0,
            payload,
        });
        self.nodes[parent].children.push(id);
        Ok(id)
    }

    /// Look up a node
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Look up a node mutably
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Set a node's status
    pub fn set_status(&mut self, id: NodeId, status: NodeStatus) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.status = status;
        }
    }

    /// A node's children, in creation (left-to-right) order
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// A node's parent
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    /// Drop every node with id `>= keep`, removing dangling child links.
    /// Valid while planning, where descendants always carry larger ids than
    /// their ancestors.
    pub fn truncate(&mut self, keep: usize) {
        let keep = keep.max(1);
        if keep >= self.nodes.len() {
            return;
        }
        self.nodes.truncate(keep);
        for node in &mut self.nodes {
            node.children.retain(|child| *child < keep);
        }
    }

    /// Detach (orphan) a node's children, returning their ids. The nodes
    /// stay in the arena but are no longer reachable from the root.
    pub fn detach_children(&mut self, id: NodeId) -> Vec<NodeId> {
        match self.nodes.get_mut(id) {
            Some(node) => std::mem::take(&mut node.children),
            None => Vec::new(),
        }
    }

    /// Replace the subtree below `id` with another tree's contents: the
    /// other tree's root children are grafted under `id` with remapped ids.
    pub fn replace_subtree(&mut self, id: NodeId, subtree: &SolutionTree) -> Result<()> {
        if id >= self.nodes.len() {
            return Err(PlannerError::internal(format!(
                "replace_subtree: node {id} does not exist"
            )));
        }
        self.detach_children(id);

        // Subtree node k (k >= 1) lands at offset + k - 1
        let offset = self.nodes.len();
        let remap = |old: NodeId| -> NodeId { offset + old - 1 };

        for node in subtree.nodes.iter().skip(1) {
            let mut copy = node.clone();
            copy.id = remap(node.id);
            copy.parent = Some(match node.parent {
                Some(0) | None => id,
                Some(p) => remap(p),
            });
            copy.children = node.children.iter().map(|c| remap(*c)).collect();
            self.nodes.push(copy);
        }
        let grafted: Vec<NodeId> = subtree.children(subtree.root()).iter().map(|c| remap(*c)).collect();
        if let Some(node) = self.nodes.get_mut(id) {
            node.children = grafted;
        }
        Ok(())
    }

    /// Primitive leaves in left-to-right depth-first order. Applied in
    /// sequence to the root's initial state they form the linear plan.
    pub fn primitive_actions_dfs(&self) -> Vec<NodeId> {
        let mut primitives = Vec::new();
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id) else { continue };
            if node.payload.is_primitive() {
                primitives.push(id);
            }
            for child in node.children.iter().rev() {
                stack.push(*child);
            }
        }
        primitives
    }

    /// The linear plan: primitive actions in DFS order
    pub fn plan(&self) -> Plan {
        self.primitive_actions_dfs()
            .into_iter()
            .filter_map(|id| match &self.nodes[id].payload {
                NodePayload::Primitive { name, args, .. } => {
                    Some(Todo::action(name.clone(), args.clone()))
                }
                _ => None,
            })
            .collect()
    }

    /// Display the tree in indented form
    pub fn display(&self) {
        self.display_node(self.root(), 0);
    }

    fn display_node(&self, id: NodeId, indent: usize) {
        let Some(node) = self.nodes.get(id) else { return };
        println!(
            "{}{} [{:?}]",
            "  ".repeat(indent),
            node.payload.label(),
            node.status
        );
        for child in &node.children {
            self.display_node(*child, indent + 1);
        }
    }

    /// Convert to a JSON representation
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Create from a JSON representation
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::string_value;

    fn primitive(name: &str, state: &State) -> NodePayload {
        NodePayload::Primitive {
            name: name.to_string(),
            args: vec![],
            state_before: state.clone(),
            state_after: state.clone(),
            start_point: format!("{name}_start"),
            end_point: format!("{name}_end"),
        }
    }

    fn task(name: &str, state: &State) -> NodePayload {
        NodePayload::Task {
            name: name.to_string(),
            args: vec![string_value("x")],
            state_before: state.clone(),
        }
    }

    #[test]
    fn test_new_root() {
        let (tree, root) = SolutionTree::new_root(vec![Todo::task("job", vec![])]);
        assert_eq!(root, 0);
        assert_eq!(tree.len(), 1);
        assert!(tree.is_empty());
        assert!(tree.children(root).is_empty());
        assert_eq!(tree.parent(root), None);
    }

    #[test]
    fn test_add_child_links() {
        let state = State::new("s");
        let (mut tree, root) = SolutionTree::new_root(vec![]);
        let t = tree.add_child(root, task("job", &state)).unwrap();
        let p = tree.add_child(t, primitive("step", &state)).unwrap();

        assert_eq!(tree.children(root), &[t]);
        assert_eq!(tree.children(t), &[p]);
        assert_eq!(tree.parent(p), Some(t));
        assert!(tree.add_child(99, task("job", &state)).is_err());
    }

    #[test]
    fn test_dfs_order() {
        let state = State::new("s");
        let (mut tree, root) = SolutionTree::new_root(vec![]);
        let t1 = tree.add_child(root, task("first", &state)).unwrap();
        let t2 = tree.add_child(root, task("second", &state)).unwrap();
        let a = tree.add_child(t1, primitive("a", &state)).unwrap();
        let b = tree.add_child(t1, primitive("b", &state)).unwrap();
        let c = tree.add_child(t2, primitive("c", &state)).unwrap();

        assert_eq!(tree.primitive_actions_dfs(), vec![a, b, c]);

        let plan = tree.plan();
        let names: Vec<&str> = plan.iter().map(|todo| todo.name()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_truncate_prunes_children() {
        let state = State::new("s");
        let (mut tree, root) = SolutionTree::new_root(vec![]);
        let t = tree.add_child(root, task("job", &state)).unwrap();
        let checkpoint = tree.len();
        tree.add_child(t, primitive("a", &state)).unwrap();
        tree.add_child(t, primitive("b", &state)).unwrap();

        tree.truncate(checkpoint);
        assert_eq!(tree.len(), checkpoint);
        assert!(tree.children(t).is_empty());
        assert!(tree.primitive_actions_dfs().is_empty());
    }

    #[test]
    fn test_status_and_cursor() {
        let state = State::new("s");
        let (mut tree, root) = SolutionTree::new_root(vec![]);
        let t = tree.add_child(root, task("job", &state)).unwrap();

        assert_eq!(tree.node(t).unwrap().status, NodeStatus::Unexpanded);
        tree.set_status(t, NodeStatus::Expanded);
        assert_eq!(tree.node(t).unwrap().status, NodeStatus::Expanded);

        let node = tree.node_mut(t).unwrap();
        node.method_index = Some(1);
        node.method_cursor = 2;
        assert_eq!(tree.node(t).unwrap().method_index, Some(1));
    }

    #[test]
    fn test_replace_subtree() {
        let state = State::new("s");
        let (mut tree, root) = SolutionTree::new_root(vec![]);
        let t = tree.add_child(root, task("job", &state)).unwrap();
        tree.add_child(t, primitive("old", &state)).unwrap();

        let (mut replacement, sub_root) = SolutionTree::new_root(vec![]);
        let r1 = replacement.add_child(sub_root, primitive("new_a", &state)).unwrap();
        replacement.add_child(sub_root, primitive("new_b", &state)).unwrap();
        replacement.add_child(r1, primitive("unreachable", &state)).ok();

        tree.replace_subtree(t, &replacement).unwrap();
        let plan = tree.plan();
        let names: Vec<&str> = plan.iter().map(|todo| todo.name()).collect();
        assert_eq!(names, vec!["new_a", "unreachable", "new_b"]);
        assert_eq!(tree.parent(tree.children(t)[0]), Some(t));
    }

    #[test]
    fn test_json_round_trip() {
        let state = State::new("s");
        let (mut tree, root) = SolutionTree::new_root(vec![Todo::task("job", vec![])]);
        tree.add_child(root, primitive("step", &state)).unwrap();

        let json = tree.to_json().unwrap();
        let restored = SolutionTree::from_json(&json).unwrap();
        assert_eq!(restored, tree);
    }
}
