//! Planning for tempoplan
//!
//! The planner is an immutable value built by [`PlannerBuilder`]: it owns a
//! read-only domain behind an `Arc` and a set of options, and every call to
//! [`Planner::plan`] runs an isolated refinement session. There is no
//! global state, so planners are cheap to clone and safe to share across
//! threads.

pub mod tree;
pub mod planner;
pub mod verification;
pub mod executor;

pub use executor::ExecutionResult;
pub use planner::PlanResult;
pub use tree::{Node, NodeId, NodePayload, NodeStatus, SolutionTree};

use crate::core::{Domain, State, TodoList};
use crate::error::{PlannerError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A caller-held handle to stop a running planner
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a fresh, uncancelled token
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; the planner checks between expansions and
    /// between method attempts
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Knobs for a planning run
#[derive(Debug, Clone)]
pub struct PlanOptions {
    /// - 0: print nothing
    /// - 1: print the initial parameters and the answer
    /// - 2: also print a message on each refinement
    /// - 3: also print info about intermediate computations
    pub verbose_level: i32,
    /// Bound on how many methods one node may try before it fails
    pub method_tries_limit: usize,
    /// Bound on refinement depth
    pub deepening_limit: usize,
    /// Verify goals and multigoals after their methods complete
    pub verify_goals: bool,
    /// Wall-clock budget for a planning run
    pub deadline: Option<Duration>,
    /// Cooperative cancellation handle
    pub cancel: Option<CancelToken>,
    /// Bound on how many re-refinements lazy execution may attempt
    pub max_execution_retries: usize,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            verbose_level: 1,
            method_tries_limit: 100,
            deepening_limit: 600,
            verify_goals: true,
            deadline: None,
            cancel: None,
            max_execution_retries: 10,
        }
    }
}

/// Builder for configured planner instances
#[derive(Debug, Clone, Default)]
pub struct PlannerBuilder {
    domain: Option<Domain>,
    options: PlanOptions,
}

impl PlannerBuilder {
    /// Create a new planner builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the domain for planning
    pub fn with_domain(mut self, domain: Domain) -> Self {
        self.domain = Some(domain);
        self
    }

    /// Set the verbosity level for planning output (0..=3)
    pub fn with_verbose_level(mut self, level: i32) -> Result<Self> {
        if !(0..=3).contains(&level) {
            return Err(PlannerError::InvalidVerboseLevel { level });
        }
        self.options.verbose_level = level;
        Ok(self)
    }

    /// Bound the number of methods one node may try
    pub fn with_method_tries_limit(mut self, limit: usize) -> Self {
        self.options.method_tries_limit = limit;
        self
    }

    /// Bound the refinement depth
    pub fn with_deepening_limit(mut self, limit: usize) -> Self {
        self.options.deepening_limit = limit;
        self
    }

    /// Enable or disable goal verification after method application
    pub fn with_goal_verification(mut self, verify: bool) -> Self {
        self.options.verify_goals = verify;
        self
    }

    /// Give the planner a wall-clock budget
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.options.deadline = Some(deadline);
        self
    }

    /// Attach a cancellation token
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.options.cancel = Some(token);
        self
    }

    /// Bound the re-refinement attempts during lazy execution
    pub fn with_max_execution_retries(mut self, retries: usize) -> Self {
        self.options.max_execution_retries = retries;
        self
    }

    /// Build the planner instance
    pub fn build(self) -> Result<Planner> {
        let domain = self
            .domain
            .ok_or_else(|| PlannerError::malformed_input("a planner needs a domain"))?;
        Ok(Planner {
            domain: Arc::new(domain),
            options: self.options,
        })
    }
}

/// Immutable planner instance with isolated state
#[derive(Debug, Clone)]
pub struct Planner {
    pub(crate) domain: Arc<Domain>,
    pub(crate) options: PlanOptions,
}

impl Planner {
    /// Create a planner with the given domain and default options
    pub fn new(domain: Domain) -> Self {
        Self {
            domain: Arc::new(domain),
            options: PlanOptions::default(),
        }
    }

    /// The domain used by this planner
    pub fn domain(&self) -> &Arc<Domain> {
        &self.domain
    }

    /// The options used by this planner
    pub fn options(&self) -> &PlanOptions {
        &self.options
    }

    /// Check if verbose output should be printed at the given level
    pub fn is_verbose(&self, level: i32) -> bool {
        self.options.verbose_level >= level
    }

    pub(crate) fn vprint(&self, level: i32, message: &str) {
        if self.is_verbose(level) {
            println!("{message}");
        }
    }
}

/// Plan without executing: returns the solution tree, the projected final
/// state, and the action schedule.
pub fn plan(
    domain: Domain,
    state: State,
    todos: TodoList,
    options: PlanOptions,
) -> Result<PlanResult> {
    let planner = Planner {
        domain: Arc::new(domain),
        options,
    };
    planner.plan(state, todos)
}

/// Plan and execute, re-refining on command failure.
pub fn run_lazy(
    domain: Domain,
    state: State,
    todos: TodoList,
    options: PlanOptions,
) -> Result<ExecutionResult> {
    let planner = Planner {
        domain: Arc::new(domain),
        options,
    };
    planner.run_lazy(state, todos)
}

/// Execute a pre-planned solution tree, re-refining on command failure.
pub fn run_lazy_tree(
    domain: Domain,
    state: State,
    tree: SolutionTree,
    options: PlanOptions,
) -> Result<ExecutionResult> {
    let planner = Planner {
        domain: Arc::new(domain),
        options,
    };
    planner.run_lazy_tree(state, tree)
}
