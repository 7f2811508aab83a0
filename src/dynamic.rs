pub mod bellman_equation;
pub mod indexing;
pub mod solution;
pub mod transitions;
pub mod value_iteration;

// Re-export the solver with descriptive names
pub use bellman_equation::{
    verify_dynamic, MarkovDecisionProcess, TabularMdp, VerifyScope, PROBABILITY_TOLERANCE,
};
pub use indexing::{cardinality, flatten, unflatten};
pub use solution::{SolutionLayout, SolutionTable};
pub use transitions::SparseTransitions;
pub use value_iteration::{
    value_iteration, Outcome, Termination, TransitionMode, ValueIteration, ValueIterationConfig,
};

use crate::error::Result;

/// Runs `f` on every `(state, action)` pair, stopping at the first error.
#[cfg(feature = "parallel")]
pub(crate) fn try_for_each_pair<F>(pairs: &[(usize, usize)], f: F) -> Result<()>
where
    F: Fn(usize, usize) -> Result<()> + Send + Sync,
{
    use rayon::prelude::*;
    pairs.par_iter().try_for_each(|&(s, a)| f(s, a))
}

/// Runs `f` on every `(state, action)` pair, stopping at the first error.
#[cfg(not(feature = "parallel"))]
pub(crate) fn try_for_each_pair<F>(pairs: &[(usize, usize)], f: F) -> Result<()>
where
    F: Fn(usize, usize) -> Result<()> + Send + Sync,
{
    pairs.iter().try_for_each(|&(s, a)| f(s, a))
}

/// Collects `f(s)` for every state in order.
#[cfg(feature = "parallel")]
pub(crate) fn map_states<T, F>(num_states: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Send + Sync,
{
    use rayon::prelude::*;
    (0..num_states).into_par_iter().map(f).collect()
}

/// Collects `f(s)` for every state in order.
#[cfg(not(feature = "parallel"))]
pub(crate) fn map_states<T, F>(num_states: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Send + Sync,
{
    (0..num_states).map(f).collect()
}
