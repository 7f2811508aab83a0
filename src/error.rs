use thiserror::Error;

/// Errors raised while setting up a value-iteration problem or writing its solution.
///
/// Everything here is detected once, before any sweep runs. The sweep itself
/// never fails; running out of iterations is reported through
/// [`Outcome`](crate::dynamic::Outcome) instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("state space must contain at least one state")]
    EmptyStateSpace,

    #[error("action space must contain at least one action")]
    EmptyActionSpace,

    #[error("discount factor must be within [0, 1], got {0}")]
    InvalidDiscount(f64),

    #[error(
        "transition probabilities for state {state}, action {action} sum to {total}, expected 1.0"
    )]
    ProbabilityMass {
        state: usize,
        action: usize,
        total: f64,
    },

    #[error(
        "transition probability from state {state} to {next_state} under action {action} is {probability}, outside [0, 1]"
    )]
    InvalidProbability {
        state: usize,
        action: usize,
        next_state: usize,
        probability: f64,
    },

    #[error(
        "sparse transitions for state {state}, action {action} point at state {next_state}, but there are only {num_states} states"
    )]
    SparseOutOfRange {
        state: usize,
        action: usize,
        next_state: usize,
        num_states: usize,
    },

    #[error(
        "sparse transition {state} -> {next_state} under action {action} has probability {sparse}, dynamic gives {dense}"
    )]
    SparseMismatch {
        state: usize,
        action: usize,
        next_state: usize,
        sparse: f64,
        dense: f64,
    },

    #[error("sparse table is {states}x{actions}, expected {expected_states}x{expected_actions}")]
    SparseShape {
        states: usize,
        actions: usize,
        expected_states: usize,
        expected_actions: usize,
    },

    #[error("{table} table has shape {found:?}, expected {expected:?}")]
    TableShape {
        table: &'static str,
        found: Vec<usize>,
        expected: Vec<usize>,
    },

    #[error("grid must be at least 2x2, got {width}x{height}")]
    InvalidGrid { width: usize, height: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
