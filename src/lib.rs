pub mod dynamic;
pub mod error;
pub mod problems;

pub use dynamic::{
    value_iteration, MarkovDecisionProcess, Outcome, TabularMdp, Termination, ValueIteration,
    ValueIterationConfig,
};
pub use error::{Error, Result};
