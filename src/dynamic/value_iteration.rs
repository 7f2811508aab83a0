//! Value iteration: repeated Bellman optimality backups until the value
//! function stops moving or the iteration budget runs out.

use log::{debug, info, trace};

use super::bellman_equation::{
    validate_shape, verify_dynamic, MarkovDecisionProcess, VerifyScope, PROBABILITY_TOLERANCE,
};
use super::transitions::SparseTransitions;
use crate::error::Result;

/// Below this many states the dense expectation is summed on one thread.
#[cfg(feature = "parallel")]
const PARALLEL_DENSE_THRESHOLD: usize = 4096;

/// How the expectation over next states is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionMode {
    /// Always sum `dynamic` over every next state.
    Dense,
    /// Use the MDP's successor lists when it supplies any, otherwise go dense.
    #[default]
    Provided,
    /// Scan `dynamic` once up front and iterate over the nonzero entries.
    Analyze,
}

/// Setup options for [`ValueIteration`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValueIterationConfig {
    /// Which `(state, action)` pairs are checked before solving
    pub verify: VerifyScope,
    /// Allowed error when checking probabilities
    pub probability_tolerance: f64,
    /// Dense or sparse expectations
    pub transitions: TransitionMode,
    /// Log progress milestones during `improve`
    pub report_progress: bool,
}

impl Default for ValueIterationConfig {
    fn default() -> Self {
        Self {
            verify: VerifyScope::Full,
            probability_tolerance: PROBABILITY_TOLERANCE,
            transitions: TransitionMode::Provided,
            report_progress: true,
        }
    }
}

/// Why `improve` stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Converged,
    MaxIterationsReached,
}

/// Result of one call to [`ValueIteration::improve`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Outcome {
    pub status: Termination,
    /// Sweeps performed by this call
    pub iterations: usize,
    /// Largest per-state change in the last sweep, infinite if no sweep ran
    pub max_delta: f64,
}

impl Outcome {
    pub fn converged(&self) -> bool {
        self.status == Termination::Converged
    }
}

/// Owns an MDP together with its current value function and greedy policy.
///
/// Both estimates start at zero. Each sweep visits the states in order and
/// overwrites `value[s]` and `policy[s]` immediately, so later states in the
/// same sweep already see the new values (Gauss-Seidel order).
#[derive(Debug, Clone)]
pub struct ValueIteration<M> {
    mdp: M,
    discount: f64,
    value: Vec<f64>,
    policy: Vec<usize>,
    transitions: Option<SparseTransitions>,
    report_progress: bool,
    outcome: Option<Outcome>,
}

impl<M: MarkovDecisionProcess> ValueIteration<M> {
    /// Creates a solver with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the state or action space is empty, the discount is
    /// outside `[0, 1]`, or some `(s, a)` pair does not define a probability
    /// distribution over next states.
    pub fn new(mdp: M) -> Result<Self> {
        Self::with_config(mdp, ValueIterationConfig::default())
    }

    /// Creates a solver, building a sparse table as `config.transitions` asks.
    pub fn with_config(mdp: M, config: ValueIterationConfig) -> Result<Self> {
        validate_shape(&mdp)?;
        let transitions = match config.transitions {
            TransitionMode::Dense => None,
            TransitionMode::Provided => SparseTransitions::from_successors(&mdp),
            TransitionMode::Analyze => Some(SparseTransitions::from_dynamic(&mdp)),
        };
        Self::build(mdp, transitions, &config)
    }

    /// Creates a solver that iterates over a precomputed sparse table.
    ///
    /// The table is checked against `dynamic` over `config.verify`;
    /// `config.transitions` is ignored.
    pub fn with_transitions(
        mdp: M,
        transitions: SparseTransitions,
        config: ValueIterationConfig,
    ) -> Result<Self> {
        validate_shape(&mdp)?;
        Self::build(mdp, Some(transitions), &config)
    }

    fn build(
        mdp: M,
        transitions: Option<SparseTransitions>,
        config: &ValueIterationConfig,
    ) -> Result<Self> {
        verify_dynamic(&mdp, &config.verify, config.probability_tolerance)?;
        if let Some(table) = &transitions {
            table.validate(&mdp, &config.verify, config.probability_tolerance)?;
            debug!(
                "sparse transitions: {} entries for {} state-action pairs",
                table.nonzero_entries(),
                mdp.num_states() * mdp.num_actions()
            );
        }

        let num_states = mdp.num_states();
        Ok(Self {
            discount: mdp.discount(),
            value: vec![0.0; num_states],
            policy: vec![0; num_states],
            mdp,
            transitions,
            report_progress: config.report_progress,
            outcome: None,
        })
    }

    /// Improves the value function and policy by up to `max_iterations`
    /// sweeps, stopping early once no state changes by `tolerance` or more.
    ///
    /// Calling this again continues from the current estimates.
    ///
    /// # Examples
    ///
    /// ```
    /// use bellman::dynamic::{TabularMdp, Termination, ValueIteration};
    /// use ndarray::{arr2, arr3};
    ///
    /// // one state, one action, reward 1 forever
    /// let mdp = TabularMdp::new(0.5, arr3(&[[[1.0]]]), arr2(&[[1.0]])).unwrap();
    /// let mut solver = ValueIteration::new(mdp).unwrap();
    ///
    /// let outcome = solver.improve(100, 1e-9);
    /// assert_eq!(outcome.status, Termination::Converged);
    /// assert!((solver.value_at(0) - 2.0).abs() < 1e-8);
    /// ```
    pub fn improve(&mut self, max_iterations: usize, tolerance: f64) -> Outcome {
        if self.report_progress {
            info!(
                "Bellman improvement beginning ({} states, {} actions, {})",
                self.mdp.num_states(),
                self.mdp.num_actions(),
                if self.transitions.is_some() {
                    "sparse"
                } else {
                    "dense"
                }
            );
        }

        let outcome = match &self.transitions {
            Some(table) => Sweep {
                mdp: &self.mdp,
                expectation: table,
                discount: self.discount,
                tolerance,
            }
            .run(
                &mut self.value,
                &mut self.policy,
                max_iterations,
                self.report_progress,
            ),
            None => Sweep {
                mdp: &self.mdp,
                expectation: &Dense(&self.mdp),
                discount: self.discount,
                tolerance,
            }
            .run(
                &mut self.value,
                &mut self.policy,
                max_iterations,
                self.report_progress,
            ),
        };

        if self.report_progress {
            match outcome.status {
                Termination::Converged => info!(
                    "... Converged at iteration {} of {}.",
                    outcome.iterations, max_iterations
                ),
                Termination::MaxIterationsReached => {
                    info!("... Finished at max iteration {}.", max_iterations)
                }
            }
        }
        self.outcome = Some(outcome);
        outcome
    }

    /// Current value estimate at `s`.
    ///
    /// # Panics
    ///
    /// Panics if `s >= num_states`.
    pub fn value_at(&self, s: usize) -> f64 {
        assert!(
            s < self.value.len(),
            "State {} is out of range (num_states = {})",
            s,
            self.value.len()
        );
        self.value[s]
    }

    /// Current greedy action at `s`.
    ///
    /// # Panics
    ///
    /// Panics if `s >= num_states`.
    pub fn action_at(&self, s: usize) -> usize {
        assert!(
            s < self.policy.len(),
            "State {} is out of range (num_states = {})",
            s,
            self.policy.len()
        );
        self.policy[s]
    }

    /// Copy of the value function.
    pub fn value(&self) -> Vec<f64> {
        self.value.clone()
    }

    /// Copy of the policy.
    pub fn policy(&self) -> Vec<usize> {
        self.policy.clone()
    }

    /// Outcome of the most recent `improve`, `None` before the first call.
    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn num_states(&self) -> usize {
        self.value.len()
    }

    pub fn num_actions(&self) -> usize {
        self.mdp.num_actions()
    }

    pub fn discount(&self) -> f64 {
        self.discount
    }

    pub fn mdp(&self) -> &M {
        &self.mdp
    }

    /// Sparse table in use, if any.
    pub fn transitions(&self) -> Option<&SparseTransitions> {
        self.transitions.as_ref()
    }

    pub(crate) fn estimates(&self) -> (&[f64], &[usize]) {
        (&self.value, &self.policy)
    }
}

/// Solves `mdp` with the default configuration, returning the value function,
/// the greedy policy and how the iteration ended.
///
/// # Examples
///
/// ```
/// use bellman::dynamic::{value_iteration, TabularMdp};
/// use ndarray::{arr2, arr3};
///
/// // Action 0 stays put, action 1 swaps states. Only state 1 pays.
/// let mdp = TabularMdp::new(
///     0.9,
///     arr3(&[[[1.0, 0.0], [0.0, 1.0]], [[0.0, 1.0], [1.0, 0.0]]]),
///     arr2(&[[0.0, 1.0], [0.0, 1.0]]),
/// )
/// .unwrap();
///
/// let (values, policy, outcome) = value_iteration(mdp, 1000, 1e-9).unwrap();
/// assert!(outcome.converged());
/// assert_eq!(policy, vec![1, 0]);
/// assert!((values[1] - 10.0).abs() < 1e-6);
/// ```
pub fn value_iteration<M: MarkovDecisionProcess>(
    mdp: M,
    max_iterations: usize,
    tolerance: f64,
) -> Result<(Vec<f64>, Vec<usize>, Outcome)> {
    let mut solver = ValueIteration::new(mdp)?;
    let outcome = solver.improve(max_iterations, tolerance);
    Ok((solver.value, solver.policy, outcome))
}

/// Expected next-state value for a `(state, action)` pair.
trait Expectation {
    fn expectation(&self, s: usize, a: usize, values: &[f64]) -> f64;
}

impl Expectation for SparseTransitions {
    fn expectation(&self, s: usize, a: usize, values: &[f64]) -> f64 {
        SparseTransitions::expectation(self, s, a, values)
    }
}

struct Dense<'a, M>(&'a M);

impl<M: MarkovDecisionProcess> Expectation for Dense<'_, M> {
    #[cfg(not(feature = "parallel"))]
    fn expectation(&self, s: usize, a: usize, values: &[f64]) -> f64 {
        dense_expectation(self.0, s, a, values)
    }

    #[cfg(feature = "parallel")]
    fn expectation(&self, s: usize, a: usize, values: &[f64]) -> f64 {
        use rayon::prelude::*;
        if values.len() < PARALLEL_DENSE_THRESHOLD {
            return dense_expectation(self.0, s, a, values);
        }
        values
            .par_iter()
            .enumerate()
            .map(|(s1, &v)| self.0.dynamic(s, a, s1) * v)
            .sum()
    }
}

fn dense_expectation<M: MarkovDecisionProcess>(mdp: &M, s: usize, a: usize, values: &[f64]) -> f64 {
    let mut expectation = 0.0;
    for (s1, &v) in values.iter().enumerate() {
        expectation += mdp.dynamic(s, a, s1) * v;
    }
    expectation
}

struct Sweep<'a, M, E: ?Sized> {
    mdp: &'a M,
    expectation: &'a E,
    discount: f64,
    tolerance: f64,
}

impl<M: MarkovDecisionProcess, E: Expectation + ?Sized> Sweep<'_, M, E> {
    fn run(
        &self,
        value: &mut [f64],
        policy: &mut [usize],
        max_iterations: usize,
        report_progress: bool,
    ) -> Outcome {
        let mut max_delta = f64::INFINITY;
        for iteration in 1..=max_iterations {
            if report_progress && (5 * iteration) % max_iterations == 0 {
                info!("({} / {})", iteration, max_iterations);
            }

            let (converged, delta) = self.backup(value, policy);
            max_delta = delta;
            trace!("sweep {}: max delta {}", iteration, max_delta);

            if converged {
                return Outcome {
                    status: Termination::Converged,
                    iterations: iteration,
                    max_delta,
                };
            }
        }

        Outcome {
            status: Termination::MaxIterationsReached,
            iterations: max_iterations,
            max_delta,
        }
    }

    /// One in-place sweep over every state. Returns whether every state moved
    /// by less than the tolerance, and the largest move.
    fn backup(&self, value: &mut [f64], policy: &mut [usize]) -> (bool, f64) {
        let mut converged = true;
        let mut max_delta = 0.0_f64;

        for s in 0..value.len() {
            let mut best_value = f64::NEG_INFINITY;
            let mut best_action = 0;
            for a in 0..self.mdp.num_actions() {
                let candidate = self.mdp.reward(s, a)
                    + self.discount * self.expectation.expectation(s, a, value);
                // strict: the lowest action index wins ties
                if candidate > best_value {
                    best_value = candidate;
                    best_action = a;
                }
            }

            let delta = (value[s] - best_value).abs();
            converged = converged && delta < self.tolerance;
            max_delta = max_delta.max(delta);
            value[s] = best_value;
            policy[s] = best_action;
        }

        (converged, max_delta)
    }
}
