//! This module provides the contract a discrete Markov Decision Process (MDP)
//! implements to be solved by value iteration, the setup-time checks run on
//! that contract, and a dense tabular MDP.

use approx::abs_diff_eq;
use ndarray::{Array2, Array3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::try_for_each_pair;
use crate::error::{Error, Result};

/// Default tolerance when checking that transition probabilities sum to one.
pub const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// A finite-state, finite-action MDP with deterministic, time-invariant rewards.
///
/// States are `0..num_states()` and actions `0..num_actions()`. Problems with
/// structured states map them to flat indices with
/// [`indexing`](crate::dynamic::indexing).
///
/// # Examples
///
/// ```
/// use bellman::dynamic::MarkovDecisionProcess;
///
/// // Two states; action 1 flips the state, action 0 stays. Being in state 1 pays.
/// struct Flip;
///
/// impl MarkovDecisionProcess for Flip {
///     fn num_states(&self) -> usize { 2 }
///     fn num_actions(&self) -> usize { 2 }
///     fn discount(&self) -> f64 { 0.5 }
///
///     fn dynamic(&self, s: usize, a: usize, s1: usize) -> f64 {
///         let next = if a == 1 { 1 - s } else { s };
///         if s1 == next { 1.0 } else { 0.0 }
///     }
///
///     fn reward(&self, s: usize, _a: usize) -> f64 {
///         s as f64
///     }
/// }
///
/// let (values, policy, _) = bellman::dynamic::value_iteration(Flip, 200, 1e-9).unwrap();
/// assert_eq!(policy, vec![1, 0]);
/// assert!((values[1] - 2.0).abs() < 1e-6);
/// ```
pub trait MarkovDecisionProcess: Sync {
    /// Cardinality of the state space.
    fn num_states(&self) -> usize;

    /// Cardinality of the action space (every action is available in every state).
    fn num_actions(&self) -> usize;

    /// Factor applied to future reward, within `[0, 1]`.
    fn discount(&self) -> f64;

    /// Probability of moving to `s1` after taking action `a` in state `s`.
    fn dynamic(&self, s: usize, a: usize, s1: usize) -> f64;

    /// Immediate reward for taking action `a` in state `s`.
    fn reward(&self, s: usize, a: usize) -> f64;

    /// Optional list of the `(next_state, probability)` pairs with nonzero
    /// probability for `(s, a)`.
    ///
    /// When an MDP supplies these the solver sums over the list instead of
    /// calling [`dynamic`](Self::dynamic) for every state. The entries must
    /// agree with `dynamic`; the solver checks that at construction.
    fn successors(&self, _s: usize, _a: usize) -> Option<Vec<(usize, f64)>> {
        None
    }
}

impl<M: MarkovDecisionProcess + ?Sized> MarkovDecisionProcess for &M {
    fn num_states(&self) -> usize {
        (**self).num_states()
    }

    fn num_actions(&self) -> usize {
        (**self).num_actions()
    }

    fn discount(&self) -> f64 {
        (**self).discount()
    }

    fn dynamic(&self, s: usize, a: usize, s1: usize) -> f64 {
        (**self).dynamic(s, a, s1)
    }

    fn reward(&self, s: usize, a: usize) -> f64 {
        (**self).reward(s, a)
    }

    fn successors(&self, s: usize, a: usize) -> Option<Vec<(usize, f64)>> {
        (**self).successors(s, a)
    }
}

/// Which `(state, action)` pairs are checked before solving.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum VerifyScope {
    /// Every pair. Costs `num_states^2 * num_actions` calls to `dynamic`.
    #[default]
    Full,
    /// A reproducible random sample of pairs, drawn with replacement.
    Sampled { pairs: usize, seed: u64 },
    /// No checks at all.
    Skip,
}

impl VerifyScope {
    /// The pairs this scope covers for a space of the given size.
    pub fn pairs(&self, num_states: usize, num_actions: usize) -> Vec<(usize, usize)> {
        match *self {
            VerifyScope::Skip => Vec::new(),
            VerifyScope::Sampled { pairs, seed } if pairs < num_states * num_actions => {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                (0..pairs)
                    .map(|_| (rng.gen_range(0..num_states), rng.gen_range(0..num_actions)))
                    .collect()
            }
            _ => (0..num_states)
                .flat_map(|s| (0..num_actions).map(move |a| (s, a)))
                .collect(),
        }
    }
}

/// Checks that `dynamic` is a probability distribution over next states for
/// every pair in `scope`.
///
/// Each probability must be finite and within `[0, 1]` and, for every pair,
/// the probabilities must sum to one within `tolerance`.
pub fn verify_dynamic<M>(mdp: &M, scope: &VerifyScope, tolerance: f64) -> Result<()>
where
    M: MarkovDecisionProcess + ?Sized,
{
    let pairs = scope.pairs(mdp.num_states(), mdp.num_actions());
    try_for_each_pair(&pairs, |s, a| verify_pair(mdp, s, a, tolerance))
}

fn verify_pair<M>(mdp: &M, s: usize, a: usize, tolerance: f64) -> Result<()>
where
    M: MarkovDecisionProcess + ?Sized,
{
    let mut total = 0.0;
    for s1 in 0..mdp.num_states() {
        let probability = mdp.dynamic(s, a, s1);
        if !probability.is_finite() || probability < -tolerance || probability > 1.0 + tolerance
        {
            return Err(Error::InvalidProbability {
                state: s,
                action: a,
                next_state: s1,
                probability,
            });
        }
        total += probability;
    }

    if !abs_diff_eq!(total, 1.0, epsilon = tolerance) {
        return Err(Error::ProbabilityMass {
            state: s,
            action: a,
            total,
        });
    }
    Ok(())
}

/// Checks the construction parameters shared by every MDP.
pub(crate) fn validate_shape<M>(mdp: &M) -> Result<()>
where
    M: MarkovDecisionProcess + ?Sized,
{
    if mdp.num_states() == 0 {
        return Err(Error::EmptyStateSpace);
    }
    if mdp.num_actions() == 0 {
        return Err(Error::EmptyActionSpace);
    }
    let discount = mdp.discount();
    if !(0.0..=1.0).contains(&discount) {
        return Err(Error::InvalidDiscount(discount));
    }
    Ok(())
}

/// An MDP given by dense tables.
///
/// - `transitions[[a, s, s1]]`: probability of `s -> s1` under action `a`
/// - `rewards[[a, s]]`: reward for action `a` in state `s`
#[derive(Debug, Clone)]
pub struct TabularMdp {
    discount: f64,
    transitions: Array3<f64>,
    rewards: Array2<f64>,
}

impl TabularMdp {
    /// Creates a tabular MDP, checking table shapes, the discount and that
    /// every row of `transitions` is a probability distribution.
    ///
    /// # Examples
    ///
    /// ```
    /// use bellman::dynamic::TabularMdp;
    /// use ndarray::{arr2, arr3};
    ///
    /// let mdp = TabularMdp::new(
    ///     0.9,
    ///     arr3(&[[[1.0, 0.0], [0.0, 1.0]], [[0.0, 1.0], [1.0, 0.0]]]),
    ///     arr2(&[[0.0, 1.0], [0.0, 0.0]]),
    /// );
    /// assert!(mdp.is_ok());
    ///
    /// let lopsided = TabularMdp::new(
    ///     0.9,
    ///     arr3(&[[[0.5, 0.0], [0.0, 1.0]]]),
    ///     arr2(&[[0.0, 1.0]]),
    /// );
    /// assert!(lopsided.is_err());
    /// ```
    pub fn new(discount: f64, transitions: Array3<f64>, rewards: Array2<f64>) -> Result<Self> {
        let (num_actions, num_states, num_next) = transitions.dim();
        if num_next != num_states {
            return Err(Error::TableShape {
                table: "transition",
                found: transitions.shape().to_vec(),
                expected: vec![num_actions, num_states, num_states],
            });
        }
        if rewards.dim() != (num_actions, num_states) {
            return Err(Error::TableShape {
                table: "reward",
                found: rewards.shape().to_vec(),
                expected: vec![num_actions, num_states],
            });
        }

        let mdp = Self {
            discount,
            transitions,
            rewards,
        };
        validate_shape(&mdp)?;
        verify_dynamic(&mdp, &VerifyScope::Full, PROBABILITY_TOLERANCE)?;
        Ok(mdp)
    }

    pub fn transitions(&self) -> &Array3<f64> {
        &self.transitions
    }

    pub fn rewards(&self) -> &Array2<f64> {
        &self.rewards
    }
}

impl MarkovDecisionProcess for TabularMdp {
    fn num_states(&self) -> usize {
        self.rewards.ncols()
    }

    fn num_actions(&self) -> usize {
        self.rewards.nrows()
    }

    fn discount(&self) -> f64 {
        self.discount
    }

    fn dynamic(&self, s: usize, a: usize, s1: usize) -> f64 {
        self.transitions[[a, s, s1]]
    }

    fn reward(&self, s: usize, a: usize) -> f64 {
        self.rewards[[a, s]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr2, arr3};

    /// Deterministic MDP where `next[s][a]` is the successor of `(s, a)`.
    struct Deterministic {
        next: Vec<Vec<usize>>,
    }

    impl MarkovDecisionProcess for Deterministic {
        fn num_states(&self) -> usize {
            self.next.len()
        }

        fn num_actions(&self) -> usize {
            self.next[0].len()
        }

        fn discount(&self) -> f64 {
            0.9
        }

        fn dynamic(&self, s: usize, a: usize, s1: usize) -> f64 {
            if self.next[s][a] == s1 {
                1.0
            } else {
                0.0
            }
        }

        fn reward(&self, _s: usize, _a: usize) -> f64 {
            0.0
        }
    }

    /// Leaks half of the mass out of state 1 under action 0.
    struct Leaky;

    impl MarkovDecisionProcess for Leaky {
        fn num_states(&self) -> usize {
            3
        }

        fn num_actions(&self) -> usize {
            2
        }

        fn discount(&self) -> f64 {
            0.9
        }

        fn dynamic(&self, s: usize, a: usize, s1: usize) -> f64 {
            match (s, a) {
                (1, 0) if s1 == 2 => 0.5,
                (1, 0) => 0.0,
                _ if s1 == s => 1.0,
                _ => 0.0,
            }
        }

        fn reward(&self, _s: usize, _a: usize) -> f64 {
            0.0
        }
    }

    #[test]
    fn test_verify_accepts_distributions() {
        let mdp = Deterministic {
            next: vec![vec![0, 1], vec![1, 0]],
        };
        assert!(verify_dynamic(&mdp, &VerifyScope::Full, PROBABILITY_TOLERANCE).is_ok());
    }

    #[test]
    fn test_verify_names_offending_pair() {
        match verify_dynamic(&Leaky, &VerifyScope::Full, PROBABILITY_TOLERANCE) {
            Err(Error::ProbabilityMass {
                state,
                action,
                total,
            }) => {
                assert_eq!((state, action), (1, 0));
                approx::assert_abs_diff_eq!(total, 0.5);
            }
            other => panic!("expected ProbabilityMass, got {:?}", other),
        }
    }

    #[test]
    fn test_verify_skip_trusts_caller() {
        assert!(verify_dynamic(&Leaky, &VerifyScope::Skip, PROBABILITY_TOLERANCE).is_ok());
    }

    #[test]
    fn test_verify_rejects_negative_probability() {
        let result = TabularMdp::new(
            0.5,
            arr3(&[[[1.5, -0.5], [0.0, 1.0]]]),
            arr2(&[[0.0, 0.0]]),
        );
        assert!(matches!(
            result,
            Err(Error::InvalidProbability {
                state: 0,
                action: 0,
                next_state: 0,
                ..
            })
        ));
    }

    #[test]
    fn test_sampled_scope_is_reproducible() {
        let scope = VerifyScope::Sampled { pairs: 20, seed: 7 };
        let first = scope.pairs(100, 5);
        assert_eq!(first.len(), 20);
        assert_eq!(first, scope.pairs(100, 5));
        assert!(first.iter().all(|&(s, a)| s < 100 && a < 5));
    }

    #[test]
    fn test_oversized_sample_covers_everything() {
        let scope = VerifyScope::Sampled {
            pairs: 1000,
            seed: 1,
        };
        assert_eq!(scope.pairs(3, 2), VerifyScope::Full.pairs(3, 2));
        assert_eq!(VerifyScope::Full.pairs(3, 2).len(), 6);
        assert!(VerifyScope::Skip.pairs(3, 2).is_empty());
    }

    #[test]
    fn test_validate_shape() {
        let mdp = Deterministic {
            next: vec![vec![0]],
        };
        assert!(validate_shape(&mdp).is_ok());

        let rewards: Array2<f64> = Array2::zeros((1, 0));
        let result = TabularMdp::new(0.5, Array3::zeros((1, 0, 0)), rewards);
        assert!(matches!(result, Err(Error::EmptyStateSpace)));

        let result = TabularMdp::new(0.5, Array3::zeros((0, 2, 2)), Array2::zeros((0, 2)));
        assert!(matches!(result, Err(Error::EmptyActionSpace)));
    }

    #[test]
    fn test_discount_bounds() {
        let identity = arr3(&[[[1.0, 0.0], [0.0, 1.0]]]);
        let rewards = arr2(&[[1.0, 0.0]]);
        for discount in [0.0, 0.5, 1.0] {
            assert!(TabularMdp::new(discount, identity.clone(), rewards.clone()).is_ok());
        }
        for discount in [-0.1, 1.01, f64::NAN] {
            assert!(matches!(
                TabularMdp::new(discount, identity.clone(), rewards.clone()),
                Err(Error::InvalidDiscount(_))
            ));
        }
    }

    #[test]
    fn test_table_shape_mismatch() {
        let result = TabularMdp::new(
            0.5,
            arr3(&[[[1.0, 0.0], [0.0, 1.0]]]),
            arr2(&[[1.0, 0.0, 0.0]]),
        );
        assert!(matches!(
            result,
            Err(Error::TableShape {
                table: "reward",
                ..
            })
        ));

        let result = TabularMdp::new(0.5, Array3::zeros((1, 2, 3)), Array2::zeros((1, 2)));
        assert!(matches!(
            result,
            Err(Error::TableShape {
                table: "transition",
                ..
            })
        ));
    }

    #[test]
    fn test_tabular_lookup_order() {
        let mdp = TabularMdp::new(
            0.5,
            arr3(&[
                [[1.0, 0.0], [0.0, 1.0]],
                [[0.25, 0.75], [0.6, 0.4]],
            ]),
            arr2(&[[1.0, 2.0], [3.0, 4.0]]),
        )
        .unwrap();

        assert_eq!(mdp.num_states(), 2);
        assert_eq!(mdp.num_actions(), 2);
        assert_eq!(mdp.dynamic(0, 1, 1), 0.75);
        assert_eq!(mdp.dynamic(1, 1, 0), 0.6);
        assert_eq!(mdp.reward(1, 0), 2.0);
        assert_eq!(mdp.reward(0, 1), 3.0);
    }
}
