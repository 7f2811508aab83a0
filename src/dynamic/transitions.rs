//! Sparse transition tables.
//!
//! Most structured MDPs reach only a handful of next states from any
//! `(state, action)` pair. Listing those once turns the `O(num_states)`
//! expectation in every backup into a sum over the nonzero entries.

use approx::abs_diff_eq;

use super::bellman_equation::{MarkovDecisionProcess, VerifyScope};
use super::{map_states, try_for_each_pair};
use crate::error::{Error, Result};

/// For every state and action, the `(next_state, probability)` pairs with
/// nonzero probability, sorted by next state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SparseTransitions {
    table: Vec<Vec<Vec<(usize, f64)>>>,
}

impl SparseTransitions {
    /// Wraps a `table[s][a]` list of transitions.
    ///
    /// Zero-probability entries are dropped and each list is sorted by next
    /// state, so the sparse sum visits states in the same order a dense sum
    /// would.
    ///
    /// # Examples
    ///
    /// ```
    /// use bellman::dynamic::SparseTransitions;
    ///
    /// let table = SparseTransitions::new(vec![vec![vec![(1, 0.25), (0, 0.75), (2, 0.0)]]]);
    /// assert_eq!(table.get(0, 0), &[(0, 0.75), (1, 0.25)]);
    /// assert_eq!(table.nonzero_entries(), 2);
    /// ```
    pub fn new(mut table: Vec<Vec<Vec<(usize, f64)>>>) -> Self {
        for list in table.iter_mut().flatten() {
            list.retain(|&(_, p)| p != 0.0);
            list.sort_by_key(|&(s1, _)| s1);
        }
        Self { table }
    }

    /// Builds the table by evaluating `dynamic` for every `(s, a, s1)` and
    /// keeping the nonzero entries.
    pub fn from_dynamic<M>(mdp: &M) -> Self
    where
        M: MarkovDecisionProcess + ?Sized,
    {
        let table = map_states(mdp.num_states(), |s| {
            (0..mdp.num_actions())
                .map(|a| scan_pair(mdp, s, a))
                .collect::<Vec<_>>()
        });
        Self::new(table)
    }

    /// Builds the table from the MDP's own successor lists.
    ///
    /// Pairs the MDP does not list are filled in by scanning `dynamic`.
    /// Returns `None` when the MDP lists no successors at all.
    pub fn from_successors<M>(mdp: &M) -> Option<Self>
    where
        M: MarkovDecisionProcess + ?Sized,
    {
        let listed = map_states(mdp.num_states(), |s| {
            (0..mdp.num_actions())
                .map(|a| mdp.successors(s, a))
                .collect::<Vec<_>>()
        });
        if listed.iter().flatten().all(Option::is_none) {
            return None;
        }

        let table = listed
            .into_iter()
            .enumerate()
            .map(|(s, actions)| {
                actions
                    .into_iter()
                    .enumerate()
                    .map(|(a, list)| list.unwrap_or_else(|| scan_pair(mdp, s, a)))
                    .collect()
            })
            .collect();
        Some(Self::new(table))
    }

    /// Nonzero transitions out of `(s, a)`.
    pub fn get(&self, s: usize, a: usize) -> &[(usize, f64)] {
        &self.table[s][a]
    }

    pub fn num_states(&self) -> usize {
        self.table.len()
    }

    pub fn num_actions(&self) -> usize {
        self.table.first().map_or(0, Vec::len)
    }

    /// Total number of stored transitions.
    pub fn nonzero_entries(&self) -> usize {
        self.table.iter().flatten().map(Vec::len).sum()
    }

    /// Expected value of `values` at the next state, starting from `(s, a)`.
    pub fn expectation(&self, s: usize, a: usize, values: &[f64]) -> f64 {
        let mut expectation = 0.0;
        for &(s1, p) in &self.table[s][a] {
            expectation += p * values[s1];
        }
        expectation
    }

    /// Checks the table against the MDP it accelerates.
    ///
    /// Shape and next-state ranges are checked for every pair. For the pairs
    /// in `scope`, every listed probability must match `dynamic` and the
    /// listed mass must be one, both within `tolerance`.
    pub fn validate<M>(&self, mdp: &M, scope: &VerifyScope, tolerance: f64) -> Result<()>
    where
        M: MarkovDecisionProcess + ?Sized,
    {
        let (num_states, num_actions) = (mdp.num_states(), mdp.num_actions());
        if self.num_states() != num_states
            || self.table.iter().any(|actions| actions.len() != num_actions)
        {
            return Err(Error::SparseShape {
                states: self.num_states(),
                actions: self.num_actions(),
                expected_states: num_states,
                expected_actions: num_actions,
            });
        }

        for (s, actions) in self.table.iter().enumerate() {
            for (a, list) in actions.iter().enumerate() {
                if let Some(&(s1, _)) = list.iter().find(|&&(s1, _)| s1 >= num_states) {
                    return Err(Error::SparseOutOfRange {
                        state: s,
                        action: a,
                        next_state: s1,
                        num_states,
                    });
                }
            }
        }

        let pairs = scope.pairs(num_states, num_actions);
        try_for_each_pair(&pairs, |s, a| self.validate_pair(mdp, s, a, tolerance))
    }

    fn validate_pair<M>(&self, mdp: &M, s: usize, a: usize, tolerance: f64) -> Result<()>
    where
        M: MarkovDecisionProcess + ?Sized,
    {
        let mut total = 0.0;
        for &(s1, sparse) in self.get(s, a) {
            let dense = mdp.dynamic(s, a, s1);
            if !abs_diff_eq!(sparse, dense, epsilon = tolerance) {
                return Err(Error::SparseMismatch {
                    state: s,
                    action: a,
                    next_state: s1,
                    sparse,
                    dense,
                });
            }
            total += sparse;
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
}

fn scan_pair<M>(mdp: &M, s: usize, a: usize) -> Vec<(usize, f64)>
where
    M: MarkovDecisionProcess + ?Sized,
{
    (0..mdp.num_states())
        .map(|s1| (s1, mdp.dynamic(s, a, s1)))
        .filter(|&(_, p)| p != 0.0)
        .collect()
}
