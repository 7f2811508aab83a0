//! The Grid-Boi pursuit and foraging problem.
//!
//! Three entities share a `width x height` grid. The boi is steered by the
//! agent, the gob wanders uniformly at random, and the goo sits still until
//! the boi reaches it, at which point it respawns on a uniformly random cell.
//! Reaching the goo pays 1, being caught by the gob costs 5.

use crate::dynamic::indexing::{cardinality, flatten, unflatten};
use crate::dynamic::{MarkovDecisionProcess, SolutionLayout};
use crate::error::{Error, Result};

pub const DISCOUNT: f64 = 0.99;
pub const GOO_REWARD: f64 = 1.0;
pub const GOB_PENALTY: f64 = -5.0;

/// Moves available to the boi.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Wait,
    Up,
    Down,
    Left,
    Right,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::Wait,
        Action::Up,
        Action::Down,
        Action::Left,
        Action::Right,
    ];

    pub fn from_index(index: usize) -> Option<Action> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// A grid cell; `y` grows upwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Coord {
    pub x: usize,
    pub y: usize,
}

/// Positions of all three entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridState {
    pub boi: Coord,
    pub gob: Coord,
    pub goo: Coord,
}

#[derive(Debug, Clone)]
pub struct GridBoi {
    width: usize,
    height: usize,
    states: Vec<GridState>,
}

impl GridBoi {
    /// Enumerates every placement of boi, gob and goo on the grid.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidGrid`] unless both sides are at least 2.
    pub fn new(width: usize, height: usize) -> Result<Self> {
        if width < 2 || height < 2 {
            return Err(Error::InvalidGrid { width, height });
        }

        let dims = [width, height, width, height, width, height];
        let states = (0..cardinality(&dims))
            .map(|index| {
                let c = unflatten(index, &dims);
                GridState {
                    boi: Coord { x: c[0], y: c[1] },
                    gob: Coord { x: c[2], y: c[3] },
                    goo: Coord { x: c[4], y: c[5] },
                }
            })
            .collect();

        Ok(Self {
            width,
            height,
            states,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Dimension sizes of the flattened state: boi, gob and goo coordinates.
    pub fn dims(&self) -> [usize; 6] {
        let (w, h) = (self.width, self.height);
        [w, h, w, h, w, h]
    }

    pub fn state(&self, s: usize) -> GridState {
        self.states[s]
    }

    pub fn index_of(&self, state: &GridState) -> usize {
        let GridState { boi, gob, goo } = state;
        flatten(&[boi.x, boi.y, gob.x, gob.y, goo.x, goo.y], &self.dims())
    }

    /// Columns `boi_x, boi_y, gob_x, gob_y, goo_x, goo_y` preceded by a
    /// record holding the grid size.
    pub fn solution_layout(&self) -> SolutionLayout {
        SolutionLayout::factored(
            ["boi_x", "boi_y", "gob_x", "gob_y", "goo_x", "goo_y"],
            &self.dims(),
        )
        .with_preamble([self.width.to_string(), self.height.to_string()])
    }

    /// Where `action` takes the boi from `from`; walls stop movement.
    pub fn step(&self, from: Coord, action: Action) -> Coord {
        let Coord { x, y } = from;
        match action {
            Action::Wait => from,
            Action::Up if y + 1 < self.height => Coord { x, y: y + 1 },
            Action::Down if y > 0 => Coord { x, y: y - 1 },
            Action::Left if x > 0 => Coord { x: x - 1, y },
            Action::Right if x + 1 < self.width => Coord { x: x + 1, y },
            _ => from,
        }
    }

    /// Cells the gob can occupy next: staying put or any in-grid neighbour.
    fn gob_moves(&self, from: Coord) -> Vec<Coord> {
        let mut moves = vec![from];
        moves.extend(
            [Action::Up, Action::Down, Action::Left, Action::Right]
                .into_iter()
                .map(|action| self.step(from, action))
                .filter(|&to| to != from),
        );
        moves
    }

    fn gob_move_count(&self, from: Coord) -> usize {
        1 + usize::from(from.x > 0)
            + usize::from(from.x + 1 < self.width)
            + usize::from(from.y > 0)
            + usize::from(from.y + 1 < self.height)
    }

    fn cells(&self) -> usize {
        self.width * self.height
    }
}

impl MarkovDecisionProcess for GridBoi {
    fn num_states(&self) -> usize {
        self.states.len()
    }

    fn num_actions(&self) -> usize {
        Action::ALL.len()
    }

    fn discount(&self) -> f64 {
        DISCOUNT
    }

    fn dynamic(&self, s: usize, a: usize, s1: usize) -> f64 {
        let (from, to) = (&self.states[s], &self.states[s1]);
        let Some(action) = Action::from_index(a) else {
            return 0.0;
        };

        if to.boi != self.step(from.boi, action) {
            return 0.0;
        }

        let gob_distance = from.gob.x.abs_diff(to.gob.x) + from.gob.y.abs_diff(to.gob.y);
        if gob_distance > 1 {
            return 0.0;
        }
        let mut p = 1.0 / self.gob_move_count(from.gob) as f64;

        if from.boi == from.goo {
            p *= 1.0 / self.cells() as f64;
        } else if to.goo != from.goo {
            return 0.0;
        }
        p
    }

    fn reward(&self, s: usize, _a: usize) -> f64 {
        let state = &self.states[s];
        if state.boi == state.goo {
            GOO_REWARD
        } else if state.boi == state.gob {
            GOB_PENALTY
        } else {
            0.0
        }
    }

    fn successors(&self, s: usize, a: usize) -> Option<Vec<(usize, f64)>> {
        let from = &self.states[s];
        let boi = self.step(from.boi, Action::from_index(a)?);
        let gobs = self.gob_moves(from.gob);
        let p_gob = 1.0 / gobs.len() as f64;

        let (goos, p) = if from.boi == from.goo {
            let goos = (0..self.width)
                .flat_map(|x| (0..self.height).map(move |y| Coord { x, y }))
                .collect();
            (goos, p_gob * (1.0 / self.cells() as f64))
        } else {
            (vec![from.goo], p_gob)
        };

        let mut next = Vec::with_capacity(gobs.len() * goos.len());
        for &gob in &gobs {
            for &goo in &goos {
                next.push((self.index_of(&GridState { boi, gob, goo }), p));
            }
        }
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamic::{
        verify_dynamic, SparseTransitions, TransitionMode, ValueIteration, ValueIterationConfig,
        VerifyScope,
    };
    use approx::assert_abs_diff_eq;

    fn at(x: usize, y: usize) -> Coord {
        Coord { x, y }
    }

    fn quiet(transitions: TransitionMode) -> ValueIterationConfig {
        ValueIterationConfig {
            transitions,
            report_progress: false,
            ..ValueIterationConfig::default()
        }
    }

    #[test]
    fn test_rejects_degenerate_grid() {
        assert!(matches!(
            GridBoi::new(1, 5),
            Err(Error::InvalidGrid {
                width: 1,
                height: 5
            })
        ));
        assert!(GridBoi::new(2, 2).is_ok());
    }

    #[test]
    fn test_state_enumeration_round_trips() {
        let grid = GridBoi::new(3, 2).unwrap();
        assert_eq!(grid.num_states(), 216);
        for s in 0..grid.num_states() {
            assert_eq!(grid.index_of(&grid.state(s)), s);
        }
        let state = GridState {
            boi: at(2, 1),
            gob: at(0, 0),
            goo: at(1, 1),
        };
        assert_eq!(grid.state(grid.index_of(&state)), state);
    }

    #[test]
    fn test_walls_stop_the_boi() {
        let grid = GridBoi::new(3, 3).unwrap();
        assert_eq!(grid.step(at(1, 2), Action::Up), at(1, 2));
        assert_eq!(grid.step(at(1, 0), Action::Down), at(1, 0));
        assert_eq!(grid.step(at(0, 1), Action::Left), at(0, 1));
        assert_eq!(grid.step(at(2, 1), Action::Right), at(2, 1));
        assert_eq!(grid.step(at(1, 1), Action::Up), at(1, 2));
        assert_eq!(grid.step(at(1, 1), Action::Left), at(0, 1));
        assert_eq!(grid.step(at(1, 1), Action::Wait), at(1, 1));
    }

    #[test]
    fn test_rewards() {
        let grid = GridBoi::new(3, 3).unwrap();
        let reward = |boi, gob, goo| grid.reward(grid.index_of(&GridState { boi, gob, goo }), 0);

        assert_eq!(reward(at(1, 1), at(0, 0), at(1, 1)), GOO_REWARD);
        assert_eq!(reward(at(1, 1), at(1, 1), at(1, 1)), GOO_REWARD);
        assert_eq!(reward(at(1, 1), at(1, 1), at(2, 2)), GOB_PENALTY);
        assert_eq!(reward(at(1, 1), at(0, 1), at(2, 2)), 0.0);
    }

    #[test]
    fn test_probability_conservation() {
        let grid = GridBoi::new(3, 3).unwrap();
        assert!(verify_dynamic(&grid, &VerifyScope::Full, 1e-9).is_ok());
    }

    #[test]
    fn test_gob_in_corner_has_three_moves() {
        let grid = GridBoi::new(3, 3).unwrap();
        let from = grid.index_of(&GridState {
            boi: at(1, 1),
            gob: at(0, 0),
            goo: at(2, 2),
        });
        let next = grid.successors(from, Action::Wait.index()).unwrap();

        assert_eq!(next.len(), 3);
        for &(s1, p) in &next {
            assert_abs_diff_eq!(p, 1.0 / 3.0);
            assert_eq!(grid.state(s1).boi, at(1, 1));
            assert_eq!(grid.state(s1).goo, at(2, 2));
        }
    }

    #[test]
    fn test_goo_respawns_when_eaten() {
        let grid = GridBoi::new(3, 3).unwrap();
        let from = grid.index_of(&GridState {
            boi: at(1, 1),
            gob: at(1, 1),
            goo: at(1, 1),
        });
        let next = grid.successors(from, Action::Right.index()).unwrap();

        // gob in the middle has five moves, goo lands on any of nine cells
        assert_eq!(next.len(), 45);
        for &(s1, p) in &next {
            assert_abs_diff_eq!(p, 1.0 / 45.0, epsilon = 1e-15);
            assert_eq!(grid.state(s1).boi, at(2, 1));
            assert_abs_diff_eq!(grid.dynamic(from, Action::Right.index(), s1), p);
        }
    }

    #[test]
    fn test_successors_agree_with_dynamic() {
        let grid = GridBoi::new(2, 3).unwrap();
        let listed = SparseTransitions::from_successors(&grid).unwrap();
        assert_eq!(listed, SparseTransitions::from_dynamic(&grid));
        assert!(listed.validate(&grid, &VerifyScope::Full, 1e-12).is_ok());
    }

    #[test]
    fn test_sparse_and_dense_solutions_match() {
        let grid = GridBoi::new(2, 2).unwrap();
        let mut dense = ValueIteration::with_config(&grid, quiet(TransitionMode::Dense)).unwrap();
        let mut sparse =
            ValueIteration::with_config(&grid, quiet(TransitionMode::Provided)).unwrap();
        assert!(sparse.transitions().is_some());

        let dense_outcome = dense.improve(3000, 1e-6);
        let sparse_outcome = sparse.improve(3000, 1e-6);

        assert!(dense_outcome.converged());
        assert_eq!(dense_outcome.iterations, sparse_outcome.iterations);
        assert_eq!(dense.policy(), sparse.policy());
        for (d, s) in dense.value().iter().zip(sparse.value()) {
            assert_abs_diff_eq!(*d, s, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_boi_steps_onto_adjacent_goo() {
        let grid = GridBoi::new(3, 3).unwrap();
        let mut solver =
            ValueIteration::with_config(&grid, quiet(TransitionMode::Provided)).unwrap();
        assert!(solver.improve(5000, 1e-8).converged());

        // goo one step to the right, gob far away in the opposite corner
        let s = grid.index_of(&GridState {
            boi: at(1, 0),
            gob: at(0, 2),
            goo: at(2, 0),
        });
        assert_eq!(solver.action_at(s), Action::Right.index());
    }

    #[test]
    fn test_solution_layout() {
        let grid = GridBoi::new(2, 2).unwrap();
        let solver = ValueIteration::with_config(&grid, quiet(TransitionMode::Provided)).unwrap();
        let mut buffer = Vec::new();
        solver.write_solution(&mut buffer, &grid.solution_layout()).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines[0], "2,2");
        assert_eq!(lines[1], "boi_x,boi_y,gob_x,gob_y,goo_x,goo_y,action,value");
        assert_eq!(lines[2], "0,0,0,0,0,0,0,0");
        assert_eq!(lines[3], "0,0,0,0,0,1,0,0");
        assert_eq!(lines.len(), 2 + 64);
    }
}
