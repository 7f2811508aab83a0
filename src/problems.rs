pub mod grid_boi;
pub mod wendy_hunt;

// Re-export the problem builders
pub use grid_boi::{Action, Coord, GridBoi, GridState};
pub use wendy_hunt::wendy_hunt;
