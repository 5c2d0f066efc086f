//! Domain types shared by every pipeline stage.

pub mod labels;
pub mod matrix;
pub mod returns;

pub use labels::LabelSet;
pub use matrix::{LabeledMatrix, SquareMatrix};
pub use returns::{NaPolicy, ReturnTable};
