pub mod adjust;
pub mod grid_ops;
pub mod edit;
