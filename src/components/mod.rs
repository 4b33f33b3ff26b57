pub mod drag;
pub mod drop_target;
pub mod history;
pub mod info;
pub mod pool;
pub mod tour;
