pub mod control;
pub mod gc;
pub mod memory;
