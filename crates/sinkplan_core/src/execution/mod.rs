pub mod executable;
pub mod operators;
pub mod planner;
pub mod stream;
