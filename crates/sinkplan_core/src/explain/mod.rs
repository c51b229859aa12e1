pub mod explainable;
pub mod formatter;
