pub mod batch;
pub mod datatype;
pub mod scalar;
