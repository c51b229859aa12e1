pub mod physical_conversion;
pub mod table_write;
