pub mod analyze;
pub mod manager;
