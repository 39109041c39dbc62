pub mod query;
pub mod rank;
