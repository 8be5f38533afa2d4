pub mod settlement;
pub mod summary;
