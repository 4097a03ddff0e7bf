pub mod compose;
pub mod label;
pub mod plan;
