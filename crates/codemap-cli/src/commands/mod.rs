pub mod row;
pub mod spec;
pub mod task;
