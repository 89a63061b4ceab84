pub mod calendar;
pub mod label;
pub mod migrate;
pub mod person;
pub mod task;
pub mod transfer;
pub mod workflow;
