//! BDD step definitions for the status board

pub mod cache_steps;
pub mod fetcher_steps;
pub mod lifecycle_steps;
