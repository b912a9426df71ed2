//! Channel Planner: suggests follow-ups from recent team chat activity.

pub mod config;
pub mod error;
pub mod graph;
pub mod llm;
pub mod pipeline;
