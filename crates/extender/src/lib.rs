//! Scheduler extender adapter for the network traffic scorer

pub mod api;
pub mod config;
