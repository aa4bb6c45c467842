//! comms-monitor - ingests heterogeneous append-only agent logs and exposes
//! them as one ordered, replayable event stream.

pub mod config;
pub mod dashboard;
pub mod display;
pub mod event;
pub mod watcher;
