//! Integration tests for comms-monitor.

mod watcher;
