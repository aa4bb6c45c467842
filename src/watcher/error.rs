//! Watcher error types.

use std::path::PathBuf;

/// Errors that can occur while watching or reading sources.
#[derive(thiserror::Error, Debug)]
pub enum WatcherError {
    /// No directory holding a source exists.
    #[error("Watched path missing: {0}")]
    PathMissing(PathBuf),

    /// Permission denied accessing file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Notify watcher error.
    #[error("File watcher error: {0}")]
    Notify(#[from] notify::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Notification channel closed.
    #[error("Channel closed")]
    ChannelClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_missing_display() {
        let err = WatcherError::PathMissing(PathBuf::from("/tmp/interlateral_dna"));
        assert_eq!(err.to_string(), "Watched path missing: /tmp/interlateral_dna");
    }

    #[test]
    fn test_permission_denied_display() {
        let err = WatcherError::PermissionDenied(PathBuf::from("/root/ag_log.md"));
        assert_eq!(err.to_string(), "Permission denied: /root/ag_log.md");
    }

    #[test]
    fn test_channel_closed_display() {
        assert_eq!(WatcherError::ChannelClosed.to_string(), "Channel closed");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::other("disk gone");
        let watcher_err: WatcherError = io_err.into();
        assert!(matches!(watcher_err, WatcherError::Io(_)));
        assert!(watcher_err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_from_notify_error() {
        let watcher_err: WatcherError = notify::Error::generic("test error").into();
        assert!(matches!(watcher_err, WatcherError::Notify(_)));
        assert!(watcher_err.to_string().contains("File watcher error"));
    }
}
