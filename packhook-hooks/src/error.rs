use std::fmt;

use thiserror::Error;

/// Result type for hook dispatch.
pub type HookResult<T> = std::result::Result<T, HookError>;

/// What a hook does with an async listener failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorAction {
    /// Abort the remaining chain and return the error.
    #[default]
    Rethrow,
    /// Skip the failed listener and keep going.
    Ignore,
}

/// An error raised by a listener, wrapping the listener's own report.
pub struct ListenerError(eyre::Report);

impl ListenerError {
    pub fn new(report: eyre::Report) -> Self {
        Self(report)
    }

    /// The report returned by the listener.
    pub fn report(&self) -> &eyre::Report {
        &self.0
    }
}

impl fmt::Debug for ListenerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ListenerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#}", self.0)
    }
}

impl std::error::Error for ListenerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

#[derive(Debug, Error)]
pub enum HookError {
    #[error("{hook}: tap '{tap}' failed: {error}")]
    Listener {
        hook: String,
        tap: String,
        error: ListenerError,
    },

    #[error("Missing name for tap on hook '{hook}'")]
    MissingName { hook: String },

    #[error("cannot tap '{tap}' asynchronously on sync hook '{hook}'")]
    AsyncTapOnSyncHook { hook: String, tap: String },

    #[error("hook '{hook}' is asynchronous and must be called with call_async")]
    SyncCallOnAsyncHook { hook: String },

    #[error("{hook}: tap '{tap}' returned a value whose shape is incompatible with its input")]
    IncompatibleShape { hook: String, tap: String },

    #[error("no hook named '{name}' is registered")]
    UnknownHook { name: String },

    #[error("hook '{name}' is registered with different argument or result types")]
    TypeMismatch { name: String },
}

impl HookError {
    /// Name of the tap that caused this error, if any.
    pub fn tap(&self) -> Option<&str> {
        match self {
            HookError::Listener { tap, .. }
            | HookError::AsyncTapOnSyncHook { tap, .. }
            | HookError::IncompatibleShape { tap, .. } => Some(tap),
            _ => None,
        }
    }

    /// The listener's report when this is a listener failure.
    pub fn listener_report(&self) -> Option<&eyre::Report> {
        match self {
            HookError::Listener { error, .. } => Some(error.report()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listener_error_display_includes_chain() {
        let report = eyre::eyre!("disk full").wrap_err("writing manifest");
        let err = HookError::Listener {
            hook: "emit".into(),
            tap: "ManifestPlugin".into(),
            error: ListenerError::new(report),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("emit: tap 'ManifestPlugin' failed: writing manifest"));
        assert!(msg.contains("disk full"));
        assert_eq!(err.tap(), Some("ManifestPlugin"));
    }

    #[test]
    fn test_error_action_default_is_rethrow() {
        assert_eq!(ErrorAction::default(), ErrorAction::Rethrow);
    }
}
