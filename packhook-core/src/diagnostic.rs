//! Diagnostic types for compilations.
//!
//! This module provides types for collecting errors, warnings, and informational
//! messages produced by a build core or by hook listeners.

use serde::{Deserialize, Serialize};

/// Severity level for a diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// An error that fails the build.
    Error,
    /// A warning that doesn't fail the build but should be addressed.
    Warning,
    /// Informational message about the build.
    Info,
}

impl Severity {
    /// Returns true if this is an error severity.
    pub fn is_error(&self) -> bool {
        matches!(self, Severity::Error)
    }

    /// Returns true if this is a warning severity.
    pub fn is_warning(&self) -> bool {
        matches!(self, Severity::Warning)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// A diagnostic message attached to a compilation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    /// The severity level of this diagnostic.
    pub severity: Severity,
    /// Short category, e.g. `ModuleNotFoundError` or the hook that failed.
    pub title: String,
    /// The diagnostic message.
    pub message: String,
    /// Identifier of the module this diagnostic belongs to.
    pub module_identifier: Option<String>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            title: title.into(),
            message: message.into(),
            module_identifier: None,
        }
    }

    /// Create a new warning diagnostic.
    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            title: title.into(),
            message: message.into(),
            module_identifier: None,
        }
    }

    /// Create a new info diagnostic.
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            title: title.into(),
            message: message.into(),
            module_identifier: None,
        }
    }

    /// Attach the module this diagnostic was raised for.
    pub fn at(mut self, module_identifier: impl Into<String>) -> Self {
        self.module_identifier = Some(module_identifier.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity.is_error()
    }

    pub fn is_warning(&self) -> bool {
        self.severity.is_warning()
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.title, self.message)?;
        if let Some(module) = &self.module_identifier {
            write!(f, " (in {})", module)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_error() {
        let diag = Diagnostic::error("HookError", "listener failed");
        assert!(diag.severity.is_error());
        assert_eq!(diag.title, "HookError");
    }

    #[test]
    fn test_diagnostic_with_module() {
        let diag = Diagnostic::warning("ModuleWarning", "unused export").at("./src/a.js");
        assert_eq!(diag.module_identifier.as_deref(), Some("./src/a.js"));
        assert_eq!(
            diag.to_string(),
            "ModuleWarning: unused export (in ./src/a.js)"
        );
    }

    #[test]
    fn test_filter_by_severity() {
        let diagnostics = vec![
            Diagnostic::error("BuildError", "boom"),
            Diagnostic::warning("ModuleWarning", "unused export"),
            Diagnostic::info("Info", "note"),
        ];
        let errors: Vec<_> = diagnostics.iter().filter(|d| d.is_error()).collect();
        let warnings: Vec<_> = diagnostics
            .iter()
            .cloned()
            .filter(Diagnostic::is_warning)
            .collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].title, "BuildError");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].title, "ModuleWarning");
    }

    #[test]
    fn test_severity_display() {
        assert_eq!(Severity::Error.to_string(), "error");
        assert_eq!(Severity::Warning.to_string(), "warning");
        assert_eq!(Severity::Info.to_string(), "info");
    }
}
