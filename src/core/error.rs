//! Error handling for sitedoc
//!
//! This module provides the error taxonomy shared by every component and the
//! user-friendly rendering used by the command line front end.
//!
//! # Error Categories
//!
//! - **Validation**: malformed names, documents or transforms. Raised synchronously
//!   and never retried ([`SiteError::InvalidName`], [`SiteError::InvalidDocument`],
//!   [`SiteError::InvalidIdentifier`], [`SiteError::UnknownTransform`],
//!   [`SiteError::ProbeLimitExceeded`]).
//! - **Not found**: a referenced record or resource does not exist
//!   ([`SiteError::DocumentNotFound`], [`SiteError::ResourceNotFound`]). Lookup paths
//!   usually turn these into `false`/`None` instead.
//! - **Collaborator failures**: an external store or provisioning call rejected during
//!   a multi-step flow ([`SiteError::CollaboratorFailure`]).
//! - **Environment mismatch**: an operation invoked against the wrong deployment mode
//!   ([`SiteError::EnvironmentMismatch`]). Raised before any I/O happens.
//!
//! Flows return [`anyhow::Result`] and attach context with
//! [`anyhow::Context`]; [`user_friendly_error`] walks the chain looking for a
//! [`SiteError`] to attach suggestions to.
//!
//! # Examples
//!
//! ```rust,no_run
//! use sitedoc::core::{ErrorContext, SiteError, user_friendly_error};
//!
//! let error = SiteError::DocumentNotFound {
//!     id: "abc123".to_string(),
//! };
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

use crate::config::Environment;

/// The main error type for sitedoc operations.
#[derive(Error, Debug)]
pub enum SiteError {
    /// A candidate name cannot be allocated.
    #[error("Invalid name '{name}': {reason}")]
    InvalidName {
        /// The rejected base name
        name: String,
        /// Why the name was rejected
        reason: String,
    },

    /// A document is structurally unusable for the requested operation.
    #[error("Invalid document: {reason}")]
    InvalidDocument {
        /// What is wrong with the document
        reason: String,
    },

    /// An identifier or URL handed to a converter is malformed.
    #[error("Invalid identifier '{value}'")]
    InvalidIdentifier {
        /// The offending value
        value: String,
    },

    /// A placeholder names a transform that is not registered.
    #[error("Unknown transform '{name}' in placeholder '{token}'")]
    UnknownTransform {
        /// The transform name as written in the template
        name: String,
        /// The full placeholder token
        token: String,
        /// Closest registered transform name, if any
        suggestion: Option<String>,
    },

    /// The allocator exhausted its probe budget.
    #[error("Could not find a free name for '{base}' after {steps} attempts")]
    ProbeLimitExceeded {
        /// The base name being probed
        base: String,
        /// Number of probe rounds performed
        steps: usize,
    },

    /// A document was requested that does not exist in the store.
    #[error("Document '{id}' not found")]
    DocumentNotFound {
        /// Identifier of the missing document
        id: String,
    },

    /// A resource was requested that does not exist on a document.
    #[error("Resource '{name}' not found on document '{id}'")]
    ResourceNotFound {
        /// Owning document identifier
        id: String,
        /// Resource name
        name: String,
    },

    /// An external collaborator rejected a call during a multi-step flow.
    ///
    /// Side effects that completed before the failure are not rolled back.
    #[error("{flow} failed during {step}")]
    CollaboratorFailure {
        /// The flow that was running (e.g. "materialize")
        flow: String,
        /// The step of the flow that failed (e.g. "create teams")
        step: String,
        /// The original rejection
        #[source]
        source: anyhow::Error,
    },

    /// An operation requires a different deployment environment.
    #[error("'{operation}' requires a {required} environment but running {actual}")]
    EnvironmentMismatch {
        /// The operation that was attempted
        operation: String,
        /// The environment the operation needs
        required: Environment,
        /// The environment currently configured
        actual: Environment,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration problem
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl SiteError {
    /// Wrap a collaborator rejection with the flow and step it interrupted.
    pub fn collaborator(
        flow: impl Into<String>,
        step: impl Into<String>,
        source: anyhow::Error,
    ) -> Self {
        Self::CollaboratorFailure {
            flow: flow.into(),
            step: step.into(),
            source,
        }
    }

    /// Whether this error belongs to the validation category.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidName { .. }
                | Self::InvalidDocument { .. }
                | Self::InvalidIdentifier { .. }
                | Self::UnknownTransform { .. }
                | Self::ProbeLimitExceeded { .. }
        )
    }

    /// Whether this error reports a missing record or resource.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::DocumentNotFound { .. } | Self::ResourceNotFound { .. })
    }
}

/// Error wrapper that adds a suggestion and details for terminal display.
#[derive(Debug)]
pub struct ErrorContext {
    /// The primary message
    pub message: String,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors.
    ///
    /// - Error message: red and bold
    /// - Details: yellow
    /// - Suggestion: green
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.message);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

/// Render the full cause chain of an error as a single message.
fn chain_message(error: &anyhow::Error) -> String {
    let mut message = error.to_string();
    let causes: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();
    if !causes.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in causes.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }
    message
}

/// Convert any error into a user-friendly [`ErrorContext`].
///
/// The cause chain is searched for a [`SiteError`]; when one is found a suggestion
/// tailored to its category is attached. The full chain is always kept in the message.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let message = chain_message(&error);
    let site_error = error.chain().find_map(|cause| cause.downcast_ref::<SiteError>());

    let Some(site_error) = site_error else {
        let missing_file = error
            .downcast_ref::<std::io::Error>()
            .is_some_and(|io_error| io_error.kind() == std::io::ErrorKind::NotFound);
        if missing_file {
            return ErrorContext::new(message)
                .with_suggestion("Check that the file or directory exists and the path is correct");
        }
        return ErrorContext::new(message);
    };

    match site_error {
        SiteError::InvalidName { .. } | SiteError::ProbeLimitExceeded { .. } => {
            ErrorContext::new(message)
                .with_suggestion("Pick a shorter or more distinctive title for the new site")
        }
        SiteError::InvalidDocument { .. } | SiteError::InvalidIdentifier { .. } => {
            ErrorContext::new(message)
                .with_suggestion("Run 'sitedoc inspect <id>' to check the stored document")
                .with_details("Documents must carry an item with an id and a JSON data payload")
        }
        SiteError::UnknownTransform { suggestion, .. } => {
            let ctx = ErrorContext::new(message);
            match suggestion {
                Some(name) => ctx.with_suggestion(format!("Did you mean '{name}'?")),
                None => ctx.with_suggestion("Register the transform before interpolating"),
            }
        }
        SiteError::DocumentNotFound { .. } | SiteError::ResourceNotFound { .. } => {
            ErrorContext::new(message)
                .with_suggestion("Check the identifier and the --store directory")
        }
        SiteError::CollaboratorFailure { .. } => ErrorContext::new(message)
            .with_details("Steps completed before the failure were not rolled back")
            .with_suggestion("Clean up any partially created records before retrying"),
        SiteError::EnvironmentMismatch { .. } => ErrorContext::new(message)
            .with_suggestion("Set 'environment' in the sitedoc config file to match your deployment"),
        SiteError::ConfigError { .. } => ErrorContext::new(message)
            .with_suggestion("Check the TOML syntax of your config file"),
        SiteError::IoError(_) | SiteError::JsonError(_) => ErrorContext::new(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_error_categories() {
        let err = SiteError::InvalidName {
            name: String::new(),
            reason: "empty".to_string(),
        };
        assert!(err.is_validation());
        assert!(!err.is_not_found());

        let err = SiteError::DocumentNotFound {
            id: "x".to_string(),
        };
        assert!(err.is_not_found());
        assert!(!err.is_validation());
    }

    #[test]
    fn test_collaborator_failure_keeps_source() {
        let err = SiteError::collaborator("materialize", "create teams", anyhow::anyhow!("503"));
        assert_eq!(err.to_string(), "materialize failed during create teams");
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("503"));
    }

    #[test]
    fn test_user_friendly_error_finds_nested_site_error() {
        let result: anyhow::Result<()> = Err(SiteError::DocumentNotFound {
            id: "abc".to_string(),
        })
        .context("Failed to upgrade document");

        let ctx = user_friendly_error(result.unwrap_err());
        assert!(ctx.message.contains("Failed to upgrade document"));
        assert!(ctx.message.contains("Document 'abc' not found"));
        assert!(ctx.suggestion.is_some());
    }

    #[test]
    fn test_unknown_transform_suggestion() {
        let err = SiteError::UnknownTransform {
            name: "lowercas".to_string(),
            token: "{{a:lowercas}}".to_string(),
            suggestion: Some("lowercase".to_string()),
        };
        let ctx = user_friendly_error(err.into());
        assert_eq!(ctx.suggestion.as_deref(), Some("Did you mean 'lowercase'?"));
    }

    #[test]
    fn test_error_context_display() {
        let ctx = ErrorContext::new("boom").with_details("why").with_suggestion("fix");
        assert_eq!(ctx.to_string(), "boom\nDetails: why\nSuggestion: fix");
    }
}
