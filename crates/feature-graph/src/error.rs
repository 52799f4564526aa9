//! Error types for installation ordering.

use miette::Diagnostic;
use thiserror::Error;

/// Result type for installation ordering.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while ordering features.
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum Error {
    /// Some features depend on each other through `installsAfter`.
    #[error("Circular dependency detected among features: {}", features.join(", "))]
    #[diagnostic(
        code(devfeat_feature_graph::cycle),
        help("Remove an installsAfter entry from one of the listed features")
    )]
    CyclicDependency {
        /// Every feature that could not be ordered, sorted.
        features: Vec<String>,
    },

    /// An override entry names no requested feature.
    #[error("Feature '{id}' in the install order override is not a requested feature")]
    #[diagnostic(
        code(devfeat_feature_graph::override_not_found),
        help("Override entries must match a feature id with or without its version")
    )]
    OverrideNotFound {
        /// The override entry as supplied.
        id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_lists_features() {
        let err = Error::CyclicDependency {
            features: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Circular dependency detected among features: a, b"
        );
    }

    #[test]
    fn test_override_message_names_id() {
        let err = Error::OverrideNotFound {
            id: "ghcr.io/x/y/z".to_string(),
        };
        assert!(err.to_string().contains("ghcr.io/x/y/z"));
    }
}
