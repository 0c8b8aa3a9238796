//! Error types for the Alfa Controllr reconciler
//!
//! Each variant maps to one abort scope in the reconciliation loop:
//! a snapshot failure aborts the whole tick, everything else aborts only the
//! cycle of the controller being processed.

use thiserror::Error;

/// Main error type for reconciler operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Global cluster snapshot could not be retrieved; aborts the whole tick
    #[error("unable to retrieve {stage}: {message}")]
    Snapshot {
        /// Which listing failed (namespaces, secrets, services)
        stage: &'static str,
        /// Underlying failure description
        message: String,
    },

    /// Controller file could not be read or parsed
    #[error("controller file error: {0}")]
    ControllerFile(String),

    /// Validation error for controller records
    #[error("validation error: {0}")]
    Validation(String),

    /// A controller declaration matched no objects at all
    #[error("no objects collected")]
    EmptyCollection,

    /// Template rendering failed
    #[error("template render error: {0}")]
    Render(#[from] minijinja::Error),

    /// Rendered output could not be split into documents or re-serialized
    #[error("manifest serialization error: {0}")]
    Serialization(String),

    /// Declarative apply of a single document failed
    #[error("apply error: {0}")]
    Apply(String),
}

impl Error {
    /// Create a snapshot error for the given stage
    pub fn snapshot(stage: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Snapshot {
            stage,
            message: err.to_string(),
        }
    }

    /// Create a controller file error with the given message
    pub fn controller_file(msg: impl Into<String>) -> Self {
        Self::ControllerFile(msg.into())
    }

    /// Create a validation error with the given message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Create an apply error with the given message
    pub fn apply(msg: impl Into<String>) -> Self {
        Self::Apply(msg.into())
    }

    /// True if this error must abort the whole tick rather than one cycle
    pub fn is_tick_scoped(&self) -> bool {
        matches!(self, Self::Snapshot { .. } | Self::ControllerFile(_))
    }

    /// True if the failure happened downstream of fingerprinting, meaning the
    /// controller's hash table entry must be invalidated so the next tick
    /// retries unconditionally
    pub fn invalidates_fingerprint(&self) -> bool {
        matches!(self, Self::Render(_) | Self::Serialization(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_errors_abort_the_tick() {
        let err = Error::snapshot("namespaces", "connection refused");
        assert!(err.is_tick_scoped());
        assert!(err.to_string().contains("namespaces"));
        assert!(err.to_string().contains("connection refused"));

        let err = Error::controller_file("no such file");
        assert!(err.is_tick_scoped());
    }

    #[test]
    fn cycle_errors_do_not_abort_the_tick() {
        assert!(!Error::EmptyCollection.is_tick_scoped());
        assert!(!Error::serialization("bad document").is_tick_scoped());
        assert!(!Error::apply("patch rejected").is_tick_scoped());
    }

    #[test]
    fn downstream_failures_invalidate_the_fingerprint() {
        // Render and serialization failures happen after the fingerprint was
        // computed; the stale entry must not suppress the next tick.
        assert!(Error::serialization("split failed").invalidates_fingerprint());

        // An empty collection aborts before fingerprinting; the table entry
        // stays as it was.
        assert!(!Error::EmptyCollection.invalidates_fingerprint());
        assert!(!Error::snapshot("services", "timeout").invalidates_fingerprint());
    }

    #[test]
    fn error_construction_ergonomics() {
        let name = "watch-services";
        let err = Error::validation(format!("controller {} has an empty template", name));
        assert!(err.to_string().contains("watch-services"));

        let err = Error::apply("static message");
        assert!(err.to_string().contains("static message"));
    }
}
