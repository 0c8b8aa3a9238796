//! Alfa Controllr - template-driven declarative reconciler for Kubernetes
//!
//! Alfa Controllr watches `AlfaControllr` custom resources. Each record names
//! the cluster objects it cares about (namespaces, secrets, services, and
//! arbitrary custom resources) and carries a Jinja template. Every tick the
//! reconciler collects those objects, fingerprints the snapshot, and - only
//! when the fingerprint changed since the last successful cycle - renders the
//! template into one or more manifests and server-side-applies them.
//!
//! # Modules
//!
//! - [`crd`] - The AlfaControllr Custom Resource Definition
//! - [`source`] - Controller record loading (static file or live API)
//! - [`collect`] - Object collection per controller declaration
//! - [`canonical`] - Deterministic YAML encoding used for hashing and apply
//! - [`fingerprint`] - Content hashing and the per-controller hash table
//! - [`template`] - Template engine adapter with the domain filter library
//! - [`pipeline`] - Multi-document render output splitting and apply
//! - [`reconcile`] - One full reconciliation tick
//! - [`config`] - Runtime configuration
//! - [`error`] - Error types for the reconciler

#![deny(missing_docs)]

pub mod canonical;
pub mod collect;
pub mod config;
pub mod crd;
pub mod error;
pub mod fingerprint;
pub mod pipeline;
pub mod reconcile;
pub mod source;
pub mod template;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// API Constants
// =============================================================================
// The controller kind lives under a fixed group/version; watched custom
// resources are always listed at CRD_OBJECT_VERSION regardless of what the
// cluster actually serves (the reference "plural.group" carries no version).

/// API group of the AlfaControllr custom resource
pub const API_GROUP: &str = "controllers.illallangi.enterprises";

/// API version of the AlfaControllr custom resource
pub const API_VERSION: &str = "v1beta";

/// Plural name of the AlfaControllr custom resource
pub const API_PLURAL: &str = "alfacontrollrs";

/// Kind of the AlfaControllr custom resource
pub const API_KIND: &str = "AlfaControllr";

/// Fixed version used when listing watched custom resources
pub const CRD_OBJECT_VERSION: &str = "v1beta";

/// Field manager name used for server-side apply
pub const FIELD_MANAGER: &str = "alfa-controllr";
