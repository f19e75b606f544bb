//! istio-verify - Post-install verification for Istio control planes
//!
//! Verifies that an Istio installation, described either by rendered manifest
//! files or by an IstioOperator resource, is actually present and healthy in a
//! live cluster. It is run after `install` or `upgrade` to answer: did the
//! requested resources get created, and are they functioning?
//!
//! The engine walks every resource the installation names, fetches its live
//! counterpart, applies per-kind health checks, and recursively expands any
//! IstioOperator object it discovers along the way. Counts and the first hard
//! failure are reduced to a single pass/fail verdict.
//!
//! # Modules
//!
//! - [`verify`] - The verification engine (walker, expander, locator, verdict)
//! - [`manifest`] - Discovered-object parsing and kind classification
//! - [`operator`] - IstioOperator decoding and normalization
//! - [`render`] - Manifest renderer collaborator interface
//! - [`cluster`] - Cluster read access (dynamic get/list)
//! - [`health`] - Per-kind health predicates
//! - [`progress`] - User-facing progress stream
//! - [`yaml`] - YAML to JSON conversion
//! - [`error`] - Error types

#![deny(missing_docs)]

pub mod cluster;
pub mod error;
pub mod health;
pub mod manifest;
pub mod operator;
pub mod progress;
pub mod render;
pub mod verify;
pub mod yaml;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// Default Configuration Constants
// =============================================================================
// Centralized so CLI defaults, engine defaults, and test fixtures agree.

/// Namespace assumed for discovered objects that do not declare one
pub const DEFAULT_NAMESPACE: &str = "default";

/// Default namespace the Istio control plane is installed into
pub const DEFAULT_ISTIO_NAMESPACE: &str = "istio-system";

/// Name prefix identifying control-plane Deployments (istiod, istio-ingressgateway, ...)
pub const ISTIO_NAME_PREFIX: &str = "istio";
