//! Error types for the verification engine
//!
//! Internal errors carry full structured detail for logging and tests. The
//! verdict boundary deliberately collapses them to one of two terminal
//! variants ([`Error::NoInstallationFound`], [`Error::InstallationFailed`]);
//! callers diagnose failures from the emitted progress lines, not from the
//! returned error text.

use thiserror::Error;

/// Main error type for verification operations
#[derive(Debug, Error)]
pub enum Error {
    /// A cluster read for a specific object failed (network, auth, not-found)
    #[error("failed to fetch {kind} {namespace}/{name}: {source}")]
    FetchFailed {
        /// Kind of the object being fetched
        kind: String,
        /// Object name
        name: String,
        /// Namespace the fetch was scoped to
        namespace: String,
        /// The underlying kube-rs error
        source: kube::Error,
    },

    /// A fetched Deployment failed its readiness check
    #[error("deployment {name} not ready: {reason}")]
    NotReady {
        /// Deployment name
        name: String,
        /// What readiness criterion failed
        reason: String,
    },

    /// A fetched Job has failed or has not reported completion
    #[error("job {name} not complete: {reason}")]
    NotComplete {
        /// Job name
        name: String,
        /// What completion criterion failed
        reason: String,
    },

    /// An object required by the installation is missing or unhealthy.
    ///
    /// Wraps `NotReady`/`NotComplete`/`FetchFailed` with the manifest label
    /// the object came from; this is the externally meaningful "this object
    /// is wrong" signal.
    #[error("Istio installation failed, incomplete or does not match \"{manifest}\": {reason}")]
    VerificationFailed {
        /// Label of the manifest the failing object came from
        manifest: String,
        /// The underlying failure
        #[source]
        reason: Box<Error>,
    },

    /// The manifest renderer produced one or more errors
    #[error("manifest rendering failed: {}", errors.join("; "))]
    RenderFailed {
        /// Every error the renderer reported, in order
        errors: Vec<String>,
    },

    /// No in-cluster IstioOperator matches the requested revision
    #[error("control plane revision {revision:?} not found")]
    RevisionNotFound {
        /// The revision that was requested
        revision: String,
    },

    /// Zero healthy control-plane Deployments were observed.
    ///
    /// Distinguished from other failures because it can occur with no
    /// underlying error at all.
    #[error("no Istio installation found")]
    NoInstallationFound,

    /// Generic terminal failure returned at the public boundary when a fatal
    /// condition occurred and at least one Deployment was found
    #[error("Istio installation failed")]
    InstallationFailed,

    /// Kubernetes API error outside a per-object fetch
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
        /// The resource kind being decoded (if known)
        kind: Option<String>,
    },

    /// I/O error reading manifest files or the install package
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal/operational error (e.g. the expansion depth guard)
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Context where the error occurred
        context: String,
    },
}

impl Error {
    /// Create a fetch error for a specific object
    pub fn fetch(
        kind: impl Into<String>,
        name: impl Into<String>,
        namespace: impl Into<String>,
        source: kube::Error,
    ) -> Self {
        Self::FetchFailed {
            kind: kind.into(),
            name: name.into(),
            namespace: namespace.into(),
            source,
        }
    }

    /// Create a NotReady error for a Deployment
    pub fn not_ready(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NotReady {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a NotComplete error for a Job
    pub fn not_complete(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NotComplete {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Wrap an underlying failure with the manifest label it came from
    pub fn verification_failed(manifest: impl Into<String>, reason: Error) -> Self {
        Self::VerificationFailed {
            manifest: manifest.into(),
            reason: Box::new(reason),
        }
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: None,
        }
    }

    /// Create a serialization error with resource kind context
    pub fn serialization_for_kind(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: Some(kind.into()),
        }
    }

    /// Create an internal error with context
    pub fn internal(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// Whether this is one of the two verdicts the public boundary returns
    pub fn is_terminal(&self) -> bool {
        matches!(self, Error::NoInstallationFound | Error::InstallationFailed)
    }
}
