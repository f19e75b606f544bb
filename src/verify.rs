//! The verification engine
//!
//! [`StatusVerifier`] resolves an installation source into discovered
//! objects, walks them against the live cluster, and reduces the walk to a
//! single verdict. The walk dispatches per kind: Deployments and Jobs get
//! fetched and health-checked, embedded IstioOperator objects are expanded
//! recursively through the renderer, everything else is probed for presence.
//!
//! Walks are strictly sequential and stop at the first fatal error; counts
//! accumulated before the failure are preserved and reported alongside it.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::batch::v1::Job;
use tracing::debug;

use crate::cluster::{decode_object, ClusterReader};
use crate::manifest::{DiscoveredObject, KIND_CRD, KIND_DEPLOYMENT, KIND_ISTIO_OPERATOR, KIND_JOB};
use crate::operator::{operator_api_resource, InstallOperator};
use crate::progress::{ConsoleProgress, ProgressSink};
use crate::render::ManifestRenderer;
use crate::{health, Error, Result, DEFAULT_ISTIO_NAMESPACE, ISTIO_NAME_PREFIX};

/// Maximum depth of nested IstioOperator expansion.
///
/// Nested operators are shallow in practice (one or two levels); the guard
/// turns an unexpected cycle into a clean failure instead of unbounded
/// recursion.
const MAX_OPERATOR_DEPTH: usize = 4;

/// Where the installation description comes from
pub enum InstallationSource {
    /// An already-resolved operator object supplied by the caller
    Operator(Box<InstallOperator>),
    /// A revision identifier to locate among in-cluster operators
    Revision(String),
    /// Externally supplied manifest files
    Files(Vec<PathBuf>),
}

/// Running counters of a walk
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct VerifyCounts {
    /// CustomResourceDefinition objects observed present
    pub crds: usize,
    /// Control-plane Deployments observed present and healthy
    pub deployments: usize,
}

impl VerifyCounts {
    fn merge(&mut self, other: VerifyCounts) {
        self.crds += other.crds;
        self.deployments += other.deployments;
    }
}

/// Counts accumulated by a walk plus its terminal error, if any.
///
/// A fatal error aborts visitation of the remaining objects but never
/// invalidates counts already taken.
#[derive(Debug, Default)]
pub struct WalkOutcome {
    /// Final counters
    pub counts: VerifyCounts,
    /// The first fatal error, when the walk did not finish
    pub error: Option<Error>,
}

impl WalkOutcome {
    fn fail(counts: VerifyCounts, error: Error) -> Self {
        Self {
            counts,
            error: Some(error),
        }
    }
}

/// Post-install verifier for an Istio control plane.
///
/// Generic over the cluster reader and the manifest renderer so walks run
/// against mocks in tests and kube-rs in production.
pub struct StatusVerifier<C, R> {
    cluster: C,
    renderer: R,
    progress: Box<dyn ProgressSink>,
    istio_namespace: String,
    manifests_path: Option<String>,
}

impl<C: ClusterReader, R: ManifestRenderer> StatusVerifier<C, R> {
    /// Create a verifier with default namespace and console progress
    pub fn new(cluster: C, renderer: R) -> Self {
        Self {
            cluster,
            renderer,
            progress: Box::new(ConsoleProgress),
            istio_namespace: DEFAULT_ISTIO_NAMESPACE.to_string(),
            manifests_path: None,
        }
    }

    /// Set the namespace the control plane is expected in
    pub fn with_istio_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.istio_namespace = namespace.into();
        self
    }

    /// Override the install package path on every operator before expansion
    pub fn with_manifests_path(mut self, path: impl Into<String>) -> Self {
        self.manifests_path = Some(path.into());
        self
    }

    /// Replace the progress sink
    pub fn with_progress(mut self, progress: Box<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    // =========================================================================
    // Entry point
    // =========================================================================

    /// Verify an installation and return the final verdict.
    ///
    /// The returned error is deliberately generic ([`Error::InstallationFailed`]
    /// or [`Error::NoInstallationFound`]); per-object detail is emitted on the
    /// progress stream during the walk.
    pub async fn verify(&self, source: InstallationSource) -> Result<()> {
        match source {
            InstallationSource::Operator(operator) => {
                let label = format!("IOP:{}", operator.name());
                let outcome = self.verify_operator(&operator, &label, 0).await;
                self.report_status(outcome)
            }
            InstallationSource::Revision(revision) => {
                let mut operator = self.operator_by_revision(&revision).await?;
                if let Some(path) = &self.manifests_path {
                    operator.spec.install_package_path = Some(path.clone());
                }
                let label = format!("in cluster operator {}", operator.name());
                let outcome = self.verify_operator(&operator, &label, 0).await;
                self.report_status(outcome)
            }
            InstallationSource::Files(paths) => {
                let label = paths
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(",");
                let objects = DiscoveredObject::from_files(&paths)?;
                let outcome = self.walk(objects, &label, 0).await;
                self.report_status(outcome)
            }
        }
    }

    // =========================================================================
    // Operator Expander
    // =========================================================================

    /// Render an operator and walk the objects its manifest names.
    ///
    /// This is the recursive entry point: the walker calls back into it when
    /// it meets an IstioOperator among the discovered objects, so the future
    /// is boxed to break the cycle.
    pub fn verify_operator<'a>(
        &'a self,
        operator: &'a InstallOperator,
        label: &'a str,
        depth: usize,
    ) -> Pin<Box<dyn Future<Output = WalkOutcome> + Send + 'a>> {
        Box::pin(async move {
            if depth > MAX_OPERATOR_DEPTH {
                return WalkOutcome::fail(
                    VerifyCounts::default(),
                    Error::internal(
                        "expand",
                        format!(
                            "operator expansion exceeded depth {} at {}; nested operators may form a cycle",
                            MAX_OPERATOR_DEPTH, label
                        ),
                    ),
                );
            }

            let (manifest, errors) = self.renderer.render(operator);
            if !errors.is_empty() {
                return WalkOutcome::fail(VerifyCounts::default(), Error::RenderFailed { errors });
            }

            let mut objects = Vec::new();
            for (category, blobs) in &manifest {
                for (index, blob) in blobs.iter().enumerate() {
                    // Synthetic name so failure lines point back at the blob
                    let source = format!("{}:{} generated from {}", category, index, label);
                    match DiscoveredObject::from_blob(blob, &source) {
                        Ok(discovered) => objects.extend(discovered),
                        Err(e) => return WalkOutcome::fail(VerifyCounts::default(), e),
                    }
                }
            }

            self.walk(objects, &format!("generated from {}", label), depth)
                .await
        })
    }

    // =========================================================================
    // Resource Walker
    // =========================================================================

    /// Walk discovered objects in sequence, fetching live state and applying
    /// per-kind checks. Stops at the first fatal error.
    async fn walk(&self, objects: Vec<DiscoveredObject>, label: &str, depth: usize) -> WalkOutcome {
        let mut counts = VerifyCounts::default();

        for object in objects {
            let resource = object.api_resource();
            debug!(
                kind = %object.kind,
                name = %object.name,
                namespace = %object.namespace,
                collection = %resource.plural,
                "checking object"
            );

            match object.kind.as_str() {
                KIND_DEPLOYMENT => {
                    let live = match self
                        .cluster
                        .get_namespaced(&resource, &object.namespace, &object.name)
                        .await
                    {
                        Ok(live) => live,
                        Err(e) => {
                            let err =
                                Error::fetch(&object.kind, &object.name, &object.namespace, e);
                            self.report_failure(&object, &err);
                            return WalkOutcome::fail(counts, err);
                        }
                    };
                    let deployment: Deployment = match decode_object(&live, &object.kind) {
                        Ok(deployment) => deployment,
                        Err(e) => {
                            self.report_failure(&object, &e);
                            return WalkOutcome::fail(counts, e);
                        }
                    };
                    if let Err(reason) = health::deployment_ready(&deployment) {
                        let err = Error::verification_failed(label, reason);
                        self.report_failure(&object, &err);
                        return WalkOutcome::fail(counts, err);
                    }
                    if object.namespace == self.istio_namespace
                        && object.name.starts_with(ISTIO_NAME_PREFIX)
                    {
                        counts.deployments += 1;
                    }
                }
                KIND_JOB => {
                    let live = match self
                        .cluster
                        .get_namespaced(&resource, &object.namespace, &object.name)
                        .await
                    {
                        Ok(live) => live,
                        Err(e) => {
                            let err =
                                Error::fetch(&object.kind, &object.name, &object.namespace, e);
                            self.report_failure(&object, &err);
                            return WalkOutcome::fail(counts, err);
                        }
                    };
                    let job: Job = match decode_object(&live, &object.kind) {
                        Ok(job) => job,
                        Err(e) => {
                            self.report_failure(&object, &e);
                            return WalkOutcome::fail(counts, e);
                        }
                    };
                    if let Err(reason) = health::job_completed(&job) {
                        let err = Error::verification_failed(label, reason);
                        self.report_failure(&object, &err);
                        return WalkOutcome::fail(counts, err);
                    }
                }
                KIND_ISTIO_OPERATOR => {
                    // Presence in the desired manifest is authoritative for
                    // this kind: never fetched from the cluster, always
                    // expanded from its own embedded content.
                    let mut nested = match InstallOperator::from_value(object.value.clone()) {
                        Ok(nested) => nested,
                        Err(e) => {
                            self.report_failure(&object, &e);
                            return WalkOutcome::fail(counts, e);
                        }
                    };
                    if let Some(path) = &self.manifests_path {
                        nested.spec.install_package_path = Some(path.clone());
                    }
                    let nested_outcome = self.verify_operator(&nested, label, depth + 1).await;
                    counts.merge(nested_outcome.counts);
                    if let Some(e) = nested_outcome.error {
                        return WalkOutcome::fail(counts, e);
                    }
                }
                _ => {
                    // Scope is unknown for arbitrary kinds: probe cluster-wide
                    // first, then retry namespaced. The namespaced (second)
                    // error is the one reported.
                    if self
                        .cluster
                        .get_clusterwide(&resource, &object.name)
                        .await
                        .is_err()
                    {
                        if let Err(second) = self
                            .cluster
                            .get_namespaced(&resource, &object.namespace, &object.name)
                            .await
                        {
                            let fetch =
                                Error::fetch(&object.kind, &object.name, &object.namespace, second);
                            self.report_failure(&object, &fetch);
                            return WalkOutcome::fail(
                                counts,
                                Error::verification_failed(label, fetch),
                            );
                        }
                    }
                    if object.kind == KIND_CRD {
                        counts.crds += 1;
                    }
                }
            }

            self.progress.emit(&format!(
                "✔ {}: {}.{} checked successfully",
                object.kind, object.name, object.namespace
            ));
        }

        WalkOutcome {
            counts,
            error: None,
        }
    }

    fn report_failure(&self, object: &DiscoveredObject, error: &Error) {
        self.progress.emit(&format!(
            "✘ {}: {}.{}: {}",
            object.kind, object.name, object.namespace, error
        ));
    }

    // =========================================================================
    // Cluster Operator Locator
    // =========================================================================

    /// List every IstioOperator stored in the cluster, across all namespaces.
    ///
    /// Fails fast: a single list or decode error aborts the listing.
    pub async fn operators_in_cluster(&self) -> Result<Vec<InstallOperator>> {
        let items = self.cluster.list_all(&operator_api_resource()).await?;
        items
            .into_iter()
            .map(|item| {
                let value = serde_json::to_value(&item).map_err(|e| {
                    Error::serialization_for_kind(KIND_ISTIO_OPERATOR, e.to_string())
                })?;
                InstallOperator::from_value(value)
            })
            .collect()
    }

    /// Find the in-cluster operator whose spec.revision matches `revision`
    pub async fn operator_by_revision(&self, revision: &str) -> Result<InstallOperator> {
        let operators = self.operators_in_cluster().await?;
        operators
            .into_iter()
            .find(|op| op.revision() == revision)
            .ok_or_else(|| Error::RevisionNotFound {
                revision: revision.to_string(),
            })
    }

    // =========================================================================
    // Verdict Reporter
    // =========================================================================

    /// Reduce a completed walk to the final verdict.
    ///
    /// Zero healthy Deployments means no installation, regardless of any
    /// error. Otherwise a walk error becomes the generic failure; the
    /// detailed chain stays on the progress/diagnostic channel only.
    fn report_status(&self, outcome: WalkOutcome) -> Result<()> {
        let counts = outcome.counts;
        self.progress.emit(&format!(
            "Checked {} custom resource definitions",
            counts.crds
        ));
        self.progress
            .emit(&format!("Checked {} Istio Deployments", counts.deployments));

        if counts.deployments == 0 {
            self.progress.emit("! No Istio installation found");
            return Err(Error::NoInstallationFound);
        }
        if let Some(error) = outcome.error {
            debug!(error = %error, "verification failed");
            return Err(Error::InstallationFailed);
        }
        self.progress
            .emit("✔ Istio is installed and verified successfully");
        Ok(())
    }
}
