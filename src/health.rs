//! Per-kind health predicates
//!
//! Pure functions over already-fetched live objects: no network access, no
//! mutation. The walker fetches, these decide.

use k8s_openapi::api::apps::v1::{Deployment, DeploymentCondition};
use k8s_openapi::api::batch::v1::{Job, JobCondition};

use crate::Error;

/// Condition type reporting replica creation failure on a Deployment
const CONDITION_REPLICA_FAILURE: &str = "ReplicaFailure";
/// Condition type marking a Job as finished successfully
const CONDITION_COMPLETE: &str = "Complete";
/// Condition type marking a Job as failed
const CONDITION_FAILED: &str = "Failed";
/// The "True" status value for conditions
const STATUS_TRUE: &str = "True";

/// Trait for condition-like types (type and status fields)
trait HasConditionFields {
    fn type_field(&self) -> &str;
    fn status_field(&self) -> &str;
}

impl HasConditionFields for DeploymentCondition {
    fn type_field(&self) -> &str {
        &self.type_
    }
    fn status_field(&self) -> &str {
        &self.status
    }
}

impl HasConditionFields for JobCondition {
    fn type_field(&self) -> &str {
        &self.type_
    }
    fn status_field(&self) -> &str {
        &self.status
    }
}

/// Check whether a condition of the given type has status "True"
fn has_condition<T: HasConditionFields>(conditions: Option<&Vec<T>>, condition_type: &str) -> bool {
    conditions
        .map(|conds| {
            conds
                .iter()
                .any(|c| c.type_field() == condition_type && c.status_field() == STATUS_TRUE)
        })
        .unwrap_or(false)
}

/// Check that a live Deployment is ready.
///
/// Fails with [`Error::NotReady`] when the reported ready replica count is
/// below the desired count, or when the cluster reports replica creation
/// failure. A desired count of zero always passes. Deployments with
/// `spec.replicas` unset default to 1, matching the server-side default.
pub fn deployment_ready(deployment: &Deployment) -> Result<(), Error> {
    let name = deployment
        .metadata
        .name
        .as_deref()
        .unwrap_or("unknown")
        .to_string();

    let conditions = deployment
        .status
        .as_ref()
        .and_then(|s| s.conditions.as_ref());
    if has_condition(conditions, CONDITION_REPLICA_FAILURE) {
        return Err(Error::not_ready(name, "replica failure condition reported"));
    }

    let desired = deployment.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1);
    let ready = deployment
        .status
        .as_ref()
        .and_then(|s| s.ready_replicas)
        .unwrap_or(0);
    if ready < desired {
        return Err(Error::not_ready(
            name,
            format!("ready replicas {} below desired {}", ready, desired),
        ));
    }

    Ok(())
}

/// Check that a run-to-completion Job finished.
///
/// Fails with [`Error::NotComplete`] when the Job reports failure or has not
/// yet reported completion; succeeds only on an explicit Complete condition.
pub fn job_completed(job: &Job) -> Result<(), Error> {
    let name = job.metadata.name.as_deref().unwrap_or("unknown").to_string();
    let conditions = job.status.as_ref().and_then(|s| s.conditions.as_ref());

    if has_condition(conditions, CONDITION_FAILED) {
        return Err(Error::not_complete(name, "job reported failure"));
    }
    if !has_condition(conditions, CONDITION_COMPLETE) {
        return Err(Error::not_complete(name, "job has not reported completion"));
    }
    Ok(())
}
