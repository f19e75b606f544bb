//! IstioOperator decoding and normalization
//!
//! The IstioOperator resource is the declarative description of a control
//! plane install. The verifier never treats its presence in the cluster as
//! meaningful; it decodes the declared spec and expands it into the
//! resources the cluster is expected to contain.

use kube::discovery::ApiResource;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Error;

/// API group of the IstioOperator resource
pub const OPERATOR_GROUP: &str = "install.istio.io";
/// API version of the IstioOperator resource
pub const OPERATOR_VERSION: &str = "v1alpha1";
/// Collection name of the IstioOperator resource
pub const OPERATOR_COLLECTION: &str = "istiooperators";

/// The `ApiResource` addressing IstioOperator objects in the cluster
pub fn operator_api_resource() -> ApiResource {
    ApiResource {
        group: OPERATOR_GROUP.to_string(),
        version: OPERATOR_VERSION.to_string(),
        api_version: format!("{}/{}", OPERATOR_GROUP, OPERATOR_VERSION),
        kind: crate::manifest::KIND_ISTIO_OPERATOR.to_string(),
        plural: OPERATOR_COLLECTION.to_string(),
    }
}

/// Minimal object metadata; everything else in metadata is volatile
/// server-side bookkeeping the verifier has no use for.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct OperatorMeta {
    /// Resource name
    #[serde(default)]
    pub name: Option<String>,
    /// Resource namespace
    #[serde(default)]
    pub namespace: Option<String>,
}

/// The declared installation spec
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InstallOperatorSpec {
    /// Revision identifier distinguishing coexisting control planes
    #[serde(default)]
    pub revision: Option<String>,
    /// Override for where install charts/profiles are read from
    #[serde(default)]
    pub install_package_path: Option<String>,
    /// Named configuration profile
    #[serde(default)]
    pub profile: Option<String>,
    /// Image hub
    #[serde(default)]
    pub hub: Option<String>,
    /// Image tag
    #[serde(default)]
    pub tag: Option<Value>,
    /// Component toggles and overlays, kept opaque; only the renderer
    /// interprets them
    #[serde(default)]
    pub components: Option<Value>,
    /// Profile value overlays, kept opaque
    #[serde(default)]
    pub values: Option<Value>,
}

/// A decoded IstioOperator resource
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct InstallOperator {
    /// Object metadata (name, namespace)
    #[serde(default)]
    pub metadata: OperatorMeta,
    /// The declared installation spec
    #[serde(default)]
    pub spec: InstallOperatorSpec,
}

impl InstallOperator {
    /// Decode an operator from a raw object payload.
    ///
    /// The payload is normalized first: volatile metadata breaks decoding of
    /// objects that round-tripped through the API server.
    pub fn from_value(mut value: Value) -> Result<Self, Error> {
        normalize(&mut value);
        serde_json::from_value(value).map_err(|e| {
            Error::serialization_for_kind(
                crate::manifest::KIND_ISTIO_OPERATOR,
                format!("failed to decode IstioOperator: {}", e),
            )
        })
    }

    /// The object name, or "unknown" when the manifest omitted it
    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or("unknown")
    }

    /// The declared revision; an absent field matches the empty revision
    pub fn revision(&self) -> &str {
        self.spec.revision.as_deref().unwrap_or("")
    }
}

/// Strip volatile server-set metadata before decoding.
///
/// creationTimestamp and managedFields are set by the API server, not by the
/// installation author, and managedFields in particular embeds timestamps
/// that are not representable in the declared spec shape.
pub fn normalize(value: &mut Value) {
    if let Some(meta) = value
        .pointer_mut("/metadata")
        .and_then(Value::as_object_mut)
    {
        meta.remove("creationTimestamp");
        meta.remove("managedFields");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cluster_operator() -> Value {
        json!({
            "apiVersion": "install.istio.io/v1alpha1",
            "kind": "IstioOperator",
            "metadata": {
                "name": "installed-state",
                "namespace": "istio-system",
                "creationTimestamp": "2026-01-12T09:30:00Z",
                "managedFields": [{"manager": "istioctl", "time": "2026-01-12T09:30:00Z"}]
            },
            "spec": {
                "revision": "canary",
                "profile": "default",
                "components": {"pilot": {"enabled": true}}
            }
        })
    }

    // ==========================================================================
    // Story: Operators stored in the cluster decode after normalization
    // ==========================================================================

    #[test]
    fn decodes_a_cluster_stored_operator() {
        let op = InstallOperator::from_value(cluster_operator()).unwrap();
        assert_eq!(op.name(), "installed-state");
        assert_eq!(op.revision(), "canary");
        assert_eq!(op.spec.profile.as_deref(), Some("default"));
    }

    #[test]
    fn normalize_strips_volatile_metadata_only() {
        let mut value = cluster_operator();
        normalize(&mut value);

        let meta = value["metadata"].as_object().unwrap();
        assert!(!meta.contains_key("creationTimestamp"));
        assert!(!meta.contains_key("managedFields"));
        assert_eq!(meta["name"], "installed-state");
    }

    #[test]
    fn missing_revision_matches_the_empty_revision() {
        let op = InstallOperator::from_value(json!({
            "kind": "IstioOperator",
            "metadata": {"name": "default-install"},
            "spec": {"profile": "minimal"}
        }))
        .unwrap();
        assert_eq!(op.revision(), "");
    }

    #[test]
    fn unknown_spec_fields_are_tolerated() {
        let op = InstallOperator::from_value(json!({
            "metadata": {"name": "x"},
            "spec": {"revision": "r1", "meshConfig": {"accessLogFile": "/dev/stdout"}}
        }))
        .unwrap();
        assert_eq!(op.revision(), "r1");
    }

    #[test]
    fn operator_api_resource_addresses_istiooperators() {
        let ar = operator_api_resource();
        assert_eq!(ar.group, "install.istio.io");
        assert_eq!(ar.plural, "istiooperators");
        assert_eq!(ar.api_version, "install.istio.io/v1alpha1");
    }
}
