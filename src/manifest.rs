//! Discovered objects and kind classification
//!
//! A [`DiscoveredObject`] is the generic record of one resource extracted
//! from manifest data: kind, name, namespace, and the raw payload. Objects
//! are built per-walk from either user-supplied manifest files or rendered
//! manifest blobs, and discarded after the walk.

use std::path::Path;

use kube::discovery::ApiResource;
use serde_json::Value;

use crate::{yaml, Error, DEFAULT_NAMESPACE};

/// Kind string for Deployments
pub const KIND_DEPLOYMENT: &str = "Deployment";
/// Kind string for Jobs
pub const KIND_JOB: &str = "Job";
/// Kind string for the Istio installation operator resource
pub const KIND_ISTIO_OPERATOR: &str = "IstioOperator";
/// Kind string for CustomResourceDefinitions
pub const KIND_CRD: &str = "CustomResourceDefinition";

/// A generic record of one resource extracted from manifest data
#[derive(Debug, Clone)]
pub struct DiscoveredObject {
    /// Resource kind (e.g. "Deployment")
    pub kind: String,
    /// Resource name
    pub name: String,
    /// Resource namespace, defaulted when the manifest omits it
    pub namespace: String,
    /// Full apiVersion (e.g. "apps/v1")
    pub api_version: String,
    /// The raw object payload
    pub value: Value,
    /// Diagnostic label naming where this object came from
    pub source: String,
}

impl DiscoveredObject {
    /// Build a discovered object from a parsed manifest document.
    ///
    /// Fails when the document has no kind or no metadata.name; a missing
    /// namespace defaults to [`DEFAULT_NAMESPACE`].
    pub fn from_value(value: Value, source: impl Into<String>) -> Result<Self, Error> {
        let source = source.into();
        let kind = value
            .get("kind")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                Error::serialization(format!("object from {} is missing kind", source))
            })?
            .to_string();
        let name = value
            .pointer("/metadata/name")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                Error::serialization_for_kind(
                    kind.clone(),
                    format!("object from {} is missing metadata.name", source),
                )
            })?
            .to_string();
        let namespace = value
            .pointer("/metadata/namespace")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_NAMESPACE)
            .to_string();
        let api_version = value
            .get("apiVersion")
            .and_then(Value::as_str)
            .unwrap_or("v1")
            .to_string();

        Ok(Self {
            kind,
            name,
            namespace,
            api_version,
            value,
            source,
        })
    }

    /// Parse one text blob (possibly multi-document YAML) into discovered
    /// objects, all tagged with the same diagnostic source label.
    pub fn from_blob(blob: &str, source: &str) -> Result<Vec<Self>, Error> {
        yaml::parse_documents(blob)?
            .into_iter()
            .map(|doc| Self::from_value(doc, source))
            .collect()
    }

    /// Read manifest files into a flattened, ordered object sequence.
    ///
    /// Files are processed in argument order and documents in file order, so
    /// the walk visits objects exactly as the manifests list them.
    pub fn from_files(paths: &[impl AsRef<Path>]) -> Result<Vec<Self>, Error> {
        let mut objects = Vec::new();
        for path in paths {
            let path = path.as_ref();
            let content = std::fs::read_to_string(path)?;
            objects.extend(Self::from_blob(&content, &path.display().to_string())?);
        }
        Ok(objects)
    }

    /// The `ApiResource` addressing this object's collection
    pub fn api_resource(&self) -> ApiResource {
        api_resource_for(&self.api_version, &self.kind)
    }
}

// =============================================================================
// Kind Classification
// =============================================================================

/// Kinds whose collection name is not lowercase-kind + "s".
///
/// Rebuilt from the target API surface: Istio config kinds plus the core
/// kinds the control-plane manifests actually contain. Anything absent falls
/// through to the naive rule.
const KIND_COLLECTIONS: &[(&str, &str)] = &[
    // Core API
    ("Endpoints", "endpoints"),
    ("ComponentStatus", "componentstatuses"),
    ("Ingress", "ingresses"),
    ("IngressClass", "ingressclasses"),
    ("NetworkPolicy", "networkpolicies"),
    ("PodSecurityPolicy", "podsecuritypolicies"),
    ("PriorityClass", "priorityclasses"),
    ("RuntimeClass", "runtimeclasses"),
    ("StorageClass", "storageclasses"),
    // Istio config kinds
    ("AuthorizationPolicy", "authorizationpolicies"),
    ("ServiceEntry", "serviceentries"),
    ("Telemetry", "telemetries"),
];

/// Map a resource kind to the plural collection name used to address it.
///
/// Best-effort: kinds not in the table get lowercase + "s". Never errors;
/// a wrong guess surfaces later as an ordinary fetch failure.
pub fn collection_for_kind(kind: &str) -> String {
    for (known, collection) in KIND_COLLECTIONS {
        if *known == kind {
            return (*collection).to_string();
        }
    }
    format!("{}s", kind.to_lowercase())
}

/// Parse apiVersion into (group, version)
pub fn parse_api_version(api_version: &str) -> (String, String) {
    match api_version.split_once('/') {
        Some((group, version)) => (group.to_string(), version.to_string()),
        None => (String::new(), api_version.to_string()),
    }
}

/// Build an `ApiResource` from a manifest's apiVersion and kind.
///
/// The version is used exactly as declared; collection name comes from
/// [`collection_for_kind`].
pub fn api_resource_for(api_version: &str, kind: &str) -> ApiResource {
    let (group, version) = parse_api_version(api_version);
    ApiResource {
        group,
        version,
        kind: kind.to_string(),
        api_version: api_version.to_string(),
        plural: collection_for_kind(kind),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==========================================================================
    // Story: Kind classification addresses the right collection
    // ==========================================================================

    #[test]
    fn known_irregular_kinds_use_the_table() {
        assert_eq!(collection_for_kind("Ingress"), "ingresses");
        assert_eq!(collection_for_kind("NetworkPolicy"), "networkpolicies");
        assert_eq!(collection_for_kind("Endpoints"), "endpoints");
        assert_eq!(
            collection_for_kind("AuthorizationPolicy"),
            "authorizationpolicies"
        );
        assert_eq!(collection_for_kind("ServiceEntry"), "serviceentries");
    }

    #[test]
    fn unknown_kinds_fall_back_to_lowercase_plus_s() {
        assert_eq!(collection_for_kind("Deployment"), "deployments");
        assert_eq!(collection_for_kind("Gateway"), "gateways");
        assert_eq!(collection_for_kind("IstioOperator"), "istiooperators");
        assert_eq!(
            collection_for_kind("CustomResourceDefinition"),
            "customresourcedefinitions"
        );
    }

    #[test]
    fn api_resource_carries_group_version_and_collection() {
        let ar = api_resource_for("apps/v1", "Deployment");
        assert_eq!(ar.group, "apps");
        assert_eq!(ar.version, "v1");
        assert_eq!(ar.plural, "deployments");

        let ar = api_resource_for("v1", "Service");
        assert_eq!(ar.group, "");
        assert_eq!(ar.api_version, "v1");
    }

    // ==========================================================================
    // Story: Discovered objects come out of manifests in order
    // ==========================================================================

    #[test]
    fn object_fields_are_extracted_with_namespace_default() {
        let doc = crate::yaml::parse_document(
            "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: istiod\n",
        )
        .unwrap();
        let obj = DiscoveredObject::from_value(doc, "test.yaml").unwrap();
        assert_eq!(obj.kind, "Deployment");
        assert_eq!(obj.name, "istiod");
        assert_eq!(obj.namespace, crate::DEFAULT_NAMESPACE);
        assert_eq!(obj.source, "test.yaml");
    }

    #[test]
    fn declared_namespace_wins_over_default() {
        let doc = crate::yaml::parse_document(
            "apiVersion: v1\nkind: Service\nmetadata:\n  name: istiod\n  namespace: istio-system\n",
        )
        .unwrap();
        let obj = DiscoveredObject::from_value(doc, "svc.yaml").unwrap();
        assert_eq!(obj.namespace, "istio-system");
    }

    #[test]
    fn missing_name_is_rejected() {
        let doc = crate::yaml::parse_document("kind: Deployment\nmetadata: {}\n").unwrap();
        let err = DiscoveredObject::from_value(doc, "bad.yaml").unwrap_err();
        assert!(err.to_string().contains("metadata.name"));
    }

    #[test]
    fn blob_with_multiple_documents_preserves_order() {
        let blob = "\
apiVersion: v1
kind: Namespace
metadata:
  name: istio-system
---
apiVersion: apps/v1
kind: Deployment
metadata:
  name: istiod
  namespace: istio-system
";
        let objects = DiscoveredObject::from_blob(blob, "Pilot:0").unwrap();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].kind, "Namespace");
        assert_eq!(objects[1].kind, "Deployment");
        assert!(objects.iter().all(|o| o.source == "Pilot:0"));
    }

    #[test]
    fn files_flatten_into_one_ordered_sequence() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.yaml");
        let second = dir.path().join("b.yaml");
        writeln!(
            std::fs::File::create(&first).unwrap(),
            "apiVersion: v1\nkind: ServiceAccount\nmetadata:\n  name: one"
        )
        .unwrap();
        writeln!(
            std::fs::File::create(&second).unwrap(),
            "apiVersion: v1\nkind: ServiceAccount\nmetadata:\n  name: two"
        )
        .unwrap();

        let objects = DiscoveredObject::from_files(&[&first, &second]).unwrap();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].name, "one");
        assert_eq!(objects[1].name, "two");
        assert!(objects[0].source.ends_with("a.yaml"));
    }
}
