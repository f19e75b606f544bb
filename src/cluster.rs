//! Cluster read access
//!
//! The engine never mutates the cluster; it needs exactly two reads: fetch
//! one object by collection/namespace/name, and list a collection across all
//! namespaces. [`ClusterReader`] abstracts those behind a trait so walks are
//! testable without an API server; [`KubeCluster`] is the kube-rs backed
//! implementation.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use kube::api::{Api, DynamicObject, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::discovery::ApiResource;
use kube::{Client, Config};
#[cfg(test)]
use mockall::automock;
use serde::de::DeserializeOwned;

use crate::Error;

/// Default connection timeout for the kube client
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default read timeout for the kube client; a timed-out read surfaces as an
/// ordinary per-object fetch error
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Trait for one-shot cluster reads.
///
/// Errors are reported in the transport's own terms (`kube::Error`); callers
/// attach object context.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterReader: Send + Sync {
    /// Fetch one object from a collection within a namespace
    async fn get_namespaced(
        &self,
        resource: &ApiResource,
        namespace: &str,
        name: &str,
    ) -> Result<DynamicObject, kube::Error>;

    /// Fetch one object from a collection at cluster scope
    async fn get_clusterwide(
        &self,
        resource: &ApiResource,
        name: &str,
    ) -> Result<DynamicObject, kube::Error>;

    /// List a collection across all namespaces
    async fn list_all(&self, resource: &ApiResource) -> Result<Vec<DynamicObject>, kube::Error>;
}

/// kube-rs backed [`ClusterReader`]
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    /// Wrap an existing client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Create a reader from an optional kubeconfig path with default timeouts.
    ///
    /// Without a path, configuration is inferred (in-cluster or ambient
    /// kubeconfig), matching kubectl behavior.
    pub async fn connect(kubeconfig: Option<&Path>) -> Result<Self, Error> {
        let mut config = match kubeconfig {
            Some(path) => {
                let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                    Error::internal("connect", format!("failed to read kubeconfig: {}", e))
                })?;
                Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                    .await
                    .map_err(|e| {
                        Error::internal("connect", format!("failed to load kubeconfig: {}", e))
                    })?
            }
            None => Config::infer().await.map_err(|e| {
                Error::internal("connect", format!("failed to infer kube config: {}", e))
            })?,
        };
        config.connect_timeout = Some(DEFAULT_CONNECT_TIMEOUT);
        config.read_timeout = Some(DEFAULT_READ_TIMEOUT);

        let client = Client::try_from(config)
            .map_err(|e| Error::internal("connect", format!("failed to create client: {}", e)))?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl ClusterReader for KubeCluster {
    async fn get_namespaced(
        &self,
        resource: &ApiResource,
        namespace: &str,
        name: &str,
    ) -> Result<DynamicObject, kube::Error> {
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.client.clone(), namespace, resource);
        api.get(name).await
    }

    async fn get_clusterwide(
        &self,
        resource: &ApiResource,
        name: &str,
    ) -> Result<DynamicObject, kube::Error> {
        let api: Api<DynamicObject> = Api::all_with(self.client.clone(), resource);
        api.get(name).await
    }

    async fn list_all(&self, resource: &ApiResource) -> Result<Vec<DynamicObject>, kube::Error> {
        let api: Api<DynamicObject> = Api::all_with(self.client.clone(), resource);
        let list = api.list(&ListParams::default()).await?;
        Ok(list.items)
    }
}

/// Decode a fetched dynamic object into its strongly-typed form
pub fn decode_object<T: DeserializeOwned>(object: &DynamicObject, kind: &str) -> Result<T, Error> {
    let value = serde_json::to_value(object)
        .map_err(|e| Error::serialization_for_kind(kind, e.to_string()))?;
    serde_json::from_value(value).map_err(|e| {
        Error::serialization_for_kind(kind, format!("failed to decode live object: {}", e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::apps::v1::Deployment;
    use kube::core::ObjectMeta;
    use serde_json::json;

    fn dynamic(kind: &str, api_version: &str, name: &str, body: serde_json::Value) -> DynamicObject {
        DynamicObject {
            types: Some(kube::core::TypeMeta {
                api_version: api_version.to_string(),
                kind: kind.to_string(),
            }),
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("istio-system".to_string()),
                ..Default::default()
            },
            data: body,
        }
    }

    #[test]
    fn dynamic_objects_decode_into_typed_workloads() {
        let obj = dynamic(
            "Deployment",
            "apps/v1",
            "istiod",
            json!({
                "spec": {"replicas": 3},
                "status": {"readyReplicas": 3}
            }),
        );

        let deployment: Deployment = decode_object(&obj, "Deployment").unwrap();
        assert_eq!(deployment.metadata.name.as_deref(), Some("istiod"));
        assert_eq!(deployment.spec.unwrap().replicas, Some(3));
        assert_eq!(deployment.status.unwrap().ready_replicas, Some(3));
    }

    #[test]
    fn decode_failure_names_the_kind() {
        let obj = dynamic(
            "Deployment",
            "apps/v1",
            "istiod",
            json!({"spec": {"replicas": "not-a-number"}}),
        );
        let err = decode_object::<Deployment>(&obj, "Deployment").unwrap_err();
        match err {
            Error::Serialization { kind, .. } => assert_eq!(kind.as_deref(), Some("Deployment")),
            other => panic!("expected Serialization, got {:?}", other),
        }
    }
}
