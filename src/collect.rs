//! Object collection
//!
//! Builds the per-controller object set from a pre-fetched global snapshot
//! of namespaces, secrets, and services, plus per-namespace custom resource
//! listings. The [`ObjectSource`] trait abstracts the Kubernetes client so
//! the collector (and everything downstream) can be exercised against
//! in-memory fakes.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, Secret, Service};
use kube::api::{Api, DynamicObject, ListParams};
use kube::discovery::ApiResource;
use kube::Client;
use serde_yaml::Value;
use tracing::error;

use crate::crd::{AlfaControllr, CrdRef};
use crate::{Error, Result, CRD_OBJECT_VERSION};

/// Namespace/name pair identifying one namespaced object
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectRef {
    /// Namespace the object lives in
    pub namespace: String,
    /// Object name
    pub name: String,
}

/// Global cluster snapshot fetched once per tick
///
/// Holds references only; the collector reads the full detail record of each
/// selected object when building a controller's set.
#[derive(Clone, Debug, Default)]
pub struct ClusterSnapshot {
    /// All namespace names
    pub namespaces: Vec<String>,
    /// All secrets across all namespaces
    pub secrets: Vec<ObjectRef>,
    /// All services across all namespaces
    pub services: Vec<ObjectRef>,
}

/// Read access to the cluster objects a controller can watch
///
/// Implemented by [`KubeObjectSource`] in production and by in-memory fakes
/// in tests.
#[async_trait]
pub trait ObjectSource: Send + Sync {
    /// List all namespace names
    async fn list_namespaces(&self) -> Result<Vec<String>>;

    /// List all secrets across all namespaces
    async fn list_secrets(&self) -> Result<Vec<ObjectRef>>;

    /// List all services across all namespaces
    async fn list_services(&self) -> Result<Vec<ObjectRef>>;

    /// Read the full detail record of one namespace
    async fn read_namespace(&self, name: &str) -> Result<Value>;

    /// Read the full detail record of one secret
    async fn read_secret(&self, namespace: &str, name: &str) -> Result<Value>;

    /// Read the full detail record of one service
    async fn read_service(&self, namespace: &str, name: &str) -> Result<Value>;

    /// List custom resources of one collection in one namespace
    async fn list_custom_objects(
        &self,
        group: &str,
        version: &str,
        namespace: &str,
        plural: &str,
    ) -> Result<Vec<Value>>;

    /// List all AlfaControllr records cluster-wide
    async fn list_controllers(&self) -> Result<Vec<AlfaControllr>>;
}

/// Fetch the global snapshot for one tick
///
/// # Errors
///
/// Any listing failure is returned as [`Error::Snapshot`], which aborts the
/// whole tick with the hash table untouched.
pub async fn fetch_snapshot(source: &dyn ObjectSource) -> Result<ClusterSnapshot> {
    let namespaces = source
        .list_namespaces()
        .await
        .map_err(|e| Error::snapshot("namespaces", e))?;
    let secrets = source
        .list_secrets()
        .await
        .map_err(|e| Error::snapshot("secrets", e))?;
    let services = source
        .list_services()
        .await
        .map_err(|e| Error::snapshot("services", e))?;
    Ok(ClusterSnapshot {
        namespaces,
        secrets,
        services,
    })
}

/// Build the object set for one controller
///
/// Append order is declaration order (namespaces, secrets, services), then
/// CRD-list order, then namespace order. A failed custom resource listing
/// skips only that (CRD, namespace) pair, with a logged diagnostic; core
/// object reads propagate their error.
pub async fn collect_objects(
    source: &dyn ObjectSource,
    snapshot: &ClusterSnapshot,
    controller: &AlfaControllr,
) -> Result<Vec<Value>> {
    let controller_name = controller.metadata.name.as_deref().unwrap_or_default();
    let mut objects = Vec::new();

    if controller.spec.core.namespace {
        for name in &snapshot.namespaces {
            objects.push(source.read_namespace(name).await?);
        }
    }

    if controller.spec.core.secret {
        for secret in &snapshot.secrets {
            objects.push(source.read_secret(&secret.namespace, &secret.name).await?);
        }
    }

    if controller.spec.core.service {
        for service in &snapshot.services {
            objects.push(
                source
                    .read_service(&service.namespace, &service.name)
                    .await?,
            );
        }
    }

    for reference in &controller.spec.crds {
        let crd = CrdRef::parse(reference)?;
        for namespace in &snapshot.namespaces {
            match source
                .list_custom_objects(&crd.group, CRD_OBJECT_VERSION, namespace, &crd.plural)
                .await
            {
                Ok(items) => objects.extend(items),
                Err(e) => {
                    error!(
                        controller = %controller_name,
                        crd = %reference,
                        namespace = %namespace,
                        error = %e,
                        "unable to list custom resources, skipping this namespace"
                    );
                }
            }
        }
    }

    Ok(objects)
}

/// [`ObjectSource`] backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeObjectSource {
    client: Client,
}

impl KubeObjectSource {
    /// Create a source over the given client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn to_value<T: serde::Serialize>(obj: &T) -> Result<Value> {
        serde_yaml::to_value(obj).map_err(|e| Error::serialization(e.to_string()))
    }
}

#[async_trait]
impl ObjectSource for KubeObjectSource {
    async fn list_namespaces(&self) -> Result<Vec<String>> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let list = api.list(&ListParams::default()).await?;
        Ok(list
            .items
            .into_iter()
            .filter_map(|ns| ns.metadata.name)
            .collect())
    }

    async fn list_secrets(&self) -> Result<Vec<ObjectRef>> {
        let api: Api<Secret> = Api::all(self.client.clone());
        let list = api.list(&ListParams::default()).await?;
        Ok(list
            .items
            .into_iter()
            .filter_map(|s| {
                Some(ObjectRef {
                    namespace: s.metadata.namespace?,
                    name: s.metadata.name?,
                })
            })
            .collect())
    }

    async fn list_services(&self) -> Result<Vec<ObjectRef>> {
        let api: Api<Service> = Api::all(self.client.clone());
        let list = api.list(&ListParams::default()).await?;
        Ok(list
            .items
            .into_iter()
            .filter_map(|s| {
                Some(ObjectRef {
                    namespace: s.metadata.namespace?,
                    name: s.metadata.name?,
                })
            })
            .collect())
    }

    async fn read_namespace(&self, name: &str) -> Result<Value> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        Self::to_value(&api.get(name).await?)
    }

    async fn read_secret(&self, namespace: &str, name: &str) -> Result<Value> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        Self::to_value(&api.get(name).await?)
    }

    async fn read_service(&self, namespace: &str, name: &str) -> Result<Value> {
        let api: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        Self::to_value(&api.get(name).await?)
    }

    async fn list_custom_objects(
        &self,
        group: &str,
        version: &str,
        namespace: &str,
        plural: &str,
    ) -> Result<Vec<Value>> {
        // The reference carries no kind; the plural stands in for it, which
        // is enough for list calls (the kind only matters when creating).
        let resource = ApiResource {
            group: group.to_string(),
            version: version.to_string(),
            api_version: format!("{}/{}", group, version),
            kind: plural.to_string(),
            plural: plural.to_string(),
        };
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.client.clone(), namespace, &resource);
        let list = api.list(&ListParams::default()).await?;
        list.items.iter().map(Self::to_value).collect()
    }

    async fn list_controllers(&self) -> Result<Vec<AlfaControllr>> {
        let api: Api<AlfaControllr> = Api::all(self.client.clone());
        let list = api.list(&ListParams::default()).await?;
        Ok(list.items)
    }
}
