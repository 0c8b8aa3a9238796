//! Render-and-apply pipeline
//!
//! Splits rendered template output into individual YAML documents,
//! re-serializes each through the canonical encoder, and feeds them one by
//! one to a [`ManifestApplier`]. There is no multi-document transaction:
//! documents already applied are never rolled back, and an apply failure on
//! one document never blocks the next.

use async_trait::async_trait;
use kube::api::{Api, DynamicObject, GroupVersionKind, Patch, PatchParams};
use kube::discovery::ApiResource;
use kube::Client;
use serde::Deserialize;
use serde_yaml::Value;
use tracing::{debug, error};

use crate::canonical::to_canonical_string;
use crate::{Error, Result, FIELD_MANAGER};

/// Declarative apply of one canonical manifest document
///
/// Implemented by [`ServerSideApplier`] in production, [`PrintApplier`] in
/// diagnostic mode, and recording fakes in tests.
#[async_trait]
pub trait ManifestApplier: Send + Sync {
    /// Reconcile the target toward the supplied document
    async fn apply(&self, document: &str) -> Result<()>;
}

/// Split rendered output into its YAML documents, dropping empty ones
///
/// # Errors
///
/// Returns [`Error::Serialization`] if any document fails to parse; nothing
/// is considered applied in that case.
pub fn split_documents(rendered: &str) -> Result<Vec<Value>> {
    let mut documents = Vec::new();
    for doc in serde_yaml::Deserializer::from_str(rendered) {
        let value = Value::deserialize(doc)
            .map_err(|e| Error::serialization(format!("unable to split rendered output: {}", e)))?;
        if !matches!(value, Value::Null) {
            documents.push(value);
        }
    }
    Ok(documents)
}

/// Split, canonicalize, and apply every document of one render
///
/// Returns the number of documents handed to the applier. A split error
/// aborts before anything is applied; a canonicalization error aborts the
/// remaining documents; an apply error is logged and the next document is
/// still attempted.
pub async fn split_and_apply(
    rendered: &str,
    applier: &dyn ManifestApplier,
    controller: &str,
) -> Result<usize> {
    let documents = split_documents(rendered)?;

    let mut applied = 0;
    for document in &documents {
        let body = to_canonical_string(document)?;
        if let Err(e) = applier.apply(&body).await {
            error!(controller = %controller, error = %e, "unable to apply document");
        }
        applied += 1;
    }
    Ok(applied)
}

/// [`ManifestApplier`] using Kubernetes server-side apply
#[derive(Clone)]
pub struct ServerSideApplier {
    client: Client,
}

impl ServerSideApplier {
    /// Create an applier over the given client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ManifestApplier for ServerSideApplier {
    async fn apply(&self, document: &str) -> Result<()> {
        let obj: serde_json::Value = serde_yaml::from_str(document)
            .map_err(|e| Error::apply(format!("invalid document: {}", e)))?;

        let kind = obj
            .get("kind")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::apply("document has no kind"))?;
        let api_version = obj
            .get("apiVersion")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::apply("document has no apiVersion"))?;
        let name = obj
            .pointer("/metadata/name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::apply("document has no metadata.name"))?;
        let namespace = obj.pointer("/metadata/namespace").and_then(|v| v.as_str());

        let (group, version) = match api_version.split_once('/') {
            Some((group, version)) => (group.to_string(), version.to_string()),
            None => (String::new(), api_version.to_string()),
        };
        let gvk = GroupVersionKind {
            group,
            version,
            kind: kind.to_string(),
        };
        let resource = ApiResource::from_gvk(&gvk);

        let api: Api<DynamicObject> = match namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, &resource),
            None => Api::all_with(self.client.clone(), &resource),
        };

        let params = PatchParams::apply(FIELD_MANAGER).force();
        api.patch(name, &params, &Patch::Apply(&obj))
            .await
            .map_err(|e| Error::apply(format!("failed to apply {}/{}: {}", kind, name, e)))?;

        debug!(kind = kind, name = name, "applied document");
        Ok(())
    }
}

/// [`ManifestApplier`] that prints documents instead of applying them
///
/// Used in diagnostic mode; the reconcile loop still commits fingerprints as
/// if the documents had been applied.
#[derive(Clone, Copy, Default)]
pub struct PrintApplier;

#[async_trait]
impl ManifestApplier for PrintApplier {
    async fn apply(&self, document: &str) -> Result<()> {
        println!("---");
        println!("{}", document);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records applied documents; fails on document indices in `fail_on`.
    #[derive(Default)]
    struct RecordingApplier {
        applied: Mutex<Vec<String>>,
        fail_on: Vec<usize>,
    }

    #[async_trait]
    impl ManifestApplier for RecordingApplier {
        async fn apply(&self, document: &str) -> Result<()> {
            let mut applied = self.applied.lock().unwrap();
            let index = applied.len();
            applied.push(document.to_string());
            if self.fail_on.contains(&index) {
                return Err(Error::apply("injected failure"));
            }
            Ok(())
        }
    }

    const THREE_DOCS: &str = "\
---
kind: ConfigMap
metadata:
  name: one
---
kind: ConfigMap
metadata:
  name: two
---
kind: ConfigMap
metadata:
  name: three
";

    #[test]
    fn splits_multi_document_output() {
        let documents = split_documents(THREE_DOCS).unwrap();
        assert_eq!(documents.len(), 3);
    }

    #[test]
    fn empty_documents_are_dropped() {
        let documents = split_documents("---\n---\nkind: ConfigMap\nmetadata:\n  name: x\n---\n")
            .unwrap();
        assert_eq!(documents.len(), 1);
    }

    #[test]
    fn split_error_reports_nothing_applied() {
        let err = split_documents("kind: [unclosed\n").unwrap_err();
        assert!(err.to_string().contains("split"));
    }

    #[tokio::test]
    async fn applies_every_document() {
        let applier = RecordingApplier::default();
        let applied = split_and_apply(THREE_DOCS, &applier, "test").await.unwrap();
        assert_eq!(applied, 3);
        assert_eq!(applier.applied.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn apply_failure_does_not_block_later_documents() {
        let applier = RecordingApplier {
            fail_on: vec![0],
            ..Default::default()
        };
        let applied = split_and_apply(THREE_DOCS, &applier, "test").await.unwrap();
        assert_eq!(applied, 3);
        assert_eq!(applier.applied.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn split_failure_aborts_before_any_apply() {
        let applier = RecordingApplier::default();
        let result = split_and_apply("kind: {broken\n", &applier, "test").await;
        assert!(result.is_err());
        assert!(applier.applied.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn documents_are_reserialized_canonically() {
        let applier = RecordingApplier::default();
        let rendered = "kind: ConfigMap\nmetadata:\n  name: x\ndata:\n  serial: '007'\n";
        split_and_apply(rendered, &applier, "test").await.unwrap();

        let applied = applier.applied.lock().unwrap();
        assert!(applied[0].contains("serial: '007'"));

        // The applied body must re-parse to the same document
        let reparsed: Value = serde_yaml::from_str(&applied[0]).unwrap();
        let original: Value = serde_yaml::from_str(rendered).unwrap();
        assert_eq!(reparsed, original);
    }

    #[tokio::test]
    async fn print_applier_always_succeeds() {
        let applied = split_and_apply(THREE_DOCS, &PrintApplier, "test").await.unwrap();
        assert_eq!(applied, 3);
    }
}
