//! Controller record loading
//!
//! Controller records come from exactly one of two places, selected by
//! configuration: a static YAML file read fresh every tick, or a cluster-wide
//! listing of AlfaControllr custom objects. Records are never cached between
//! ticks.

use std::path::PathBuf;

use serde_yaml::Value;
use tracing::{debug, error, info, warn};

use crate::collect::ObjectSource;
use crate::crd::AlfaControllr;
use crate::{Error, Result, API_GROUP, API_KIND, API_VERSION};

/// apiVersion of list documents accepted in file mode
const LIST_API_VERSION: &str = "v1beta3";

/// Where controller records come from
#[derive(Clone, Debug)]
pub enum ControllerSource {
    /// Parse records from a static file, read fresh each tick
    File(PathBuf),
    /// List records from the cluster API
    Api,
}

impl ControllerSource {
    /// Select the source: a path means file mode, absence means API mode
    pub fn from_path(path: Option<PathBuf>) -> Self {
        match path {
            Some(path) => Self::File(path),
            None => Self::Api,
        }
    }

    /// Load the current controller records
    ///
    /// File mode propagates read and parse failures (aborting the tick);
    /// API mode tolerates listing failures by yielding an empty set.
    pub async fn load(&self, source: &dyn ObjectSource) -> Result<Vec<AlfaControllr>> {
        match self {
            Self::File(path) => {
                let content = tokio::fs::read_to_string(path).await.map_err(|e| {
                    Error::controller_file(format!("unable to read {}: {}", path.display(), e))
                })?;
                let controllers = parse_controller_file(&content)?;
                info!(
                    count = controllers.len(),
                    path = %path.display(),
                    "loaded controller records from file"
                );
                for controller in &controllers {
                    debug!(controller = ?controller.metadata.name, "loaded record");
                }
                Ok(controllers)
            }
            Self::Api => {
                let controllers = match source.list_controllers().await {
                    Ok(controllers) => controllers,
                    Err(e) => {
                        error!(error = %e, "unable to list controller records");
                        Vec::new()
                    }
                };
                info!(
                    count = controllers.len(),
                    "loaded controller records from the cluster API"
                );
                Ok(controllers)
            }
        }
    }
}

/// Parse one YAML document into controller records
///
/// Accepts either a single AlfaControllr document or a List document whose
/// items are filtered to that kind. Any other document shape yields an empty
/// set with a warning; malformed YAML is an error.
pub fn parse_controller_file(content: &str) -> Result<Vec<AlfaControllr>> {
    let document: Value = serde_yaml::from_str(content)
        .map_err(|e| Error::controller_file(format!("invalid YAML: {}", e)))?;

    let api_version = document.get("apiVersion").and_then(Value::as_str);
    let kind = document.get("kind").and_then(Value::as_str);
    let controller_api_version = format!("{}/{}", API_GROUP, API_VERSION);

    if api_version == Some(LIST_API_VERSION) && kind == Some("List") {
        let items = document
            .get("items")
            .and_then(Value::as_sequence)
            .cloned()
            .unwrap_or_default();
        return items
            .into_iter()
            .filter(|item| item.get("kind").and_then(Value::as_str) == Some(API_KIND))
            .map(|item| {
                serde_yaml::from_value(item)
                    .map_err(|e| Error::controller_file(format!("invalid list item: {}", e)))
            })
            .collect();
    }

    if api_version == Some(controller_api_version.as_str()) && kind == Some(API_KIND) {
        let controller = serde_yaml::from_value(document)
            .map_err(|e| Error::controller_file(format!("invalid record: {}", e)))?;
        return Ok(vec![controller]);
    }

    warn!(
        api_version = ?api_version,
        kind = ?kind,
        "controller file document is neither a record nor a list, ignoring"
    );
    Ok(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SINGLE: &str = r#"
apiVersion: controllers.illallangi.enterprises/v1beta
kind: AlfaControllr
metadata:
  name: solo
spec:
  core:
    namespace: true
  template: "kind: ConfigMap"
"#;

    const LIST: &str = r#"
apiVersion: v1beta3
kind: List
items:
  - apiVersion: controllers.illallangi.enterprises/v1beta
    kind: AlfaControllr
    metadata:
      name: first
    spec:
      template: "kind: ConfigMap"
  - apiVersion: v1
    kind: ConfigMap
    metadata:
      name: not-a-controller
  - apiVersion: controllers.illallangi.enterprises/v1beta
    kind: AlfaControllr
    metadata:
      name: second
    spec:
      template: "kind: Secret"
"#;

    #[test]
    fn parses_a_single_record() {
        let controllers = parse_controller_file(SINGLE).unwrap();
        assert_eq!(controllers.len(), 1);
        assert_eq!(controllers[0].metadata.name.as_deref(), Some("solo"));
        assert!(controllers[0].spec.core.namespace);
    }

    #[test]
    fn filters_list_items_to_matching_kind() {
        let controllers = parse_controller_file(LIST).unwrap();
        let names: Vec<_> = controllers
            .iter()
            .map(|c| c.metadata.name.as_deref().unwrap())
            .collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn unrecognized_documents_yield_an_empty_set() {
        let controllers =
            parse_controller_file("apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: x\n")
                .unwrap();
        assert!(controllers.is_empty());
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let err = parse_controller_file("kind: [broken\n").unwrap_err();
        assert!(err.is_tick_scoped());
    }

    #[test]
    fn list_item_with_bad_spec_is_an_error() {
        let content = r#"
apiVersion: v1beta3
kind: List
items:
  - apiVersion: controllers.illallangi.enterprises/v1beta
    kind: AlfaControllr
    metadata:
      name: broken
    spec:
      template: 7
"#;
        // template must be a string
        assert!(parse_controller_file(content).is_err());
    }

    #[test]
    fn source_selection_follows_the_path() {
        assert!(matches!(
            ControllerSource::from_path(Some(PathBuf::from("/etc/controllers.yaml"))),
            ControllerSource::File(_)
        ));
        assert!(matches!(
            ControllerSource::from_path(None),
            ControllerSource::Api
        ));
    }
}
