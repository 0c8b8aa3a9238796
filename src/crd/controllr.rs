//! AlfaControllr Custom Resource Definition
//!
//! An AlfaControllr record declares which cluster objects to watch (core
//! object classes plus arbitrary custom resources) and carries the template
//! rendered whenever the watched set changes.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Specification for an AlfaControllr
///
/// The controller record is reloaded fresh every tick and never cached; the
/// spec participates in the change fingerprint, so editing a record forces a
/// reapply even when the watched objects did not move.
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "controllers.illallangi.enterprises",
    version = "v1beta",
    kind = "AlfaControllr",
    plural = "alfacontrollrs",
    namespaced = false
)]
pub struct AlfaControllrSpec {
    /// Which core object classes to collect
    #[serde(default)]
    pub core: CoreSelector,

    /// Custom resources to collect, as `plural.group` references
    #[serde(default)]
    pub crds: Vec<String>,

    /// Template source rendered against the collected objects
    pub template: String,
}

/// Core object classes a controller can watch
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct CoreSelector {
    /// Collect the full detail record of every namespace
    #[serde(default)]
    pub namespace: bool,

    /// Collect every secret across all namespaces
    #[serde(default)]
    pub secret: bool,

    /// Collect every service across all namespaces
    #[serde(default)]
    pub service: bool,
}

impl AlfaControllrSpec {
    /// Validate the controller specification
    pub fn validate(&self) -> Result<(), Error> {
        if self.template.trim().is_empty() {
            return Err(Error::validation("controller template must not be empty"));
        }
        for crd in &self.crds {
            CrdRef::parse(crd)?;
        }
        Ok(())
    }
}

/// A `plural.group` reference to a custom resource collection
///
/// The reference carries no version; watched custom resources are always
/// listed at [`crate::CRD_OBJECT_VERSION`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CrdRef {
    /// Plural resource name, e.g. `certificates`
    pub plural: String,
    /// API group, e.g. `cert-manager.io`
    pub group: String,
}

impl CrdRef {
    /// Parse a `plural.group` reference, splitting at the first dot
    pub fn parse(reference: &str) -> Result<Self, Error> {
        let (plural, group) = reference.split_once('.').ok_or_else(|| {
            Error::validation(format!(
                "CRD reference '{}' is not in plural.group form",
                reference
            ))
        })?;
        if plural.is_empty() || group.is_empty() {
            return Err(Error::validation(format!(
                "CRD reference '{}' has an empty plural or group",
                reference
            )));
        }
        Ok(Self {
            plural: plural.to_string(),
            group: group.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_controller_document() {
        let yaml = r#"
apiVersion: controllers.illallangi.enterprises/v1beta
kind: AlfaControllr
metadata:
  name: service-watcher
spec:
  core:
    service: true
  crds:
    - certificates.cert-manager.io
  template: |
    kind: ConfigMap
"#;
        let controller: AlfaControllr = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(controller.metadata.name.as_deref(), Some("service-watcher"));
        assert!(controller.spec.core.service);
        assert!(!controller.spec.core.namespace);
        assert!(!controller.spec.core.secret);
        assert_eq!(controller.spec.crds, vec!["certificates.cert-manager.io"]);
        assert!(controller.spec.validate().is_ok());
    }

    #[test]
    fn core_selector_defaults_to_all_false() {
        let yaml = r#"
apiVersion: controllers.illallangi.enterprises/v1beta
kind: AlfaControllr
metadata:
  name: minimal
spec:
  template: "kind: ConfigMap"
"#;
        let controller: AlfaControllr = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(controller.spec.core, CoreSelector::default());
        assert!(controller.spec.crds.is_empty());
    }

    #[test]
    fn empty_template_is_rejected() {
        let spec = AlfaControllrSpec {
            core: CoreSelector::default(),
            crds: vec![],
            template: "   \n".to_string(),
        };
        let err = spec.validate().unwrap_err();
        assert!(err.to_string().contains("template"));
    }

    #[test]
    fn crd_ref_splits_at_the_first_dot() {
        let parsed = CrdRef::parse("certificates.cert-manager.io").unwrap();
        assert_eq!(parsed.plural, "certificates");
        assert_eq!(parsed.group, "cert-manager.io");
    }

    #[test]
    fn malformed_crd_refs_are_rejected() {
        assert!(CrdRef::parse("certificates").is_err());
        assert!(CrdRef::parse("").is_err());
        assert!(CrdRef::parse(".cert-manager.io").is_err());
        assert!(CrdRef::parse("certificates.").is_err());
    }

    #[test]
    fn invalid_crd_ref_fails_spec_validation() {
        let spec = AlfaControllrSpec {
            core: CoreSelector::default(),
            crds: vec!["nodot".to_string()],
            template: "kind: ConfigMap".to_string(),
        };
        assert!(spec.validate().is_err());
    }
}
