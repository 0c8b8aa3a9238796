//! Template rendering for Alfa Controllr
//!
//! Controller templates are standard Jinja syntax rendered with minijinja
//! against four fixed bindings:
//!
//! - `objects` - the collected object set, in append order
//! - `controller` - the full controller record (metadata and spec)
//! - `ownerReferences` - whether templates should emit owner references
//! - `managedBy` - manager identifier, empty when unset
//!
//! The engine injects a domain filter/test library:
//! - Filters: `b64decode`, `ipaddr(action)`, `json_query(expr)`,
//!   `unique_dict`
//! - Tests: `is_subset`, `is_superset`

mod engine;
mod filters;

pub use engine::TemplateEngine;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{AlfaControllr, AlfaControllrSpec, CoreSelector};
    use kube::api::ObjectMeta;
    use serde_yaml::Value;

    fn controller(template: &str) -> AlfaControllr {
        AlfaControllr {
            metadata: ObjectMeta {
                name: Some("demo".to_string()),
                ..Default::default()
            },
            spec: AlfaControllrSpec {
                core: CoreSelector {
                    namespace: false,
                    secret: false,
                    service: true,
                },
                crds: vec![],
                template: template.to_string(),
            },
        }
    }

    fn service(namespace: &str, name: &str) -> Value {
        serde_yaml::from_str(&format!(
            "kind: Service\nmetadata:\n  name: {}\n  namespace: {}\n",
            name, namespace
        ))
        .unwrap()
    }

    #[test]
    fn renders_one_document_per_object() {
        let engine = TemplateEngine::new();
        let controller = controller(
            "{% for obj in objects %}---\nname: {{ obj.metadata.name }}\n{% endfor %}",
        );
        let objects = vec![service("default", "web"), service("default", "api")];

        let rendered = engine
            .render(&controller.spec.template, &objects, &controller, true, None)
            .unwrap();

        assert!(rendered.contains("name: web"));
        assert!(rendered.contains("name: api"));
        assert_eq!(rendered.matches("---").count(), 2);
    }

    #[test]
    fn controller_binding_exposes_metadata_and_spec() {
        let engine = TemplateEngine::new();
        let controller =
            controller("{{ controller.metadata.name }}/{{ controller.spec.core.service }}");

        let rendered = engine
            .render(&controller.spec.template, &[], &controller, true, None)
            .unwrap();
        assert_eq!(rendered, "demo/true");
    }

    #[test]
    fn owner_references_and_managed_by_bindings() {
        let engine = TemplateEngine::new();
        let controller = controller(
            "{% if ownerReferences %}owned{% endif %} managed-by={{ managedBy }}",
        );

        let rendered = engine
            .render(
                &controller.spec.template,
                &[],
                &controller,
                true,
                Some("alfa"),
            )
            .unwrap();
        assert_eq!(rendered, "owned managed-by=alfa");

        let rendered = engine
            .render(&controller.spec.template, &[], &controller, false, None)
            .unwrap();
        assert_eq!(rendered, " managed-by=");
    }

    #[test]
    fn syntax_errors_are_returned_not_panicked() {
        let engine = TemplateEngine::new();
        let controller = controller("{% for x in %}");

        let result = engine.render(&controller.spec.template, &[], &controller, true, None);
        assert!(result.is_err());
    }

    #[test]
    fn runtime_errors_are_returned_not_panicked() {
        let engine = TemplateEngine::new();
        let controller = controller("{{ 'not-an-ip' | ipaddr('revdns') }}");

        let result = engine.render(&controller.spec.template, &[], &controller, true, None);
        assert!(result.is_err());
    }

    #[test]
    fn subset_test_is_usable_from_templates() {
        let engine = TemplateEngine::new();
        let controller = controller(
            "{% for obj in objects %}{% if obj.metadata is is_subset({'namespace': 'default', 'name': 'web'}) %}{{ obj.metadata.name }}{% endif %}{% endfor %}",
        );
        let objects = vec![service("default", "web"), service("other", "api")];

        let rendered = engine
            .render(&controller.spec.template, &objects, &controller, true, None)
            .unwrap();
        assert_eq!(rendered, "web");
    }
}
