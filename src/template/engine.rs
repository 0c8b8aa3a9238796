//! Template engine adapter
//!
//! Wraps a minijinja [`Environment`] with the domain filter/test library
//! registered up front. The environment is immutable after construction;
//! every render call gets the same fixed table of pure functions plus its
//! own bindings.

use minijinja::{context, Environment, Value};

use super::filters;
use crate::crd::AlfaControllr;

/// Template engine with the Alfa Controllr filter library
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine {
    /// Create a new engine with all filters and tests registered
    pub fn new() -> Self {
        let mut env = Environment::new();

        env.add_filter("b64decode", filters::b64decode);
        env.add_filter("ipaddr", filters::ipaddr);
        env.add_filter("json_query", filters::json_query);
        env.add_filter("unique_dict", filters::unique_dict);
        env.add_test("is_subset", filters::is_subset);
        env.add_test("is_superset", filters::is_superset);

        Self { env }
    }

    /// Render a controller template against the fixed bindings
    ///
    /// # Errors
    ///
    /// Returns the underlying template error on any syntax or runtime
    /// failure; rendering never panics.
    pub fn render(
        &self,
        template: &str,
        objects: &[serde_yaml::Value],
        controller: &AlfaControllr,
        owner_references: bool,
        managed_by: Option<&str>,
    ) -> Result<String, minijinja::Error> {
        let ctx = context! {
            objects => Value::from_serialize(objects),
            controller => Value::from_serialize(controller),
            ownerReferences => owner_references,
            managedBy => managed_by.unwrap_or(""),
        };
        self.env.render_str(template, ctx)
    }
}
