//! Named template cache.
//!
//! [`TemplateSet`] compiles a template the first time its name is executed and
//! reuses the compiled form for the rest of the run:
//!
//! - a compile failure is returned and **not** cached, so a corrected override
//!   can succeed on the next call;
//! - a render failure leaves the cached entry in place, since the template
//!   itself is still valid;
//! - once compiled, later edits to the override file have no effect.
//!
//! The populate-on-miss path takes the write lock and checks again before
//! compiling, so concurrent first use of a name still parses it once.

use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use minijinja::Environment;
use serde::Serialize;
use tracing::debug;

use crate::error::RenderError;
use crate::helpers::Helpers;
use crate::name::{TemplateKind, TemplateNaming};
use crate::source::TemplateSource;

/// Output of a template executed into its own buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedBuffer {
    pub kind: TemplateKind,
    pub name: String,
    pub subname: String,
    pub content: String,
}

/// A set of templates compiled on demand and cached by name.
pub struct TemplateSet {
    source: TemplateSource,
    naming: TemplateNaming,
    helpers: Helpers,
    compiled: RwLock<HashMap<String, Arc<Environment<'static>>>>,
    compiles: AtomicUsize,
}

impl TemplateSet {
    pub fn new(source: TemplateSource, naming: TemplateNaming, helpers: Helpers) -> Self {
        Self {
            source,
            naming,
            helpers,
            compiled: RwLock::new(HashMap::new()),
            compiles: AtomicUsize::new(0),
        }
    }

    pub fn source(&self) -> &TemplateSource {
        &self.source
    }

    pub fn naming(&self) -> &TemplateNaming {
        &self.naming
    }

    pub fn helpers(&self) -> &Helpers {
        &self.helpers
    }

    /// Number of successful compilations performed so far.
    pub fn compile_count(&self) -> usize {
        self.compiles.load(Ordering::Relaxed)
    }

    /// Returns true if `name` has already been compiled.
    pub fn is_compiled(&self, name: &str) -> bool {
        self.compiled
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    fn compiled(&self, name: &str) -> Result<Arc<Environment<'static>>, RenderError> {
        if let Some(env) = self
            .compiled
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return Ok(Arc::clone(env));
        }

        let mut compiled = self.compiled.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(env) = compiled.get(name) {
            return Ok(Arc::clone(env));
        }

        let body = self.source.resolve(name)?;
        let mut env = self.helpers.environment();
        env.add_template_owned(name.to_string(), body)
            .map_err(|e| RenderError::compile(name, e))?;
        self.compiles.fetch_add(1, Ordering::Relaxed);
        debug!(template = name, "compiled template");

        let env = Arc::new(env);
        compiled.insert(name.to_string(), Arc::clone(&env));
        Ok(env)
    }

    /// Executes the template called `name` against `ctx`, writing to `w`.
    ///
    /// # Errors
    ///
    /// Resolution and compile failures, and failures while rendering
    /// (e.g. `ctx` lacks a field the template references).
    pub fn execute<W, S>(&self, name: &str, w: W, ctx: S) -> Result<(), RenderError>
    where
        W: Write,
        S: Serialize,
    {
        let env = self.compiled(name)?;
        let tmpl = env
            .get_template(name)
            .map_err(|e| RenderError::render(name, e))?;
        tmpl.render_captured_to(ctx, w)
            .map_err(|e| RenderError::render(name, e))?;
        Ok(())
    }

    /// Executes the template called `name` and returns the output.
    pub fn execute_to_string<S: Serialize>(&self, name: &str, ctx: S) -> Result<String, RenderError> {
        let mut buf = Vec::new();
        self.execute(name, &mut buf, ctx)?;
        String::from_utf8(buf).map_err(|e| RenderError::Render {
            name: name.to_string(),
            message: e.to_string(),
        })
    }

    /// Executes the template for `kind` into a fresh buffer.
    ///
    /// The template name is built from the run's naming rules.
    pub fn execute_kind<S: Serialize>(
        &self,
        kind: TemplateKind,
        name: &str,
        subname: &str,
        ctx: S,
    ) -> Result<GeneratedBuffer, RenderError> {
        let template_name = self.naming.template_name(kind);
        let content = self.execute_to_string(&template_name, ctx)?;
        Ok(GeneratedBuffer {
            kind,
            name: name.to_string(),
            subname: subname.to_string(),
            content,
        })
    }
}

impl std::fmt::Debug for TemplateSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateSet")
            .field("source", &self.source)
            .field("naming", &self.naming)
            .field("compiles", &self.compile_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::context;
    use std::fs;
    use tempfile::TempDir;

    fn set(source: TemplateSource) -> TemplateSet {
        let naming = TemplateNaming::new("postgres", "go");
        let helpers = Helpers::new("models", naming.clone(), false);
        TemplateSet::new(source, naming, helpers)
    }

    #[test]
    fn test_second_execution_does_not_reparse() {
        let templates = set(TemplateSource::empty(None).with_bundled_entry("hello.tpl", "hi {{ name }}"));

        let a = templates
            .execute_to_string("hello.tpl", context! { name => "a" })
            .unwrap();
        let b = templates
            .execute_to_string("hello.tpl", context! { name => "b" })
            .unwrap();

        assert_eq!(a, "hi a");
        assert_eq!(b, "hi b");
        assert_eq!(templates.compile_count(), 1);
    }

    #[test]
    fn test_broken_override_after_compile_has_no_effect() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("x.tpl"), "good {{ v }}").unwrap();
        let templates = set(TemplateSource::empty(Some(dir.path().to_path_buf())));

        assert_eq!(
            templates.execute_to_string("x.tpl", context! { v => 1 }).unwrap(),
            "good 1"
        );

        fs::write(dir.path().join("x.tpl"), "{% broken").unwrap();
        assert_eq!(
            templates.execute_to_string("x.tpl", context! { v => 2 }).unwrap(),
            "good 2"
        );
        assert_eq!(templates.compile_count(), 1);
    }

    #[test]
    fn test_compile_error_is_not_cached() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("x.tpl"), "{% if %}").unwrap();
        let templates = set(TemplateSource::empty(Some(dir.path().to_path_buf())));

        let err = templates
            .execute_to_string("x.tpl", context! {})
            .unwrap_err();
        assert!(matches!(err, RenderError::Compile { ref name, .. } if name == "x.tpl"));
        assert!(!templates.is_compiled("x.tpl"));

        fs::write(dir.path().join("x.tpl"), "fixed").unwrap();
        assert_eq!(templates.execute_to_string("x.tpl", context! {}).unwrap(), "fixed");
        assert_eq!(templates.compile_count(), 1);
    }

    #[test]
    fn test_render_error_keeps_entry() {
        let templates = set(TemplateSource::empty(None).with_bundled_entry("t.tpl", "{{ field }}"));

        let err = templates.execute_to_string("t.tpl", context! {}).unwrap_err();
        assert!(matches!(err, RenderError::Render { .. }));
        assert!(templates.is_compiled("t.tpl"));

        assert_eq!(
            templates.execute_to_string("t.tpl", context! { field => "ok" }).unwrap(),
            "ok"
        );
        assert_eq!(templates.compile_count(), 1);
    }

    #[test]
    fn test_missing_template_is_resolve_error() {
        let templates = set(TemplateSource::empty(None));
        let err = templates.execute_to_string("nope.tpl", context! {}).unwrap_err();
        assert!(matches!(err, RenderError::Resolve(_)));
        assert_eq!(templates.compile_count(), 0);
    }

    #[test]
    fn test_execute_kind_builds_name_and_buffer() {
        let templates = set(
            TemplateSource::empty(None).with_bundled_entry("xo_db.go.tpl", "package {{ package }}"),
        );
        let generated = templates
            .execute_kind(TemplateKind::Boilerplate, "xo_db", "", context! {})
            .unwrap();

        assert_eq!(generated.kind, TemplateKind::Boilerplate);
        assert_eq!(generated.name, "xo_db");
        assert_eq!(generated.content, "package models");
    }

    #[test]
    fn test_concurrent_first_use_compiles_once() {
        let templates = Arc::new(set(
            TemplateSource::empty(None).with_bundled_entry("t.tpl", "{{ n }}"),
        ));

        let handles: Vec<_> = (0..8)
            .map(|n| {
                let templates = Arc::clone(&templates);
                std::thread::spawn(move || templates.execute_to_string("t.tpl", context! { n => n }))
            })
            .collect();

        for handle in handles {
            handle.join().unwrap().unwrap();
        }
        assert_eq!(templates.compile_count(), 1);
    }
}
