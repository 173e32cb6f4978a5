//! The fixed helper table available to every template.
//!
//! [`Helpers`] is built once per run and cloned into each compile step, so no
//! template ever sees a helper that another part of the run registered.
//!
//! | Name | Type | Purpose |
//! |------|------|---------|
//! | `nl` | filter | Appends a newline |
//! | `snake_case` | filter | `UserAccount` -> `user_account` |
//! | `camel_case` | filter | `user_account` -> `userAccount` |
//! | `pascal_case` | filter | `user_account` -> `UserAccount` |
//! | `plural` | filter | `User` -> `Users` |
//! | `quote` | filter | Go string literal |
//! | `placeholder` | filter | Bind parameter for the run's dialect (`1` -> `$1`) |
//! | `render_sub(kind, ctx)` | function | Renders a sibling template of the same tree |
//! | `package`, `dialect`, `single_file` | globals | Run settings |

use std::cell::Cell;

use minijinja::{AutoEscape, Environment, Error, ErrorKind, State, UndefinedBehavior, Value};

use crate::name::{PlaceholderStyle, TemplateNaming};
use crate::util;

/// Helper functions and globals installed into every compiled template.
#[derive(Debug, Clone)]
pub struct Helpers {
    package: String,
    dialect: String,
    placeholder: PlaceholderStyle,
    single_file: bool,
}

impl Helpers {
    pub fn new(package: impl Into<String>, naming: TemplateNaming, single_file: bool) -> Self {
        Self {
            package: package.into(),
            dialect: naming.qualifier().to_string(),
            placeholder: naming.placeholder_style(),
            single_file,
        }
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn single_file(&self) -> bool {
        self.single_file
    }

    /// Creates a fresh environment with the run's settings and helpers.
    ///
    /// Undefined values are strict: a template referencing a field its
    /// context lacks fails to render instead of printing nothing.
    pub fn environment(&self) -> Environment<'static> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_keep_trailing_newline(true);
        self.install(&mut env);
        env
    }

    /// Registers the helper table on an existing environment.
    pub fn install(&self, env: &mut Environment<'static>) {
        env.add_filter("nl", |value: Value| -> String { format!("{}\n", value) });
        env.add_filter("snake_case", |value: String| util::snake_case(&value));
        env.add_filter("camel_case", |value: String| util::camel_case(&value));
        env.add_filter("pascal_case", |value: String| util::pascal_case(&value));
        env.add_filter("plural", |value: String| util::plural(&value));
        env.add_filter("quote", |value: String| util::go_quote(&value));

        let style = self.placeholder;
        env.add_filter("placeholder", move |index: usize| style.format(index));

        env.add_function("render_sub", render_sub);

        env.add_global("package", Value::from(self.package.clone()));
        env.add_global("dialect", Value::from(self.dialect.clone()));
        env.add_global("single_file", Value::from(self.single_file));
    }
}

/// Deepest chain of nested `render_sub` calls a render may build.
pub const MAX_SUB_DEPTH: usize = 32;

thread_local! {
    static SUB_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Counts one level of `render_sub` nesting on this thread for as long as
/// it is alive.
struct SubDepth;

impl SubDepth {
    fn enter(name: &str) -> Result<Self, Error> {
        SUB_DEPTH.with(|depth| {
            if depth.get() >= MAX_SUB_DEPTH {
                return Err(Error::new(
                    ErrorKind::InvalidOperation,
                    format!(
                        "render_sub nesting exceeds {} levels at \"{}\"",
                        MAX_SUB_DEPTH, name
                    ),
                ));
            }
            depth.set(depth.get() + 1);
            Ok(SubDepth)
        })
    }
}

impl Drop for SubDepth {
    fn drop(&mut self) {
        SUB_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Renders the sibling template `name` of the calling tree against `ctx`.
///
/// Every call starts a fresh engine render, so the engine's own recursion
/// limit does not see through it; [`MAX_SUB_DEPTH`] bounds the nesting.
fn render_sub(state: &State, name: String, ctx: Value) -> Result<String, Error> {
    let _depth = SubDepth::enter(&name)?;
    let tmpl = state.env().get_template(&name).map_err(|err| {
        Error::new(
            ErrorKind::TemplateNotFound,
            format!("sub-template \"{}\" is not associated", name),
        )
        .with_source(err)
    })?;
    tmpl.render(ctx)
}
