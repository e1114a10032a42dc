//! ERB-style text templates.
//!
//! Supported tags:
//!
//! | Tag              | Effect                                           |
//! |------------------|--------------------------------------------------|
//! | `<%= expr %>`    | insert the value of `expr`                       |
//! | `<% x = expr %>` | assign (or evaluate and discard) without output  |
//! | `<%# text %>`    | comment                                          |
//! | `<%%`            | a literal `<%`                                   |
//! | `-%>`            | close a tag and drop the newline that follows it |
//!
//! Every render starts from a fresh copy of the caller's [`Bindings`], so an
//! assignment in one render is never visible to another.
mod error;
mod expr;
mod parse;

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

pub use error::TemplateError;

use crate::operations::FileSystemOps;
use parse::Segment;

/// Name → value table a template is rendered against.
pub type Bindings = Map<String, Value>;

/// Render template text against `context`.
///
/// # Errors
///
/// Returns [`TemplateError::UndefinedVariable`] for an unbound name,
/// [`TemplateError::Syntax`] for malformed tags and [`TemplateError::Type`]
/// for unsupported operations.
///
/// # Examples
///
/// ```
/// use marionette::template::{Bindings, render};
/// use serde_json::json;
///
/// assert_eq!(render("1 plus 2 is <%= 1 + 2 %>", &Bindings::new()).unwrap(), "1 plus 2 is 3");
///
/// let mut context = Bindings::new();
/// context.insert("var".to_string(), json!(4));
/// let out = render("<%= var %>\n<% var = 5 %>\n<%= var %>\n", &context).unwrap();
/// assert_eq!(out, "4\n\n5\n");
/// ```
pub fn render(content: &str, context: &Bindings) -> Result<String, TemplateError> {
    let mut scope = context.clone();
    let mut out = String::with_capacity(content.len());
    for segment in parse::segments(content)? {
        match segment {
            Segment::Text(text) => out.push_str(&text),
            Segment::Output { code, line } => {
                let value = expr::run(code, line, &mut scope)?;
                out.push_str(&display(&value));
            }
            Segment::Code { code, line } => {
                expr::run(code, line, &mut scope)?;
            }
        }
    }
    Ok(out)
}

/// Text inserted for a value: strings verbatim, `nil` as nothing, anything
/// else in its JSON form.
#[must_use]
pub fn display(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s),
        Value::Null => Cow::Borrowed(""),
        other => Cow::Owned(other.to_string()),
    }
}

/// A template file paired with the bindings it renders against.
#[derive(Debug, Clone)]
pub struct Template {
    path: PathBuf,
    context: Bindings,
}

impl Template {
    /// Create a template for the file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, context: Bindings) -> Self {
        Self {
            path: path.into(),
            context,
        }
    }

    /// Path of the template file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file through `fs` and render it.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Io`] if the file cannot be read, or any
    /// error from [`render`].
    pub fn render(&self, fs: &dyn FileSystemOps) -> Result<String, TemplateError> {
        let content = fs
            .read_to_string(&self.path)
            .map_err(|source| TemplateError::Io {
                path: self.path.clone(),
                source,
            })?;
        render(&content, &self.context)
    }
}
