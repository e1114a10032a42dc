use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading, parsing or rendering a template.
#[derive(Error, Debug)]
pub enum TemplateError {
    /// A tag referenced a name that is neither bound in the context nor
    /// assigned earlier in the same render.
    #[error("undefined variable '{name}'")]
    UndefinedVariable {
        /// The unresolved identifier.
        name: String,
    },

    /// Malformed tag or expression.
    #[error("syntax error on line {line}: {message}")]
    Syntax {
        /// 1-based line of the offending tag.
        line: usize,
        /// Parser message.
        message: String,
    },

    /// An operator was applied to values it does not support.
    #[error("type error: {message}")]
    Type {
        /// What went wrong.
        message: String,
    },

    /// The template file could not be read.
    #[error("failed to read template {}: {source}", path.display())]
    Io {
        /// Path of the template file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

impl TemplateError {
    pub(super) fn syntax(line: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            message: message.into(),
        }
    }

    pub(super) fn type_error(message: impl Into<String>) -> Self {
        Self::Type {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undefined_variable_names_the_variable() {
        let e = TemplateError::UndefinedVariable {
            name: "var".to_string(),
        };
        assert_eq!(e.to_string(), "undefined variable 'var'");
    }

    #[test]
    fn syntax_error_reports_line() {
        let e = TemplateError::syntax(3, "unclosed tag");
        assert_eq!(e.to_string(), "syntax error on line 3: unclosed tag");
    }

    #[test]
    fn io_error_has_source() {
        use std::error::Error as _;
        let e = TemplateError::Io {
            path: PathBuf::from("motd.erb"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(e.to_string().contains("motd.erb"));
        assert!(e.source().is_some());
    }
}
