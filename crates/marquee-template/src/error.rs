//! Template error types

/// Errors raised while parsing or rendering a template
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("template {template}:{line}: {message}")]
    Parse {
        template: String,
        line: usize,
        message: String,
    },

    #[error("template {template}:{line}: undefined variable {var}")]
    UndefinedVariable {
        template: String,
        line: usize,
        var: String,
    },

    #[error("template {template}:{line}: error calling {func}: {message}")]
    Function {
        template: String,
        line: usize,
        func: String,
        message: String,
    },

    #[error("template {template}:{line}: {message}")]
    Exec {
        template: String,
        line: usize,
        message: String,
    },
}

impl TemplateError {
    pub(crate) fn parse(template: &str, line: usize, message: impl Into<String>) -> Self {
        TemplateError::Parse {
            template: template.to_string(),
            line,
            message: message.into(),
        }
    }

    pub(crate) fn exec(template: &str, line: usize, message: impl Into<String>) -> Self {
        TemplateError::Exec {
            template: template.to_string(),
            line,
            message: message.into(),
        }
    }

    /// Line the error was reported at (1-based)
    pub fn line(&self) -> usize {
        match self {
            TemplateError::Parse { line, .. }
            | TemplateError::UndefinedVariable { line, .. }
            | TemplateError::Function { line, .. }
            | TemplateError::Exec { line, .. } => *line,
        }
    }
}

/// Result type alias for template operations
pub type Result<T> = std::result::Result<T, TemplateError>;
