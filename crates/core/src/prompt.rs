//! Prompt templates.
//!
//! Templates are plain text with `{{name}}` placeholders. Loading is a
//! construction-time concern: a missing template is a fatal configuration
//! error, while rendering a loaded template never fails (unknown
//! placeholders are left as-is).

use crate::error::PromptError;

/// A loaded prompt template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    name: String,
    text: String,
}

impl PromptTemplate {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The raw template text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Substitute `{{key}}` placeholders.
    pub fn render(&self, vars: &[(&str, &str)]) -> String {
        let mut out = self.text.clone();
        for (key, value) in vars {
            out = out.replace(&format!("{{{{{key}}}}}"), value);
        }
        out
    }
}

/// Source of prompt templates, addressed by identifier (e.g. `fw.error`).
pub trait PromptLoader: Send + Sync {
    fn load(&self, name: &str) -> std::result::Result<PromptTemplate, PromptError>;
}
