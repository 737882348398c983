//! Prompt library.
//!
//! Templates are looked up as `<dir>/<name>.md` in an optional override
//! directory first, then in the defaults compiled into the binary.

use std::path::{Path, PathBuf};
use tracing::debug;
use zeroloop_core::error::PromptError;
use zeroloop_core::prompt::{PromptLoader, PromptTemplate};

const BUILTIN: &[(&str, &str)] = &[
    ("agent.system", include_str!("../prompts/agent.system.md")),
    ("agent.tools", include_str!("../prompts/agent.tools.md")),
    ("fw.user_message", include_str!("../prompts/fw.user_message.md")),
    ("fw.intervention", include_str!("../prompts/fw.intervention.md")),
    ("fw.error", include_str!("../prompts/fw.error.md")),
    ("fw.msg_repeat", include_str!("../prompts/fw.msg_repeat.md")),
    ("fw.msg_misformat", include_str!("../prompts/fw.msg_misformat.md")),
    ("fw.tool_response", include_str!("../prompts/fw.tool_response.md")),
    ("fw.msg_cleanup", include_str!("../prompts/fw.msg_cleanup.md")),
    ("msg.memory_cleanup", include_str!("../prompts/msg.memory_cleanup.md")),
];

/// Loads templates from a directory, falling back to built-in defaults.
#[derive(Debug, Clone, Default)]
pub struct FilePromptLoader {
    dir: Option<PathBuf>,
}

impl FilePromptLoader {
    /// Only the compiled-in templates.
    pub fn builtin() -> Self {
        Self { dir: None }
    }

    /// Files in `dir` override the built-in templates of the same name.
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }
}

impl PromptLoader for FilePromptLoader {
    fn load(&self, name: &str) -> Result<PromptTemplate, PromptError> {
        if let Some(dir) = &self.dir {
            let path = dir.join(format!("{name}.md"));
            if path.is_file() {
                let text = std::fs::read_to_string(&path).map_err(|e| PromptError::ReadFailed {
                    name: name.to_string(),
                    reason: format!("{}: {e}", path.display()),
                })?;
                debug!(prompt = name, path = %path.display(), "Loaded prompt override");
                return Ok(PromptTemplate::new(name, text.trim_end()));
            }
        }

        BUILTIN
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, text)| PromptTemplate::new(name, text.trim_end()))
            .ok_or_else(|| PromptError::NotFound {
                name: name.to_string(),
                searched: match &self.dir {
                    Some(dir) => format!("{} and built-in templates", dir.display()),
                    None => "built-in templates".into(),
                },
            })
    }
}

/// Every template the agent loop uses, loaded up front.
#[derive(Debug, Clone)]
pub struct Prompts {
    pub system: PromptTemplate,
    pub tools: PromptTemplate,
    pub user_message: PromptTemplate,
    pub intervention: PromptTemplate,
    pub error: PromptTemplate,
    pub msg_repeat: PromptTemplate,
    pub msg_misformat: PromptTemplate,
    pub tool_response: PromptTemplate,
    pub msg_cleanup: PromptTemplate,
    pub memory_cleanup: PromptTemplate,
}

impl Prompts {
    pub fn load(loader: &dyn PromptLoader) -> Result<Self, PromptError> {
        Ok(Self {
            system: loader.load("agent.system")?,
            tools: loader.load("agent.tools")?,
            user_message: loader.load("fw.user_message")?,
            intervention: loader.load("fw.intervention")?,
            error: loader.load("fw.error")?,
            msg_repeat: loader.load("fw.msg_repeat")?,
            msg_misformat: loader.load("fw.msg_misformat")?,
            tool_response: loader.load("fw.tool_response")?,
            msg_cleanup: loader.load("fw.msg_cleanup")?,
            memory_cleanup: loader.load("msg.memory_cleanup")?,
        })
    }

    /// The compiled-in templates. They are always complete.
    pub fn builtin() -> Self {
        let get = |name: &str| {
            BUILTIN
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, text)| PromptTemplate::new(name, text.trim_end()))
                .unwrap_or_else(|| PromptTemplate::new(name, ""))
        };
        Self {
            system: get("agent.system"),
            tools: get("agent.tools"),
            user_message: get("fw.user_message"),
            intervention: get("fw.intervention"),
            error: get("fw.error"),
            msg_repeat: get("fw.msg_repeat"),
            msg_misformat: get("fw.msg_misformat"),
            tool_response: get("fw.tool_response"),
            msg_cleanup: get("fw.msg_cleanup"),
            memory_cleanup: get("msg.memory_cleanup"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_templates_load() {
        let prompts = Prompts::load(&FilePromptLoader::builtin()).unwrap();
        assert!(prompts.user_message.text().contains("{{message}}"));
        assert!(prompts.intervention.text().contains("{{user_message}}"));
        assert!(prompts.error.text().contains("{{error}}"));
        assert!(prompts.tool_response.text().contains("{{tool_response}}"));
    }

    #[test]
    fn directory_overrides_builtin() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("fw.error.md"), "Oops: {{error}}\n").unwrap();

        let loader = FilePromptLoader::with_dir(dir.path());
        let error = loader.load("fw.error").unwrap();
        assert_eq!(error.render(&[("error", "boom")]), "Oops: boom");

        // Everything else still comes from the built-in set.
        let prompts = Prompts::load(&loader).unwrap();
        assert_eq!(prompts.msg_repeat, Prompts::builtin().msg_repeat);
    }

    #[test]
    fn unknown_template_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = FilePromptLoader::with_dir(dir.path()).load("fw.nope").unwrap_err();
        assert!(matches!(err, PromptError::NotFound { ref name, .. } if name == "fw.nope"));
        assert!(err.to_string().contains("built-in templates"));
    }
}
