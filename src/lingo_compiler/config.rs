// Compiler configuration
// Loaded from a TOML file; every field has a default so partial files work

use crate::lingo_compiler::error::CompilerError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// `on` handlers must close with `end <name>`; a missing or mismatched
    /// closing clause becomes an error instead of a warning.
    pub require_end_clause: bool,

    /// Warn when a name is read that was never declared, assigned or bound.
    pub warn_undefined: bool,

    /// Warn when a built-in is called with an argument count it does not take.
    pub check_builtin_arity: bool,

    /// Stop storing diagnostics after this many (the count is still kept).
    pub max_diagnostics: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            require_end_clause: false,
            warn_undefined: true,
            check_builtin_arity: true,
            max_diagnostics: 100,
        }
    }
}

impl CompilerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, CompilerError> {
        toml::from_str(text).map_err(|e| CompilerError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CompilerError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            CompilerError::IOError(format!("cannot read '{}': {}", path.display(), e))
        })?;
        log::debug!("Loading compiler config from {}", path.display());
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String, CompilerError> {
        toml::to_string(self).map_err(|e| CompilerError::Config(e.to_string()))
    }
}
