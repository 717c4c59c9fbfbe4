// Compiler Error Handling
//
// Only fatal conditions live here. Problems in the user's script are recorded
// as diagnostics and never abort a compile.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum CompilerError {
    // Translator bugs: double patch, patch of an ordinary word, a slot left
    // unresolved when its construct closed
    StructuralInvariant(String),

    // Configuration errors
    Config(String),

    // IO errors
    IOError(String),
}

impl fmt::Display for CompilerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CompilerError::StructuralInvariant(msg) => {
                write!(f, "COMPILER BUG: structural invariant violated: {}", msg)
            }
            CompilerError::Config(msg) => {
                write!(f, "Configuration error: {}", msg)
            }
            CompilerError::IOError(msg) => {
                write!(f, "IO error: {}", msg)
            }
        }
    }
}

impl std::error::Error for CompilerError {}

impl From<std::io::Error> for CompilerError {
    fn from(err: std::io::Error) -> Self {
        CompilerError::IOError(err.to_string())
    }
}
