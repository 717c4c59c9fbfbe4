// Lingo Compiler Module
// Single-pass translation of Lingo scripts into stack bytecode

pub mod builtins;
pub mod config;
pub mod diagnostics;
pub mod disasm;
pub mod entities;
pub mod error;
pub mod lexer;
pub mod opcodes;
pub mod patch;
pub mod script;
pub mod symbols;
pub mod translator;

use indexmap::{IndexMap, IndexSet};

pub use config::CompilerConfig;
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
pub use error::CompilerError;
pub use lexer::{Lexer, Token, TokenKind};
pub use opcodes::{NavigationSelector, Opcode};
pub use script::{Mark, ScriptBuffer, Word};
pub use symbols::{DefinitionKind, FactoryDescriptor, HandlerDescriptor};

use symbols::fold_name;

/// Everything one unit produced: top-level code plus the definitions and
/// declarations it registered.
#[derive(Debug, Clone)]
pub struct CompiledScript {
    pub code: ScriptBuffer,
    pub handlers: IndexMap<String, HandlerDescriptor>,
    pub factories: IndexMap<String, FactoryDescriptor>,
    pub globals: IndexSet<String>,
    pub properties: IndexSet<String>,
    pub instances: IndexSet<String>,
}

impl CompiledScript {
    /// Look up a handler or macro by name, case-insensitively
    pub fn handler(&self, name: &str) -> Option<&HandlerDescriptor> {
        self.handlers.get(&fold_name(name))
    }

    pub fn factory(&self, name: &str) -> Option<&FactoryDescriptor> {
        self.factories.get(&fold_name(name))
    }

    pub fn method(&self, factory: &str, name: &str) -> Option<&HandlerDescriptor> {
        self.factory(factory)?.method(name)
    }

    /// Handlers and macros first, then every factory's methods
    pub fn all_handlers(&self) -> impl Iterator<Item = &HandlerDescriptor> {
        self.handlers.values().chain(
            self.factories
                .values()
                .flat_map(|factory| factory.methods.values()),
        )
    }
}

/// Result of compiling a unit that survived to the end: user errors are in
/// `diagnostics`, never in an `Err`.
#[derive(Debug)]
pub struct CompileOutput {
    pub script: CompiledScript,
    pub diagnostics: Diagnostics,
}

impl CompileOutput {
    /// True if any SyntaxError was recorded. The script is still complete
    /// but the host should not run it.
    pub fn had_error(&self) -> bool {
        self.diagnostics.had_error()
    }
}

/// Main compiler structure
#[derive(Debug, Clone, Default)]
pub struct LingoCompiler {
    config: CompilerConfig,
}

impl LingoCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CompilerConfig) -> Self {
        LingoCompiler { config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compile Lingo source text
    pub fn compile(&self, source: &str) -> Result<CompileOutput, CompilerError> {
        let lexer = Lexer::new(source);
        self.compile_tokens(lexer)
    }

    /// Compile from any token source
    pub fn compile_tokens<'a, I>(&self, tokens: I) -> Result<CompileOutput, CompilerError>
    where
        I: IntoIterator<Item = Token>,
        I::IntoIter: 'a,
    {
        let translator =
            translator::Translator::new(Box::new(tokens.into_iter()), self.config.clone());
        let (script, diagnostics) = translator.translate()?;
        log::info!(
            "compiled unit: {} error(s), {} warning(s)",
            diagnostics.errors().count(),
            diagnostics.warnings().count()
        );
        Ok(CompileOutput {
            script,
            diagnostics,
        })
    }
}
