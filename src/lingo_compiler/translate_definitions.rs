// Handler, macro, factory and method definitions
//
// A definition drives the scope state machine: `None` on entry, then
// `CollectingArgs` while the parameter list is read, then `InBody` once it
// is closed. The body is emitted into the definition's own buffer, which
// becomes part of the registered descriptor.

use crate::lingo_compiler::diagnostics::DiagnosticKind;
use crate::lingo_compiler::lexer::TokenKind;
use crate::lingo_compiler::opcodes::Opcode;
use crate::lingo_compiler::symbols::{names_match, DefinitionKind, DefinitionState};

use super::{Block, Translate, TranslateError, Translator};

/// How a definition was closed
enum Closing {
    /// `end name` (or bare `end`, which carries no name)
    End(Option<String>, usize, usize),
    /// Next definition or end of input
    Implicit(usize, usize),
}

impl Translator<'_> {
    pub(super) fn definition(&mut self) -> Translate<()> {
        let keyword = self.advance().kind;
        if self.symbols.state() != DefinitionState::None {
            return self.syntax_error(format!("{} inside a definition", keyword));
        }

        let kind = match keyword {
            TokenKind::On => DefinitionKind::Handler,
            TokenKind::Macro => DefinitionKind::Macro,
            TokenKind::Method => DefinitionKind::Method,
            _ => return self.factory_declaration(),
        };
        self.handler_definition(kind)
    }

    /// `factory Name`: methods that follow belong to it
    fn factory_declaration(&mut self) -> Translate<()> {
        let (line, column) = self.position();
        let name = self.identifier("a factory name")?;
        if !self.symbols.open_factory(&name)? {
            self.diagnostics.warning(
                DiagnosticKind::Redefinition,
                format!("factory '{}' is defined more than once", name),
                line,
                column,
            );
        }
        Ok(())
    }

    fn handler_definition(&mut self, requested: DefinitionKind) -> Translate<()> {
        let (line, column) = self.position();
        let mut header_ok = true;

        let mut kind = requested;
        if kind == DefinitionKind::Method && self.symbols.current_factory().is_none() {
            self.diagnostics
                .syntax_error("'method' outside of a factory", line, column);
            header_ok = false;
            kind = DefinitionKind::Handler;
        }

        // A bad header is reported once; the body is still translated so
        // that recovery resumes after the definition, not inside it.
        let name = match self.identifier("a handler name") {
            Ok(name) => name,
            Err(TranslateError::Syntax) => {
                header_ok = false;
                "<invalid>".to_string()
            }
            Err(fatal) => return Err(fatal),
        };

        self.symbols.begin_definition(kind, &name)?;
        let parameters = if header_ok {
            self.parameter_list()
        } else {
            Err(TranslateError::Syntax)
        };
        match parameters {
            Ok(()) => {}
            Err(TranslateError::Syntax) => {
                header_ok = false;
                self.skip_rest_of_line();
            }
            Err(fatal) => return Err(fatal),
        }

        let stored = self.symbols.begin_body()?;
        let entry = self.here();
        self.emit_op(Opcode::ArgStore);
        self.code().emit_int(stored.len() as i64);
        for arg in &stored {
            self.code().emit_string(arg);
        }

        self.statement_list(Block::Definition)?;
        self.emit_op(Opcode::Return);

        let closing = self.closing_clause();
        if !header_ok {
            self.symbols.abandon_definition()?;
            return Ok(());
        }
        self.check_closing(kind, &name, closing);

        let registration = self.symbols.finish_definition(entry)?;
        if registration.replaced {
            self.diagnostics.warning(
                DiagnosticKind::Redefinition,
                format!(
                    "{} '{}' is defined more than once",
                    kind.keyword(),
                    registration.name
                ),
                line,
                column,
            );
        }
        Ok(())
    }

    /// `a, b` or `(a, b)` up to the end of the line
    fn parameter_list(&mut self) -> Translate<()> {
        let parenthesized = self.match_token(&TokenKind::LeftParen);
        let open = |translator: &mut Self| {
            if parenthesized {
                !translator.check(&TokenKind::RightParen)
            } else {
                !translator.at_line_end()
            }
        };

        if open(self) {
            loop {
                let (line, column) = self.position();
                let name = self.identifier("a parameter name")?;
                if !self.symbols.collect_arg(&name)? {
                    self.diagnostics.syntax_error(
                        format!("duplicate parameter '{}'", name),
                        line,
                        column,
                    );
                    return Err(TranslateError::Syntax);
                }
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        if parenthesized {
            self.expect(TokenKind::RightParen, "')' after parameters")?;
        }
        if self.at_line_end() {
            Ok(())
        } else {
            self.unexpected("end of line after parameters")
        }
    }

    /// Reads `end [name]` when present. Junk after `end` is reported and
    /// skipped; the definition itself still closes.
    fn closing_clause(&mut self) -> Closing {
        let (line, column) = self.position();
        if !self.check(&TokenKind::End) {
            return Closing::Implicit(line, column);
        }
        self.advance();

        let (line, column) = self.position();
        match self.peek_kind() {
            TokenKind::Identifier(name) => {
                self.advance();
                Closing::End(Some(name), line, column)
            }
            TokenKind::Newline | TokenKind::Eof => Closing::End(None, line, column),
            other => {
                self.diagnostics.syntax_error(
                    format!("expected a handler name after 'end', found {}", other),
                    line,
                    column,
                );
                self.skip_rest_of_line();
                Closing::End(None, line, column)
            }
        }
    }

    /// A missing or mismatched closer is a warning, or a syntax error when
    /// the configuration makes `end name` mandatory for handlers.
    fn check_closing(&mut self, kind: DefinitionKind, name: &str, closing: Closing) {
        let mandatory = self.config.require_end_clause && kind == DefinitionKind::Handler;
        match closing {
            Closing::End(Some(closer), line, column) if !names_match(&closer, name) => {
                let message = format!("end mismatch: expected {} got {}", name, closer);
                if mandatory {
                    self.diagnostics.syntax_error(message, line, column);
                } else {
                    self.diagnostics.warning(
                        DiagnosticKind::EndClauseMismatch,
                        message,
                        line,
                        column,
                    );
                }
            }
            Closing::End(None, line, column) | Closing::Implicit(line, column) if mandatory => {
                self.diagnostics.syntax_error(
                    format!("missing 'end {}'", name),
                    line,
                    column,
                );
            }
            _ => {}
        }
    }
}
