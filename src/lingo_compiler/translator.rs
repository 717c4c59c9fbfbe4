// Syntax-directed translator
//
// Recursive descent over the token stream with no syntax tree: every
// production emits into the current instruction buffer as soon as it is
// recognised. The implementation is split over several files:
// - translate_statements.rs: assignments, calls, declarations, navigation
// - translate_control.rs: if chains, repeat loops, tell, when
// - translate_expressions.rs: precedence climbing and primaries
// - translate_definitions.rs: handlers, macros, factories and methods

use crate::lingo_compiler::config::CompilerConfig;
use crate::lingo_compiler::diagnostics::Diagnostics;
use crate::lingo_compiler::error::CompilerError;
use crate::lingo_compiler::lexer::{Token, TokenKind};
use crate::lingo_compiler::opcodes::Opcode;
use crate::lingo_compiler::script::{Mark, PatchSlot, ScriptBuffer};
use crate::lingo_compiler::symbols::SymbolTable;
use crate::lingo_compiler::CompiledScript;
use std::collections::VecDeque;
use std::mem;

#[path = "translate_control.rs"]
mod translate_control;
#[path = "translate_definitions.rs"]
mod translate_definitions;
#[path = "translate_expressions.rs"]
mod translate_expressions;
#[path = "translate_statements.rs"]
mod translate_statements;

/// Why a production gave up
#[derive(Debug)]
pub(crate) enum TranslateError {
    /// A syntax error that has already been recorded; unwind to the nearest
    /// statement boundary and recover there.
    Syntax,
    /// A broken translator invariant; aborts the whole compile.
    Fatal(CompilerError),
}

impl From<CompilerError> for TranslateError {
    fn from(err: CompilerError) -> Self {
        TranslateError::Fatal(err)
    }
}

pub(crate) type Translate<T> = Result<T, TranslateError>;

/// Pull-based token source with unbounded lookahead.
///
/// Once the underlying iterator is exhausted the stream keeps answering
/// `Eof` at the last known position.
struct TokenStream<'a> {
    source: Box<dyn Iterator<Item = Token> + 'a>,
    lookahead: VecDeque<Token>,
    /// Kinds consumed since the last newline
    line: Vec<TokenKind>,
    last_line: usize,
    last_column: usize,
}

impl<'a> TokenStream<'a> {
    fn new(source: Box<dyn Iterator<Item = Token> + 'a>) -> Self {
        TokenStream {
            source,
            lookahead: VecDeque::new(),
            line: Vec::new(),
            last_line: 1,
            last_column: 1,
        }
    }

    fn fill(&mut self, count: usize) {
        while self.lookahead.len() < count {
            let token = match self.source.next() {
                Some(token) => token,
                None => Token::new(TokenKind::Eof, self.last_line, self.last_column),
            };
            self.last_line = token.line;
            self.last_column = token.column;
            let at_end = token.kind == TokenKind::Eof;
            self.lookahead.push_back(token);
            if at_end {
                break;
            }
        }
    }

    fn peek_nth(&mut self, n: usize) -> &Token {
        self.fill(n + 1);
        // Everything past an Eof reads as that Eof
        let index = n.min(self.lookahead.len() - 1);
        &self.lookahead[index]
    }

    fn advance(&mut self) -> Token {
        self.fill(1);
        let token = if self.lookahead[0].kind == TokenKind::Eof {
            self.lookahead[0].clone()
        } else {
            match self.lookahead.pop_front() {
                Some(token) => token,
                None => Token::new(TokenKind::Eof, self.last_line, self.last_column),
            }
        };
        if token.kind == TokenKind::Newline {
            self.line.clear();
        } else {
            self.line.push(token.kind.clone());
        }
        token
    }
}

/// Which construct a statement list belongs to; decides where it stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Block {
    Script,
    Definition,
    IfBody,
    LoopBody,
    TellBody,
}

/// Block construct whose opening line failed to compile. Its body and its
/// closing line are skipped without being translated or reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Orphan {
    If,
    Repeat,
    Tell,
}

impl Orphan {
    /// Block left open by `line`, the tokens of a rejected line
    fn opened_by(line: &[TokenKind]) -> Option<Orphan> {
        match line.first()? {
            TokenKind::Repeat => Some(Orphan::Repeat),
            TokenKind::Tell if !line.contains(&TokenKind::To) => Some(Orphan::Tell),
            TokenKind::If | TokenKind::Elsif | TokenKind::Else => {
                // The last arm header on the line opens a block unless a
                // one-line body follows its `then`
                let arm = line
                    .iter()
                    .rposition(|kind| matches!(kind, TokenKind::If | TokenKind::Elsif))?;
                match line[arm..].iter().position(|kind| *kind == TokenKind::Then) {
                    Some(then) if arm + then + 1 < line.len() => None,
                    _ => Some(Orphan::If),
                }
            }
            _ => None,
        }
    }

    fn closed_by(self, kind: &TokenKind) -> bool {
        matches!(
            (self, kind),
            (Orphan::If, TokenKind::If)
                | (Orphan::Repeat, TokenKind::Repeat)
                | (Orphan::Tell, TokenKind::Tell)
        )
    }
}

pub(crate) fn starts_definition(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::On | TokenKind::Macro | TokenKind::Factory | TokenKind::Method
    )
}

pub struct Translator<'a> {
    tokens: TokenStream<'a>,
    symbols: SymbolTable,
    diagnostics: Diagnostics,
    config: CompilerConfig,
    orphans: Vec<Orphan>,
    /// A rejected if chain had block arms, so an `end if` may follow it
    unclosed_if: bool,
    /// Control constructs currently open around the statement
    nesting: usize,
}

impl<'a> Translator<'a> {
    pub fn new(tokens: Box<dyn Iterator<Item = Token> + 'a>, config: CompilerConfig) -> Self {
        let diagnostics = Diagnostics::with_limit(config.max_diagnostics);
        Translator {
            tokens: TokenStream::new(tokens),
            symbols: SymbolTable::new(),
            diagnostics,
            config,
            orphans: Vec::new(),
            unclosed_if: false,
            nesting: 0,
        }
    }

    /// Translate the whole unit.
    ///
    /// User errors end up in the returned diagnostics; only a broken
    /// translator invariant produces `Err`.
    pub fn translate(mut self) -> Result<(CompiledScript, Diagnostics), CompilerError> {
        self.statement_list(Block::Script)?;
        self.symbols.code_mut().emit_op(Opcode::Stop);

        let script = self.symbols.finish()?;
        script.code.verify_resolved()?;
        for handler in script.all_handlers() {
            handler.code.verify_resolved().map_err(|err| {
                CompilerError::StructuralInvariant(format!("in '{}': {}", handler.name, err))
            })?;
        }

        log::info!(
            "translated unit: {} top-level word(s), {} handler(s), {} factory(ies), {} diagnostic(s)",
            script.code.len(),
            script.handlers.len(),
            script.factories.len(),
            self.diagnostics.len()
        );
        Ok((script, self.diagnostics))
    }

    // Token helpers

    fn peek(&mut self) -> &Token {
        self.tokens.peek_nth(0)
    }

    fn peek_kind(&mut self) -> TokenKind {
        self.tokens.peek_nth(0).kind.clone()
    }

    fn peek_nth_kind(&mut self, n: usize) -> TokenKind {
        self.tokens.peek_nth(n).kind.clone()
    }

    fn advance(&mut self) -> Token {
        self.tokens.advance()
    }

    fn check(&mut self, kind: &TokenKind) -> bool {
        mem::discriminant(&self.peek().kind) == mem::discriminant(kind)
    }

    fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Translate<Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            self.unexpected(what)
        }
    }

    fn identifier(&mut self, what: &str) -> Translate<String> {
        match self.peek_kind() {
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            _ => self.unexpected(what),
        }
    }

    /// Newline or end of input: where a statement may end
    fn at_line_end(&mut self) -> bool {
        matches!(self.peek().kind, TokenKind::Newline | TokenKind::Eof)
    }

    fn skip_newlines(&mut self) {
        while self.check(&TokenKind::Newline) {
            self.advance();
        }
    }

    /// Kind of the first token after any newlines, and how many newlines
    /// precede it
    fn peek_past_newlines(&mut self) -> (TokenKind, usize) {
        let mut n = 0;
        loop {
            let kind = self.peek_nth_kind(n);
            if kind != TokenKind::Newline {
                return (kind, n);
            }
            n += 1;
        }
    }

    // Diagnostics

    fn syntax_error<T>(&mut self, message: impl Into<String>) -> Translate<T> {
        let (line, column) = {
            let token = self.peek();
            (token.line, token.column)
        };
        self.diagnostics.syntax_error(message, line, column);
        Err(TranslateError::Syntax)
    }

    fn unexpected<T>(&mut self, expected: &str) -> Translate<T> {
        let found = self.peek_kind();
        match found {
            TokenKind::Error(message) => self.syntax_error(message),
            found => self.syntax_error(format!("expected {}, found {}", expected, found)),
        }
    }

    fn position(&mut self) -> (usize, usize) {
        let token = self.peek();
        (token.line, token.column)
    }

    // Emission helpers

    fn code(&mut self) -> &mut ScriptBuffer {
        self.symbols.code_mut()
    }

    fn here(&mut self) -> Mark {
        self.symbols.code().here()
    }

    fn emit_op(&mut self, op: Opcode) -> Mark {
        self.code().emit_op(op)
    }

    fn reserve<const N: usize>(&mut self) -> Translate<[PatchSlot; N]> {
        Ok(self.code().reserve(N).into_array::<N>()?)
    }

    // Statement lists and recovery

    fn at_block_end(&mut self, block: Block) -> bool {
        let kind = self.peek_kind();
        if kind == TokenKind::Eof {
            return true;
        }
        match block {
            Block::Script => false,
            Block::Definition => {
                starts_definition(&kind)
                    || (kind == TokenKind::End
                        && !matches!(
                            self.peek_nth_kind(1),
                            TokenKind::If | TokenKind::Repeat | TokenKind::Tell
                        ))
            }
            Block::IfBody => {
                starts_definition(&kind)
                    || matches!(kind, TokenKind::End | TokenKind::Else | TokenKind::Elsif)
            }
            Block::LoopBody | Block::TellBody => {
                starts_definition(&kind) || kind == TokenKind::End
            }
        }
    }

    /// Translate statements, one per line, until the block's terminator.
    ///
    /// A statement with a syntax error is voided and skipped; the rest of the
    /// list still compiles. Blocks orphaned inside the list end with it.
    fn statement_list(&mut self, block: Block) -> Result<(), CompilerError> {
        let base = self.orphans.len();
        loop {
            self.skip_newlines();
            if self.skip_orphan_line(base) {
                continue;
            }
            if self.at_block_end(block) {
                break;
            }
            self.statement_line()?;
        }
        self.orphans.truncate(base);
        Ok(())
    }

    fn statement_line(&mut self) -> Result<(), CompilerError> {
        let start = self.here();
        let depth = self.symbols.depth();

        let result = self.statement().and_then(|()| self.end_of_statement());
        match result {
            Ok(()) => Ok(()),
            Err(TranslateError::Fatal(err)) => Err(err),
            Err(TranslateError::Syntax) => self.recover(start, depth),
        }
    }

    fn end_of_statement(&mut self) -> Translate<()> {
        let kind = self.peek_kind();
        if matches!(kind, TokenKind::Newline | TokenKind::Eof) || starts_definition(&kind) {
            Ok(())
        } else {
            self.unexpected("end of line")
        }
    }

    /// Panic-mode recovery after a syntax error in the statement that began at
    /// `start`.
    fn recover(&mut self, start: Mark, depth: usize) -> Result<(), CompilerError> {
        while self.symbols.depth() > depth {
            if self.symbols.in_definition() {
                self.symbols.abandon_definition()?;
            } else {
                self.symbols.close_factory();
            }
        }

        let voided = self.code().void_from(start);
        let skipped = self.synchronize();
        log::debug!(
            "recovered: voided {} word(s), skipped {} token(s)",
            voided,
            skipped
        );
        Ok(())
    }

    /// Discard tokens up to, but not including, the next newline or the
    /// start of the next definition.
    fn skip_rest_of_line(&mut self) -> usize {
        let mut skipped = 0;
        while !self.at_line_end() && !starts_definition(&self.peek().kind) {
            self.advance();
            skipped += 1;
        }
        skipped
    }

    /// Discard tokens up to and including the next newline.
    fn synchronize(&mut self) -> usize {
        let mut skipped = self.skip_rest_of_line();
        let unclosed_if = mem::take(&mut self.unclosed_if);
        if let Some(orphan) = Orphan::opened_by(&self.tokens.line) {
            log::debug!("block {:?} lost its opening line", orphan);
            self.orphans.push(orphan);
        } else if unclosed_if {
            let (next, newlines) = self.peek_past_newlines();
            if next == TokenKind::End && self.peek_nth_kind(newlines + 1) == TokenKind::If {
                for _ in 0..newlines {
                    self.advance();
                }
                skipped += self.skip_rest_of_line();
            }
        }
        self.match_token(&TokenKind::Newline);
        skipped
    }

    /// Drop one line of a block whose opening line was rejected, tracking
    /// blocks nested in it. Returns false once the line is no longer part of
    /// an orphaned block opened since `base`.
    fn skip_orphan_line(&mut self, base: usize) -> bool {
        if self.orphans.len() == base {
            return false;
        }
        let kind = self.peek_kind();
        let inside = match kind {
            TokenKind::Eof => false,
            TokenKind::End => {
                let closer = self.peek_nth_kind(1);
                match self.orphans[base..]
                    .iter()
                    .rposition(|orphan| orphan.closed_by(&closer))
                {
                    Some(index) => {
                        self.orphans.truncate(base + index + 1);
                        true
                    }
                    None => false,
                }
            }
            TokenKind::Else | TokenKind::Elsif => self.orphans[base..].contains(&Orphan::If),
            ref kind => !starts_definition(kind),
        };
        if !inside {
            self.orphans.truncate(base);
            return false;
        }

        self.skip_rest_of_line();
        match kind {
            TokenKind::End => {
                if let Some(orphan) = self.orphans.pop() {
                    log::debug!("orphaned {:?} block closed", orphan);
                }
            }
            TokenKind::If | TokenKind::Repeat | TokenKind::Tell => {
                if let Some(nested) = Orphan::opened_by(&self.tokens.line) {
                    self.orphans.push(nested);
                }
            }
            _ => {}
        }
        true
    }
}

#[cfg(test)]
#[path = "translator_tests.rs"]
mod tests;
