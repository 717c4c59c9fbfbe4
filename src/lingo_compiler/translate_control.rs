// Control constructs: if/elsif/else chains, repeat loops, tell and when
//
// Each construct reserves its slots when it opens, records one relocation
// per slot while it is being translated, and resolves them all when its
// closing keyword has been seen.

use crate::lingo_compiler::lexer::TokenKind;
use crate::lingo_compiler::opcodes::Opcode;
use crate::lingo_compiler::patch::Fixups;
use crate::lingo_compiler::script::{Mark, PatchSlot, Word};

use super::{Block, Translate, Translator};

/// `down to` step: the all-ones word, read as -1 by the VM
const STEP_DOWN: i64 = -1;
const STEP_UP: i64 = 1;

/// Slots of one `IF` header whose values depend on the rest of the chain
struct Arm {
    owner: Mark,
    end: PatchSlot,
    skip_end: PatchSlot,
    /// `STOP` closing this arm's then-body
    stop: Mark,
    one_liner: bool,
}

/// An if/elsif/else chain being translated
#[derive(Default)]
struct IfChain {
    arms: Vec<Arm>,
    fixups: Fixups,
    has_else: bool,
    /// Some body was a multi-line block, so the chain may close with `end if`
    has_block: bool,
}

impl Translator<'_> {
    /// `if cond then ...` in all its forms.
    ///
    /// Layout of one arm, with the condition compiled before the header:
    ///
    /// ```text
    /// <cond> IF then else end skip_end <then-body> STOP
    /// ```
    ///
    /// `then` is 0 for a one-liner (the body directly follows the header).
    /// `else` points at the next arm's condition or the else-body, or is 0.
    /// Every arm's `end` points at the single point after the whole chain,
    /// except for a lone one-liner, whose `end` points at its own `STOP` and
    /// whose `skip_end` is 1.
    pub(super) fn if_statement(&mut self) -> Translate<()> {
        self.expect(TokenKind::If, "'if'")?;
        let mut chain = IfChain::default();
        let arms = self.if_arm(&mut chain);
        if arms.is_err() && chain.has_block {
            self.unclosed_if = true;
        }
        arms?;

        let end = self.here();
        let single_line = chain.arms.len() == 1 && !chain.has_else && chain.arms[0].one_liner;
        for arm in chain.arms {
            if single_line {
                chain.fixups.offset(arm.end, arm.owner, arm.stop);
                chain.fixups.value(arm.skip_end, Word::int(1));
            } else {
                chain.fixups.offset(arm.end, arm.owner, end);
                chain.fixups.value(arm.skip_end, Word::int(0));
            }
        }
        chain.fixups.resolve(self.code())?;
        Ok(())
    }

    /// One arm, after its `if`/`elsif` keyword; recurses for the next arm.
    fn if_arm(&mut self, chain: &mut IfChain) -> Translate<()> {
        self.expression()?;
        let owner = self.emit_op(Opcode::If);
        let [then_slot, else_slot, end_slot, skip_slot] = self.reserve::<4>()?;
        self.expect(TokenKind::Then, "'then'")?;

        let one_liner = !self.at_line_end();
        let then_start = self.here();
        if one_liner {
            self.statement()?;
            chain.fixups.value(then_slot, Word::int(0));
        } else {
            self.statement_list(Block::IfBody)?;
            chain.fixups.offset(then_slot, owner, then_start);
            chain.has_block = true;
        }
        let stop = self.emit_op(Opcode::Stop);
        chain.arms.push(Arm {
            owner,
            end: end_slot,
            skip_end: skip_slot,
            stop,
            one_liner,
        });

        if one_liner {
            // `else` may follow on the next line
            let (next, newlines) = self.peek_past_newlines();
            if matches!(next, TokenKind::Else | TokenKind::Elsif) {
                for _ in 0..newlines {
                    self.advance();
                }
            }
        }

        match self.peek_kind() {
            TokenKind::Elsif => {
                self.advance();
                let next_arm = self.here();
                chain.fixups.offset(else_slot, owner, next_arm);
                self.if_arm(chain)
            }
            TokenKind::Else if self.peek_nth_kind(1) == TokenKind::If => {
                self.advance();
                self.advance();
                let next_arm = self.here();
                chain.fixups.offset(else_slot, owner, next_arm);
                self.if_arm(chain)
            }
            TokenKind::Else => {
                self.advance();
                let else_start = self.here();
                chain.fixups.offset(else_slot, owner, else_start);
                chain.has_else = true;
                self.else_body(chain)
            }
            TokenKind::End if !one_liner => {
                chain.fixups.value(else_slot, Word::int(0));
                self.end_of_block(TokenKind::If, "'end if'")
            }
            _ if one_liner => {
                chain.fixups.value(else_slot, Word::int(0));
                self.optional_end_if(chain)
            }
            _ => self.unexpected("'end if'"),
        }
    }

    fn else_body(&mut self, chain: &mut IfChain) -> Translate<()> {
        if self.at_line_end() {
            self.statement_list(Block::IfBody)?;
            return self.end_of_block(TokenKind::If, "'end if'");
        }

        self.statement()?;
        self.optional_end_if(chain)
    }

    /// A one-line arm after block arms may still be closed by `end if`
    fn optional_end_if(&mut self, chain: &IfChain) -> Translate<()> {
        if !chain.has_block {
            return Ok(());
        }
        let (next, newlines) = self.peek_past_newlines();
        if next == TokenKind::End && self.peek_nth_kind(newlines + 1) == TokenKind::If {
            for _ in 0..newlines {
                self.advance();
            }
            return self.end_of_block(TokenKind::If, "'end if'");
        }
        Ok(())
    }

    /// `end <keyword>`
    fn end_of_block(&mut self, keyword: TokenKind, what: &str) -> Translate<()> {
        if self.check(&TokenKind::End) && self.peek_nth_kind(1) == keyword {
            self.advance();
            self.advance();
            Ok(())
        } else {
            self.unexpected(what)
        }
    }

    pub(super) fn repeat_statement(&mut self) -> Translate<()> {
        self.expect(TokenKind::Repeat, "'repeat'")?;
        match self.peek_kind() {
            TokenKind::While => self.repeat_while(),
            TokenKind::With => self.repeat_with(),
            _ => self.unexpected("'while' or 'with' after 'repeat'"),
        }
    }

    /// ```text
    /// REPEATWHILE body end <cond> STOP <body> STOP
    /// ```
    fn repeat_while(&mut self) -> Translate<()> {
        self.expect(TokenKind::While, "'while'")?;
        let owner = self.emit_op(Opcode::RepeatWhile);
        let [body_slot, end_slot] = self.reserve::<2>()?;

        self.expression()?;
        self.emit_op(Opcode::Stop);

        let body = self.here();
        self.loop_body()?;
        self.emit_op(Opcode::Stop);
        let end = self.here();

        let mut fixups = Fixups::new();
        fixups.offset(body_slot, owner, body);
        fixups.offset(end_slot, owner, end);
        fixups.resolve(self.code())?;
        Ok(())
    }

    /// ```text
    /// REPEATWITH init finish body step end var <init> STOP <finish> STOP <body> STOP
    /// ```
    fn repeat_with(&mut self) -> Translate<()> {
        self.expect(TokenKind::With, "'with'")?;
        let variable = self.identifier("a loop variable")?;
        self.expect(TokenKind::Equal, "'=' after the loop variable")?;

        let owner = self.emit_op(Opcode::RepeatWith);
        let [init_slot, finish_slot, body_slot, step_slot, end_slot] = self.reserve::<5>()?;
        self.code().emit_string(&variable);
        let mut fixups = Fixups::new();

        let init = self.here();
        self.expression()?;
        self.emit_op(Opcode::Stop);

        let step = if self.match_token(&TokenKind::Down) {
            STEP_DOWN
        } else {
            STEP_UP
        };
        self.expect(TokenKind::To, "'to' or 'down to'")?;

        let finish = self.here();
        self.expression()?;
        self.emit_op(Opcode::Stop);
        self.symbols.declare_local(&variable);

        let body = self.here();
        self.loop_body()?;
        self.emit_op(Opcode::Stop);
        let end = self.here();

        fixups.offset(init_slot, owner, init);
        fixups.offset(finish_slot, owner, finish);
        fixups.offset(body_slot, owner, body);
        fixups.value(step_slot, Word::int(step));
        fixups.offset(end_slot, owner, end);
        fixups.resolve(self.code())?;
        Ok(())
    }

    /// Statements up to `end repeat`, with loop exits allowed
    fn loop_body(&mut self) -> Translate<()> {
        if !self.at_line_end() {
            return self.unexpected("end of line");
        }
        self.symbols.enter_loop();
        let body = self.statement_list(Block::LoopBody);
        self.symbols.leave_loop();
        body?;
        self.end_of_block(TokenKind::Repeat, "'end repeat'")
    }

    /// `tell target to stmt` or a `tell target` block closed by `end tell`
    ///
    /// ```text
    /// <target> TELLCODE end <stmts> STOP
    /// ```
    pub(super) fn tell_statement(&mut self) -> Translate<()> {
        self.expect(TokenKind::Tell, "'tell'")?;
        self.expression()?;
        let owner = self.emit_op(Opcode::TellCode);
        let [end_slot] = self.reserve::<1>()?;

        if self.match_token(&TokenKind::To) {
            self.statement()?;
        } else if self.at_line_end() {
            self.statement_list(Block::TellBody)?;
            self.end_of_block(TokenKind::Tell, "'end tell'")?;
        } else {
            return self.unexpected("'to' or end of line after the tell target");
        }
        self.emit_op(Opcode::Stop);
        let end = self.here();

        let mut fixups = Fixups::new();
        fixups.offset(end_slot, owner, end);
        fixups.resolve(self.code())?;
        Ok(())
    }

    /// `when event then stmt`
    ///
    /// ```text
    /// WHENCODE end event <stmt> STOP
    /// ```
    pub(super) fn when_statement(&mut self) -> Translate<()> {
        self.expect(TokenKind::When, "'when'")?;
        let event = self.identifier("an event name")?;
        self.expect(TokenKind::Then, "'then'")?;

        let owner = self.emit_op(Opcode::WhenCode);
        let [end_slot] = self.reserve::<1>()?;
        self.code().emit_string(&event);

        self.statement()?;
        self.emit_op(Opcode::Stop);
        let end = self.here();

        let mut fixups = Fixups::new();
        fixups.offset(end_slot, owner, end);
        fixups.resolve(self.code())?;
        Ok(())
    }
}
