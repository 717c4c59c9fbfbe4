// Expression translation
//
// Precedence climbing with post-order emission: both operands are compiled
// before the operator's opcode. Binding strength, loosest first:
//
//   and or
//   < <= > >= = <> contains starts
//   & &&
//   + -
//   * / mod
//   unary - not (tightest)

use crate::lingo_compiler::builtins::{lookup_builtin, BuiltinKind, ConstantValue};
use crate::lingo_compiler::diagnostics::DiagnosticKind;
use crate::lingo_compiler::lexer::TokenKind;
use crate::lingo_compiler::opcodes::Opcode;

use super::translate_statements::CallSite;
use super::{Translate, Translator};

fn binary_operator(kind: &TokenKind) -> Option<(Opcode, u8)> {
    let operator = match kind {
        TokenKind::And => (Opcode::And, 1),
        TokenKind::Or => (Opcode::Or, 1),
        TokenKind::Less => (Opcode::Lt, 2),
        TokenKind::LessEqual => (Opcode::Le, 2),
        TokenKind::Greater => (Opcode::Gt, 2),
        TokenKind::GreaterEqual => (Opcode::Ge, 2),
        TokenKind::Equal => (Opcode::Eq, 2),
        TokenKind::NotEqual => (Opcode::Neq, 2),
        TokenKind::Contains => (Opcode::Contains, 2),
        TokenKind::Starts => (Opcode::Starts, 2),
        TokenKind::Ampersand => (Opcode::Ampersand, 3),
        TokenKind::DoubleAmpersand => (Opcode::Concat, 3),
        TokenKind::Plus => (Opcode::Add, 4),
        TokenKind::Minus => (Opcode::Sub, 4),
        TokenKind::Star => (Opcode::Mul, 5),
        TokenKind::Slash => (Opcode::Div, 5),
        TokenKind::Mod => (Opcode::Mod, 5),
        _ => return None,
    };
    Some(operator)
}

/// Opcode for a chunk expression
fn chunk_opcode(unit: &TokenKind, ranged: bool) -> Option<Opcode> {
    let op = match (unit, ranged) {
        (TokenKind::Char, false) => Opcode::CharOf,
        (TokenKind::Char, true) => Opcode::CharToOf,
        (TokenKind::Item, false) => Opcode::ItemOf,
        (TokenKind::Item, true) => Opcode::ItemToOf,
        (TokenKind::Line, false) => Opcode::LineOf,
        (TokenKind::Line, true) => Opcode::LineToOf,
        (TokenKind::Word, false) => Opcode::WordOf,
        (TokenKind::Word, true) => Opcode::WordToOf,
        _ => return None,
    };
    Some(op)
}

impl Translator<'_> {
    pub(super) fn expression(&mut self) -> Translate<()> {
        self.binary_expression(1)
    }

    fn binary_expression(&mut self, min_precedence: u8) -> Translate<()> {
        self.unary_expression()?;
        loop {
            let Some((op, precedence)) = binary_operator(&self.peek().kind) else {
                return Ok(());
            };
            if precedence < min_precedence {
                return Ok(());
            }
            self.advance();
            self.binary_expression(precedence + 1)?;
            self.emit_op(op);
        }
    }

    fn unary_expression(&mut self) -> Translate<()> {
        match self.peek_kind() {
            TokenKind::Minus => {
                self.advance();
                self.unary_expression()?;
                self.emit_op(Opcode::Negate);
                Ok(())
            }
            TokenKind::Not => {
                self.advance();
                self.unary_expression()?;
                self.emit_op(Opcode::Not);
                Ok(())
            }
            TokenKind::Plus => {
                self.advance();
                self.unary_expression()
            }
            _ => self.primary(),
        }
    }

    /// Operand that binds tighter than any binary operator, used for entity
    /// ids and chunk sources: `the locH of sprite i + 1` adds to the property.
    pub(super) fn simple_expression(&mut self) -> Translate<()> {
        self.unary_expression()
    }

    fn primary(&mut self) -> Translate<()> {
        match self.peek_kind() {
            TokenKind::Integer(value) => {
                self.advance();
                self.emit_int_push(value);
            }
            TokenKind::Float(value) => {
                self.advance();
                self.emit_op(Opcode::FloatPush);
                self.code().emit_float(value);
            }
            TokenKind::String(text) => {
                self.advance();
                self.emit_op(Opcode::StringPush);
                self.code().emit_string(&text);
            }
            TokenKind::Symbol(name) => {
                self.advance();
                self.emit_op(Opcode::SymbolPush);
                self.code().emit_string(&name);
            }
            TokenKind::Identifier(name) => {
                let (line, column) = self.position();
                self.advance();
                if self.check(&TokenKind::LeftParen) {
                    let count = self.parenthesized_arguments()?;
                    self.emit_call(&name, count, CallSite::Function, line, column);
                } else if self.applies_bare_function(&name) {
                    // `random 10`: a built-in function takes one operand
                    // without parentheses
                    self.simple_expression()?;
                    self.emit_call(&name, 1, CallSite::Function, line, column);
                } else {
                    self.variable_read_at(&name, line, column);
                }
            }
            TokenKind::LeftParen => {
                self.advance();
                self.expression()?;
                self.expect(TokenKind::RightParen, "')'")?;
            }
            TokenKind::LeftBracket => self.list_literal()?,
            TokenKind::TheEntity(entity) => {
                self.advance();
                self.emit_int_push(0);
                self.emit_op(Opcode::TheEntityPush);
                self.code().emit_int(entity.entity as i64);
                self.code().emit_int(entity.field as i64);
            }
            TokenKind::TheEntityWithId(entity) => {
                self.advance();
                self.simple_expression()?;
                self.emit_op(Opcode::TheEntityPush);
                self.code().emit_int(entity.entity as i64);
                self.code().emit_int(entity.field as i64);
            }
            TokenKind::TheObjectField(field) => {
                self.advance();
                self.check_object(&field.object);
                self.emit_op(Opcode::ObjectFieldPush);
                self.code().emit_string(&field.object);
                self.code().emit_int(field.field as i64);
            }
            TokenKind::Char | TokenKind::Item | TokenKind::Line | TokenKind::Word => {
                self.chunk_expression()?
            }
            TokenKind::Sprite => self.sprite_test()?,
            _ => return self.unexpected("an expression"),
        }
        Ok(())
    }

    /// Built-in function `name` followed by something that starts an operand,
    /// unless the script uses `name` as a variable
    fn applies_bare_function(&mut self, name: &str) -> bool {
        let takes_operand = lookup_builtin(name).map_or(false, |builtin| {
            builtin.kind == BuiltinKind::Function && builtin.accepts(1)
        });
        if !takes_operand || self.symbols.is_bound(name) {
            return false;
        }
        matches!(
            self.peek_kind(),
            TokenKind::Integer(_)
                | TokenKind::Float(_)
                | TokenKind::String(_)
                | TokenKind::Symbol(_)
                | TokenKind::Identifier(_)
                | TokenKind::LeftBracket
                | TokenKind::TheEntity(_)
                | TokenKind::TheEntityWithId(_)
                | TokenKind::TheObjectField(_)
                | TokenKind::Char
                | TokenKind::Item
                | TokenKind::Line
                | TokenKind::Word
                | TokenKind::Sprite
        )
    }

    /// `char i of s`, `word i to j of s`, ...
    fn chunk_expression(&mut self) -> Translate<()> {
        let unit = self.advance().kind;
        self.expression()?;
        let ranged = self.match_token(&TokenKind::To);
        if ranged {
            self.expression()?;
        }
        self.expect(TokenKind::Of, "'of'")?;
        self.simple_expression()?;
        match chunk_opcode(&unit, ranged) {
            Some(op) => {
                self.emit_op(op);
                Ok(())
            }
            None => self.syntax_error(format!("{} is not a chunk type", unit)),
        }
    }

    /// `sprite a intersects b` / `sprite a within b`
    fn sprite_test(&mut self) -> Translate<()> {
        self.expect(TokenKind::Sprite, "'sprite'")?;
        self.simple_expression()?;
        let op = match self.peek_kind() {
            TokenKind::Intersects => Opcode::Intersects,
            TokenKind::Within => Opcode::Within,
            _ => return self.unexpected("'intersects' or 'within'"),
        };
        self.advance();
        self.simple_expression()?;
        self.emit_op(op);
        Ok(())
    }

    /// `[]`, `[a, b]`, `[:]`, `[#k: v, "k2": w]`
    fn list_literal(&mut self) -> Translate<()> {
        self.expect(TokenKind::LeftBracket, "'['")?;
        if self.match_token(&TokenKind::RightBracket) {
            self.emit_op(Opcode::ArrayPush);
            self.code().emit_int(0);
            return Ok(());
        }
        if self.check(&TokenKind::Colon) && self.peek_nth_kind(1) == TokenKind::RightBracket {
            self.advance();
            self.advance();
            self.emit_op(Opcode::PropArrayPush);
            self.code().emit_int(0);
            return Ok(());
        }

        self.expression()?;
        let properties = self.match_token(&TokenKind::Colon);
        if properties {
            self.expression()?;
        }
        let mut count = 1;
        while self.match_token(&TokenKind::Comma) {
            self.expression()?;
            if properties {
                self.expect(TokenKind::Colon, "':' in property list")?;
                self.expression()?;
            }
            count += 1;
        }
        self.expect(TokenKind::RightBracket, "']'")?;

        self.emit_op(if properties {
            Opcode::PropArrayPush
        } else {
            Opcode::ArrayPush
        });
        self.code().emit_int(count);
        Ok(())
    }

    pub(super) fn emit_int_push(&mut self, value: i64) {
        self.emit_op(Opcode::IntPush);
        self.code().emit_int(value);
    }

    /// Push the value of `name` (or of the built-in constant it names)
    pub(super) fn variable_read(&mut self, name: &str) {
        let (line, column) = self.position();
        self.variable_read_at(name, line, column);
    }

    fn variable_read_at(&mut self, name: &str, line: usize, column: usize) {
        match lookup_builtin(name).map(|builtin| &builtin.kind) {
            Some(BuiltinKind::Constant(ConstantValue::Int(value))) => {
                self.emit_int_push(*value);
                return;
            }
            Some(BuiltinKind::Constant(ConstantValue::Str(text))) => {
                self.emit_op(Opcode::StringPush);
                self.code().emit_string(text);
                return;
            }
            Some(_) => {}
            None => self.check_bound(name, line, column),
        }
        self.emit_op(Opcode::Eval);
        self.code().emit_string(name);
    }

    /// Object named in `the field of object`
    pub(super) fn check_object(&mut self, name: &str) {
        let (line, column) = self.position();
        self.check_bound(name, line, column);
    }

    fn check_bound(&mut self, name: &str, line: usize, column: usize) {
        if self.config.warn_undefined && !self.symbols.is_bound(name) {
            self.diagnostics.warning(
                DiagnosticKind::UndefinedReference,
                format!("'{}' is used before it is assigned or declared", name),
                line,
                column,
            );
        }
    }
}
