// Statement translation
//
// Assignment forms, procedure calls, declarations, navigation (`go`/`play`),
// `open`, `put` and the loop exits. Control constructs live in
// translate_control.rs, definitions in translate_definitions.rs.

use crate::lingo_compiler::builtins::lookup_builtin;
use crate::lingo_compiler::diagnostics::DiagnosticKind;
use crate::lingo_compiler::entities::{EntityRef, ObjectFieldRef};
use crate::lingo_compiler::lexer::TokenKind;
use crate::lingo_compiler::opcodes::{NavigationSelector, Opcode};

use super::{starts_definition, Translate, Translator};

/// Left-hand side of an assignment
enum Target {
    Variable(String),
    Entity(EntityRef),
    /// Entity whose id has not been compiled yet
    EntityWithId(EntityRef),
    ObjectField(ObjectFieldRef),
}

/// Which call opcode a call site uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CallSite {
    /// Value-producing call inside an expression
    Function,
    /// Call in statement position; its result is discarded
    Procedure,
}

impl Translator<'_> {
    pub(super) fn statement(&mut self) -> Translate<()> {
        match self.peek_kind() {
            TokenKind::Identifier(_) => {
                if self.peek_nth_kind(1) == TokenKind::Equal {
                    self.bare_assignment()
                } else {
                    self.call_statement()
                }
            }
            TokenKind::Set => self.set_statement(),
            TokenKind::Put => self.put_statement(),
            TokenKind::If => self.nested(Self::if_statement),
            TokenKind::Repeat => self.nested(Self::repeat_statement),
            TokenKind::Tell => self.nested(Self::tell_statement),
            TokenKind::When => self.nested(Self::when_statement),
            TokenKind::Go => self.go_statement(),
            TokenKind::Play => self.play_statement(),
            TokenKind::Open => self.open_statement(),
            TokenKind::Exit => self.exit_statement(),
            TokenKind::Next => self.next_repeat_statement(),
            TokenKind::Global | TokenKind::Property | TokenKind::Instance => self.declaration(),
            kind if starts_definition(&kind) => {
                if self.nesting > 0 {
                    let keyword = self.advance().kind;
                    return self.syntax_error(format!(
                        "{} cannot appear inside another statement",
                        keyword
                    ));
                }
                self.definition()
            }
            TokenKind::End => {
                let closer = self.peek_nth_kind(1);
                self.syntax_error(format!("'end' {} without a matching block", closer))
            }
            TokenKind::Else | TokenKind::Elsif => self.syntax_error("'else' without 'if'"),
            _ => self.unexpected("a statement"),
        }
    }

    /// Translate a construct that may contain further statements
    fn nested(&mut self, construct: fn(&mut Self) -> Translate<()>) -> Translate<()> {
        self.nesting += 1;
        let result = construct(self);
        self.nesting -= 1;
        result
    }

    /// `x = expr`
    fn bare_assignment(&mut self) -> Translate<()> {
        let name = self.identifier("a variable name")?;
        self.expect(TokenKind::Equal, "'='")?;
        self.expression()?;
        self.assign_to(Target::Variable(name))
    }

    /// `set x to expr`, `set the field of entity id to expr`, ...
    fn set_statement(&mut self) -> Translate<()> {
        self.expect(TokenKind::Set, "'set'")?;
        let target = match self.peek_kind() {
            TokenKind::Identifier(name) => {
                self.advance();
                Target::Variable(name)
            }
            TokenKind::TheEntity(entity) => {
                self.advance();
                Target::Entity(entity)
            }
            TokenKind::TheEntityWithId(entity) => {
                self.advance();
                // The id is pushed first and swapped below the value
                self.simple_expression()?;
                self.set_separator()?;
                self.expression()?;
                self.emit_op(Opcode::Swap);
                return self.assign_to(Target::Entity(entity));
            }
            TokenKind::TheObjectField(field) => {
                self.advance();
                Target::ObjectField(field)
            }
            _ => return self.unexpected("a variable or property after 'set'"),
        };
        self.set_separator()?;
        self.expression()?;
        match target {
            Target::Entity(entity) => {
                self.emit_int_push(0);
                self.assign_to(Target::Entity(entity))
            }
            other => self.assign_to(other),
        }
    }

    fn set_separator(&mut self) -> Translate<()> {
        if self.match_token(&TokenKind::To) || self.match_token(&TokenKind::Equal) {
            Ok(())
        } else {
            self.unexpected("'to' or '='")
        }
    }

    /// `put expr`, `put expr into target`, `put expr after|before name`
    fn put_statement(&mut self) -> Translate<()> {
        self.expect(TokenKind::Put, "'put'")?;
        self.expression()?;

        match self.peek_kind() {
            TokenKind::Into => {
                self.advance();
                let target = match self.peek_kind() {
                    TokenKind::Identifier(name) => Target::Variable(name),
                    TokenKind::TheEntity(entity) => Target::Entity(entity),
                    TokenKind::TheEntityWithId(entity) => Target::EntityWithId(entity),
                    TokenKind::TheObjectField(field) => Target::ObjectField(field),
                    _ => return self.unexpected("a variable or property after 'into'"),
                };
                self.advance();
                match target {
                    Target::Entity(entity) => {
                        self.emit_int_push(0);
                        self.assign_to(Target::Entity(entity))
                    }
                    Target::EntityWithId(entity) => {
                        // Value is already below the id
                        self.simple_expression()?;
                        self.assign_to(Target::Entity(entity))
                    }
                    other => self.assign_to(other),
                }
            }
            TokenKind::After | TokenKind::Before => {
                let splice = if self.advance().kind == TokenKind::After {
                    Opcode::After
                } else {
                    Opcode::Before
                };
                let name = self.identifier("a variable name")?;
                self.variable_read(&name);
                self.emit_op(splice);
                self.assign_to(Target::Variable(name))
            }
            _ => {
                self.emit_op(Opcode::PrintTop);
                Ok(())
            }
        }
    }

    /// Store the value on top of the stack
    fn assign_to(&mut self, target: Target) -> Translate<()> {
        match target {
            Target::Variable(name) => {
                self.emit_op(Opcode::VarPush);
                self.code().emit_string(&name);
                self.emit_op(Opcode::Assign);
                self.symbols.declare_local(&name);
            }
            Target::Entity(entity) | Target::EntityWithId(entity) => {
                self.emit_op(Opcode::TheEntityAssign);
                self.code().emit_int(entity.entity as i64);
                self.code().emit_int(entity.field as i64);
            }
            Target::ObjectField(field) => {
                self.check_object(&field.object);
                self.emit_op(Opcode::ObjectFieldAssign);
                self.code().emit_string(&field.object);
                self.code().emit_int(field.field as i64);
            }
        }
        Ok(())
    }

    /// `name`, `name a, b` or `name(a, b)` as a statement
    fn call_statement(&mut self) -> Translate<()> {
        let (line, column) = self.position();
        let name = self.identifier("a handler name")?;
        let count = if self.check(&TokenKind::LeftParen) {
            self.parenthesized_arguments()?
        } else if self.at_line_end() || self.check(&TokenKind::Else) {
            0
        } else {
            self.argument_list()?
        };
        self.emit_call(&name, count, CallSite::Procedure, line, column);
        Ok(())
    }

    /// Comma separated expressions; returns how many were compiled
    pub(super) fn argument_list(&mut self) -> Translate<usize> {
        let mut count = 0;
        loop {
            self.expression()?;
            count += 1;
            if !self.match_token(&TokenKind::Comma) {
                return Ok(count);
            }
        }
    }

    pub(super) fn parenthesized_arguments(&mut self) -> Translate<usize> {
        self.expect(TokenKind::LeftParen, "'('")?;
        if self.match_token(&TokenKind::RightParen) {
            return Ok(0);
        }
        let count = self.argument_list()?;
        self.expect(TokenKind::RightParen, "')' after arguments")?;
        Ok(count)
    }

    /// `CALL`/`PROCCALL name count immediate`, after the arguments
    pub(super) fn emit_call(
        &mut self,
        name: &str,
        count: usize,
        site: CallSite,
        line: usize,
        column: usize,
    ) {
        let builtin = lookup_builtin(name);
        if let Some(builtin) = builtin {
            if self.config.check_builtin_arity && !builtin.accepts(count) {
                self.diagnostics.warning(
                    DiagnosticKind::ArgumentCount,
                    format!("'{}' called with {} argument(s)", builtin.name, count),
                    line,
                    column,
                );
            }
        }
        let immediate = builtin.map_or(false, |builtin| builtin.immediate);

        self.emit_op(match site {
            CallSite::Function => Opcode::Call,
            CallSite::Procedure => Opcode::ProcCall,
        });
        self.code().emit_string(name);
        self.code().emit_int(count as i64);
        self.code().emit_int(immediate as i64);
    }

    /// `global a, b` / `property a` / `instance a`
    fn declaration(&mut self) -> Translate<()> {
        let keyword = self.advance().kind;
        loop {
            let name = self.identifier("a variable name")?;
            let op = match keyword {
                TokenKind::Global => {
                    self.symbols.declare_global(&name);
                    Opcode::Global
                }
                TokenKind::Property => {
                    self.symbols.declare_property(&name);
                    Opcode::Property
                }
                _ => {
                    self.symbols.declare_instance(&name);
                    Opcode::Instance
                }
            };
            self.emit_op(op);
            self.code().emit_string(&name);
            if !self.match_token(&TokenKind::Comma) {
                return Ok(());
            }
        }
    }

    /// `exit` or `exit repeat`
    fn exit_statement(&mut self) -> Translate<()> {
        self.expect(TokenKind::Exit, "'exit'")?;
        if self.check(&TokenKind::Repeat) {
            if !self.symbols.in_loop() {
                return self.syntax_error("'exit repeat' outside of a repeat loop");
            }
            self.advance();
            self.emit_op(Opcode::ExitRepeat);
        } else {
            self.emit_op(Opcode::Return);
        }
        Ok(())
    }

    fn next_repeat_statement(&mut self) -> Translate<()> {
        self.expect(TokenKind::Next, "'next'")?;
        if !self.check(&TokenKind::Repeat) {
            return self.unexpected("'repeat' after 'next'");
        }
        if !self.symbols.in_loop() {
            return self.syntax_error("'next repeat' outside of a repeat loop");
        }
        self.advance();
        self.emit_op(Opcode::NextRepeat);
        Ok(())
    }

    /// `go [to] [frame] x [of movie m]`, `go [to] movie m`, `go loop`,
    /// `go next`, `go previous`
    fn go_statement(&mut self) -> Translate<()> {
        self.expect(TokenKind::Go, "'go'")?;
        let selector = match self.peek_kind() {
            TokenKind::Loop => {
                self.advance();
                NavigationSelector::Loop
            }
            TokenKind::Next => {
                self.advance();
                NavigationSelector::Next
            }
            TokenKind::Previous => {
                self.advance();
                NavigationSelector::Previous
            }
            _ => {
                self.match_token(&TokenKind::To);
                self.destination()?
            }
        };
        self.emit_int_push(selector.as_i64());
        self.emit_op(Opcode::Goto);
        Ok(())
    }

    /// `play [frame] x [of movie m]`, `play movie m`, `play done`
    fn play_statement(&mut self) -> Translate<()> {
        self.expect(TokenKind::Play, "'play'")?;
        let selector = if self.match_token(&TokenKind::Done) {
            NavigationSelector::Done
        } else {
            self.destination()?
        };
        self.emit_int_push(selector.as_i64());
        self.emit_op(Opcode::Play);
        Ok(())
    }

    /// Frame and/or movie operands shared by `go` and `play`
    fn destination(&mut self) -> Translate<NavigationSelector> {
        if self.match_token(&TokenKind::Movie) {
            self.expression()?;
            return Ok(NavigationSelector::Movie);
        }
        self.match_token(&TokenKind::Frame);
        self.expression()?;
        if self.match_token(&TokenKind::Of) {
            self.expect(TokenKind::Movie, "'movie' after 'of'")?;
            self.expression()?;
            return Ok(NavigationSelector::FrameOfMovie);
        }
        Ok(NavigationSelector::Frame)
    }

    /// `open doc [with app]`
    fn open_statement(&mut self) -> Translate<()> {
        self.expect(TokenKind::Open, "'open'")?;
        self.expression()?;
        if self.match_token(&TokenKind::With) {
            self.expression()?;
        } else {
            self.emit_op(Opcode::VoidPush);
        }
        self.emit_op(Opcode::Open);
        Ok(())
    }
}
