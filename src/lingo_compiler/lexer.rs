// Lingo Lexer
// Reference token source: turns script text into the token stream the
// translator consumes. Any `Iterator<Item = Token>` can stand in for it.

use crate::lingo_compiler::entities::{
    lookup_entity, lookup_field, EntityRef, ObjectFieldRef, NO_FIELD,
};
use crate::lingo_compiler::symbols::fold_name;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, line: usize, column: usize) -> Self {
        Token { kind, line, column }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Integer(i64),
    Float(f64),
    String(String),
    Symbol(String),
    Identifier(String),
    TheEntity(EntityRef),
    TheEntityWithId(EntityRef),
    TheObjectField(ObjectFieldRef),

    // Keywords
    If,
    Then,
    Else,
    Elsif,
    End,
    Repeat,
    While,
    With,
    To,
    Down,
    Tell,
    When,
    Global,
    Property,
    Instance,
    Macro,
    Factory,
    Method,
    On,
    Exit,
    Next,
    Go,
    Play,
    Put,
    Set,
    Into,
    After,
    Before,
    Of,
    Loop,
    Movie,
    Frame,
    Previous,
    Done,
    Open,
    Sprite,
    Intersects,
    Within,
    Char,
    Item,
    Line,
    Word,
    And,
    Or,
    Not,
    Mod,
    Contains,
    Starts,

    // Operators
    Plus,            // +
    Minus,           // -
    Star,            // *
    Slash,           // /
    Less,            // <
    LessEqual,       // <=
    Greater,         // >
    GreaterEqual,    // >=
    Equal,           // =
    NotEqual,        // <>
    Ampersand,       // &
    DoubleAmpersand, // &&

    // Punctuation
    LeftParen,    // (
    RightParen,   // )
    LeftBracket,  // [
    RightBracket, // ]
    Comma,        // ,
    Colon,        // :

    // Statement separator
    Newline,
    Eof,

    // Lexical problem, reported by the translator as a syntax error
    Error(String),
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(text) = keyword_text(self) {
            return write!(f, "'{}'", text);
        }
        match self {
            TokenKind::Integer(n) => write!(f, "{}", n),
            TokenKind::Float(x) => write!(f, "{}", x),
            TokenKind::String(s) => write!(f, "\"{}\"", s),
            TokenKind::Symbol(s) => write!(f, "#{}", s),
            TokenKind::Identifier(s) => write!(f, "'{}'", s),
            TokenKind::TheEntity(_) | TokenKind::TheEntityWithId(_) => write!(f, "'the' property"),
            TokenKind::TheObjectField(r) => write!(f, "'the' field of '{}'", r.object),
            TokenKind::Plus => write!(f, "'+'"),
            TokenKind::Minus => write!(f, "'-'"),
            TokenKind::Star => write!(f, "'*'"),
            TokenKind::Slash => write!(f, "'/'"),
            TokenKind::Less => write!(f, "'<'"),
            TokenKind::LessEqual => write!(f, "'<='"),
            TokenKind::Greater => write!(f, "'>'"),
            TokenKind::GreaterEqual => write!(f, "'>='"),
            TokenKind::Equal => write!(f, "'='"),
            TokenKind::NotEqual => write!(f, "'<>'"),
            TokenKind::Ampersand => write!(f, "'&'"),
            TokenKind::DoubleAmpersand => write!(f, "'&&'"),
            TokenKind::LeftParen => write!(f, "'('"),
            TokenKind::RightParen => write!(f, "')'"),
            TokenKind::LeftBracket => write!(f, "'['"),
            TokenKind::RightBracket => write!(f, "']'"),
            TokenKind::Comma => write!(f, "','"),
            TokenKind::Colon => write!(f, "':'"),
            TokenKind::Newline => write!(f, "end of line"),
            TokenKind::Eof => write!(f, "end of script"),
            TokenKind::Error(msg) => write!(f, "invalid input ({})", msg),
            _ => write!(f, "{:?}", self),
        }
    }
}

const KEYWORDS: &[(&str, TokenKind)] = &[
    ("if", TokenKind::If),
    ("then", TokenKind::Then),
    ("else", TokenKind::Else),
    ("elsif", TokenKind::Elsif),
    ("end", TokenKind::End),
    ("repeat", TokenKind::Repeat),
    ("while", TokenKind::While),
    ("with", TokenKind::With),
    ("to", TokenKind::To),
    ("down", TokenKind::Down),
    ("tell", TokenKind::Tell),
    ("when", TokenKind::When),
    ("global", TokenKind::Global),
    ("property", TokenKind::Property),
    ("instance", TokenKind::Instance),
    ("macro", TokenKind::Macro),
    ("factory", TokenKind::Factory),
    ("method", TokenKind::Method),
    ("on", TokenKind::On),
    ("exit", TokenKind::Exit),
    ("next", TokenKind::Next),
    ("go", TokenKind::Go),
    ("play", TokenKind::Play),
    ("put", TokenKind::Put),
    ("set", TokenKind::Set),
    ("into", TokenKind::Into),
    ("after", TokenKind::After),
    ("before", TokenKind::Before),
    ("of", TokenKind::Of),
    ("loop", TokenKind::Loop),
    ("movie", TokenKind::Movie),
    ("frame", TokenKind::Frame),
    ("previous", TokenKind::Previous),
    ("done", TokenKind::Done),
    ("open", TokenKind::Open),
    ("sprite", TokenKind::Sprite),
    ("intersects", TokenKind::Intersects),
    ("within", TokenKind::Within),
    ("char", TokenKind::Char),
    ("item", TokenKind::Item),
    ("line", TokenKind::Line),
    ("word", TokenKind::Word),
    ("and", TokenKind::And),
    ("or", TokenKind::Or),
    ("not", TokenKind::Not),
    ("mod", TokenKind::Mod),
    ("contains", TokenKind::Contains),
    ("starts", TokenKind::Starts),
];

fn keyword_text(kind: &TokenKind) -> Option<&'static str> {
    KEYWORDS
        .iter()
        .find(|(_, keyword)| keyword == kind)
        .map(|(text, _)| *text)
}

fn keyword(word: &str) -> Option<TokenKind> {
    let folded = fold_name(word);
    KEYWORDS
        .iter()
        .find(|(text, _)| *text == folded)
        .map(|(_, kind)| kind.clone())
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    finished: bool,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            finished: false,
        }
    }

    /// Collect the whole stream, ending with `Eof`
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        for token in &mut self {
            tokens.push(token);
        }
        tokens
    }

    fn current(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, ahead: usize) -> Option<char> {
        self.input.get(self.position + ahead).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.current()?;
        self.position += 1;
        if ch == '\n' || (ch == '\r' && self.current() != Some('\n')) {
            self.line += 1;
            self.column = 1;
        } else if ch != '\r' {
            self.column += 1;
        }
        Some(ch)
    }

    fn save(&self) -> (usize, usize, usize) {
        (self.position, self.line, self.column)
    }

    fn restore(&mut self, saved: (usize, usize, usize)) {
        self.position = saved.0;
        self.line = saved.1;
        self.column = saved.2;
    }

    /// Skip blanks, comments and line continuations, but not newlines
    fn skip_blanks(&mut self) {
        while let Some(ch) = self.current() {
            match ch {
                ' ' | '\t' => {
                    self.advance();
                }
                '-' if self.peek_char(1) == Some('-') => {
                    while let Some(c) = self.current() {
                        if c == '\n' || c == '\r' {
                            break;
                        }
                        self.advance();
                    }
                }
                '\\' | '¬' => {
                    let saved = self.save();
                    self.advance();
                    while matches!(self.current(), Some(' ') | Some('\t')) {
                        self.advance();
                    }
                    match self.current() {
                        Some('\r') => {
                            self.advance();
                            if self.current() == Some('\n') {
                                self.advance();
                            }
                        }
                        Some('\n') => {
                            self.advance();
                        }
                        _ => {
                            self.restore(saved);
                            return;
                        }
                    }
                }
                _ => return,
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut text = String::new();
        while let Some(ch) = self.current() {
            if ch.is_alphanumeric() || ch == '_' {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        text
    }

    fn read_number(&mut self) -> TokenKind {
        let mut text = String::new();
        while let Some(ch) = self.current().filter(|c| c.is_ascii_digit()) {
            text.push(ch);
            self.advance();
        }

        let is_float = self.current() == Some('.')
            && self.peek_char(1).map_or(false, |c| c.is_ascii_digit());
        if is_float {
            text.push('.');
            self.advance();
            while let Some(ch) = self.current().filter(|c| c.is_ascii_digit()) {
                text.push(ch);
                self.advance();
            }
            return match text.parse::<f64>() {
                Ok(value) => TokenKind::Float(value),
                Err(_) => TokenKind::Error(format!("invalid number '{}'", text)),
            };
        }

        match text.parse::<i64>() {
            Ok(value) => TokenKind::Integer(value),
            Err(_) => TokenKind::Error(format!("integer '{}' out of range", text)),
        }
    }

    fn read_string(&mut self) -> TokenKind {
        self.advance(); // opening quote
        let mut text = String::new();
        loop {
            match self.current() {
                Some('"') => {
                    self.advance();
                    return TokenKind::String(text);
                }
                Some('\n') | Some('\r') | None => {
                    return TokenKind::Error("unterminated string".to_string());
                }
                Some(ch) => {
                    text.push(ch);
                    self.advance();
                }
            }
        }
    }

    /// `the <name>`, `the <field> of <entity>` or `the <field> of <object>`
    fn read_the_reference(&mut self) -> TokenKind {
        self.skip_blanks();
        let property = self.read_identifier();
        if property.is_empty() {
            return TokenKind::Error("expected a property name after 'the'".to_string());
        }

        let before_of = self.save();
        self.skip_blanks();
        let of_word = self.read_identifier();
        if fold_name(&of_word) == "of" {
            self.skip_blanks();
            let owner = self.read_identifier();
            if owner.is_empty() {
                return TokenKind::Error(format!("expected a name after 'the {} of'", property));
            }
            let Some(field) = lookup_field(&property) else {
                return TokenKind::Error(format!("unknown field '{}'", property));
            };
            return match lookup_entity(&owner) {
                Some(info) if info.takes_id => TokenKind::TheEntityWithId(EntityRef {
                    entity: info.code,
                    field,
                }),
                Some(_) => TokenKind::Error(format!("'{}' does not take an id", owner)),
                None => TokenKind::TheObjectField(ObjectFieldRef {
                    object: owner,
                    field,
                }),
            };
        }

        self.restore(before_of);
        match lookup_entity(&property) {
            Some(info) if !info.takes_id => TokenKind::TheEntity(EntityRef {
                entity: info.code,
                field: NO_FIELD,
            }),
            Some(_) => TokenKind::Error(format!("'the {}' needs 'of'", property)),
            None => TokenKind::Error(format!("unknown entity '{}'", property)),
        }
    }

    fn next_kind(&mut self) -> TokenKind {
        let Some(ch) = self.current() else {
            return TokenKind::Eof;
        };

        if ch.is_alphabetic() || ch == '_' {
            let word = self.read_identifier();
            if fold_name(&word) == "the" {
                return self.read_the_reference();
            }
            return keyword(&word).unwrap_or(TokenKind::Identifier(word));
        }
        if ch.is_ascii_digit() {
            return self.read_number();
        }

        match ch {
            '"' => self.read_string(),
            '\n' => {
                self.advance();
                TokenKind::Newline
            }
            '\r' => {
                self.advance();
                if self.current() == Some('\n') {
                    self.advance();
                }
                TokenKind::Newline
            }
            '#' => {
                self.advance();
                let name = self.read_identifier();
                if name.is_empty() {
                    TokenKind::Error("expected a symbol name after '#'".to_string())
                } else {
                    TokenKind::Symbol(name)
                }
            }
            '<' => {
                self.advance();
                match self.current() {
                    Some('=') => {
                        self.advance();
                        TokenKind::LessEqual
                    }
                    Some('>') => {
                        self.advance();
                        TokenKind::NotEqual
                    }
                    _ => TokenKind::Less,
                }
            }
            '>' => {
                self.advance();
                if self.current() == Some('=') {
                    self.advance();
                    TokenKind::GreaterEqual
                } else {
                    TokenKind::Greater
                }
            }
            '&' => {
                self.advance();
                if self.current() == Some('&') {
                    self.advance();
                    TokenKind::DoubleAmpersand
                } else {
                    TokenKind::Ampersand
                }
            }
            _ => {
                self.advance();
                match ch {
                    '+' => TokenKind::Plus,
                    '-' => TokenKind::Minus,
                    '*' => TokenKind::Star,
                    '/' => TokenKind::Slash,
                    '=' => TokenKind::Equal,
                    '(' => TokenKind::LeftParen,
                    ')' => TokenKind::RightParen,
                    '[' => TokenKind::LeftBracket,
                    ']' => TokenKind::RightBracket,
                    ',' => TokenKind::Comma,
                    ':' => TokenKind::Colon,
                    other => TokenKind::Error(format!("unexpected character '{}'", other)),
                }
            }
        }
    }
}

impl Iterator for Lexer {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }
        self.skip_blanks();
        let (line, column) = (self.line, self.column);
        let kind = self.next_kind();
        if kind == TokenKind::Eof {
            self.finished = true;
        }
        Some(Token::new(kind, line, column))
    }
}

#[cfg(test)]
#[path = "lexer_tests.rs"]
mod tests;
