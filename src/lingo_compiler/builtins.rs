// Built-in commands, functions and constants
//
// Calls to names outside this table compile exactly like calls to built-ins;
// the table drives constant pushes, argument-count warnings, the immediate
// flag and one-operand function application without parentheses.

use crate::lingo_compiler::symbols::fold_name;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstantValue {
    Int(i64),
    Str(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BuiltinKind {
    /// Statement-position command (`beep`, `puppetSprite 1, TRUE`)
    Command,
    /// Value-returning function (`sqrt(x)`)
    Function,
    /// Folded to a literal push at compile time
    Constant(ConstantValue),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Builtin {
    pub name: &'static str,
    pub kind: BuiltinKind,
    pub min_args: usize,
    /// `None` for variadic built-ins
    pub max_args: Option<usize>,
    /// Executed by the engine as soon as it is parsed
    pub immediate: bool,
}

impl Builtin {
    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min_args && self.max_args.map_or(true, |max| count <= max)
    }
}

const fn command(name: &'static str, min_args: usize, max_args: usize) -> Builtin {
    Builtin {
        name,
        kind: BuiltinKind::Command,
        min_args,
        max_args: Some(max_args),
        immediate: false,
    }
}

const fn function(name: &'static str, min_args: usize, max_args: usize) -> Builtin {
    Builtin {
        name,
        kind: BuiltinKind::Function,
        min_args,
        max_args: Some(max_args),
        immediate: false,
    }
}

const fn constant(name: &'static str, value: ConstantValue) -> Builtin {
    Builtin {
        name,
        kind: BuiltinKind::Constant(value),
        min_args: 0,
        max_args: Some(0),
        immediate: false,
    }
}

const BUILTINS: &[Builtin] = &[
    // Commands
    command("alert", 1, 1),
    command("beep", 0, 1),
    command("clearGlobals", 0, 0),
    command("closeDA", 0, 0),
    command("closeResFile", 0, 1),
    command("closeXlib", 0, 1),
    command("continue", 0, 0),
    command("cursor", 1, 1),
    command("delay", 1, 1),
    command("dontPassEvent", 0, 0),
    command("installMenu", 1, 1),
    command("nothing", 0, 0),
    command("openResFile", 1, 1),
    command("openXlib", 1, 1),
    command("pass", 0, 0),
    command("pause", 0, 0),
    command("preLoad", 0, 2),
    command("preLoadCast", 0, 2),
    command("printFrom", 1, 3),
    command("puppetPalette", 1, 3),
    command("puppetSound", 1, 2),
    command("puppetSprite", 2, 2),
    command("puppetTempo", 1, 1),
    command("puppetTransition", 1, 5),
    command("quit", 0, 0),
    command("restart", 0, 0),
    command("showGlobals", 0, 0),
    command("showLocals", 0, 0),
    command("shutDown", 0, 0),
    command("spriteBox", 5, 5),
    command("updateStage", 0, 0),
    command("zoomBox", 2, 3),
    Builtin {
        name: "playAccel",
        kind: BuiltinKind::Command,
        min_args: 1,
        max_args: None,
        immediate: true,
    },
    // Functions
    function("abs", 1, 1),
    function("atan", 1, 1),
    function("cos", 1, 1),
    function("exp", 1, 1),
    function("float", 1, 1),
    function("integer", 1, 1),
    function("log", 1, 1),
    function("pi", 0, 0),
    function("power", 2, 2),
    function("random", 1, 1),
    function("sin", 1, 1),
    function("sqrt", 1, 1),
    function("tan", 1, 1),
    function("chars", 3, 3),
    function("charToNum", 1, 1),
    function("length", 1, 1),
    function("numToChar", 1, 1),
    function("offset", 2, 2),
    function("string", 1, 1),
    function("value", 1, 1),
    function("ilk", 1, 2),
    function("count", 1, 1),
    function("getAt", 2, 2),
    function("getProp", 2, 2),
    function("add", 2, 2),
    function("append", 2, 2),
    function("rollOver", 1, 1),
    function("soundBusy", 1, 1),
    function("marker", 1, 1),
    function("label", 1, 1),
    Builtin {
        name: "list",
        kind: BuiltinKind::Function,
        min_args: 0,
        max_args: None,
        immediate: false,
    },
    // Constants
    constant("TRUE", ConstantValue::Int(1)),
    constant("FALSE", ConstantValue::Int(0)),
    constant("EMPTY", ConstantValue::Str("")),
    constant("RETURN", ConstantValue::Str("\r")),
    constant("QUOTE", ConstantValue::Str("\"")),
    constant("SPACE", ConstantValue::Str(" ")),
    constant("TAB", ConstantValue::Str("\t")),
    constant("ENTER", ConstantValue::Str("\u{3}")),
    constant("BACKSPACE", ConstantValue::Str("\u{8}")),
];

lazy_static! {
    static ref BUILTIN_TABLE: HashMap<String, &'static Builtin> =
        BUILTINS.iter().map(|b| (fold_name(b.name), b)).collect();
}

pub fn lookup_builtin(name: &str) -> Option<&'static Builtin> {
    BUILTIN_TABLE.get(&fold_name(name)).copied()
}
