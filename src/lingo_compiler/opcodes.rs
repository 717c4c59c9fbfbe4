//! Lingo VM opcodes
//!
//! Every instruction starts with one opcode word followed by a fixed number of
//! operand words (see [`Opcode::operands`]). `ARGSTORE` is the only
//! variable-length instruction: its count operand is followed by that many
//! string operands.
//!
//! Offsets stored in control-flow slots are relative to the opcode word of the
//! instruction that owns them.

use std::fmt;

/// Kind of a single operand word following an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    /// Signed integer literal or small constant
    Int,
    /// IEEE-754 double stored as raw bits
    Float,
    /// Index into the buffer's string table
    Str,
    /// Relative offset from the owning opcode word, patched after emission
    Offset,
    /// Entity or field code
    Code,
    /// Argument or element count
    Count,
    /// Loop step: 1 or the all-ones word (-1)
    Step,
    /// 0 or 1
    Flag,
}

macro_rules! opcodes {
    ($($name:ident = $value:literal, $text:literal, [$($operand:ident),*];)*) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Opcode {
            $($name = $value,)*
        }

        impl Opcode {
            pub const ALL: &'static [Opcode] = &[$(Opcode::$name,)*];

            pub fn name(self) -> &'static str {
                match self {
                    $(Opcode::$name => $text,)*
                }
            }

            pub fn operands(self) -> &'static [OperandKind] {
                match self {
                    $(Opcode::$name => &[$(OperandKind::$operand),*],)*
                }
            }

            pub fn from_u64(value: u64) -> Option<Opcode> {
                match value {
                    $($value => Some(Opcode::$name),)*
                    _ => None,
                }
            }
        }
    };
}

opcodes! {
    Stop = 0, "STOP", [];
    Nop = 1, "NOP", [];

    // Literals and variables
    IntPush = 2, "INTPUSH", [Int];
    FloatPush = 3, "FLOATPUSH", [Float];
    StringPush = 4, "STRINGPUSH", [Str];
    SymbolPush = 5, "SYMBOLPUSH", [Str];
    VoidPush = 6, "VOIDPUSH", [];
    Eval = 7, "EVAL", [Str];
    VarPush = 8, "VARPUSH", [Str];
    Assign = 9, "ASSIGN", [];
    After = 10, "AFTER", [];
    Before = 11, "BEFORE", [];
    Swap = 12, "SWAP", [];
    ArrayPush = 13, "ARRAYPUSH", [Count];
    PropArrayPush = 14, "PROPARRAYPUSH", [Count];

    // Built-in properties
    TheEntityPush = 20, "THEENTITYPUSH", [Code, Code];
    TheEntityAssign = 21, "THEENTITYASSIGN", [Code, Code];
    ObjectFieldPush = 22, "OBJECTFIELDPUSH", [Str, Code];
    ObjectFieldAssign = 23, "OBJECTFIELDASSIGN", [Str, Code];

    // Arithmetic
    Add = 30, "ADD", [];
    Sub = 31, "SUB", [];
    Mul = 32, "MUL", [];
    Div = 33, "DIV", [];
    Mod = 34, "MOD", [];
    Negate = 35, "NEGATE", [];

    // Comparison and logic
    Gt = 40, "GT", [];
    Lt = 41, "LT", [];
    Eq = 42, "EQ", [];
    Neq = 43, "NEQ", [];
    Ge = 44, "GE", [];
    Le = 45, "LE", [];
    And = 46, "AND", [];
    Or = 47, "OR", [];
    Not = 48, "NOT", [];

    // Strings and sprites
    Ampersand = 50, "AMPERSAND", [];
    Concat = 51, "CONCAT", [];
    Contains = 52, "CONTAINS", [];
    Starts = 53, "STARTS", [];
    Intersects = 54, "INTERSECTS", [];
    Within = 55, "WITHIN", [];

    // Chunk expressions
    CharOf = 60, "CHAROF", [];
    CharToOf = 61, "CHARTOOF", [];
    ItemOf = 62, "ITEMOF", [];
    ItemToOf = 63, "ITEMTOOF", [];
    LineOf = 64, "LINEOF", [];
    LineToOf = 65, "LINETOOF", [];
    WordOf = 66, "WORDOF", [];
    WordToOf = 67, "WORDTOOF", [];

    // Calls; the flag word is the immediate marker
    Call = 70, "CALL", [Str, Count, Flag];
    ProcCall = 71, "PROCCALL", [Str, Count, Flag];
    PrintTop = 72, "PRINTTOP", [];

    // Control flow
    If = 80, "IF", [Offset, Offset, Offset, Flag];
    RepeatWhile = 81, "REPEATWHILE", [Offset, Offset];
    RepeatWith = 82, "REPEATWITH", [Offset, Offset, Offset, Step, Offset, Str];
    ExitRepeat = 83, "EXITREPEAT", [];
    NextRepeat = 84, "NEXTREPEAT", [];
    TellCode = 85, "TELLCODE", [Offset];
    WhenCode = 86, "WHENCODE", [Offset, Str];
    Goto = 87, "GOTO", [];
    Play = 88, "PLAY", [];
    Open = 89, "OPEN", [];

    // Declarations and definitions
    Global = 90, "GLOBAL", [Str];
    Property = 91, "PROPERTY", [Str];
    Instance = 92, "INSTANCE", [Str];
    ArgStore = 93, "ARGSTORE", [Count];
    Return = 94, "RETURN", [];
}

impl Opcode {
    pub fn as_u64(self) -> u64 {
        self as u64
    }

    /// Number of words the instruction occupies, or `None` for `ARGSTORE`
    /// whose length depends on its count operand.
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            Opcode::ArgStore => None,
            _ => Some(1 + self.operands().len()),
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Selector pushed before the shared `GOTO` / `PLAY` opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationSelector {
    /// `go to frame X` - frame expression on the stack
    Frame = 1,
    /// `go previous`
    Previous = 2,
    /// `go next`
    Next = 3,
    /// `go loop`
    Loop = 4,
    /// `go to movie M` - movie expression on the stack
    Movie = 5,
    /// `go to frame X of movie M` - frame then movie on the stack
    FrameOfMovie = 6,
    /// `play done`
    Done = 7,
}

impl NavigationSelector {
    pub fn as_i64(self) -> i64 {
        self as i64
    }

    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            1 => Some(NavigationSelector::Frame),
            2 => Some(NavigationSelector::Previous),
            3 => Some(NavigationSelector::Next),
            4 => Some(NavigationSelector::Loop),
            5 => Some(NavigationSelector::Movie),
            6 => Some(NavigationSelector::FrameOfMovie),
            7 => Some(NavigationSelector::Done),
            _ => None,
        }
    }
}
