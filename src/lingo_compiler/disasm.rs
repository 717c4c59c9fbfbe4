// Listing of compiled Lingo bytecode
//
// One instruction per line: mark, opcode name, decoded operands. Offsets are
// shown with the absolute mark they reach.

use crate::lingo_compiler::entities::{entity_name, field_name};
use crate::lingo_compiler::opcodes::{OperandKind, Opcode};
use crate::lingo_compiler::script::{Mark, ScriptBuffer, Word, PLACEHOLDER_WORD};
use crate::lingo_compiler::symbols::DefinitionKind;
use crate::lingo_compiler::CompiledScript;
use std::fmt;

pub struct Listing<'a> {
    code: &'a ScriptBuffer,
}

impl<'a> Listing<'a> {
    pub fn new(code: &'a ScriptBuffer) -> Self {
        Listing { code }
    }

    fn operand(
        &self,
        f: &mut fmt::Formatter,
        op: Opcode,
        index: usize,
        kind: OperandKind,
        owner: usize,
        word: Word,
    ) -> fmt::Result {
        if word == PLACEHOLDER_WORD && self.code.is_pending(Mark::from_index(owner + 1 + index)) {
            return write!(f, " <pending>");
        }
        match kind {
            OperandKind::Int | OperandKind::Count | OperandKind::Flag => {
                write!(f, " {}", word.as_int())
            }
            OperandKind::Float => write!(f, " {}", word.as_float()),
            OperandKind::Str => self.string(f, word),
            OperandKind::Offset => {
                let offset = word.as_int();
                if offset == 0 {
                    write!(f, " +0")
                } else {
                    write!(f, " {:+} (->{})", offset, owner as i64 + offset)
                }
            }
            OperandKind::Step => write!(f, " step {}", word.as_int()),
            OperandKind::Code => {
                let code = word.as_int() as u32;
                let name = match (op, index) {
                    (Opcode::TheEntityPush | Opcode::TheEntityAssign, 0) => entity_name(code),
                    _ => field_name(code),
                };
                match name {
                    Some(name) => write!(f, " {}", name),
                    None => write!(f, " #{}", code),
                }
            }
        }
    }

    fn string(&self, f: &mut fmt::Formatter, word: Word) -> fmt::Result {
        match self.code.string(word.as_index()) {
            Some(text) => write!(f, " {:?}", text),
            None => write!(f, " <string {}>", word.as_index()),
        }
    }
}

impl fmt::Display for Listing<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let words = self.code.words();
        let mut pc = 0;
        while pc < words.len() {
            let Some(op) = words[pc].as_opcode() else {
                writeln!(f, "{:>5}: .word {:#018x}", pc, words[pc].raw())?;
                pc += 1;
                continue;
            };
            write!(f, "{:>5}: {}", pc, op)?;

            let operands = op.operands();
            for (index, &kind) in operands.iter().enumerate() {
                let Some(&word) = words.get(pc + 1 + index) else {
                    write!(f, " <truncated>")?;
                    break;
                };
                self.operand(f, op, index, kind, pc, word)?;
            }
            let mut width = 1 + operands.len();

            // ARGSTORE names follow its count
            if op == Opcode::ArgStore {
                let count = words.get(pc + 1).map_or(0, |word| word.as_int().max(0) as usize);
                for &word in words.iter().skip(pc + width).take(count) {
                    self.string(f, word)?;
                }
                width += count;
            }
            writeln!(f)?;
            pc += width;
        }
        Ok(())
    }
}

pub fn disassemble(code: &ScriptBuffer) -> String {
    Listing::new(code).to_string()
}

/// Top-level code followed by every handler, macro and method
pub fn disassemble_unit(script: &CompiledScript) -> String {
    let mut out = String::from("; top level\n");
    out.push_str(&disassemble(&script.code));
    for handler in script.all_handlers() {
        let heading = match (&handler.factory, handler.kind) {
            (Some(factory), DefinitionKind::Method) => {
                format!("method {}.{}", factory, handler.name)
            }
            _ => format!("{} {}", handler.kind.keyword(), handler.name),
        };
        out.push_str(&format!("\n; {} (arity {})\n", heading, handler.arity));
        out.push_str(&disassemble(&handler.code));
    }
    out
}
