//! Instruction buffer for compiled Lingo code
//!
//! The buffer is an append-only sequence of fixed-width [`Word`]s. Positions are
//! handed out as [`Mark`]s, which stay valid forever because words are never
//! removed or reordered.
//!
//! Forward references work the same way as branch placeholders in a classic
//! two-pass assembler, except that the second pass happens per construct:
//! - `reserve()` appends placeholder words and returns one [`PatchSlot`] per word
//! - the construct keeps its slots until its closing keyword is seen
//! - `patch()` consumes a slot and writes the final value
//!
//! A `PatchSlot` cannot be cloned, so each one can be patched at most once. The
//! buffer additionally tracks pending words in a bit vector and refuses any
//! write that does not target a pending placeholder.

use crate::lingo_compiler::error::CompilerError;
use crate::lingo_compiler::opcodes::Opcode;
use bitvec::vec::BitVec;
use indexmap::IndexSet;

/// Value written into reserved words until they are patched
pub const PLACEHOLDER_WORD: Word = Word(0xDEAD_BEEF_DEAD_BEEF);

/// One 64-bit instruction word.
///
/// The word is a plain bit pattern; the opcode preceding it decides whether it
/// is read as an opcode, an integer, a float, a string index or an offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Word(u64);

impl Word {
    pub const fn from_raw(raw: u64) -> Self {
        Word(raw)
    }

    pub fn opcode(op: Opcode) -> Self {
        Word(op.as_u64())
    }

    pub fn int(value: i64) -> Self {
        Word(value as u64)
    }

    pub fn float(value: f64) -> Self {
        Word(value.to_bits())
    }

    pub fn string_index(index: usize) -> Self {
        Word(index as u64)
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    pub fn as_int(self) -> i64 {
        self.0 as i64
    }

    pub fn as_float(self) -> f64 {
        f64::from_bits(self.0)
    }

    pub fn as_opcode(self) -> Option<Opcode> {
        Opcode::from_u64(self.0)
    }

    pub fn as_index(self) -> usize {
        self.0 as usize
    }

    pub fn to_le_bytes(self) -> [u8; 8] {
        self.0.to_le_bytes()
    }
}

/// Position of a word in a [`ScriptBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Mark(usize);

impl Mark {
    pub const START: Mark = Mark(0);

    pub fn from_index(index: usize) -> Mark {
        Mark(index)
    }

    pub fn index(self) -> usize {
        self.0
    }

    /// Signed distance from `base` to `self`
    pub fn offset_from(self, base: Mark) -> i64 {
        self.0 as i64 - base.0 as i64
    }

    pub fn next(self) -> Mark {
        Mark(self.0 + 1)
    }
}

/// A reserved word that still has to be written.
///
/// Deliberately neither `Clone` nor `Copy`.
#[derive(Debug, PartialEq, Eq)]
pub struct PatchSlot {
    mark: Mark,
}

impl PatchSlot {
    pub fn mark(&self) -> Mark {
        self.mark
    }
}

/// Consecutive slots handed out by one `reserve()` call.
#[derive(Debug)]
pub struct Reservation {
    first: Mark,
    slots: Vec<PatchSlot>,
}

impl Reservation {
    pub fn first(&self) -> Mark {
        self.first
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn into_slots(self) -> Vec<PatchSlot> {
        self.slots
    }

    /// Split into exactly `N` slots.
    pub fn into_array<const N: usize>(self) -> Result<[PatchSlot; N], CompilerError> {
        let count = self.slots.len();
        self.slots.try_into().map_err(|_| {
            CompilerError::StructuralInvariant(format!(
                "reservation of {} slots split into {}",
                count, N
            ))
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScriptBuffer {
    words: Vec<Word>,
    pending: BitVec,
    strings: IndexSet<String>,
}

impl ScriptBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current length, i.e. the mark the next emitted word will get
    pub fn here(&self) -> Mark {
        Mark(self.words.len())
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn emit(&mut self, word: Word) -> Mark {
        let mark = self.here();
        self.words.push(word);
        self.pending.push(false);
        mark
    }

    pub fn emit_op(&mut self, op: Opcode) -> Mark {
        log::debug!("emit {:>5}: {}", self.words.len(), op);
        self.emit(Word::opcode(op))
    }

    pub fn emit_int(&mut self, value: i64) -> Mark {
        self.emit(Word::int(value))
    }

    pub fn emit_float(&mut self, value: f64) -> Mark {
        self.emit(Word::float(value))
    }

    /// Intern `text` and emit its string-table index
    pub fn emit_string(&mut self, text: &str) -> Mark {
        let index = self.intern(text);
        self.emit(Word::string_index(index))
    }

    pub fn intern(&mut self, text: &str) -> usize {
        match self.strings.get_index_of(text) {
            Some(index) => index,
            None => self.strings.insert_full(text.to_string()).0,
        }
    }

    pub fn string(&self, index: usize) -> Option<&str> {
        self.strings.get_index(index).map(|s| s.as_str())
    }

    pub fn strings(&self) -> impl Iterator<Item = &str> {
        self.strings.iter().map(|s| s.as_str())
    }

    /// Append `count` placeholder words
    pub fn reserve(&mut self, count: usize) -> Reservation {
        let first = self.here();
        let mut slots = Vec::with_capacity(count);
        for _ in 0..count {
            let mark = self.here();
            self.words.push(PLACEHOLDER_WORD);
            self.pending.push(true);
            slots.push(PatchSlot { mark });
        }
        log::debug!(
            "reserve {} slot(s) at {}..{}",
            count,
            first.index(),
            first.index() + count
        );
        Reservation { first, slots }
    }

    /// Write the final value of a reserved word.
    ///
    /// Fails if the word is outside the buffer or no longer pending, either of
    /// which means the translator itself is broken.
    pub fn patch(&mut self, slot: PatchSlot, value: Word) -> Result<(), CompilerError> {
        let index = slot.mark.index();
        if index >= self.words.len() {
            return Err(CompilerError::StructuralInvariant(format!(
                "patch at {} beyond end of buffer ({})",
                index,
                self.words.len()
            )));
        }
        if !self.pending[index] {
            return Err(CompilerError::StructuralInvariant(format!(
                "word {} is not an unresolved slot (holds 0x{:016x})",
                index,
                self.words[index].raw()
            )));
        }
        log::debug!("patch {:>5} <- 0x{:x}", index, value.raw());
        self.words[index] = value;
        self.pending.set(index, false);
        Ok(())
    }

    pub fn word(&self, mark: Mark) -> Option<Word> {
        self.words.get(mark.index()).copied()
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    pub fn is_pending(&self, mark: Mark) -> bool {
        self.pending
            .get(mark.index())
            .map(|bit| *bit)
            .unwrap_or(false)
    }

    pub fn pending_slots(&self) -> Vec<Mark> {
        self.pending.iter_ones().map(Mark).collect()
    }

    /// Neutralise everything emitted since `from`.
    ///
    /// Used by error recovery: the words stay in place but become `NOP`s, and
    /// any slot in the range stops being pending. Returns the number of words
    /// overwritten.
    pub fn void_from(&mut self, from: Mark) -> usize {
        let start = from.index().min(self.words.len());
        let end = self.words.len();
        for index in start..end {
            self.words[index] = Word::opcode(Opcode::Nop);
            self.pending.set(index, false);
        }
        if end > start {
            log::debug!("voided words {}..{}", start, end);
        }
        end - start
    }

    /// Error if any reserved word was never patched
    pub fn verify_resolved(&self) -> Result<(), CompilerError> {
        match self.pending.first_one() {
            None => Ok(()),
            Some(index) => Err(CompilerError::StructuralInvariant(format!(
                "{} unresolved slot(s), first at {}",
                self.pending.count_ones(),
                index
            ))),
        }
    }

    /// Canonical little-endian serialisation of the words
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }
}

#[cfg(test)]
#[path = "script_tests.rs"]
mod tests;
