//! Backpatch resolution for control-flow constructs
//!
//! Every construct that reserves slots (if chains, repeat loops, tell, when)
//! collects a [`Fixups`] list while it is being translated and resolves it in a
//! single pass at its own closing keyword. Nothing stays pending across
//! constructs, so the buffer's pending set is empty between statements.

use crate::lingo_compiler::error::CompilerError;
use crate::lingo_compiler::script::{Mark, PatchSlot, ScriptBuffer, Word};

/// One deferred write into a reserved slot
#[derive(Debug)]
pub enum Relocation {
    /// Write `target - owner`
    Offset {
        slot: PatchSlot,
        owner: Mark,
        target: Mark,
    },
    /// Write a value that was only known after reservation (loop step, flags)
    Value { slot: PatchSlot, word: Word },
}

#[derive(Debug, Default)]
pub struct Fixups {
    relocations: Vec<Relocation>,
}

impl Fixups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offset(&mut self, slot: PatchSlot, owner: Mark, target: Mark) {
        self.relocations.push(Relocation::Offset {
            slot,
            owner,
            target,
        });
    }

    pub fn value(&mut self, slot: PatchSlot, word: Word) {
        self.relocations.push(Relocation::Value { slot, word });
    }

    pub fn len(&self) -> usize {
        self.relocations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relocations.is_empty()
    }

    /// Patch every recorded slot; returns how many were written.
    pub fn resolve(self, script: &mut ScriptBuffer) -> Result<usize, CompilerError> {
        let count = self.relocations.len();
        for relocation in self.relocations {
            match relocation {
                Relocation::Offset {
                    slot,
                    owner,
                    target,
                } => {
                    if target < owner {
                        return Err(CompilerError::StructuralInvariant(format!(
                            "backward offset from {} to {}",
                            owner.index(),
                            target.index()
                        )));
                    }
                    script.patch(slot, Word::int(target.offset_from(owner)))?;
                }
                Relocation::Value { slot, word } => script.patch(slot, word)?,
            }
        }
        log::debug!("resolved {} relocation(s)", count);
        Ok(count)
    }
}
