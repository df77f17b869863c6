//! Function layout.
//!
//! The order of basic blocks in a function and the order of instructions in a
//! block is determined by the `Layout` data structure defined in this module.

use crate::ir::{Block, Inst};
use cranelift_entity::packed_option::PackedOption;
use cranelift_entity::{PrimaryMap, SecondaryMap};

#[derive(Clone, Default)]
struct BlockData {
    insts: Vec<Inst>,
}

/// The `Layout` struct determines the layout of blocks and instructions in a
/// function. It does not contain definitions of instructions or blocks, but
/// depends on `Inst` and `Block` entity references being defined elsewhere.
///
/// Blocks appear in creation order; the first created block is the entry.
pub struct Layout {
    blocks: PrimaryMap<Block, BlockData>,

    /// Which block contains a given instruction, if any.
    inst_blocks: SecondaryMap<Inst, PackedOption<Block>>,
}

impl Layout {
    /// Create a new empty `Layout`.
    pub fn new() -> Self {
        Self {
            blocks: PrimaryMap::new(),
            inst_blocks: SecondaryMap::new(),
        }
    }

    /// Create a new block, appended to the layout order.
    pub fn make_block(&mut self) -> Block {
        self.blocks.push(BlockData::default())
    }

    /// The entry block, or `None` for an empty function.
    pub fn entry_block(&self) -> Option<Block> {
        self.blocks.keys().next()
    }

    /// Number of blocks in the layout.
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Iterate over the blocks in layout order.
    pub fn blocks(&self) -> impl Iterator<Item = Block> + '_ {
        self.blocks.keys()
    }

    /// Append `inst` to the end of `block`.
    pub fn append_inst(&mut self, inst: Inst, block: Block) {
        debug_assert!(self.inst_blocks[inst].is_none(), "instruction already inserted");
        self.blocks[block].insts.push(inst);
        self.inst_blocks[inst] = block.into();
    }

    /// Insert `inst` into `block` at position `index`, shifting later
    /// instructions down.
    pub fn insert_inst(&mut self, inst: Inst, block: Block, index: usize) {
        debug_assert!(self.inst_blocks[inst].is_none(), "instruction already inserted");
        self.blocks[block].insts.insert(index, inst);
        self.inst_blocks[inst] = block.into();
    }

    /// The instructions of `block`, in program order.
    pub fn block_insts(&self, block: Block) -> &[Inst] {
        &self.blocks[block].insts
    }

    /// The block containing `inst`, if it was inserted.
    pub fn inst_block(&self, inst: Inst) -> Option<Block> {
        self.inst_blocks[inst].expand()
    }

    /// The terminator of `block`.
    ///
    /// Panics if the block is empty; every complete block ends in one.
    pub fn terminator(&self, block: Block) -> Inst {
        *self.blocks[block]
            .insts
            .last()
            .expect("block has no terminator")
    }
}
