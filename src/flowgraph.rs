//! A control flow graph represented as mappings of basic blocks to their
//! predecessors and successors.
//!
//! Both sides are plain blocks: a block transfers control only through its
//! terminator, so the branch instruction of an edge is always recoverable.
//!
//! A predecessor is recorded once per incoming edge, so a `brif` with both
//! destinations equal to the same block contributes two entries.

use crate::ir::{Block, Function};
use cranelift_entity::SecondaryMap;

/// The control flow graph maps all blocks in a function to their predecessor
/// and successor blocks.
pub struct ControlFlowGraph {
    preds: SecondaryMap<Block, Vec<Block>>,
    succs: SecondaryMap<Block, Vec<Block>>,
    valid: bool,
}

impl ControlFlowGraph {
    /// Allocate a new blank control flow graph.
    pub fn new() -> Self {
        Self {
            preds: SecondaryMap::new(),
            succs: SecondaryMap::new(),
            valid: false,
        }
    }

    /// Allocate and compute the control flow graph for `func`.
    pub fn with_function(func: &Function) -> Self {
        let mut cfg = Self::new();
        cfg.compute(func);
        cfg
    }

    /// Compute the control flow graph of `func`.
    ///
    /// This will clear and overwrite any information already stored in this
    /// data structure.
    pub fn compute(&mut self, func: &Function) {
        self.clear();
        for block in func.layout.blocks() {
            if func.layout.block_insts(block).is_empty() {
                continue;
            }
            let terminator = func.layout.terminator(block);
            for succ in func.dfg.inst(terminator).branch_destinations() {
                self.succs[block].push(succ);
                self.preds[succ].push(block);
            }
        }
        self.valid = true;
    }

    /// Clear all data structures in this control flow graph.
    pub fn clear(&mut self) {
        self.preds.clear();
        self.succs.clear();
        self.valid = false;
    }

    /// Check if the CFG is in a valid state.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// The predecessor blocks of `block`, one entry per incoming edge.
    pub fn preds(&self, block: Block) -> &[Block] {
        &self.preds[block]
    }

    /// The successor blocks of `block`.
    pub fn succs(&self, block: Block) -> &[Block] {
        &self.succs[block]
    }

    /// The sole predecessor of `block`, if it has exactly one incoming edge.
    pub fn single_pred(&self, block: Block) -> Option<Block> {
        match self.preds[block].as_slice() {
            &[pred] => Some(pred),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{FunctionBuilder, IntCC, Type};

    #[test]
    fn empty() {
        let func = Function::with_name("empty");
        let cfg = ControlFlowGraph::with_function(&func);
        assert!(cfg.is_valid());
    }

    #[test]
    fn branches_and_jumps() {
        let mut func = Function::with_name("f");
        let mut b = FunctionBuilder::new(&mut func);
        let a = b.arg(Type::I32);
        let n = b.arg(Type::I32);

        let entry = b.create_block();
        let then_block = b.create_block();
        let merge = b.create_block();

        b.switch_to_block(entry);
        let c = b.icmp(IntCC::SignedLessThan, a, n);
        b.brif(c, then_block, merge);

        b.switch_to_block(then_block);
        b.jump(merge);

        b.switch_to_block(merge);
        b.ret(None);

        let cfg = ControlFlowGraph::with_function(&func);
        assert_eq!(cfg.succs(entry), &[then_block, merge]);
        assert_eq!(cfg.preds(then_block), &[entry]);
        assert_eq!(cfg.preds(merge), &[entry, then_block]);
        assert_eq!(cfg.single_pred(then_block), Some(entry));
        assert_eq!(cfg.single_pred(merge), None);
        assert_eq!(cfg.preds(entry), &[]);
    }
}
