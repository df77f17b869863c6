//! Dominator tree and dominance frontier computation.
//!
//! Both analyses are block-granular: a block's terminator is its only branch,
//! so nothing finer is ever needed here.

use crate::flowgraph::ControlFlowGraph;
use crate::ir::{Block, Function};
use cranelift_entity::packed_option::PackedOption;
use cranelift_entity::{EntitySet, SecondaryMap};

/// The dominator tree of a single function.
///
/// The tree is stored as each reachable block's immediate dominator, next to
/// the CFG postorder the fixed point ran over. Postorder positions double as
/// the comparison key for dominance walks, since a dominator always sits
/// later in the postorder than every block it dominates.
pub struct DominatorTree {
    /// Postorder of the blocks reachable from the entry.
    postorder: Vec<Block>,

    /// Position of each reachable block in `postorder`, plus one. Zero marks
    /// an unreachable block.
    order: SecondaryMap<Block, u32>,

    /// Immediate dominator of each reachable block, `None` for the entry.
    idoms: SecondaryMap<Block, PackedOption<Block>>,

    valid: bool,
}

impl DominatorTree {
    /// Allocate an empty dominator tree. Use `compute` to fill it in.
    pub fn new() -> Self {
        Self {
            postorder: Vec::new(),
            order: SecondaryMap::new(),
            idoms: SecondaryMap::new(),
            valid: false,
        }
    }

    /// Allocate and compute the dominator tree of `func`.
    pub fn with_function(func: &Function, cfg: &ControlFlowGraph) -> Self {
        let mut domtree = Self::new();
        domtree.compute(func, cfg);
        domtree
    }

    /// Recompute the tree for `func`, discarding any previous contents.
    pub fn compute(&mut self, func: &Function, cfg: &ControlFlowGraph) {
        debug_assert!(cfg.is_valid());
        self.clear();
        self.compute_postorder(func, cfg);
        for (position, &block) in self.postorder.iter().enumerate() {
            self.order[block] = position as u32 + 1;
        }
        self.compute_idoms(cfg);
        self.valid = true;
    }

    /// Forget all computed information; `is_valid` reports false afterwards.
    pub fn clear(&mut self) {
        self.postorder.clear();
        self.order.clear();
        self.idoms.clear();
        self.valid = false;
    }

    /// Has `compute` run since the last `clear`?
    ///
    /// Says nothing about whether the tree still matches the CFG; callers
    /// that edit control flow must recompute.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Is `block` reachable from the entry block?
    pub fn is_reachable(&self, block: Block) -> bool {
        self.order[block] != 0
    }

    /// The CFG postorder of the reachable blocks, as cached by `compute`.
    pub fn cfg_postorder(&self) -> &[Block] {
        debug_assert!(self.is_valid());
        &self.postorder
    }

    /// Iterate over the reachable blocks in reverse post-order.
    pub fn cfg_rpo(&self) -> impl Iterator<Item = Block> + '_ {
        debug_assert!(self.is_valid());
        self.postorder.iter().rev().copied()
    }

    /// The immediate dominator of `block`.
    ///
    /// The immediate dominator is the closest of the blocks every entry-to-
    /// `block` path must pass through; the entry block and unreachable blocks
    /// have none.
    pub fn idom(&self, block: Block) -> Option<Block> {
        self.idoms[block].expand()
    }

    /// Does `a` dominate `b`?
    ///
    /// A block dominates itself. Unreachable blocks dominate nothing and are
    /// dominated by nothing.
    pub fn dominates(&self, a: Block, b: Block) -> bool {
        if !self.is_reachable(a) || !self.is_reachable(b) {
            return false;
        }
        // Climb the idom chain from b. Once the finger's postorder position
        // reaches a's, climbing further can only overshoot.
        let mut finger = b;
        while self.order[finger] < self.order[a] {
            finger = match self.idom(finger) {
                Some(up) => up,
                None => return false,
            };
        }
        finger == a
    }

    /// Fill `postorder` by an iterative depth-first walk from the entry.
    ///
    /// Each stack frame remembers how many of its successors it has expanded,
    /// so a block is pushed exactly once and emitted when its last successor
    /// has finished. Unreachable blocks are never touched and keep order
    /// number zero.
    fn compute_postorder(&mut self, func: &Function, cfg: &ControlFlowGraph) {
        let entry = match func.layout.entry_block() {
            Some(entry) => entry,
            None => return,
        };
        let mut seen = EntitySet::new();
        let mut frames: Vec<(Block, usize)> = Vec::new();
        seen.insert(entry);
        frames.push((entry, 0));
        loop {
            let (block, cursor) = match frames.last_mut() {
                Some(frame) => {
                    let snapshot = *frame;
                    frame.1 += 1;
                    snapshot
                }
                None => break,
            };
            match cfg.succs(block).get(cursor) {
                Some(&succ) => {
                    if !seen.contains(succ) {
                        seen.insert(succ);
                        frames.push((succ, 0));
                    }
                }
                None => {
                    frames.pop();
                    self.postorder.push(block);
                }
            }
        }
    }

    /// Compute immediate dominators with the iterative scheme of Cooper,
    /// Harvey and Kennedy: sweep the blocks in reverse post-order,
    /// re-estimating each block's idom as the intersection of its already
    /// processed predecessors, until a sweep changes nothing. Reducible
    /// control flow settles in a single sweep; irreducible loops take a few.
    fn compute_idoms(&mut self, cfg: &ControlFlowGraph) {
        let entry = match self.postorder.last() {
            Some(&entry) => entry,
            None => return,
        };
        let mut changed = true;
        while changed {
            changed = false;
            // The entry sits last in the postorder and has no dominator;
            // everything before it is visited in reverse post-order.
            for position in (0..self.postorder.len() - 1).rev() {
                let block = self.postorder[position];
                let mut estimate = None;
                for &pred in cfg.preds(block) {
                    // A predecessor participates once it has an estimate of
                    // its own. Reverse post-order guarantees at least one
                    // participant even in the first sweep.
                    if pred != entry && (!self.is_reachable(pred) || self.idoms[pred].is_none()) {
                        continue;
                    }
                    estimate = Some(match estimate {
                        None => pred,
                        Some(current) => self.intersect(current, pred),
                    });
                }
                let estimate = estimate.expect("reachable block has no processed predecessor");
                if self.idoms[block].expand() != Some(estimate) {
                    self.idoms[block] = estimate.into();
                    changed = true;
                }
            }
        }
    }

    /// The nearest common dominance ancestor of `a` and `b` under the current
    /// estimates. The finger at the smaller postorder position is the deeper
    /// one and climbs first; both chains end at the entry, which holds the
    /// largest position of all.
    fn intersect(&self, mut a: Block, mut b: Block) -> Block {
        while a != b {
            while self.order[a] < self.order[b] {
                a = self.idoms[a].expect("dominator estimate missing");
            }
            while self.order[b] < self.order[a] {
                b = self.idoms[b].expect("dominator estimate missing");
            }
        }
        a
    }
}

/// The dominance frontier of every block in a function.
///
/// The dominance frontier of block `B` is the set of blocks `D` such that `B`
/// dominates a predecessor of `D` but does not strictly dominate `D` itself;
/// these are exactly the joins where a definition refined below `B` must meet
/// the surrounding definition again.
pub struct DominanceFrontier {
    sets: SecondaryMap<Block, Vec<Block>>,
}

impl DominanceFrontier {
    /// Compute the dominance frontier of every reachable block.
    ///
    /// Uses the Cytron et al. construction: only join blocks (two or more
    /// predecessors) can be in a frontier, and they appear in the frontier of
    /// every block on the idom chains of their predecessors, up to but not
    /// including their own immediate dominator.
    pub fn compute(domtree: &DominatorTree, cfg: &ControlFlowGraph) -> Self {
        let mut sets: SecondaryMap<Block, Vec<Block>> = SecondaryMap::new();
        for block in domtree.cfg_rpo() {
            if cfg.preds(block).len() < 2 {
                continue;
            }
            let idom = domtree.idom(block);
            for &pred in cfg.preds(block) {
                if !domtree.is_reachable(pred) {
                    continue;
                }
                let mut runner = pred;
                while Some(runner) != idom {
                    if !sets[runner].contains(&block) {
                        sets[runner].push(block);
                    }
                    runner = match domtree.idom(runner) {
                        Some(up) => up,
                        None => break,
                    };
                }
            }
        }
        Self { sets }
    }

    /// The dominance frontier of `block`.
    pub fn frontier(&self, block: Block) -> &[Block] {
        &self.sets[block]
    }
}
