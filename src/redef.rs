//! Integer live-range splitting.
//!
//! For every conditional branch on an integer comparison, the pass inserts a
//! single-incoming "sigma" phi at the top of each successor that has exactly
//! one predecessor, one per comparison operand that is refined there. Uses
//! dominated by the successor are rewritten to the sigma, so the refined fact
//! implied by the branch can later be attached to a distinct value. Where the
//! refined live range meets the surrounding one again, at the successor's
//! dominance frontier, ordinary multi-incoming phis are inserted to carry the
//! sigma through the join.
//!
//! The inserted joins are semantically copies of their sources; the pass never
//! changes the observable behavior of the function, and the CFG is untouched.

use crate::dominator_tree::{DominanceFrontier, DominatorTree};
use crate::flowgraph::ControlFlowGraph;
use crate::ir::{Block, Function, Inst, InstructionData, Opcode, Value, ValueDef};
use log::trace;
use rustc_hash::FxHashMap;

/// The redefinition map produced by live-range splitting: for each block, the
/// sigma carrying each original value into it.
pub struct Redef {
    redefs: FxHashMap<(Block, Value), Inst>,
}

impl Redef {
    /// Split live ranges in `func` and build the redefinition map.
    ///
    /// `cfg`, `domtree` and `frontier` must have been computed for `func`.
    /// Only phis are inserted, so all three stay valid afterwards.
    pub fn run(
        func: &mut Function,
        cfg: &ControlFlowGraph,
        domtree: &DominatorTree,
        frontier: &DominanceFrontier,
    ) -> Self {
        let mut splitter = Splitter {
            func: &mut *func,
            cfg,
            domtree,
            frontier,
        };
        splitter.create_sigmas();

        // Every single-incoming phi leading a block is a redefinition of its
        // incoming value there, whether this run created it or an earlier one
        // did; rebuilding the map from scratch keeps `run` idempotent.
        let mut redefs = FxHashMap::default();
        for block in func.layout.blocks() {
            for &inst in func.layout.block_insts(block) {
                match func.dfg.inst(inst) {
                    InstructionData::Phi { incoming } => {
                        if let &[(_, value)] = incoming.as_slice() {
                            redefs.insert((block, value), inst);
                        }
                    }
                    _ => break,
                }
            }
        }
        Self { redefs }
    }

    /// The sigma redefining `value` at the top of `block`, if there is one.
    pub fn redef(&self, value: Value, block: Block) -> Option<Inst> {
        self.redefs.get(&(block, value)).copied()
    }

    /// Is `inst` a sigma: a single-incoming phi recorded as the redefinition
    /// of its incoming value in its block?
    pub fn is_sigma(&self, func: &Function, inst: Inst) -> bool {
        match func.dfg.inst(inst) {
            InstructionData::Phi { incoming } => match incoming.as_slice() {
                &[(_, value)] => {
                    let block = func.layout.inst_block(inst).expect("phi not in layout");
                    self.redef(value, block) == Some(inst)
                }
                _ => false,
            },
            _ => false,
        }
    }

    /// Number of recorded redefinitions.
    pub fn len(&self) -> usize {
        self.redefs.len()
    }

    /// True if no redefinitions were recorded.
    pub fn is_empty(&self) -> bool {
        self.redefs.is_empty()
    }
}

struct Splitter<'a> {
    func: &'a mut Function,
    cfg: &'a ControlFlowGraph,
    domtree: &'a DominatorTree,
    frontier: &'a DominanceFrontier,
}

impl<'a> Splitter<'a> {
    /// Values are redefinable if they are not constants. (Every value in this
    /// IR is an integer.)
    fn is_redefinable(&self, value: Value) -> bool {
        !self.func.dfg.is_const(value)
    }

    /// Create sigma nodes for all branches in the function.
    fn create_sigmas(&mut self) {
        let blocks: Vec<Block> = self.func.layout.blocks().collect();
        for block in blocks {
            if self.func.layout.block_insts(block).is_empty() {
                continue;
            }
            let terminator = self.func.layout.terminator(block);
            if let InstructionData::Brif { arg, destinations } = *self.func.dfg.inst(terminator) {
                if let Some((left, right)) = self.branch_compare_operands(arg) {
                    self.create_sigmas_for_branch(left, right, destinations);
                }
            }
        }
    }

    /// The operands of the integer comparison controlling a branch, if its
    /// condition is defined by an `icmp`.
    fn branch_compare_operands(&self, cond: Value) -> Option<(Value, Value)> {
        match self.func.dfg.value_def(cond) {
            ValueDef::Result(inst) => match *self.func.dfg.inst(inst) {
                InstructionData::IntCompare { args: [l, r], .. } => Some((l, r)),
                _ => None,
            },
            ValueDef::Arg(_) => None,
        }
    }

    fn create_sigmas_for_branch(&mut self, left: Value, right: Value, destinations: [Block; 2]) {
        let [tb, fb] = destinations;
        let single_pred_tb = self.cfg.single_pred(tb).is_some();
        let single_pred_fb = self.cfg.single_pred(fb).is_some();
        let redefinable_right = self.is_redefinable(right);

        trace!("create sigmas for branch on {left} {right} -> {tb} {fb}");

        if self.is_redefinable(left) {
            // Only place the sigma once if the branch compares a value with
            // itself.
            let second = if left != right && redefinable_right {
                Some(right)
            } else {
                None
            };
            if single_pred_tb {
                self.split_values_at(left, second, tb);
            }
            if single_pred_fb {
                self.split_values_at(left, second, fb);
            }
        }

        if redefinable_right {
            if single_pred_tb {
                self.split_values_at(right, None, tb);
            }
            if single_pred_fb {
                self.split_values_at(right, None, fb);
            }
        }
    }

    fn split_values_at(&mut self, value: Value, companion: Option<Value>, block: Block) {
        debug_assert!(
            self.cfg.single_pred(block).is_some(),
            "{block} has multiple predecessors"
        );
        if self.is_redefinable(value) && self.dominates_use(value, block) {
            self.place_sigma(value, block);
        }
        if let Some(companion) = companion {
            if self.is_redefinable(companion) && self.dominates_use(companion, block) {
                self.place_sigma(companion, block);
            }
        }
    }

    /// Insert a sigma for `value` at the top of `block`, unless one already
    /// carries it, then reroute dominated uses and patch up the dominance
    /// frontier.
    fn place_sigma(&mut self, value: Value, block: Block) {
        for &inst in self.func.layout.block_insts(block) {
            match self.func.dfg.inst(inst) {
                InstructionData::Phi { incoming } => {
                    if let &[(_, existing)] = incoming.as_slice() {
                        if existing == value {
                            return;
                        }
                    }
                }
                _ => break,
            }
        }

        let pred = self
            .cfg
            .single_pred(block)
            .expect("sigma block has multiple predecessors");
        let sigma = self.make_join(value, "redef", block, vec![(pred, value)]);
        trace!("placed sigma {sigma} for {value} at {block}");

        // Phi nodes are needed on every block in the dominance frontier of
        // `block` where `value` still reaches a use.
        let mut frontier_phis: Vec<Value> = Vec::new();
        for i in 0..self.frontier.frontier(block).len() {
            let join = self.frontier.frontier(block)[i];
            if !self.dominates_use(value, join) {
                continue;
            }
            if let Some(phi) = self.place_frontier_phi(value, join) {
                // Incoming definitions on predecessors below the sigma are the
                // sigma, not the original value.
                let phi_inst = match self.func.dfg.value_def(phi) {
                    ValueDef::Result(inst) => inst,
                    ValueDef::Arg(_) => unreachable!(),
                };
                if let InstructionData::Phi { incoming } = self.func.dfg.inst_mut(phi_inst) {
                    for (in_block, in_value) in incoming.iter_mut() {
                        if self.domtree.dominates(block, *in_block) {
                            *in_value = sigma;
                        }
                    }
                }
                frontier_phis.push(phi);
            }
        }

        self.replace_uses_after(value, sigma, block);
        for phi in frontier_phis {
            self.replace_uses_after(phi, sigma, block);
        }
    }

    /// Create a phi for `value` at the top of `block`, with `value` incoming
    /// on every predecessor, and reroute dominated uses to it. Returns `None`
    /// if `value` is not defined on every predecessor.
    fn place_frontier_phi(&mut self, value: Value, block: Block) -> Option<Value> {
        if let ValueDef::Result(def) = self.func.dfg.value_def(value) {
            let def_block = self
                .func
                .layout
                .inst_block(def)
                .expect("definition not in layout");
            for &pred in self.cfg.preds(block) {
                if !self.domtree.dominates(def_block, pred) {
                    return None;
                }
            }
        }

        let incoming = self.cfg.preds(block).iter().map(|&p| (p, value)).collect();
        let phi = self.make_join(value, "phi", block, incoming);
        trace!("placed frontier phi {phi} for {value} at {block}");

        self.replace_uses_after(value, phi, block);
        Some(phi)
    }

    /// Create a join of `value` at the top of `block` (after any phis already
    /// leading it), named after `value` with the given prefix.
    fn make_join(
        &mut self,
        value: Value,
        prefix: &str,
        block: Block,
        incoming: Vec<(Block, Value)>,
    ) -> Value {
        let ty = self.func.dfg.value_type(value);
        let inst = self.func.dfg.make_inst(InstructionData::Phi { incoming });
        let result = self.func.dfg.make_inst_result(inst, ty);
        if let Some(name) = self.func.dfg.value_name(value) {
            let name = format!("{prefix}.{name}");
            self.func.dfg.set_value_name(result, name);
        }
        let position = self
            .func
            .layout
            .block_insts(block)
            .iter()
            .take_while(|&&i| self.func.dfg.inst(i).opcode() == Opcode::Phi)
            .count();
        self.func.layout.insert_inst(inst, block, position);
        result
    }

    /// Returns true if `block` dominates a use of `value`.
    fn dominates_use(&self, value: Value, block: Block) -> bool {
        for inst in self.func.dfg.users(value) {
            // Disregard phi nodes, since they can dominate their operands.
            if self.func.dfg.inst(inst).opcode() == Opcode::Phi {
                continue;
            }
            let parent = match self.func.layout.inst_block(inst) {
                Some(parent) => parent,
                None => continue,
            };
            if self.domtree.dominates(block, parent) {
                return true;
            }
        }
        false
    }

    /// Replace uses of `from` with `to` in every instruction dominated by
    /// `block`. Phis in non-dominated blocks still have their incoming values
    /// replaced on edges whose predecessor is dominated.
    fn replace_uses_after(&mut self, from: Value, to: Value, block: Block) {
        trace!("replace uses of {from} with {to} below {block}");
        let to_def = match self.func.dfg.value_def(to) {
            ValueDef::Result(inst) => Some(inst),
            ValueDef::Arg(_) => None,
        };
        for inst in self.func.dfg.users(from) {
            if Some(inst) == to_def {
                continue;
            }
            let parent = match self.func.layout.inst_block(inst) {
                Some(parent) => parent,
                None => continue,
            };
            if self.domtree.dominates(block, parent) {
                self.func.dfg.inst_mut(inst).replace_uses_of(from, to);
            } else if let InstructionData::Phi { incoming } = self.func.dfg.inst_mut(inst) {
                for (in_block, in_value) in incoming.iter_mut() {
                    if *in_value == from && self.domtree.dominates(block, *in_block) {
                        *in_value = to;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{FunctionBuilder, IntCC, Type};

    fn analyses(func: &Function) -> (ControlFlowGraph, DominatorTree, DominanceFrontier) {
        let cfg = ControlFlowGraph::with_function(func);
        let domtree = DominatorTree::with_function(func, &cfg);
        let frontier = DominanceFrontier::compute(&domtree, &cfg);
        (cfg, domtree, frontier)
    }

    fn leading_phis(func: &Function, block: Block) -> Vec<Inst> {
        func.layout
            .block_insts(block)
            .iter()
            .copied()
            .take_while(|&i| func.dfg.inst(i).opcode() == Opcode::Phi)
            .collect()
    }

    /// if (a < b) { use(a); use(b) } else { use(a); use(b) }
    fn build_simple_if(func: &mut Function) -> (Value, Value, Block, Block) {
        let mut b = FunctionBuilder::new(func);
        let a0 = b.arg_named(Type::I32, "a");
        let a1 = b.arg_named(Type::I32, "b");
        let use_fn = b.import_function("use", None);

        let entry = b.create_block();
        let then_block = b.create_block();
        let else_block = b.create_block();
        let end = b.create_block();

        b.switch_to_block(entry);
        let c = b.icmp(IntCC::SignedLessThan, a0, a1);
        b.brif(c, then_block, else_block);

        for block in [then_block, else_block] {
            b.switch_to_block(block);
            let _ = b.call(use_fn, &[a0]);
            let _ = b.call(use_fn, &[a1]);
            b.jump(end);
        }
        b.switch_to_block(end);
        b.ret(None);

        (a0, a1, then_block, else_block)
    }

    #[test]
    fn simple_if_gets_four_sigmas() {
        let mut func = Function::with_name("f");
        let (a, b, then_block, else_block) = build_simple_if(&mut func);
        let (cfg, domtree, frontier) = analyses(&func);
        let redef = Redef::run(&mut func, &cfg, &domtree, &frontier);

        assert_eq!(redef.len(), 4);
        for block in [then_block, else_block] {
            for value in [a, b] {
                let sigma = redef.redef(value, block).expect("missing sigma");
                assert!(redef.is_sigma(&func, sigma));
                match func.dfg.inst(sigma) {
                    InstructionData::Phi { incoming } => {
                        assert_eq!(incoming.len(), 1);
                        assert_eq!(incoming[0].1, value);
                    }
                    _ => panic!("sigma is not a phi"),
                }
            }
            assert_eq!(leading_phis(&func, block).len(), 2);
        }

        // Uses inside the branches were rerouted to the sigmas.
        let sigma_a = func.dfg.inst_result(redef.redef(a, then_block).unwrap()).unwrap();
        let calls: Vec<Inst> = func.layout.block_insts(then_block)[2..4].to_vec();
        match func.dfg.inst(calls[0]) {
            InstructionData::Call { args, .. } => assert_eq!(args.as_slice(), &[sigma_a]),
            _ => panic!("expected call"),
        }
    }

    #[test]
    fn rerun_is_idempotent() {
        let mut func = Function::with_name("f");
        build_simple_if(&mut func);
        let (cfg, domtree, frontier) = analyses(&func);
        let first = Redef::run(&mut func, &cfg, &domtree, &frontier);
        let insts_after_first = func.dfg.num_insts();
        let second = Redef::run(&mut func, &cfg, &domtree, &frontier);

        assert_eq!(func.dfg.num_insts(), insts_after_first);
        assert_eq!(first.len(), second.len());
    }

    #[test]
    fn self_compare_inserts_single_sigma() {
        let mut func = Function::with_name("f");
        let mut b = FunctionBuilder::new(&mut func);
        let a = b.arg_named(Type::I32, "a");
        let use_fn = b.import_function("use", None);

        let entry = b.create_block();
        let then_block = b.create_block();
        let end = b.create_block();

        b.switch_to_block(entry);
        let c = b.icmp(IntCC::Equal, a, a);
        b.brif(c, then_block, end);
        b.switch_to_block(then_block);
        let _ = b.call(use_fn, &[a]);
        b.jump(end);
        b.switch_to_block(end);
        b.ret(None);

        let (cfg, domtree, frontier) = analyses(&func);
        let redef = Redef::run(&mut func, &cfg, &domtree, &frontier);
        assert_eq!(leading_phis(&func, then_block).len(), 1);
        assert!(redef.redef(a, then_block).is_some());
    }

    #[test]
    fn frontier_phi_merges_sigmas() {
        // use(a) on both branch arms and again at the merge: the merge is in
        // the frontier of both arms, so the rejoined value is a fresh phi fed
        // by the two sigmas.
        let mut func = Function::with_name("f");
        let mut b = FunctionBuilder::new(&mut func);
        let a = b.arg_named(Type::I32, "a");
        let n = b.arg_named(Type::I32, "n");
        let use_fn = b.import_function("use", None);

        let entry = b.create_block();
        let then_block = b.create_block();
        let else_block = b.create_block();
        let merge = b.create_block();

        b.switch_to_block(entry);
        let c = b.icmp(IntCC::SignedLessThan, a, n);
        b.brif(c, then_block, else_block);
        b.switch_to_block(then_block);
        let _ = b.call(use_fn, &[a]);
        b.jump(merge);
        b.switch_to_block(else_block);
        let _ = b.call(use_fn, &[a]);
        b.jump(merge);
        b.switch_to_block(merge);
        let _ = b.call(use_fn, &[a]);
        b.ret(None);

        let (cfg, domtree, frontier) = analyses(&func);
        let redef = Redef::run(&mut func, &cfg, &domtree, &frontier);

        let sigma_then = redef.redef(a, then_block).expect("sigma on then");
        let sigma_else = redef.redef(a, else_block).expect("sigma on else");
        let sigma_then_val = func.dfg.inst_result(sigma_then).unwrap();
        let sigma_else_val = func.dfg.inst_result(sigma_else).unwrap();

        let phis = leading_phis(&func, merge);
        assert_eq!(phis.len(), 1);
        match func.dfg.inst(phis[0]) {
            InstructionData::Phi { incoming } => {
                assert_eq!(
                    incoming.as_slice(),
                    &[(then_block, sigma_then_val), (else_block, sigma_else_val)]
                );
            }
            _ => panic!("expected phi"),
        }

        // The use at the merge goes through the frontier phi now.
        let phi_val = func.dfg.inst_result(phis[0]).unwrap();
        let merge_call = func.layout.block_insts(merge)[1];
        match func.dfg.inst(merge_call) {
            InstructionData::Call { args, .. } => assert_eq!(args.as_slice(), &[phi_val]),
            _ => panic!("expected call"),
        }
    }

    #[test]
    fn loop_counter_gets_body_and_exit_sigmas() {
        let mut func = Function::with_name("f");
        let mut b = FunctionBuilder::new(&mut func);
        let n = b.arg_named(Type::I32, "n");

        let entry = b.create_block();
        let header = b.create_block();
        let body = b.create_block();
        let exit = b.create_block();

        b.switch_to_block(entry);
        let zero = b.iconst(Type::I32, 0);
        b.jump(header);
        b.switch_to_block(header);
        let i = b.phi(Type::I32, &[(entry, zero)]);
        let c = b.icmp(IntCC::SignedLessThan, i, n);
        b.brif(c, body, exit);
        b.switch_to_block(body);
        let one = b.iconst(Type::I32, 1);
        let next = b.iadd(i, one);
        b.append_phi_incoming(i, body, next);
        b.jump(header);
        b.switch_to_block(exit);
        b.ret(Some(i));

        let (cfg, domtree, frontier) = analyses(&func);
        let redef = Redef::run(&mut func, &cfg, &domtree, &frontier);

        // One sigma for i in the body, one on the exit; n refines nothing it
        // dominates a use of, so it gets none.
        assert_eq!(redef.len(), 2);
        let body_sigma = redef.redef(i, body).expect("sigma in body");
        let exit_sigma = redef.redef(i, exit).expect("sigma on exit");

        let body_sigma_val = func.dfg.inst_result(body_sigma).unwrap();
        let add_inst = func.layout.block_insts(body)[2];
        match func.dfg.inst(add_inst) {
            InstructionData::Binary { args, .. } => assert_eq!(args[0], body_sigma_val),
            _ => panic!("expected iadd"),
        }

        let exit_sigma_val = func.dfg.inst_result(exit_sigma).unwrap();
        let ret = func.layout.terminator(exit);
        match func.dfg.inst(ret) {
            InstructionData::Return { arg } => assert_eq!(*arg, Some(exit_sigma_val)),
            _ => panic!("expected return"),
        }
    }
}
