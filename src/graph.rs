//! Constraint graph construction.
//!
//! The graph mirrors the integer-typed values of one function: one node per
//! value, with incoming edges from the values its range is computed from.
//! Nodes are emitted in reverse post-order of blocks, instruction order within
//! a block, arguments first, so node handles double as the solver's worklist
//! priority. Edges are wired in a second pass because loop back edges into
//! phis reference nodes that are emitted later.

use crate::expr::{Expr, ExprPool};
use crate::flowgraph::ControlFlowGraph;
use crate::dominator_tree::DominatorTree;
use crate::ir::{Function, Inst, InstructionData, IntCC, Opcode, Type, Value, ValueDef};
use crate::name_vault::NameVault;
use crate::redef::Redef;
use cranelift_entity::{entity_impl, PrimaryMap};
use log::trace;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// An opaque reference to a node of the constraint graph.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Node(u32);
entity_impl!(Node, "n");

/// Arithmetic performed by a `Binary` node. Signed and unsigned division
/// share one transfer function; the flag is kept only so that quotient
/// bounds can be materialized with the producing opcode.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum BinaryOp {
    /// Addition.
    Add,
    /// Subtraction.
    Sub,
    /// Multiplication.
    Mul,
    /// Division.
    Div {
        /// True for `udiv`.
        unsigned: bool,
    },
}

/// The comparison a sigma node narrows with. Signedness is already folded
/// away; the symbolic ordering is the same for both.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SigmaOp {
    /// Incoming `<` bound.
    Lt,
    /// Incoming `<=` bound.
    Le,
    /// Incoming `>` bound.
    Gt,
    /// Incoming `>=` bound.
    Ge,
    /// Incoming `==` bound.
    Eq,
    /// Incoming `!=` bound.
    Ne,
}

impl From<IntCC> for SigmaOp {
    fn from(cc: IntCC) -> Self {
        use IntCC::*;
        match cc {
            SignedLessThan | UnsignedLessThan => SigmaOp::Lt,
            SignedLessThanOrEqual | UnsignedLessThanOrEqual => SigmaOp::Le,
            SignedGreaterThan | UnsignedGreaterThan => SigmaOp::Gt,
            SignedGreaterThanOrEqual | UnsignedGreaterThanOrEqual => SigmaOp::Ge,
            Equal => SigmaOp::Eq,
            NotEqual => SigmaOp::Ne,
        }
    }
}

/// What a node computes.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum NodeKind {
    /// A constant; the state is `[c, c]` and never re-evaluated.
    Const(Expr),
    /// An opaque value named by a fresh symbol; the state is `[s, s]`.
    Ident(Expr),
    /// An opaque value bounded only by its type.
    Inf,
    /// A binary arithmetic instruction.
    Binary(BinaryOp),
    /// An ordinary phi; evaluation is the interval meet of its incomings.
    Phi,
    /// A sigma; evaluation narrows the incoming range with the bound carried
    /// by its last edge.
    Sigma(SigmaOp),
}

impl NodeKind {
    /// Leaf nodes have fixed state and no transfer function.
    pub fn is_leaf(&self) -> bool {
        matches!(self, NodeKind::Const(_) | NodeKind::Ident(_) | NodeKind::Inf)
    }
}

/// A node of the constraint graph.
pub struct NodeData {
    /// The value this node mirrors.
    pub value: Value,
    /// The value's integer type, for type-bound widening.
    pub ty: Type,
    /// What the node computes.
    pub kind: NodeKind,
    /// Operand edges, in operand order. For sigma nodes the bound edge is
    /// appended after the operand.
    pub incoming: SmallVec<[Node; 2]>,
    /// Reverse edges: the nodes this one feeds.
    pub uses: SmallVec<[Node; 4]>,
}

/// How unhandled values (arguments, comparison results, casts, call results)
/// bootstrap the analysis.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum LeafPolicy {
    /// Seed with `Ident(name)`: the value's range is the symbol naming it.
    Symbolic,
    /// Seed with `Inf`: the value's range is its type bounds.
    Numeric,
}

/// The constraint graph of one function.
pub struct Graph {
    nodes: PrimaryMap<Node, NodeData>,
    by_value: FxHashMap<Value, Node>,
}

impl Graph {
    /// Build the constraint graph for `func`.
    ///
    /// Redef must already have run; `vault` names the values and `pool`
    /// interns the symbols and constants the nodes carry.
    pub fn build(
        func: &Function,
        cfg: &ControlFlowGraph,
        domtree: &DominatorTree,
        redef: &Redef,
        vault: &mut NameVault,
        pool: &mut ExprPool,
        policy: LeafPolicy,
    ) -> Self {
        let mut graph = Self {
            nodes: PrimaryMap::new(),
            by_value: FxHashMap::default(),
        };

        for &arg in func.dfg.args() {
            vault.name(func, arg);
            let kind = graph.leaf_kind(func, arg, vault, pool, policy);
            graph.add_node(func, arg, kind);
        }

        let mut with_incoming: Vec<(Node, Inst)> = Vec::new();
        for block in domtree.cfg_rpo() {
            for &inst in func.layout.block_insts(block) {
                let value = match func.dfg.inst_result(inst) {
                    Some(value) => value,
                    None => continue,
                };
                // Name every value in emission order, so temporaries come out
                // the same on re-analysis and the printer can stay read-only.
                vault.name(func, value);
                let kind = match func.dfg.inst(inst) {
                    InstructionData::UnaryImm { imm, .. } => {
                        NodeKind::Const(pool.number_i64(*imm))
                    }
                    InstructionData::Binary { opcode, .. } => NodeKind::Binary(match opcode {
                        Opcode::Iadd => BinaryOp::Add,
                        Opcode::Isub => BinaryOp::Sub,
                        Opcode::Imul => BinaryOp::Mul,
                        Opcode::Sdiv => BinaryOp::Div { unsigned: false },
                        Opcode::Udiv => BinaryOp::Div { unsigned: true },
                        _ => unreachable!("non-arithmetic binary opcode"),
                    }),
                    InstructionData::Phi { .. } => {
                        if redef.is_sigma(func, inst) {
                            let (cc, _) = sigma_bound(func, cfg, inst);
                            NodeKind::Sigma(SigmaOp::from(cc))
                        } else {
                            NodeKind::Phi
                        }
                    }
                    _ => graph.leaf_kind(func, value, vault, pool, policy),
                };
                let node = graph.add_node(func, value, kind);
                if !graph.nodes[node].kind.is_leaf() {
                    with_incoming.push((node, inst));
                }
            }
        }

        for (node, inst) in with_incoming {
            for operand in func.dfg.inst(inst).arguments() {
                graph.add_edge(operand, node);
            }
            if let NodeKind::Sigma(_) = graph.nodes[node].kind {
                let (_, bound) = sigma_bound(func, cfg, inst);
                graph.add_edge(bound, node);
            }
        }

        graph
    }

    fn leaf_kind(
        &mut self,
        func: &Function,
        value: Value,
        vault: &mut NameVault,
        pool: &mut ExprPool,
        policy: LeafPolicy,
    ) -> NodeKind {
        match policy {
            LeafPolicy::Symbolic => {
                let name = vault.name(func, value);
                NodeKind::Ident(pool.symbol(name))
            }
            LeafPolicy::Numeric => NodeKind::Inf,
        }
    }

    fn add_node(&mut self, func: &Function, value: Value, kind: NodeKind) -> Node {
        let node = self.nodes.push(NodeData {
            value,
            ty: func.dfg.value_type(value),
            kind,
            incoming: SmallVec::new(),
            uses: SmallVec::new(),
        });
        trace!("node {node} for {value}");
        self.by_value.insert(value, node);
        node
    }

    fn add_edge(&mut self, from: Value, to: Node) {
        let from = self.node_of(from).expect("operand has no node");
        self.nodes[to].incoming.push(from);
        self.nodes[from].uses.push(to);
    }

    /// The node mirroring `value`, if it is in the analysis domain.
    pub fn node_of(&self, value: Value) -> Option<Node> {
        self.by_value.get(&value).copied()
    }

    /// The data of `node`.
    pub fn node(&self, node: Node) -> &NodeData {
        &self.nodes[node]
    }

    /// Iterate over all nodes in emission (reverse post-) order.
    pub fn nodes(&self) -> impl Iterator<Item = Node> + '_ {
        self.nodes.keys()
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// The comparison a sigma narrows with, on the side of its own incoming
/// value, together with the value bounding it.
///
/// Let the sigma's block have sole predecessor `P`, terminating in a branch
/// on `icmp cc l, r`. On the taken edge the incoming operand is bounded by
/// the other operand under `cc` (swapped if the incoming is `r`); on the
/// not-taken edge the ordering is negated closed-for-open. The negation
/// leaves `==` and `!=` untouched.
pub fn sigma_bound(func: &Function, cfg: &ControlFlowGraph, sigma: Inst) -> (IntCC, Value) {
    let block = func.layout.inst_block(sigma).expect("sigma not in layout");
    let pred = cfg
        .single_pred(block)
        .expect("sigma block has multiple predecessors");
    let terminator = func.layout.terminator(pred);
    let (cond, [tb, fb]) = match *func.dfg.inst(terminator) {
        InstructionData::Brif { arg, destinations } => (arg, destinations),
        _ => panic!("sigma predecessor does not end in a conditional branch"),
    };
    let cmp = match func.dfg.value_def(cond) {
        ValueDef::Result(inst) => inst,
        ValueDef::Arg(_) => panic!("branch condition is not a comparison"),
    };
    let (cc, left, right) = match *func.dfg.inst(cmp) {
        InstructionData::IntCompare { cond, args: [l, r] } => (cond, l, r),
        _ => panic!("branch condition is not a comparison"),
    };
    let incoming = match func.dfg.inst(sigma) {
        InstructionData::Phi { incoming } => match incoming.as_slice() {
            &[(_, value)] => value,
            _ => panic!("sigma has multiple incoming values"),
        },
        _ => panic!("sigma is not a phi"),
    };
    debug_assert!(block == tb || block == fb);
    assert!(
        incoming == left || incoming == right,
        "sigma incoming is not a comparison operand"
    );

    if block == tb {
        if incoming == left {
            (cc, right)
        } else {
            (cc.swap_args(), left)
        }
    } else if incoming == left {
        (false_edge(cc), right)
    } else {
        (false_edge(cc.swap_args()), left)
    }
}

/// The refinement that holds on the not-taken edge: orderings flip to the
/// opposite closed ordering, equalities are unchanged.
fn false_edge(cc: IntCC) -> IntCC {
    if cc.is_equality() {
        cc
    } else {
        cc.complement()
    }
}
