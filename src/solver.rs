//! The fixed-point solver.
//!
//! Every non-leaf node of the constraint graph has a transfer function
//! selected by its kind: interval arithmetic for binary operators, the
//! interval meet for phis, and predicate narrowing for sigmas. The solver
//! seeds leaf states, then runs three discovery/propagation rounds of
//! `reset` + `iterate` followed by a final `widen`, so narrowing at sigmas
//! has a chance to fire before unstable bounds are smashed to the type
//! range.
//!
//! The worklist is ordered by node handle, which the graph builder assigned
//! in reverse post-order, so evaluation sweeps forward through the function
//! and loop feedback is handled by the outer rounds.

use crate::expr::ExprPool;
use crate::graph::{BinaryOp, Graph, Node, NodeKind, SigmaOp};
use crate::ir::Type;
use crate::range::Range;
use cranelift_entity::EntitySet;
use log::trace;
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;

const CHANGED_LOWER: u8 = 1 << 0;
const CHANGED_UPPER: u8 = 1 << 1;

/// Tuning knobs of the analysis.
pub struct AnalysisOptions {
    /// Use symbolic names (`INT_MIN`, `INT_MAX`, ...) for type bounds instead
    /// of concrete integers. Only meaningful with `use_numeric_bounds`.
    pub use_sym_bounds: bool,
    /// Phis with more incoming values than this are widened to their type
    /// bounds without evaluating the meet. `None` disables the cap, and so
    /// does `Some(0)`, which stands in for the non-positive disabled values
    /// of the option this mirrors.
    pub max_phi_eval_size: Option<usize>,
    /// Maximum syntactic operand count permitted in a bound; a bound growing
    /// beyond it is replaced by the corresponding type-bound side.
    pub max_expr_size: u32,
    /// Bound unknown values by their integer type instead of `-oo`/`+oo`.
    pub use_numeric_bounds: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            use_sym_bounds: false,
            max_phi_eval_size: None,
            max_expr_size: 8,
            use_numeric_bounds: false,
        }
    }
}

/// The widest admissible range for a value of type `ty` under `options`.
pub fn bounds_for_type(ty: Type, options: &AnalysisOptions, pool: &mut ExprPool) -> Range {
    if !options.use_numeric_bounds {
        return Range::new(pool.minus_inf(), pool.plus_inf());
    }
    if options.use_sym_bounds {
        let names = match ty.bits() {
            8 => Some(("CHAR_MIN", "UCHAR_MAX")),
            16 => Some(("SHRT_MIN", "USHRT_MAX")),
            32 => Some(("INT_MIN", "UINT_MAX")),
            64 => Some(("LONG_MIN", "ULONG_MAX")),
            _ => None,
        };
        if let Some((min, max)) = names {
            let lower = pool.symbol(min);
            let upper = pool.symbol(max);
            return Range::new(lower, upper);
        }
    }
    let lower = pool.number_i64(ty.signed_min());
    let upper = pool.number_u64(ty.unsigned_max());
    Range::new(lower, upper)
}

/// Solver state for one constraint graph.
pub struct Solver<'a> {
    graph: &'a Graph,
    pool: &'a mut ExprPool,
    options: &'a AnalysisOptions,
    state: FxHashMap<Node, Range>,
    changed: FxHashMap<Node, u8>,
    stable: FxHashMap<Node, (bool, bool)>,
    evaluated: EntitySet<Node>,
    worklist: BTreeSet<Node>,
}

impl<'a> Solver<'a> {
    /// Create a solver over `graph`.
    pub fn new(graph: &'a Graph, pool: &'a mut ExprPool, options: &'a AnalysisOptions) -> Self {
        Self {
            graph,
            pool,
            options,
            state: FxHashMap::default(),
            changed: FxHashMap::default(),
            stable: FxHashMap::default(),
            evaluated: EntitySet::new(),
            worklist: BTreeSet::new(),
        }
    }

    /// Run the analysis to its fixed point.
    pub fn solve(&mut self) {
        self.initialize();
        for round in 0..3 {
            trace!("solver round {round}");
            self.reset();
            self.iterate();
        }
        self.widen();
    }

    /// Seed every node's state: leaves get their fixed ranges, everything
    /// else starts at bottom and on the first worklist.
    fn initialize(&mut self) {
        let graph = self.graph;
        for node in graph.nodes() {
            let data = graph.node(node);
            let initial = match data.kind {
                NodeKind::Const(c) => Range::exact(c),
                NodeKind::Ident(s) => Range::exact(s),
                NodeKind::Inf => self.type_bounds(data.ty),
                NodeKind::Binary(_) | NodeKind::Phi | NodeKind::Sigma(_) => {
                    Range::bottom(self.pool)
                }
            };
            self.set_state(node, initial);
        }
    }

    /// Move every node whose state changed since the last round onto the
    /// worklist and clear the per-round bookkeeping.
    fn reset(&mut self) {
        for node in self.graph.nodes() {
            if self.changed.get(&node).copied().unwrap_or(0) != 0 {
                self.worklist.insert(node);
            }
        }
        self.evaluated.clear();
        self.changed.clear();
    }

    /// Drain the worklist in emission order, evaluating each node at most
    /// once per round and queueing its uses.
    fn iterate(&mut self) {
        let graph = self.graph;
        while let Some(node) = self.worklist.pop_first() {
            if graph.node(node).kind.is_leaf() || self.evaluated.contains(node) {
                continue;
            }
            self.evaluated.insert(node);
            let range = self.eval(node);
            trace!("eval {node}: {}", range.display(self.pool));
            self.set_state(node, range);
            for &user in &graph.node(node).uses {
                if !self.evaluated.contains(user) {
                    self.worklist.insert(user);
                }
            }
        }
    }

    /// Replace every bound that is still changing after the final round by
    /// the corresponding type bound.
    fn widen(&mut self) {
        let graph = self.graph;
        for node in graph.nodes() {
            let bits = self.changed.get(&node).copied().unwrap_or(0);
            if bits == 0 {
                continue;
            }
            let mut state = self.state_or_bounds(node);
            let bounds = self.type_bounds(graph.node(node).ty);
            if bits & CHANGED_LOWER != 0 {
                state.lower = bounds.lower;
            }
            if bits & CHANGED_UPPER != 0 {
                state.upper = bounds.upper;
            }
            trace!("widen {node}: {}", state.display(self.pool));
            self.set_state(node, state);
        }
    }

    fn eval(&mut self, node: Node) -> Range {
        let graph = self.graph;
        let data = graph.node(node);
        match data.kind {
            NodeKind::Binary(op) => {
                let lhs = self.state_or_bounds(data.incoming[0]);
                let rhs = self.state_or_bounds(data.incoming[1]);
                match op {
                    BinaryOp::Add => lhs.add(rhs, self.pool),
                    BinaryOp::Sub => lhs.sub(rhs, self.pool),
                    BinaryOp::Mul | BinaryOp::Div { .. } => {
                        let unbounded = self.pool.is_minus_inf(lhs.lower)
                            || self.pool.is_minus_inf(rhs.lower)
                            || self.pool.is_plus_inf(lhs.upper)
                            || self.pool.is_plus_inf(rhs.upper);
                        if unbounded {
                            self.type_bounds(data.ty)
                        } else if let BinaryOp::Div { unsigned } = op {
                            lhs.div(rhs, unsigned, self.pool)
                        } else {
                            lhs.mul(rhs, self.pool)
                        }
                    }
                }
            }
            NodeKind::Phi => self.meet(node),
            NodeKind::Sigma(op) => self.narrow(node, op),
            NodeKind::Const(_) | NodeKind::Ident(_) | NodeKind::Inf => {
                unreachable!("leaf nodes have no transfer function")
            }
        }
    }

    /// The meet of a phi's non-bottom incomings: the pointwise `min` of the
    /// lower and `max` of the upper bounds.
    fn meet(&mut self, node: Node) -> Range {
        let data = self.graph.node(node);
        if let Some(cap) = self.options.max_phi_eval_size {
            if cap > 0 && data.incoming.len() > cap {
                trace!("meet {node}: pruning evaluation, {} incomings", data.incoming.len());
                return self.type_bounds(data.ty);
            }
        }
        let mut result: Option<Range> = None;
        for &incoming in &data.incoming {
            let state = self.state(incoming);
            if state.is_bottom(self.pool) {
                continue;
            }
            result = Some(match result {
                None => state,
                Some(acc) => Range::new(
                    self.pool.min(acc.lower, state.lower),
                    self.pool.max(acc.upper, state.upper),
                ),
            });
        }
        result.unwrap_or_else(|| Range::bottom(self.pool))
    }

    /// Narrow the sigma's incoming range with the range of its bound.
    fn narrow(&mut self, node: Node, op: SigmaOp) -> Range {
        let data = self.graph.node(node);
        let mut result = self.state_or_bounds(data.incoming[0]);
        let bound = self.state_or_bounds(*data.incoming.last().unwrap());
        let one = self.pool.one();
        match op {
            SigmaOp::Lt => result.upper = self.pool.sub(bound.upper, one),
            SigmaOp::Le => result.upper = bound.upper,
            SigmaOp::Gt => result.lower = self.pool.add(bound.lower, one),
            SigmaOp::Ge => result.lower = bound.lower,
            SigmaOp::Eq => result = bound,
            SigmaOp::Ne => {
                // An exclusion can only tighten a side once the other bound
                // has settled; before that it is a no-op.
                if self.has_stable_lower(node) {
                    result.upper = self.pool.sub(bound.upper, one);
                } else if self.has_stable_upper(node) {
                    result.lower = self.pool.add(bound.lower, one);
                }
            }
        }
        result
    }

    /// Record `range` as the new state of `node`, widening oversized bounds
    /// and maintaining the changed/stable bookkeeping.
    fn set_state(&mut self, node: Node, mut range: Range) {
        let bounds = self.type_bounds(self.graph.node(node).ty);
        if self.pool.size(range.lower) > self.options.max_expr_size {
            range.lower = bounds.lower;
        }
        if self.pool.size(range.upper) > self.options.max_expr_size {
            range.upper = bounds.upper;
        }

        match self.state.get(&node).copied() {
            Some(previous) => {
                if previous != range {
                    self.note_changed(node, previous, range);
                    self.state.insert(node, range);
                }
            }
            None => {
                self.state.insert(node, range);
                if !self.graph.node(node).kind.is_leaf() {
                    self.changed.insert(node, CHANGED_LOWER | CHANGED_UPPER);
                }
            }
        }
    }

    fn note_changed(&mut self, node: Node, previous: Range, new: Range) {
        let mut bits = 0;
        if previous.lower != new.lower {
            bits |= CHANGED_LOWER;
        }
        if previous.upper != new.upper {
            bits |= CHANGED_UPPER;
        }
        self.changed.insert(node, bits);

        match self.stable.get_mut(&node) {
            None => {
                // The change away from the seeded state does not count
                // against stability.
                self.stable.insert(node, (true, true));
            }
            Some(entry) => {
                entry.0 &= bits & CHANGED_LOWER == 0;
                entry.1 &= bits & CHANGED_UPPER == 0;
            }
        }
    }

    fn has_stable_lower(&self, node: Node) -> bool {
        self.stable.get(&node).map_or(false, |s| s.0)
    }

    fn has_stable_upper(&self, node: Node) -> bool {
        self.stable.get(&node).map_or(false, |s| s.1)
    }

    /// The recorded state of `node`. Panics if the node was never seeded,
    /// which is a caller contract violation.
    pub fn state(&self, node: Node) -> Range {
        *self
            .state
            .get(&node)
            .expect("requested node is not in the state map")
    }

    /// Like `state`, but substituting the type bounds for bottom.
    pub fn state_or_bounds(&mut self, node: Node) -> Range {
        let state = self.state(node);
        if state.is_bottom(self.pool) {
            self.type_bounds(self.graph.node(node).ty)
        } else {
            state
        }
    }

    fn type_bounds(&mut self, ty: Type) -> Range {
        bounds_for_type(ty, self.options, self.pool)
    }
}
