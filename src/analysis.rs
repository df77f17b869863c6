//! The range analysis engine.
//!
//! `RangeAnalysis` ties the pieces together: it splits live ranges, builds the
//! constraint graph, runs the solver, and keeps the results around for
//! querying, printing, and materialization. The same engine runs in two
//! modes distinguished only by the leaf policy: the symbolic instantiation
//! seeds unknown values with the symbol naming them, the numeric one with
//! their type bounds.

use crate::dominator_tree::{DominanceFrontier, DominatorTree};
use crate::expr::{Expr, ExprData, ExprPool};
use crate::flowgraph::ControlFlowGraph;
use crate::graph::{Graph, LeafPolicy};
use crate::ir::{Function, FunctionBuilder, IntCC, Type, Value};
use crate::name_vault::NameVault;
use crate::range::Range;
use crate::redef::Redef;
use crate::solver::{bounds_for_type, AnalysisOptions, Solver};
use log::debug;
use num_traits::ToPrimitive;
use rustc_hash::FxHashMap;
use std::fmt;

/// The range analysis engine.
///
/// The engine analyzes one function at a time; `analyze` replaces the results
/// of any previous call. Names and interned expressions are engine-wide, so
/// re-analyzing a function reproduces identical names and ranges.
pub struct RangeAnalysis {
    options: AnalysisOptions,
    policy: LeafPolicy,
    pool: ExprPool,
    vault: NameVault,
    redefs: Option<Redef>,
    results: Vec<(Value, Range)>,
    by_value: FxHashMap<Value, Range>,
}

impl RangeAnalysis {
    /// An engine in symbolic mode: unknown values are bounded by the symbols
    /// naming them.
    pub fn symbolic(options: AnalysisOptions) -> Self {
        Self::new(LeafPolicy::Symbolic, options)
    }

    /// An engine in numeric mode: unknown values are bounded by their types.
    pub fn numeric(options: AnalysisOptions) -> Self {
        Self::new(LeafPolicy::Numeric, options)
    }

    fn new(policy: LeafPolicy, options: AnalysisOptions) -> Self {
        Self {
            options,
            policy,
            pool: ExprPool::new(),
            vault: NameVault::new(),
            redefs: None,
            results: Vec::new(),
            by_value: FxHashMap::default(),
        }
    }

    /// The expression pool the results live in.
    pub fn pool(&self) -> &ExprPool {
        &self.pool
    }

    /// Mutable access to the expression pool, for building expressions to
    /// compare results against.
    pub fn pool_mut(&mut self) -> &mut ExprPool {
        &mut self.pool
    }

    /// The redefinition map of the last analyzed function.
    ///
    /// Panics if `analyze` has not run yet.
    pub fn redefs(&self) -> &Redef {
        self.redefs.as_ref().expect("analyze has not run")
    }

    /// Analyze `func`: split live ranges (this inserts joins into the
    /// function), build the constraint graph, and solve it.
    pub fn analyze(&mut self, func: &mut Function) {
        debug!("analyzing {}", func.name);

        let cfg = ControlFlowGraph::with_function(func);
        let domtree = DominatorTree::with_function(func, &cfg);
        let frontier = DominanceFrontier::compute(&domtree, &cfg);
        let redefs = Redef::run(func, &cfg, &domtree, &frontier);
        // Splitting only inserts phis, so the CFG and dominator tree computed
        // above still describe the function.
        let graph = Graph::build(
            func,
            &cfg,
            &domtree,
            &redefs,
            &mut self.vault,
            &mut self.pool,
            self.policy,
        );
        let mut solver = Solver::new(&graph, &mut self.pool, &self.options);
        solver.solve();

        self.results.clear();
        self.by_value.clear();
        for node in graph.nodes() {
            let value = graph.node(node).value;
            let range = solver.state_or_bounds(node);
            self.results.push((value, range));
            self.by_value.insert(value, range);
        }
        self.redefs = Some(redefs);
    }

    /// The inferred range of `value`. Values outside the analysis domain are
    /// bounded by their type.
    pub fn range_of(&mut self, func: &Function, value: Value) -> Range {
        match self.by_value.get(&value) {
            Some(&range) => range,
            None => bounds_for_type(func.dfg.value_type(value), &self.options, &mut self.pool),
        }
    }

    /// The stable name of `value` used for its symbol.
    pub fn name_of(&mut self, func: &Function, value: Value) -> &str {
        self.vault.name(func, value)
    }

    /// Write one `[[name]] = [lo, hi]` line per analyzed value, in emission
    /// order.
    pub fn print_results(&self, w: &mut dyn fmt::Write) -> fmt::Result {
        for &(value, range) in &self.results {
            let name = self.vault.get(value).expect("analyzed value has no name");
            writeln!(w, "[[{}]] = {}", name, range.display(&self.pool))?;
        }
        Ok(())
    }

    /// Emit instructions computing the bounds of `value` at the builder's
    /// position and return the two computed values `(lower, upper)`.
    ///
    /// Symbols resolve to the values they name, `min`/`max` lower to compare
    /// and select, and infinities saturate to the type extremes. Panics on
    /// ranges that cannot be computed at runtime (bottom or NaN bounds, or
    /// symbols naming nothing), which are contract violations of the caller.
    pub fn materialize_range(
        &mut self,
        builder: &mut FunctionBuilder,
        value: Value,
    ) -> (Value, Value) {
        let range = self.range_of(builder.func, value);
        let ty = builder.func.dfg.value_type(value);
        let lower = self.materialize_expr(builder, ty, range.lower);
        let upper = self.materialize_expr(builder, ty, range.upper);
        (lower, upper)
    }

    fn materialize_expr(&mut self, builder: &mut FunctionBuilder, ty: Type, expr: Expr) -> Value {
        match self.pool.data(expr).clone() {
            ExprData::Number(q) => builder.iconst(ty, rational_imm(&q)),
            ExprData::Symbol(name) => self
                .vault
                .value_of(&name)
                .unwrap_or_else(|| panic!("symbol {name} does not name a value")),
            ExprData::MinusInf => builder.iconst(ty, ty.signed_min()),
            ExprData::PlusInf => builder.iconst(ty, ty.unsigned_max() as i64),
            ExprData::Nan | ExprData::Bottom => {
                panic!("range bound cannot be computed at runtime")
            }
            ExprData::Add(parts) => {
                self.fold_materialized(builder, ty, &parts, |b, x, y| b.iadd(x, y))
            }
            ExprData::Mul(parts) => {
                self.fold_materialized(builder, ty, &parts, |b, x, y| b.imul(x, y))
            }
            ExprData::Div { num, den, unsigned } => {
                let num = self.materialize_expr(builder, ty, num);
                let den = self.materialize_expr(builder, ty, den);
                if unsigned {
                    builder.udiv(num, den)
                } else {
                    builder.sdiv(num, den)
                }
            }
            ExprData::Min(parts) => self.select_materialized(builder, ty, &parts, IntCC::SignedLessThan),
            ExprData::Max(parts) => {
                self.select_materialized(builder, ty, &parts, IntCC::SignedGreaterThan)
            }
        }
    }

    fn fold_materialized(
        &mut self,
        builder: &mut FunctionBuilder,
        ty: Type,
        parts: &[Expr],
        op: impl Fn(&mut FunctionBuilder, Value, Value) -> Value,
    ) -> Value {
        let mut acc = self.materialize_expr(builder, ty, parts[0]);
        for &part in &parts[1..] {
            let rhs = self.materialize_expr(builder, ty, part);
            acc = op(builder, acc, rhs);
        }
        acc
    }

    fn select_materialized(
        &mut self,
        builder: &mut FunctionBuilder,
        ty: Type,
        parts: &[Expr],
        keep_if: IntCC,
    ) -> Value {
        let mut acc = self.materialize_expr(builder, ty, parts[0]);
        for &part in &parts[1..] {
            let rhs = self.materialize_expr(builder, ty, part);
            let cond = builder.icmp(keep_if, acc, rhs);
            acc = builder.select(cond, acc, rhs);
        }
        acc
    }
}

/// The immediate encoding a rational bound: truncated toward zero, wrapped
/// into 64 bits the way unsigned type maxima are.
fn rational_imm(q: &num_rational::BigRational) -> i64 {
    let truncated = q.to_integer();
    truncated
        .to_i64()
        .or_else(|| truncated.to_u64().map(|u| u as i64))
        .unwrap_or_else(|| panic!("bound {truncated} does not fit in an immediate"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Block, InstructionData, Opcode};

    fn simple_if() -> (Function, Value, Value, Block, Block) {
        let mut func = Function::with_name("f");
        let mut b = FunctionBuilder::new(&mut func);
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
        (func, a0, a1, then_block, else_block)
    }

    fn sigma_value(sra: &RangeAnalysis, func: &Function, value: Value, block: Block) -> Value {
        let inst = sra.redefs().redef(value, block).expect("missing sigma");
        func.dfg.inst_result(inst).unwrap()
    }

    #[test]
    fn pass_through_argument() {
        let mut func = Function::with_name("f");
        let mut b = FunctionBuilder::new(&mut func);
        let a = b.arg_named(Type::I32, "a");
        let _b = b.arg_named(Type::I32, "b");
        let entry = b.create_block();
        b.switch_to_block(entry);
        b.ret(Some(a));

        let mut sra = RangeAnalysis::symbolic(AnalysisOptions::default());
        sra.analyze(&mut func);

        let range = sra.range_of(&func, a);
        let sym = sra.pool_mut().symbol("f_a");
        assert_eq!(range, Range::exact(sym));
    }

    #[test]
    fn simple_if_narrows_all_four_sigmas() {
        let (mut func, a, b, then_block, else_block) = simple_if();
        let mut sra = RangeAnalysis::symbolic(AnalysisOptions::default());
        sra.analyze(&mut func);

        let sa_then = sigma_value(&sra, &func, a, then_block);
        let sb_then = sigma_value(&sra, &func, b, then_block);
        let sa_else = sigma_value(&sra, &func, a, else_block);
        let sb_else = sigma_value(&sra, &func, b, else_block);

        let ra_then = sra.range_of(&func, sa_then);
        let rb_then = sra.range_of(&func, sb_then);
        let ra_else = sra.range_of(&func, sa_else);
        let rb_else = sra.range_of(&func, sb_else);

        let pool = sra.pool_mut();
        let sym_a = pool.symbol("f_a");
        let sym_b = pool.symbol("f_b");
        let one = pool.one();
        let b_minus_1 = pool.sub(sym_b, one);
        let a_plus_1 = pool.add(sym_a, one);

        assert_eq!(ra_then, Range::new(sym_a, b_minus_1));
        assert_eq!(rb_then, Range::new(a_plus_1, sym_b));
        assert_eq!(ra_else, Range::new(sym_b, sym_a));
        assert_eq!(rb_else, Range::new(sym_b, sym_a));
    }

    #[test]
    fn counted_loop_ranges() {
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

        let mut sra = RangeAnalysis::symbolic(AnalysisOptions::default());
        sra.analyze(&mut func);

        let body_sigma = sigma_value(&sra, &func, i, body);
        let exit_sigma = sigma_value(&sra, &func, i, exit);

        let r_phi = sra.range_of(&func, i);
        let r_body = sra.range_of(&func, body_sigma);
        let r_next = sra.range_of(&func, next);
        let r_exit = sra.range_of(&func, exit_sigma);

        let pool = sra.pool_mut();
        let sym_n = pool.symbol("f_n");
        let zero_e = pool.zero();
        let one_e = pool.one();
        let n_minus_1 = pool.sub(sym_n, one_e);
        let max_0_n = pool.max(zero_e, sym_n);

        // The header meet keeps the entry constant on the left and widens the
        // upper bound to the loop feedback.
        assert_eq!(r_phi, Range::new(zero_e, max_0_n));
        assert_eq!(r_body, Range::new(zero_e, n_minus_1));
        assert_eq!(r_next, Range::new(one_e, sym_n));
        assert_eq!(r_exit, Range::new(sym_n, max_0_n));
    }

    #[test]
    fn constant_folding() {
        let mut func = Function::with_name("f");
        let mut b = FunctionBuilder::new(&mut func);
        let entry = b.create_block();
        b.switch_to_block(entry);
        let three = b.iconst(Type::I32, 3);
        let four = b.iconst(Type::I32, 4);
        let sum = b.iadd(three, four);
        b.ret(Some(sum));

        let mut sra = RangeAnalysis::symbolic(AnalysisOptions::default());
        sra.analyze(&mut func);
        let range = sra.range_of(&func, sum);
        let seven = sra.pool_mut().number_i64(7);
        assert_eq!(range, Range::exact(seven));
    }

    #[test]
    fn oversized_phi_widens_to_type_bounds() {
        let mut func = Function::with_name("f");
        let mut b = FunctionBuilder::new(&mut func);
        let a = b.arg_named(Type::I32, "a");
        let n = b.arg_named(Type::I32, "b");

        let entry = b.create_block();
        let then_block = b.create_block();
        let else_block = b.create_block();
        let end = b.create_block();

        b.switch_to_block(entry);
        let c = b.icmp(IntCC::SignedLessThan, a, n);
        b.brif(c, then_block, else_block);
        b.switch_to_block(then_block);
        b.jump(end);
        b.switch_to_block(else_block);
        b.jump(end);
        b.switch_to_block(end);
        let merged = b.phi(Type::I32, &[(then_block, a), (else_block, n)]);
        b.ret(Some(merged));

        let mut sra = RangeAnalysis::symbolic(AnalysisOptions {
            max_phi_eval_size: Some(1),
            ..Default::default()
        });
        sra.analyze(&mut func);
        let range = sra.range_of(&func, merged);
        let pool = sra.pool();
        assert!(pool.is_minus_inf(range.lower));
        assert!(pool.is_plus_inf(range.upper));

        // A zero cap disables the pruning rather than widening every phi.
        let mut sra = RangeAnalysis::symbolic(AnalysisOptions {
            max_phi_eval_size: Some(0),
            ..Default::default()
        });
        sra.analyze(&mut func);
        let range = sra.range_of(&func, merged);
        let pool = sra.pool_mut();
        let sym_a = pool.symbol("f_a");
        let sym_b = pool.symbol("f_b");
        let lo = pool.min(sym_a, sym_b);
        let hi = pool.max(sym_a, sym_b);
        assert_eq!(range, Range::new(lo, hi));
    }

    #[test]
    fn equality_narrows_to_the_bound() {
        let mut func = Function::with_name("f");
        let mut b = FunctionBuilder::new(&mut func);
        let a = b.arg_named(Type::I32, "a");
        let n = b.arg_named(Type::I32, "b");
        let use_fn = b.import_function("use", None);

        let entry = b.create_block();
        let then_block = b.create_block();
        let end = b.create_block();

        b.switch_to_block(entry);
        let c = b.icmp(IntCC::Equal, a, n);
        b.brif(c, then_block, end);
        b.switch_to_block(then_block);
        let _ = b.call(use_fn, &[a]);
        b.jump(end);
        b.switch_to_block(end);
        b.ret(None);

        let mut sra = RangeAnalysis::symbolic(AnalysisOptions::default());
        sra.analyze(&mut func);
        let sigma = sigma_value(&sra, &func, a, then_block);
        let range = sra.range_of(&func, sigma);
        let sym_b = sra.pool_mut().symbol("f_b");
        assert_eq!(range, Range::exact(sym_b));
    }

    #[test]
    fn inequality_narrows_once_a_side_is_stable() {
        let mut func = Function::with_name("f");
        let mut b = FunctionBuilder::new(&mut func);
        let a = b.arg_named(Type::I32, "a");
        let use_fn = b.import_function("use", None);

        let entry = b.create_block();
        let then_block = b.create_block();
        let end = b.create_block();

        b.switch_to_block(entry);
        let ten = b.iconst(Type::I32, 10);
        let c = b.icmp(IntCC::NotEqual, a, ten);
        b.brif(c, then_block, end);
        b.switch_to_block(then_block);
        let _ = b.call(use_fn, &[a]);
        b.jump(end);
        b.switch_to_block(end);
        b.ret(None);

        let mut sra = RangeAnalysis::symbolic(AnalysisOptions::default());
        sra.analyze(&mut func);
        let sigma = sigma_value(&sra, &func, a, then_block);
        let range = sra.range_of(&func, sigma);
        let pool = sra.pool_mut();
        let sym_a = pool.symbol("f_a");
        let nine = pool.number_i64(9);
        assert_eq!(range, Range::new(sym_a, nine));
    }

    #[test]
    fn symbolic_multiplication_stays_exact() {
        let mut func = Function::with_name("f");
        let mut b = FunctionBuilder::new(&mut func);
        let a = b.arg_named(Type::I32, "a");
        let n = b.arg_named(Type::I32, "b");
        let entry = b.create_block();
        b.switch_to_block(entry);
        let m = b.imul(a, n);
        b.ret(Some(m));

        let mut sra = RangeAnalysis::symbolic(AnalysisOptions::default());
        sra.analyze(&mut func);
        let range = sra.range_of(&func, m);
        let pool = sra.pool_mut();
        let sym_a = pool.symbol("f_a");
        let sym_b = pool.symbol("f_b");
        let ab = pool.mul(sym_a, sym_b);
        assert_eq!(range, Range::exact(ab));
    }

    #[test]
    fn unbounded_operands_widen_mul_and_div() {
        let mut func = Function::with_name("f");
        let mut b = FunctionBuilder::new(&mut func);
        let a = b.arg(Type::I32);
        let n = b.arg(Type::I32);
        let entry = b.create_block();
        b.switch_to_block(entry);
        let m = b.imul(a, n);
        let q = b.sdiv(a, n);
        b.ret(Some(q));

        // Numeric mode with default bounds: arguments are [-oo, +oo], so both
        // operations collapse to the type bounds instead of producing
        // min/max expressions.
        let mut sra = RangeAnalysis::numeric(AnalysisOptions::default());
        sra.analyze(&mut func);
        for value in [m, q] {
            let range = sra.range_of(&func, value);
            assert!(sra.pool().is_minus_inf(range.lower));
            assert!(sra.pool().is_plus_inf(range.upper));
        }
    }

    #[test]
    fn oversized_bounds_widen_one_side_only() {
        let (mut func, a, _, then_block, _) = simple_if();
        let mut sra = RangeAnalysis::symbolic(AnalysisOptions {
            max_expr_size: 1,
            ..Default::default()
        });
        sra.analyze(&mut func);

        // [a, b - 1]: the upper bound has two operands and is widened, the
        // lower is a bare symbol and survives.
        let sigma = sigma_value(&sra, &func, a, then_block);
        let range = sra.range_of(&func, sigma);
        let pool = sra.pool_mut();
        let sym_a = pool.symbol("f_a");
        assert_eq!(range.lower, sym_a);
        assert!(pool.is_plus_inf(range.upper));
    }

    #[test]
    fn analyze_is_idempotent() {
        let (mut func, a, b, then_block, else_block) = simple_if();
        let mut sra = RangeAnalysis::symbolic(AnalysisOptions::default());
        sra.analyze(&mut func);

        let num_insts = func.dfg.num_insts();
        let mut first = String::new();
        sra.print_results(&mut first).unwrap();
        let name_a = sra.name_of(&func, a).to_string();

        sra.analyze(&mut func);
        let mut second = String::new();
        sra.print_results(&mut second).unwrap();

        assert_eq!(func.dfg.num_insts(), num_insts);
        assert_eq!(first, second);
        assert_eq!(sra.name_of(&func, a), name_a);

        let _ = (b, then_block, else_block);
    }

    #[test]
    fn every_integer_value_is_covered() {
        let (mut func, ..) = simple_if();
        let mut sra = RangeAnalysis::symbolic(AnalysisOptions::default());
        sra.analyze(&mut func);

        // Two arguments, the comparison, and four sigmas.
        let mut out = String::new();
        sra.print_results(&mut out).unwrap();
        assert_eq!(out.lines().count(), 7);

        let mut names: Vec<&str> = out.lines().map(|l| l.split(']').next().unwrap()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 7);
    }

    #[test]
    fn print_results_format() {
        let mut func = Function::with_name("f");
        let mut b = FunctionBuilder::new(&mut func);
        let a = b.arg_named(Type::I32, "a");
        let entry = b.create_block();
        b.switch_to_block(entry);
        b.ret(Some(a));

        let mut sra = RangeAnalysis::symbolic(AnalysisOptions::default());
        sra.analyze(&mut func);
        let mut out = String::new();
        sra.print_results(&mut out).unwrap();
        assert_eq!(out, "[[f_a]] = [f_a, f_a]\n");
    }

    #[test]
    fn out_of_domain_values_get_type_bounds() {
        let mut func = Function::with_name("f");
        let mut b = FunctionBuilder::new(&mut func);
        let a = b.arg_named(Type::I32, "a");
        let entry = b.create_block();
        let orphan = b.create_block();
        let end = b.create_block();
        b.switch_to_block(entry);
        b.jump(end);
        // A value in an unreachable block never enters the graph.
        b.switch_to_block(orphan);
        let dead = b.iconst(Type::I32, 1);
        b.jump(end);
        b.switch_to_block(end);
        b.ret(Some(a));

        let mut sra = RangeAnalysis::symbolic(AnalysisOptions::default());
        sra.analyze(&mut func);
        let range = sra.range_of(&func, dead);
        assert!(sra.pool().is_minus_inf(range.lower));
        assert!(sra.pool().is_plus_inf(range.upper));
    }

    #[test]
    fn materialized_division_keeps_signedness() {
        let mut func = Function::with_name("f");
        let mut b = FunctionBuilder::new(&mut func);
        let a = b.arg_named(Type::I32, "a");
        let n = b.arg_named(Type::I32, "b");
        let entry = b.create_block();
        b.switch_to_block(entry);
        let uq = b.udiv(a, n);
        let sq = b.sdiv(a, n);

        let mut sra = RangeAnalysis::symbolic(AnalysisOptions::default());
        sra.analyze(&mut func);

        let mut builder = FunctionBuilder::new(&mut func);
        builder.switch_to_block(entry);
        let (u_lower, _) = sra.materialize_range(&mut builder, uq);
        let (s_lower, _) = sra.materialize_range(&mut builder, sq);
        builder.ret(None);

        let opcode_of = |value: Value| match func.dfg.value_def(value) {
            crate::ir::ValueDef::Result(inst) => func.dfg.inst(inst).opcode(),
            _ => panic!("bound is not computed by an instruction"),
        };
        assert_eq!(opcode_of(u_lower), Opcode::Udiv);
        assert_eq!(opcode_of(s_lower), Opcode::Sdiv);
    }

    #[test]
    fn materializes_bounds_as_instructions() {
        let mut func = Function::with_name("f");
        let mut b = FunctionBuilder::new(&mut func);
        let a = b.arg_named(Type::I32, "a");
        let n = b.arg_named(Type::I32, "b");
        let use_fn = b.import_function("use", None);

        let entry = b.create_block();
        let then_block = b.create_block();
        let end = b.create_block();

        b.switch_to_block(entry);
        let c = b.icmp(IntCC::SignedLessThan, a, n);
        b.brif(c, then_block, end);
        b.switch_to_block(then_block);
        let _ = b.call(use_fn, &[a]);
        b.switch_to_block(end);
        b.ret(None);

        let mut sra = RangeAnalysis::symbolic(AnalysisOptions::default());
        sra.analyze(&mut func);
        let sigma = sigma_value(&sra, &func, a, then_block);

        let mut builder = FunctionBuilder::new(&mut func);
        builder.switch_to_block(then_block);
        let (lower, upper) = sra.materialize_range(&mut builder, sigma);

        // The lower bound is the argument itself; the upper is b - 1,
        // computed by an add with a constant.
        assert_eq!(lower, a);
        match func.dfg.value_def(upper) {
            crate::ir::ValueDef::Result(inst) => {
                assert_eq!(func.dfg.inst(inst).opcode(), Opcode::Iadd);
                match func.dfg.inst(inst) {
                    InstructionData::Binary { args, .. } => {
                        assert_eq!(args[0], n);
                        assert_eq!(func.dfg.const_value(args[1]), Some(-1));
                    }
                    _ => unreachable!(),
                }
            }
            _ => panic!("upper bound is not computed by an instruction"),
        }
    }
}
