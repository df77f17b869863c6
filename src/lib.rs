//! Symbolic range analysis for SSA-form functions.
//!
//! For every integer-typed value of a function, the analysis derives a pair
//! of symbolic expressions `[lo, hi]` that soundly bounds the value's runtime
//! range. Bounds may reference constants, function arguments, and the
//! infinities, and are simplified algebraically.
//!
//! The pipeline has three parts:
//!
//! 1. live-range splitting ([`redef`]), which inserts sigma joins at branch
//!    successors so each branch-refined fact gets its own value;
//! 2. constraint-graph construction ([`graph`]), which turns the augmented
//!    function into a dataflow graph with typed nodes;
//! 3. a fixed-point [`solver`] that evaluates symbolic node states with
//!    narrowing and widening until stable.
//!
//! The [`analysis::RangeAnalysis`] engine drives all three and answers range
//! queries:
//!
//! ```
//! use sra::analysis::RangeAnalysis;
//! use sra::ir::{Function, FunctionBuilder, Type};
//! use sra::solver::AnalysisOptions;
//!
//! let mut func = Function::with_name("f");
//! let mut b = FunctionBuilder::new(&mut func);
//! let x = b.arg_named(Type::I32, "x");
//! let entry = b.create_block();
//! b.switch_to_block(entry);
//! let one = b.iconst(Type::I32, 1);
//! let y = b.iadd(x, one);
//! b.ret(Some(y));
//!
//! let mut sra = RangeAnalysis::symbolic(AnalysisOptions::default());
//! sra.analyze(&mut func);
//! let range = sra.range_of(&func, y);
//! assert_eq!(range.display(sra.pool()).to_string(), "[f_x + 1, f_x + 1]");
//! ```

#![deny(missing_docs)]

pub mod analysis;
pub mod annotate;
pub mod dominator_tree;
pub mod expr;
pub mod flowgraph;
pub mod graph;
pub mod ir;
pub mod name_vault;
pub mod range;
pub mod redef;
pub mod solver;

pub use crate::analysis::RangeAnalysis;
pub use crate::expr::{Expr, ExprPool};
pub use crate::range::Range;
pub use crate::solver::AnalysisOptions;
