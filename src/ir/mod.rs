//! Representation of SSA functions.
//!
//! The IR is deliberately small: enough instruction kinds to express integer
//! arithmetic, comparisons, control flow, calls, and the explicit `phi` joins
//! the range analysis splits live ranges with. Entities follow the usual
//! index-into-arena scheme; the `DataFlowGraph` holds instruction and value
//! definitions while the `Layout` determines program order.

pub mod builder;
pub mod condcodes;
pub mod dfg;
pub mod function;
pub mod instructions;
pub mod layout;
pub mod types;

pub use crate::ir::builder::FunctionBuilder;
pub use crate::ir::condcodes::IntCC;
pub use crate::ir::dfg::{DataFlowGraph, ExtFuncData, ValueDef};
pub use crate::ir::function::Function;
pub use crate::ir::instructions::{InstructionData, Opcode};
pub use crate::ir::layout::Layout;
pub use crate::ir::types::Type;

use cranelift_entity::entity_impl;

/// An opaque reference to a basic block in a `Function`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Block(u32);
entity_impl!(Block, "block");

/// An opaque reference to an instruction in a `Function`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Inst(u32);
entity_impl!(Inst, "inst");

/// An opaque reference to an SSA value.
///
/// Values are defined by instruction results or function arguments.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Value(u32);
entity_impl!(Value, "v");

/// An opaque reference to an external function.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FuncRef(u32);
entity_impl!(FuncRef, "fn");
