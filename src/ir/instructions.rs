//! Instruction formats and opcodes.
//!
//! The `InstructionData` enum holds the full in-memory representation of an
//! instruction: its opcode together with all operands and immediates. The
//! format variants are shared between opcodes of the same shape.

use crate::ir::condcodes::IntCC;
use crate::ir::{Block, FuncRef, Type, Value};
use core::fmt;
use smallvec::SmallVec;

/// An opcode, identifying the operation an instruction performs.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Opcode {
    /// Integer constant.
    Iconst,
    /// Wrapping integer addition.
    Iadd,
    /// Wrapping integer subtraction.
    Isub,
    /// Wrapping integer multiplication.
    Imul,
    /// Signed integer division.
    Sdiv,
    /// Unsigned integer division.
    Udiv,
    /// Integer comparison, producing an `i1`.
    Icmp,
    /// Choose between two values based on an `i1` condition.
    Select,
    /// Sign-extend to a wider integer type.
    Sextend,
    /// Zero-extend to a wider integer type.
    Uextend,
    /// Truncate to a narrower integer type.
    Ireduce,
    /// SSA join: choose an incoming value by predecessor block.
    Phi,
    /// Unconditional jump.
    Jump,
    /// Conditional branch on an `i1` value.
    Brif,
    /// Call an external function.
    Call,
    /// Return from the function.
    Return,
}

impl Opcode {
    /// True if this opcode transfers control and must terminate a block.
    pub fn is_terminator(self) -> bool {
        matches!(self, Opcode::Jump | Opcode::Brif | Opcode::Return)
    }

    /// True if this opcode is a branch with one or more target blocks.
    pub fn is_branch(self) -> bool {
        matches!(self, Opcode::Jump | Opcode::Brif)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            Opcode::Iconst => "iconst",
            Opcode::Iadd => "iadd",
            Opcode::Isub => "isub",
            Opcode::Imul => "imul",
            Opcode::Sdiv => "sdiv",
            Opcode::Udiv => "udiv",
            Opcode::Icmp => "icmp",
            Opcode::Select => "select",
            Opcode::Sextend => "sextend",
            Opcode::Uextend => "uextend",
            Opcode::Ireduce => "ireduce",
            Opcode::Phi => "phi",
            Opcode::Jump => "jump",
            Opcode::Brif => "brif",
            Opcode::Call => "call",
            Opcode::Return => "return",
        })
    }
}

/// Contents of an instruction.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum InstructionData {
    /// `iconst`.
    UnaryImm {
        /// Controlling type of the constant.
        ty: Type,
        /// The constant's value, sign-extended to 64 bits.
        imm: i64,
    },
    /// `iadd`/`isub`/`imul`/`sdiv`/`udiv`.
    Binary {
        /// One of the binary arithmetic opcodes.
        opcode: Opcode,
        /// Left and right operands.
        args: [Value; 2],
    },
    /// `icmp`.
    IntCompare {
        /// The comparison predicate.
        cond: IntCC,
        /// Left and right operands.
        args: [Value; 2],
    },
    /// `select`.
    Ternary {
        /// Condition, then-value, else-value.
        args: [Value; 3],
    },
    /// `sextend`/`uextend`/`ireduce`.
    Unary {
        /// One of the conversion opcodes.
        opcode: Opcode,
        /// The target type of the conversion.
        ty: Type,
        /// The value being converted.
        arg: Value,
    },
    /// `phi`. Incoming values are keyed by predecessor block; the pairs are
    /// kept in insertion order.
    Phi {
        /// `(predecessor, value)` pairs, one per incoming edge.
        incoming: Vec<(Block, Value)>,
    },
    /// `jump`.
    Jump {
        /// The target block.
        destination: Block,
    },
    /// `brif`.
    Brif {
        /// The `i1` condition.
        arg: Value,
        /// Taken and not-taken target blocks, in that order.
        destinations: [Block; 2],
    },
    /// `call` of an external function.
    Call {
        /// Callee.
        func_ref: FuncRef,
        /// Call arguments.
        args: SmallVec<[Value; 4]>,
    },
    /// `return`.
    Return {
        /// The returned value, if the function returns one.
        arg: Option<Value>,
    },
}

impl InstructionData {
    /// Get the opcode of this instruction.
    pub fn opcode(&self) -> Opcode {
        match *self {
            InstructionData::UnaryImm { .. } => Opcode::Iconst,
            InstructionData::Binary { opcode, .. } => opcode,
            InstructionData::IntCompare { .. } => Opcode::Icmp,
            InstructionData::Ternary { .. } => Opcode::Select,
            InstructionData::Unary { opcode, .. } => opcode,
            InstructionData::Phi { .. } => Opcode::Phi,
            InstructionData::Jump { .. } => Opcode::Jump,
            InstructionData::Brif { .. } => Opcode::Brif,
            InstructionData::Call { .. } => Opcode::Call,
            InstructionData::Return { .. } => Opcode::Return,
        }
    }

    /// Collect the value arguments of this instruction, in operand order.
    /// Phi incomings appear in incoming-edge order.
    pub fn arguments(&self) -> SmallVec<[Value; 4]> {
        match self {
            InstructionData::UnaryImm { .. } | InstructionData::Jump { .. } => SmallVec::new(),
            InstructionData::Binary { args, .. } | InstructionData::IntCompare { args, .. } => {
                SmallVec::from_slice(args)
            }
            InstructionData::Ternary { args } => SmallVec::from_slice(args),
            InstructionData::Unary { arg, .. } => smallvec::smallvec![*arg],
            InstructionData::Phi { incoming } => incoming.iter().map(|&(_, v)| v).collect(),
            InstructionData::Brif { arg, .. } => smallvec::smallvec![*arg],
            InstructionData::Call { args, .. } => args.clone(),
            InstructionData::Return { arg } => arg.iter().copied().collect(),
        }
    }

    /// Replace every operand equal to `from` with `to`, including phi
    /// incomings regardless of their predecessor edge.
    pub fn replace_uses_of(&mut self, from: Value, to: Value) {
        let subst = |v: &mut Value| {
            if *v == from {
                *v = to;
            }
        };
        match self {
            InstructionData::UnaryImm { .. } | InstructionData::Jump { .. } => {}
            InstructionData::Binary { args, .. } | InstructionData::IntCompare { args, .. } => {
                args.iter_mut().for_each(subst)
            }
            InstructionData::Ternary { args } => args.iter_mut().for_each(subst),
            InstructionData::Unary { arg, .. } => subst(arg),
            InstructionData::Phi { incoming } => {
                incoming.iter_mut().for_each(|(_, v)| subst(v));
            }
            InstructionData::Brif { arg, .. } => subst(arg),
            InstructionData::Call { args, .. } => args.iter_mut().for_each(subst),
            InstructionData::Return { arg } => {
                if let Some(v) = arg {
                    subst(v)
                }
            }
        }
    }

    /// The blocks this instruction can transfer control to.
    pub fn branch_destinations(&self) -> SmallVec<[Block; 2]> {
        match self {
            InstructionData::Jump { destination } => smallvec::smallvec![*destination],
            InstructionData::Brif { destinations, .. } => SmallVec::from_slice(destinations),
            _ => SmallVec::new(),
        }
    }
}
