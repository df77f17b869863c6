//! Convenience builder for constructing functions.
//!
//! The builder appends instructions to the end of the block it is positioned
//! at. Phis can be created with a partial incoming list and completed later,
//! which is how loop back edges are closed.

use crate::ir::condcodes::IntCC;
use crate::ir::dfg::ExtFuncData;
use crate::ir::instructions::InstructionData;
use crate::ir::{Block, FuncRef, Function, Inst, Opcode, Type, Value, ValueDef};
use smallvec::SmallVec;

/// Builder positioned at the end of a block of a function.
pub struct FunctionBuilder<'f> {
    /// The function being built.
    pub func: &'f mut Function,
    position: Option<Block>,
}

impl<'f> FunctionBuilder<'f> {
    /// Create a builder for `func`.
    pub fn new(func: &'f mut Function) -> Self {
        Self {
            func,
            position: None,
        }
    }

    /// Declare a function argument.
    pub fn arg(&mut self, ty: Type) -> Value {
        self.func.dfg.append_arg(ty)
    }

    /// Declare a named function argument.
    pub fn arg_named(&mut self, ty: Type, name: &str) -> Value {
        let value = self.func.dfg.append_arg(ty);
        self.func.dfg.set_value_name(value, name);
        value
    }

    /// Create a new block.
    pub fn create_block(&mut self) -> Block {
        self.func.layout.make_block()
    }

    /// Position the builder at the end of `block`.
    pub fn switch_to_block(&mut self, block: Block) {
        self.position = Some(block);
    }

    /// The block the builder is positioned at.
    pub fn current_block(&self) -> Option<Block> {
        self.position
    }

    /// Declare an external function that can be called with `call`.
    pub fn import_function(&mut self, name: &str, ret: Option<Type>) -> FuncRef {
        self.func.dfg.import_function(ExtFuncData {
            name: name.to_string(),
            ret,
        })
    }

    fn insert(&mut self, data: InstructionData, result: Option<Type>) -> (Inst, Option<Value>) {
        let block = self.position.expect("builder is not positioned at a block");
        let inst = self.func.dfg.make_inst(data);
        self.func.layout.append_inst(inst, block);
        let value = result.map(|ty| self.func.dfg.make_inst_result(inst, ty));
        (inst, value)
    }

    /// Append an `iconst`.
    pub fn iconst(&mut self, ty: Type, imm: i64) -> Value {
        self.insert(InstructionData::UnaryImm { ty, imm }, Some(ty))
            .1
            .unwrap()
    }

    fn binary(&mut self, opcode: Opcode, x: Value, y: Value) -> Value {
        let ty = self.func.dfg.value_type(x);
        self.insert(InstructionData::Binary { opcode, args: [x, y] }, Some(ty))
            .1
            .unwrap()
    }

    /// Append an `iadd`.
    pub fn iadd(&mut self, x: Value, y: Value) -> Value {
        self.binary(Opcode::Iadd, x, y)
    }

    /// Append an `isub`.
    pub fn isub(&mut self, x: Value, y: Value) -> Value {
        self.binary(Opcode::Isub, x, y)
    }

    /// Append an `imul`.
    pub fn imul(&mut self, x: Value, y: Value) -> Value {
        self.binary(Opcode::Imul, x, y)
    }

    /// Append an `sdiv`.
    pub fn sdiv(&mut self, x: Value, y: Value) -> Value {
        self.binary(Opcode::Sdiv, x, y)
    }

    /// Append a `udiv`.
    pub fn udiv(&mut self, x: Value, y: Value) -> Value {
        self.binary(Opcode::Udiv, x, y)
    }

    /// Append an `icmp`, producing an `i1`.
    pub fn icmp(&mut self, cond: IntCC, x: Value, y: Value) -> Value {
        self.insert(
            InstructionData::IntCompare { cond, args: [x, y] },
            Some(Type::I1),
        )
        .1
        .unwrap()
    }

    /// Append a `select`.
    pub fn select(&mut self, cond: Value, x: Value, y: Value) -> Value {
        let ty = self.func.dfg.value_type(x);
        self.insert(InstructionData::Ternary { args: [cond, x, y] }, Some(ty))
            .1
            .unwrap()
    }

    fn unary(&mut self, opcode: Opcode, ty: Type, arg: Value) -> Value {
        self.insert(InstructionData::Unary { opcode, ty, arg }, Some(ty))
            .1
            .unwrap()
    }

    /// Append a `sextend` to `ty`.
    pub fn sextend(&mut self, ty: Type, arg: Value) -> Value {
        self.unary(Opcode::Sextend, ty, arg)
    }

    /// Append a `uextend` to `ty`.
    pub fn uextend(&mut self, ty: Type, arg: Value) -> Value {
        self.unary(Opcode::Uextend, ty, arg)
    }

    /// Append an `ireduce` to `ty`.
    pub fn ireduce(&mut self, ty: Type, arg: Value) -> Value {
        self.unary(Opcode::Ireduce, ty, arg)
    }

    /// Append a `phi` with the given incoming edges. More incomings can be
    /// added later with `append_phi_incoming`.
    pub fn phi(&mut self, ty: Type, incoming: &[(Block, Value)]) -> Value {
        self.insert(
            InstructionData::Phi {
                incoming: incoming.to_vec(),
            },
            Some(ty),
        )
        .1
        .unwrap()
    }

    /// Add an incoming edge to the phi that defines `phi_value`.
    pub fn append_phi_incoming(&mut self, phi_value: Value, block: Block, value: Value) {
        let inst = match self.func.dfg.value_def(phi_value) {
            ValueDef::Result(inst) => inst,
            ValueDef::Arg(_) => panic!("{phi_value} is not a phi result"),
        };
        match self.func.dfg.inst_mut(inst) {
            InstructionData::Phi { incoming } => incoming.push((block, value)),
            _ => panic!("{phi_value} is not a phi result"),
        }
    }

    /// Append a `call`. Returns the result value for non-void callees.
    pub fn call(&mut self, func_ref: FuncRef, args: &[Value]) -> Option<Value> {
        let ret = self.func.dfg.ext_funcs[func_ref].ret;
        self.insert(
            InstructionData::Call {
                func_ref,
                args: SmallVec::from_slice(args),
            },
            ret,
        )
        .1
    }

    /// Append a `jump` terminator.
    pub fn jump(&mut self, destination: Block) {
        self.insert(InstructionData::Jump { destination }, None);
    }

    /// Append a `brif` terminator.
    pub fn brif(&mut self, cond: Value, then_dest: Block, else_dest: Block) {
        self.insert(
            InstructionData::Brif {
                arg: cond,
                destinations: [then_dest, else_dest],
            },
            None,
        );
    }

    /// Append a `return` terminator.
    pub fn ret(&mut self, arg: Option<Value>) {
        self.insert(InstructionData::Return { arg }, None);
    }
}
