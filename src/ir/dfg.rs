//! Data flow graph tracking instructions and values.

use crate::ir::instructions::InstructionData;
use crate::ir::{FuncRef, Inst, Opcode, Type, Value};
use cranelift_entity::{PrimaryMap, SecondaryMap};
use cranelift_entity::packed_option::PackedOption;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

/// An external function that can be called directly.
#[derive(Clone, Debug)]
pub struct ExtFuncData {
    /// Symbolic name of the callee.
    pub name: String,
    /// Return type, or `None` for a void function.
    pub ret: Option<Type>,
}

/// Where a value comes from.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ValueDef {
    /// The value is the result of an instruction.
    Result(Inst),
    /// The value is the function argument at the given index.
    Arg(usize),
}

#[derive(Clone)]
struct ValueData {
    ty: Type,
    def: ValueDef,
}

/// A data flow graph defines all instructions and values in a function and the
/// dependencies between them. Program order is tracked separately by the
/// `Layout`.
pub struct DataFlowGraph {
    /// Data about all of the instructions in the function. The instructions in
    /// this map are not in program order; that is tracked by `Layout`.
    insts: PrimaryMap<Inst, InstructionData>,

    /// The result value of each instruction, if it produces one.
    results: SecondaryMap<Inst, PackedOption<Value>>,

    /// Primary value table with entries for all values.
    values: PrimaryMap<Value, ValueData>,

    /// Function arguments, in declaration order.
    args: Vec<Value>,

    /// External function references.
    pub ext_funcs: PrimaryMap<FuncRef, ExtFuncData>,

    /// Optional source-level names for values. Sparse; most temporaries are
    /// anonymous.
    names: FxHashMap<Value, String>,

    /// Names already handed out, for uniquing.
    taken_names: FxHashSet<String>,
}

impl DataFlowGraph {
    /// Create a new empty `DataFlowGraph`.
    pub fn new() -> Self {
        Self {
            insts: PrimaryMap::new(),
            results: SecondaryMap::new(),
            values: PrimaryMap::new(),
            args: Vec::new(),
            ext_funcs: PrimaryMap::new(),
            names: FxHashMap::default(),
            taken_names: FxHashSet::default(),
        }
    }

    /// Declare a new function argument of type `ty`.
    pub fn append_arg(&mut self, ty: Type) -> Value {
        let index = self.args.len();
        let value = self.values.push(ValueData {
            ty,
            def: ValueDef::Arg(index),
        });
        self.args.push(value);
        value
    }

    /// The function's arguments, in order.
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Create a new instruction from `data`. The instruction is not inserted
    /// into the layout and has no result yet.
    pub fn make_inst(&mut self, data: InstructionData) -> Inst {
        self.insts.push(data)
    }

    /// Attach a result value of type `ty` to `inst`.
    pub fn make_inst_result(&mut self, inst: Inst, ty: Type) -> Value {
        debug_assert!(self.results[inst].is_none(), "instruction already has a result");
        let value = self.values.push(ValueData {
            ty,
            def: ValueDef::Result(inst),
        });
        self.results[inst] = value.into();
        value
    }

    /// Declare an external function.
    pub fn import_function(&mut self, data: ExtFuncData) -> FuncRef {
        self.ext_funcs.push(data)
    }

    /// Get the instruction data of `inst`.
    pub fn inst(&self, inst: Inst) -> &InstructionData {
        &self.insts[inst]
    }

    /// Get mutable instruction data of `inst`.
    pub fn inst_mut(&mut self, inst: Inst) -> &mut InstructionData {
        &mut self.insts[inst]
    }

    /// The result value of `inst`, if it has one.
    pub fn inst_result(&self, inst: Inst) -> Option<Value> {
        self.results[inst].expand()
    }

    /// Where was `value` defined?
    pub fn value_def(&self, value: Value) -> ValueDef {
        self.values[value].def
    }

    /// The type of `value`.
    pub fn value_type(&self, value: Value) -> Type {
        self.values[value].ty
    }

    /// True if `value` is defined by an `iconst` instruction.
    pub fn is_const(&self, value: Value) -> bool {
        match self.value_def(value) {
            ValueDef::Result(inst) => self.insts[inst].opcode() == Opcode::Iconst,
            ValueDef::Arg(_) => false,
        }
    }

    /// The constant value of `value` if it is defined by `iconst`.
    pub fn const_value(&self, value: Value) -> Option<i64> {
        match self.value_def(value) {
            ValueDef::Result(inst) => match self.insts[inst] {
                InstructionData::UnaryImm { imm, .. } => Some(imm),
                _ => None,
            },
            ValueDef::Arg(_) => None,
        }
    }

    /// Attach a source-level name to `value`. If the name is already taken by
    /// another value, a numeric suffix keeps it unique.
    pub fn set_value_name(&mut self, value: Value, name: impl Into<String>) {
        let name = name.into();
        let unique = if self.taken_names.contains(&name) {
            let mut counter = 1;
            loop {
                let candidate = format!("{name}{counter}");
                if !self.taken_names.contains(&candidate) {
                    break candidate;
                }
                counter += 1;
            }
        } else {
            name
        };
        self.taken_names.insert(unique.clone());
        self.names.insert(value, unique);
    }

    /// The source-level name of `value`, if it has one.
    pub fn value_name(&self, value: Value) -> Option<&str> {
        self.names.get(&value).map(|s| s.as_str())
    }

    /// Number of instructions created.
    pub fn num_insts(&self) -> usize {
        self.insts.len()
    }

    /// Iterate over all instructions in creation order.
    pub fn insts(&self) -> impl Iterator<Item = Inst> + '_ {
        self.insts.keys()
    }

    /// Collect the instructions that use `value` as an operand.
    ///
    /// Computed by scanning the instruction table; the functions this analysis
    /// deals with are small and the layout never drops instructions.
    pub fn users(&self, value: Value) -> SmallVec<[Inst; 8]> {
        self.insts
            .iter()
            .filter(|(_, data)| data.arguments().contains(&value))
            .map(|(inst, _)| inst)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::instructions::InstructionData;
    use crate::ir::Opcode;

    #[test]
    fn args_and_results() {
        let mut dfg = DataFlowGraph::new();
        let a = dfg.append_arg(Type::I32);
        let b = dfg.append_arg(Type::I32);
        assert_eq!(dfg.args(), &[a, b]);
        assert_eq!(dfg.value_def(a), ValueDef::Arg(0));
        assert_eq!(dfg.value_type(b), Type::I32);

        let inst = dfg.make_inst(InstructionData::Binary {
            opcode: Opcode::Iadd,
            args: [a, b],
        });
        let r = dfg.make_inst_result(inst, Type::I32);
        assert_eq!(dfg.value_def(r), ValueDef::Result(inst));
        assert_eq!(dfg.inst_result(inst), Some(r));
    }

    #[test]
    fn constants() {
        let mut dfg = DataFlowGraph::new();
        let inst = dfg.make_inst(InstructionData::UnaryImm {
            ty: Type::I32,
            imm: 7,
        });
        let c = dfg.make_inst_result(inst, Type::I32);
        assert!(dfg.is_const(c));
        assert_eq!(dfg.const_value(c), Some(7));

        let a = dfg.append_arg(Type::I32);
        assert!(!dfg.is_const(a));
        assert_eq!(dfg.const_value(a), None);
    }

    #[test]
    fn value_names_are_uniqued() {
        let mut dfg = DataFlowGraph::new();
        let a = dfg.append_arg(Type::I32);
        let b = dfg.append_arg(Type::I32);
        let c = dfg.append_arg(Type::I32);
        dfg.set_value_name(a, "redef.a");
        dfg.set_value_name(b, "redef.a");
        dfg.set_value_name(c, "redef.a");
        assert_eq!(dfg.value_name(a), Some("redef.a"));
        assert_eq!(dfg.value_name(b), Some("redef.a1"));
        assert_eq!(dfg.value_name(c), Some("redef.a2"));
    }

    #[test]
    fn users_scan() {
        let mut dfg = DataFlowGraph::new();
        let a = dfg.append_arg(Type::I32);
        let b = dfg.append_arg(Type::I32);
        let add = dfg.make_inst(InstructionData::Binary {
            opcode: Opcode::Iadd,
            args: [a, b],
        });
        let r = dfg.make_inst_result(add, Type::I32);
        let mul = dfg.make_inst(InstructionData::Binary {
            opcode: Opcode::Imul,
            args: [r, a],
        });
        dfg.make_inst_result(mul, Type::I32);

        assert_eq!(dfg.users(a).as_slice(), &[add, mul]);
        assert_eq!(dfg.users(r).as_slice(), &[mul]);
        assert!(dfg.users(b).as_slice() == &[add]);
    }
}
