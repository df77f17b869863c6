//! A complete function: data flow graph, layout, and metadata.

use crate::ir::dfg::DataFlowGraph;
use crate::ir::layout::Layout;
use crate::ir::Inst;
use rustc_hash::FxHashMap;

/// A function.
///
/// Functions can be cloned, but it is not a very fast operation. The clone can
/// be used to compare analysis results across transformations.
pub struct Function {
    /// Name of this function.
    pub name: String,

    /// Data flow graph containing the instructions and values.
    pub dfg: DataFlowGraph,

    /// Layout of blocks and instructions in program order.
    pub layout: Layout,

    /// Per-instruction string metadata, keyed by a metadata kind such as
    /// `"sra"`. Sparse; only annotated instructions have entries.
    metadata: FxHashMap<Inst, Vec<(String, String)>>,
}

impl Function {
    /// Create a function with the given name.
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dfg: DataFlowGraph::new(),
            layout: Layout::new(),
            metadata: FxHashMap::default(),
        }
    }

    /// Attach metadata of the given kind to `inst`, replacing any previous
    /// entry of that kind.
    pub fn set_metadata(&mut self, inst: Inst, kind: &str, data: impl Into<String>) {
        let entries = self.metadata.entry(inst).or_default();
        match entries.iter_mut().find(|(k, _)| k == kind) {
            Some((_, v)) => *v = data.into(),
            None => entries.push((kind.to_string(), data.into())),
        }
    }

    /// Get the metadata of the given kind attached to `inst`, if any.
    pub fn metadata(&self, inst: Inst, kind: &str) -> Option<&str> {
        self.metadata
            .get(&inst)?
            .iter()
            .find(|(k, _)| k == kind)
            .map(|(_, v)| v.as_str())
    }
}
