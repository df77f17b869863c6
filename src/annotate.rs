//! Range metadata annotation and verification.
//!
//! The annotator stamps every analyzed instruction with the string form of
//! its range under the `"sra"` metadata key. The verifier re-runs the engine
//! and reports every instruction whose freshly computed range no longer
//! matches the stamped one, which catches transformations that invalidate
//! recorded analysis results.

use crate::analysis::RangeAnalysis;
use crate::ir::{Function, Inst};
use thiserror::Error;

/// The metadata key ranges are stored under.
pub const RANGE_METADATA_KEY: &str = "sra";

/// A range recorded in metadata that the engine no longer reproduces.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("ranges differ on {inst}: expected {expected}, got {got}")]
pub struct VerifierError {
    /// The instruction whose metadata disagrees.
    pub inst: Inst,
    /// The range recorded in metadata.
    pub expected: String,
    /// The range the engine computed now.
    pub got: String,
}

/// All mismatches found by one verification run.
#[derive(Debug, PartialEq, Eq)]
pub struct VerifierErrors(pub Vec<VerifierError>);

impl std::error::Error for VerifierErrors {}

impl std::fmt::Display for VerifierErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

/// Analyze `func` and attach each integer instruction's range as `"sra"`
/// metadata.
pub fn annotate(func: &mut Function, sra: &mut RangeAnalysis) {
    sra.analyze(func);

    let mut stamps: Vec<(Inst, String)> = Vec::new();
    for block in func.layout.blocks() {
        for &inst in func.layout.block_insts(block) {
            if let Some(value) = func.dfg.inst_result(inst) {
                let range = sra.range_of(func, value);
                stamps.push((inst, range.display(sra.pool()).to_string()));
            }
        }
    }
    for (inst, text) in stamps {
        func.set_metadata(inst, RANGE_METADATA_KEY, text);
    }
}

/// Re-analyze `func` and compare the computed ranges against the `"sra"`
/// metadata stamped earlier. Returns all mismatches.
pub fn verify(func: &mut Function, sra: &mut RangeAnalysis) -> Result<(), VerifierErrors> {
    sra.analyze(func);

    let mut errors = Vec::new();
    for block in func.layout.blocks() {
        for &inst in func.layout.block_insts(block) {
            let expected = match func.metadata(inst, RANGE_METADATA_KEY) {
                Some(expected) => expected.to_string(),
                None => continue,
            };
            let value = match func.dfg.inst_result(inst) {
                Some(value) => value,
                None => continue,
            };
            let got = sra.range_of(func, value).display(sra.pool()).to_string();
            if got != expected {
                errors.push(VerifierError {
                    inst,
                    expected,
                    got,
                });
            }
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(VerifierErrors(errors))
    }
}
