//! The decompiler collaborator.
//!
//! Decompilation itself happens outside this crate. A [`Decompiler`] hands
//! over the p-code of the function under analysis, bounded by a timeout.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use reflex_ir::FunctionIr;
use tracing::debug;

use crate::error::AnalysisError;

/// Time allowed for the decompiler to produce a function.
pub const DECOMPILATION_TIMEOUT: Duration = Duration::from_secs(300);

/// Source of decompiled functions.
pub trait Decompiler {
    /// Produce the p-code of the target function within `timeout`.
    fn decompile(&self, timeout: Duration) -> Result<FunctionIr, AnalysisError>;
}

/// An already decompiled function.
impl Decompiler for FunctionIr {
    fn decompile(&self, _timeout: Duration) -> Result<FunctionIr, AnalysisError> {
        if self.is_empty() {
            return Err(AnalysisError::DecompilationUnavailable(
                "function has no p-code".to_string(),
            ));
        }
        Ok(self.clone())
    }
}

/// Reads a function listing exported by the decompiler as JSON.
#[derive(Clone, Debug)]
pub struct ListingDecompiler {
    path: PathBuf,
}

impl ListingDecompiler {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Decompiler for ListingDecompiler {
    fn decompile(&self, timeout: Duration) -> Result<FunctionIr, AnalysisError> {
        let (tx, rx) = mpsc::channel();
        let path = self.path.clone();

        std::thread::spawn(move || {
            let _ = tx.send(FunctionIr::load(&path));
        });

        // The loader thread is abandoned on timeout.
        let func = match rx.recv_timeout(timeout) {
            Ok(result) => result?,
            Err(RecvTimeoutError::Timeout) => {
                return Err(AnalysisError::DecompilationTimeout(timeout));
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(AnalysisError::DecompilationUnavailable(format!(
                    "loader for {} exited without a result",
                    self.path.display()
                )));
            }
        };

        debug!(path = %self.path.display(), ops = func.len(), "loaded function listing");
        func.decompile(timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reflex_ir::{Opcode, PcodeOp, Space, Varnode};

    fn listing() -> FunctionIr {
        FunctionIr::new(vec![PcodeOp::with_output(
            Opcode::Copy,
            vec![Varnode::constant(1, 7, 4)],
            Varnode::new(2, Space::Register, 0, 4),
        )])
        .with_name("yylex")
    }

    #[test]
    fn test_listing_decompiler() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("yylex.json");
        std::fs::write(&path, listing().to_json().unwrap()).unwrap();

        let func = ListingDecompiler::new(&path).decompile(DECOMPILATION_TIMEOUT).unwrap();
        assert_eq!(func, listing());
    }

    #[test]
    fn test_missing_listing() {
        let dir = tempfile::tempdir().unwrap();
        let decompiler = ListingDecompiler::new(dir.path().join("missing.json"));
        assert!(matches!(
            decompiler.decompile(DECOMPILATION_TIMEOUT),
            Err(AnalysisError::Ir(_))
        ));
    }

    #[test]
    fn test_empty_function_is_unavailable() {
        assert!(matches!(
            FunctionIr::default().decompile(DECOMPILATION_TIMEOUT),
            Err(AnalysisError::DecompilationUnavailable(_))
        ));
    }
}
