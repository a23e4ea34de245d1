//! Analyze command.

use std::path::Path;

use reflex::{AnalysisOptions, ListingDecompiler, ReflexAnalysis};
use tracing::{error, info};

use crate::cli::{EXIT_FAILURE, EXIT_SUCCESS};
use crate::terminal::{self, Spinner};

/// Handle the `analyze` command.
pub fn cmd_analyze(
    elf: &Path,
    ir: &Path,
    output: &Path,
    options: AnalysisOptions,
    show_progress: bool,
) -> i32 {
    info!(elf = %elf.display(), ir = %ir.display(), output = %output.display(), "analyzing");

    let memory = match reflex::load_memory_map(elf) {
        Ok(memory) => memory,
        Err(e) => {
            error!(error = %e, "failed to load binary");
            return EXIT_FAILURE;
        }
    };

    let spinner = Spinner::new(format!("Analyzing {}", ir.display()), show_progress);
    let outcome = match ReflexAnalysis::new(&memory, options).run(&ListingDecompiler::new(ir)) {
        Ok(outcome) => outcome,
        Err(e) => {
            spinner.finish_with_failure(&e.to_string());
            error!(error = %e, "analysis failed");
            return EXIT_FAILURE;
        }
    };
    spinner.finish_with_success(&format!("Found {} table candidates", outcome.guesses().len()));

    for addr in outcome.guesses().addresses() {
        println!("{addr:#x}");
    }

    if !outcome.is_simplified() {
        terminal::warning("graph not simplified, only the raw graph was written");
    }

    match outcome.write_to(output) {
        Ok(paths) => {
            for path in &paths {
                terminal::path_output(path);
            }
            EXIT_SUCCESS
        }
        Err(e) => {
            error!(error = %e, "failed to write outputs");
            EXIT_FAILURE
        }
    }
}
