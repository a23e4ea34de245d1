//! Command implementations.

mod analyze;
mod dfa;

use std::time::Duration;

use reflex::{AnalysisOptions, DfaOptions};

use crate::cli::{Cli, Commands};

/// Dispatch CLI command to the appropriate handler.
pub fn run_command(cli: &Cli) -> i32 {
    let show_progress = !cli.silent;
    match &cli.command {
        Commands::Analyze {
            elf,
            ir,
            output,
            keep_copies,
            keep_indirects,
            timeout,
        } => {
            let options = AnalysisOptions::new()
                .with_remove_copies(!keep_copies)
                .with_remove_indirects(!keep_indirects)
                .with_timeout(Duration::from_secs(*timeout));
            analyze::cmd_analyze(elf, ir, output, options, show_progress)
        }
        Commands::Dfa {
            input,
            output,
            tables,
            max_state,
            start,
            endianness,
            keep_nulls,
            strip_states,
            split,
        } => {
            let options = DfaOptions::new()
                .with_strip_nulls(!keep_nulls)
                .with_strip_states(strip_states.iter().copied());
            dfa::cmd_dfa(
                input,
                output,
                tables.to_flex_tables((*endianness).into()),
                *max_state,
                *start,
                &options,
                *split,
            )
        }
    }
}
