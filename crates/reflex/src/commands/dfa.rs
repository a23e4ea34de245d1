//! DFA command.

use std::path::{Path, PathBuf};

use reflex::{Dfa, DfaOptions, FlexTables, TableReader};
use tracing::{debug, error, info};

use crate::cli::{EXIT_FAILURE, EXIT_SUCCESS};
use crate::terminal;

/// Write `dfa` as `<stem>.dot` and `<stem>.dfa`.
fn write_dfa(output: &Path, stem: &str, dfa: &Dfa, start: u32) -> std::io::Result<Vec<PathBuf>> {
    let dot = output.join(format!("{stem}.dot"));
    std::fs::write(&dot, reflex::render_dot(dfa))?;
    let text = output.join(format!("{stem}.dfa"));
    std::fs::write(&text, reflex::render_dfa(dfa, start))?;
    Ok(vec![dot, text])
}

/// Write the rule-`out` sub-automaton, then one automaton per source state
/// limited to what that source reaches.
fn write_split(output: &Path, dfa: &Dfa, out: u32) -> std::io::Result<Vec<PathBuf>> {
    let sub = dfa.restrict_to_accept(out);
    if sub.transition_count() == 0 {
        debug!(out, "rule has no transitions, skipping");
        return Ok(Vec::new());
    }

    let dot = output.join(format!("accept_{out}.dot"));
    std::fs::write(&dot, reflex::render_dot(&sub))?;
    let mut written = vec![dot];

    for source in sub.sources() {
        let part = sub.reachable_from(source);
        if part.transition_count() == 0 {
            continue;
        }
        written.extend(write_dfa(output, &format!("accept_{out}_{source}"), &part, source)?);
    }
    Ok(written)
}

fn write_outputs(output: &Path, dfa: &Dfa, start: u32, split: bool) -> std::io::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output)?;

    let mut written = write_dfa(output, "out", dfa, start)?;
    written.extend(write_dfa(output, &format!("reachable_{start}"), &dfa.reachable_from(start), start)?);
    let exits = output.join("exits.txt");
    std::fs::write(&exits, reflex::render_exits(dfa))?;
    written.push(exits);

    if split {
        // Rule 1 is the default echo rule.
        for out in 2..=dfa.max_accept() {
            written.extend(write_split(output, dfa, out)?);
        }
    }
    Ok(written)
}

/// Handle the `dfa` command.
pub fn cmd_dfa(
    input: &Path,
    output: &Path,
    tables: FlexTables,
    max_state: u32,
    start: u32,
    options: &DfaOptions,
    split: bool,
) -> i32 {
    info!(input = %input.display(), output = %output.display(), max_state, "rebuilding dfa");

    let data = match std::fs::read(input) {
        Ok(data) => data,
        Err(e) => {
            error!(error = %e, "failed to read binary");
            return EXIT_FAILURE;
        }
    };

    let reader = TableReader::new(&data, tables);
    let dfa = match reflex::reconstruct(&reader, max_state, options) {
        Ok(dfa) => dfa,
        Err(e) => {
            error!(error = %e, "dfa reconstruction failed");
            return EXIT_FAILURE;
        }
    };
    terminal::success(&format!(
        "Rebuilt {} states, {} transitions",
        dfa.state_count(),
        dfa.transition_count()
    ));

    match write_outputs(output, &dfa, start, split) {
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
