//! DOT and plain-text renderings of a reconstructed DFA.

use std::collections::BTreeSet;
use std::fmt::Write;

use crate::dfa::Dfa;

/// Alphabets at least this large are labelled `all`.
const ALL_THRESHOLD: usize = 255;
/// Alphabets larger than this are labelled `long`.
const LONG_THRESHOLD: usize = 50;

/// Quote a byte string the way a debugger would print it.
fn quote_bytes(bytes: &BTreeSet<u8>) -> String {
    let mut out = String::from("'");
    for &b in bytes {
        match b {
            b'\\' => out.push_str("\\\\"),
            b'\'' => out.push_str("\\'"),
            b'\t' => out.push_str("\\t"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            0x20..=0x7e => out.push(char::from(b)),
            _ => {
                let _ = write!(out, "\\x{b:02x}");
            }
        }
    }
    out.push('\'');
    out
}

/// Compact edge label for a transition alphabet.
pub fn alphabet_label(bytes: &BTreeSet<u8>) -> String {
    if bytes.len() >= ALL_THRESHOLD {
        "all".to_string()
    } else if bytes.len() > LONG_THRESHOLD {
        "long".to_string()
    } else if bytes.is_empty() {
        "•".to_string()
    } else {
        quote_bytes(bytes)
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Render the DFA as a Graphviz digraph. Accepting states are drawn as
/// double circles and labelled with the rule they accept.
pub fn render_dot(dfa: &Dfa) -> String {
    let mut out = String::from("digraph dfa {\n");
    for (state, accepts) in dfa.states() {
        if accepts == 0 {
            let _ = writeln!(out, "    {state} [ label=\"|{state}|\" ];");
        } else {
            let _ = writeln!(
                out,
                "    {state} [ label=\"|{state}|/{accepts}\" shape=doublecircle ];"
            );
        }
    }
    for (from, to, bytes) in dfa.transitions() {
        let _ = writeln!(
            out,
            "    {from} -> {to} [ label=\"{}\" ];",
            escape(&alphabet_label(bytes))
        );
    }
    out.push_str("}\n");
    out
}

/// Render the DFA in the plain `.dfa` format:
///
/// ```text
/// <start>
/// <node count>
/// <id> <1 if accepting else 0>
/// ...
/// <edge count>
/// <from> <to> <byte> <byte> ...
/// ...
/// ```
///
/// Rule 1 is flex's default rule, so only states accepting a higher rule
/// count as accepting.
pub fn render_dfa(dfa: &Dfa, start: u32) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{start}");
    let _ = writeln!(out, "{}", dfa.state_count());
    for (state, accepts) in dfa.states() {
        let _ = writeln!(out, "{state} {}", u8::from(accepts > 1));
    }
    let _ = writeln!(out, "{}", dfa.transition_count());
    for (from, to, bytes) in dfa.transitions() {
        let _ = write!(out, "{from} {to}");
        for b in bytes {
            let _ = write!(out, " {b}");
        }
        out.push('\n');
    }
    out
}

/// Render the per-state exit bytes, one state per line.
pub fn render_exits(dfa: &Dfa) -> String {
    let mut out = String::new();
    for (state, bytes) in dfa.exits() {
        let _ = writeln!(out, "{state}: {}", alphabet_label(&bytes));
    }
    out
}
