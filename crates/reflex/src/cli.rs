//! CLI definitions and argument types.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use reflex::{Endianness, FlexTables, SizedOffset};

/// Exit code for success.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code for failure.
pub const EXIT_FAILURE: i32 = 1;

#[derive(Parser)]
#[command(name = "reflex")]
#[command(about = "Recovers flex scanner tables from decompiled lexer functions")]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (sets RUST_LOG=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output (only show errors)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub silent: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Default tracing directive for the chosen verbosity.
    pub const fn log_directive(&self) -> &'static str {
        if self.verbose {
            "reflex=debug"
        } else if self.silent {
            "reflex=error"
        } else {
            "reflex=info"
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the dataflow graph of a scanner function and guess its tables
    Analyze {
        /// Scanner binary
        #[arg(long, value_name = "ELF")]
        elf: PathBuf,

        /// Function listing exported by the decompiler (JSON)
        #[arg(long, value_name = "JSON")]
        ir: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        /// Keep COPY operations in the simplified graph
        #[arg(long)]
        keep_copies: bool,

        /// Keep INDIRECT operations in the simplified graph
        #[arg(long)]
        keep_indirects: bool,

        /// Decompilation timeout in seconds
        #[arg(long, default_value = "300")]
        timeout: u64,
    },
    /// Rebuild the scanner DFA from located tables
    Dfa {
        /// Scanner binary
        #[arg(value_name = "BIN")]
        input: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        #[command(flatten)]
        tables: TableArgs,

        /// Number of real DFA states; higher states are flex templates
        #[arg(long)]
        max_state: u32,

        /// Start state written to the `.dfa` file
        #[arg(long, default_value = "1")]
        start: u32,

        /// Byte order of table elements
        #[arg(long, value_enum, default_value = "little")]
        endianness: EndiannessArg,

        /// Keep transitions on the NUL equivalence class
        #[arg(long)]
        keep_nulls: bool,

        /// Drop transitions into this state (repeatable)
        #[arg(long = "strip-state", value_name = "STATE")]
        strip_states: Vec<u32>,

        /// Also write one sub-DFA per accepted rule
        #[arg(long)]
        split: bool,
    },
}

/// Table locations, each `OFFSET:SIZE` with a hex or decimal file offset.
#[derive(clap::Args, Clone, Debug)]
pub struct TableArgs {
    /// yy_accept location
    #[arg(long, value_name = "OFF:SIZE", value_parser = parse_table)]
    pub accept: SizedOffset,

    /// yy_base location
    #[arg(long, value_name = "OFF:SIZE", value_parser = parse_table)]
    pub base: SizedOffset,

    /// yy_chk location
    #[arg(long, value_name = "OFF:SIZE", value_parser = parse_table)]
    pub chk: SizedOffset,

    /// yy_def location
    #[arg(long, value_name = "OFF:SIZE", value_parser = parse_table)]
    pub def: SizedOffset,

    /// yy_ec location
    #[arg(long, value_name = "OFF:SIZE", value_parser = parse_table)]
    pub ec: SizedOffset,

    /// yy_meta location
    #[arg(long, value_name = "OFF:SIZE", value_parser = parse_table)]
    pub meta: SizedOffset,

    /// yy_nxt location
    #[arg(long, value_name = "OFF:SIZE", value_parser = parse_table)]
    pub nxt: SizedOffset,
}

impl TableArgs {
    pub const fn to_flex_tables(&self, endianness: Endianness) -> FlexTables {
        FlexTables {
            accept: self.accept,
            base: self.base,
            chk: self.chk,
            def: self.def,
            ec: self.ec,
            meta: self.meta,
            nxt: self.nxt,
            endianness,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum EndiannessArg {
    Little,
    Big,
}

impl From<EndiannessArg> for Endianness {
    fn from(arg: EndiannessArg) -> Self {
        match arg {
            EndiannessArg::Little => Self::Little,
            EndiannessArg::Big => Self::Big,
        }
    }
}

fn parse_u64(s: &str) -> Result<u64, String> {
    let parsed = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .map_or_else(|| s.parse(), |hex| u64::from_str_radix(hex, 16));
    parsed.map_err(|e| format!("invalid offset '{s}': {e}"))
}

/// Parse `OFFSET:SIZE`.
pub fn parse_table(s: &str) -> Result<SizedOffset, String> {
    let (offset, size) = s
        .split_once(':')
        .ok_or_else(|| format!("expected OFFSET:SIZE, got '{s}'"))?;
    let offset = parse_u64(offset.trim())?;
    let size: u8 = size
        .trim()
        .parse()
        .map_err(|e| format!("invalid element size '{size}': {e}"))?;
    SizedOffset::new(offset, size).map_err(|e| e.to_string())
}
