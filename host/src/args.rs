//! Command line argument handling.
//!
//! All the tools share one small flag set, so parsing is a hand-rolled
//! walk over `std::env::args` rather than a parser dependency.

use std::path::PathBuf;

/// Arguments common to every tool.
#[derive(Debug, Default, Clone)]
pub struct ToolArgs {
    pub in_filename: PathBuf,
    /// Second positional, where a tool wants one (the table id).
    pub table_id: Option<String>,
    pub out_filename: Option<PathBuf>,
    pub in_encoding: Option<String>,
    pub out_encoding: Option<String>,
    pub no1014blocking: bool,
    pub config_file: Option<PathBuf>,
    pub debug: bool,
}

impl ToolArgs {
    /// Input framing selected by the blocking flag.
    pub fn blocked(&self) -> bool {
        !self.no1014blocking
    }

    /// Output path, defaulting to the input path plus a suffix.
    pub fn out_or_default(&self, suffix: &str) -> PathBuf {
        self.out_filename.clone().unwrap_or_else(|| {
            let mut name = self.in_filename.as_os_str().to_os_string();
            name.push(suffix);
            PathBuf::from(name)
        })
    }
}

/// Outcome of parsing: run, or exit after an informational flag.
#[derive(Debug)]
pub enum Parsed {
    Run(ToolArgs),
    Help,
    Version,
}

/// Parse the shared flag set. `wants_table_id` adds the second
/// positional that the parameter extract tool takes.
pub fn parse<I>(args: I, wants_table_id: bool) -> Result<Parsed, String>
where
    I: IntoIterator<Item = String>,
{
    let mut parsed = ToolArgs::default();
    let mut positionals: Vec<String> = Vec::new();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Parsed::Help),
            "--version" => return Ok(Parsed::Version),
            "-o" | "--out-filename" => {
                parsed.out_filename = Some(PathBuf::from(take_value(&arg, &mut args)?));
            }
            "--in-encoding" => parsed.in_encoding = Some(take_value(&arg, &mut args)?),
            "--out-encoding" => parsed.out_encoding = Some(take_value(&arg, &mut args)?),
            "--config-file" => {
                parsed.config_file = Some(PathBuf::from(take_value(&arg, &mut args)?));
            }
            "--no1014blocking" => parsed.no1014blocking = true,
            "--debug" => parsed.debug = true,
            other if other.starts_with('-') => {
                return Err(format!("unknown option: {other}"));
            }
            _ => positionals.push(arg),
        }
    }

    let expected = if wants_table_id { 2 } else { 1 };
    if positionals.len() != expected {
        return Err(format!(
            "expected {expected} positional argument{}, got {}",
            if expected == 1 { "" } else { "s" },
            positionals.len()
        ));
    }
    let mut positionals = positionals.into_iter();
    parsed.in_filename = PathBuf::from(positionals.next().expect("checked above"));
    parsed.table_id = positionals.next();
    Ok(Parsed::Run(parsed))
}

fn take_value<I>(flag: &str, args: &mut I) -> Result<String, String>
where
    I: Iterator<Item = String>,
{
    args.next().ok_or_else(|| format!("{flag} needs a value"))
}
