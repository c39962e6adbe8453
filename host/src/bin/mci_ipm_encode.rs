//! Re-encode a Mastercard IPM file between character encodings.
//!
//! Text fields are transcoded; binary fields pass through untouched.
//! PDS container fields are treated as opaque text so the conversion
//! cannot reshape their contents.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::process::ExitCode;

use iso8583::MessageCodec;
use mciipm::{IpmReader, IpmWriter};

use cardutil_host::args::{self, Parsed, ToolArgs};
use cardutil_host::{init_logging, report, resolve_encoding, settings};

const TOOL: &str = "mci_ipm_encode";

fn main() -> ExitCode {
    let usage = format!(
        "usage: {TOOL} in_filename [-o out_filename] [--in-encoding enc] \
         [--out-encoding enc] [--no1014blocking] [--config-file file] [--debug]"
    );
    let parsed = match args::parse(std::env::args().skip(1), false) {
        Ok(parsed) => parsed,
        Err(message) => {
            eprintln!("{TOOL}: {message}");
            eprintln!("{usage}");
            return ExitCode::FAILURE;
        }
    };
    let tool_args = match parsed {
        Parsed::Run(tool_args) => tool_args,
        Parsed::Help => {
            println!("{usage}");
            return ExitCode::SUCCESS;
        }
        Parsed::Version => {
            report::print_version(TOOL);
            return ExitCode::SUCCESS;
        }
    };

    init_logging(tool_args.debug);
    report::print_banner(TOOL, &tool_args);

    match run(&tool_args) {
        Ok(records) => {
            println!("{records} records written");
            ExitCode::SUCCESS
        }
        Err(err) => {
            report::print_error(err.as_ref());
            ExitCode::FAILURE
        }
    }
}

fn run(tool_args: &ToolArgs) -> Result<usize, Box<dyn std::error::Error>> {
    let (config, source) = settings::load_config(tool_args.config_file.as_deref())?;
    report::print_config_source(&source);
    let in_encoding = resolve_encoding(tool_args.in_encoding.as_deref().or(Some("cp500")))?;
    let out_encoding = resolve_encoding(tool_args.out_encoding.as_deref())?;

    let in_file = BufReader::new(File::open(&tool_args.in_filename)?);
    let out_path = tool_args.out_or_default(".out");
    let out_file = BufWriter::new(File::create(&out_path)?);

    // containers stay opaque during conversion
    let table = config.bit_config.without_pds_containers();
    let reader = IpmReader::with_blocking(
        in_file,
        MessageCodec::new(&table).encoding(in_encoding),
        tool_args.blocked(),
    );
    let mut writer = IpmWriter::with_blocking(
        out_file,
        MessageCodec::new(&table).encoding(out_encoding),
        tool_args.blocked(),
    );

    let mut records = 0;
    for record in reader {
        writer.write(&record?)?;
        records += 1;
    }
    writer.close()?;
    Ok(records)
}
