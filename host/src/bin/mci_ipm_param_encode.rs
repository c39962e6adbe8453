//! Re-encode a Mastercard IPM parameter file between character
//! encodings. Parameter records are plain text, so each record is
//! transcoded whole.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::process::ExitCode;

use mciipm::{VbsReader, VbsWriter};

use cardutil_host::args::{self, Parsed, ToolArgs};
use cardutil_host::{init_logging, report, resolve_encoding};

const TOOL: &str = "mci_ipm_param_encode";

fn main() -> ExitCode {
    let usage = format!(
        "usage: {TOOL} in_filename [-o out_filename] [--in-encoding enc] \
         [--out-encoding enc] [--no1014blocking] [--debug]"
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
    let in_encoding = resolve_encoding(tool_args.in_encoding.as_deref())?;
    let out_encoding = match tool_args.out_encoding.as_deref() {
        Some(name) => resolve_encoding(Some(name))?,
        None => in_encoding,
    };

    let in_file = BufReader::new(File::open(&tool_args.in_filename)?);
    let out_path = tool_args.out_or_default(".out");
    let out_file = BufWriter::new(File::create(&out_path)?);

    let reader = if tool_args.blocked() {
        VbsReader::blocked(in_file)
    } else {
        VbsReader::new(in_file)
    };
    let mut writer = if tool_args.blocked() {
        VbsWriter::blocked(out_file)
    } else {
        VbsWriter::new(out_file)
    };

    let mut records = 0;
    for payload in reader {
        let text = in_encoding.decode(&payload?)?;
        writer.write(&out_encoding.encode(&text)?)?;
        records += 1;
    }
    writer.close()?;
    Ok(records)
}
