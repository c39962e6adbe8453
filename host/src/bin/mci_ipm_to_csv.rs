//! Extract a Mastercard IPM file to CSV.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::process::ExitCode;

use iso8583::MessageCodec;
use mciipm::{ipm_info, IpmReader};

use cardutil_host::args::{self, Parsed, ToolArgs};
use cardutil_host::{csv, init_logging, report, resolve_encoding, settings};

const TOOL: &str = "mci_ipm_to_csv";

fn main() -> ExitCode {
    let parsed = match args::parse(std::env::args().skip(1), false) {
        Ok(parsed) => parsed,
        Err(message) => {
            eprintln!("{TOOL}: {message}");
            eprintln!("usage: {TOOL} in_filename [-o out_filename] [--in-encoding enc] \
                       [--no1014blocking] [--config-file file] [--debug]");
            return ExitCode::FAILURE;
        }
    };
    let tool_args = match parsed {
        Parsed::Run(tool_args) => tool_args,
        Parsed::Help => {
            println!("usage: {TOOL} in_filename [-o out_filename] [--in-encoding enc] \
                      [--no1014blocking] [--config-file file] [--debug]");
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
            diagnose(&tool_args);
            ExitCode::FAILURE
        }
    }
}

fn run(tool_args: &ToolArgs) -> Result<usize, Box<dyn std::error::Error>> {
    let (config, source) = settings::load_config(tool_args.config_file.as_deref())?;
    report::print_config_source(&source);
    let encoding = resolve_encoding(tool_args.in_encoding.as_deref())?;

    let in_file = BufReader::new(File::open(&tool_args.in_filename)?);
    let out_path = tool_args.out_or_default(".csv");
    let mut out_file = BufWriter::new(File::create(&out_path)?);

    let codec = MessageCodec::new(&config.bit_config)
        .encoding(encoding)
        .hex_bin(true);
    let reader = IpmReader::with_blocking(in_file, codec, tool_args.blocked());

    let columns = &config.output_data_elements;
    csv::write_header(&mut out_file, columns)?;
    let mut records = 0;
    for record in reader {
        csv::write_record(&mut out_file, columns, &record?)?;
        records += 1;
    }
    out_file.flush()?;
    Ok(records)
}

/// On failure, take a first look at the input and say what it seems
/// to be.
fn diagnose(tool_args: &ToolArgs) {
    let Ok(mut file) = File::open(&tool_args.in_filename) else {
        return;
    };
    let mut sample = vec![0u8; 2500];
    let mut have = 0;
    while have < sample.len() {
        match file.read(&mut sample[have..]) {
            Ok(0) | Err(_) => break,
            Ok(n) => have += n,
        }
    }
    sample.truncate(have);

    let config = mciipm::Config::default();
    report::print_ipm_diagnostics(&ipm_info(&sample, &config.bit_config));
}
