//! Extract one table of a Mastercard IPM parameter file to CSV.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::process::ExitCode;

use mciipm::IpmParamReader;

use cardutil_host::args::{self, Parsed, ToolArgs};
use cardutil_host::{csv, init_logging, report, resolve_encoding, settings};

const TOOL: &str = "mci_ipm_param_to_csv";

fn main() -> ExitCode {
    let usage = format!(
        "usage: {TOOL} in_filename table_id [-o out_filename] [--in-encoding enc] \
         [--no1014blocking] [--config-file file] [--debug]"
    );
    let parsed = match args::parse(std::env::args().skip(1), true) {
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
    let encoding = resolve_encoding(tool_args.in_encoding.as_deref())?;
    let table_id = tool_args.table_id.as_deref().expect("table_id positional");

    let in_file = BufReader::new(File::open(&tool_args.in_filename)?);
    let out_path = tool_args.out_or_default(".csv");
    let mut out_file = BufWriter::new(File::create(&out_path)?);

    let reader = IpmParamReader::with_blocking(
        in_file,
        table_id,
        &config.mci_parameter_tables,
        encoding,
        tool_args.blocked(),
    )?;

    // fixed leading columns, then the table's own in declared order
    let mut columns = vec![
        "table_id".to_string(),
        "effective_timestamp".to_string(),
        "active_inactive_code".to_string(),
    ];
    columns.extend(config.mci_parameter_tables[table_id].keys().cloned());

    csv::write_header(&mut out_file, &columns)?;
    let mut records = 0;
    for record in reader {
        csv::write_record(&mut out_file, &columns, &record?)?;
        records += 1;
    }
    out_file.flush()?;
    Ok(records)
}
