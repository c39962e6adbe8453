//! Console output shared by the tools: the startup banner, run
//! statistics and error reports.

use crate::args::ToolArgs;
use crate::settings::ConfigSource;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn print_banner(tool: &str, args: &ToolArgs) {
    println!("{tool} (cardutil {VERSION})");
    println!("parameters:");
    println!(" -in_filename:{}", args.in_filename.display());
    if let Some(table_id) = &args.table_id {
        println!(" -table_id:{table_id}");
    }
    if let Some(out) = &args.out_filename {
        println!(" -out_filename:{}", out.display());
    }
    if let Some(encoding) = &args.in_encoding {
        println!(" -in_encoding:{encoding}");
    }
    if let Some(encoding) = &args.out_encoding {
        println!(" -out_encoding:{encoding}");
    }
    if args.no1014blocking {
        println!(" -no1014blocking:true");
    }
    if let Some(config) = &args.config_file {
        println!(" -config_file:{}", config.display());
    }
}

pub fn print_version(tool: &str) {
    println!("{tool} (cardutil {VERSION})");
}

pub fn print_config_source(source: &ConfigSource) {
    match source {
        ConfigSource::File(path) => println!("using config file {}", path.display()),
        ConfigSource::BuiltIn => {}
    }
}

pub fn print_error(err: &dyn std::error::Error) {
    eprintln!("*** ERROR - processing has stopped ***");
    eprintln!("{err}");
    let mut source = err.source();
    while let Some(cause) = source {
        eprintln!("caused by: {cause}");
        source = cause.source();
    }
}

/// Diagnostics printed when an IPM file fails to process.
pub fn print_ipm_diagnostics(info: &mciipm::IpmInfo) {
    eprintln!("IPM file diagnostics:");
    if !info.is_valid {
        eprintln!("The file does not appear to be in the correct format");
        if let Some(reason) = &info.reason {
            eprintln!("Reason: {reason}");
        }
        return;
    }
    eprintln!("The file seems to be valid based on analysis of the file");
    eprintln!("The following parameters were detected");
    eprintln!(
        "File encoding: {}",
        info.encoding.unwrap_or("unknown")
    );
    eprintln!("1014 blocking: {}", info.is_blocked);
}
