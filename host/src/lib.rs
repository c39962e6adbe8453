//! Shared plumbing for the clearing file command line tools: argument
//! parsing, configuration resolution, CSV output and console reports.

pub mod args;
pub mod csv;
pub mod report;
pub mod settings;

use iso8583::Encoding;

/// Resolve a `--in-encoding`/`--out-encoding` value, defaulting to
/// latin-1 the way the file format does.
pub fn resolve_encoding(name: Option<&str>) -> Result<Encoding, String> {
    match name {
        Some(name) => Encoding::from_name(name).map_err(|e| e.to_string()),
        None => Ok(Encoding::Latin1),
    }
}

/// Initialise logging for a tool run. `--debug` turns on debug logs
/// for the whole stack.
pub fn init_logging(debug: bool) {
    let level = if debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    let _ = env_logger::Builder::new().filter_level(level).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_encoding() {
        assert_eq!(resolve_encoding(None).unwrap(), Encoding::Latin1);
        assert_eq!(resolve_encoding(Some("cp500")).unwrap(), Encoding::Cp500);
        assert!(resolve_encoding(Some("nope")).is_err());
    }
}
