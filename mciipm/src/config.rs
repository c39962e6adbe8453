//! The toolkit configuration document.
//!
//! A single JSON object carries everything the tools need: the ISO
//! 8583 field table, the CSV projection order, the parameter table
//! layouts and the record length ceiling. Every key falls back to the
//! built-in Mastercard defaults when absent.

use serde::Deserialize;

use iso8583::{default_bit_config, BitConfig};

use crate::params::{default_param_tables, ParamTables};
use crate::vbs::DEFAULT_MAX_RECORD_LENGTH;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bit_config: BitConfig,

    /// Flat-record keys the CSV projection emits, in order.
    pub output_data_elements: Vec<String>,

    pub mci_parameter_tables: ParamTables,

    #[serde(rename = "MAX_VBS_RECORD_LENGTH")]
    pub max_vbs_record_length: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bit_config: default_bit_config(),
            output_data_elements: default_output_data_elements(),
            mci_parameter_tables: default_param_tables(),
            max_vbs_record_length: DEFAULT_MAX_RECORD_LENGTH,
        }
    }
}

/// The default CSV projection.
pub fn default_output_data_elements() -> Vec<String> {
    [
        "MTI", "DE2", "DE3", "DE4", "DE12", "DE14", "DE22", "DE23", "DE24", "DE25", "DE26",
        "DE30", "DE31", "DE33", "DE37", "DE38", "DE40", "DE41", "DE42", "DE48", "DE49", "DE50",
        "DE63", "DE71", "DE73", "DE93", "DE94", "DE95", "DE100", "PDS0023", "PDS0052", "PDS0122",
        "PDS0148", "PDS0158", "PDS0165", "DE43_NAME", "DE43_SUBURB", "DE43_POSTCODE", "ICC_DATA",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.max_vbs_record_length, 6000);
        assert!(config.bit_config.get(2).is_some());
        assert!(config.mci_parameter_tables.contains_key("IP0040T1"));
        assert_eq!(config.output_data_elements[0], "MTI");
    }

    #[test]
    fn test_partial_json_overrides() {
        let json = r#"{
            "bit_config": {
                "2": {"name": "PAN", "type": "LLVAR", "length": 0}
            },
            "output_data_elements": ["MTI", "DE2"],
            "MAX_VBS_RECORD_LENGTH": 9000
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.max_vbs_record_length, 9000);
        assert_eq!(config.output_data_elements, vec!["MTI", "DE2"]);
        assert!(config.bit_config.get(48).is_none());
        // untouched keys keep their defaults
        assert!(config.mci_parameter_tables.contains_key("IP0006T1"));
    }
}
