//! Field table configuration.
//!
//! The codec is configuration driven: a [`BitConfig`] maps each data
//! element number to a [`FieldSpec`] describing its layout on the wire.
//! Tables are built once (from JSON or from [`default_bit_config`]) and
//! shared read-only across codec instances.

use std::collections::BTreeMap;

use serde::Deserialize;

/// Wire layout of a field: fixed width or variable with a 2/3 digit
/// character length prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum FieldKind {
    #[serde(rename = "FIXED")]
    Fixed,
    #[serde(rename = "LLVAR")]
    LlVar,
    #[serde(rename = "LLLVAR")]
    LllVar,
}

impl FieldKind {
    /// Number of length-prefix digits on the wire.
    pub fn prefix_digits(&self) -> usize {
        match self {
            FieldKind::Fixed => 0,
            FieldKind::LlVar => 2,
            FieldKind::LllVar => 3,
        }
    }
}

/// How the field value is represented on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum DataType {
    /// Alphanumeric text in the message encoding, space padded.
    #[default]
    #[serde(rename = "AN")]
    Alphanumeric,
    /// Numeric text in the message encoding, zero padded.
    #[serde(rename = "N")]
    Numeric,
    /// Raw bytes, untouched by the encoding layer.
    #[serde(rename = "B")]
    Binary,
    /// Packed BCD digits, two per byte, high nibble first.
    #[serde(rename = "NS")]
    PackedNumeric,
}

/// Decode-side projection applied to a field after its value is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Processor {
    /// EMV tag walk: adds `ICC_DATA` plus `TAG<hh>` keys.
    #[serde(rename = "ICC")]
    Icc,
    /// Merchant name/location split: adds `DE43_*` keys.
    #[serde(rename = "DE43")]
    De43,
    /// Mask the PAN, first 6 / last 4 retained.
    #[serde(rename = "PAN")]
    Pan,
    /// Keep only the 9-digit PAN prefix.
    #[serde(rename = "PAN-PREFIX")]
    PanPrefix,
}

/// Layout of a single data element.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    /// Exact unit count for FIXED fields; declared maximum for *VAR
    /// fields, with 0 meaning "no declared maximum".
    #[serde(default)]
    pub length: usize,
    #[serde(default)]
    pub data_type: DataType,
    /// Marks the field as a PDS subfield container.
    #[serde(default)]
    pub subfields: bool,
    /// strftime-style pattern for calendar valued fields.
    #[serde(default)]
    pub date_format: Option<String>,
    #[serde(default)]
    pub processor: Option<Processor>,
}

impl FieldSpec {
    pub fn new(name: &str, kind: FieldKind, length: usize) -> Self {
        FieldSpec {
            name: name.to_string(),
            kind,
            length,
            data_type: DataType::default(),
            subfields: false,
            date_format: None,
            processor: None,
        }
    }

    pub fn data_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    pub fn subfields(mut self) -> Self {
        self.subfields = true;
        self
    }

    pub fn date_format(mut self, pattern: &str) -> Self {
        self.date_format = Some(pattern.to_string());
        self
    }

    pub fn processor(mut self, processor: Processor) -> Self {
        self.processor = Some(processor);
        self
    }
}

/// The field table: data element number (2..=128) to field layout.
///
/// Deserialises from the `bit_config` JSON object, whose keys are the
/// element numbers as decimal strings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct BitConfig {
    fields: BTreeMap<u32, FieldSpec>,
}

impl BitConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, bit: u32, spec: FieldSpec) {
        self.fields.insert(bit, spec);
    }

    pub fn get(&self, bit: u32) -> Option<&FieldSpec> {
        self.fields.get(&bit)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &FieldSpec)> {
        self.fields.iter().map(|(&bit, spec)| (bit, spec))
    }

    /// PDS container fields in ascending element order.
    pub fn pds_containers(&self) -> Vec<u32> {
        self.fields
            .iter()
            .filter(|(_, spec)| spec.subfields)
            .map(|(&bit, _)| bit)
            .collect()
    }

    /// Strip the PDS container markers. Used by the re-encoding tools so
    /// container payloads pass through as opaque text instead of being
    /// re-assembled from subfield keys.
    pub fn without_pds_containers(&self) -> Self {
        let mut copy = self.clone();
        for spec in copy.fields.values_mut() {
            spec.subfields = false;
        }
        copy
    }
}

/// The built-in Mastercard IPM field table.
pub fn default_bit_config() -> BitConfig {
    use DataType::{Binary, Numeric};
    use FieldKind::{Fixed, LlVar, LllVar};

    let mut config = BitConfig::new();
    let mut add = |bit: u32, spec: FieldSpec| config.insert(bit, spec);

    add(2, FieldSpec::new("PAN", LlVar, 0).data_type(Numeric));
    add(3, FieldSpec::new("Processing code", Fixed, 6).data_type(Numeric));
    add(4, FieldSpec::new("Amount transaction", Fixed, 12).data_type(Numeric));
    add(5, FieldSpec::new("Amount, Reconciliation", Fixed, 12).data_type(Numeric));
    add(6, FieldSpec::new("Amount, Cardholder billing", Fixed, 12).data_type(Numeric));
    add(9, FieldSpec::new("Conversion rate, Reconciliation", Fixed, 8).data_type(Numeric));
    add(10, FieldSpec::new("Conversion rate, Cardholder billing", Fixed, 8).data_type(Numeric));
    add(
        12,
        FieldSpec::new("Date/Time local transaction", Fixed, 12)
            .data_type(Numeric)
            .date_format("%y%m%d%H%M%S"),
    );
    add(14, FieldSpec::new("Expiration date", Fixed, 4));
    add(22, FieldSpec::new("Point of service data code", Fixed, 12));
    add(23, FieldSpec::new("Card sequence number", Fixed, 3));
    add(24, FieldSpec::new("Function code", Fixed, 3));
    add(25, FieldSpec::new("Message reason code", Fixed, 4));
    add(26, FieldSpec::new("Card acceptor business code", Fixed, 4).data_type(Numeric));
    add(30, FieldSpec::new("Amounts, original", Fixed, 24));
    add(31, FieldSpec::new("Acquirer reference data", LlVar, 23));
    add(32, FieldSpec::new("Acquiring institution ID code", LlVar, 0));
    add(33, FieldSpec::new("Forwarding institution ID code", LlVar, 0));
    add(37, FieldSpec::new("Retrieval reference number", Fixed, 12));
    add(38, FieldSpec::new("Approval code", Fixed, 6));
    add(40, FieldSpec::new("Service code", Fixed, 3));
    add(41, FieldSpec::new("Card acceptor terminal ID", Fixed, 8));
    add(42, FieldSpec::new("Card acceptor Id", Fixed, 15));
    add(
        43,
        FieldSpec::new("Card acceptor name/location", LlVar, 0).processor(Processor::De43),
    );
    add(48, FieldSpec::new("Additional data", LllVar, 0).subfields());
    add(49, FieldSpec::new("Currency code, Transaction", Fixed, 3));
    add(50, FieldSpec::new("Currency code, Reconciliation", Fixed, 3));
    add(51, FieldSpec::new("Currency code, Cardholder billing", Fixed, 3));
    add(54, FieldSpec::new("Amounts, additional", LllVar, 0));
    add(
        55,
        FieldSpec::new("ICC system related data", LllVar, 255)
            .data_type(Binary)
            .processor(Processor::Icc),
    );
    add(62, FieldSpec::new("Additional data 2", LllVar, 0).subfields());
    add(63, FieldSpec::new("Transaction lifecycle Id", LllVar, 16));
    add(71, FieldSpec::new("Message number", Fixed, 8).data_type(Numeric));
    add(72, FieldSpec::new("Data record", LllVar, 0));
    add(73, FieldSpec::new("Date, Action", Fixed, 6));
    add(93, FieldSpec::new("Transaction destination institution ID", LlVar, 0));
    add(94, FieldSpec::new("Transaction originator institution ID", LlVar, 0));
    add(95, FieldSpec::new("Card issuer reference data", LlVar, 10));
    add(100, FieldSpec::new("Receiving institution ID", LlVar, 11));
    add(111, FieldSpec::new("Amount, currency conversion assignment", LllVar, 0));
    add(123, FieldSpec::new("Additional data 3", LllVar, 0).subfields());
    add(124, FieldSpec::new("Additional data 4", LllVar, 0).subfields());
    add(125, FieldSpec::new("Additional data 5", LllVar, 0).subfields());
    add(127, FieldSpec::new("Network data", LllVar, 0));

    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_containers() {
        let config = default_bit_config();
        assert_eq!(config.pds_containers(), vec![48, 62, 123, 124, 125]);
        assert!(config.get(2).is_some());
        assert!(config.get(1).is_none());
    }

    #[test]
    fn test_without_pds_containers() {
        let config = default_bit_config().without_pds_containers();
        assert!(config.pds_containers().is_empty());
        // everything else is untouched
        assert_eq!(config.get(48).unwrap().kind, FieldKind::LllVar);
    }

    #[test]
    fn test_deserialise_from_json() {
        let json = r#"{
            "2": {"name": "PAN", "type": "LLVAR", "length": 0, "data_type": "N"},
            "48": {"name": "Additional data", "type": "LLLVAR", "subfields": true},
            "55": {"name": "ICC", "type": "LLLVAR", "length": 255, "data_type": "B", "processor": "ICC"}
        }"#;
        let config: BitConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.get(2).unwrap().data_type, DataType::Numeric);
        assert!(config.get(48).unwrap().subfields);
        assert_eq!(config.get(55).unwrap().processor, Some(Processor::Icc));
        assert_eq!(config.pds_containers(), vec![48]);
    }
}
