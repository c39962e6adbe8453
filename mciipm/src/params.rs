//! IPM parameter extract reader.
//!
//! A parameter extract is a VBS file of fixed-column text rows
//! (expanded format). Every row leads with an effective timestamp
//! (chars 0..10), an active/inactive code (10..11) and a table id
//! (11..19); the remaining columns are declared per table in the
//! `mci_parameter_tables` configuration as half-open character ranges.

use std::io::Read;

use log::debug;
use serde::Deserialize;

use iso8583::{dates, Encoding, Record, Value};

use crate::error::Error;
use crate::vbs::VbsReader;

/// Common leading columns of every expanded parameter row.
const EFF_TIMESTAMP: (usize, usize) = (0, 10);
const ACTIVE_INACTIVE_CODE: (usize, usize) = (10, 11);
const TABLE_ID: (usize, usize) = (11, 19);

/// Wire pattern for `datetime` typed columns.
const COLUMN_DATE_FORMAT: &str = "%y%m%d";

/// Declared data type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ColumnType {
    #[serde(rename = "datetime")]
    DateTime,
}

/// A half-open `[start, end)` character range within a row.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnSpec {
    pub start: usize,
    pub end: usize,
    #[serde(default, rename = "type")]
    pub column_type: Option<ColumnType>,
}

/// Columns of one parameter table, keyed by column name.
pub type TableLayout = std::collections::BTreeMap<String, ColumnSpec>;

/// All configured parameter tables, keyed by table id.
pub type ParamTables = std::collections::BTreeMap<String, TableLayout>;

/// Iterates the rows of one table in a parameter extract.
pub struct IpmParamReader<R: Read> {
    vbs: VbsReader<R>,
    table_id: String,
    layout: TableLayout,
    encoding: Encoding,
}

impl<R: Read> IpmParamReader<R> {
    pub fn new(
        source: R,
        table_id: &str,
        tables: &ParamTables,
        encoding: Encoding,
    ) -> Result<Self, Error> {
        Self::build(VbsReader::new(source), table_id, tables, encoding)
    }

    pub fn blocked(
        source: R,
        table_id: &str,
        tables: &ParamTables,
        encoding: Encoding,
    ) -> Result<Self, Error> {
        Self::build(VbsReader::blocked(source), table_id, tables, encoding)
    }

    pub fn with_blocking(
        source: R,
        table_id: &str,
        tables: &ParamTables,
        encoding: Encoding,
        blocked: bool,
    ) -> Result<Self, Error> {
        if blocked {
            Self::blocked(source, table_id, tables, encoding)
        } else {
            Self::new(source, table_id, tables, encoding)
        }
    }

    fn build(
        vbs: VbsReader<R>,
        table_id: &str,
        tables: &ParamTables,
        encoding: Encoding,
    ) -> Result<Self, Error> {
        let layout = tables.get(table_id).cloned().ok_or_else(|| {
            Error::Config(format!("parameter config not available for table {table_id}"))
        })?;
        Ok(IpmParamReader {
            vbs,
            table_id: table_id.to_string(),
            layout,
            encoding,
        })
    }

    fn extract(&self, chars: &[char], record_number: usize) -> Result<Record, Error> {
        let mut record = Record::new();
        record.insert("table_id".into(), Value::Text(self.table_id.clone()));
        record.insert(
            "effective_timestamp".into(),
            Value::Text(slice(chars, EFF_TIMESTAMP.0, EFF_TIMESTAMP.1)),
        );
        record.insert(
            "active_inactive_code".into(),
            Value::Text(slice(chars, ACTIVE_INACTIVE_CODE.0, ACTIVE_INACTIVE_CODE.1)),
        );

        for (name, column) in &self.layout {
            if column.end > chars.len() || column.start > column.end {
                return Err(Error::Param {
                    record: record_number,
                    reason: format!(
                        "row of {} characters too short for column {name} [{}, {})",
                        chars.len(),
                        column.start,
                        column.end
                    ),
                });
            }
            let mut text = slice(chars, column.start, column.end);
            if column.column_type == Some(ColumnType::DateTime) && !text.trim().is_empty() {
                text = dates::wire_to_iso(0, COLUMN_DATE_FORMAT, text.trim_end()).map_err(|e| {
                    let detail = e.to_string();
                    Error::Param {
                        record: record_number,
                        reason: format!(
                            "column {name}: {}",
                            detail.strip_prefix("DE0: ").unwrap_or(&detail)
                        ),
                    }
                })?;
            }
            record.insert(name.clone(), Value::Text(text));
        }
        Ok(record)
    }
}

fn slice(chars: &[char], start: usize, end: usize) -> String {
    chars[start..end.min(chars.len())].iter().collect()
}

impl<R: Read> Iterator for IpmParamReader<R> {
    type Item = Result<Record, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let payload = match self.vbs.next()? {
                Ok(payload) => payload,
                Err(e) => return Some(Err(e)),
            };
            let record_number = self.vbs.records_read();
            let text = match self.encoding.decode(&payload) {
                Ok(text) => text,
                Err(source) => {
                    return Some(Err(Error::Record {
                        record: record_number,
                        source,
                    }))
                }
            };
            let chars: Vec<char> = text.chars().collect();
            if chars.len() < TABLE_ID.1 {
                debug!("record {record_number}: too short for a parameter row, skipped");
                continue;
            }
            if slice(&chars, TABLE_ID.0, TABLE_ID.1) != self.table_id {
                continue;
            }
            return Some(self.extract(&chars, record_number));
        }
    }
}

/// The built-in parameter table layouts.
pub fn default_param_tables() -> ParamTables {
    let mut tables = ParamTables::new();

    let column = |start: usize, end: usize| ColumnSpec {
        start,
        end,
        column_type: None,
    };
    let date_column = |start: usize, end: usize| ColumnSpec {
        start,
        end,
        column_type: Some(ColumnType::DateTime),
    };

    let mut ip0006t1 = TableLayout::new();
    ip0006t1.insert("card_program_id".into(), column(19, 22));
    ip0006t1.insert("data_element_id".into(), column(22, 25));
    ip0006t1.insert("data_element_name".into(), column(25, 82));
    ip0006t1.insert("data_element_format".into(), column(82, 85));
    ip0006t1.insert("data_element_minimum_length".into(), column(85, 88));
    ip0006t1.insert("data_element_mastercard_maximum_length".into(), column(88, 91));
    ip0006t1.insert("data_element_iso_maximum_length".into(), column(91, 94));
    ip0006t1.insert("de_lll_size".into(), column(94, 95));
    ip0006t1.insert("data_element_subfields".into(), column(95, 97));
    tables.insert("IP0006T1".into(), ip0006t1);

    let mut ip0040t1 = TableLayout::new();
    ip0040t1.insert("issuer_account_range_low".into(), column(19, 38));
    ip0040t1.insert("gcms_product_id".into(), column(38, 41));
    ip0040t1.insert("issuer_account_range_high".into(), column(41, 60));
    ip0040t1.insert("card_program_identifier".into(), column(60, 63));
    ip0040t1.insert("issuer_card_program_identifier_priority_code".into(), column(63, 65));
    ip0040t1.insert("member_id".into(), column(65, 76));
    ip0040t1.insert("product_type_id".into(), column(76, 77));
    ip0040t1.insert("endpoint".into(), column(77, 84));
    ip0040t1.insert("card_country_alpha".into(), column(84, 87));
    ip0040t1.insert("card_country_numeric".into(), column(87, 90));
    ip0040t1.insert("region".into(), column(90, 91));
    ip0040t1.insert("product_class".into(), column(91, 94));
    ip0040t1.insert("transaction_routing_indicator".into(), column(94, 95));
    ip0040t1.insert("first_presentment_reassignment_switch".into(), column(95, 96));
    ip0040t1.insert("product_reassignment_switch".into(), column(96, 97));
    ip0040t1.insert("pwcb_opt_in_switch".into(), column(97, 98));
    ip0040t1.insert("licenced_product_id".into(), column(98, 101));
    ip0040t1.insert("mapping_service_ind".into(), column(101, 102));
    ip0040t1.insert("alm_participation_ind".into(), column(102, 103));
    ip0040t1.insert("alm_activation_date".into(), date_column(103, 109));
    ip0040t1.insert("cardholder_billing_currency_default".into(), column(109, 112));
    ip0040t1.insert("cardholder_billing_currency_exponent_default".into(), column(112, 113));
    ip0040t1.insert("cardholder_bill_primary_currency".into(), column(113, 141));
    ip0040t1.insert("chip_to_magnetic_conversion_service_indicator".into(), column(141, 142));
    ip0040t1.insert("floor_expiration_date".into(), date_column(142, 148));
    ip0040t1.insert("co_brand_participation_switch".into(), column(148, 149));
    ip0040t1.insert("spend_control_switch".into(), column(149, 150));
    ip0040t1.insert("merchant_cleansing_service_participation".into(), column(150, 153));
    ip0040t1.insert("merchant_cleansing_activation_date".into(), date_column(153, 159));
    ip0040t1.insert("paypass_enabled_indicator".into(), column(159, 160));
    ip0040t1.insert("regulated_rate_type_indicator".into(), column(160, 161));
    ip0040t1.insert("psn_route_indicator".into(), column(161, 162));
    ip0040t1.insert("cash_back_without_purchase_indicator".into(), column(162, 163));
    ip0040t1.insert("repower_reload_participation_indicator".into(), column(164, 165));
    ip0040t1.insert("moneysend_indicator".into(), column(165, 166));
    ip0040t1.insert("durban_regulated_rate_indicator".into(), column(166, 167));
    ip0040t1.insert("cash_access_only_participating_indicator".into(), column(167, 168));
    ip0040t1.insert("authentication_indicator".into(), column(168, 169));
    tables.insert("IP0040T1".into(), ip0040t1);

    let mut ip0075t1 = TableLayout::new();
    ip0075t1.insert("card_acceptor_business_code_mcc".into(), column(19, 24));
    ip0075t1.insert("card_acceptor_business_cab_program".into(), column(24, 28));
    ip0075t1.insert(
        "card_acceptor_business_cab_program_life_cycle_indicator".into(),
        column(28, 29),
    );
    ip0075t1.insert("card_acceptor_business_cab_type".into(), column(29, 30));
    ip0075t1.insert("card_acceptor_business_cab_life_cycle_indicator".into(), column(30, 31));
    tables.insert("IP0075T1".into(), ip0075t1);

    let mut ip0095t1 = TableLayout::new();
    ip0095t1.insert("card_program_identifier".into(), column(19, 22));
    ip0095t1.insert("business_service_arrangement_type".into(), column(22, 23));
    ip0095t1.insert("business_service_id_code".into(), column(23, 29));
    ip0095t1.insert("interchange_rate_designator_ird".into(), column(29, 31));
    ip0095t1.insert("card_acceptor_business_cab_program".into(), column(31, 35));
    ip0095t1.insert("life_cycle_indicator".into(), column(35, 36));
    tables.insert("IP0095T1".into(), ip0095t1);

    tables
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vbs::VbsWriter;

    fn param_file(rows: &[&str]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut writer = VbsWriter::new(&mut out);
        for row in rows {
            writer.write(row.as_bytes()).unwrap();
        }
        writer.close().unwrap();
        out
    }

    fn layout() -> ParamTables {
        let mut columns = TableLayout::new();
        columns.insert(
            "code".into(),
            ColumnSpec {
                start: 19,
                end: 22,
                column_type: None,
            },
        );
        columns.insert(
            "activation_date".into(),
            ColumnSpec {
                start: 22,
                end: 28,
                column_type: Some(ColumnType::DateTime),
            },
        );
        let mut tables = ParamTables::new();
        tables.insert("IP0099T1".into(), columns);
        tables
    }

    #[test]
    fn test_extracts_matching_rows() {
        let file = param_file(&[
            "2021-01-01AIP0099T1ABC210523",
            "2021-01-01AIP0000T1ZZZ999999",
            "2021-02-02IIP0099T1DEF700101",
        ]);
        let reader =
            IpmParamReader::new(&file[..], "IP0099T1", &layout(), Encoding::Latin1).unwrap();
        let rows: Vec<Record> = reader.collect::<Result<_, _>>().unwrap();
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].get("table_id"), Some(&Value::Text("IP0099T1".into())));
        assert_eq!(
            rows[0].get("effective_timestamp"),
            Some(&Value::Text("2021-01-01".into()))
        );
        assert_eq!(rows[0].get("active_inactive_code"), Some(&Value::Text("A".into())));
        assert_eq!(rows[0].get("code"), Some(&Value::Text("ABC".into())));
        assert_eq!(
            rows[0].get("activation_date"),
            Some(&Value::Text("2021-05-23".into()))
        );
        // pivot puts 70 in the 1900s
        assert_eq!(
            rows[1].get("activation_date"),
            Some(&Value::Text("1970-01-01".into()))
        );
    }

    #[test]
    fn test_unknown_table_is_config_error() {
        let file = param_file(&[]);
        let result = IpmParamReader::new(&file[..], "IP9999T9", &layout(), Encoding::Latin1);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_short_matching_row_fails() {
        let file = param_file(&["2021-01-01AIP0099T1AB"]);
        let reader =
            IpmParamReader::new(&file[..], "IP0099T1", &layout(), Encoding::Latin1).unwrap();
        let rows: Vec<Result<Record, Error>> = reader.collect();
        assert_eq!(rows.len(), 1);
        assert!(matches!(rows[0], Err(Error::Param { record: 1, .. })));
    }

    #[test]
    fn test_blank_date_column_passes_through() {
        let file = param_file(&["2021-01-01AIP0099T1ABC      "]);
        let reader =
            IpmParamReader::new(&file[..], "IP0099T1", &layout(), Encoding::Latin1).unwrap();
        let rows: Vec<Record> = reader.collect::<Result<_, _>>().unwrap();
        assert_eq!(
            rows[0].get("activation_date"),
            Some(&Value::Text("      ".into()))
        );
    }

    #[test]
    fn test_default_tables() {
        let tables = default_param_tables();
        assert!(tables.contains_key("IP0040T1"));
        let ip0040t1 = &tables["IP0040T1"];
        assert_eq!(ip0040t1["issuer_account_range_low"].start, 19);
        assert_eq!(
            ip0040t1["alm_activation_date"].column_type,
            Some(ColumnType::DateTime)
        );
    }
}
