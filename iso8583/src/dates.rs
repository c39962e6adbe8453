//! Calendar valued fields.
//!
//! The wire carries dates as digit strings shaped by an strftime-style
//! pattern (`%y%m%d%H%M%S` and friends). Decoded records carry the same
//! key with an ISO 8601 rendering instead; the encoder accepts either
//! the ISO form or a value already in wire shape.
//!
//! Two-digit years use a fixed century pivot: 70..=99 land in the
//! 1900s, 00..=69 in the 2000s.

use time::{Date, Month, Time};

use crate::error::Error;

const CENTURY_PIVOT: u16 = 70;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Year2,
    Year4,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    Literal(char),
}

impl Token {
    fn digits(&self) -> usize {
        match self {
            Token::Year4 => 4,
            Token::Literal(_) => 0,
            _ => 2,
        }
    }
}

fn parse_pattern(pattern: &str) -> Result<Vec<Token>, Error> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            tokens.push(Token::Literal(c));
            continue;
        }
        match chars.next() {
            Some('y') => tokens.push(Token::Year2),
            Some('Y') => tokens.push(Token::Year4),
            Some('m') => tokens.push(Token::Month),
            Some('d') => tokens.push(Token::Day),
            Some('H') => tokens.push(Token::Hour),
            Some('M') => tokens.push(Token::Minute),
            Some('S') => tokens.push(Token::Second),
            other => {
                return Err(Error::Config(format!(
                    "unsupported date format directive %{}",
                    other.map(String::from).unwrap_or_default()
                )))
            }
        }
    }
    Ok(tokens)
}

#[derive(Debug, Default)]
struct Components {
    year: Option<u16>,
    month: Option<u8>,
    day: Option<u8>,
    hour: Option<u8>,
    minute: Option<u8>,
    second: Option<u8>,
}

impl Components {
    /// Validate against the proleptic calendar and render ISO 8601.
    fn to_iso(&self, bit: u32) -> Result<String, Error> {
        let year = self.year.unwrap_or(2000) as i32;
        let month = self.month.unwrap_or(1);
        let day = self.day.unwrap_or(1);
        let month = Month::try_from(month)
            .map_err(|_| Error::field(bit, format!("invalid month {month} in date value")))?;
        let date = Date::from_calendar_date(year, month, day)
            .map_err(|e| Error::field(bit, format!("invalid calendar date: {e}")))?;

        let has_time = self.hour.is_some() || self.minute.is_some() || self.second.is_some();
        if !has_time {
            return Ok(format!(
                "{:04}-{:02}-{:02}",
                date.year(),
                date.month() as u8,
                date.day()
            ));
        }
        let time = Time::from_hms(
            self.hour.unwrap_or(0),
            self.minute.unwrap_or(0),
            self.second.unwrap_or(0),
        )
        .map_err(|e| Error::field(bit, format!("invalid time of day: {e}")))?;
        Ok(format!(
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
            date.year(),
            date.month() as u8,
            date.day(),
            time.hour(),
            time.minute(),
            time.second()
        ))
    }
}

fn take_digits(bit: u32, text: &[char], at: usize, count: usize) -> Result<u16, Error> {
    if at + count > text.len() {
        return Err(Error::field(bit, "date value shorter than its format"));
    }
    let mut out: u16 = 0;
    for &c in &text[at..at + count] {
        let digit = c
            .to_digit(10)
            .ok_or_else(|| Error::field(bit, format!("non-digit {c:?} in date value")))?;
        out = out * 10 + digit as u16;
    }
    Ok(out)
}

/// Expand a two-digit year through the century pivot.
pub fn pivot_year(two_digit: u16) -> u16 {
    if two_digit >= CENTURY_PIVOT {
        1900 + two_digit
    } else {
        2000 + two_digit
    }
}

/// Convert a wire-format date value to ISO 8601.
pub fn wire_to_iso(bit: u32, pattern: &str, value: &str) -> Result<String, Error> {
    let tokens = parse_pattern(pattern)?;
    let chars: Vec<char> = value.chars().collect();
    let mut at = 0;
    let mut parts = Components::default();
    for token in &tokens {
        if let Token::Literal(expected) = token {
            if chars.get(at) != Some(expected) {
                return Err(Error::field(bit, "date value does not match its format"));
            }
            at += 1;
            continue;
        }
        let number = take_digits(bit, &chars, at, token.digits())?;
        at += token.digits();
        match token {
            Token::Year2 => parts.year = Some(pivot_year(number)),
            Token::Year4 => parts.year = Some(number),
            Token::Month => parts.month = Some(number as u8),
            Token::Day => parts.day = Some(number as u8),
            Token::Hour => parts.hour = Some(number as u8),
            Token::Minute => parts.minute = Some(number as u8),
            Token::Second => parts.second = Some(number as u8),
            Token::Literal(_) => unreachable!(),
        }
    }
    if at != chars.len() {
        return Err(Error::field(bit, "date value longer than its format"));
    }
    parts.to_iso(bit)
}

/// Convert an ISO 8601 value (or a value already in wire shape) to the
/// wire format.
pub fn iso_to_wire(bit: u32, pattern: &str, value: &str) -> Result<String, Error> {
    let tokens = parse_pattern(pattern)?;

    // Values already in wire shape pass through once validated.
    let wire_len: usize = tokens.iter().map(|t| t.digits().max(1)).sum();
    if value.chars().count() == wire_len && value.chars().all(|c| c.is_ascii_digit()) {
        wire_to_iso(bit, pattern, value)?;
        return Ok(value.to_string());
    }

    let parts = parse_iso(bit, value)?;
    let mut out = String::new();
    for token in &tokens {
        match token {
            Token::Year2 => out.push_str(&format!("{:02}", parts.year.unwrap_or(2000) % 100)),
            Token::Year4 => out.push_str(&format!("{:04}", parts.year.unwrap_or(2000))),
            Token::Month => out.push_str(&format!("{:02}", parts.month.unwrap_or(1))),
            Token::Day => out.push_str(&format!("{:02}", parts.day.unwrap_or(1))),
            Token::Hour => out.push_str(&format!("{:02}", parts.hour.unwrap_or(0))),
            Token::Minute => out.push_str(&format!("{:02}", parts.minute.unwrap_or(0))),
            Token::Second => out.push_str(&format!("{:02}", parts.second.unwrap_or(0))),
            Token::Literal(c) => out.push(*c),
        }
    }
    Ok(out)
}

fn parse_iso(bit: u32, value: &str) -> Result<Components, Error> {
    let bad = || Error::field(bit, format!("cannot interpret {value:?} as a date"));

    let (date_part, time_part) = match value.split_once(&['T', ' '][..]) {
        Some((d, t)) => (d, Some(t)),
        None => (value, None),
    };

    let mut date_fields = date_part.split('-');
    let year = date_fields.next().and_then(|s| s.parse::<u16>().ok());
    let month = date_fields.next().and_then(|s| s.parse::<u8>().ok());
    let day = date_fields.next().and_then(|s| s.parse::<u8>().ok());
    let (Some(year), Some(month), Some(day)) = (year, month, day) else {
        return Err(bad());
    };

    let mut parts = Components {
        year: Some(year),
        month: Some(month),
        day: Some(day),
        ..Components::default()
    };

    if let Some(time_part) = time_part {
        let mut time_fields = time_part.split(':');
        parts.hour = time_fields.next().and_then(|s| s.parse::<u8>().ok());
        parts.minute = time_fields.next().and_then(|s| s.parse::<u8>().ok());
        parts.second = time_fields
            .next()
            .map(|s| s.split('.').next().unwrap_or(s))
            .and_then(|s| s.parse::<u8>().ok());
        if parts.hour.is_none() {
            return Err(bad());
        }
    }

    // round-trip through the calendar check
    parts.to_iso(bit)?;
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_to_iso_date_time() {
        assert_eq!(
            wire_to_iso(12, "%y%m%d%H%M%S", "210523094512").unwrap(),
            "2021-05-23T09:45:12"
        );
        assert_eq!(wire_to_iso(73, "%y%m%d", "991231").unwrap(), "1999-12-31");
    }

    #[test]
    fn test_century_pivot() {
        assert_eq!(pivot_year(69), 2069);
        assert_eq!(pivot_year(70), 1970);
        assert_eq!(wire_to_iso(73, "%y%m%d", "700101").unwrap(), "1970-01-01");
    }

    #[test]
    fn test_iso_to_wire() {
        assert_eq!(
            iso_to_wire(12, "%y%m%d%H%M%S", "2021-05-23T09:45:12").unwrap(),
            "210523094512"
        );
        assert_eq!(
            iso_to_wire(12, "%y%m%d%H%M%S", "2021-05-23 09:45:12").unwrap(),
            "210523094512"
        );
        assert_eq!(iso_to_wire(73, "%y%m%d", "1999-12-31").unwrap(), "991231");
    }

    #[test]
    fn test_wire_shape_passes_through() {
        assert_eq!(iso_to_wire(73, "%y%m%d", "991231").unwrap(), "991231");
    }

    #[test]
    fn test_invalid_dates_fail() {
        assert!(wire_to_iso(73, "%y%m%d", "990231").is_err());
        assert!(wire_to_iso(73, "%y%m%d", "99123").is_err());
        assert!(wire_to_iso(73, "%y%m%d", "99123a").is_err());
        assert!(iso_to_wire(73, "%y%m%d", "tomorrow").is_err());
        assert!(parse_pattern("%q").is_err());
    }
}
