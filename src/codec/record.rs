//! Range records
//!
//! One parsed row of the source table:
//! ```text
//! startAddress, endAddress, startNumber, endNumber, countryCode, countryName
//! "31.204.65.64","31.204.65.95","533479744","533479775","FI","Finland"
//! ```

use crate::config::NumericPolicy;
use crate::error::{GeoError, Result};

use super::{CompositeKey, CompositeValue};

/// Number of leading fields a row must provide; the rest are ignored
const FIELD_COUNT: usize = 6;

const SEPARATOR: char = ',';
const QUOTE: char = '"';

/// A single IP range and the country it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeRecord {
    pub start_address: String,
    pub end_address: String,
    pub start_number: i64,
    pub end_number: i64,
    pub country_code: String,
    pub country_name: String,
}

impl RangeRecord {
    /// Parse one source line
    ///
    /// Under `NumericPolicy::ZeroFill` missing fields become empty strings and
    /// unparsable numbers become 0; under `Reject` either is an error.
    pub fn parse(line: &str, policy: NumericPolicy) -> Result<Self> {
        let line = line.trim_end_matches(&['\r', '\n'][..]);
        let mut fields = split_fields(line);

        if fields.len() < FIELD_COUNT {
            match policy {
                NumericPolicy::Reject => {
                    return Err(GeoError::malformed(
                        line,
                        format!("expected {} fields, found {}", FIELD_COUNT, fields.len()),
                    ));
                }
                NumericPolicy::ZeroFill => {
                    tracing::debug!(
                        "Row has {} of {} fields, padding: {}",
                        fields.len(),
                        FIELD_COUNT,
                        line
                    );
                    fields.resize(FIELD_COUNT, String::new());
                }
            }
        }
        fields.truncate(FIELD_COUNT);

        let start_number = parse_number(line, &fields[2], "startNumber", policy)?;
        let end_number = parse_number(line, &fields[3], "endNumber", policy)?;

        let [start_address, end_address, _, _, country_code, country_name]: [String; FIELD_COUNT] =
            fields
                .try_into()
                .map_err(|_| GeoError::malformed(line, "field count changed while parsing"))?;

        Ok(Self {
            start_address,
            end_address,
            start_number,
            end_number,
            country_code,
            country_name,
        })
    }

    /// The composite key this record is stored under
    pub fn key(&self) -> CompositeKey {
        CompositeKey::new(self.start_number, self.end_number)
    }

    /// The composite value this record stores
    pub fn value(&self) -> CompositeValue {
        CompositeValue {
            country_code: self.country_code.clone(),
            country_name: self.country_name.clone(),
            start_address: self.start_address.clone(),
            end_address: self.end_address.clone(),
        }
    }

    /// Encode into the `(key, value)` byte pair written to the index
    pub fn encode(&self) -> Result<(Vec<u8>, Vec<u8>)> {
        Ok((self.key().encode(), self.value().encode()?))
    }
}

fn parse_number(line: &str, field: &str, name: &str, policy: NumericPolicy) -> Result<i64> {
    match field.trim().parse::<i64>() {
        Ok(n) => Ok(n),
        Err(e) => match policy {
            NumericPolicy::Reject => Err(GeoError::malformed(
                line,
                format!("{} {:?} is not an integer: {}", name, field, e),
            )),
            NumericPolicy::ZeroFill => {
                tracing::debug!("{} {:?} is not an integer, using 0: {}", name, field, line);
                Ok(0)
            }
        },
    }
}

/// Split a CSV line into fields
///
/// Fields may be wrapped in double quotes, which are removed; inside quotes a
/// comma is literal and `""` stands for one quote character. An unterminated
/// quote runs to the end of the line.
fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::with_capacity(FIELD_COUNT);
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            QUOTE if in_quotes => {
                if chars.peek() == Some(&QUOTE) {
                    current.push(QUOTE);
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            QUOTE => in_quotes = true,
            SEPARATOR if !in_quotes => fields.push(std::mem::take(&mut current)),
            other => current.push(other),
        }
    }
    fields.push(current);

    fields
}
