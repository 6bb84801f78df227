//! Composite keys, values and scan bounds
//!
//! Each component is written as `[len: u16 BE][bytes][eoc: u8]`. The
//! end-of-component byte is the signed equality marker (-1, 0, 1) with its
//! sign bit flipped, so that `LessThanEqual < Equal < GreaterThanEqual` holds
//! under unsigned byte comparison. Stored keys always carry `Equal`.

use std::fmt;

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{GeoError, Result};

/// Width of an encoded integer component
const I64_WIDTH: usize = 8;

/// Bytes one integer component occupies: length + value + eoc
const I64_COMPONENT_SIZE: usize = 2 + I64_WIDTH + 1;

/// How a bound's last component compares against keys sharing its prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i8)]
pub enum Equality {
    /// Sorts before every key that starts with the bound's components
    LessThanEqual = -1,

    /// The component matches exactly; a bound that stops here sorts before
    /// longer keys with the same prefix
    Equal = 0,

    /// Sorts after every key that starts with the bound's components
    GreaterThanEqual = 1,
}

impl Equality {
    /// The end-of-component byte for this mode
    pub fn eoc(self) -> u8 {
        (self as i8 as u8) ^ 0x80
    }

    fn from_eoc(byte: u8) -> Result<Self> {
        match (byte ^ 0x80) as i8 {
            -1 => Ok(Equality::LessThanEqual),
            0 => Ok(Equality::Equal),
            1 => Ok(Equality::GreaterThanEqual),
            other => Err(GeoError::Codec(format!(
                "invalid end-of-component marker {}",
                other
            ))),
        }
    }
}

// =============================================================================
// Component Primitives
// =============================================================================

/// Map an i64 onto a u64 whose big-endian bytes sort like the signed value
fn sortable_i64(value: i64) -> [u8; I64_WIDTH] {
    ((value as u64) ^ (1 << 63)).to_be_bytes()
}

fn unsortable_i64(bytes: [u8; I64_WIDTH]) -> i64 {
    (u64::from_be_bytes(bytes) ^ (1 << 63)) as i64
}

fn put_component(buf: &mut BytesMut, bytes: &[u8], equality: Equality) -> Result<()> {
    let len = u16::try_from(bytes.len()).map_err(|_| {
        GeoError::Codec(format!(
            "component of {} bytes exceeds the {} byte limit",
            bytes.len(),
            u16::MAX
        ))
    })?;
    buf.put_u16(len);
    buf.put_slice(bytes);
    buf.put_u8(equality.eoc());
    Ok(())
}

fn put_i64_component(buf: &mut BytesMut, value: i64, equality: Equality) {
    buf.put_u16(I64_WIDTH as u16);
    buf.put_slice(&sortable_i64(value));
    buf.put_u8(equality.eoc());
}

/// Reads components back out of an encoded composite
struct ComponentReader<'a> {
    buf: &'a [u8],
}

impl<'a> ComponentReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn is_empty(&self) -> bool {
        !self.buf.has_remaining()
    }

    fn next_component(&mut self) -> Result<(&'a [u8], Equality)> {
        if self.buf.remaining() < 2 {
            return Err(GeoError::Codec("truncated component length".to_string()));
        }
        let len = self.buf.get_u16() as usize;

        if self.buf.remaining() < len + 1 {
            return Err(GeoError::Codec(format!(
                "truncated component: need {} bytes, have {}",
                len + 1,
                self.buf.remaining()
            )));
        }
        let buf: &'a [u8] = self.buf;
        let data = &buf[..len];
        self.buf.advance(len);
        let equality = Equality::from_eoc(self.buf.get_u8())?;

        Ok((data, equality))
    }

    fn next_i64(&mut self) -> Result<i64> {
        let (data, _) = self.next_component()?;
        let bytes: [u8; I64_WIDTH] = data.try_into().map_err(|_| {
            GeoError::Codec(format!(
                "integer component must be {} bytes, got {}",
                I64_WIDTH,
                data.len()
            ))
        })?;
        Ok(unsortable_i64(bytes))
    }

    fn next_string(&mut self) -> Result<String> {
        let (data, _) = self.next_component()?;
        String::from_utf8(data.to_vec())
            .map_err(|e| GeoError::Codec(format!("component is not UTF-8: {}", e)))
    }

    fn finish(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(GeoError::Codec(format!(
                "{} trailing bytes after last component",
                self.buf.len()
            )))
        }
    }
}

// =============================================================================
// CompositeKey
// =============================================================================

/// Index key: `(start_number, end_number)`, ordered lexicographically
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CompositeKey {
    pub start: i64,
    pub end: i64,
}

impl CompositeKey {
    /// Size of every encoded key
    pub const ENCODED_LEN: usize = 2 * I64_COMPONENT_SIZE;

    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Encode as two fixed-width integer components
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(Self::ENCODED_LEN);
        put_i64_component(&mut buf, self.start, Equality::Equal);
        put_i64_component(&mut buf, self.end, Equality::Equal);
        buf.to_vec()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut reader = ComponentReader::new(bytes);
        let start = reader.next_i64()?;
        let end = reader.next_i64()?;
        reader.finish()?;
        Ok(Self { start, end })
    }

    /// True when `value` lies inside `[start, end]`
    pub fn covers(&self, value: i64) -> bool {
        self.start <= value && value <= self.end
    }
}

// =============================================================================
// CompositeValue
// =============================================================================

/// Index value: `(country_code, country_name, start_address, end_address)`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompositeValue {
    pub country_code: String,
    pub country_name: String,
    pub start_address: String,
    pub end_address: String,
}

impl CompositeValue {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let parts = [
            &self.country_code,
            &self.country_name,
            &self.start_address,
            &self.end_address,
        ];
        let capacity: usize = parts.iter().map(|p| p.len() + 3).sum();
        let mut buf = BytesMut::with_capacity(capacity);
        for part in parts {
            put_component(&mut buf, part.as_bytes(), Equality::Equal)?;
        }
        Ok(buf.to_vec())
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut reader = ComponentReader::new(bytes);
        let value = Self {
            country_code: reader.next_string()?,
            country_name: reader.next_string()?,
            start_address: reader.next_string()?,
            end_address: reader.next_string()?,
        };
        reader.finish()?;
        Ok(value)
    }
}

impl fmt::Display for CompositeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) {} - {}",
            self.country_code, self.country_name, self.start_address, self.end_address
        )
    }
}

// =============================================================================
// QueryBound
// =============================================================================

/// A possibly partial composite key used as one end of a range scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryBound {
    pub start: i64,
    pub end: Option<i64>,
    pub equality: Equality,
}

impl QueryBound {
    /// Bound on the first component only; the second is left open
    pub fn prefix(start: i64, equality: Equality) -> Self {
        Self {
            start,
            end: None,
            equality,
        }
    }

    /// Bound on both components; `equality` applies to the last one
    pub fn full(key: CompositeKey, equality: Equality) -> Self {
        Self {
            start: key.start,
            end: Some(key.end),
            equality,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(CompositeKey::ENCODED_LEN);
        match self.end {
            None => put_i64_component(&mut buf, self.start, self.equality),
            Some(end) => {
                put_i64_component(&mut buf, self.start, Equality::Equal);
                put_i64_component(&mut buf, end, self.equality);
            }
        }
        buf.to_vec()
    }
}

