//! Property-set (`\0PSF`) decoder and writer.
//!
//! ## Header (0x14 bytes, little-endian)
//! ```text
//! [0x00] Magic "\0PSF"      (4 bytes)
//! [0x04] Version            (4 bytes, ignored)
//! [0x08] LabelTableOffset   (u32)
//! [0x0C] ValueTableOffset   (u32)
//! [0x10] SectionCount       (u32)
//! ```
//!
//! ## Section (0x10 bytes, directly after the header)
//! ```text
//! [0x00] LabelOffset  (u16, relative to the label table)
//! [0x02] Reserved     (u8)
//! [0x03] ValueType    (u8: 2 = UTF-8 string, 4 = u32)
//! [0x04] UsedLength   (u32)
//! [0x08] MaxLength    (u32, ignored)
//! [0x0C] ValueOffset  (u32, relative to the value table)
//! ```

use crate::{
    error::{FormatError, FormatResult},
    models::{PropertyMap, PropertyValue},
};

use super::bytes;

/// Property-set signature.
pub const PROPERTY_SET_MAGIC: &[u8; 4] = b"\0PSF";

const HEADER_LEN: u64 = 0x14;
const SECTION_LEN: u64 = 0x10;
const TYPE_STRING: u8 = 2;
const TYPE_INTEGER: u8 = 4;
/// Version stamped by [`PropertySetWriter`].
const WRITER_VERSION: u32 = 0x0101;

#[derive(Debug, Clone, Copy)]
struct Section {
    label_offset: u16,
    value_type: u8,
    used_length: u32,
    value_offset: u32,
}

impl Section {
    fn read(blob: &[u8], offset: u64) -> FormatResult<Self> {
        Ok(Self {
            label_offset: bytes::le_u16(blob, offset)?,
            value_type: bytes::u8_at(blob, offset + 3)?,
            used_length: bytes::le_u32(blob, offset + 4)?,
            value_offset: bytes::le_u32(blob, offset + 12)?,
        })
    }
}

/// Decode a property-set blob into an insertion-ordered map.
///
/// Sections with an unknown value type are skipped. Duplicate labels keep the
/// first position but take the last value.
pub fn decode_property_set(blob: &[u8]) -> FormatResult<PropertyMap> {
    bytes::magic(blob, PROPERTY_SET_MAGIC, "property set")?;
    let label_table = bytes::le_u32(blob, 0x08)? as u64;
    let value_table = bytes::le_u32(blob, 0x0C)? as u64;
    let section_count = bytes::le_u32(blob, 0x10)? as u64;

    let mut properties = PropertyMap::new();
    for i in 0..section_count {
        let section = Section::read(blob, HEADER_LEN + i * SECTION_LEN)?;
        let value_start = value_table + section.value_offset as u64;

        let value = match section.value_type {
            TYPE_STRING => {
                let raw = bytes::range(blob, value_start, section.used_length as u64)?;
                let raw = raw.strip_suffix(&[0]).unwrap_or(raw);
                PropertyValue::Text(String::from_utf8_lossy(raw).into_owned())
            }
            TYPE_INTEGER => PropertyValue::Integer(bytes::le_u32(blob, value_start)?),
            other => {
                tracing::trace!(section = i, value_type = other, "skipping unknown value type");
                continue;
            }
        };

        let label = bytes::nul_string(blob, label_table + section.label_offset as u64)?;
        properties.insert(label, value);
    }

    Ok(properties)
}

/// Encodes a [`PropertyMap`] with the section layout the decoder reads.
///
/// Labels are packed NUL-terminated in insertion order; the label table is
/// padded to a 4-byte boundary and every value slot is rounded up to 4 bytes.
#[derive(Debug, Default)]
pub struct PropertySetWriter {
    entries: Vec<(String, RawValue)>,
}

#[derive(Debug)]
enum RawValue {
    Known(PropertyValue),
    Opaque { value_type: u8, bytes: Vec<u8> },
}

impl PropertySetWriter {
    /// Start an empty property set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Writer pre-populated from a decoded map.
    pub fn from_map(map: &PropertyMap) -> Self {
        let mut writer = Self::new();
        for (label, value) in map {
            writer = writer.value(label, value.clone());
        }
        writer
    }

    /// Append a string property.
    pub fn text(self, label: &str, value: &str) -> Self {
        self.value(label, PropertyValue::Text(value.to_string()))
    }

    /// Append an integer property.
    pub fn integer(self, label: &str, value: u32) -> Self {
        self.value(label, PropertyValue::Integer(value))
    }

    /// Append a typed property.
    pub fn value(mut self, label: &str, value: PropertyValue) -> Self {
        self.entries.push((label.to_string(), RawValue::Known(value)));
        self
    }

    /// Append a section with an arbitrary type tag and raw payload.
    pub fn opaque(mut self, label: &str, value_type: u8, bytes: Vec<u8>) -> Self {
        self.entries
            .push((label.to_string(), RawValue::Opaque { value_type, bytes }));
        self
    }

    /// Serialize the blob.
    pub fn build(&self) -> Vec<u8> {
        let (labels, label_offsets) = self.label_table();
        let (values, slots) = self.value_table();

        let label_table = HEADER_LEN as usize + self.entries.len() * SECTION_LEN as usize;
        let value_table = label_table + labels.len();

        let mut out = Vec::with_capacity(value_table + values.len());
        out.extend_from_slice(PROPERTY_SET_MAGIC);
        out.extend_from_slice(&WRITER_VERSION.to_le_bytes());
        out.extend_from_slice(&(label_table as u32).to_le_bytes());
        out.extend_from_slice(&(value_table as u32).to_le_bytes());
        out.extend_from_slice(&(self.entries.len() as u32).to_le_bytes());

        for (label_offset, slot) in label_offsets.iter().zip(&slots) {
            out.extend_from_slice(&label_offset.to_le_bytes());
            out.push(0x04);
            out.push(slot.value_type);
            out.extend_from_slice(&slot.used.to_le_bytes());
            out.extend_from_slice(&slot.max.to_le_bytes());
            out.extend_from_slice(&slot.offset.to_le_bytes());
        }

        out.extend_from_slice(&labels);
        out.extend_from_slice(&values);
        out
    }

    fn label_table(&self) -> (Vec<u8>, Vec<u16>) {
        let mut table = Vec::new();
        let mut offsets = Vec::with_capacity(self.entries.len());
        for (label, _) in &self.entries {
            offsets.push(table.len() as u16);
            table.extend_from_slice(label.as_bytes());
            table.push(0);
        }
        pad_to_word(&mut table);
        (table, offsets)
    }

    fn value_table(&self) -> (Vec<u8>, Vec<Slot>) {
        let mut table = Vec::new();
        let mut slots = Vec::with_capacity(self.entries.len());
        for (_, value) in &self.entries {
            let (value_type, mut payload) = match value {
                RawValue::Known(PropertyValue::Text(text)) => {
                    let mut payload = text.as_bytes().to_vec();
                    payload.push(0);
                    (TYPE_STRING, payload)
                }
                RawValue::Known(PropertyValue::Integer(n)) => {
                    (TYPE_INTEGER, n.to_le_bytes().to_vec())
                }
                RawValue::Opaque { value_type, bytes } => (*value_type, bytes.clone()),
            };
            let used = payload.len() as u32;
            pad_to_word(&mut payload);
            slots.push(Slot {
                value_type,
                used,
                max: payload.len() as u32,
                offset: table.len() as u32,
            });
            table.extend_from_slice(&payload);
        }
        (table, slots)
    }
}

struct Slot {
    value_type: u8,
    used: u32,
    max: u32,
    offset: u32,
}

fn pad_to_word(buf: &mut Vec<u8>) {
    while buf.len() % 4 != 0 {
        buf.push(0);
    }
}

/// Split a blob built by [`PropertySetWriter`] into its label and value tables.
///
/// Used to compare layouts byte for byte.
pub fn tables(blob: &[u8]) -> FormatResult<(&[u8], &[u8])> {
    bytes::magic(blob, PROPERTY_SET_MAGIC, "property set")?;
    let label_table = bytes::le_u32(blob, 0x08)? as u64;
    let value_table = bytes::le_u32(blob, 0x0C)? as u64;
    let labels = value_table
        .checked_sub(label_table)
        .ok_or_else(|| FormatError::truncated(label_table, 0, blob.len() as u64))?;
    let label_bytes = bytes::range(blob, label_table, labels)?;
    let value_bytes = bytes::range(
        blob,
        value_table,
        (blob.len() as u64).saturating_sub(value_table),
    )?;
    Ok((label_bytes, value_bytes))
}
