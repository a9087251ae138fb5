//! Package container (`\x7FCNT`) reader.
//!
//! ## Layout
//! ```text
//! [0x00] Magic "\x7FCNT"            (4 bytes)
//! [0x10] EntryCount                 (u32 BE)
//! [0x18] TableOffset                (u32 BE)
//! ```
//!
//! ## Descriptor (0x20 bytes, big-endian)
//! ```text
//! [0x00] ResourceType  (u32)
//! [0x04] Reserved      (3 × u32)
//! [0x10] Offset        (u32, absolute)
//! [0x14] Size          (u32)
//! [0x18] Reserved      (8 bytes)
//! ```
//!
//! Only two resource types matter here: `0x1000` (the property-set
//! metadata blob, mandatory) and `0x1200` (the icon image, optional).

use std::io::{ErrorKind, Read, Seek, SeekFrom};

use crate::error::{FormatError, FormatResult};

use super::bytes;

/// Container signature.
pub const CONTAINER_MAGIC: &[u8; 4] = b"\x7FCNT";
/// Resource type of the embedded property set.
pub const METADATA_RESOURCE: u32 = 0x1000;
/// Resource type of the embedded icon image.
pub const ICON_RESOURCE: u32 = 0x1200;

const HEADER_LEN: u64 = 0x20;
const ENTRY_COUNT_OFFSET: u64 = 0x10;
const TABLE_OFFSET_OFFSET: u64 = 0x18;
const DESCRIPTOR_LEN: u64 = 0x20;

/// One sub-resource descriptor from the container table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    /// Resource type identifier.
    pub kind: u32,
    /// Absolute byte offset of the resource.
    pub offset: u64,
    /// Resource length in bytes.
    pub size: u64,
}

/// Descriptors located in a container's table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerIndex {
    /// Number of entries the header declares.
    pub entry_count: u32,
    /// Absolute offset of the descriptor table.
    pub table_offset: u64,
    /// The metadata blob descriptor.
    pub metadata: Descriptor,
    /// The icon descriptor, when the package carries one.
    pub icon: Option<Descriptor>,
}

/// Zero-copy view over an in-memory container.
#[derive(Debug, Clone, Copy)]
pub struct ContainerView<'a> {
    data: &'a [u8],
    index: ContainerIndex,
}

/// Parse the container header and locate the metadata and icon descriptors.
///
/// Descriptors are read one at a time and the walk stops as soon as both are
/// found, so a header that over-declares its entry count is tolerated.
pub fn read_container(data: &[u8]) -> FormatResult<ContainerView<'_>> {
    let (entry_count, table_offset) = parse_header(data)?;
    let available = data.len() as u64;

    let mut scan = TableScan::default();
    for i in 0..entry_count as u64 {
        let entry = match bytes::range(data, table_offset + i * DESCRIPTOR_LEN, DESCRIPTOR_LEN) {
            Ok(entry) => entry,
            Err(err) => {
                let found = scan.cut_short(err)?;
                return Ok(view(data, entry_count, table_offset, found));
            }
        };
        if scan.push(entry, available)? {
            break;
        }
    }
    let found = scan.finish()?;
    Ok(view(data, entry_count, table_offset, found))
}

fn view(
    data: &[u8],
    entry_count: u32,
    table_offset: u64,
    (metadata, icon): (Descriptor, Option<Descriptor>),
) -> ContainerView<'_> {
    ContainerView {
        data,
        index: ContainerIndex {
            entry_count,
            table_offset,
            metadata,
            icon,
        },
    }
}

impl<'a> ContainerView<'a> {
    /// Located descriptors.
    pub fn index(&self) -> &ContainerIndex {
        &self.index
    }

    /// Borrow the bytes a descriptor points at.
    pub fn slice(&self, descriptor: &Descriptor) -> FormatResult<&'a [u8]> {
        bytes::range(self.data, descriptor.offset, descriptor.size)
    }

    /// Bytes of the property-set blob.
    pub fn metadata(&self) -> FormatResult<&'a [u8]> {
        self.slice(&self.index.metadata)
    }

    /// Bytes of the icon image, if present.
    pub fn icon(&self) -> FormatResult<Option<&'a [u8]>> {
        self.index.icon.as_ref().map(|d| self.slice(d)).transpose()
    }
}

impl ContainerIndex {
    /// Locate descriptors by reading only the header and table from `reader`.
    ///
    /// Package files can be very large; this avoids loading the body.
    pub fn from_reader<R: Read + Seek>(reader: &mut R) -> FormatResult<Self> {
        let available = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;

        let mut header = Vec::with_capacity(HEADER_LEN as usize);
        reader.by_ref().take(HEADER_LEN).read_to_end(&mut header)?;
        let (entry_count, table_offset) = parse_header(&header)?;

        reader.seek(SeekFrom::Start(table_offset))?;
        let mut scan = TableScan::default();
        let mut entry = [0u8; DESCRIPTOR_LEN as usize];
        for i in 0..entry_count as u64 {
            match reader.read_exact(&mut entry) {
                Ok(()) => {}
                Err(err) if err.kind() == ErrorKind::UnexpectedEof => {
                    let offset = table_offset + i * DESCRIPTOR_LEN;
                    let err = FormatError::truncated(offset, DESCRIPTOR_LEN, available);
                    let found = scan.cut_short(err)?;
                    return Ok(Self::new(entry_count, table_offset, found));
                }
                Err(err) => return Err(err.into()),
            }
            if scan.push(&entry, available)? {
                break;
            }
        }
        let found = scan.finish()?;
        Ok(Self::new(entry_count, table_offset, found))
    }

    fn new(
        entry_count: u32,
        table_offset: u64,
        (metadata, icon): (Descriptor, Option<Descriptor>),
    ) -> Self {
        Self {
            entry_count,
            table_offset,
            metadata,
            icon,
        }
    }

    /// Read the bytes `descriptor` points at from `reader`.
    pub fn read_resource<R: Read + Seek>(
        reader: &mut R,
        descriptor: &Descriptor,
    ) -> FormatResult<Vec<u8>> {
        let available = reader.seek(SeekFrom::End(0))?;
        check_bounds(descriptor.offset, descriptor.size, available)?;
        reader.seek(SeekFrom::Start(descriptor.offset))?;
        let mut buf = vec![0u8; descriptor.size as usize];
        reader.read_exact(&mut buf)?;
        Ok(buf)
    }
}

fn parse_header(data: &[u8]) -> FormatResult<(u32, u64)> {
    bytes::magic(data, CONTAINER_MAGIC, "container")?;
    let entry_count = bytes::be_u32(data, ENTRY_COUNT_OFFSET)?;
    let table_offset = bytes::be_u32(data, TABLE_OFFSET_OFFSET)? as u64;
    Ok((entry_count, table_offset))
}

fn check_bounds(offset: u64, len: u64, available: u64) -> FormatResult<()> {
    match offset.checked_add(len) {
        Some(end) if end <= available => Ok(()),
        _ => Err(FormatError::truncated(offset, len, available)),
    }
}

/// Descriptors found so far while walking the table.
#[derive(Default)]
struct TableScan {
    metadata: Option<Descriptor>,
    icon: Option<Descriptor>,
}

impl TableScan {
    /// Take one table entry; true once both resources are known.
    ///
    /// `available` is the size of the whole container so each located range
    /// is validated up front.
    fn push(&mut self, entry: &[u8], available: u64) -> FormatResult<bool> {
        let kind = bytes::be_u32(entry, 0x00)?;
        let target = match kind {
            METADATA_RESOURCE => &mut self.metadata,
            ICON_RESOURCE => &mut self.icon,
            _ => return Ok(false),
        };
        let descriptor = Descriptor {
            kind,
            offset: bytes::be_u32(entry, 0x10)? as u64,
            size: bytes::be_u32(entry, 0x14)? as u64,
        };
        check_bounds(descriptor.offset, descriptor.size, available)?;
        if target.is_none() {
            *target = Some(descriptor);
        }
        Ok(self.metadata.is_some() && self.icon.is_some())
    }

    /// The table ended before its declared count; fine once metadata is known.
    fn cut_short(self, err: FormatError) -> FormatResult<(Descriptor, Option<Descriptor>)> {
        match self.metadata {
            Some(metadata) => Ok((metadata, self.icon)),
            None => Err(err),
        }
    }

    fn finish(self) -> FormatResult<(Descriptor, Option<Descriptor>)> {
        let metadata = self.metadata.ok_or(FormatError::MissingMetadata)?;
        Ok((metadata, self.icon))
    }
}
