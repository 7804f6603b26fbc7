//! PE images: version resource and Authenticode signature.
//!
//! Only the headers, the resource directory entries on the path to the
//! version resource, the version block and the attribute certificate are
//! read. The rest of the image, including any overlay, is never loaded.

use super::{le_u16, le_u32};
use goblin::pe::data_directories::DataDirectory;
use goblin::pe::header::{Header, PE_MAGIC, SIZEOF_COFF_HEADER, SIZEOF_PE_MAGIC};
use goblin::pe::section_table::SectionTable;
use std::io::{self, Read, Seek, SeekFrom};

/// Leading bytes that must hold the DOS, COFF and optional headers and the
/// section table.
const HEADER_WINDOW: u64 = 64 * 1024;
/// `RT_VERSION` resource type id.
const RT_VERSION: u32 = 16;
/// `VS_FIXEDFILEINFO.dwSignature`
const FIXED_FILE_INFO_SIGNATURE: u32 = 0xFEEF_04BD;
/// High bit of a resource directory entry offset marks a subdirectory.
const SUBDIRECTORY_FLAG: u32 = 0x8000_0000;
const RESOURCE_DIRECTORY_LEN: usize = 16;
const RESOURCE_ENTRY_LEN: usize = 8;
/// `IMAGE_RESOURCE_DATA_ENTRY`: data RVA, size, code page, reserved.
const RESOURCE_DATA_ENTRY_LEN: usize = 16;
/// `VS_VERSIONINFO.wLength` is 16 bits wide.
const MAX_VERSION_LEN: usize = 0xFFFF;
/// `WIN_CERTIFICATE` header: dwLength, wRevision, wCertificateType.
const WIN_CERTIFICATE_HEADER_LEN: u64 = 8;
const MAX_SIGNATURE_LEN: u64 = 16 * 1024 * 1024;

/// Fields read from a `VS_VERSIONINFO` resource.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct VersionInfo {
    /// File version as a dotted quad, e.g. `3.14.1703.0`
    pub file_version: Option<String>,
    /// `ProductName` string
    pub product_name: Option<String>,
    /// `FileDescription` string
    pub description: Option<String>,
}

impl VersionInfo {
    fn is_empty(&self) -> bool {
        self.file_version.is_none() && self.product_name.is_none() && self.description.is_none()
    }
}

/// A parsed PE image.
#[derive(Clone, Debug, Default)]
pub struct PeImage {
    version_info: Option<VersionInfo>,
    signature: Option<Vec<u8>>,
}

impl PeImage {
    /// Reads a PE image from `reader`.
    ///
    /// Returns `Ok(None)` when goblin rejects the headers. A missing or
    /// malformed version resource only leaves the version fields empty.
    pub fn read<R: Read + Seek>(reader: &mut R, file_size: u64) -> io::Result<Option<Self>> {
        let mut window = vec![0u8; file_size.min(HEADER_WINDOW) as usize];
        reader.seek(SeekFrom::Start(0))?;
        reader.read_exact(&mut window)?;

        let header = match Header::parse(&window) {
            Ok(header) if header.signature == PE_MAGIC => header,
            Ok(_) => {
                log::debug!("PE signature missing");
                return Ok(None);
            }
            Err(e) => {
                log::debug!("PE header parse failed: {}", e);
                return Ok(None);
            }
        };

        let mut offset = header.dos_header.pe_pointer as usize
            + SIZEOF_PE_MAGIC
            + SIZEOF_COFF_HEADER
            + usize::from(header.coff_header.size_of_optional_header);
        let sections = match header.coff_header.sections(&window, &mut offset) {
            Ok(sections) => sections,
            Err(e) => {
                log::debug!("PE section table parse failed: {}", e);
                return Ok(None);
            }
        };

        let Some(optional_header) = header.optional_header else {
            return Ok(Some(Self::default()));
        };
        let directories = optional_header.data_directories;

        let version_info = match directories.get_resource_table() {
            Some(table) => read_version_info(reader, table, &sections, file_size)?,
            None => None,
        };
        if version_info.is_none() {
            log::debug!("PE image has no usable version resource");
        }

        let signature = match directories.get_certificate_table() {
            Some(table) => read_certificate(reader, table, file_size)?,
            None => None,
        };

        Ok(Some(Self {
            version_info,
            signature,
        }))
    }

    /// Version resource fields.
    pub fn version_info(&self) -> Option<&VersionInfo> {
        self.version_info.as_ref()
    }

    /// Authenticode PKCS#7 blob from the attribute certificate table.
    pub fn signature(&self) -> Option<&[u8]> {
        self.signature.as_deref()
    }
}

/// Reads `len` bytes at `offset`, or `None` when the range leaves the file.
fn read_range<R: Read + Seek>(
    reader: &mut R,
    offset: u64,
    len: usize,
    file_size: u64,
) -> io::Result<Option<Vec<u8>>> {
    if offset.checked_add(len as u64).is_none_or(|end| end > file_size) {
        return Ok(None);
    }
    let mut buf = vec![0u8; len];
    reader.seek(SeekFrom::Start(offset))?;
    reader.read_exact(&mut buf)?;
    Ok(Some(buf))
}

/// The resource data directory, addressed by offsets relative to its start.
struct ResourceTable {
    offset: u64,
    size: u32,
    file_size: u64,
}

impl ResourceTable {
    fn read<R: Read + Seek>(&self, reader: &mut R, at: u32, len: usize) -> io::Result<Option<Vec<u8>>> {
        if u64::from(at) + len as u64 > u64::from(self.size) {
            return Ok(None);
        }
        read_range(reader, self.offset + u64::from(at), len, self.file_size)
    }

    /// `(name_or_id, offset_to_data)` pairs of one `IMAGE_RESOURCE_DIRECTORY`.
    fn entries<R: Read + Seek>(&self, reader: &mut R, directory: u32) -> io::Result<Option<Vec<(u32, u32)>>> {
        let Some(header) = self.read(reader, directory, RESOURCE_DIRECTORY_LEN)? else {
            return Ok(None);
        };
        let named = usize::from(le_u16(&header, 12).unwrap_or_default());
        let ids = usize::from(le_u16(&header, 14).unwrap_or_default());
        let first = directory.saturating_add(RESOURCE_DIRECTORY_LEN as u32);
        let Some(raw) = self.read(reader, first, (named + ids) * RESOURCE_ENTRY_LEN)? else {
            return Ok(None);
        };
        Ok(Some(
            raw.chunks_exact(RESOURCE_ENTRY_LEN)
                .filter_map(|entry| Some((le_u32(entry, 0)?, le_u32(entry, 4)?)))
                .collect(),
        ))
    }

    /// Walks type -> name -> language and returns the table offset of the
    /// `IMAGE_RESOURCE_DATA_ENTRY` for the version resource.
    fn version_data_entry<R: Read + Seek>(&self, reader: &mut R) -> io::Result<Option<u32>> {
        let Some(types) = self.entries(reader, 0)? else {
            return Ok(None);
        };
        let Some(names) = types
            .iter()
            .find(|(id, _)| *id == RT_VERSION)
            .and_then(|(_, target)| subdirectory(*target))
        else {
            return Ok(None);
        };
        let Some(languages) = self
            .entries(reader, names)?
            .and_then(|entries| entries.first().and_then(|(_, target)| subdirectory(*target)))
        else {
            return Ok(None);
        };
        let data = self
            .entries(reader, languages)?
            .and_then(|entries| entries.first().map(|(_, target)| *target));
        Ok(data.filter(|d| d & SUBDIRECTORY_FLAG == 0))
    }
}

/// Locates and decodes the first `RT_VERSION` resource.
fn read_version_info<R: Read + Seek>(
    reader: &mut R,
    table: &DataDirectory,
    sections: &[SectionTable],
    file_size: u64,
) -> io::Result<Option<VersionInfo>> {
    let Some(offset) = rva_to_offset(table.virtual_address, sections) else {
        return Ok(None);
    };
    let resources = ResourceTable {
        offset: offset as u64,
        size: table.size,
        file_size,
    };

    let Some(entry) = resources.version_data_entry(reader)? else {
        return Ok(None);
    };
    let Some(data_entry) = resources.read(reader, entry, RESOURCE_DATA_ENTRY_LEN)? else {
        return Ok(None);
    };
    let (Some(rva), Some(size)) = (le_u32(&data_entry, 0), le_u32(&data_entry, 4)) else {
        return Ok(None);
    };
    let Some(block_offset) = rva_to_offset(rva, sections) else {
        return Ok(None);
    };
    let len = (size as usize).min(MAX_VERSION_LEN);
    let Some(block) = read_range(reader, block_offset as u64, len, file_size)? else {
        return Ok(None);
    };

    Ok(parse_version_block(&block).filter(|info| !info.is_empty()))
}

/// Reads the first `WIN_CERTIFICATE` entry. The certificate table's address
/// is a file offset, not an RVA.
fn read_certificate<R: Read + Seek>(
    reader: &mut R,
    table: &DataDirectory,
    file_size: u64,
) -> io::Result<Option<Vec<u8>>> {
    let offset = u64::from(table.virtual_address);
    let Some(header) = read_range(reader, offset, WIN_CERTIFICATE_HEADER_LEN as usize, file_size)? else {
        return Ok(None);
    };
    let length = u64::from(le_u32(&header, 0).unwrap_or_default());
    if length <= WIN_CERTIFICATE_HEADER_LEN
        || length > u64::from(table.size)
        || length - WIN_CERTIFICATE_HEADER_LEN > MAX_SIGNATURE_LEN
    {
        log::debug!("attribute certificate length {} is out of range", length);
        return Ok(None);
    }
    read_range(
        reader,
        offset + WIN_CERTIFICATE_HEADER_LEN,
        (length - WIN_CERTIFICATE_HEADER_LEN) as usize,
        file_size,
    )
}

fn subdirectory(offset: u32) -> Option<u32> {
    (offset & SUBDIRECTORY_FLAG != 0).then_some(offset & !SUBDIRECTORY_FLAG)
}

fn rva_to_offset(rva: u32, sections: &[SectionTable]) -> Option<usize> {
    sections.iter().find_map(|s| {
        let span = s.virtual_size.max(s.size_of_raw_data);
        let within = rva >= s.virtual_address && rva - s.virtual_address < span;
        within.then(|| (rva - s.virtual_address) as usize + s.pointer_to_raw_data as usize)
    })
}

/// One node of the `VS_VERSIONINFO` tree.
struct VersionBlock<'a> {
    key: String,
    value: &'a [u8],
    children: &'a [u8],
}

/// Reads a block, returning it and the 4-byte aligned length it occupies.
fn read_block(data: &[u8]) -> Option<(VersionBlock<'_>, usize)> {
    let length = le_u16(data, 0)? as usize;
    if length < 6 || length > data.len() {
        return None;
    }
    let data = &data[..length];
    let value_length = le_u16(data, 2)? as usize;
    let is_text = le_u16(data, 4)? == 1;

    let (key, key_end) = read_utf16z(data, 6)?;
    let value_start = align4(key_end).min(length);
    let value_bytes = if is_text { value_length * 2 } else { value_length };
    let value_end = value_start.saturating_add(value_bytes).min(length);
    let children_start = align4(value_end).min(length);

    Some((
        VersionBlock {
            key,
            value: &data[value_start..value_end],
            children: &data[children_start..],
        },
        align4(length),
    ))
}

fn blocks(mut data: &[u8]) -> impl Iterator<Item = VersionBlock<'_>> {
    std::iter::from_fn(move || {
        let (block, advance) = read_block(data)?;
        data = data.get(advance..).unwrap_or(&[]);
        Some(block)
    })
}

fn parse_version_block(data: &[u8]) -> Option<VersionInfo> {
    let (root, _) = read_block(data)?;
    if root.key != "VS_VERSION_INFO" {
        return None;
    }

    let mut info = VersionInfo {
        file_version: fixed_file_version(root.value),
        ..Default::default()
    };

    let mut string_file_version = None;
    for block in blocks(root.children).filter(|b| b.key == "StringFileInfo") {
        // First string table wins.
        if let Some(table) = blocks(block.children).next() {
            for entry in blocks(table.children) {
                let text = read_utf16z(entry.value, 0)
                    .map(|(s, _)| s.trim().to_string())
                    .filter(|s| !s.is_empty());
                match entry.key.as_str() {
                    "ProductName" => info.product_name = text,
                    "FileDescription" => info.description = text,
                    "FileVersion" => string_file_version = text,
                    _ => {}
                }
            }
            break;
        }
    }

    if info.file_version.is_none() {
        info.file_version = string_file_version;
    }
    Some(info)
}

fn fixed_file_version(value: &[u8]) -> Option<String> {
    if le_u32(value, 0)? != FIXED_FILE_INFO_SIGNATURE {
        return None;
    }
    let ms = le_u32(value, 8)?;
    let ls = le_u32(value, 12)?;
    Some(format!(
        "{}.{}.{}.{}",
        ms >> 16,
        ms & 0xFFFF,
        ls >> 16,
        ls & 0xFFFF
    ))
}

/// Decodes a NUL terminated UTF-16LE string starting at `offset`.
///
/// Returns the text and the offset just past the terminator (or the end of
/// `data` when unterminated).
fn read_utf16z(data: &[u8], offset: usize) -> Option<(String, usize)> {
    let tail = data.get(offset..)?;
    let units: Vec<u16> = tail
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .take_while(|u| *u != 0)
        .collect();
    let end = (offset + (units.len() + 1) * 2).min(data.len());
    Some((String::from_utf16_lossy(&units), end))
}

fn align4(value: usize) -> usize {
    (value + 3) & !3
}
