//! File format detection for payloads.
//!
//! A payload is classified by its leading magic bytes, never by extension,
//! into a closed set of formats. Each format answers the same questions
//! through [`PayloadFormat`]: does it carry version metadata, how large is
//! its content, and does it embed a signature.

mod cabinet;
mod compound;
mod pe;

pub use cabinet::Cabinet;
pub use compound::CompoundFile;
pub use pe::{PeImage, VersionInfo};

use super::error::{ErrorExt, Result};
use std::fmt;
use std::io::Read;
use std::path::Path;

/// Manifest element kind for a payload.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum PayloadKind {
    /// Windows executable, emitted as `ExePackagePayload`
    Exe,
    /// Windows update container, emitted as `MsuPackagePayload`
    Msu,
    /// Anything else, emitted as `Payload`
    File,
}

impl PayloadKind {
    /// Manifest element name.
    pub fn element_name(&self) -> &'static str {
        match self {
            PayloadKind::Exe => "ExePackagePayload",
            PayloadKind::Msu => "MsuPackagePayload",
            PayloadKind::File => "Payload",
        }
    }

    /// Number stored in the payload symbol's `Kind` field.
    pub fn as_number(&self) -> i32 {
        match self {
            PayloadKind::Exe => 0,
            PayloadKind::Msu => 1,
            PayloadKind::File => 2,
        }
    }

    /// Inverse of [`PayloadKind::as_number`].
    pub fn from_number(value: i32) -> Option<Self> {
        match value {
            0 => Some(PayloadKind::Exe),
            1 => Some(PayloadKind::Msu),
            2 => Some(PayloadKind::File),
            _ => None,
        }
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.element_name())
    }
}

/// Capabilities every payload format provides.
pub trait PayloadFormat {
    /// Manifest element kind.
    fn kind(&self) -> PayloadKind;

    /// Version resource fields, when the format carries them.
    fn extract_version_info(&self) -> Option<&VersionInfo>;

    /// Authoritative content size given the on-disk byte count.
    fn resolve_content_size(&self, file_size: u64) -> u64;

    /// Embedded PKCS#7 signature blob, if any.
    fn signature(&self) -> Option<&[u8]>;
}

/// Inspected payload file.
#[derive(Clone, Debug)]
pub enum InspectedFile {
    /// PE image (`MZ`)
    Executable(PeImage),
    /// Cabinet container (`MSCF`), possibly a Windows update package
    Cabinet(Cabinet),
    /// OLE compound file, e.g. an MSI package or MSP patch
    Compound(CompoundFile),
    /// Opaque data
    Blob,
}

const PE_MAGIC: &[u8] = b"MZ";
const CAB_MAGIC: &[u8] = b"MSCF";
const COMPOUND_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

impl InspectedFile {
    /// Reads the file header and classifies the file.
    ///
    /// Only opening or reading the file can fail. A file whose header looks
    /// like a known format but does not parse is treated as a blob.
    pub fn inspect(path: &Path) -> Result<Self> {
        let mut file = std::fs::File::open(path).fs_context("opening payload", path)?;
        let file_size = file
            .metadata()
            .fs_context("reading payload metadata", path)?
            .len();

        let mut magic = [0u8; 8];
        let read = read_up_to(&mut file, &mut magic).fs_context("reading payload header", path)?;
        let magic = &magic[..read];

        if magic.starts_with(PE_MAGIC) {
            return Ok(match PeImage::read(&mut file, file_size).fs_context("reading executable", path)? {
                Some(image) => InspectedFile::Executable(image),
                None => {
                    log::debug!("{} has an MZ header but is not a PE image", path.display());
                    InspectedFile::Blob
                }
            });
        }

        if magic.starts_with(CAB_MAGIC) {
            return Ok(match Cabinet::read(&mut file, file_size).fs_context("reading cabinet", path)? {
                Some(cabinet) => InspectedFile::Cabinet(cabinet),
                None => {
                    log::debug!("{} has a cabinet signature but no valid header", path.display());
                    InspectedFile::Blob
                }
            });
        }

        if magic.starts_with(COMPOUND_MAGIC) {
            return Ok(match CompoundFile::read(&mut file).fs_context("reading compound file", path)? {
                Some(compound) => InspectedFile::Compound(compound),
                None => {
                    log::debug!("{} has a compound file signature but does not parse", path.display());
                    InspectedFile::Blob
                }
            });
        }

        Ok(InspectedFile::Blob)
    }
}

impl PayloadFormat for InspectedFile {
    fn kind(&self) -> PayloadKind {
        match self {
            InspectedFile::Executable(_) => PayloadKind::Exe,
            InspectedFile::Cabinet(cab) if cab.is_update_package() => PayloadKind::Msu,
            InspectedFile::Cabinet(_) | InspectedFile::Compound(_) | InspectedFile::Blob => PayloadKind::File,
        }
    }

    fn extract_version_info(&self) -> Option<&VersionInfo> {
        match self {
            InspectedFile::Executable(image) => image.version_info(),
            _ => None,
        }
    }

    fn resolve_content_size(&self, file_size: u64) -> u64 {
        // Update packages are hashed and sized as the container bytes.
        if let InspectedFile::Cabinet(cab) = self
            && cab.disagrees_with(file_size)
        {
            log::warn!(
                "cabinet declares {} bytes but {} are on disk",
                cab.declared_size(),
                file_size
            );
        }
        file_size
    }

    fn signature(&self) -> Option<&[u8]> {
        match self {
            InspectedFile::Executable(image) => image.signature(),
            InspectedFile::Cabinet(cab) => cab.signature(),
            InspectedFile::Compound(compound) => compound.signature(),
            InspectedFile::Blob => None,
        }
    }
}

fn read_up_to(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

pub(crate) fn le_u16(bytes: &[u8], offset: usize) -> Option<u16> {
    let raw = bytes.get(offset..offset.checked_add(2)?)?;
    Some(u16::from_le_bytes([raw[0], raw[1]]))
}

pub(crate) fn le_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let raw = bytes.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
}
