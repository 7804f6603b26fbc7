//! Cabinet containers and Windows update (MSU) packages.
//!
//! Only the header, the file table and the signature reserve are read; the
//! compressed folders are never decoded.

use super::{le_u16, le_u32};
use std::io::{self, Read, Seek, SeekFrom};

const HEADER_LEN: usize = 36;
const RESERVE_PRESENT: u16 = 0x0004;
/// Fixed part of a `CFFILE` entry, before the name.
const CFFILE_FIXED_LEN: usize = 16;
/// Longest name a `CFFILE` entry may carry, including the terminator.
const CFFILE_MAX_NAME: usize = 256;
/// Signed cabinets carry a 20 byte header reserve describing the signature.
const SIGNATURE_RESERVE_LEN: usize = 20;
const MAX_SIGNATURE_LEN: u64 = 16 * 1024 * 1024;
/// File present in every Windows update package.
const UPDATE_SCAN_CABINET: &str = "WSUSSCAN.cab";

/// Cabinet header facts.
#[derive(Clone, Debug, Default)]
pub struct Cabinet {
    declared_size: u32,
    file_names: Vec<String>,
    signature: Option<Vec<u8>>,
}

impl Cabinet {
    /// Reads a cabinet from the start of `reader`.
    ///
    /// Returns `Ok(None)` when the header is not a valid cabinet header.
    pub fn read<R: Read + Seek>(reader: &mut R, file_size: u64) -> io::Result<Option<Self>> {
        reader.seek(SeekFrom::Start(0))?;
        let mut header = [0u8; HEADER_LEN];
        if reader.read_exact(&mut header).is_err() || &header[..4] != b"MSCF" {
            return Ok(None);
        }

        let declared_size = le_u32(&header, 8).unwrap_or_default();
        let files_offset = u64::from(le_u32(&header, 16).unwrap_or_default());
        let file_count = le_u16(&header, 28).unwrap_or_default() as usize;
        let flags = le_u16(&header, 30).unwrap_or_default();

        let signature = if flags & RESERVE_PRESENT != 0 {
            read_signature(reader, file_size)?
        } else {
            None
        };

        let file_names = if files_offset > 0 && files_offset < file_size {
            let wanted = (file_count * (CFFILE_FIXED_LEN + CFFILE_MAX_NAME)) as u64;
            let available = (file_size - files_offset).min(wanted) as usize;
            let mut table = vec![0u8; available];
            reader.seek(SeekFrom::Start(files_offset))?;
            reader.read_exact(&mut table)?;
            parse_file_names(&table, file_count)
        } else {
            Vec::new()
        };

        Ok(Some(Self {
            declared_size,
            file_names,
            signature,
        }))
    }

    /// `cbCabinet` from the header: the size the container claims to have.
    pub fn declared_size(&self) -> u32 {
        self.declared_size
    }

    /// True when `cbCabinet` does not match the on-disk size. Signed
    /// cabinets are never reported: `cbCabinet` excludes the appended
    /// signature.
    pub fn disagrees_with(&self, file_size: u64) -> bool {
        self.signature.is_none() && u64::from(self.declared_size) != file_size
    }

    /// Names in the cabinet's file table.
    pub fn file_names(&self) -> &[String] {
        &self.file_names
    }

    /// True for Windows update (MSU) packages.
    pub fn is_update_package(&self) -> bool {
        self.file_names
            .iter()
            .any(|name| name.eq_ignore_ascii_case(UPDATE_SCAN_CABINET))
    }

    /// PKCS#7 signature referenced from the header reserve.
    pub fn signature(&self) -> Option<&[u8]> {
        self.signature.as_deref()
    }
}

/// Reads the signature described by the header reserve, if any.
///
/// Reserve layout for signed cabinets: `u32` marker, `u32` signature
/// offset, `u32` signature length, 8 bytes unused.
fn read_signature<R: Read + Seek>(reader: &mut R, file_size: u64) -> io::Result<Option<Vec<u8>>> {
    let mut sizes = [0u8; 4];
    if reader.read_exact(&mut sizes).is_err() {
        return Ok(None);
    }
    let reserve_len = le_u16(&sizes, 0).unwrap_or_default() as usize;
    if reserve_len != SIGNATURE_RESERVE_LEN {
        return Ok(None);
    }

    let mut reserve = [0u8; SIGNATURE_RESERVE_LEN];
    if reader.read_exact(&mut reserve).is_err() {
        return Ok(None);
    }
    let offset = u64::from(le_u32(&reserve, 4).unwrap_or_default());
    let length = u64::from(le_u32(&reserve, 8).unwrap_or_default());
    if length == 0 || length > MAX_SIGNATURE_LEN || offset.saturating_add(length) > file_size {
        return Ok(None);
    }

    let mut signature = vec![0u8; length as usize];
    reader.seek(SeekFrom::Start(offset))?;
    reader.read_exact(&mut signature)?;
    Ok(Some(signature))
}

fn parse_file_names(table: &[u8], count: usize) -> Vec<String> {
    let mut names = Vec::with_capacity(count);
    let mut offset = 0usize;
    while names.len() < count {
        let Some(name_start) = offset.checked_add(CFFILE_FIXED_LEN) else {
            break;
        };
        let Some(rest) = table.get(name_start..) else {
            break;
        };
        let Some(len) = rest.iter().position(|b| *b == 0) else {
            break;
        };
        names.push(String::from_utf8_lossy(&rest[..len]).into_owned());
        offset = name_start + len + 1;
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn cabinet(names: &[&str], reserve: Option<(u32, u32)>, trailer: &[u8]) -> Vec<u8> {
        let reserve_len = if reserve.is_some() { 4 + SIGNATURE_RESERVE_LEN } else { 0 };
        let files_offset = HEADER_LEN + reserve_len;
        let mut buf = vec![0u8; HEADER_LEN];
        buf[..4].copy_from_slice(b"MSCF");
        buf[16..20].copy_from_slice(&(files_offset as u32).to_le_bytes());
        buf[28..30].copy_from_slice(&(names.len() as u16).to_le_bytes());
        if let Some((offset, length)) = reserve {
            buf[30..32].copy_from_slice(&RESERVE_PRESENT.to_le_bytes());
            buf.extend((SIGNATURE_RESERVE_LEN as u16).to_le_bytes());
            buf.extend([0, 0]);
            buf.extend(0x0010_0000u32.to_le_bytes());
            buf.extend(offset.to_le_bytes());
            buf.extend(length.to_le_bytes());
            buf.extend([0u8; 8]);
        }
        for name in names {
            buf.extend([0u8; CFFILE_FIXED_LEN]);
            buf.extend(name.as_bytes());
            buf.push(0);
        }
        buf.extend(trailer);
        let size = buf.len() as u32;
        buf[8..12].copy_from_slice(&size.to_le_bytes());
        buf
    }

    #[test]
    fn test_update_package_detected_by_file_table() {
        let bytes = cabinet(
            &["Windows8.1-KB2937592-x86.cab", "WSUSSCAN.cab", "pkgProperties.txt"],
            None,
            b"folder data",
        );
        let cab = Cabinet::read(&mut Cursor::new(&bytes), bytes.len() as u64)
            .expect("io")
            .expect("cabinet");
        assert!(cab.is_update_package());
        assert_eq!(cab.file_names().len(), 3);
        assert_eq!(cab.declared_size() as usize, bytes.len());
        assert!(cab.signature().is_none());
    }

    #[test]
    fn test_plain_cabinet_is_not_update() {
        let bytes = cabinet(&["readme.txt"], None, &[]);
        let cab = Cabinet::read(&mut Cursor::new(&bytes), bytes.len() as u64)
            .expect("io")
            .expect("cabinet");
        assert!(!cab.is_update_package());
        assert_eq!(cab.file_names().to_vec(), vec!["readme.txt".to_string()]);
    }

    #[test]
    fn test_signature_read_from_reserve() {
        let unsigned = cabinet(&["a.txt"], Some((0, 0)), &[]);
        let signature_offset = unsigned.len() as u32;
        let bytes = cabinet(&["a.txt"], Some((signature_offset, 4)), b"SIG!");
        let cab = Cabinet::read(&mut Cursor::new(&bytes), bytes.len() as u64)
            .expect("io")
            .expect("cabinet");
        assert_eq!(cab.signature(), Some(&b"SIG!"[..]));
    }

    #[test]
    fn test_signed_cabinet_size_is_not_a_mismatch() {
        let unsigned = cabinet(&["a.txt"], Some((0, 0)), &[]);
        let body_len = unsigned.len() as u32;
        let mut bytes = cabinet(&["a.txt"], Some((body_len, 4)), &[]);
        bytes.extend(b"SIG!");
        let cab = Cabinet::read(&mut Cursor::new(&bytes), bytes.len() as u64)
            .expect("io")
            .expect("cabinet");
        assert!(cab.signature().is_some());
        assert_eq!(cab.declared_size(), body_len);
        assert!(!cab.disagrees_with(bytes.len() as u64));
    }

    #[test]
    fn test_truncated_unsigned_cabinet_disagrees() {
        let bytes = cabinet(&["a.txt"], None, b"folder");
        let cab = Cabinet::read(&mut Cursor::new(&bytes), bytes.len() as u64)
            .expect("io")
            .expect("cabinet");
        assert!(!cab.disagrees_with(bytes.len() as u64));
        assert!(cab.disagrees_with(bytes.len() as u64 - 3));
    }

    #[test]
    fn test_out_of_bounds_signature_ignored() {
        let bytes = cabinet(&["a.txt"], Some((10_000, 50)), &[]);
        let cab = Cabinet::read(&mut Cursor::new(&bytes), bytes.len() as u64)
            .expect("io")
            .expect("cabinet");
        assert!(cab.signature().is_none());
    }

    #[test]
    fn test_not_a_cabinet() {
        let bytes = b"MSCX and more bytes than a header needs to be read!!".to_vec();
        let result = Cabinet::read(&mut Cursor::new(&bytes), bytes.len() as u64).expect("io");
        assert!(result.is_none());
    }
}
