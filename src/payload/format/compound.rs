//! OLE compound files: Windows Installer packages and patches (MSI, MSP).
//!
//! Authenticode stores the PKCS#7 signature of a compound file in a root
//! level stream instead of a certificate table.

use std::io::{self, Read, Seek};

/// Root stream holding the Authenticode signature.
const DIGITAL_SIGNATURE_STREAM: &str = "/\u{5}DigitalSignature";
const MAX_SIGNATURE_LEN: u64 = 16 * 1024 * 1024;

/// Facts read from a compound file.
#[derive(Clone, Debug, Default)]
pub struct CompoundFile {
    signature: Option<Vec<u8>>,
}

impl CompoundFile {
    /// Opens a compound file and reads its signature stream, if present.
    ///
    /// Returns `Ok(None)` when the container structure does not parse.
    pub fn read<R: Read + Seek>(reader: R) -> io::Result<Option<Self>> {
        let mut compound = match cfb::CompoundFile::open(reader) {
            Ok(compound) => compound,
            Err(e) => {
                log::debug!("compound file parse failed: {}", e);
                return Ok(None);
            }
        };

        if !compound.is_stream(DIGITAL_SIGNATURE_STREAM) {
            return Ok(Some(Self::default()));
        }

        let length = compound.entry(DIGITAL_SIGNATURE_STREAM)?.len();
        if length == 0 || length > MAX_SIGNATURE_LEN {
            log::debug!("signature stream length {} is out of range", length);
            return Ok(Some(Self::default()));
        }

        let mut signature = Vec::with_capacity(length as usize);
        compound
            .open_stream(DIGITAL_SIGNATURE_STREAM)?
            .read_to_end(&mut signature)?;
        Ok(Some(Self {
            signature: Some(signature),
        }))
    }

    /// PKCS#7 signature from the `\u{5}DigitalSignature` stream.
    pub fn signature(&self) -> Option<&[u8]> {
        self.signature.as_deref()
    }
}
