//! Synthetic payload files for integration tests.
//!
//! Builds just enough of each binary format for the resolver: PE32 images
//! with a version resource and an attribute certificate table, cabinets with
//! a file table and signature reserve, compound files with a signature
//! stream, and rcgen certificates wrapped in PKCS#7 SignedData.

#![allow(dead_code)]

use rcgen::{BasicConstraints, Certificate, CertificateParams, DistinguishedName, DnType, IsCa, Issuer, KeyPair};
use sha1::{Digest, Sha1};
use std::path::{Path, PathBuf};

/// Writes `bytes` to `dir/relative`, creating parent directories.
pub fn write(dir: &Path, relative: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create fixture directory");
    }
    std::fs::write(&path, bytes).expect("write fixture");
    path
}

/// Uppercase hex SHA-512 of `bytes`.
pub fn sha512_hex(bytes: &[u8]) -> String {
    use sha2::Sha512;
    hex::encode_upper(Sha512::digest(bytes))
}

/// Uppercase hex SHA-1 of `bytes`.
pub fn sha1_hex(bytes: &[u8]) -> String {
    hex::encode_upper(Sha1::digest(bytes))
}

// ---------------------------------------------------------------------------
// VS_VERSIONINFO

fn utf16z(s: &str) -> Vec<u8> {
    s.encode_utf16()
        .chain(std::iter::once(0))
        .flat_map(|u| u.to_le_bytes())
        .collect()
}

fn pad_to(buf: &mut Vec<u8>, alignment: usize) {
    while buf.len() % alignment != 0 {
        buf.push(0);
    }
}

fn version_block(key: &str, is_text: bool, value: &[u8], value_length: u16, children: &[u8]) -> Vec<u8> {
    let mut buf = vec![0, 0];
    buf.extend(value_length.to_le_bytes());
    buf.extend(u16::from(is_text).to_le_bytes());
    buf.extend(utf16z(key));
    pad_to(&mut buf, 4);
    buf.extend(value);
    pad_to(&mut buf, 4);
    buf.extend(children);
    let len = buf.len() as u16;
    buf[..2].copy_from_slice(&len.to_le_bytes());
    pad_to(&mut buf, 4);
    buf
}

fn version_string(key: &str, value: &str) -> Vec<u8> {
    let encoded = utf16z(value);
    version_block(key, true, &encoded, (encoded.len() / 2) as u16, &[])
}

/// A `VS_VERSIONINFO` resource with a fixed file version and two strings.
pub fn version_resource(product: &str, description: &str, version: [u16; 4]) -> Vec<u8> {
    let ms = (u32::from(version[0]) << 16) | u32::from(version[1]);
    let ls = (u32::from(version[2]) << 16) | u32::from(version[3]);
    let mut fixed = Vec::new();
    for word in [0xFEEF_04BDu32, 0x0001_0000, ms, ls, ms, ls] {
        fixed.extend(word.to_le_bytes());
    }
    fixed.resize(52, 0);

    let mut strings = version_string("ProductName", product);
    strings.extend(version_string("FileDescription", description));
    let table = version_block("040904b0", false, &[], 0, &strings);
    let string_file_info = version_block("StringFileInfo", false, &[], 0, &table);
    version_block("VS_VERSION_INFO", false, &fixed, 52, &string_file_info)
}

// ---------------------------------------------------------------------------
// PE32

const PE_OFFSET: usize = 0x80;
const SECTION_RVA: u32 = 0x1000;
const FILE_ALIGNMENT: usize = 0x200;

/// `.rsrc` section contents holding one `RT_VERSION` resource.
fn resource_section(version: &[u8]) -> Vec<u8> {
    fn directory(buf: &mut Vec<u8>, id: u32, target: u32) {
        buf.extend([0u8; 12]);
        buf.extend(0u16.to_le_bytes());
        buf.extend(1u16.to_le_bytes());
        buf.extend(id.to_le_bytes());
        buf.extend(target.to_le_bytes());
    }

    let mut buf = Vec::new();
    directory(&mut buf, 16, 0x8000_0000 | 0x18);
    directory(&mut buf, 1, 0x8000_0000 | 0x30);
    directory(&mut buf, 0x0409, 0x48);
    // IMAGE_RESOURCE_DATA_ENTRY
    buf.extend((SECTION_RVA + 0x58).to_le_bytes());
    buf.extend((version.len() as u32).to_le_bytes());
    buf.extend([0u8; 8]);
    debug_assert_eq!(buf.len(), 0x58);
    buf.extend(version);
    buf
}

/// A minimal PE32 image. `version` becomes an `RT_VERSION` resource and
/// `signature` a WIN_CERT_TYPE_PKCS_SIGNED_DATA attribute certificate.
pub fn pe_image(version: Option<&[u8]>, signature: Option<&[u8]>) -> Vec<u8> {
    pe_image_with_section(b".rsrc\0\0\0", version, signature)
}

/// [`pe_image`] with the resource section named `section_name`.
pub fn pe_image_with_section(
    section_name: &[u8; 8],
    version: Option<&[u8]>,
    signature: Option<&[u8]>,
) -> Vec<u8> {
    let rsrc = version.map(resource_section).unwrap_or_default();
    let mut rsrc_raw = rsrc.clone();
    pad_to(&mut rsrc_raw, FILE_ALIGNMENT);
    let raw_size = rsrc_raw.len().max(FILE_ALIGNMENT);
    rsrc_raw.resize(raw_size, 0);

    let certificate_offset = FILE_ALIGNMENT + raw_size;
    let certificate_table = signature.map(|blob| {
        let mut table = Vec::new();
        table.extend(((blob.len() + 8) as u32).to_le_bytes());
        table.extend(0x0200u16.to_le_bytes());
        table.extend(0x0002u16.to_le_bytes());
        table.extend(blob);
        pad_to(&mut table, 8);
        table
    });

    let mut image = vec![0u8; FILE_ALIGNMENT];
    image[..2].copy_from_slice(b"MZ");
    image[0x3C..0x40].copy_from_slice(&(PE_OFFSET as u32).to_le_bytes());

    let mut headers = Vec::new();
    headers.extend(b"PE\0\0");
    // COFF file header
    headers.extend(0x014Cu16.to_le_bytes());
    headers.extend(1u16.to_le_bytes());
    headers.extend([0u8; 12]);
    headers.extend(0xE0u16.to_le_bytes());
    headers.extend(0x0102u16.to_le_bytes());
    // Optional header, standard fields
    headers.extend(0x010Bu16.to_le_bytes());
    headers.extend([0u8; 2]);
    headers.extend([0u8; 12]);
    headers.extend(0u32.to_le_bytes());
    headers.extend(SECTION_RVA.to_le_bytes());
    headers.extend(SECTION_RVA.to_le_bytes());
    // Windows fields
    headers.extend(0x0040_0000u32.to_le_bytes());
    headers.extend(0x1000u32.to_le_bytes());
    headers.extend((FILE_ALIGNMENT as u32).to_le_bytes());
    headers.extend(6u16.to_le_bytes());
    headers.extend(0u16.to_le_bytes());
    headers.extend(0u16.to_le_bytes());
    headers.extend(0u16.to_le_bytes());
    headers.extend(6u16.to_le_bytes());
    headers.extend(0u16.to_le_bytes());
    headers.extend(0u32.to_le_bytes());
    headers.extend((SECTION_RVA + 0x1000).to_le_bytes());
    headers.extend((FILE_ALIGNMENT as u32).to_le_bytes());
    headers.extend(0u32.to_le_bytes());
    headers.extend(2u16.to_le_bytes());
    headers.extend(0u16.to_le_bytes());
    for value in [0x10_0000u32, 0x1000, 0x10_0000, 0x1000, 0] {
        headers.extend(value.to_le_bytes());
    }
    headers.extend(16u32.to_le_bytes());
    // Data directories
    for index in 0..16 {
        let (address, size) = match index {
            2 if !rsrc.is_empty() => (SECTION_RVA, rsrc.len() as u32),
            4 => match &certificate_table {
                Some(table) => (certificate_offset as u32, table.len() as u32),
                None => (0, 0),
            },
            _ => (0, 0),
        };
        headers.extend(address.to_le_bytes());
        headers.extend(size.to_le_bytes());
    }
    // Section table
    headers.extend(section_name);
    headers.extend((raw_size as u32).to_le_bytes());
    headers.extend(SECTION_RVA.to_le_bytes());
    headers.extend((raw_size as u32).to_le_bytes());
    headers.extend((FILE_ALIGNMENT as u32).to_le_bytes());
    headers.extend([0u8; 12]);
    headers.extend(0x4000_0040u32.to_le_bytes());

    image[PE_OFFSET..PE_OFFSET + headers.len()].copy_from_slice(&headers);
    image.extend(rsrc_raw);
    if let Some(table) = certificate_table {
        image.extend(table);
    }
    image
}

// ---------------------------------------------------------------------------
// Cabinet

/// A cabinet whose file table lists `names`. With `signature`, the header
/// reserve points at the blob appended after the cabinet body.
pub fn cabinet(names: &[&str], signature: Option<&[u8]>) -> Vec<u8> {
    let reserve_len = if signature.is_some() { 24 } else { 0 };
    let files_offset = 36 + reserve_len;

    let mut buf = vec![0u8; 36];
    buf[..4].copy_from_slice(b"MSCF");
    buf[16..20].copy_from_slice(&(files_offset as u32).to_le_bytes());
    buf[24] = 3;
    buf[25] = 1;
    buf[28..30].copy_from_slice(&(names.len() as u16).to_le_bytes());
    if signature.is_some() {
        buf[30..32].copy_from_slice(&4u16.to_le_bytes());
        buf.extend(20u16.to_le_bytes());
        buf.extend([0, 0]);
        buf.extend([0u8; 20]);
    }
    for name in names {
        buf.extend([0u8; 16]);
        buf.extend(name.as_bytes());
        buf.push(0);
    }
    buf.extend(b"compressed folder data");

    let body_len = buf.len() as u32;
    buf[8..12].copy_from_slice(&body_len.to_le_bytes());
    if let Some(blob) = signature {
        buf[36 + 4 + 4..36 + 4 + 8].copy_from_slice(&body_len.to_le_bytes());
        buf[36 + 4 + 8..36 + 4 + 12].copy_from_slice(&(blob.len() as u32).to_le_bytes());
        buf.extend(blob);
    }
    buf
}

// ---------------------------------------------------------------------------
// Compound file

/// An MSI-style compound file; `signature` goes into the
/// `\u{5}DigitalSignature` root stream.
pub fn compound_file(signature: Option<&[u8]>) -> Vec<u8> {
    use std::io::{Cursor, Write};

    let mut compound = cfb::CompoundFile::create(Cursor::new(Vec::new())).expect("create compound file");
    let mut summary = compound
        .create_stream("/\u{5}SummaryInformation")
        .expect("summary stream");
    summary.write_all(b"summary information").expect("write summary");
    summary.flush().expect("flush summary");
    drop(summary);
    if let Some(blob) = signature {
        let mut stream = compound
            .create_stream("/\u{5}DigitalSignature")
            .expect("signature stream");
        stream.write_all(blob).expect("write signature");
        stream.flush().expect("flush signature");
    }
    compound.flush().expect("flush compound file");
    compound.into_inner().into_inner()
}

// ---------------------------------------------------------------------------
// DER

/// Encodes one DER element.
pub fn der(tag: u8, contents: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];
    let len = contents.len();
    if len < 0x80 {
        out.push(len as u8);
    } else {
        let bytes: Vec<u8> = len
            .to_be_bytes()
            .into_iter()
            .skip_while(|b| *b == 0)
            .collect();
        out.push(0x80 | bytes.len() as u8);
        out.extend(bytes);
    }
    out.extend(contents);
    out
}

fn seq(parts: &[Vec<u8>]) -> Vec<u8> {
    der(0x30, &parts.concat())
}

fn set(parts: &[Vec<u8>]) -> Vec<u8> {
    der(0x31, &parts.concat())
}

fn oid(encoded: &[u8]) -> Vec<u8> {
    der(0x06, encoded)
}

fn integer(value: &[u8]) -> Vec<u8> {
    der(0x02, value)
}

const ECDSA_SHA256: &[u8] = &[0x2A, 0x86, 0x48, 0xCE, 0x3D, 0x04, 0x03, 0x02];
const SHA256: &[u8] = &[0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01];
const DATA: &[u8] = &[0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x07, 0x01];
const SIGNED_DATA: &[u8] = &[0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x07, 0x02];

/// Splits the first DER element off `bytes` as `(element, contents, rest)`.
fn split_element(bytes: &[u8]) -> (&[u8], &[u8], &[u8]) {
    let first = bytes[1] as usize;
    let (header, len) = if first < 0x80 {
        (2, first)
    } else {
        let count = first & 0x7F;
        let len = bytes[2..2 + count]
            .iter()
            .fold(0usize, |acc, b| (acc << 8) | usize::from(*b));
        (2 + count, len)
    };
    let end = header + len;
    (&bytes[..end], &bytes[header..end], &bytes[end..])
}

/// `(issuer, serialNumber)` elements of a DER certificate's tbsCertificate.
fn issuer_and_serial(certificate: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let (_, cert, _) = split_element(certificate);
    let (_, tbs, _) = split_element(cert);
    let (mut serial, _, mut rest) = split_element(tbs);
    if serial[0] == 0xA0 {
        (serial, _, rest) = split_element(rest);
    }
    let (_, _, rest) = split_element(rest);
    let (issuer, _, _) = split_element(rest);
    (issuer.to_vec(), serial.to_vec())
}

fn distinguished_name(common_name: &str) -> DistinguishedName {
    let mut name = DistinguishedName::new();
    name.push(DnType::CommonName, common_name);
    name
}

/// A generated X.509 certificate and the facts a signer identity reports.
pub struct TestCertificate {
    /// Full DER encoding
    pub der: Vec<u8>,
    /// subjectPublicKey bits, without the unused-bits byte
    pub key: Vec<u8>,
}

impl TestCertificate {
    fn from_parts(certificate: &Certificate, key: &KeyPair) -> Self {
        Self {
            der: certificate.der().to_vec(),
            key: key.public_key_raw().to_vec(),
        }
    }

    /// A self-signed end entity certificate for `common_name`.
    pub fn self_signed(common_name: &str) -> Self {
        let key = KeyPair::generate().expect("generate key");
        let mut params = CertificateParams::default();
        params.distinguished_name = distinguished_name(common_name);
        params.is_ca = IsCa::NoCa;
        let certificate = params.self_signed(&key).expect("self-sign certificate");
        Self::from_parts(&certificate, &key)
    }

    /// A CA certificate for `common_name` and the issuer that signs with it.
    pub fn authority(common_name: &str) -> (Self, Issuer<'static, KeyPair>) {
        let key = KeyPair::generate().expect("generate key");
        let mut params = CertificateParams::default();
        params.distinguished_name = distinguished_name(common_name);
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        let certificate = params.self_signed(&key).expect("self-sign authority");
        let authority = Self::from_parts(&certificate, &key);
        (authority, Issuer::new(params, key))
    }

    /// An end entity certificate for `common_name` signed by `issuer`.
    pub fn issued_by(common_name: &str, issuer: &Issuer<'_, KeyPair>) -> Self {
        let key = KeyPair::generate().expect("generate key");
        let mut params = CertificateParams::default();
        params.distinguished_name = distinguished_name(common_name);
        params.is_ca = IsCa::NoCa;
        let certificate = params.signed_by(&key, issuer).expect("issue certificate");
        Self::from_parts(&certificate, &key)
    }

    /// Expected thumbprint, uppercase hex.
    pub fn thumbprint(&self) -> String {
        sha1_hex(&self.der)
    }

    /// Expected public key hash, uppercase hex.
    pub fn public_key(&self) -> String {
        sha1_hex(&self.key)
    }
}

/// PKCS#7 SignedData carrying `certificates`, signed by `signer`.
pub fn pkcs7(certificates: &[&TestCertificate], signer: &TestCertificate) -> Vec<u8> {
    let (issuer, serial) = issuer_and_serial(&signer.der);
    let signer_info = seq(&[
        integer(&[1]),
        seq(&[issuer, serial]),
        seq(&[oid(SHA256)]),
        seq(&[oid(ECDSA_SHA256)]),
        der(0x04, &[0x01, 0x02, 0x03]),
    ]);
    let certs: Vec<Vec<u8>> = certificates.iter().map(|c| c.der.clone()).collect();
    let signed_data = seq(&[
        integer(&[1]),
        set(&[seq(&[oid(SHA256)])]),
        seq(&[oid(DATA)]),
        der(0xA0, &certs.concat()),
        set(&[signer_info]),
    ]);
    seq(&[oid(SIGNED_DATA), der(0xA0, &signed_data)])
}
