//! Signer identity extraction from Authenticode signatures.
//!
//! Reads the leaf signing certificate out of a PKCS#7 SignedData blob and
//! reports who signed the payload. There is no chain building, trust
//! evaluation or revocation checking.

use super::der::{
    TAG_BIT_STRING, TAG_CONTEXT_0, TAG_INTEGER, TAG_OID, TAG_SEQUENCE, TAG_SET, Tlv,
};
use sha1::{Digest, Sha1};

/// `1.2.840.113549.1.7.2` (pkcs7-signedData)
const SIGNED_DATA_OID: &[u8] = &[0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x07, 0x02];

/// Identity of the certificate that signed a payload.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CertificateIdentity {
    /// SHA-1 of the certificate's public key bits, uppercase hex
    pub public_key: String,
    /// SHA-1 of the DER encoded certificate, uppercase hex
    pub thumbprint: String,
}

/// Extracts the signer identity from a PKCS#7 SignedData blob.
///
/// Returns `None` when the blob cannot be parsed or carries no certificate.
pub fn extract_certificate(pkcs7: &[u8]) -> Option<CertificateIdentity> {
    let signed_data = signed_data(pkcs7)?;

    let mut certificates = Vec::new();
    let mut signer_infos = None;
    for child in signed_data.children() {
        match child.tag {
            TAG_CONTEXT_0 => certificates.extend(
                child
                    .children()
                    .filter(|c| c.tag == TAG_SEQUENCE)
                    .map(|c| c.raw),
            ),
            // digestAlgorithms is also a SET, the signer infos come last
            TAG_SET => signer_infos = Some(child),
            _ => {}
        }
    }

    let leaf = signer_infos
        .and_then(|infos| infos.children().next())
        .and_then(|info| {
            let (issuer, serial) = issuer_and_serial(&info)?;
            certificates
                .iter()
                .copied()
                .find(|cert| certificate_issuer_and_serial(cert) == Some((issuer, serial)))
        })
        .or_else(|| certificates.first().copied())?;

    identity(leaf)
}

/// Computes the identity fields for one DER encoded X.509 certificate.
pub fn identity(certificate: &[u8]) -> Option<CertificateIdentity> {
    let key_bits = public_key_bits(certificate)?;
    Some(CertificateIdentity {
        public_key: hex::encode_upper(Sha1::digest(key_bits)),
        thumbprint: hex::encode_upper(Sha1::digest(certificate)),
    })
}

fn signed_data(pkcs7: &[u8]) -> Option<Tlv<'_>> {
    let (content_info, _) = Tlv::expect(pkcs7, TAG_SEQUENCE)?;
    let (oid, rest) = Tlv::expect(content_info.contents, TAG_OID)?;
    if oid.contents != SIGNED_DATA_OID {
        return None;
    }
    let (explicit, _) = Tlv::expect(rest, TAG_CONTEXT_0)?;
    let (signed_data, _) = Tlv::expect(explicit.contents, TAG_SEQUENCE)?;
    Some(signed_data)
}

/// `SignerInfo.sid` when it is an IssuerAndSerialNumber.
fn issuer_and_serial<'a>(signer_info: &Tlv<'a>) -> Option<(&'a [u8], &'a [u8])> {
    let mut children = signer_info.children();
    children.next().filter(|v| v.tag == TAG_INTEGER)?;
    let sid = children.next().filter(|s| s.tag == TAG_SEQUENCE)?;
    let mut parts = sid.children();
    let issuer = parts.next().filter(|i| i.tag == TAG_SEQUENCE)?;
    let serial = parts.next().filter(|s| s.tag == TAG_INTEGER)?;
    Some((issuer.raw, serial.raw))
}

/// Fields of `tbsCertificate` from the serial number onwards.
fn tbs_fields(certificate: &[u8]) -> Option<Vec<Tlv<'_>>> {
    let (cert, _) = Tlv::expect(certificate, TAG_SEQUENCE)?;
    let tbs = cert.children().next().filter(|t| t.tag == TAG_SEQUENCE)?;
    let mut fields: Vec<_> = tbs.children().collect();
    if fields.first().map(|f| f.tag) == Some(TAG_CONTEXT_0) {
        fields.remove(0);
    }
    Some(fields)
}

fn certificate_issuer_and_serial(certificate: &[u8]) -> Option<(&[u8], &[u8])> {
    // serial, signature, issuer, ...
    let fields = tbs_fields(certificate)?;
    let serial = fields.first().filter(|f| f.tag == TAG_INTEGER)?;
    let issuer = fields.get(2).filter(|f| f.tag == TAG_SEQUENCE)?;
    Some((issuer.raw, serial.raw))
}

fn public_key_bits(certificate: &[u8]) -> Option<&[u8]> {
    // serial, signature, issuer, validity, subject, subjectPublicKeyInfo
    let fields = tbs_fields(certificate)?;
    let spki = fields.get(5).filter(|f| f.tag == TAG_SEQUENCE)?;
    let bits = spki.children().nth(1).filter(|b| b.tag == TAG_BIT_STRING)?;
    // Leading byte counts unused bits.
    bits.contents.get(1..)
}
