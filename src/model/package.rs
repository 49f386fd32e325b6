//! Byte layout of a `.cxA` package.
//!
//! ```text
//!  Header (22 bytes)
//!      magic[6]      "CXAPP\0"  (only the first 5 bytes are checked)
//!      version       u32
//!      settings_len  u32
//!      script_len    u32
//!      file_count    u32
//!  settings_len bytes   compressed settings.json
//!  script_len bytes     compressed script body
//!  file_count × record
//!      name_len u32, data_len u32, name bytes (UTF-8), data bytes
//! ```
//!
//! All integers are little-endian.

use crate::error::PackageError;

pub const MAGIC: [u8; 6] = *b"CXAPP\0";
pub const MAGIC_SIGNIFICANT: usize = 5;
pub const FORMAT_VERSION: u32 = 1;

pub const HEADER_LEN: usize = 6 + 4 * 4;
pub const RECORD_HEADER_LEN: usize = 4 + 4;

pub const PACKAGE_EXT: &str = "cxA";
pub const SETTINGS_FILE: &str = "settings.json";
pub const SCRIPT_FILE: &str = "main.cx-code";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageHeader {
    pub version: u32,
    pub settings_len: u32,
    pub script_len: u32,
    pub file_count: u32,
}

impl PackageHeader {
    pub fn new(settings_len: u32, script_len: u32, file_count: u32) -> Self {
        Self {
            version: FORMAT_VERSION,
            settings_len,
            script_len,
            file_count,
        }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[..6].copy_from_slice(&MAGIC);
        out[6..10].copy_from_slice(&self.version.to_le_bytes());
        out[10..14].copy_from_slice(&self.settings_len.to_le_bytes());
        out[14..18].copy_from_slice(&self.script_len.to_le_bytes());
        out[18..22].copy_from_slice(&self.file_count.to_le_bytes());
        out
    }

    /// Decode and check magic + version.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PackageError> {
        if bytes.len() < HEADER_LEN {
            return Err(PackageError::Truncated { what: "header" });
        }
        if bytes[..MAGIC_SIGNIFICANT] != MAGIC[..MAGIC_SIGNIFICANT] {
            return Err(PackageError::BadMagic);
        }
        let header = Self {
            version: read_u32(&bytes[6..10]),
            settings_len: read_u32(&bytes[10..14]),
            script_len: read_u32(&bytes[14..18]),
            file_count: read_u32(&bytes[18..22]),
        };
        if header.version != FORMAT_VERSION {
            return Err(PackageError::UnsupportedVersion(header.version));
        }
        Ok(header)
    }
}

/// Fixed part of one embedded file record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub name_len: u32,
    pub data_len: u32,
}

impl RecordHeader {
    pub fn to_bytes(&self) -> [u8; RECORD_HEADER_LEN] {
        let mut out = [0u8; RECORD_HEADER_LEN];
        out[..4].copy_from_slice(&self.name_len.to_le_bytes());
        out[4..].copy_from_slice(&self.data_len.to_le_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8; RECORD_HEADER_LEN]) -> Self {
        Self {
            name_len: read_u32(&bytes[..4]),
            data_len: read_u32(&bytes[4..]),
        }
    }
}

/// Encode one whole record (header, name, payload) into a single buffer.
pub fn encode_record(name: &str, payload: &[u8]) -> Result<Vec<u8>, PackageError> {
    let header = RecordHeader {
        name_len: u32::try_from(name.len()).map_err(|_| PackageError::TooLarge {
            what: "file name",
        })?,
        data_len: u32::try_from(payload.len()).map_err(|_| PackageError::TooLarge {
            what: "compressed file",
        })?,
    };
    let mut buf = Vec::with_capacity(RECORD_HEADER_LEN + name.len() + payload.len());
    buf.extend_from_slice(&header.to_bytes());
    buf.extend_from_slice(name.as_bytes());
    buf.extend_from_slice(payload);
    Ok(buf)
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let bytes = PackageHeader::new(10, 20, 3).to_bytes();
        assert_eq!(&bytes[..6], b"CXAPP\0");
        assert_eq!(&bytes[6..10], &[1, 0, 0, 0]);
        assert_eq!(&bytes[18..22], &[3, 0, 0, 0]);

        let header = PackageHeader::from_bytes(&bytes).unwrap();
        assert_eq!(header.settings_len, 10);
        assert_eq!(header.script_len, 20);
    }

    #[test]
    fn test_only_five_magic_bytes_are_significant() {
        let mut bytes = PackageHeader::new(1, 1, 0).to_bytes();
        bytes[5] = b'!';
        assert!(PackageHeader::from_bytes(&bytes).is_ok());

        bytes[2] = b'x';
        assert!(matches!(
            PackageHeader::from_bytes(&bytes),
            Err(PackageError::BadMagic)
        ));
    }

    #[test]
    fn test_version_mismatch() {
        let mut bytes = PackageHeader::new(1, 1, 0).to_bytes();
        bytes[6] = 2;
        assert!(matches!(
            PackageHeader::from_bytes(&bytes),
            Err(PackageError::UnsupportedVersion(2))
        ));
    }

    #[test]
    fn test_record_encoding() {
        let rec = encode_record("a/b.txt", &[9, 9, 9]).unwrap();
        assert_eq!(rec.len(), RECORD_HEADER_LEN + 7 + 3);
        let head: [u8; RECORD_HEADER_LEN] = rec[..RECORD_HEADER_LEN].try_into().unwrap();
        let head = RecordHeader::from_bytes(&head);
        assert_eq!(head.name_len, 7);
        assert_eq!(head.data_len, 3);
        assert_eq!(&rec[RECORD_HEADER_LEN..RECORD_HEADER_LEN + 7], b"a/b.txt");
    }
}
