//! Base58Check encoding with a double-SHA256 checksum.

use crate::hash::hash256;
use crate::{Error, Result};

/// Encodes `data` with a 4-byte double-SHA256 checksum appended.
pub fn base58_check_encode(data: &[u8]) -> String {
    let checksum = hash256(data);
    let mut payload = Vec::with_capacity(data.len() + 4);
    payload.extend_from_slice(data);
    payload.extend_from_slice(&checksum[..4]);
    bs58::encode(payload).into_string()
}

/// Decodes a Base58Check string, verifying and stripping the checksum.
pub fn base58_check_decode(encoded: &str) -> Result<Vec<u8>> {
    let bytes = bs58::decode(encoded)
        .into_vec()
        .map_err(|e| Error::InvalidBase58(e.to_string()))?;
    if bytes.len() < 4 {
        return Err(Error::InvalidBase58(
            "decoded data is shorter than the checksum".into(),
        ));
    }
    let (payload, checksum) = bytes.split_at(bytes.len() - 4);
    let expected = hash256(payload);
    if checksum != &expected[..4] {
        return Err(Error::ChecksumMismatch);
    }
    Ok(payload.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let data = [0x17, 0x01, 0x02, 0x03];
        let encoded = base58_check_encode(&data);
        assert_eq!(base58_check_decode(&encoded).unwrap(), data);
    }

    #[test]
    fn corrupted_checksum_is_rejected() {
        let mut encoded = base58_check_encode(&[0x17; 21]).into_bytes();
        let last = encoded.last_mut().unwrap();
        *last = if *last == b'1' { b'2' } else { b'1' };
        let corrupted = String::from_utf8(encoded).unwrap();
        assert!(matches!(
            base58_check_decode(&corrupted),
            Err(Error::ChecksumMismatch) | Err(Error::InvalidBase58(_))
        ));
    }
}
