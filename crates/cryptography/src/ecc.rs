//! Public keys on the secp256r1 curve.

use crate::{Error, Result};
use neo_io::{BinaryWriter, MemoryReader, Serializable};
use p256::ecdsa::signature::hazmat::PrehashVerifier;
use p256::ecdsa::{Signature, VerifyingKey};
use p256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use p256::EncodedPoint;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A point on secp256r1, the curve Neo uses for all account keys.
///
/// The point at infinity is a valid key encoding (a single `0x00` byte) and
/// sorts before every finite point.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey {
    point: Option<p256::PublicKey>,
}

impl PublicKey {
    /// The point at infinity.
    pub fn infinity() -> Self {
        Self { point: None }
    }

    /// Indicates whether this is the point at infinity.
    pub fn is_infinity(&self) -> bool {
        self.point.is_none()
    }

    /// Decodes a key from its SEC1 representation: `00` (infinity),
    /// `02`/`03` + 32 bytes (compressed) or `04` + 64 bytes (uncompressed).
    ///
    /// Points that do not lie on the curve (including x-coordinates at or
    /// above the field prime) are rejected.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        match data.first() {
            Some(0x00) if data.len() == 1 => Ok(Self::infinity()),
            Some(0x02) | Some(0x03) if data.len() == 33 => Self::from_sec1(data),
            Some(0x04) if data.len() == 65 => Self::from_sec1(data),
            Some(prefix) => Err(Error::InvalidKey(format!(
                "prefix {prefix:#04x} with length {} is not a valid encoding",
                data.len()
            ))),
            None => Err(Error::InvalidKey("empty key".into())),
        }
    }

    fn from_sec1(data: &[u8]) -> Result<Self> {
        let encoded = EncodedPoint::from_bytes(data)
            .map_err(|e| Error::InvalidKey(e.to_string()))?;
        let point = Option::<p256::PublicKey>::from(p256::PublicKey::from_encoded_point(&encoded))
            .ok_or_else(|| Error::InvalidKey("point is not on the curve".into()))?;
        Ok(Self { point: Some(point) })
    }

    /// Decodes a key from its hex form.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| Error::InvalidKey(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Returns the canonical (compressed) encoding.
    pub fn to_bytes(&self) -> Vec<u8> {
        match &self.point {
            None => vec![0x00],
            Some(point) => point.to_encoded_point(true).as_bytes().to_vec(),
        }
    }

    /// Returns the uncompressed SEC1 encoding, or `00` for infinity.
    pub fn to_uncompressed_bytes(&self) -> Vec<u8> {
        match &self.point {
            None => vec![0x00],
            Some(point) => point.to_encoded_point(false).as_bytes().to_vec(),
        }
    }

    /// Verifies a 64-byte `r ‖ s` signature over a prehashed message.
    pub fn verify(&self, signature: &[u8], message_hash: &[u8]) -> bool {
        let Some(point) = &self.point else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };
        VerifyingKey::from(point)
            .verify_prehash(message_hash, &signature)
            .is_ok()
    }

    fn coordinates(&self) -> Option<([u8; 32], [u8; 32])> {
        let point = self.point.as_ref()?;
        let encoded = point.to_encoded_point(false);
        let x: [u8; 32] = encoded.x()?.as_slice().try_into().ok()?;
        let y: [u8; 32] = encoded.y()?.as_slice().try_into().ok()?;
        Some((x, y))
    }
}

impl Ord for PublicKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.coordinates(), other.coordinates()) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some((ax, ay)), Some((bx, by))) => ax.cmp(&bx).then_with(|| ay.cmp(&by)),
        }
    }
}

impl PartialOrd for PublicKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::hash::Hash for PublicKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.to_bytes().hash(state);
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.to_bytes()))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({self})")
    }
}

impl FromStr for PublicKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl Serializable for PublicKey {
    fn serialize(&self, writer: &mut BinaryWriter) {
        writer.write_bytes(&self.to_bytes());
    }

    fn deserialize(reader: &mut MemoryReader) -> Self {
        let prefix = reader.read_u8();
        let body = match prefix {
            0x00 => Vec::new(),
            0x02 | 0x03 => reader.read_bytes(32),
            0x04 => reader.read_bytes(64),
            other => {
                reader.fault(neo_io::Error::InvalidFormat(format!(
                    "invalid public key prefix {other:#04x}"
                )));
                return Self::infinity();
            }
        };
        let mut data = Vec::with_capacity(1 + body.len());
        data.push(prefix);
        data.extend_from_slice(&body);
        match Self::from_bytes(&data) {
            Ok(key) => key,
            Err(err) => {
                reader.fault(neo_io::Error::InvalidFormat(err.to_string()));
                Self::infinity()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compressed_round_trip() {
        let hex_key = "03b209fd4f53a7170ea4444e0cb0a6bb6a53c2bd016926989cf85f9b0fba17a70c";
        let key = PublicKey::from_hex(hex_key).unwrap();
        assert_eq!(hex::encode(key.to_bytes()), hex_key);
    }

    #[test]
    fn uncompressed_form_is_accepted_and_compressed() {
        let compressed = "03b209fd4f53a7170ea4444e0cb0a6bb6a53c2bd016926989cf85f9b0fba17a70c";
        let key = PublicKey::from_hex(compressed).unwrap();
        let uncompressed = key.to_uncompressed_bytes();
        assert_eq!(uncompressed[0], 0x04);
        let back = PublicKey::from_bytes(&uncompressed).unwrap();
        assert_eq!(back, key);
        assert_eq!(back.to_bytes()[0], 0x03);
    }

    #[test]
    fn x_above_field_prime_is_rejected() {
        // x = 0xff… is >= p, so this cannot be a curve point.
        let mut bad = vec![0x02];
        bad.extend_from_slice(&[0xff; 32]);
        assert!(PublicKey::from_bytes(&bad).is_err());
    }

    #[test]
    fn infinity_encoding() {
        let inf = PublicKey::from_bytes(&[0x00]).unwrap();
        assert!(inf.is_infinity());
        assert_eq!(inf.to_bytes(), vec![0x00]);
    }

    #[test]
    fn ordering_is_by_coordinates() {
        let a = PublicKey::from_hex(
            "02486fd15702c4490a26703112a5cc1d0923fd697a33406bd5a1c00e0013b09a70",
        )
        .unwrap();
        let b = PublicKey::from_hex(
            "03b209fd4f53a7170ea4444e0cb0a6bb6a53c2bd016926989cf85f9b0fba17a70c",
        )
        .unwrap();
        assert_ne!(a.cmp(&b), Ordering::Equal);
        assert!(PublicKey::infinity() < a);
        let mut sorted = vec![b.clone(), a.clone()];
        sorted.sort();
        assert_eq!(sorted.iter().max().unwrap().cmp(sorted.first().unwrap()), Ordering::Greater);
    }

    #[test]
    fn serializable_round_trip() {
        let key = PublicKey::from_hex(
            "031ee4e73a17d8f76dc02532e2620bcb12425b33c0c9f9694cc2caa8226b68cad4",
        )
        .unwrap();
        let bytes = neo_io::to_vec(&key).unwrap();
        let back: PublicKey = neo_io::from_slice(&bytes).unwrap();
        assert_eq!(back, key);
    }
}
