//! Kademlia unique identifiers.
//!
//! A [`Kuid`] is a 160-bit coordinate in the DHT key space. Bit 0 is the most
//! significant bit of the first byte, so prefix arithmetic and the derived
//! `Ord` (unsigned magnitude) agree with each other.

use std::fmt;
use std::str::FromStr;

use rand::RngCore;

use crate::domain::errors::RoutingError;

/// Number of bytes in a [`Kuid`].
pub const KUID_LENGTH: usize = 20;

/// Number of bits in a [`Kuid`].
pub const KUID_BITS: usize = KUID_LENGTH * 8;

/// 160-bit identifier for nodes and keys.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Kuid([u8; KUID_LENGTH]);

impl Kuid {
    /// The all-zero identifier.
    pub const MIN: Kuid = Kuid([0x00; KUID_LENGTH]);

    /// The all-one identifier.
    pub const MAX: Kuid = Kuid([0xFF; KUID_LENGTH]);

    pub const fn new(bytes: [u8; KUID_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Generate a uniformly random identifier.
    pub fn random() -> Self {
        let mut bytes = [0u8; KUID_LENGTH];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Generate a random identifier whose first `depth` bits equal `prefix`'s.
    pub fn random_with_prefix(prefix: &Kuid, depth: usize) -> Self {
        let mut id = Self::random();
        let depth = depth.min(KUID_BITS);

        let full_bytes = depth / 8;
        id.0[..full_bytes].copy_from_slice(&prefix.0[..full_bytes]);

        let rem = depth % 8;
        if rem != 0 {
            let mask = 0xFFu8 << (8 - rem);
            id.0[full_bytes] = (prefix.0[full_bytes] & mask) | (id.0[full_bytes] & !mask);
        }
        id
    }

    pub fn as_bytes(&self) -> &[u8; KUID_LENGTH] {
        &self.0
    }

    /// XOR distance to `other`. Smaller is closer.
    pub fn xor(&self, other: &Kuid) -> Kuid {
        let mut out = [0u8; KUID_LENGTH];
        for (i, byte) in out.iter_mut().enumerate() {
            *byte = self.0[i] ^ other.0[i];
        }
        Kuid(out)
    }

    /// Whether bit `bit` (0 = most significant) is set.
    pub fn is_bit_set(&self, bit: usize) -> bool {
        debug_assert!(bit < KUID_BITS);
        self.0[bit / 8] & (0x80 >> (bit % 8)) != 0
    }

    /// Copy of this identifier with bit `bit` set.
    pub fn set_bit(&self, bit: usize) -> Kuid {
        debug_assert!(bit < KUID_BITS);
        let mut out = self.0;
        out[bit / 8] |= 0x80 >> (bit % 8);
        Kuid(out)
    }

    /// Copy of this identifier with every bit from `depth` on cleared.
    pub fn truncate(&self, depth: usize) -> Kuid {
        let mut out = self.0;
        for (i, byte) in out.iter_mut().enumerate() {
            let start = i * 8;
            if start >= depth {
                *byte = 0;
            } else if start + 8 > depth {
                *byte &= 0xFFu8 << (8 - (depth - start));
            }
        }
        Kuid(out)
    }

    /// Copy of this identifier with every bit from `depth` on set.
    pub fn fill_from(&self, depth: usize) -> Kuid {
        let mut out = self.0;
        for (i, byte) in out.iter_mut().enumerate() {
            let start = i * 8;
            if start >= depth {
                *byte = 0xFF;
            } else if start + 8 > depth {
                *byte |= 0xFFu8 >> (depth - start);
            }
        }
        Kuid(out)
    }

    /// Number of leading bits shared with `other` (0..=160).
    pub fn common_prefix_len(&self, other: &Kuid) -> usize {
        for i in 0..KUID_LENGTH {
            let diff = self.0[i] ^ other.0[i];
            if diff != 0 {
                return i * 8 + diff.leading_zeros() as usize;
            }
        }
        KUID_BITS
    }

    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }
}

impl fmt::Display for Kuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Kuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Kuid({})", self.to_hex())
    }
}

impl FromStr for Kuid {
    type Err = RoutingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| RoutingError::InvalidKuid(e.to_string()))?;
        let bytes: [u8; KUID_LENGTH] = bytes.try_into().map_err(|v: Vec<u8>| {
            RoutingError::InvalidKuid(format!("expected {} bytes, got {}", KUID_LENGTH, v.len()))
        })?;
        Ok(Kuid(bytes))
    }
}

impl From<[u8; KUID_LENGTH]> for Kuid {
    fn from(bytes: [u8; KUID_LENGTH]) -> Self {
        Self(bytes)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Kuid {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Kuid {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id_with_first_byte(b: u8) -> Kuid {
        let mut bytes = [0u8; KUID_LENGTH];
        bytes[0] = b;
        Kuid::new(bytes)
    }

    #[test]
    fn test_xor_with_self_is_zero() {
        let id = Kuid::random();
        assert_eq!(id.xor(&id), Kuid::MIN);
    }

    #[test]
    fn test_bit_indexing_is_msb_first() {
        let id = id_with_first_byte(0b1000_0001);
        assert!(id.is_bit_set(0));
        assert!(!id.is_bit_set(1));
        assert!(id.is_bit_set(7));
        assert!(!id.is_bit_set(8));
    }

    #[test]
    fn test_set_bit_returns_a_copy() {
        let id = Kuid::MIN;
        let set = id.set_bit(9);
        assert!(set.is_bit_set(9));
        assert_eq!(id, Kuid::MIN);
    }

    #[test]
    fn test_common_prefix_len() {
        let a = id_with_first_byte(0b1010_0000);
        let b = id_with_first_byte(0b1011_0000);
        assert_eq!(a.common_prefix_len(&b), 3);
        assert_eq!(a.common_prefix_len(&a), KUID_BITS);
        assert_eq!(Kuid::MIN.common_prefix_len(&Kuid::MAX), 0);
    }

    #[test]
    fn test_random_with_prefix_keeps_prefix_bits() {
        let prefix = id_with_first_byte(0b1101_0000);
        for _ in 0..32 {
            let id = Kuid::random_with_prefix(&prefix, 4);
            assert!(id.common_prefix_len(&prefix) >= 4, "prefix lost: {}", id);
        }
    }

    #[test]
    fn test_random_with_prefix_full_depth_is_prefix() {
        let prefix = Kuid::random();
        assert_eq!(Kuid::random_with_prefix(&prefix, KUID_BITS), prefix);
    }

    #[test]
    fn test_truncate_and_fill_bound_a_prefix_range() {
        let id = id_with_first_byte(0b1011_0110);
        assert_eq!(id.truncate(3), id_with_first_byte(0b1010_0000));

        let filled = id.fill_from(3);
        assert_eq!(filled.as_bytes()[0], 0b1011_1111);
        assert!(filled.as_bytes()[1..].iter().all(|b| *b == 0xFF));
    }

    #[test]
    fn test_ordering_is_unsigned_magnitude() {
        assert!(id_with_first_byte(0x80) > id_with_first_byte(0x7F));
        assert!(Kuid::MIN < Kuid::MAX);
    }

    #[test]
    fn test_hex_round_trip_and_rejects_bad_length() {
        let id = Kuid::random();
        let parsed: Kuid = id.to_hex().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("ABCD".parse::<Kuid>().is_err());
        assert!("zz".parse::<Kuid>().is_err());
    }
}
