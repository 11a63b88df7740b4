//! Compact ("nBits") encoding of 256-bit targets.
//!
//! The compact form is a base-256 float: the top byte is the size of the
//! number in bytes, the low 23 bits are the mantissa and bit 23 is a sign
//! flag. Targets are never negative, so a set sign flag is always invalid.

use primitive_types::U256;

use crate::error::PowError;

/// 256-bit proof-of-work target, compared against hashes read big-endian.
pub type Target = U256;

/// 4-byte compact target as carried in block headers.
pub type CompactBits = u32;

const SIGN_BIT: u32 = 0x0080_0000;
const MANTISSA_MASK: u32 = 0x007f_ffff;

/// Expand compact bits into a full target.
///
/// A zero mantissa decodes to a zero target; callers that need a usable
/// target must reject zero themselves.
pub fn decode(bits: CompactBits) -> Result<Target, PowError> {
    let size = bits >> 24;
    let word = bits & MANTISSA_MASK;

    if bits & SIGN_BIT != 0 {
        return Err(PowError::InvalidTarget { bits });
    }

    let overflow =
        word != 0 && (size > 34 || (word > 0xff && size > 33) || (word > 0xffff && size > 32));
    if overflow {
        return Err(PowError::InvalidTarget { bits });
    }

    if word == 0 {
        return Ok(Target::zero());
    }

    let target = if size <= 3 {
        Target::from(word >> (8 * (3 - size)))
    } else {
        Target::from(word) << (8 * (size - 3)) as usize
    };

    Ok(target)
}

/// Compress a target, truncating the mantissa so the result never decodes
/// to more than `target`.
pub fn encode(target: Target) -> CompactBits {
    let mut size = (target.bits() + 7) / 8;

    let mut compact = if size <= 3 {
        (target.low_u64() << (8 * (3 - size))) as u32
    } else {
        (target >> (8 * (size - 3))).low_u32()
    };

    // keep the mantissa positive
    if compact & SIGN_BIT != 0 {
        compact >>= 8;
        size += 1;
    }

    compact | ((size as u32) << 24)
}

/// Read a 32-byte digest as a big-endian 256-bit integer.
pub fn hash_to_target(hash: &[u8; 32]) -> Target {
    Target::from_big_endian(hash)
}

/// Parse a big-endian hex string (64 digits or fewer) into a target.
pub fn target_from_hex(s: &str) -> Result<Target, hex::FromHexError> {
    let s = s.trim_start_matches("0x");
    let padded = if s.len() % 2 == 1 {
        format!("0{}", s)
    } else {
        s.to_string()
    };
    let bytes = hex::decode(padded)?;
    if bytes.len() > 32 {
        return Err(hex::FromHexError::InvalidStringLength);
    }
    Ok(Target::from_big_endian(&bytes))
}

/// Render a target as 64 big-endian hex digits.
pub fn target_to_hex(target: &Target) -> String {
    let mut buf = [0u8; 32];
    target.to_big_endian(&mut buf);
    hex::encode(buf)
}

/// serde adapter storing targets as big-endian hex strings.
pub mod serde_hex {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    use super::{target_from_hex, target_to_hex, Target};

    pub fn serialize<S: Serializer>(target: &Target, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&target_to_hex(target))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Target, D::Error> {
        let s = String::deserialize(deserializer)?;
        target_from_hex(&s).map_err(D::Error::custom)
    }
}
