//! Proof-of-work hash dispatch.
//!
//! Each hashing algorithm maps to one function over the serialized header.
//! The primitives come from their crates as-is; this module only picks one.

use scrypt::{scrypt, Params};
use sha2::{Digest, Sha256};

use crate::algo::AlgoTag;
use crate::error::PowError;

pub type Hash256 = [u8; 32];

pub type HashFn = fn(&[u8]) -> Result<Hash256, PowError>;

// scrypt cost parameters: N = 2^10, r = 1, p = 1
const SCRYPT_LOG_N: u8 = 10;
const SCRYPT_R: u32 = 1;
const SCRYPT_P: u32 = 1;

/// hash function for an algorithm, `None` for stake blocks
pub fn hasher(algo: AlgoTag) -> Option<HashFn> {
    match algo {
        AlgoTag::Sha256 => Some(sha256d),
        AlgoTag::Scrypt => Some(scrypt_hash),
        AlgoTag::Groestl => Some(groestl_hash),
        AlgoTag::Stake => None,
    }
}

/// compute the proof-of-work hash of a serialized header
pub fn pow_hash(algo: AlgoTag, header_bytes: &[u8]) -> Result<Hash256, PowError> {
    let hash_fn = hasher(algo).ok_or(PowError::NotProofOfWork(algo))?;
    hash_fn(header_bytes)
}

fn sha256d(data: &[u8]) -> Result<Hash256, PowError> {
    let first = Sha256::digest(data);
    let second = Sha256::digest(&first);

    let mut out = [0u8; 32];
    out.copy_from_slice(&second);
    Ok(out)
}

fn scrypt_hash(data: &[u8]) -> Result<Hash256, PowError> {
    let params = Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P)
        .map_err(|_| PowError::HashFailure("invalid scrypt parameters"))?;

    // the header is both password and salt
    let mut out = [0u8; 32];
    scrypt(data, data, &params, &mut out)
        .map_err(|_| PowError::HashFailure("invalid scrypt output length"))?;
    Ok(out)
}

fn groestl_hash(data: &[u8]) -> Result<Hash256, PowError> {
    let first = groestl::Groestl512::digest(data);
    let second = groestl::Groestl512::digest(&first);

    let mut out = [0u8; 32];
    out.copy_from_slice(&second[..32]);
    Ok(out)
}
