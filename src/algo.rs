use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::compact::CompactBits;
use crate::error::PowError;

/// The algorithm a block was produced under.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Copy, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub enum AlgoTag {
    Sha256 = 0,
    Scrypt = 1,
    Groestl = 2,
    Stake = 3,
}

impl AlgoTag {
    /// the hashing algorithms, in tag order
    pub const POW: [AlgoTag; 3] = [AlgoTag::Sha256, AlgoTag::Scrypt, AlgoTag::Groestl];

    pub const ALL: [AlgoTag; 4] = [
        AlgoTag::Sha256,
        AlgoTag::Scrypt,
        AlgoTag::Groestl,
        AlgoTag::Stake,
    ];

    pub fn from_u8(value: u8) -> Result<Self, PowError> {
        match value {
            0 => Ok(AlgoTag::Sha256),
            1 => Ok(AlgoTag::Scrypt),
            2 => Ok(AlgoTag::Groestl),
            3 => Ok(AlgoTag::Stake),
            other => Err(PowError::UnknownAlgorithm(other)),
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn is_proof_of_work(self) -> bool {
        self != AlgoTag::Stake
    }

    pub fn name(self) -> &'static str {
        match self {
            AlgoTag::Sha256 => "sha256d",
            AlgoTag::Scrypt => "scrypt",
            AlgoTag::Groestl => "groestl",
            AlgoTag::Stake => "pos",
        }
    }
}

impl TryFrom<u8> for AlgoTag {
    type Error = PowError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        AlgoTag::from_u8(value)
    }
}

impl fmt::Display for AlgoTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AlgoTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha256d" | "sha256" => Ok(AlgoTag::Sha256),
            "scrypt" => Ok(AlgoTag::Scrypt),
            "groestl" => Ok(AlgoTag::Groestl),
            "pos" | "stake" => Ok(AlgoTag::Stake),
            other => Err(format!("unknown algorithm name: {}", other)),
        }
    }
}

impl TryFrom<String> for AlgoTag {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AlgoTag> for String {
    fn from(algo: AlgoTag) -> Self {
        algo.name().to_string()
    }
}

/// The header fields the difficulty engine reads from a candidate block.
///
/// Produced by the external header deserializer; `algo` is the raw byte and
/// has not been range-checked yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateHeader {
    pub time: i64,
    pub bits: CompactBits,
    pub algo: u8,
}

impl CandidateHeader {
    pub fn new(time: i64, bits: CompactBits, algo: AlgoTag) -> Self {
        Self {
            time,
            bits,
            algo: algo.as_u8(),
        }
    }
}

/// Hashing algorithm scheduled for the block at `height`.
///
/// The three algorithms rotate in tag order; stake blocks are interleaved
/// by the staker and are not part of the schedule.
pub fn select_next_algo(height: u32) -> AlgoTag {
    AlgoTag::POW[(height % 3) as usize]
}

/// read the algorithm field of a header
pub fn classify(header: &CandidateHeader) -> Result<AlgoTag, PowError> {
    AlgoTag::from_u8(header.algo)
}
