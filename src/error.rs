use thiserror::Error;

use crate::algo::AlgoTag;

/// Reasons a difficulty computation or a proof check can fail.
///
/// None of these are retryable: the computation is deterministic, so the
/// caller either rejects the block or (for `InsufficientChainHistory` during
/// bootstrap) falls back to the minimum difficulty.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PowError {
    #[error("invalid compact target {bits:#010x}")]
    InvalidTarget { bits: u32 },

    #[error("hash exceeds target {bits:#010x}")]
    HashExceedsTarget { bits: u32 },

    #[error("unknown algorithm tag {0}")]
    UnknownAlgorithm(u8),

    #[error("not enough {algo} history: need {required} blocks, found {found}")]
    InsufficientChainHistory {
        algo: AlgoTag,
        required: u32,
        found: u32,
    },

    #[error("difficulty changed off schedule at height {height}: {old_bits:#010x} -> {new_bits:#010x}")]
    DifficultyChangedOffSchedule {
        height: i64,
        old_bits: u32,
        new_bits: u32,
    },

    #[error("excessive difficulty jump at height {height}: {old_bits:#010x} -> {new_bits:#010x}")]
    ExcessiveDifficultyJump {
        height: i64,
        old_bits: u32,
        new_bits: u32,
    },

    #[error("unexpected difficulty bits {got:#010x}, required {expected:#010x}")]
    UnexpectedDifficulty { expected: u32, got: u32 },

    #[error("{0} blocks carry no proof-of-work hash")]
    NotProofOfWork(AlgoTag),

    #[error("expected a {expected} block, got {got}")]
    WrongAlgorithm { expected: AlgoTag, got: AlgoTag },

    #[error("stake weight must be non-zero")]
    ZeroStakeWeight,

    #[error("hash function failed: {0}")]
    HashFailure(&'static str),
}

/// Errors from building or loading a chain index.
#[derive(Error, Debug)]
pub enum ChainError {
    #[error("chain index needs at least a genesis entry")]
    Empty,

    #[error("non-contiguous height: expected {expected}, got {got}")]
    NonContiguous { expected: u32, got: u32 },

    #[error("the genesis entry cannot be rolled back")]
    CannotRemoveGenesis,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed chain file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from loading or checking consensus parameters.
#[derive(Error, Debug)]
pub enum ParamsError {
    #[error("invalid consensus parameters: {0}")]
    Invalid(String),

    #[error("unknown network {0:?}")]
    UnknownNetwork(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed params file: {0}")]
    Json(#[from] serde_json::Error),
}
