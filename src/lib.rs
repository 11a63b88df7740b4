//! Difficulty retargeting and proof validation for a hybrid chain mined
//! with SHA256d, Scrypt and Groestl alongside proof-of-stake blocks.
//!
//! Every function is pure: callers pass a chain snapshot implementing
//! [`chain::ChainIndexView`] and a [`params::ConsensusParams`] value, and get
//! the same answer on every machine. Only integer arithmetic is used.

pub mod algo;
pub mod chain;
pub mod compact;
pub mod crypto;
pub mod difficulter;
pub mod error;
pub mod params;
pub mod validator;

pub use algo::{classify, select_next_algo, AlgoTag, CandidateHeader};
pub use chain::{BlockIndexEntry, ChainIndex, ChainIndexView};
pub use compact::{CompactBits, Target};
pub use difficulter::{
    calculate_next_work, get_next_stake_target, get_next_work_required,
    get_next_work_required_groestl, get_next_work_required_scrypt, get_next_work_required_sha256,
    Difficulter,
};
pub use error::{ChainError, ParamsError, PowError};
pub use params::{AlgoParams, ConsensusParams, Network};
pub use validator::{
    check_proof_of_work, check_proof_of_work_multi_algo, permitted_difficulty_transition,
    Validator,
};
