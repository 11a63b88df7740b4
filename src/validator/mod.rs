pub mod pos;
pub mod pow;

use crate::algo::CandidateHeader;
use crate::chain::{BlockIndexEntry, ChainIndexView};
use crate::crypto::Hash256;
use crate::error::PowError;
use crate::params::ConsensusParams;

pub use pos::{check_stake_kernel, PosValidator};
pub use pow::{
    check_difficulty_transition, check_proof_of_work, check_proof_of_work_multi_algo,
    permitted_difficulty_transition, permitted_difficulty_transition_multi_algo, PowValidator,
};

pub trait Validator {
    /// check the proof of a candidate block that would follow `last`
    fn validate<C: ChainIndexView + ?Sized>(
        &self,
        chain: &C,
        last: &BlockIndexEntry,
        header: &CandidateHeader,
        proof: &Hash256,
        params: &ConsensusParams,
    ) -> Result<(), PowError>;
}
