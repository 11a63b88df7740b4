pub mod retarget;
pub mod stake;

use primitive_types::U512;

use crate::algo::{classify, AlgoTag, CandidateHeader};
use crate::chain::{BlockIndexEntry, ChainIndexView};
use crate::compact::{CompactBits, Target};
use crate::error::PowError;
use crate::params::ConsensusParams;

pub use retarget::{
    calculate_next_work, get_next_work_required_groestl, get_next_work_required_scrypt,
    get_next_work_required_sha256, AlgoDifficulter,
};
pub use stake::{calculate_next_stake_target, get_next_stake_target, StakeDifficulter};

/// A retargeting rule that yields the compact target the next block must carry.
pub trait Difficulter {
    fn next_bits<C: ChainIndexView + ?Sized>(
        &self,
        chain: &C,
        last: &BlockIndexEntry,
        params: &ConsensusParams,
    ) -> Result<CompactBits, PowError>;
}

/// Required bits for the block that follows `last`, under the algorithm
/// declared by `header`.
pub fn get_next_work_required<C: ChainIndexView + ?Sized>(
    chain: &C,
    last: &BlockIndexEntry,
    header: &CandidateHeader,
    params: &ConsensusParams,
) -> Result<CompactBits, PowError> {
    match classify(header)? {
        AlgoTag::Stake => get_next_stake_target(chain, last, params),
        algo => retarget::next_work_for_algo(chain, last, algo, Some(header.time), params)
            .map(|w| w.bits),
    }
}

// clamp a 512-bit intermediate into [1, pow_limit]
fn bound(scaled: U512, pow_limit: Target) -> Target {
    if scaled > U512::from(pow_limit) {
        return pow_limit;
    }
    if scaled.is_zero() {
        return Target::one();
    }
    Target::try_from(scaled).unwrap_or(pow_limit)
}
