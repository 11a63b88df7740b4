use log::error;

use crate::algo::{classify, AlgoTag, CandidateHeader};
use crate::chain::{BlockIndexEntry, ChainIndexView};
use crate::compact::{self, hash_to_target, CompactBits};
use crate::crypto::Hash256;
use crate::difficulter::calculate_next_work;
use crate::difficulter::retarget::next_work_for_algo;
use crate::error::PowError;
use crate::params::ConsensusParams;

use super::Validator;

/// Validates proof-of-work blocks of any hashing algorithm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PowValidator;

impl Validator for PowValidator {
    fn validate<C: ChainIndexView + ?Sized>(
        &self,
        chain: &C,
        last: &BlockIndexEntry,
        header: &CandidateHeader,
        proof: &Hash256,
        params: &ConsensusParams,
    ) -> Result<(), PowError> {
        let algo = classify(header)?;
        if !algo.is_proof_of_work() {
            return Err(PowError::NotProofOfWork(algo));
        }

        check_proof_of_work_multi_algo(proof, header.bits, params, algo)?;

        let height = i64::from(last.height) + 1;
        let required = next_work_for_algo(chain, last, algo, Some(header.time), params)?;

        // the pow limit handed out on short history need not follow the old bits
        if !required.history_fallback {
            if let Some(prev) = chain.last_block_of_algo(last, algo) {
                check_difficulty_transition(params, algo, height, prev.bits, header.bits)?;
            }
        }

        let expected = required.bits;
        if expected != header.bits {
            error!(
                "{} block at height {} has bits {:#010x}, required {:#010x}",
                algo, height, header.bits, expected
            );
            return Err(PowError::UnexpectedDifficulty {
                expected,
                got: header.bits,
            });
        }

        Ok(())
    }
}

/// check a hash against `bits`, bounded by the sha256 pow limit
pub fn check_proof_of_work(
    hash: &Hash256,
    bits: CompactBits,
    params: &ConsensusParams,
) -> Result<(), PowError> {
    check_proof_of_work_multi_algo(hash, bits, params, AlgoTag::Sha256)
}

/// Check a hash against `bits`, bounded by the pow limit of `algo`.
///
/// The hash is read as a big-endian integer and may equal the target.
pub fn check_proof_of_work_multi_algo(
    hash: &Hash256,
    bits: CompactBits,
    params: &ConsensusParams,
    algo: AlgoTag,
) -> Result<(), PowError> {
    let target = compact::decode(bits)?;
    if target.is_zero() || target > params.pow_limit(algo) {
        error!("{} target {:#010x} out of range", algo, bits);
        return Err(PowError::InvalidTarget { bits });
    }

    if hash_to_target(hash) > target {
        error!("hash {} doesn't match target {:#010x}", hex::encode(hash), bits);
        return Err(PowError::HashExceedsTarget { bits });
    }

    Ok(())
}

/// Reject `new_bits` if it could not follow `old_bits` at `height`.
///
/// Off a retarget boundary the bits must not change. On a boundary the new
/// target must lie within the largest and smallest targets a retarget could
/// produce, each rounded through the compact encoding the same way a
/// retarget rounds its result. Networks allowing min-difficulty blocks skip
/// the check.
pub fn check_difficulty_transition(
    params: &ConsensusParams,
    algo: AlgoTag,
    height: i64,
    old_bits: CompactBits,
    new_bits: CompactBits,
) -> Result<(), PowError> {
    if params.allow_min_difficulty_blocks {
        return Ok(());
    }

    let algo_params = params.algo(algo);
    let interval = i64::from(algo_params.retarget_interval.max(1));

    if height.rem_euclid(interval) != 0 {
        if old_bits != new_bits {
            return Err(PowError::DifficultyChangedOffSchedule {
                height,
                old_bits,
                new_bits,
            });
        }
        return Ok(());
    }

    let old_target = compact::decode(old_bits)?;
    let new_target = compact::decode(new_bits)?;

    let timespan = algo_params.target_timespan();
    let factor = i64::from(params.max_adjustment_factor.max(1));

    let largest = calculate_next_work(old_target, timespan * factor, params, algo);
    let maximum_new_target = compact::decode(compact::encode(largest))?;

    let smallest = calculate_next_work(old_target, timespan / factor, params, algo);
    let minimum_new_target = compact::decode(compact::encode(smallest))?;

    if new_target > maximum_new_target || new_target < minimum_new_target {
        return Err(PowError::ExcessiveDifficultyJump {
            height,
            old_bits,
            new_bits,
        });
    }

    Ok(())
}

/// transition gate bounded by the sha256 parameters
pub fn permitted_difficulty_transition(
    params: &ConsensusParams,
    height: i64,
    old_bits: CompactBits,
    new_bits: CompactBits,
) -> bool {
    permitted_difficulty_transition_multi_algo(params, AlgoTag::Sha256, height, old_bits, new_bits)
}

pub fn permitted_difficulty_transition_multi_algo(
    params: &ConsensusParams,
    algo: AlgoTag,
    height: i64,
    old_bits: CompactBits,
    new_bits: CompactBits,
) -> bool {
    check_difficulty_transition(params, algo, height, old_bits, new_bits).is_ok()
}
