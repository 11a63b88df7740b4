use log::error;
use primitive_types::U512;

use crate::algo::{classify, AlgoTag, CandidateHeader};
use crate::chain::{BlockIndexEntry, ChainIndexView};
use crate::compact::{self, hash_to_target, CompactBits};
use crate::crypto::Hash256;
use crate::difficulter::get_next_stake_target;
use crate::error::PowError;
use crate::params::ConsensusParams;

use super::Validator;

/// Validates stake blocks for a staker holding `weight` units of stake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PosValidator {
    pub weight: u64,
}

/// does the check kernel_hash <= stake_target * weight
///
/// The product is taken in 512 bits so large weights cannot overflow.
pub fn check_stake_kernel(
    kernel_hash: &Hash256,
    bits: CompactBits,
    weight: u64,
    params: &ConsensusParams,
) -> Result<(), PowError> {
    if weight == 0 {
        return Err(PowError::ZeroStakeWeight);
    }

    let target = compact::decode(bits)?;
    if target.is_zero() || target > params.stake.pow_limit {
        return Err(PowError::InvalidTarget { bits });
    }

    let left_side = U512::from(hash_to_target(kernel_hash));
    let right_side = U512::from(target) * U512::from(weight);

    if left_side > right_side {
        error!("stake kernel {} misses target {:#010x} x {}", hex::encode(kernel_hash), bits, weight);
        return Err(PowError::HashExceedsTarget { bits });
    }
    Ok(())
}

impl Validator for PosValidator {
    fn validate<C: ChainIndexView + ?Sized>(
        &self,
        chain: &C,
        last: &BlockIndexEntry,
        header: &CandidateHeader,
        proof: &Hash256,
        params: &ConsensusParams,
    ) -> Result<(), PowError> {
        let algo = classify(header)?;
        if algo != AlgoTag::Stake {
            return Err(PowError::WrongAlgorithm {
                expected: AlgoTag::Stake,
                got: algo,
            });
        }

        let expected = get_next_stake_target(chain, last, params)?;
        if expected != header.bits {
            error!(
                "stake block at height {} has bits {:#010x}, required {:#010x}",
                last.height + 1,
                header.bits,
                expected
            );
            return Err(PowError::UnexpectedDifficulty {
                expected,
                got: header.bits,
            });
        }

        check_stake_kernel(proof, header.bits, self.weight, params)
    }
}
