//! Proof-of-stake target.
//!
//! Stake weight does not come and go like rented hashpower, so the stake
//! target follows every block instead of waiting for an interval boundary.
//! Each step moves the target by the relative spacing error, bounded to
//! `1 / stake_max_step_divisor` either way.

use log::debug;
use primitive_types::U512;

use crate::algo::AlgoTag;
use crate::chain::{BlockIndexEntry, ChainIndexView};
use crate::compact::{self, CompactBits, Target};
use crate::error::PowError;
use crate::params::ConsensusParams;

use super::{bound, Difficulter};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StakeDifficulter;

impl Difficulter for StakeDifficulter {
    fn next_bits<C: ChainIndexView + ?Sized>(
        &self,
        chain: &C,
        last: &BlockIndexEntry,
        params: &ConsensusParams,
    ) -> Result<CompactBits, PowError> {
        get_next_stake_target(chain, last, params)
    }
}

/// `old_target * (1 + delta)` with `delta = (actual - S) / S` bounded to
/// `±1 / stake_max_step_divisor`, clamped to `[1, pow_limit]`.
pub fn calculate_next_stake_target(
    old_target: Target,
    actual_spacing: i64,
    params: &ConsensusParams,
) -> Target {
    let target_spacing = params.stake.target_spacing.max(1);
    let max_step = target_spacing / params.stake_max_step_divisor.max(1);

    let bounded = actual_spacing
        .max(target_spacing - max_step)
        .min(target_spacing + max_step);

    let scaled = U512::from(old_target) * U512::from(bounded.max(0) as u64)
        / U512::from(target_spacing as u64);

    bound(scaled, params.stake.pow_limit)
}

/// Required stake target for the block after `last`.
///
/// Needs two earlier stake blocks to measure a spacing; until then the
/// stake pow limit applies.
pub fn get_next_stake_target<C: ChainIndexView + ?Sized>(
    chain: &C,
    last: &BlockIndexEntry,
    params: &ConsensusParams,
) -> Result<CompactBits, PowError> {
    let limit_bits = params.stake.pow_limit_bits();

    let prev = match chain.last_block_of_algo(last, AlgoTag::Stake) {
        Some(prev) => prev,
        None => return Ok(limit_bits),
    };
    let before = match chain
        .parent(prev)
        .and_then(|parent| chain.last_block_of_algo(parent, AlgoTag::Stake))
    {
        Some(before) => before,
        None => return Ok(limit_bits),
    };

    if params.no_retargeting {
        return Ok(prev.bits);
    }

    let actual_spacing = prev.timestamp - before.timestamp;
    let old_target = compact::decode(prev.bits)?;
    let new_bits = compact::encode(calculate_next_stake_target(old_target, actual_spacing, params));

    debug!(
        "stake target at height {}: spacing: {} expected: {} bits: {:#010x} -> {:#010x}",
        last.height + 1,
        actual_spacing,
        params.stake.target_spacing,
        prev.bits,
        new_bits
    );

    Ok(new_bits)
}
