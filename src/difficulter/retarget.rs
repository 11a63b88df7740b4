use log::{debug, info, warn};
use primitive_types::U512;

use crate::algo::AlgoTag;
use crate::chain::{BlockIndexEntry, ChainIndexView};
use crate::compact::{self, CompactBits, Target};
use crate::error::PowError;
use crate::params::ConsensusParams;

use super::{bound, stake, Difficulter};

/// Retarget rule of one hashing algorithm.
///
/// Difficulty is flat between boundaries and moves by at most
/// `max_adjustment_factor` at each boundary. Boundaries are chain heights, so
/// blocks of other algorithms count towards the interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlgoDifficulter(pub AlgoTag);

impl Difficulter for AlgoDifficulter {
    fn next_bits<C: ChainIndexView + ?Sized>(
        &self,
        chain: &C,
        last: &BlockIndexEntry,
        params: &ConsensusParams,
    ) -> Result<CompactBits, PowError> {
        match self.0 {
            AlgoTag::Stake => stake::get_next_stake_target(chain, last, params),
            algo => next_work_for_algo(chain, last, algo, None, params).map(|w| w.bits),
        }
    }
}

/// Bits a block must carry, and whether they are the pow limit handed out
/// because the algorithm lacked a full retarget window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RequiredWork {
    pub bits: CompactBits,
    pub history_fallback: bool,
}

impl RequiredWork {
    fn exact(bits: CompactBits) -> Self {
        Self {
            bits,
            history_fallback: false,
        }
    }
}

/// Scale `old_target` by how long the last window actually took.
///
/// The timespan is clamped to `[T / f, T * f]` first and the product is taken
/// in 512 bits, so the result is exact up to truncating division. The result
/// lies in `[1, pow_limit]`.
pub fn calculate_next_work(
    old_target: Target,
    actual_timespan: i64,
    params: &ConsensusParams,
    algo: AlgoTag,
) -> Target {
    let algo_params = params.algo(algo);
    let target_timespan = algo_params.target_timespan().max(1);
    let factor = i64::from(params.max_adjustment_factor.max(1));

    let clamped = actual_timespan
        .max(target_timespan / factor)
        .min(target_timespan * factor);

    let scaled = U512::from(old_target) * U512::from(clamped.max(0) as u64)
        / U512::from(target_timespan as u64);

    bound(scaled, algo_params.pow_limit)
}

pub fn get_next_work_required_sha256<C: ChainIndexView + ?Sized>(
    chain: &C,
    last: &BlockIndexEntry,
    params: &ConsensusParams,
) -> Result<CompactBits, PowError> {
    next_work_for_algo(chain, last, AlgoTag::Sha256, None, params).map(|w| w.bits)
}

pub fn get_next_work_required_scrypt<C: ChainIndexView + ?Sized>(
    chain: &C,
    last: &BlockIndexEntry,
    params: &ConsensusParams,
) -> Result<CompactBits, PowError> {
    next_work_for_algo(chain, last, AlgoTag::Scrypt, None, params).map(|w| w.bits)
}

pub fn get_next_work_required_groestl<C: ChainIndexView + ?Sized>(
    chain: &C,
    last: &BlockIndexEntry,
    params: &ConsensusParams,
) -> Result<CompactBits, PowError> {
    next_work_for_algo(chain, last, AlgoTag::Groestl, None, params).map(|w| w.bits)
}

/// `candidate_time` enables the min-difficulty rule on networks that allow it.
pub(crate) fn next_work_for_algo<C: ChainIndexView + ?Sized>(
    chain: &C,
    last: &BlockIndexEntry,
    algo: AlgoTag,
    candidate_time: Option<i64>,
    params: &ConsensusParams,
) -> Result<RequiredWork, PowError> {
    let algo_params = params.algo(algo);
    let limit_bits = algo_params.pow_limit_bits();
    let interval = algo_params.retarget_interval.max(1);

    let prev = match chain.last_block_of_algo(last, algo) {
        Some(prev) => prev,
        None => {
            debug!("no {} block below height {}, using pow limit", algo, last.height + 1);
            return Ok(RequiredWork::exact(limit_bits));
        }
    };

    if params.no_retargeting {
        return Ok(RequiredWork::exact(prev.bits));
    }

    let next_height = u64::from(last.height) + 1;
    if next_height % u64::from(interval) != 0 {
        if params.allow_min_difficulty_blocks {
            if let Some(time) = candidate_time {
                // a block arriving after twice the spacing may use the easiest target
                if time > prev.timestamp + algo_params.target_spacing * 2 {
                    return Ok(RequiredWork::exact(limit_bits));
                }
                return Ok(RequiredWork::exact(last_non_min_difficulty_bits(
                    chain, prev, algo, interval, limit_bits,
                )));
            }
        }
        return Ok(RequiredWork::exact(prev.bits));
    }

    let first_time = match chain.first_block_of_retarget_window(last, algo, interval) {
        Ok(time) => time,
        Err(e) => {
            warn!("{} at height {}, using pow limit", e, next_height);
            return Ok(RequiredWork {
                bits: limit_bits,
                history_fallback: true,
            });
        }
    };

    let actual_timespan = prev.timestamp - first_time;
    let old_target = compact::decode(prev.bits)?;
    let new_bits = compact::encode(calculate_next_work(
        old_target,
        actual_timespan,
        params,
        algo,
    ));

    info!(
        "{} retarget at height {}: time taken: {} time expected: {} bits: {:#010x} -> {:#010x}",
        algo,
        next_height,
        actual_timespan,
        algo_params.target_timespan(),
        prev.bits,
        new_bits
    );

    Ok(RequiredWork::exact(new_bits))
}

// walk back over min-difficulty blocks of `algo` that sit off a boundary
fn last_non_min_difficulty_bits<C: ChainIndexView + ?Sized>(
    chain: &C,
    prev: &BlockIndexEntry,
    algo: AlgoTag,
    interval: u32,
    limit_bits: CompactBits,
) -> CompactBits {
    let mut entry = prev;
    while entry.bits == limit_bits && entry.height % interval != 0 {
        match chain
            .parent(entry)
            .and_then(|parent| chain.last_block_of_algo(parent, algo))
        {
            Some(earlier) => entry = earlier,
            None => break,
        }
    }
    entry.bits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::CandidateHeader;
    use crate::chain::ChainIndex;
    use crate::difficulter::get_next_work_required;

    const BASE_TIME: i64 = 1_700_000_000;

    // one algorithm, 2016 blocks of 600 seconds
    fn bitcoin_like() -> ConsensusParams {
        let mut params = ConsensusParams::main();
        params.sha256.target_spacing = 600;
        params.sha256.retarget_interval = 2016;
        params
    }

    // scrypt on odd heights, sha256 on even heights, 600s per height
    fn interleaved_chain(tip: u32, scrypt_bits: u32) -> ChainIndex {
        let mut chain = ChainIndex::new(BlockIndexEntry::new(0, BASE_TIME, 0x1d00ffff, AlgoTag::Sha256));
        for height in 1..=tip {
            let (algo, bits) = if height % 2 == 1 {
                (AlgoTag::Scrypt, scrypt_bits)
            } else {
                (AlgoTag::Sha256, 0x1d00ffff)
            };
            chain
                .push(BlockIndexEntry::new(
                    height,
                    BASE_TIME + height as i64 * 600,
                    bits,
                    algo,
                ))
                .unwrap();
        }
        chain
    }

    fn short_interval() -> ConsensusParams {
        let mut params = ConsensusParams::main();
        params.scrypt.retarget_interval = 6;
        params.scrypt.target_spacing = 600;
        params
    }

    #[test]
    fn test_reference_retarget() {
        let params = bitcoin_like();
        let old = compact::decode(0x1d00ffff).unwrap();
        let new = calculate_next_work(old, 1262152739 - 1261130161, &params, AlgoTag::Sha256);
        assert_eq!(compact::encode(new), 0x1d00d86a);
    }

    #[test]
    fn test_reference_pow_limit() {
        let params = bitcoin_like();
        let old = compact::decode(0x1d00ffff).unwrap();
        let new = calculate_next_work(old, 1233061996 - 1231006505, &params, AlgoTag::Sha256);
        assert_eq!(compact::encode(new), 0x1d00ffff);
        assert_eq!(new, params.sha256.pow_limit);
    }

    #[test]
    fn test_reference_lower_limit() {
        let params = bitcoin_like();
        let old = compact::decode(0x1c05a3f4).unwrap();
        let new = calculate_next_work(old, 1279297671 - 1279008237, &params, AlgoTag::Sha256);
        assert_eq!(compact::encode(new), 0x1c0168fd);
    }

    #[test]
    fn test_reference_upper_limit() {
        let params = bitcoin_like();
        let old = compact::decode(0x1c387f6f).unwrap();
        let new = calculate_next_work(old, 1269211443 - 1263163443, &params, AlgoTag::Sha256);
        assert_eq!(compact::encode(new), 0x1d00e1fd);
    }

    #[test]
    fn test_exact_timespan_keeps_target() {
        let params = ConsensusParams::main();
        let old = compact::decode(0x1b0404cb).unwrap();
        for algo in AlgoTag::POW {
            let timespan = params.algo(algo).target_timespan();
            assert_eq!(calculate_next_work(old, timespan, &params, algo), old);
        }
    }

    #[test]
    fn test_adjustment_is_clamped() {
        let params = ConsensusParams::main();
        let old = compact::decode(0x1b0404cb).unwrap();
        let timespan = params.sha256.target_timespan();

        let slow = calculate_next_work(old, timespan * 100, &params, AlgoTag::Sha256);
        assert_eq!(slow, old * Target::from(4u64));

        let fast = calculate_next_work(old, timespan / 100, &params, AlgoTag::Sha256);
        assert_eq!(fast, old / Target::from(4u64));

        // negative spans are clamped like any short span
        let backwards = calculate_next_work(old, -timespan, &params, AlgoTag::Sha256);
        assert_eq!(backwards, old / Target::from(4u64));
    }

    #[test]
    fn test_result_never_zero() {
        let params = ConsensusParams::main();
        let new = calculate_next_work(Target::one(), 1, &params, AlgoTag::Groestl);
        assert_eq!(new, Target::one());
    }

    #[test]
    fn test_flat_between_boundaries() {
        let params = short_interval();
        let chain = interleaved_chain(15, 0x1c0ffff0);

        for height in 1..15u32 {
            let last = chain.entry(height).unwrap();
            if (height + 1) % 6 == 0 {
                continue;
            }
            let expected = chain.last_block_of_algo(last, AlgoTag::Scrypt).unwrap().bits;
            assert_eq!(
                get_next_work_required_scrypt(&chain, last, &params).unwrap(),
                expected
            );
            assert_eq!(
                get_next_work_required_sha256(&chain, last, &params).unwrap(),
                0x1d00ffff
            );
        }
    }

    #[test]
    fn test_retarget_at_boundary() {
        let params = short_interval();
        let chain = interleaved_chain(17, 0x1c0ffff0);
        let tip = chain.tip();

        // scrypt blocks 5..=17 are 1200s apart: double the expected 3600s
        let expected = compact::encode(compact::decode(0x1c0ffff0).unwrap() * Target::from(2u64));
        let header = CandidateHeader::new(tip.timestamp + 600, expected, AlgoTag::Scrypt);

        assert_eq!(get_next_work_required(&chain, tip, &header, &params).unwrap(), expected);
        assert_eq!(AlgoDifficulter(AlgoTag::Scrypt).next_bits(&chain, tip, &params).unwrap(), expected);

        let required = next_work_for_algo(&chain, tip, AlgoTag::Scrypt, Some(header.time), &params).unwrap();
        assert!(!required.history_fallback);
    }

    #[test]
    fn test_short_history_uses_pow_limit() {
        let params = short_interval();
        // only three scrypt blocks exist when the first boundary arrives
        let chain = interleaved_chain(5, 0x1c0ffff0);
        assert_eq!(
            get_next_work_required_scrypt(&chain, chain.tip(), &params).unwrap(),
            params.scrypt.pow_limit_bits()
        );

        let required = next_work_for_algo(&chain, chain.tip(), AlgoTag::Scrypt, None, &params).unwrap();
        assert!(required.history_fallback);
    }

    #[test]
    fn test_first_block_of_algo_uses_pow_limit() {
        let params = ConsensusParams::main();
        let chain = interleaved_chain(4, 0x1c0ffff0);
        assert_eq!(
            get_next_work_required_groestl(&chain, chain.tip(), &params).unwrap(),
            params.groestl.pow_limit_bits()
        );
    }

    #[test]
    fn test_unknown_algorithm() {
        let params = ConsensusParams::main();
        let chain = interleaved_chain(4, 0x1c0ffff0);
        let header = CandidateHeader {
            time: BASE_TIME,
            bits: 0x1d00ffff,
            algo: 9,
        };
        assert_eq!(
            get_next_work_required(&chain, chain.tip(), &header, &params),
            Err(PowError::UnknownAlgorithm(9))
        );
    }

    #[test]
    fn test_no_retargeting_keeps_bits() {
        let mut params = short_interval();
        params.no_retargeting = true;
        let chain = interleaved_chain(17, 0x1c0ffff0);
        assert_eq!(
            get_next_work_required_scrypt(&chain, chain.tip(), &params).unwrap(),
            0x1c0ffff0
        );
    }

    #[test]
    fn test_min_difficulty_rule() {
        let mut params = short_interval();
        params.allow_min_difficulty_blocks = true;
        let limit_bits = params.scrypt.pow_limit_bits();

        let mut chain = interleaved_chain(13, 0x1c0ffff0);
        let tip_time = chain.tip().timestamp;

        // late block: the easiest target is allowed
        let late = CandidateHeader::new(tip_time + 2 * 600 + 1, 0, AlgoTag::Scrypt);
        assert_eq!(
            get_next_work_required(&chain, chain.tip(), &late, &params).unwrap(),
            limit_bits
        );

        // after a min-difficulty block, a prompt block goes back to the real target
        chain
            .push(BlockIndexEntry::new(14, tip_time + 600, 0x1d00ffff, AlgoTag::Sha256))
            .unwrap();
        chain
            .push(BlockIndexEntry::new(15, tip_time + 1801, limit_bits, AlgoTag::Scrypt))
            .unwrap();
        let prompt = CandidateHeader::new(tip_time + 1900, 0, AlgoTag::Scrypt);
        assert_eq!(
            get_next_work_required(&chain, chain.tip(), &prompt, &params).unwrap(),
            0x1c0ffff0
        );

        // the per-algorithm wrappers never apply the rule
        assert_eq!(
            get_next_work_required_scrypt(&chain, chain.tip(), &params).unwrap(),
            limit_bits
        );
    }
}
