//! Consensus parameters.
//!
//! A `ConsensusParams` value is built once per process (from a preset or a
//! JSON file) and passed by reference into every difficulty and validation
//! call. Nothing in the crate reads parameters from global state.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::str::FromStr;

use crate::algo::AlgoTag;
use crate::compact::{self, Target};
use crate::error::ParamsError;

// in seconds
pub const TARGET_SPACING: i64 = 150;
pub const POW_TARGET_SPACING: i64 = 3 * TARGET_SPACING;
pub const STAKE_TARGET_SPACING: i64 = 10 * TARGET_SPACING;

pub const RETARGET_INTERVAL: u32 = 2016;
pub const MAX_ADJUSTMENT_FACTOR: u32 = 4;
pub const STAKE_MAX_STEP_DIVISOR: i64 = 4;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Main,
    Test,
    Regtest,
}

impl FromStr for Network {
    type Err = ParamsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "main" | "mainnet" => Ok(Network::Main),
            "test" | "testnet" => Ok(Network::Test),
            "regtest" => Ok(Network::Regtest),
            other => Err(ParamsError::UnknownNetwork(other.to_string())),
        }
    }
}

/// Retarget settings of a single algorithm.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AlgoParams {
    /// easiest allowed target
    #[serde(with = "compact::serde_hex")]
    pub pow_limit: Target,
    /// expected seconds between two blocks of this algorithm
    pub target_spacing: i64,
    /// blocks between two retargets; the stake target ignores it
    pub retarget_interval: u32,
}

impl AlgoParams {
    pub fn target_timespan(&self) -> i64 {
        self.target_spacing * self.retarget_interval as i64
    }

    pub fn pow_limit_bits(&self) -> u32 {
        compact::encode(self.pow_limit)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ConsensusParams {
    pub network: Network,
    pub sha256: AlgoParams,
    pub scrypt: AlgoParams,
    pub groestl: AlgoParams,
    pub stake: AlgoParams,
    /// a retarget moves the target by at most this factor either way
    pub max_adjustment_factor: u32,
    /// the stake target moves by at most `1 / stake_max_step_divisor` per block
    pub stake_max_step_divisor: i64,
    pub allow_min_difficulty_blocks: bool,
    pub no_retargeting: bool,
}

impl ConsensusParams {
    pub fn main() -> Self {
        Self {
            network: Network::Main,
            sha256: AlgoParams {
                pow_limit: limit("00000000ffffffffffffffffffffffffffffffffffffffffffffffffffffffff"),
                target_spacing: POW_TARGET_SPACING,
                retarget_interval: RETARGET_INTERVAL,
            },
            scrypt: AlgoParams {
                pow_limit: limit("00000fffffffffffffffffffffffffffffffffffffffffffffffffffffffffff"),
                target_spacing: POW_TARGET_SPACING,
                retarget_interval: RETARGET_INTERVAL,
            },
            groestl: AlgoParams {
                pow_limit: limit("00000fffffffffffffffffffffffffffffffffffffffffffffffffffffffffff"),
                target_spacing: POW_TARGET_SPACING,
                retarget_interval: RETARGET_INTERVAL,
            },
            stake: AlgoParams {
                pow_limit: limit("00000fffffffffffffffffffffffffffffffffffffffffffffffffffffffffff"),
                target_spacing: STAKE_TARGET_SPACING,
                retarget_interval: 1,
            },
            max_adjustment_factor: MAX_ADJUSTMENT_FACTOR,
            stake_max_step_divisor: STAKE_MAX_STEP_DIVISOR,
            allow_min_difficulty_blocks: false,
            no_retargeting: false,
        }
    }

    pub fn testnet() -> Self {
        Self {
            network: Network::Test,
            allow_min_difficulty_blocks: true,
            ..Self::main()
        }
    }

    pub fn regtest() -> Self {
        let easiest = AlgoParams {
            pow_limit: limit("7fffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff"),
            target_spacing: POW_TARGET_SPACING,
            retarget_interval: 150,
        };

        Self {
            network: Network::Regtest,
            sha256: easiest.clone(),
            scrypt: easiest.clone(),
            groestl: easiest.clone(),
            stake: AlgoParams {
                target_spacing: STAKE_TARGET_SPACING,
                retarget_interval: 1,
                ..easiest
            },
            max_adjustment_factor: MAX_ADJUSTMENT_FACTOR,
            stake_max_step_divisor: STAKE_MAX_STEP_DIVISOR,
            allow_min_difficulty_blocks: true,
            no_retargeting: true,
        }
    }

    pub fn for_network(network: Network) -> Self {
        match network {
            Network::Main => Self::main(),
            Network::Test => Self::testnet(),
            Network::Regtest => Self::regtest(),
        }
    }

    /// load parameters from a JSON file and check them
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ParamsError> {
        let reader = BufReader::new(File::open(path)?);
        let params: ConsensusParams = serde_json::from_reader(reader)?;
        params.validate()?;
        Ok(params)
    }

    pub fn algo(&self, algo: AlgoTag) -> &AlgoParams {
        match algo {
            AlgoTag::Sha256 => &self.sha256,
            AlgoTag::Scrypt => &self.scrypt,
            AlgoTag::Groestl => &self.groestl,
            AlgoTag::Stake => &self.stake,
        }
    }

    pub fn pow_limit(&self, algo: AlgoTag) -> Target {
        self.algo(algo).pow_limit
    }

    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.max_adjustment_factor == 0 {
            return Err(ParamsError::Invalid(
                "max_adjustment_factor must be positive".into(),
            ));
        }
        for algo in AlgoTag::ALL {
            let p = self.algo(algo);
            if p.pow_limit.is_zero() {
                return Err(ParamsError::Invalid(format!("{} pow_limit is zero", algo)));
            }
            if p.target_spacing <= 0 {
                return Err(ParamsError::Invalid(format!(
                    "{} target_spacing must be positive",
                    algo
                )));
            }
            if p.retarget_interval == 0 {
                return Err(ParamsError::Invalid(format!(
                    "{} retarget_interval must be positive",
                    algo
                )));
            }
            // bound the widest timespan a retarget or the min-difficulty rule computes
            let widest = p
                .target_spacing
                .checked_mul(i64::from(p.retarget_interval))
                .and_then(|timespan| timespan.checked_mul(i64::from(self.max_adjustment_factor)))
                .and(p.target_spacing.checked_mul(2));
            if widest.is_none() {
                return Err(ParamsError::Invalid(format!(
                    "{} target timespan overflows",
                    algo
                )));
            }
        }
        if self.stake_max_step_divisor <= 0 {
            return Err(ParamsError::Invalid(
                "stake_max_step_divisor must be positive".into(),
            ));
        }
        Ok(())
    }
}

fn limit(hex: &str) -> Target {
    compact::target_from_hex(hex).unwrap_or_else(|_| Target::max_value())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        for network in [Network::Main, Network::Test, Network::Regtest] {
            let params = ConsensusParams::for_network(network);
            assert_eq!(params.network, network);
            params.validate().unwrap();
        }
    }

    #[test]
    fn test_preset_flags() {
        assert!(!ConsensusParams::main().allow_min_difficulty_blocks);
        assert!(ConsensusParams::testnet().allow_min_difficulty_blocks);
        assert!(!ConsensusParams::testnet().no_retargeting);
        assert!(ConsensusParams::regtest().no_retargeting);
    }

    #[test]
    fn test_pow_limit_bits() {
        let params = ConsensusParams::main();
        assert_eq!(params.sha256.pow_limit_bits(), 0x1d00ffff);
        assert_eq!(params.scrypt.pow_limit_bits(), 0x1e0fffff);
        assert_eq!(ConsensusParams::regtest().sha256.pow_limit_bits(), 0x207fffff);
        assert_eq!(params.sha256.target_timespan(), 2016 * 450);
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut params = ConsensusParams::main();
        params.groestl.retarget_interval = 0;
        assert!(matches!(params.validate(), Err(ParamsError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_overflowing_timespan() {
        let mut params = ConsensusParams::main();
        params.scrypt.target_spacing = i64::MAX / 1000;
        assert!(matches!(params.validate(), Err(ParamsError::Invalid(_))));

        // the timespan fits but scaling it by the factor does not
        let mut params = ConsensusParams::main();
        params.sha256.target_spacing = i64::MAX / 4032;
        assert!(params.sha256.target_spacing.checked_mul(2016).is_some());
        assert!(matches!(params.validate(), Err(ParamsError::Invalid(_))));

        let mut params = ConsensusParams::main();
        params.stake.target_spacing = i64::MAX;
        assert!(matches!(params.validate(), Err(ParamsError::Invalid(_))));
    }

    #[test]
    fn test_json_round_trip() {
        let params = ConsensusParams::testnet();
        let json = serde_json::to_string(&params).unwrap();
        assert!(json.contains("\"00000000ffffffff"));
        let back: ConsensusParams = serde_json::from_str(&json).unwrap();
        assert_eq!(back, params);
    }

    #[test]
    fn test_network_names() {
        assert_eq!("main".parse::<Network>().unwrap(), Network::Main);
        assert_eq!("testnet".parse::<Network>().unwrap(), Network::Test);
        assert!("signet".parse::<Network>().is_err());
    }
}
