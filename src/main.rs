use anyhow::Context;
use log::info;
use serde::{Deserialize, Serialize};
use std::env;

use hybrid_pow::{
    compact, get_next_stake_target, select_next_algo, AlgoTag, BlockIndexEntry, ChainIndex,
    ConsensusParams, Difficulter, Network,
};
use hybrid_pow::difficulter::AlgoDifficulter;

#[derive(Deserialize, Debug, Serialize, Clone)]
struct Config {
    network: String,
    params_file: Option<String>,
    chain_file: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            network: env::var("NETWORK").unwrap_or_else(|_| "main".into()),
            params_file: env::var("PARAMS_FILE").ok(),
            chain_file: env::var("CHAIN_FILE").ok(),
        }
    }

    fn params(&self) -> anyhow::Result<ConsensusParams> {
        let params = match &self.params_file {
            Some(path) => ConsensusParams::from_file(path)
                .with_context(|| format!("loading params from {}", path))?,
            None => ConsensusParams::for_network(self.network.parse::<Network>()?),
        };
        params.validate()?;
        Ok(params)
    }

    fn chain(&self, params: &ConsensusParams) -> anyhow::Result<ChainIndex> {
        match &self.chain_file {
            Some(path) => {
                ChainIndex::from_file(path).with_context(|| format!("loading chain from {}", path))
            }
            None => Ok(ChainIndex::new(BlockIndexEntry::new(
                0,
                0,
                params.sha256.pow_limit_bits(),
                AlgoTag::Sha256,
            ))),
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config = Config::from_env();

    let params = config.params()?;
    let chain = config.chain(&params)?;
    let tip = chain.tip();

    info!(
        "network: {:?} tip height: {} tip algo: {}",
        params.network, tip.height, tip.algo
    );
    println!("next algo: {}", select_next_algo(tip.height + 1));

    for algo in AlgoTag::POW {
        let bits = AlgoDifficulter(algo).next_bits(&chain, tip, &params)?;
        let target = compact::decode(bits)?;
        println!(
            "{:<8} {:#010x} {}",
            algo.name(),
            bits,
            compact::target_to_hex(&target)
        );
    }

    let stake_bits = get_next_stake_target(&chain, tip, &params)?;
    println!(
        "{:<8} {:#010x} {}",
        AlgoTag::Stake.name(),
        stake_bits,
        compact::target_to_hex(&compact::decode(stake_bits)?)
    );

    Ok(())
}
