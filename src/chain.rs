//! Destination chains
//!
//! Chains are identified by CAIP-2 style strings (`eip155:1`, `near:mainnet`, ...).
//! Anything not in the known list is kept verbatim in [`Chain::Other`] so that
//! adapters for new chains work without a crate release; such chains get the
//! conservative default completion timing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Chain {
    Near,
    Ethereum,
    Base,
    Arbitrum,
    Optimism,
    Polygon,
    Bsc,
    Avalanche,
    Gnosis,
    Berachain,
    Monad,
    Bitcoin,
    Litecoin,
    Dogecoin,
    Zcash,
    Solana,
    Ton,
    Tron,
    Xrp,
    Stellar,
    Sui,
    Aptos,
    Cardano,
    Other(String),
}

const KNOWN_CHAINS: &[(Chain, &str)] = &[
    (Chain::Near, "near:mainnet"),
    (Chain::Ethereum, "eip155:1"),
    (Chain::Base, "eip155:8453"),
    (Chain::Arbitrum, "eip155:42161"),
    (Chain::Optimism, "eip155:10"),
    (Chain::Polygon, "eip155:137"),
    (Chain::Bsc, "eip155:56"),
    (Chain::Avalanche, "eip155:43114"),
    (Chain::Gnosis, "eip155:100"),
    (Chain::Berachain, "eip155:80094"),
    (Chain::Monad, "eip155:143"),
    (Chain::Bitcoin, "bip122:000000000019d6689c085ae165831e93"),
    (Chain::Litecoin, "bip122:12a765e31ffd4059bada1e25190f6e98"),
    (Chain::Dogecoin, "bip122:1a91e3dace36e2be3bf030a65679fe82"),
    (Chain::Zcash, "zcash:mainnet"),
    (Chain::Solana, "solana:mainnet"),
    (Chain::Ton, "tvm:-239"),
    (Chain::Tron, "tron:27Lqcw"),
    (Chain::Xrp, "xrpl:0"),
    (Chain::Stellar, "stellar:pubnet"),
    (Chain::Sui, "sui:mainnet"),
    (Chain::Aptos, "aptos:mainnet"),
    (Chain::Cardano, "cip34:1-764824073"),
];

impl Chain {
    /// CAIP-2 style identifier.
    pub fn caip2(&self) -> &str {
        match self {
            Chain::Other(id) => id,
            known => KNOWN_CHAINS
                .iter()
                .find(|(chain, _)| chain == known)
                .map(|(_, id)| *id)
                .unwrap_or("unknown"),
        }
    }

    pub fn is_evm(&self) -> bool {
        self.caip2().starts_with("eip155:")
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.caip2())
    }
}

impl FromStr for Chain {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(KNOWN_CHAINS
            .iter()
            .find(|(_, id)| *id == s)
            .map(|(chain, _)| chain.clone())
            .unwrap_or_else(|| Chain::Other(s.to_string())))
    }
}

impl Serialize for Chain {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.caip2())
    }
}

impl<'de> Deserialize<'de> for Chain {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        // FromStr is infallible
        Ok(s.parse().unwrap_or(Chain::Other(s)))
    }
}
