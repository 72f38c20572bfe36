use crate::error::Error;
use core::{fmt, str::FromStr};

/// The Bitcoin networks a wallet session may be pointed at.
///
/// Fractal networks share the mainnet address format, which is why both map
/// to [`bitcoin::Network::Bitcoin`] for address checks.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    serde::Deserialize,
    serde::Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum NetworkId {
    #[default]
    Mainnet,
    Testnet,
    Testnet4,
    Signet,
    FractalMainnet,
    FractalTestnet,
}

impl NetworkId {
    pub const ALL: [NetworkId; 6] = [
        NetworkId::Mainnet,
        NetworkId::Testnet,
        NetworkId::Testnet4,
        NetworkId::Signet,
        NetworkId::FractalMainnet,
        NetworkId::FractalTestnet,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkId::Mainnet => "mainnet",
            NetworkId::Testnet => "testnet",
            NetworkId::Testnet4 => "testnet4",
            NetworkId::Signet => "signet",
            NetworkId::FractalMainnet => "fractal_mainnet",
            NetworkId::FractalTestnet => "fractal_testnet",
        }
    }

    /// the network used to check the address prefixes
    pub fn address_network(&self) -> bitcoin::Network {
        match self {
            NetworkId::Mainnet | NetworkId::FractalMainnet | NetworkId::FractalTestnet => {
                bitcoin::Network::Bitcoin
            }
            NetworkId::Testnet | NetworkId::Testnet4 => bitcoin::Network::Testnet,
            NetworkId::Signet => bitcoin::Network::Signet,
        }
    }

    /// check `address` is a Bitcoin address usable on this network
    pub fn validate_address(&self, address: &str) -> Result<(), Error> {
        let unchecked = address
            .parse::<bitcoin::Address<bitcoin::address::NetworkUnchecked>>()
            .map_err(|error| Error::InvalidArgument(format!("Invalid address `{address}': {error}")))?;

        if unchecked.is_valid_for_network(self.address_network()) {
            Ok(())
        } else {
            Err(Error::InvalidArgument(format!(
                "Address `{address}' does not belong to the {self} network"
            )))
        }
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NetworkId::ALL
            .into_iter()
            .find(|network| network.as_str() == s)
            .ok_or_else(|| Error::UnsupportedNetwork(s.to_owned()))
    }
}
