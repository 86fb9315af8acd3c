use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use alloy::primitives::Address;
use anyhow::Context as _;
use serde::{Deserialize, Serialize};

/// Raffle deployments per network, keyed by chain id.
///
/// Serialized as the `contractAddresses.json` produced by the deploy
/// scripts: `{"31337": ["0x5FbD..."]}`. Only the first address of each
/// network is the live raffle, older deployments may follow it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkAddresses(BTreeMap<u64, Vec<Address>>);

impl NetworkAddresses {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the address book from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("couldn't open address book {}", path.display()))?;
        let des = &mut serde_json::Deserializer::from_reader(BufReader::new(file));
        serde_path_to_error::deserialize(des)
            .with_context(|| format!("invalid address book {}", path.display()))
    }

    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let des = &mut serde_json::Deserializer::from_str(json);
        Ok(serde_path_to_error::deserialize(des)?)
    }

    /// Registers `address` as the live raffle of `chain_id`, keeping previous
    /// deployments behind it.
    pub fn insert(&mut self, chain_id: u64, address: Address) {
        let deployments = self.0.entry(chain_id).or_default();
        deployments.retain(|it| *it != address);
        deployments.insert(0, address);
    }

    /// The live raffle address of `chain_id`, if any.
    pub fn resolve(&self, chain_id: u64) -> Option<Address> {
        self.0.get(&chain_id).and_then(|it| it.first()).copied()
    }

    pub fn chain_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.0.keys().copied()
    }
}

impl FromIterator<(u64, Address)> for NetworkAddresses {
    fn from_iter<I: IntoIterator<Item = (u64, Address)>>(iter: I) -> Self {
        let mut addresses = Self::new();
        for (chain_id, address) in iter {
            addresses.insert(chain_id, address);
        }
        addresses
    }
}
