use alloy::primitives::utils::{format_ether, parse_ether, UnitsError};
use alloy::primitives::U256;

/// 0.01 ETH, the entrance fee the raffle is deployed with on every known
/// network.
pub const DEFAULT_ENTRANCE_FEE: U256 = U256::from_limbs([10_000_000_000_000_000, 0, 0, 0]);

/// Static per-network parameters the raffle was deployed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkConfig {
    pub chain_id: u64,
    pub name: &'static str,
    pub entrance_fee: U256,
}

pub const NETWORKS: [NetworkConfig; 2] = [
    NetworkConfig {
        chain_id: 5,
        name: "goerli",
        entrance_fee: DEFAULT_ENTRANCE_FEE,
    },
    NetworkConfig {
        chain_id: 31337,
        name: "hardhat",
        entrance_fee: DEFAULT_ENTRANCE_FEE,
    },
];

/// Looks up the static configuration of a network by chain id.
pub fn network_config(chain_id: u64) -> Option<&'static NetworkConfig> {
    NETWORKS.iter().find(|network| network.chain_id == chain_id)
}

/// Human readable network name, falling back to the chain id.
pub fn network_name(chain_id: u64) -> String {
    network_config(chain_id)
        .map(|network| network.name.to_string())
        .unwrap_or_else(|| format!("chain {chain_id}"))
}

/// Formats an amount in `wei` as `ETH` without trailing zeros, keeping at
/// least one fractional digit (`10^16` wei is `0.01`, `10^18` is `1.0`).
pub fn wei_to_eth_string(wei: U256) -> String {
    let formatted = format_ether(wei);
    match formatted.split_once('.') {
        Some((whole, fraction)) => {
            let fraction = fraction.trim_end_matches('0');
            if fraction.is_empty() {
                format!("{whole}.0")
            } else {
                format!("{whole}.{fraction}")
            }
        }
        None => format!("{formatted}.0"),
    }
}

/// Parses a decimal `ETH` amount such as `0.01` into `wei`.
pub fn eth_string_to_wei(eth: &str) -> Result<U256, UnitsError> {
    parse_ether(eth.trim())
}

#[test]
fn test_default_entrance_fee() {
    assert_eq!(
        DEFAULT_ENTRANCE_FEE,
        U256::from(10_000_000_000_000_000u64)
    );
    assert_eq!(eth_string_to_wei("0.01").unwrap(), DEFAULT_ENTRANCE_FEE);
}

#[test]
fn test_eth_formatting() {
    assert_eq!(wei_to_eth_string(DEFAULT_ENTRANCE_FEE), "0.01");
    assert_eq!(wei_to_eth_string(U256::ZERO), "0.0");
    assert_eq!(
        wei_to_eth_string(U256::from(1_500_000_000_000_000_000u64)),
        "1.5"
    );
    assert_eq!(
        wei_to_eth_string(U256::from(2_000_000_000_000_000_000u64)),
        "2.0"
    );
}

#[test]
fn test_network_lookup() {
    assert_eq!(network_name(31337), "hardhat");
    assert_eq!(network_name(1), "chain 1");
    assert_eq!(
        network_config(5).map(|network| network.entrance_fee),
        Some(DEFAULT_ENTRANCE_FEE)
    );
    assert!(network_config(1).is_none());
}
