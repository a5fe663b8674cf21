//! Built-in public RPC endpoints per chain
//!
//! Priority: 10 = preferred, 1 = last resort. Lists are ordered by priority.

use crate::config::{Chain, EndpointConfig};

/// Get default endpoints for a chain
pub fn default_endpoints(chain: Chain) -> Vec<EndpointConfig> {
    match chain {
        Chain::Ethereum => ethereum_endpoints(),
        Chain::Polygon => polygon_endpoints(),
        Chain::Arbitrum => arbitrum_endpoints(),
        Chain::Optimism => optimism_endpoints(),
        Chain::Base => base_endpoints(),
        Chain::Bsc => bsc_endpoints(),
        Chain::Avalanche => avalanche_endpoints(),
        Chain::Custom(_) => Vec::new(), // Custom chains need user-provided endpoints
    }
}

fn endpoint(url: &str, priority: u8) -> EndpointConfig {
    EndpointConfig::new(url).with_priority(priority)
}

fn ethereum_endpoints() -> Vec<EndpointConfig> {
    vec![
        endpoint("https://eth-mainnet.public.blastapi.io", 10),
        endpoint("https://mainnet.gateway.tenderly.co", 9),
        endpoint("https://rpc.flashbots.net", 8),
        endpoint("https://rpc.mevblocker.io", 7),
        endpoint("https://ethereum.publicnode.com", 6)
            .with_note("Good fallback, generous rate limits"),
        endpoint("https://eth.drpc.org", 5),
        endpoint("https://ethereum.rpc.thirdweb.com", 3),
        endpoint("https://eth.api.pocket.network", 2),
    ]
}

fn polygon_endpoints() -> Vec<EndpointConfig> {
    vec![
        endpoint("https://polygon-mainnet.public.blastapi.io", 10),
        endpoint("https://polygon-rpc.com", 8),
        endpoint("https://polygon.publicnode.com", 5),
        endpoint("https://polygon.drpc.org", 4),
    ]
}

fn arbitrum_endpoints() -> Vec<EndpointConfig> {
    vec![
        endpoint("https://arb1.arbitrum.io/rpc", 10).with_note("Official Arbitrum RPC"),
        endpoint("https://arbitrum-mainnet.public.blastapi.io", 8),
        endpoint("https://arbitrum.publicnode.com", 5),
        endpoint("https://arbitrum.drpc.org", 4),
    ]
}

fn optimism_endpoints() -> Vec<EndpointConfig> {
    vec![
        endpoint("https://mainnet.optimism.io", 10).with_note("Official Optimism RPC"),
        endpoint("https://optimism-mainnet.public.blastapi.io", 8),
        endpoint("https://optimism.publicnode.com", 5),
        endpoint("https://optimism.drpc.org", 4),
    ]
}

fn base_endpoints() -> Vec<EndpointConfig> {
    vec![
        endpoint("https://mainnet.base.org", 10).with_note("Official Base RPC"),
        endpoint("https://base-mainnet.public.blastapi.io", 8),
        endpoint("https://base.publicnode.com", 5),
        endpoint("https://base.drpc.org", 4),
    ]
}

fn bsc_endpoints() -> Vec<EndpointConfig> {
    vec![
        endpoint("https://bsc-dataseed.binance.org", 10),
        endpoint("https://bsc-mainnet.public.blastapi.io", 8),
        endpoint("https://bsc.publicnode.com", 5),
        endpoint("https://bsc.drpc.org", 4),
    ]
}

fn avalanche_endpoints() -> Vec<EndpointConfig> {
    vec![
        endpoint("https://api.avax.network/ext/bc/C/rpc", 10).with_note("Official Avalanche RPC"),
        endpoint("https://avalanche-mainnet.public.blastapi.io/ext/bc/C/rpc", 8),
        endpoint("https://avalanche-c-chain.publicnode.com", 5),
        endpoint("https://avalanche.drpc.org", 4),
    ]
}
