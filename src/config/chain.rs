use alloy::primitives::{address, Address, B256, U256};

/// One mintable / swappable test token. The faucet contract and the ERC-20
/// contract share one address on Galileo.
#[derive(Debug, Clone, Copy)]
pub struct TokenInfo {
    pub symbol: &'static str,
    pub address: Address,
}

#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub name: &'static str,
    pub native_symbol: &'static str,
    pub rpc_url: String,
    pub explorer_url: &'static str,
    pub tokens: [TokenInfo; 3],
    pub stable_symbol: &'static str,
    pub swap_router: Address,
    pub content_registry: Address,
    /// Minimum native balance required before any gas-spending action.
    pub gas_floor_wei: U256,
}

impl ChainConfig {
    pub fn galileo() -> Self {
        let rpc_url = std::env::var("GALILEO_RPC_URL")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "https://evmrpc-testnet.0g.ai".to_string());
        Self {
            chain_id: 16601,
            name: "0G-Galileo-Testnet",
            native_symbol: "OG",
            rpc_url,
            explorer_url: "https://chainscan-galileo.0g.ai",
            tokens: [
                TokenInfo {
                    symbol: "USDT",
                    address: address!("3eC8A8705bE1D5ca90066b37ba62c4183B024ebf"),
                },
                TokenInfo {
                    symbol: "ETH",
                    address: address!("0fE9B43625fA7EdD663aDcEC0728DD635e4AbF7c"),
                },
                TokenInfo {
                    symbol: "BTC",
                    address: address!("36f6414FF1df609214dDAbA71c84f18bcf00F67d"),
                },
            ],
            stable_symbol: "USDT",
            swap_router: address!("D86b764618c6E3C078845BE3c3fCe50CE9535Da7"),
            content_registry: address!("5f1D96895e442FC0168FA2F9fb1EBeF93Cb5035e"),
            // 0.00001 OG
            gas_floor_wei: U256::from(10_000_000_000_000u64),
        }
    }

    pub fn token_address(&self, symbol: &str) -> Option<Address> {
        self.tokens
            .iter()
            .find(|token| token.symbol == symbol)
            .map(|token| token.address)
    }

    pub fn tx_url(&self, tx_hash: B256) -> String {
        format!("{}/tx/{:#x}", self.explorer_url, tx_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::ChainConfig;

    #[test]
    fn test_galileo_token_lookup() {
        let chain = ChainConfig::galileo();
        assert_eq!(chain.chain_id, 16601);
        assert!(chain.token_address("USDT").is_some());
        assert!(chain.token_address("ETH").is_some());
        assert!(chain.token_address("BTC").is_some());
        assert!(chain.token_address("DOGE").is_none());
        assert_eq!(chain.stable_symbol, "USDT");
    }
}
