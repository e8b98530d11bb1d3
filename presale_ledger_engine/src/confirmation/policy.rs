use std::env;

use plg_common::parse_boolean_flag;

use crate::db_types::ChainNetwork;

const DEFAULT_REQUIRED_CONFIRMATIONS: u64 = 3;
/// 5% tolerance for network fees and slippage.
const DEFAULT_VARIANCE_BPS: u32 = 500;

/// One stablecoin variant accepted on a network: the symbols the provider reports it under, the
/// token contract that must emit the Transfer event, and the token's on-chain decimals.
#[derive(Debug, Clone)]
pub struct AcceptedCurrency {
    pub network: ChainNetwork,
    pub symbols: Vec<String>,
    pub contract: String,
    pub decimals: u8,
}

impl AcceptedCurrency {
    fn matches(&self, network: ChainNetwork, pay_currency: &str) -> bool {
        let normalized = pay_currency.trim().to_ascii_lowercase();
        self.network == network && self.symbols.iter().any(|s| s == &normalized)
    }
}

/// Policy for the confirmation gate. Defaults carry the mainnet USDT deployments; the receiving
/// address has no sane default and must come from configuration.
#[derive(Debug, Clone)]
pub struct GatePolicy {
    pub required_confirmations: u64,
    pub variance_bps: u32,
    /// The address incoming on-chain payments must be made out to.
    pub receiving_address: String,
    /// Whether a provider-reported `partially_paid` settles the order, provided it is within
    /// variance.
    pub allow_partially_paid: bool,
    pub accepted: Vec<AcceptedCurrency>,
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self {
            required_confirmations: DEFAULT_REQUIRED_CONFIRMATIONS,
            variance_bps: DEFAULT_VARIANCE_BPS,
            receiving_address: String::default(),
            allow_partially_paid: true,
            accepted: vec![
                AcceptedCurrency {
                    network: ChainNetwork::Ethereum,
                    symbols: vec!["usdt".into(), "usdterc20".into(), "usdt-erc20".into()],
                    contract: "0xdac17f958d2ee523a2206206994597c13d831ec7".into(),
                    decimals: 6,
                },
                AcceptedCurrency {
                    network: ChainNetwork::Bsc,
                    symbols: vec!["usdt".into(), "usdtbsc".into(), "usdt-bep20".into(), "usdtbep20".into()],
                    contract: "0x55d398326f99059ff775485246999027b3197955".into(),
                    decimals: 18,
                },
                AcceptedCurrency {
                    network: ChainNetwork::Polygon,
                    symbols: vec!["usdt".into(), "usdtmatic".into(), "usdt-polygon".into()],
                    contract: "0xc2132d05d31c914a87c6611c10748aeb04b58e8f".into(),
                    decimals: 6,
                },
            ],
        }
    }
}

impl GatePolicy {
    /// Builds the policy from the environment, falling back to defaults field by field.
    ///
    /// * `PLG_RECEIVING_ADDRESS` — the payment destination address.
    /// * `PLG_REQUIRED_CONFIRMATIONS` — confirmation depth before an on-chain payment is final.
    /// * `PLG_AMOUNT_VARIANCE_BPS` — accepted deviation between expected and paid amounts.
    /// * `PLG_ALLOW_PARTIALLY_PAID` — boolean flag.
    pub fn from_env() -> Self {
        let mut policy = Self::default();
        if let Ok(address) = env::var("PLG_RECEIVING_ADDRESS") {
            policy.receiving_address = address;
        }
        if let Some(n) = env::var("PLG_REQUIRED_CONFIRMATIONS").ok().and_then(|v| v.trim().parse().ok()) {
            policy.required_confirmations = n;
        }
        if let Some(bps) = env::var("PLG_AMOUNT_VARIANCE_BPS").ok().and_then(|v| v.trim().parse().ok()) {
            policy.variance_bps = bps;
        }
        policy.allow_partially_paid =
            parse_boolean_flag(env::var("PLG_ALLOW_PARTIALLY_PAID").ok(), policy.allow_partially_paid);
        policy
    }

    /// The accepted currency entry matching a signal's network and (normalized) paid-currency
    /// token, if any.
    pub fn currency_for(&self, network: ChainNetwork, pay_currency: &str) -> Option<&AcceptedCurrency> {
        self.accepted.iter().find(|c| c.matches(network, pay_currency))
    }

    /// The token contract whose Transfer events settle payments on `network`.
    pub fn contract_for(&self, network: ChainNetwork) -> Option<&str> {
        self.accepted.iter().find(|c| c.network == network).map(|c| c.contract.as_str())
    }
}
