//! ERC-20 Transfer event scanning.
//!
//! The transfer-target check reads the paid amount out of the receipt's event data, never from a
//! user-supplied claim: only `Transfer` events emitted by the accepted token contract, whose
//! destination is the configured receiving address, count towards the payment.

use log::trace;
use plg_common::MicroUsdt;

use crate::signal_types::ChainReceipt;

/// `keccak256("Transfer(address,address,uint256)")`, the topic0 of every ERC-20 Transfer event.
pub const TRANSFER_EVENT_TOPIC: &str = "ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";

fn normalize_hex(s: &str) -> String {
    s.trim().trim_start_matches("0x").to_ascii_lowercase()
}

/// An address packed into a 32-byte topic word occupies the final 20 bytes.
fn topic_address(topic: &str) -> Option<String> {
    let bare = normalize_hex(topic);
    if bare.len() < 40 {
        return None;
    }
    Some(bare[bare.len() - 40..].to_string())
}

/// Decodes a single 32-byte ABI word as an unsigned amount. Values beyond `u128::MAX` do not occur
/// for any real token supply and are treated as undecodable.
fn decode_uint(data: &str) -> Option<u128> {
    let bare = normalize_hex(data);
    if bare.is_empty() || bare.len() > 64 || bare.len() % 2 != 0 {
        return None;
    }
    let bytes = hex::decode(&bare).ok()?;
    let mut value: u128 = 0;
    for b in bytes {
        value = value.checked_mul(256)?;
        value = value.checked_add(b as u128)?;
    }
    Some(value)
}

/// Sums the raw values of all Transfer events in `receipt` that were emitted by `token_contract`
/// and pay `recipient`. Returns `None` when no qualifying transfer exists.
pub fn scan_transfer_to(receipt: &ChainReceipt, token_contract: &str, recipient: &str) -> Option<u128> {
    let contract = normalize_hex(token_contract);
    let to = normalize_hex(recipient);
    let mut total: Option<u128> = None;
    for log in &receipt.logs {
        if normalize_hex(&log.address) != contract {
            continue;
        }
        if log.topics.len() < 3 || normalize_hex(&log.topics[0]) != TRANSFER_EVENT_TOPIC {
            continue;
        }
        let Some(dest) = topic_address(&log.topics[2]) else { continue };
        if dest != to {
            continue;
        }
        let Some(value) = decode_uint(&log.data) else { continue };
        trace!("⛓️ Transfer of {value} raw units to receiving address in {}", receipt.tx_hash);
        total = Some(total.unwrap_or(0).saturating_add(value));
    }
    total
}

/// Converts a raw on-chain token amount to microUSDT, rescaling from the token's decimals to 6.
/// Saturates at `i64::MAX` micro-units.
pub fn raw_units_to_micro_usdt(raw: u128, decimals: u8) -> MicroUsdt {
    let micro = if decimals >= 6 {
        raw / 10u128.pow(decimals as u32 - 6)
    } else {
        raw.saturating_mul(10u128.pow(6 - decimals as u32))
    };
    MicroUsdt::from(micro.min(i64::MAX as u128) as i64)
}
