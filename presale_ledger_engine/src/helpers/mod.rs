mod receipt_scan;
mod tx_hash;

pub use receipt_scan::{raw_units_to_micro_usdt, scan_transfer_to, TRANSFER_EVENT_TOPIC};
pub use tx_hash::{is_valid_tx_hash, normalize_tx_hash};
