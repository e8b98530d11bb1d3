/// EVM transaction hashes: 32 bytes of hex, with or without the `0x` prefix.
pub fn is_valid_tx_hash(s: &str) -> bool {
    let hash = regex::Regex::new(r"^(0x)?[0-9a-fA-F]{64}$").unwrap();
    hash.is_match(s.trim())
}

/// Normalizes a transaction hash to lowercase with a `0x` prefix, or `None` if it is not a valid
/// hash. Dedup by hash only works if every intake path stores the same form.
pub fn normalize_tx_hash(s: &str) -> Option<String> {
    if !is_valid_tx_hash(s) {
        return None;
    }
    let bare = s.trim().trim_start_matches("0x").to_ascii_lowercase();
    Some(format!("0x{bare}"))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hash_validation() {
        let valid = "0x".to_string() + &"ab".repeat(32);
        assert!(is_valid_tx_hash(&valid));
        assert!(is_valid_tx_hash(&"CD".repeat(32)));
        assert!(!is_valid_tx_hash("0x1234"));
        assert!(!is_valid_tx_hash(&("0x".to_string() + &"zz".repeat(32))));
    }

    #[test]
    fn normalization_is_canonical() {
        let mixed = "0xAbCd".to_string() + &"12".repeat(30);
        let normalized = normalize_tx_hash(&mixed).unwrap();
        assert!(normalized.starts_with("0xabcd"));
        assert_eq!(normalize_tx_hash(&"12".repeat(32)).unwrap(), format!("0x{}", "12".repeat(32)));
        assert_eq!(normalize_tx_hash("not-a-hash"), None);
    }
}
