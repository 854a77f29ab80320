/// Width of a canonical Starknet address: `0x` followed by 64 hex digits
pub const CANONICAL_ADDRESS_LEN: usize = 66;

/// Canonicalize an address to the fixed hex width.
///
/// Nodes drop the leading zero nibble of felts whose top nibble is zero, so an
/// address one digit short gets a `0` inserted after the prefix. Everything
/// else is returned unchanged.
pub fn normalize_address(address: &str) -> String {
    if address.len() == CANONICAL_ADDRESS_LEN - 1 {
        if let Some(digits) = address.strip_prefix("0x") {
            return format!("0x0{}", digits);
        }
    }
    address.to_string()
}

/// Compare two felts (hashes or addresses) by value: case and leading zeros
/// are ignored
pub fn felts_equal(a: &str, b: &str) -> bool {
    felt_digits(a).eq_ignore_ascii_case(felt_digits(b))
}

fn felt_digits(value: &str) -> &str {
    let trimmed = value.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let significant = digits.trim_start_matches('0');
    if significant.is_empty() {
        "0"
    } else {
        significant
    }
}

/// `0x`-prefixed hex string of at most 64 digits
pub fn is_valid_address(address: &str) -> bool {
    match address.strip_prefix("0x") {
        Some(digits) => !digits.is_empty() && digits.len() <= 64 && digits.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}
