//! Monetary amounts in the smallest unit

/// Signed amount in zatoshi-like base units.
pub type Amount = i64;

/// Base units per coin
pub const COIN: Amount = 100_000_000;

/// Upper bound for any single amount or sum of amounts
pub const MAX_MONEY: Amount = 21_000_000 * COIN;

/// Check that an amount is within the valid monetary range
pub fn money_range(value: Amount) -> bool {
    (0..=MAX_MONEY).contains(&value)
}

/// Format an amount as a decimal coin string for logs
pub fn format_money(value: Amount) -> String {
    let sign = if value < 0 { "-" } else { "" };
    let abs = value.unsigned_abs();
    let coin = COIN as u64;
    format!("{}{}.{:08}", sign, abs / coin, abs % coin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_range() {
        assert!(money_range(0));
        assert!(money_range(MAX_MONEY));
        assert!(!money_range(-1));
        assert!(!money_range(MAX_MONEY + 1));
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(COIN), "1.00000000");
        assert_eq!(format_money(150_000_000), "1.50000000");
        assert_eq!(format_money(-1), "-0.00000001");
    }
}
