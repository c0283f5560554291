//! Fiat / satoshi conversion.
//!
//! All liquidity arithmetic runs on integer satoshis. USD appears only
//! at the budget-input and display boundaries, so these two functions
//! are the entire currency surface of the solver.

/// Satoshis per whole bitcoin.
pub const SATS_PER_BTC: u64 = 100_000_000;

/// Convert a USD amount to satoshis at the given BTC/USD price,
/// rounding down to a whole satoshi.
pub fn usd_to_sats(usd: f64, btc_usd: f64) -> u64 {
    (usd / btc_usd * SATS_PER_BTC as f64) as u64
}

/// Convert satoshis to USD at the given BTC/USD price. Not rounded;
/// callers format for display.
pub fn sats_to_usd(sats: u64, btc_usd: f64) -> f64 {
    sats as f64 * btc_usd / SATS_PER_BTC as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usd_to_sats_rounds_down() {
        // 1 USD at 60k is 1666.66... sats, floored.
        assert_eq!(usd_to_sats(1.0, 60_000.0), 1666);
        assert_eq!(usd_to_sats(25.0, 60_000.0), 41_666);
    }

    #[test]
    fn test_usd_to_sats_exact_values() {
        assert_eq!(usd_to_sats(25.0, 50_000.0), 50_000);
        assert_eq!(usd_to_sats(500.0, 100_000.0), 500_000);
        assert_eq!(usd_to_sats(10.0, 100_000.0), 10_000);
        assert_eq!(usd_to_sats(33.33, 61_234.5), 54_430);
    }

    #[test]
    fn test_usd_to_sats_zero_budget() {
        assert_eq!(usd_to_sats(0.0, 50_000.0), 0);
    }

    #[test]
    fn test_sats_to_usd() {
        assert!((sats_to_usd(50_000, 50_000.0) - 25.0).abs() < 1e-10);
        assert!((sats_to_usd(0, 50_000.0)).abs() < 1e-10);
        assert!((sats_to_usd(SATS_PER_BTC, 97_123.0) - 97_123.0).abs() < 1e-6);
    }

    #[test]
    fn test_roundtrip_never_gains() {
        // Flooring means converting back never exceeds the original.
        for usd in [0.5, 1.0, 13.37, 100.0, 499.99] {
            let sats = usd_to_sats(usd, 61_234.5);
            assert!(sats_to_usd(sats, 61_234.5) <= usd);
        }
    }
}
