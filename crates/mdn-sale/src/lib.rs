// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// MERIDIAN (MDN) - TOKEN SALE CORE
//
// Fixed-supply token sale: two-tier pricing policy and sale controller.
// Converts incoming wei payments to MDN token amounts, enforces a global
// issuance cap, tracks per-investor accounting, and manages the sale
// lifecycle (Active ↔ Paused → Finalized).
// All financial arithmetic uses u128 atomic units (no floating-point).
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub mod config;
pub mod errors;
pub mod pricing;
pub mod sale;
pub mod shared;

pub use config::SaleConfig;
pub use errors::SaleError;
pub use pricing::{PricingPolicy, RateTier, TwoTierPricing};
pub use sale::{InvestorRecord, Lifecycle, SaleController, SaleState};
pub use shared::SharedSale;

/// Fixed-point precision used in quoting: 1 MDN = 10^18 atomic units.
pub const TOKEN_DECIMALS: u8 = 18;

/// 1 MDN in atomic units (10^18 precision)
pub const ATOMS_PER_MDN: u128 = 1_000_000_000_000_000_000;

/// 1 ether in wei — the payment currency's smallest unit scale
pub const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

/// Total token issue: 500,000,000 MDN in atomic units (fixed)
pub const TOTAL_TOKEN_SUPPLY_ATOMS: u128 = 500_000_000 * ATOMS_PER_MDN;

/// Share of the total issue available for sale (percent)
pub const PURCHASE_CAP_PERCENT: u128 = 40;

/// Absolute ceiling on cumulative tokens sold: 40% of the total issue,
/// i.e. 200,000,000 MDN in atomic units
pub const TOKEN_TOTAL_PURCHASE_CAP_ATOMS: u128 =
    TOTAL_TOKEN_SUPPLY_ATOMS / 100 * PURCHASE_CAP_PERCENT;

/// Default rate: 1224 MDN per ether, i.e. floor(10^18 / 1224) wei per token
pub const DEFAULT_TOKEN_PRICE_WEI: u128 = WEI_PER_ETHER / 1224;

/// Bonus rate: 1700 MDN per ether, i.e. floor(10^18 / 1700) wei per token.
/// Cheaper than the default rate — active at construction to incentivize
/// early participation.
pub const BONUS_TOKEN_PRICE_WEI: u128 = WEI_PER_ETHER / 1700;

/// Current unix time in seconds. Convenience for callers of
/// [`SaleController::finalize`]; the core itself never reads the clock.
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_purchase_cap_is_40_percent_of_supply() {
        assert_eq!(
            TOKEN_TOTAL_PURCHASE_CAP_ATOMS,
            200_000_000 * ATOMS_PER_MDN
        );
        assert_eq!(
            TOKEN_TOTAL_PURCHASE_CAP_ATOMS * 100 / TOTAL_TOKEN_SUPPLY_ATOMS,
            PURCHASE_CAP_PERCENT
        );
    }

    #[test]
    fn test_bonus_rate_is_cheaper_than_default() {
        assert!(BONUS_TOKEN_PRICE_WEI < DEFAULT_TOKEN_PRICE_WEI);
        // Sanity: price * tokens-per-ether stays within one token of 1 ether
        assert!(DEFAULT_TOKEN_PRICE_WEI * 1224 <= WEI_PER_ETHER);
        assert!(BONUS_TOKEN_PRICE_WEI * 1700 <= WEI_PER_ETHER);
    }

    #[test]
    fn test_unix_now_is_sane() {
        // 2024-01-01 as a lower bound
        assert!(unix_now() > 1_704_067_200);
    }
}
