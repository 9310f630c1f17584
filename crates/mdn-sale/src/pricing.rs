// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// MERIDIAN (MDN) - PRICING POLICY
//
// Converts a wei payment into an MDN token quantity under the currently
// active rate. Two named rates exist (default / bonus); the rates themselves
// are construction-time constants — only the selection between them is
// mutable, and only by the owner.
//
// token_amount = floor(payment_wei * 10^decimals / price_per_token_wei)
// Truncation (floor), never rounding up — favours the seller.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use serde::{Deserialize, Serialize};

use crate::errors::SaleError;
use crate::{BONUS_TOKEN_PRICE_WEI, DEFAULT_TOKEN_PRICE_WEI};

// ─────────────────────────────────────────────────────────────
// RATES
// ─────────────────────────────────────────────────────────────

/// The two named rates of the sale. Exactly one is active at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateTier {
    /// Regular sale price: 1224 MDN per ether
    Default,
    /// Early-participation price: 1700 MDN per ether
    Bonus,
}

impl RateTier {
    /// Wei required to buy one whole token at this rate.
    pub fn price_per_token_wei(self) -> u128 {
        match self {
            RateTier::Default => DEFAULT_TOKEN_PRICE_WEI,
            RateTier::Bonus => BONUS_TOKEN_PRICE_WEI,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RateTier::Default => "default",
            RateTier::Bonus => "bonus",
        }
    }
}

// ─────────────────────────────────────────────────────────────
// POLICY CONTRACT
// ─────────────────────────────────────────────────────────────

/// Quoting contract the sale controller depends on.
///
/// The controller accepts replacement policies across a `dyn` boundary at
/// runtime, so conformance is validated with an explicit probe
/// ([`PricingPolicy::is_pricing_policy`]) before a replacement is accepted —
/// a defence against wiring the controller to an unrelated object.
pub trait PricingPolicy {
    /// Convert `payment_wei` into a token quantity at the active rate.
    ///
    /// Fails with `ArithmeticOverflow` if `payment_wei * 10^decimals`
    /// cannot be represented in u128.
    fn quote(&self, payment_wei: u128, token_decimals: u8) -> Result<u128, SaleError>;

    /// Capability probe — a conforming policy returns `true`.
    fn is_pricing_policy(&self) -> bool;

    /// Wei required to buy one whole token at the active rate.
    fn one_token_in_wei(&self) -> u128;

    /// The named rate currently in effect. Persisted with the sale state
    /// so a restored sale resumes quoting at the same rate.
    fn active_rate(&self) -> RateTier;
}

// ─────────────────────────────────────────────────────────────
// TWO-TIER POLICY (shipped implementation)
// ─────────────────────────────────────────────────────────────

/// The sale's shipped pricing policy: a switch between the two fixed rates.
/// Created with the bonus (cheaper) rate active.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwoTierPricing {
    owner: String,
    active: RateTier,
}

impl TwoTierPricing {
    /// Create a policy administered by `owner`, bonus rate active.
    pub fn new(owner: &str) -> Self {
        Self {
            owner: owner.to_string(),
            active: RateTier::Bonus,
        }
    }

    /// Create a policy with an explicit initial rate (construction-time
    /// configuration; see `SaleConfig::initial_active_rate`).
    pub fn with_active(owner: &str, active: RateTier) -> Self {
        Self {
            owner: owner.to_string(),
            active,
        }
    }

    pub fn active_tier(&self) -> RateTier {
        self.active
    }

    /// Owner-only switch to `tier`. Idempotent if already active.
    pub fn switch_to(&mut self, caller: &str, tier: RateTier) -> Result<(), SaleError> {
        if caller != self.owner {
            return Err(SaleError::Unauthorized);
        }
        self.active = tier;
        Ok(())
    }

    pub fn switch_to_default(&mut self, caller: &str) -> Result<(), SaleError> {
        self.switch_to(caller, RateTier::Default)
    }

    pub fn switch_to_bonus(&mut self, caller: &str) -> Result<(), SaleError> {
        self.switch_to(caller, RateTier::Bonus)
    }
}

impl PricingPolicy for TwoTierPricing {
    fn quote(&self, payment_wei: u128, token_decimals: u8) -> Result<u128, SaleError> {
        calculate_token_amount(payment_wei, token_decimals, self.active.price_per_token_wei())
    }

    fn is_pricing_policy(&self) -> bool {
        true
    }

    fn one_token_in_wei(&self) -> u128 {
        self.active.price_per_token_wei()
    }

    fn active_rate(&self) -> RateTier {
        self.active
    }
}

/// Shared quoting arithmetic: floor(payment * 10^decimals / price).
///
/// The multiplication runs in u128 with an explicit overflow check; the
/// original deployment had 256-bit headroom, here the overflow is rejected
/// instead of wrapped.
pub fn calculate_token_amount(
    payment_wei: u128,
    token_decimals: u8,
    price_per_token_wei: u128,
) -> Result<u128, SaleError> {
    if price_per_token_wei == 0 {
        // Both shipped rates are non-zero constants; a zero price can only
        // come from a misconfigured custom policy.
        return Err(SaleError::ArithmeticOverflow);
    }
    let scale = 10u128
        .checked_pow(u32::from(token_decimals))
        .ok_or(SaleError::ArithmeticOverflow)?;
    let scaled = payment_wei
        .checked_mul(scale)
        .ok_or(SaleError::ArithmeticOverflow)?;
    Ok(scaled / price_per_token_wei)
}

// ─────────────────────────────────────────────────────────────
// TESTS
// ─────────────────────────────────────────────────────────────
