// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// MERIDIAN (MDN) - SALE CONTROLLER
//
// Orchestrates the capped token sale: validates and records investments,
// asks the pricing policy for the conversion, moves tokens out of the
// supply owner's pre-approved allowance to the investor, forwards the
// payment to the beneficiary, and manages the sale lifecycle.
//
// Every operation either commits all of its state mutations or none.
// Failed operations are no-ops on state, so retrying is always safe.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use mdn_ledger::FungibleLedger;

use crate::config::SaleConfig;
use crate::errors::SaleError;
use crate::pricing::{PricingPolicy, RateTier, TwoTierPricing};

// ─────────────────────────────────────────────────────────────
// STATE
// ─────────────────────────────────────────────────────────────

/// Sale lifecycle. `Finalized` is terminal: once entered, the sale never
/// transitions to any other state and accepts no further investments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lifecycle {
    Active,
    Paused,
    Finalized,
}

/// Accumulated contributions of a single investor. One entry is created on
/// the first contribution and accumulated thereafter — never duplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvestorRecord {
    pub token_amount: u128,
    pub invested_amount: u128,
}

/// The persisted ledger of record for the sale. All counters are
/// monotonically non-decreasing; see [`SaleState::is_consistent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleState {
    pub lifecycle: Lifecycle,
    pub tokens_sold: u128,
    pub wei_raised: u128,
    pub investor_count: u64,
    /// MAINNET-style determinism: BTreeMap so snapshots serialize identically
    pub per_investor: BTreeMap<String, InvestorRecord>,
    /// Named rate in effect, kept in sync with the wired pricing policy so
    /// a restored sale resumes quoting at the same rate
    pub active_rate: RateTier,
    /// Set exactly once, on the transition into `Finalized`
    pub finalized_timestamp: Option<u64>,
}

impl Default for SaleState {
    fn default() -> Self {
        Self::new()
    }
}

impl SaleState {
    pub fn new() -> Self {
        Self {
            lifecycle: Lifecycle::Active,
            tokens_sold: 0,
            wei_raised: 0,
            investor_count: 0,
            per_investor: BTreeMap::new(),
            active_rate: RateTier::Bonus,
            finalized_timestamp: None,
        }
    }

    /// Verify the aggregate invariants hold:
    /// counters match the per-investor ledger, and the finalized timestamp
    /// is present iff the lifecycle is `Finalized`.
    pub fn is_consistent(&self, token_total_cap: u128) -> bool {
        let sum_tokens = self
            .per_investor
            .values()
            .fold(0u128, |acc, r| acc.saturating_add(r.token_amount));
        let sum_wei = self
            .per_investor
            .values()
            .fold(0u128, |acc, r| acc.saturating_add(r.invested_amount));

        self.tokens_sold <= token_total_cap
            && self.tokens_sold == sum_tokens
            && self.wei_raised == sum_wei
            && self.investor_count == self.per_investor.len() as u64
            && (self.finalized_timestamp.is_some() == (self.lifecycle == Lifecycle::Finalized))
    }

    /// Save the sale state snapshot to a JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Load a sale state snapshot from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        let state: SaleState = serde_json::from_str(&content)?;
        Ok(state)
    }
}

// ─────────────────────────────────────────────────────────────
// SALE CONTROLLER
// ─────────────────────────────────────────────────────────────

/// The sale controller aggregate.
///
/// Collaborators are injected at construction: the token ledger, the
/// payment ledger, and the pricing policy. The controller spends the supply
/// owner's pre-approved token allowance (approve-then-transfer_from wiring)
/// and forwards payments out of its own custody to the beneficiary.
pub struct SaleController<L: FungibleLedger> {
    owner: String,
    beneficiary: String,
    supply_account: String,
    sale_account: String,
    token_decimals: u8,
    token_total_cap: u128,
    state: SaleState,
    policy: Box<dyn PricingPolicy + Send>,
    tokens: L,
    payments: L,
}

impl<L: FungibleLedger> SaleController<L> {
    /// Create a sale controller from construction-time configuration and
    /// injected collaborators. The policy is probed for conformance the
    /// same way a later [`SaleController::set_pricing_policy`] swap is.
    pub fn new(
        config: &SaleConfig,
        policy: Box<dyn PricingPolicy + Send>,
        tokens: L,
        payments: L,
    ) -> Result<Self, SaleError> {
        if !policy.is_pricing_policy() {
            return Err(SaleError::InvalidPolicy);
        }
        let mut state = SaleState::new();
        state.active_rate = policy.active_rate();
        Ok(Self {
            owner: config.owner.clone(),
            beneficiary: config.beneficiary_account.clone(),
            supply_account: config.supply_account.clone(),
            sale_account: config.sale_account.clone(),
            token_decimals: config.token_decimals,
            token_total_cap: config.token_total_cap,
            state,
            policy,
            tokens,
            payments,
        })
    }

    /// Create a controller wired with the shipped two-tier policy, starting
    /// at `config.initial_active_rate`.
    pub fn from_config(config: &SaleConfig, tokens: L, payments: L) -> Result<Self, SaleError> {
        let policy = TwoTierPricing::with_active(&config.owner, config.initial_active_rate);
        Self::new(config, Box::new(policy), tokens, payments)
    }

    /// Rebuild a controller from a persisted state snapshot. The pricing
    /// policy is rebuilt from the snapshot's `active_rate`, so the restored
    /// sale quotes at the rate in effect when the snapshot was taken. Ledger
    /// collaborators are re-wired by the host, same as construction; a host
    /// running a custom policy re-wires it with
    /// [`Self::set_pricing_policy`] after restoring.
    pub fn restore(
        config: &SaleConfig,
        state: SaleState,
        tokens: L,
        payments: L,
    ) -> Result<Self, SaleError> {
        let policy = TwoTierPricing::with_active(&config.owner, state.active_rate);
        let mut sale = Self::new(config, Box::new(policy), tokens, payments)?;
        sale.state = state;
        Ok(sale)
    }

    fn require_owner(&self, caller: &str) -> Result<(), SaleError> {
        if caller != self.owner {
            return Err(SaleError::Unauthorized);
        }
        Ok(())
    }

    // ── Investment path ──

    /// Record an investment of `payment_wei` already held in sale custody
    /// (the payment arrives with the call, as with the original payable
    /// entrypoint). On success returns the token amount issued.
    ///
    /// Effects are atomic: the token transfer, the payment forward, and
    /// every counter update either all occur or none do.
    pub fn invest(&mut self, investor: &str, payment_wei: u128) -> Result<u128, SaleError> {
        if self.state.lifecycle != Lifecycle::Active {
            return Err(SaleError::SaleNotActive);
        }
        if investor.is_empty() || payment_wei == 0 {
            return Err(SaleError::InvalidAmount);
        }

        let token_amount = self.policy.quote(payment_wei, self.token_decimals)?;
        if token_amount == 0 {
            // Dust payment that quotes to zero tokens: rejected, so wei is
            // never raised without token issuance.
            return Err(SaleError::InvalidAmount);
        }

        let new_sold = self
            .state
            .tokens_sold
            .checked_add(token_amount)
            .ok_or(SaleError::ArithmeticOverflow)?;
        if new_sold > self.token_total_cap {
            return Err(SaleError::CapExceeded {
                requested: token_amount,
                available: self.available_tokens_to_sell(),
            });
        }
        let new_raised = self
            .state
            .wei_raised
            .checked_add(payment_wei)
            .ok_or(SaleError::ArithmeticOverflow)?;

        let prior = self
            .state
            .per_investor
            .get(investor)
            .cloned()
            .unwrap_or_default();
        let record = InvestorRecord {
            token_amount: prior
                .token_amount
                .checked_add(token_amount)
                .ok_or(SaleError::ArithmeticOverflow)?,
            invested_amount: prior
                .invested_amount
                .checked_add(payment_wei)
                .ok_or(SaleError::ArithmeticOverflow)?,
        };

        // Preflight both ledger legs before mutating either, so a declined
        // transfer surfaces with zero side effects.
        let prior_allowance = self.tokens.allowance(&self.supply_account, &self.sale_account);
        if prior_allowance < token_amount
            || self.tokens.balance_of(&self.supply_account) < token_amount
        {
            return Err(SaleError::TransferFailed(
                "supply owner allowance or balance below token amount".to_string(),
            ));
        }
        if self.payments.balance_of(&self.sale_account) < payment_wei {
            return Err(SaleError::TransferFailed(
                "payment not held in sale custody".to_string(),
            ));
        }

        // Token leg: supply owner → investor, out of the pre-approved allowance
        if !self.tokens.transfer_from(
            &self.sale_account,
            &self.supply_account,
            investor,
            token_amount,
        ) {
            return Err(SaleError::TransferFailed(
                "token transfer_from declined".to_string(),
            ));
        }

        // Payment leg: sale custody → beneficiary
        if !self
            .payments
            .transfer(&self.sale_account, &self.beneficiary, payment_wei)
        {
            // Roll the token leg back. The ledger trait takes the acting
            // principal as a parameter, so the controller can return the
            // tokens and restore the allowance it just consumed.
            let tokens_returned = self
                .tokens
                .transfer(investor, &self.supply_account, token_amount);
            let allowance_restored =
                self.tokens
                    .approve(&self.supply_account, &self.sale_account, prior_allowance);
            if !tokens_returned || !allowance_restored {
                // The counters stay uncommitted, but the token ledger now
                // disagrees with them. Escalate so the host can reconcile.
                return Err(SaleError::TransferFailed(
                    "payment forward declined and token rollback was also declined".to_string(),
                ));
            }
            return Err(SaleError::TransferFailed(
                "payment forward to beneficiary declined".to_string(),
            ));
        }

        // Commit counters only after both legs succeeded
        let first_contribution = !self.state.per_investor.contains_key(investor);
        self.state.tokens_sold = new_sold;
        self.state.wei_raised = new_raised;
        self.state.per_investor.insert(investor.to_string(), record);
        if first_contribution {
            self.state.investor_count += 1;
        }

        Ok(token_amount)
    }

    /// Default entrypoint: a bare payment received with no explicit
    /// investment instruction is treated identically to [`Self::invest`]
    /// from the sender with the transferred amount.
    pub fn receive_payment(&mut self, sender: &str, payment_wei: u128) -> Result<u128, SaleError> {
        self.invest(sender, payment_wei)
    }

    // ── Administrative transitions ──

    /// Owner-only Active → Paused toggle.
    pub fn pause(&mut self, caller: &str) -> Result<(), SaleError> {
        self.require_owner(caller)?;
        match self.state.lifecycle {
            Lifecycle::Finalized => Err(SaleError::AlreadyFinalized),
            Lifecycle::Paused => Err(SaleError::AlreadyPaused),
            Lifecycle::Active => {
                self.state.lifecycle = Lifecycle::Paused;
                Ok(())
            }
        }
    }

    /// Owner-only Paused → Active toggle.
    pub fn unpause(&mut self, caller: &str) -> Result<(), SaleError> {
        self.require_owner(caller)?;
        match self.state.lifecycle {
            Lifecycle::Finalized => Err(SaleError::AlreadyFinalized),
            Lifecycle::Active => Err(SaleError::NotPaused),
            Lifecycle::Paused => {
                self.state.lifecycle = Lifecycle::Active;
                Ok(())
            }
        }
    }

    /// One-shot, irreversible end of the sale. Stamps `finalized_timestamp`
    /// with the supplied time (callers use [`crate::unix_now`]).
    pub fn finalize(&mut self, caller: &str, now_secs: u64) -> Result<(), SaleError> {
        self.require_owner(caller)?;
        if self.state.lifecycle == Lifecycle::Finalized {
            return Err(SaleError::AlreadyFinalized);
        }
        self.state.lifecycle = Lifecycle::Finalized;
        self.state.finalized_timestamp = Some(now_secs);
        Ok(())
    }

    /// Replace the pricing policy for a not-yet-finalized sale. The
    /// replacement is probed for conformance before being accepted.
    pub fn set_pricing_policy(
        &mut self,
        caller: &str,
        new_policy: Box<dyn PricingPolicy + Send>,
    ) -> Result<(), SaleError> {
        self.require_owner(caller)?;
        if self.state.lifecycle == Lifecycle::Finalized {
            return Err(SaleError::AlreadyFinalized);
        }
        if !new_policy.is_pricing_policy() {
            return Err(SaleError::InvalidPolicy);
        }
        self.policy = new_policy;
        // Keep the persisted rate in sync with the live policy
        self.state.active_rate = self.policy.active_rate();
        Ok(())
    }

    // ── Read-only accessors ──

    pub fn available_tokens_to_sell(&self) -> u128 {
        self.token_total_cap.saturating_sub(self.state.tokens_sold)
    }

    pub fn token_amount_of(&self, investor: &str) -> u128 {
        self.state
            .per_investor
            .get(investor)
            .map(|r| r.token_amount)
            .unwrap_or(0)
    }

    pub fn invested_amount_of(&self, investor: &str) -> u128 {
        self.state
            .per_investor
            .get(investor)
            .map(|r| r.invested_amount)
            .unwrap_or(0)
    }

    pub fn tokens_sold(&self) -> u128 {
        self.state.tokens_sold
    }

    pub fn wei_raised(&self) -> u128 {
        self.state.wei_raised
    }

    pub fn investor_count(&self) -> u64 {
        self.state.investor_count
    }

    pub fn is_finalized(&self) -> bool {
        self.state.lifecycle == Lifecycle::Finalized
    }

    pub fn is_paused(&self) -> bool {
        self.state.lifecycle == Lifecycle::Paused
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.state.lifecycle
    }

    pub fn finalized_timestamp(&self) -> Option<u64> {
        self.state.finalized_timestamp
    }

    pub fn token_total_cap(&self) -> u128 {
        self.token_total_cap
    }

    pub fn one_token_in_wei(&self) -> u128 {
        self.policy.one_token_in_wei()
    }

    pub fn active_rate(&self) -> RateTier {
        self.state.active_rate
    }

    /// The persisted ledger of record; see [`SaleState::save_to_file`].
    pub fn state(&self) -> &SaleState {
        &self.state
    }

    pub fn tokens(&self) -> &L {
        &self.tokens
    }

    pub fn payments(&self) -> &L {
        &self.payments
    }

    /// Mutable ledger access for the host wiring: crediting incoming
    /// payment custody, topping up the supply allowance. Not part of the
    /// investment path itself.
    pub fn tokens_mut(&mut self) -> &mut L {
        &mut self.tokens
    }

    pub fn payments_mut(&mut self) -> &mut L {
        &mut self.payments
    }

    /// Invariant audit over the live aggregate. On top of the state-level
    /// checks, the persisted rate must match the wired policy.
    pub fn is_consistent(&self) -> bool {
        self.state.is_consistent(self.token_total_cap)
            && self.state.active_rate == self.policy.active_rate()
    }
}

// ─────────────────────────────────────────────────────────────
// TESTS
// ─────────────────────────────────────────────────────────────
