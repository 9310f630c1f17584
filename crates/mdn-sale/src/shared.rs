// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// MERIDIAN (MDN) - SHARED SALE HANDLE
//
// Serialized-per-call execution of the sale aggregate. The original
// execution substrate ran every externally-visible call to completion with
// no interleaving; outside that substrate the same contract is reproduced
// with a single mutex around the whole aggregate (controller + policy +
// both ledgers). Without it, two concurrent investments could both pass
// the cap check against a stale tokens_sold and jointly overshoot the cap
// (check-then-act race).
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::sync::{Arc, Mutex, MutexGuard};

use mdn_ledger::FungibleLedger;

use crate::errors::SaleError;
use crate::pricing::PricingPolicy;
use crate::sale::{Lifecycle, SaleController, SaleState};

/// Cloneable handle to a mutex-guarded [`SaleController`]. Every method
/// holds the lock for the full operation, so each call is atomic and
/// serialized with respect to every other call on any clone of the handle.
pub struct SharedSale<L: FungibleLedger> {
    inner: Arc<Mutex<SaleController<L>>>,
}

impl<L: FungibleLedger> Clone for SharedSale<L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<L: FungibleLedger> SharedSale<L> {
    pub fn new(sale: SaleController<L>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(sale)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, SaleController<L>>, SaleError> {
        self.inner.lock().map_err(|_| SaleError::LockPoisoned)
    }

    pub fn invest(&self, investor: &str, payment_wei: u128) -> Result<u128, SaleError> {
        self.lock()?.invest(investor, payment_wei)
    }

    pub fn receive_payment(&self, sender: &str, payment_wei: u128) -> Result<u128, SaleError> {
        self.lock()?.receive_payment(sender, payment_wei)
    }

    pub fn pause(&self, caller: &str) -> Result<(), SaleError> {
        self.lock()?.pause(caller)
    }

    pub fn unpause(&self, caller: &str) -> Result<(), SaleError> {
        self.lock()?.unpause(caller)
    }

    pub fn finalize(&self, caller: &str, now_secs: u64) -> Result<(), SaleError> {
        self.lock()?.finalize(caller, now_secs)
    }

    pub fn set_pricing_policy(
        &self,
        caller: &str,
        new_policy: Box<dyn PricingPolicy + Send>,
    ) -> Result<(), SaleError> {
        self.lock()?.set_pricing_policy(caller, new_policy)
    }

    // ── Read-only accessors (still serialized — reads observe committed state only) ──

    pub fn available_tokens_to_sell(&self) -> Result<u128, SaleError> {
        Ok(self.lock()?.available_tokens_to_sell())
    }

    pub fn token_amount_of(&self, investor: &str) -> Result<u128, SaleError> {
        Ok(self.lock()?.token_amount_of(investor))
    }

    pub fn invested_amount_of(&self, investor: &str) -> Result<u128, SaleError> {
        Ok(self.lock()?.invested_amount_of(investor))
    }

    pub fn tokens_sold(&self) -> Result<u128, SaleError> {
        Ok(self.lock()?.tokens_sold())
    }

    pub fn wei_raised(&self) -> Result<u128, SaleError> {
        Ok(self.lock()?.wei_raised())
    }

    pub fn investor_count(&self) -> Result<u64, SaleError> {
        Ok(self.lock()?.investor_count())
    }

    pub fn is_finalized(&self) -> Result<bool, SaleError> {
        Ok(self.lock()?.is_finalized())
    }

    pub fn lifecycle(&self) -> Result<Lifecycle, SaleError> {
        Ok(self.lock()?.lifecycle())
    }

    /// Clone of the persisted ledger of record, for snapshotting.
    pub fn state_snapshot(&self) -> Result<SaleState, SaleError> {
        Ok(self.lock()?.state().clone())
    }

    pub fn is_consistent(&self) -> Result<bool, SaleError> {
        Ok(self.lock()?.is_consistent())
    }

    /// Run `f` with the locked controller. Escape hatch for multi-step
    /// reads that must observe one consistent state.
    pub fn with_sale<T>(
        &self,
        f: impl FnOnce(&mut SaleController<L>) -> T,
    ) -> Result<T, SaleError> {
        let mut guard = self.lock()?;
        Ok(f(&mut guard))
    }
}

// ─────────────────────────────────────────────────────────────
// TESTS
// ─────────────────────────────────────────────────────────────
