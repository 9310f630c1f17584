// SPDX-License-Identifier: AGPL-3.0-only
//! # Meridian Fungible-Asset Ledger
//!
//! Ledger collaborator interface for the MDN token sale.
//!
//! ## Overview
//! The sale controller does not own balance storage — it talks to any
//! fungible-asset store that exposes owner-scoped balances, an allowance
//! (delegated-spend) mechanism, and atomic transfer operations. This crate
//! defines that contract as the [`FungibleLedger`] trait and ships an
//! in-memory reference implementation used for:
//!
//! 1. Unit testing the sale core
//! 2. In-process deployments that don't need an external asset store
//!
//! ## Features
//! - Transfer, Approve, TransferFrom (ERC-20-like)
//! - All amounts in atomic units (`u128`) — NO floating-point
//! - Transfer operations report success as `bool`; a `false` return
//!   guarantees no balance or allowance was mutated

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ─────────────────────────────────────────────────────────────
// (owner, spender) map ↔ JSON (JSON objects only allow string keys)
// ─────────────────────────────────────────────────────────────

mod allowance_map {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S>(
        map: &BTreeMap<(String, String), u128>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let entries: Vec<(&String, &String, &u128)> = map
            .iter()
            .map(|((owner, spender), amount)| (owner, spender, amount))
            .collect();
        entries.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<(String, String), u128>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let entries: Vec<(String, String, u128)> = Vec::deserialize(deserializer)?;
        Ok(entries
            .into_iter()
            .map(|(owner, spender, amount)| ((owner, spender), amount))
            .collect())
    }
}

/// Account identifier. Opaque to the ledger — the sale core treats these
/// as principal names (investor addresses, the beneficiary wallet, etc.).
pub type AccountId = String;

// ─────────────────────────────────────────────────────────────
// LEDGER COLLABORATOR CONTRACT
// ─────────────────────────────────────────────────────────────

/// A fungible-asset store with owner-scoped balances and delegated spend.
///
/// Every mutating operation is all-or-nothing: on a `false` return the
/// ledger state is unchanged. The `caller` parameter is the verified
/// principal on whose behalf the operation runs — authentication happens
/// before the ledger is reached.
pub trait FungibleLedger {
    /// Balance of `account` in atomic units (0 for unknown accounts).
    fn balance_of(&self, account: &str) -> u128;

    /// Move `amount` from `caller` to `to`. Returns `false` on
    /// insufficient balance or a zero amount.
    fn transfer(&mut self, caller: &str, to: &str, amount: u128) -> bool;

    /// Authorise `spender` to move up to `amount` out of `caller`'s
    /// balance. Overwrites any previous allowance.
    fn approve(&mut self, caller: &str, spender: &str, amount: u128) -> bool;

    /// Remaining allowance granted by `owner` to `spender`.
    fn allowance(&self, owner: &str, spender: &str) -> u128;

    /// Move `amount` from `from` to `to`, spending `caller`'s allowance.
    /// Returns `false` on insufficient allowance, insufficient balance,
    /// or a zero amount.
    fn transfer_from(&mut self, caller: &str, from: &str, to: &str, amount: u128) -> bool;
}

// ─────────────────────────────────────────────────────────────
// IN-MEMORY REFERENCE IMPLEMENTATION
// ─────────────────────────────────────────────────────────────

/// In-memory fungible ledger.
///
/// `BTreeMap` storage keeps serialization deterministic, so snapshots of
/// the same ledger state are byte-identical.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryLedger {
    pub balances: BTreeMap<AccountId, u128>,
    /// (owner, spender) → allowance
    #[serde(with = "allowance_map")]
    pub allowances: BTreeMap<(AccountId, AccountId), u128>,
}

impl InMemoryLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ledger with the entire initial supply assigned to `holder`.
    pub fn with_supply(holder: &str, supply: u128) -> Self {
        let mut balances = BTreeMap::new();
        balances.insert(holder.to_string(), supply);
        Self {
            balances,
            allowances: BTreeMap::new(),
        }
    }

    /// Credit `amount` to `account` out of thin air. Setup/faucet helper —
    /// not part of the [`FungibleLedger`] contract.
    pub fn credit(&mut self, account: &str, amount: u128) {
        let bal = self.balances.entry(account.to_string()).or_insert(0);
        *bal = bal.saturating_add(amount);
    }

    /// Sum of all balances. Conservation check for tests and audits.
    pub fn total_held(&self) -> u128 {
        self.balances.values().fold(0u128, |acc, b| acc.saturating_add(*b))
    }
}

impl FungibleLedger for InMemoryLedger {
    fn balance_of(&self, account: &str) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn transfer(&mut self, caller: &str, to: &str, amount: u128) -> bool {
        if amount == 0 || to.is_empty() {
            return false;
        }
        let from_balance = self.balance_of(caller);
        if from_balance < amount {
            return false;
        }
        // Debit checked first so a failed credit can't leave a half-move
        let Some(debited) = from_balance.checked_sub(amount) else {
            return false;
        };
        let to_balance = self.balance_of(to);
        let Some(credited) = to_balance.checked_add(amount) else {
            return false;
        };
        self.balances.insert(caller.to_string(), debited);
        self.balances.insert(to.to_string(), credited);
        true
    }

    fn approve(&mut self, caller: &str, spender: &str, amount: u128) -> bool {
        if spender.is_empty() {
            return false;
        }
        self.allowances
            .insert((caller.to_string(), spender.to_string()), amount);
        true
    }

    fn allowance(&self, owner: &str, spender: &str) -> u128 {
        self.allowances
            .get(&(owner.to_string(), spender.to_string()))
            .copied()
            .unwrap_or(0)
    }

    fn transfer_from(&mut self, caller: &str, from: &str, to: &str, amount: u128) -> bool {
        if amount == 0 || to.is_empty() {
            return false;
        }
        let allowed = self.allowance(from, caller);
        if allowed < amount {
            return false;
        }
        let from_balance = self.balance_of(from);
        if from_balance < amount {
            return false;
        }
        let Some(debited) = from_balance.checked_sub(amount) else {
            return false;
        };
        let to_balance = self.balance_of(to);
        let Some(credited) = to_balance.checked_add(amount) else {
            return false;
        };
        let Some(remaining) = allowed.checked_sub(amount) else {
            return false;
        };
        self.balances.insert(from.to_string(), debited);
        self.balances.insert(to.to_string(), credited);
        self.allowances
            .insert((from.to_string(), caller.to_string()), remaining);
        true
    }
}

// ─────────────────────────────────────────────────────────────
// TESTS
// ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: &str = "MDN_alice";
    const BOB: &str = "MDN_bob";
    const CHARLIE: &str = "MDN_charlie";

    fn make_ledger(supply: u128) -> InMemoryLedger {
        InMemoryLedger::with_supply(ALICE, supply)
    }

    #[test]
    fn test_with_supply_seeds_holder() {
        let ledger = make_ledger(1_000_000);
        assert_eq!(ledger.balance_of(ALICE), 1_000_000);
        assert_eq!(ledger.balance_of(BOB), 0);
        assert_eq!(ledger.total_held(), 1_000_000);
    }

    #[test]
    fn test_transfer() {
        let mut ledger = make_ledger(1_000_000);
        assert!(ledger.transfer(ALICE, BOB, 300_000));
        assert_eq!(ledger.balance_of(ALICE), 700_000);
        assert_eq!(ledger.balance_of(BOB), 300_000);
        assert_eq!(ledger.total_held(), 1_000_000);
    }

    #[test]
    fn test_transfer_insufficient() {
        let mut ledger = make_ledger(100);
        assert!(!ledger.transfer(ALICE, BOB, 200));
        assert_eq!(ledger.balance_of(ALICE), 100);
        assert_eq!(ledger.balance_of(BOB), 0);
    }

    #[test]
    fn test_transfer_zero_rejected() {
        let mut ledger = make_ledger(100);
        assert!(!ledger.transfer(ALICE, BOB, 0));
    }

    #[test]
    fn test_transfer_to_self() {
        let mut ledger = make_ledger(100);
        assert!(ledger.transfer(ALICE, ALICE, 100));
        assert_eq!(ledger.balance_of(ALICE), 100);
    }

    #[test]
    fn test_approve_and_transfer_from() {
        let mut ledger = make_ledger(1_000_000);

        assert!(ledger.approve(ALICE, CHARLIE, 500_000));
        assert_eq!(ledger.allowance(ALICE, CHARLIE), 500_000);

        assert!(ledger.transfer_from(CHARLIE, ALICE, BOB, 200_000));
        assert_eq!(ledger.balance_of(ALICE), 800_000);
        assert_eq!(ledger.balance_of(BOB), 200_000);
        assert_eq!(ledger.allowance(ALICE, CHARLIE), 300_000);
    }

    #[test]
    fn test_transfer_from_exceeds_allowance() {
        let mut ledger = make_ledger(1_000_000);
        ledger.approve(ALICE, CHARLIE, 100);
        assert!(!ledger.transfer_from(CHARLIE, ALICE, BOB, 200));
        assert_eq!(ledger.balance_of(ALICE), 1_000_000);
        assert_eq!(ledger.allowance(ALICE, CHARLIE), 100);
    }

    #[test]
    fn test_transfer_from_exceeds_balance() {
        let mut ledger = make_ledger(100);
        ledger.approve(ALICE, CHARLIE, 10_000);
        assert!(!ledger.transfer_from(CHARLIE, ALICE, BOB, 200));
        assert_eq!(ledger.balance_of(ALICE), 100);
        // Allowance untouched on failure
        assert_eq!(ledger.allowance(ALICE, CHARLIE), 10_000);
    }

    #[test]
    fn test_transfer_from_no_allowance() {
        let mut ledger = make_ledger(1_000_000);
        assert!(!ledger.transfer_from(CHARLIE, ALICE, BOB, 1));
    }

    #[test]
    fn test_approve_overwrites() {
        let mut ledger = make_ledger(1_000);
        ledger.approve(ALICE, BOB, 500);
        ledger.approve(ALICE, BOB, 42);
        assert_eq!(ledger.allowance(ALICE, BOB), 42);
    }

    #[test]
    fn test_credit() {
        let mut ledger = InMemoryLedger::new();
        ledger.credit(BOB, 777);
        assert_eq!(ledger.balance_of(BOB), 777);
    }

    #[test]
    fn test_u128_amounts() {
        // 500M tokens with 18 decimals fits comfortably in u128
        let big_supply: u128 = 500_000_000 * 1_000_000_000_000_000_000;
        let mut ledger = make_ledger(big_supply);
        assert!(ledger.transfer(ALICE, BOB, big_supply / 2));
        assert_eq!(ledger.balance_of(ALICE), big_supply - big_supply / 2);
        assert_eq!(ledger.balance_of(BOB), big_supply / 2);
    }

    #[test]
    fn test_serialization_roundtrip() {
        let mut ledger = make_ledger(1_000);
        ledger.approve(ALICE, BOB, 99);
        let json = serde_json::to_string(&ledger).unwrap();
        let decoded: InMemoryLedger = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.balance_of(ALICE), 1_000);
        assert_eq!(decoded.allowance(ALICE, BOB), 99);
    }
}
