use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fs;
use std::path::Path;

use crate::pricing::RateTier;
use crate::{TOKEN_DECIMALS, TOKEN_TOTAL_PURCHASE_CAP_ATOMS};

/// Serde adapter for u128 ↔ TOML: serialize as string, deserialize from string or integer.
/// TOML crate doesn't natively support u128, so we round-trip through strings.
mod u128_toml {
    use super::*;

    pub fn serialize<S: Serializer>(val: &u128, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&val.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u128, D::Error> {
        use serde::de::{self, Visitor};
        struct U128Visitor;

        impl<'de> Visitor<'de> for U128Visitor {
            type Value = u128;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a u128 as a string or integer")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<u128, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<u128, E> {
                Ok(v as u128)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<u128, E> {
                if v >= 0 {
                    Ok(v as u128)
                } else {
                    Err(E::custom("negative value for u128"))
                }
            }
        }

        d.deserialize_any(U128Visitor)
    }
}

/// Construction-time configuration of a sale deployment.
/// Every field is bound once at controller construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleConfig {
    /// The single administrative principal for all owner-gated operations
    pub owner: String,
    /// Where forwarded payments land
    pub beneficiary_account: String,
    /// Token-supply owner whose pre-approved allowance the sale spends
    pub supply_account: String,
    /// The controller's own principal id on both ledgers
    pub sale_account: String,
    /// Fixed-point precision used in quoting
    pub token_decimals: u8,
    /// Absolute ceiling on cumulative tokens sold, in atomic units
    #[serde(with = "u128_toml")]
    pub token_total_cap: u128,
    /// Which named rate is active at pricing-policy construction
    pub initial_active_rate: RateTier,
}

impl Default for SaleConfig {
    /// Reference deployment: 18 decimals, 40%-of-supply cap, bonus rate first.
    fn default() -> Self {
        Self {
            owner: String::new(),
            beneficiary_account: String::new(),
            supply_account: String::new(),
            sale_account: String::new(),
            token_decimals: TOKEN_DECIMALS,
            token_total_cap: TOKEN_TOTAL_PURCHASE_CAP_ATOMS,
            initial_active_rate: RateTier::Bonus,
        }
    }
}

impl SaleConfig {
    /// Load sale config from TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        let config: SaleConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load sale config from environment variables.
    /// Useful for containerized deployments.
    pub fn load_from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let owner = std::env::var("MDN_SALE_OWNER").map_err(|_| "MDN_SALE_OWNER not set")?;
        let beneficiary_account =
            std::env::var("MDN_SALE_BENEFICIARY").map_err(|_| "MDN_SALE_BENEFICIARY not set")?;
        let supply_account =
            std::env::var("MDN_SALE_SUPPLY_ACCOUNT").map_err(|_| "MDN_SALE_SUPPLY_ACCOUNT not set")?;
        let sale_account = std::env::var("MDN_SALE_ACCOUNT")
            .unwrap_or_else(|_| "MDN_sale_controller".to_string());

        let token_decimals: u8 = std::env::var("MDN_TOKEN_DECIMALS")
            .unwrap_or_else(|_| TOKEN_DECIMALS.to_string())
            .parse()?;

        let token_total_cap: u128 = std::env::var("MDN_TOKEN_TOTAL_CAP")
            .unwrap_or_else(|_| TOKEN_TOTAL_PURCHASE_CAP_ATOMS.to_string())
            .parse()?;

        let initial_active_rate = match std::env::var("MDN_INITIAL_RATE")
            .unwrap_or_else(|_| "bonus".to_string())
            .as_str()
        {
            "default" => RateTier::Default,
            "bonus" => RateTier::Bonus,
            other => return Err(format!("Unknown rate tier: {}", other).into()),
        };

        Ok(Self {
            owner,
            beneficiary_account,
            supply_account,
            sale_account,
            token_decimals,
            token_total_cap,
            initial_active_rate,
        })
    }

    /// Save sale config to TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.owner.is_empty() {
            return Err("owner cannot be empty".to_string());
        }
        if self.beneficiary_account.is_empty() {
            return Err("beneficiary_account cannot be empty".to_string());
        }
        if self.supply_account.is_empty() {
            return Err("supply_account cannot be empty".to_string());
        }
        if self.sale_account.is_empty() {
            return Err("sale_account cannot be empty".to_string());
        }
        if self.sale_account == self.beneficiary_account {
            return Err("sale_account must differ from beneficiary_account".to_string());
        }
        if self.token_decimals > 38 {
            // 10^39 does not fit in u128 — quoting would always overflow
            return Err("token_decimals must be 0-38".to_string());
        }
        if self.token_total_cap == 0 {
            return Err("token_total_cap must be > 0".to_string());
        }
        Ok(())
    }
}
