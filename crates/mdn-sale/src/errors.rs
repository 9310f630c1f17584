// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// MERIDIAN (MDN) - SALE ERROR TAXONOMY
//
// Every error aborts the triggering operation with zero state mutation and
// surfaces synchronously to the caller. Retrying is always safe because a
// failed operation is a no-op on state.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaleError {
    /// Caller is not the owner for an owner-gated operation
    Unauthorized,
    /// Zero payment, or a payment so small it quotes to zero tokens
    InvalidAmount,
    /// Investment attempted while paused or finalized
    SaleNotActive,
    /// Investment would push tokens_sold past the purchase cap.
    /// Rejected in full — no partial fill.
    CapExceeded { requested: u128, available: u128 },
    /// The ledger declined to move tokens or payment
    TransferFailed(String),
    /// A proposed pricing-policy replacement failed the conformance probe
    InvalidPolicy,
    /// Operation forbidden after the one-shot finalization
    AlreadyFinalized,
    /// Redundant pause attempt
    AlreadyPaused,
    /// Unpause attempted while the sale is not paused
    NotPaused,
    /// Quoting computation cannot be represented in u128
    ArithmeticOverflow,
    /// The shared-handle mutex was poisoned by a panicked holder
    LockPoisoned,
}

impl std::fmt::Display for SaleError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            SaleError::Unauthorized => write!(f, "Caller is not the sale owner"),
            SaleError::InvalidAmount => write!(f, "Payment amount is zero or quotes to zero tokens"),
            SaleError::SaleNotActive => write!(f, "Sale is paused or finalized"),
            SaleError::CapExceeded {
                requested,
                available,
            } => write!(
                f,
                "Purchase cap exceeded: requested {} tokens but only {} available",
                requested, available
            ),
            SaleError::TransferFailed(msg) => write!(f, "Ledger transfer failed: {}", msg),
            SaleError::InvalidPolicy => {
                write!(f, "Proposed pricing policy failed the conformance probe")
            }
            SaleError::AlreadyFinalized => write!(f, "Sale is already finalized"),
            SaleError::AlreadyPaused => write!(f, "Sale is already paused"),
            SaleError::NotPaused => write!(f, "Sale is not paused"),
            SaleError::ArithmeticOverflow => write!(f, "Arithmetic overflow in quote computation"),
            SaleError::LockPoisoned => write!(f, "Sale lock poisoned by a panicked holder"),
        }
    }
}

impl std::error::Error for SaleError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            SaleError::Unauthorized.to_string(),
            "Caller is not the sale owner"
        );
        let msg = SaleError::CapExceeded {
            requested: 10,
            available: 3,
        }
        .to_string();
        assert!(msg.contains("requested 10"));
        assert!(msg.contains("3 available"));
    }

    #[test]
    fn test_errors_are_comparable() {
        assert_eq!(SaleError::InvalidAmount, SaleError::InvalidAmount);
        assert_ne!(SaleError::AlreadyPaused, SaleError::NotPaused);
    }
}
