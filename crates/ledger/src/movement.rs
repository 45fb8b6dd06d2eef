use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, MovementId, ProductId, UserId};

/// Kind of stock movement.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    /// Increases the balance by `quantity` (e.g. purchase receipt).
    Entry,
    /// Decreases the balance by `quantity` (sale, transfer, internal use).
    Exit,
    /// Sets the balance to `quantity` as an absolute value (inventory
    /// correction).
    Adjustment,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Entry => "ENTRY",
            MovementType::Exit => "EXIT",
            MovementType::Adjustment => "ADJUSTMENT",
        }
    }

    pub fn parse(s: &str) -> DomainResult<Self> {
        match s {
            "ENTRY" => Ok(MovementType::Entry),
            "EXIT" => Ok(MovementType::Exit),
            "ADJUSTMENT" => Ok(MovementType::Adjustment),
            other => Err(DomainError::validation(format!(
                "unknown movement type '{other}' (expected ENTRY, EXIT or ADJUSTMENT)"
            ))),
        }
    }
}

/// Business reason for an exit movement.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    Sale,
    Transfer,
    InternalUse,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::Sale => "SALE",
            ExitReason::Transfer => "TRANSFER",
            ExitReason::InternalUse => "INTERNAL_USE",
        }
    }

    pub fn parse(s: &str) -> DomainResult<Self> {
        match s {
            "SALE" => Ok(ExitReason::Sale),
            "TRANSFER" => Ok(ExitReason::Transfer),
            "INTERNAL_USE" => Ok(ExitReason::InternalUse),
            other => Err(DomainError::validation(format!(
                "unknown exit reason '{other}' (expected SALE, TRANSFER or INTERNAL_USE)"
            ))),
        }
    }
}

/// An accepted stock movement. Immutable once created: the log is
/// append-only and records are never altered or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: MovementId,
    pub product_id: ProductId,
    pub user_id: UserId,
    pub movement_type: MovementType,
    /// Entry/Exit: amount added/subtracted. Adjustment: the new absolute
    /// balance.
    pub quantity: i64,
    /// Present iff `movement_type` is [`MovementType::Exit`].
    pub reason: Option<ExitReason>,
    /// Unit price in cents at movement time, when the caller supplied one.
    /// Captured for future price-at-sale reporting; reports currently price
    /// at the product's current sale price.
    pub unit_price: Option<i64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StockMovement {
    /// Whether this movement counts toward sales reporting.
    pub fn is_sale(&self) -> bool {
        self.movement_type == MovementType::Exit && self.reason == Some(ExitReason::Sale)
    }
}

/// A movement intent, before acceptance.
///
/// `validate()` covers the balance-independent rules; the quantity rules
/// depend on the current balance and live in [`next_balance`], which the
/// store evaluates inside its atomic scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementDraft {
    pub product_id: ProductId,
    pub user_id: UserId,
    pub movement_type: MovementType,
    pub quantity: i64,
    pub reason: Option<ExitReason>,
    pub unit_price: Option<i64>,
    pub notes: Option<String>,
}

impl MovementDraft {
    pub fn validate(&self) -> DomainResult<()> {
        if self.movement_type == MovementType::Exit && self.reason.is_none() {
            return Err(DomainError::validation(
                "exit movements require a reason (SALE, TRANSFER or INTERNAL_USE)",
            ));
        }
        if let Some(unit_price) = self.unit_price {
            if unit_price < 0 {
                return Err(DomainError::validation("unit price cannot be negative"));
            }
        }
        Ok(())
    }

    /// Materialize the draft into an accepted movement record.
    ///
    /// Normalizes the record: a reason supplied on a non-exit movement is
    /// dropped, and blank notes collapse to none.
    pub fn accept(self, id: MovementId, created_at: DateTime<Utc>) -> StockMovement {
        let reason = match self.movement_type {
            MovementType::Exit => self.reason,
            _ => None,
        };
        let notes = self.notes.filter(|n| !n.trim().is_empty());

        StockMovement {
            id,
            product_id: self.product_id,
            user_id: self.user_id,
            movement_type: self.movement_type,
            quantity: self.quantity,
            reason,
            unit_price: self.unit_price,
            notes,
            created_at,
        }
    }
}

/// The balance-transition rule. Evaluated against the balance at acceptance
/// time, inside the store's per-product atomic scope.
///
/// - Entry: quantity must be > 0; balance increases by quantity.
/// - Exit: quantity must be > 0 and must not exceed the balance; balance
///   decreases by quantity. Exceeding the balance fails with
///   `InsufficientStock` carrying the available quantity.
/// - Adjustment: quantity is the new absolute balance and must be ≥ 0.
pub fn next_balance(
    movement_type: MovementType,
    quantity: i64,
    balance: i64,
) -> DomainResult<i64> {
    match movement_type {
        MovementType::Entry => {
            if quantity <= 0 {
                return Err(DomainError::validation("entry quantity must be positive"));
            }
            balance
                .checked_add(quantity)
                .ok_or_else(|| DomainError::validation("entry quantity overflows the balance"))
        }
        MovementType::Exit => {
            if quantity <= 0 {
                return Err(DomainError::validation("exit quantity must be positive"));
            }
            if quantity > balance {
                return Err(DomainError::insufficient_stock(balance));
            }
            Ok(balance - quantity)
        }
        MovementType::Adjustment => {
            if quantity < 0 {
                return Err(DomainError::validation(
                    "adjusted balance cannot be negative",
                ));
            }
            Ok(quantity)
        }
    }
}

/// Replay a product's accepted movements in creation order from an initial
/// balance. By the fold invariant this reproduces the cached balance
/// exactly; tests and consistency checks use it as the source of truth.
pub fn fold_balance<'a>(
    initial: i64,
    movements: impl IntoIterator<Item = &'a StockMovement>,
) -> DomainResult<i64> {
    let mut balance = initial;
    for movement in movements {
        balance = next_balance(movement.movement_type, movement.quantity, balance)?;
    }
    Ok(balance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn draft(movement_type: MovementType, quantity: i64) -> MovementDraft {
        MovementDraft {
            product_id: ProductId::new(),
            user_id: UserId::new(),
            movement_type,
            quantity,
            reason: match movement_type {
                MovementType::Exit => Some(ExitReason::Sale),
                _ => None,
            },
            unit_price: None,
            notes: None,
        }
    }

    #[test]
    fn entry_adds_to_balance() {
        assert_eq!(next_balance(MovementType::Entry, 30, 50).unwrap(), 80);
    }

    #[test]
    fn exit_subtracts_from_balance() {
        assert_eq!(next_balance(MovementType::Exit, 30, 80).unwrap(), 50);
    }

    #[test]
    fn adjustment_sets_absolute_balance() {
        assert_eq!(next_balance(MovementType::Adjustment, 12, 80).unwrap(), 12);
        assert_eq!(next_balance(MovementType::Adjustment, 0, 80).unwrap(), 0);
    }

    #[test]
    fn exit_exceeding_balance_reports_available_quantity() {
        let err = next_balance(MovementType::Exit, 100, 80).unwrap_err();
        assert_eq!(err, DomainError::InsufficientStock { available: 80 });
    }

    #[test]
    fn exit_of_exact_balance_is_accepted() {
        assert_eq!(next_balance(MovementType::Exit, 80, 80).unwrap(), 0);
    }

    #[test]
    fn non_positive_quantities_are_rejected() {
        assert!(next_balance(MovementType::Entry, 0, 10).is_err());
        assert!(next_balance(MovementType::Entry, -3, 10).is_err());
        assert!(next_balance(MovementType::Exit, -5, 10).is_err());
        assert!(next_balance(MovementType::Adjustment, -1, 10).is_err());
    }

    #[test]
    fn exit_without_reason_is_rejected() {
        let mut d = draft(MovementType::Exit, 5);
        d.reason = None;
        assert!(d.validate().is_err());
    }

    #[test]
    fn reason_on_entry_is_dropped_at_acceptance() {
        let mut d = draft(MovementType::Entry, 5);
        d.reason = Some(ExitReason::Transfer);
        assert!(d.validate().is_ok());

        let movement = d.accept(MovementId::new(), Utc::now());
        assert_eq!(movement.reason, None);
    }

    #[test]
    fn blank_notes_collapse_to_none() {
        let mut d = draft(MovementType::Entry, 5);
        d.notes = Some("   ".to_string());
        let movement = d.accept(MovementId::new(), Utc::now());
        assert_eq!(movement.notes, None);
    }

    #[test]
    fn negative_unit_price_is_rejected() {
        let mut d = draft(MovementType::Entry, 5);
        d.unit_price = Some(-100);
        assert!(d.validate().is_err());
    }

    #[test]
    fn movement_types_round_trip_through_str() {
        for t in [
            MovementType::Entry,
            MovementType::Exit,
            MovementType::Adjustment,
        ] {
            assert_eq!(MovementType::parse(t.as_str()).unwrap(), t);
        }
        for r in [ExitReason::Sale, ExitReason::Transfer, ExitReason::InternalUse] {
            assert_eq!(ExitReason::parse(r.as_str()).unwrap(), r);
        }
        assert!(MovementType::parse("entry").is_err());
        assert!(ExitReason::parse("RESALE").is_err());
    }

    /// An attempted movement for the property tests below.
    #[derive(Debug, Clone)]
    struct Attempt {
        movement_type: MovementType,
        quantity: i64,
    }

    fn attempt_strategy() -> impl Strategy<Value = Attempt> {
        (0..3u8, -20i64..200i64).prop_map(|(kind, quantity)| Attempt {
            movement_type: match kind {
                0 => MovementType::Entry,
                1 => MovementType::Exit,
                _ => MovementType::Adjustment,
            },
            quantity,
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Replaying the accepted movements from the initial balance
        /// reproduces the running balance at every step, and the balance is
        /// never negative.
        #[test]
        fn accepted_movements_fold_to_the_cached_balance(
            initial in 0i64..100,
            attempts in prop::collection::vec(attempt_strategy(), 1..50)
        ) {
            let product_id = ProductId::new();
            let user_id = UserId::new();
            let mut balance = initial;
            let mut accepted: Vec<StockMovement> = Vec::new();

            for attempt in attempts {
                match next_balance(attempt.movement_type, attempt.quantity, balance) {
                    Ok(next) => {
                        balance = next;
                        accepted.push(
                            MovementDraft {
                                product_id,
                                user_id,
                                movement_type: attempt.movement_type,
                                quantity: attempt.quantity,
                                reason: match attempt.movement_type {
                                    MovementType::Exit => Some(ExitReason::Sale),
                                    _ => None,
                                },
                                unit_price: None,
                                notes: None,
                            }
                            .accept(MovementId::new(), Utc::now()),
                        );
                    }
                    Err(_) => {
                        // Rejected attempts must leave no trace; the running
                        // balance is unchanged by construction.
                    }
                }

                prop_assert!(balance >= 0);
                prop_assert_eq!(fold_balance(initial, &accepted).unwrap(), balance);
            }
        }

        /// An exit never drives the balance negative, whatever the
        /// interleaving of accepted movements before it.
        #[test]
        fn exits_never_drive_balance_negative(
            initial in 0i64..100,
            quantities in prop::collection::vec(1i64..50, 1..30)
        ) {
            let mut balance = initial;
            for quantity in quantities {
                match next_balance(MovementType::Exit, quantity, balance) {
                    Ok(next) => balance = next,
                    Err(DomainError::InsufficientStock { available }) => {
                        prop_assert_eq!(available, balance);
                    }
                    Err(other) => prop_assert!(false, "unexpected error: {:?}", other),
                }
                prop_assert!(balance >= 0);
            }
        }
    }
}
