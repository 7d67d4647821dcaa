//! Appointment financial adjustment.
//!
//! When a billing edit changes an appointment's fee or write-off, the
//! appointment carries a running adjustment amount reconciling the history of
//! edits. The adjustment is delta-accumulated — each edit adds
//! `(fee change) - (write-off change)` to the prior value — and is never
//! reset to an absolute figure except on first write. Sequential deltas
//! telescope, so the accumulated adjustment always equals
//! `(current fee - original fee) - (current write-off - original write-off)`.
//!
//! [`apply_billing_edit`] is pure: it reads the current state and the
//! proposed edit, and reports the next state plus which dimensions changed.
//! Persistence (and the read-modify-write discipline the delta semantics
//! demand) lives in [`crate::store`].
//!
//! All money is [`rust_decimal::Decimal`]; comparisons are numeric, never
//! string equality.

use rust_decimal::Decimal;
use serde::Serialize;

// ── State types ─────────────────────────────────────────────────────────────

/// The billing fields carried on a persisted appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BillingState {
    /// The billed amount for the appointment.
    pub fee: Decimal,
    /// Amount deliberately not billed.
    pub write_off: Decimal,
    /// Cumulative running adjustment; `None` until the first adjusting edit.
    pub adjustment: Option<Decimal>,
    /// The billed service/code, independently mutable.
    pub service_id: String,
}

/// A proposed billing edit, already parsed to decimals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingEdit {
    pub fee: Decimal,
    pub write_off: Decimal,
    /// New service id, when the request carries one.
    pub service_id: Option<String>,
}

/// The computed result of a billing edit: the next state plus which
/// dimensions changed, so callers can issue narrow writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingOutcome {
    pub state: BillingState,
    /// Fee or write-off changed, so the adjustment was recomputed.
    pub amounts_changed: bool,
    /// The service id changed.
    pub service_changed: bool,
}

impl BillingOutcome {
    /// Nothing to persist: the edit matched the current state exactly.
    pub fn is_noop(&self) -> bool {
        !self.amounts_changed && !self.service_changed
    }
}

// ── apply_billing_edit ──────────────────────────────────────────────────────

/// Compute the next billing state for a proposed edit.
///
/// Two paths, decided by numeric comparison of the proposed fee/write-off
/// against the current values:
///
/// - **Service-only**: both amounts unchanged. Fee, write-off, and adjustment
///   are left untouched; only the service id may change. This keeps a
///   service-code correction from perturbing the financial fields.
/// - **Adjustment**: either amount changed. The raw delta
///   `(fee_new - fee_old) - (write_off_new - write_off_old)` is added to the
///   prior adjustment (absent treated as zero) and the new fee/write-off are
///   taken as given.
///
/// A service id in the edit is applied on **both** paths — a combined
/// fee+service edit persists both changes.
///
/// Applying an edit equal to the current state is a no-op on the financial
/// fields, and sequential edits accumulate additively: deltas d1 then d2 end
/// at the same adjustment as a single d1+d2 edit.
pub fn apply_billing_edit(current: &BillingState, edit: &BillingEdit) -> BillingOutcome {
    let amounts_changed = edit.fee != current.fee || edit.write_off != current.write_off;

    let service_id = match &edit.service_id {
        Some(id) => id.clone(),
        None => current.service_id.clone(),
    };
    let service_changed = service_id != current.service_id;

    let state = if amounts_changed {
        let raw_delta = (edit.fee - current.fee) - (edit.write_off - current.write_off);
        BillingState {
            fee: edit.fee,
            write_off: edit.write_off,
            adjustment: Some(current.adjustment.unwrap_or_default() + raw_delta),
            service_id,
        }
    } else {
        BillingState {
            fee: current.fee,
            write_off: current.write_off,
            adjustment: current.adjustment,
            service_id,
        }
    };

    BillingOutcome {
        state,
        amounts_changed,
        service_changed,
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn state(fee: &str, write_off: &str, adjustment: Option<&str>) -> BillingState {
        BillingState {
            fee: dec(fee),
            write_off: dec(write_off),
            adjustment: adjustment.map(dec),
            service_id: "90834".to_string(),
        }
    }

    #[test]
    fn identical_edit_is_noop_on_financial_fields() {
        let current = state("150.00", "25.00", Some("10.00"));
        let edit = BillingEdit {
            fee: dec("150.00"),
            write_off: dec("25.00"),
            service_id: None,
        };
        let outcome = apply_billing_edit(&current, &edit);
        assert!(!outcome.amounts_changed);
        assert!(outcome.is_noop());
        assert_eq!(outcome.state, current);
    }

    #[test]
    fn service_only_edit_leaves_amounts_untouched() {
        let current = state("150.00", "25.00", Some("10.00"));
        let edit = BillingEdit {
            fee: dec("150.00"),
            write_off: dec("25.00"),
            service_id: Some("90837".to_string()),
        };
        let outcome = apply_billing_edit(&current, &edit);
        assert!(!outcome.amounts_changed);
        assert!(outcome.service_changed);
        assert_eq!(outcome.state.fee, current.fee);
        assert_eq!(outcome.state.write_off, current.write_off);
        assert_eq!(outcome.state.adjustment, current.adjustment);
        assert_eq!(outcome.state.service_id, "90837");
    }

    #[test]
    fn fee_increase_accumulates_adjustment() {
        let current = state("150.00", "0.00", None);
        let edit = BillingEdit {
            fee: dec("175.00"),
            write_off: dec("0.00"),
            service_id: None,
        };
        let outcome = apply_billing_edit(&current, &edit);
        assert!(outcome.amounts_changed);
        assert_eq!(outcome.state.fee, dec("175.00"));
        assert_eq!(outcome.state.adjustment, Some(dec("25.00")));
    }

    #[test]
    fn write_off_increase_subtracts_from_adjustment() {
        let current = state("150.00", "0.00", Some("5.00"));
        let edit = BillingEdit {
            fee: dec("150.00"),
            write_off: dec("30.00"),
            service_id: None,
        };
        let outcome = apply_billing_edit(&current, &edit);
        assert_eq!(outcome.state.adjustment, Some(dec("-25.00")));
        assert_eq!(outcome.state.write_off, dec("30.00"));
    }

    #[test]
    fn absent_adjustment_is_treated_as_zero() {
        let current = state("100.00", "10.00", None);
        let edit = BillingEdit {
            fee: dec("90.00"),
            write_off: dec("10.00"),
            service_id: None,
        };
        let outcome = apply_billing_edit(&current, &edit);
        assert_eq!(outcome.state.adjustment, Some(dec("-10.00")));
    }

    #[test]
    fn combined_fee_and_service_edit_persists_both() {
        let current = state("150.00", "0.00", None);
        let edit = BillingEdit {
            fee: dec("160.00"),
            write_off: dec("0.00"),
            service_id: Some("90791".to_string()),
        };
        let outcome = apply_billing_edit(&current, &edit);
        assert!(outcome.amounts_changed);
        assert!(outcome.service_changed);
        assert_eq!(outcome.state.service_id, "90791");
        assert_eq!(outcome.state.adjustment, Some(dec("10.00")));
    }

    // Money amounts in cents, kept small enough that sums never overflow.
    fn amount() -> impl Strategy<Value = Decimal> {
        (0i64..1_000_000).prop_map(|cents| Decimal::new(cents, 2))
    }

    fn signed_amount() -> impl Strategy<Value = Decimal> {
        (-1_000_000i64..1_000_000).prop_map(|cents| Decimal::new(cents, 2))
    }

    proptest! {
        #[test]
        fn idempotent_for_all_states(
            fee in amount(),
            write_off in amount(),
            adjustment in proptest::option::of(signed_amount()),
        ) {
            let current = BillingState {
                fee,
                write_off,
                adjustment,
                service_id: "90834".to_string(),
            };
            let edit = BillingEdit { fee, write_off, service_id: None };
            let outcome = apply_billing_edit(&current, &edit);
            prop_assert!(outcome.is_noop());
            prop_assert_eq!(outcome.state, current);
        }

        #[test]
        fn sequential_deltas_are_additive(
            fee0 in amount(),
            write_off0 in amount(),
            adjustment0 in proptest::option::of(signed_amount()),
            fee1 in amount(),
            write_off1 in amount(),
            fee2 in amount(),
            write_off2 in amount(),
        ) {
            let start = BillingState {
                fee: fee0,
                write_off: write_off0,
                adjustment: adjustment0,
                service_id: "90834".to_string(),
            };

            // Two sequential edits...
            let step1 = apply_billing_edit(&start, &BillingEdit {
                fee: fee1,
                write_off: write_off1,
                service_id: None,
            });
            let step2 = apply_billing_edit(&step1.state, &BillingEdit {
                fee: fee2,
                write_off: write_off2,
                service_id: None,
            });

            // ...accumulate the same adjustment as one combined edit.
            let combined = apply_billing_edit(&start, &BillingEdit {
                fee: fee2,
                write_off: write_off2,
                service_id: None,
            });

            let base = adjustment0.unwrap_or_default();
            let expected = base + (fee2 - fee0) - (write_off2 - write_off0);
            prop_assert_eq!(
                step2.state.adjustment.unwrap_or(base),
                expected
            );
            prop_assert_eq!(
                combined.state.adjustment.unwrap_or(base),
                expected
            );
        }
    }
}
