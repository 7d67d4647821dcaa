//! Appointment persistence seam and the billing-edit service.
//!
//! The engine never reaches for ambient database access: callers inject an
//! [`AppointmentStore`] and the service drives a read-modify-write against
//! it. Updates are version-checked (compare-and-swap on the record's
//! `version`), closing the lost-update race two concurrent billing edits
//! would otherwise hit — a blind retry of a delta write would double-apply
//! the delta, so a conflicting write is recomputed from a fresh read instead.
//!
//! [`MemoryStore`] is the in-process implementation used by tests and the
//! CLI; production backends implement the same trait over their database.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::billing::{apply_billing_edit, BillingState};
use crate::error::{EngineError, Result};
use crate::request::BillingEditRequest;

/// Re-reads before giving up when a version-checked write keeps losing.
const MAX_EDIT_ATTEMPTS: u32 = 3;

// ── Record ──────────────────────────────────────────────────────────────────

/// A persisted appointment, as read from and written to the store.
///
/// Field names in the serialized form match the wire contract
/// (`appointment_fee`, `write_off`, `adjustable_amount`, `service_id`).
/// `version` is storage bookkeeping for optimistic concurrency and never
/// leaves the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentRecord {
    pub id: String,
    #[serde(rename = "appointment_fee")]
    pub fee: Decimal,
    pub write_off: Decimal,
    #[serde(rename = "adjustable_amount")]
    pub adjustment: Option<Decimal>,
    pub service_id: String,
    /// Canonical recurrence rule string, when the appointment repeats.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence_rule: Option<String>,
    #[serde(skip)]
    pub version: u64,
}

impl AppointmentRecord {
    /// The billing fields, extracted for the pure adjuster.
    pub fn billing_state(&self) -> BillingState {
        BillingState {
            fee: self.fee,
            write_off: self.write_off,
            adjustment: self.adjustment,
            service_id: self.service_id.clone(),
        }
    }
}

// ── Store trait ─────────────────────────────────────────────────────────────

/// Read/update access to persisted appointments.
pub trait AppointmentStore: Send + Sync {
    /// Fetch a record by id. `Ok(None)` when the id does not resolve.
    fn get(&self, id: &str) -> Result<Option<AppointmentRecord>>;

    /// Version-checked write: persists `record` only if the stored version
    /// still equals `record.version`, bumping the version on success.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] if the id no longer resolves;
    /// [`EngineError::VersionConflict`] if a concurrent edit won the race.
    fn update(&self, record: AppointmentRecord) -> Result<AppointmentRecord>;
}

impl<S: AppointmentStore + ?Sized> AppointmentStore for &S {
    fn get(&self, id: &str) -> Result<Option<AppointmentRecord>> {
        (**self).get(id)
    }

    fn update(&self, record: AppointmentRecord) -> Result<AppointmentRecord> {
        (**self).update(record)
    }
}

impl<S: AppointmentStore + ?Sized> AppointmentStore for Arc<S> {
    fn get(&self, id: &str) -> Result<Option<AppointmentRecord>> {
        (**self).get(id)
    }

    fn update(&self, record: AppointmentRecord) -> Result<AppointmentRecord> {
        (**self).update(record)
    }
}

/// In-memory appointment store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, AppointmentRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record, as booking would. The stored version starts at 0.
    pub fn insert(&self, mut record: AppointmentRecord) -> AppointmentRecord {
        record.version = 0;
        let mut records = self.records.lock().expect("store mutex poisoned");
        records.insert(record.id.clone(), record.clone());
        record
    }
}

impl AppointmentStore for MemoryStore {
    fn get(&self, id: &str) -> Result<Option<AppointmentRecord>> {
        let records = self.records.lock().expect("store mutex poisoned");
        Ok(records.get(id).cloned())
    }

    fn update(&self, mut record: AppointmentRecord) -> Result<AppointmentRecord> {
        let mut records = self.records.lock().expect("store mutex poisoned");
        let stored = records
            .get(&record.id)
            .ok_or_else(|| EngineError::NotFound(record.id.clone()))?;
        if stored.version != record.version {
            return Err(EngineError::VersionConflict(record.id.clone()));
        }
        record.version += 1;
        records.insert(record.id.clone(), record.clone());
        Ok(record)
    }
}

// ── Billing service ─────────────────────────────────────────────────────────

/// Applies billing edits to persisted appointments.
pub struct BillingService<S> {
    store: S,
}

impl<S: AppointmentStore> BillingService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Apply a billing edit to the appointment `id`.
    ///
    /// Validates the request before touching any state (fail fast, no
    /// partial apply), then runs the read-compute-write cycle. A version
    /// conflict triggers a re-read and recompute rather than a blind retry
    /// of the stale write; after [`MAX_EDIT_ATTEMPTS`] losses the conflict
    /// surfaces to the caller.
    ///
    /// # Errors
    ///
    /// [`EngineError::Validation`] for unparsable amounts,
    /// [`EngineError::NotFound`] when the id does not resolve (no state is
    /// changed), [`EngineError::VersionConflict`] when retries are exhausted.
    pub fn apply_edit(&self, id: &str, request: &BillingEditRequest) -> Result<AppointmentRecord> {
        let edit = request.to_edit()?;

        for attempt in 1..=MAX_EDIT_ATTEMPTS {
            let record = self
                .store
                .get(id)?
                .ok_or_else(|| EngineError::NotFound(id.to_string()))?;

            let outcome = apply_billing_edit(&record.billing_state(), &edit);
            if outcome.is_noop() {
                debug!(appointment = id, "billing edit matched current state");
                return Ok(record);
            }

            let mut next = record;
            next.fee = outcome.state.fee;
            next.write_off = outcome.state.write_off;
            next.adjustment = outcome.state.adjustment;
            next.service_id = outcome.state.service_id.clone();

            match self.store.update(next) {
                Ok(updated) => {
                    if outcome.amounts_changed {
                        info!(
                            appointment = id,
                            fee = %updated.fee,
                            write_off = %updated.write_off,
                            adjustment = ?updated.adjustment,
                            "applied billing adjustment"
                        );
                    } else {
                        debug!(
                            appointment = id,
                            service = %updated.service_id,
                            "updated service code"
                        );
                    }
                    return Ok(updated);
                }
                Err(EngineError::VersionConflict(_)) if attempt < MAX_EDIT_ATTEMPTS => {
                    warn!(appointment = id, attempt, "billing edit lost a write race, re-reading");
                }
                Err(e) => return Err(e),
            }
        }

        Err(EngineError::VersionConflict(id.to_string()))
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn seeded() -> (MemoryStore, AppointmentRecord) {
        let store = MemoryStore::new();
        let record = store.insert(AppointmentRecord {
            id: "appt-1".to_string(),
            fee: dec("150.00"),
            write_off: dec("0.00"),
            adjustment: None,
            service_id: "90834".to_string(),
            recurrence_rule: None,
            version: 0,
        });
        (store, record)
    }

    #[test]
    fn update_bumps_version() {
        let (store, mut record) = seeded();
        record.fee = dec("175.00");
        let updated = store.update(record).unwrap();
        assert_eq!(updated.version, 1);
        assert_eq!(store.get("appt-1").unwrap().unwrap().fee, dec("175.00"));
    }

    #[test]
    fn stale_version_write_is_rejected() {
        let (store, stale) = seeded();

        // A concurrent edit lands first.
        let mut fresh = stale.clone();
        fresh.fee = dec("175.00");
        store.update(fresh).unwrap();

        // The stale copy (version 0) must not clobber it.
        let mut late = stale;
        late.fee = dec("120.00");
        let err = store.update(late).unwrap_err();
        assert!(matches!(err, EngineError::VersionConflict(_)));
        assert_eq!(store.get("appt-1").unwrap().unwrap().fee, dec("175.00"));
    }

    #[test]
    fn update_of_missing_record_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update(AppointmentRecord {
                id: "ghost".to_string(),
                fee: dec("1.00"),
                write_off: dec("0.00"),
                adjustment: None,
                service_id: "90834".to_string(),
                recurrence_rule: None,
                version: 0,
            })
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }
}
