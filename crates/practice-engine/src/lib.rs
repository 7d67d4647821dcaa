//! # practice-engine
//!
//! Deterministic scheduling and billing computation for a practice-management
//! system.
//!
//! Two cores, both pure functions over explicit inputs:
//!
//! - [`recurrence`] — recurrence selection → canonical `KEY=VALUE;...` rule
//!   string, persisted with repeating appointments and availability blocks
//! - [`billing`] — fee/write-off edits → delta-accumulated adjustment amount
//!
//! Around them, the seams the rest of the system plugs into:
//!
//! - [`request`] — wire-shape request types and validated conversion
//! - [`store`] — appointment persistence trait, version-checked updates, and
//!   the billing-edit service
//! - [`error`] — error types

pub mod billing;
pub mod error;
pub mod recurrence;
pub mod request;
pub mod store;

pub use billing::{apply_billing_edit, BillingEdit, BillingOutcome, BillingState};
pub use error::{EngineError, Result};
pub use recurrence::{
    build_rule, EndCondition, Frequency, MonthlyPattern, RecurrenceRule, RecurrenceSelection,
    WeekdayCode,
};
pub use request::{Amount, BillingEditRequest, BuildRuleRequest, EndValue};
pub use store::{AppointmentRecord, AppointmentStore, BillingService, MemoryStore};
