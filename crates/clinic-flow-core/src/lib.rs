//! Clinic-Flow Core Library
//!
//! Waiting-room orchestration for a veterinary clinic: a live queue, idempotent
//! materialization of today's appointments, single-assignment staff
//! allocation and the consultation/grooming session lifecycle.
//!
//! # Architecture
//!
//! ```text
//! Appointment Source ──► SyncEngine ──► [WAITING entry]
//!                                            │
//!                               ResourceAllocator.assign
//!                                            │
//!                           ServiceSessionController.start
//!                                            │
//!                                     [IN_PROGRESS]
//!                                            │
//!                           ServiceSessionController.finish ──► Billing notice
//!                                            │
//!                                      [COMPLETED] ──► WaitTimeAnalytics
//! ```
//!
//! Every mutation is one IMMEDIATE SQLite transaction that also appends a
//! hash-chained audit event.
//!
//! # Modules
//!
//! - [`db`]: SQLite store
//! - [`models`]: Domain types (WaitingRoomEntry, StaffMember, ServiceSession, etc.)
//! - [`queue`]: Waiting-room queue
//! - [`sync`]: Appointment sync
//! - [`allocator`]: Staff allocation
//! - [`session`]: Session lifecycle and billing notification
//! - [`analytics`]: Wait-time metrics
//! - [`audit`]: Transition history and chain verification
//! - [`export`]: Billing export

pub mod allocator;
pub mod analytics;
pub mod audit;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod models;
pub mod queue;
pub mod session;
pub mod sync;

// Re-export commonly used types
pub use allocator::ResourceAllocator;
pub use analytics::{DailySummary, WaitTimeAnalytics};
pub use audit::{AuditLog, ChainVerification};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::ClinicConfig;
pub use db::Database;
pub use error::{FlowError, FlowResult};
pub use export::BillingExporter;
pub use models::{
    Appointment, AppointmentStatus, EntryStatus, NewEntry, OfferingType, Pet, Priority,
    ServiceSession, StaffMember, StaffRole, VisitType, WaitingRoomEntry,
};
pub use queue::WaitingRoomQueue;
pub use session::{BillingNotice, BillingNotifier, NoopBillingNotifier, ServiceSessionController, SessionStart};
pub use sync::{AppointmentSource, StaticAppointmentSource, SyncEngine, SyncReport};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use chrono::{NaiveDate, NaiveDateTime};
use std::sync::{Arc, Mutex};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum ClinicFlowError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Appointment source error: {0}")]
    SourceError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Host callback error: {0}")]
    CallbackError(String),
}

impl From<uniffi::UnexpectedUniFFICallbackError> for ClinicFlowError {
    fn from(e: uniffi::UnexpectedUniFFICallbackError) -> Self {
        ClinicFlowError::CallbackError(e.reason)
    }
}

impl From<FlowError> for ClinicFlowError {
    fn from(e: FlowError) -> Self {
        match e {
            FlowError::NotFound(m) => ClinicFlowError::NotFound(m),
            FlowError::InvalidState(m) => ClinicFlowError::InvalidState(m),
            FlowError::ResourceUnavailable(m) => ClinicFlowError::ResourceUnavailable(m),
            FlowError::DuplicateEntry(m) => ClinicFlowError::DuplicateEntry(m),
            FlowError::Validation(m) => ClinicFlowError::ValidationError(m),
            FlowError::Source(m) => ClinicFlowError::SourceError(m),
            FlowError::Database(e) => ClinicFlowError::DatabaseError(e.to_string()),
        }
    }
}

impl From<db::DbError> for ClinicFlowError {
    fn from(e: db::DbError) -> Self {
        ClinicFlowError::DatabaseError(e.to_string())
    }
}

impl From<serde_json::Error> for ClinicFlowError {
    fn from(e: serde_json::Error) -> Self {
        ClinicFlowError::SerializationError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for ClinicFlowError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        ClinicFlowError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Install the log subscriber. Returns false if one was already installed.
#[uniffi::export]
pub fn init_logging(level: String) -> bool {
    config::init_tracing(&level)
}

/// Open or create a clinic store at the given path, clinic time = UTC.
#[uniffi::export]
pub fn open_clinic(path: String) -> Result<Arc<ClinicFlowCore>, ClinicFlowError> {
    let db = Database::open(&path)?;
    Ok(ClinicFlowCore::wrap(db, SystemClock::new(0)))
}

/// Open a clinic store configured from environment variables.
#[uniffi::export]
pub fn open_clinic_from_env() -> Result<Arc<ClinicFlowCore>, ClinicFlowError> {
    let config = ClinicConfig::from_env().map_err(|e| ClinicFlowError::InvalidInput(e.to_string()))?;
    open_with_config(&config)
}

/// Install logging at the configured level, then open the configured store.
fn open_with_config(config: &ClinicConfig) -> Result<Arc<ClinicFlowCore>, ClinicFlowError> {
    config::init_tracing(&config.service.log_level);
    tracing::info!(
        service = %config.service.name,
        path = %config.database.path,
        "Opening clinic store"
    );
    let db = Database::open_with_timeout(&config.database.path, config.busy_timeout())?;
    Ok(ClinicFlowCore::wrap(
        db,
        SystemClock::new(config.clinic.utc_offset_minutes),
    ))
}

/// Create an in-memory store (for testing).
#[uniffi::export]
pub fn open_clinic_in_memory() -> Result<Arc<ClinicFlowCore>, ClinicFlowError> {
    let db = Database::open_in_memory()?;
    Ok(ClinicFlowCore::wrap(db, SystemClock::new(0)))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe clinic handle for FFI.
#[derive(uniffi::Object)]
pub struct ClinicFlowCore {
    db: Arc<Mutex<Database>>,
    clock: Box<dyn Clock>,
    billing: Mutex<Arc<dyn BillingNotifier>>,
}

impl ClinicFlowCore {
    fn billing(&self) -> Result<Arc<dyn BillingNotifier>, ClinicFlowError> {
        Ok(Arc::clone(&*self.billing.lock()?))
    }

    fn wrap(db: Database, clock: impl Clock + 'static) -> Arc<Self> {
        Arc::new(Self {
            db: Arc::new(Mutex::new(db)),
            clock: Box::new(clock),
            billing: Mutex::new(Arc::new(NoopBillingNotifier)),
        })
    }
}

#[uniffi::export]
impl ClinicFlowCore {
    /// Route finished-session notices to the host's billing system.
    pub fn set_billing_listener(
        &self,
        listener: Arc<dyn BillingListener>,
    ) -> Result<(), ClinicFlowError> {
        *self.billing.lock()? = Arc::new(ForeignBilling(listener));
        Ok(())
    }

    // =========================================================================
    // Registry Mirrors
    // =========================================================================

    /// Add or update a pet and its owners.
    pub fn upsert_pet(&self, pet: FfiPet) -> Result<(), ClinicFlowError> {
        let db = self.db.lock()?;
        db.upsert_pet(&pet.into())?;
        Ok(())
    }

    /// Add or update a staff member.
    pub fn upsert_staff(&self, staff: FfiStaffMember) -> Result<(), ClinicFlowError> {
        let db = self.db.lock()?;
        let staff = StaffMember::try_from(staff)?;
        db.upsert_staff(&staff)?;
        Ok(())
    }

    pub fn get_staff(&self, staff_id: String) -> Result<Option<FfiStaffMember>, ClinicFlowError> {
        let db = self.db.lock()?;
        Ok(db.get_staff(&staff_id)?.map(|s| s.into()))
    }

    // =========================================================================
    // Queue Operations
    // =========================================================================

    /// Register a walk-in.
    pub fn add_entry(&self, entry: FfiNewEntry) -> Result<FfiEntry, ClinicFlowError> {
        let db = self.db.lock()?;
        let queue = WaitingRoomQueue::new(&db, self.clock.as_ref());
        Ok(queue.add_entry(entry.try_into()?)?.into())
    }

    pub fn get_entry(&self, entry_id: String) -> Result<Option<FfiEntry>, ClinicFlowError> {
        let db = self.db.lock()?;
        let queue = WaitingRoomQueue::new(&db, self.clock.as_ref());
        Ok(queue.get(&entry_id)?.map(|e| e.into()))
    }

    /// Waiting and in-progress entries in service order.
    pub fn list_active(&self) -> Result<Vec<FfiEntry>, ClinicFlowError> {
        let db = self.db.lock()?;
        let queue = WaitingRoomQueue::new(&db, self.clock.as_ref());
        Ok(queue.list_active()?.into_iter().map(|e| e.into()).collect())
    }

    pub fn list_by_status(&self, status: String) -> Result<Vec<FfiEntry>, ClinicFlowError> {
        let status: EntryStatus = status.parse().map_err(ClinicFlowError::InvalidInput)?;
        let db = self.db.lock()?;
        let queue = WaitingRoomQueue::new(&db, self.clock.as_ref());
        Ok(queue.list_by_status(status)?.into_iter().map(|e| e.into()).collect())
    }

    /// Today's entries, newest first.
    pub fn today_history(&self) -> Result<Vec<FfiEntry>, ClinicFlowError> {
        let db = self.db.lock()?;
        let queue = WaitingRoomQueue::new(&db, self.clock.as_ref());
        Ok(queue.today_history()?.into_iter().map(|e| e.into()).collect())
    }

    /// Fuzzy search over pet names, reasons and notes.
    pub fn search_entries(&self, term: String) -> Result<Vec<FfiSearchHit>, ClinicFlowError> {
        let db = self.db.lock()?;
        let queue = WaitingRoomQueue::new(&db, self.clock.as_ref());
        Ok(queue
            .search(&term)?
            .into_iter()
            .map(|hit| FfiSearchHit {
                score: hit.score,
                entry: hit.entry.into(),
            })
            .collect())
    }

    pub fn cancel_entry(&self, entry_id: String, reason: String) -> Result<FfiEntry, ClinicFlowError> {
        let db = self.db.lock()?;
        let queue = WaitingRoomQueue::new(&db, self.clock.as_ref());
        Ok(queue.cancel(&entry_id, &reason)?.into())
    }

    pub fn update_priority(
        &self,
        entry_id: String,
        priority: String,
    ) -> Result<FfiEntry, ClinicFlowError> {
        let priority: Priority = priority.parse().map_err(ClinicFlowError::InvalidInput)?;
        let db = self.db.lock()?;
        let queue = WaitingRoomQueue::new(&db, self.clock.as_ref());
        Ok(queue.update_priority(&entry_id, priority)?.into())
    }

    pub fn append_note(&self, entry_id: String, text: String) -> Result<FfiEntry, ClinicFlowError> {
        let db = self.db.lock()?;
        let queue = WaitingRoomQueue::new(&db, self.clock.as_ref());
        Ok(queue.append_note(&entry_id, &text)?.into())
    }

    // =========================================================================
    // Sync Operations
    // =========================================================================

    /// Materialize today's appointments, as handed over by the host.
    pub fn sync_today(
        &self,
        appointments: Vec<FfiAppointment>,
    ) -> Result<FfiSyncReport, ClinicFlowError> {
        let (source, unreadable) = static_source(appointments);
        let db = self.db.lock()?;
        let engine = SyncEngine::new(&db, &source, self.clock.as_ref());
        let mut report = engine.sync_today()?;
        report.skipped_invalid += unreadable;
        Ok(report.into())
    }

    /// Sync, then return the queue as one employee sees it.
    pub fn sync_today_for_employee(
        &self,
        appointments: Vec<FfiAppointment>,
        employee_id: String,
        for_groomer: bool,
    ) -> Result<FfiEmployeeQueue, ClinicFlowError> {
        let (source, unreadable) = static_source(appointments);
        let db = self.db.lock()?;
        let engine = SyncEngine::new(&db, &source, self.clock.as_ref());
        let mut view = engine.sync_today_for_employee(&employee_id, for_groomer)?;
        view.report.skipped_invalid += unreadable;
        Ok(FfiEmployeeQueue {
            report: view.report.into(),
            entries: view.entries.into_iter().map(|e| e.into()).collect(),
        })
    }

    // =========================================================================
    // Allocation & Session Operations
    // =========================================================================

    pub fn assign_staff(&self, entry_id: String, staff_id: String) -> Result<FfiEntry, ClinicFlowError> {
        let db = self.db.lock()?;
        let allocator = ResourceAllocator::new(&db, self.clock.as_ref());
        Ok(allocator.assign(&entry_id, &staff_id)?.into())
    }

    pub fn start_session(&self, entry_id: String) -> Result<FfiSessionStart, ClinicFlowError> {
        let billing = self.billing()?;
        let db = self.db.lock()?;
        let controller = ServiceSessionController::new(&db, self.clock.as_ref(), billing.as_ref());
        let started = controller.start(&entry_id)?;
        Ok(FfiSessionStart {
            session: started.session.into(),
            unstaffed: started.unstaffed,
        })
    }

    pub fn finish_session(
        &self,
        session_id: String,
        outcome: Option<String>,
    ) -> Result<FfiEntry, ClinicFlowError> {
        let billing = self.billing()?;
        let db = self.db.lock()?;
        let controller = ServiceSessionController::new(&db, self.clock.as_ref(), billing.as_ref());
        Ok(controller
            .finish_with_outcome(&session_id, outcome.as_deref())?
            .into())
    }

    pub fn sessions_for_staff(&self, staff_id: String) -> Result<Vec<FfiSession>, ClinicFlowError> {
        let billing = self.billing()?;
        let db = self.db.lock()?;
        let controller = ServiceSessionController::new(&db, self.clock.as_ref(), billing.as_ref());
        Ok(controller
            .sessions_for_staff(&staff_id)?
            .into_iter()
            .map(|s| s.into())
            .collect())
    }

    pub fn entries_for_staff(&self, staff_id: String) -> Result<Vec<FfiEntry>, ClinicFlowError> {
        let billing = self.billing()?;
        let db = self.db.lock()?;
        let controller = ServiceSessionController::new(&db, self.clock.as_ref(), billing.as_ref());
        Ok(controller
            .entries_for_staff(&staff_id)?
            .into_iter()
            .map(|e| e.into())
            .collect())
    }

    // =========================================================================
    // Analytics
    // =========================================================================

    /// Average wait for a day given as `YYYY-MM-DD`.
    pub fn average_wait_minutes(&self, day: String) -> Result<f64, ClinicFlowError> {
        let day = parse_day(&day)?;
        let db = self.db.lock()?;
        let analytics = WaitTimeAnalytics::new(&db, self.clock.as_ref());
        Ok(analytics.average_wait_minutes(day)?)
    }

    pub fn count_by_status(&self, status: String) -> Result<u64, ClinicFlowError> {
        let status: EntryStatus = status.parse().map_err(ClinicFlowError::InvalidInput)?;
        let db = self.db.lock()?;
        let analytics = WaitTimeAnalytics::new(&db, self.clock.as_ref());
        Ok(analytics.count_by_status(status)?)
    }

    pub fn today_count(&self) -> Result<u64, ClinicFlowError> {
        let db = self.db.lock()?;
        let analytics = WaitTimeAnalytics::new(&db, self.clock.as_ref());
        Ok(analytics.today_count()?)
    }

    pub fn daily_summary(&self, day: String) -> Result<FfiDailySummary, ClinicFlowError> {
        let day = parse_day(&day)?;
        let db = self.db.lock()?;
        let analytics = WaitTimeAnalytics::new(&db, self.clock.as_ref());
        Ok(analytics.daily_summary(day)?.into())
    }

    // =========================================================================
    // Audit & Export
    // =========================================================================

    pub fn entry_history(&self, entry_id: String) -> Result<Vec<FfiEntryEvent>, ClinicFlowError> {
        let db = self.db.lock()?;
        let audit = AuditLog::new(&db);
        Ok(audit.history(&entry_id)?.into_iter().map(|e| e.into()).collect())
    }

    pub fn verify_audit_chain(&self) -> Result<FfiChainVerification, ClinicFlowError> {
        let db = self.db.lock()?;
        let result = AuditLog::new(&db).verify()?;
        Ok(FfiChainVerification {
            valid: result.valid,
            events_checked: result.events_checked,
            first_broken_seq: result.first_broken_seq,
        })
    }

    /// Billing export for a day as JSON.
    pub fn export_billing_json(&self, day: String) -> Result<String, ClinicFlowError> {
        let day = parse_day(&day)?;
        let db = self.db.lock()?;
        let exporter = BillingExporter::new(&db, self.clock.as_ref());
        Ok(exporter.export_day(day)?.to_json()?)
    }

    /// Billing export for a day as CSV.
    pub fn export_billing_csv(&self, day: String) -> Result<String, ClinicFlowError> {
        let day = parse_day(&day)?;
        let db = self.db.lock()?;
        let exporter = BillingExporter::new(&db, self.clock.as_ref());
        Ok(exporter.export_day(day)?.to_csv())
    }
}

/// Appointments the host handed over, plus how many could not be read.
fn static_source(appointments: Vec<FfiAppointment>) -> (StaticAppointmentSource, u32) {
    let mut readable = Vec::with_capacity(appointments.len());
    let mut unreadable = 0;
    for appointment in appointments {
        let appointment_id = appointment.appointment_id.clone();
        match Appointment::try_from(appointment) {
            Ok(appointment) => readable.push(appointment),
            Err(e) => {
                tracing::warn!(%appointment_id, error = %e, "Skipping unreadable appointment");
                unreadable += 1;
            }
        }
    }
    (StaticAppointmentSource::new(readable), unreadable)
}

fn parse_day(s: &str) -> Result<NaiveDate, ClinicFlowError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| ClinicFlowError::InvalidInput(format!("Invalid day: {}", s)))
}

fn parse_timestamp(s: &str) -> Result<NaiveDateTime, ClinicFlowError> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M"))
        .map_err(|_| ClinicFlowError::InvalidInput(format!("Invalid timestamp: {}", s)))
}

fn format_timestamp(t: NaiveDateTime) -> String {
    t.format("%Y-%m-%dT%H:%M:%S").to_string()
}

// =========================================================================
// Host Callbacks
// =========================================================================

/// Billing system on the host side, told about every finished session.
///
/// Called after the finish has committed. An error is logged and does not
/// undo the finish.
#[uniffi::export(with_foreign)]
pub trait BillingListener: Send + Sync {
    fn session_finished(&self, notice: FfiBillingNotice) -> Result<(), ClinicFlowError>;
}

struct ForeignBilling(Arc<dyn BillingListener>);

impl BillingNotifier for ForeignBilling {
    fn session_finished(&self, notice: &BillingNotice) -> anyhow::Result<()> {
        self.0.session_finished(notice.clone().into())?;
        Ok(())
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe pet.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPet {
    pub pet_id: String,
    pub name: String,
    pub species: String,
    pub owner_ids: Vec<String>,
}

impl From<FfiPet> for Pet {
    fn from(pet: FfiPet) -> Self {
        Pet {
            id: pet.pet_id,
            name: pet.name,
            species: pet.species,
            owner_ids: pet.owner_ids,
        }
    }
}

/// FFI-safe staff member.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiStaffMember {
    pub staff_id: String,
    pub name: String,
    pub role: String,
    pub available: bool,
}

impl From<StaffMember> for FfiStaffMember {
    fn from(staff: StaffMember) -> Self {
        Self {
            staff_id: staff.id,
            name: staff.name,
            role: staff.role.as_str().to_string(),
            available: staff.available,
        }
    }
}

impl TryFrom<FfiStaffMember> for StaffMember {
    type Error = ClinicFlowError;

    fn try_from(staff: FfiStaffMember) -> Result<Self, Self::Error> {
        Ok(StaffMember {
            id: staff.staff_id,
            name: staff.name,
            role: staff.role.parse().map_err(ClinicFlowError::InvalidInput)?,
            available: staff.available,
        })
    }
}

/// FFI-safe walk-in request.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNewEntry {
    pub client_id: String,
    pub pet_id: String,
    pub visit_type: String,
    pub reason_for_visit: Option<String>,
    pub notes: Option<String>,
    /// Defaults to normal
    pub priority: Option<String>,
}

impl TryFrom<FfiNewEntry> for NewEntry {
    type Error = ClinicFlowError;

    fn try_from(entry: FfiNewEntry) -> Result<Self, Self::Error> {
        let priority = match entry.priority {
            Some(p) => p.parse().map_err(ClinicFlowError::InvalidInput)?,
            None => Priority::default(),
        };
        Ok(NewEntry {
            client_id: entry.client_id,
            pet_id: entry.pet_id,
            visit_type: entry.visit_type.parse().map_err(ClinicFlowError::InvalidInput)?,
            reason_for_visit: entry.reason_for_visit,
            notes: entry.notes,
            priority,
        })
    }
}

/// FFI-safe waiting-room entry.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiEntry {
    pub entry_id: String,
    pub client_id: String,
    pub pet_id: String,
    pub arrival_time: String,
    pub visit_type: String,
    pub status: String,
    pub priority: String,
    pub assigned_staff_id: Option<String>,
    pub reason_for_visit: Option<String>,
    pub notes: Option<String>,
    pub consultation_started_at: Option<String>,
    pub completed_at: Option<String>,
}

impl From<WaitingRoomEntry> for FfiEntry {
    fn from(entry: WaitingRoomEntry) -> Self {
        Self {
            entry_id: entry.id,
            client_id: entry.client_id,
            pet_id: entry.pet_id,
            arrival_time: format_timestamp(entry.arrival_time),
            visit_type: entry.visit_type.as_str().to_string(),
            status: entry.status.as_str().to_string(),
            priority: entry.priority.as_str().to_string(),
            assigned_staff_id: entry.assigned_staff_id,
            reason_for_visit: entry.reason_for_visit,
            notes: entry.notes,
            consultation_started_at: entry.consultation_started_at.map(format_timestamp),
            completed_at: entry.completed_at.map(format_timestamp),
        }
    }
}

/// FFI-safe search hit.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSearchHit {
    pub entry: FfiEntry,
    pub score: f64,
}

/// FFI-safe appointment handed over by the host's booking system.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAppointment {
    pub appointment_id: String,
    pub pet_id: Option<String>,
    pub client_id: Option<String>,
    /// `YYYY-MM-DDTHH:MM:SS`, clinic-local
    pub start_time: String,
    pub offering_type: String,
    pub status: String,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

impl TryFrom<FfiAppointment> for Appointment {
    type Error = ClinicFlowError;

    fn try_from(a: FfiAppointment) -> Result<Self, Self::Error> {
        Ok(Appointment {
            start_time: parse_timestamp(&a.start_time)?,
            offering_type: a.offering_type.parse().map_err(ClinicFlowError::InvalidInput)?,
            status: a.status.parse().map_err(ClinicFlowError::InvalidInput)?,
            id: a.appointment_id,
            pet_id: a.pet_id,
            client_id: a.client_id,
            reason: a.reason,
            notes: a.notes,
        })
    }
}

/// FFI-safe billing notice.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiBillingNotice {
    pub session_id: String,
    pub entry_id: String,
    pub pet_id: String,
    pub staff_id: Option<String>,
    pub visit_type: String,
    pub finished_at: String,
}

impl From<BillingNotice> for FfiBillingNotice {
    fn from(notice: BillingNotice) -> Self {
        Self {
            session_id: notice.session_id,
            entry_id: notice.entry_id,
            pet_id: notice.pet_id,
            staff_id: notice.staff_id,
            visit_type: notice.visit_type.as_str().to_string(),
            finished_at: format_timestamp(notice.finished_at),
        }
    }
}

/// FFI-safe sync report.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSyncReport {
    pub created: u32,
    pub skipped_existing: u32,
    pub skipped_invalid: u32,
}

impl From<SyncReport> for FfiSyncReport {
    fn from(report: SyncReport) -> Self {
        Self {
            created: report.created,
            skipped_existing: report.skipped_existing,
            skipped_invalid: report.skipped_invalid,
        }
    }
}

/// FFI-safe employee queue view.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiEmployeeQueue {
    pub report: FfiSyncReport,
    pub entries: Vec<FfiEntry>,
}

/// FFI-safe service session.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSession {
    pub session_id: String,
    pub entry_id: String,
    pub pet_id: String,
    pub staff_id: Option<String>,
    pub visit_type: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub outcome: Option<String>,
}

impl From<ServiceSession> for FfiSession {
    fn from(session: ServiceSession) -> Self {
        Self {
            session_id: session.id,
            entry_id: session.entry_id,
            pet_id: session.pet_id,
            staff_id: session.staff_id,
            visit_type: session.visit_type.as_str().to_string(),
            started_at: format_timestamp(session.started_at),
            finished_at: session.finished_at.map(format_timestamp),
            outcome: session.outcome,
        }
    }
}

/// FFI-safe session start.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSessionStart {
    pub session: FfiSession,
    /// True when no staff member was assigned
    pub unstaffed: bool,
}

/// FFI-safe daily summary.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDailySummary {
    pub day: String,
    pub total: u64,
    pub waiting: u64,
    pub in_progress: u64,
    pub completed: u64,
    pub cancelled: u64,
    pub average_wait_minutes: f64,
}

impl From<DailySummary> for FfiDailySummary {
    fn from(summary: DailySummary) -> Self {
        Self {
            day: summary.day.format("%Y-%m-%d").to_string(),
            total: summary.total,
            waiting: summary.waiting,
            in_progress: summary.in_progress,
            completed: summary.completed,
            cancelled: summary.cancelled,
            average_wait_minutes: summary.average_wait_minutes,
        }
    }
}

/// FFI-safe audit event.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiEntryEvent {
    pub seq: i64,
    pub entry_id: String,
    pub event: String,
    pub from_status: Option<String>,
    pub to_status: String,
    pub detail: Option<String>,
    pub at: String,
    pub hash: String,
}

impl From<db::EntryEvent> for FfiEntryEvent {
    fn from(event: db::EntryEvent) -> Self {
        Self {
            seq: event.seq,
            entry_id: event.payload.entry_id,
            event: event.payload.event.as_str().to_string(),
            from_status: event.payload.from_status.map(|s| s.as_str().to_string()),
            to_status: event.payload.to_status.as_str().to_string(),
            detail: event.payload.detail,
            at: format_timestamp(event.payload.at),
            hash: event.hash,
        }
    }
}

/// FFI-safe chain verification result.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiChainVerification {
    pub valid: bool,
    pub events_checked: u64,
    pub first_broken_seq: Option<i64>,
}
