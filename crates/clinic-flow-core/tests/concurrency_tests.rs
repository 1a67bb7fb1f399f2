//! Races between separate connections to one store file.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use tempfile::TempDir;

use clinic_flow_core::clock::FixedClock;
use clinic_flow_core::db::Database;
use clinic_flow_core::error::FlowError;
use clinic_flow_core::models::{
    Appointment, AppointmentStatus, OfferingType, StaffMember, StaffRole, VisitType,
    WaitingRoomEntry,
};
use clinic_flow_core::sync::{StaticAppointmentSource, SyncEngine};
use clinic_flow_core::ResourceAllocator;

const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

fn at(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

fn store(dir: &TempDir) -> PathBuf {
    dir.path().join("clinic.db")
}

fn connect(path: &Path) -> Database {
    Database::open_with_timeout(path, BUSY_TIMEOUT).unwrap()
}

#[test]
fn test_concurrent_assign_single_winner() {
    let dir = TempDir::new().unwrap();
    let path = store(&dir);

    let vet = StaffMember::new("Dr. Vega".to_string(), StaffRole::Veterinarian);
    let e1 = WaitingRoomEntry::new("c1".into(), "p1".into(), VisitType::Medical, at(9, 0));
    let e2 = WaitingRoomEntry::new("c2".into(), "p2".into(), VisitType::Medical, at(9, 0));
    {
        let db = connect(&path);
        db.upsert_staff(&vet).unwrap();
        db.insert_entry(&e1).unwrap();
        db.insert_entry(&e2).unwrap();
    }

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = [e1.id.clone(), e2.id.clone()]
        .into_iter()
        .map(|entry_id| {
            let barrier = Arc::clone(&barrier);
            let path = path.clone();
            let staff_id = vet.id.clone();
            thread::spawn(move || {
                let db = connect(&path);
                let clock = FixedClock::new(at(9, 5));
                let allocator = ResourceAllocator::new(&db, &clock);
                barrier.wait();
                allocator.assign(&entry_id, &staff_id)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let wins = results.iter().filter(|r| r.is_ok()).count();
    let busy = results
        .iter()
        .filter(|r| matches!(r, Err(FlowError::ResourceUnavailable(_))))
        .count();
    assert_eq!(wins, 1, "results: {:?}", results);
    assert_eq!(busy, 1, "results: {:?}", results);

    // Exactly one entry holds the vet
    let db = connect(&path);
    let holders = [&e1.id, &e2.id]
        .iter()
        .filter(|id| {
            db.get_entry(id).unwrap().unwrap().assigned_staff_id.as_deref() == Some(vet.id.as_str())
        })
        .count();
    assert_eq!(holders, 1);
    assert!(!db.get_staff(&vet.id).unwrap().unwrap().available);
}

#[test]
fn test_concurrent_sync_creates_each_entry_once() {
    let dir = TempDir::new().unwrap();
    let path = store(&dir);
    drop(connect(&path));

    let appointments: Vec<Appointment> = (0..20)
        .map(|i| Appointment {
            id: format!("apt-{}", i),
            pet_id: Some(format!("pet-{}", i)),
            client_id: Some(format!("client-{}", i)),
            start_time: at(9 + i / 4, (i % 4) * 15),
            offering_type: if i % 3 == 0 {
                OfferingType::Grooming
            } else {
                OfferingType::Consultation
            },
            status: AppointmentStatus::Confirmed,
            reason: None,
            notes: None,
        })
        .collect();
    let source = Arc::new(StaticAppointmentSource::new(appointments));

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let barrier = Arc::clone(&barrier);
            let source = Arc::clone(&source);
            let path = path.clone();
            thread::spawn(move || {
                let db = connect(&path);
                let clock = FixedClock::new(at(8, 0));
                let engine = SyncEngine::new(&db, source.as_ref(), &clock);
                barrier.wait();
                engine.sync_today().unwrap()
            })
        })
        .collect();

    let reports: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let created: u32 = reports.iter().map(|r| r.created).sum();
    let existing: u32 = reports.iter().map(|r| r.skipped_existing).sum();
    assert_eq!(created, 20);
    assert_eq!(existing, 20);

    let db = connect(&path);
    assert_eq!(db.list_active_entries().unwrap().len(), 20);
}
