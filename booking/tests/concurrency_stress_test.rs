//! Concurrency stress tests for last-seat scenarios.
//!
//! These tests verify that under heavy concurrent load the admission path
//! never commits more appointments to a slot than its limits allow.
//!
//! Run with: `cargo test --test concurrency_stress_test -- --nocapture`

#![allow(clippy::expect_used, clippy::unwrap_used)] // Test code can use unwrap/expect

use autoshop_booking::{
    Admitted, BookingApp, BookingConfig, BookingError, BookingRequest, CustomerInput, Stores,
    VehicleInput,
};
use autoshop_core::ids::ServiceId;
use autoshop_core::schedule::Setting;
use autoshop_testing::fixtures::{self, OIL_CHANGE, TIRE_ROTATION};
use autoshop_testing::stores::{
    InMemoryAppointmentStore, InMemoryCatalogStore, InMemoryCustomerStore, InMemorySettingsStore,
    InMemoryStaffStore,
};
use autoshop_testing::{test_clock, RecordingNotifier};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

fn app(total_capacity: u32) -> (BookingApp, Arc<InMemoryAppointmentStore>) {
    let appointments = Arc::new(InMemoryAppointmentStore::new());
    let stores = Stores {
        catalog: Arc::new(InMemoryCatalogStore::demo().unwrap()),
        settings: Arc::new(InMemorySettingsStore::new(Setting {
            total_capacity,
            ..fixtures::setting()
        })),
        appointments: Arc::clone(&appointments) as _,
        customers: Arc::new(InMemoryCustomerStore::new()),
        staff: Arc::new(InMemoryStaffStore::new(fixtures::staff())),
    };
    let app = BookingApp::new(
        stores,
        Arc::new(RecordingNotifier::new()),
        Arc::new(test_clock()),
        &BookingConfig::default(),
    );
    (app, appointments)
}

fn request(n: usize, service: ServiceId) -> BookingRequest {
    let mut service_requirements = BTreeMap::new();
    if service == TIRE_ROTATION {
        service_requirements.insert(
            TIRE_ROTATION,
            BTreeMap::from([("tire_size".to_string(), json!("225/45R17"))]),
        );
    }
    BookingRequest {
        service_ids: vec![service],
        vehicle: VehicleInput {
            vehicle_type: "suv".to_string(),
            make: "Toyota".to_string(),
            model: "RAV4".to_string(),
            year: Some(2021),
            vin: None,
            tire_size: None,
        },
        service_requirements,
        date: "2024-06-12".to_string(),
        time: "10:00".to_string(),
        customer: CustomerInput {
            full_name: format!("Customer {n}"),
            phone: format!("555-{n:04}"),
            email: format!("customer{n}@example.com"),
            sms_updates: false,
        },
        notes: None,
    }
}

async fn race(app: &BookingApp, requests: Vec<BookingRequest>) -> Vec<Result<Admitted, BookingError>> {
    let handles: Vec<_> = requests
        .into_iter()
        .map(|request| {
            let app = app.clone();
            tokio::spawn(async move { app.booking.submit(request).await })
        })
        .collect();
    futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect()
}

fn tally(results: &[Result<Admitted, BookingError>]) -> (usize, usize) {
    let admitted = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(BookingError::CapacityConflict { .. })))
        .count();
    (admitted, conflicts)
}

/// 100 concurrent requests for the last bay: exactly one wins.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_last_bay_is_booked_once() {
    let (app, appointments) = app(1);

    let results = race(&app, (0..100).map(|n| request(n, OIL_CHANGE)).collect()).await;
    let (admitted, conflicts) = tally(&results);

    println!("admitted: {admitted}, conflicts: {conflicts}");
    assert_eq!(admitted, 1);
    assert_eq!(conflicts, 99);
    assert_eq!(appointments.len(), 1);
}

/// A capacity of three admits exactly three of fifty.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_capacity_is_never_exceeded() {
    let (app, appointments) = app(3);

    let results = race(&app, (0..50).map(|n| request(n, OIL_CHANGE)).collect()).await;
    let (admitted, conflicts) = tally(&results);

    assert_eq!(admitted, 3);
    assert_eq!(conflicts, 47);
    assert_eq!(appointments.len(), 3);
}

/// The per-service cap holds under contention while other services still fit.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_service_cap_under_contention() {
    let (app, appointments) = app(3);

    let mut requests: Vec<_> = (0..20).map(|n| request(n, TIRE_ROTATION)).collect();
    requests.push(request(100, OIL_CHANGE));
    let results = race(&app, requests).await;

    let rotations = appointments
        .all()
        .iter()
        .filter(|a| a.service_ids.contains(&TIRE_ROTATION))
        .count();
    assert_eq!(rotations, 1);
    assert!(appointments.len() <= 3);
    assert!(results
        .iter()
        .all(|r| r.is_ok() || matches!(r, Err(BookingError::CapacityConflict { .. }))));
}
