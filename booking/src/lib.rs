//! Auto-service booking and capacity-allocation engine.
//!
//! Customers pick services from a catalog, answer per-service questions and
//! request a time slot; the engine prices the request, checks it against the
//! shop's opening hours and capacity, and commits it as an appointment
//! without ever overbooking a slot.
//!
//! # Architecture
//!
//! ```text
//!   HTTP (axum)                       api/, server/
//!        │
//!        ▼
//! ┌──────────────┐  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐
//! │   Catalog    │  │ Availability │  │  Admission   │  │  Lifecycle   │
//! │   service    │  │  calculator  │  │  controller  │  │   service    │
//! └──────────────┘  └──────────────┘  └──────────────┘  └──────────────┘
//!        │                 │           │    │    │             │
//!        │                 │  pricing ─┘    │    └─ notification dispatch
//!        │                 │                │          (background, retried)
//!        ▼                 ▼                ▼              ▼
//!   CatalogStore    SettingsCache ──► SettingsStore   AppointmentStore
//!                                                  (per-slot serialized admit)
//! ```
//!
//! # Capacity
//!
//! A slot admits a booking while it holds fewer live (non-cancelled)
//! appointments than the shop's `totalCapacity`, and fewer
//! live appointments per requested service than that service's cap. The
//! check and the insert run inside one per-slot critical section in the
//! [`AppointmentStore`](autoshop_core::store::AppointmentStore); two
//! concurrent requests for the last seat produce exactly one appointment.
//!
//! # Usage
//!
//! ```ignore
//! let app = BookingApp::new(Stores::in_memory()?, notifier, clock, &BookingConfig::default());
//! let router = server::build_router(server::AppState::new(app));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod admission;
pub mod answers;
pub mod api;
pub mod app;
pub mod availability;
pub mod catalog;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod metrics;
pub mod notification;
pub mod pricing;
pub mod server;
pub mod settings;

pub use admission::{Admitted, BookingRequest, BookingService, CustomerInput, VehicleInput};
pub use app::{BookingApp, Stores};
pub use availability::{AvailabilityCalculator, AvailableSlots};
pub use catalog::{CatalogService, ServiceView};
pub use config::{BookingConfig, Config, StoreBackend};
pub use error::{BookingError, ValidationError, ValidationErrors};
pub use lifecycle::{LifecycleService, StatusRequest};
pub use notification::{NotificationDispatcher, RetryPolicy};
pub use settings::{SettingsCache, SettingsService};
