//! Booking engine: availability checks, the assignment lifecycle, the audit
//! trail, and the expert roster. Every component shares one injected store.

mod audit;
mod availability;
mod error;
mod lifecycle;
mod locks;
mod roster;

pub use audit::AuditLog;
pub use availability::{Availability, AvailabilityChecker};
pub use error::{EngineError, EngineResult};
pub use lifecycle::{AssignmentManager, AvailabilityPolicy, ListFilter};
pub use locks::{ExpertGuard, ExpertLocks};
pub use roster::{ExpertRoster, ExpertWorkload};
