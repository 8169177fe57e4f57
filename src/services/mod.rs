// Services module for the booking engine
// Business logic layer for the application

pub mod background_tasks;
pub mod booking;
pub mod conflict;
pub mod entitlement;
pub mod external_busy;
pub mod holds;
pub mod leads;
pub mod reschedule;
pub mod rules;
pub mod slots;
pub mod timezone;

// Re-export commonly used services
pub use background_tasks::initialize_background_tasks;
pub use booking::{BookingService, DEFAULT_BOOKING_SOURCE};
pub use conflict::{overlaps, BusyInterval};
pub use entitlement::{EntitlementGate, PlanCapabilities};
pub use external_busy::{ExternalBusyAggregator, ExternalBusyResult, ProviderError};
pub use holds::{HoldService, HOLD_TTL_MINUTES};
pub use leads::find_or_create_lead;
pub use reschedule::RescheduleService;
pub use rules::{windows_for_date, DayWindow};
pub use slots::{generate_slots, AvailabilityService, Slot, SlotQuery};
