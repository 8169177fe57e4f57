pub mod appointment;
pub mod availability;
pub mod billing;
pub mod hold;
pub mod integration;
pub mod lead;

// Re-export common types
pub use appointment::{
    Appointment, AppointmentMeta, AppointmentResponse, AppointmentStatus, BookAppointmentRequest,
    ContactDetails, NewAppointment, RescheduleRequest, RescheduleResponse,
};
pub use availability::{
    AvailabilityException, AvailabilityParams, AvailabilityResponse, AvailabilityRule,
    CalendarSettings, SlotDto,
};
pub use billing::CompanyBilling;
pub use hold::{BookingHold, CreateHoldRequest, HoldResponse, NewBookingHold};
pub use integration::{CalendarIntegration, CalendarProvider};
pub use lead::{CompanyLead, LeadIdentity, NewCompanyLead};
