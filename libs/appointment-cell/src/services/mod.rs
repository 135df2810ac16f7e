pub mod authorization;
pub mod booking;
pub mod ledger;
pub mod lifecycle;

pub use booking::AppointmentBookingService;
pub use ledger::{AppointmentLedger, SupabaseAppointmentLedger};
