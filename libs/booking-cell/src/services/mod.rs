pub mod booking;
pub mod draft;
pub mod inflight;
pub mod payload;
pub mod store;
pub mod validator;

pub use booking::BookingService;
pub use draft::BookingForm;
pub use inflight::InFlightActions;
pub use payload::build_payload;
pub use store::{DraftSession, DraftStore};
pub use validator::{can_submit, validate};
