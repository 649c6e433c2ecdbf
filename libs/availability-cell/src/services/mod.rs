pub mod availability;
pub mod capacity;
pub mod catalog;
pub mod evaluator;
pub mod index;

pub use availability::AvailabilityService;
pub use capacity::compute_therapist_day;
pub use catalog::SlotCatalog;
pub use evaluator::{evaluate_selection, evaluate_slots};
pub use index::AvailabilityIndex;
