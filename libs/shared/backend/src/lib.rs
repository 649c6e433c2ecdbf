pub mod client;
pub mod error;

pub use client::ClinicApiClient;
pub use error::{extract_error_message, BackendError};
