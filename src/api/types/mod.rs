//! Request and response types of the operations API

pub mod error;
pub mod recalculation;
pub mod travel;

pub use error::{ApiError, ApiErrorResponse, ApiErrorType};
pub use recalculation::{RecalcRunResponse, RecalculationQuery, RunAccepted};
pub use travel::TravelInfoResponse;
