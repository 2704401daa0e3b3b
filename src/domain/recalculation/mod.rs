//! Recalculation domain - tracked bulk travel recomputation

mod entity;
mod repository;

pub use entity::{
    ItemError, RecalcReport, RecalcRun, RecalcRunId, RecalcState, RecalcTrigger,
};
pub use repository::RecalcRunRepository;
