//! Engine: builder plus update coordinator.

mod builder;
mod coordinator;

pub use builder::{Vexillum, VexillumBuilder};
pub use coordinator::{
    BannerEngine, BannerRequest, CoordinatorConfig, ResolutionState, UpdateMode, ViewOutcome,
};
