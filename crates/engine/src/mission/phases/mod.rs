mod exploration;
mod flight;
mod landing;
mod launch;
mod presentation;
mod transformation;

pub use exploration::{ExplorationPhase, SummonMenu};
pub use flight::FlightPhase;
pub use landing::LandingPhase;
pub use launch::LaunchPhase;
pub use presentation::PresentationPhase;
pub use transformation::TransformationPhase;

use super::context::{PhaseId, PhaseResult};
use super::phase::{PhaseController, PhaseEnv};

/// Builds the controller for `id` from the previous phase's result. `Idle`
/// has no controller.
pub(crate) fn build_phase(
    id: PhaseId,
    previous: &PhaseResult,
    env: &PhaseEnv<'_>,
) -> Option<Box<dyn PhaseController>> {
    let phase: Box<dyn PhaseController> = match id {
        PhaseId::Dispatch | PhaseId::Arrival | PhaseId::Return => {
            Box::new(PresentationPhase::new(id, env))
        }
        PhaseId::Launch => Box::new(LaunchPhase::new(env)),
        PhaseId::Flight => Box::new(FlightPhase::new(previous, env)),
        PhaseId::Transformation => Box::new(TransformationPhase::new(env)),
        PhaseId::Landing => Box::new(LandingPhase::new(env)),
        PhaseId::Exploration => Box::new(ExplorationPhase::new(env)),
        PhaseId::Idle => return None,
    };
    Some(phase)
}
