mod context;
mod error;
mod loading;
mod phase;
mod phases;
mod sequencer;
mod services;
mod subflow;

#[cfg(test)]
pub(crate) mod testing;

pub use context::{
    MissionContext, MissionFlags, MissionKind, MissionOutcome, PhaseId, PhaseRecord, PhaseResult,
    STANDARD_CHAIN, SUMMON_CHAIN,
};
pub use error::{LoadFailure, MissionError};
pub use loading::AssetGate;
pub use phase::{
    MissionRuntime, PhaseActivity, PhaseController, PhaseEnv, PhaseStatus, SummonRequest,
};
pub use phases::{
    ExplorationPhase, FlightPhase, LandingPhase, LaunchPhase, PresentationPhase, SummonMenu,
    TransformationPhase,
};
pub use sequencer::{MissionEvent, MissionSequencer, SequencerStatus};
pub use services::{
    ContentKind, ContentPoll, ContentRequest, ContentResponse, ContentService, ContentTicket,
    ModelView, ObjectiveMatcher, PhaseNotice, QuestService, Renderer, Services,
};
pub use subflow::SubFlowInterrupt;
