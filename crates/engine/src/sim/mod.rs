pub mod exploration;
pub mod flight;
pub mod landing;
pub mod launch;
pub mod math;
pub mod physics;
pub mod playback;
pub mod snapshot;
pub mod timers;

pub use exploration::{
    Actor, ExplorationWorld, ExploreControls, Interaction, ObjectiveCheck, WorldEvent,
};
pub use flight::{
    build_course, course_seed, FlightCompletion, FlightGame, FlightReport, FlightStatus, Obstacle,
    ObstacleState,
};
pub use landing::{LandingControls, LandingGame, LandingStatus, LandingZone, TouchdownReport};
pub use launch::{LaunchGame, LaunchReport, LaunchStatus};
pub use math::{Aabb, Vec2};
pub use physics::{integrate, PhysicsBody, StepParams};
pub use playback::{FrameHandle, FramePlaybackController, FrameSequence, PlaybackState};
pub use snapshot::{
    ActorSnapshot, ActorState, CameraState, DialogueState, ItemState, NpcState, ObjectiveTarget,
    QuestObjective, QuestState, Rewards, SceneSnapshot, SnapshotError,
};
pub use timers::{TimerKind, TimerSet};
