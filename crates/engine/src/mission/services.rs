use std::collections::BTreeMap;
use std::fmt;

use crate::content::FrameSource;
use crate::sim::{
    ExplorationWorld, FrameHandle, ObjectiveCheck, ObjectiveTarget, PhysicsBody, QuestState,
};

use super::context::PhaseId;
use super::error::LoadFailure;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContentKind {
    Briefing,
    Backdrop,
    Destination,
    Frames,
    Summary,
}

impl ContentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Briefing => "briefing",
            ContentKind::Backdrop => "backdrop",
            ContentKind::Destination => "destination",
            ContentKind::Frames => "frames",
            ContentKind::Summary => "summary",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRequest {
    pub kind: ContentKind,
    pub params: BTreeMap<String, String>,
}

impl ContentRequest {
    pub fn new(kind: ContentKind) -> Self {
        Self {
            kind,
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentResponse {
    pub primary_asset: String,
    pub extras: BTreeMap<String, String>,
}

impl ContentResponse {
    const PLACEHOLDER_KEY: &'static str = "placeholder";

    pub fn new(primary_asset: impl Into<String>) -> Self {
        Self {
            primary_asset: primary_asset.into(),
            extras: BTreeMap::new(),
        }
    }

    pub fn placeholder(kind: ContentKind) -> Self {
        let mut response = Self::new(format!("placeholder/{kind}"));
        response
            .extras
            .insert(Self::PLACEHOLDER_KEY.to_string(), "true".to_string());
        response
    }

    pub fn is_placeholder(&self) -> bool {
        self.extras.contains_key(Self::PLACEHOLDER_KEY)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentTicket(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPoll {
    Pending,
    Ready(ContentResponse),
    Failed(LoadFailure),
}

/// Asynchronous asset/content resolution, polled once per tick.
pub trait ContentService {
    fn request(&mut self, request: ContentRequest) -> ContentTicket;
    fn poll(&mut self, ticket: ContentTicket) -> ContentPoll;
    fn cancel(&mut self, ticket: ContentTicket);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseNotice {
    Entered,
    Loading,
    Ready,
    RetryPrompt { attempt: u32 },
    Paused,
    Resumed,
}

/// Read-only view of the headless model handed to the render adapter.
#[derive(Debug, Clone, Copy)]
pub enum ModelView<'a> {
    Presentation {
        phase: PhaseId,
        asset: Option<&'a str>,
    },
    Launch {
        body: &'a PhysicsBody,
        thrust_progress: f32,
    },
    Flight {
        body: &'a PhysicsBody,
        distance: f32,
        score: u32,
    },
    Transformation {
        index: usize,
        frame_count: usize,
        frame: Option<&'a FrameHandle>,
    },
    Landing {
        body: &'a PhysicsBody,
        attempt: u32,
    },
    Exploration(&'a ExplorationWorld),
}

pub trait Renderer {
    fn show_phase(&mut self, phase: PhaseId, notice: &PhaseNotice);
    fn draw(&mut self, view: &ModelView<'_>);
    /// Drops render-owned resources. Simulation state is never stored here.
    fn teardown(&mut self);
    fn surface_ready(&self) -> bool {
        true
    }
    fn rebuild_surface(&mut self) {}
}

pub trait QuestService {
    fn check_objective(&mut self, quest: &QuestState, target: &ObjectiveTarget) -> ObjectiveCheck;
}

/// Marks the first open objective that matches the target and reports the
/// quest complete once every objective is done.
#[derive(Debug, Default)]
pub struct ObjectiveMatcher;

impl QuestService for ObjectiveMatcher {
    fn check_objective(&mut self, quest: &QuestState, target: &ObjectiveTarget) -> ObjectiveCheck {
        if quest.completed {
            return ObjectiveCheck::default();
        }
        let Some(matched) = quest
            .objectives
            .iter()
            .position(|objective| !objective.completed && &objective.target == target)
        else {
            return ObjectiveCheck::default();
        };
        let quest_complete = quest
            .objectives
            .iter()
            .enumerate()
            .all(|(index, objective)| index == matched || objective.completed);
        ObjectiveCheck {
            completed: true,
            quest_complete,
        }
    }
}

/// Collaborators shared by every phase of a mission, nested ones included.
pub struct Services {
    pub renderer: Box<dyn Renderer>,
    pub content: Box<dyn ContentService>,
    pub quests: Box<dyn QuestService>,
    pub frames: Box<dyn FrameSource>,
}
