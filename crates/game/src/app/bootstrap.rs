use std::cell::RefCell;
use std::env;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use mission_engine::content::{DirectoryFrameSource, SyntheticFrameSource};
use mission_engine::mission::ObjectiveMatcher;
use mission_engine::{
    load_roster, load_tuning, resolve_app_paths, AppPaths, CharacterRoster, ConfigError,
    FrameSource, LoopConfig, MissionContext, MissionKind, MissionRuntime, PlayerProgress,
    ProgressError, RosterError, Services, StartupError,
};
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::adapters::{LocalContentService, LogRenderer, SharedTelemetry, Telemetry};

const CHARACTER_ENV_VAR: &str = "MISSION_CHARACTER";
const PARTNER_ENV_VAR: &str = "MISSION_PARTNER";
const DESTINATION_ENV_VAR: &str = "MISSION_DESTINATION";
const DEFAULT_CHARACTER: &str = "jett";
const DEFAULT_PARTNER: &str = "donnie";
const DEFAULT_DESTINATION: &str = "harbor";
const REPORT_FILE: &str = "last_mission.json";
const CONTENT_LATENCY_POLLS: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MissionSettings {
    pub(crate) character: String,
    pub(crate) partner: Option<String>,
    pub(crate) destination: String,
}

impl Default for MissionSettings {
    fn default() -> Self {
        Self {
            character: DEFAULT_CHARACTER.to_string(),
            partner: Some(DEFAULT_PARTNER.to_string()),
            destination: DEFAULT_DESTINATION.to_string(),
        }
    }
}

impl MissionSettings {
    fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            character: env_or(CHARACTER_ENV_VAR, defaults.character),
            partner: match env::var(PARTNER_ENV_VAR) {
                Ok(raw) => parse_partner(&raw),
                Err(_) => defaults.partner,
            },
            destination: env_or(DESTINATION_ENV_VAR, defaults.destination),
        }
    }
}

fn env_or(var: &str, default: String) -> String {
    env::var(var)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or(default)
}

fn parse_partner(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Roster(#[from] RosterError),
    #[error(transparent)]
    Tuning(#[from] ConfigError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error("character '{0}' is not in the roster")]
    UnknownCharacter(String),
}

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) runtime: MissionRuntime,
    pub(crate) context: MissionContext,
    pub(crate) partner: Option<String>,
    pub(crate) telemetry: SharedTelemetry,
    pub(crate) progress: PlayerProgress,
    pub(crate) progress_path: PathBuf,
    pub(crate) report_path: PathBuf,
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!("=== Mission Runner Startup ===");

    let paths = resolve_app_paths()?;
    wire(&paths, MissionSettings::from_env())
}

pub(crate) fn wire(paths: &AppPaths, settings: MissionSettings) -> Result<AppWiring, BootstrapError> {
    let roster = load_character_roster(&paths.roster_file())?;
    let tuning = load_tuning(&paths.tuning_file())?;
    if !roster.contains(&settings.character) {
        return Err(BootstrapError::UnknownCharacter(settings.character));
    }
    let partner = settings.partner.filter(|partner| {
        let usable = partner != &settings.character && roster.contains(partner);
        if !usable {
            warn!(partner = %partner, "partner_ignored");
        }
        usable
    });

    let progress_path = paths.progress_file();
    let progress = PlayerProgress::load_from_file(&progress_path)?;
    if let Some(stats) = progress.character(&settings.character) {
        if stats.energy < tuning.rewards.energy_cost {
            warn!(
                character = %settings.character,
                energy = stats.energy,
                "character_low_energy"
            );
        }
    }

    let telemetry: SharedTelemetry = Rc::new(RefCell::new(Telemetry::default()));
    let runtime = MissionRuntime {
        tuning,
        roster,
        services: Services {
            renderer: Box::new(LogRenderer::new(Rc::clone(&telemetry))),
            content: Box::new(LocalContentService::new(CONTENT_LATENCY_POLLS)),
            quests: Box::new(ObjectiveMatcher),
            frames: frame_source(&paths.frames_dir()),
        },
    };
    let context = MissionContext::new(
        format!("mission-{:04}", progress.history.len() + 1),
        MissionKind::Delivery,
        settings.character,
        settings.destination,
    );
    info!(
        root = %paths.root.display(),
        mission = context.id(),
        character = context.character_id(),
        destination = context.destination(),
        partner = partner.as_deref().unwrap_or("none"),
        "startup_wired"
    );

    Ok(AppWiring {
        config: LoopConfig::default(),
        runtime,
        context,
        partner,
        telemetry,
        progress,
        progress_path,
        report_path: paths.cache_dir.join(REPORT_FILE),
    })
}

fn load_character_roster(path: &Path) -> Result<CharacterRoster, RosterError> {
    if path.is_file() {
        let roster = load_roster(path)?;
        info!(path = %path.display(), characters = roster.len(), "roster_loaded");
        Ok(roster)
    } else {
        warn!(path = %path.display(), "roster_missing_using_builtin");
        Ok(CharacterRoster::builtin())
    }
}

fn frame_source(dir: &Path) -> Box<dyn FrameSource> {
    if dir.is_dir() {
        info!(path = %dir.display(), "frames_from_directory");
        Box::new(DirectoryFrameSource::new(dir))
    } else {
        Box::new(SyntheticFrameSource::default())
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
