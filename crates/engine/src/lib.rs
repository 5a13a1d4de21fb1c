use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;
pub mod content;
pub mod mission;
pub mod progress;
pub mod sim;
pub mod tuning;

pub use app::{FixedStepClock, InputAction, InputCollector, InputSnapshot, LoopConfig, StepPlan};
pub use content::{load_roster, CharacterDef, CharacterRoster, FrameSource, RosterError};
pub use mission::{
    MissionContext, MissionError, MissionEvent, MissionKind, MissionOutcome, MissionRuntime,
    MissionSequencer, PhaseId, SequencerStatus, Services,
};
pub use progress::{PlayerProgress, ProgressError};
pub use tuning::{load_tuning, ConfigError, MissionTuning};

pub const ROOT_ENV_VAR: &str = "MISSION_ROOT";

/// On-disk layout of a mission project: read-only content under
/// `assets/base`, writable state under `cache`.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub base_content_dir: PathBuf,
    pub cache_dir: PathBuf,
}

impl AppPaths {
    pub fn roster_file(&self) -> PathBuf {
        self.base_content_dir.join("characters.xml")
    }

    pub fn tuning_file(&self) -> PathBuf {
        self.base_content_dir.join("tuning.json")
    }

    pub fn frames_dir(&self) -> PathBuf {
        self.base_content_dir.join("frames")
    }

    pub fn progress_file(&self) -> PathBuf {
        self.cache_dir.join("progress.json")
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error("failed to create cache directory at {path}: {source}")]
    CreateCacheDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(
        "{env_var} is set but does not point to a mission project root: {path}\n\
A project root must contain Cargo.toml and either crates/ or assets/."
    )]
    InvalidEnvRoot {
        path: PathBuf,
        env_var: &'static str,
    },
    #[error(
        "No mission project root above the executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and either crates/ or assets/.\n\
Set {env_var} explicitly, for example:\n\
PowerShell: $env:{env_var}=\"C:\\path\\to\\mission-runner\"\n\
Bash/zsh: export {env_var}=\"/path/to/mission-runner\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = resolve_root()?;
    let base_content_dir = root.join("assets").join("base");
    let cache_dir = root.join("cache");

    fs::create_dir_all(&cache_dir).map_err(|source| StartupError::CreateCacheDir {
        path: cache_dir.clone(),
        source,
    })?;

    Ok(AppPaths {
        root,
        base_content_dir,
        cache_dir,
    })
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => root_from_env(&PathBuf::from(value)),
        Err(env::VarError::NotPresent) => root_above_executable(),
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn root_from_env(raw: &Path) -> Result<PathBuf, StartupError> {
    let root = normalize_path(raw);
    if !is_project_root(&root) {
        return Err(StartupError::InvalidEnvRoot {
            path: root,
            env_var: ROOT_ENV_VAR,
        });
    }
    Ok(root)
}

fn root_above_executable() -> Result<PathBuf, StartupError> {
    let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
    let Some(exe_dir) = exe.parent() else {
        return Err(StartupError::ExeHasNoParent(exe));
    };
    exe_dir
        .ancestors()
        .find(|candidate| is_project_root(candidate))
        .map(normalize_path)
        .ok_or_else(|| StartupError::RootNotFound {
            start_dir: normalize_path(exe_dir),
            env_var: ROOT_ENV_VAR,
        })
}

fn is_project_root(path: &Path) -> bool {
    path.join("Cargo.toml").is_file()
        && ["crates", "assets"]
            .iter()
            .any(|marker| path.join(marker).is_dir())
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
