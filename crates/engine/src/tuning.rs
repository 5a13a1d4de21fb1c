use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::sim::Vec2;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MissionTuning {
    pub presentation: PresentationTuning,
    pub launch: LaunchTuning,
    pub flight: FlightTuning,
    pub landing: LandingTuning,
    pub playback: PlaybackTuning,
    pub exploration: ExplorationTuning,
    pub loading: LoadingTuning,
    pub watchdog: WatchdogTuning,
    pub rewards: RewardTuning,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PresentationTuning {
    pub dispatch_seconds: f32,
    pub arrival_seconds: f32,
    pub return_seconds: f32,
}

impl Default for PresentationTuning {
    fn default() -> Self {
        Self {
            dispatch_seconds: 1.0,
            arrival_seconds: 1.5,
            return_seconds: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LaunchTuning {
    pub thrust_rate: f32,
    pub progress_decay_rate: f32,
    pub progress_threshold: f32,
    pub min_hold_seconds: f32,
    pub thrust_accel: f32,
    pub gravity: f32,
    pub drag: f32,
    pub max_speed: f32,
    pub perfect_window_seconds: f32,
}

impl Default for LaunchTuning {
    fn default() -> Self {
        Self {
            thrust_rate: 200.0,
            progress_decay_rate: 150.0,
            progress_threshold: 250.0,
            min_hold_seconds: 1.2,
            thrust_accel: 180.0,
            gravity: 90.0,
            drag: 0.99,
            max_speed: 240.0,
            perfect_window_seconds: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FlightTuning {
    pub base_speed: f32,
    pub launch_bonus_per_point: f32,
    pub speed_recovery_accel: f32,
    pub lift_accel: f32,
    pub gravity: f32,
    pub drag: f32,
    pub max_vertical_speed: f32,
    pub floor_y: f32,
    pub ceiling_y: f32,
    pub start_altitude: f32,
    pub min_distance: f32,
    pub target_distance: f32,
    pub obstacle_count: u32,
    pub obstacle_start: f32,
    pub obstacle_spacing: f32,
    pub obstacle_lanes: Vec<f32>,
    pub obstacle_half_extents: Vec2,
    pub player_half_extents: Vec2,
    pub pass_score: u32,
    pub hit_penalty: u32,
    pub hit_slowdown: f32,
}

impl Default for FlightTuning {
    fn default() -> Self {
        Self {
            base_speed: 220.0,
            launch_bonus_per_point: 1.0,
            speed_recovery_accel: 60.0,
            lift_accel: 260.0,
            gravity: 160.0,
            drag: 0.98,
            max_vertical_speed: 180.0,
            floor_y: 0.0,
            ceiling_y: 400.0,
            start_altitude: 200.0,
            min_distance: 3000.0,
            target_distance: 6000.0,
            obstacle_count: 8,
            obstacle_start: 800.0,
            obstacle_spacing: 600.0,
            obstacle_lanes: vec![80.0, 200.0, 320.0],
            obstacle_half_extents: Vec2::new(30.0, 50.0),
            player_half_extents: Vec2::new(24.0, 16.0),
            pass_score: 10,
            hit_penalty: 5,
            hit_slowdown: 0.6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LandingTuning {
    pub runway_x: f32,
    pub runway_half_width: f32,
    pub speed_threshold: f32,
    pub start_offset_x: f32,
    pub start_altitude: f32,
    pub start_velocity: Vec2,
    pub ground_y: f32,
    pub gravity: f32,
    pub thrust_accel: f32,
    pub lateral_accel: f32,
    pub drag: f32,
    pub max_speed: f32,
    pub min_x: f32,
    pub max_x: f32,
}

impl Default for LandingTuning {
    fn default() -> Self {
        Self {
            runway_x: 0.0,
            runway_half_width: 120.0,
            speed_threshold: 80.0,
            start_offset_x: -250.0,
            start_altitude: 320.0,
            start_velocity: Vec2::new(30.0, 0.0),
            ground_y: 0.0,
            gravity: 50.0,
            thrust_accel: 90.0,
            lateral_accel: 100.0,
            drag: 0.995,
            max_speed: 140.0,
            min_x: -600.0,
            max_x: 600.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlaybackTuning {
    pub default_frame_rate: f32,
    pub finish_grace_seconds: f32,
}

impl Default for PlaybackTuning {
    fn default() -> Self {
        Self {
            default_frame_rate: 30.0,
            finish_grace_seconds: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExplorationTuning {
    pub move_speed: f32,
    pub jump_speed: f32,
    pub gravity: f32,
    pub max_fall_speed: f32,
    pub ground_y: f32,
    pub min_x: f32,
    pub max_x: f32,
    pub interact_radius: f32,
    pub pickup_radius: f32,
    pub camera_follow: f32,
    pub partner_offset_x: f32,
    pub render_interval_seconds: f32,
    pub dialogue_auto_close_seconds: f32,
    pub npc_count: u32,
    pub item_count: u32,
    pub quest_reward_money: u64,
    pub quest_reward_exp: u64,
    pub item_reward_money: u64,
}

impl Default for ExplorationTuning {
    fn default() -> Self {
        Self {
            move_speed: 180.0,
            jump_speed: 320.0,
            gravity: 900.0,
            max_fall_speed: 600.0,
            ground_y: 0.0,
            min_x: -1200.0,
            max_x: 1200.0,
            interact_radius: 80.0,
            pickup_radius: 40.0,
            camera_follow: 0.1,
            partner_offset_x: 150.0,
            render_interval_seconds: 0.1,
            dialogue_auto_close_seconds: 4.0,
            npc_count: 3,
            item_count: 4,
            quest_reward_money: 100,
            quest_reward_exp: 50,
            item_reward_money: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoadingTuning {
    pub timeout_seconds: f32,
}

impl Default for LoadingTuning {
    fn default() -> Self {
        Self {
            timeout_seconds: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WatchdogTuning {
    pub stuck_after_seconds: f32,
}

impl Default for WatchdogTuning {
    fn default() -> Self {
        Self {
            stuck_after_seconds: 300.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RewardTuning {
    pub base_money: u64,
    pub base_exp: u64,
    pub energy_cost: u32,
    pub exp_per_level: u64,
}

impl Default for RewardTuning {
    fn default() -> Self {
        Self {
            base_money: 200,
            base_exp: 40,
            energy_cost: 20,
            exp_per_level: 100,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read tuning file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse tuning json at {json_path}: {message}")]
    Parse { json_path: String, message: String },
}

/// Reads tuning overrides; a missing file yields the built-in defaults.
pub fn load_tuning(path: &Path) -> Result<MissionTuning, ConfigError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            return Ok(MissionTuning::default())
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    parse_tuning_json(&raw)
}

pub fn parse_tuning_json(raw: &str) -> Result<MissionTuning, ConfigError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, MissionTuning>(&mut deserializer).map_err(|error| {
        let json_path = error.path().to_string();
        ConfigError::Parse {
            json_path,
            message: error.into_inner().to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let temp = TempDir::new().expect("temp");
        let tuning = load_tuning(&temp.path().join("tuning.json")).expect("defaults");
        assert_eq!(tuning, MissionTuning::default());
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let tuning = parse_tuning_json(r#"{ "landing": { "runway_half_width": 100.0 } }"#)
            .expect("parse");
        assert!((tuning.landing.runway_half_width - 100.0).abs() < f32::EPSILON);
        assert!((tuning.landing.speed_threshold - 80.0).abs() < f32::EPSILON);
        assert_eq!(tuning.launch, LaunchTuning::default());
    }

    #[test]
    fn parse_error_reports_json_path() {
        let err = parse_tuning_json(r#"{ "flight": { "obstacle_count": "many" } }"#)
            .expect_err("bad value");
        match err {
            ConfigError::Parse { json_path, .. } => assert_eq!(json_path, "flight.obstacle_count"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn file_override_is_read() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("tuning.json");
        fs::write(&path, r#"{ "watchdog": { "stuck_after_seconds": 12.5 } }"#).expect("write");
        let tuning = load_tuning(&path).expect("load");
        assert!((tuning.watchdog.stuck_after_seconds - 12.5).abs() < f32::EPSILON);
    }
}
