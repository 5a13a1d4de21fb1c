use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use mission_engine::tuning::RewardTuning;
use mission_engine::{
    FixedStepClock, InputCollector, MissionError, MissionEvent, MissionOutcome, MissionSequencer,
    PlayerProgress, ProgressError, SequencerStatus,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::bootstrap::AppWiring;
use super::pilot::Pilot;

#[derive(Debug, Error)]
enum FinishError {
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error("failed to encode mission report: {0}")]
    EncodeReport(#[source] serde_json::Error),
    #[error("failed to write mission report {}: {source}", .path.display())]
    WriteReport {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Serialize)]
struct RunReport<'a> {
    ticks: u64,
    outcome: &'a MissionOutcome,
    total_money: u64,
    level_ups: Vec<String>,
}

#[derive(Debug)]
pub(crate) enum RunEnd {
    Completed { ticks: u64 },
    Failed { ticks: u64, error: MissionError },
    OutOfTicks { ticks: u64 },
}

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let AppWiring {
        config,
        mut runtime,
        context,
        partner,
        telemetry,
        mut progress,
        progress_path,
        report_path,
    } = app;

    let mut pilot = Pilot::new(&runtime.tuning, partner, config.target_tps);
    let mut sequencer = MissionSequencer::new(context);
    if let Err(err) = sequencer.start(&mut runtime) {
        error!(error = %err, "mission_start_failed");
        return ExitCode::FAILURE;
    }

    let mut clock = FixedStepClock::new(&config);
    let mut collector = InputCollector::default();
    let frame_dt = config.fixed_dt();
    let end = loop {
        if clock.total_ticks() >= config.max_total_ticks {
            break RunEnd::OutOfTicks {
                ticks: clock.total_ticks(),
            };
        }
        let plan = clock.advance(frame_dt);
        let mut finished = None;
        for _ in 0..plan.ticks_to_run {
            pilot
                .drive(&sequencer, &telemetry.borrow())
                .apply(&mut collector);
            let input = collector.snapshot_for_tick();
            let result = sequencer.update(clock.fixed_dt_seconds(), &input, &mut runtime);
            log_events(sequencer.take_events());
            match result {
                Ok(SequencerStatus::Completed) => {
                    finished = Some(RunEnd::Completed {
                        ticks: clock.total_ticks(),
                    });
                    break;
                }
                Ok(_) => {}
                Err(error) => {
                    finished = Some(RunEnd::Failed {
                        ticks: clock.total_ticks(),
                        error,
                    });
                    break;
                }
            }
        }
        if let Some(end) = finished {
            break end;
        }
    };

    match end {
        RunEnd::Completed { ticks } => {
            info!(ticks, draws = telemetry.borrow().draws, "mission_run_complete");
            let saved = finish(
                &sequencer,
                &mut progress,
                &runtime.tuning.rewards,
                ticks,
                &progress_path,
                &report_path,
            );
            match saved {
                Ok(()) => ExitCode::SUCCESS,
                Err(err) => {
                    error!(error = %err, "progress_save_failed");
                    ExitCode::FAILURE
                }
            }
        }
        RunEnd::Failed { ticks, error } => {
            error!(ticks, error = %error, title = ?sequencer.debug_title(), "mission_failed");
            sequencer.force_exit(&mut runtime);
            log_events(sequencer.take_events());
            ExitCode::FAILURE
        }
        RunEnd::OutOfTicks { ticks } => {
            error!(ticks, title = ?sequencer.debug_title(), "tick_budget_exhausted");
            sequencer.force_exit(&mut runtime);
            log_events(sequencer.take_events());
            ExitCode::FAILURE
        }
    }
}

fn finish(
    sequencer: &MissionSequencer,
    progress: &mut PlayerProgress,
    rewards: &RewardTuning,
    ticks: u64,
    progress_path: &Path,
    report_path: &Path,
) -> Result<(), FinishError> {
    let Some(outcome) = sequencer.outcome() else {
        warn!("mission_completed_without_outcome");
        return Ok(());
    };
    let level_ups = progress.apply_outcome(outcome, rewards);
    for level_up in &level_ups {
        info!(character = %level_up.character_id, level = level_up.level, "level_up");
    }
    progress.save_to_file(progress_path)?;

    let report = RunReport {
        ticks,
        outcome,
        total_money: progress.money,
        level_ups: level_ups
            .iter()
            .map(|level_up| format!("{}:{}", level_up.character_id, level_up.level))
            .collect(),
    };
    write_report(report_path, &report)?;
    info!(
        money = outcome.rewards.money,
        exp = outcome.rewards.exp,
        landing_attempts = outcome.landing_attempts,
        summoned = outcome.summoned.len(),
        "mission_summary"
    );
    Ok(())
}

fn write_report(path: &Path, report: &RunReport<'_>) -> Result<(), FinishError> {
    let json = serde_json::to_string_pretty(report).map_err(FinishError::EncodeReport)?;
    fs::write(path, json).map_err(|source| FinishError::WriteReport {
        path: path.to_path_buf(),
        source,
    })
}

fn log_events(events: Vec<MissionEvent>) {
    for event in events {
        match event {
            MissionEvent::SubFlowStarted { partner_id } => {
                info!(partner = %partner_id, "summon_started")
            }
            MissionEvent::SubFlowComplete { partner_id, phases } => {
                info!(partner = %partner_id, phases = phases.len(), "summon_returned")
            }
            MissionEvent::PhaseStuck {
                phase,
                elapsed_seconds,
            } => warn!(phase = %phase, elapsed_seconds, "watchdog_tripped"),
            other => debug!(event = ?other, "mission_event"),
        }
    }
}

#[cfg(test)]
mod tests {
    use mission_engine::sim::Rewards;
    use mission_engine::MissionKind;
    use tempfile::TempDir;

    use super::*;

    fn outcome() -> MissionOutcome {
        MissionOutcome {
            mission_id: "mission-0001".to_string(),
            kind: MissionKind::Delivery,
            character_id: "jett".to_string(),
            destination: "harbor".to_string(),
            phases: Vec::new(),
            landing_attempts: 1,
            summoned: Vec::new(),
            rewards: Rewards::default(),
        }
    }

    #[test]
    fn report_write_failure_names_the_path() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("missing").join("last_mission.json");
        let outcome = outcome();
        let report = RunReport {
            ticks: 10,
            outcome: &outcome,
            total_money: 0,
            level_ups: Vec::new(),
        };

        let err = write_report(&path, &report).expect_err("parent directory is missing");
        assert!(matches!(err, FinishError::WriteReport { .. }));
        assert!(err.to_string().contains("last_mission.json"));

        let written = temp.path().join("last_mission.json");
        write_report(&written, &report).expect("write");
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&written).expect("read")).expect("json");
        assert_eq!(value["outcome"]["mission_id"], "mission-0001");
    }
}
