use serde::{Deserialize, Serialize};

use super::timers::TimerSet;

const FINISH_GRACE_TIMER: &str = "finish_grace";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameHandle {
    pub key: String,
}

impl FrameHandle {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

/// Ordered frames plus a cursor. The length is whatever was actually loaded,
/// never more than was requested.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSequence {
    frames: Vec<FrameHandle>,
    current_index: usize,
    frame_rate: f32,
}

impl FrameSequence {
    pub fn new(mut frames: Vec<FrameHandle>, requested: usize, frame_rate: f32) -> Self {
        frames.truncate(requested);
        Self {
            frames,
            current_index: 0,
            frame_rate: if frame_rate.is_finite() && frame_rate > 0.0 {
                frame_rate
            } else {
                1.0
            },
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_frame(&self) -> Option<&FrameHandle> {
        self.frames.get(self.current_index)
    }

    pub fn frame_rate(&self) -> f32 {
        self.frame_rate
    }

    pub fn frame_interval_ms(&self) -> f32 {
        1000.0 / self.frame_rate
    }

    pub fn is_at_last(&self) -> bool {
        !self.frames.is_empty() && self.current_index + 1 == self.frames.len()
    }

    fn advance(&mut self) -> bool {
        if self.current_index + 1 < self.frames.len() {
            self.current_index += 1;
            true
        } else {
            false
        }
    }

    fn rewind(&mut self, frames: usize) -> bool {
        let target = self.current_index.saturating_sub(frames);
        let moved = target != self.current_index;
        self.current_index = target;
        moved
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
    Finished,
}

#[derive(Debug, Clone)]
pub struct FramePlaybackController {
    sequence: FrameSequence,
    state: PlaybackState,
    accumulator_ms: f32,
    grace_seconds: f32,
    timers: TimerSet,
    completion_fired: bool,
}

impl FramePlaybackController {
    pub fn new(sequence: FrameSequence, grace_seconds: f32) -> Self {
        Self {
            sequence,
            state: PlaybackState::Idle,
            accumulator_ms: 0.0,
            grace_seconds: grace_seconds.max(0.0),
            timers: TimerSet::default(),
            completion_fired: false,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn sequence(&self) -> &FrameSequence {
        &self.sequence
    }

    pub fn current_index(&self) -> usize {
        self.sequence.current_index()
    }

    pub fn completion_fired(&self) -> bool {
        self.completion_fired
    }

    pub fn live_timers(&self) -> usize {
        self.timers.len()
    }

    /// Hold-to-play input. Returns true when playback actually started.
    pub fn hold(&mut self) -> bool {
        match self.state {
            PlaybackState::Idle | PlaybackState::Paused => {
                self.state = PlaybackState::Playing;
                true
            }
            PlaybackState::Playing | PlaybackState::Finished => false,
        }
    }

    pub fn release(&mut self) -> bool {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
            self.accumulator_ms = 0.0;
            true
        } else {
            false
        }
    }

    /// Moves the cursor back; refused while playing or after finishing.
    pub fn scrub_back(&mut self, frames: usize) -> bool {
        if matches!(self.state, PlaybackState::Playing | PlaybackState::Finished) {
            return false;
        }
        let moved = self.sequence.rewind(frames);
        if moved {
            self.timers.cancel(FINISH_GRACE_TIMER);
        }
        moved
    }

    /// Manual single-frame advance. Past the last frame this is a no-op.
    pub fn step_forward(&mut self) -> bool {
        if self.state == PlaybackState::Finished {
            return false;
        }
        let moved = self.sequence.advance();
        self.arm_grace_if_at_end();
        moved
    }

    /// Enters `Finished`. Returns true only for the call that fired the
    /// completion signal; later calls are no-ops.
    pub fn finish(&mut self) -> bool {
        self.state = PlaybackState::Finished;
        self.timers.clear();
        if self.completion_fired {
            return false;
        }
        self.completion_fired = true;
        true
    }

    /// Advances by wall time. Returns true on the tick that finished playback.
    pub fn update(&mut self, dt_seconds: f32) -> bool {
        if self.state == PlaybackState::Finished {
            return false;
        }
        if self.sequence.is_empty() && self.state != PlaybackState::Idle {
            return self.finish();
        }

        if self.state == PlaybackState::Playing {
            self.accumulator_ms += dt_seconds * 1000.0;
            let interval = self.sequence.frame_interval_ms();
            while self.accumulator_ms >= interval {
                self.accumulator_ms -= interval;
                if !self.sequence.advance() {
                    self.accumulator_ms = 0.0;
                    break;
                }
            }
        }
        self.arm_grace_if_at_end();
        // A paused sequence holds its last frame until input resumes.
        if self.state == PlaybackState::Paused {
            return false;
        }

        let mut fired = Vec::new();
        self.timers.tick(dt_seconds, &mut fired);
        if fired.contains(&FINISH_GRACE_TIMER) {
            return self.finish();
        }
        false
    }

    /// Drops the grace timer without finishing, used when the owner tears down.
    pub fn clear_timers(&mut self) -> usize {
        self.timers.clear()
    }

    fn arm_grace_if_at_end(&mut self) {
        if self.sequence.is_at_last() && !self.timers.is_running(FINISH_GRACE_TIMER) {
            self.timers.start_once(FINISH_GRACE_TIMER, self.grace_seconds);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn handles(count: usize) -> Vec<FrameHandle> {
        (0..count)
            .map(|index| FrameHandle::new(format!("frame/{index:04}")))
            .collect()
    }

    fn controller(loaded: usize, requested: usize) -> FramePlaybackController {
        FramePlaybackController::new(FrameSequence::new(handles(loaded), requested, 30.0), 0.3)
    }

    #[test]
    fn sequence_length_is_clamped_to_loaded_frames() {
        let short = FrameSequence::new(handles(5), 465, 30.0);
        assert_eq!(short.len(), 5);
        let long = FrameSequence::new(handles(500), 289, 30.0);
        assert_eq!(long.len(), 289);
    }

    #[test]
    fn index_never_leaves_bounds_under_extra_advances() {
        let mut playback = controller(3, 10);
        for _ in 0..20 {
            playback.step_forward();
            assert!(playback.current_index() < 3);
        }
        assert_eq!(playback.current_index(), 2);
    }

    #[test]
    fn holding_plays_at_frame_rate_and_release_pauses() {
        let mut playback = controller(100, 100);
        assert_eq!(playback.state(), PlaybackState::Idle);
        for _ in 0..30 {
            playback.update(DT);
        }
        assert_eq!(playback.current_index(), 0);

        assert!(playback.hold());
        for _ in 0..60 {
            playback.update(DT);
        }
        let after_one_second = playback.current_index();
        assert!((29..=31).contains(&after_one_second));

        assert!(playback.release());
        assert_eq!(playback.state(), PlaybackState::Paused);
        for _ in 0..120 {
            playback.update(DT);
        }
        assert_eq!(playback.current_index(), after_one_second);
    }

    #[test]
    fn scrub_back_only_when_not_playing() {
        let mut playback = controller(10, 10);
        playback.hold();
        for _ in 0..20 {
            playback.update(DT);
        }
        let index = playback.current_index();
        assert!(index > 2);
        assert!(!playback.scrub_back(2));
        assert_eq!(playback.current_index(), index);

        playback.release();
        assert!(playback.scrub_back(2));
        assert_eq!(playback.current_index(), index - 2);
    }

    #[test]
    fn reaching_last_frame_finishes_after_grace_exactly_once() {
        let mut playback = controller(4, 4);
        playback.hold();
        let mut finish_ticks = 0;
        for _ in 0..120 {
            if playback.update(DT) {
                finish_ticks += 1;
            }
        }
        assert_eq!(finish_ticks, 1);
        assert_eq!(playback.state(), PlaybackState::Finished);
        assert_eq!(playback.current_index(), 3);

        assert!(!playback.finish());
        assert!(!playback.step_forward());
        assert!(!playback.update(DT));
        assert!(playback.completion_fired());
        assert_eq!(playback.live_timers(), 0);
    }

    #[test]
    fn grace_delay_holds_the_last_frame_before_finishing() {
        let mut playback = controller(2, 2);
        assert!(playback.step_forward());
        assert!(!playback.update(DT));
        assert_eq!(playback.state(), PlaybackState::Idle);
        let mut ticks = 1;
        while !playback.update(DT) {
            ticks += 1;
            assert!(ticks < 60);
        }
        assert!(ticks >= 17);
    }

    #[test]
    fn releasing_on_the_last_frame_freezes_the_grace_delay() {
        let mut playback = controller(3, 3);
        playback.hold();
        while playback.current_index() < 2 {
            assert!(!playback.update(DT));
        }
        assert!(playback.release());
        for _ in 0..120 {
            assert!(!playback.update(DT));
        }
        assert_eq!(playback.state(), PlaybackState::Paused);
        assert_eq!(playback.live_timers(), 1);

        playback.hold();
        let mut ticks = 0;
        while !playback.update(DT) {
            ticks += 1;
            assert!(ticks < 60, "grace never elapsed after resuming");
        }
        assert!(playback.completion_fired());
    }

    #[test]
    fn forced_finish_fires_once() {
        let mut playback = controller(50, 50);
        playback.hold();
        assert!(playback.finish());
        assert!(!playback.finish());
        assert!(!playback.hold());
        assert!(!playback.scrub_back(1));
    }

    #[test]
    fn empty_sequence_finishes_as_soon_as_played() {
        let mut playback = controller(0, 12);
        assert!(!playback.update(DT));
        playback.hold();
        assert!(playback.update(DT));
        assert_eq!(playback.current_index(), 0);
        assert!(playback.sequence().current_frame().is_none());
    }
}
