const MIN_INTERVAL_SECONDS: f32 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Once,
    Interval,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Timer {
    name: &'static str,
    kind: TimerKind,
    period_seconds: f32,
    remaining_seconds: f32,
}

/// Named countdowns owned by a single phase controller.
///
/// Timers only advance when their owner calls [`TimerSet::tick`] from its own
/// update, so clearing the set is enough to guarantee nothing fires afterwards.
#[derive(Debug, Default, Clone)]
pub struct TimerSet {
    timers: Vec<Timer>,
}

impl TimerSet {
    pub fn start_once(&mut self, name: &'static str, delay_seconds: f32) {
        self.insert(Timer {
            name,
            kind: TimerKind::Once,
            period_seconds: delay_seconds.max(0.0),
            remaining_seconds: delay_seconds.max(0.0),
        });
    }

    pub fn start_interval(&mut self, name: &'static str, period_seconds: f32) {
        let period = period_seconds.max(MIN_INTERVAL_SECONDS);
        self.insert(Timer {
            name,
            kind: TimerKind::Interval,
            period_seconds: period,
            remaining_seconds: period,
        });
    }

    fn insert(&mut self, timer: Timer) {
        self.timers.retain(|existing| existing.name != timer.name);
        self.timers.push(timer);
    }

    pub fn cancel(&mut self, name: &'static str) -> bool {
        let before = self.timers.len();
        self.timers.retain(|timer| timer.name != name);
        before != self.timers.len()
    }

    /// Drops every timer and returns how many were live.
    pub fn clear(&mut self) -> usize {
        let cleared = self.timers.len();
        self.timers.clear();
        cleared
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn is_running(&self, name: &'static str) -> bool {
        self.timers.iter().any(|timer| timer.name == name)
    }

    pub fn remaining(&self, name: &'static str) -> Option<f32> {
        self.timers
            .iter()
            .find(|timer| timer.name == name)
            .map(|timer| timer.remaining_seconds)
    }

    pub fn tick(&mut self, dt_seconds: f32, fired: &mut Vec<&'static str>) {
        self.timers.retain_mut(|timer| {
            timer.remaining_seconds -= dt_seconds;
            match timer.kind {
                TimerKind::Once => {
                    if timer.remaining_seconds <= 0.0 {
                        fired.push(timer.name);
                        false
                    } else {
                        true
                    }
                }
                TimerKind::Interval => {
                    while timer.remaining_seconds <= 0.0 {
                        fired.push(timer.name);
                        timer.remaining_seconds += timer.period_seconds;
                    }
                    true
                }
            }
        });
    }
}
