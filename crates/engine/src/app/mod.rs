mod clock;
mod input;

pub use clock::{FixedStepClock, LoopConfig, StepPlan};
pub use input::{InputAction, InputCollector, InputSnapshot};
