//! Activity LED and buzzer.
//!
//! The buzzer pulse is a countdown decremented by the main loop tick; there
//! is no finer timer.

/// Output actuators, fire-and-forget.
pub trait Outputs {
    fn set_indicator(&mut self, on: bool);
    fn set_buzzer(&mut self, on: bool);
}

pub struct Feedback<O> {
    outputs: O,
    remaining_ms: u32,
}

impl<O: Outputs> Feedback<O> {
    pub fn new(outputs: O) -> Self {
        Self {
            outputs,
            remaining_ms: 0,
        }
    }

    /// Sound the buzzer for `duration_ms`. A new pulse replaces a running one.
    pub fn pulse(&mut self, duration_ms: u32) {
        if duration_ms == 0 {
            return;
        }
        self.remaining_ms = duration_ms;
        self.outputs.set_buzzer(true);
    }

    pub fn set_indicator(&mut self, on: bool) {
        self.outputs.set_indicator(on);
    }

    /// Advance the countdown; silences the buzzer when it runs out.
    pub fn tick(&mut self, elapsed_ms: u32) {
        if self.remaining_ms == 0 {
            return;
        }
        self.remaining_ms = self.remaining_ms.saturating_sub(elapsed_ms);
        if self.remaining_ms == 0 {
            self.outputs.set_buzzer(false);
        }
    }

    pub fn is_sounding(&self) -> bool {
        self.remaining_ms > 0
    }

    pub fn outputs(&self) -> &O {
        &self.outputs
    }
}
