use tracing::debug;

use super::{DeviceError, DeviceResult, RotationStage};

/// One call recorded by [`SimulatedStage`].
#[derive(Clone, Debug, PartialEq)]
pub enum StageEvent {
    Home,
    MoveTo(f64),
    Wait,
    Close,
}

/// In-process rotation stage that tracks its position and records calls.
#[derive(Debug, Default)]
pub struct SimulatedStage {
    position: f64,
    target: Option<f64>,
    moves: usize,
    fail_on_move: Option<usize>,
    closed: bool,
    events: Vec<StageEvent>,
}

impl SimulatedStage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the `n`-th move (1-based) with a stage error.
    pub fn failing_on_move(mut self, n: usize) -> Self {
        self.fail_on_move = Some(n);
        self
    }

    pub fn events(&self) -> &[StageEvent] {
        &self.events
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> DeviceResult<()> {
        if self.closed {
            Err(DeviceError::Closed)
        } else {
            Ok(())
        }
    }
}

impl RotationStage for SimulatedStage {
    fn home(&mut self) -> DeviceResult<()> {
        self.ensure_open()?;
        self.events.push(StageEvent::Home);
        self.target = Some(0.0);
        Ok(())
    }

    fn move_to(&mut self, angle: f64) -> DeviceResult<()> {
        self.ensure_open()?;
        self.moves += 1;
        if self.fail_on_move == Some(self.moves) {
            return Err(DeviceError::Stage(format!(
                "simulated fault on move {} to {angle:.1}°",
                self.moves
            )));
        }
        debug!(from = self.position, to = angle, "stage move");
        self.events.push(StageEvent::MoveTo(angle));
        self.target = Some(angle);
        Ok(())
    }

    fn move_by(&mut self, delta: f64) -> DeviceResult<()> {
        let base = self.target.unwrap_or(self.position);
        self.move_to(base + delta)
    }

    fn wait_move(&mut self) -> DeviceResult<()> {
        self.ensure_open()?;
        self.events.push(StageEvent::Wait);
        if let Some(target) = self.target.take() {
            self.position = target;
        }
        Ok(())
    }

    fn position(&self) -> DeviceResult<f64> {
        self.ensure_open()?;
        Ok(self.position)
    }

    fn close(&mut self) -> DeviceResult<()> {
        if !self.closed {
            self.events.push(StageEvent::Close);
            self.closed = true;
        }
        Ok(())
    }
}
