//! Mock collaborators shared by the unit tests.

use crate::hal::{Axis, ControlCommand, Link, SensorError, Sensors, Transport, TransportError};
use embedded_hal::blocking::delay::DelayMs;
use embedded_time::{clock, rate::Fraction, Clock, Instant};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

/// Microsecond clock that only moves when told to (or when a linked delay sleeps).
#[derive(Clone, Debug)]
pub struct ManualClock {
    now_us: Rc<Cell<u32>>,
    reads: Rc<Cell<u32>>,
    fail_after: Option<u32>,
}

impl ManualClock {
    pub fn new(start_us: u32) -> Self {
        Self {
            now_us: Rc::new(Cell::new(start_us)),
            reads: Rc::new(Cell::new(0)),
            fail_after: None,
        }
    }

    /// Every read after the first `reads` fails.
    pub fn failing_after(mut self, reads: u32) -> Self {
        self.fail_after = Some(reads);
        self
    }

    pub fn advance_ms(&self, ms: u32) {
        self.now_us
            .set(self.now_us.get().wrapping_add(ms.wrapping_mul(1000)));
    }

    /// A delay that advances this clock by the time it sleeps.
    pub fn delay(&self) -> RecordingDelay {
        RecordingDelay {
            calls: Vec::new(),
            now_us: Some(self.now_us.clone()),
        }
    }
}

impl Clock for ManualClock {
    type T = u32;

    const SCALING_FACTOR: Fraction = Fraction::new(1, 1_000_000);

    fn try_now(&self) -> Result<Instant<Self>, clock::Error> {
        let reads = self.reads.get() + 1;
        self.reads.set(reads);
        match self.fail_after {
            Some(limit) if reads > limit => Err(clock::Error::Unspecified),
            _ => Ok(Instant::new(self.now_us.get())),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct RecordingDelay {
    pub calls: Vec<u32>,
    now_us: Option<Rc<Cell<u32>>>,
}

impl DelayMs<u32> for RecordingDelay {
    fn delay_ms(&mut self, ms: u32) {
        self.calls.push(ms);
        if let Some(now_us) = &self.now_us {
            now_us.set(now_us.get().wrapping_add(ms.wrapping_mul(1000)));
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sent {
    Open,
    Close,
    Takeoff,
    Landing,
    Control(ControlCommand),
}

/// Transport that records every call. Clones share the record.
#[derive(Clone, Debug, Default)]
pub struct RecordingTransport {
    pub sent: Rc<RefCell<Vec<Sent>>>,
    pub fail_controls: Rc<Cell<bool>>,
    pub fail_takeoff: Rc<Cell<bool>>,
    pub fail_open: bool,
}

impl RecordingTransport {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.borrow().clone()
    }

    pub fn count(&self, f: impl Fn(&Sent) -> bool) -> usize {
        self.sent.borrow().iter().filter(|sent| f(sent)).count()
    }

    pub fn takeoffs(&self) -> usize {
        self.count(|sent| *sent == Sent::Takeoff)
    }

    pub fn landings(&self) -> usize {
        self.count(|sent| *sent == Sent::Landing)
    }

    pub fn controls(&self) -> Vec<ControlCommand> {
        self.sent
            .borrow()
            .iter()
            .filter_map(|sent| match sent {
                Sent::Control(command) => Some(*command),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.sent.borrow_mut().clear();
    }
}

impl Transport for RecordingTransport {
    fn send_control(&mut self, command: &ControlCommand) -> Result<(), TransportError> {
        self.sent.borrow_mut().push(Sent::Control(*command));
        if self.fail_controls.get() {
            Err(TransportError::NotAcknowledged)
        } else {
            Ok(())
        }
    }

    fn send_takeoff(&mut self) -> Result<(), TransportError> {
        self.sent.borrow_mut().push(Sent::Takeoff);
        if self.fail_takeoff.get() {
            Err(TransportError::NotAcknowledged)
        } else {
            Ok(())
        }
    }

    fn send_landing(&mut self) -> Result<(), TransportError> {
        self.sent.borrow_mut().push(Sent::Landing);
        Ok(())
    }
}

impl Link for RecordingTransport {
    fn open(&mut self) -> Result<(), TransportError> {
        self.sent.borrow_mut().push(Sent::Open);
        if self.fail_open {
            Err(TransportError::Link("no vehicle".into()))
        } else {
            Ok(())
        }
    }

    fn close(&mut self) {
        self.sent.borrow_mut().push(Sent::Close);
    }
}

/// Sensors returning scripted heights and constant horizontal readings.
#[derive(Clone, Debug, Default)]
pub struct ScriptedSensors {
    pub heights: VecDeque<Result<f32, SensorError>>,
    pub height: f32,
    pub accel: [f32; 2],
    pub flow: [f32; 2],
    pub fail_horizontal: bool,
}

impl ScriptedSensors {
    pub fn hovering(height: f32) -> Self {
        Self {
            height,
            ..Default::default()
        }
    }

    pub fn with_flow(mut self, axis: Axis, flow: f32) -> Self {
        self.flow[axis.index()] = flow;
        self
    }

    pub fn with_accel(mut self, axis: Axis, accel: f32) -> Self {
        self.accel[axis.index()] = accel;
        self
    }
}

impl Sensors for ScriptedSensors {
    fn height(&mut self) -> Result<f32, SensorError> {
        self.heights.pop_front().unwrap_or(Ok(self.height))
    }

    fn accel(&mut self, axis: Axis) -> Result<f32, SensorError> {
        if self.fail_horizontal {
            return Err(SensorError::Unavailable);
        }
        Ok(self.accel[axis.index()])
    }

    fn flow_velocity(&mut self, axis: Axis) -> Result<f32, SensorError> {
        if self.fail_horizontal {
            return Err(SensorError::Unavailable);
        }
        Ok(self.flow[axis.index()])
    }
}
