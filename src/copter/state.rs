use crate::config::Timing;
use crate::hal::{ControlCommand, Transport, TransportError};
use embedded_hal::blocking::delay::DelayMs;
use log::{debug, info, warn};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FlightState {
    #[default]
    Landed,
    Airborne,
}

impl FlightState {
    pub fn is_airborne(self) -> bool {
        self == FlightState::Airborne
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Takeoff {
    Performed,
    /// The vehicle was already airborne; nothing was sent.
    Skipped,
}

/// Result of a landing sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Landing {
    pub attempts: u32,
    pub acknowledged: u32,
    pub was_airborne: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Movement {
    Sent,
    /// The vehicle is landed; the command never reached the transport.
    Dropped,
    /// The transport failed to deliver the command.
    Failed(TransportError),
}

/// Gates every command through the vehicle's flight state.
///
/// Takeoff only happens from `Landed`, movement only while `Airborne`, and landing is sent
/// repeatedly from any state since an acknowledgment does not prove the vehicle touched down.
#[derive(Clone, Debug)]
pub struct FlightStateMachine {
    state: FlightState,
    timing: Timing,
}

impl FlightStateMachine {
    pub fn new(timing: Timing) -> Self {
        Self {
            state: FlightState::Landed,
            timing,
        }
    }

    pub fn state(&self) -> FlightState {
        self.state
    }

    pub fn is_airborne(&self) -> bool {
        self.state.is_airborne()
    }

    /// Take off, wait for the vehicle to stabilize, then hold a neutral hover.
    ///
    /// Stays `Landed` if the takeoff command itself is not delivered.
    pub fn request_takeoff<T, D>(
        &mut self,
        transport: &mut T,
        delay: &mut D,
    ) -> Result<Takeoff, TransportError>
    where
        T: Transport,
        D: DelayMs<u32>,
    {
        if self.is_airborne() {
            info!("already airborne, takeoff skipped");
            return Ok(Takeoff::Skipped);
        }

        info!("taking off");
        if let Err(error) = transport.send_takeoff() {
            warn!("takeoff failed: {}", error);
            return Err(error);
        }
        self.state = FlightState::Airborne;

        delay.delay_ms(self.timing.takeoff_stabilize_ms);
        let hover = ControlCommand::hover(self.timing.takeoff_hover_ms);
        if let Err(error) = transport.send_control(&hover) {
            warn!("post-takeoff hover failed: {}", error);
        }

        Ok(Takeoff::Performed)
    }

    /// Send the landing command `landing_repeats` times, pausing between each.
    ///
    /// Always ends `Landed`; failed sends are logged and the sequence carries on.
    pub fn request_landing<T, D>(&mut self, transport: &mut T, delay: &mut D) -> Landing
    where
        T: Transport,
        D: DelayMs<u32>,
    {
        let was_airborne = self.is_airborne();
        if !was_airborne {
            debug!("landing requested while landed");
        }
        info!("landing");

        let attempts = self.timing.landing_repeats;
        let acknowledged = send_repeated(transport, delay, attempts, self.timing.landing_interval_ms);
        if acknowledged == 0 {
            warn!("no landing command was acknowledged");
        }
        self.state = FlightState::Landed;

        Landing {
            attempts,
            acknowledged,
            was_airborne,
        }
    }

    /// Forward a movement command if airborne.
    pub fn request_movement<T>(&mut self, transport: &mut T, command: &ControlCommand) -> Movement
    where
        T: Transport,
    {
        if !self.is_airborne() {
            warn!("vehicle is landed, dropping {}", command);
            return Movement::Dropped;
        }

        match transport.send_control(command) {
            Ok(()) => Movement::Sent,
            Err(error) => {
                warn!("{} failed: {}", command, error);
                Movement::Failed(error)
            }
        }
    }

    /// Bring a vehicle in an unknown state to a known `Landed` one.
    ///
    /// Lands `reset_repeats` times and then sends a neutral hover, the only movement
    /// permitted while landed.
    pub fn reset<T, D>(&mut self, transport: &mut T, delay: &mut D)
    where
        T: Transport,
        D: DelayMs<u32>,
    {
        info!("resetting vehicle state");
        send_repeated(
            transport,
            delay,
            self.timing.reset_repeats,
            self.timing.reset_interval_ms,
        );
        self.state = FlightState::Landed;

        if let Err(error) = transport.send_control(&ControlCommand::hover(self.timing.reset_hover_ms)) {
            warn!("reset hover failed: {}", error);
        }
    }
}

fn send_repeated<T, D>(transport: &mut T, delay: &mut D, repeats: u32, interval_ms: u32) -> u32
where
    T: Transport,
    D: DelayMs<u32>,
{
    let mut acknowledged = 0;
    for attempt in 1..=repeats {
        match transport.send_landing() {
            Ok(()) => acknowledged += 1,
            Err(error) => warn!("landing {}/{} failed: {}", attempt, repeats, error),
        }
        delay.delay_ms(interval_ms);
    }
    acknowledged
}

#[cfg(test)]
mod tests {
    use super::{FlightState, FlightStateMachine, Movement, Takeoff};
    use crate::config::Timing;
    use crate::hal::{ControlCommand, TransportError};
    use crate::test_utils::{RecordingDelay, RecordingTransport, Sent};

    fn machine() -> FlightStateMachine {
        FlightStateMachine::new(Timing::default())
    }

    #[test]
    fn takeoff_then_hover() {
        let mut transport = RecordingTransport::default();
        let mut delay = RecordingDelay::default();
        let mut flight = machine();

        assert_eq!(
            flight.request_takeoff(&mut transport, &mut delay),
            Ok(Takeoff::Performed)
        );
        assert_eq!(flight.state(), FlightState::Airborne);
        assert_eq!(
            transport.sent(),
            vec![Sent::Takeoff, Sent::Control(ControlCommand::hover(1500))]
        );
        assert_eq!(delay.calls, vec![2000]);
    }

    #[test]
    fn second_takeoff_is_a_no_op() {
        let mut transport = RecordingTransport::default();
        let mut delay = RecordingDelay::default();
        let mut flight = machine();

        flight.request_takeoff(&mut transport, &mut delay).unwrap();
        assert_eq!(
            flight.request_takeoff(&mut transport, &mut delay),
            Ok(Takeoff::Skipped)
        );
        assert_eq!(transport.takeoffs(), 1);
        assert!(flight.is_airborne());
    }

    #[test]
    fn failed_takeoff_stays_landed() {
        let mut transport = RecordingTransport::default();
        transport.fail_takeoff.set(true);
        let mut flight = machine();

        assert_eq!(
            flight.request_takeoff(&mut transport, &mut RecordingDelay::default()),
            Err(TransportError::NotAcknowledged)
        );
        assert_eq!(flight.state(), FlightState::Landed);
        assert!(transport.controls().is_empty());
    }

    #[test]
    fn landing_repeats_and_always_lands() {
        let mut transport = RecordingTransport::default();
        let mut delay = RecordingDelay::default();
        let mut flight = machine();
        flight.request_takeoff(&mut transport, &mut delay).unwrap();
        transport.clear();
        delay.calls.clear();

        let landing = flight.request_landing(&mut transport, &mut delay);
        assert_eq!(landing.attempts, 3);
        assert_eq!(landing.acknowledged, 3);
        assert!(landing.was_airborne);
        assert_eq!(transport.landings(), 3);
        assert_eq!(delay.calls, vec![500, 500, 500]);
        assert_eq!(flight.state(), FlightState::Landed);
    }

    #[test]
    fn landing_while_landed_still_sends_commands() {
        let mut transport = RecordingTransport::default();
        let mut flight = machine();

        let landing = flight.request_landing(&mut transport, &mut RecordingDelay::default());
        assert!(!landing.was_airborne);
        assert!(transport.landings() >= 2);
        assert_eq!(flight.state(), FlightState::Landed);
    }

    #[test]
    fn movement_while_landed_is_dropped() {
        let mut transport = RecordingTransport::default();
        let mut flight = machine();

        let command = ControlCommand::pitch(30, 800);
        assert_eq!(
            flight.request_movement(&mut transport, &command),
            Movement::Dropped
        );
        assert!(transport.sent().is_empty());
    }

    #[test]
    fn movement_is_gated_until_takeoff() {
        let mut transport = RecordingTransport::default();
        let mut flight = machine();
        let forward = ControlCommand::pitch(25, 100);

        assert_eq!(flight.request_movement(&mut transport, &forward), Movement::Dropped);
        assert_eq!(flight.state(), FlightState::Landed);

        flight
            .request_takeoff(&mut transport, &mut RecordingDelay::default())
            .unwrap();
        assert_eq!(flight.state(), FlightState::Airborne);
        assert_eq!(transport.takeoffs(), 1);
        transport.clear();

        assert_eq!(flight.request_movement(&mut transport, &forward), Movement::Sent);
        assert_eq!(transport.sent(), vec![Sent::Control(forward)]);
    }

    #[test]
    fn movement_failures_are_reported() {
        let mut transport = RecordingTransport::default();
        let mut flight = machine();
        flight
            .request_takeoff(&mut transport, &mut RecordingDelay::default())
            .unwrap();

        let command = ControlCommand::roll(-20, 100);
        assert_eq!(flight.request_movement(&mut transport, &command), Movement::Sent);

        transport.fail_controls.set(true);
        assert_eq!(
            flight.request_movement(&mut transport, &command),
            Movement::Failed(TransportError::NotAcknowledged)
        );
        assert!(flight.is_airborne());
    }

    #[test]
    fn reset_lands_then_hovers() {
        let mut transport = RecordingTransport::default();
        let mut delay = RecordingDelay::default();
        let mut flight = machine();

        flight.reset(&mut transport, &mut delay);
        assert_eq!(
            transport.sent(),
            vec![
                Sent::Landing,
                Sent::Landing,
                Sent::Landing,
                Sent::Control(ControlCommand::hover(500)),
            ]
        );
        assert_eq!(delay.calls, vec![300, 300, 300]);
        assert_eq!(flight.state(), FlightState::Landed);
    }
}
