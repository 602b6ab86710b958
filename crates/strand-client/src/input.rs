//! Physical controller polling.
//!
//! Pads are sampled on a fixed cadence and diffed against the previous
//! snapshot; only changed button and axis values are forwarded as discrete
//! events. The diff core is pure so the cadence, deadzone and inactivity
//! window are all testable without a device or a clock.

use gilrs::{Axis, Button, Gamepad, Gilrs};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

pub const POLL_INTERVAL: Duration = Duration::from_millis(16);
pub const MAX_PADS: usize = 4;
pub const DEFAULT_AXIS_DEADZONE: f32 = 0.05;
/// A poller that has seen no pad at all for this long stops itself.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Observer for controller state changes. Default bodies drop the event.
pub trait PadEvents: Send + Sync {
    fn on_button(&self, _pad: usize, _button: usize, _value: f32) {}
    fn on_axis(&self, _pad: usize, _axis: usize, _value: f32) {}
}

/// Raw state of one pad at one sample point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PadSnapshot {
    pub buttons: Vec<f32>,
    pub axes: Vec<f32>,
}

/// Produces one snapshot per connected pad slot.
pub trait PadSource: Send {
    fn poll(&mut self) -> [Option<PadSnapshot>; MAX_PADS];
}

pub fn normalize_deadzone(deadzone: f32) -> f32 {
    deadzone.clamp(0.0, 0.95)
}

fn apply_deadzone(value: f32, deadzone: f32) -> f32 {
    if value.abs() < deadzone {
        0.0
    } else {
        value
    }
}

/// Diff-and-callback core of the poller.
pub struct GamepadPoller {
    events: Arc<dyn PadEvents>,
    deadzone: f32,
    state: [Option<PadSnapshot>; MAX_PADS],
    last_active: Instant,
    idle_timeout: Duration,
}

impl GamepadPoller {
    pub fn new(events: Arc<dyn PadEvents>, deadzone: f32) -> Self {
        Self::with_idle_timeout(events, deadzone, IDLE_TIMEOUT)
    }

    pub fn with_idle_timeout(
        events: Arc<dyn PadEvents>,
        deadzone: f32,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            events,
            deadzone: normalize_deadzone(deadzone),
            state: Default::default(),
            last_active: Instant::now(),
            idle_timeout,
        }
    }

    /// Feeds one sample into the poller.
    ///
    /// Returns `false` once no pad has been seen for the inactivity window;
    /// the caller should stop polling then.
    pub fn tick(&mut self, pads: [Option<PadSnapshot>; MAX_PADS], now: Instant) -> bool {
        for (pad, snapshot) in pads.into_iter().enumerate() {
            match snapshot {
                Some(snapshot) => {
                    self.last_active = now;
                    self.diff(pad, snapshot);
                }
                // A pad that went away forgets its state; reconnecting
                // starts from a fresh baseline.
                None => self.state[pad] = None,
            }
        }
        now.duration_since(self.last_active) < self.idle_timeout
    }

    fn diff(&mut self, pad: usize, mut snapshot: PadSnapshot) {
        for value in snapshot.axes.iter_mut() {
            *value = apply_deadzone(*value, self.deadzone);
        }

        match self.state[pad].as_ref() {
            Some(previous) => {
                for (index, &value) in snapshot.buttons.iter().enumerate() {
                    if previous.buttons.get(index).is_some_and(|prev| *prev != value) {
                        self.events.on_button(pad, index, value);
                    }
                }
                for (index, &value) in snapshot.axes.iter().enumerate() {
                    if previous.axes.get(index).is_some_and(|prev| *prev != value) {
                        self.events.on_axis(pad, index, value);
                    }
                }
            }
            // First sample of a pad only establishes the baseline.
            None => {}
        }
        self.state[pad] = Some(snapshot);
    }
}

// Fixed orderings so button/axis indices stay stable across samples.
const BUTTONS: [Button; 17] = [
    Button::South,
    Button::East,
    Button::North,
    Button::West,
    Button::LeftTrigger,
    Button::RightTrigger,
    Button::LeftTrigger2,
    Button::RightTrigger2,
    Button::Select,
    Button::Start,
    Button::Mode,
    Button::LeftThumb,
    Button::RightThumb,
    Button::DPadUp,
    Button::DPadDown,
    Button::DPadLeft,
    Button::DPadRight,
];

const AXES: [Axis; 6] = [
    Axis::LeftStickX,
    Axis::LeftStickY,
    Axis::LeftZ,
    Axis::RightStickX,
    Axis::RightStickY,
    Axis::RightZ,
];

/// Pad source backed by the system controller stack.
pub struct GilrsSource {
    gilrs: Gilrs,
}

impl GilrsSource {
    pub fn new() -> Result<Self, gilrs::Error> {
        Ok(Self {
            gilrs: Gilrs::new()?,
        })
    }
}

impl PadSource for GilrsSource {
    fn poll(&mut self) -> [Option<PadSnapshot>; MAX_PADS] {
        // Drain pending events so connection state is current.
        while self.gilrs.next_event().is_some() {}

        let mut pads: [Option<PadSnapshot>; MAX_PADS] = Default::default();
        for (id, gamepad) in self.gilrs.gamepads() {
            let index: usize = id.into();
            if index < MAX_PADS {
                pads[index] = Some(snapshot_of(&gamepad));
            }
        }
        pads
    }
}

fn snapshot_of(gamepad: &Gamepad<'_>) -> PadSnapshot {
    PadSnapshot {
        buttons: BUTTONS
            .iter()
            .map(|button| {
                gamepad
                    .button_data(*button)
                    .map(|data| data.value())
                    .unwrap_or(0.0)
            })
            .collect(),
        axes: AXES
            .iter()
            .map(|axis| {
                gamepad
                    .axis_data(*axis)
                    .map(|data| data.value())
                    .unwrap_or(0.0)
            })
            .collect(),
    }
}

/// Spawns the polling thread. The thread ends on its own after the
/// inactivity window with no pads.
pub fn spawn_gamepad_thread(events: Arc<dyn PadEvents>, deadzone: f32) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut source = match GilrsSource::new() {
            Ok(source) => source,
            Err(err) => {
                warn!("gamepad init failed: {err}");
                return;
            }
        };
        let mut poller = GamepadPoller::new(events, deadzone);
        loop {
            let pads = source.poll();
            if !poller.tick(pads, Instant::now()) {
                info!("gamepad poller stopped after inactivity");
                return;
            }
            thread::sleep(POLL_INTERVAL);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        buttons: Mutex<Vec<(usize, usize, f32)>>,
        axes: Mutex<Vec<(usize, usize, f32)>>,
    }

    impl PadEvents for Recorder {
        fn on_button(&self, pad: usize, button: usize, value: f32) {
            self.buttons.lock().unwrap().push((pad, button, value));
        }
        fn on_axis(&self, pad: usize, axis: usize, value: f32) {
            self.axes.lock().unwrap().push((pad, axis, value));
        }
    }

    fn pads(slot: usize, snapshot: PadSnapshot) -> [Option<PadSnapshot>; MAX_PADS] {
        let mut pads: [Option<PadSnapshot>; MAX_PADS] = Default::default();
        pads[slot] = Some(snapshot);
        pads
    }

    fn poller(recorder: &Arc<Recorder>) -> GamepadPoller {
        GamepadPoller::new(recorder.clone(), DEFAULT_AXIS_DEADZONE)
    }

    #[test]
    fn first_sample_is_baseline_only() {
        let recorder = Arc::new(Recorder::default());
        let mut poller = poller(&recorder);
        poller.tick(
            pads(
                0,
                PadSnapshot {
                    buttons: vec![1.0, 0.0],
                    axes: vec![0.5],
                },
            ),
            Instant::now(),
        );
        assert!(recorder.buttons.lock().unwrap().is_empty());
        assert!(recorder.axes.lock().unwrap().is_empty());
    }

    #[test]
    fn button_change_fires_exactly_once() {
        let recorder = Arc::new(Recorder::default());
        let mut poller = poller(&recorder);
        let now = Instant::now();
        poller.tick(
            pads(
                1,
                PadSnapshot {
                    buttons: vec![0.0],
                    axes: vec![],
                },
            ),
            now,
        );
        poller.tick(
            pads(
                1,
                PadSnapshot {
                    buttons: vec![1.0],
                    axes: vec![],
                },
            ),
            now,
        );
        poller.tick(
            pads(
                1,
                PadSnapshot {
                    buttons: vec![1.0],
                    axes: vec![],
                },
            ),
            now,
        );
        assert_eq!(*recorder.buttons.lock().unwrap(), vec![(1, 0, 1.0)]);
    }

    #[test]
    fn sub_deadzone_axis_noise_is_silent() {
        let recorder = Arc::new(Recorder::default());
        let mut poller = poller(&recorder);
        let now = Instant::now();
        poller.tick(
            pads(
                0,
                PadSnapshot {
                    buttons: vec![],
                    axes: vec![0.0],
                },
            ),
            now,
        );
        poller.tick(
            pads(
                0,
                PadSnapshot {
                    buttons: vec![],
                    axes: vec![0.03],
                },
            ),
            now,
        );
        assert!(recorder.axes.lock().unwrap().is_empty());

        poller.tick(
            pads(
                0,
                PadSnapshot {
                    buttons: vec![],
                    axes: vec![-0.4],
                },
            ),
            now,
        );
        assert_eq!(*recorder.axes.lock().unwrap(), vec![(0, 0, -0.4)]);
    }

    #[test]
    fn removed_pad_forgets_state() {
        let recorder = Arc::new(Recorder::default());
        let mut poller = poller(&recorder);
        let now = Instant::now();
        poller.tick(
            pads(
                0,
                PadSnapshot {
                    buttons: vec![1.0],
                    axes: vec![],
                },
            ),
            now,
        );
        poller.tick(Default::default(), now);
        // Reappears with a different value: baseline again, no event.
        poller.tick(
            pads(
                0,
                PadSnapshot {
                    buttons: vec![0.0],
                    axes: vec![],
                },
            ),
            now,
        );
        assert!(recorder.buttons.lock().unwrap().is_empty());
    }

    #[test]
    fn stops_after_idle_window() {
        let recorder = Arc::new(Recorder::default());
        let mut poller = GamepadPoller::with_idle_timeout(
            recorder.clone(),
            DEFAULT_AXIS_DEADZONE,
            Duration::from_secs(60),
        );
        let start = Instant::now();
        assert!(poller.tick(Default::default(), start));
        assert!(!poller.tick(Default::default(), start + Duration::from_secs(61)));
    }

    #[test]
    fn pad_activity_refreshes_idle_window() {
        let recorder = Arc::new(Recorder::default());
        let mut poller = GamepadPoller::with_idle_timeout(
            recorder.clone(),
            DEFAULT_AXIS_DEADZONE,
            Duration::from_secs(60),
        );
        let start = Instant::now();
        assert!(poller.tick(
            pads(0, PadSnapshot::default()),
            start + Duration::from_secs(50)
        ));
        assert!(poller.tick(Default::default(), start + Duration::from_secs(100)));
        assert!(!poller.tick(Default::default(), start + Duration::from_secs(111)));
    }

    #[test]
    fn deadzone_is_clamped_to_sane_range() {
        assert_eq!(normalize_deadzone(-1.0), 0.0);
        assert_eq!(normalize_deadzone(2.0), 0.95);
        assert_eq!(normalize_deadzone(0.05), 0.05);
    }
}
