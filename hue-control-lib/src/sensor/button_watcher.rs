use std::time::Duration;

use chrono::{DateTime, Local};
use log::{debug, info, warn};
use serde_json::{Map, Value};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::control_interface::HubClient;
use crate::light::batch::{apply_updates, TickReport};
use crate::light::light_ref::LightRef;
use crate::light::light_state::LightStateUpdate;
use crate::util::error::HubError;
use crate::util::task::{pause, SweepTask};

/// Button event code a dimmer switch reports while its off button is held down.
pub const LONG_OFF_PRESS: i64 = 4003;

const MAX_HUE: f64 = 65535.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatchConfig {
    pub gesture_code: i64,
    /// Time for the hue of one light to go once around the color wheel.
    pub hue_period: Duration,
    /// Poll interval while the gesture is held.
    pub active_poll: Duration,
    /// Poll interval otherwise.
    pub idle_poll: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        WatchConfig {
            gesture_code: LONG_OFF_PRESS,
            hue_period: Duration::from_secs(16),
            active_poll: Duration::from_millis(200),
            idle_poll: Duration::from_secs(1),
        }
    }
}

/// The button state read from a sensor. `code` is `None` when the sensor has never reported
/// a button event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorButtonEvent {
    pub code: Option<i64>,
    pub observed_at: DateTime<Local>,
}

impl SensorButtonEvent {
    /// Reads `state.buttonevent` from sensor metadata.
    pub fn from_sensor(sensor: &Map<String, Value>, observed_at: DateTime<Local>) -> Result<Self, HubError> {
        let state = sensor
            .get("state")
            .and_then(Value::as_object)
            .ok_or_else(|| HubError::MalformedResponse("sensor has no state".to_string()))?;
        let code = match state.get("buttonevent") {
            None | Some(Value::Null) => None,
            Some(value) => Some(value.as_i64().ok_or_else(|| {
                HubError::MalformedResponse(format!("buttonevent is not an integer: {}", value))
            })?),
        };
        Ok(SensorButtonEvent { code, observed_at })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressState {
    Idle,
    PressActive,
}

/// What a single observation did to the [`PressTracker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Idle -> PressActive; the elapsed time origin was reset.
    PressStarted,
    /// PressActive -> PressActive.
    PressHeld,
    /// PressActive -> Idle.
    PressEnded,
    /// Idle -> Idle.
    Idle,
}

/// Two-state machine that follows a held gesture across polls.
#[derive(Debug, Clone)]
pub struct PressTracker {
    gesture_code: i64,
    state: PressState,
    origin: Option<Instant>,
}

impl PressTracker {
    pub fn new(gesture_code: i64) -> Self {
        PressTracker {
            gesture_code,
            state: PressState::Idle,
            origin: None,
        }
    }

    pub fn state(&self) -> PressState {
        self.state
    }

    /// When the current press started, if one is active.
    pub fn origin(&self) -> Option<Instant> {
        self.origin
    }

    pub fn observe(&mut self, code: Option<i64>, now: Instant) -> Transition {
        let is_gesture = code == Some(self.gesture_code);
        match (self.state, is_gesture) {
            (PressState::Idle, true) => {
                self.state = PressState::PressActive;
                self.origin = Some(now);
                Transition::PressStarted
            }
            (PressState::PressActive, true) => Transition::PressHeld,
            (PressState::PressActive, false) => {
                self.state = PressState::Idle;
                self.origin = None;
                Transition::PressEnded
            }
            (PressState::Idle, false) => Transition::Idle,
        }
    }

    /// Time since the press started, if one is active.
    pub fn elapsed(&self, now: Instant) -> Option<Duration> {
        self.origin.map(|origin| now.saturating_duration_since(origin))
    }
}

/// Native hue for a light `elapsed` into a press, staggered by a third of a turn per
/// identifier step.
pub fn sweep_hue(elapsed: Duration, period: Duration, stagger: u64) -> u16 {
    let turns = elapsed.as_secs_f64() / period.as_secs_f64() - (stagger % 3) as f64 / 3.0;
    (turns.rem_euclid(1.0) * MAX_HUE) as u16
}

#[derive(Debug)]
pub struct PollOutcome {
    pub event: SensorButtonEvent,
    pub transition: Transition,
    /// Hue updates sent during this poll, present while the press is active.
    pub report: Option<TickReport>,
    /// How long to wait before the next poll.
    pub next_poll: Duration,
}

/// Polls a switch and, while its gesture is held, rotates the hue of every light.
#[derive(Debug, Clone)]
pub struct ButtonWatcher {
    client: HubClient,
    sensor_id: String,
    lights: Vec<LightRef>,
    config: WatchConfig,
    tracker: PressTracker,
}

impl ButtonWatcher {
    pub fn new(client: HubClient, sensor_id: impl Into<String>, lights: Vec<LightRef>) -> Self {
        ButtonWatcher::with_config(client, sensor_id, lights, WatchConfig::default())
    }

    pub fn with_config(
        client: HubClient,
        sensor_id: impl Into<String>,
        lights: Vec<LightRef>,
        config: WatchConfig,
    ) -> Self {
        ButtonWatcher {
            client,
            sensor_id: sensor_id.into(),
            lights,
            config,
            tracker: PressTracker::new(config.gesture_code),
        }
    }

    pub fn tracker(&self) -> &PressTracker {
        &self.tracker
    }

    fn poll_interval(&self) -> Duration {
        match self.tracker.state() {
            PressState::PressActive => self.config.active_poll,
            PressState::Idle => self.config.idle_poll,
        }
    }

    pub async fn read_event(&self) -> Result<SensorButtonEvent, HubError> {
        let sensor = self.client.get_sensor(&self.sensor_id).await?;
        SensorButtonEvent::from_sensor(&sensor, Local::now())
    }

    /// One cycle: read the sensor, advance the state machine and, while the press is
    /// active, send a hue to every light.
    pub async fn poll(&mut self, now: Instant) -> Result<PollOutcome, HubError> {
        let event = self.read_event().await?;
        let transition = self.tracker.observe(event.code, now);
        match transition {
            Transition::PressStarted => info!("sensor {}: long press started", self.sensor_id),
            Transition::PressEnded => info!("sensor {}: long press ended", self.sensor_id),
            _ => debug!("sensor {}: {:?} ({:?})", self.sensor_id, transition, event.code),
        }

        let report = match self.tracker.elapsed(now) {
            Some(elapsed) => {
                let period = self.config.hue_period;
                let updates: Vec<_> = self
                    .lights
                    .iter()
                    .map(|light| {
                        let hue = sweep_hue(elapsed, period, light.stagger_index());
                        (light.clone(), LightStateUpdate::Hue(hue))
                    })
                    .collect();
                Some(apply_updates(&self.client, updates).await.check_fatal()?)
            }
            None => None,
        };

        Ok(PollOutcome {
            event,
            transition,
            report,
            next_poll: self.poll_interval(),
        })
    }

    /// Polls until `cancel` fires. A failed poll is retried on the next cycle unless the
    /// failure is fatal.
    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<(), HubError> {
        info!(
            "watching sensor {} for button event {}",
            self.sensor_id, self.config.gesture_code
        );
        while !cancel.is_cancelled() {
            let delay = match self.poll(Instant::now()).await {
                Ok(outcome) => outcome.next_poll,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("polling sensor {} failed: {}", self.sensor_id, e);
                    self.poll_interval()
                }
            };
            if !pause(cancel, delay).await {
                break;
            }
        }
        info!("stopped watching sensor {}", self.sensor_id);
        Ok(())
    }

    pub fn start(self) -> SweepTask {
        SweepTask::spawn(move |cancel| async move {
            let mut watcher = self;
            watcher.run(&cancel).await
        })
    }
}
