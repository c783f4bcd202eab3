use std::time::Duration;

use log::{info, warn};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::control_interface::HubClient;
use crate::light::batch::{apply_updates, TickReport};
use crate::light::gamut::{ColorGamut, GamutRegistry, XyPoint};
use crate::light::light_ref::LightRef;
use crate::light::light_state::LightStateUpdate;
use crate::util::error::HubError;
use crate::util::task::{pause, SweepTask};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepConfig {
    /// Time to travel along one edge of a gamut triangle.
    pub lap: Duration,
    /// Time between two rounds of updates.
    pub tick: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        SweepConfig {
            lap: Duration::from_secs(5),
            tick: Duration::from_millis(300),
        }
    }
}

/// Where on its gamut a light is at a given moment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepPoint {
    /// Edge of the triangle, 0..=2.
    pub segment: usize,
    /// Weight of `vertex[segment]`; the following vertex gets `1 - frac`.
    pub frac: f64,
    pub point: XyPoint,
}

/// Splits `laps + stagger` into an edge index and the position along it.
///
/// Only `stagger mod 3` matters, so large identifiers keep full precision.
pub fn sweep_phase(laps: f64, stagger: u64) -> (usize, f64) {
    let phase = (laps + (stagger % 3) as f64).rem_euclid(3.0);
    let segment = (phase.floor() as usize).min(2);
    (segment, phase - segment as f64)
}

pub fn sweep_point(gamut: &ColorGamut, laps: f64, stagger: u64) -> SweepPoint {
    let (segment, frac) = sweep_phase(laps, stagger);
    SweepPoint {
        segment,
        frac,
        point: gamut.edge_point(segment, frac),
    }
}

/// Continuously moves every light around the corners of its own gamut, each light offset
/// from the others.
#[derive(Debug, Clone)]
pub struct ColorAnimator {
    client: HubClient,
    registry: GamutRegistry,
    config: SweepConfig,
}

impl ColorAnimator {
    pub fn new(client: HubClient, registry: GamutRegistry) -> Self {
        ColorAnimator {
            client,
            registry,
            config: SweepConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SweepConfig) -> Self {
        self.config = config;
        self
    }

    /// The color of every light `elapsed` after the start of the animation.
    pub fn frame(&self, elapsed: Duration) -> Vec<(LightRef, XyPoint)> {
        let laps = elapsed.as_secs_f64() / self.config.lap.as_secs_f64();
        self.registry
            .iter()
            .map(|(light, gamut)| {
                let sweep = sweep_point(gamut, laps, light.stagger_index());
                (light.clone(), sweep.point)
            })
            .collect()
    }

    /// Sends one frame, one request per light.
    pub async fn tick(&self, elapsed: Duration) -> TickReport {
        let updates = self
            .frame(elapsed)
            .into_iter()
            .map(|(light, point)| (light, LightStateUpdate::Xy(point)));
        apply_updates(&self.client, updates).await
    }

    /// Ticks until `cancel` fires. Returns early only if a light reports a fatal error.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<(), HubError> {
        let origin = Instant::now();
        info!("color sweep started for {} lights", self.registry.len());
        while !cancel.is_cancelled() {
            let report = self.tick(origin.elapsed()).await.check_fatal()?;
            if !report.is_clean() {
                warn!(
                    "{} of {} lights failed this tick",
                    report.failed.len(),
                    report.failed.len() + report.updated.len()
                );
            }
            if !pause(cancel, self.config.tick).await {
                break;
            }
        }
        info!("color sweep stopped");
        Ok(())
    }

    pub fn start(self) -> SweepTask {
        SweepTask::spawn(move |cancel| async move { self.run(&cancel).await })
    }
}
