use log::{debug, warn};

use crate::control_interface::HubClient;
use crate::light::light_ref::LightRef;
use crate::light::light_state::LightStateUpdate;
use crate::util::error::HubError;

/// Outcome of sending one update to each of a set of lights.
#[derive(Debug, Default)]
pub struct TickReport {
    pub updated: Vec<LightRef>,
    pub failed: Vec<(LightRef, HubError)>,
}

impl TickReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// Turns the report into an error if any light failed in a way that no later call can
    /// recover from, such as a revoked token.
    pub fn check_fatal(mut self) -> Result<Self, HubError> {
        match self.failed.iter().position(|(_, e)| e.is_fatal()) {
            Some(index) => Err(self.failed.swap_remove(index).1),
            None => Ok(self),
        }
    }
}

/// Sends each update in order. A failing light is recorded and the rest still get their
/// update.
pub async fn apply_updates<I>(client: &HubClient, updates: I) -> TickReport
where
    I: IntoIterator<Item = (LightRef, LightStateUpdate)>,
{
    let mut report = TickReport::default();
    for (light, update) in updates {
        match client.set_light_state(&light, update).await {
            Ok(_) => {
                debug!("light {} <- {:?}", light, update);
                report.updated.push(light);
            }
            Err(e) => {
                warn!("light {} rejected {:?}: {}", light, update, e);
                report.failed.push((light, e));
            }
        }
    }
    report
}
