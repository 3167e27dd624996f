use shared::{
    domain::{ProviderId, ProviderStatus, RunState, SpeedReading, SpeedSample, SubscriptionParams},
    error::ParseRunStateError,
    protocol::{ControllerEvent, PromptAnswer},
};
use tracing::{debug, info, warn};

use crate::{
    display::{
        format_kmh, format_mps, ENABLE_PROVIDER_PROMPT, LABEL_START, LABEL_STOP, NO_KMH, NO_MPS,
        PROVIDER_DISABLED_NOTICE, SETTINGS_FAILED_NOTICE, SUBSCRIBE_FAILED_NOTICE,
    },
    DisplaySurface, LocationProvider,
};

/// Two-state speed display: holds a location subscription exactly while
/// `STARTED`.
pub struct SpeedDisplayController<P, D> {
    provider: P,
    display: D,
    provider_id: ProviderId,
    params: SubscriptionParams,
    state: RunState,
    paused_state: RunState,
    last_reading: Option<SpeedReading>,
    prompt_pending: bool,
}

impl<P: LocationProvider, D: DisplaySurface> SpeedDisplayController<P, D> {
    pub fn new(provider: P, display: D) -> Self {
        Self::with_provider_id(provider, display, ProviderId::gps())
    }

    pub fn with_provider_id(provider: P, display: D, provider_id: ProviderId) -> Self {
        Self {
            provider,
            display,
            provider_id,
            params: SubscriptionParams::UNTHROTTLED,
            state: RunState::Stopped,
            paused_state: RunState::Stopped,
            last_reading: None,
            prompt_pending: false,
        }
    }

    pub fn handle(&mut self, event: ControllerEvent) {
        debug!(event = event.name(), state = %self.state, "controller event");
        match event {
            ControllerEvent::UserToggle => self.toggle(),
            ControllerEvent::LocationSample(sample) => self.on_location_sample(&sample),
            ControllerEvent::ProviderEnabled(provider) => self.on_provider_enabled(&provider),
            ControllerEvent::ProviderDisabled(provider) => self.on_provider_disabled(&provider),
            ControllerEvent::ProviderStatusChanged { provider, status } => {
                self.on_provider_status_changed(&provider, status)
            }
            ControllerEvent::EnterForeground => self.on_foreground(),
            ControllerEvent::EnterBackground => self.on_background(),
            ControllerEvent::PromptAnswered(answer) => self.on_prompt_answer(answer),
        }
    }

    pub fn toggle(&mut self) {
        match self.state {
            RunState::Stopped => {
                if self.provider.is_available(&self.provider_id) {
                    self.prompt_pending = false;
                    self.set_state(RunState::Started);
                } else {
                    info!(provider = %self.provider_id, "provider unavailable; asking user to enable it");
                    self.prompt_pending = true;
                    self.display.request_enable_provider(ENABLE_PROVIDER_PROMPT);
                }
            }
            RunState::Started => self.set_state(RunState::Stopped),
        }
    }

    pub fn on_location_sample(&mut self, sample: &SpeedSample) {
        debug!("location changed");
        if self.state != RunState::Started {
            debug!(state = %self.state, "dropping sample delivered after unsubscribe");
            return;
        }
        let Some(speed) = sample.speed_mps() else {
            debug!("location does not have speed");
            return;
        };

        let reading = SpeedReading::from_mps(speed);
        self.display.set_primary_reading(&format_mps(&reading));
        self.display.set_secondary_reading(&format_kmh(&reading));
        self.last_reading = Some(reading);
    }

    pub fn on_provider_enabled(&mut self, provider: &ProviderId) {
        debug!(%provider, "provider enabled");
    }

    pub fn on_provider_disabled(&mut self, provider: &ProviderId) {
        if *provider != self.provider_id {
            debug!(%provider, "ignoring disabled provider that is not in use");
            return;
        }
        if self.state == RunState::Stopped {
            debug!(%provider, "provider disabled while already stopped");
        } else {
            info!(%provider, "provider disabled");
        }
        self.display.notify(PROVIDER_DISABLED_NOTICE);
        self.set_state(RunState::Stopped);
    }

    pub fn on_provider_status_changed(&mut self, provider: &ProviderId, status: ProviderStatus) {
        debug!(%provider, ?status, "provider status changed");
    }

    pub fn on_foreground(&mut self) {
        if self.provider.is_available(&self.provider_id) {
            self.set_state(self.paused_state);
        } else {
            self.set_state(RunState::Stopped);
        }
    }

    pub fn on_background(&mut self) {
        self.paused_state = self.state;
        self.set_state(RunState::Stopped);
    }

    pub fn on_prompt_answer(&mut self, answer: PromptAnswer) {
        if !std::mem::take(&mut self.prompt_pending) {
            debug!(?answer, "no enable prompt pending; ignoring answer");
            return;
        }
        if answer == PromptAnswer::No {
            return;
        }
        if let Err(error) = self.provider.open_location_settings() {
            warn!(%error, "failed to open location settings");
            self.display.notify(SETTINGS_FAILED_NOTICE);
        }
    }

    pub fn save_state(&self) -> String {
        self.paused_state.as_str().to_string()
    }

    pub fn restore_state(&mut self, token: &str) -> Result<(), ParseRunStateError> {
        self.paused_state = token.parse()?;
        Ok(())
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn paused_state(&self) -> RunState {
        self.paused_state
    }

    pub fn last_reading(&self) -> Option<SpeedReading> {
        self.last_reading
    }

    pub fn prompt_pending(&self) -> bool {
        self.prompt_pending
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn into_parts(self) -> (P, D) {
        (self.provider, self.display)
    }

    fn set_state(&mut self, new_state: RunState) {
        match new_state {
            RunState::Stopped => self.apply_stopped(),
            RunState::Started => {
                if let Err(error) = self.provider.subscribe(&self.provider_id, self.params) {
                    warn!(provider = %self.provider_id, %error, "location subscription failed");
                    self.apply_stopped();
                    self.display.notify(SUBSCRIBE_FAILED_NOTICE);
                    return;
                }
                self.display.set_control_label(LABEL_STOP);
                self.transition(RunState::Started);
            }
        }
    }

    fn apply_stopped(&mut self) {
        self.provider.unsubscribe();
        self.display.set_control_label(LABEL_START);
        self.display.set_secondary_reading(NO_KMH);
        self.display.set_primary_reading(NO_MPS);
        self.transition(RunState::Stopped);
    }

    fn transition(&mut self, new_state: RunState) {
        if self.state != new_state {
            info!(from = %self.state, to = %new_state, "run state changed");
        }
        self.state = new_state;
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
