use serde::{Deserialize, Serialize};

use crate::domain::{ProviderId, ProviderStatus, SpeedSample};

/// Reply to the enable-provider confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptAnswer {
    Yes,
    No,
}

/// Everything the controller reacts to, from the user, the provider and the
/// host lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ControllerEvent {
    UserToggle,
    LocationSample(SpeedSample),
    ProviderEnabled(ProviderId),
    ProviderDisabled(ProviderId),
    ProviderStatusChanged {
        provider: ProviderId,
        status: ProviderStatus,
    },
    EnterForeground,
    EnterBackground,
    PromptAnswered(PromptAnswer),
}

impl ControllerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::UserToggle => "user_toggle",
            Self::LocationSample(_) => "location_sample",
            Self::ProviderEnabled(_) => "provider_enabled",
            Self::ProviderDisabled(_) => "provider_disabled",
            Self::ProviderStatusChanged { .. } => "provider_status_changed",
            Self::EnterForeground => "enter_foreground",
            Self::EnterBackground => "enter_background",
            Self::PromptAnswered(_) => "prompt_answered",
        }
    }
}
