//! Speed display controller and the capabilities it is driven through.

use shared::domain::{ProviderId, SubscriptionParams};

mod controller;
pub mod display;

pub use controller::SpeedDisplayController;

/// Source of location samples and provider availability.
///
/// Samples and availability changes are not delivered through this trait;
/// the implementation pushes them as `ControllerEvent`s into whatever event
/// loop owns the controller.
pub trait LocationProvider {
    fn is_available(&self, provider: &ProviderId) -> bool;

    /// Start delivering samples. Subscribing while already subscribed keeps
    /// the existing stream.
    fn subscribe(
        &mut self,
        provider: &ProviderId,
        params: SubscriptionParams,
    ) -> anyhow::Result<()>;

    /// Stop delivering samples. Must be safe to call when not subscribed.
    fn unsubscribe(&mut self);

    /// Forward the user to wherever the provider can be switched on.
    fn open_location_settings(&mut self) -> anyhow::Result<()>;
}

pub trait DisplaySurface {
    fn set_control_label(&mut self, text: &str);
    fn set_primary_reading(&mut self, text: &str);
    fn set_secondary_reading(&mut self, text: &str);
    /// Show a yes/no confirmation; the answer comes back as
    /// `ControllerEvent::PromptAnswered`.
    fn request_enable_provider(&mut self, text: &str);
    fn notify(&mut self, text: &str);
}

impl<T: LocationProvider + ?Sized> LocationProvider for Box<T> {
    fn is_available(&self, provider: &ProviderId) -> bool {
        (**self).is_available(provider)
    }

    fn subscribe(
        &mut self,
        provider: &ProviderId,
        params: SubscriptionParams,
    ) -> anyhow::Result<()> {
        (**self).subscribe(provider, params)
    }

    fn unsubscribe(&mut self) {
        (**self).unsubscribe()
    }

    fn open_location_settings(&mut self) -> anyhow::Result<()> {
        (**self).open_location_settings()
    }
}
