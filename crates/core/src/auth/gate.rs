//! Authentication gate
//!
//! Decides what the rendering layer shows for protected content.

use authgate_domain::{AuthPhase, EngineConfig, GateDecision};
use url::Url;

/// Gate decision function
pub struct AuthGate;

impl AuthGate {
    /// Decide what to render.
    ///
    /// Priority: callback route, then error, then loading, then
    /// unauthenticated. An error is shown even while loading.
    #[must_use]
    pub const fn decide(is_callback_route: bool, phase: &AuthPhase) -> GateDecision {
        if is_callback_route {
            return GateDecision::Children;
        }
        match phase {
            AuthPhase::Error(_) => GateDecision::Error,
            AuthPhase::Loading => GateDecision::Loading,
            AuthPhase::Unauthenticated => GateDecision::Login,
            AuthPhase::Authenticated(_) => GateDecision::Children,
        }
    }
}

/// Whether `location` is the OAuth callback target.
///
/// Suffix match on the path; query string and fragment are ignored.
/// `location` may be an absolute URL or a bare path.
pub fn is_callback_route(location: &str, config: &EngineConfig) -> bool {
    let path = Url::parse(location).map_or_else(
        |_| location.split(['?', '#']).next().unwrap_or_default().to_string(),
        |url| url.path().to_string(),
    );
    let path = path.trim_end_matches('/');

    config.callback_paths().any(|suffix| {
        let suffix = suffix.trim_end_matches('/');
        !suffix.is_empty() && path.ends_with(suffix)
    })
}
