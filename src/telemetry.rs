//! Telemetry utilities for request timing and span construction.

use std::time::Instant;

/// Guard for timing a request and recording its latency.
///
/// Records route latency when dropped.
pub struct RequestTimer {
    route: &'static str,
    start: Instant,
}

impl RequestTimer {
    /// Start timing a request to `route`.
    pub fn new(route: &'static str) -> Self {
        Self {
            route,
            start: Instant::now(),
        }
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        crate::metrics::observe_request(self.route, duration);
    }
}

/// Standardized span constructors.
pub mod spans {
    use tracing::{Span, info_span};

    /// Span for a login attempt on `device`.
    pub fn login(device: &str) -> Span {
        info_span!("login", device = %device)
    }

    /// Span for a refresh token rotation.
    pub fn refresh(device: &str) -> Span {
        info_span!("refresh", device = %device)
    }

    /// Span for a bearer-authenticated request.
    pub fn request(route: &str, user_id: Option<i64>) -> Span {
        if let Some(user_id) = user_id {
            info_span!("request", route = %route, user_id)
        } else {
            info_span!("request", route = %route)
        }
    }
}
