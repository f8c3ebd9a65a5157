//! Probe aggregation and readiness/liveness toggles.

use std::fmt;

use tracing::{debug, warn};

use sredash_domain::{HealthState, ProbeEndpoint, ProbeResult};
use sredash_ports::{HttpResponse, HttpTransport, ProbeError};

use crate::client::ProbeClient;

/// Map one probe call to its result. Errors never escape; they become a
/// failed probe carrying the synthetic status.
pub fn probe_result(
    endpoint: ProbeEndpoint,
    outcome: Result<HttpResponse, ProbeError>,
) -> ProbeResult {
    match outcome {
        Ok(response) => ProbeResult::from_status(endpoint, response.status),
        Err(err) => {
            debug!(%endpoint, error = %err, "probe failed");
            ProbeResult::failed(endpoint)
        }
    }
}

/// Issue the three probes concurrently and collect one result per endpoint,
/// in health, ready, live order.
pub async fn fetch_probe_results<T: HttpTransport>(client: &ProbeClient<T>) -> [ProbeResult; 3] {
    let (health, ready, live) =
        tokio::join!(client.get_health(), client.get_ready(), client.get_live());
    [
        probe_result(ProbeEndpoint::Health, health),
        probe_result(ProbeEndpoint::Ready, ready),
        probe_result(ProbeEndpoint::Live, live),
    ]
}

/// Fetch all probes and fold them into a [`HealthState`]. Never fails.
pub async fn fetch_health<T: HttpTransport>(client: &ProbeClient<T>) -> HealthState {
    let results = fetch_probe_results(client).await;
    HealthState::from_results(&results)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleTarget {
    Ready,
    Live,
}

impl ToggleTarget {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Live => "live",
        }
    }

    /// Current value of the toggled flag.
    pub fn current(self, state: &HealthState) -> bool {
        match self {
            Self::Ready => state.ready,
            Self::Live => state.live,
        }
    }
}

impl fmt::Display for ToggleTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Enable or disable `target` on the backend. The caller resyncs afterwards.
pub async fn apply_toggle<T: HttpTransport>(
    client: &ProbeClient<T>,
    target: ToggleTarget,
    enable: bool,
) -> Result<(), ProbeError> {
    let outcome = match (target, enable) {
        (ToggleTarget::Ready, true) => client.enable_ready().await,
        (ToggleTarget::Ready, false) => client.disable_ready().await,
        (ToggleTarget::Live, true) => client.enable_live().await,
        (ToggleTarget::Live, false) => client.disable_live().await,
    };
    match outcome {
        Ok(_) => Ok(()),
        Err(err) => {
            warn!(%target, enable, error = %err, "toggle request failed");
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use sredash_domain::{DerivedStatus, SYNTHETIC_FAILURE_STATUS};
    use sredash_ports::HttpMethod;
    use sredash_ports::testing::ScriptedTransport;

    fn scripted(health: u16, ready: u16, live: u16) -> ScriptedTransport {
        let transport = ScriptedTransport::new("http://localhost:8080");
        transport
            .respond(HttpMethod::Get, "/healthz", health, "{}")
            .respond(HttpMethod::Get, "/readyz", ready, "{}")
            .respond(HttpMethod::Get, "/livez", live, "{}");
        transport
    }

    #[tokio::test]
    async fn test_all_probes_ok() {
        let client = ProbeClient::new(scripted(200, 200, 200));
        let state = fetch_health(&client).await;
        assert_eq!(state, HealthState::new(true, true, true));
        assert_eq!(state.status(), DerivedStatus::Healthy);
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_other_results() {
        let client = ProbeClient::new(scripted(200, 503, 200));
        let state = fetch_health(&client).await;
        assert_eq!(state, HealthState::new(true, false, true));
        assert_eq!(state.status(), DerivedStatus::NotReady);
    }

    #[tokio::test]
    async fn test_non_2xx_everywhere_is_all_false() {
        let client = ProbeClient::new(scripted(500, 404, 503));
        let state = fetch_health(&client).await;
        assert_eq!(state, HealthState::default());
        assert_eq!(state.status(), DerivedStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_transport_error_becomes_synthetic_status() {
        let transport = scripted(200, 200, 200);
        transport.fail(HttpMethod::Get, "/livez", "connection refused");
        let client = ProbeClient::new(transport);

        let results = fetch_probe_results(&client).await;
        assert!(results[0].succeeded);
        assert!(!results[2].succeeded);
        assert_eq!(results[2].status_code, Some(SYNTHETIC_FAILURE_STATUS));
    }

    #[tokio::test]
    async fn test_only_200_counts_as_success() {
        let client = ProbeClient::new(scripted(204, 200, 200));
        let results = fetch_probe_results(&client).await;
        assert!(!results[0].succeeded);
        assert_eq!(results[0].status_code, Some(204));
    }

    #[tokio::test(start_paused = true)]
    async fn test_probes_run_concurrently() {
        let transport = ScriptedTransport::new("http://localhost:8080");
        let delay = Duration::from_millis(300);
        transport
            .respond_after(HttpMethod::Get, "/healthz", delay, 200, "{}")
            .respond_after(HttpMethod::Get, "/readyz", delay, 200, "{}")
            .respond_after(HttpMethod::Get, "/livez", delay, 200, "{}");
        let client = ProbeClient::new(transport.clone());

        let started = tokio::time::Instant::now();
        let state = fetch_health(&client).await;
        assert!(state.is_healthy());
        assert!(started.elapsed() < delay * 2);
        assert_eq!(transport.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_toggle_routes() {
        let transport = ScriptedTransport::new("http://localhost:8080");
        transport
            .respond(HttpMethod::Put, "/readyz/disable", 200, "{}")
            .respond(HttpMethod::Put, "/livez/enable", 200, "{}");
        let client = ProbeClient::new(transport.clone());

        apply_toggle(&client, ToggleTarget::Ready, false).await.unwrap();
        apply_toggle(&client, ToggleTarget::Live, true).await.unwrap();
        assert_eq!(
            transport.call_log(),
            vec!["PUT /readyz/disable", "PUT /livez/enable"]
        );
    }

    #[tokio::test]
    async fn test_toggle_failure_is_returned() {
        let transport = ScriptedTransport::new("http://localhost:8080");
        transport.respond(HttpMethod::Put, "/readyz/enable", 500, "boom");
        let client = ProbeClient::new(transport);

        let err = apply_toggle(&client, ToggleTarget::Ready, true)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(500));
    }
}
