use std::fmt;

use serde::{Deserialize, Serialize};

/// Status recorded for a probe whose request never produced a usable response.
pub const SYNTHETIC_FAILURE_STATUS: u16 = 503;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeEndpoint {
    Health,
    Ready,
    Live,
}

impl ProbeEndpoint {
    pub const ALL: [ProbeEndpoint; 3] = [Self::Health, Self::Ready, Self::Live];

    pub fn path(self) -> &'static str {
        match self {
            Self::Health => "/healthz",
            Self::Ready => "/readyz",
            Self::Live => "/livez",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Health => "health",
            Self::Ready => "ready",
            Self::Live => "live",
        }
    }
}

impl fmt::Display for ProbeEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single probe call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProbeResult {
    pub endpoint: ProbeEndpoint,
    pub succeeded: bool,
    pub status_code: Option<u16>,
}

impl ProbeResult {
    /// A probe passes only on a plain `200 OK`.
    pub fn from_status(endpoint: ProbeEndpoint, status: u16) -> Self {
        Self {
            endpoint,
            succeeded: status == 200,
            status_code: Some(status),
        }
    }

    pub fn failed(endpoint: ProbeEndpoint) -> Self {
        Self {
            endpoint,
            succeeded: false,
            status_code: Some(SYNTHETIC_FAILURE_STATUS),
        }
    }
}

/// Last known probe outcomes. All fields start false until the first fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthState {
    pub healthy: bool,
    pub ready: bool,
    pub live: bool,
}

impl HealthState {
    pub fn new(healthy: bool, ready: bool, live: bool) -> Self {
        Self {
            healthy,
            ready,
            live,
        }
    }

    /// Build a state from one result per endpoint. Results for the same
    /// endpoint overwrite each other; missing endpoints count as failed.
    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a ProbeResult>) -> Self {
        let mut state = Self::default();
        for result in results {
            match result.endpoint {
                ProbeEndpoint::Health => state.healthy = result.succeeded,
                ProbeEndpoint::Ready => state.ready = result.succeeded,
                ProbeEndpoint::Live => state.live = result.succeeded,
            }
        }
        state
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy && self.ready && self.live
    }

    /// First failing field wins, checked as healthy, then ready, then live.
    pub fn status(&self) -> DerivedStatus {
        if !self.healthy {
            DerivedStatus::Unhealthy
        } else if !self.ready {
            DerivedStatus::NotReady
        } else if !self.live {
            DerivedStatus::NotLive
        } else {
            DerivedStatus::Healthy
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DerivedStatus {
    Healthy,
    Unhealthy,
    NotReady,
    NotLive,
}

impl DerivedStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Unhealthy => "unhealthy",
            Self::NotReady => "not-ready",
            Self::NotLive => "not-live",
        }
    }
}

impl fmt::Display for DerivedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
