//! Aggregate health reporting for readiness, liveness and startup probes.

use serde::Serialize;
use std::sync::Arc;

/// Up/down state of one component or of the aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProbeStatus {
    #[serde(rename = "UP")]
    Up,
    #[serde(rename = "DOWN")]
    Down,
}

impl From<bool> for ProbeStatus {
    fn from(healthy: bool) -> Self {
        if healthy {
            Self::Up
        } else {
            Self::Down
        }
    }
}

/// A named boolean health probe over some component.
#[derive(Clone)]
pub struct HealthCheck {
    name: String,
    probe: Arc<dyn Fn() -> bool + Send + Sync>,
}

impl std::fmt::Debug for HealthCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthCheck")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl HealthCheck {
    pub fn new(name: impl Into<String>, probe: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            probe: Arc::new(probe),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentStatus {
    pub name: String,
    pub status: ProbeStatus,
}

/// An aggregate status report: down as soon as any component is down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub name: String,
    pub status: ProbeStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<ComponentStatus>,
}

/// Health checks grouped by probe kind.
///
/// Built in the boundary's wiring code:
///
/// ```
/// use apiscan_scan::{HealthCheck, ProbeSet};
///
/// let probes = ProbeSet::new()
///     .with_ready_check(HealthCheck::new("rulesets", || true))
///     .with_live_check(HealthCheck::new("rulesets", || true));
/// assert_eq!(probes.ready().components.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ProbeSet {
    ready: Vec<HealthCheck>,
    live: Vec<HealthCheck>,
    startup: Vec<HealthCheck>,
}

impl ProbeSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_ready_check(mut self, check: HealthCheck) -> Self {
        self.ready.push(check);
        self
    }

    #[must_use]
    pub fn with_live_check(mut self, check: HealthCheck) -> Self {
        self.live.push(check);
        self
    }

    #[must_use]
    pub fn with_startup_check(mut self, check: HealthCheck) -> Self {
        self.startup.push(check);
        self
    }

    /// Registers the same check on all three probe groups.
    #[must_use]
    pub fn with_check(self, check: HealthCheck) -> Self {
        self.with_ready_check(check.clone())
            .with_live_check(check.clone())
            .with_startup_check(check)
    }

    #[must_use]
    pub fn ready(&self) -> StatusReport {
        build_report(&self.ready)
    }

    #[must_use]
    pub fn live(&self) -> StatusReport {
        build_report(&self.live)
    }

    #[must_use]
    pub fn startup(&self) -> StatusReport {
        build_report(&self.startup)
    }
}

fn build_report(checks: &[HealthCheck]) -> StatusReport {
    let components: Vec<ComponentStatus> = checks
        .iter()
        .map(|check| ComponentStatus {
            name: check.name.clone(),
            status: ProbeStatus::from((check.probe)()),
        })
        .collect();

    let status = ProbeStatus::from(
        components
            .iter()
            .all(|component| component.status == ProbeStatus::Up),
    );

    StatusReport {
        name: "global".to_string(),
        status,
        components,
    }
}
