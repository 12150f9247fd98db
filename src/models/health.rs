//! Health report types.

use serde::Serialize;

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Healthy,
    Unhealthy,
}

/// Result of probing a single dependency.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct DependencyHealth {
    pub status: HealthState,
    /// What was probed, e.g. `s3://bucket` or the embedding backend label.
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DependencyHealth {
    pub fn healthy(target: impl Into<String>) -> Self {
        Self {
            status: HealthState::Healthy,
            target: target.into(),
            error: None,
        }
    }

    /// An empty error text is replaced so unhealthy entries always explain themselves.
    pub fn unhealthy(target: impl Into<String>, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            status: HealthState::Unhealthy,
            target: target.into(),
            error: Some(if error.is_empty() {
                "unknown error".into()
            } else {
                error
            }),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthState::Healthy
    }
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ServiceHealth {
    pub s3: DependencyHealth,
    pub embedding: DependencyHealth,
}

/// `GET /health` body.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct AggregatedHealth {
    pub status: HealthState,
    pub environment: String,
    pub services: ServiceHealth,
}

impl AggregatedHealth {
    /// Overall status is healthy only when every dependency is.
    pub fn from_services(environment: impl Into<String>, services: ServiceHealth) -> Self {
        let status = if services.s3.is_healthy() && services.embedding.is_healthy() {
            HealthState::Healthy
        } else {
            HealthState::Unhealthy
        };
        Self {
            status,
            environment: environment.into(),
            services,
        }
    }
}
