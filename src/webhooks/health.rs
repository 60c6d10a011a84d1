use rocket::{serde::json::Json, State};
use serde::Serialize;

use crate::config::{Environment, RelayConfig};

/// Static details reported by the health endpoint.
pub struct HealthInfo {
    port: u16,
    environment: Environment,
}

impl HealthInfo {
    pub fn new(config: &RelayConfig) -> Self {
        Self {
            port: config.port,
            environment: config.environment,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Health {
    status: &'static str,
    port: u16,
    version: &'static str,
    environment: Environment,
}

#[rocket::get("/healthcheck")]
pub fn healthcheck(info: &State<HealthInfo>) -> Json<Health> {
    Json(Health {
        status: "available",
        port: info.port,
        version: env!("CARGO_PKG_VERSION"),
        environment: info.environment,
    })
}
