use rocket::{routes, Build, Rocket};

use crate::{config::RelayConfig, relay::Dispatcher};

pub mod github;
pub use github::github_webhook_receiver;

pub mod health;
pub use health::{healthcheck, HealthInfo};

/// Builds the HTTP server with the webhook and health routes mounted.
pub fn build_rocket(config: &RelayConfig, dispatcher: Dispatcher) -> Rocket<Build> {
    let figment = rocket::Config::figment()
        .merge(("port", config.port))
        .merge(("address", config.environment.listen_address()));

    rocket::custom(figment)
        .mount("/", routes![github_webhook_receiver, healthcheck])
        .manage(dispatcher)
        .manage(HealthInfo::new(config))
}
