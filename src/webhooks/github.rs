use rocket::{http::Status, State};
use tracing::{error, info, warn};

mod events;
pub use events::*;

mod payload;
use payload::WebhookPayload;

use crate::relay::{DispatchError, Dispatcher, Outcome};

#[rocket::post("/github-webhook-receiver", data = "<payload>")]
pub async fn github_webhook_receiver(
    payload: WebhookPayload,
    dispatcher: &State<Dispatcher>,
) -> Result<&'static str, (Status, String)> {
    info!("received a webhook request");

    match dispatcher.dispatch(&payload.0).await {
        Ok(Outcome::Sent(_)) | Ok(Outcome::Ignored(_)) => Ok("Webhook received"),
        Err(err @ DispatchError::Decode(_)) => {
            warn!("{}", err);
            Err((Status::InternalServerError, err.to_string()))
        }
        Err(err @ DispatchError::Delivery { .. }) => {
            error!("{}", err);
            Err((Status::InternalServerError, err.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{atomic::Ordering, Arc};

    use rocket::{local::blocking::Client, routes};

    use super::*;
    use crate::relay::{
        dispatcher::tests::{FailingSender, RecordingSender},
        message::tests::event,
        NotificationSender,
    };

    fn client(sender: Arc<dyn NotificationSender>) -> Client {
        client_with_limit(sender, None)
    }

    fn client_with_limit(sender: Arc<dyn NotificationSender>, json_limit: Option<u64>) -> Client {
        let mut figment = rocket::Config::figment();
        if let Some(limit) = json_limit {
            figment = figment.merge(("limits.json", limit));
        }

        let rocket = rocket::custom(figment)
            .mount("/", routes![github_webhook_receiver])
            .manage(Dispatcher::new(sender));
        Client::tracked(rocket).expect("valid rocket instance")
    }

    #[test]
    fn handled_action_is_acknowledged() {
        let sender = Arc::new(RecordingSender::default());
        let client = client(sender.clone());

        let response = client
            .post("/github-webhook-receiver")
            .body(event("opened", Some("closes #3")).to_string())
            .dispatch();

        assert_eq!(response.status(), Status::Ok);
        assert_eq!(response.into_string().unwrap(), "Webhook received");
        assert_eq!(sender.sent.lock().unwrap().len(), 1);
    }

    #[test]
    fn ignored_action_is_acknowledged() {
        let sender = Arc::new(RecordingSender::default());
        let client = client(sender.clone());

        let response = client
            .post("/github-webhook-receiver")
            .body(event("synchronize", None).to_string())
            .dispatch();

        assert_eq!(response.status(), Status::Ok);
        assert_eq!(response.into_string().unwrap(), "Webhook received");
        assert!(sender.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn malformed_payload_is_a_server_error() {
        let client = client(Arc::new(RecordingSender::default()));

        let response = client
            .post("/github-webhook-receiver")
            .body("not json")
            .dispatch();

        assert_eq!(response.status(), Status::InternalServerError);
        assert!(response
            .into_string()
            .unwrap()
            .starts_with("couldn't decode pull request event"));
    }

    #[test]
    fn delivery_failure_is_a_server_error() {
        let sender = Arc::new(FailingSender::default());
        let client = client(sender.clone());

        let response = client
            .post("/github-webhook-receiver")
            .body(event("edited", None).to_string())
            .dispatch();
        assert_eq!(response.status(), Status::InternalServerError);

        // the server keeps serving after a failed delivery
        let response = client
            .post("/github-webhook-receiver")
            .body(event("labeled", None).to_string())
            .dispatch();
        assert_eq!(response.status(), Status::Ok);

        assert_eq!(sender.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let sender = Arc::new(FailingSender::default());
        let client = client_with_limit(sender.clone(), Some(64));

        let payload = event("opened", Some(&"a".repeat(256))).to_string();
        assert!(payload.len() > 64);
        let response = client
            .post("/github-webhook-receiver")
            .body(payload)
            .dispatch();

        assert_eq!(response.status(), Status::PayloadTooLarge);
        assert_eq!(sender.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn payload_within_limit_is_accepted() {
        let sender = Arc::new(RecordingSender::default());
        let client = client_with_limit(sender.clone(), Some(64 * 1024));

        let response = client
            .post("/github-webhook-receiver")
            .body(event("closed", None).to_string())
            .dispatch();

        assert_eq!(response.status(), Status::Ok);
        assert_eq!(sender.sent.lock().unwrap().len(), 1);
    }
}
