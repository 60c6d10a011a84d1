use std::io;

use anyhow::anyhow;
use rocket::{
    data::{ByteUnit, FromData, Outcome},
    http::Status,
    Data, Request,
};
use tracing::trace;

/// Raw body of a webhook request. Decoding is left to the dispatcher so malformed JSON is
/// reported the same way as any other dispatch failure.
pub struct WebhookPayload(pub String);

const LIMIT: ByteUnit = ByteUnit::Mebibyte(1);

#[rocket::async_trait]
impl<'r> FromData<'r> for WebhookPayload {
    type Error = anyhow::Error;

    async fn from_data(request: &'r Request<'_>, data: Data<'r>) -> Outcome<'r, Self> {
        trace!("received payload on GitHub webhook endpoint: {:?}", request);

        let size_limit = request.limits().get("json").unwrap_or(LIMIT);
        match data.open(size_limit).into_string().await {
            Ok(s) if s.is_complete() => Outcome::Success(WebhookPayload(s.into_inner())),
            Ok(_) => {
                let eof = io::ErrorKind::UnexpectedEof;
                trace!("payload was too big");
                Outcome::Error((
                    Status::PayloadTooLarge,
                    io::Error::new(eof, "data limit exceeded").into(),
                ))
            }
            Err(e) => Outcome::Error((
                Status::InternalServerError,
                anyhow!("error reading request body: {}", e),
            )),
        }
    }
}
