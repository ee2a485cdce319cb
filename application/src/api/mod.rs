//! HTTP API of the application.
//!
//! Carries the payment-provider webhooks, the static landing pages for
//! browser redirects and the transport seam feeding chat updates into the
//! dialog engine.

use axum::{
    body::Bytes,
    extract::{Form, Json, State},
    http::HeaderMap,
    response::{Html, IntoResponse as _, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use service::{
    command::ReconcilePayment,
    dialog::{self, Advance},
    gateway::{card_gate, link_pay},
    Command as _,
};
use tracing as log;

use crate::{AsError as _, Service};

/// Builds the application [`Router`] over the provided [`Service`].
pub fn router(service: Service) -> Router {
    Router::new()
        .route("/webhooks/linkpay", post(linkpay_webhook))
        .route("/webhooks/cardgate", post(cardgate_webhook))
        .route("/payments/success", get(payment_success))
        .route("/payments/fail", get(payment_fail))
        .route("/updates", post(ingest_update))
        .with_state(service)
}

/// LinkPay webhook: form-encoded callback, MD5 ordered-concatenation
/// signature.
///
/// The provider retries on any non-2xx status, so internal failures must
/// surface as server errors rather than being swallowed.
async fn linkpay_webhook(
    State(service): State<Service>,
    Form(callback): Form<link_pay::Callback>,
) -> Response {
    let event = match service.config().gateway.link_pay.verify(&callback) {
        Ok(event) => event,
        Err(e) => {
            log::warn!("rejected LinkPay callback: {e}");
            return (http::StatusCode::BAD_REQUEST, "bad sign")
                .into_response();
        }
    };

    match service.execute(ReconcilePayment(event)).await {
        // The fixed acknowledgement body LinkPay polls for.
        Ok(_) => "OK".into_response(),
        Err(e) => e.as_error().into_response(),
    }
}

/// CardGate webhook: JSON over the raw body, HMAC-SHA256 signature in a
/// header.
async fn cardgate_webhook(
    State(service): State<Service>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(signature) = headers
        .get(card_gate::SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
    else {
        log::warn!("rejected CardGate callback: missing signature header");
        return (http::StatusCode::BAD_REQUEST, "missing signature")
            .into_response();
    };

    let event = match service
        .config()
        .gateway
        .card_gate
        .verify(&body, signature)
    {
        Ok(event) => event,
        Err(e) => {
            log::warn!("rejected CardGate callback: {e}");
            return (http::StatusCode::BAD_REQUEST, "bad signature")
                .into_response();
        }
    };

    match service.execute(ReconcilePayment(event)).await {
        Ok(_) => Json(Ack { received: true }).into_response(),
        Err(e) => e.as_error().into_response(),
    }
}

/// Acknowledgement body CardGate expects.
#[derive(Clone, Copy, Debug, Serialize)]
struct Ack {
    /// Whether the callback was accepted.
    received: bool,
}

/// Landing page for a browser redirected back after a successful payment.
async fn payment_success() -> Html<&'static str> {
    Html(
        "<h1>Payment received</h1>\
         <p>Thank you! You can return to the chat now.</p>",
    )
}

/// Landing page for a browser redirected back after a failed payment.
async fn payment_fail() -> Html<&'static str> {
    Html(
        "<h1>Payment not completed</h1>\
         <p>You can retry from the chat with /pay.</p>",
    )
}

/// Inbound chat update, as the transport delivers it.
#[derive(Clone, Debug, Deserialize)]
pub struct UpdateRequest {
    /// Chat the update arrived from.
    pub chat_id: i64,

    /// Raw text the user sent.
    pub input: String,
}

/// Reply to deliver back to the chat.
#[derive(Clone, Debug, Serialize)]
pub struct UpdateResponse {
    /// Messages to deliver, in order.
    pub messages: Vec<Message>,
}

/// Single outbound message of an [`UpdateResponse`].
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Message {
    /// Plain text message.
    Text {
        /// Text to deliver.
        text: String,
    },

    /// Payload the transport renders as a QR image.
    Qr {
        /// Text payload to encode into the image.
        payload: String,

        /// Caption to deliver alongside.
        caption: String,
    },
}

impl From<dialog::Reply> for UpdateResponse {
    fn from(reply: dialog::Reply) -> Self {
        Self {
            messages: reply
                .0
                .into_iter()
                .map(|outgoing| match outgoing {
                    dialog::Outgoing::Text(text) => Message::Text { text },
                    dialog::Outgoing::Qr { payload, caption } => {
                        Message::Qr { payload, caption }
                    }
                })
                .collect(),
        }
    }
}

/// Transport seam: applies one chat update to the dialog engine and returns
/// the reply synchronously.
async fn ingest_update(
    State(service): State<Service>,
    Json(request): Json<UpdateRequest>,
) -> Response {
    let advanced = service
        .execute(Advance {
            chat_id: request.chat_id.into(),
            update: dialog::Update::parse(&request.input),
        })
        .await;
    match advanced {
        Ok(reply) => Json(UpdateResponse::from(reply)).into_response(),
        Err(e) => e.as_error().into_response(),
    }
}
