//! CardGate provider: hosted card checkout with HMAC-signed callbacks.
//!
//! Inbound callbacks are JSON POSTs signed with HMAC-SHA256 over the raw
//! request body; the hex signature travels in the `X-Cardgate-Signature`
//! header and is verified in constant time.

use hmac::{Hmac, Mac as _};
use secrecy::{ExposeSecret as _, SecretString};
use serde::Deserialize;
use sha2::Sha256;

use crate::domain::{payment, Payment};

use super::{Event, Outcome, VerificationError};

/// HTTP header CardGate sends the callback signature in.
pub const SIGNATURE_HEADER: &str = "X-Cardgate-Signature";

/// HMAC-SHA256 keyed by the provider secret.
type HmacSha256 = Hmac<Sha256>;

/// CardGate provider configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Shared secret signing checkout links and callbacks.
    pub secret: SecretString,

    /// Base URL of the hosted checkout page.
    pub base_url: String,
}

impl Config {
    /// Builds the signed checkout URL for the provided [`Payment`].
    #[must_use]
    pub fn checkout_url(&self, payment: &Payment) -> String {
        let amount = payment.amount.amount_fixed2();
        let order = payment.id;
        let sig = hex::encode(
            self.mac()
                .chain_update(format!("{order}:{amount}"))
                .finalize()
                .into_bytes(),
        );
        format!("{}?order={order}&amount={amount}&sig={sig}", self.base_url)
    }

    /// Verifies an inbound callback against the raw request body and the
    /// header-carried signature, normalizing it into an [`Event`].
    ///
    /// # Errors
    ///
    /// - [`VerificationError::SignatureMismatch`] if the signature is not
    ///   valid hex or does not match the body.
    /// - [`VerificationError::BadPayload`] if the body is not a valid
    ///   callback document.
    /// - [`VerificationError::BadOrderReference`] if the order reference is
    ///   not a [`payment::Id`].
    pub fn verify(
        &self,
        raw_body: &[u8],
        signature_hex: &str,
    ) -> Result<Event, VerificationError> {
        let signature = hex::decode(signature_hex)
            .map_err(|_| VerificationError::SignatureMismatch)?;
        self.mac()
            .chain_update(raw_body)
            .verify_slice(&signature)
            .map_err(|_| VerificationError::SignatureMismatch)?;

        let callback: Callback = serde_json::from_slice(raw_body)?;

        let payment_id = callback
            .order_id
            .parse()
            .map_err(|_| VerificationError::BadOrderReference)?;

        let outcome = match callback.event.as_str() {
            "payment.succeeded" => Outcome::Completed,
            "payment.failed" => Outcome::Failed,
            "payment.cancelled" => Outcome::Cancelled,
            _ => Outcome::Unknown(callback.event.clone()),
        };

        Ok(Event {
            payment_id,
            method: payment::Method::CardGate,
            outcome,
            transaction_id: callback
                .transaction_id
                .as_deref()
                .and_then(payment::TransactionId::new),
        })
    }

    /// Returns an [`HmacSha256`] keyed by the provider secret.
    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .expect("HMAC accepts keys of any size")
    }
}

/// JSON callback CardGate POSTs after a payment attempt.
#[derive(Clone, Debug, Deserialize)]
pub struct Callback {
    /// Event kind, e.g. `payment.succeeded`.
    pub event: String,

    /// Order reference, the [`payment::Id`] the checkout was issued for.
    pub order_id: String,

    /// Provider-side transaction reference.
    #[serde(default)]
    pub transaction_id: Option<String>,
}

#[cfg(test)]
mod spec {
    use common::{money::Currency, DateTimeOf, Money};
    use secrecy::SecretString;

    use crate::{
        domain::{booking, payment, Payment},
        gateway::{Outcome, VerificationError},
    };

    use super::Config;

    /// Raw callback body the signature vector below was computed over.
    const BODY: &[u8] = br#"{"event":"payment.succeeded","order_id":"c56a4180-65aa-42ec-a945-5fd21dec0538","transaction_id":"tx-789","amount":"135.00","currency":"EUR"}"#;

    /// Hex HMAC-SHA256 of [`BODY`] keyed by `whsec-test`.
    const SIGNATURE: &str =
        "f2e91127aeb3dca18604f1076fb0b9b3ead97ca83d420c860cdd4be9a7d03853";

    fn config() -> Config {
        Config {
            secret: SecretString::from("whsec-test".to_owned()),
            base_url: "https://checkout.cardgate.example/pay".into(),
        }
    }

    fn payment() -> Payment {
        Payment {
            id: "c56a4180-65aa-42ec-a945-5fd21dec0538".parse().unwrap(),
            booking_id: booking::Id::new(),
            amount: Money {
                amount: "135".parse().unwrap(),
                currency: Currency::Eur,
            },
            status: payment::Status::Pending,
            method: payment::Method::CardGate,
            transaction_id: None,
            created_at: DateTimeOf::now(),
        }
    }

    #[test]
    fn signs_checkout_url() {
        // HMAC-SHA256 of "c56a4180-...-0538:135.00" keyed by "whsec-test".
        assert_eq!(
            config().checkout_url(&payment()),
            "https://checkout.cardgate.example/pay\
             ?order=c56a4180-65aa-42ec-a945-5fd21dec0538\
             &amount=135.00\
             &sig=448c665d5b096830606fbd4345fe43f5f70dbccca93ca75153cf3c079d338a46",
        );
    }

    #[test]
    fn verifies_genuine_callback() {
        let event = config().verify(BODY, SIGNATURE).unwrap();
        assert_eq!(event.payment_id, payment().id);
        assert_eq!(event.method, payment::Method::CardGate);
        assert_eq!(event.outcome, Outcome::Completed);
        assert_eq!(
            event.transaction_id,
            payment::TransactionId::new("tx-789"),
        );
    }

    #[test]
    fn rejects_tampered_body() {
        let tampered = String::from_utf8_lossy(BODY).replace("135", "001");
        assert!(matches!(
            config().verify(tampered.as_bytes(), SIGNATURE),
            Err(VerificationError::SignatureMismatch),
        ));
    }

    #[test]
    fn rejects_malformed_signature() {
        assert!(matches!(
            config().verify(BODY, "not-hex"),
            Err(VerificationError::SignatureMismatch),
        ));
    }

    #[test]
    fn unrecognized_event_maps_to_unknown() {
        let body = br#"{"event":"payment.refunded","order_id":"c56a4180-65aa-42ec-a945-5fd21dec0538"}"#;
        let sig = {
            use hmac::Mac as _;
            let mac = super::HmacSha256::new_from_slice(b"whsec-test")
                .unwrap()
                .chain_update(body)
                .finalize();
            hex::encode(mac.into_bytes())
        };
        let event = config().verify(body, &sig).unwrap();
        assert_eq!(event.outcome, Outcome::Unknown("payment.refunded".into()));
    }
}
