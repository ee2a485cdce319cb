//! LinkPay provider: hosted payment page reached via a signed link.
//!
//! Outbound links carry an MD5 signature over
//! `merchant:amount:secret:currency:order`, inbound callbacks over
//! `amount:order:secret`, both per the provider's checkout protocol. Field
//! order is significant and must not be rearranged.

use md5::{Digest as _, Md5};
use secrecy::{ExposeSecret as _, SecretString};
use serde::Deserialize;

use crate::domain::{payment, Payment};

use super::{Event, Outcome, VerificationError};

/// LinkPay provider configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Merchant ID assigned by the provider.
    pub merchant_id: String,

    /// Secret used to sign outbound payment links.
    pub secret_out: SecretString,

    /// Secret used to verify inbound callbacks.
    pub secret_in: SecretString,

    /// Base URL of the hosted payment page.
    pub base_url: String,
}

impl Config {
    /// Builds the signed payment page URL for the provided [`Payment`].
    ///
    /// The order reference is the [`payment::Id`], so the callback can
    /// resolve the row by primary key.
    #[must_use]
    pub fn payment_url(&self, payment: &Payment) -> String {
        let amount = payment.amount.amount_fixed2();
        let currency = payment.amount.currency;
        let order = payment.id;
        let sign = md5_hex(&format!(
            "{}:{amount}:{}:{currency}:{order}",
            self.merchant_id,
            self.secret_out.expose_secret(),
        ));
        format!(
            "{}?m={}&oa={amount}&currency={currency}&o={order}&s={sign}",
            self.base_url, self.merchant_id,
        )
    }

    /// Verifies an inbound [`Callback`] and normalizes it into an [`Event`].
    ///
    /// # Errors
    ///
    /// - [`VerificationError::SignatureMismatch`] if the recomputed
    ///   signature differs from the received one.
    /// - [`VerificationError::BadOrderReference`] if the order reference is
    ///   not a [`payment::Id`].
    pub fn verify(
        &self,
        callback: &Callback,
    ) -> Result<Event, VerificationError> {
        let expected = md5_hex(&format!(
            "{}:{}:{}",
            callback.out_sum,
            callback.inv_id,
            self.secret_in.expose_secret(),
        ));
        if !expected.eq_ignore_ascii_case(&callback.signature) {
            return Err(VerificationError::SignatureMismatch);
        }

        let payment_id = callback
            .inv_id
            .parse()
            .map_err(|_| VerificationError::BadOrderReference)?;

        let outcome = match callback.status.to_ascii_lowercase().as_str() {
            "paid" | "success" => Outcome::Completed,
            "failed" => Outcome::Failed,
            "cancel" | "cancelled" => Outcome::Cancelled,
            _ => Outcome::Unknown(callback.status.clone()),
        };

        Ok(Event {
            payment_id,
            method: payment::Method::LinkPay,
            outcome,
            transaction_id: callback
                .trans_id
                .as_deref()
                .and_then(payment::TransactionId::new),
        })
    }
}

/// Form-encoded callback LinkPay POSTs after a payment attempt.
#[derive(Clone, Debug, Deserialize)]
pub struct Callback {
    /// Paid amount, exactly as signed by the provider.
    #[serde(rename = "OutSum")]
    pub out_sum: String,

    /// Order reference, the [`payment::Id`] the link was issued for.
    #[serde(rename = "InvId")]
    pub inv_id: String,

    /// Provider-side transaction reference.
    #[serde(rename = "TransId")]
    pub trans_id: Option<String>,

    /// Reported payment status.
    #[serde(rename = "Status")]
    pub status: String,

    /// MD5 signature over `amount:order:secret`.
    #[serde(rename = "SignatureValue")]
    pub signature: String,
}

/// Returns the lowercase hex MD5 digest of the provided string.
fn md5_hex(input: &str) -> String {
    hex::encode(Md5::digest(input.as_bytes()))
}

#[cfg(test)]
mod spec {
    use common::{money::Currency, DateTimeOf, Money};
    use secrecy::SecretString;

    use crate::{
        domain::{booking, payment, Payment},
        gateway::{Outcome, VerificationError},
    };

    use super::{Callback, Config};

    fn config() -> Config {
        Config {
            merchant_id: "m-100".into(),
            secret_out: SecretString::from("s3cr3t-out".to_owned()),
            secret_in: SecretString::from("s3cr3t-in".to_owned()),
            base_url: "https://pay.linkpay.example/".into(),
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
            method: payment::Method::LinkPay,
            transaction_id: None,
            created_at: DateTimeOf::now(),
        }
    }

    fn callback() -> Callback {
        Callback {
            out_sum: "135.00".into(),
            inv_id: "c56a4180-65aa-42ec-a945-5fd21dec0538".into(),
            trans_id: Some("lp-42".into()),
            status: "paid".into(),
            // Uppercase MD5 of "135.00:c56a4180-...-0538:s3cr3t-in",
            // as the provider sends it.
            signature: "72051AA6FBEDA33503CA9EB26D336EAD".into(),
        }
    }

    #[test]
    fn signs_payment_url() {
        // MD5 of "m-100:135.00:s3cr3t-out:EUR:c56a4180-...-0538".
        assert_eq!(
            config().payment_url(&payment()),
            "https://pay.linkpay.example/\
             ?m=m-100\
             &oa=135.00\
             &currency=EUR\
             &o=c56a4180-65aa-42ec-a945-5fd21dec0538\
             &s=738fddda5d95ebfca16a282b961d4763",
        );
    }

    #[test]
    fn verifies_genuine_callback() {
        let event = config().verify(&callback()).unwrap();
        assert_eq!(event.payment_id, payment().id);
        assert_eq!(event.method, payment::Method::LinkPay);
        assert_eq!(event.outcome, Outcome::Completed);
        assert_eq!(
            event.transaction_id,
            payment::TransactionId::new("lp-42"),
        );
    }

    #[test]
    fn signature_comparison_ignores_case() {
        let mut cb = callback();
        cb.signature = cb.signature.to_ascii_lowercase();
        assert!(config().verify(&cb).is_ok());
    }

    #[test]
    fn rejects_tampered_amount() {
        let mut cb = callback();
        cb.out_sum = "1.00".into();
        assert!(matches!(
            config().verify(&cb),
            Err(VerificationError::SignatureMismatch),
        ));
    }

    #[test]
    fn rejects_wrong_signature() {
        let mut cb = callback();
        cb.signature = "00000000000000000000000000000000".into();
        assert!(matches!(
            config().verify(&cb),
            Err(VerificationError::SignatureMismatch),
        ));
    }

    #[test]
    fn maps_status_vocabulary() {
        for (status, expected) in [
            ("success", Outcome::Completed),
            ("failed", Outcome::Failed),
            ("cancel", Outcome::Cancelled),
        ] {
            let mut cb = callback();
            cb.status = status.into();
            // Signature covers amount and order only, so status may vary.
            assert_eq!(config().verify(&cb).unwrap().outcome, expected);
        }

        let mut cb = callback();
        cb.status = "on-hold".into();
        assert_eq!(
            config().verify(&cb).unwrap().outcome,
            Outcome::Unknown("on-hold".into()),
        );
    }
}
