//! Payment provider gateway.
//!
//! Builds provider-specific payment artifacts for pending [`Payment`]s and
//! verifies inbound provider callbacks. The gateway never transitions a
//! [`Payment`] itself: terminal statuses are applied exclusively by the
//! reconciliation command, because artifacts are issued synchronously in the
//! dialog while completion arrives asynchronously out-of-band.
//!
//! [`Payment`]: crate::domain::Payment

pub mod bank_qr;
pub mod card_gate;
pub mod link_pay;

use derive_more::{Display, Error as StdError, From};

use crate::domain::{payment, Booking, Car, Payment};

/// Configuration of all supported payment providers.
#[derive(Clone, Debug)]
pub struct Config {
    /// [`link_pay`] provider configuration.
    pub link_pay: link_pay::Config,

    /// [`card_gate`] provider configuration.
    pub card_gate: card_gate::Config,

    /// [`bank_qr`] provider configuration.
    pub bank_qr: bank_qr::Config,
}

impl Config {
    /// Builds the provider [`Artifact`] for the provided pending [`Payment`].
    #[must_use]
    pub fn issue(
        &self,
        payment: &Payment,
        booking: &Booking,
        car: &Car,
    ) -> Artifact {
        match payment.method {
            payment::Method::LinkPay => {
                Artifact::RedirectUrl(self.link_pay.payment_url(payment))
            }
            payment::Method::CardGate => {
                Artifact::RedirectUrl(self.card_gate.checkout_url(payment))
            }
            payment::Method::BankQr => {
                Artifact::QrPayload(self.bank_qr.payload(booking, car))
            }
        }
    }
}

/// Payment artifact handed to the renter.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Artifact {
    /// URL the renter opens in a browser to pay.
    RedirectUrl(String),

    /// Text payload to render as a scannable QR image.
    ///
    /// Rasterization is the transport's concern.
    QrPayload(String),
}

/// Verified provider callback, normalized across providers.
#[derive(Clone, Debug)]
pub struct Event {
    /// ID of the [`Payment`] the provider reports about.
    pub payment_id: payment::Id,

    /// [`payment::Method`] the callback was verified for.
    pub method: payment::Method,

    /// Reported [`Outcome`].
    pub outcome: Outcome,

    /// Provider-side transaction reference, if reported.
    pub transaction_id: Option<payment::TransactionId>,
}

/// Outcome a provider callback reports.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// Funds are collected.
    Completed,

    /// The payment failed.
    Failed,

    /// The payment was cancelled on the provider side.
    Cancelled,

    /// Status vocabulary this gateway does not recognize.
    ///
    /// Reconciliation leaves the [`Payment`] untouched and logs it.
    Unknown(String),
}

/// Error of verifying an inbound provider callback.
///
/// Any variant means the callback must be rejected without touching local
/// state.
#[derive(Debug, Display, From, StdError)]
pub enum VerificationError {
    /// Recomputed signature does not match the received one.
    #[display("callback signature mismatch")]
    SignatureMismatch,

    /// Callback payload cannot be parsed.
    #[display("malformed callback payload: {_0}")]
    #[from]
    BadPayload(serde_json::Error),

    /// Order reference does not name a [`Payment`].
    ///
    /// [`Payment`]: crate::domain::Payment
    #[display("malformed order reference")]
    BadOrderReference,
}
