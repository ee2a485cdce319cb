//! [`Payment`] definitions.

use common::{define_kind, unit, DateTimeOf, Money};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::booking;

/// Single attempt to collect funds for a [`Booking`] via a payment provider.
///
/// [`Booking`]: crate::domain::Booking
#[derive(Clone, Debug)]
pub struct Payment {
    /// ID of this [`Payment`].
    ///
    /// Doubles as the order reference passed to the provider, so inbound
    /// callbacks resolve the row by primary key.
    pub id: Id,

    /// ID of the paid [`Booking`].
    ///
    /// [`Booking`]: crate::domain::Booking
    pub booking_id: booking::Id,

    /// Amount to collect.
    ///
    /// Copied from the booking's total price at creation.
    pub amount: Money,

    /// [`Status`] of this [`Payment`].
    pub status: Status,

    /// [`Method`] this [`Payment`] is collected with.
    pub method: Method,

    /// Provider-side transaction reference.
    ///
    /// Unknown until a provider callback reports it.
    pub transaction_id: Option<TransactionId>,

    /// When this [`Payment`] was created.
    pub created_at: CreationDateTime,
}

/// ID of a [`Payment`].
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

define_kind! {
    #[doc = "Status of a [`Payment`]."]
    enum Status {
        #[doc = "Created, no terminal provider callback yet."]
        Pending = 1,

        #[doc = "Funds collected."]
        Completed = 2,

        #[doc = "Provider reported a failure."]
        Failed = 3,

        #[doc = "Abandoned or superseded by a newer attempt."]
        Cancelled = 4,
    }
}

impl Status {
    /// Indicates whether this [`Status`] is terminal.
    ///
    /// A terminal [`Payment`] never transitions again.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        match self {
            Self::Pending => false,
            Self::Completed | Self::Failed | Self::Cancelled => true,
        }
    }
}

define_kind! {
    #[doc = "Provider a [`Payment`] is collected through."]
    enum Method {
        #[doc = "LinkPay hosted payment page, reached via a signed link."]
        LinkPay = 1,

        #[doc = "CardGate hosted card checkout."]
        CardGate = 2,

        #[doc = "Bank transfer via a scannable QR payload."]
        BankQr = 3,
    }
}

/// Provider-side transaction reference of a [`Payment`].
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct TransactionId(String);

impl TransactionId {
    /// Creates a new [`TransactionId`] if the given `id` is valid.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        let valid = !id.is_empty() && id.len() <= 128;
        valid.then_some(Self(id))
    }
}

impl FromStr for TransactionId {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `TransactionId`")
    }
}

/// [`DateTime`] a [`Payment`] was created at.
///
/// [`DateTime`]: common::DateTime
pub type CreationDateTime = DateTimeOf<unit::Creation>;
