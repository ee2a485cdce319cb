//! [`Booking`] definitions.

use common::{define_kind, unit, DateOf, DateTimeOf, Money};
use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{car, user};

/// Reservation of a [`Car`] by a renter for a date range.
///
/// [`Car`]: crate::domain::Car
#[derive(Clone, Debug)]
pub struct Booking {
    /// ID of this [`Booking`].
    pub id: Id,

    /// ID of the booked [`Car`].
    ///
    /// [`Car`]: crate::domain::Car
    pub car_id: car::Id,

    /// ID of the renting [`User`].
    ///
    /// [`User`]: crate::domain::User
    pub renter_id: user::Id,

    /// First rental day, inclusive.
    pub date_from: StartDate,

    /// Last rental day, inclusive.
    ///
    /// Never precedes [`Booking::date_from`].
    pub date_to: EndDate,

    /// Total rental price.
    ///
    /// Computed by the pricing engine at confirmation and immutable
    /// afterwards.
    pub total_price: Money,

    /// [`Status`] of this [`Booking`].
    pub status: Status,

    /// Whether a generated contract for this [`Booking`] has been signed.
    pub contract_signed: bool,

    /// When this [`Booking`] was created.
    pub created_at: CreationDateTime,
}

/// ID of a [`Booking`].
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
    #[doc = "Status of a [`Booking`]."]
    enum Status {
        #[doc = "Awaits a successful payment."]
        Pending = 1,

        #[doc = "Confirmed and holding the car."]
        Confirmed = 2,

        #[doc = "Cancelled, the car is released."]
        Cancelled = 3,

        #[doc = "Rental period is over."]
        Completed = 4,
    }
}

/// [`Date`] a [`Booking`] starts at.
///
/// [`Date`]: common::Date
pub type StartDate = DateOf<unit::Start>;

/// [`Date`] a [`Booking`] ends at.
///
/// [`Date`]: common::Date
pub type EndDate = DateOf<unit::End>;

/// [`DateTime`] a [`Booking`] was created at.
///
/// [`DateTime`]: common::DateTime
pub type CreationDateTime = DateTimeOf<unit::Creation>;
