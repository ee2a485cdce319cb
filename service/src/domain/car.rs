//! [`Car`] definitions.

use common::{Money, Percent};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::user;

/// Car offered for rent.
#[derive(Clone, Debug)]
pub struct Car {
    /// ID of this [`Car`].
    pub id: Id,

    /// ID of the [`User`] owning this [`Car`].
    ///
    /// [`User`]: crate::domain::User
    pub owner_id: user::Id,

    /// [`Brand`] of this [`Car`].
    pub brand: Brand,

    /// [`Model`] of this [`Car`].
    pub model: Model,

    /// Manufacturing [`Year`] of this [`Car`].
    pub year: Year,

    /// [`LicensePlate`] of this [`Car`], if provided by the owner.
    pub license_plate: Option<LicensePlate>,

    /// Daily rental price of this [`Car`].
    pub price_per_day: Money,

    /// Discount applied to the total rental price.
    pub discount: Percent,

    /// [`City`] this [`Car`] is offered in.
    pub city: City,

    /// Free-form rental terms shown to renters, if any.
    pub rental_terms: Option<RentalTerms>,

    /// Whether this [`Car`] can be booked right now.
    ///
    /// Flipped to `false` by a booking confirmation and back to `true` by an
    /// explicit booking cancellation; never written outside those commands.
    pub available: bool,
}

/// ID of a [`Car`].
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

/// Brand of a [`Car`].
#[derive(
    AsRef, Clone, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd,
)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Brand(String);

impl Brand {
    /// Creates a new [`Brand`] if the given `brand` is valid.
    #[must_use]
    pub fn new(brand: impl Into<String>) -> Option<Self> {
        let brand = brand.into();
        let valid =
            brand.trim() == brand && !brand.is_empty() && brand.len() <= 128;
        valid.then_some(Self(brand))
    }
}

impl FromStr for Brand {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Brand`")
    }
}

/// Model of a [`Car`].
#[derive(
    AsRef, Clone, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd,
)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Model(String);

impl Model {
    /// Creates a new [`Model`] if the given `model` is valid.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Option<Self> {
        let model = model.into();
        let valid =
            model.trim() == model && !model.is_empty() && model.len() <= 128;
        valid.then_some(Self(model))
    }
}

impl FromStr for Model {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Model`")
    }
}

/// Manufacturing year of a [`Car`].
#[derive(Clone, Copy, Debug, Display, Eq, Hash, Into, PartialEq)]
pub struct Year(i16);

impl Year {
    /// Creates a new [`Year`] if the given `year` is within the supported
    /// range.
    #[must_use]
    pub fn new(year: i16) -> Option<Self> {
        (1900..=2100).contains(&year).then_some(Self(year))
    }
}

impl FromStr for Year {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse()
            .ok()
            .and_then(Self::new)
            .ok_or("invalid `Year`, expected 1900-2100")
    }
}

#[cfg(feature = "postgres")]
mod year_sql {
    //! Postgres conversions of [`Year`] via `INT2`.

    use std::error::Error as StdError;

    use postgres_types::{
        accepts, private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql,
        Type,
    };

    use super::Year;

    impl<'a> FromSql<'a> for Year {
        accepts!(INT2);

        fn from_sql(
            ty: &Type,
            raw: &'a [u8],
        ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
            Year::new(i16::from_sql(ty, raw)?)
                .ok_or_else(|| "`Year` out of range".into())
        }
    }

    impl ToSql for Year {
        accepts!(INT2);
        to_sql_checked!();

        fn to_sql(
            &self,
            ty: &Type,
            w: &mut BytesMut,
        ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
            self.0.to_sql(ty, w)
        }
    }
}

/// License plate of a [`Car`].
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct LicensePlate(String);

impl LicensePlate {
    /// Creates a new [`LicensePlate`] if the given `plate` is valid.
    #[must_use]
    pub fn new(plate: impl Into<String>) -> Option<Self> {
        let plate = plate.into();
        let valid = (2..=16).contains(&plate.len())
            && plate
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || "- ".contains(c));
        valid.then_some(Self(plate))
    }
}

impl FromStr for LicensePlate {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `LicensePlate`")
    }
}

/// City a [`Car`] is offered in.
#[derive(
    AsRef, Clone, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd,
)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct City(String);

impl City {
    /// Creates a new [`City`] if the given `city` is valid.
    #[must_use]
    pub fn new(city: impl Into<String>) -> Option<Self> {
        let city = city.into();
        let valid =
            city.trim() == city && !city.is_empty() && city.len() <= 128;
        valid.then_some(Self(city))
    }
}

impl FromStr for City {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `City`")
    }
}

/// Free-form rental terms of a [`Car`].
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct RentalTerms(String);

impl RentalTerms {
    /// Creates a new [`RentalTerms`] if the given `terms` are valid.
    #[must_use]
    pub fn new(terms: impl Into<String>) -> Option<Self> {
        let terms = terms.into();
        let valid = !terms.trim().is_empty() && terms.len() <= 4096;
        valid.then_some(Self(terms))
    }
}

/// Single editable field of a [`Car`].
///
/// Resolved from the transport callback once at the boundary, then matched
/// exhaustively by the update command.
#[derive(Clone, Debug)]
pub enum Patch {
    /// Replaces the [`Brand`].
    Brand(Brand),

    /// Replaces the [`Model`].
    Model(Model),

    /// Replaces the [`Year`].
    Year(Year),

    /// Replaces the [`LicensePlate`].
    LicensePlate(Option<LicensePlate>),

    /// Replaces the daily rental price.
    PricePerDay(Money),

    /// Replaces the discount.
    Discount(Percent),

    /// Replaces the [`City`].
    City(City),

    /// Replaces the rental terms.
    RentalTerms(Option<RentalTerms>),
}

#[cfg(test)]
mod spec {
    use super::Year;

    #[test]
    fn year_bounds() {
        assert!(Year::new(1900).is_some());
        assert!(Year::new(2100).is_some());
        assert!(Year::new(1899).is_none());
        assert!(Year::new(2101).is_none());
    }
}
