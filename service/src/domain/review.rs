//! [`Review`] definitions.

use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{car, user};

/// Renter's review of a rented [`Car`].
///
/// [`Car`]: crate::domain::Car
#[derive(Clone, Debug)]
pub struct Review {
    /// ID of this [`Review`].
    pub id: Id,

    /// ID of the reviewed [`Car`].
    ///
    /// [`Car`]: crate::domain::Car
    pub car_id: car::Id,

    /// ID of the reviewing [`User`].
    ///
    /// [`User`]: crate::domain::User
    pub renter_id: user::Id,

    /// [`Rating`] given to the [`Car`].
    ///
    /// [`Car`]: crate::domain::Car
    pub rating: Rating,

    /// Free-form [`Comment`], if the renter left one.
    pub comment: Option<Comment>,
}

/// ID of a [`Review`].
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

/// Rating of a [`Review`], from `1.0` to `5.0`.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, Into, PartialEq)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Rating(Decimal);

impl Rating {
    /// Creates a new [`Rating`] if the given `rating` is within `1.0..=5.0`.
    #[must_use]
    pub fn new(rating: Decimal) -> Option<Self> {
        (rating >= Decimal::ONE && rating <= Decimal::from(5))
            .then(|| Self(rating.round_dp(1)))
    }
}

impl FromStr for Rating {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .replace(',', ".")
            .parse()
            .ok()
            .and_then(Self::new)
            .ok_or("invalid `Rating`, expected 1.0-5.0")
    }
}

/// Free-form comment of a [`Review`].
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Comment(String);

impl Comment {
    /// Creates a new [`Comment`] if the given `comment` is valid.
    #[must_use]
    pub fn new(comment: impl Into<String>) -> Option<Self> {
        let comment = comment.into();
        let valid = !comment.trim().is_empty() && comment.len() <= 4096;
        valid.then_some(Self(comment))
    }
}

#[cfg(test)]
mod spec {
    use super::Rating;

    #[test]
    fn rating_bounds_and_rounding() {
        assert_eq!(
            "4,55".parse::<Rating>().unwrap(),
            Rating::new("4.6".parse().unwrap()).unwrap(),
        );
        assert!("0.9".parse::<Rating>().is_err());
        assert!("5.1".parse::<Rating>().is_err());
        assert!("great".parse::<Rating>().is_err());
    }
}
