//! [`User`] definitions.

use common::define_kind;
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Participant of the car-rental service.
#[derive(Clone, Debug)]
pub struct User {
    /// ID of this [`User`].
    pub id: Id,

    /// [`ChatId`] the transport delivers this [`User`]'s messages to.
    pub chat_id: ChatId,

    /// [`Role`] of this [`User`].
    pub role: Role,

    /// [`Name`] of this [`User`].
    ///
    /// For company owners this is the contact person's name.
    pub name: Name,

    /// [`Phone`] of this [`User`].
    pub phone: Option<Phone>,

    /// [`CompanyName`] of this [`User`], if it's a company owner.
    pub company_name: Option<CompanyName>,

    /// [`TaxId`] of this [`User`]'s company, if it's a company owner.
    pub tax_id: Option<TaxId>,

    /// Whether this [`User`] has completed the registration flow.
    pub registered: bool,
}

/// ID of a [`User`].
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

/// Transport-level chat ID of a [`User`].
///
/// Assigned by the chat platform, unique per [`User`].
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
pub struct ChatId(i64);

define_kind! {
    #[doc = "Role of a [`User`] in the service."]
    enum Role {
        #[doc = "Car owner acting as a natural person."]
        OwnerPerson = 1,

        #[doc = "Car owner acting on behalf of a company."]
        OwnerCompany = 2,

        #[doc = "Renter of cars."]
        Renter = 3,
    }
}

/// Name of a [`User`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Name(String);

impl Name {
    /// Creates a new [`Name`] if the given `name` is valid.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        Self::check(&name).then_some(Self(name))
    }

    /// Checks whether the given `name` is a valid [`Name`].
    fn check(name: impl AsRef<str>) -> bool {
        let name = name.as_ref();
        name.trim() == name && !name.is_empty() && name.len() <= 512
    }
}

impl FromStr for Name {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Name`")
    }
}

/// Phone number of a [`User`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Phone(String);

impl Phone {
    /// Creates a new [`Phone`] if the given `phone` is valid.
    #[must_use]
    pub fn new(phone: impl Into<String>) -> Option<Self> {
        let phone = phone.into();
        Self::check(&phone).then_some(Self(phone))
    }

    /// Checks whether the given `phone` is a valid [`Phone`].
    fn check(phone: impl AsRef<str>) -> bool {
        let phone = phone.as_ref();
        (5..=32).contains(&phone.len())
            && phone
                .chars()
                .all(|c| c.is_ascii_digit() || "+-() ".contains(c))
    }
}

impl FromStr for Phone {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Phone`")
    }
}

/// Name of a company-owner [`User`]'s company.
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct CompanyName(String);

impl CompanyName {
    /// Creates a new [`CompanyName`] if the given `name` is valid.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        let valid =
            name.trim() == name && !name.is_empty() && name.len() <= 512;
        valid.then_some(Self(name))
    }
}

impl FromStr for CompanyName {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `CompanyName`")
    }
}

/// Tax identification number of a company-owner [`User`]'s company.
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct TaxId(String);

impl TaxId {
    /// Creates a new [`TaxId`] if the given `tax_id` is valid.
    #[must_use]
    pub fn new(tax_id: impl Into<String>) -> Option<Self> {
        let tax_id = tax_id.into();
        let valid = (4..=20).contains(&tax_id.len())
            && tax_id.chars().all(|c| c.is_ascii_alphanumeric());
        valid.then_some(Self(tax_id))
    }
}

impl FromStr for TaxId {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `TaxId`")
    }
}

#[cfg(test)]
mod spec {
    use super::{Name, Phone, TaxId};

    #[test]
    fn name_rejects_untrimmed_and_empty() {
        assert!(Name::new("Mia Renter").is_some());
        assert!(Name::new(" Mia").is_none());
        assert!(Name::new("").is_none());
    }

    #[test]
    fn phone_accepts_common_formats() {
        assert!(Phone::new("+381 64 123-45-67").is_some());
        assert!(Phone::new("0641234567").is_some());
        assert!(Phone::new("call me").is_none());
        assert!(Phone::new("123").is_none());
    }

    #[test]
    fn tax_id_is_alphanumeric() {
        assert!(TaxId::new("RS106006175").is_some());
        assert!(TaxId::new("10-60-06").is_none());
    }
}
