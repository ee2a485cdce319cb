//! Calendar date utilities.

#[cfg(feature = "postgres")]
use std::error::Error as StdError;
use std::{cmp::Ordering, fmt, marker::PhantomData, ops, str::FromStr};

use derive_more::Debug;
#[cfg(feature = "postgres")]
use postgres_types::{
    accepts, private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql, Type,
};

/// Untyped calendar date.
pub type Date = DateOf;

/// Calendar date without a time component.
///
/// Parsed from and displayed in the `DD.MM.YYYY` format users type into
/// dialogs.
#[derive(Debug)]
pub struct DateOf<Of: ?Sized = ()> {
    /// Inner representation of the date.
    inner: time::Date,

    /// Type parameter describing the kind of date.
    #[debug(skip)]
    _of: PhantomData<Of>,
}

impl<Of: ?Sized> DateOf<Of> {
    /// Creates a new [`Date`] representing the current UTC calendar date.
    #[must_use]
    pub fn today() -> Self {
        time::OffsetDateTime::now_utc().date().into()
    }

    /// Creates a new [`Date`] from the provided calendar components.
    ///
    /// [`None`] is returned if the components do not form a valid date.
    #[must_use]
    pub fn from_calendar(year: i32, month: u8, day: u8) -> Option<Self> {
        let month = time::Month::try_from(month).ok()?;
        time::Date::from_calendar_date(year, month, day)
            .ok()
            .map(Into::into)
    }

    /// Coerces one kind of [`Date`] into another.
    #[must_use]
    pub fn coerce<NewOf: ?Sized>(self) -> DateOf<NewOf> {
        DateOf {
            inner: self.inner,
            _of: PhantomData,
        }
    }
}

/// Error of parsing a [`Date`] from a string.
#[derive(Clone, Copy, Debug, derive_more::Display, derive_more::Error)]
#[display("invalid date, expected `DD.MM.YYYY`")]
pub struct ParseError;

impl<Of: ?Sized> FromStr for DateOf<Of> {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().splitn(3, '.');
        let day = parts
            .next()
            .and_then(|p| p.parse::<u8>().ok())
            .ok_or(ParseError)?;
        let month = parts
            .next()
            .and_then(|p| p.parse::<u8>().ok())
            .ok_or(ParseError)?;
        let year = parts
            .next()
            .and_then(|p| p.parse::<i32>().ok())
            .ok_or(ParseError)?;

        Self::from_calendar(year, month, day).ok_or(ParseError)
    }
}

impl<Of: ?Sized> fmt::Display for DateOf<Of> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}.{:02}.{:04}",
            self.inner.day(),
            u8::from(self.inner.month()),
            self.inner.year(),
        )
    }
}

impl<Of: ?Sized> Copy for DateOf<Of> {}
impl<Of: ?Sized> Clone for DateOf<Of> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Of: ?Sized> Eq for DateOf<Of> {}
impl<Of: ?Sized> PartialEq for DateOf<Of> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<Of: ?Sized> Ord for DateOf<Of> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.inner.cmp(&other.inner)
    }
}
impl<Of: ?Sized> PartialOrd for DateOf<Of> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<Of: ?Sized> From<time::Date> for DateOf<Of> {
    fn from(inner: time::Date) -> Self {
        Self {
            inner,
            _of: PhantomData,
        }
    }
}

impl<Of: ?Sized> From<DateOf<Of>> for time::Date {
    fn from(date: DateOf<Of>) -> Self {
        date.inner
    }
}

impl<Of: ?Sized, OtherOf: ?Sized> ops::Sub<DateOf<OtherOf>> for DateOf<Of> {
    type Output = time::Duration;

    fn sub(self, rhs: DateOf<OtherOf>) -> Self::Output {
        self.inner - rhs.inner
    }
}

#[cfg(feature = "postgres")]
impl<'a, Of: ?Sized> FromSql<'a> for DateOf<Of> {
    accepts!(DATE);

    fn from_sql(
        ty: &Type,
        raw: &'a [u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        Ok(time::Date::from_sql(ty, raw)?.into())
    }
}

#[cfg(feature = "postgres")]
impl<Of: ?Sized> ToSql for DateOf<Of> {
    accepts!(DATE);
    to_sql_checked!();

    fn to_sql(
        &self,
        ty: &Type,
        w: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        self.inner.to_sql(ty, w)
    }
}

#[cfg(test)]
mod spec {
    use super::Date;

    #[test]
    fn parses_dotted_format() {
        let date: Date = "01.02.2024".parse().unwrap();
        assert_eq!(date, Date::from_calendar(2024, 2, 1).unwrap());

        let date: Date = " 15.12.2025 ".parse().unwrap();
        assert_eq!(date, Date::from_calendar(2025, 12, 15).unwrap());
    }

    #[test]
    fn rejects_garbage() {
        assert!("2024-02-01".parse::<Date>().is_err());
        assert!("32.01.2024".parse::<Date>().is_err());
        assert!("01.13.2024".parse::<Date>().is_err());
        assert!("tomorrow".parse::<Date>().is_err());
        assert!("".parse::<Date>().is_err());
    }

    #[test]
    fn displays_dotted_format() {
        let date = Date::from_calendar(2024, 3, 7).unwrap();
        assert_eq!(date.to_string(), "07.03.2024");
    }

    #[test]
    fn subtraction_yields_whole_days() {
        let from = Date::from_calendar(2024, 1, 1).unwrap();
        let to = Date::from_calendar(2024, 1, 3).unwrap();
        assert_eq!((to - from).whole_days(), 2);
    }
}
