//! Rental price computation.

use common::{Money, Percent};
use derive_more::{Display, Error};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::domain::booking;

/// Computes the total rental price for the provided period.
///
/// The rental duration is inclusive of both endpoints: booking a car from a
/// day to the same day is one rental day. The discount is applied to the
/// whole amount, and the result is rounded to two decimal places half-up
/// ([`RoundingStrategy::MidpointAwayFromZero`]).
///
/// # Errors
///
/// Returns [`InvalidPeriod`] if `date_to` precedes `date_from`.
pub fn quote(
    date_from: booking::StartDate,
    date_to: booking::EndDate,
    price_per_day: Money,
    discount: Percent,
) -> Result<Money, InvalidPeriod> {
    let days = (date_to - date_from).whole_days() + 1;
    if days <= 0 {
        return Err(InvalidPeriod);
    }

    let mut amount = price_per_day.amount * Decimal::from(days);

    let discount = Decimal::from(discount);
    if discount > Decimal::ZERO {
        amount *= Decimal::ONE - discount / Decimal::ONE_HUNDRED;
    }

    Ok(Money {
        amount: amount
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        currency: price_per_day.currency,
    })
}

/// Error of a rental period ending before it starts.
#[derive(Clone, Copy, Debug, Display, Error)]
#[display("rental period ends before it starts")]
pub struct InvalidPeriod;

#[cfg(test)]
mod spec {
    use common::{money::Currency, Date, Money, Percent};
    use rust_decimal::Decimal;

    use super::quote;

    fn date(s: &str) -> Date {
        s.parse().unwrap()
    }

    fn eur(s: &str) -> Money {
        Money {
            amount: s.parse().unwrap(),
            currency: Currency::Eur,
        }
    }

    fn percent(s: &str) -> Percent {
        s.parse().unwrap()
    }

    fn price(
        from: &str,
        to: &str,
        per_day: &str,
        discount: &str,
    ) -> Result<Money, super::InvalidPeriod> {
        quote(
            date(from).coerce(),
            date(to).coerce(),
            eur(per_day),
            percent(discount),
        )
    }

    #[test]
    fn duration_is_inclusive_of_both_endpoints() {
        // 01.01 - 03.01 is three rental days.
        let total = price("01.01.2024", "03.01.2024", "50", "0").unwrap();
        assert_eq!(total, eur("150"));

        // Same-day rental is one day.
        let total = price("01.01.2024", "01.01.2024", "50", "0").unwrap();
        assert_eq!(total, eur("50"));
    }

    #[test]
    fn discount_scenario() {
        // 50/day, 3 days, 10% off: 150 -> 135.00.
        let total = price("01.01.2024", "03.01.2024", "50", "10").unwrap();
        assert_eq!(total, eur("135.00"));
    }

    #[test]
    fn no_discount_is_exact() {
        let total = price("01.01.2024", "07.01.2024", "33.33", "0").unwrap();
        assert_eq!(total, eur("233.31"));
    }

    #[test]
    fn rounds_half_up_to_cents() {
        // 10.405 rounds up, not to even.
        let total = price("01.01.2024", "01.01.2024", "10.41", "50").unwrap();
        assert_eq!(total.amount, Decimal::new(521, 2), "5.205 -> 5.21");
    }

    #[test]
    fn inverted_period_fails() {
        assert!(price("03.01.2024", "01.01.2024", "50", "0").is_err());
    }

    #[test]
    fn longer_rental_never_gets_cheaper() {
        let mut prev = Decimal::ZERO;
        for day in 1..=28 {
            let to = format!("{day:02}.02.2024");
            let total = price("01.02.2024", &to, "77.77", "15").unwrap();
            assert!(total.amount >= prev, "price dropped at day {day}");
            prev = total.amount;
        }
    }
}
