//! BankQr provider: bank transfer via a scannable QR payload.
//!
//! Encodes the transfer details into the fixed-delimiter text payload the
//! national payment-slip QR standard prescribes. Rendering the payload as an
//! image is the transport's concern; the bank reports transfers out-of-band,
//! so this provider has no webhook.

use crate::domain::{Booking, Car};

/// BankQr provider configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Name of the transfer recipient.
    pub recipient: String,

    /// Bank account number of the recipient.
    pub account: String,
}

impl Config {
    /// Encodes the QR text payload for the provided [`Booking`].
    #[must_use]
    pub fn payload(&self, booking: &Booking, car: &Car) -> String {
        let purpose = format!(
            "Car rental {} {} {}-{}",
            car.brand, car.model, booking.date_from, booking.date_to,
        );
        format!(
            "ST01|{}|{purpose}|{}|{}",
            self.recipient,
            booking.total_price.amount_fixed2(),
            self.account,
        )
    }
}

#[cfg(test)]
mod spec {
    use common::{money::Currency, DateTimeOf, Money, Percent};

    use crate::domain::{booking, car, user, Booking, Car};

    use super::Config;

    #[test]
    fn encodes_fixed_delimiter_payload() {
        let config = Config {
            recipient: "RENT A CAR DOO".into(),
            account: "190-0000000000017-84".into(),
        };
        let car = Car {
            id: car::Id::new(),
            owner_id: user::Id::new(),
            brand: car::Brand::new("Skoda").unwrap(),
            model: car::Model::new("Octavia").unwrap(),
            year: car::Year::new(2021).unwrap(),
            license_plate: None,
            price_per_day: Money {
                amount: "45".parse().unwrap(),
                currency: Currency::Eur,
            },
            discount: Percent::ZERO,
            city: car::City::new("Belgrade").unwrap(),
            rental_terms: None,
            available: false,
        };
        let booking = Booking {
            id: booking::Id::new(),
            car_id: car.id,
            renter_id: user::Id::new(),
            date_from: "01.03.2024".parse().unwrap(),
            date_to: "03.03.2024".parse().unwrap(),
            total_price: Money {
                amount: "135".parse().unwrap(),
                currency: Currency::Eur,
            },
            status: booking::Status::Confirmed,
            contract_signed: false,
            created_at: DateTimeOf::now(),
        };

        assert_eq!(
            config.payload(&booking, &car),
            "ST01|RENT A CAR DOO\
             |Car rental Skoda Octavia 01.03.2024-03.03.2024\
             |135.00\
             |190-0000000000017-84",
        );
    }
}
