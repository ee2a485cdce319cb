//! [`Command`] definition.

pub mod annul_contract;
pub mod cancel_booking;
pub mod confirm_booking;
pub mod create_car;
pub mod create_payment;
pub mod create_review;
pub mod delete_car;
pub mod generate_contract;
pub mod reconcile_payment;
pub mod register_user;
pub mod sign_contract;
pub mod update_car;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    annul_contract::AnnulContract, cancel_booking::CancelBooking,
    confirm_booking::ConfirmBooking, create_car::CreateCar,
    create_payment::CreatePayment, create_review::CreateReview,
    delete_car::DeleteCar, generate_contract::GenerateContract,
    reconcile_payment::ReconcilePayment, register_user::RegisterUser,
    sign_contract::SignContract, update_car::UpdateCar,
};

#[cfg(test)]
pub(crate) mod fixtures {
    //! Shared fixtures for [`Command`] tests.

    use std::time::Duration;

    use common::{money::Currency, Money, Percent};
    use secrecy::SecretString;

    use crate::{
        domain::{car, user, Car, User},
        gateway,
        infra::{Documents, InMemory},
        task, Command as _, Config, Service,
    };

    use super::{CreateCar, RegisterUser};

    /// Test [`gateway::Config`] with well-known secrets.
    pub(crate) fn gateway_config() -> gateway::Config {
        gateway::Config {
            link_pay: gateway::link_pay::Config {
                merchant_id: "m-100".into(),
                secret_out: SecretString::from("s3cr3t-out".to_owned()),
                secret_in: SecretString::from("s3cr3t-in".to_owned()),
                base_url: "https://pay.linkpay.example/".into(),
            },
            card_gate: gateway::card_gate::Config {
                secret: SecretString::from("whsec-test".to_owned()),
                base_url: "https://checkout.cardgate.example/pay".into(),
            },
            bank_qr: gateway::bank_qr::Config {
                recipient: "RENT A CAR DOO".into(),
                account: "190-0000000000017-84".into(),
            },
        }
    }

    /// Creates a [`Service`] over an empty in-memory store.
    pub(crate) fn service() -> Service<InMemory> {
        let config = Config {
            gateway: gateway_config(),
            expire_stale_sessions: task::expire_stale_sessions::Config {
                interval: Duration::from_secs(300),
                ttl: Duration::from_secs(1800),
            },
        };
        Service::new(config, InMemory::new(), Documents::in_memory()).0
    }

    /// Registers a renter.
    pub(crate) async fn renter(svc: &Service<InMemory>, chat_id: i64) -> User {
        svc.execute(RegisterUser {
            chat_id: chat_id.into(),
            role: user::Role::Renter,
            name: user::Name::new("Mia Renter").unwrap(),
            phone: user::Phone::new("+381641234567").unwrap(),
            company: None,
        })
        .await
        .unwrap()
    }

    /// Registers a person owner.
    pub(crate) async fn owner(svc: &Service<InMemory>, chat_id: i64) -> User {
        svc.execute(RegisterUser {
            chat_id: chat_id.into(),
            role: user::Role::OwnerPerson,
            name: user::Name::new("Novak Owner").unwrap(),
            phone: user::Phone::new("+381601112233").unwrap(),
            company: None,
        })
        .await
        .unwrap()
    }

    /// `50EUR` per day.
    pub(crate) fn eur(amount: &str) -> Money {
        Money {
            amount: amount.parse().unwrap(),
            currency: Currency::Eur,
        }
    }

    /// Puts an available car on offer.
    pub(crate) async fn car(
        svc: &Service<InMemory>,
        owner_id: user::Id,
    ) -> Car {
        svc.execute(CreateCar {
            owner_id,
            brand: car::Brand::new("Skoda").unwrap(),
            model: car::Model::new("Octavia").unwrap(),
            year: car::Year::new(2021).unwrap(),
            license_plate: None,
            price_per_day: eur("50"),
            discount: Percent::new("10".parse().unwrap()).unwrap(),
            city: car::City::new("Belgrade").unwrap(),
            rental_terms: None,
        })
        .await
        .unwrap()
    }
}
