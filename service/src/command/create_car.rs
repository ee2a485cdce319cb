//! [`Command`] for putting a new [`Car`] on offer.

use common::{
    operations::{By, Insert, Select},
    Money, Percent,
};
use derive_more::{Display, Error, From};
use rust_decimal::Decimal;
use tracerr::Traced;

use crate::{
    domain::{car, user, Car, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for putting a new [`Car`] on offer.
#[derive(Clone, Debug)]
pub struct CreateCar {
    /// ID of the owning [`User`].
    pub owner_id: user::Id,

    /// [`car::Brand`] of the new [`Car`].
    pub brand: car::Brand,

    /// [`car::Model`] of the new [`Car`].
    pub model: car::Model,

    /// Manufacturing [`car::Year`] of the new [`Car`].
    pub year: car::Year,

    /// [`car::LicensePlate`] of the new [`Car`], if provided.
    pub license_plate: Option<car::LicensePlate>,

    /// Daily rental price of the new [`Car`].
    pub price_per_day: Money,

    /// Discount applied to the total rental price.
    pub discount: Percent,

    /// [`car::City`] the new [`Car`] is offered in.
    pub city: car::City,

    /// Rental terms shown to renters, if provided.
    pub rental_terms: Option<car::RentalTerms>,
}

impl<Db> Command<CreateCar> for Service<Db>
where
    Db: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Insert<Car>, Err = Traced<database::Error>>,
{
    type Ok = Car;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateCar) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateCar {
            owner_id,
            brand,
            model,
            year,
            license_plate,
            price_per_day,
            discount,
            city,
            rental_terms,
        } = cmd;

        if price_per_day.amount <= Decimal::ZERO {
            return Err(tracerr::new!(E::InvalidPrice(price_per_day)));
        }

        let owner = self
            .database()
            .execute(Select(By::<Option<User>, _>::new(owner_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(owner_id))
            .map_err(tracerr::wrap!())?;
        if owner.role == user::Role::Renter {
            return Err(tracerr::new!(E::UserNotOwner(owner_id)));
        }

        let car = Car {
            id: car::Id::new(),
            owner_id: owner.id,
            brand,
            model,
            year,
            license_plate,
            price_per_day,
            discount,
            city,
            rental_terms,
            available: true,
        };
        self.database()
            .execute(Insert(car.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(car)
    }
}

/// Error of [`CreateCar`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// Daily price is not positive.
    #[display("daily price `{_0}` is not positive")]
    InvalidPrice(#[error(not(source))] Money),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),

    /// [`User`] with the provided ID is not a car owner.
    #[display("`User(id: {_0})` is not a car owner")]
    UserNotOwner(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod spec {
    use common::Percent;

    use crate::{command::fixtures, domain::car, Command as _};

    use super::{CreateCar, ExecutionError};

    #[tokio::test]
    async fn creates_available_car() {
        let svc = fixtures::service();
        let owner = fixtures::owner(&svc, 1).await;

        let car = fixtures::car(&svc, owner.id).await;

        assert!(car.available);
        assert_eq!(car.owner_id, owner.id);
    }

    #[tokio::test]
    async fn rejects_non_positive_price() {
        let svc = fixtures::service();
        let owner = fixtures::owner(&svc, 1).await;

        let err = svc
            .execute(CreateCar {
                owner_id: owner.id,
                brand: car::Brand::new("Fiat").unwrap(),
                model: car::Model::new("Punto").unwrap(),
                year: car::Year::new(2015).unwrap(),
                license_plate: None,
                price_per_day: fixtures::eur("0"),
                discount: Percent::ZERO,
                city: car::City::new("Novi Sad").unwrap(),
                rental_terms: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::InvalidPrice(_)));
    }

    #[tokio::test]
    async fn rejects_renter_as_owner() {
        let svc = fixtures::service();
        let renter = fixtures::renter(&svc, 1).await;

        let err = svc
            .execute(CreateCar {
                owner_id: renter.id,
                brand: car::Brand::new("Fiat").unwrap(),
                model: car::Model::new("Punto").unwrap(),
                year: car::Year::new(2015).unwrap(),
                license_plate: None,
                price_per_day: fixtures::eur("20"),
                discount: Percent::ZERO,
                city: car::City::new("Novi Sad").unwrap(),
                rental_terms: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::UserNotOwner(_)));
    }
}
