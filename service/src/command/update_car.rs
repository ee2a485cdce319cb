//! [`Command`] for editing a [`Car`].

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use rust_decimal::Decimal;
use tracerr::Traced;

use crate::{
    domain::{car, user, Car},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for editing a single field of a [`Car`].
///
/// The edit target arrives as a closed [`car::Patch`], resolved from the
/// transport callback once at the boundary and matched exhaustively here.
#[derive(Clone, Debug)]
pub struct UpdateCar {
    /// ID of the [`Car`] to edit.
    pub car_id: car::Id,

    /// ID of the [`User`] requesting the edit.
    ///
    /// [`User`]: crate::domain::User
    pub editor_id: user::Id,

    /// Field replacement to apply.
    pub patch: car::Patch,
}

impl<Db> Command<UpdateCar> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<Lock<By<Car, car::Id>>, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Car>, car::Id>>,
            Ok = Option<Car>,
            Err = Traced<database::Error>,
        > + Database<Update<Car>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Car;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: UpdateCar) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateCar {
            car_id,
            editor_id,
            patch,
        } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Lock(By::new(car_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut car = tx
            .execute(Select(By::<Option<Car>, _>::new(car_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::CarNotExists(car_id))
            .map_err(tracerr::wrap!())?;
        if car.owner_id != editor_id {
            return Err(tracerr::new!(E::NotCarOwner(editor_id)));
        }

        match patch {
            car::Patch::Brand(brand) => car.brand = brand,
            car::Patch::Model(model) => car.model = model,
            car::Patch::Year(year) => car.year = year,
            car::Patch::LicensePlate(plate) => car.license_plate = plate,
            car::Patch::PricePerDay(price) => {
                if price.amount <= Decimal::ZERO {
                    return Err(tracerr::new!(E::InvalidPrice(price)));
                }
                car.price_per_day = price;
            }
            car::Patch::Discount(discount) => car.discount = discount,
            car::Patch::City(city) => car.city = city,
            car::Patch::RentalTerms(terms) => car.rental_terms = terms,
        }

        tx.execute(Update(car.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(car)
    }
}

/// Error of [`UpdateCar`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Car`] with the provided ID does not exist.
    #[display("`Car(id: {_0})` does not exist")]
    CarNotExists(#[error(not(source))] car::Id),

    /// Editor does not own the [`Car`].
    #[display("`User(id: {_0})` does not own the car")]
    NotCarOwner(#[error(not(source))] user::Id),

    /// Daily price is not positive.
    #[display("daily price `{_0}` is not positive")]
    InvalidPrice(#[error(not(source))] common::Money),
}

#[cfg(test)]
mod spec {
    use crate::{command::fixtures, domain::car, Command as _};

    use super::{ExecutionError, UpdateCar};

    #[tokio::test]
    async fn owner_edits_price() {
        let svc = fixtures::service();
        let owner = fixtures::owner(&svc, 1).await;
        let car = fixtures::car(&svc, owner.id).await;

        let updated = svc
            .execute(UpdateCar {
                car_id: car.id,
                editor_id: owner.id,
                patch: car::Patch::PricePerDay(fixtures::eur("60")),
            })
            .await
            .unwrap();

        assert_eq!(updated.price_per_day, fixtures::eur("60"));
    }

    #[tokio::test]
    async fn stranger_cannot_edit() {
        let svc = fixtures::service();
        let owner = fixtures::owner(&svc, 1).await;
        let stranger = fixtures::renter(&svc, 2).await;
        let car = fixtures::car(&svc, owner.id).await;

        let err = svc
            .execute(UpdateCar {
                car_id: car.id,
                editor_id: stranger.id,
                patch: car::Patch::PricePerDay(fixtures::eur("1")),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::NotCarOwner(_)));
    }

    #[tokio::test]
    async fn zero_price_patch_is_rejected() {
        let svc = fixtures::service();
        let owner = fixtures::owner(&svc, 1).await;
        let car = fixtures::car(&svc, owner.id).await;

        let err = svc
            .execute(UpdateCar {
                car_id: car.id,
                editor_id: owner.id,
                patch: car::Patch::PricePerDay(fixtures::eur("0")),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::InvalidPrice(_)));
    }
}
