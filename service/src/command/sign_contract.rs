//! [`Command`] for signing a generated [`Contract`].

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{booking, contract, user, Booking, Contract},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for signing a generated [`Contract`].
///
/// Transitions [`Contract::signed`] and [`Booking::contract_signed`]
/// together, in one transaction.
#[derive(Clone, Debug)]
pub struct SignContract {
    /// ID of the [`Contract`] to sign.
    pub contract_id: contract::Id,

    /// ID of the renter signing the [`Contract`].
    pub renter_id: user::Id,

    /// Signature payload submitted by the renter, if any.
    pub signature: Option<contract::Signature>,
}

impl<Db> Command<SignContract> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<Contract>, contract::Id>>,
            Ok = Option<Contract>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<Booking, booking::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Booking>, booking::Id>>,
            Ok = Option<Booking>,
            Err = Traced<database::Error>,
        > + Database<Update<Contract>, Err = Traced<database::Error>>
        + Database<Update<Booking>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Contract;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: SignContract) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let SignContract {
            contract_id,
            renter_id,
            signature,
        } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let mut contract = tx
            .execute(Select(By::<Option<Contract>, _>::new(contract_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ContractNotExists(contract_id))
            .map_err(tracerr::wrap!())?;
        if contract.signed {
            return Err(tracerr::new!(E::AlreadySigned(contract_id)));
        }

        tx.execute(Lock(By::<Booking, _>::new(contract.booking_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut booking = tx
            .execute(Select(By::<Option<Booking>, _>::new(contract.booking_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::BookingNotExists(contract.booking_id))
            .map_err(tracerr::wrap!())?;
        if booking.renter_id != renter_id {
            return Err(tracerr::new!(E::NotBookingRenter(renter_id)));
        }

        contract.signed = true;
        contract.signature = signature;
        tx.execute(Update(contract.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        booking.contract_signed = true;
        tx.execute(Update(booking))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(contract)
    }
}

/// Error of [`SignContract`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Contract`] with the provided ID does not exist.
    #[display("`Contract(id: {_0})` does not exist")]
    ContractNotExists(#[error(not(source))] contract::Id),

    /// [`Contract`] is already signed.
    #[display("`Contract(id: {_0})` is already signed")]
    AlreadySigned(#[error(not(source))] contract::Id),

    /// [`Booking`] referenced by the [`Contract`] does not exist.
    #[display("`Booking(id: {_0})` does not exist")]
    BookingNotExists(#[error(not(source))] booking::Id),

    /// [`Booking`] belongs to another renter.
    #[display("`User(id: {_0})` is not the booking's renter")]
    NotBookingRenter(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod spec {
    use common::operations::{By, Select};

    use crate::{
        command::{fixtures, ConfirmBooking, GenerateContract},
        domain::{Booking, Contract, User},
        Command as _,
        Service,
    };

    use super::{ExecutionError, SignContract};

    async fn generated_contract(
        svc: &Service<crate::infra::InMemory>,
    ) -> (User, Booking, Contract) {
        let owner = fixtures::owner(svc, 1).await;
        let renter = fixtures::renter(svc, 2).await;
        let car = fixtures::car(svc, owner.id).await;
        let booking = svc
            .execute(ConfirmBooking {
                renter_id: renter.id,
                car_id: car.id,
                date_from: "01.03.2030".parse().unwrap(),
                date_to: "03.03.2030".parse().unwrap(),
                quoted_price: fixtures::eur("135.00"),
            })
            .await
            .unwrap();
        let contract = svc
            .execute(GenerateContract {
                booking_id: booking.id,
                renter_id: renter.id,
            })
            .await
            .unwrap();
        (renter, booking, contract)
    }

    #[tokio::test]
    async fn signing_marks_contract_and_booking_atomically() {
        let svc = fixtures::service();
        let (renter, booking, contract) = generated_contract(&svc).await;

        let signed = svc
            .execute(SignContract {
                contract_id: contract.id,
                renter_id: renter.id,
                signature: None,
            })
            .await
            .unwrap();
        assert!(signed.signed);

        let booking = svc
            .database()
            .execute(Select(By::<Option<Booking>, _>::new(booking.id)))
            .await
            .unwrap()
            .unwrap();
        assert!(booking.contract_signed);
    }

    #[tokio::test]
    async fn double_signing_is_rejected() {
        let svc = fixtures::service();
        let (renter, _, contract) = generated_contract(&svc).await;

        svc.execute(SignContract {
            contract_id: contract.id,
            renter_id: renter.id,
            signature: None,
        })
        .await
        .unwrap();

        let err = svc
            .execute(SignContract {
                contract_id: contract.id,
                renter_id: renter.id,
                signature: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::AlreadySigned(_)));
    }
}
