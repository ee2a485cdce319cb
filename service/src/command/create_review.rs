//! [`Command`] for leaving a [`Review`].

use common::operations::{By, Insert, Select};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{booking, review, user, Booking, Review},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for leaving a [`Review`] of a rented [`Car`].
///
/// [`Car`]: crate::domain::Car
#[derive(Clone, Debug)]
pub struct CreateReview {
    /// ID of the reviewed [`Booking`].
    pub booking_id: booking::Id,

    /// ID of the reviewing renter.
    pub renter_id: user::Id,

    /// Given [`review::Rating`].
    pub rating: review::Rating,

    /// Free-form [`review::Comment`], if any.
    pub comment: Option<review::Comment>,
}

impl<Db> Command<CreateReview> for Service<Db>
where
    Db: Database<
            Select<By<Option<Booking>, booking::Id>>,
            Ok = Option<Booking>,
            Err = Traced<database::Error>,
        > + Database<Insert<Review>, Err = Traced<database::Error>>,
{
    type Ok = Review;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateReview) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateReview {
            booking_id,
            renter_id,
            rating,
            comment,
        } = cmd;

        let booking = self
            .database()
            .execute(Select(By::<Option<Booking>, _>::new(booking_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::BookingNotExists(booking_id))
            .map_err(tracerr::wrap!())?;
        if booking.renter_id != renter_id {
            return Err(tracerr::new!(E::NotBookingRenter(renter_id)));
        }

        let review = Review {
            id: review::Id::new(),
            car_id: booking.car_id,
            renter_id,
            rating,
            comment,
        };
        self.database()
            .execute(Insert(review.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(review)
    }
}

/// Error of [`CreateReview`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Booking`] with the provided ID does not exist.
    #[display("`Booking(id: {_0})` does not exist")]
    BookingNotExists(#[error(not(source))] booking::Id),

    /// [`Booking`] belongs to another renter.
    #[display("`User(id: {_0})` is not the booking's renter")]
    NotBookingRenter(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod spec {
    use crate::{
        command::{fixtures, ConfirmBooking},
        domain::review,
        Command as _,
    };

    use super::{CreateReview, ExecutionError};

    #[tokio::test]
    async fn reviews_the_booked_car() {
        let svc = fixtures::service();
        let owner = fixtures::owner(&svc, 1).await;
        let renter = fixtures::renter(&svc, 2).await;
        let car = fixtures::car(&svc, owner.id).await;
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

        let review = svc
            .execute(CreateReview {
                booking_id: booking.id,
                renter_id: renter.id,
                rating: "4.5".parse().unwrap(),
                comment: review::Comment::new("Clean and fast."),
            })
            .await
            .unwrap();

        assert_eq!(review.car_id, car.id);
    }

    #[tokio::test]
    async fn stranger_cannot_review() {
        let svc = fixtures::service();
        let owner = fixtures::owner(&svc, 1).await;
        let renter = fixtures::renter(&svc, 2).await;
        let stranger = fixtures::renter(&svc, 3).await;
        let car = fixtures::car(&svc, owner.id).await;
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

        let err = svc
            .execute(CreateReview {
                booking_id: booking.id,
                renter_id: stranger.id,
                rating: "1".parse().unwrap(),
                comment: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::NotBookingRenter(_),
        ));
    }
}
