//! Review dialog flow.

use tracerr::Traced;

use crate::{
    command::{create_review, CreateReview},
    domain::{booking, review, user, Booking, User},
    infra::database,
    query, read, Command, Query, Service,
};

use super::{
    booking_option, choose, registered_user, Error, Flow as Dialog, Next,
    Reply,
};

/// Step of the review dialog, with its collected data.
#[derive(Clone, Debug)]
pub enum Flow {
    /// Waiting for the renter to pick a booking to review.
    SelectBooking {
        /// ID of the renter.
        renter_id: user::Id,

        /// Bookings offered for selection.
        options: Vec<booking::Id>,
    },

    /// Waiting for the rating.
    EnterRating {
        /// ID of the renter.
        renter_id: user::Id,

        /// ID of the reviewed booking.
        booking_id: booking::Id,
    },

    /// Waiting for the optional comment.
    EnterComment {
        /// ID of the renter.
        renter_id: user::Id,

        /// ID of the reviewed booking.
        booking_id: booking::Id,

        /// Collected rating.
        rating: review::Rating,
    },
}

/// Starts the review dialog by listing the renter's reviewable bookings.
pub(super) async fn start<Db>(
    svc: &Service<Db>,
    chat_id: user::ChatId,
) -> Result<Next, Traced<Error>>
where
    Service<Db>: Query<
            query::user::ByChatId,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Query<
            query::booking::OfRenter,
            Ok = Vec<Booking>,
            Err = Traced<database::Error>,
        >,
{
    let user = match registered_user(svc, chat_id).await? {
        Ok(user) => user,
        Err(next) => return Ok(next),
    };

    let bookings = svc
        .execute(query::booking::OfRenter::by(read::booking::OfRenter {
            renter_id: user.id,
            status: booking::Status::Confirmed,
        }))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> Error))?;
    if bookings.is_empty() {
        return Ok(Next::Finish(Reply::text(
            "You have no bookings to review.",
        )));
    }

    let mut text = String::from("Pick a booking to review:\n");
    for (i, booking) in bookings.iter().enumerate() {
        text.push_str(&booking_option(i, booking));
        text.push('\n');
    }
    Ok(Next::Continue(
        Dialog::Review(Flow::SelectBooking {
            renter_id: user.id,
            options: bookings.iter().map(|b| b.id).collect(),
        }),
        Reply::text(text),
    ))
}

/// Advances the review dialog by one step.
pub(super) async fn advance<Db>(
    svc: &Service<Db>,
    flow: Flow,
    text: &str,
) -> Result<Next, Traced<Error>>
where
    Service<Db>: Command<
        CreateReview,
        Ok = crate::domain::Review,
        Err = Traced<create_review::ExecutionError>,
    >,
{
    match flow {
        Flow::SelectBooking { renter_id, options } => {
            Ok(select_booking(renter_id, options, text))
        }
        Flow::EnterRating {
            renter_id,
            booking_id,
        } => Ok(enter_rating(renter_id, booking_id, text)),
        Flow::EnterComment {
            renter_id,
            booking_id,
            rating,
        } => enter_comment(svc, renter_id, booking_id, rating, text).await,
    }
}

/// Booking selection by number.
fn select_booking(
    renter_id: user::Id,
    options: Vec<booking::Id>,
    text: &str,
) -> Next {
    let Some(&booking_id) = choose(&options, text) else {
        return Next::Continue(
            Dialog::Review(Flow::SelectBooking { renter_id, options }),
            Reply::text("Please pick a booking from the list by its number."),
        );
    };
    Next::Continue(
        Dialog::Review(Flow::EnterRating {
            renter_id,
            booking_id,
        }),
        Reply::text("Rate the rental from 1.0 to 5.0:"),
    )
}

/// Rating input.
fn enter_rating(
    renter_id: user::Id,
    booking_id: booking::Id,
    text: &str,
) -> Next {
    let Ok(rating) = text.parse::<review::Rating>() else {
        return Next::Continue(
            Dialog::Review(Flow::EnterRating {
                renter_id,
                booking_id,
            }),
            Reply::text("Please enter a number from 1.0 to 5.0."),
        );
    };
    Next::Continue(
        Dialog::Review(Flow::EnterComment {
            renter_id,
            booking_id,
            rating,
        }),
        Reply::text("Leave a comment, or answer 'skip':"),
    )
}

/// Optional comment input and persistence.
async fn enter_comment<Db>(
    svc: &Service<Db>,
    renter_id: user::Id,
    booking_id: booking::Id,
    rating: review::Rating,
    text: &str,
) -> Result<Next, Traced<Error>>
where
    Service<Db>: Command<
        CreateReview,
        Ok = crate::domain::Review,
        Err = Traced<create_review::ExecutionError>,
    >,
{
    let comment = if text.trim().eq_ignore_ascii_case("skip") {
        None
    } else {
        match review::Comment::new(text.trim()) {
            Some(comment) => Some(comment),
            None => {
                return Ok(Next::Continue(
                    Dialog::Review(Flow::EnterComment {
                        renter_id,
                        booking_id,
                        rating,
                    }),
                    Reply::text(
                        "Please write a short comment, or answer 'skip'.",
                    ),
                ));
            }
        }
    };

    let created = svc
        .execute(CreateReview {
            booking_id,
            renter_id,
            rating,
            comment,
        })
        .await;
    Ok(match created {
        Ok(_) => Next::Finish(Reply::text("Thanks for your review!")),
        Err(e) => match e.as_ref() {
            create_review::ExecutionError::BookingNotExists(_)
            | create_review::ExecutionError::NotBookingRenter(_) => {
                Next::Finish(Reply::text("This booking is gone."))
            }
            create_review::ExecutionError::Db(_) => {
                return Err(e).map_err(tracerr::map_from_and_wrap!(=> Error));
            }
        },
    })
}
