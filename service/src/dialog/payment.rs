//! Payment dialog flow.
//!
//! Pick a confirmed booking, pick a provider, receive the payment artifact.
//! The PENDING payment row is recorded by [`CreatePayment`] before the
//! artifact is handed out; completion arrives via webhooks only.

use tracerr::Traced;

use crate::{
    command::{create_payment, CreatePayment},
    domain::{booking, payment, user, Booking, User},
    gateway,
    infra::database,
    query, read, Command, Query, Service,
};

use super::{
    booking_option, choose, registered_user, Error, Flow as Dialog, Next,
    Outgoing, Reply,
};

/// Step of the payment dialog, with its collected data.
#[derive(Clone, Debug)]
pub enum Flow {
    /// Waiting for the renter to pick a booking to pay for.
    SelectBooking {
        /// ID of the renter.
        renter_id: user::Id,

        /// Bookings offered for selection.
        options: Vec<booking::Id>,
    },

    /// Waiting for the renter to pick a payment method.
    SelectMethod {
        /// ID of the renter.
        renter_id: user::Id,

        /// ID of the selected booking.
        booking_id: booking::Id,
    },
}

/// Methods offered for selection, in display order.
const METHODS: [payment::Method; 3] = [
    payment::Method::LinkPay,
    payment::Method::CardGate,
    payment::Method::BankQr,
];

/// Starts the payment dialog by listing the renter's payable bookings.
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
            "You have no bookings to pay for.",
        )));
    }

    let mut text = String::from("Pick a booking to pay for:\n");
    for (i, booking) in bookings.iter().enumerate() {
        text.push_str(&booking_option(i, booking));
        text.push('\n');
    }
    Ok(Next::Continue(
        Dialog::Payment(Flow::SelectBooking {
            renter_id: user.id,
            options: bookings.iter().map(|b| b.id).collect(),
        }),
        Reply::text(text),
    ))
}

/// Advances the payment dialog by one step.
pub(super) async fn advance<Db>(
    svc: &Service<Db>,
    flow: Flow,
    text: &str,
) -> Result<Next, Traced<Error>>
where
    Service<Db>: Command<
        CreatePayment,
        Ok = (crate::domain::Payment, gateway::Artifact),
        Err = Traced<create_payment::ExecutionError>,
    >,
{
    match flow {
        Flow::SelectBooking { renter_id, options } => {
            Ok(select_booking(renter_id, options, text))
        }
        Flow::SelectMethod {
            renter_id,
            booking_id,
        } => select_method(svc, renter_id, booking_id, text).await,
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
            Dialog::Payment(Flow::SelectBooking { renter_id, options }),
            Reply::text("Please pick a booking from the list by its number."),
        );
    };
    Next::Continue(
        Dialog::Payment(Flow::SelectMethod {
            renter_id,
            booking_id,
        }),
        Reply::text(
            "How would you like to pay?\n\
             1. LinkPay (payment link)\n\
             2. CardGate (card checkout)\n\
             3. Bank transfer QR code",
        ),
    )
}

/// Method selection and artifact issuance.
async fn select_method<Db>(
    svc: &Service<Db>,
    renter_id: user::Id,
    booking_id: booking::Id,
    text: &str,
) -> Result<Next, Traced<Error>>
where
    Service<Db>: Command<
        CreatePayment,
        Ok = (crate::domain::Payment, gateway::Artifact),
        Err = Traced<create_payment::ExecutionError>,
    >,
{
    let Some(&method) = choose(&METHODS, text) else {
        return Ok(Next::Continue(
            Dialog::Payment(Flow::SelectMethod {
                renter_id,
                booking_id,
            }),
            Reply::text("Please answer 1, 2 or 3."),
        ));
    };

    let created = svc
        .execute(CreatePayment {
            booking_id,
            renter_id,
            method,
        })
        .await;
    Ok(match created {
        Ok((_, gateway::Artifact::RedirectUrl(url))) => {
            Next::Finish(Reply::text(format!(
                "Follow the link to pay:\n{url}",
            )))
        }
        Ok((payment, gateway::Artifact::QrPayload(payload))) => {
            Next::Finish(Reply(vec![Outgoing::Qr {
                payload,
                caption: format!(
                    "Scan the QR code to pay {}.",
                    payment.amount,
                ),
            }]))
        }
        Err(e) => match e.as_ref() {
            create_payment::ExecutionError::BookingNotExists(_)
            | create_payment::ExecutionError::NotBookingRenter(_)
            | create_payment::ExecutionError::CarNotExists(_) => {
                Next::Finish(Reply::text("This booking is gone."))
            }
            create_payment::ExecutionError::NotPayable(status) => {
                Next::Finish(Reply::text(format!(
                    "This booking cannot be paid anymore (status: {status}).",
                )))
            }
            create_payment::ExecutionError::Db(_) => {
                return Err(e).map_err(tracerr::map_from_and_wrap!(=> Error));
            }
        },
    })
}
