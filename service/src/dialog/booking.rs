//! Booking dialog flow.
//!
//! SELECT_CITY -> SELECT_CAR -> (registration suspension) ->
//! SELECT_DATE_FROM -> SELECT_DATE_TO -> CONFIRM. Each step re-reads the
//! store instead of trusting snapshots, and the terminal confirmation
//! re-validates everything inside the [`ConfirmBooking`] transaction.

use common::{Date, Money};
use rust_decimal::Decimal;
use tracerr::Traced;

use crate::{
    command::{confirm_booking, ConfirmBooking},
    domain::{booking, car, Booking, Car, User},
    infra::database,
    query, read, Command, Query, Service,
};

use super::{choose, registration, Error, Flow as Dialog, Next, Reply};

/// Step of the booking dialog, with its collected data.
#[derive(Clone, Debug)]
pub enum Flow {
    /// Waiting for the renter to name a city.
    SelectCity,

    /// Waiting for the renter to pick one of the offered cars.
    SelectCar {
        /// City the cars were offered in.
        city: car::City,

        /// Cars offered for selection.
        offered: Vec<Offer>,
    },

    /// Waiting for the first rental day.
    SelectDateFrom {
        /// ID of the selected [`Car`].
        car_id: car::Id,
    },

    /// Waiting for the last rental day.
    SelectDateTo {
        /// ID of the selected [`Car`].
        car_id: car::Id,

        /// Accepted first rental day.
        date_from: booking::StartDate,
    },

    /// Waiting for the yes/no confirmation of the summary.
    Confirm {
        /// ID of the selected [`Car`].
        car_id: car::Id,

        /// Accepted first rental day.
        date_from: booking::StartDate,

        /// Accepted last rental day.
        date_to: booking::EndDate,

        /// Total price presented in the summary.
        quoted: Money,
    },
}

/// One car offered for selection.
#[derive(Clone, Debug)]
pub struct Offer {
    /// ID of the offered [`Car`].
    pub car_id: car::Id,

    /// Display label of the offered [`Car`].
    pub label: String,
}

/// Reservation progress captured while the registration sub-flow runs.
///
/// Carried through every registration step, so arbitrary rejected inputs
/// cannot lose the reservation; a completed registration resumes at
/// [`Flow::SelectDateFrom`].
#[derive(Clone, Debug)]
pub struct Suspended {
    /// City the cars were offered in.
    pub city: car::City,

    /// Cars offered at suspension time.
    pub offered: Vec<Offer>,

    /// ID of the [`Car`] the renter had picked.
    pub car_id: car::Id,
}

/// Formats the display label of an offered [`Car`].
fn label(car: &Car) -> String {
    let discount = Decimal::from(car.discount);
    if discount > Decimal::ZERO {
        format!(
            "{} {} ({}) - {}/day, {}% off",
            car.brand, car.model, car.year, car.price_per_day, car.discount,
        )
    } else {
        format!(
            "{} {} ({}) - {}/day",
            car.brand, car.model, car.year, car.price_per_day,
        )
    }
}

/// Starts the booking dialog by listing cities with available cars.
pub(super) async fn start<Db>(
    svc: &Service<Db>,
) -> Result<Next, Traced<Error>>
where
    Service<Db>: Query<
        query::car::AvailableCities,
        Ok = Vec<car::City>,
        Err = Traced<database::Error>,
    >,
{
    let cities = svc
        .execute(query::car::AvailableCities::by(
            read::car::AvailableCities,
        ))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> Error))?;
    if cities.is_empty() {
        return Ok(Next::Finish(Reply::text(
            "No cars are available for booking right now.",
        )));
    }

    let mut text = String::from("Which city do you want to rent in?\n");
    for city in &cities {
        text.push_str(&format!("- {city}\n"));
    }
    Ok(Next::Continue(
        Dialog::Booking(Flow::SelectCity),
        Reply::text(text),
    ))
}

/// Advances the booking dialog by one step.
pub(super) async fn advance<Db>(
    svc: &Service<Db>,
    chat_id: crate::domain::user::ChatId,
    flow: Flow,
    text: &str,
) -> Result<Next, Traced<Error>>
where
    Service<Db>: Query<
            query::car::AvailableIn,
            Ok = Vec<Car>,
            Err = Traced<database::Error>,
        > + Query<
            query::car::ById,
            Ok = Option<Car>,
            Err = Traced<database::Error>,
        > + Query<
            query::user::ByChatId,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Command<
            ConfirmBooking,
            Ok = Booking,
            Err = Traced<confirm_booking::ExecutionError>,
        >,
{
    match flow {
        Flow::SelectCity => select_city(svc, text).await,
        Flow::SelectCar { city, offered } => {
            select_car(svc, chat_id, city, offered, text).await
        }
        Flow::SelectDateFrom { car_id } => {
            Ok(select_date_from(car_id, text))
        }
        Flow::SelectDateTo { car_id, date_from } => {
            select_date_to(svc, car_id, date_from, text).await
        }
        Flow::Confirm {
            car_id,
            date_from,
            date_to,
            quoted,
        } => confirm(svc, chat_id, car_id, date_from, date_to, quoted, text)
            .await,
    }
}

/// SELECT_CITY: offers the available cars of the named city.
async fn select_city<Db>(
    svc: &Service<Db>,
    text: &str,
) -> Result<Next, Traced<Error>>
where
    Service<Db>: Query<
        query::car::AvailableIn,
        Ok = Vec<Car>,
        Err = Traced<database::Error>,
    >,
{
    let Some(city) = car::City::new(text.trim()) else {
        return Ok(Next::Continue(
            Dialog::Booking(Flow::SelectCity),
            Reply::text("Please name a city."),
        ));
    };

    let cars = svc
        .execute(query::car::AvailableIn::by(read::car::AvailableIn(
            city.clone(),
        )))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> Error))?;
    if cars.is_empty() {
        return Ok(Next::Continue(
            Dialog::Booking(Flow::SelectCity),
            Reply::text(format!(
                "No available cars in {city}. Try another city.",
            )),
        ));
    }

    let offered: Vec<_> = cars
        .iter()
        .map(|car| Offer {
            car_id: car.id,
            label: label(car),
        })
        .collect();
    let mut reply = String::from("Pick a car by number:\n");
    for (i, offer) in offered.iter().enumerate() {
        reply.push_str(&format!("{}. {}\n", i + 1, offer.label));
    }
    Ok(Next::Continue(
        Dialog::Booking(Flow::SelectCar { city, offered }),
        Reply::text(reply),
    ))
}

/// SELECT_CAR: records the choice, suspending into registration if the
/// renter is unknown.
async fn select_car<Db>(
    svc: &Service<Db>,
    chat_id: crate::domain::user::ChatId,
    city: car::City,
    offered: Vec<Offer>,
    text: &str,
) -> Result<Next, Traced<Error>>
where
    Service<Db>: Query<
        query::user::ByChatId,
        Ok = Option<User>,
        Err = Traced<database::Error>,
    >,
{
    let Some(offer) = choose(&offered, text) else {
        return Ok(Next::Continue(
            Dialog::Booking(Flow::SelectCar { city, offered }),
            Reply::text("Please pick a car from the list by its number."),
        ));
    };
    let car_id = offer.car_id;

    let user = svc
        .execute(query::user::ByChatId::by(chat_id))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> Error))?;
    if !user.is_some_and(|u| u.registered) {
        // The reservation survives the detour: registration carries the
        // marker and resumes at the date selection.
        return Ok(Next::Continue(
            Dialog::Registration(registration::Flow::SelectRole {
                resume: Some(Suspended {
                    city,
                    offered,
                    car_id,
                }),
            }),
            Reply::text(
                "You need to register first; your car choice is kept.\n\
                 Who are you?\n\
                 1. Car owner (person)\n\
                 2. Car owner (company)\n\
                 3. Renter",
            ),
        ));
    }

    Ok(Next::Continue(
        Dialog::Booking(Flow::SelectDateFrom { car_id }),
        Reply::text("Enter the first rental day (DD.MM.YYYY):"),
    ))
}

/// SELECT_DATE_FROM: validates the calendar date; today is the earliest
/// accepted day.
fn select_date_from(car_id: car::Id, text: &str) -> Next {
    let Ok(date_from) = text.parse::<booking::StartDate>() else {
        return Next::Continue(
            Dialog::Booking(Flow::SelectDateFrom { car_id }),
            Reply::text("Enter a valid date as DD.MM.YYYY."),
        );
    };
    if date_from < Date::today().coerce() {
        return Next::Continue(
            Dialog::Booking(Flow::SelectDateFrom { car_id }),
            Reply::text("The first rental day cannot be in the past."),
        );
    }
    Next::Continue(
        Dialog::Booking(Flow::SelectDateTo { car_id, date_from }),
        Reply::text("Enter the last rental day (DD.MM.YYYY):"),
    )
}

/// SELECT_DATE_TO: validates the range, reprices from the fresh car state
/// and presents the summary.
async fn select_date_to<Db>(
    svc: &Service<Db>,
    car_id: car::Id,
    date_from: booking::StartDate,
    text: &str,
) -> Result<Next, Traced<Error>>
where
    Service<Db>: Query<
        query::car::ById,
        Ok = Option<Car>,
        Err = Traced<database::Error>,
    >,
{
    let Ok(date_to) = text.parse::<booking::EndDate>() else {
        return Ok(Next::Continue(
            Dialog::Booking(Flow::SelectDateTo { car_id, date_from }),
            Reply::text("Enter a valid date as DD.MM.YYYY."),
        ));
    };
    if date_to.coerce::<common::unit::Start>() < date_from {
        return Ok(Next::Continue(
            Dialog::Booking(Flow::SelectDateTo { car_id, date_from }),
            Reply::text(
                "The last rental day cannot precede the first one.",
            ),
        ));
    }

    // Priced from the current store state, never from the selection-time
    // snapshot.
    let car = svc
        .execute(query::car::ById::by(car_id))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> Error))?;
    let Some(car) = car.filter(|c| c.available) else {
        return Ok(Next::Finish(Reply::text(
            "Sorry, this car is no longer available.",
        )));
    };

    let quoted = match crate::pricing::quote(
        date_from,
        date_to,
        car.price_per_day,
        car.discount,
    ) {
        Ok(quoted) => quoted,
        Err(_) => {
            return Ok(Next::Continue(
                Dialog::Booking(Flow::SelectDateTo { car_id, date_from }),
                Reply::text(
                    "The last rental day cannot precede the first one.",
                ),
            ));
        }
    };

    Ok(Next::Continue(
        Dialog::Booking(Flow::Confirm {
            car_id,
            date_from,
            date_to,
            quoted,
        }),
        Reply::text(format!(
            "Confirm the booking:\n\
             {}\n\
             {date_from} - {date_to}\n\
             Total: {quoted}\n\
             \n\
             Confirm? (yes/no)",
            label(&car),
        )),
    ))
}

/// CONFIRM: binary yes/no; "yes" runs the transactional confirmation.
async fn confirm<Db>(
    svc: &Service<Db>,
    chat_id: crate::domain::user::ChatId,
    car_id: car::Id,
    date_from: booking::StartDate,
    date_to: booking::EndDate,
    quoted: Money,
    text: &str,
) -> Result<Next, Traced<Error>>
where
    Service<Db>: Query<
            query::user::ByChatId,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Command<
            ConfirmBooking,
            Ok = Booking,
            Err = Traced<confirm_booking::ExecutionError>,
        >,
{
    match text.trim().to_lowercase().as_str() {
        "no" => return Ok(Next::Finish(Reply::text("Booking cancelled."))),
        "yes" => {}
        _ => {
            return Ok(Next::Continue(
                Dialog::Booking(Flow::Confirm {
                    car_id,
                    date_from,
                    date_to,
                    quoted,
                }),
                Reply::text("Please answer yes or no."),
            ));
        }
    }

    let user = svc
        .execute(query::user::ByChatId::by(chat_id))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> Error))?;
    let Some(user) = user.filter(|u| u.registered) else {
        return Ok(Next::Finish(Reply::text(
            "You are not registered anymore. Use /start to register.",
        )));
    };

    let confirmed = svc
        .execute(ConfirmBooking {
            renter_id: user.id,
            car_id,
            date_from,
            date_to,
            quoted_price: quoted,
        })
        .await;
    Ok(match confirmed {
        Ok(booking) => Next::Finish(Reply::text(format!(
            "Booking confirmed! Total: {}.\n\
             Use /pay to pay and /contract to sign the agreement.",
            booking.total_price,
        ))),
        Err(e) => match e.as_ref() {
            confirm_booking::ExecutionError::CarUnavailable(_) => {
                Next::Finish(Reply::text(
                    "Sorry, the car was booked by someone else meanwhile.",
                ))
            }
            confirm_booking::ExecutionError::PriceChanged {
                actual, ..
            } => Next::Finish(Reply::text(format!(
                "The price changed to {actual} while you were deciding. \
                 Please start over with /book.",
            ))),
            confirm_booking::ExecutionError::UserNotExists(_)
            | confirm_booking::ExecutionError::UserNotRegistered(_) => {
                Next::Finish(Reply::text(
                    "You are not registered anymore. Use /start to register.",
                ))
            }
            confirm_booking::ExecutionError::CarNotExists(_) => {
                Next::Finish(Reply::text(
                    "Sorry, this car is no longer offered.",
                ))
            }
            confirm_booking::ExecutionError::InvalidPeriod(_) => {
                Next::Finish(Reply::text(
                    "The rental period is invalid. Please start over \
                     with /book.",
                ))
            }
            confirm_booking::ExecutionError::Db(_) => {
                return Err(e).map_err(tracerr::map_from_and_wrap!(=> Error));
            }
        },
    })
}
