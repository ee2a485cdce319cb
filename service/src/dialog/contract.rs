//! Contract dialog flows: generation/signing and annulment.

use tracerr::Traced;

use crate::{
    command::{
        annul_contract, generate_contract, sign_contract, AnnulContract,
        GenerateContract, SignContract,
    },
    domain::{booking, contract, user, Booking, Contract, User},
    infra::database,
    query, read, Command, Query, Service,
};

use super::{
    booking_option, choose, registered_user, Error, Flow as Dialog, Next,
    Reply,
};

/// Step of the contract dialogs, with its collected data.
#[derive(Clone, Debug)]
pub enum Flow {
    /// Waiting for the renter to pick a booking to contract.
    SelectBooking {
        /// ID of the renter.
        renter_id: user::Id,

        /// Bookings offered for selection.
        options: Vec<booking::Id>,
    },

    /// Waiting for the yes/no decision on signing the generated contract.
    ConfirmSign {
        /// ID of the renter.
        renter_id: user::Id,

        /// ID of the generated contract.
        contract_id: contract::Id,
    },

    /// Waiting for the renter to pick a signed contract to annul.
    SelectAnnul {
        /// ID of the renter.
        renter_id: user::Id,

        /// Contracts offered for annulment.
        options: Vec<contract::Id>,
    },
}

/// Starts the contract dialog by listing the renter's contractable
/// bookings.
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
            "You have no bookings to contract.",
        )));
    }

    let mut text = String::from("Pick a booking to create a contract for:\n");
    for (i, booking) in bookings.iter().enumerate() {
        text.push_str(&booking_option(i, booking));
        text.push('\n');
    }
    Ok(Next::Continue(
        Dialog::Contract(Flow::SelectBooking {
            renter_id: user.id,
            options: bookings.iter().map(|b| b.id).collect(),
        }),
        Reply::text(text),
    ))
}

/// Starts the annulment dialog by listing the renter's signed contracts.
pub(super) async fn start_annulment<Db>(
    svc: &Service<Db>,
    chat_id: user::ChatId,
) -> Result<Next, Traced<Error>>
where
    Service<Db>: Query<
            query::user::ByChatId,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Query<
            query::contract::SignedOfRenter,
            Ok = Vec<(Contract, Booking)>,
            Err = Traced<database::Error>,
        >,
{
    let user = match registered_user(svc, chat_id).await? {
        Ok(user) => user,
        Err(next) => return Ok(next),
    };

    let contracts = svc
        .execute(query::contract::SignedOfRenter::by(
            read::contract::SignedOfRenter(user.id),
        ))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> Error))?;
    if contracts.is_empty() {
        return Ok(Next::Finish(Reply::text(
            "You have no signed contracts to annul.",
        )));
    }

    let mut text = String::from("Pick a contract to annul:\n");
    for (i, (_, booking)) in contracts.iter().enumerate() {
        text.push_str(&booking_option(i, booking));
        text.push('\n');
    }
    Ok(Next::Continue(
        Dialog::Contract(Flow::SelectAnnul {
            renter_id: user.id,
            options: contracts.iter().map(|(c, _)| c.id).collect(),
        }),
        Reply::text(text),
    ))
}

/// Advances the contract dialogs by one step.
pub(super) async fn advance<Db>(
    svc: &Service<Db>,
    flow: Flow,
    text: &str,
) -> Result<Next, Traced<Error>>
where
    Service<Db>: Command<
            GenerateContract,
            Ok = Contract,
            Err = Traced<generate_contract::ExecutionError>,
        > + Command<
            SignContract,
            Ok = Contract,
            Err = Traced<sign_contract::ExecutionError>,
        > + Command<
            AnnulContract,
            Ok = (),
            Err = Traced<annul_contract::ExecutionError>,
        >,
{
    match flow {
        Flow::SelectBooking { renter_id, options } => {
            select_booking(svc, renter_id, options, text).await
        }
        Flow::ConfirmSign {
            renter_id,
            contract_id,
        } => confirm_sign(svc, renter_id, contract_id, text).await,
        Flow::SelectAnnul { renter_id, options } => {
            select_annul(svc, renter_id, options, text).await
        }
    }
}

/// Booking selection: generates (or regenerates) the contract.
async fn select_booking<Db>(
    svc: &Service<Db>,
    renter_id: user::Id,
    options: Vec<booking::Id>,
    text: &str,
) -> Result<Next, Traced<Error>>
where
    Service<Db>: Command<
        GenerateContract,
        Ok = Contract,
        Err = Traced<generate_contract::ExecutionError>,
    >,
{
    let Some(&booking_id) = choose(&options, text) else {
        return Ok(Next::Continue(
            Dialog::Contract(Flow::SelectBooking { renter_id, options }),
            Reply::text("Please pick a booking from the list by its number."),
        ));
    };

    let generated = svc
        .execute(GenerateContract {
            booking_id,
            renter_id,
        })
        .await;
    Ok(match generated {
        Ok(contract) => Next::Continue(
            Dialog::Contract(Flow::ConfirmSign {
                renter_id,
                contract_id: contract.id,
            }),
            Reply::text("The contract is ready. Sign it? (yes/no)"),
        ),
        Err(e) => match e.as_ref() {
            generate_contract::ExecutionError::BookingNotExists(_)
            | generate_contract::ExecutionError::NotBookingRenter(_)
            | generate_contract::ExecutionError::CarNotExists(_)
            | generate_contract::ExecutionError::UserNotExists(_) => {
                Next::Finish(Reply::text("This booking is gone."))
            }
            generate_contract::ExecutionError::NotContractable(status) => {
                Next::Finish(Reply::text(format!(
                    "This booking cannot be contracted (status: {status}).",
                )))
            }
            generate_contract::ExecutionError::Db(_)
            | generate_contract::ExecutionError::Documents(_) => {
                return Err(e).map_err(tracerr::map_from_and_wrap!(=> Error));
            }
        },
    })
}

/// Signature confirmation.
async fn confirm_sign<Db>(
    svc: &Service<Db>,
    renter_id: user::Id,
    contract_id: contract::Id,
    text: &str,
) -> Result<Next, Traced<Error>>
where
    Service<Db>: Command<
        SignContract,
        Ok = Contract,
        Err = Traced<sign_contract::ExecutionError>,
    >,
{
    match text.trim().to_lowercase().as_str() {
        "no" => {
            return Ok(Next::Finish(Reply::text(
                "The contract is left unsigned. Use /contract to return \
                 to it.",
            )));
        }
        "yes" => {}
        _ => {
            return Ok(Next::Continue(
                Dialog::Contract(Flow::ConfirmSign {
                    renter_id,
                    contract_id,
                }),
                Reply::text("Please answer yes or no."),
            ));
        }
    }

    let signed = svc
        .execute(SignContract {
            contract_id,
            renter_id,
            signature: None,
        })
        .await;
    Ok(match signed {
        Ok(_) => Next::Finish(Reply::text("The contract is signed!")),
        Err(e) => match e.as_ref() {
            sign_contract::ExecutionError::ContractNotExists(_)
            | sign_contract::ExecutionError::BookingNotExists(_)
            | sign_contract::ExecutionError::NotBookingRenter(_) => {
                Next::Finish(Reply::text("This contract is gone."))
            }
            sign_contract::ExecutionError::AlreadySigned(_) => {
                Next::Finish(Reply::text("This contract is already signed."))
            }
            sign_contract::ExecutionError::Db(_) => {
                return Err(e).map_err(tracerr::map_from_and_wrap!(=> Error));
            }
        },
    })
}

/// Annulment selection.
async fn select_annul<Db>(
    svc: &Service<Db>,
    renter_id: user::Id,
    options: Vec<contract::Id>,
    text: &str,
) -> Result<Next, Traced<Error>>
where
    Service<Db>: Command<
        AnnulContract,
        Ok = (),
        Err = Traced<annul_contract::ExecutionError>,
    >,
{
    let Some(&contract_id) = choose(&options, text) else {
        return Ok(Next::Continue(
            Dialog::Contract(Flow::SelectAnnul { renter_id, options }),
            Reply::text(
                "Please pick a contract from the list by its number.",
            ),
        ));
    };

    let annulled = svc
        .execute(AnnulContract {
            contract_id,
            renter_id,
        })
        .await;
    Ok(match annulled {
        Ok(()) => Next::Finish(Reply::text("The contract is annulled.")),
        Err(e) => match e.as_ref() {
            annul_contract::ExecutionError::ContractNotExists(_)
            | annul_contract::ExecutionError::BookingNotExists(_)
            | annul_contract::ExecutionError::NotBookingRenter(_) => {
                Next::Finish(Reply::text("This contract is gone."))
            }
            annul_contract::ExecutionError::NotSigned(_) => {
                Next::Finish(Reply::text(
                    "This contract is not signed, nothing to annul.",
                ))
            }
            annul_contract::ExecutionError::Db(_) => {
                return Err(e).map_err(tracerr::map_from_and_wrap!(=> Error));
            }
        },
    })
}
