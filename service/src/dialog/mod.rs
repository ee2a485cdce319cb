//! Conversational dialogs.
//!
//! The chat transport delivers raw updates; [`Advance`] resolves them into
//! the closed [`Update`] shape once at this boundary, dispatches to the
//! active [`Flow`] of the chat's session and returns the [`Reply`] to
//! deliver back. One chat's dialog is strictly sequential; independent
//! chats advance concurrently.

pub mod booking;
pub mod contract;
pub mod payment;
pub mod registration;
pub mod review;
pub mod session;

use derive_more::{Display, Error as StdError, From};
use tracerr::Traced;

use crate::{
    command::{
        annul_contract, confirm_booking, create_payment, create_review,
        generate_contract, register_user, sign_contract, AnnulContract,
        ConfirmBooking, CreatePayment, CreateReview, GenerateContract,
        RegisterUser, SignContract,
    },
    domain::{car, user, Booking, Car, Contract, User},
    infra::database,
    query, Command, Query, Service,
};

pub use self::session::{Session, SessionStore};

/// Inbound dialog update, resolved from the transport's raw text.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Update {
    /// Slash command starting or aborting a [`Flow`].
    Command(Instruction),

    /// Plain text input for the active [`Flow`] step.
    Text(String),
}

impl Update {
    /// Resolves the raw transport text into an [`Update`].
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        match input {
            "/start" => Self::Command(Instruction::Start),
            "/book" => Self::Command(Instruction::Book),
            "/pay" => Self::Command(Instruction::Pay),
            "/contract" => Self::Command(Instruction::Contract),
            "/annul" => Self::Command(Instruction::Annul),
            "/review" => Self::Command(Instruction::Review),
            "/cancel" => Self::Command(Instruction::Cancel),
            _ => Self::Text(input.to_owned()),
        }
    }
}

/// Slash command a dialog [`Update`] may carry.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Instruction {
    /// Starts the registration flow.
    Start,

    /// Starts the booking flow.
    Book,

    /// Starts the payment flow.
    Pay,

    /// Starts the contract generation/signing flow.
    Contract,

    /// Starts the contract annulment flow.
    Annul,

    /// Starts the review flow.
    Review,

    /// Aborts the active flow, discarding its session.
    Cancel,
}

/// Outbound reply of one dialog advancement.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Reply(pub Vec<Outgoing>);

impl Reply {
    /// Creates a [`Reply`] of a single text message.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self(vec![Outgoing::Text(text.into())])
    }
}

/// Single outbound message of a [`Reply`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Outgoing {
    /// Plain text message.
    Text(String),

    /// Payload to render as a scannable QR image, with a caption.
    Qr {
        /// Text payload to encode into the image.
        payload: String,

        /// Caption to deliver alongside.
        caption: String,
    },
}

/// Active dialog flow of a [`Session`].
#[derive(Clone, Debug)]
pub enum Flow {
    /// Registration dialog.
    Registration(registration::Flow),

    /// Booking dialog.
    Booking(booking::Flow),

    /// Payment dialog.
    Payment(payment::Flow),

    /// Contract dialog.
    Contract(contract::Flow),

    /// Review dialog.
    Review(review::Flow),
}

/// Result of advancing a [`Flow`] by one step.
pub(crate) enum Next {
    /// The dialog continues with the given [`Flow`] state.
    Continue(Flow, Reply),

    /// The dialog is over; the session is discarded.
    Finish(Reply),
}

/// [`Command`] applying one inbound [`Update`] to a chat's dialog.
#[derive(Clone, Debug)]
pub struct Advance {
    /// Chat the update arrived from.
    pub chat_id: user::ChatId,

    /// The inbound [`Update`].
    pub update: Update,
}

impl<Db> Command<Advance> for Service<Db>
where
    Service<Db>: Query<
            query::user::ByChatId,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Query<
            query::car::ById,
            Ok = Option<Car>,
            Err = Traced<database::Error>,
        > + Query<
            query::car::AvailableCities,
            Ok = Vec<car::City>,
            Err = Traced<database::Error>,
        > + Query<
            query::car::AvailableIn,
            Ok = Vec<Car>,
            Err = Traced<database::Error>,
        > + Query<
            query::booking::OfRenter,
            Ok = Vec<Booking>,
            Err = Traced<database::Error>,
        > + Query<
            query::contract::SignedOfRenter,
            Ok = Vec<(Contract, Booking)>,
            Err = Traced<database::Error>,
        > + Command<
            RegisterUser,
            Ok = User,
            Err = Traced<register_user::ExecutionError>,
        > + Command<
            ConfirmBooking,
            Ok = Booking,
            Err = Traced<confirm_booking::ExecutionError>,
        > + Command<
            CreatePayment,
            Ok = (crate::domain::Payment, crate::gateway::Artifact),
            Err = Traced<create_payment::ExecutionError>,
        > + Command<
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
        > + Command<
            CreateReview,
            Ok = crate::domain::Review,
            Err = Traced<create_review::ExecutionError>,
        >,
{
    type Ok = Reply;
    type Err = Traced<Error>;

    async fn execute(&self, cmd: Advance) -> Result<Self::Ok, Self::Err> {
        let Advance { chat_id, update } = cmd;

        let next = match update {
            Update::Command(Instruction::Cancel) => {
                Next::Finish(Reply::text("Cancelled."))
            }
            Update::Command(Instruction::Start) => {
                registration::start(self, chat_id).await?
            }
            Update::Command(Instruction::Book) => booking::start(self).await?,
            Update::Command(Instruction::Pay) => {
                payment::start(self, chat_id).await?
            }
            Update::Command(Instruction::Contract) => {
                contract::start(self, chat_id).await?
            }
            Update::Command(Instruction::Annul) => {
                contract::start_annulment(self, chat_id).await?
            }
            Update::Command(Instruction::Review) => {
                review::start(self, chat_id).await?
            }
            Update::Text(text) => {
                let Some(flow) = self.sessions().get(chat_id).await else {
                    return Ok(Reply::text(
                        "Nothing in progress. Try /book, /pay, /contract, \
                         /review or /start to register.",
                    ));
                };
                match flow {
                    Flow::Registration(flow) => {
                        registration::advance(self, chat_id, flow, &text)
                            .await?
                    }
                    Flow::Booking(flow) => {
                        booking::advance(self, chat_id, flow, &text).await?
                    }
                    Flow::Payment(flow) => {
                        payment::advance(self, flow, &text).await?
                    }
                    Flow::Contract(flow) => {
                        contract::advance(self, flow, &text).await?
                    }
                    Flow::Review(flow) => {
                        review::advance(self, flow, &text).await?
                    }
                }
            }
        };

        Ok(match next {
            Next::Continue(flow, reply) => {
                self.sessions().put(chat_id, flow).await;
                reply
            }
            Next::Finish(reply) => {
                self.sessions().remove(chat_id).await;
                reply
            }
        })
    }
}

/// Error of a dialog advancement.
///
/// User mistakes are re-prompted within the dialog and never surface here;
/// these are genuine processing failures.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    /// [`Database`] error.
    ///
    /// [`Database`]: crate::infra::Database
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`RegisterUser`] execution failed.
    #[display("registration failed: {_0}")]
    Register(register_user::ExecutionError),

    /// [`ConfirmBooking`] execution failed.
    #[display("booking confirmation failed: {_0}")]
    Confirm(confirm_booking::ExecutionError),

    /// [`CreatePayment`] execution failed.
    #[display("payment creation failed: {_0}")]
    Payment(create_payment::ExecutionError),

    /// [`GenerateContract`] execution failed.
    #[display("contract generation failed: {_0}")]
    Contract(generate_contract::ExecutionError),

    /// [`SignContract`] execution failed.
    #[display("contract signing failed: {_0}")]
    Sign(sign_contract::ExecutionError),

    /// [`AnnulContract`] execution failed.
    #[display("contract annulment failed: {_0}")]
    Annul(annul_contract::ExecutionError),

    /// [`CreateReview`] execution failed.
    #[display("review creation failed: {_0}")]
    Review(create_review::ExecutionError),
}

/// Resolves a 1-based numeric choice against the offered options.
pub(crate) fn choose<'o, T>(options: &'o [T], text: &str) -> Option<&'o T> {
    text.trim()
        .strip_prefix('#')
        .unwrap_or(text.trim())
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| options.get(i))
}

/// Looks up the [`User`] of the provided chat, requiring a completed
/// registration.
pub(crate) async fn registered_user<Db>(
    svc: &Service<Db>,
    chat_id: user::ChatId,
) -> Result<Result<User, Next>, Traced<Error>>
where
    Service<Db>: Query<
        query::user::ByChatId,
        Ok = Option<User>,
        Err = Traced<database::Error>,
    >,
{
    let user = svc
        .execute(query::user::ByChatId::by(chat_id))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> Error))?;
    Ok(match user {
        Some(user) if user.registered => Ok(user),
        Some(_) | None => Err(Next::Finish(Reply::text(
            "You are not registered yet. Use /start to register.",
        ))),
    })
}

/// Formats a [`Booking`] option line for numbered selection.
pub(crate) fn booking_option(index: usize, booking: &Booking) -> String {
    format!(
        "{}. {} - {}, {}",
        index + 1,
        booking.date_from,
        booking.date_to,
        booking.total_price,
    )
}

#[cfg(test)]
mod spec {
    use crate::{
        command::fixtures,
        domain::user,
        infra::InMemory,
        Command as _, Service,
    };

    use super::{Advance, Outgoing, Reply, Update};

    const RENTER_CHAT: i64 = 42;

    /// Sends one raw transport input and returns the reply.
    async fn say(svc: &Service<InMemory>, chat: i64, input: &str) -> Reply {
        svc.execute(Advance {
            chat_id: user::ChatId::from(chat),
            update: Update::parse(input),
        })
        .await
        .unwrap()
    }

    /// Returns the text of a single-text [`Reply`].
    fn text(reply: &Reply) -> &str {
        match reply.0.as_slice() {
            [Outgoing::Text(text)] => text,
            other => panic!("expected a single text reply, got {other:?}"),
        }
    }

    /// Seeds an owner with one available car.
    async fn seeded() -> Service<InMemory> {
        let svc = fixtures::service();
        let owner = fixtures::owner(&svc, 1).await;
        drop(fixtures::car(&svc, owner.id).await);
        svc
    }

    #[tokio::test]
    async fn full_booking_walkthrough() {
        let svc = seeded().await;
        drop(fixtures::renter(&svc, RENTER_CHAT).await);

        let reply = say(&svc, RENTER_CHAT, "/book").await;
        assert!(text(&reply).contains("Belgrade"));

        let reply = say(&svc, RENTER_CHAT, "Belgrade").await;
        assert!(text(&reply).contains("1. Skoda Octavia"));

        let reply = say(&svc, RENTER_CHAT, "1").await;
        assert!(text(&reply).contains("first rental day"));

        let reply = say(&svc, RENTER_CHAT, "01.03.2030").await;
        assert!(text(&reply).contains("last rental day"));

        let reply = say(&svc, RENTER_CHAT, "03.03.2030").await;
        assert!(text(&reply).contains("Total: 135EUR"));

        let reply = say(&svc, RENTER_CHAT, "yes").await;
        assert!(text(&reply).contains("Booking confirmed"));

        // The dialog is over; further text is not part of any flow.
        let reply = say(&svc, RENTER_CHAT, "hello?").await;
        assert!(text(&reply).contains("Nothing in progress"));
    }

    #[tokio::test]
    async fn date_validation_reprompts_without_advancing() {
        let svc = seeded().await;
        drop(fixtures::renter(&svc, RENTER_CHAT).await);

        drop(say(&svc, RENTER_CHAT, "/book").await);
        drop(say(&svc, RENTER_CHAT, "Belgrade").await);
        drop(say(&svc, RENTER_CHAT, "1").await);

        // Unparsable, then in the past: both re-prompt the same step.
        let reply = say(&svc, RENTER_CHAT, "March 1st").await;
        assert!(text(&reply).contains("valid date"));
        let reply = say(&svc, RENTER_CHAT, "01.03.2020").await;
        assert!(text(&reply).contains("cannot be in the past"));

        let reply = say(&svc, RENTER_CHAT, "01.03.2030").await;
        assert!(text(&reply).contains("last rental day"));

        // End before start re-prompts too.
        let reply = say(&svc, RENTER_CHAT, "28.02.2030").await;
        assert!(text(&reply).contains("cannot precede"));
    }

    #[tokio::test]
    async fn registration_suspension_preserves_the_reservation() {
        let svc = seeded().await;

        drop(say(&svc, RENTER_CHAT, "/book").await);
        drop(say(&svc, RENTER_CHAT, "Belgrade").await);

        // Picking a car while unregistered suspends into registration.
        let reply = say(&svc, RENTER_CHAT, "1").await;
        assert!(text(&reply).contains("register first"));

        // Rejected registration inputs do not lose the reservation.
        let reply = say(&svc, RENTER_CHAT, "9").await;
        assert!(text(&reply).contains("1, 2 or 3"));

        drop(say(&svc, RENTER_CHAT, "3").await);
        drop(say(&svc, RENTER_CHAT, "Mia Renter").await);

        // Invalid phone re-prompts, still keeping the marker.
        let reply = say(&svc, RENTER_CHAT, "call me").await;
        assert!(text(&reply).contains("valid phone"));

        // Completing registration resumes at the date selection.
        let reply = say(&svc, RENTER_CHAT, "+381641234567").await;
        assert!(text(&reply).contains("Continuing your booking"));

        drop(say(&svc, RENTER_CHAT, "01.03.2030").await);
        let reply = say(&svc, RENTER_CHAT, "03.03.2030").await;
        assert!(text(&reply).contains("Total: 135EUR"));
        let reply = say(&svc, RENTER_CHAT, "yes").await;
        assert!(text(&reply).contains("Booking confirmed"));
    }

    #[tokio::test]
    async fn cancel_discards_the_session_at_any_step() {
        let svc = seeded().await;
        drop(fixtures::renter(&svc, RENTER_CHAT).await);

        drop(say(&svc, RENTER_CHAT, "/book").await);
        drop(say(&svc, RENTER_CHAT, "Belgrade").await);

        let reply = say(&svc, RENTER_CHAT, "/cancel").await;
        assert!(text(&reply).contains("Cancelled"));

        let reply = say(&svc, RENTER_CHAT, "1").await;
        assert!(text(&reply).contains("Nothing in progress"));
    }

    #[tokio::test]
    async fn declining_the_summary_persists_nothing() {
        let svc = seeded().await;
        drop(fixtures::renter(&svc, RENTER_CHAT).await);

        drop(say(&svc, RENTER_CHAT, "/book").await);
        drop(say(&svc, RENTER_CHAT, "Belgrade").await);
        drop(say(&svc, RENTER_CHAT, "1").await);
        drop(say(&svc, RENTER_CHAT, "01.03.2030").await);
        drop(say(&svc, RENTER_CHAT, "03.03.2030").await);

        let reply = say(&svc, RENTER_CHAT, "no").await;
        assert!(text(&reply).contains("Booking cancelled"));

        // The car is still bookable afterwards.
        drop(say(&svc, RENTER_CHAT, "/book").await);
        let reply = say(&svc, RENTER_CHAT, "Belgrade").await;
        assert!(text(&reply).contains("1. Skoda Octavia"));
    }

    #[tokio::test]
    async fn payment_flow_issues_artifacts() {
        let svc = seeded().await;
        drop(fixtures::renter(&svc, RENTER_CHAT).await);

        drop(say(&svc, RENTER_CHAT, "/book").await);
        drop(say(&svc, RENTER_CHAT, "Belgrade").await);
        drop(say(&svc, RENTER_CHAT, "1").await);
        drop(say(&svc, RENTER_CHAT, "01.03.2030").await);
        drop(say(&svc, RENTER_CHAT, "03.03.2030").await);
        drop(say(&svc, RENTER_CHAT, "yes").await);

        drop(say(&svc, RENTER_CHAT, "/pay").await);
        drop(say(&svc, RENTER_CHAT, "1").await);
        let reply = say(&svc, RENTER_CHAT, "1").await;
        assert!(text(&reply).contains("https://pay.linkpay.example/"));

        // A second attempt with the QR method supersedes the first.
        drop(say(&svc, RENTER_CHAT, "/pay").await);
        drop(say(&svc, RENTER_CHAT, "1").await);
        let reply = say(&svc, RENTER_CHAT, "3").await;
        assert!(matches!(
            reply.0.as_slice(),
            [Outgoing::Qr { payload, .. }] if payload.starts_with("ST01|"),
        ));
    }

    #[tokio::test]
    async fn contract_flow_generates_signs_and_annuls() {
        let svc = seeded().await;
        drop(fixtures::renter(&svc, RENTER_CHAT).await);

        drop(say(&svc, RENTER_CHAT, "/book").await);
        drop(say(&svc, RENTER_CHAT, "Belgrade").await);
        drop(say(&svc, RENTER_CHAT, "1").await);
        drop(say(&svc, RENTER_CHAT, "01.03.2030").await);
        drop(say(&svc, RENTER_CHAT, "03.03.2030").await);
        drop(say(&svc, RENTER_CHAT, "yes").await);

        drop(say(&svc, RENTER_CHAT, "/contract").await);
        let reply = say(&svc, RENTER_CHAT, "1").await;
        assert!(text(&reply).contains("Sign it?"));
        let reply = say(&svc, RENTER_CHAT, "yes").await;
        assert!(text(&reply).contains("signed"));

        drop(say(&svc, RENTER_CHAT, "/annul").await);
        let reply = say(&svc, RENTER_CHAT, "1").await;
        assert!(text(&reply).contains("annulled"));

        // Nothing left to annul.
        let reply = say(&svc, RENTER_CHAT, "/annul").await;
        assert!(text(&reply).contains("no signed contracts"));
    }

    #[tokio::test]
    async fn review_flow_collects_rating_and_comment() {
        let svc = seeded().await;
        drop(fixtures::renter(&svc, RENTER_CHAT).await);

        drop(say(&svc, RENTER_CHAT, "/book").await);
        drop(say(&svc, RENTER_CHAT, "Belgrade").await);
        drop(say(&svc, RENTER_CHAT, "1").await);
        drop(say(&svc, RENTER_CHAT, "01.03.2030").await);
        drop(say(&svc, RENTER_CHAT, "03.03.2030").await);
        drop(say(&svc, RENTER_CHAT, "yes").await);

        drop(say(&svc, RENTER_CHAT, "/review").await);
        drop(say(&svc, RENTER_CHAT, "1").await);

        let reply = say(&svc, RENTER_CHAT, "six").await;
        assert!(text(&reply).contains("1.0 to 5.0"));

        drop(say(&svc, RENTER_CHAT, "4.5").await);
        let reply = say(&svc, RENTER_CHAT, "skip").await;
        assert!(text(&reply).contains("Thanks"));
    }

    #[tokio::test]
    async fn unregistered_users_cannot_enter_renter_flows() {
        let svc = seeded().await;

        for command in ["/pay", "/contract", "/annul", "/review"] {
            let reply = say(&svc, RENTER_CHAT, command).await;
            assert!(
                text(&reply).contains("not registered"),
                "`{command}` must require registration",
            );
        }
    }
}
