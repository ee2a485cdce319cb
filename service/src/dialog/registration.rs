//! Registration dialog flow.
//!
//! Role -> name (or company details) -> phone, persisted by
//! [`RegisterUser`] at the end. When entered from the booking dialog, the
//! suspension marker rides along through every step and rejected inputs, and
//! a completed registration resumes the reservation at the date selection.

use tracerr::Traced;

use crate::{
    command::{register_user, RegisterUser},
    domain::{user, User},
    Command, Service,
};

use super::{booking, Error, Flow as Dialog, Next, Reply};

/// Step of the registration dialog, with its collected data.
#[derive(Clone, Debug)]
pub enum Flow {
    /// Waiting for the role choice.
    SelectRole {
        /// Suspended reservation to resume afterwards, if any.
        resume: Option<booking::Suspended>,
    },

    /// Waiting for the person's name.
    EnterName {
        /// Chosen [`user::Role`].
        role: user::Role,

        /// Suspended reservation to resume afterwards, if any.
        resume: Option<booking::Suspended>,
    },

    /// Waiting for the company name.
    EnterCompanyName {
        /// Suspended reservation to resume afterwards, if any.
        resume: Option<booking::Suspended>,
    },

    /// Waiting for the company tax ID.
    EnterTaxId {
        /// Collected company name.
        company_name: user::CompanyName,

        /// Suspended reservation to resume afterwards, if any.
        resume: Option<booking::Suspended>,
    },

    /// Waiting for the company contact person's name.
    EnterContactName {
        /// Collected company name.
        company_name: user::CompanyName,

        /// Collected company tax ID.
        tax_id: user::TaxId,

        /// Suspended reservation to resume afterwards, if any.
        resume: Option<booking::Suspended>,
    },

    /// Waiting for the phone number, the last step of every path.
    EnterPhone {
        /// Chosen [`user::Role`].
        role: user::Role,

        /// Collected name (the contact person's for companies).
        name: user::Name,

        /// Collected company details, for company owners.
        company: Option<(user::CompanyName, user::TaxId)>,

        /// Suspended reservation to resume afterwards, if any.
        resume: Option<booking::Suspended>,
    },
}

/// Starts the registration dialog.
#[expect(
    clippy::unused_async,
    reason = "`async` is required to match signature"
)]
pub(super) async fn start<Db>(
    _: &Service<Db>,
    _: user::ChatId,
) -> Result<Next, Traced<Error>> {
    Ok(Next::Continue(
        Dialog::Registration(Flow::SelectRole { resume: None }),
        Reply::text(
            "Welcome to the car rental service!\n\
             Who are you?\n\
             1. Car owner (person)\n\
             2. Car owner (company)\n\
             3. Renter",
        ),
    ))
}

/// Advances the registration dialog by one step.
pub(super) async fn advance<Db>(
    svc: &Service<Db>,
    chat_id: user::ChatId,
    flow: Flow,
    text: &str,
) -> Result<Next, Traced<Error>>
where
    Service<Db>: Command<
        RegisterUser,
        Ok = User,
        Err = Traced<register_user::ExecutionError>,
    >,
{
    match flow {
        Flow::SelectRole { resume } => Ok(select_role(resume, text)),
        Flow::EnterName { role, resume } => Ok(enter_name(role, resume, text)),
        Flow::EnterCompanyName { resume } => {
            Ok(enter_company_name(resume, text))
        }
        Flow::EnterTaxId {
            company_name,
            resume,
        } => Ok(enter_tax_id(company_name, resume, text)),
        Flow::EnterContactName {
            company_name,
            tax_id,
            resume,
        } => Ok(enter_contact_name(company_name, tax_id, resume, text)),
        Flow::EnterPhone {
            role,
            name,
            company,
            resume,
        } => enter_phone(svc, chat_id, role, name, company, resume, text).await,
    }
}

/// Role selection: a closed numbered choice.
fn select_role(resume: Option<booking::Suspended>, text: &str) -> Next {
    let role = match text.trim() {
        "1" => user::Role::OwnerPerson,
        "2" => user::Role::OwnerCompany,
        "3" => user::Role::Renter,
        _ => {
            return Next::Continue(
                Dialog::Registration(Flow::SelectRole { resume }),
                Reply::text("Please answer 1, 2 or 3."),
            );
        }
    };

    if role == user::Role::OwnerCompany {
        Next::Continue(
            Dialog::Registration(Flow::EnterCompanyName { resume }),
            Reply::text("Enter the company name:"),
        )
    } else {
        Next::Continue(
            Dialog::Registration(Flow::EnterName { role, resume }),
            Reply::text("Enter your name:"),
        )
    }
}

/// Person name input.
fn enter_name(
    role: user::Role,
    resume: Option<booking::Suspended>,
    text: &str,
) -> Next {
    let Some(name) = user::Name::new(text.trim()) else {
        return Next::Continue(
            Dialog::Registration(Flow::EnterName { role, resume }),
            Reply::text("Please enter a non-empty name."),
        );
    };
    Next::Continue(
        Dialog::Registration(Flow::EnterPhone {
            role,
            name,
            company: None,
            resume,
        }),
        Reply::text("Enter your phone number:"),
    )
}

/// Company name input.
fn enter_company_name(
    resume: Option<booking::Suspended>,
    text: &str,
) -> Next {
    let Some(company_name) = user::CompanyName::new(text.trim()) else {
        return Next::Continue(
            Dialog::Registration(Flow::EnterCompanyName { resume }),
            Reply::text("Please enter a non-empty company name."),
        );
    };
    Next::Continue(
        Dialog::Registration(Flow::EnterTaxId {
            company_name,
            resume,
        }),
        Reply::text("Enter the company tax ID:"),
    )
}

/// Company tax ID input.
fn enter_tax_id(
    company_name: user::CompanyName,
    resume: Option<booking::Suspended>,
    text: &str,
) -> Next {
    let Some(tax_id) = user::TaxId::new(text.trim()) else {
        return Next::Continue(
            Dialog::Registration(Flow::EnterTaxId {
                company_name,
                resume,
            }),
            Reply::text("Please enter a valid alphanumeric tax ID."),
        );
    };
    Next::Continue(
        Dialog::Registration(Flow::EnterContactName {
            company_name,
            tax_id,
            resume,
        }),
        Reply::text("Enter the contact person's name:"),
    )
}

/// Company contact person input.
fn enter_contact_name(
    company_name: user::CompanyName,
    tax_id: user::TaxId,
    resume: Option<booking::Suspended>,
    text: &str,
) -> Next {
    let Some(name) = user::Name::new(text.trim()) else {
        return Next::Continue(
            Dialog::Registration(Flow::EnterContactName {
                company_name,
                tax_id,
                resume,
            }),
            Reply::text("Please enter a non-empty name."),
        );
    };
    Next::Continue(
        Dialog::Registration(Flow::EnterPhone {
            role: user::Role::OwnerCompany,
            name,
            company: Some((company_name, tax_id)),
            resume,
        }),
        Reply::text("Enter the contact phone number:"),
    )
}

/// Phone input and persistence; resumes a suspended reservation.
async fn enter_phone<Db>(
    svc: &Service<Db>,
    chat_id: user::ChatId,
    role: user::Role,
    name: user::Name,
    company: Option<(user::CompanyName, user::TaxId)>,
    resume: Option<booking::Suspended>,
    text: &str,
) -> Result<Next, Traced<Error>>
where
    Service<Db>: Command<
        RegisterUser,
        Ok = User,
        Err = Traced<register_user::ExecutionError>,
    >,
{
    let Some(phone) = user::Phone::new(text.trim()) else {
        return Ok(Next::Continue(
            Dialog::Registration(Flow::EnterPhone {
                role,
                name,
                company,
                resume,
            }),
            Reply::text("Please enter a valid phone number."),
        ));
    };

    drop(
        svc.execute(RegisterUser {
            chat_id,
            role,
            name,
            phone,
            company: company.map(|(name, tax_id)| {
                register_user::Company { name, tax_id }
            }),
        })
        .await
        .map_err(tracerr::map_from_and_wrap!(=> Error))?,
    );

    Ok(match resume {
        Some(suspended) => Next::Continue(
            Dialog::Booking(booking::Flow::SelectDateFrom {
                car_id: suspended.car_id,
            }),
            Reply::text(
                "Registration complete! Continuing your booking.\n\
                 Enter the first rental day (DD.MM.YYYY):",
            ),
        ),
        None => Next::Finish(Reply::text(
            "Registration complete. Use /book to book a car.",
        )),
    })
}
