//! [`Command`] for completing a [`User`] registration.

use common::operations::{By, Insert, Select, Update};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{user, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for completing a [`User`] registration.
///
/// Creates the [`User`] on first registration and overwrites the collected
/// fields on repeated ones, marking the [`User`] as registered either way.
#[derive(Clone, Debug)]
pub struct RegisterUser {
    /// [`user::ChatId`] the registration was submitted from.
    pub chat_id: user::ChatId,

    /// Selected [`user::Role`].
    pub role: user::Role,

    /// Submitted [`user::Name`].
    ///
    /// For company owners, the contact person's name.
    pub name: user::Name,

    /// Submitted [`user::Phone`].
    pub phone: user::Phone,

    /// [`Company`] details, required for company owners.
    pub company: Option<Company>,
}

/// Company details of a [`RegisterUser`] [`Command`].
#[derive(Clone, Debug)]
pub struct Company {
    /// Name of the company.
    pub name: user::CompanyName,

    /// Tax ID of the company.
    pub tax_id: user::TaxId,
}

impl<Db> Command<RegisterUser> for Service<Db>
where
    Db: Database<
            Select<By<Option<User>, user::ChatId>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Insert<User>, Err = Traced<database::Error>>
        + Database<Update<User>, Err = Traced<database::Error>>,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: RegisterUser) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let RegisterUser {
            chat_id,
            role,
            name,
            phone,
            company,
        } = cmd;

        let company = match (role, company) {
            (user::Role::OwnerCompany, Some(company)) => Some(company),
            (user::Role::OwnerCompany, None) => {
                return Err(tracerr::new!(E::MissingCompanyDetails));
            }
            (user::Role::OwnerPerson | user::Role::Renter, Some(_)) => {
                return Err(tracerr::new!(E::UnexpectedCompanyDetails(role)));
            }
            (user::Role::OwnerPerson | user::Role::Renter, None) => None,
        };
        let (company_name, tax_id) =
            company.map_or((None, None), |c| (Some(c.name), Some(c.tax_id)));

        let existing = self
            .database()
            .execute(Select(By::<Option<User>, _>::new(chat_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let user = if let Some(mut user) = existing {
            user.role = role;
            user.name = name;
            user.phone = Some(phone);
            user.company_name = company_name;
            user.tax_id = tax_id;
            user.registered = true;
            self.database()
                .execute(Update(user.clone()))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
            user
        } else {
            let user = User {
                id: user::Id::new(),
                chat_id,
                role,
                name,
                phone: Some(phone),
                company_name,
                tax_id,
                registered: true,
            };
            self.database()
                .execute(Insert(user.clone()))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
            user
        };

        Ok(user)
    }
}

/// Error of [`RegisterUser`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// Company owner registration without company details.
    #[display("company owners must provide company details")]
    MissingCompanyDetails,

    /// Company details submitted for a non-company role.
    #[display("`Role::{_0}` registration cannot carry company details")]
    UnexpectedCompanyDetails(#[error(not(source))] user::Role),
}

#[cfg(test)]
mod spec {
    use crate::{
        command::fixtures,
        domain::user,
        Command as _,
    };

    use super::{Company, ExecutionError, RegisterUser};

    #[tokio::test]
    async fn registers_new_renter() {
        let svc = fixtures::service();

        let user = fixtures::renter(&svc, 100).await;

        assert_eq!(user.chat_id, 100.into());
        assert_eq!(user.role, user::Role::Renter);
        assert!(user.registered);
    }

    #[tokio::test]
    async fn re_registration_updates_in_place() {
        let svc = fixtures::service();

        let first = fixtures::renter(&svc, 100).await;
        let second = svc
            .execute(RegisterUser {
                chat_id: 100.into(),
                role: user::Role::OwnerPerson,
                name: user::Name::new("Mia Owner").unwrap(),
                phone: user::Phone::new("+381641234567").unwrap(),
                company: None,
            })
            .await
            .unwrap();

        assert_eq!(first.id, second.id, "same user row is reused");
        assert_eq!(second.role, user::Role::OwnerPerson);
    }

    #[tokio::test]
    async fn company_owner_requires_company_details() {
        let svc = fixtures::service();

        let err = svc
            .execute(RegisterUser {
                chat_id: 100.into(),
                role: user::Role::OwnerCompany,
                name: user::Name::new("Ana Contact").unwrap(),
                phone: user::Phone::new("+381641234567").unwrap(),
                company: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::MissingCompanyDetails,
        ));

        let user = svc
            .execute(RegisterUser {
                chat_id: 100.into(),
                role: user::Role::OwnerCompany,
                name: user::Name::new("Ana Contact").unwrap(),
                phone: user::Phone::new("+381641234567").unwrap(),
                company: Some(Company {
                    name: user::CompanyName::new("Rent a Car DOO").unwrap(),
                    tax_id: user::TaxId::new("RS106006175").unwrap(),
                }),
            })
            .await
            .unwrap();
        assert!(user.registered);
    }
}
