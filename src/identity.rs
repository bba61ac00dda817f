//! Identity resolution and the employee / organization directory
//!
//! The directory is owned by user management; the mutation paths only read
//! it through [`IdentityResolver`]. The `register_*` helpers on [`Store`]
//! exist so an embedding process (and the tests) can seed it.
use chrono::Utc;
use tracing::info;

use crate::error::{Entity, Error, Result, ValidationError};
use crate::store::{RecordView, Store, Table};
use crate::types::{OrganizationId, OrganizationType, TimeStamp, UserId};
use crate::utils::{ORGANIZATION_HRP, USER_HRP, new_id};
use crate::validation;

/// Keyed by username in the `employees` tree.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Employee {
    #[n(0)]
    pub id: UserId,
    #[n(1)]
    pub username: String,
    #[n(2)]
    pub created_at: TimeStamp<Utc>,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Organization {
    #[n(0)]
    pub id: OrganizationId,
    #[n(1)]
    pub name: String,
    #[n(2)]
    pub kind: OrganizationType,
    #[n(3)]
    pub created_at: TimeStamp<Utc>,
}

/// Keyed by user id: a user answers for at most one organization.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Responsibility {
    #[n(0)]
    pub user_id: UserId,
    #[n(1)]
    pub organization_id: OrganizationId,
}

pub trait IdentityResolver {
    /// Internal id of `username`, or `NotFound`.
    fn resolve_user(&self, username: &str) -> Result<UserId>;

    /// Organization `username` may act for. An unknown user is `NotFound`,
    /// a known user without responsibility is `NotAuthorized`.
    fn resolve_responsible_organization(&self, username: &str) -> Result<OrganizationId>;

    fn organization_exists(&self, organization_id: &str) -> Result<bool>;
}

impl<V: RecordView + ?Sized> IdentityResolver for V {
    fn resolve_user(&self, username: &str) -> Result<UserId> {
        self.read::<Employee>(Table::Employees, username.as_bytes())?
            .map(|employee| employee.id)
            .ok_or_else(|| Error::not_found(Entity::User, username))
    }

    fn resolve_responsible_organization(&self, username: &str) -> Result<OrganizationId> {
        let user_id = self.resolve_user(username)?;
        self.read::<Responsibility>(Table::Responsible, user_id.as_bytes())?
            .map(|r| r.organization_id)
            .ok_or_else(|| {
                Error::NotAuthorized(format!(
                    "{username} is not responsible for any organization"
                ))
            })
    }

    fn organization_exists(&self, organization_id: &str) -> Result<bool> {
        Ok(self
            .fetch(Table::Organizations, organization_id.as_bytes())?
            .is_some())
    }
}

impl Store {
    pub fn register_employee(&self, username: &str) -> Result<Employee> {
        validation::required("username", username)?;

        let employee = self.atomically("register_employee", |tx| {
            if tx.fetch(Table::Employees, username.as_bytes())?.is_some() {
                return Err(Error::invalid(
                    "username",
                    ValidationError::AlreadyExists(username.to_string()),
                ));
            }
            let employee = Employee {
                id: new_id(USER_HRP)?,
                username: username.to_string(),
                created_at: TimeStamp::new(),
            };
            tx.write(Table::Employees, username.as_bytes(), &employee)?;
            Ok(employee)
        })?;

        info!(username, user_id = %employee.id, "registered employee");
        Ok(employee)
    }

    pub fn register_organization(&self, name: &str, kind: OrganizationType) -> Result<Organization> {
        validation::required("name", name)?;

        let organization = self.atomically("register_organization", |tx| {
            let organization = Organization {
                id: new_id(ORGANIZATION_HRP)?,
                name: name.to_string(),
                kind,
                created_at: TimeStamp::new(),
            };
            tx.write(
                Table::Organizations,
                organization.id.as_bytes(),
                &organization,
            )?;
            Ok(organization)
        })?;

        info!(organization_id = %organization.id, name, "registered organization");
        Ok(organization)
    }

    /// Make `username` the responsible party for `organization_id`,
    /// replacing any earlier assignment.
    pub fn assign_responsible(&self, username: &str, organization_id: &str) -> Result<()> {
        self.atomically("assign_responsible", |tx| {
            let user_id = tx.resolve_user(username)?;
            if !tx.organization_exists(organization_id)? {
                return Err(Error::not_found(Entity::Organization, organization_id));
            }
            tx.write(
                Table::Responsible,
                user_id.as_bytes(),
                &Responsibility {
                    user_id: user_id.clone(),
                    organization_id: organization_id.to_string(),
                },
            )
        })?;

        info!(username, organization_id, "assigned organization responsibility");
        Ok(())
    }

    pub fn employee(&self, username: &str) -> Result<Employee> {
        self.read::<Employee>(Table::Employees, username.as_bytes())?
            .ok_or_else(|| Error::not_found(Entity::User, username))
    }

    pub fn organization(&self, organization_id: &str) -> Result<Organization> {
        self.read::<Organization>(Table::Organizations, organization_id.as_bytes())?
            .ok_or_else(|| Error::not_found(Entity::Organization, organization_id))
    }
}
