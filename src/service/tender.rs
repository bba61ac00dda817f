use tracing::info;

use super::{commit_tender, ensure_tender_open, insert_tender, load_tender, paginate};
use crate::authz::AuthorizationGate;
use crate::error::{Entity, Error, Result};
use crate::identity::IdentityResolver;
use crate::params::{
    CreateTenderParams, EditTenderParams, GetTenderStatusParams, GetTendersParams,
    GetUserTendersParams, RollbackTenderParams, UpdateTenderStatusParams,
};
use crate::status;
use crate::store::{Store, Table};
use crate::tender::{Tender, TenderVersion};
use crate::types::{TenderStatus, TimeStamp};
use crate::utils::{TENDER_HRP, new_id};
use crate::validation;
use crate::versions::VersionStore;

pub struct TenderService {
    store: Store,
}

impl TenderService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Publish a new tender on behalf of the organization its creator is
    /// responsible for.
    pub fn create_tender(&self, params: CreateTenderParams) -> Result<Tender> {
        validation::create_tender(&params)?;

        let tender = self.store.atomically("create_tender", |tx| {
            if !tx.organization_exists(&params.organization_id)? {
                return Err(Error::not_found(
                    Entity::Organization,
                    params.organization_id.as_str(),
                ));
            }

            // creator must hold authority over the organization named
            let organization_id = tx.resolve_responsible_organization(&params.creator_username)?;
            if organization_id != params.organization_id {
                return Err(Error::NotAuthorized(format!(
                    "{} is not responsible for organization {}",
                    params.creator_username, params.organization_id
                )));
            }

            let tender = Tender {
                id: new_id(TENDER_HRP)?,
                name: params.name.clone(),
                description: params.description.clone(),
                service_type: params.service_type,
                status: params.status,
                organization_id,
                created_at: TimeStamp::new(),
                version: 1,
            };
            insert_tender(tx, &tender)?;
            Ok(tender)
        })?;

        info!(tender_id = %tender.id, organization_id = %tender.organization_id, "created tender");
        Ok(tender)
    }

    /// Apply the supplied fields and append the next version.
    pub fn edit_tender(&self, params: EditTenderParams) -> Result<Tender> {
        validation::edit_tender(&params)?;

        let tender = self.store.atomically("edit_tender", |tx| {
            let mut tender = load_tender(tx, &params.tender_id)?;
            AuthorizationGate::new(tx).require_responsible(&tender, &params.username)?;
            ensure_tender_open(&tender)?;

            tender.apply(&params.patch);
            commit_tender(tx, &mut tender)?;
            Ok(tender)
        })?;

        info!(tender_id = %tender.id, version = tender.version, "edited tender");
        Ok(tender)
    }

    /// Restore the content of an earlier version as a brand new version.
    pub fn rollback_tender(&self, params: RollbackTenderParams) -> Result<Tender> {
        validation::rollback_tender(&params)?;

        let tender = self.store.atomically("rollback_tender", |tx| {
            let mut tender = load_tender(tx, &params.tender_id)?;
            AuthorizationGate::new(tx).require_responsible(&tender, &params.username)?;
            ensure_tender_open(&tender)?;

            let target: TenderVersion = tx.load_version(&tender.id, params.version)?;
            tender.restore(target.content());
            commit_tender(tx, &mut tender)?;
            Ok(tender)
        })?;

        info!(
            tender_id = %tender.id,
            restored = params.version,
            version = tender.version,
            "rolled back tender"
        );
        Ok(tender)
    }

    pub fn get_tender_status(&self, params: GetTenderStatusParams) -> Result<TenderStatus> {
        validation::required("tender_id", &params.tender_id)?;
        validation::required("username", &params.username)?;

        let tender = load_tender(&self.store, &params.tender_id)?;
        AuthorizationGate::new(&self.store).require_responsible(&tender, &params.username)?;
        Ok(tender.status)
    }

    pub fn update_tender_status(&self, params: UpdateTenderStatusParams) -> Result<Tender> {
        validation::update_tender_status(&params)?;

        let tender = self.store.atomically("update_tender_status", |tx| {
            let mut tender = load_tender(tx, &params.tender_id)?;
            AuthorizationGate::new(tx).require_responsible(&tender, &params.username)?;
            status::tender_transition(tender.status, params.status)?;

            tender.status = params.status;
            commit_tender(tx, &mut tender)?;
            Ok(tender)
        })?;

        info!(
            tender_id = %tender.id,
            status = %tender.status,
            version = tender.version,
            "updated tender status"
        );
        Ok(tender)
    }

    /// Every tender, optionally narrowed to some service types.
    pub fn get_tenders(&self, params: GetTendersParams) -> Result<Vec<Tender>> {
        let window = validation::page(&params.page, self.store.config())?;

        let mut tenders: Vec<Tender> = self.store.all(Table::Tenders)?;
        if !params.service_types.is_empty() {
            tenders.retain(|t| params.service_types.contains(&t.service_type));
        }
        sort_tenders(&mut tenders);
        Ok(paginate(tenders, window))
    }

    /// Tenders of the organization `username` is responsible for.
    pub fn get_user_tenders(&self, params: GetUserTendersParams) -> Result<Vec<Tender>> {
        validation::required("username", &params.username)?;
        let window = validation::page(&params.page, self.store.config())?;

        let organization_id = self
            .store
            .resolve_responsible_organization(&params.username)?;

        let mut tenders: Vec<Tender> = self.store.all(Table::Tenders)?;
        tenders.retain(|t| t.organization_id == organization_id);
        sort_tenders(&mut tenders);
        Ok(paginate(tenders, window))
    }

    pub fn get_tender_by_id(&self, tender_id: &str) -> Result<Tender> {
        validation::required("tender_id", tender_id)?;
        load_tender(&self.store, tender_id)
    }

    /// Full version log of a tender, oldest first. Visible to whoever may
    /// edit it.
    pub fn tender_history(&self, tender_id: &str, username: &str) -> Result<Vec<TenderVersion>> {
        validation::required("tender_id", tender_id)?;
        validation::required("username", username)?;

        let tender = load_tender(&self.store, tender_id)?;
        AuthorizationGate::new(&self.store).require_responsible(&tender, username)?;
        self.store.history(&tender.id)
    }
}

fn sort_tenders(tenders: &mut [Tender]) {
    tenders.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
}
