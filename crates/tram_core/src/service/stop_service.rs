//! Stop use-case service.
//!
//! # Responsibility
//! - Normalize stop names and derive slugs before persistence.
//! - Reject name duplicates and slug collisions with structured issues.
//!
//! # Invariants
//! - Slugs are never auto-disambiguated: a collision aborts the write.
//! - Renaming a stop to a name whose slug it already owns is allowed.
//! - The storage unique constraints stay the final arbiter; a race that
//!   slips past the pre-check surfaces as `RegistryError::Conflict`.

use crate::model::issue::{ValidationFailure, ValidationIssue};
use crate::model::stop::{normalize_stop_name, Stop, StopId};
use crate::repo::stop_repo::StopStore;
use crate::repo::EntityRef;
use crate::service::error::{RegistryError, RegistryResult};
use log::info;

/// Use-case service wrapper for stop operations.
pub struct StopService<S: StopStore> {
    store: S,
}

impl<S: StopStore> StopService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Creates one stop from a display name.
    ///
    /// # Errors
    /// - `Invalid` with `InvalidStopName`, `DuplicateStopName` and/or
    ///   `SlugCollision` issues.
    /// - `Conflict` when a concurrent writer claimed the name or slug first.
    pub fn create_stop(&self, name: &str) -> RegistryResult<Stop> {
        let (name, slug) = normalize_stop_name(name).map_err(ValidationFailure::single)?;
        ValidationFailure::check(self.collision_issues(&name, &slug, None)?)?;

        let stop = self.store.insert_stop(&name, &slug)?;
        info!(
            "event=stop_create module=stop_service status=ok stop_id={} slug={}",
            stop.id, stop.slug
        );
        Ok(stop)
    }

    /// Renames one stop and recomputes its slug.
    pub fn rename_stop(&self, id: StopId, new_name: &str) -> RegistryResult<Stop> {
        let current = self.get_stop(id)?;
        let (name, slug) = normalize_stop_name(new_name).map_err(ValidationFailure::single)?;
        ValidationFailure::check(self.collision_issues(&name, &slug, Some(current.id))?)?;

        let stop = self.store.update_stop(current.id, &name, &slug)?;
        info!(
            "event=stop_rename module=stop_service status=ok stop_id={} old_slug={} slug={}",
            stop.id, current.slug, stop.slug
        );
        Ok(stop)
    }

    /// Renames the stop currently addressed by `slug`.
    pub fn rename_stop_by_slug(&self, slug: &str, new_name: &str) -> RegistryResult<Stop> {
        let current = self.get_stop_by_slug(slug)?;
        self.rename_stop(current.id, new_name)
    }

    pub fn get_stop(&self, id: StopId) -> RegistryResult<Stop> {
        self.store
            .get_stop(id)?
            .ok_or(RegistryError::NotFound(EntityRef::Stop(id)))
    }

    pub fn get_stop_by_slug(&self, slug: &str) -> RegistryResult<Stop> {
        self.store
            .get_stop_by_slug(slug)?
            .ok_or_else(|| RegistryError::NotFound(EntityRef::StopSlug(slug.to_string())))
    }

    /// Lists all stops ordered by id.
    pub fn list_stops(&self) -> RegistryResult<Vec<Stop>> {
        self.store.list_stops().map_err(Into::into)
    }

    /// Deletes one stop, cascading its connections and route memberships.
    pub fn delete_stop(&self, id: StopId) -> RegistryResult<()> {
        self.store.delete_stop(id).map_err(Into::into)
    }

    pub fn delete_stop_by_slug(&self, slug: &str) -> RegistryResult<()> {
        let stop = self.get_stop_by_slug(slug)?;
        self.delete_stop(stop.id)
    }

    fn collision_issues(
        &self,
        name: &str,
        slug: &str,
        own_id: Option<StopId>,
    ) -> RegistryResult<Vec<ValidationIssue>> {
        let mut issues = Vec::new();

        let name_owner = self
            .store
            .get_stop_by_name(name)?
            .filter(|stop| Some(stop.id) != own_id);
        if name_owner.is_some() {
            issues.push(ValidationIssue::DuplicateStopName {
                name: name.to_string(),
            });
        }

        if let Some(slug_owner) = self.store.get_stop_by_slug(slug)? {
            let is_self = Some(slug_owner.id) == own_id;
            let already_reported = name_owner.as_ref().map(|stop| stop.id) == Some(slug_owner.id);
            if !is_self && !already_reported {
                issues.push(ValidationIssue::SlugCollision {
                    slug: slug.to_string(),
                    existing: slug_owner.id,
                });
            }
        }

        Ok(issues)
    }
}
