//! In-memory profile collection with a single optional selection.
//!
//! The store is the only writer of profiles. BMR is recomputed on every
//! write, and the selection is held as an id so reads always see the
//! current record.

use crate::{AdviceRequest, Error, Language, Metrics, Profile, ProfileId, Result};

/// Maximum number of profiles held at once
pub const MAX_PROFILES: usize = 3;

/// Ordered, bounded set of profiles plus the active selection
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProfileStore {
    pub(crate) profiles: Vec<Profile>,
    pub(crate) selected: Option<ProfileId>,
}

impl ProfileStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new profile at the end of the collection
    ///
    /// Does not change the selection.
    pub fn create(&mut self, metrics: Metrics, name: &str) -> Result<Profile> {
        if self.is_full() {
            return Err(Error::CapacityExceeded { max: MAX_PROFILES });
        }
        let name = checked_name(name)?;
        metrics.validate()?;

        let profile = Profile {
            id: ProfileId::generate(),
            name,
            metrics,
            bmr: metrics.bmr(),
        };
        self.profiles.push(profile.clone());

        tracing::info!("Created profile {} ({})", profile.name, profile.id);
        Ok(profile)
    }

    /// Replace a profile's name and metrics in place
    pub fn update(&mut self, id: &ProfileId, metrics: Metrics, name: &str) -> Result<Profile> {
        let index = self.position(id)?;
        let name = checked_name(name)?;
        metrics.validate()?;

        let profile = &mut self.profiles[index];
        profile.name = name;
        profile.metrics = metrics;
        profile.bmr = metrics.bmr();

        tracing::info!("Updated profile {} (bmr {:.2})", profile.id, profile.bmr);
        Ok(profile.clone())
    }

    /// Delete a profile, clearing the selection if it pointed there
    pub fn remove(&mut self, id: &ProfileId) -> Result<()> {
        let index = self.position(id)?;
        let removed = self.profiles.remove(index);

        if self.selected.as_ref() == Some(&removed.id) {
            tracing::debug!("Removed profile was selected, clearing selection");
            self.selected = None;
        }

        tracing::info!("Removed profile {} ({})", removed.name, removed.id);
        Ok(())
    }

    /// Select a profile by id, or clear the selection with `None`
    pub fn select(&mut self, id: Option<&ProfileId>) -> Result<()> {
        match id {
            Some(id) => {
                self.position(id)?;
                self.selected = Some(id.clone());
                tracing::debug!("Selected profile {}", id);
            }
            None => {
                self.selected = None;
                tracing::debug!("Cleared profile selection");
            }
        }
        Ok(())
    }

    /// Profiles in insertion order
    pub fn list(&self) -> &[Profile] {
        &self.profiles
    }

    /// Look up a profile by id
    pub fn get(&self, id: &ProfileId) -> Option<&Profile> {
        self.profiles.iter().find(|p| &p.id == id)
    }

    /// The currently selected profile, resolved against the collection
    pub fn selected(&self) -> Option<&Profile> {
        self.selected.as_ref().and_then(|id| self.get(id))
    }

    pub fn selected_id(&self) -> Option<&ProfileId> {
        self.selected.as_ref()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.profiles.len() >= MAX_PROFILES
    }

    /// Build an advice request from the selected profile's stored BMR
    pub fn advice_request(
        &self,
        goal: &str,
        dietary_preferences: &str,
        language: Language,
    ) -> Result<AdviceRequest> {
        let profile = self.selected().ok_or(Error::NoActiveProfile)?;
        Ok(AdviceRequest::for_profile(
            profile,
            goal,
            dietary_preferences,
            language,
        ))
    }

    fn position(&self, id: &ProfileId) -> Result<usize> {
        self.profiles
            .iter()
            .position(|p| &p.id == id)
            .ok_or_else(|| Error::NotFound(id.clone()))
    }
}

fn checked_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidName);
    }
    Ok(name.to_string())
}
