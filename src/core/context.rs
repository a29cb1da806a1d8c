//! Application-wide "active division", shared with every view through a
//! watch channel.
//!
//! Several independent triggers try to set the active division: the
//! persisted record on startup, the profile on login, a division URL, and the
//! division picker. Each write is tagged with its [`Source`] and only replaces
//! the current value when it ranks at least as high, or when the current claim
//! has been released. Navigation and manual claims last for one page view.

use std::sync::Arc;

use tokio::sync::watch;

use crate::core::{
    api::User,
    clock,
    division::{CountryField, Division, DivisionInput, DivisionStore},
    storage::ClientStorage,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Source {
    Cache,
    Profile,
    Navigation,
    Manual,
}

impl Source {
    fn released_by_page_change(self) -> bool {
        matches!(self, Source::Navigation | Source::Manual)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Unset,
    FromCacheOrProfile,
    FromExplicitNavigation,
    FromManualSelection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    pub source: Source,
    pub held: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveDivision {
    pub division: Option<Division>,
    pub claim: Option<Claim>,
}

impl ActiveDivision {
    pub fn phase(&self) -> Phase {
        match self.claim.as_ref().map(|c| c.source) {
            None => Phase::Unset,
            Some(Source::Cache | Source::Profile) => Phase::FromCacheOrProfile,
            Some(Source::Navigation) => Phase::FromExplicitNavigation,
            Some(Source::Manual) => Phase::FromManualSelection,
        }
    }

    fn accepts(&self, source: Source) -> bool {
        match &self.claim {
            None => true,
            Some(claim) => !claim.held || source >= claim.source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Applied(Division),
    Rejected { held_by: Source },
    /// Nothing to write, e.g. a profile with no division.
    Skipped,
}

#[derive(Debug)]
pub struct MunicipalityContext<S> {
    store: DivisionStore<S>,
    state: watch::Sender<ActiveDivision>,
}

impl<S: ClientStorage> MunicipalityContext<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            store: DivisionStore::new(storage),
            state: watch::Sender::new(ActiveDivision::default()),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ActiveDivision> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ActiveDivision {
        self.state.borrow().clone()
    }

    pub fn active(&self) -> Option<Division> {
        self.state.borrow().division.clone()
    }

    pub fn phase(&self) -> Phase {
        self.state.borrow().phase()
    }

    /// Startup. An authenticated profile outranks whatever was cached, so the
    /// persisted record is only loaded for anonymous sessions.
    pub async fn mount(&self, user: Option<&User>) -> WriteOutcome {
        if let Some(user) = user {
            return self.apply_profile(user).await;
        }
        match self.store.get_current().await {
            Some(division) => self.write(Source::Cache, division, false).await,
            None => WriteOutcome::Skipped,
        }
    }

    /// Login completed. The profile division replaces cached data but never an
    /// explicit navigation or selection held by the current page view.
    pub async fn apply_profile(&self, user: &User) -> WriteOutcome {
        let Some(input) = profile_division(user) else {
            tracing::debug!(user_id = %user.id, "profile has no division");
            return WriteOutcome::Skipped;
        };
        self.write_input(Source::Profile, input).await
    }

    pub async fn navigate(&self, input: DivisionInput) -> WriteOutcome {
        self.write_input(Source::Navigation, input).await
    }

    pub async fn select(&self, input: DivisionInput) -> WriteOutcome {
        self.write_input(Source::Manual, input).await
    }

    /// A new page view begins; navigation and manual claims from the previous
    /// one stop blocking lower sources.
    pub fn begin_page_view(&self) {
        self.state.send_if_modified(|state| match &mut state.claim {
            Some(claim) if claim.held && claim.source.released_by_page_change() => {
                claim.held = false;
                true
            }
            _ => false,
        });
    }

    /// Logout or hard reset: back to `Unset` and the persisted record removed.
    pub async fn clear(&self) {
        self.state.send_replace(ActiveDivision::default());
        self.store.clear_current().await;
    }

    async fn write_input(&self, source: Source, input: DivisionInput) -> WriteOutcome {
        let division = Division::from_input(input, clock::now_millis());
        self.write(source, division, true).await
    }

    async fn write(&self, source: Source, division: Division, persist: bool) -> WriteOutcome {
        let mut held_by = None;
        let applied = self.state.send_if_modified(|state| {
            if !state.accepts(source) {
                held_by = state.claim.as_ref().map(|c| c.source);
                return false;
            }
            state.division = Some(division.clone());
            state.claim = Some(Claim { source, held: true });
            true
        });
        if !applied {
            let held_by = held_by.unwrap_or(source);
            tracing::debug!(?source, ?held_by, division_id = %division.id, "active division write rejected");
            return WriteOutcome::Rejected { held_by };
        }
        tracing::info!(?source, division_id = %division.id, slug = %division.slug, "active division changed");
        if persist {
            self.store.set_current_record(&division).await;
        }
        WriteOutcome::Applied(division)
    }
}

/// Division described by a user's profile location, if any.
pub fn profile_division(user: &User) -> Option<DivisionInput> {
    let location = user.location.as_ref()?;
    let id = location.division_id.clone().filter(|id| !id.is_empty())?;
    let name = location.city.clone().unwrap_or_default();
    Some(DivisionInput {
        id,
        name,
        country: location.country.clone().map(CountryField::Code),
        ..Default::default()
    })
}
