//! Glue between the portal's page lifecycle (open page, login, logout) and
//! the division components.

use std::sync::Arc;

use crate::core::{
    api::{ApiError, PortalApi, User},
    clock,
    context::{MunicipalityContext, WriteOutcome},
    division::{Division, DivisionInput},
    location::LocationStore,
    navigation::{NavigationTracker, SmartRedirect},
    resolver::{DivisionResolver, FallbackDivision},
    route::DivisionRoute,
    storage::ClientStorage,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectCause {
    InvalidUrl,
    DivisionNotFound,
    BackendUnavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    Show {
        route: DivisionRoute,
        division: Division,
    },
    Redirect {
        url: String,
        cause: RedirectCause,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoginOutcome {
    pub redirect: SmartRedirect,
    pub profile: WriteOutcome,
}

pub struct PortalSession<S, A> {
    api: Arc<A>,
    context: MunicipalityContext<S>,
    tracker: NavigationTracker<S>,
    locations: LocationStore<S>,
    resolver: DivisionResolver<S, A>,
    user: Option<User>,
}

impl<S, A> std::fmt::Debug for PortalSession<S, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortalSession")
            .field("user", &self.user.as_ref().map(|u| &u.id))
            .finish()
    }
}

impl<S: ClientStorage, A: PortalApi> PortalSession<S, A> {
    /// Start a session and mount the active-division context.
    pub async fn start(
        storage: Arc<S>,
        api: Arc<A>,
        fallback: FallbackDivision,
        user: Option<User>,
    ) -> Self {
        let session = Self {
            context: MunicipalityContext::new(storage.clone()),
            tracker: NavigationTracker::new(storage.clone()),
            locations: LocationStore::new(storage.clone()),
            resolver: DivisionResolver::new(storage, api.clone(), fallback),
            api,
            user,
        };
        if session.user.is_some() {
            session.locations.clear().await;
        }
        session.context.mount(session.user.as_ref()).await;
        session
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn context(&self) -> &MunicipalityContext<S> {
        &self.context
    }

    pub fn tracker(&self) -> &NavigationTracker<S> {
        &self.tracker
    }

    pub fn resolver(&self) -> &DivisionResolver<S, A> {
        &self.resolver
    }

    pub fn locations(&self) -> &LocationStore<S> {
        &self.locations
    }

    /// URL of the session's default division.
    pub async fn home_url(&self) -> String {
        self.resolver.resolve(self.user.as_ref()).await
    }

    /// Anonymous sessions: make sure an IP location is cached so the resolver
    /// has something to work with.
    pub async fn locate_anonymous(&self) -> Result<(), ApiError> {
        if self.user.is_some() {
            return Ok(());
        }
        self.locations.locate(self.api.as_ref()).await.map(|_| ())
    }

    /// Load the division behind a division URL. Unknown divisions and
    /// malformed URLs redirect to the default division instead of erroring.
    ///
    /// The page is shown and tracked under the division's own country path,
    /// so `/commune/sherbrooke` for a Canadian division becomes
    /// `/municipality/sherbrooke`.
    pub async fn open_page(&self, url: &str) -> PageOutcome {
        self.context.begin_page_view();
        let route = match DivisionRoute::parse(url) {
            Ok(route) => route,
            Err(e) => {
                tracing::debug!(error = %e, "not a division page");
                return self.redirect_home(RedirectCause::InvalidUrl).await;
            }
        };
        if !self.resolver.is_division_path(&route.url_path).await {
            tracing::debug!(url_path = %route.url_path, "unknown division url path");
            return self.redirect_home(RedirectCause::InvalidUrl).await;
        }
        let input = match self.api.division_by_slug(&route.slug).await {
            Ok(input) => input,
            Err(e) if e.is_not_found() => {
                tracing::warn!(slug = %route.slug, "division not found, redirecting");
                return self.redirect_home(RedirectCause::DivisionNotFound).await;
            }
            Err(e) => {
                tracing::warn!(slug = %route.slug, error = %e, "division lookup failed, redirecting");
                return self.redirect_home(RedirectCause::BackendUnavailable).await;
            }
        };
        let division = self.show(input).await;
        let url_path = self.resolver.url_path_for(division.country.as_deref()).await;
        let route = DivisionRoute::new(url_path, division.slug.clone()).with_section(route.section);
        if let Err(e) = self.tracker.track_page_visit(&route.to_url(), Some(&division)).await {
            tracing::warn!(error = %e, "failed to track page visit");
        }
        PageOutcome::Show { route, division }
    }

    async fn show(&self, input: DivisionInput) -> Division {
        match self.context.navigate(input.clone()).await {
            WriteOutcome::Applied(division) => division,
            // Only reachable when a claim survived begin_page_view; render the
            // page anyway.
            _ => Division::from_input(input, clock::now_millis()),
        }
    }

    async fn redirect_home(&self, cause: RedirectCause) -> PageOutcome {
        PageOutcome::Redirect {
            url: self.home_url().await,
            cause,
        }
    }

    /// The user picked a division from the picker.
    pub async fn select_division(&self, input: DivisionInput) -> WriteOutcome {
        self.context.select(input).await
    }

    /// Divisions bordering the active one, for the picker. Empty when no
    /// division is active.
    pub async fn neighbors(&self) -> Result<Vec<Division>, ApiError> {
        let Some(active) = self.context.active() else {
            return Ok(Vec::new());
        };
        let stamp = clock::now_millis();
        Ok(self
            .api
            .division_neighbors(&active.id)
            .await?
            .into_iter()
            .map(|input| Division::from_input(input, stamp))
            .collect())
    }

    /// Log in with credentials. Returns the bearer token for later requests
    /// alongside the usual login outcome.
    pub async fn authenticate(
        &mut self,
        username: &str,
        password: &str,
    ) -> Result<(String, LoginOutcome), ApiError> {
        let response = self.api.login(username, password).await?;
        let outcome = self.login(response.user).await;
        Ok((response.token, outcome))
    }

    pub async fn login(&mut self, user: User) -> LoginOutcome {
        tracing::info!(user_id = %user.id, "user logged in");
        self.locations.clear().await;
        let profile = self.context.apply_profile(&user).await;
        self.user = Some(user);
        let home = self.home_url().await;
        let redirect = self.tracker.smart_redirect_url(&home).await;
        LoginOutcome { redirect, profile }
    }

    /// Logout keeps the navigation trace so the next login can resume.
    pub async fn logout(&mut self) {
        if let Some(user) = self.user.take() {
            tracing::info!(user_id = %user.id, "user logged out");
        }
        if let Err(e) = self.tracker.track_logout().await {
            tracing::warn!(error = %e, "failed to record logout time");
        }
        self.context.clear().await;
    }
}
