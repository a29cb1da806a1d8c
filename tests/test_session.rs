//! Integration tests for the page / login / logout lifecycle.

mod common;

use std::sync::Arc;

use common::*;
use municipal_portal::core::{
    context::{Phase, Source, WriteOutcome},
    navigation::RedirectReason,
    session::{PageOutcome, PortalSession, RedirectCause},
};

fn api() -> Arc<FakeApi> {
    Arc::new(
        FakeApi::new()
            .with_division(division("d1", "Sherbrooke", "CAN"))
            .with_division(division("d2", "Magog", "CAN")),
    )
}

#[tokio::test]
async fn test_open_known_division_page() -> anyhow::Result<()> {
    let storage = storage();
    let session = PortalSession::start(storage.clone(), api(), fallback(), None).await;

    let outcome = session.open_page("/municipality/sherbrooke/sondages").await;

    let PageOutcome::Show { route, division } = outcome else {
        panic!("expected the page to render, got {outcome:?}");
    };
    assert_eq!(route.section, "sondages");
    assert_eq!(division.id, "d1");
    assert_eq!(session.context().phase(), Phase::FromExplicitNavigation);
    assert!(DivisionStore::new(storage.clone()).is_current("d1").await);
    assert_eq!(
        storage.get_item("lastVisitedUrl").await?.as_deref(),
        Some("/municipality/sherbrooke/sondages")
    );
    assert_eq!(
        session.tracker().last_visited_division().await.map(|d| d.id),
        Some("d1".to_string())
    );
    Ok(())
}

#[tokio::test]
async fn test_unknown_division_redirects_to_default() -> anyhow::Result<()> {
    let storage = storage();
    DivisionStore::new(storage.clone())
        .set_current(division("d2", "Magog", "CAN"))
        .await;
    let session = PortalSession::start(storage, api(), fallback(), None).await;

    let outcome = session.open_page("/municipality/atlantis/accueil").await;

    assert_eq!(
        outcome,
        PageOutcome::Redirect {
            url: "/municipality/magog/accueil".to_string(),
            cause: RedirectCause::DivisionNotFound,
        }
    );
    Ok(())
}

#[tokio::test]
async fn test_non_division_url_redirects() -> anyhow::Result<()> {
    let session = PortalSession::start(storage(), api(), fallback(), None).await;

    let outcome = session.open_page("/dashboard").await;

    assert_eq!(
        outcome,
        PageOutcome::Redirect {
            url: "/municipality/montreal/accueil".to_string(),
            cause: RedirectCause::InvalidUrl,
        }
    );
    Ok(())
}

#[tokio::test]
async fn test_unknown_url_path_redirects_without_lookup() -> anyhow::Result<()> {
    let api = api();
    let session = PortalSession::start(storage(), api.clone(), fallback(), None).await;

    let outcome = session.open_page("/profile/settings").await;

    assert_eq!(
        outcome,
        PageOutcome::Redirect {
            url: "/municipality/montreal/accueil".to_string(),
            cause: RedirectCause::InvalidUrl,
        }
    );
    assert_eq!(api.count_calls("slug:"), 0);
    Ok(())
}

#[tokio::test]
async fn test_page_is_shown_under_division_country_path() -> anyhow::Result<()> {
    let storage = storage();
    let session = PortalSession::start(storage.clone(), api(), fallback(), None).await;

    let outcome = session.open_page("/commune/sherbrooke/fil").await;

    let PageOutcome::Show { route, division } = outcome else {
        panic!("expected the page to render, got {outcome:?}");
    };
    assert_eq!(division.id, "d1");
    assert_eq!(route.to_url(), "/municipality/sherbrooke/fil");
    assert_eq!(
        storage.get_item("lastVisitedUrl").await?.as_deref(),
        Some("/municipality/sherbrooke/fil")
    );
    Ok(())
}

#[tokio::test]
async fn test_backend_admin_path_opens_pages() -> anyhow::Result<()> {
    let api = Arc::new(
        FakeApi::new()
            .with_division(division("d7", "Köln", "DEU"))
            .with_admin_path("DEU", "gemeinde"),
    );
    let storage = storage();
    DivisionStore::new(storage.clone())
        .set_current(division("d7", "Köln", "DEU"))
        .await;
    let session = PortalSession::start(storage, api, fallback(), None).await;

    let home = session.home_url().await;
    assert_eq!(home, "/gemeinde/koln/accueil");

    let outcome = session.open_page(&home).await;
    assert!(matches!(outcome, PageOutcome::Show { ref route, .. } if route.to_url() == home));
    Ok(())
}

#[tokio::test]
async fn test_anonymous_mount_loads_cached_division() -> anyhow::Result<()> {
    let storage = storage();
    DivisionStore::new(storage.clone())
        .set_current(division("d2", "Magog", "CAN"))
        .await;

    let session = PortalSession::start(storage, api(), fallback(), None).await;

    assert_eq!(session.context().active().map(|d| d.id), Some("d2".to_string()));
    assert_eq!(session.context().phase(), Phase::FromCacheOrProfile);
    Ok(())
}

#[tokio::test]
async fn test_login_during_page_view_keeps_page_division_and_resumes() -> anyhow::Result<()> {
    let storage = storage();
    LocationStore::new(storage.clone())
        .save(anonymous_location_in("d2", "Magog"))
        .await?;
    let mut session = PortalSession::start(storage.clone(), api(), fallback(), None).await;
    session.open_page("/municipality/sherbrooke/fil").await;

    let outcome = session
        .login(user_with_division("d2", "Magog", "CAN"))
        .await;

    assert_eq!(outcome.profile, WriteOutcome::Rejected { held_by: Source::Navigation });
    assert_eq!(session.context().active().map(|d| d.id), Some("d1".to_string()));
    assert_eq!(outcome.redirect.url, "/municipality/sherbrooke/fil");
    assert!(matches!(outcome.redirect.reason, RedirectReason::Resume { .. }));
    assert!(
        storage.get_item("anonymousLocation").await?.is_none(),
        "login clears the anonymous location"
    );
    Ok(())
}

#[tokio::test]
async fn test_login_outside_division_page_applies_profile() -> anyhow::Result<()> {
    let storage = storage();
    let mut session = PortalSession::start(storage.clone(), api(), fallback(), None).await;

    let outcome = session
        .login(user_with_division("d2", "Magog", "CAN"))
        .await;

    assert!(matches!(outcome.profile, WriteOutcome::Applied(ref d) if d.id == "d2"));
    assert!(DivisionStore::new(storage).is_current("d2").await);
    assert_eq!(outcome.redirect.url, "/municipality/magog/accueil");
    assert_eq!(outcome.redirect.reason, RedirectReason::NoPreviousVisit);
    Ok(())
}

#[tokio::test]
async fn test_logout_clears_division_but_keeps_trace() -> anyhow::Result<()> {
    let storage = storage();
    let mut session = PortalSession::start(
        storage.clone(),
        api(),
        fallback(),
        Some(user_with_division("d2", "Magog", "CAN")),
    )
    .await;
    session.open_page("/municipality/sherbrooke/fil").await;

    session.logout().await;

    assert!(session.user().is_none());
    assert_eq!(session.context().phase(), Phase::Unset);
    assert!(storage.get_item(CURRENT_DIVISION_KEY).await?.is_none());
    assert!(storage.get_item("logoutTime").await?.is_some());

    let redirect = session.tracker().smart_redirect_url("/home").await;
    assert_eq!(redirect.url, "/municipality/sherbrooke/fil");
    Ok(())
}

#[tokio::test]
async fn test_locate_anonymous_caches_ip_location_once() -> anyhow::Result<()> {
    let api = Arc::new(FakeApi::new().with_location(anonymous_location_in("d2", "Magog")));
    let session = PortalSession::start(storage(), api.clone(), fallback(), None).await;

    session.locate_anonymous().await?;
    session.locate_anonymous().await?;

    assert_eq!(api.count_calls("geolocate"), 1);
    assert_eq!(
        session.locations().get().await.and_then(|l| l.division_id().map(str::to_string)),
        Some("d2".to_string())
    );
    Ok(())
}

#[tokio::test]
async fn test_authenticated_start_drops_anonymous_location() -> anyhow::Result<()> {
    let storage = storage();
    LocationStore::new(storage.clone())
        .save(anonymous_location_in("d2", "Magog"))
        .await?;

    let session = PortalSession::start(
        storage.clone(),
        api(),
        fallback(),
        Some(user_with_division("d1", "Sherbrooke", "CAN")),
    )
    .await;

    assert!(session.locations().get().await.is_none());
    assert!(storage.get_item("anonymousLocation").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_authenticate_with_credentials() -> anyhow::Result<()> {
    let api = Arc::new(
        FakeApi::new()
            .with_division(division("d2", "Magog", "CAN"))
            .with_account("citizen", "hunter2", user_with_division("d2", "Magog", "CAN")),
    );
    let mut session = PortalSession::start(storage(), api, fallback(), None).await;

    let rejected = session.authenticate("citizen", "wrong").await;
    assert!(matches!(rejected, Err(ApiError::Unauthenticated)));
    assert!(session.user().is_none());

    let (token, outcome) = session.authenticate("citizen", "hunter2").await?;
    assert_eq!(token, "token-citizen");
    assert_eq!(session.user().map(|u| u.id.as_str()), Some("u1"));
    assert!(matches!(outcome.profile, WriteOutcome::Applied(ref d) if d.id == "d2"));
    assert_eq!(outcome.redirect.url, "/municipality/magog/accueil");
    Ok(())
}

#[tokio::test]
async fn test_neighbors_of_active_division() -> anyhow::Result<()> {
    let api = api();
    let session = PortalSession::start(storage(), api.clone(), fallback(), None).await;
    assert!(session.neighbors().await?.is_empty());

    session.open_page("/municipality/sherbrooke/accueil").await;
    let neighbors = session.neighbors().await?;

    assert_eq!(api.count_calls("neighbors:d1"), 1);
    assert_eq!(neighbors.len(), 1);
    assert_eq!(neighbors[0].slug, "magog");
    assert_eq!(neighbors[0].country.as_deref(), Some("CAN"));
    Ok(())
}
