pub mod config;
pub mod core;
pub mod gui;
pub mod logging;

pub use config::PortalConfig;
pub use crate::core::{
    api::{HttpPortalApi, PortalApi, User},
    context::{MunicipalityContext, Source},
    division::{Division, DivisionInput, DivisionStore, slugify},
    navigation::{NavigationTracker, SmartRedirect},
    resolver::{DivisionResolver, FallbackDivision},
    route::DivisionRoute,
    session::{PageOutcome, PortalSession},
    storage::{ClientStorage, MemoryStorage, SqliteStorage},
};
