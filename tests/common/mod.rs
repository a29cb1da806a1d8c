mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from municipal_portal for tests
pub use municipal_portal::core::{
    api::{ApiError, Country, LoginResponse, PortalApi, User, UserLocation},
    division::{CURRENT_DIVISION_KEY, Division, DivisionInput, DivisionStore},
    location::{AnonymousLocation, IpLocation, LocationStore},
    navigation::NavigationTracker,
    resolver::{DivisionResolver, FallbackDivision, ResolutionError, Tier},
    storage::{ClientStorage, MemoryStorage, SqliteStorage},
};
