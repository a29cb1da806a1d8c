pub mod api;
pub mod cache;
pub mod clock;
pub mod context;
pub mod countries;
pub mod division;
pub mod location;
pub mod navigation;
pub mod resolver;
pub mod route;
pub mod search;
pub mod session;
pub mod storage;
