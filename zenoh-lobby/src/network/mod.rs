//! Zenoh-backed online services provider

mod advert;
pub mod keyexpr;
pub mod online_services;
pub(crate) mod session_queryable;

pub use keyexpr::{KeyexprSession, Scope, SessionAction};
pub use online_services::{ZenohOnlineServices, ZenohSessionInterface, DEFAULT_PREFIX};
