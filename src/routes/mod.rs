//! Router Module Index
//!
//! Splits the route table by access level. The session gate decides access for every
//! path before these routers are consulted.

/// Routes reachable without a session (login, health).
pub mod public;

/// Routes under `/dashboard`, reachable only with a valid session.
pub mod dashboard;
