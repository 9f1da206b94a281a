/// Router Module Index
///
/// Splits the routing table by access level. Access control is applied per module
/// through Axum route layers.

/// Routes reachable without a session: the login flow, redirects and diagnostics.
pub mod public;

/// Routes behind the session gate: the dashboard page and the question board API.
pub mod authenticated;
