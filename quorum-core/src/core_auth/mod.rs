//! Authorization and session handling
//!
//! Two gates coexist here, on purpose:
//! - the primary identity gate ([`session`] + [`policy`]): role and
//!   ownership checks against the authenticated identity
//! - the secondary admin-session gate ([`admin_gate`]): a credential-
//!   guarded, timestamped local flag controlling the admin dashboard,
//!   entirely independent of the identity system
//!
//! They do not unify; the dashboard is reachable without ever touching
//! the identity system, and an admin-role identity does not open the
//! dashboard gate.

pub mod admin_gate;
pub mod errors;
pub mod policy;
pub mod session;

pub use admin_gate::{AdminGate, AdminSessionState};
pub use errors::{AuthError, AuthResult};
pub use session::SessionStore;
