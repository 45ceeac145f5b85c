//! Secondary admin-session gate
//!
//! A separate authorization path for the admin dashboard, independent of
//! the identity system: a fixed credential pair guards a locally
//! persisted flag with an issuance timestamp. The flag is valid for a
//! fixed window (24 h by default) and expiry is checked lazily on each
//! access, not by a timer.
//!
//! State machine: Absent -> Valid on a successful grant; Valid -> Expired
//! once the window elapses; Expired -> Absent on the next check (the
//! check clears the flag); Valid/Absent -> Absent on explicit logout.
//!
//! A failed grant is reported and nothing else - no lockout, no backoff.

use super::errors::{AuthError, AuthResult};
use crate::core_store::model::Timestamp;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// File name of the persisted flag inside the data directory
const FLAG_FILE: &str = "admin_session.json";

/// The persisted flag: presence of the file is the flag itself
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AdminSessionFlag {
    issued_at_ms: u64,
}

/// Result of checking the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminSessionState {
    /// No flag persisted
    Absent,
    /// Flag present and within the validity window
    Valid,
    /// Flag was present but the window elapsed; the flag has been cleared
    Expired,
}

/// The gate itself: credential pair, validity window, flag location
pub struct AdminGate {
    username: String,
    password: String,
    session_ttl: Duration,
    flag_path: PathBuf,
}

impl AdminGate {
    pub fn new(
        username: String,
        password: String,
        session_ttl: Duration,
        data_dir: impl AsRef<Path>,
    ) -> Self {
        AdminGate {
            username,
            password,
            session_ttl,
            flag_path: data_dir.as_ref().join(FLAG_FILE),
        }
    }

    /// Compare the supplied pair against the configured credentials.
    /// On match, persist the flag with the current timestamp. On
    /// mismatch, return the error and leave any existing flag untouched.
    pub fn grant(&self, username: &str, password: &str) -> AuthResult<()> {
        if username != self.username || password != self.password {
            debug!("admin credential check failed");
            return Err(AuthError::AdminCredentialMismatch);
        }

        let flag = AdminSessionFlag {
            issued_at_ms: Timestamp::now().as_millis(),
        };
        let contents =
            serde_json::to_string(&flag).map_err(|e| AuthError::Persistence(e.to_string()))?;
        std::fs::write(&self.flag_path, contents)
            .map_err(|e| AuthError::Persistence(e.to_string()))?;

        debug!("admin session granted");
        Ok(())
    }

    /// Lazily evaluate the gate at the current time
    pub fn check(&self) -> AdminSessionState {
        self.state_at(Timestamp::now())
    }

    /// Evaluate the gate as of `now`; clears the flag when expired.
    /// Read failures degrade to Absent rather than erroring - the caller
    /// redirects to the login screen either way.
    pub fn state_at(&self, now: Timestamp) -> AdminSessionState {
        let contents = match std::fs::read_to_string(&self.flag_path) {
            Ok(contents) => contents,
            Err(_) => return AdminSessionState::Absent,
        };

        let flag: AdminSessionFlag = match serde_json::from_str(&contents) {
            Ok(flag) => flag,
            Err(e) => {
                warn!("unreadable admin session flag, clearing: {}", e);
                self.clear_flag();
                return AdminSessionState::Absent;
            }
        };

        let age_ms = Timestamp::from_millis(flag.issued_at_ms).elapsed_until(now);
        if age_ms > self.session_ttl.as_millis() as u64 {
            debug!("admin session expired, clearing flag");
            self.clear_flag();
            return AdminSessionState::Expired;
        }

        AdminSessionState::Valid
    }

    /// Explicit logout: clear the flag regardless of state
    pub fn logout(&self) {
        self.clear_flag();
    }

    fn clear_flag(&self) {
        if let Err(e) = std::fs::remove_file(&self.flag_path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("failed to clear admin session flag: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    fn gate(dir: &TempDir) -> AdminGate {
        AdminGate::new(
            "admin".to_string(),
            "admin123".to_string(),
            DAY,
            dir.path(),
        )
    }

    #[test]
    fn test_absent_before_grant() {
        let dir = TempDir::new().unwrap();
        assert_eq!(gate(&dir).check(), AdminSessionState::Absent);
    }

    #[test]
    fn test_valid_after_grant() {
        let dir = TempDir::new().unwrap();
        let gate = gate(&dir);
        gate.grant("admin", "admin123").unwrap();
        assert_eq!(gate.check(), AdminSessionState::Valid);
    }

    #[test]
    fn test_wrong_credentials_denied_without_side_effect() {
        let dir = TempDir::new().unwrap();
        let gate = gate(&dir);
        gate.grant("admin", "admin123").unwrap();

        let err = gate.grant("admin", "wrong").unwrap_err();
        assert!(matches!(err, AuthError::AdminCredentialMismatch));

        // Prior valid flag untouched
        assert_eq!(gate.check(), AdminSessionState::Valid);
    }

    #[test]
    fn test_expiry_clears_flag() {
        let dir = TempDir::new().unwrap();
        let gate = gate(&dir);
        gate.grant("admin", "admin123").unwrap();

        let issued = Timestamp::now();
        let just_past_window =
            Timestamp::from_millis(issued.as_millis() + DAY.as_millis() as u64 + 60_000);

        assert_eq!(gate.state_at(just_past_window), AdminSessionState::Expired);
        // Expired check cleared the flag, so the next check is Absent
        assert_eq!(gate.state_at(just_past_window), AdminSessionState::Absent);
    }

    #[test]
    fn test_within_window_stays_valid() {
        let dir = TempDir::new().unwrap();
        let gate = gate(&dir);
        gate.grant("admin", "admin123").unwrap();

        let issued = Timestamp::now();
        let an_hour_later = Timestamp::from_millis(issued.as_millis() + 60 * 60 * 1000);
        assert_eq!(gate.state_at(an_hour_later), AdminSessionState::Valid);
    }

    #[test]
    fn test_logout_clears_from_any_state() {
        let dir = TempDir::new().unwrap();
        let gate = gate(&dir);

        // Logout when absent is a no-op
        gate.logout();
        assert_eq!(gate.check(), AdminSessionState::Absent);

        gate.grant("admin", "admin123").unwrap();
        gate.logout();
        assert_eq!(gate.check(), AdminSessionState::Absent);
    }

    #[test]
    fn test_corrupt_flag_degrades_to_absent() {
        let dir = TempDir::new().unwrap();
        let gate = gate(&dir);
        std::fs::write(dir.path().join(FLAG_FILE), "not json").unwrap();
        assert_eq!(gate.check(), AdminSessionState::Absent);
    }
}
