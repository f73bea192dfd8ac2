//! # Admin one-time code
//!
//! Admin login requires the configured credential pair plus a one-time
//! code: 8 uppercase hex characters, valid for 24 hours, consumed on
//! first successful use. A fresh code is issued at startup and logged;
//! issuing a new one invalidates the previous.

use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use rand::Rng as _;

/// Code lifetime.
const CODE_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone)]
struct IssuedCode {
    code:       String,
    expires_at: DateTime<Utc>,
}

/// In-process store for the current admin code.
#[derive(Default)]
pub struct AdminCodeCache {
    current: RwLock<Option<IssuedCode>>,
}

impl AdminCodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a fresh code, replacing any previous one, and returns it.
    pub fn issue(&self, now: DateTime<Utc>) -> String {
        let code = format!("{:08X}", rand::rng().random::<u32>());
        let issued = IssuedCode {
            code: code.clone(),
            expires_at: now + Duration::hours(CODE_TTL_HOURS),
        };
        *self.current.write().expect("admin code lock poisoned") = Some(issued);
        code
    }

    /// Checks `candidate` against the current code. A successful check
    /// consumes the code; expired or already-used codes fail.
    pub fn verify_and_consume(&self, candidate: &str, now: DateTime<Utc>) -> bool {
        let mut guard = self.current.write().expect("admin code lock poisoned");
        match guard.as_ref() {
            Some(issued) if issued.code == candidate && issued.expires_at > now => {
                *guard = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_issued_code_is_eight_uppercase_hex_chars() {
        let cache = AdminCodeCache::new();
        let code = cache.issue(now());

        assert_eq!(code.len(), 8);
        assert!(code.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn test_code_is_consumed_on_first_use() {
        let cache = AdminCodeCache::new();
        let code = cache.issue(now());

        assert!(cache.verify_and_consume(&code, now()));
        assert!(!cache.verify_and_consume(&code, now()));
    }

    #[test]
    fn test_expired_code_fails() {
        let cache = AdminCodeCache::new();
        let code = cache.issue(now());

        let later = now() + Duration::hours(CODE_TTL_HOURS + 1);
        assert!(!cache.verify_and_consume(&code, later));
    }

    #[test]
    fn test_reissue_invalidates_previous_code() {
        let cache = AdminCodeCache::new();
        let first = cache.issue(now());
        let second = cache.issue(now());

        assert!(!cache.verify_and_consume(&first, now()));
        assert!(cache.verify_and_consume(&second, now()));
    }

    #[test]
    fn test_wrong_code_fails() {
        let cache = AdminCodeCache::new();
        cache.issue(now());
        assert!(!cache.verify_and_consume("00000000", now()));
    }
}
