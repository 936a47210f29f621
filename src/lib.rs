//! # Antrepo (Warehouse Administration Sessions & Authorization)
//!
//! `antrepo` is the session and authorization authority for a multi-tenant
//! warehouse administration platform. It issues signed access tokens at
//! login, resolves bearer tokens into request sessions through a cache-aside
//! lookup (Redis in front of Postgres), and enforces role and permission
//! policies on routes.
//!
//! ## Sessions
//!
//! A login creates a durable session record holding a denormalized snapshot
//! of the user (names, roles, effective permissions). Tokens are verified
//! cryptographically on every request; the session lookup afterwards is a
//! revocation check, so deleting the record logs the token out everywhere.
//!
//! ## Authorization
//!
//! Permissions form a closed `Resource_Action` catalogue. Roles map to
//! permission claims; the platform super-admin role satisfies every
//! permission policy without holding individual claims. Policy failures are
//! `401 Unauthorized` for anonymous callers and `403 Forbidden` for
//! authenticated ones.

pub mod api;
pub mod authz;
pub mod cli;
pub mod session;
pub mod token;
pub mod users;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_app_user_agent() {
        assert!(APP_USER_AGENT.starts_with("antrepo/"));
    }
}
