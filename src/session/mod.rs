//! Session resolution: bearer tokens in, request-scoped sessions out.

mod cache;
mod language;
mod model;
mod resolver;
mod store;

pub use cache::{MemorySessionCache, RedisSessionCache, SessionCache, SESSION_TAG};
pub use language::Language;
pub use model::{Session, SessionRecord, SessionUser};
pub use resolver::{resolve_session, SessionResolver};
pub use store::{purge_expired_periodically, MemorySessionStore, PgSessionStore, SessionStore};
