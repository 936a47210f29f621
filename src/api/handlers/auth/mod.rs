//! Login, logout, and permission introspection routes.

mod login;
mod logout;
mod permissions;
pub(crate) mod types;


pub use login::*;
pub use logout::*;
pub use permissions::*;
