//! Collaborator contracts the driver consumes or feeds (cookies, profile validation, users).
//!
//! The crate stays web-framework agnostic: callers adapt their framework's cookie jar to
//! [`CookieStore`], optionally swap the claim schema through [`ProfileValidator`], and persist
//! the resulting identity through their own [`UserStore`]. In-memory implementations are
//! provided for tests and demos.

pub mod cookie;
pub mod user_store;
pub mod validator;

pub use cookie::*;
pub use user_store::*;
pub use validator::*;
