//! Auth-domain identifiers, scope sets, secrets, tokens, and user identities.

pub mod id;
pub mod identity;
pub mod scope;
pub mod secret;
pub mod token;

pub use id::*;
pub use identity::*;
pub use scope::*;
pub use secret::*;
pub use token::*;
