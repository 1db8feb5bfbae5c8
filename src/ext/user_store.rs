//! Local user persistence contract fed by verified identities.
//!
//! The driver never calls a [`UserStore`]; the web layer does, after
//! [`Driver::user`](crate::flows::Driver::user) returns an identity with an email.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::{_prelude::*, auth::CanonicalIdentity};

/// Boxed future returned by [`UserStore`] operations.
pub type UserStoreFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + 'a + Send>>;

/// Idempotent upsert-by-email contract for local user records.
pub trait UserStore
where
	Self: Send + Sync,
{
	/// Local user record type.
	type User: Send;
	/// Persistence error type.
	type Error: 'static + Send + Sync + StdError;

	/// Returns the user for `email`, creating it from `identity` if none exists.
	fn find_or_create_by_email<'a>(
		&'a self,
		email: &'a str,
		identity: &'a CanonicalIdentity,
	) -> UserStoreFuture<'a, Self::User, Self::Error>;
}

/// Local user record kept by [`MemoryUserStore`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalUser {
	/// Sequential local identifier.
	pub id: u64,
	/// Email address the record is keyed by.
	pub email: String,
	/// Full name captured at creation time.
	pub full_name: Option<String>,
}

/// Thread-safe in-memory [`UserStore`] for tests and demos.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
	users: Mutex<HashMap<String, LocalUser>>,
	next_id: AtomicU64,
}
impl MemoryUserStore {
	/// Number of stored users.
	pub fn len(&self) -> usize {
		self.users.lock().len()
	}

	/// Returns true when no user is stored.
	pub fn is_empty(&self) -> bool {
		self.users.lock().is_empty()
	}
}
impl UserStore for MemoryUserStore {
	type Error = std::convert::Infallible;
	type User = LocalUser;

	fn find_or_create_by_email<'a>(
		&'a self,
		email: &'a str,
		identity: &'a CanonicalIdentity,
	) -> UserStoreFuture<'a, Self::User, Self::Error> {
		Box::pin(async move {
			let mut users = self.users.lock();
			let user = users.entry(email.to_owned()).or_insert_with(|| LocalUser {
				id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
				email: email.to_owned(),
				full_name: identity.name.clone(),
			});

			Ok(user.clone())
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::{AccessToken, EmailVerificationState};

	fn identity(name: &str) -> CanonicalIdentity {
		CanonicalIdentity {
			id: "u1".into(),
			email: Some("a@b.com".into()),
			name: Some(name.into()),
			nick_name: None,
			first_name: None,
			last_name: None,
			avatar_url: None,
			email_verification_state: EmailVerificationState::Verified,
			original: Default::default(),
			token: AccessToken::bearer("tok123"),
		}
	}

	#[tokio::test]
	async fn find_or_create_is_idempotent_per_email() {
		let store = MemoryUserStore::default();
		let first = store
			.find_or_create_by_email("a@b.com", &identity("Alice"))
			.await
			.expect("Memory store never fails.");
		let second = store
			.find_or_create_by_email("a@b.com", &identity("Renamed"))
			.await
			.expect("Memory store never fails.");

		assert_eq!(first, second);
		assert_eq!(first.id, 1);
		assert_eq!(first.full_name.as_deref(), Some("Alice"));
		assert_eq!(store.len(), 1);

		let other = store
			.find_or_create_by_email("c@d.com", &identity("Carol"))
			.await
			.expect("Memory store never fails.");

		assert_eq!(other.id, 2);
		assert!(!store.is_empty());
	}
}
