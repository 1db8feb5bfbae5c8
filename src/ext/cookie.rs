//! Cookie contracts used to bind the anti-forgery state to the browser.

// self
use crate::{
	_prelude::*,
	provider::{SameSite, StateCookieConfig},
};

/// Instruction to set (or expire) a cookie on the outgoing response.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieDirective {
	/// Cookie name.
	pub name: String,
	/// Cookie value; empty when the directive clears the cookie.
	pub value: String,
	/// Lifetime; zero when the directive clears the cookie.
	pub max_age: Duration,
	/// Cookie path.
	pub path: String,
	/// Whether the cookie is hidden from scripts.
	pub http_only: bool,
	/// Whether the cookie is HTTPS-only.
	pub secure: bool,
	/// `SameSite` attribute.
	pub same_site: SameSite,
}
impl CookieDirective {
	/// Builds a directive that stores `value` with the configured attributes.
	pub fn set(config: &StateCookieConfig, value: impl Into<String>) -> Self {
		Self {
			name: config.name.clone(),
			value: value.into(),
			max_age: config.max_age,
			path: config.path.clone(),
			http_only: true,
			secure: config.secure,
			same_site: config.same_site,
		}
	}

	/// Builds a directive that expires the cookie immediately.
	pub fn clear(config: &StateCookieConfig) -> Self {
		Self { value: String::new(), max_age: Duration::ZERO, ..Self::set(config, "") }
	}

	/// Returns true when the directive removes the cookie.
	pub fn is_removal(&self) -> bool {
		self.max_age.is_zero()
	}

	/// Renders the directive as a `Set-Cookie` header value.
	pub fn to_header_value(&self) -> String {
		let mut header = format!(
			"{}={}; Max-Age={}; Path={}",
			self.name,
			self.value,
			self.max_age.whole_seconds().max(0),
			self.path
		);

		if self.http_only {
			header.push_str("; HttpOnly");
		}
		if self.secure {
			header.push_str("; Secure");
		}

		header.push_str("; SameSite=");
		header.push_str(self.same_site.as_str());

		header
	}
}
impl Debug for CookieDirective {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CookieDirective")
			.field("name", &self.name)
			.field("value_set", &!self.value.is_empty())
			.field("max_age", &self.max_age)
			.field("path", &self.path)
			.field("http_only", &self.http_only)
			.field("secure", &self.secure)
			.field("same_site", &self.same_site)
			.finish()
	}
}

/// Request-scoped cookie jar supplied by the web layer.
///
/// `get` reads the cookie sent with the inbound request; `set` and `clear` queue directives on
/// the outbound response. Implementations must make a cleared cookie invisible to later `get`
/// calls within the same request.
pub trait CookieStore {
	/// Reads a cookie value by name.
	fn get(&self, name: &str) -> Option<String>;

	/// Stores a cookie.
	fn set(&mut self, cookie: CookieDirective);

	/// Expires a cookie; `cookie` carries the name and path to clear.
	fn clear(&mut self, cookie: CookieDirective);
}

/// In-process cookie jar for tests, demos, and non-HTTP integrations.
#[derive(Clone, Debug, Default)]
pub struct MemoryCookieStore {
	values: HashMap<String, String>,
	directives: Vec<CookieDirective>,
}
impl MemoryCookieStore {
	/// Creates a jar pre-populated with inbound cookies.
	pub fn with_cookies<I, K, V>(cookies: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		Self {
			values: cookies.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
			directives: Vec::new(),
		}
	}

	/// Every directive applied to the jar, in order.
	pub fn directives(&self) -> &[CookieDirective] {
		&self.directives
	}

	/// Returns true when no cookie is currently stored under `name`.
	pub fn is_cleared(&self, name: &str) -> bool {
		!self.values.contains_key(name)
	}
}
impl CookieStore for MemoryCookieStore {
	fn get(&self, name: &str) -> Option<String> {
		self.values.get(name).cloned()
	}

	fn set(&mut self, cookie: CookieDirective) {
		self.values.insert(cookie.name.clone(), cookie.value.clone());
		self.directives.push(cookie);
	}

	fn clear(&mut self, cookie: CookieDirective) {
		self.values.remove(&cookie.name);
		self.directives.push(cookie);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn config() -> StateCookieConfig {
		StateCookieConfig {
			name: "keycloak_oauth_state".into(),
			max_age: Duration::minutes(10),
			path: "/auth/callback".into(),
			secure: true,
			same_site: SameSite::Lax,
		}
	}

	#[test]
	fn renders_set_cookie_headers() {
		let set = CookieDirective::set(&config(), "abc");

		assert_eq!(
			set.to_header_value(),
			"keycloak_oauth_state=abc; Max-Age=600; Path=/auth/callback; HttpOnly; Secure; SameSite=Lax"
		);

		let clear = CookieDirective::clear(&config());

		assert!(clear.is_removal());
		assert_eq!(
			clear.to_header_value(),
			"keycloak_oauth_state=; Max-Age=0; Path=/auth/callback; HttpOnly; Secure; SameSite=Lax"
		);
	}

	#[test]
	fn memory_store_hides_cleared_cookies() {
		let mut jar = MemoryCookieStore::with_cookies([("keycloak_oauth_state", "abc")]);

		assert_eq!(jar.get("keycloak_oauth_state").as_deref(), Some("abc"));

		jar.clear(CookieDirective::clear(&config()));

		assert!(jar.is_cleared("keycloak_oauth_state"));
		assert_eq!(jar.directives().len(), 1);
		assert!(!format!("{:?}", CookieDirective::set(&config(), "abc")).contains("abc"));
	}
}
