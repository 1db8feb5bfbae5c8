//! Userinfo fetch and claim normalization.

// crates.io
use oauth2::http::{
	Method, Request,
	header::{ACCEPT, AUTHORIZATION},
};
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, CanonicalIdentity, EmailVerificationState, RawProfile},
	error::{ConfigError, ProfileError},
	ext::{ProfileValidator, payload_shape},
	flows::Driver,
	http::{ProviderHttpClient, TransportErrorMapper},
	obs::{self, FlowOutcome, FlowSpan, FlowStage},
	provider::{EmailPolicy, EndpointAction},
};

impl<C, M> Driver<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Fetches the userinfo profile with `token` and normalizes it.
	///
	/// The payload passes through the configured
	/// [`ProfileValidator`](crate::ext::ProfileValidator) before normalization; rejections are
	/// logged with the payload shape only.
	pub async fn fetch_profile(&self, token: AccessToken) -> Result<CanonicalIdentity> {
		const STAGE: FlowStage = FlowStage::Profile;

		let span = FlowSpan::new(STAGE);

		obs::record_flow_outcome(STAGE, FlowOutcome::Attempt);

		let result = span.instrument(self.fetch_profile_inner(token)).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(STAGE, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(STAGE, FlowOutcome::Failure),
		}

		result
	}

	/// Same pipeline as [`fetch_profile`](Self::fetch_profile) for a bare bearer token.
	pub async fn fetch_profile_from_raw_token(
		&self,
		token: impl Into<String>,
	) -> Result<CanonicalIdentity> {
		self.fetch_profile(AccessToken::bearer(token)).await
	}

	async fn fetch_profile_inner(&self, token: AccessToken) -> Result<CanonicalIdentity> {
		let request = self.userinfo_request(&token)?;
		let (response, metadata) =
			self.dispatch(EndpointAction::UserInfo, request).await.map_err(ProfileError::from)?;
		let status = response.status().as_u16();
		let body = response.into_body();

		if !(200..300).contains(&status) {
			obs::log_endpoint_rejection(FlowStage::Profile, status);

			return Err(ProfileError::Rejected {
				status,
				body: String::from_utf8_lossy(&body).into_owned(),
				retry_after: metadata.and_then(|meta| meta.retry_after),
			}
			.into());
		}

		let payload = serde_json::from_slice::<JsonValue>(&body).map_err(|e| {
			schema_rejection(format!("userinfo body is not JSON ({e})"), &BTreeMap::new())
		})?;

		Ok(validate_and_normalize(
			self.validator.as_ref(),
			payload,
			token,
			self.config.email_policy,
		)?)
	}

	fn userinfo_request(&self, token: &AccessToken) -> Result<Request<Vec<u8>>, ConfigError> {
		let request = Request::builder()
			.method(Method::GET)
			.uri(self.config.endpoints.userinfo.as_str())
			.header(AUTHORIZATION, format!("Bearer {}", token.token.expose()))
			.header(ACCEPT, "application/json")
			.body(Vec::new())?;

		Ok(request)
	}
}

/// Runs `validator` and [`normalize_profile`] over a parsed userinfo payload.
///
/// Every [`ProfileError::InvalidSchema`] raised on the way is logged with the payload shape.
fn validate_and_normalize(
	validator: &dyn ProfileValidator,
	payload: JsonValue,
	token: AccessToken,
	email_policy: EmailPolicy,
) -> Result<CanonicalIdentity, ProfileError> {
	let shape = payload_shape(&payload);
	let claims =
		validator.validate(payload).map_err(|e| schema_rejection(e.details, &shape))?;

	normalize_profile(claims, token, email_policy).map_err(|e| match e {
		ProfileError::InvalidSchema { details } => schema_rejection(details, &shape),
		e => e,
	})
}

fn schema_rejection(details: String, shape: &BTreeMap<String, &'static str>) -> ProfileError {
	obs::log_schema_rejection(&details, shape);

	ProfileError::InvalidSchema { details }
}

/// Maps validated userinfo claims onto a [`CanonicalIdentity`].
///
/// `id` comes from `sub` and is mandatory. `name` falls back to `preferred_username`, which
/// also becomes `nick_name`. `avatar_url` is always `None`. Under [`EmailPolicy::Required`] a
/// profile without `email` fails with [`ProfileError::MissingEmail`].
pub fn normalize_profile(
	claims: RawProfile,
	token: AccessToken,
	email_policy: EmailPolicy,
) -> Result<CanonicalIdentity, ProfileError> {
	let string_claim =
		|name: &str| claims.get(name).and_then(JsonValue::as_str).map(ToOwned::to_owned);
	let id = string_claim("sub").filter(|sub| !sub.is_empty()).ok_or_else(|| {
		ProfileError::InvalidSchema { details: "`sub` must be a non-empty string".into() }
	})?;
	let email = string_claim("email").filter(|email| !email.is_empty());

	if email.is_none() && email_policy == EmailPolicy::Required {
		return Err(ProfileError::MissingEmail);
	}

	let nick_name = string_claim("preferred_username");
	let name = string_claim("name").or_else(|| nick_name.clone());
	let first_name = string_claim("given_name");
	let last_name = string_claim("family_name");
	let email_verification_state = EmailVerificationState::from(
		claims.get("email_verified").and_then(JsonValue::as_bool).unwrap_or(false),
	);

	Ok(CanonicalIdentity {
		id,
		email,
		name,
		nick_name,
		first_name,
		last_name,
		avatar_url: None,
		email_verification_state,
		original: claims,
		token,
	})
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;
	use crate::ext::{AcceptAnyProfile, ClaimsValidator};

	fn claims(value: JsonValue) -> RawProfile {
		match value {
			JsonValue::Object(claims) => claims,
			_ => panic!("Claims fixture must be an object."),
		}
	}

	#[test]
	fn normalizes_keycloak_claims() {
		let identity = normalize_profile(
			claims(json!({
				"sub": "u1",
				"email": "a@b.com",
				"email_verified": true,
				"preferred_username": "alice"
			})),
			AccessToken::bearer("tok123"),
			EmailPolicy::Optional,
		)
		.expect("Profile should normalize.");

		assert_eq!(identity.id, "u1");
		assert_eq!(identity.email.as_deref(), Some("a@b.com"));
		assert_eq!(identity.email_verification_state, EmailVerificationState::Verified);
		assert_eq!(identity.nick_name.as_deref(), Some("alice"));
		assert_eq!(identity.name.as_deref(), Some("alice"));
		assert_eq!(identity.avatar_url, None);
		assert_eq!(identity.original.len(), 4);
	}

	#[test]
	fn explicit_name_wins_over_username() {
		let identity = normalize_profile(
			claims(json!({
				"sub": "u1",
				"name": "Alice Liddell",
				"preferred_username": "alice",
				"given_name": "Alice",
				"family_name": "Liddell"
			})),
			AccessToken::bearer("tok123"),
			EmailPolicy::Optional,
		)
		.expect("Profile should normalize.");

		assert_eq!(identity.name.as_deref(), Some("Alice Liddell"));
		assert_eq!(identity.first_name.as_deref(), Some("Alice"));
		assert_eq!(identity.last_name.as_deref(), Some("Liddell"));
		assert_eq!(identity.email_verification_state, EmailVerificationState::Unverified);
		assert!(matches!(identity.require_email(), Err(ProfileError::MissingEmail)));
	}

	#[test]
	fn missing_subject_is_a_schema_error() {
		let err = normalize_profile(
			claims(json!({ "email": "a@b.com" })),
			AccessToken::bearer("tok123"),
			EmailPolicy::Optional,
		)
		.expect_err("Profiles without sub must fail.");

		assert!(matches!(err, ProfileError::InvalidSchema { .. }));
	}

	#[test]
	fn empty_subject_is_rejected_whatever_the_validator() {
		let err = validate_and_normalize(
			&AcceptAnyProfile,
			json!({ "sub": "", "email": "a@b.com" }),
			AccessToken::bearer("tok123"),
			EmailPolicy::Optional,
		)
		.expect_err("An empty sub must fail even when the validator accepts anything.");

		assert!(matches!(err, ProfileError::InvalidSchema { details } if details.contains("`sub`")));

		let err = validate_and_normalize(
			&ClaimsValidator::default(),
			json!({ "sub": "" }),
			AccessToken::bearer("tok123"),
			EmailPolicy::Optional,
		)
		.expect_err("The default validator must reject an empty sub.");

		assert!(
			matches!(err, ProfileError::InvalidSchema { details } if details == "`sub` must not be empty")
		);
	}

	#[test]
	fn required_email_policy_rejects_anonymous_profiles() {
		let err = normalize_profile(
			claims(json!({ "sub": "u1", "email": null })),
			AccessToken::bearer("tok123"),
			EmailPolicy::Required,
		)
		.expect_err("Missing email must fail under the required policy.");

		assert!(matches!(err, ProfileError::MissingEmail));
	}
}
