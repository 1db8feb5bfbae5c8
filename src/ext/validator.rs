//! Pluggable userinfo schema validation.

// self
use crate::{_prelude::*, auth::RawProfile};

/// Error returned when a userinfo payload fails validation.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("{details}")]
pub struct ValidationError {
	/// Description of the mismatch (claim names and expected types, never values).
	pub details: String,
}
impl ValidationError {
	/// Creates a new validation error.
	pub fn new(details: impl Into<String>) -> Self {
		Self { details: details.into() }
	}
}

/// Capability that checks a raw userinfo payload before normalization.
///
/// Swap implementations to tighten or relax the claim schema without touching the driver.
pub trait ProfileValidator
where
	Self: Send + Sync,
{
	/// Validates `payload` and returns the accepted claims mapping.
	fn validate(&self, payload: JsonValue) -> Result<RawProfile, ValidationError>;
}

/// JSON type expected for a claim.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClaimKind {
	/// JSON string.
	String,
	/// JSON boolean.
	Bool,
}
impl ClaimKind {
	fn matches(self, value: &JsonValue) -> bool {
		match self {
			Self::String => value.is_string(),
			Self::Bool => value.is_boolean(),
		}
	}

	const fn as_str(self) -> &'static str {
		match self {
			Self::String => "string",
			Self::Bool => "boolean",
		}
	}
}

/// Typed rule for a single claim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClaimRule {
	/// Claim name.
	pub name: String,
	/// Expected JSON type.
	pub kind: ClaimKind,
	/// Whether the claim must be present.
	pub required: bool,
	/// Whether an explicit `null` is accepted.
	pub nullable: bool,
}

/// Rule-based validator covering the standard OpenID Connect profile claims.
///
/// [`ClaimsValidator::default`] requires a non-empty string `sub`, and accepts `email`, `name`,
/// `preferred_username`, `given_name`, and `family_name` as nullable strings and
/// `email_verified` as a boolean. Unknown claims pass through untouched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClaimsValidator {
	/// Rules checked in order.
	pub rules: Vec<ClaimRule>,
}
impl ClaimsValidator {
	/// Creates a validator without rules (any JSON object passes).
	pub fn empty() -> Self {
		Self { rules: Vec::new() }
	}

	/// Adds a required, non-null claim. Required string claims must also be non-empty.
	pub fn require(mut self, name: impl Into<String>, kind: ClaimKind) -> Self {
		self.rules.push(ClaimRule { name: name.into(), kind, required: true, nullable: false });

		self
	}

	/// Adds an optional, nullable claim.
	pub fn optional(mut self, name: impl Into<String>, kind: ClaimKind) -> Self {
		self.rules.push(ClaimRule { name: name.into(), kind, required: false, nullable: true });

		self
	}
}
impl Default for ClaimsValidator {
	fn default() -> Self {
		Self::empty()
			.require("sub", ClaimKind::String)
			.optional("email", ClaimKind::String)
			.optional("email_verified", ClaimKind::Bool)
			.optional("name", ClaimKind::String)
			.optional("preferred_username", ClaimKind::String)
			.optional("given_name", ClaimKind::String)
			.optional("family_name", ClaimKind::String)
	}
}
impl ProfileValidator for ClaimsValidator {
	fn validate(&self, payload: JsonValue) -> Result<RawProfile, ValidationError> {
		let JsonValue::Object(claims) = payload else {
			return Err(ValidationError::new(format!(
				"expected a JSON object, got {}",
				json_kind(&payload)
			)));
		};
		let mut problems = Vec::new();

		for rule in &self.rules {
			match claims.get(&rule.name) {
				None if rule.required => problems.push(format!("`{}` is required", rule.name)),
				None => {},
				Some(JsonValue::Null) if rule.nullable => {},
				Some(JsonValue::String(value))
					if rule.kind == ClaimKind::String && rule.required && value.is_empty() =>
					problems.push(format!("`{}` must not be empty", rule.name)),
				Some(value) if rule.kind.matches(value) => {},
				Some(value) => problems.push(format!(
					"`{}` must be a {} but is {}",
					rule.name,
					rule.kind.as_str(),
					json_kind(value)
				)),
			}
		}

		if problems.is_empty() { Ok(claims) } else { Err(ValidationError::new(problems.join("; "))) }
	}
}

/// Validator that accepts any JSON object.
#[derive(Clone, Copy, Debug, Default)]
pub struct AcceptAnyProfile;
impl ProfileValidator for AcceptAnyProfile {
	fn validate(&self, payload: JsonValue) -> Result<RawProfile, ValidationError> {
		match payload {
			JsonValue::Object(claims) => Ok(claims),
			other => Err(ValidationError::new(format!(
				"expected a JSON object, got {}",
				json_kind(&other)
			))),
		}
	}
}

/// Describes a payload's shape (claim name → JSON type) without exposing any value.
pub fn payload_shape(payload: &JsonValue) -> BTreeMap<String, &'static str> {
	match payload {
		JsonValue::Object(claims) =>
			claims.iter().map(|(name, value)| (name.clone(), json_kind(value))).collect(),
		other => BTreeMap::from([(String::from("$"), json_kind(other))]),
	}
}

fn json_kind(value: &JsonValue) -> &'static str {
	match value {
		JsonValue::Null => "null",
		JsonValue::Bool(_) => "boolean",
		JsonValue::Number(_) => "number",
		JsonValue::String(_) => "string",
		JsonValue::Array(_) => "array",
		JsonValue::Object(_) => "object",
	}
}
