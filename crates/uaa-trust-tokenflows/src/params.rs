//! Grant request parameters.
//!
//! The parameter vocabulary is closed: every form field a flow can send is a
//! [`GrantParameter`] variant, so a misspelled key cannot reach the wire.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::error::{Result, TokenFlowError};

/// OAuth2 grant types supported by the flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrantType {
    /// Technical access token for the client itself.
    ClientCredentials,
    /// New access token from a refresh token.
    RefreshToken,
    /// Exchange of a user token for a refresh token (UAA extension).
    UserToken,
}

impl GrantType {
    /// Return the `grant_type` value sent on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ClientCredentials => "client_credentials",
            Self::RefreshToken => "refresh_token",
            Self::UserToken => "user_token",
        }
    }
}

impl fmt::Display for GrantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Form parameters a grant request may carry besides `grant_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GrantParameter {
    /// `client_id`
    ClientId,
    /// `client_secret`
    ClientSecret,
    /// `refresh_token`
    RefreshToken,
    /// `response_type`
    ResponseType,
    /// `authorities`
    Authorities,
}

impl GrantParameter {
    /// Return the form field name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ClientId => "client_id",
            Self::ClientSecret => "client_secret",
            Self::RefreshToken => "refresh_token",
            Self::ResponseType => "response_type",
            Self::Authorities => "authorities",
        }
    }

    const fn is_secret(self) -> bool {
        matches!(self, Self::ClientSecret | Self::RefreshToken)
    }
}

/// The form parameters of a single grant request.
#[derive(Clone, PartialEq, Eq)]
pub struct GrantParameters {
    grant_type: GrantType,
    values: BTreeMap<GrantParameter, String>,
}

impl GrantParameters {
    /// Start a parameter set for the given grant type.
    #[must_use]
    pub const fn new(grant_type: GrantType) -> Self {
        Self {
            grant_type,
            values: BTreeMap::new(),
        }
    }

    /// Set a parameter, replacing any previous value.
    #[must_use]
    pub fn with(mut self, parameter: GrantParameter, value: impl Into<String>) -> Self {
        self.values.insert(parameter, value.into());
        self
    }

    /// Fold additional attributes into the `authorities` parameter.
    ///
    /// The value is `{"az_attr":{...}}`. An empty map adds nothing.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the attributes cannot be serialized.
    pub fn with_authorities(self, attributes: &BTreeMap<String, String>) -> Result<Self> {
        if attributes.is_empty() {
            return Ok(self);
        }
        let json = authorities_json(attributes)?;
        Ok(self.with(GrantParameter::Authorities, json))
    }

    /// The grant type.
    #[must_use]
    pub const fn grant_type(&self) -> GrantType {
        self.grant_type
    }

    /// Get a parameter value.
    #[must_use]
    pub fn get(&self, parameter: GrantParameter) -> Option<&str> {
        self.values.get(&parameter).map(String::as_str)
    }

    /// Whether a parameter is set.
    #[must_use]
    pub fn contains(&self, parameter: GrantParameter) -> bool {
        self.values.contains_key(&parameter)
    }

    /// All fields as form pairs, `grant_type` first.
    #[must_use]
    pub fn form(&self) -> Vec<(&'static str, &str)> {
        std::iter::once(("grant_type", self.grant_type.as_str()))
            .chain(self.values.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .collect()
    }
}

impl fmt::Debug for GrantParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        map.entry(&"grant_type", &self.grant_type.as_str());
        for (parameter, value) in &self.values {
            if parameter.is_secret() {
                map.entry(&parameter.as_str(), &"[REDACTED]");
            } else {
                map.entry(&parameter.as_str(), value);
            }
        }
        map.finish()
    }
}

#[derive(Serialize)]
struct Authorities<'a> {
    az_attr: &'a BTreeMap<String, String>,
}

/// Serialize attributes as the `authorities` payload `{"az_attr":{...}}`.
///
/// # Errors
///
/// Returns `Configuration` if serialization fails.
pub fn authorities_json(attributes: &BTreeMap<String, String>) -> Result<String> {
    serde_json::to_string(&Authorities {
        az_attr: attributes,
    })
    .map_err(|e| TokenFlowError::Configuration(format!("cannot serialize authorities: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grant_type_values() {
        assert_eq!(GrantType::ClientCredentials.as_str(), "client_credentials");
        assert_eq!(GrantType::RefreshToken.to_string(), "refresh_token");
        assert_eq!(GrantType::UserToken.to_string(), "user_token");
    }

    #[test]
    fn authorities_payload_shape() {
        let attributes =
            BTreeMap::from([("DummyAttribute".to_string(), "DummyAttributeValue".to_string())]);
        assert_eq!(
            authorities_json(&attributes).unwrap(),
            r#"{"az_attr":{"DummyAttribute":"DummyAttributeValue"}}"#
        );
    }

    #[test]
    fn empty_authorities_omitted() {
        let params = GrantParameters::new(GrantType::ClientCredentials)
            .with_authorities(&BTreeMap::new())
            .unwrap();
        assert!(!params.contains(GrantParameter::Authorities));
    }

    #[test]
    fn form_starts_with_grant_type() {
        let params = GrantParameters::new(GrantType::RefreshToken)
            .with(GrantParameter::RefreshToken, "99e2cecfa54f4957a782f07168915b69-r")
            .with(GrantParameter::ClientId, "clientId");
        let form = params.form();
        assert_eq!(form[0], ("grant_type", "refresh_token"));
        assert!(form.contains(&("client_id", "clientId")));
        assert!(form.contains(&("refresh_token", "99e2cecfa54f4957a782f07168915b69-r")));
        assert_eq!(form.len(), 3);
    }

    #[test]
    fn debug_redacts_secrets() {
        let params = GrantParameters::new(GrantType::RefreshToken)
            .with(GrantParameter::ClientId, "clientId")
            .with(GrantParameter::ClientSecret, "clientSecret")
            .with(GrantParameter::RefreshToken, "refresh-value");
        let debug = format!("{params:?}");
        assert!(debug.contains("clientId"));
        assert!(!debug.contains("clientSecret"));
        assert!(!debug.contains("refresh-value"));
    }
}
