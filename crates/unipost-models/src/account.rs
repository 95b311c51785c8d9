//! Publish targets: platforms, account kinds, account identity.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

/// Social platform a target account lives on.
///
/// Serialized values are the publishing provider's wire codes, which do
/// not spell out the platform names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Platform {
    #[serde(rename = "vk")]
    Vk,
    #[serde(rename = "io")]
    Instagram,
    #[serde(rename = "gg")]
    Youtube,
    #[serde(rename = "pi")]
    Pinterest,
}

impl Platform {
    /// Provider wire code for this platform.
    pub fn code(&self) -> &'static str {
        match self {
            Platform::Vk => "vk",
            Platform::Instagram => "io",
            Platform::Youtube => "gg",
            Platform::Pinterest => "pi",
        }
    }

    /// Human-readable platform name, used in logs and failure reasons.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Vk => "vk",
            Platform::Instagram => "instagram",
            Platform::Youtube => "youtube",
            Platform::Pinterest => "pinterest",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of account on the provider side.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    #[default]
    User,
    Group,
    Page,
}

impl AccountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountKind::User => "user",
            AccountKind::Group => "group",
            AccountKind::Page => "page",
        }
    }
}

/// Provider-side account identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One destination account selected for a batch.
///
/// Validated once at batch entry and immutable afterwards; downstream
/// stages never re-check it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct AccountTarget {
    /// Provider-side account ID
    pub id: AccountId,

    /// Platform the account belongs to
    pub platform: Platform,

    /// Account kind (user/group/page)
    #[serde(default)]
    pub kind: AccountKind,

    /// Display name, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl AccountTarget {
    pub fn new(id: impl Into<String>, platform: Platform, kind: AccountKind) -> Self {
        Self {
            id: AccountId::new(id),
            platform,
            kind,
            name: None,
        }
    }

    /// Check the target is well-formed.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.as_str().trim().is_empty() {
            return Err(ValidationError::EmptyAccountId);
        }
        Ok(())
    }

    /// Stable per-account salt for transform selection, also the dedup
    /// key within a batch.
    ///
    /// The same account always yields the same salt across runs; two
    /// distinct accounts never share one.
    pub fn salt(&self) -> String {
        format!("{}:{}", self.platform.code(), self.id.as_str())
    }
}

impl fmt::Display for AccountTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.platform.as_str(), self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_wire_codes() {
        assert_eq!(serde_json::to_string(&Platform::Instagram).unwrap(), "\"io\"");
        assert_eq!(serde_json::to_string(&Platform::Youtube).unwrap(), "\"gg\"");

        let p: Platform = serde_json::from_str("\"pi\"").unwrap();
        assert_eq!(p, Platform::Pinterest);
    }

    #[test]
    fn test_salt_is_stable_and_distinct() {
        let a = AccountTarget::new("12345", Platform::Vk, AccountKind::Group);
        let b = AccountTarget::new("12345", Platform::Instagram, AccountKind::User);

        assert_eq!(a.salt(), a.clone().salt());
        assert_ne!(a.salt(), b.salt());
    }

    #[test]
    fn test_validate_rejects_empty_id() {
        let target = AccountTarget::new("  ", Platform::Vk, AccountKind::User);
        assert_eq!(target.validate(), Err(ValidationError::EmptyAccountId));
    }
}
