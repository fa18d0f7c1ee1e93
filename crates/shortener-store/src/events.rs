use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// A click event as it travels over the message bus (§3 "Click event").
///
/// The field name `short_code` (not `code`) and the `Z`-suffixed timestamp
/// match the shape the existing event consumers out there already expect;
/// all metadata fields default to the empty string on deserialize rather
/// than requiring the field to be present, so an older or partial producer
/// doesn't fail decode on the consumer side.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClickEvent {
    pub short_code: String,
    pub timestamp: String,
    #[serde(default)]
    pub user_agent: String,
    #[serde(default)]
    pub ip_address: String,
    #[serde(default)]
    pub referrer: String,
    #[serde(default)]
    pub original_url: String,
}

impl ClickEvent {
    /// Builds an event stamped with the current wall-clock time.
    pub fn now(
        short_code: impl Into<String>,
        original_url: impl Into<String>,
        user_agent: impl Into<String>,
        ip_address: impl Into<String>,
        referrer: impl Into<String>,
    ) -> Self {
        Self {
            short_code: short_code.into(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            user_agent: user_agent.into(),
            ip_address: ip_address.into(),
            referrer: referrer.into(),
            original_url: original_url.into(),
        }
    }
}
