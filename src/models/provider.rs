//! Identity provider configuration rows.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Stable keys for the known identity sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderCode {
    Google,
    Github,
    Discord,
    Microsoftonline,
    Line,
    Basic,
}

impl ProviderCode {
    pub const ALL: [ProviderCode; 6] = [
        ProviderCode::Google,
        ProviderCode::Github,
        ProviderCode::Discord,
        ProviderCode::Microsoftonline,
        ProviderCode::Line,
        ProviderCode::Basic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderCode::Google => "google",
            ProviderCode::Github => "github",
            ProviderCode::Discord => "discord",
            ProviderCode::Microsoftonline => "microsoftonline",
            ProviderCode::Line => "line",
            ProviderCode::Basic => "basic",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderCode::Google => "Google",
            ProviderCode::Github => "GitHub",
            ProviderCode::Discord => "Discord",
            ProviderCode::Microsoftonline => "Microsoft",
            ProviderCode::Line => "Line",
            ProviderCode::Basic => "Basic",
        }
    }
}

impl std::str::FromStr for ProviderCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(ProviderCode::Google),
            "github" => Ok(ProviderCode::Github),
            "discord" => Ok(ProviderCode::Discord),
            "microsoftonline" => Ok(ProviderCode::Microsoftonline),
            "line" => Ok(ProviderCode::Line),
            "basic" => Ok(ProviderCode::Basic),
            _ => Err(format!("unknown provider code: {}", s)),
        }
    }
}

impl std::fmt::Display for ProviderCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration of one identity source. Rows are seeded at startup and
/// mutated only by administrative configuration; a disabled row is a
/// placeholder, not an absent provider.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Provider {
    pub provider_code: String,
    pub provider_name: String,
    #[serde(skip_serializing)]
    pub client_id: String,
    #[serde(skip_serializing)]
    pub client_secret: String,
    pub callback_url: String,
    pub enabled: bool,
}

impl Provider {
    /// Default (disabled, credential-less) row for a known provider code.
    pub fn seed(code: ProviderCode) -> Self {
        let callback_url = match code {
            ProviderCode::Basic => String::new(),
            _ => format!("/oauth/{}/callback", code.as_str()),
        };

        Self {
            provider_code: code.as_str().to_string(),
            provider_name: code.display_name().to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            callback_url,
            enabled: false,
        }
    }
}
