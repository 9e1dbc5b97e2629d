//! External identity provider client: authorize URL construction, code
//! exchange, and profile retrieval for each supported provider.

use std::str::FromStr;

use serde::Deserialize;

use crate::error::AppError;
use crate::models::{Provider, ProviderCode};

/// OAuth2 endpoint set for one provider.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub scopes: &'static str,
}

impl Endpoints {
    /// Built-in endpoints for the federated providers. `basic` has none.
    pub fn builtin(code: ProviderCode) -> Option<Endpoints> {
        match code {
            ProviderCode::Google => Some(Endpoints {
                auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
                token_url: "https://oauth2.googleapis.com/token".to_string(),
                userinfo_url: "https://www.googleapis.com/oauth2/v2/userinfo".to_string(),
                scopes: "openid email profile",
            }),
            ProviderCode::Github => Some(Endpoints {
                auth_url: "https://github.com/login/oauth/authorize".to_string(),
                token_url: "https://github.com/login/oauth/access_token".to_string(),
                userinfo_url: "https://api.github.com/user".to_string(),
                scopes: "read:user user:email",
            }),
            ProviderCode::Discord => Some(Endpoints {
                auth_url: "https://discord.com/oauth2/authorize".to_string(),
                token_url: "https://discord.com/api/oauth2/token".to_string(),
                userinfo_url: "https://discord.com/api/users/@me".to_string(),
                scopes: "identify email",
            }),
            ProviderCode::Microsoftonline => Some(Endpoints {
                auth_url: "https://login.microsoftonline.com/common/oauth2/v2.0/authorize"
                    .to_string(),
                token_url: "https://login.microsoftonline.com/common/oauth2/v2.0/token"
                    .to_string(),
                userinfo_url: "https://graph.microsoft.com/v1.0/me".to_string(),
                scopes: "openid email profile User.Read",
            }),
            ProviderCode::Line => Some(Endpoints {
                auth_url: "https://access.line.me/oauth2/v2.1/authorize".to_string(),
                token_url: "https://api.line.me/oauth2/v2.1/token".to_string(),
                userinfo_url: "https://api.line.me/v2/profile".to_string(),
                scopes: "profile openid email",
            }),
            ProviderCode::Basic => None,
        }
    }
}

/// Profile returned by a provider's userinfo endpoint, normalized across
/// providers.
#[derive(Debug, Clone, Default)]
pub struct ExternalProfile {
    pub provider_user_id: String,
    pub email: String,
    pub name: String,
    pub nickname: String,
    pub first_name: String,
    pub last_name: String,
}

impl ExternalProfile {
    /// First-non-empty precedence: full name, nickname, "first last".
    pub fn display_name(&self) -> String {
        if !self.name.is_empty() {
            return self.name.clone();
        }
        if !self.nickname.is_empty() {
            return self.nickname.clone();
        }

        let mut result = String::new();
        if !self.first_name.is_empty() {
            result.push_str(&self.first_name);
        }
        if !self.last_name.is_empty() {
            if !result.is_empty() {
                result.push(' ');
            }
            result.push_str(&self.last_name);
        }
        result
    }
}

/// A configured client for one enabled provider. Instances are built by the
/// registry from provider rows and shared read-only.
#[derive(Debug, Clone)]
pub struct OauthClient {
    pub code: ProviderCode,
    client_id: String,
    client_secret: String,
    callback_url: String,
    endpoints: Endpoints,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl OauthClient {
    pub fn new(
        code: ProviderCode,
        client_id: String,
        client_secret: String,
        callback_url: String,
        endpoints: Endpoints,
    ) -> Self {
        Self {
            code,
            client_id,
            client_secret,
            callback_url,
            endpoints,
        }
    }

    /// Build a client from a configuration row using the given endpoints.
    pub fn from_provider(row: &Provider, endpoints: Endpoints) -> Result<Self, AppError> {
        let code = ProviderCode::from_str(&row.provider_code)
            .map_err(|_| AppError::ProviderMisconfigured(row.provider_code.clone()))?;

        if row.client_id.is_empty() || row.callback_url.is_empty() {
            return Err(AppError::ProviderMisconfigured(row.provider_code.clone()));
        }

        Ok(Self::new(
            code,
            row.client_id.clone(),
            row.client_secret.clone(),
            row.callback_url.clone(),
            endpoints,
        ))
    }

    /// The IdP authorization endpoint the user agent is redirected to.
    pub fn authorize_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
            self.endpoints.auth_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.callback_url),
            urlencoding::encode(self.endpoints.scopes),
            urlencoding::encode(state),
        )
    }

    /// Exchange an authorization code for the external profile.
    ///
    /// This is the only network round-trip in the callback step; it happens
    /// strictly before any persistence write.
    pub async fn fetch_profile(
        &self,
        http: &reqwest::Client,
        code: &str,
    ) -> Result<ExternalProfile, AppError> {
        let token_res = http
            .post(&self.endpoints.token_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", self.callback_url.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::UpstreamIdentity(anyhow::anyhow!("token exchange: {}", e)))?;

        if !token_res.status().is_success() {
            let status = token_res.status();
            let body = token_res.text().await.unwrap_or_default();
            return Err(AppError::UpstreamIdentity(anyhow::anyhow!(
                "token exchange returned {}: {}",
                status,
                body
            )));
        }

        let token: TokenResponse = token_res.json().await.map_err(|e| {
            AppError::UpstreamIdentity(anyhow::anyhow!("token response parse: {}", e))
        })?;

        let userinfo = http
            .get(&self.endpoints.userinfo_url)
            .header(reqwest::header::USER_AGENT, "authkit")
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(|e| AppError::UpstreamIdentity(anyhow::anyhow!("userinfo: {}", e)))?;

        if !userinfo.status().is_success() {
            return Err(AppError::UpstreamIdentity(anyhow::anyhow!(
                "userinfo returned {}",
                userinfo.status()
            )));
        }

        self.parse_profile(http, &token.access_token, userinfo)
            .await
    }

    async fn parse_profile(
        &self,
        http: &reqwest::Client,
        access_token: &str,
        res: reqwest::Response,
    ) -> Result<ExternalProfile, AppError> {
        fn parse_err(e: reqwest::Error) -> AppError {
            AppError::UpstreamIdentity(anyhow::anyhow!("profile parse: {}", e))
        }

        match self.code {
            ProviderCode::Google => {
                #[derive(Deserialize)]
                struct GoogleUser {
                    id: String,
                    email: Option<String>,
                    name: Option<String>,
                    given_name: Option<String>,
                    family_name: Option<String>,
                }
                let u: GoogleUser = res.json().await.map_err(parse_err)?;
                Ok(ExternalProfile {
                    provider_user_id: u.id,
                    email: require_email(u.email)?,
                    name: u.name.unwrap_or_default(),
                    first_name: u.given_name.unwrap_or_default(),
                    last_name: u.family_name.unwrap_or_default(),
                    ..Default::default()
                })
            }
            ProviderCode::Github => {
                #[derive(Deserialize)]
                struct GithubUser {
                    id: i64,
                    login: String,
                    name: Option<String>,
                    email: Option<String>,
                }
                let u: GithubUser = res.json().await.map_err(parse_err)?;
                let email = match u.email {
                    Some(email) if !email.is_empty() => email,
                    _ => self.fetch_github_primary_email(http, access_token).await?,
                };
                Ok(ExternalProfile {
                    provider_user_id: u.id.to_string(),
                    email,
                    name: u.name.unwrap_or_default(),
                    nickname: u.login,
                    ..Default::default()
                })
            }
            ProviderCode::Discord => {
                #[derive(Deserialize)]
                struct DiscordUser {
                    id: String,
                    username: String,
                    global_name: Option<String>,
                    email: Option<String>,
                }
                let u: DiscordUser = res.json().await.map_err(parse_err)?;
                Ok(ExternalProfile {
                    provider_user_id: u.id,
                    email: require_email(u.email)?,
                    name: u.global_name.unwrap_or_default(),
                    nickname: u.username,
                    ..Default::default()
                })
            }
            ProviderCode::Microsoftonline => {
                #[derive(Deserialize)]
                #[serde(rename_all = "camelCase")]
                struct MicrosoftUser {
                    id: String,
                    display_name: Option<String>,
                    given_name: Option<String>,
                    surname: Option<String>,
                    mail: Option<String>,
                    user_principal_name: Option<String>,
                }
                let u: MicrosoftUser = res.json().await.map_err(parse_err)?;
                Ok(ExternalProfile {
                    provider_user_id: u.id,
                    email: require_email(u.mail.or(u.user_principal_name))?,
                    name: u.display_name.unwrap_or_default(),
                    first_name: u.given_name.unwrap_or_default(),
                    last_name: u.surname.unwrap_or_default(),
                    ..Default::default()
                })
            }
            ProviderCode::Line => {
                #[derive(Deserialize)]
                #[serde(rename_all = "camelCase")]
                struct LineUser {
                    user_id: String,
                    display_name: Option<String>,
                    email: Option<String>,
                }
                let u: LineUser = res.json().await.map_err(parse_err)?;
                Ok(ExternalProfile {
                    provider_user_id: u.user_id,
                    email: require_email(u.email)?,
                    name: u.display_name.unwrap_or_default(),
                    ..Default::default()
                })
            }
            ProviderCode::Basic => Err(AppError::Internal(anyhow::anyhow!(
                "basic is not a federated provider"
            ))),
        }
    }

    /// GitHub hides the email on `/user` for many accounts; fall back to the
    /// primary verified address from `/user/emails`.
    async fn fetch_github_primary_email(
        &self,
        http: &reqwest::Client,
        access_token: &str,
    ) -> Result<String, AppError> {
        #[derive(Deserialize)]
        struct GithubEmail {
            email: String,
            primary: bool,
            verified: bool,
        }

        let emails: Vec<GithubEmail> = http
            .get(format!("{}/emails", self.endpoints.userinfo_url))
            .header(reqwest::header::USER_AGENT, "authkit")
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::UpstreamIdentity(anyhow::anyhow!("user emails: {}", e)))?
            .json()
            .await
            .map_err(|e| AppError::UpstreamIdentity(anyhow::anyhow!("user emails parse: {}", e)))?;

        emails
            .iter()
            .find(|e| e.primary && e.verified)
            .or_else(|| emails.first())
            .map(|e| e.email.clone())
            .ok_or_else(|| {
                AppError::UpstreamIdentity(anyhow::anyhow!("provider did not return an email"))
            })
    }
}

fn require_email(email: Option<String>) -> Result<String, AppError> {
    match email {
        Some(email) if !email.is_empty() => Ok(email),
        _ => Err(AppError::UpstreamIdentity(anyhow::anyhow!(
            "provider did not return an email"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_prefers_full_name() {
        let profile = ExternalProfile {
            name: "Grace Hopper".to_string(),
            nickname: "ghopper".to_string(),
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            ..Default::default()
        };
        assert_eq!(profile.display_name(), "Grace Hopper");
    }

    #[test]
    fn display_name_falls_back_to_nickname() {
        let profile = ExternalProfile {
            nickname: "ghopper".to_string(),
            first_name: "Grace".to_string(),
            ..Default::default()
        };
        assert_eq!(profile.display_name(), "ghopper");
    }

    #[test]
    fn display_name_joins_first_and_last() {
        let profile = ExternalProfile {
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            ..Default::default()
        };
        assert_eq!(profile.display_name(), "Grace Hopper");
    }

    #[test]
    fn display_name_omits_empty_halves() {
        let only_last = ExternalProfile {
            last_name: "Hopper".to_string(),
            ..Default::default()
        };
        assert_eq!(only_last.display_name(), "Hopper");

        let empty = ExternalProfile::default();
        assert_eq!(empty.display_name(), "");
    }

    #[test]
    fn authorize_url_carries_state_and_redirect() {
        let client = OauthClient::new(
            ProviderCode::Github,
            "cid".to_string(),
            "secret".to_string(),
            "https://example.com/oauth/github/callback".to_string(),
            Endpoints::builtin(ProviderCode::Github).unwrap(),
        );

        let url = client.authorize_url("nonce123");
        assert!(url.starts_with("https://github.com/login/oauth/authorize?"));
        assert!(url.contains("client_id=cid"));
        assert!(url.contains("state=nonce123"));
        assert!(url.contains("redirect_uri=https%3A%2F%2Fexample.com%2Foauth%2Fgithub%2Fcallback"));
    }

    #[test]
    fn basic_has_no_endpoints() {
        assert!(Endpoints::builtin(ProviderCode::Basic).is_none());
    }
}
