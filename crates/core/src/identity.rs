//! Identity provider.
//!
//! Account management is delegated to a hosted identity service. [`IdentityProvider`] is the
//! seam used by the REST layer; [`IdentityToolkitClient`] talks to the Identity Toolkit REST API
//! (`accounts:signUp`, `accounts:signInWithPassword`, `accounts:sendOobCode`,
//! `accounts:lookup`).
//!
//! Sessions are ID tokens issued by the provider. This service never stores them.

use crate::config::IdentityConfig;
use crate::error::{IdentityError, IdentityResult};
use async_trait::async_trait;
use cardcrafter_types::UserId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A signed-in session as issued by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
    pub email: String,
    pub id_token: String,
    pub refresh_token: String,
    /// Lifetime of `id_token` in seconds, when the provider reports it.
    pub expires_in: Option<u64>,
}

/// The user behind a valid ID token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityUser {
    pub user_id: UserId,
    pub email: String,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Creates an account and signs it in.
    async fn register(&self, email: &str, password: &str) -> IdentityResult<Session>;

    async fn sign_in(&self, email: &str, password: &str) -> IdentityResult<Session>;

    /// Asks the provider to email a password reset link.
    async fn send_password_reset(&self, email: &str) -> IdentityResult<()>;

    /// Ends a session.
    ///
    /// ID tokens cannot be revoked individually; the caller discards the token. The token is
    /// still validated so that a bogus sign-out is reported as unauthenticated.
    async fn sign_out(&self, id_token: &str) -> IdentityResult<()> {
        self.current_user(id_token).await.map(|_| ())
    }

    /// Resolves the user for an ID token.
    async fn current_user(&self, id_token: &str) -> IdentityResult<IdentityUser>;
}

/// [`IdentityProvider`] for the Identity Toolkit REST API.
#[derive(Clone, Debug)]
pub struct IdentityToolkitClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl IdentityToolkitClient {
    pub fn new(cfg: &IdentityConfig) -> IdentityResult<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(IdentityError::Transport)?;

        Ok(Self {
            http,
            base_url: cfg.base_url().to_owned(),
            api_key: cfg.api_key().to_owned(),
        })
    }

    async fn call<B, R>(&self, method: &str, body: &B) -> IdentityResult<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned + Send,
    {
        let url = format!("{}/accounts:{method}", self.base_url);

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await
            .map_err(IdentityError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let err = match serde_json::from_str::<ErrorEnvelope>(&text) {
                Ok(envelope) => error_from_code(&envelope.error.message),
                Err(_) => IdentityError::InvalidResponse(format!(
                    "accounts:{method} returned status {}",
                    status.as_u16()
                )),
            };
            tracing::debug!(method, status = status.as_u16(), "identity call failed: {err}");
            return Err(err);
        }

        response
            .json()
            .await
            .map_err(|e| IdentityError::InvalidResponse(e.to_string()))
    }

    async fn password_call(
        &self,
        method: &str,
        email: &str,
        password: &str,
    ) -> IdentityResult<Session> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(IdentityError::Rejected(
                "email and password are required".into(),
            ));
        }

        let body = PasswordBody {
            email: email.trim(),
            password,
            return_secure_token: true,
        };
        let res: TokenResponse = self.call(method, &body).await?;
        res.into_session()
    }
}

#[async_trait]
impl IdentityProvider for IdentityToolkitClient {
    async fn register(&self, email: &str, password: &str) -> IdentityResult<Session> {
        self.password_call("signUp", email, password).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> IdentityResult<Session> {
        self.password_call("signInWithPassword", email, password).await
    }

    async fn send_password_reset(&self, email: &str) -> IdentityResult<()> {
        if email.trim().is_empty() {
            return Err(IdentityError::Rejected("email is required".into()));
        }

        let body = OobCodeBody {
            request_type: "PASSWORD_RESET",
            email: email.trim(),
        };
        let _: serde_json::Value = self.call("sendOobCode", &body).await?;
        Ok(())
    }

    async fn current_user(&self, id_token: &str) -> IdentityResult<IdentityUser> {
        if id_token.is_empty() {
            return Err(IdentityError::Unauthenticated);
        }

        let res: LookupResponse = self.call("lookup", &LookupBody { id_token }).await?;
        let user = res
            .users
            .into_iter()
            .next()
            .ok_or(IdentityError::Unauthenticated)?;

        Ok(IdentityUser {
            user_id: parse_user_id(&user.local_id)?,
            email: user.email.unwrap_or_default(),
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordBody<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OobCodeBody<'a> {
    request_type: &'static str,
    email: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupBody<'a> {
    id_token: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    local_id: String,
    #[serde(default)]
    email: String,
    id_token: String,
    #[serde(default)]
    refresh_token: String,
    // Seconds, sent as a decimal string.
    #[serde(default)]
    expires_in: Option<String>,
}

impl TokenResponse {
    fn into_session(self) -> IdentityResult<Session> {
        Ok(Session {
            user_id: parse_user_id(&self.local_id)?,
            email: self.email,
            id_token: self.id_token,
            refresh_token: self.refresh_token,
            expires_in: self.expires_in.and_then(|s| s.parse().ok()),
        })
    }
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn parse_user_id(local_id: &str) -> IdentityResult<UserId> {
    UserId::parse(local_id)
        .map_err(|e| IdentityError::InvalidResponse(format!("unusable user id: {e}")))
}

/// Maps a provider error message such as `"WEAK_PASSWORD : Password should be at least 6
/// characters"` onto an [`IdentityError`].
fn error_from_code(message: &str) -> IdentityError {
    let code = message.split([' ', ':']).next().unwrap_or_default();
    match code {
        "EMAIL_EXISTS" => IdentityError::EmailExists,
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "USER_DISABLED" => {
            IdentityError::InvalidCredentials
        }
        "INVALID_ID_TOKEN" | "TOKEN_EXPIRED" | "USER_NOT_FOUND" => IdentityError::Unauthenticated,
        _ => IdentityError::Rejected(message.to_owned()),
    }
}
