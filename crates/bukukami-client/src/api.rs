//! Typed client for the remote story service.
//!
//! Every request goes through an injected [`Transport`]. In the application
//! that is the worker handle, so the caching policies see all traffic.

use std::sync::Arc;

use async_trait::async_trait;
use bukukami_shared::constants::OFFLINE_MESSAGE;
use bukukami_shared::http::{FormPart, HttpRequest, HttpResponse, Method, Transport};
use bukukami_shared::types::{NewStory, PushSubscription, Story};
use bukukami_shared::AppError;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};
use url::Url;

use crate::auth::TokenStore;

/// Story reads and writes.
#[async_trait]
pub trait StoryService: Send + Sync {
    async fn list_stories(&self, page: u32, size: u32) -> Result<Vec<Story>, AppError>;

    /// Returns the server's confirmation message.
    async fn submit_story(&self, story: &NewStory) -> Result<String, AppError>;
}

/// Server-side registration of push subscriptions.
#[async_trait]
pub trait PushRegistry: Send + Sync {
    async fn register(&self, subscription: &PushSubscription) -> Result<(), AppError>;
    async fn unregister(&self, endpoint: &str) -> Result<(), AppError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    pub user_id: String,
    pub name: String,
    pub token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginEnvelope {
    login_result: LoginResult,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoriesEnvelope {
    #[serde(default)]
    list_story: Vec<Story>,
}

pub struct RemoteApi {
    transport: Arc<dyn Transport>,
    base_url: Url,
    tokens: Arc<dyn TokenStore>,
}

impl RemoteApi {
    pub fn new(transport: Arc<dyn Transport>, base_url: Url, tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            transport,
            base_url,
            tokens,
        }
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    fn endpoint(&self, path: &str) -> Result<Url, AppError> {
        let raw = format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path);
        Url::parse(&raw).map_err(|e| AppError::InvalidInput(format!("{raw}: {e}")))
    }

    fn bearer(&self) -> Result<String, AppError> {
        self.tokens.token().ok_or(AppError::AuthRequired)
    }

    async fn call(&self, request: HttpRequest) -> Result<serde_json::Value, AppError> {
        debug!(method = %request.method, url = %request.url, "api request");
        let response = self.transport.send(request).await?;
        check(response)
    }

    pub async fn register_user(&self, name: &str, email: &str, password: &str) -> Result<String, AppError> {
        let request = HttpRequest::new(Method::Post, self.endpoint("/register")?)
            .json(&json!({ "name": name, "email": email, "password": password }))?;
        let body = self.call(request).await?;
        Ok(message_of(&body).unwrap_or_else(|| "User created".to_string()))
    }

    /// Sign in and keep the returned token.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResult, AppError> {
        let request = HttpRequest::new(Method::Post, self.endpoint("/login")?)
            .json(&json!({ "email": email, "password": password }))?;
        let body = self.call(request).await?;
        let envelope: LoginEnvelope = serde_json::from_value(body).map_err(|e| {
            AppError::RemoteRejected {
                status: 200,
                message: format!("unexpected login response: {e}"),
            }
        })?;
        self.tokens.set_token(&envelope.login_result.token)?;
        info!(user = %envelope.login_result.user_id, "signed in");
        Ok(envelope.login_result)
    }

    pub fn logout(&self) -> Result<(), AppError> {
        self.tokens.clear()
    }

    pub fn is_signed_in(&self) -> bool {
        self.tokens.token().is_some()
    }
}

#[async_trait]
impl StoryService for RemoteApi {
    async fn list_stories(&self, page: u32, size: u32) -> Result<Vec<Story>, AppError> {
        let token = self.bearer()?;
        let mut url = self.endpoint("/stories")?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("size", &size.to_string());

        let body = self.call(HttpRequest::get(url).bearer(&token)).await?;
        let envelope: StoriesEnvelope = serde_json::from_value(body).map_err(|e| {
            AppError::RemoteRejected {
                status: 200,
                message: format!("unexpected story list: {e}"),
            }
        })?;
        Ok(envelope.list_story)
    }

    async fn submit_story(&self, story: &NewStory) -> Result<String, AppError> {
        let token = self.bearer()?;

        let mut parts = vec![
            FormPart::Text {
                name: "description".into(),
                value: story.description.clone(),
            },
            FormPart::File {
                name: "photo".into(),
                file_name: story.photo.file_name.clone(),
                content_type: story.photo.content_type.clone(),
                data: story.photo.data.clone(),
            },
        ];
        if let (Some(lat), Some(lon)) = (story.lat, story.lon) {
            parts.push(FormPart::Text {
                name: "lat".into(),
                value: lat.to_string(),
            });
            parts.push(FormPart::Text {
                name: "lon".into(),
                value: lon.to_string(),
            });
        }

        let request = HttpRequest::new(Method::Post, self.endpoint("/stories")?)
            .bearer(&token)
            .multipart(parts);
        let body = self.call(request).await?;
        Ok(message_of(&body).unwrap_or_else(|| "Story created successfully".to_string()))
    }
}

#[async_trait]
impl PushRegistry for RemoteApi {
    async fn register(&self, subscription: &PushSubscription) -> Result<(), AppError> {
        let token = self.bearer()?;
        let request = HttpRequest::new(Method::Post, self.endpoint("/notifications/subscribe")?)
            .bearer(&token)
            .json(subscription)?;
        self.call(request).await?;
        Ok(())
    }

    async fn unregister(&self, endpoint: &str) -> Result<(), AppError> {
        let token = self.bearer()?;
        let request = HttpRequest::new(Method::Delete, self.endpoint("/notifications/subscribe")?)
            .bearer(&token)
            .json(&json!({ "endpoint": endpoint }))?;
        self.call(request).await?;
        Ok(())
    }
}

/// Map a response onto the error taxonomy, returning the JSON body of a
/// successful one.
fn check(response: HttpResponse) -> Result<serde_json::Value, AppError> {
    if response.is_synthesized_offline() {
        return Err(AppError::NetworkUnavailable(OFFLINE_MESSAGE.to_string()));
    }

    let body = response.json_body();
    if !response.is_success() {
        let message = body
            .as_ref()
            .and_then(message_of)
            .unwrap_or_else(|| response.text());
        return Err(AppError::RemoteRejected {
            status: response.status,
            message,
        });
    }

    Ok(body.unwrap_or(serde_json::Value::Null))
}

fn message_of(body: &serde_json::Value) -> Option<String> {
    body.get("message")
        .and_then(|m| m.as_str())
        .map(str::to_string)
}
