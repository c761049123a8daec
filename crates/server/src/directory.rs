use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use teamdraw_core::config::DirectoryConfig;
use teamdraw_core::MemberRecord;
use teamdraw_slack::roster::InMemoryRoster;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("member directory is missing `{0}`")]
    NotConfigured(&'static str),
    #[error("member directory request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("{endpoint} endpoint returned {status}")]
    Status { endpoint: &'static str, status: StatusCode },
    #[error("token endpoint returned an empty access token")]
    EmptyToken,
}

/// Source of member records used to resolve display names.
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    async fn fetch_members(&self) -> Result<Vec<MemberRecord>, DirectoryError>;
}

#[derive(Debug, Deserialize)]
struct AccessToken {
    #[serde(alias = "token")]
    access_token: String,
}

/// Directory served over HTTP. Every fetch first obtains an access token from
/// `token_url`, then passes it as the `access_token` query parameter.
#[derive(Clone, Debug)]
pub struct HttpMemberDirectory {
    client: Client,
    token_url: String,
    members_url: String,
}

impl HttpMemberDirectory {
    /// Returns `Ok(None)` when the directory is disabled.
    pub fn from_config(config: &DirectoryConfig) -> Result<Option<Self>, DirectoryError> {
        if !config.enabled {
            return Ok(None);
        }

        let base_url =
            config.base_url.as_deref().ok_or(DirectoryError::NotConfigured("directory.base_url"))?;
        let token_url = config
            .token_url
            .as_deref()
            .ok_or(DirectoryError::NotConfigured("directory.token_url"))?;
        let client = Client::builder().timeout(Duration::from_secs(config.timeout_secs)).build()?;

        Ok(Some(Self {
            client,
            token_url: token_url.to_string(),
            members_url: join_url(base_url, &config.members_path),
        }))
    }

    pub fn members_url(&self) -> &str {
        &self.members_url
    }

    async fn access_token(&self) -> Result<String, DirectoryError> {
        let response = self.client.get(&self.token_url).send().await?;
        if response.status() != StatusCode::OK {
            return Err(DirectoryError::Status { endpoint: "token", status: response.status() });
        }

        let token: AccessToken = response.json().await?;
        if token.access_token.trim().is_empty() {
            return Err(DirectoryError::EmptyToken);
        }
        Ok(token.access_token)
    }
}

#[async_trait]
impl MemberDirectory for HttpMemberDirectory {
    async fn fetch_members(&self) -> Result<Vec<MemberRecord>, DirectoryError> {
        let access_token = self.access_token().await?;
        let response = self
            .client
            .get(&self.members_url)
            .query(&[("access_token", access_token.as_str())])
            .send()
            .await?;
        if response.status() != StatusCode::OK {
            return Err(DirectoryError::Status { endpoint: "members", status: response.status() });
        }

        Ok(response.json().await?)
    }
}

fn join_url(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Loads every directory record into the roster. Returns how many were stored.
/// Failures are returned to the caller without being logged here.
pub async fn refresh_roster(
    directory: &dyn MemberDirectory,
    roster: &InMemoryRoster,
) -> Result<usize, DirectoryError> {
    let records = directory.fetch_members().await?;
    let stored = roster.upsert_members(records.into_iter().map(MemberRecord::into_member));
    info!(
        event_name = "system.directory.refreshed",
        correlation_id = "bootstrap",
        members = stored,
        "member directory loaded into roster"
    );
    Ok(stored)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::{extract::Query, http::StatusCode, routing::get, Json, Router};
    use serde_json::{json, Value};
    use teamdraw_core::config::DirectoryConfig;
    use teamdraw_core::MemberId;
    use teamdraw_slack::roster::{InMemoryRoster, RosterProvider};

    use super::{join_url, refresh_roster, DirectoryError, HttpMemberDirectory, MemberDirectory};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let address = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        format!("http://{address}")
    }

    fn config(base_url: &str) -> DirectoryConfig {
        DirectoryConfig {
            enabled: true,
            base_url: Some(format!("{base_url}/api/")),
            token_url: Some(format!("{base_url}/oauth")),
            members_path: "/members".to_string(),
            timeout_secs: 5,
        }
    }

    async fn members(Query(params): Query<HashMap<String, String>>) -> (StatusCode, Json<Value>) {
        if params.get("access_token").map(String::as_str) != Some("tok-1") {
            return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "bad token" })));
        }
        (
            StatusCode::OK,
            Json(json!([
                { "id": "U1", "name": "Aki", "tag": "aki#0001" },
                { "id": "U2", "name": "" }
            ])),
        )
    }

    #[test]
    fn disabled_directory_builds_nothing() {
        let config = DirectoryConfig { enabled: false, ..config("http://localhost") };
        assert!(HttpMemberDirectory::from_config(&config).expect("config").is_none());
    }

    #[test]
    fn members_url_joins_base_and_path_with_one_slash() {
        let directory = HttpMemberDirectory::from_config(&config("http://localhost:9"))
            .expect("config")
            .expect("enabled");
        assert_eq!(directory.members_url(), "http://localhost:9/api/members");
        assert_eq!(join_url("http://a", "b"), "http://a/b");
    }

    #[tokio::test]
    async fn fetches_token_then_members_and_fills_roster() {
        let base = serve(
            Router::new()
                .route("/oauth", get(|| async { Json(json!({ "access_token": "tok-1" })) }))
                .route("/api/members", get(members)),
        )
        .await;
        let directory =
            HttpMemberDirectory::from_config(&config(&base)).expect("config").expect("enabled");
        let roster = InMemoryRoster::new();

        let stored = refresh_roster(&directory, &roster).await.expect("refresh");

        assert_eq!(stored, 2);
        let aki = roster.resolve_member(&MemberId("U1".to_string())).await.expect("roster");
        assert_eq!(aki.display_name, "Aki");
        assert_eq!(aki.tag.as_deref(), Some("aki#0001"));
        let unnamed = roster.resolve_member(&MemberId("U2".to_string())).await.expect("roster");
        assert_eq!(unnamed.display_name, "U2");
    }

    #[tokio::test]
    async fn accepts_legacy_token_field_name() {
        let base = serve(
            Router::new()
                .route("/oauth", get(|| async { Json(json!({ "token": "tok-1" })) }))
                .route("/api/members", get(members)),
        )
        .await;
        let directory =
            HttpMemberDirectory::from_config(&config(&base)).expect("config").expect("enabled");

        assert_eq!(directory.fetch_members().await.expect("members").len(), 2);
    }

    #[tokio::test]
    async fn non_ok_statuses_become_status_errors() {
        let base = serve(
            Router::new()
                .route("/oauth", get(|| async { Json(json!({ "access_token": "wrong" })) }))
                .route("/api/members", get(members)),
        )
        .await;
        let directory =
            HttpMemberDirectory::from_config(&config(&base)).expect("config").expect("enabled");
        let roster = InMemoryRoster::new();

        let error = refresh_roster(&directory, &roster).await.expect_err("unauthorized");

        assert!(matches!(
            error,
            DirectoryError::Status { endpoint: "members", status } if status == StatusCode::UNAUTHORIZED
        ));
        assert_eq!(roster.member_count(), 0);
    }

    #[tokio::test]
    async fn empty_token_is_rejected() {
        let base = serve(
            Router::new().route("/oauth", get(|| async { Json(json!({ "access_token": " " })) })),
        )
        .await;
        let directory =
            HttpMemberDirectory::from_config(&config(&base)).expect("config").expect("enabled");

        assert!(matches!(directory.fetch_members().await, Err(DirectoryError::EmptyToken)));
    }
}
