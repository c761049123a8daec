use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use teamdraw_slack::roster::InMemoryRoster;
use tracing::{debug, error, info};

#[derive(Clone)]
pub struct HealthState {
    roster: Arc<InMemoryRoster>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RosterSummary {
    pub members: usize,
    pub active_rooms: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub roster: RosterSummary,
    pub checked_at: String,
}

pub fn router(roster: Arc<InMemoryRoster>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/wake", post(wake))
        .with_state(HealthState { roster })
}

pub async fn spawn(
    bind_address: &str,
    port: u16,
    roster: Arc<InMemoryRoster>,
) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.health.start",
        correlation_id = "bootstrap",
        bind_address = %address,
        "health endpoint started"
    );

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router(roster)).await {
            error!(
                event_name = "system.health.error",
                correlation_id = "bootstrap",
                error = %error,
                "health endpoint server terminated unexpectedly"
            );
        }
    });

    Ok(())
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let payload = HealthResponse {
        status: "ready",
        service: HealthCheck {
            status: "ready",
            detail: "teamdraw-server runtime initialized".to_string(),
        },
        roster: RosterSummary {
            members: state.roster.member_count(),
            active_rooms: state.roster.active_room_count(),
        },
        checked_at: Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(payload))
}

/// Keep-alive ping for hosts that idle processes without inbound traffic.
pub async fn wake() -> StatusCode {
    debug!(event_name = "system.health.wake", correlation_id = "wake", "wake ping received");
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        extract::State,
        http::{Request, StatusCode},
        Json,
    };
    use serde_json::Value;
    use teamdraw_core::{Member, MemberId};
    use teamdraw_slack::roster::InMemoryRoster;
    use tower::ServiceExt;

    use crate::health::{health, router, HealthState};

    #[tokio::test]
    async fn health_reports_roster_counts() {
        let roster = Arc::new(InMemoryRoster::new());
        roster.upsert_members([Member::new("U1", "Aki"), Member::new("U2", "Ren")]);
        roster.record_voice_state(MemberId("U1".to_string()), Some("R1".to_string()));

        let (status, Json(payload)) = health(State(HealthState { roster })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.service.status, "ready");
        assert_eq!(payload.roster.members, 2);
        assert_eq!(payload.roster.active_rooms, 1);
    }

    #[tokio::test]
    async fn health_route_serves_json() {
        let response = router(Arc::new(InMemoryRoster::new()))
            .oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let payload: Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(payload["status"], "ready");
        assert_eq!(payload["roster"]["members"], 0);
        assert!(payload["checked_at"].as_str().is_some());
    }

    #[tokio::test]
    async fn wake_accepts_post_only() {
        let app = router(Arc::new(InMemoryRoster::new()));

        let posted = app
            .clone()
            .oneshot(
                Request::builder().method("POST").uri("/wake").body(Body::empty()).expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(posted.status(), StatusCode::OK);

        let fetched = app
            .oneshot(Request::builder().uri("/wake").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(fetched.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
