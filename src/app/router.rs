use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;

use crate::{
    api::http::{
        access as access_http,
        comments::{self as comments_http, COMPOSER_ID_HEADER},
        moderation as moderation_http,
    },
    app::{middleware::security_headers, state::AppState},
    auth::{
        middleware::{identity_middleware, lenient_identity_middleware},
        rate_limit::submit_rate_limit_middleware,
    },
    telemetry::request_logging_middleware,
};

pub fn build_router(state: AppState, cors_origin: HeaderValue) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(cors_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            HeaderName::from_static(COMPOSER_ID_HEADER),
        ]);

    let public_routes = Router::new()
        .route("/health", get(access_http::health_handle))
        .route(
            "/api/resources/{resource_type}/{resource_id}/comments",
            get(comments_http::list_comments_handle).merge(
                post(comments_http::submit_comment_handle).route_layer(
                    middleware::from_fn_with_state(state.clone(), submit_rate_limit_middleware),
                ),
            ),
        )
        .route(
            "/api/resources/{resource_type}/{resource_id}/reply-target",
            get(comments_http::get_reply_target_handle)
                .put(comments_http::set_reply_target_handle),
        );

    let access_routes = Router::new()
        .route("/api/access", get(access_http::access_decision_handle))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            lenient_identity_middleware,
        ));

    let gated_routes = Router::new()
        .route(
            "/api/moderation/queue",
            get(moderation_http::moderation_queue_handle),
        )
        .route(
            "/api/moderation/comments/{comment_id}/approve",
            post(moderation_http::approve_comment_handle),
        )
        .route(
            "/api/moderation/comments/{comment_id}/reject",
            post(moderation_http::reject_comment_handle),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            identity_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(access_routes)
        .merge(gated_routes)
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::{jwt::JwtConfig, rate_limit::build_submit_limiter},
        models::{profiles::Profile, roles::Role},
        realtime::{registry::new_threads, thread::ThreadSettings},
        repositories::memory::{InMemoryCommentStore, InMemoryProfileStore},
    };
    use axum::{
        body::{Body, to_bytes},
        extract::{ConnectInfo, Request},
        http::StatusCode,
        response::Response,
    };
    use chrono::Utc;
    use serde_json::{Value, json};
    use std::{net::SocketAddr, sync::Arc, time::Duration};
    use tower::util::ServiceExt;
    use uuid::Uuid;

    const RECONCILE_DELAY: Duration = Duration::from_millis(3000);

    struct Harness {
        state: AppState,
        profiles: Arc<InMemoryProfileStore>,
    }

    impl Harness {
        fn new(submit_per_minute: u32) -> Self {
            let profiles = Arc::new(InMemoryProfileStore::new());
            let state = AppState {
                comments: Arc::new(InMemoryCommentStore::new()),
                profiles: profiles.clone(),
                jwt_config: JwtConfig {
                    secret: "router-test-secret".to_string(),
                    ttl: chrono::Duration::hours(1),
                    issuer: None,
                    audience: None,
                },
                threads: new_threads(),
                thread_settings: ThreadSettings {
                    reconcile_delay: RECONCILE_DELAY,
                    depth_cap: 5,
                },
                submit_limiter: build_submit_limiter(submit_per_minute),
            };
            Self { state, profiles }
        }

        fn router(&self) -> Router {
            build_router(
                self.state.clone(),
                HeaderValue::from_static("http://localhost:5173"),
            )
        }

        fn token_for(&self, role: Option<Role>, is_active: bool) -> String {
            let user_id = Uuid::new_v4();
            if let Some(role) = role {
                self.profiles.upsert(Profile {
                    user_id,
                    display_name: "Tester".to_string(),
                    role,
                    is_active,
                    created_at: Utc::now(),
                });
            }
            self.state.jwt_config.issue(user_id).unwrap()
        }

        async fn send(&self, req: Request<Body>) -> Response {
            self.router().oneshot(req).await.unwrap()
        }
    }

    fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let mut req = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 1], 4000))));
        req
    }

    fn from_composer(mut req: Request<Body>, composer: &str) -> Request<Body> {
        req.headers_mut().insert(
            COMPOSER_ID_HEADER,
            HeaderValue::from_str(composer).unwrap(),
        );
        req
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn submission(comment: &str) -> Value {
        json!({ "name": "Reader", "website": null, "comment": comment, "parent_id": null })
    }

    #[tokio::test]
    async fn health_reports_ok_with_security_headers() {
        let harness = Harness::new(10);
        let response = harness
            .send(request(Method::GET, "/health", None, None))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::X_FRAME_OPTIONS).unwrap(),
            "DENY"
        );
    }

    #[tokio::test]
    async fn submitted_comment_is_hidden_until_approved() {
        let harness = Harness::new(10);
        let uri = "/api/resources/hymn/42/comments";

        let response = harness
            .send(request(Method::POST, uri, None, Some(submission("Lovely"))))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        assert_eq!(body["comment"]["status"], "pending");
        assert_eq!(body["comment"]["resource_type"], "hymn");

        let response = harness.send(request(Method::GET, uri, None, None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["total"], 0);
        assert_eq!(body["data"], json!([]));
    }

    #[tokio::test]
    async fn invalid_submission_is_rejected() {
        let harness = Harness::new(10);
        let response = harness
            .send(request(
                Method::POST,
                "/api/resources/hymn/42/comments",
                None,
                Some(submission("   ")),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn submissions_are_rate_limited_per_address() {
        let harness = Harness::new(1);
        let uri = "/api/resources/hymn/42/comments";

        let first = harness
            .send(request(Method::POST, uri, None, Some(submission("one"))))
            .await;
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = harness
            .send(request(Method::POST, uri, None, Some(submission("two"))))
            .await;
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);

        let read = harness.send(request(Method::GET, uri, None, None)).await;
        assert_eq!(read.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn reply_targets_belong_to_one_composer() {
        let harness = Harness::new(10);
        let target_uri = "/api/resources/hymn/42/reply-target";
        let parent = Uuid::new_v4();

        let response = harness
            .send(from_composer(
                request(
                    Method::PUT,
                    target_uri,
                    None,
                    Some(json!({ "comment_id": parent })),
                ),
                "tab-a",
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["comment_id"], parent.to_string());

        let other = harness
            .send(from_composer(
                request(Method::GET, target_uri, None, None),
                "tab-b",
            ))
            .await;
        assert_eq!(json_body(other).await["comment_id"], Value::Null);

        let thread = harness
            .send(from_composer(
                request(Method::GET, "/api/resources/hymn/42/comments", None, None),
                "tab-a",
            ))
            .await;
        assert_eq!(json_body(thread).await["reply_target"], parent.to_string());

        harness
            .send(from_composer(
                request(
                    Method::POST,
                    "/api/resources/hymn/42/comments",
                    None,
                    Some(submission("reply")),
                ),
                "tab-a",
            ))
            .await;

        let response = harness
            .send(from_composer(
                request(Method::GET, target_uri, None, None),
                "tab-a",
            ))
            .await;
        assert_eq!(json_body(response).await["comment_id"], Value::Null);
    }

    #[tokio::test]
    async fn reply_target_needs_a_composer_id() {
        let harness = Harness::new(10);
        let target_uri = "/api/resources/hymn/42/reply-target";

        let missing = harness
            .send(request(Method::GET, target_uri, None, None))
            .await;
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

        let malformed = harness
            .send(from_composer(
                request(Method::GET, target_uri, None, None),
                "no spaces allowed",
            ))
            .await;
        assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn moderation_queue_requires_moderator() {
        let harness = Harness::new(10);
        let uri = "/api/moderation/queue";

        let anonymous = harness.send(request(Method::GET, uri, None, None)).await;
        assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

        let bad_token = harness
            .send(request(Method::GET, uri, Some("not-a-token"), None))
            .await;
        assert_eq!(bad_token.status(), StatusCode::UNAUTHORIZED);

        let no_profile = harness.token_for(None, true);
        let response = harness
            .send(request(Method::GET, uri, Some(&no_profile), None))
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(json_body(response).await["error"]["code"], "PROFILE_INCOMPLETE");

        let deactivated = harness.token_for(Some(Role::Admin), false);
        let response = harness
            .send(request(Method::GET, uri, Some(&deactivated), None))
            .await;
        assert_eq!(json_body(response).await["error"]["code"], "ACCOUNT_DEACTIVATED");

        let editor = harness.token_for(Some(Role::Editor), true);
        let response = harness
            .send(request(Method::GET, uri, Some(&editor), None))
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "INSUFFICIENT_ROLE");
        assert_eq!(body["error"]["details"]["required"], "moderator");
        assert_eq!(body["error"]["details"]["actual"], "editor");
    }

    #[tokio::test(start_paused = true)]
    async fn approval_reaches_the_public_thread() {
        let harness = Harness::new(10);
        let thread_uri = "/api/resources/hymn/42/comments";
        let moderator = harness.token_for(Some(Role::Moderator), true);

        let submitted = json_body(
            harness
                .send(request(
                    Method::POST,
                    thread_uri,
                    None,
                    Some(submission("Please approve me")),
                ))
                .await,
        )
        .await;
        let comment_id = submitted["comment"]["id"].as_str().unwrap().to_string();

        let queue = json_body(
            harness
                .send(request(
                    Method::GET,
                    "/api/moderation/queue",
                    Some(&moderator),
                    None,
                ))
                .await,
        )
        .await;
        assert_eq!(queue["total"], 1);
        let approve_href = queue["data"][0]["actions"][0]["href"]
            .as_str()
            .unwrap()
            .to_string();
        assert_eq!(
            approve_href,
            format!("/api/moderation/comments/{}/approve", comment_id)
        );

        let response = harness
            .send(request(Method::POST, &approve_href, Some(&moderator), None))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let outcome = json_body(response).await;
        assert_eq!(outcome["outcome"], "updated");
        assert_eq!(outcome["status"], "approved");
        assert_eq!(outcome["previous"], "pending");

        tokio::time::sleep(RECONCILE_DELAY + Duration::from_millis(10)).await;

        let thread = json_body(
            harness
                .send(request(Method::GET, thread_uri, None, None))
                .await,
        )
        .await;
        assert_eq!(thread["total"], 1);
        assert_eq!(thread["data"][0]["id"], comment_id);
        assert_eq!(thread["data"][0]["depth"], 0);

        let again = harness
            .send(request(
                Method::POST,
                &format!("/api/moderation/comments/{}/reject", comment_id),
                Some(&moderator),
                None,
            ))
            .await;
        let again = json_body(again).await;
        assert_eq!(again["outcome"], "already_decided");
        assert_eq!(again["status"], "approved");
    }

    #[tokio::test]
    async fn moderating_unknown_comment_is_not_found_outcome() {
        let harness = Harness::new(10);
        let admin = harness.token_for(Some(Role::Admin), true);
        let response = harness
            .send(request(
                Method::POST,
                &format!("/api/moderation/comments/{}/approve", Uuid::new_v4()),
                Some(&admin),
                None,
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["outcome"], "not_found");
    }

    #[tokio::test]
    async fn access_endpoint_reports_decisions() {
        let harness = Harness::new(10);

        let response = harness
            .send(request(Method::GET, "/api/access", None, None))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["decision"], "unauthenticated");

        let editor = harness.token_for(Some(Role::Editor), true);
        let response = harness
            .send(request(
                Method::GET,
                "/api/access?required=moderator",
                Some(&editor),
                None,
            ))
            .await;
        let body = json_body(response).await;
        assert_eq!(body["decision"], "insufficientRole");
        assert_eq!(body["actual"], "editor");

        let response = harness
            .send(request(
                Method::GET,
                "/api/access?required=editor",
                Some(&editor),
                None,
            ))
            .await;
        assert_eq!(json_body(response).await["decision"], "granted");

        let response = harness
            .send(request(Method::GET, "/api/access?required=owner", None, None))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unusable_token_reads_as_unauthenticated_on_access() {
        let harness = Harness::new(10);

        let response = harness
            .send(request(
                Method::GET,
                "/api/access?required=moderator",
                Some("not-a-token"),
                None,
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["decision"], "unauthenticated");

        let response = harness
            .send(request(
                Method::GET,
                "/api/moderation/queue",
                Some("not-a-token"),
                None,
            ))
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_resource_key_is_rejected() {
        let harness = Harness::new(10);
        let response = harness
            .send(request(
                Method::GET,
                "/api/resources/Not%20Valid/42/comments",
                None,
                None,
            ))
            .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
