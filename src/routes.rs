use axum::extract::DefaultBodyLimit;
use axum::{middleware, Router};
use std::sync::Arc;
use tower_governor::key_extractor::PeerIpKeyExtractor;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::admin::{live as admin_live, users as admin_users};
use crate::auth::accounts;
use crate::auth::middleware::JwtSecret;
use crate::chat::{messages as chat_messages, reactions as chat_reactions};
use crate::events;
use crate::feed::{interactions as feed_interactions, posts as feed_posts};
use crate::notifications;
use crate::polls;
use crate::state::AppState;
use crate::uploads;
use crate::ws::handler as ws_handler;

/// Inject the JWT secret into request extensions so the Claims extractor can find it.
async fn inject_jwt_secret(
    axum::extract::State(state): axum::extract::State<AppState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: middleware::Next,
) -> axum::response::Response {
    req.extensions_mut()
        .insert(JwtSecret(state.jwt_secret.clone()));
    next.run(req).await
}

/// Build the full axum Router with all routes and middleware.
pub fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    // Rate limiting on credential endpoints: bursts of 10, refilling at
    // one request per 6 seconds per IP
    let governor_config = Arc::new(
        GovernorConfigBuilder::default()
            .key_extractor(PeerIpKeyExtractor)
            .per_second(6)
            .burst_size(10)
            .finish()
            .expect("Failed to build governor config"),
    );
    let governor_limiter = governor_config.limiter().clone();

    // Spawn background task to clean up rate limiter state
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            governor_limiter.retain_recent();
        }
    });

    // Credential routes with rate limiting
    let auth_routes = Router::new()
        .route("/api/auth/signup", axum::routing::post(accounts::signup))
        .route("/api/auth/login", axum::routing::post(accounts::login))
        .layer(GovernorLayer {
            config: governor_config,
        });

    // Account routes (JWT required — Claims extractor validates token)
    let account_routes = Router::new()
        .route("/api/auth/me", axum::routing::get(accounts::get_me))
        .route("/api/auth/me", axum::routing::put(accounts::update_me))
        .route(
            "/api/auth/password",
            axum::routing::put(accounts::change_password),
        )
        .route("/api/auth/avatar", axum::routing::post(uploads::upload_avatar));

    let feed_routes = Router::new()
        .route("/api/posts", axum::routing::get(feed_posts::list_posts))
        .route("/api/posts", axum::routing::post(feed_posts::create_post))
        .route(
            "/api/posts/media",
            axum::routing::post(uploads::upload_post_media),
        )
        .route("/api/posts/{id}", axum::routing::delete(feed_posts::delete_post))
        .route(
            "/api/posts/{id}/like",
            axum::routing::post(feed_interactions::toggle_like),
        )
        .route(
            "/api/posts/{id}/comment",
            axum::routing::post(feed_interactions::add_comment),
        );

    let chat_routes = Router::new()
        .route(
            "/api/messages/audio",
            axum::routing::post(uploads::upload_message_audio),
        )
        .route(
            "/api/messages/{conv}",
            axum::routing::get(chat_messages::get_conv_messages),
        )
        .route(
            "/api/messages",
            axum::routing::post(chat_messages::create_message),
        )
        .route(
            "/api/messages/{id}/react",
            axum::routing::post(chat_reactions::toggle_reaction),
        );

    let event_routes = Router::new()
        .route("/api/events", axum::routing::get(events::list_events))
        .route("/api/events", axum::routing::post(events::create_event))
        .route(
            "/api/events/{id}/join",
            axum::routing::post(events::toggle_participation),
        )
        .route("/api/events/{id}", axum::routing::delete(events::delete_event));

    let poll_routes = Router::new()
        .route("/api/polls", axum::routing::get(polls::list_polls))
        .route("/api/polls", axum::routing::post(polls::create_poll))
        .route("/api/polls/{id}/vote", axum::routing::post(polls::vote))
        .route("/api/polls/{id}/close", axum::routing::patch(polls::close_poll))
        .route("/api/polls/{id}", axum::routing::delete(polls::delete_poll));

    let notif_routes = Router::new()
        .route("/api/notifs", axum::routing::get(notifications::list_notifs))
        .route(
            "/api/notifs/read",
            axum::routing::post(notifications::mark_all_read),
        );

    let live_routes = Router::new()
        .route("/api/live", axum::routing::get(admin_live::live_status))
        .route(
            "/api/admin/live/stop",
            axum::routing::post(admin_live::stop_live),
        );

    let admin_routes = Router::new()
        .route("/api/admin/users", axum::routing::get(admin_users::list_users))
        .route(
            "/api/admin/users/{id}/role",
            axum::routing::patch(admin_users::set_role),
        )
        .route(
            "/api/admin/users/{id}/suspend",
            axum::routing::patch(admin_users::set_suspension),
        )
        .route(
            "/api/admin/users/{id}",
            axum::routing::delete(admin_users::delete_user),
        );

    // WebSocket endpoint (auth via query param, not JWT header)
    let ws_routes = Router::new().route("/ws", axum::routing::get(ws_handler::ws_upgrade));

    // Health check
    let health = Router::new().route("/health", axum::routing::get(health_check));

    Router::new()
        .merge(auth_routes)
        .merge(account_routes)
        .merge(feed_routes)
        .merge(chat_routes)
        .merge(event_routes)
        .merge(poll_routes)
        .merge(notif_routes)
        .merge(live_routes)
        .merge(admin_routes)
        .merge(ws_routes)
        .merge(health)
        .nest_service("/uploads", ServeDir::new(&state.uploads_dir))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            inject_jwt_secret,
        ))
        .with_state(state)
}

/// Basic health check endpoint
async fn health_check() -> &'static str {
    "ok"
}
