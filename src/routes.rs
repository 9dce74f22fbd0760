use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::handlers::{
    admin, auth, briefings, comments, cutoffs, exams, health_check, health_check_db, points, posts, profile,
    rankings, upload, verification,
};
use crate::middleware::create_middleware_stack;
use crate::models::upload::MAX_UPLOAD_BYTES;
use crate::state::AppState;

/// Multipart framing on top of the largest accepted file.
const UPLOAD_BODY_LIMIT: usize = MAX_UPLOAD_BYTES + 64 * 1024;

/// Create the Axum router with all endpoints and middleware
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check endpoints
        .route("/health", get(health_check))
        .route("/health/db", get(health_check_db))
        // Exam catalog
        .route("/api/exams", get(exams::list_exams))
        .route("/api/exams/:exam/boards", get(exams::exam_boards))
        .route("/api/exams/:exam/popular", get(exams::popular_posts))
        // Auth glue
        .route("/api/auth/check-availability", post(auth::check_availability))
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/send-code", post(auth::send_code))
        .route("/api/auth/oauth/start", get(auth::oauth_start))
        .route("/api/auth/oauth/finalize", post(auth::oauth_finalize))
        .route("/api/profile/update", post(profile::update_profile))
        // Community boards
        .route("/api/posts", post(posts::create_post))
        .route("/api/posts/like", post(posts::toggle_like))
        .route("/api/boards/:exam/:board/posts", get(posts::list_board_posts))
        .route("/api/boards/:exam/:board/posts/:post_id", get(posts::get_post))
        .route("/api/comments", post(comments::create_comment))
        .route("/api/comments/adopt", post(comments::adopt_comment))
        // Rankings, cutoffs, points and briefings
        .route("/api/rankings/:exam", get(rankings::get_rankings))
        .route(
            "/api/rankings/:exam/vote",
            get(rankings::get_vote_status).post(rankings::cast_vote),
        )
        .route("/api/cutoffs", get(cutoffs::list_cutoffs))
        .route("/api/points/me", get(points::my_points))
        .route("/api/daily/:exam", get(briefings::daily_briefings))
        .route("/api/verification/request", post(verification::request_verification))
        .route(
            "/api/upload",
            post(upload::upload_file).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        // Administration
        .route("/api/admin/me", get(admin::me))
        .route("/api/admin/bootstrap", post(admin::bootstrap))
        .route(
            "/api/admin/rankings/:exam",
            get(admin::list_rankings)
                .post(admin::upsert_ranking)
                .delete(admin::delete_ranking),
        )
        .route(
            "/api/admin/cutoffs",
            get(admin::list_cutoffs)
                .post(admin::upsert_cutoff)
                .delete(admin::delete_cutoff),
        )
        .route("/api/admin/verifications", get(admin::list_verifications))
        .route("/api/admin/verifications/:id", post(admin::decide_verification))
        .with_state(state)
        .layer(create_middleware_stack())
}
