use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::{body::Body, http::Request, middleware::Next, response::Response};

use crate::adapter::handler::error::AppError;
use crate::domain::entity::current_user::CurrentUser;
use crate::domain::repository::PermissionRepository;

type PermissionFuture = Pin<Box<dyn Future<Output = Result<Response, AppError>> + Send>>;

/// `PERM:{action}` ポリシー。(area, controller) に対して action を許可されたユーザーのみ通す。
pub fn require_permission(
    permissions: Arc<dyn PermissionRepository>,
    area: &'static str,
    controller: &'static str,
    action: &'static str,
) -> impl Fn(Request<Body>, Next) -> PermissionFuture + Clone {
    move |req, next| Box::pin(permission_check(permissions.clone(), req, next, area, controller, action))
}

async fn permission_check(
    permissions: Arc<dyn PermissionRepository>,
    req: Request<Body>,
    next: Next,
    area: &str,
    controller: &str,
    action: &str,
) -> Result<Response, AppError> {
    let user = req
        .extensions()
        .get::<CurrentUser>()
        .cloned()
        .ok_or_else(|| AppError::unauthorized("Missing authenticated user"))?;

    let allowed = permissions
        .has_permission(&user.user_id, area, controller, action)
        .await?;
    if !allowed {
        tracing::info!(user_id = %user.user_id, area, controller, action, "permission denied");
        return Err(AppError::forbidden(&format!(
            "Insufficient permissions for action: {area}/{controller}/{action}"
        )));
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repository::permission_repository::MockPermissionRepository;
    use axum::routing::get;
    use axum::Router;
    use http::StatusCode;
    use tower::ServiceExt;

    fn app(repo: MockPermissionRepository, user: Option<CurrentUser>) -> Router {
        let perm = require_permission(Arc::new(repo), "Form", "FormData", "Delete");
        Router::new()
            .route("/x", get(|| async { "ok" }))
            .route_layer(axum::middleware::from_fn(move |req, next| perm(req, next)))
            .layer(axum::middleware::from_fn(move |mut req: Request<Body>, next: Next| {
                let user = user.clone();
                async move {
                    if let Some(user) = user {
                        req.extensions_mut().insert(user);
                    }
                    next.run(req).await
                }
            }))
    }

    fn alice() -> CurrentUser {
        CurrentUser {
            user_id: "alice".to_string(),
            user_name: "Alice".to_string(),
        }
    }

    #[tokio::test]
    async fn test_allowed_user_passes() {
        let mut repo = MockPermissionRepository::new();
        repo.expect_has_permission()
            .withf(|user, area, controller, action| {
                user == "alice" && area == "Form" && controller == "FormData" && action == "Delete"
            })
            .returning(|_, _, _, _| Ok(true));
        let resp = app(repo, Some(alice()))
            .oneshot(Request::builder().uri("/x").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_denied_user_is_forbidden() {
        let mut repo = MockPermissionRepository::new();
        repo.expect_has_permission().returning(|_, _, _, _| Ok(false));
        let resp = app(repo, Some(alice()))
            .oneshot(Request::builder().uri("/x").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_missing_user_is_unauthorized() {
        let mut repo = MockPermissionRepository::new();
        repo.expect_has_permission().never();
        let resp = app(repo, None)
            .oneshot(Request::builder().uri("/x").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
