pub mod delete_guard_handler;
pub mod dropdown_handler;
pub mod error;
pub mod field_config_handler;
pub mod form_data_handler;
pub mod form_master_handler;
pub mod system_handler;

use std::sync::Arc;

use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::adapter::middleware::auth::{auth_middleware, FormDesignerAuthState};
use crate::adapter::middleware::rbac::require_permission;
use crate::domain::repository::PermissionRepository;
use crate::infrastructure::database::Database;
use crate::usecase;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn Database>,
    pub form_masters_uc: Arc<usecase::ManageFormMastersUseCase>,
    pub field_configs_uc: Arc<usecase::ManageFieldConfigsUseCase>,
    pub validation_rules_uc: Arc<usecase::ManageValidationRulesUseCase>,
    pub dropdowns_uc: Arc<usecase::ManageDropdownsUseCase>,
    pub delete_guards_uc: Arc<usecase::ManageDeleteGuardsUseCase>,
    pub form_data_uc: Arc<usecase::FormDataUseCase>,
    pub master_detail_uc: Arc<usecase::MasterDetailUseCase>,
    pub many_to_many_uc: Arc<usecase::ManyToManyUseCase>,
    pub orphan_cleanup_uc: Arc<usecase::OrphanCleanupUseCase>,
    pub permissions: Arc<dyn PermissionRepository>,
    pub auth_state: Option<FormDesignerAuthState>,
}

const AREA_FORM: &str = "Form";
const CONTROLLER_DESIGNER: &str = "FormDesigner";
const CONTROLLER_DATA: &str = "FormData";

fn designer_read_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/forms", get(form_master_handler::list_forms))
        .route("/api/v1/forms/{id}", get(form_master_handler::get_form))
        .route("/api/v1/schema/tables", get(form_master_handler::search_tables))
        .route("/api/v1/forms/{id}/fields", get(field_config_handler::list_fields))
        .route("/api/v1/fields/{id}/validation-rules", get(field_config_handler::list_rules))
        .route("/api/v1/dropdowns/{id}/options", get(dropdown_handler::list_options))
        .route("/api/v1/forms/{id}/delete-guards", get(delete_guard_handler::list_guards))
}

fn designer_edit_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/forms", post(form_master_handler::finalize))
        .route("/api/v1/forms/drafts", post(form_master_handler::save_header))
        .route("/api/v1/forms/{id}/status", put(form_master_handler::set_status))
        .route("/api/v1/forms/{id}/fields/ensure", post(field_config_handler::ensure_fields))
        .route("/api/v1/fields/{id}", put(field_config_handler::update_field))
        .route("/api/v1/fields/{id}/validation-rules", post(field_config_handler::create_rule))
        .route("/api/v1/validation-rules/{id}", put(field_config_handler::update_rule))
        .route("/api/v1/fields/{id}/dropdown", post(dropdown_handler::get_or_create))
        .route("/api/v1/dropdowns/{id}/options", put(dropdown_handler::replace_options))
        .route("/api/v1/dropdowns/preview", post(dropdown_handler::preview_sql))
        .route("/api/v1/dropdowns/{id}/sync", post(dropdown_handler::sync))
        .route("/api/v1/forms/{id}/dropdowns/sync", post(dropdown_handler::sync_all))
        .route("/api/v1/forms/{id}/delete-guards", post(delete_guard_handler::create_guard))
}

fn designer_delete_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/forms/{id}", delete(form_master_handler::delete_form))
        .route("/api/v1/fields/{id}", delete(field_config_handler::delete_field))
        .route("/api/v1/validation-rules/{id}", delete(field_config_handler::delete_rule))
        .route("/api/v1/delete-guards/{id}", delete(delete_guard_handler::delete_guard))
}

fn data_read_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/forms/{id}/data/search", post(form_data_handler::search))
        .route("/api/v1/forms/{id}/data/{row_id}", get(form_data_handler::get_row))
        .route("/api/v1/forms/{id}/master-detail/{row_id}", get(form_data_handler::get_master_detail))
        .route("/api/v1/forms/{id}/links/{base_id}", get(form_data_handler::list_linked))
        .route("/api/v1/forms/{id}/links/{base_id}/available", get(form_data_handler::list_unlinked))
}

fn data_edit_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/forms/{id}/data", post(form_data_handler::create_row))
        .route("/api/v1/forms/{id}/data/{row_id}", put(form_data_handler::update_row))
        .route("/api/v1/forms/{id}/master-detail", post(form_data_handler::save_master_detail))
        .route("/api/v1/forms/{id}/links/{base_id}", post(form_data_handler::add_links))
        .route("/api/v1/forms/{id}/links/{base_id}/remove", post(form_data_handler::remove_links))
}

fn data_delete_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/forms/{id}/data/{row_id}", delete(form_data_handler::delete_row))
        .route("/api/v1/forms/{id}/master-detail/{row_id}", delete(form_data_handler::delete_master_detail))
}

fn admin_routes() -> Router<AppState> {
    Router::new().route("/api/v1/admin/orphan-cleanup", post(system_handler::run_orphan_cleanup))
}

/// ルート群に `PERM:{action}` ポリシーを掛ける。
fn guarded(
    routes: Router<AppState>,
    permissions: &Arc<dyn PermissionRepository>,
    area: &'static str,
    controller: &'static str,
    action: &'static str,
) -> Router<AppState> {
    let perm = require_permission(permissions.clone(), area, controller, action);
    routes.route_layer(axum::middleware::from_fn(move |req, next| perm(req, next)))
}

pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/healthz", get(system_handler::healthz))
        .route("/readyz", get(system_handler::readyz))
        .route("/Enum/EnumList", get(system_handler::enum_list))
        .route("/Enum/EnumList/{name}", get(system_handler::enum_by_name));

    let api_routes = if let Some(ref auth_state) = state.auth_state {
        let p = &state.permissions;
        guarded(designer_read_routes(), p, AREA_FORM, CONTROLLER_DESIGNER, "Query")
            .merge(guarded(designer_edit_routes(), p, AREA_FORM, CONTROLLER_DESIGNER, "Edit"))
            .merge(guarded(designer_delete_routes(), p, AREA_FORM, CONTROLLER_DESIGNER, "Delete"))
            .merge(guarded(data_read_routes(), p, AREA_FORM, CONTROLLER_DATA, "Query"))
            .merge(guarded(data_edit_routes(), p, AREA_FORM, CONTROLLER_DATA, "Edit"))
            .merge(guarded(data_delete_routes(), p, AREA_FORM, CONTROLLER_DATA, "Delete"))
            .merge(guarded(admin_routes(), p, "System", "Maintenance", "Execute"))
            .layer(from_fn_with_state(auth_state.clone(), auth_middleware))
    } else {
        // 認証なし（開発環境用）
        designer_read_routes()
            .merge(designer_edit_routes())
            .merge(designer_delete_routes())
            .merge(data_read_routes())
            .merge(data_edit_routes())
            .merge(data_delete_routes())
            .merge(admin_routes())
    };

    public_routes
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::middleware::auth::tests::{config as auth_config, token};
    use crate::domain::entity::delete_guard::FormDeleteGuard;
    use crate::domain::entity::form_field_master::FormFieldMaster;
    use crate::domain::repository::permission_repository::MockPermissionRepository;
    use crate::domain::repository::SchemaRepository;
    use crate::domain::value_object::FormFunctionType;
    use crate::infrastructure::database::scripted::ScriptedDatabase;
    use crate::infrastructure::persistence::{delete_guard_store, form_master_store};
    use crate::usecase::test_support::{col, finalized_master, schema_repo};
    use axum::body::Body;
    use http::{Request, StatusCode};
    use k1s0_dynamic_sql::{DbRow, SqlValue};
    use tower::ServiceExt;
    use uuid::Uuid;

    fn state(db: &ScriptedDatabase, permissions: MockPermissionRepository, auth: bool) -> AppState {
        let db: Arc<dyn Database> = Arc::new(db.clone());
        let schema: Arc<dyn SchemaRepository> = Arc::new(schema_repo(vec![(
            "ITEMS",
            vec![col("ID", "int", true, true), col("NAME", "nvarchar", false, false)],
        )]));
        AppState {
            db: db.clone(),
            form_masters_uc: Arc::new(usecase::ManageFormMastersUseCase::new(db.clone(), schema.clone())),
            field_configs_uc: Arc::new(usecase::ManageFieldConfigsUseCase::new(db.clone(), schema.clone())),
            validation_rules_uc: Arc::new(usecase::ManageValidationRulesUseCase::new(db.clone())),
            dropdowns_uc: Arc::new(usecase::ManageDropdownsUseCase::new(db.clone())),
            delete_guards_uc: Arc::new(usecase::ManageDeleteGuardsUseCase::new(db.clone())),
            form_data_uc: Arc::new(usecase::FormDataUseCase::new(db.clone(), schema.clone())),
            master_detail_uc: Arc::new(usecase::MasterDetailUseCase::new(
                db.clone(),
                schema.clone(),
                vec!["_NO".to_string()],
            )),
            many_to_many_uc: Arc::new(usecase::ManyToManyUseCase::new(db.clone(), schema)),
            orphan_cleanup_uc: Arc::new(usecase::OrphanCleanupUseCase::new(db, 24)),
            permissions: Arc::new(permissions),
            auth_state: auth.then(|| FormDesignerAuthState::new(&auth_config())),
        }
    }

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_healthz() {
        let app = router(state(&ScriptedDatabase::new(), MockPermissionRepository::new(), true));
        let resp = app
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_enum_list_by_name() {
        let app = router(state(&ScriptedDatabase::new(), MockPermissionRepository::new(), true));
        let resp = app
            .clone()
            .oneshot(Request::builder().uri("/Enum/EnumList/formcontroltype").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["IsSuccess"], true);
        assert_eq!(json["Data"][0]["Code"], "Text");

        let resp = app
            .oneshot(Request::builder().uri("/Enum/EnumList/Nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_api_requires_token() {
        let app = router(state(&ScriptedDatabase::new(), MockPermissionRepository::new(), true));
        let resp = app
            .oneshot(Request::builder().uri("/api/v1/forms").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(resp).await["Code"], "Unauthorized");
    }

    #[tokio::test]
    async fn test_delete_checks_delete_permission() {
        let mut permissions = MockPermissionRepository::new();
        permissions
            .expect_has_permission()
            .withf(|user, area, controller, action| {
                user == "alice" && area == "Form" && controller == "FormData" && action == "Delete"
            })
            .returning(|_, _, _, _| Ok(false));
        let app = router(state(&ScriptedDatabase::new(), permissions, true));
        let resp = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/api/v1/forms/{}/data/1", Uuid::new_v4()))
                    .header("Authorization", format!("Bearer {}", token("alice", "k1s0", 600)))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_missing_form_is_not_found_envelope() {
        let app = router(state(&ScriptedDatabase::new(), MockPermissionRepository::new(), false));
        let resp = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/v1/forms/{}", Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let json = body_json(resp).await;
        assert_eq!(json["IsSuccess"], false);
        assert_eq!(json["Code"], "NotFound");
    }

    #[tokio::test]
    async fn test_guarded_delete_is_conflict() {
        let db = ScriptedDatabase::new();
        let master: FormFieldMaster = finalized_master(FormFunctionType::MasterMaintenance, "ITEMS", None, None);
        let guard = FormDeleteGuard {
            id: Uuid::new_v4(),
            form_field_master_id: master.id,
            guard_sql: "SELECT 1 FROM [ORDERS] WHERE [ITEM_ID]=@ID".to_string(),
            error_message: "item is ordered".to_string(),
            rule_order: 1,
            is_enabled: true,
        };
        db.on_query("FROM [FORM_FIELD_Master]", vec![form_master_store::to_row(&master)]);
        db.on_query("SELECT * FROM [ITEMS]", vec![DbRow::from_pairs([("ID", SqlValue::from(5)), ("NAME", SqlValue::from("bolt"))])]);
        db.on_query("FROM [FORM_DELETE_GUARD]", vec![delete_guard_store::to_row(&guard)]);
        db.on_query("FROM [ORDERS]", vec![DbRow::from_pairs([("x", 1)])]);

        let app = router(state(&db, MockPermissionRepository::new(), false));
        let resp = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/api/v1/forms/{}/data/5", master.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let json = body_json(resp).await;
        assert_eq!(json["Code"], "DeleteBlocked");
        assert_eq!(json["Message"], "item is ordered");
        assert!(db.statements_matching("DELETE FROM [ITEMS]").is_empty());
    }

    #[tokio::test]
    async fn test_sync_rejects_write_sql() {
        let db = ScriptedDatabase::new();
        let app = router(state(&db, MockPermissionRepository::new(), false));
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/v1/dropdowns/{}/sync", Uuid::new_v4()))
                    .header("Content-Type", "application/json")
                    .body(Body::from(r#"{"Sql":"DELETE FROM [T]"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["Code"], "InvalidSql");
        assert!(db.statements().is_empty());
    }
}
