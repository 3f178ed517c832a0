// handlers/settings.rs
use actix_web::{get, put, web, HttpResponse};
use futures::future::join_all;
use serde::Deserialize;

use super::auth::AdminUser;
use crate::error::{ApiError, ApiResult, OrUpstream};
use crate::models::settings::{group_settings, group_social, Setting, SettingsOutcome, SocialAccount, UpdateSettingsRequest};
use crate::store::{fetch, fetch_one, Database, Query, Row};
use crate::types::ApiResponse;
use crate::validation::required;

const TABLE: &str = "settings";
const SOCIAL: &str = "social_media";
const MSG_FETCH_FAILED: &str = "Error mengambil pengaturan";

#[derive(Debug, Deserialize)]
pub struct CategoryFilter {
    pub category: Option<String>,
}

#[get("")]
pub async fn list(db: web::Data<Database>, filter: web::Query<CategoryFilter>) -> ApiResult<HttpResponse> {
    let mut query = Query::table(TABLE);
    if let Some(category) = required(&filter.category) {
        query = query.eq("category", category);
    }
    let settings: Vec<Setting> = fetch(db.client(), &query).await.or_upstream(MSG_FETCH_FAILED)?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(group_settings(settings))))
}

#[get("/{id}")]
pub async fn get_one(db: web::Data<Database>, path: web::Path<String>) -> ApiResult<HttpResponse> {
    let setting: Setting = fetch_one(db.client(), Query::table(TABLE).eq("id", path.as_str()))
        .await
        .or_upstream(MSG_FETCH_FAILED)?
        .ok_or_else(|| ApiError::not_found("Pengaturan tidak ditemukan"))?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(setting)))
}

/// One independent update per key, issued concurrently. Keys that fail or
/// match no row are reported back rather than rolled back.
#[put("")]
pub async fn update(
    _admin: AdminUser,
    db: web::Data<Database>,
    body: web::Json<UpdateSettingsRequest>,
) -> ApiResult<HttpResponse> {
    let Some(serde_json::Value::Object(entries)) = body.into_inner().settings else {
        return Err(ApiError::bad_request("Format pengaturan tidak valid"));
    };

    let store = db.admin_client();
    let results = join_all(entries.iter().map(|(key, value)| async move {
        let mut patch = Row::new();
        patch.insert("value".into(), value.clone());
        let outcome = store
            .update(&Query::table(TABLE).eq("id", key.as_str()), patch)
            .await;
        (key.clone(), outcome)
    }))
    .await;

    let mut outcome = SettingsOutcome::default();
    for (key, result) in results {
        match result {
            Ok(rows) if !rows.is_empty() => outcome.updated.push(key),
            Ok(_) => {
                tracing::warn!(%key, "setting update matched no row");
                outcome.failed.push(key);
            }
            Err(err) => {
                tracing::error!(%key, error = %err, "setting update failed");
                outcome.failed.push(key);
            }
        }
    }

    if outcome.failed.is_empty() {
        Ok(HttpResponse::Ok().json(ApiResponse::ok(outcome).with_message("Pengaturan berhasil diupdate")))
    } else {
        let mut body = ApiResponse::ok(outcome).with_message("Sebagian pengaturan gagal diupdate");
        body.success = false;
        Ok(HttpResponse::InternalServerError().json(body))
    }
}

#[get("/social/accounts")]
pub async fn social_accounts(db: web::Data<Database>) -> ApiResult<HttpResponse> {
    let accounts: Vec<SocialAccount> = fetch(
        db.client(),
        &Query::table(SOCIAL).eq("is_active", true).order_by("display_order", true),
    )
    .await
    .or_upstream("Error mengambil data media sosial")?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(group_social(accounts))))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/settings")
            .service(social_accounts)
            .service(list)
            .service(update)
            .service(get_one),
    );
}

#[cfg(test)]
mod tests {
    use crate::handlers::testing::Context;
    use actix_web::{http::StatusCode, test, App};
    use serde_json::{json, Value};

    async fn seeded() -> Context {
        let ctx = Context::new().await;
        ctx.seed(
            "settings",
            json!([
                {"id": "clinic_name", "category": "general", "value": "Klinik Sehat"},
                {"id": "phone", "category": "general", "value": "0812-0000"},
                {"id": "hours", "category": "schedule", "value": {"mon": "08:00-16:00"}},
            ]),
        )
        .await;
        ctx.seed(
            "social_media",
            json!([
                {"platform": "instagram", "account_name": "klinik.b", "account_url": "https://instagram.com/klinik.b", "is_active": true, "display_order": 2},
                {"platform": "instagram", "account_name": "klinik.a", "account_url": "https://instagram.com/klinik.a", "is_active": true, "display_order": 1},
                {"platform": "tiktok", "account_name": "lama", "account_url": "https://tiktok.com/@lama", "is_active": false, "display_order": 1},
            ]),
        )
        .await;
        ctx
    }

    #[actix_web::test]
    async fn listing_groups_by_category_and_filters() {
        let ctx = seeded().await;
        let app = test::init_service(App::new().configure(|c| ctx.register(c))).await;

        let req = test::TestRequest::get().uri("/api/settings").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["general"]["clinic_name"], "Klinik Sehat");
        assert_eq!(body["data"]["schedule"]["hours"]["mon"], "08:00-16:00");

        let req = test::TestRequest::get().uri("/api/settings?category=schedule").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert!(body["data"].get("general").is_none());

        let req = test::TestRequest::get().uri("/api/settings/phone").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["value"], "0812-0000");

        let req = test::TestRequest::get().uri("/api/settings/missing").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn social_accounts_are_active_and_ordered() {
        let ctx = seeded().await;
        let app = test::init_service(App::new().configure(|c| ctx.register(c))).await;

        let req = test::TestRequest::get().uri("/api/settings/social/accounts").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["instagram"][0]["name"], "klinik.a");
        assert_eq!(body["data"]["instagram"][1]["url"], "https://instagram.com/klinik.b");
        assert!(body["data"].get("tiktok").is_none());
    }

    #[actix_web::test]
    async fn bulk_update_reports_each_key() {
        let ctx = seeded().await;
        let app = test::init_service(App::new().configure(|c| ctx.register(c))).await;

        let req = test::TestRequest::put()
            .uri("/api/settings")
            .insert_header(ctx.admin())
            .set_json(json!({"settings": {"clinic_name": "Klinik Sehat Sentosa", "hours": {"mon": "09:00-17:00"}}}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["failed"], json!([]));
        assert_eq!(body["data"]["updated"].as_array().unwrap().len(), 2);

        let req = test::TestRequest::get().uri("/api/settings/clinic_name").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["value"], "Klinik Sehat Sentosa");

        let req = test::TestRequest::put()
            .uri("/api/settings")
            .insert_header(ctx.admin())
            .set_json(json!({"settings": {"phone": "0813", "no_such_key": 1}}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["data"]["updated"], json!(["phone"]));
        assert_eq!(body["data"]["failed"], json!(["no_such_key"]));

        for bad in [json!({}), json!({"settings": "x"}), json!({"settings": [1]})] {
            let req = test::TestRequest::put()
                .uri("/api/settings")
                .insert_header(ctx.admin())
                .set_json(bad)
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
        }
    }
}
