// handlers/services.rs
use actix_web::{delete, get, post, put, web, HttpResponse};
use serde_json::{json, Value};

use super::auth::{AdminUser, Viewer};
use crate::clock;
use crate::error::{ApiError, ApiResult, OrUpstream};
use crate::models::catalogue::{
    group_catalogue, CreateCategoryRequest, CreateServiceRequest, Service, ServiceCategory, ServiceDetail,
    UpdateCategoryRequest, UpdateServiceRequest, DEFAULT_CATEGORY_TYPE,
};
use crate::store::{decode_rows, fetch, fetch_one, patch_of, to_insert_row, Database, Query};
use crate::types::ApiResponse;
use crate::validation::{parse_price, required};

const SERVICES: &str = "services";
const CATEGORIES: &str = "service_categories";

const MSG_NOT_FOUND: &str = "Layanan tidak ditemukan";
const MSG_FETCH_FAILED: &str = "Error mengambil data layanan";
const MSG_CATEGORY_NOT_FOUND: &str = "Kategori tidak ditemukan";
const MSG_CATEGORY_FAILED: &str = "Error mengelola kategori";
const MSG_NOTHING_TO_UPDATE: &str = "Tidak ada data untuk diupdate";

#[get("")]
pub async fn list(db: web::Data<Database>) -> ApiResult<HttpResponse> {
    let categories: Vec<ServiceCategory> = fetch(
        db.client(),
        &Query::table(CATEGORIES).eq("is_active", true).order_by("display_order", true),
    )
    .await
    .or_upstream(MSG_FETCH_FAILED)?;
    let services: Vec<Service> = fetch(
        db.client(),
        &Query::table(SERVICES).eq("is_active", true).order_by("display_order", true),
    )
    .await
    .or_upstream(MSG_FETCH_FAILED)?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(group_catalogue(categories, &services))))
}

/// Inactive services are only shown to admins.
#[get("/{id}")]
pub async fn get_one(
    viewer: Viewer,
    db: web::Data<Database>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let service: Service = fetch_one(db.client(), Query::table(SERVICES).eq("id", path.as_str()))
        .await
        .or_upstream(MSG_FETCH_FAILED)?
        .filter(|s: &Service| s.is_active || viewer.is_admin)
        .ok_or_else(|| ApiError::not_found(MSG_NOT_FOUND))?;
    let category: Option<ServiceCategory> = fetch_one(
        db.client(),
        Query::table(CATEGORIES).eq("id", service.category_id.as_str()),
    )
    .await
    .or_upstream(MSG_FETCH_FAILED)?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(ServiceDetail {
        service,
        service_categories: category,
    })))
}

#[post("")]
pub async fn create(
    _admin: AdminUser,
    db: web::Data<Database>,
    body: web::Json<CreateServiceRequest>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    let (Some(category_id), Some(name), Some(price)) =
        (required(&body.category_id), required(&body.name), required(&body.price))
    else {
        return Err(ApiError::bad_request("Category ID, nama, dan harga harus diisi"));
    };

    let failed = "Error menambahkan layanan";
    let category: Option<ServiceCategory> =
        fetch_one(db.client(), Query::table(CATEGORIES).eq("id", category_id))
            .await
            .or_upstream(failed)?;
    if category.is_none() {
        return Err(ApiError::bad_request(MSG_CATEGORY_NOT_FOUND));
    }

    let service = Service {
        id: format!("{category_id}_{}", clock::millis()),
        category_id: category_id.to_string(),
        name: name.to_string(),
        price: price.to_string(),
        price_numeric: Some(body.price_numeric.filter(|n| *n != 0).unwrap_or_else(|| parse_price(price))),
        image_url: required(&body.image_url).map(str::to_string),
        is_active: true,
        display_order: body.display_order,
    };
    let row = to_insert_row(&service).or_upstream(failed)?;
    let inserted = db.admin_client().insert(SERVICES, vec![row]).await.or_upstream(failed)?;
    let created = decode_rows::<Service>(inserted)
        .or_upstream(failed)?
        .into_iter()
        .next()
        .unwrap_or(service);
    tracing::info!(service_id = %created.id, "service created");

    Ok(HttpResponse::Created().json(ApiResponse::ok(created).with_message("Layanan berhasil ditambahkan")))
}

#[put("/{id}")]
pub async fn update(
    _admin: AdminUser,
    db: web::Data<Database>,
    path: web::Path<String>,
    body: web::Json<UpdateServiceRequest>,
) -> ApiResult<HttpResponse> {
    let mut patch = patch_of(body.into_inner().fields()?);
    if patch.is_empty() {
        return Err(ApiError::bad_request(MSG_NOTHING_TO_UPDATE));
    }
    // A new label without an explicit amount re-derives the amount.
    if !patch.contains_key("price_numeric") {
        if let Some(label) = patch.get("price").and_then(Value::as_str) {
            let amount = parse_price(label);
            patch.insert("price_numeric".into(), json!(amount));
        }
    }

    let failed = "Error mengupdate layanan";
    let updated = db
        .admin_client()
        .update(&Query::table(SERVICES).eq("id", path.as_str()), patch)
        .await
        .or_upstream(failed)?;
    let service = decode_rows::<Service>(updated)
        .or_upstream(failed)?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found(MSG_NOT_FOUND))?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(service).with_message("Layanan berhasil diupdate")))
}

#[delete("/{id}")]
pub async fn delete_one(
    _admin: AdminUser,
    db: web::Data<Database>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let removed = db
        .admin_client()
        .delete(&Query::table(SERVICES).eq("id", path.as_str()))
        .await
        .or_upstream("Error menghapus layanan")?;
    if removed.is_empty() {
        return Err(ApiError::not_found(MSG_NOT_FOUND));
    }
    Ok(HttpResponse::Ok().json(ApiResponse::message("Layanan berhasil dihapus")))
}

#[get("/categories")]
pub async fn list_categories(_admin: AdminUser, db: web::Data<Database>) -> ApiResult<HttpResponse> {
    let categories: Vec<ServiceCategory> = fetch(
        db.admin_client(),
        &Query::table(CATEGORIES).order_by("display_order", true),
    )
    .await
    .or_upstream(MSG_CATEGORY_FAILED)?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(categories)))
}

#[post("/categories")]
pub async fn create_category(
    _admin: AdminUser,
    db: web::Data<Database>,
    body: web::Json<CreateCategoryRequest>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    let (Some(id), Some(title)) = (required(&body.id), required(&body.title)) else {
        return Err(ApiError::bad_request("ID dan judul kategori harus diisi"));
    };

    let existing: Option<ServiceCategory> = fetch_one(db.admin_client(), Query::table(CATEGORIES).eq("id", id))
        .await
        .or_upstream(MSG_CATEGORY_FAILED)?;
    if existing.is_some() {
        return Err(ApiError::Conflict("Kategori sudah ada".into()));
    }

    let category = ServiceCategory {
        id: id.to_string(),
        title: title.to_string(),
        description: required(&body.description).map(str::to_string),
        kind: Some(required(&body.kind).unwrap_or(DEFAULT_CATEGORY_TYPE).to_string()),
        is_active: body.is_active.unwrap_or(true),
        display_order: body.display_order,
    };
    let row = to_insert_row(&category).or_upstream(MSG_CATEGORY_FAILED)?;
    let inserted = db
        .admin_client()
        .insert(CATEGORIES, vec![row])
        .await
        .or_upstream(MSG_CATEGORY_FAILED)?;
    let created = decode_rows::<ServiceCategory>(inserted)
        .or_upstream(MSG_CATEGORY_FAILED)?
        .into_iter()
        .next()
        .unwrap_or(category);

    Ok(HttpResponse::Created().json(ApiResponse::ok(created).with_message("Kategori berhasil ditambahkan")))
}

#[put("/categories/{id}")]
pub async fn update_category(
    _admin: AdminUser,
    db: web::Data<Database>,
    path: web::Path<String>,
    body: web::Json<UpdateCategoryRequest>,
) -> ApiResult<HttpResponse> {
    let patch = patch_of(body.into_inner().fields()?);
    if patch.is_empty() {
        return Err(ApiError::bad_request(MSG_NOTHING_TO_UPDATE));
    }
    let updated = db
        .admin_client()
        .update(&Query::table(CATEGORIES).eq("id", path.as_str()), patch)
        .await
        .or_upstream(MSG_CATEGORY_FAILED)?;
    let category = decode_rows::<ServiceCategory>(updated)
        .or_upstream(MSG_CATEGORY_FAILED)?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found(MSG_CATEGORY_NOT_FOUND))?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(category).with_message("Kategori berhasil diupdate")))
}

/// Refused while any service still points at the category.
#[delete("/categories/{id}")]
pub async fn delete_category(
    _admin: AdminUser,
    db: web::Data<Database>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let dependants = db
        .admin_client()
        .select(&Query::table(SERVICES).eq("category_id", path.as_str()).limit(1))
        .await
        .or_upstream(MSG_CATEGORY_FAILED)?;
    if !dependants.is_empty() {
        return Err(ApiError::Conflict(
            "Kategori masih memiliki layanan, hapus atau pindahkan layanan terlebih dahulu".into(),
        ));
    }

    let removed = db
        .admin_client()
        .delete(&Query::table(CATEGORIES).eq("id", path.as_str()))
        .await
        .or_upstream(MSG_CATEGORY_FAILED)?;
    if removed.is_empty() {
        return Err(ApiError::not_found(MSG_CATEGORY_NOT_FOUND));
    }
    Ok(HttpResponse::Ok().json(ApiResponse::message("Kategori berhasil dihapus")))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/services")
            .service(list)
            .service(create)
            .service(list_categories)
            .service(create_category)
            .service(update_category)
            .service(delete_category)
            .service(get_one)
            .service(update)
            .service(delete_one),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::Context;
    use crate::store::Store;
    use actix_web::{http::StatusCode, test, App};

    #[actix_web::test]
    async fn public_menu_groups_active_services_in_order() {
        let ctx = Context::new().await;
        ctx.seed_catalogue().await;
        let app = test::init_service(App::new().configure(|c| ctx.register(c))).await;

        let req = test::TestRequest::get().uri("/api/services").to_request();
        let raw = test::call_and_read_body(&app, req).await;
        let text = std::str::from_utf8(&raw).unwrap();
        assert!(text.find("\"facial\":").unwrap() < text.find("\"body\":").unwrap());
        assert!(!text.contains("\"old\""));

        let body: Value = serde_json::from_str(text).unwrap();
        let data = body["data"].as_object().unwrap();
        assert_eq!(data.len(), 2);
        let facial = data["facial"]["options"].as_array().unwrap();
        assert_eq!(facial.len(), 2);
        assert_eq!(facial[0]["id"], "facial_2");
        assert_eq!(facial[1]["price"], "Rp 150.000");
        assert_eq!(data["body"]["type"], "multiple");
        assert_eq!(data["body"]["options"][0]["image"], "/img/lulur.jpg");
    }

    #[actix_web::test]
    async fn inactive_service_is_admin_only_by_id() {
        let ctx = Context::new().await;
        ctx.seed_catalogue().await;
        let app = test::init_service(App::new().configure(|c| ctx.register(c))).await;

        let req = test::TestRequest::get().uri("/api/services/facial_1").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["name"], "Facial Basic");
        assert_eq!(body["data"]["service_categories"]["title"], "Facial");

        let req = test::TestRequest::get().uri("/api/services/facial_3").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get()
            .uri("/api/services/facial_3")
            .insert_header(ctx.admin())
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::get().uri("/api/services/nope").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn category_then_service_round_trip() {
        let ctx = Context::new().await;
        let app = test::init_service(App::new().configure(|c| ctx.register(c))).await;

        let req = test::TestRequest::post()
            .uri("/api/services/categories")
            .insert_header(ctx.admin())
            .set_json(json!({"id": "laser", "title": "Laser", "display_order": 1}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["type"], "single");

        let req = test::TestRequest::post()
            .uri("/api/services")
            .insert_header(ctx.admin())
            .set_json(json!({"category_id": "laser", "name": "Laser Rejuve", "price": "Rp 450.000"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        let id = body["data"]["id"].as_str().unwrap().to_string();
        assert!(id.starts_with("laser_"));
        assert_eq!(body["data"]["price_numeric"], 450000);

        let req = test::TestRequest::get().uri("/api/services").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let option = &body["data"]["laser"]["options"][0];
        assert_eq!(option["id"], id.as_str());
        assert_eq!(option["name"], "Laser Rejuve");
        assert_eq!(option["price"], "Rp 450.000");

        let req = test::TestRequest::post()
            .uri("/api/services")
            .insert_header(ctx.admin())
            .set_json(json!({"category_id": "ghost", "name": "X", "price": "Rp 1"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/api/services")
            .insert_header(ctx.admin())
            .set_json(json!({"category_id": "laser", "name": "X"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn updates_are_partial_and_deletes_report_missing_rows() {
        let ctx = Context::new().await;
        ctx.seed_catalogue().await;
        let app = test::init_service(App::new().configure(|c| ctx.register(c))).await;

        let req = test::TestRequest::put()
            .uri("/api/services/facial_1")
            .insert_header(ctx.admin())
            .set_json(json!({"price": "Rp 175.000", "is_active": false}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["name"], "Facial Basic");
        assert_eq!(body["data"]["price_numeric"], 175000);
        assert_eq!(body["data"]["is_active"], false);

        let req = test::TestRequest::put()
            .uri("/api/services/facial_1")
            .insert_header(ctx.admin())
            .set_json(json!({}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::put()
            .uri("/api/services/missing")
            .insert_header(ctx.admin())
            .set_json(json!({"name": "X"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::delete()
            .uri("/api/services/body_1")
            .insert_header(ctx.admin())
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
        let req = test::TestRequest::delete()
            .uri("/api/services/body_1")
            .insert_header(ctx.admin())
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::delete().uri("/api/services/facial_2").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn bad_partial_updates_leave_the_menu_intact() {
        let ctx = Context::new().await;
        ctx.seed_catalogue().await;
        let app = test::init_service(App::new().configure(|c| ctx.register(c))).await;

        for (id, payload) in [
            ("facial_1", json!({"name": null})),
            ("facial_1", json!({"price": "  "})),
            ("facial_2", json!({"is_active": "yes"})),
            ("facial_2", json!({"display_order": "first"})),
        ] {
            let req = test::TestRequest::put()
                .uri(&format!("/api/services/{id}"))
                .insert_header(ctx.admin())
                .set_json(payload)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["success"], false);
        }

        let req = test::TestRequest::put()
            .uri("/api/services/categories/facial")
            .insert_header(ctx.admin())
            .set_json(json!({"title": null}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let stored = ctx.store.select(&Query::table(SERVICES).eq("id", "facial_2")).await.unwrap();
        assert_eq!(stored[0]["is_active"], json!(true));

        let req = test::TestRequest::get().uri("/api/services").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        let facial = body["data"]["facial"]["options"].as_array().unwrap();
        assert_eq!(facial.len(), 2);
        assert_eq!(facial[1]["name"], "Facial Basic");
        assert_eq!(body["data"]["facial"]["title"], "Facial");

        // Nullable columns may still be cleared.
        let req = test::TestRequest::put()
            .uri("/api/services/body_1")
            .insert_header(ctx.admin())
            .set_json(json!({"image_url": null}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert!(body["data"]["image_url"].is_null());
    }

    #[actix_web::test]
    async fn category_delete_is_blocked_while_services_reference_it() {
        let ctx = Context::new().await;
        ctx.seed_catalogue().await;
        let app = test::init_service(App::new().configure(|c| ctx.register(c))).await;

        let req = test::TestRequest::get()
            .uri("/api/services/categories")
            .insert_header(ctx.admin())
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 3);

        let req = test::TestRequest::delete()
            .uri("/api/services/categories/body")
            .insert_header(ctx.admin())
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

        let req = test::TestRequest::delete()
            .uri("/api/services/categories/old")
            .insert_header(ctx.admin())
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::put()
            .uri("/api/services/categories/body")
            .insert_header(ctx.admin())
            .set_json(json!({"title": "Body Care", "type": "single"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["title"], "Body Care");
        assert_eq!(body["data"]["type"], "single");

        let req = test::TestRequest::post()
            .uri("/api/services/categories")
            .insert_header(ctx.admin())
            .set_json(json!({"id": "body", "title": "Lagi"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);
    }
}
