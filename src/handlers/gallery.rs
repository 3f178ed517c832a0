// handlers/gallery.rs
use actix_web::{delete, get, post, put, web, HttpResponse};

use super::auth::{AdminUser, Viewer};
use crate::error::{ApiError, ApiResult, OrUpstream};
use crate::models::gallery::{CreateGalleryRequest, GalleryImage, NewGalleryImage, UpdateGalleryRequest};
use crate::store::{decode_rows, fetch, fetch_one, patch_of, to_insert_row, Database, Query};
use crate::types::ApiResponse;
use crate::validation::required;

const TABLE: &str = "gallery";
const MSG_NOT_FOUND: &str = "Gambar tidak ditemukan";

#[get("")]
pub async fn list(db: web::Data<Database>) -> ApiResult<HttpResponse> {
    let images: Vec<GalleryImage> = fetch(
        db.client(),
        &Query::table(TABLE).eq("is_active", true).order_by("display_order", true),
    )
    .await
    .or_upstream("Error mengambil data galeri")?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(images)))
}

#[get("/{id}")]
pub async fn get_one(
    viewer: Viewer,
    db: web::Data<Database>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let image = fetch_one(db.client(), Query::table(TABLE).eq("id", path.as_str()))
        .await
        .or_upstream("Error mengambil data gambar")?
        .filter(|img: &GalleryImage| img.is_active || viewer.is_admin)
        .ok_or_else(|| ApiError::not_found(MSG_NOT_FOUND))?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(image)))
}

#[post("")]
pub async fn create(
    _admin: AdminUser,
    db: web::Data<Database>,
    body: web::Json<CreateGalleryRequest>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    let (Some(title), Some(image_url)) = (required(&body.title), required(&body.image_url)) else {
        return Err(ApiError::bad_request("Judul dan URL gambar harus diisi"));
    };

    let failed = "Error menambahkan gambar";
    let image = NewGalleryImage {
        title: title.to_string(),
        description: required(&body.description).map(str::to_string),
        image_url: image_url.to_string(),
        category: required(&body.category).map(str::to_string),
        is_active: true,
        display_order: body.display_order,
    };
    let row = to_insert_row(&image).or_upstream(failed)?;
    let inserted = db.admin_client().insert(TABLE, vec![row]).await.or_upstream(failed)?;
    let created = decode_rows::<GalleryImage>(inserted)
        .or_upstream(failed)?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::Internal("gallery insert returned no row".into()))?;
    tracing::info!(image_id = %created.id, "gallery image added");

    Ok(HttpResponse::Created().json(ApiResponse::ok(created).with_message("Gambar berhasil ditambahkan")))
}

#[put("/{id}")]
pub async fn update(
    _admin: AdminUser,
    db: web::Data<Database>,
    path: web::Path<String>,
    body: web::Json<UpdateGalleryRequest>,
) -> ApiResult<HttpResponse> {
    let patch = patch_of(body.into_inner().fields()?);
    if patch.is_empty() {
        return Err(ApiError::bad_request("Tidak ada data untuk diupdate"));
    }
    let failed = "Error mengupdate gambar";
    let updated = db
        .admin_client()
        .update(&Query::table(TABLE).eq("id", path.as_str()), patch)
        .await
        .or_upstream(failed)?;
    let image = decode_rows::<GalleryImage>(updated)
        .or_upstream(failed)?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found(MSG_NOT_FOUND))?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(image).with_message("Gambar berhasil diupdate")))
}

#[delete("/{id}")]
pub async fn delete_one(
    _admin: AdminUser,
    db: web::Data<Database>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let removed = db
        .admin_client()
        .delete(&Query::table(TABLE).eq("id", path.as_str()))
        .await
        .or_upstream("Error menghapus gambar")?;
    if removed.is_empty() {
        return Err(ApiError::not_found(MSG_NOT_FOUND));
    }
    Ok(HttpResponse::Ok().json(ApiResponse::message("Gambar berhasil dihapus")))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/gallery")
            .service(list)
            .service(create)
            .service(get_one)
            .service(update)
            .service(delete_one),
    );
}

#[cfg(test)]
mod tests {
    use crate::handlers::testing::Context;
    use actix_web::{http::StatusCode, test, App};
    use serde_json::{json, Value};

    #[actix_web::test]
    async fn admin_manages_images_and_public_sees_active_ones() {
        let ctx = Context::new().await;
        let app = test::init_service(App::new().configure(|c| ctx.register(c))).await;

        let mut ids = Vec::new();
        for (title, order) in [("Ruang Tunggu", 2), ("Ruang Perawatan", 1)] {
            let req = test::TestRequest::post()
                .uri("/api/gallery")
                .insert_header(ctx.admin())
                .set_json(json!({"title": title, "image_url": format!("/img/{order}.jpg"), "display_order": order}))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::CREATED);
            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["data"]["is_active"], true);
            ids.push(body["data"]["id"].clone());
        }

        let req = test::TestRequest::get().uri("/api/gallery").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"][0]["title"], "Ruang Perawatan");
        assert_eq!(body["data"][1]["title"], "Ruang Tunggu");

        let hidden = ids[0].to_string();
        let req = test::TestRequest::put()
            .uri(&format!("/api/gallery/{hidden}"))
            .insert_header(ctx.admin())
            .set_json(json!({"is_active": false, "category": "fasilitas"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["category"], "fasilitas");
        assert_eq!(body["data"]["title"], "Ruang Tunggu");

        let req = test::TestRequest::get().uri("/api/gallery").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let req = test::TestRequest::get().uri(&format!("/api/gallery/{hidden}")).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
        let req = test::TestRequest::get()
            .uri(&format!("/api/gallery/{hidden}"))
            .insert_header(ctx.admin())
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/gallery/{hidden}"))
            .insert_header(ctx.admin())
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
        let req = test::TestRequest::delete()
            .uri(&format!("/api/gallery/{hidden}"))
            .insert_header(ctx.admin())
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn required_columns_cannot_be_cleared() {
        let ctx = Context::new().await;
        let app = test::init_service(App::new().configure(|c| ctx.register(c))).await;

        let req = test::TestRequest::post()
            .uri("/api/gallery")
            .insert_header(ctx.admin())
            .set_json(json!({"title": "Lobi", "image_url": "/img/lobi.jpg"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let id = body["data"]["id"].to_string();

        for payload in [json!({"title": null}), json!({"image_url": ""}), json!({"is_active": "yes"})] {
            let req = test::TestRequest::put()
                .uri(&format!("/api/gallery/{id}"))
                .insert_header(ctx.admin())
                .set_json(payload)
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
        }

        let req = test::TestRequest::get().uri("/api/gallery").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"][0]["title"], "Lobi");
        assert_eq!(body["data"][0]["is_active"], true);
    }

    #[actix_web::test]
    async fn create_requires_title_and_image() {
        let ctx = Context::new().await;
        let app = test::init_service(App::new().configure(|c| ctx.register(c))).await;

        let req = test::TestRequest::post()
            .uri("/api/gallery")
            .insert_header(ctx.admin())
            .set_json(json!({"title": "Tanpa gambar"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/api/gallery")
            .set_json(json!({"title": "A", "image_url": "/a.jpg"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }
}
