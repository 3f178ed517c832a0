// handlers/auth.rs
use actix_web::{dev::Payload, get, post, web, FromRequest, HttpRequest, HttpResponse};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use pasetors::{
    claims::{Claims as PasetoClaims, ClaimsValidationRules},
    keys::SymmetricKey,
    local,
    token::UntrustedToken,
    version4::V4,
};
use serde_json::{json, Value};
use sha2::Sha256;
use std::future::{ready, Ready};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::config::{AppConfig, TokenMode};
use crate::error::{ApiError, ApiResult, OrUpstream};
use crate::models::auth_types::{AuthResult, Claims, LoginRequest, LoginResponse, PublicUser, VerifyResponse};
use crate::store::{first_of, Database};
use crate::types::ApiResponse;
use crate::validation::required;

type HmacSha256 = Hmac<Sha256>;

const MSG_TOKEN_MISSING: &str = "Token tidak ditemukan";
const MSG_TOKEN_INVALID: &str = "Token tidak valid atau sudah expired";
const MSG_ADMIN_ONLY: &str = "Akses admin diperlukan";

fn base64url(data: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(data)
}

fn hs256_mac(secret: &[u8], header_b64: &str, payload_b64: &str) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(header_b64.as_bytes());
    mac.update(b".");
    mac.update(payload_b64.as_bytes());
    Some(mac)
}

/// Payload of an HS256 JWT whose signature checks out under `secret`.
fn verify_hs256(secret: &[u8], token: &str) -> Option<Value> {
    let mut parts = token.split('.');
    let (h, p, s) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    let header: Value = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(h).ok()?).ok()?;
    if header.get("alg").and_then(Value::as_str) != Some("HS256") {
        return None;
    }
    let signature = URL_SAFE_NO_PAD.decode(s).ok()?;
    // Constant-time comparison.
    hs256_mac(secret, h, p)?.verify_slice(&signature).ok()?;
    serde_json::from_slice(&URL_SAFE_NO_PAD.decode(p).ok()?).ok()
}

fn make_token_hmac(cfg: &AppConfig, claims: &Claims) -> Option<String> {
    let header = json!({"alg": "HS256", "typ": "JWT"});
    let header_b64 = base64url(&serde_json::to_vec(&header).ok()?);
    let payload_b64 = base64url(&serde_json::to_vec(claims).ok()?);
    let mac = hs256_mac(cfg.security.jwt_secret.as_bytes(), &header_b64, &payload_b64)?;
    let sig = base64url(&mac.finalize().into_bytes());
    Some(format!("{header_b64}.{payload_b64}.{sig}"))
}

fn validate_token_hmac(cfg: &AppConfig, token: &str) -> Option<Claims> {
    if cfg.security.jwt_secret.is_empty() {
        return None;
    }
    let payload = verify_hs256(cfg.security.jwt_secret.as_bytes(), token)?;
    let claims: Claims = serde_json::from_value(payload).ok()?;
    if claims.exp <= Utc::now().timestamp() {
        return None;
    }
    if claims.iss != cfg.security.token_iss || claims.aud != cfg.security.token_aud {
        return None;
    }
    Some(claims)
}

fn paseto_key(cfg: &AppConfig) -> Option<SymmetricKey<V4>> {
    let hex = cfg.security.paseto_v4_local_key_hex.trim();
    if hex.len() != 64 {
        return None;
    }
    let bytes = hex::decode(hex).ok()?;
    SymmetricKey::<V4>::from(&bytes).ok()
}

fn rfc3339(unix: i64) -> Option<String> {
    OffsetDateTime::from_unix_timestamp(unix).ok()?.format(&Rfc3339).ok()
}

fn unix(rfc3339: &str) -> Option<i64> {
    Some(OffsetDateTime::parse(rfc3339, &Rfc3339).ok()?.unix_timestamp())
}

fn make_token_paseto(cfg: &AppConfig, claims: &Claims) -> Option<String> {
    let key = paseto_key(cfg)?;
    let mut pclaims = PasetoClaims::new().ok()?;
    pclaims.issuer(&claims.iss).ok()?;
    pclaims.audience(&claims.aud).ok()?;
    pclaims.subject(&claims.user_id).ok()?;
    pclaims.issued_at(&rfc3339(claims.iat)?).ok()?;
    pclaims.not_before(&rfc3339(claims.iat)?).ok()?;
    pclaims.expiration(&rfc3339(claims.exp)?).ok()?;
    pclaims.add_additional("username", claims.username.clone()).ok()?;
    pclaims.add_additional("role", claims.role.clone()).ok()?;
    local::encrypt(&key, &pclaims, None, None).ok()
}

fn validate_token_paseto(cfg: &AppConfig, token: &str) -> Option<Claims> {
    let key = paseto_key(cfg)?;
    let untrusted = UntrustedToken::try_from(token).ok()?;
    // Default rules reject expired and not-yet-valid tokens.
    let rules = ClaimsValidationRules::new();
    let trusted = local::decrypt(&key, &untrusted, &rules, None, None).ok()?;
    let pc = trusted.payload_claims()?;
    let text = |name: &str| pc.get_claim(name).and_then(Value::as_str).map(str::to_string);

    let claims = Claims {
        user_id: text("sub")?,
        username: text("username").unwrap_or_default(),
        role: text("role").unwrap_or_default(),
        iss: text("iss").unwrap_or_default(),
        aud: text("aud").unwrap_or_default(),
        iat: text("iat").as_deref().and_then(unix).unwrap_or(0),
        exp: text("exp").as_deref().and_then(unix).unwrap_or(0),
    };
    if claims.iss != cfg.security.token_iss || claims.aud != cfg.security.token_aud {
        return None;
    }
    Some(claims)
}

pub fn make_token(cfg: &AppConfig, claims: &Claims) -> Option<String> {
    match cfg.security.token_mode {
        TokenMode::JwtHmac => make_token_hmac(cfg, claims),
        TokenMode::PasetoV4Local => make_token_paseto(cfg, claims),
    }
}

pub fn validate_token(cfg: &AppConfig, token: &str) -> Option<Claims> {
    match cfg.security.token_mode {
        TokenMode::JwtHmac => validate_token_hmac(cfg, token),
        TokenMode::PasetoV4Local => validate_token_paseto(cfg, token),
    }
}

/// Claims for a freshly authenticated user, valid for the configured TTL.
pub fn issue_claims(cfg: &AppConfig, user_id: &str, username: &str, role: &str) -> Claims {
    let now = Utc::now();
    let ttl = i64::try_from(cfg.security.token_ttl_seconds).unwrap_or(i64::MAX);
    Claims {
        user_id: user_id.to_string(),
        username: username.to_string(),
        role: role.to_string(),
        iss: cfg.security.token_iss.clone(),
        aud: cfg.security.token_aud.clone(),
        iat: now.timestamp(),
        exp: now.timestamp().saturating_add(ttl),
    }
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn config_of(req: &HttpRequest) -> ApiResult<&AppConfig> {
    req.app_data::<web::Data<AppConfig>>()
        .map(|data| data.get_ref())
        .ok_or_else(|| ApiError::Internal("application config is not registered".into()))
}

/// Claims of the request's bearer token: 401 without one, 403 when invalid.
pub fn authenticate(req: &HttpRequest) -> ApiResult<Claims> {
    let cfg = config_of(req)?;
    let token = bearer_token(req).ok_or_else(|| ApiError::Unauthorized(MSG_TOKEN_MISSING.into()))?;
    validate_token(cfg, token).ok_or_else(|| ApiError::Forbidden(MSG_TOKEN_INVALID.into()))
}

/// Guard for admin-only handlers.
#[derive(Debug, Clone)]
pub struct AdminUser(pub Claims);

impl FromRequest for AdminUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = authenticate(req).and_then(|claims| {
            if claims.is_admin() {
                Ok(AdminUser(claims))
            } else {
                tracing::warn!(user = %claims.username, role = %claims.role, path = %req.path(), "non-admin token on admin route");
                Err(ApiError::Forbidden(MSG_ADMIN_ONLY.into()))
            }
        });
        ready(result)
    }
}

/// Whether a public route is being called with a valid admin token.
/// Never fails; a bad or missing token simply means "not admin".
#[derive(Debug, Clone, Copy)]
pub struct Viewer {
    pub is_admin: bool,
}

impl FromRequest for Viewer {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let is_admin = authenticate(req).map(|c| c.is_admin()).unwrap_or(false);
        ready(Ok(Viewer { is_admin }))
    }
}

#[post("/login")]
pub async fn login(
    db: web::Data<Database>,
    cfg: web::Data<AppConfig>,
    body: web::Json<LoginRequest>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    let username = required(&body.username);
    let password = body.password.as_deref().filter(|p| !p.is_empty());
    let (Some(username), Some(password)) = (username, password) else {
        return Err(ApiError::bad_request("Username dan password harus diisi"));
    };

    let result = db
        .client()
        .rpc(
            "authenticate_user",
            json!({"input_username": username, "input_password": password}),
        )
        .await
        .or_upstream("Error saat autentikasi")?;
    let auth: Option<AuthResult> = first_of(result).or_upstream("Error saat autentikasi")?;

    let auth = match auth {
        Some(auth) if auth.success => auth,
        other => {
            tracing::info!(%username, "login rejected");
            let message = other
                .and_then(|a| a.message)
                .unwrap_or_else(|| "Username atau password salah".into());
            return Err(ApiError::Unauthorized(message));
        }
    };

    let user = PublicUser {
        id: auth.user_id.map(|id| id.to_string()).unwrap_or_default(),
        username: auth.username.unwrap_or_else(|| username.to_string()),
        full_name: auth.full_name,
        role: auth.role.unwrap_or_default(),
    };
    let claims = issue_claims(&cfg, &user.id, &user.username, &user.role);
    let token = make_token(&cfg, &claims).ok_or_else(|| ApiError::Internal("token signing failed".into()))?;
    tracing::info!(username = %user.username, role = %user.role, "login succeeded");

    Ok(HttpResponse::Ok().json(ApiResponse::ok(LoginResponse { token, user }).with_message("Login berhasil")))
}

#[get("/verify")]
pub async fn verify(req: HttpRequest) -> ApiResult<HttpResponse> {
    let claims = authenticate(&req)?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(VerifyResponse {
        user: claims.token_user(),
    })))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/auth").service(login).service(verify));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing;
    use actix_web::{http::StatusCode, test, App};

    fn claims_for(cfg: &AppConfig, role: &str) -> Claims {
        issue_claims(cfg, "1", "admin", role)
    }

    #[actix_web::test]
    async fn token_roundtrip_hmac() {
        let cfg = AppConfig::for_tests("unused");
        let claims = claims_for(&cfg, "admin");
        let token = make_token(&cfg, &claims).unwrap();
        let decoded = validate_token(&cfg, &token).unwrap();
        assert_eq!(decoded.user_id, "1");
        assert_eq!(decoded.role, "admin");
        assert_eq!(decoded.exp, claims.exp);
    }

    #[actix_web::test]
    async fn token_roundtrip_paseto() {
        let mut cfg = AppConfig::for_tests("unused");
        cfg.security.token_mode = TokenMode::PasetoV4Local;
        let claims = claims_for(&cfg, "admin");
        let token = make_token(&cfg, &claims).unwrap();
        assert!(token.starts_with("v4.local."));
        let decoded = validate_token(&cfg, &token).unwrap();
        assert_eq!(decoded.username, "admin");
        assert_eq!(decoded.exp, claims.exp);
    }

    #[actix_web::test]
    async fn hmac_rejects_tampered_expired_and_foreign_tokens() {
        let cfg = AppConfig::for_tests("unused");
        let mut token = make_token(&cfg, &claims_for(&cfg, "admin")).unwrap();
        token.push('x');
        assert!(validate_token(&cfg, &token).is_none());

        let mut expired = claims_for(&cfg, "admin");
        expired.exp = Utc::now().timestamp() - 1;
        assert!(validate_token(&cfg, &make_token(&cfg, &expired).unwrap()).is_none());

        let mut other_aud = claims_for(&cfg, "admin");
        other_aud.aud = "someone_else".into();
        assert!(validate_token(&cfg, &make_token(&cfg, &other_aud).unwrap()).is_none());

        let mut rotated = cfg.clone();
        rotated.security.jwt_secret = "a-different-secret".into();
        let token = make_token(&cfg, &claims_for(&cfg, "admin")).unwrap();
        assert!(validate_token(&rotated, &token).is_none());
    }

    #[actix_web::test]
    async fn admin_guard_statuses() {
        let cfg = AppConfig::for_tests("unused");
        let data = web::Data::new(cfg.clone());

        let req = test::TestRequest::default().app_data(data.clone()).to_http_request();
        let err = AdminUser::extract(&req).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));

        let req = test::TestRequest::default()
            .app_data(data.clone())
            .insert_header(("Authorization", "Bearer not-a-token"))
            .to_http_request();
        assert!(matches!(AdminUser::extract(&req).await.unwrap_err(), ApiError::Forbidden(_)));

        let staff = make_token(&cfg, &claims_for(&cfg, "staff")).unwrap();
        let req = test::TestRequest::default()
            .app_data(data.clone())
            .insert_header(("Authorization", format!("Bearer {staff}")))
            .to_http_request();
        assert!(matches!(AdminUser::extract(&req).await.unwrap_err(), ApiError::Forbidden(_)));
        assert!(!Viewer::extract(&req).await.unwrap().is_admin);

        let admin = make_token(&cfg, &claims_for(&cfg, "admin")).unwrap();
        let req = test::TestRequest::default()
            .app_data(data)
            .insert_header(("Authorization", format!("Bearer {admin}")))
            .to_http_request();
        assert_eq!(AdminUser::extract(&req).await.unwrap().0.username, "admin");
        assert!(Viewer::extract(&req).await.unwrap().is_admin);
    }

    #[actix_web::test]
    async fn login_then_verify() {
        let ctx = testing::Context::new().await;
        let app = test::init_service(App::new().configure(|c| ctx.register(c))).await;

        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({"username": testing::ADMIN_USER, "password": testing::ADMIN_PASSWORD}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["user"]["role"], "admin");
        assert_eq!(body["data"]["user"]["full_name"], "Admin Klinik");
        assert!(body["data"]["user"].get("password_hash").is_none());
        let token = body["data"]["token"].as_str().unwrap().to_string();

        let req = test::TestRequest::get()
            .uri("/api/auth/verify")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["user"]["username"], testing::ADMIN_USER);
        assert_eq!(body["data"]["user"]["role"], "admin");
    }

    #[actix_web::test]
    async fn login_failures() {
        let ctx = testing::Context::new().await;
        let app = test::init_service(App::new().configure(|c| ctx.register(c))).await;

        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({"username": testing::ADMIN_USER, "password": "wrong"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert!(body.get("data").is_none());

        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({"username": testing::ADMIN_USER}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get().uri("/api/auth/verify").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::get()
            .uri("/api/auth/verify")
            .insert_header(("Authorization", "Bearer garbage"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
    }
}
