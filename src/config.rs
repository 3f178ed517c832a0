use anyhow::{anyhow, bail, Result};
use regex::Regex;
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

pub fn is_origin_allowed(rules: &[CorsRule], origin: &str) -> bool {
    rules.iter().any(|rule| origin_matches(&rule.origin, origin))
}

fn origin_matches(pattern: &str, origin: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    // Convert wildcard pattern to anchored regex
    let mut re_pat = String::from("^");
    for (i, part) in pattern.split('*').enumerate() {
        if i > 0 {
            re_pat.push_str(".*");
        }
        re_pat.push_str(&regex::escape(part));
    }
    re_pat.push('$');
    Regex::new(&re_pat)
        .map(|re| re.is_match(origin))
        .unwrap_or(false)
}

#[derive(Debug, Clone, PartialEq)]
pub struct CorsRule {
    pub origin: String,
}

impl CorsRule {
    pub fn allows_any(rules: &[CorsRule]) -> bool {
        rules.is_empty() || rules.iter().any(|r| r.origin == "*")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackendKind {
    /// Embedded sled store, used for development and tests.
    Local,
    /// Hosted PostgREST-compatible backend.
    Rest,
}

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub db_path: String,
    pub rest_url: String,
    pub anon_key: String,
    pub service_key: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub cors_rules: Vec<CorsRule>,
    pub security: SecurityConfig,
    pub clinic: ClinicConfig,
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.server.environment.eq_ignore_ascii_case("production")
    }

    /// Local backend at `db_path`, HMAC tokens, any origin.
    #[cfg(test)]
    pub fn for_tests(db_path: &str) -> Self {
        AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".into(),
                port: 0,
                environment: "test".into(),
                static_dir: None,
                json_limit: 64 * 1024,
            },
            backend: BackendConfig {
                kind: BackendKind::Local,
                db_path: db_path.into(),
                rest_url: String::new(),
                anon_key: String::new(),
                service_key: None,
                timeout: Duration::from_secs(5),
            },
            cors_rules: vec![],
            security: SecurityConfig {
                jwt_secret: "test-secret-with-enough-entropy".into(),
                token_iss: "test_iss".into(),
                token_aud: "test_aud".into(),
                token_ttl_seconds: 3600,
                paseto_v4_local_key_hex: "00".repeat(32),
                token_mode: TokenMode::JwtHmac,
            },
            clinic: ClinicConfig {
                utc_offset_minutes: 7 * 60,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenMode {
    JwtHmac,
    PasetoV4Local,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub token_iss: String,
    pub token_aud: String,
    pub token_ttl_seconds: u64,
    pub paseto_v4_local_key_hex: String,
    pub token_mode: TokenMode,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub static_dir: Option<String>,
    pub json_limit: usize,
}

#[derive(Debug, Clone)]
pub struct ClinicConfig {
    /// Offset of the clinic's wall clock from UTC, used for appointment
    /// datetimes and the dashboard's notion of "today".
    pub utc_offset_minutes: i32,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn load_config_from_file(config_path: &str) -> Result<AppConfig> {
    let abs_config_path = Path::new(config_path)
        .canonicalize()
        .unwrap_or_else(|_| PathBuf::from(config_path));

    if Path::new(config_path).exists() {
        match dotenvy::from_filename(config_path) {
            Ok(_) => tracing::info!("✓ Loaded .env file from: {}", abs_config_path.display()),
            Err(e) => tracing::warn!("Failed to load .env file from {}: {}", abs_config_path.display(), e),
        }
    } else {
        tracing::warn!(".env file not found at: {} (using environment)", abs_config_path.display());
    }

    load_config_from_env()
}

pub fn load_config_from_env() -> Result<AppConfig> {
    let environment = env_non_empty("APP_ENV")
        .or_else(|| env_non_empty("NODE_ENV"))
        .unwrap_or_else(|| "development".to_string());

    let server = ServerConfig {
        host: env_or("HOST", "127.0.0.1"),
        port: env_parse("PORT", 3000),
        environment,
        static_dir: env_non_empty("STATIC_DIR"),
        json_limit: env_parse("JSON_LIMIT_BYTES", 1024 * 1024),
    };

    let kind = match env_or("DATABASE_BACKEND", "local").to_lowercase().as_str() {
        "local" | "sled" => BackendKind::Local,
        "rest" | "supabase" | "postgrest" => BackendKind::Rest,
        other => bail!("Unknown DATABASE_BACKEND '{}' (expected local or rest)", other),
    };

    let backend = BackendConfig {
        kind,
        db_path: env_or("DB_PATH", "data/clinic"),
        rest_url: env_or("SUPABASE_URL", "").trim_end_matches('/').to_string(),
        anon_key: env_or("SUPABASE_ANON_KEY", ""),
        service_key: env_non_empty("SUPABASE_SERVICE_ROLE_KEY"),
        timeout: Duration::from_secs(env_parse("BACKEND_TIMEOUT_SECONDS", 30)),
    };
    if backend.kind == BackendKind::Rest {
        if backend.rest_url.is_empty() || backend.anon_key.is_empty() {
            return Err(anyhow!("SUPABASE_URL and SUPABASE_ANON_KEY are required for the rest backend"));
        }
        let parsed = url::Url::parse(&backend.rest_url)
            .map_err(|e| anyhow!("SUPABASE_URL '{}' is not a valid URL: {}", backend.rest_url, e))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!("SUPABASE_URL must use http or https, got '{}'", parsed.scheme());
        }
    }

    let token_mode = match env_or("TOKEN_MODE", "jwt_hmac").to_lowercase().as_str() {
        "paseto" | "paseto_v4_local" => TokenMode::PasetoV4Local,
        _ => TokenMode::JwtHmac,
    };

    let security = SecurityConfig {
        jwt_secret: env_or("JWT_SECRET", ""),
        token_iss: env_or("TOKEN_ISS", "clinic_booking_backend"),
        token_aud: env_or("TOKEN_AUD", "clinic_admin"),
        token_ttl_seconds: env_parse("TOKEN_TTL_SECONDS", 24 * 60 * 60),
        paseto_v4_local_key_hex: env_or("PASETO_V4_LOCAL_KEY_HEX", ""),
        token_mode,
    };

    let clinic = ClinicConfig {
        utc_offset_minutes: env_parse("CLINIC_UTC_OFFSET_MINUTES", 7 * 60),
    };
    if !(-1439..=1439).contains(&clinic.utc_offset_minutes) {
        bail!(
            "CLINIC_UTC_OFFSET_MINUTES must be within ±1439, got {}",
            clinic.utc_offset_minutes
        );
    }

    Ok(AppConfig {
        server,
        backend,
        cors_rules: parse_allowed_origins(&env_or("ALLOWED_ORIGINS", "")),
        security,
        clinic,
    })
}

/// Makes sure tokens can be signed. Outside production a missing secret or
/// key is replaced by a random per-process one (tokens then die with the
/// process); in production it is a startup error. Returns whether a random
/// value was generated.
pub fn ensure_signing_secret(cfg: &mut AppConfig) -> Result<bool> {
    let missing = match cfg.security.token_mode {
        TokenMode::JwtHmac => cfg.security.jwt_secret.trim().is_empty(),
        TokenMode::PasetoV4Local => {
            let key = cfg.security.paseto_v4_local_key_hex.trim();
            key.len() != 64 || hex::decode(key).is_err()
        }
    };
    if !missing {
        return Ok(false);
    }
    if cfg.is_production() {
        bail!(
            "{} must be set in production",
            match cfg.security.token_mode {
                TokenMode::JwtHmac => "JWT_SECRET",
                TokenMode::PasetoV4Local => "PASETO_V4_LOCAL_KEY_HEX (64 hex chars)",
            }
        );
    }

    let mut bytes = [0u8; 32];
    rand_core::RngCore::fill_bytes(&mut rand_core::OsRng, &mut bytes);
    match cfg.security.token_mode {
        TokenMode::JwtHmac => cfg.security.jwt_secret = hex::encode(bytes),
        TokenMode::PasetoV4Local => cfg.security.paseto_v4_local_key_hex = hex::encode(bytes),
    }
    Ok(true)
}

/// Comma separated origins; an empty list or `*` allows any origin.
pub fn parse_allowed_origins(raw: &str) -> Vec<CorsRule> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(|o| CorsRule {
            origin: o.trim_end_matches('/').to_string(),
        })
        .collect()
}
