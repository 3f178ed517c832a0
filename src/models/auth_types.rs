// src/models/auth_types.rs
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::RowId;

pub const ROLE_ADMIN: &str = "admin";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub user_id: String,
    pub username: String,
    pub role: String,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }

    pub fn token_user(&self) -> TokenUser {
        TokenUser {
            id: self.user_id.clone(),
            username: self.username.clone(),
            role: self.role.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// One row of the `authenticate_user` procedure's result.
#[derive(Debug, Deserialize, Clone)]
pub struct AuthResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub user_id: Option<RowId>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// What a client learns about the logged-in user.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PublicUser {
    pub id: String,
    pub username: String,
    pub full_name: Option<String>,
    pub role: String,
}

/// User projection carried by a verified token.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TokenUser {
    pub id: String,
    pub username: String,
    pub role: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoginResponse {
    pub token: String,
    pub user: PublicUser,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct VerifyResponse {
    pub user: TokenUser,
}

/// Admin account as kept by the local store.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UserRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RowId>,
    pub username: String,
    pub password_hash: String,
    pub full_name: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: String,
}

impl UserRecord {
    pub fn new_admin(username: &str, full_name: &str, password_hash: String) -> Self {
        Self {
            id: None,
            username: username.trim().to_string(),
            password_hash,
            full_name: full_name.to_string(),
            role: ROLE_ADMIN.into(),
            is_active: true,
            created_at: Utc::now().to_rfc3339(),
        }
    }
}
