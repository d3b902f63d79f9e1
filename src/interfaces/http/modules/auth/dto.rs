//! Authentication DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::domain::Role;

/// Role a client may ask for at registration
#[derive(Debug, Clone, Copy, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RoleDto {
    Member,
    Admin,
}

impl From<RoleDto> for Role {
    fn from(role: RoleDto) -> Self {
        match role {
            RoleDto::Member => Role::Member,
            RoleDto::Admin => Role::Admin,
        }
    }
}

impl From<Role> for RoleDto {
    fn from(role: Role) -> Self {
        match role {
            Role::Member => RoleDto::Member,
            Role::Admin => RoleDto::Admin,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(length(max = 64, message = "username must be at most 64 characters"))]
    pub username: String,
    #[validate(length(max = 254, message = "email must be at most 254 characters"))]
    pub email: String,
    /// Length rules are enforced by the workflow
    #[validate(length(max = 1024, message = "password is too long"))]
    pub password: String,
    /// Only `member` is accepted here
    #[serde(default)]
    pub role: Option<RoleDto>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterResponse {
    pub id: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(max = 64, message = "username must be at most 64 characters"))]
    pub username: String,
    #[validate(length(max = 1024, message = "password is too long"))]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    /// Seconds until the token expires
    pub expires_in: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: RoleDto,
    pub created_at: DateTime<Utc>,
    pub token_expires_at: DateTime<Utc>,
}
