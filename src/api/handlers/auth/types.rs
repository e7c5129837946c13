//! Request/response types for auth endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::storage::UserRecord;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

/// Identity asserted by the frontend after a federated provider sign-in.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct FederatedRequest {
    pub email: String,
    pub name: String,
    #[serde(default, rename = "photoURL")]
    pub photo_url: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ValidatePasswordRequest {
    #[serde(default)]
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct CsrfTokenResponse {
    #[serde(rename = "csrfToken")]
    pub csrf_token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct AdminFlagRequest {
    pub is_admin: bool,
}

/// Self-service profile update. Absent fields are left unchanged.
#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default, rename = "profilePicture")]
    pub profile_picture: Option<String>,
}

/// Sanitized user projection. Never carries the password hash.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
    #[serde(rename = "isAdmin")]
    pub is_admin: bool,
}

impl From<UserRecord> for UserResponse {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id.to_string(),
            username: record.username,
            email: record.email,
            profile_picture: record.profile_picture,
            is_admin: record.is_admin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use uuid::Uuid;

    #[test]
    fn federated_request_accepts_missing_photo() -> Result<()> {
        let decoded: FederatedRequest =
            serde_json::from_str(r#"{"email":"a@b.c","name":"Alice Doe"}"#)?;
        assert_eq!(decoded.photo_url, None);

        let decoded: FederatedRequest = serde_json::from_str(
            r#"{"email":"a@b.c","name":"Alice Doe","photoURL":"https://img.example/a.png"}"#,
        )?;
        assert_eq!(decoded.photo_url.as_deref(), Some("https://img.example/a.png"));
        Ok(())
    }

    #[test]
    fn csrf_token_response_uses_camel_case_on_the_wire() -> Result<()> {
        let value = serde_json::to_value(CsrfTokenResponse {
            csrf_token: "abc".to_string(),
        })?;
        assert_eq!(value.get("csrfToken"), Some(&serde_json::json!("abc")));
        assert!(value.get("csrf_token").is_none());
        Ok(())
    }

    #[test]
    fn update_profile_request_fields_are_all_optional() -> Result<()> {
        let decoded: UpdateProfileRequest = serde_json::from_str("{}")?;
        assert!(decoded.username.is_none());
        assert!(decoded.profile_picture.is_none());

        let decoded: UpdateProfileRequest =
            serde_json::from_str(r#"{"username":"bob","profilePicture":"https://img.example/b.png"}"#)?;
        assert_eq!(decoded.username.as_deref(), Some("bob"));
        assert_eq!(
            decoded.profile_picture.as_deref(),
            Some("https://img.example/b.png")
        );
        assert!(decoded.email.is_none());
        Ok(())
    }

    #[test]
    fn user_response_never_exposes_the_hash() -> Result<()> {
        let record = UserRecord {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            profile_picture: None,
            is_admin: true,
        };
        let value = serde_json::to_value(UserResponse::from(record))?;
        assert!(value.get("password_hash").is_none());
        assert!(value.get("profile_picture").is_none());
        assert_eq!(value.get("isAdmin"), Some(&serde_json::Value::Bool(true)));
        Ok(())
    }
}
