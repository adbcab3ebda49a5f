use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Account roles, least privileged first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum UserRole {
    User,
    Guide,
    LeadGuide,
    Admin,
}

impl Default for UserRole {
    fn default() -> Self {
        UserRole::User
    }
}

/// User record in the database.
///
/// The password hash and the reset fingerprint/expiry pair are server-side
/// secrets and never leave in a response body.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    #[serde(skip_serializing)]
    pub password_changed_at: Option<OffsetDateTime>,
    #[serde(skip_serializing)]
    pub password_reset_token_hash: Option<String>,
    #[serde(skip_serializing)]
    pub password_reset_expires: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

impl User {
    /// True when the password was changed after a token with the given
    /// issue time (unix seconds) was signed. Such tokens are stale and must
    /// be rejected.
    pub fn changed_password_after(&self, token_issued_at: i64) -> bool {
        match self.password_changed_at {
            Some(changed_at) => changed_at.unix_timestamp() > token_issued_at,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            name: "Ann".into(),
            email: "ann@x.com".into(),
            password_hash: "$argon2id$fake".into(),
            role: UserRole::default(),
            password_changed_at: None,
            password_reset_token_hash: Some("fingerprint".into()),
            password_reset_expires: Some(OffsetDateTime::now_utc()),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn serialization_omits_secrets() {
        let value = serde_json::to_value(sample_user()).unwrap();
        let obj = value.as_object().unwrap();
        assert!(obj.contains_key("email"));
        assert!(obj.contains_key("role"));
        assert!(!obj.contains_key("password_hash"));
        assert!(!obj.contains_key("password_reset_token_hash"));
        assert!(!obj.contains_key("password_reset_expires"));
        assert!(!obj.contains_key("password_changed_at"));
    }

    #[test]
    fn role_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_value(UserRole::LeadGuide).unwrap(),
            serde_json::json!("lead-guide")
        );
        assert_eq!(serde_json::to_value(UserRole::default()).unwrap(), "user");
    }

    #[test]
    fn never_changed_password_is_never_stale() {
        let user = sample_user();
        assert!(!user.changed_password_after(0));
        assert!(!user.changed_password_after(i64::MAX));
    }

    #[test]
    fn tokens_issued_before_change_are_stale() {
        let mut user = sample_user();
        let changed_at = OffsetDateTime::now_utc();
        user.password_changed_at = Some(changed_at);

        let before = (changed_at - Duration::hours(1)).unix_timestamp();
        let after = (changed_at + Duration::hours(1)).unix_timestamp();
        assert!(user.changed_password_after(before));
        assert!(!user.changed_password_after(after));
        // same second is not stale
        assert!(!user.changed_password_after(changed_at.unix_timestamp()));
    }
}
