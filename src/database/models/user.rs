use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::Settings;

/// A tracked person, keyed by the transport's stable user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub display_name: String,
    pub settings: Settings,
    pub created_at: String,
    pub updated_at: String,
}

/// Raw `users` row; settings are still an unparsed JSON blob.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub user_id: String,
    pub display_name: String,
    pub settings: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl UserRow {
    pub fn into_user(self) -> Result<User, serde_json::Error> {
        Ok(User {
            settings: Settings::from_json(self.settings.as_deref())?,
            id: self.user_id,
            display_name: self.display_name,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }

    pub async fn find<'e, E>(executor: E, user_id: &str) -> Result<Option<Self>, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        sqlx::query_as::<_, UserRow>(
            "SELECT user_id, display_name, settings, created_at, updated_at FROM users WHERE user_id = ?"
        )
        .bind(user_id)
        .fetch_optional(executor)
        .await
    }

    /// Inserts the user with default settings, or refreshes the name of an
    /// existing one. Settings of an existing user are left untouched.
    pub async fn upsert<'e, E>(
        executor: E,
        user_id: &str,
        display_name: &str,
        default_settings: &str,
    ) -> Result<(), sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO users (user_id, display_name, settings, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                display_name = excluded.display_name,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(display_name)
        .bind(default_settings)
        .bind(&now)
        .bind(&now)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Creates the user only when absent, keeping any existing name.
    pub async fn insert_if_missing<'e, E>(
        executor: E,
        user_id: &str,
        default_settings: &str,
    ) -> Result<(), sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT OR IGNORE INTO users (user_id, display_name, settings, created_at, updated_at) VALUES (?, '', ?, ?, ?)"
        )
        .bind(user_id)
        .bind(default_settings)
        .bind(&now)
        .bind(&now)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn update_settings<'e, E>(
        executor: E,
        user_id: &str,
        settings_json: &str,
    ) -> Result<(), sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE users SET settings = ?, updated_at = ? WHERE user_id = ?")
            .bind(settings_json)
            .bind(&now)
            .bind(user_id)
            .execute(executor)
            .await?;
        Ok(())
    }
}
