use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{CandidateFilter, ProfileStore};
use crate::error::Result;
use crate::models::Profile;

/// Postgres-backed profile store.
#[derive(Clone)]
pub struct ProfileRepository {
    pool: PgPool,
}

impl ProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for ProfileRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            SELECT id, gender, interested_in, date_of_birth, city, interests,
                   bio, is_verified, last_active_at, created_at
            FROM profiles
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    async fn find_by_ids(&self, ids: Vec<Uuid>) -> Result<Vec<Profile>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let profiles = sqlx::query_as::<_, Profile>(
            r#"
            SELECT id, gender, interested_in, date_of_birth, city, interests,
                   bio, is_verified, last_active_at, created_at
            FROM profiles
            WHERE id = ANY($1)
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(profiles)
    }

    async fn find_candidates(&self, filter: CandidateFilter) -> Result<Vec<Profile>> {
        let profiles = sqlx::query_as::<_, Profile>(
            r#"
            SELECT id, gender, interested_in, date_of_birth, city, interests,
                   bio, is_verified, last_active_at, created_at
            FROM profiles
            WHERE NOT (id = ANY($1))
              AND (cardinality($2::text[]) = 0 OR gender = ANY($2))
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
        .bind(&filter.exclude)
        .bind(&filter.genders)
        .bind(filter.limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(profiles)
    }

    async fn find_discovery(&self, exclude_id: Uuid, limit: i64) -> Result<Vec<Profile>> {
        let profiles = sqlx::query_as::<_, Profile>(
            r#"
            SELECT id, gender, interested_in, date_of_birth, city, interests,
                   bio, is_verified, last_active_at, created_at
            FROM profiles
            WHERE id <> $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(exclude_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(profiles)
    }
}
