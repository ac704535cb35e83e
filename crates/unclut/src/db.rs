//! Optional per-user activity counters in Postgres.

use anyhow::Context;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::{
    pooled_connection::{deadpool::Pool, AsyncDieselConnectionManager, ManagerConfig},
    AsyncPgConnection, RunQueryDsl,
};
use shared_types::UserActivity;

pub type DbPool = Pool<AsyncPgConnection>;

async fn establish_tls_connection(config: String) -> diesel::ConnectionResult<AsyncPgConnection> {
    let root_store =
        rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let tls_config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();
    let tls = tokio_postgres_rustls::MakeRustlsConnect::new(tls_config);

    let (client, connection) = tokio_postgres::connect(&config, tls)
        .await
        .map_err(|e| diesel::ConnectionError::BadConnection(e.to_string()))?;

    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!("Connection error: {}", e);
        }
    });

    AsyncPgConnection::try_from(client).await
}

pub fn establish_connection_pool(database_url: &str) -> anyhow::Result<DbPool> {
    let mut manager_config = ManagerConfig::default();
    manager_config.custom_setup =
        Box::new(|url| Box::pin(establish_tls_connection(url.to_string())));

    let config = AsyncDieselConnectionManager::<AsyncPgConnection>::new_with_config(
        database_url,
        manager_config,
    );
    let pool = Pool::builder(config)
        .max_size(2)
        .build()
        .context("Failed to build database pool")?;

    Ok(pool)
}

/// Counter increments for one run, or `None` when nothing should be written.
/// Negative deltas count as zero.
pub fn activity_increments(email: &str, unsub_delta: i64, deleted_delta: i64) -> Option<(i64, i64)> {
    if email.is_empty() || (unsub_delta == 0 && deleted_delta == 0) {
        return None;
    }
    Some((unsub_delta.max(0), deleted_delta.max(0)))
}

pub struct ActivityStore {
    pool: DbPool,
}

impl ActivityStore {
    /// Connect when `DATABASE_URL` is set; activity recording is off otherwise
    pub fn connect_from_env() -> anyhow::Result<Option<Self>> {
        match std::env::var("DATABASE_URL") {
            Ok(url) if !url.trim().is_empty() => {
                let pool = establish_connection_pool(url.trim())?;
                Ok(Some(Self { pool }))
            }
            _ => {
                tracing::debug!("DATABASE_URL not set, activity recording disabled");
                Ok(None)
            }
        }
    }

    /// Add this run's counts to the user's row, creating it on first use.
    /// Failures are logged, never returned.
    pub async fn record_activity(&self, email: &str, unsub_delta: i64, deleted_delta: i64) {
        let Some((unsubs, deleted)) = activity_increments(email, unsub_delta, deleted_delta)
        else {
            return;
        };

        match self.upsert(email, unsubs, deleted).await {
            Ok(()) => tracing::info!(
                "Updated activity for {}. Unsub: {}, Deleted: {}.",
                email,
                unsubs,
                deleted
            ),
            Err(e) => tracing::error!("Failed to record activity for {}: {:#}", email, e),
        }
    }

    async fn upsert(&self, user_email: &str, unsubs: i64, deleted: i64) -> anyhow::Result<()> {
        use crate::schema::user_activity::dsl::*;

        let mut conn = self
            .pool
            .get()
            .await
            .context("Failed to get DB connection")?;
        let now = Utc::now();

        diesel::insert_into(user_activity)
            .values((
                email.eq(user_email),
                unsubs_count.eq(unsubs),
                deleted_count.eq(deleted),
                created_at.eq(now),
                updated_at.eq(now),
            ))
            .on_conflict(email)
            .do_update()
            .set((
                unsubs_count.eq(unsubs_count + unsubs),
                deleted_count.eq(deleted_count + deleted),
                updated_at.eq(now),
            ))
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    pub async fn get_activity(&self, user_email: &str) -> anyhow::Result<Option<UserActivity>> {
        use crate::schema::user_activity::dsl::*;

        let mut conn = self
            .pool
            .get()
            .await
            .context("Failed to get DB connection")?;

        let row = user_activity
            .find(user_email)
            .first::<UserActivity>(&mut conn)
            .await
            .optional()?;

        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nothing_recorded_without_activity() {
        assert_eq!(activity_increments("", 3, 1), None);
        assert_eq!(activity_increments("me@example.com", 0, 0), None);
    }

    #[test]
    fn test_negative_deltas_clamped() {
        assert_eq!(activity_increments("me@example.com", -2, 5), Some((0, 5)));
        assert_eq!(activity_increments("me@example.com", 4, 0), Some((4, 0)));
    }
}
