use tokio_postgres::{types::ToSql, Client, NoTls};

use super::repo::{HolderRow, Repo, RepoError, SQLikeMigrations};
use crate::persistence::HolderUpsert;

pub struct PostgresRepo {
    client: Client,
}

impl PostgresRepo {
    /// Connects and spawns the connection driver task.
    pub async fn connect(url: &str) -> Result<Self, RepoError> {
        let (client, connection) = tokio_postgres::connect(url, NoTls)
            .await
            .map_err(|e| RepoError::NotConnected(e.to_string()))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("postgres connection error: {e}");
            }
        });

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Repo for PostgresRepo {
    async fn migrate(&self) -> Result<(), RepoError> {
        for migration in SQLikeMigrations::create_holders() {
            self.client
                .execute(*migration, &[])
                .await
                .map_err(|e| RepoError::Unknown(e.to_string()))?;
        }

        Ok(())
    }

    async fn upsert_holders(&self, batch: &[HolderUpsert]) -> Result<(), RepoError> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut query = String::from(
            "INSERT INTO holdersync_holders \
             (owner_id, collection_id, quantity, last_synced_at, synced_at) VALUES ",
        );
        let mut params: Vec<&(dyn ToSql + Sync)> = Vec::with_capacity(batch.len() * 5);

        for (i, upsert) in batch.iter().enumerate() {
            if i > 0 {
                query.push_str(", ");
            }
            let base = i * 5;
            query.push_str(&format!(
                "(${}, ${}, ${}, ${}, ${})",
                base + 1,
                base + 2,
                base + 3,
                base + 4,
                base + 5
            ));
            params.push(&upsert.owner_id);
            params.push(&upsert.collection_id);
            params.push(&upsert.quantity);
            params.push(&upsert.last_synced_at);
            params.push(&upsert.synced_at);
        }

        query.push_str(
            " ON CONFLICT (owner_id, collection_id) DO UPDATE SET \
             quantity = EXCLUDED.quantity, \
             last_synced_at = EXCLUDED.last_synced_at, \
             synced_at = EXCLUDED.synced_at",
        );

        self.client
            .execute(query.as_str(), &params)
            .await
            .map_err(|e| RepoError::Unknown(e.to_string()))?;

        Ok(())
    }

    async fn load_holders(&self) -> Result<Vec<HolderRow>, RepoError> {
        let rows = self
            .client
            .query(
                "SELECT owner_id, collection_id, quantity FROM holdersync_holders \
                 ORDER BY owner_id, collection_id",
                &[],
            )
            .await
            .map_err(|e| RepoError::Unknown(e.to_string()))?;

        Ok(rows
            .iter()
            .map(|row| HolderRow {
                owner_id: row.get(0),
                collection_id: row.get(1),
                quantity: row.get(2),
            })
            .collect())
    }
}
