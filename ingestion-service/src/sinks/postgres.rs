use energy_client::{db::energy_record_queries, domain::EnergyRecord};
use sqlx::postgres::PgPool;

use crate::pipeline::PipelineError;
use crate::sinks::table_store::{TableStore, TimeRange};

/// Table store over a Postgres-wire database.
///
/// Expects the `energy_data` table from `sql/schema/01_energy_data.sql`, with
/// its primary key on `(site_id, ts)`.
#[derive(Clone)]
pub struct PgTableStore {
    pool: PgPool,
}

impl PgTableStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl TableStore for PgTableStore {
    async fn put_item(&self, record: &EnergyRecord) -> Result<(), PipelineError> {
        sqlx::query(
            r#"
            INSERT INTO energy_data
                (site_id, ts, energy_generated_kwh, energy_consumed_kwh, net_energy_kwh, anomaly)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (site_id, ts) DO UPDATE SET
                energy_generated_kwh = EXCLUDED.energy_generated_kwh,
                energy_consumed_kwh  = EXCLUDED.energy_consumed_kwh,
                net_energy_kwh       = EXCLUDED.net_energy_kwh,
                anomaly              = EXCLUDED.anomaly
            "#,
        )
        .bind(&record.site_id)
        .bind(record.timestamp)
        .bind(record.energy_generated_kwh)
        .bind(record.energy_consumed_kwh)
        .bind(record.net_energy_kwh)
        .bind(record.anomaly)
        .execute(&self.pool)
        .await
        .map(|_| ())
        .map_err(|e| PipelineError::Storage(e.to_string()))
    }

    async fn query(
        &self,
        site_id: &str,
        range: Option<TimeRange>,
    ) -> Result<Vec<EnergyRecord>, PipelineError> {
        let res = match range {
            Some(w) => energy_record_queries::records_in_range(&self.pool, site_id, w.start, w.end).await,
            None => energy_record_queries::records_for_site(&self.pool, site_id).await,
        };
        res.map_err(|e| PipelineError::Storage(e.to_string()))
    }

    async fn scan(&self) -> Result<Vec<EnergyRecord>, PipelineError> {
        energy_record_queries::all_records(&self.pool)
            .await
            .map_err(|e| PipelineError::Storage(e.to_string()))
    }

    async fn query_anomalies(&self, site_id: &str) -> Result<Vec<EnergyRecord>, PipelineError> {
        energy_record_queries::anomalies_for_site(&self.pool, site_id)
            .await
            .map_err(|e| PipelineError::Storage(e.to_string()))
    }
}
