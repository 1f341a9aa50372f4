use anyhow::Result;
use sqlx::PgPool;
use time::OffsetDateTime;

use crate::domain::EnergyRecord;

const SELECT_COLUMNS: &str = r#"
        SELECT
            site_id,
            ts,
            energy_generated_kwh,
            energy_consumed_kwh,
            net_energy_kwh,
            anomaly
        FROM energy_data
"#;

/// Readings for one site with `start <= ts <= end`, time-ordered.
pub async fn records_in_range(
    pool: &PgPool,
    site_id: &str,
    start: OffsetDateTime,
    end: OffsetDateTime,
) -> Result<Vec<EnergyRecord>> {
    let sql = format!(
        "{SELECT_COLUMNS}
        WHERE site_id = $1
          AND ts >= $2
          AND ts <= $3
        ORDER BY ts"
    );

    let rows = sqlx::query_as::<_, EnergyRecord>(&sql)
        .bind(site_id)
        .bind(start)
        .bind(end)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Every reading stored for a site, time-ordered.
pub async fn records_for_site(pool: &PgPool, site_id: &str) -> Result<Vec<EnergyRecord>> {
    let sql = format!("{SELECT_COLUMNS} WHERE site_id = $1 ORDER BY ts");

    let rows = sqlx::query_as::<_, EnergyRecord>(&sql)
        .bind(site_id)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Anomalous readings for a site.
///
/// There is no index on `anomaly`; the site key narrows the scan and the flag
/// is filtered in the same statement.
pub async fn anomalies_for_site(pool: &PgPool, site_id: &str) -> Result<Vec<EnergyRecord>> {
    let sql = format!("{SELECT_COLUMNS} WHERE site_id = $1 AND anomaly ORDER BY ts");

    let rows = sqlx::query_as::<_, EnergyRecord>(&sql)
        .bind(site_id)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Full table scan.
pub async fn all_records(pool: &PgPool) -> Result<Vec<EnergyRecord>> {
    let sql = format!("{SELECT_COLUMNS} ORDER BY site_id, ts");

    let rows = sqlx::query_as::<_, EnergyRecord>(&sql).fetch_all(pool).await?;

    Ok(rows)
}
