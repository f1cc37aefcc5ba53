use anyhow::{Context, Result};
use sqlx::{
    postgres::{PgPool, PgPoolOptions},
    Postgres, Transaction,
};
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info};

use crate::{config::DatabaseConfig, model::LocatedToll, utils::progress_bar};

/// Provenance written to every row.
pub const SOURCE: &str = "overpass";

const SCHEMA: [&str; 4] = [
    r#"
    CREATE TABLE IF NOT EXISTS toll_booths (
        id SERIAL PRIMARY KEY,
        osm_id BIGINT UNIQUE NOT NULL,
        name VARCHAR(255),
        operator VARCHAR(255),
        highway_type VARCHAR(100),
        highway_name VARCHAR(255),
        highway_ref VARCHAR(100),
        lat DOUBLE PRECISION,
        lon DOUBLE PRECISION,
        geom GEOMETRY(Point, 4326),
        source VARCHAR(50),
        last_updated TIMESTAMP DEFAULT NOW(),
        created_at TIMESTAMP DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_toll_booths_geom ON toll_booths USING GIST(geom)",
    "CREATE INDEX IF NOT EXISTS idx_toll_booths_osm_id ON toll_booths(osm_id)",
    "CREATE INDEX IF NOT EXISTS idx_toll_booths_highway_type ON toll_booths(highway_type)",
];

// xmax is only zero on a freshly inserted row version
const UPSERT: &str = r#"
    INSERT INTO toll_booths (osm_id, name, operator, highway_type, highway_name,
                             highway_ref, lat, lon, geom, source)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, ST_SetSRID(ST_MakePoint($8, $7), 4326), $9)
    ON CONFLICT (osm_id) DO UPDATE
    SET name = EXCLUDED.name,
        operator = EXCLUDED.operator,
        highway_type = EXCLUDED.highway_type,
        highway_name = EXCLUDED.highway_name,
        highway_ref = EXCLUDED.highway_ref,
        lat = EXCLUDED.lat,
        lon = EXCLUDED.lon,
        geom = EXCLUDED.geom,
        last_updated = NOW()
    RETURNING (xmax = 0) AS inserted
"#;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpsertReport {
    pub inserted: usize,
    pub updated: usize,
}

impl UpsertReport {
    pub fn record(&mut self, inserted: bool) {
        if inserted {
            self.inserted += 1;
        } else {
            self.updated += 1;
        }
    }

    pub fn total(&self) -> usize {
        self.inserted + self.updated
    }
}

/// Durable destination for toll records, keyed by OSM node id.
pub trait TollStore {
    /// Creates the table and indexes if they are missing.
    fn prepare(&mut self) -> Result<()>;

    /// Inserts new ids and overwrites known ones, as one unit of work.
    fn upsert(&mut self, tolls: &[LocatedToll]) -> Result<UpsertReport>;
}

impl<T: TollStore + ?Sized> TollStore for &mut T {
    fn prepare(&mut self) -> Result<()> {
        (**self).prepare()
    }

    fn upsert(&mut self, tolls: &[LocatedToll]) -> Result<UpsertReport> {
        (**self).upsert(tolls)
    }
}

/// PostGIS backed store. sqlx is async, so the store drives its own
/// single-threaded runtime and blocks on every call.
pub struct PgStore {
    runtime: Runtime,
    pool: PgPool,
}

impl PgStore {
    pub fn connect(config: &DatabaseConfig) -> Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        let options = config.connect_options()?;

        let pool = runtime
            .block_on(
                PgPoolOptions::new()
                    .max_connections(1)
                    .connect_with(options),
            )
            .with_context(|| format!("Failed to connect to {}", config.target()))?;
        runtime
            .block_on(sqlx::query("SELECT 1").execute(&pool))
            .context("Database connection check failed")?;
        info!(db = %config.target(), "database connection successful");

        Ok(Self { runtime, pool })
    }
}

impl TollStore for PgStore {
    fn prepare(&mut self) -> Result<()> {
        self.runtime.block_on(async {
            let mut tx = self.pool.begin().await?;
            for statement in SCHEMA {
                sqlx::query(statement).execute(&mut *tx).await?;
            }
            tx.commit().await?;
            anyhow::Ok(())
        })
        .context("Failed to create toll_booths table")?;
        debug!("table toll_booths created/verified");
        Ok(())
    }

    fn upsert(&mut self, tolls: &[LocatedToll]) -> Result<UpsertReport> {
        let pb = progress_bar(tolls.len() as u64, "upserting");
        let mut report = UpsertReport::default();

        let result = self.runtime.block_on(async {
            let mut tx = self.pool.begin().await?;
            for toll in tolls {
                report.record(upsert_one(&mut tx, toll).await?);
                pb.inc(1);
            }
            tx.commit().await?;
            anyhow::Ok(())
        });
        pb.finish_and_clear();

        result.with_context(|| {
            format!(
                "Merge rolled back after {} inserted, {} updated",
                report.inserted, report.updated
            )
        })?;
        Ok(report)
    }
}

async fn upsert_one(tx: &mut Transaction<'_, Postgres>, toll: &LocatedToll) -> Result<bool> {
    let record = &toll.record;
    let osm_id = i64::try_from(record.osm_id)
        .with_context(|| format!("OSM id {} does not fit in BIGINT", record.osm_id))?;

    let inserted: bool = sqlx::query_scalar(UPSERT)
        .bind(osm_id)
        .bind(&record.name)
        .bind(&record.operator)
        .bind(&record.highway_type)
        .bind(&record.highway_name)
        .bind(&record.highway_ref)
        .bind(toll.lat())
        .bind(toll.lon())
        .bind(SOURCE)
        .fetch_one(&mut **tx)
        .await
        .with_context(|| format!("Failed to upsert node {}", record.osm_id))?;
    Ok(inserted)
}
