//! Versioned schema migrations.
//!
//! Each database records the versions it has applied in `schema_migrations`.
//! A migration's statements run inside one transaction together with its
//! bookkeeping row, so a failed migration leaves no trace.

use anyhow::{anyhow, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub statements: &'static [&'static str],
}

const CREATE_MIGRATIONS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS schema_migrations (
        version INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        applied_at TEXT NOT NULL
    )
"#;

/// Schema history of `doctors.db`.
pub const DOCTORS_MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_doctors",
        statements: &[r#"
            CREATE TABLE IF NOT EXISTS doctors (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name_en TEXT,
                name_zh TEXT,
                specialty_en TEXT,
                specialty_zh TEXT,
                qualifications_en TEXT,
                qualifications_zh TEXT,
                languages_en TEXT,
                languages_zh TEXT,
                phone TEXT,
                email TEXT,
                address_en TEXT,
                address_zh TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
        "#],
    },
    Migration {
        version: 2,
        name: "add_priority_and_district",
        statements: &[
            "ALTER TABLE doctors ADD COLUMN priority_flag INTEGER NOT NULL DEFAULT 0",
            "ALTER TABLE doctors ADD COLUMN district TEXT",
        ],
    },
    Migration {
        version: 3,
        name: "add_affiliation",
        statements: &[
            "ALTER TABLE doctors ADD COLUMN website TEXT",
            "ALTER TABLE doctors ADD COLUMN affiliation_status TEXT NOT NULL DEFAULT 'none'",
            "ALTER TABLE doctors ADD COLUMN whatsapp_number TEXT",
            "ALTER TABLE doctors ADD COLUMN affiliated_at TEXT",
        ],
    },
    Migration {
        version: 4,
        name: "index_doctor_lookups",
        statements: &[
            "CREATE INDEX IF NOT EXISTS idx_doctors_specialty_en ON doctors(specialty_en)",
            "CREATE INDEX IF NOT EXISTS idx_doctors_affiliation ON doctors(affiliation_status)",
        ],
    },
];

/// Schema history of `admin_data.db`.
pub const ADMIN_MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_queries_and_admins",
        statements: &[
            r#"
            CREATE TABLE IF NOT EXISTS user_queries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                age INTEGER,
                gender TEXT,
                symptoms TEXT NOT NULL,
                chronic_conditions TEXT,
                language TEXT,
                location TEXT,
                ai_response TEXT,
                recommended_specialties TEXT,
                created_at TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS admin_users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS analytics (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                event_type TEXT NOT NULL,
                event_data TEXT,
                created_at TEXT NOT NULL
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_analytics_created ON analytics(created_at)",
        ],
    },
    Migration {
        version: 2,
        name: "extend_user_queries",
        statements: &[
            "ALTER TABLE user_queries ADD COLUMN detailed_health_info TEXT",
            "ALTER TABLE user_queries ADD COLUMN ai_provider TEXT",
            "ALTER TABLE user_queries ADD COLUMN severity TEXT",
            "ALTER TABLE user_queries ADD COLUMN matched_doctors TEXT",
            "ALTER TABLE user_queries ADD COLUMN pubmed_references TEXT",
        ],
    },
    Migration {
        version: 3,
        name: "create_severe_cases",
        statements: &[r#"
            CREATE TABLE IF NOT EXISTS severe_cases (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                query_id INTEGER,
                age INTEGER,
                gender TEXT,
                symptoms TEXT NOT NULL,
                matched_keywords TEXT NOT NULL,
                handled INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )
        "#],
    },
    Migration {
        version: 4,
        name: "create_reservations",
        statements: &[
            r#"
            CREATE TABLE IF NOT EXISTS reservations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                doctor_id INTEGER NOT NULL,
                query_id INTEGER,
                patient_name TEXT NOT NULL,
                patient_phone TEXT NOT NULL,
                preferred_date TEXT NOT NULL,
                preferred_time TEXT,
                notes TEXT,
                status TEXT NOT NULL DEFAULT 'pending',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_reservations_doctor ON reservations(doctor_id)",
        ],
    },
    Migration {
        version: 5,
        name: "admin_roles_and_totp",
        statements: &[
            "ALTER TABLE admin_users ADD COLUMN role TEXT NOT NULL DEFAULT 'admin'",
            "ALTER TABLE admin_users ADD COLUMN doctor_id INTEGER",
            "ALTER TABLE admin_users ADD COLUMN totp_secret TEXT",
            "ALTER TABLE admin_users ADD COLUMN totp_enabled INTEGER NOT NULL DEFAULT 0",
            "ALTER TABLE admin_users ADD COLUMN last_login_at TEXT",
        ],
    },
    Migration {
        version: 6,
        name: "create_app_config",
        statements: &[r#"
            CREATE TABLE IF NOT EXISTS app_config (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
        "#],
    },
];

/// Apply every migration in `set` whose version is not recorded yet.
/// Returns the number of migrations applied.
pub async fn run(pool: &SqlitePool, set: &[Migration]) -> Result<usize> {
    sqlx::query(CREATE_MIGRATIONS_TABLE).execute(pool).await?;

    let applied: Vec<i64> = sqlx::query_scalar("SELECT version FROM schema_migrations")
        .fetch_all(pool)
        .await?;

    let mut count = 0;
    for migration in set {
        if applied.contains(&migration.version) {
            continue;
        }

        debug!("Applying migration {} ({})", migration.version, migration.name);
        let mut tx = pool.begin().await?;

        for statement in migration.statements {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .map_err(|e| anyhow!("Migration {} ({}) failed: {}", migration.version, migration.name, e))?;
        }

        sqlx::query("INSERT INTO schema_migrations (version, name, applied_at) VALUES (?, ?, ?)")
            .bind(migration.version)
            .bind(migration.name)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        count += 1;
    }

    if count > 0 {
        info!("Applied {} migration(s)", count);
    }

    Ok(count)
}

/// Highest applied version, 0 for a fresh database.
pub async fn current_version(pool: &SqlitePool) -> Result<i64> {
    sqlx::query(CREATE_MIGRATIONS_TABLE).execute(pool).await?;
    let version: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM schema_migrations")
        .fetch_one(pool)
        .await?;
    Ok(version.unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DbPool;

    fn versions_are_strictly_increasing(set: &[Migration]) -> bool {
        set.windows(2).all(|pair| pair[0].version < pair[1].version)
    }

    #[test]
    fn migration_sets_are_ordered() {
        assert!(versions_are_strictly_increasing(DOCTORS_MIGRATIONS));
        assert!(versions_are_strictly_increasing(ADMIN_MIGRATIONS));
    }

    #[tokio::test]
    async fn applies_each_migration_once() {
        let db = DbPool::in_memory().await.unwrap();

        let first = db.migrate(DOCTORS_MIGRATIONS).await.unwrap();
        assert_eq!(first, DOCTORS_MIGRATIONS.len());

        let second = db.migrate(DOCTORS_MIGRATIONS).await.unwrap();
        assert_eq!(second, 0);

        let version = current_version(db.pool()).await.unwrap();
        assert_eq!(version, DOCTORS_MIGRATIONS.last().unwrap().version);
    }

    #[tokio::test]
    async fn admin_schema_has_late_columns() {
        let db = DbPool::in_memory().await.unwrap();
        db.migrate(ADMIN_MIGRATIONS).await.unwrap();

        // Columns added by later migrations are queryable.
        sqlx::query("SELECT role, totp_secret, totp_enabled FROM admin_users")
            .fetch_all(db.pool())
            .await
            .unwrap();
        sqlx::query("SELECT severity, matched_doctors, pubmed_references FROM user_queries")
            .fetch_all(db.pool())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn file_database_persists_versions() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("admin_data.db").display());

        let db = DbPool::new(&url).await.unwrap();
        db.migrate(ADMIN_MIGRATIONS).await.unwrap();
        drop(db);

        let reopened = DbPool::new(&url).await.unwrap();
        assert_eq!(reopened.migrate(ADMIN_MIGRATIONS).await.unwrap(), 0);
    }
}
