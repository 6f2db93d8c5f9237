use sqlx::SqlitePool;

pub async fn init_db(pool: &SqlitePool) -> anyhow::Result<()> {
    // Pragmas for better durability/performance
    if let Err(e) = sqlx::query("PRAGMA journal_mode=WAL;").execute(pool).await {
        tracing::warn!("Failed to set WAL journal mode: {}", e);
    }
    if let Err(e) = sqlx::query("PRAGMA synchronous=NORMAL;").execute(pool).await {
        tracing::warn!("Failed to set synchronous mode: {}", e);
    }
    // Foreign keys are critical - fail if this doesn't work
    sqlx::query("PRAGMA foreign_keys=ON;").execute(pool).await?;
    if let Err(e) = sqlx::query("PRAGMA busy_timeout=10000;").execute(pool).await {
        tracing::warn!("Failed to set busy_timeout: {}", e);
    }

    // users table
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            email_verified INTEGER NOT NULL DEFAULT 0,
            verification_token TEXT NULL,
            verification_expires_at INTEGER NULL,
            reset_token TEXT NULL,
            reset_expires_at INTEGER NULL,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ','now')),
            updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ','now'))
        )"#,
    )
    .execute(pool)
    .await?;

    // sessions table (one row per issued access token)
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            user_id INTEGER NOT NULL,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ','now')),
            expires_at INTEGER NOT NULL,
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
        )"#,
    )
    .execute(pool)
    .await?;

    // logs table (activity log)
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NULL,
            level TEXT NOT NULL,
            action TEXT NOT NULL,
            message TEXT NOT NULL,
            details TEXT NULL,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ','now')),
            updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ','now')),
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE SET NULL
        )"#,
    )
    .execute(pool)
    .await?;

    let indexes = [
        ("idx_users_verification_token", "CREATE INDEX IF NOT EXISTS idx_users_verification_token ON users(verification_token)"),
        ("idx_users_reset_token", "CREATE INDEX IF NOT EXISTS idx_users_reset_token ON users(reset_token)"),
        ("idx_sessions_user", "CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id)"),
        ("idx_logs_user_id", "CREATE INDEX IF NOT EXISTS idx_logs_user_id ON logs(user_id, id DESC)"),
        ("idx_logs_level", "CREATE INDEX IF NOT EXISTS idx_logs_level ON logs(level)"),
    ];

    for (name, query) in indexes {
        if let Err(e) = sqlx::query(query).execute(pool).await {
            tracing::warn!("Failed to create index {}: {}", name, e);
        }
    }

    Ok(())
}
