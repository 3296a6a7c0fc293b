use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Paths no content item may take as its title. A trailing `*` marks a prefix.
pub const DEFAULT_RESERVED_PATHS: &[&str] = &[
    "admin",
    "admin/*",
    "api/*",
    "static/*",
    "uploads/*",
    "login",
    "logout",
    "feed",
    "sitemap.xml",
    "robots.txt",
];

pub fn init_pool_at(path: &str) -> Result<DbPool, String> {
    let manager = SqliteConnectionManager::file(path);
    let pool = Pool::builder()
        .max_size(10)
        .build(manager)
        .map_err(|e| e.to_string())?;

    // Enable WAL mode for better concurrent read performance
    let conn = pool.get().map_err(|e| e.to_string())?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
        .map_err(|e| e.to_string())?;

    Ok(pool)
}

pub fn run_migrations(pool: &DbPool) -> Result<(), Box<dyn std::error::Error>> {
    let conn = pool.get()?;

    conn.execute_batch(
        "
        -- Content items: one row per version
        CREATE TABLE IF NOT EXISTS content_items (
            version_id TEXT PRIMARY KEY,
            logical_id INTEGER NOT NULL,
            version_number INTEGER NOT NULL,
            title TEXT NOT NULL,
            url_path TEXT NOT NULL DEFAULT '',
            kind TEXT NOT NULL DEFAULT 'general',
            blog_key TEXT,
            body_html TEXT NOT NULL DEFAULT '',
            published_at DATETIME,
            status TEXT NOT NULL DEFAULT 'active',
            owner_user_id INTEGER NOT NULL DEFAULT 0,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            UNIQUE(logical_id, version_number)
        );

        CREATE INDEX IF NOT EXISTS idx_content_logical ON content_items(logical_id);
        CREATE INDEX IF NOT EXISTS idx_content_path ON content_items(url_path);
        CREATE INDEX IF NOT EXISTS idx_content_blog_key ON content_items(blog_key);

        -- Redirects: at most one target per old path
        CREATE TABLE IF NOT EXISTS redirects (
            id INTEGER PRIMARY KEY,
            old_path TEXT UNIQUE NOT NULL,
            new_path TEXT NOT NULL,
            created_by INTEGER NOT NULL DEFAULT 0,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        CREATE INDEX IF NOT EXISTS idx_redirects_new ON redirects(new_path);

        -- System routes content may never claim
        CREATE TABLE IF NOT EXISTS reserved_paths (
            path TEXT PRIMARY KEY
        );

        -- Rendered, externally visible versions
        CREATE TABLE IF NOT EXISTS published_pages (
            version_id TEXT PRIMARY KEY,
            logical_id INTEGER NOT NULL,
            version_number INTEGER NOT NULL,
            url_path TEXT NOT NULL,
            html TEXT NOT NULL,
            published_at DATETIME NOT NULL,
            rendered_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        CREATE INDEX IF NOT EXISTS idx_pages_path ON published_pages(url_path);

        -- Audit log
        CREATE TABLE IF NOT EXISTS audit_log (
            id INTEGER PRIMARY KEY,
            user_id INTEGER,
            action TEXT NOT NULL,
            entity_type TEXT,
            entity_id INTEGER,
            entity_title TEXT,
            details TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        CREATE INDEX IF NOT EXISTS idx_audit_entity ON audit_log(entity_type, entity_id);
        ",
    )?;

    Ok(())
}

pub fn seed_defaults(pool: &DbPool) -> Result<(), Box<dyn std::error::Error>> {
    let conn = pool.get()?;

    for path in DEFAULT_RESERVED_PATHS {
        conn.execute(
            "INSERT OR IGNORE INTO reserved_paths (path) VALUES (?1)",
            params![path],
        )?;
    }

    Ok(())
}
