//! Schema migrations

use pretty_assertions::assert_eq;
use tests::db::TestDatabase;

#[test]
fn test_fresh_database_is_fully_migrated() {
    let test_db = TestDatabase::new();
    let db = test_db.open();

    assert!(test_db.db_path().exists());
    assert_eq!(db.schema_version().unwrap(), 1);

    let tables: Vec<String> = db
        .connection()
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert!(tables.contains(&"schema_migrations".to_string()));
    assert!(tables.contains(&"settings".to_string()));
}

#[test]
fn test_reopen_does_not_rerun_migrations() {
    let test_db = TestDatabase::new();
    {
        let db = test_db.open();
        db.connection()
            .execute(
                "INSERT INTO settings (key, value, updated_at) VALUES ('newrelic.licenseKey', 'k', datetime('now'))",
                [],
            )
            .unwrap();
    }

    let db = test_db.open();
    assert_eq!(db.schema_version().unwrap(), 1);

    let applied: i64 = db
        .connection()
        .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
        .unwrap();
    let value: String = db
        .connection()
        .query_row(
            "SELECT value FROM settings WHERE key = 'newrelic.licenseKey'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(applied, 1);
    assert_eq!(value, "k");
}
