use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};

use super::schema::SCHEMA;
use super::{ReleaseScope, Store};
use crate::error::{Error, Result};
use crate::storage::StorageLocator;
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

/// Fixed-width UTC form so lexical comparison on stored text is
/// chronological comparison.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn version_from_column(idx: usize, s: String) -> rusqlite::Result<Version> {
    Version::parse(&s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// INSERTs that trip a uniqueness or key constraint surface as
/// `AlreadyExists`; everything else stays a database error.
fn constraint_to_conflict(e: rusqlite::Error) -> Error {
    match e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Error::AlreadyExists
        }
        other => Error::Database(other),
    }
}

fn namespace_row(row: &Row<'_>) -> rusqlite::Result<Namespace> {
    Ok(Namespace {
        slug: row.get(0)?,
        name: row.get(1)?,
        created_at: parse_datetime(&row.get::<_, String>(2)?),
    })
}

fn package_row(row: &Row<'_>) -> rusqlite::Result<Package> {
    Ok(Package {
        id: row.get(0)?,
        namespace_slug: row.get(1)?,
        name: row.get(2)?,
        slug: row.get(3)?,
        path: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

fn version_row(row: &Row<'_>) -> rusqlite::Result<PackageVersion> {
    Ok(PackageVersion {
        id: row.get(0)?,
        package_id: row.get(1)?,
        version: version_from_column(2, row.get::<_, String>(2)?)?,
        locator: StorageLocator {
            service: row.get(3)?,
            location: row.get(4)?,
            bucket: row.get(5)?,
            key: row.get(6)?,
            content_type: row.get(7)?,
        },
        local_path: row.get(8)?,
        run_command: row.get(9)?,
        test_command: row.get(10)?,
        url: row.get(11)?,
        created_at: parse_datetime(&row.get::<_, String>(12)?),
    })
}

fn suite_row(row: &Row<'_>) -> rusqlite::Result<Suite> {
    Ok(Suite {
        slug: row.get(0)?,
        name: row.get(1)?,
        created_at: parse_datetime(&row.get::<_, String>(2)?),
    })
}

fn release_row(row: &Row<'_>) -> rusqlite::Result<Release> {
    Ok(Release {
        id: row.get(0)?,
        title: row.get(1)?,
        suite_slug: row.get(2)?,
        created_at: parse_datetime(&row.get::<_, String>(3)?),
    })
}

fn scheduled_row(row: &Row<'_>) -> rusqlite::Result<ScheduledRelease> {
    Ok(ScheduledRelease {
        id: row.get(0)?,
        release_id: row.get(1)?,
        activates_at: parse_datetime(&row.get::<_, String>(2)?),
        created_at: parse_datetime(&row.get::<_, String>(3)?),
    })
}

const VERSION_COLUMNS: &str = "id, package_id, version, service, location, bucket, key, \
     content_type, local_path, run_command, test_command, url, created_at";

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // Namespace operations

    fn create_namespace(&self, namespace: &Namespace) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO namespaces (slug, name, created_at) VALUES (?1, ?2, ?3)",
                params![
                    namespace.slug,
                    namespace.name,
                    format_datetime(&namespace.created_at),
                ],
            )
            .map_err(constraint_to_conflict)?;
        Ok(())
    }

    fn get_namespace(&self, slug: &str) -> Result<Option<Namespace>> {
        self.conn()
            .query_row(
                "SELECT slug, name, created_at FROM namespaces WHERE slug = ?1",
                params![slug],
                namespace_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_namespaces(&self) -> Result<Vec<Namespace>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT slug, name, created_at FROM namespaces ORDER BY slug")?;
        let rows = stmt.query_map([], namespace_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_namespace(&self, slug: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM namespaces WHERE slug = ?1", params![slug])?;
        Ok(rows > 0)
    }

    // Package operations

    fn create_package(&self, package: &Package) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO packages (id, namespace_slug, name, slug, path, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    package.id,
                    package.namespace_slug,
                    package.name,
                    package.slug,
                    package.path,
                    format_datetime(&package.created_at),
                ],
            )
            .map_err(constraint_to_conflict)?;
        Ok(())
    }

    fn get_package(&self, namespace_slug: &str, slug: &str) -> Result<Option<Package>> {
        self.conn()
            .query_row(
                "SELECT id, namespace_slug, name, slug, path, created_at
                 FROM packages WHERE namespace_slug = ?1 AND slug = ?2",
                params![namespace_slug, slug],
                package_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn get_package_by_id(&self, id: &str) -> Result<Option<Package>> {
        self.conn()
            .query_row(
                "SELECT id, namespace_slug, name, slug, path, created_at
                 FROM packages WHERE id = ?1",
                params![id],
                package_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_packages(&self, namespace_slug: &str) -> Result<Vec<Package>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, namespace_slug, name, slug, path, created_at
             FROM packages WHERE namespace_slug = ?1 ORDER BY slug",
        )?;
        let rows = stmt.query_map(params![namespace_slug], package_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn lookup_paths(&self, paths: &[String]) -> Result<Vec<Package>> {
        if paths.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; paths.len()].join(", ");
        let sql = format!(
            "SELECT id, namespace_slug, name, slug, path, created_at
             FROM packages WHERE path IN ({placeholders}) ORDER BY path"
        );
        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(paths), package_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_package(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM packages WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Version operations

    fn create_version(&self, version: &PackageVersion) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO package_versions (id, package_id, version, service, location,
                     bucket, key, content_type, local_path, run_command, test_command, url,
                     created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    version.id,
                    version.package_id,
                    version.version.to_string(),
                    version.locator.service,
                    version.locator.location,
                    version.locator.bucket,
                    version.locator.key,
                    version.locator.content_type,
                    version.local_path,
                    version.run_command,
                    version.test_command,
                    version.url,
                    format_datetime(&version.created_at),
                ],
            )
            .map_err(constraint_to_conflict)?;
        Ok(())
    }

    fn get_version(&self, package_id: &str, version: &str) -> Result<Option<PackageVersion>> {
        self.conn()
            .query_row(
                &format!(
                    "SELECT {VERSION_COLUMNS} FROM package_versions
                     WHERE package_id = ?1 AND version = ?2"
                ),
                params![package_id, version],
                version_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_versions(&self, package_id: &str) -> Result<Vec<PackageVersion>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {VERSION_COLUMNS} FROM package_versions WHERE package_id = ?1"
        ))?;
        let rows = stmt.query_map(params![package_id], version_row)?;
        let mut versions = rows
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)?;
        // Version ordering lives in the domain type, not in SQL text order.
        versions.sort_by(|a, b| a.version.cmp(&b.version));
        Ok(versions)
    }

    fn update_version_metadata(&self, version: &PackageVersion) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE package_versions
             SET local_path = ?2, run_command = ?3, test_command = ?4, url = ?5
             WHERE id = ?1",
            params![
                version.id,
                version.local_path,
                version.run_command,
                version.test_command,
                version.url,
            ],
        )?;
        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn set_version_url(&self, id: &str, url: &str) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE package_versions SET url = ?2 WHERE id = ?1",
            params![id, url],
        )?;
        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_version(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM package_versions WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Suite operations

    fn create_suite(&self, suite: &Suite) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO suites (slug, name, created_at) VALUES (?1, ?2, ?3)",
                params![
                    suite.slug,
                    suite.name,
                    format_datetime(&suite.created_at),
                ],
            )
            .map_err(constraint_to_conflict)?;
        Ok(())
    }

    fn get_suite(&self, slug: &str) -> Result<Option<Suite>> {
        self.conn()
            .query_row(
                "SELECT slug, name, created_at FROM suites WHERE slug = ?1",
                params![slug],
                suite_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn list_suites(&self) -> Result<Vec<Suite>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT slug, name, created_at FROM suites ORDER BY slug")?;
        let rows = stmt.query_map([], suite_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_suite(&self, slug: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM suites WHERE slug = ?1", params![slug])?;
        Ok(rows > 0)
    }

    fn set_suite_packages(&self, suite_slug: &str, package_ids: &[String]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM suite_packages WHERE suite_slug = ?1",
            params![suite_slug],
        )?;
        for package_id in package_ids {
            tx.execute(
                "INSERT INTO suite_packages (suite_slug, package_id) VALUES (?1, ?2)",
                params![suite_slug, package_id],
            )
            .map_err(constraint_to_conflict)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn list_suite_packages(&self, suite_slug: &str) -> Result<Vec<Package>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT p.id, p.namespace_slug, p.name, p.slug, p.path, p.created_at
             FROM packages p
             JOIN suite_packages sp ON sp.package_id = p.id
             WHERE sp.suite_slug = ?1
             ORDER BY p.path",
        )?;
        let rows = stmt.query_map(params![suite_slug], package_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Release operations

    fn create_release(&self, release: &Release) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO releases (id, title, suite_slug, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    release.id,
                    release.title,
                    release.suite_slug,
                    format_datetime(&release.created_at),
                ],
            )
            .map_err(constraint_to_conflict)?;
        Ok(())
    }

    fn get_release(&self, id: &str) -> Result<Option<Release>> {
        self.conn()
            .query_row(
                "SELECT id, title, suite_slug, created_at FROM releases WHERE id = ?1",
                params![id],
                release_row,
            )
            .optional()
            .map_err(Error::from)
    }

    fn set_release_versions(&self, release_id: &str, versions: &[PackageVersion]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM release_packages WHERE release_id = ?1",
            params![release_id],
        )?;
        for version in versions {
            // UNIQUE(release_id, package_id) rejects a second version of the
            // same package; the transaction drops and nothing is applied.
            tx.execute(
                "INSERT INTO release_packages (release_id, package_version_id, package_id)
                 VALUES (?1, ?2, ?3)",
                params![release_id, version.id, version.package_id],
            )
            .map_err(constraint_to_conflict)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn list_release_versions(&self, release_id: &str) -> Result<Vec<PackageVersion>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT v.id, v.package_id, v.version, v.service, v.location, v.bucket, v.key,
                    v.content_type, v.local_path, v.run_command, v.test_command, v.url,
                    v.created_at
             FROM package_versions v
             JOIN release_packages rp ON rp.package_version_id = v.id
             JOIN packages p ON p.id = v.package_id
             WHERE rp.release_id = ?1
             ORDER BY p.path",
        )?;
        let rows = stmt.query_map(params![release_id], version_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_release_packages(&self, release_id: &str) -> Result<Vec<Package>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT p.id, p.namespace_slug, p.name, p.slug, p.path, p.created_at
             FROM packages p
             JOIN release_packages rp ON rp.package_id = p.id
             WHERE rp.release_id = ?1
             ORDER BY p.path",
        )?;
        let rows = stmt.query_map(params![release_id], package_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Scheduling and resolution

    fn create_scheduled_release(&self, scheduled: &ScheduledRelease) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO scheduled_releases (id, release_id, activates_at, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    scheduled.id,
                    scheduled.release_id,
                    format_datetime(&scheduled.activates_at),
                    format_datetime(&scheduled.created_at),
                ],
            )
            .map_err(constraint_to_conflict)?;
        Ok(())
    }

    fn list_scheduled_releases(&self, release_id: &str) -> Result<Vec<ScheduledRelease>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, release_id, activates_at, created_at
             FROM scheduled_releases WHERE release_id = ?1 ORDER BY activates_at",
        )?;
        let rows = stmt.query_map(params![release_id], scheduled_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn current_release(
        &self,
        scope: ReleaseScope<'_>,
        now: DateTime<Utc>,
    ) -> Result<Option<Release>> {
        let now = format_datetime(&now);
        let conn = self.conn();
        match scope {
            ReleaseScope::Global => conn.query_row(
                "SELECT r.id, r.title, r.suite_slug, r.created_at
                 FROM scheduled_releases s
                 JOIN releases r ON r.id = s.release_id
                 WHERE s.activates_at <= ?1
                 ORDER BY s.activates_at DESC, s.id DESC
                 LIMIT 1",
                params![now],
                release_row,
            ),
            ReleaseScope::Suite(suite_slug) => conn.query_row(
                "SELECT r.id, r.title, r.suite_slug, r.created_at
                 FROM scheduled_releases s
                 JOIN releases r ON r.id = s.release_id
                 WHERE s.activates_at <= ?1 AND r.suite_slug = ?2
                 ORDER BY s.activates_at DESC, s.id DESC
                 LIMIT 1",
                params![now, suite_slug],
                release_row,
            ),
        }
        .optional()
        .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn test_store() -> (TempDir, SqliteStore) {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        (temp, store)
    }

    fn make_package(store: &SqliteStore, namespace: &str, name: &str) -> Package {
        let ns = match store.get_namespace(&crate::types::slugify(namespace)).unwrap() {
            Some(ns) => ns,
            None => {
                let ns = Namespace::new(namespace).unwrap();
                store.create_namespace(&ns).unwrap();
                ns
            }
        };
        let package = Package::new(&ns, name).unwrap();
        store.create_package(&package).unwrap();
        package
    }

    fn make_version(store: &SqliteStore, package: &Package, version: &str) -> PackageVersion {
        let locator = StorageLocator {
            service: "s3".to_string(),
            location: "us-west-1".to_string(),
            bucket: "packages".to_string(),
            key: format!("{}/{}-{}.zip", package.slug, package.slug, version),
            content_type: Some("application/zip".to_string()),
        };
        let v = PackageVersion::new(package, Version::parse(version).unwrap(), locator);
        store.create_version(&v).unwrap();
        v
    }

    #[test]
    fn test_initialize_creates_tables() {
        let (_temp, store) = test_store();

        let conn = store.conn();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"namespaces".to_string()));
        assert!(tables.contains(&"packages".to_string()));
        assert!(tables.contains(&"package_versions".to_string()));
        assert!(tables.contains(&"suites".to_string()));
        assert!(tables.contains(&"suite_packages".to_string()));
        assert!(tables.contains(&"releases".to_string()));
        assert!(tables.contains(&"release_packages".to_string()));
        assert!(tables.contains(&"scheduled_releases".to_string()));
    }

    #[test]
    fn test_namespace_crud() {
        let (_temp, store) = test_store();

        let ns = Namespace::new("Hello").unwrap();
        store.create_namespace(&ns).unwrap();

        let fetched = store.get_namespace("hello").unwrap().unwrap();
        assert_eq!(fetched.name, "Hello");
        assert_eq!(fetched.slug, "hello");

        assert_eq!(store.list_namespaces().unwrap().len(), 1);

        assert!(store.delete_namespace("hello").unwrap());
        assert!(store.get_namespace("hello").unwrap().is_none());
        assert!(!store.delete_namespace("hello").unwrap());
    }

    #[test]
    fn test_duplicate_namespace_conflicts() {
        let (_temp, store) = test_store();

        store
            .create_namespace(&Namespace::new("Hello").unwrap())
            .unwrap();
        let err = store
            .create_namespace(&Namespace::new("Hello").unwrap())
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyExists));
    }

    #[test]
    fn test_package_lookup_by_path() {
        let (_temp, store) = test_store();

        let dog = make_package(&store, "Hello", "Dog Bog");
        make_package(&store, "Hello", "Cat Hat");

        let found = store
            .lookup_paths(&["hello/dog-bog".to_string(), "hello/missing".to_string()])
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, dog.id);
    }

    #[test]
    fn test_version_uniqueness_per_package() {
        let (_temp, store) = test_store();

        let package = make_package(&store, "Hello", "Dog Bog");
        make_version(&store, &package, "1.0.0");

        let locator = StorageLocator {
            service: "s3".to_string(),
            location: "us-west-1".to_string(),
            bucket: "packages".to_string(),
            key: "other".to_string(),
            content_type: None,
        };
        let dup = PackageVersion::new(&package, Version::parse("1.0.0").unwrap(), locator);
        assert!(matches!(
            store.create_version(&dup).unwrap_err(),
            Error::AlreadyExists
        ));
    }

    #[test]
    fn test_versions_listed_in_version_order() {
        let (_temp, store) = test_store();

        let package = make_package(&store, "Hello", "Dog Bog");
        make_version(&store, &package, "1.10.0");
        make_version(&store, &package, "1.2.0");
        make_version(&store, &package, "1.9.0");

        let versions: Vec<String> = store
            .list_versions(&package.id)
            .unwrap()
            .iter()
            .map(|v| v.version.to_string())
            .collect();
        assert_eq!(versions, vec!["1.2.0", "1.9.0", "1.10.0"]);
    }

    #[test]
    fn test_update_version_metadata() {
        let (_temp, store) = test_store();

        let package = make_package(&store, "Hello", "Dog Bog");
        let mut version = make_version(&store, &package, "1.0.0");

        version.local_path = Some("/tmp/dog-bog".to_string());
        version.run_command = Some("./run.sh".to_string());
        store.update_version_metadata(&version).unwrap();

        let fetched = store.get_version(&package.id, "1.0.0").unwrap().unwrap();
        assert_eq!(fetched.local_path.as_deref(), Some("/tmp/dog-bog"));
        assert_eq!(fetched.run_command.as_deref(), Some("./run.sh"));
        assert_eq!(fetched.test_command, None);

        version.id = "nope".to_string();
        assert!(matches!(
            store.update_version_metadata(&version).unwrap_err(),
            Error::NotFound
        ));
    }

    #[test]
    fn test_suite_membership_replace() {
        let (_temp, store) = test_store();

        let dog = make_package(&store, "Hello", "Dog Bog");
        let cat = make_package(&store, "Hello", "Cat Hat");
        let bird = make_package(&store, "Hello", "Bird Word");

        let suite = Suite::new("Spring").unwrap();
        store.create_suite(&suite).unwrap();

        store
            .set_suite_packages("spring", &[dog.id.clone(), cat.id.clone()])
            .unwrap();
        let members: Vec<String> = store
            .list_suite_packages("spring")
            .unwrap()
            .iter()
            .map(|p| p.path.clone())
            .collect();
        assert_eq!(members, vec!["hello/cat-hat", "hello/dog-bog"]);

        // Replace, not append.
        store.set_suite_packages("spring", &[bird.id.clone()]).unwrap();
        let members = store.list_suite_packages("spring").unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].id, bird.id);

        store.set_suite_packages("spring", &[]).unwrap();
        assert!(store.list_suite_packages("spring").unwrap().is_empty());
    }

    #[test]
    fn test_release_rejects_two_versions_of_one_package() {
        let (_temp, store) = test_store();

        let package = make_package(&store, "Hello", "Dog Bog");
        let v1 = make_version(&store, &package, "1.0.0");
        let v2 = make_version(&store, &package, "2.0.0");

        let release = Release::new(Some("Big release".to_string()), None);
        store.create_release(&release).unwrap();

        let err = store
            .set_release_versions(&release.id, &[v1.clone(), v2])
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyExists));
        // The whole set aborts.
        assert!(store.list_release_versions(&release.id).unwrap().is_empty());

        store.set_release_versions(&release.id, &[v1]).unwrap();
        assert_eq!(store.list_release_versions(&release.id).unwrap().len(), 1);
    }

    #[test]
    fn test_release_packages_follow_its_versions() {
        let (_temp, store) = test_store();

        let dog = make_package(&store, "Hello", "Dog Bog");
        let bird = make_package(&store, "Hello", "Bird Word");
        let dog_v = make_version(&store, &dog, "1.0.0");
        let bird_v = make_version(&store, &bird, "3.1.0");

        let release = Release::new(Some("Big release".to_string()), None);
        store.create_release(&release).unwrap();

        assert!(store.list_release_packages(&release.id).unwrap().is_empty());

        store
            .set_release_versions(&release.id, &[dog_v, bird_v])
            .unwrap();
        let packages = store.list_release_packages(&release.id).unwrap();
        let paths: Vec<&str> = packages.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(paths, ["hello/bird-word", "hello/dog-bog"]);
    }

    #[test]
    fn test_current_release_resolution() {
        let (_temp, store) = test_store();
        let now = Utc::now();

        let past = Release::new(Some("Past".to_string()), None);
        let recent = Release::new(Some("Recent".to_string()), None);
        let future = Release::new(Some("Future".to_string()), None);
        for release in [&past, &recent, &future] {
            store.create_release(release).unwrap();
        }

        let schedule = |release: &Release, offset: Duration| {
            let when = (now + offset).fixed_offset();
            store
                .create_scheduled_release(&ScheduledRelease::new(&release.id, when))
                .unwrap();
        };
        schedule(&past, Duration::days(-7));
        schedule(&recent, Duration::hours(-1));
        schedule(&future, Duration::days(7));

        let current = store
            .current_release(ReleaseScope::Global, now)
            .unwrap()
            .unwrap();
        assert_eq!(current.id, recent.id);

        // Advance past the future entry and it wins.
        let later = now + Duration::days(8);
        let current = store
            .current_release(ReleaseScope::Global, later)
            .unwrap()
            .unwrap();
        assert_eq!(current.id, future.id);

        // Before any entry activates there is no current release.
        let early = now - Duration::days(30);
        assert!(store
            .current_release(ReleaseScope::Global, early)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_current_release_scoped_to_suite() {
        let (_temp, store) = test_store();
        let now = Utc::now();

        let suite = Suite::new("Spring").unwrap();
        store.create_suite(&suite).unwrap();

        let global = Release::new(None, None);
        let suite_release = Release::new(None, Some("spring".to_string()));
        store.create_release(&global).unwrap();
        store.create_release(&suite_release).unwrap();

        let hour_ago = (now - Duration::hours(1)).fixed_offset();
        let week_ago = (now - Duration::days(7)).fixed_offset();
        store
            .create_scheduled_release(&ScheduledRelease::new(&global.id, hour_ago))
            .unwrap();
        store
            .create_scheduled_release(&ScheduledRelease::new(&suite_release.id, week_ago))
            .unwrap();

        // Globally the newer entry wins; scoped to the suite only its own
        // releases are candidates.
        let current = store
            .current_release(ReleaseScope::Global, now)
            .unwrap()
            .unwrap();
        assert_eq!(current.id, global.id);

        let current = store
            .current_release(ReleaseScope::Suite("spring"), now)
            .unwrap()
            .unwrap();
        assert_eq!(current.id, suite_release.id);

        assert!(store
            .current_release(ReleaseScope::Suite("autumn"), now)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_namespace_delete_cascades() {
        let (_temp, store) = test_store();

        let package = make_package(&store, "Hello", "Dog Bog");
        make_version(&store, &package, "1.0.0");

        assert!(store.delete_namespace("hello").unwrap());
        assert!(store.get_package_by_id(&package.id).unwrap().is_none());
        assert!(store.get_version(&package.id, "1.0.0").unwrap().is_none());
    }

    #[test]
    fn test_release_delete_cascades_schedule() {
        let (_temp, store) = test_store();

        let release = Release::new(None, None);
        store.create_release(&release).unwrap();
        let when = Utc::now().fixed_offset();
        store
            .create_scheduled_release(&ScheduledRelease::new(&release.id, when))
            .unwrap();

        store
            .conn()
            .execute("DELETE FROM releases WHERE id = ?1", params![release.id])
            .unwrap();
        assert!(store.list_scheduled_releases(&release.id).unwrap().is_empty());
    }
}
