pub const SCHEMA: &str = r#"
-- Namespaces group packages; the slug is the primary identity
CREATE TABLE IF NOT EXISTS namespaces (
    slug TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);

-- Packages
CREATE TABLE IF NOT EXISTS packages (
    id TEXT PRIMARY KEY,
    namespace_slug TEXT NOT NULL REFERENCES namespaces(slug) ON DELETE CASCADE,
    name TEXT NOT NULL,
    slug TEXT NOT NULL,

    -- namespace_slug || '/' || slug, maintained at write time so lookups
    -- by path stay a plain indexed equality
    path TEXT NOT NULL,

    created_at TEXT NOT NULL,

    UNIQUE(namespace_slug, slug)
);

-- Uploaded artifacts; version is write-once, storage locator embedded
CREATE TABLE IF NOT EXISTS package_versions (
    id TEXT PRIMARY KEY,
    package_id TEXT NOT NULL REFERENCES packages(id) ON DELETE CASCADE,
    version TEXT NOT NULL,

    -- storage locator columns (service://location/bucket/key)
    service TEXT NOT NULL,
    location TEXT NOT NULL,
    bucket TEXT NOT NULL,
    key TEXT NOT NULL,
    content_type TEXT,

    local_path TEXT,
    run_command TEXT,
    test_command TEXT,
    url TEXT,                 -- cached retrieval URL, generated lazily
    created_at TEXT NOT NULL,

    UNIQUE(package_id, version)
);

-- Suites are mutable named package sets
CREATE TABLE IF NOT EXISTS suites (
    slug TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);

-- Suite membership; a package appears at most once per suite
CREATE TABLE IF NOT EXISTS suite_packages (
    suite_slug TEXT NOT NULL REFERENCES suites(slug) ON DELETE CASCADE,
    package_id TEXT NOT NULL REFERENCES packages(id) ON DELETE CASCADE,
    PRIMARY KEY (suite_slug, package_id)
);

-- Releases are immutable snapshots, optionally owned by a suite
CREATE TABLE IF NOT EXISTS releases (
    id TEXT PRIMARY KEY,
    title TEXT,
    suite_slug TEXT REFERENCES suites(slug) ON DELETE SET NULL,
    created_at TEXT NOT NULL
);

-- One version per distinct package per release
CREATE TABLE IF NOT EXISTS release_packages (
    release_id TEXT NOT NULL REFERENCES releases(id) ON DELETE CASCADE,
    package_version_id TEXT NOT NULL REFERENCES package_versions(id) ON DELETE CASCADE,
    package_id TEXT NOT NULL REFERENCES packages(id) ON DELETE CASCADE,
    PRIMARY KEY (release_id, package_version_id),
    UNIQUE (release_id, package_id)
);

-- Activation schedule; activates_at is fixed-width UTC text so lexical
-- order is chronological order
CREATE TABLE IF NOT EXISTS scheduled_releases (
    id TEXT PRIMARY KEY,
    release_id TEXT NOT NULL REFERENCES releases(id) ON DELETE CASCADE,
    activates_at TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- Create indexes
CREATE INDEX IF NOT EXISTS idx_packages_namespace ON packages(namespace_slug);
CREATE UNIQUE INDEX IF NOT EXISTS idx_packages_path ON packages(path);
CREATE INDEX IF NOT EXISTS idx_versions_package ON package_versions(package_id);
CREATE INDEX IF NOT EXISTS idx_suite_packages_package ON suite_packages(package_id);
CREATE INDEX IF NOT EXISTS idx_releases_suite ON releases(suite_slug);
CREATE INDEX IF NOT EXISTS idx_release_packages_release ON release_packages(release_id);
CREATE INDEX IF NOT EXISTS idx_scheduled_release ON scheduled_releases(release_id);
CREATE INDEX IF NOT EXISTS idx_scheduled_activates ON scheduled_releases(activates_at);
"#;
