pub const TABLE_SCHEMA: &str = r#"

CREATE TABLE IF NOT EXISTS gigs (
	id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
	name TEXT NOT NULL,
	recurrence TEXT
);

CREATE TABLE IF NOT EXISTS events (
	id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
	gig_id INTEGER NOT NULL,
	date TEXT NOT NULL,
	time TEXT NOT NULL,
	timeline TEXT,
	FOREIGN KEY(gig_id) REFERENCES gigs(id)
);

CREATE TABLE IF NOT EXISTS comics (
	id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
	name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS lineup (
	id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
	event_id INTEGER NOT NULL,
	comic_id INTEGER NOT NULL,
	role TEXT NOT NULL CHECK(role IN ('MC', 'HEADLINER', 'COMIC')),
	position INTEGER,
	FOREIGN KEY(event_id) REFERENCES events(id),
	FOREIGN KEY(comic_id) REFERENCES comics(id)
);

"#;

/// Columns added after the first release. Re-running one on a database that
/// already has the column fails with "duplicate column", which is ignored.
pub const ADD_COLUMNS: &[&str] = &[
	"ALTER TABLE gigs ADD COLUMN venue TEXT",
	"ALTER TABLE gigs ADD COLUMN address TEXT",
	"ALTER TABLE gigs ADD COLUMN description TEXT",
	"ALTER TABLE gigs ADD COLUMN contact TEXT",
	"ALTER TABLE gigs ADD COLUMN instagram TEXT",
	"ALTER TABLE comics ADD COLUMN bio TEXT",
	"ALTER TABLE comics ADD COLUMN notes TEXT",
	"ALTER TABLE comics ADD COLUMN contact TEXT",
	"ALTER TABLE comics ADD COLUMN default_fee TEXT",
	"ALTER TABLE lineup ADD COLUMN fee TEXT",
	"ALTER TABLE lineup ADD COLUMN paid INTEGER NOT NULL DEFAULT 0",
];

// one MC, one headliner and distinct comic positions per event
pub const LINEUP_INDEXES: &str = r#"

CREATE UNIQUE INDEX IF NOT EXISTS lineup_unique_role
	ON lineup(event_id, role) WHERE role IN ('MC', 'HEADLINER');

CREATE UNIQUE INDEX IF NOT EXISTS lineup_unique_position
	ON lineup(event_id, position) WHERE role = 'COMIC';

"#;

pub fn statements(script: &str) -> impl Iterator<Item = &str> {
	script.split(';').map(str::trim).filter(|stmt| !stmt.is_empty())
}

pub const SELECT_GIG: &str = r#"
SELECT
	id, name,
	COALESCE(recurrence, '') AS recurrence,
	COALESCE(venue, '') AS venue,
	COALESCE(address, '') AS address,
	COALESCE(description, '') AS description,
	COALESCE(contact, '') AS contact,
	COALESCE(instagram, '') AS instagram
FROM
	gigs
"#;

pub const SELECT_EVENT: &str = r#"
SELECT
	id, gig_id, date, time,
	COALESCE(timeline, '') AS notes
FROM
	events
"#;

pub const SELECT_COMIC: &str = r#"
SELECT
	id, name,
	COALESCE(bio, '') AS bio,
	COALESCE(notes, '') AS notes,
	COALESCE(contact, '') AS contact,
	COALESCE(default_fee, '') AS default_fee
FROM
	comics
"#;

pub const SELECT_LINEUP: &str = r#"
SELECT
	lineup.id, lineup.event_id, lineup.comic_id,
	lineup.role, lineup.position,
	COALESCE(lineup.fee, '') AS fee,
	COALESCE(lineup.paid, 0) AS paid,
	comics.name AS comic_name
FROM
	lineup JOIN comics ON lineup.comic_id = comics.id
"#;

pub const LINEUP_ORDER: &str = r#"
ORDER BY
	CASE lineup.role WHEN 'MC' THEN 0 WHEN 'HEADLINER' THEN 1 ELSE 2 END,
	lineup.position, lineup.id
"#;
