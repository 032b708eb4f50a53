use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use tracing::{debug, warn};

use super::{Store, StoreFuture};
use crate::error::{AppError, AppResult};
use crate::lineup;
use crate::sql;
use crate::types::{
	Comic, ComicId, Event, EventId, Gig, GigId, LineupEntry, LineupId, LineupItem, LineupQuery,
	NewComic, NewEvent, NewGig, NewLineupEntry, Role,
};

pub struct SqliteStore {
	db: Pool<Sqlite>,
}

impl SqliteStore {
	pub async fn connect(url: &str) -> AppResult<Self> {
		let options = SqliteConnectOptions::from_str(url)?
			.create_if_missing(true)
			.foreign_keys(true);

		let db = SqlitePoolOptions::new()
			.max_connections(5)
			.acquire_timeout(Duration::from_secs(3))
			.connect_with(options)
			.await?;

		Self::with_pool(db).await
	}

	/// Private database living as long as the store; one connection so every
	/// query sees the same data.
	pub async fn in_memory() -> AppResult<Self> {
		let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

		let db = SqlitePoolOptions::new()
			.max_connections(1)
			.idle_timeout(None::<Duration>)
			.max_lifetime(None::<Duration>)
			.connect_with(options)
			.await?;

		Self::with_pool(db).await
	}

	async fn with_pool(db: Pool<Sqlite>) -> AppResult<Self> {
		let store = SqliteStore { db };
		store.migrate().await?;
		Ok(store)
	}

	async fn migrate(&self) -> AppResult<()> {
		for stmt in sql::statements(sql::TABLE_SCHEMA) {
			sqlx::query(stmt).execute(&self.db).await?;
		}

		for stmt in sql::ADD_COLUMNS {
			match sqlx::query(stmt).execute(&self.db).await {
				Ok(_) => debug!("migrated: {stmt}"),
				Err(e) if e.to_string().contains("duplicate column") => {}
				Err(e) => return Err(e.into()),
			}
		}

		for stmt in sql::statements(sql::LINEUP_INDEXES) {
			// older databases may already hold duplicates; keep serving them
			if let Err(e) = sqlx::query(stmt).execute(&self.db).await {
				warn!("can't create lineup index, duplicates present? {e}");
			}
		}
		Ok(())
	}

	pub async fn close(&self) {
		self.db.close().await;
	}

	async fn count(&self, query: &str, id: i64) -> AppResult<i64> {
		Ok(sqlx::query_scalar(query).bind(id).fetch_one(&self.db).await?)
	}

	async fn exists(&self, query: &str, id: i64) -> AppResult<bool> {
		Ok(self.count(query, id).await? > 0)
	}
}

fn affected(rows: u64, entity: &'static str, id: i64) -> AppResult<()> {
	if rows == 0 {
		Err(AppError::not_found(entity, id))
	} else {
		Ok(())
	}
}

fn role_conflict(err: sqlx::Error, role: Role) -> AppError {
	let unique = err
		.as_database_error()
		.is_some_and(|db_err| db_err.is_unique_violation());
	if unique && role.is_unique() {
		AppError::RoleTaken(role)
	} else {
		err.into()
	}
}

/// Books `entry` inside `BEGIN IMMEDIATE`, so the write lock is held before
/// the lineup is read and a concurrent writer waits on the busy timeout
/// instead of failing the upgrade.
async fn assign_immediate(db: &Pool<Sqlite>, entry: NewLineupEntry) -> AppResult<LineupEntry> {
	let mut conn = db.acquire().await?;
	sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

	let outcome = match insert_lineup(&mut *conn, entry).await {
		Ok(created) => sqlx::query("COMMIT")
			.execute(&mut *conn)
			.await
			.map(|_| created)
			.map_err(AppError::from),
		Err(e) => Err(e),
	};

	if outcome.is_err() {
		if let Err(rollback) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
			// don't hand a connection stuck in a transaction back to the pool
			warn!("rollback after failed booking: {rollback}");
			drop(conn.detach());
		}
	}
	outcome
}

async fn insert_lineup(
	conn: &mut SqliteConnection,
	entry: NewLineupEntry,
) -> AppResult<LineupEntry> {
	let event: Option<i64> = sqlx::query_scalar("SELECT id FROM events WHERE id = ?")
		.bind(entry.event_id)
		.fetch_optional(&mut *conn)
		.await?;
	if event.is_none() {
		return Err(AppError::not_found("event", entry.event_id));
	}

	let default_fee: String =
		sqlx::query_scalar("SELECT COALESCE(default_fee, '') FROM comics WHERE id = ?")
			.bind(entry.comic_id)
			.fetch_optional(&mut *conn)
			.await?
			.ok_or(AppError::not_found("comic", entry.comic_id))?;

	let booked = sqlx::query_as::<_, LineupQuery>(
		r#"
SELECT
	id, event_id, comic_id, role, position,
	COALESCE(fee, '') AS fee, COALESCE(paid, 0) AS paid, '' AS comic_name
FROM
	lineup
WHERE
	event_id = ?
		"#,
	)
	.bind(entry.event_id)
	.fetch_all(&mut *conn)
	.await?
	.into_iter()
	.map(|row| row.into_item().map(|item| item.entry))
	.collect::<AppResult<Vec<LineupEntry>>>()?;

	let position = lineup::plan_assignment(&booked, entry.role)?;
	let fee = entry.fee.unwrap_or(default_fee);

	let id = sqlx::query(
		r#"
INSERT INTO lineup
	(event_id, comic_id, role, position, fee, paid)
VALUES
	(?, ?, ?, ?, ?, 0)
		"#,
	)
	.bind(entry.event_id)
	.bind(entry.comic_id)
	.bind(entry.role.as_str())
	.bind(position)
	.bind(&fee)
	.execute(&mut *conn)
	.await
	.map_err(|e| role_conflict(e, entry.role))?
	.last_insert_rowid();

	Ok(LineupEntry {
		id,
		event_id: entry.event_id,
		comic_id: entry.comic_id,
		role: entry.role,
		position,
		fee,
		paid: false,
	})
}

impl Store for SqliteStore {
	fn create_gig(&self, gig: NewGig) -> StoreFuture<'_, Gig> {
		Box::pin(async move {
			let id = sqlx::query(
				r#"
INSERT INTO gigs
	(name, recurrence, venue, address, description, contact, instagram)
VALUES
	(?, ?, ?, ?, ?, ?, ?)
				"#,
			)
			.bind(&gig.name)
			.bind(&gig.recurrence)
			.bind(&gig.venue)
			.bind(&gig.address)
			.bind(&gig.description)
			.bind(&gig.contact)
			.bind(&gig.instagram)
			.execute(&self.db)
			.await?
			.last_insert_rowid();

			Ok(Gig {
				id,
				name: gig.name,
				recurrence: gig.recurrence,
				venue: gig.venue,
				address: gig.address,
				description: gig.description,
				contact: gig.contact,
				instagram: gig.instagram,
			})
		})
	}

	fn list_gigs(&self) -> StoreFuture<'_, Vec<Gig>> {
		Box::pin(async move {
			let query = format!("{} ORDER BY id", sql::SELECT_GIG);
			Ok(sqlx::query_as::<_, Gig>(&query).fetch_all(&self.db).await?)
		})
	}

	fn get_gig(&self, id: GigId) -> StoreFuture<'_, Gig> {
		Box::pin(async move {
			let query = format!("{} WHERE id = ?", sql::SELECT_GIG);
			sqlx::query_as::<_, Gig>(&query)
				.bind(id)
				.fetch_optional(&self.db)
				.await?
				.ok_or(AppError::not_found("gig", id))
		})
	}

	fn update_gig(&self, id: GigId, gig: NewGig) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let rows = sqlx::query(
				r#"
UPDATE gigs SET
	name = ?, recurrence = ?, venue = ?, address = ?,
	description = ?, contact = ?, instagram = ?
WHERE
	id = ?
				"#,
			)
			.bind(gig.name)
			.bind(gig.recurrence)
			.bind(gig.venue)
			.bind(gig.address)
			.bind(gig.description)
			.bind(gig.contact)
			.bind(gig.instagram)
			.bind(id)
			.execute(&self.db)
			.await?
			.rows_affected();
			affected(rows, "gig", id)
		})
	}

	fn delete_gig(&self, id: GigId) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			if self.exists("SELECT COUNT(*) FROM events WHERE gig_id = ?", id).await? {
				return Err(AppError::StillReferenced { entity: "gig", id });
			}
			let rows = sqlx::query("DELETE FROM gigs WHERE id = ?")
				.bind(id)
				.execute(&self.db)
				.await?
				.rows_affected();
			affected(rows, "gig", id)
		})
	}

	fn create_event(&self, event: NewEvent) -> StoreFuture<'_, Event> {
		Box::pin(async move {
			if !self.exists("SELECT COUNT(*) FROM gigs WHERE id = ?", event.gig_id).await? {
				return Err(AppError::not_found("gig", event.gig_id));
			}
			let id = sqlx::query("INSERT INTO events (gig_id, date, time) VALUES (?, ?, ?)")
				.bind(event.gig_id)
				.bind(&event.date)
				.bind(&event.time)
				.execute(&self.db)
				.await?
				.last_insert_rowid();

			Ok(Event {
				id,
				gig_id: event.gig_id,
				date: event.date,
				time: event.time,
				notes: String::new(),
			})
		})
	}

	fn list_events(&self, gig_id: GigId) -> StoreFuture<'_, Vec<Event>> {
		Box::pin(async move {
			let query = format!("{} WHERE gig_id = ? ORDER BY date, time, id", sql::SELECT_EVENT);
			Ok(sqlx::query_as::<_, Event>(&query)
				.bind(gig_id)
				.fetch_all(&self.db)
				.await?)
		})
	}

	fn get_event(&self, id: EventId) -> StoreFuture<'_, Event> {
		Box::pin(async move {
			let query = format!("{} WHERE id = ?", sql::SELECT_EVENT);
			sqlx::query_as::<_, Event>(&query)
				.bind(id)
				.fetch_optional(&self.db)
				.await?
				.ok_or(AppError::not_found("event", id))
		})
	}

	fn update_event_notes(&self, id: EventId, notes: String) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let rows = sqlx::query("UPDATE events SET timeline = ? WHERE id = ?")
				.bind(notes)
				.bind(id)
				.execute(&self.db)
				.await?
				.rows_affected();
			affected(rows, "event", id)
		})
	}

	fn delete_event(&self, id: EventId) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			// entries whose comic row is gone are invisible on the event page,
			// so they don't hold the event and go with it
			let booked = r#"
SELECT COUNT(*)
FROM lineup JOIN comics ON comics.id = lineup.comic_id
WHERE lineup.event_id = ?
			"#;
			if self.exists(booked, id).await? {
				return Err(AppError::StillReferenced { entity: "event", id });
			}

			let mut tx = self.db.begin().await?;
			let orphans = sqlx::query(
				"DELETE FROM lineup WHERE event_id = ? AND comic_id NOT IN (SELECT id FROM comics)",
			)
			.bind(id)
			.execute(&mut *tx)
			.await?
			.rows_affected();
			if orphans > 0 {
				debug!("dropped {orphans} orphaned lineup entries of event {id}");
			}

			let rows = sqlx::query("DELETE FROM events WHERE id = ?")
				.bind(id)
				.execute(&mut *tx)
				.await?
				.rows_affected();
			affected(rows, "event", id)?;
			tx.commit().await?;
			Ok(())
		})
	}

	fn create_comic(&self, comic: NewComic) -> StoreFuture<'_, Comic> {
		Box::pin(async move {
			let id = sqlx::query(
				r#"
INSERT INTO comics
	(name, bio, notes, contact, default_fee)
VALUES
	(?, ?, ?, ?, ?)
				"#,
			)
			.bind(&comic.name)
			.bind(&comic.bio)
			.bind(&comic.notes)
			.bind(&comic.contact)
			.bind(&comic.default_fee)
			.execute(&self.db)
			.await?
			.last_insert_rowid();

			Ok(Comic {
				id,
				name: comic.name,
				bio: comic.bio,
				notes: comic.notes,
				contact: comic.contact,
				default_fee: comic.default_fee,
			})
		})
	}

	fn list_comics(&self) -> StoreFuture<'_, Vec<Comic>> {
		Box::pin(async move {
			let query = format!("{} ORDER BY name, id", sql::SELECT_COMIC);
			Ok(sqlx::query_as::<_, Comic>(&query).fetch_all(&self.db).await?)
		})
	}

	fn get_comic(&self, id: ComicId) -> StoreFuture<'_, Comic> {
		Box::pin(async move {
			let query = format!("{} WHERE id = ?", sql::SELECT_COMIC);
			sqlx::query_as::<_, Comic>(&query)
				.bind(id)
				.fetch_optional(&self.db)
				.await?
				.ok_or(AppError::not_found("comic", id))
		})
	}

	fn update_comic(&self, id: ComicId, comic: NewComic) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let rows = sqlx::query(
				r#"
UPDATE comics SET
	name = ?, bio = ?, notes = ?, contact = ?, default_fee = ?
WHERE
	id = ?
				"#,
			)
			.bind(comic.name)
			.bind(comic.bio)
			.bind(comic.notes)
			.bind(comic.contact)
			.bind(comic.default_fee)
			.bind(id)
			.execute(&self.db)
			.await?
			.rows_affected();
			affected(rows, "comic", id)
		})
	}

	fn delete_comic(&self, id: ComicId) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			if self.exists("SELECT COUNT(*) FROM lineup WHERE comic_id = ?", id).await? {
				return Err(AppError::StillReferenced { entity: "comic", id });
			}
			let rows = sqlx::query("DELETE FROM comics WHERE id = ?")
				.bind(id)
				.execute(&self.db)
				.await?
				.rows_affected();
			affected(rows, "comic", id)
		})
	}

	fn assign_role(&self, entry: NewLineupEntry) -> StoreFuture<'_, LineupEntry> {
		Box::pin(async move {
			// runs on its own task so a dropped request can't leave the
			// connection inside an open transaction
			let db = self.db.clone();
			tokio::spawn(async move { assign_immediate(&db, entry).await }).await?
		})
	}

	fn list_lineup(&self, event_id: EventId) -> StoreFuture<'_, Vec<LineupItem>> {
		Box::pin(async move {
			let query = format!(
				"{} WHERE lineup.event_id = ? {}",
				sql::SELECT_LINEUP,
				sql::LINEUP_ORDER
			);
			sqlx::query_as::<_, LineupQuery>(&query)
				.bind(event_id)
				.fetch_all(&self.db)
				.await?
				.into_iter()
				.map(LineupQuery::into_item)
				.collect()
		})
	}

	fn update_lineup_payment(&self, id: LineupId, fee: String, paid: bool) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let rows = sqlx::query("UPDATE lineup SET fee = ?, paid = ? WHERE id = ?")
				.bind(fee)
				.bind(paid)
				.bind(id)
				.execute(&self.db)
				.await?
				.rows_affected();
			affected(rows, "lineup entry", id)
		})
	}

	fn remove_lineup_entry(&self, id: LineupId) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let rows = sqlx::query("DELETE FROM lineup WHERE id = ?")
				.bind(id)
				.execute(&self.db)
				.await?
				.rows_affected();
			affected(rows, "lineup entry", id)
		})
	}
}
