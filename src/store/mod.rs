//! Persistence capability shared by the SQLite and JSON document backends.
//!
//! Handlers only ever see an `Arc<dyn Store>`, so the trait returns boxed
//! futures instead of using `async fn` to stay object safe.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::info;

use crate::config::{Backend, Config};
use crate::error::AppResult;
use crate::types::{
	Comic, ComicId, Event, EventId, Gig, GigId, LineupEntry, LineupId, LineupItem, NewComic,
	NewEvent, NewGig, NewLineupEntry,
};

pub mod json;
pub mod sqlite;

pub use json::JsonStore;
pub use sqlite::SqliteStore;

pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = AppResult<T>> + Send + 'a>>;

/// Create/read/update/delete per entity. Lookups and mutations on an unknown
/// id fail with `AppError::NotFound`; deletes of a record something else still
/// points at fail with `AppError::StillReferenced`.
pub trait Store: Send + Sync {
	fn create_gig(&self, gig: NewGig) -> StoreFuture<'_, Gig>;
	fn list_gigs(&self) -> StoreFuture<'_, Vec<Gig>>;
	fn get_gig(&self, id: GigId) -> StoreFuture<'_, Gig>;
	fn update_gig(&self, id: GigId, gig: NewGig) -> StoreFuture<'_, ()>;
	fn delete_gig(&self, id: GigId) -> StoreFuture<'_, ()>;

	fn create_event(&self, event: NewEvent) -> StoreFuture<'_, Event>;
	/// Events of one gig ordered by date, then time.
	fn list_events(&self, gig_id: GigId) -> StoreFuture<'_, Vec<Event>>;
	fn get_event(&self, id: EventId) -> StoreFuture<'_, Event>;
	fn update_event_notes(&self, id: EventId, notes: String) -> StoreFuture<'_, ()>;
	fn delete_event(&self, id: EventId) -> StoreFuture<'_, ()>;

	fn create_comic(&self, comic: NewComic) -> StoreFuture<'_, Comic>;
	/// All comics ordered by name (byte-wise, so case sensitive).
	fn list_comics(&self) -> StoreFuture<'_, Vec<Comic>>;
	fn get_comic(&self, id: ComicId) -> StoreFuture<'_, Comic>;
	fn update_comic(&self, id: ComicId, comic: NewComic) -> StoreFuture<'_, ()>;
	fn delete_comic(&self, id: ComicId) -> StoreFuture<'_, ()>;

	/// Books a comic into an event following `lineup::plan_assignment`. The
	/// check and the insert happen atomically.
	fn assign_role(&self, entry: NewLineupEntry) -> StoreFuture<'_, LineupEntry>;
	/// MC first, then Headliner, then comics by position.
	fn list_lineup(&self, event_id: EventId) -> StoreFuture<'_, Vec<LineupItem>>;
	fn update_lineup_payment(&self, id: LineupId, fee: String, paid: bool) -> StoreFuture<'_, ()>;
	fn remove_lineup_entry(&self, id: LineupId) -> StoreFuture<'_, ()>;
}

pub async fn open(config: &Config) -> AppResult<Arc<dyn Store>> {
	tokio::fs::create_dir_all(&config.data_dir).await?;

	let store: Arc<dyn Store> = match config.backend {
		Backend::Sqlite => {
			info!("Opening SQLite store at {}", config.database_url);
			Arc::new(SqliteStore::connect(&config.database_url).await?)
		}
		Backend::Json => {
			let path = config.json_path();
			info!("Opening JSON store at {}", path.display());
			Arc::new(JsonStore::open(path).await?)
		}
	};
	Ok(store)
}
