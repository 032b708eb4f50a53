#![allow(dead_code)]
use std::sync::Arc;

use gigbook::error::AppResult;
use gigbook::store::{JsonStore, SqliteStore, Store};
use gigbook::types::{
	Comic, Event, LineupEntry, NewComic, NewEvent, NewGig, NewLineupEntry, Role,
};
use tempfile::TempDir;

/// A store under test plus whatever has to stay alive with it.
pub struct Backend {
	pub name: &'static str,
	pub store: Arc<dyn Store>,
	_dir: Option<TempDir>,
}

pub async fn sqlite() -> Backend {
	let store = SqliteStore::in_memory().await.expect("open in-memory sqlite");
	Backend {
		name: "sqlite",
		store: Arc::new(store),
		_dir: None,
	}
}

pub async fn json() -> Backend {
	let dir = tempfile::tempdir().expect("create temp dir");
	let store = JsonStore::open(dir.path().join("data.json"))
		.await
		.expect("open json store");
	Backend {
		name: "json",
		store: Arc::new(store),
		_dir: Some(dir),
	}
}

/// Every backend, each freshly created and empty.
pub async fn backends() -> Vec<Backend> {
	vec![sqlite().await, json().await]
}

pub fn gig(name: &str) -> NewGig {
	NewGig {
		name: name.to_string(),
		..NewGig::default()
	}
}

pub fn comic(name: &str) -> NewComic {
	NewComic {
		name: name.to_string(),
		..NewComic::default()
	}
}

/// Creates a gig with one event on 2024-01-01 20:00.
pub async fn add_event(store: &dyn Store) -> Event {
	let gig = store.create_gig(gig("Gig")).await.expect("create gig");
	store
		.create_event(NewEvent {
			gig_id: gig.id,
			date: "2024-01-01".to_string(),
			time: "20:00".to_string(),
		})
		.await
		.expect("create event")
}

pub async fn add_comic(store: &dyn Store, name: &str) -> Comic {
	store.create_comic(comic(name)).await.expect("create comic")
}

pub fn booking(event_id: i64, comic_id: i64, role: Role) -> NewLineupEntry {
	NewLineupEntry {
		event_id,
		comic_id,
		role,
		fee: None,
	}
}

pub async fn book(
	store: &dyn Store,
	event: &Event,
	comic: &Comic,
	role: Role,
) -> AppResult<LineupEntry> {
	store.assign_role(booking(event.id, comic.id, role)).await
}
