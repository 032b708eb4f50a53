//! Whole-database-in-one-file backend. The document is kept in memory behind
//! a lock and written back (temp file, then rename) after every mutation.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{Store, StoreFuture};
use crate::error::{AppError, AppResult};
use crate::lineup;
use crate::types::{
	Comic, ComicId, Event, EventId, Gig, GigId, LineupEntry, LineupId, LineupItem, NewComic,
	NewEvent, NewGig, NewLineupEntry,
};

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
	#[serde(default)]
	pub gigs: Vec<Gig>,
	#[serde(default)]
	pub events: Vec<Event>,
	#[serde(default)]
	pub comics: Vec<Comic>,
	#[serde(default)]
	pub lineup: Vec<LineupEntry>,
	#[serde(default)]
	pub sequences: Sequences,
}

/// Last id handed out per table, so deleted ids are never reused.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequences {
	#[serde(default)]
	pub gigs: i64,
	#[serde(default)]
	pub events: i64,
	#[serde(default)]
	pub comics: i64,
	#[serde(default)]
	pub lineup: i64,
}

fn next_id(seq: &mut i64, taken: impl Iterator<Item = i64>) -> i64 {
	// documents written by hand may lack sequences
	*seq = (*seq).max(taken.max().unwrap_or(0)) + 1;
	*seq
}

impl Document {
	fn gig_mut(&mut self, id: GigId) -> AppResult<&mut Gig> {
		self.gigs
			.iter_mut()
			.find(|gig| gig.id == id)
			.ok_or(AppError::not_found("gig", id))
	}

	fn event_mut(&mut self, id: EventId) -> AppResult<&mut Event> {
		self.events
			.iter_mut()
			.find(|event| event.id == id)
			.ok_or(AppError::not_found("event", id))
	}

	fn comic(&self, id: ComicId) -> AppResult<&Comic> {
		self.comics
			.iter()
			.find(|comic| comic.id == id)
			.ok_or(AppError::not_found("comic", id))
	}

	fn comic_mut(&mut self, id: ComicId) -> AppResult<&mut Comic> {
		self.comics
			.iter_mut()
			.find(|comic| comic.id == id)
			.ok_or(AppError::not_found("comic", id))
	}

	fn lineup_mut(&mut self, id: LineupId) -> AppResult<&mut LineupEntry> {
		self.lineup
			.iter_mut()
			.find(|entry| entry.id == id)
			.ok_or(AppError::not_found("lineup entry", id))
	}

	fn comic_name(&self, id: ComicId) -> Option<&str> {
		self.comics
			.iter()
			.find(|comic| comic.id == id)
			.map(|comic| comic.name.as_str())
	}
}

fn remove_by<T>(
	items: &mut Vec<T>,
	pred: impl Fn(&T) -> bool,
	entity: &'static str,
	id: i64,
) -> AppResult<()> {
	let before = items.len();
	items.retain(|item| !pred(item));
	if items.len() == before {
		Err(AppError::not_found(entity, id))
	} else {
		Ok(())
	}
}

pub struct JsonStore {
	path: PathBuf,
	doc: Mutex<Document>,
}

impl JsonStore {
	/// Loads `path`, starting from an empty document when it doesn't exist yet.
	pub async fn open(path: impl Into<PathBuf>) -> AppResult<Self> {
		let path = path.into();
		let doc = match tokio::fs::read(&path).await {
			Ok(bytes) => serde_json::from_slice(&bytes)?,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				info!("{} doesn't exist yet, starting empty", path.display());
				Document::default()
			}
			Err(e) => return Err(e.into()),
		};

		Ok(JsonStore {
			path,
			doc: Mutex::new(doc),
		})
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	pub async fn snapshot(&self) -> Document {
		self.doc.lock().await.clone()
	}

	/// Runs `change` against the document and persists it when it succeeds.
	/// On failure the in-memory document is left as it was.
	async fn mutate<T>(&self, change: impl FnOnce(&mut Document) -> AppResult<T>) -> AppResult<T> {
		let mut doc = self.doc.lock().await;
		let mut next = doc.clone();
		let out = change(&mut next)?;
		self.persist(&next).await?;
		*doc = next;
		Ok(out)
	}

	async fn persist(&self, doc: &Document) -> AppResult<()> {
		let bytes = serde_json::to_vec_pretty(doc)?;
		let tmp = self.path.with_extension("json.tmp");
		tokio::fs::write(&tmp, bytes).await?;
		tokio::fs::rename(&tmp, &self.path).await?;
		debug!("wrote {}", self.path.display());
		Ok(())
	}

	async fn read<T>(&self, view: impl FnOnce(&Document) -> AppResult<T>) -> AppResult<T> {
		let doc = self.doc.lock().await;
		view(&doc)
	}
}

impl Store for JsonStore {
	fn create_gig(&self, gig: NewGig) -> StoreFuture<'_, Gig> {
		Box::pin(self.mutate(move |doc| {
			let id = next_id(&mut doc.sequences.gigs, doc.gigs.iter().map(|g| g.id));
			let gig = Gig {
				id,
				name: gig.name,
				recurrence: gig.recurrence,
				venue: gig.venue,
				address: gig.address,
				description: gig.description,
				contact: gig.contact,
				instagram: gig.instagram,
			};
			doc.gigs.push(gig.clone());
			Ok(gig)
		}))
	}

	fn list_gigs(&self) -> StoreFuture<'_, Vec<Gig>> {
		Box::pin(self.read(|doc| {
			let mut gigs = doc.gigs.clone();
			gigs.sort_by_key(|gig| gig.id);
			Ok(gigs)
		}))
	}

	fn get_gig(&self, id: GigId) -> StoreFuture<'_, Gig> {
		Box::pin(self.read(move |doc| {
			doc.gigs
				.iter()
				.find(|gig| gig.id == id)
				.cloned()
				.ok_or(AppError::not_found("gig", id))
		}))
	}

	fn update_gig(&self, id: GigId, gig: NewGig) -> StoreFuture<'_, ()> {
		Box::pin(self.mutate(move |doc| {
			let stored = doc.gig_mut(id)?;
			*stored = Gig {
				id,
				name: gig.name,
				recurrence: gig.recurrence,
				venue: gig.venue,
				address: gig.address,
				description: gig.description,
				contact: gig.contact,
				instagram: gig.instagram,
			};
			Ok(())
		}))
	}

	fn delete_gig(&self, id: GigId) -> StoreFuture<'_, ()> {
		Box::pin(self.mutate(move |doc| {
			if doc.events.iter().any(|event| event.gig_id == id) {
				return Err(AppError::StillReferenced { entity: "gig", id });
			}
			remove_by(&mut doc.gigs, |gig| gig.id == id, "gig", id)
		}))
	}

	fn create_event(&self, event: NewEvent) -> StoreFuture<'_, Event> {
		Box::pin(self.mutate(move |doc| {
			doc.gig_mut(event.gig_id)?;
			let id = next_id(&mut doc.sequences.events, doc.events.iter().map(|e| e.id));
			let event = Event {
				id,
				gig_id: event.gig_id,
				date: event.date,
				time: event.time,
				notes: String::new(),
			};
			doc.events.push(event.clone());
			Ok(event)
		}))
	}

	fn list_events(&self, gig_id: GigId) -> StoreFuture<'_, Vec<Event>> {
		Box::pin(self.read(move |doc| {
			let mut events: Vec<Event> = doc
				.events
				.iter()
				.filter(|event| event.gig_id == gig_id)
				.cloned()
				.collect();
			events.sort_by(|a, b| (&a.date, &a.time, a.id).cmp(&(&b.date, &b.time, b.id)));
			Ok(events)
		}))
	}

	fn get_event(&self, id: EventId) -> StoreFuture<'_, Event> {
		Box::pin(self.read(move |doc| {
			doc.events
				.iter()
				.find(|event| event.id == id)
				.cloned()
				.ok_or(AppError::not_found("event", id))
		}))
	}

	fn update_event_notes(&self, id: EventId, notes: String) -> StoreFuture<'_, ()> {
		Box::pin(self.mutate(move |doc| {
			doc.event_mut(id)?.notes = notes;
			Ok(())
		}))
	}

	fn delete_event(&self, id: EventId) -> StoreFuture<'_, ()> {
		Box::pin(self.mutate(move |doc| {
			let booked = doc
				.lineup
				.iter()
				.any(|entry| entry.event_id == id && doc.comic_name(entry.comic_id).is_some());
			if booked {
				return Err(AppError::StillReferenced { entity: "event", id });
			}
			remove_by(&mut doc.events, |event| event.id == id, "event", id)?;
			// entries left without a comic go with their event
			doc.lineup.retain(|entry| entry.event_id != id);
			Ok(())
		}))
	}

	fn create_comic(&self, comic: NewComic) -> StoreFuture<'_, Comic> {
		Box::pin(self.mutate(move |doc| {
			let id = next_id(&mut doc.sequences.comics, doc.comics.iter().map(|c| c.id));
			let comic = Comic {
				id,
				name: comic.name,
				bio: comic.bio,
				notes: comic.notes,
				contact: comic.contact,
				default_fee: comic.default_fee,
			};
			doc.comics.push(comic.clone());
			Ok(comic)
		}))
	}

	fn list_comics(&self) -> StoreFuture<'_, Vec<Comic>> {
		Box::pin(self.read(|doc| {
			let mut comics = doc.comics.clone();
			// byte-wise, same as SQLite's default BINARY collation
			comics.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
			Ok(comics)
		}))
	}

	fn get_comic(&self, id: ComicId) -> StoreFuture<'_, Comic> {
		Box::pin(self.read(move |doc| doc.comic(id).cloned()))
	}

	fn update_comic(&self, id: ComicId, comic: NewComic) -> StoreFuture<'_, ()> {
		Box::pin(self.mutate(move |doc| {
			let stored = doc.comic_mut(id)?;
			*stored = Comic {
				id,
				name: comic.name,
				bio: comic.bio,
				notes: comic.notes,
				contact: comic.contact,
				default_fee: comic.default_fee,
			};
			Ok(())
		}))
	}

	fn delete_comic(&self, id: ComicId) -> StoreFuture<'_, ()> {
		Box::pin(self.mutate(move |doc| {
			if doc.lineup.iter().any(|entry| entry.comic_id == id) {
				return Err(AppError::StillReferenced { entity: "comic", id });
			}
			remove_by(&mut doc.comics, |comic| comic.id == id, "comic", id)
		}))
	}

	fn assign_role(&self, entry: NewLineupEntry) -> StoreFuture<'_, LineupEntry> {
		Box::pin(self.mutate(move |doc| {
			doc.event_mut(entry.event_id)?;
			let default_fee = doc.comic(entry.comic_id)?.default_fee.clone();

			let booked = doc.lineup.iter().filter(|e| e.event_id == entry.event_id);
			let position = lineup::plan_assignment(booked, entry.role)?;

			let id = next_id(&mut doc.sequences.lineup, doc.lineup.iter().map(|e| e.id));
			let created = LineupEntry {
				id,
				event_id: entry.event_id,
				comic_id: entry.comic_id,
				role: entry.role,
				position,
				fee: entry.fee.unwrap_or(default_fee),
				paid: false,
			};
			doc.lineup.push(created.clone());
			Ok(created)
		}))
	}

	fn list_lineup(&self, event_id: EventId) -> StoreFuture<'_, Vec<LineupItem>> {
		Box::pin(self.read(move |doc| {
			// same inner join as the SQL backend: entries of missing comics are skipped
			let mut items: Vec<LineupItem> = doc
				.lineup
				.iter()
				.filter(|entry| entry.event_id == event_id)
				.filter_map(|entry| {
					doc.comic_name(entry.comic_id).map(|name| LineupItem {
						entry: entry.clone(),
						comic_name: name.to_string(),
					})
				})
				.collect();
			items.sort_by_key(|item| (item.entry.role.rank(), item.entry.position, item.entry.id));
			Ok(items)
		}))
	}

	fn update_lineup_payment(&self, id: LineupId, fee: String, paid: bool) -> StoreFuture<'_, ()> {
		Box::pin(self.mutate(move |doc| {
			let entry = doc.lineup_mut(id)?;
			entry.fee = fee;
			entry.paid = paid;
			Ok(())
		}))
	}

	fn remove_lineup_entry(&self, id: LineupId) -> StoreFuture<'_, ()> {
		Box::pin(self.mutate(move |doc| {
			remove_by(&mut doc.lineup, |entry| entry.id == id, "lineup entry", id)
		}))
	}
}
