mod common;

use std::str::FromStr;
use std::sync::Arc;

use common::{add_comic, add_event, backends, book, booking, comic, gig};
use gigbook::error::AppError;
use gigbook::store::{JsonStore, SqliteStore, Store};
use gigbook::types::{LineupEntry, NewEvent, NewLineupEntry, Role};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Connection};

#[tokio::test]
async fn fetch_comics_is_empty_then_sorted_by_name() {
	for backend in backends().await {
		let store = &*backend.store;
		assert!(store.list_comics().await.unwrap().is_empty(), "{}", backend.name);

		add_comic(store, "Zed").await;
		add_comic(store, "Anna").await;

		let names: Vec<String> = store
			.list_comics()
			.await
			.unwrap()
			.into_iter()
			.map(|c| c.name)
			.collect();
		assert_eq!(names, ["Anna", "Zed"], "{}", backend.name);
	}
}

#[tokio::test]
async fn comic_names_sort_byte_wise() {
	for backend in backends().await {
		let store = &*backend.store;
		for name in ["bob", "Carl", "Alice"] {
			add_comic(store, name).await;
		}

		let names: Vec<String> = store
			.list_comics()
			.await
			.unwrap()
			.into_iter()
			.map(|c| c.name)
			.collect();
		assert_eq!(names, ["Alice", "Carl", "bob"], "{}", backend.name);
	}
}

#[tokio::test]
async fn second_mc_conflicts_and_changes_nothing() {
	for backend in backends().await {
		let store = &*backend.store;
		let event = add_event(store).await;
		let one = add_comic(store, "One").await;
		let two = add_comic(store, "Two").await;

		book(store, &event, &one, Role::Mc).await.unwrap();
		let err = book(store, &event, &two, Role::Mc).await.unwrap_err();
		assert!(matches!(err, AppError::RoleTaken(Role::Mc)), "{}: {err}", backend.name);

		let lineup = store.list_lineup(event.id).await.unwrap();
		assert_eq!(lineup.len(), 1, "{}", backend.name);
		assert_eq!(lineup[0].comic_name, "One");
	}
}

#[tokio::test]
async fn second_headliner_conflicts() {
	for backend in backends().await {
		let store = &*backend.store;
		let event = add_event(store).await;
		let h1 = add_comic(store, "H1").await;
		let h2 = add_comic(store, "H2").await;

		book(store, &event, &h1, Role::Headliner).await.unwrap();
		let err = book(store, &event, &h2, Role::Headliner).await.unwrap_err();
		assert!(matches!(err, AppError::RoleTaken(Role::Headliner)), "{}: {err}", backend.name);

		// the MC slot is still free
		book(store, &event, &h2, Role::Mc).await.unwrap();
	}
}

#[tokio::test]
async fn unique_roles_are_per_event() {
	for backend in backends().await {
		let store = &*backend.store;
		let first = add_event(store).await;
		let second = add_event(store).await;
		let host = add_comic(store, "Host").await;

		book(store, &first, &host, Role::Mc).await.unwrap();
		book(store, &second, &host, Role::Mc).await.unwrap();
	}
}

#[tokio::test]
async fn comic_positions_count_up_from_one() {
	for backend in backends().await {
		let store = &*backend.store;
		let event = add_event(store).await;
		let host = add_comic(store, "Host").await;
		book(store, &event, &host, Role::Mc).await.unwrap();

		let mut positions = Vec::new();
		for name in ["A", "B", "C"] {
			let c = add_comic(store, name).await;
			positions.push(book(store, &event, &c, Role::Comic).await.unwrap().position);
		}
		assert_eq!(positions, [Some(1), Some(2), Some(3)], "{}", backend.name);
	}
}

#[tokio::test]
async fn removed_positions_are_not_handed_out_again() {
	for backend in backends().await {
		let store = &*backend.store;
		let event = add_event(store).await;
		let c = add_comic(store, "Regular").await;

		let mut entries = Vec::new();
		for _ in 0..3 {
			entries.push(book(store, &event, &c, Role::Comic).await.unwrap());
		}
		store.remove_lineup_entry(entries[1].id).await.unwrap();

		let next = book(store, &event, &c, Role::Comic).await.unwrap();
		assert_eq!(next.position, Some(4), "{}", backend.name);

		let positions: Vec<Option<i64>> = store
			.list_lineup(event.id)
			.await
			.unwrap()
			.into_iter()
			.map(|item| item.entry.position)
			.collect();
		assert_eq!(positions, [Some(1), Some(3), Some(4)], "{}", backend.name);
	}
}

#[tokio::test]
async fn lineup_lists_mc_then_headliner_then_comics() {
	for backend in backends().await {
		let store = &*backend.store;
		let event = add_event(store).await;
		let a = add_comic(store, "Opener").await;
		let b = add_comic(store, "Closer").await;
		let c = add_comic(store, "Host").await;
		let d = add_comic(store, "Middle").await;

		book(store, &event, &a, Role::Comic).await.unwrap();
		book(store, &event, &b, Role::Headliner).await.unwrap();
		book(store, &event, &d, Role::Comic).await.unwrap();
		book(store, &event, &c, Role::Mc).await.unwrap();

		let order: Vec<(Role, String)> = store
			.list_lineup(event.id)
			.await
			.unwrap()
			.into_iter()
			.map(|item| (item.entry.role, item.comic_name))
			.collect();
		assert_eq!(
			order,
			[
				(Role::Mc, "Host".to_string()),
				(Role::Headliner, "Closer".to_string()),
				(Role::Comic, "Opener".to_string()),
				(Role::Comic, "Middle".to_string()),
			],
			"{}",
			backend.name
		);
	}
}

#[tokio::test]
async fn blank_fee_falls_back_to_default_fee() {
	for backend in backends().await {
		let store = &*backend.store;
		let event = add_event(store).await;
		let mut pricey = comic("Pricey");
		pricey.default_fee = "$150".to_string();
		let pricey = store.create_comic(pricey).await.unwrap();

		let entry = book(store, &event, &pricey, Role::Headliner).await.unwrap();
		assert_eq!(entry.fee, "$150", "{}", backend.name);

		let entry = store
			.assign_role(NewLineupEntry {
				event_id: event.id,
				comic_id: pricey.id,
				role: Role::Comic,
				fee: Some("$20".to_string()),
			})
			.await
			.unwrap();
		assert_eq!(entry.fee, "$20", "{}", backend.name);
	}
}

#[tokio::test]
async fn payment_update_sets_fee_and_paid() {
	for backend in backends().await {
		let store = &*backend.store;
		let event = add_event(store).await;
		let c = add_comic(store, "Paid Comic").await;
		let entry = book(store, &event, &c, Role::Comic).await.unwrap();
		assert!(!entry.paid);

		store
			.update_lineup_payment(entry.id, "$80".to_string(), true)
			.await
			.unwrap();
		let stored = &store.list_lineup(event.id).await.unwrap()[0].entry;
		assert_eq!(stored.fee, "$80", "{}", backend.name);
		assert!(stored.paid, "{}", backend.name);

		let err = store
			.update_lineup_payment(entry.id + 100, String::new(), false)
			.await
			.unwrap_err();
		assert!(matches!(err, AppError::NotFound { .. }), "{}", backend.name);
	}
}

#[tokio::test]
async fn assignment_needs_existing_event_and_comic() {
	for backend in backends().await {
		let store = &*backend.store;
		let event = add_event(store).await;
		let c = add_comic(store, "Real").await;

		let err = store.assign_role(booking(event.id + 50, c.id, Role::Mc)).await.unwrap_err();
		let missing = matches!(err, AppError::NotFound { entity: "event", .. });
		assert!(missing, "{}: {err}", backend.name);

		let err = store.assign_role(booking(event.id, c.id + 50, Role::Mc)).await.unwrap_err();
		let missing = matches!(err, AppError::NotFound { entity: "comic", .. });
		assert!(missing, "{}: {err}", backend.name);
		assert!(store.list_lineup(event.id).await.unwrap().is_empty());
	}
}

#[tokio::test]
async fn deletes_are_refused_while_referenced() {
	for backend in backends().await {
		let store = &*backend.store;
		let event = add_event(store).await;
		let c = add_comic(store, "Busy").await;
		let entry = book(store, &event, &c, Role::Comic).await.unwrap();

		let err = store.delete_comic(c.id).await.unwrap_err();
		let refused = matches!(err, AppError::StillReferenced { entity: "comic", .. });
		assert!(refused, "{}", backend.name);
		let err = store.delete_event(event.id).await.unwrap_err();
		let refused = matches!(err, AppError::StillReferenced { entity: "event", .. });
		assert!(refused, "{}", backend.name);
		let err = store.delete_gig(event.gig_id).await.unwrap_err();
		let refused = matches!(err, AppError::StillReferenced { entity: "gig", .. });
		assert!(refused, "{}", backend.name);

		store.remove_lineup_entry(entry.id).await.unwrap();
		store.delete_comic(c.id).await.unwrap();
		store.delete_event(event.id).await.unwrap();
		store.delete_gig(event.gig_id).await.unwrap();

		assert!(matches!(store.get_comic(c.id).await, Err(AppError::NotFound { .. })));
		assert!(matches!(store.get_event(event.id).await, Err(AppError::NotFound { .. })));
		assert!(matches!(store.get_gig(event.gig_id).await, Err(AppError::NotFound { .. })));
		assert!(matches!(store.delete_comic(c.id).await, Err(AppError::NotFound { .. })));
	}
}

#[tokio::test]
async fn updates_replace_stored_fields() {
	for backend in backends().await {
		let store = &*backend.store;
		let event = add_event(store).await;

		let mut details = gig("Tuesday Laughs");
		details.venue = "The Basement".to_string();
		details.instagram = "@tuesdaylaughs".to_string();
		store.update_gig(event.gig_id, details.clone()).await.unwrap();
		let stored = store.get_gig(event.gig_id).await.unwrap();
		assert_eq!(stored.name, "Tuesday Laughs", "{}", backend.name);
		assert_eq!(stored.venue, "The Basement");
		assert_eq!(stored.instagram, "@tuesdaylaughs");

		store
			.update_event_notes(event.id, "doors 7:30, show 8".to_string())
			.await
			.unwrap();
		assert_eq!(store.get_event(event.id).await.unwrap().notes, "doors 7:30, show 8");

		let c = add_comic(store, "Old Name").await;
		let mut renamed = comic("New Name");
		renamed.bio = "Tells jokes".to_string();
		store.update_comic(c.id, renamed).await.unwrap();
		let stored = store.get_comic(c.id).await.unwrap();
		assert_eq!(stored.name, "New Name", "{}", backend.name);
		assert_eq!(stored.bio, "Tells jokes");

		let err = store.update_comic(c.id + 10, comic("Ghost")).await.unwrap_err();
		assert!(matches!(err, AppError::NotFound { .. }), "{}", backend.name);
	}
}

#[tokio::test]
async fn events_list_by_date_then_time() {
	for backend in backends().await {
		let store = &*backend.store;
		let g = store.create_gig(gig("Weekly")).await.unwrap();
		let slots = [("2024-03-01", "21:00"), ("2024-02-01", "20:00"), ("2024-03-01", "19:00")];
		for (date, time) in slots {
			store
				.create_event(NewEvent { gig_id: g.id, date: date.into(), time: time.into() })
				.await
				.unwrap();
		}
		let other = store.create_gig(gig("Other")).await.unwrap();
		store
			.create_event(NewEvent {
				gig_id: other.id,
				date: "2024-01-01".into(),
				time: "20:00".into(),
			})
			.await
			.unwrap();

		let when: Vec<(String, String)> = store
			.list_events(g.id)
			.await
			.unwrap()
			.into_iter()
			.map(|e| (e.date, e.time))
			.collect();
		assert_eq!(
			when,
			[
				("2024-02-01".to_string(), "20:00".to_string()),
				("2024-03-01".to_string(), "19:00".to_string()),
				("2024-03-01".to_string(), "21:00".to_string()),
			],
			"{}",
			backend.name
		);

		let err = store
			.create_event(NewEvent {
				gig_id: other.id + 10,
				date: "2024-01-01".into(),
				time: "20:00".into(),
			})
			.await
			.unwrap_err();
		assert!(matches!(err, AppError::NotFound { entity: "gig", .. }), "{}", backend.name);
	}
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_mc_bookings_let_exactly_one_through() {
	for backend in backends().await {
		let event = add_event(&*backend.store).await;
		let mut comics = Vec::new();
		for i in 0..8 {
			comics.push(add_comic(&*backend.store, &format!("Hopeful {i}")).await);
		}

		let mut tasks = Vec::new();
		for c in comics {
			let store = backend.store.clone();
			let event_id = event.id;
			tasks.push(tokio::spawn(async move {
				store.assign_role(booking(event_id, c.id, Role::Mc)).await
			}));
		}

		let mut booked = 0;
		for task in tasks {
			match task.await.unwrap() {
				Ok(_) => booked += 1,
				Err(AppError::RoleTaken(Role::Mc)) => {}
				Err(e) => panic!("{}: unexpected error {e}", backend.name),
			}
		}
		assert_eq!(booked, 1, "{}", backend.name);
		assert_eq!(backend.store.list_lineup(event.id).await.unwrap().len(), 1);
	}
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sqlite_file_bookings_wait_out_concurrent_writers() {
	let dir = tempfile::tempdir().unwrap();
	let url = format!("sqlite://{}?mode=rwc", dir.path().join("busy.db").display());
	let store: Arc<dyn Store> = Arc::new(SqliteStore::connect(&url).await.unwrap());

	let event = add_event(&*store).await;
	let first = add_comic(&*store, "First").await;
	let paid_id = book(&*store, &event, &first, Role::Comic).await.unwrap().id;

	let mut tasks = Vec::new();
	for i in 0..40 {
		let store = store.clone();
		let event_id = event.id;
		tasks.push(tokio::spawn(async move {
			if i % 2 == 0 {
				let c = store.create_comic(comic(&format!("Comic {i}"))).await?;
				store.assign_role(booking(event_id, c.id, Role::Comic)).await.map(|_| ())
			} else {
				store.update_lineup_payment(paid_id, format!("${i}"), i % 3 == 0).await
			}
		}));
	}
	for task in tasks {
		if let Err(e) = task.await.unwrap() {
			panic!("write under contention failed: {e}");
		}
	}

	let mut positions: Vec<i64> = store
		.list_lineup(event.id)
		.await
		.unwrap()
		.iter()
		.filter_map(|item| item.entry.position)
		.collect();
	positions.sort_unstable();
	assert_eq!(positions, (1..=21).collect::<Vec<i64>>());
}

#[tokio::test]
async fn sqlite_orphaned_lineup_rows_do_not_block_event_delete() {
	let dir = tempfile::tempdir().unwrap();
	let url = format!("sqlite://{}?mode=rwc", dir.path().join("legacy.db").display());

	let event = {
		let store = SqliteStore::connect(&url).await.unwrap();
		let event = add_event(&store).await;
		store.close().await;
		event
	};

	// a row pointing at a comic that no longer exists, as written before
	// foreign keys were enforced
	let mut conn = SqliteConnectOptions::from_str(&url)
		.unwrap()
		.foreign_keys(false)
		.connect()
		.await
		.unwrap();
	sqlx::query(
		"INSERT INTO lineup (event_id, comic_id, role, position) VALUES (?, 999, 'COMIC', 1)",
	)
	.bind(event.id)
	.execute(&mut conn)
	.await
	.unwrap();
	conn.close().await.unwrap();

	let store = SqliteStore::connect(&url).await.unwrap();
	assert!(store.list_lineup(event.id).await.unwrap().is_empty());
	store.delete_event(event.id).await.unwrap();
	assert!(matches!(store.get_event(event.id).await, Err(AppError::NotFound { .. })));

	// a booked comic still holds its event
	let held = add_event(&store).await;
	let c = add_comic(&store, "Booked").await;
	book(&store, &held, &c, Role::Mc).await.unwrap();
	let err = store.delete_event(held.id).await.unwrap_err();
	assert!(matches!(err, AppError::StillReferenced { entity: "event", .. }));
}

#[tokio::test]
async fn json_orphaned_lineup_entries_go_with_their_event() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("data.json");

	let event = {
		let store = JsonStore::open(&path).await.unwrap();
		let event = add_event(&store).await;
		let mut doc = store.snapshot().await;
		doc.lineup.push(LineupEntry {
			id: 1,
			event_id: event.id,
			comic_id: 999,
			role: Role::Comic,
			position: Some(1),
			fee: String::new(),
			paid: false,
		});
		std::fs::write(&path, serde_json::to_vec(&doc).unwrap()).unwrap();
		event
	};

	let store = JsonStore::open(&path).await.unwrap();
	assert!(store.list_lineup(event.id).await.unwrap().is_empty());
	store.delete_event(event.id).await.unwrap();
	assert!(store.snapshot().await.lineup.is_empty());
}

#[tokio::test]
async fn sqlite_file_survives_reopen() {
	let dir = tempfile::tempdir().unwrap();
	let url = format!("sqlite://{}?mode=rwc", dir.path().join("app.db").display());

	let (event_id, entry_id) = {
		let store = SqliteStore::connect(&url).await.unwrap();
		let event = add_event(&store).await;
		let c = add_comic(&store, "Persistent").await;
		let entry = book(&store, &event, &c, Role::Comic).await.unwrap();
		store
			.update_lineup_payment(entry.id, "$40".to_string(), true)
			.await
			.unwrap();
		store.close().await;
		(event.id, entry.id)
	};

	// reopening runs the migrations again over the existing tables
	let store = SqliteStore::connect(&url).await.unwrap();
	let lineup = store.list_lineup(event_id).await.unwrap();
	assert_eq!(lineup.len(), 1);
	assert_eq!(lineup[0].entry.id, entry_id);
	assert_eq!(lineup[0].entry.position, Some(1));
	assert_eq!(lineup[0].entry.fee, "$40");
	assert!(lineup[0].entry.paid);
	assert_eq!(lineup[0].comic_name, "Persistent");
}

#[tokio::test]
async fn json_document_survives_reopen() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("data.json");

	let before = {
		let store = JsonStore::open(&path).await.unwrap();
		let event = add_event(&store).await;
		let host = add_comic(&store, "Host").await;
		book(&store, &event, &host, Role::Headliner).await.unwrap();
		store.update_event_notes(event.id, "bring mic stand".into()).await.unwrap();
		store.snapshot().await
	};

	let raw = std::fs::read_to_string(&path).unwrap();
	assert!(raw.contains("\"HEADLINER\""));

	let store = JsonStore::open(&path).await.unwrap();
	assert_eq!(store.path(), path.as_path());
	assert_eq!(store.snapshot().await, before);
}

#[tokio::test]
async fn json_ids_are_not_reused_after_delete() {
	let dir = tempfile::tempdir().unwrap();
	let store = JsonStore::open(dir.path().join("data.json")).await.unwrap();

	let first = add_comic(&store, "First").await;
	let second = add_comic(&store, "Second").await;
	store.delete_comic(second.id).await.unwrap();
	let third = add_comic(&store, "Third").await;

	assert_eq!(first.id, 1);
	assert_eq!(third.id, second.id + 1);
}

#[tokio::test]
async fn json_failed_mutation_leaves_document_alone() {
	let dir = tempfile::tempdir().unwrap();
	let store = JsonStore::open(dir.path().join("data.json")).await.unwrap();
	let event = add_event(&store).await;
	let host = add_comic(&store, "Host").await;
	book(&store, &event, &host, Role::Mc).await.unwrap();

	let before = store.snapshot().await;
	assert!(book(&store, &event, &host, Role::Mc).await.is_err());
	assert_eq!(store.snapshot().await, before);
}
