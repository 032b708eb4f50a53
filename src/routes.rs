use axum::{
	extract::{Query, State},
	response::Redirect,
	Form,
};
use maud::Markup;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::lineup::EventDisplay;
use crate::types::{
	present, text, ComicForm, EventForm, GigForm, IdParam, NewEvent, NewLineupEntry, Role,
};
use crate::views;
use crate::SharedState;

fn parse_id(raw: &str) -> AppResult<i64> {
	raw.parse().map_err(|_| AppError::MissingId)
}

pub async fn display_gigs(State(state): State<SharedState>) -> AppResult<Markup> {
	let gigs = state.store.list_gigs().await?;
	Ok(views::index(&gigs))
}

pub async fn perform_gigs(
	State(state): State<SharedState>,
	Form(form): Form<GigForm>,
) -> AppResult<Redirect> {
	match form.new_gig() {
		Some(gig) => {
			let gig = state.store.create_gig(gig).await?;
			info!(gig_id = gig.id, "created gig {}", gig.name);
		}
		None => debug!("blank gig name, nothing created"),
	}
	Ok(Redirect::to("/"))
}

pub async fn display_gig(
	State(state): State<SharedState>,
	Query(param): Query<IdParam>,
) -> AppResult<Markup> {
	let id = param.parse()?;
	let gig = state.store.get_gig(id).await?;

	let mut events = Vec::new();
	for event in state.store.list_events(id).await? {
		let lineup = state.store.list_lineup(event.id).await?;
		let display = EventDisplay::build(&lineup, state.comic_slots);
		events.push((event, display));
	}

	Ok(views::gig_page(&gig, &events))
}

pub async fn perform_gig(
	State(state): State<SharedState>,
	Query(param): Query<IdParam>,
	Form(form): Form<GigForm>,
) -> AppResult<Redirect> {
	let id = param.parse()?;

	if form.delete.is_some() {
		state.store.delete_gig(id).await?;
		info!(gig_id = id, "deleted gig");
		return Ok(Redirect::to("/"));
	}

	if form.update_gig.is_some() {
		match form.new_gig() {
			Some(gig) => {
				state.store.update_gig(id, gig).await?;
				info!(gig_id = id, "updated gig");
			}
			None => debug!(gig_id = id, "blank gig name, update skipped"),
		}
	} else if let (Some(date), Some(time)) = (present(&form.date), present(&form.time)) {
		let event = state.store.create_event(NewEvent { gig_id: id, date, time }).await?;
		info!(gig_id = id, event_id = event.id, "scheduled {}", event.display_name());
	} else {
		debug!(gig_id = id, "blank date or time, no event created");
	}

	Ok(Redirect::to(&format!("/gig?id={id}")))
}

pub async fn display_event(
	State(state): State<SharedState>,
	Query(param): Query<IdParam>,
) -> AppResult<Markup> {
	let id = param.parse()?;
	let event = state.store.get_event(id).await?;
	let gig = state.store.get_gig(event.gig_id).await?;
	let comics = state.store.list_comics().await?;
	let lineup = state.store.list_lineup(id).await?;

	Ok(views::event_page(&event, &gig, &comics, &lineup))
}

/// One endpoint for every event form; which one was sent is told apart by the
/// fields present.
pub async fn perform_event(
	State(state): State<SharedState>,
	Query(param): Query<IdParam>,
	Form(form): Form<EventForm>,
) -> AppResult<Redirect> {
	let id = param.parse()?;
	let back = Redirect::to(&format!("/event?id={id}"));

	if form.delete_event.is_some() {
		let event = state.store.get_event(id).await?;
		state.store.delete_event(id).await?;
		info!(event_id = id, "deleted event");
		return Ok(Redirect::to(&format!("/gig?id={}", event.gig_id)));
	}

	if form.update_notes.is_some() {
		state.store.update_event_notes(id, text(&form.notes)).await?;
		debug!(event_id = id, "notes updated");
		return Ok(back);
	}

	if let Some(lineup_id) = present(&form.lineup_id) {
		let lineup_id = parse_id(&lineup_id)?;
		let on_event = state
			.store
			.list_lineup(id)
			.await?
			.iter()
			.any(|item| item.entry.id == lineup_id);
		if !on_event {
			return Err(AppError::not_found("lineup entry", lineup_id));
		}
		if form.remove.is_some() {
			state.store.remove_lineup_entry(lineup_id).await?;
			info!(event_id = id, lineup_id, "removed from lineup");
		} else {
			let paid = present(&form.paid).is_some();
			state
				.store
				.update_lineup_payment(lineup_id, text(&form.fee), paid)
				.await?;
			info!(event_id = id, lineup_id, paid, "payment updated");
		}
		return Ok(back);
	}

	match (present(&form.comic_id), present(&form.role)) {
		(Some(comic_id), Some(role)) => {
			let role: Role = role.parse()?;
			let entry = state
				.store
				.assign_role(NewLineupEntry {
					event_id: id,
					comic_id: parse_id(&comic_id)?,
					role,
					fee: present(&form.fee),
				})
				.await?;
			info!(
				event_id = id,
				comic_id = entry.comic_id,
				position = entry.position,
				"booked as {role}"
			);
		}
		_ => debug!(event_id = id, "no comic or role picked, nothing booked"),
	}

	Ok(back)
}

pub async fn display_comics(State(state): State<SharedState>) -> AppResult<Markup> {
	let comics = state.store.list_comics().await?;
	Ok(views::comics_page(&comics))
}

pub async fn perform_comics(
	State(state): State<SharedState>,
	Form(form): Form<ComicForm>,
) -> AppResult<Redirect> {
	match form.new_comic() {
		Some(comic) => {
			let comic = state.store.create_comic(comic).await?;
			info!(comic_id = comic.id, "added comic {}", comic.name);
		}
		None => debug!("blank comic name, nothing created"),
	}
	Ok(Redirect::to("/comics"))
}

pub async fn display_comic(
	State(state): State<SharedState>,
	Query(param): Query<IdParam>,
) -> AppResult<Markup> {
	let comic = state.store.get_comic(param.parse()?).await?;
	Ok(views::comic_page(&comic))
}

pub async fn perform_comic(
	State(state): State<SharedState>,
	Query(param): Query<IdParam>,
	Form(form): Form<ComicForm>,
) -> AppResult<Redirect> {
	let id = param.parse()?;

	if form.delete.is_some() {
		state.store.delete_comic(id).await?;
		info!(comic_id = id, "deleted comic");
	} else if let Some(comic) = form.new_comic() {
		state.store.update_comic(id, comic).await?;
		info!(comic_id = id, "updated comic");
	} else {
		debug!(comic_id = id, "blank comic name, update skipped");
	}

	Ok(Redirect::to("/comics"))
}
