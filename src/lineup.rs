//! Lineup rules shared by every store backend, and the per-event display
//! (MC, Headliner, numbered comic slots) the pages render.

use crate::error::{AppError, AppResult};
use crate::types::{LineupEntry, LineupItem, Role};

/// Checks `role` against the entries already booked for an event and returns
/// the position the new entry gets: `Some(max + 1)` for comics, `None` for MC
/// and Headliner. Positions are never compacted, so a removed slot's number is
/// not handed out again while a higher one exists.
pub fn plan_assignment<'a, I>(existing: I, role: Role) -> AppResult<Option<i64>>
where
	I: IntoIterator<Item = &'a LineupEntry>,
{
	let mut max_position = 0;
	for entry in existing {
		if role.is_unique() && entry.role == role {
			return Err(AppError::RoleTaken(role));
		}
		if entry.role == Role::Comic {
			max_position = max_position.max(entry.position.unwrap_or(0));
		}
	}

	Ok(match role {
		Role::Comic => Some(max_position + 1),
		Role::Mc | Role::Headliner => None,
	})
}

/// Lineup of one event as shown on the gig page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventDisplay {
	pub mc: Option<String>,
	pub headliner: Option<String>,
	pub comics: Vec<Option<String>>,
}

impl EventDisplay {
	/// Routes entries to their fields. Comics land at `position - 1`; one with no
	/// usable position, a position past the last slot, or a slot already taken
	/// fills the first empty slot. There are `min_slots` slots, or one per booked
	/// comic when more are booked, so nobody is dropped and a stray position
	/// can't blow up the list.
	pub fn build(lineup: &[LineupItem], min_slots: usize) -> Self {
		let booked = lineup
			.iter()
			.filter(|item| item.entry.role == Role::Comic)
			.count();
		let mut display = EventDisplay {
			comics: vec![None; min_slots.max(booked)],
			..EventDisplay::default()
		};

		let mut unplaced = Vec::new();
		for item in lineup {
			let name = item.comic_name.clone();
			match item.entry.role {
				Role::Mc => display.mc = Some(name),
				Role::Headliner => display.headliner = Some(name),
				Role::Comic => {
					let slot = slot_index(item.entry.position)
						.and_then(|idx| display.comics.get_mut(idx))
						.filter(|slot| slot.is_none());
					match slot {
						Some(slot) => *slot = Some(name),
						None => unplaced.push(name),
					}
				}
			}
		}

		// at least as many slots as comics, so a free one always exists
		let mut free = display.comics.iter_mut().filter(|slot| slot.is_none());
		for name in unplaced {
			if let Some(slot) = free.next() {
				*slot = Some(name);
			}
		}

		display
	}

	pub fn booked_comics(&self) -> usize {
		self.comics.iter().filter(|slot| slot.is_some()).count()
	}
}

fn slot_index(position: Option<i64>) -> Option<usize> {
	position
		.filter(|&pos| pos >= 1)
		.and_then(|pos| usize::try_from(pos - 1).ok())
}
