use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;

pub type GigId = i64;
pub type EventId = i64;
pub type ComicId = i64;
pub type LineupId = i64;

#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Gig {
	pub id: GigId,
	pub name: String,
	#[serde(default)]
	pub recurrence: String,
	#[serde(default)]
	pub venue: String,
	#[serde(default)]
	pub address: String,
	#[serde(default)]
	pub description: String,
	#[serde(default)]
	pub contact: String,
	#[serde(default)]
	pub instagram: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewGig {
	pub name: String,
	pub recurrence: String,
	pub venue: String,
	pub address: String,
	pub description: String,
	pub contact: String,
	pub instagram: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Event {
	pub id: EventId,
	pub gig_id: GigId,
	pub date: String,
	pub time: String,
	#[serde(default)]
	pub notes: String,
}

impl Event {
	/// Human readable date, e.g. `Jan 2, 2024 8:00 PM`. Falls back to the raw
	/// stored text when it doesn't parse.
	pub fn display_name(&self) -> String {
		let raw = format!("{} {}", self.date, self.time);
		match NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M") {
			Ok(at) => at.format("%b %-d, %Y %-I:%M %p").to_string(),
			Err(_) => raw,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
	pub gig_id: GigId,
	pub date: String,
	pub time: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Comic {
	pub id: ComicId,
	pub name: String,
	#[serde(default)]
	pub bio: String,
	#[serde(default)]
	pub notes: String,
	#[serde(default)]
	pub contact: String,
	#[serde(default)]
	pub default_fee: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewComic {
	pub name: String,
	pub bio: String,
	pub notes: String,
	pub contact: String,
	pub default_fee: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
	Mc,
	Headliner,
	Comic,
}

impl Role {
	pub const ALL: [Role; 3] = [Role::Mc, Role::Headliner, Role::Comic];

	pub fn as_str(self) -> &'static str {
		match self {
			Role::Mc => "MC",
			Role::Headliner => "HEADLINER",
			Role::Comic => "COMIC",
		}
	}

	pub fn label(self) -> &'static str {
		match self {
			Role::Mc => "MC",
			Role::Headliner => "Headliner",
			Role::Comic => "Comic",
		}
	}

	// lineup listing order
	pub fn rank(self) -> u8 {
		match self {
			Role::Mc => 0,
			Role::Headliner => 1,
			Role::Comic => 2,
		}
	}

	/// MC and Headliner can only be held by one comic per event.
	pub fn is_unique(self) -> bool {
		matches!(self, Role::Mc | Role::Headliner)
	}
}

impl fmt::Display for Role {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Role {
	type Err = AppError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_uppercase().as_str() {
			"MC" => Ok(Role::Mc),
			"HEADLINER" => Ok(Role::Headliner),
			"COMIC" => Ok(Role::Comic),
			_ => Err(AppError::InvalidRole(s.to_string())),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineupEntry {
	pub id: LineupId,
	pub event_id: EventId,
	pub comic_id: ComicId,
	pub role: Role,
	pub position: Option<i64>,
	#[serde(default)]
	pub fee: String,
	#[serde(default)]
	pub paid: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLineupEntry {
	pub event_id: EventId,
	pub comic_id: ComicId,
	pub role: Role,
	// None picks up the comic's default fee
	pub fee: Option<String>,
}

/// A lineup entry joined with the name of the comic holding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineupItem {
	pub entry: LineupEntry,
	pub comic_name: String,
}

/// Row shape of the `lineup` table, role still as stored text.
#[derive(Debug, Clone, FromRow)]
pub struct LineupQuery {
	pub id: LineupId,
	pub event_id: EventId,
	pub comic_id: ComicId,
	pub role: String,
	pub position: Option<i64>,
	pub fee: String,
	pub paid: bool,
	pub comic_name: String,
}

impl LineupQuery {
	pub fn into_item(self) -> Result<LineupItem, AppError> {
		Ok(LineupItem {
			entry: LineupEntry {
				id: self.id,
				event_id: self.event_id,
				comic_id: self.comic_id,
				role: self.role.parse()?,
				position: self.position,
				fee: self.fee,
				paid: self.paid,
			},
			comic_name: self.comic_name,
		})
	}
}

// Form payloads. Every field is optional so blank submissions reach the
// handlers, which skip the write instead of rejecting the request.

#[derive(Debug, Default, Deserialize)]
pub struct IdParam {
	pub id: Option<String>,
}

impl IdParam {
	pub fn parse(&self) -> Result<i64, AppError> {
		self.id
			.as_deref()
			.and_then(|id| id.trim().parse().ok())
			.ok_or(AppError::MissingId)
	}
}

#[derive(Debug, Default, Deserialize)]
pub struct GigForm {
	pub name: Option<String>,
	pub recurrence: Option<String>,
	pub venue: Option<String>,
	pub address: Option<String>,
	pub description: Option<String>,
	pub contact: Option<String>,
	pub instagram: Option<String>,
	pub update_gig: Option<String>,
	pub delete: Option<String>,
	pub date: Option<String>,
	pub time: Option<String>,
}

impl GigForm {
	pub fn new_gig(&self) -> Option<NewGig> {
		let name = present(&self.name)?;
		Some(NewGig {
			name,
			recurrence: text(&self.recurrence),
			venue: text(&self.venue),
			address: text(&self.address),
			description: text(&self.description),
			contact: text(&self.contact),
			instagram: text(&self.instagram),
		})
	}
}

#[derive(Debug, Default, Deserialize)]
pub struct ComicForm {
	pub name: Option<String>,
	pub bio: Option<String>,
	pub notes: Option<String>,
	pub contact: Option<String>,
	pub fee: Option<String>,
	pub delete: Option<String>,
}

impl ComicForm {
	pub fn new_comic(&self) -> Option<NewComic> {
		let name = present(&self.name)?;
		Some(NewComic {
			name,
			bio: text(&self.bio),
			notes: text(&self.notes),
			contact: text(&self.contact),
			default_fee: text(&self.fee),
		})
	}
}

#[derive(Debug, Default, Deserialize)]
pub struct EventForm {
	pub update_notes: Option<String>,
	pub notes: Option<String>,
	pub lineup_id: Option<String>,
	pub remove: Option<String>,
	pub fee: Option<String>,
	pub paid: Option<String>,
	pub comic_id: Option<String>,
	pub role: Option<String>,
	pub delete_event: Option<String>,
}

/// Some(trimmed) when the field holds anything but whitespace.
pub fn present(field: &Option<String>) -> Option<String> {
	field
		.as_deref()
		.map(str::trim)
		.filter(|value| !value.is_empty())
		.map(str::to_string)
}

pub fn text(field: &Option<String>) -> String {
	field.as_deref().map(str::trim).unwrap_or_default().to_string()
}
