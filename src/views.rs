use maud::{html, Markup, DOCTYPE};

use crate::lineup::EventDisplay;
use crate::types::{Comic, Event, Gig, LineupItem, Role};

fn layout(title: &str, content: Markup) -> Markup {
	html! {
		(DOCTYPE)
		html {
			head {
				meta charset="utf-8";
				meta name="viewport" content="width=device-width, initial-scale=1";
				title { (title) " · gigbook" }
				link rel="stylesheet" href="/static/style.css";
			}
			body {
				nav {
					a href="/" { "Gigs" }
					" | "
					a href="/comics" { "Comics" }
				}
				main { (content) }
			}
		}
	}
}

fn gig_fields(gig: Option<&Gig>) -> Markup {
	let blank = Gig::default();
	let gig = gig.unwrap_or(&blank);
	html! {
		input name="name" type="text" placeholder="Name" required value=(gig.name);
		input name="recurrence" type="text" placeholder="Every other Thursday" value=(gig.recurrence);
		input name="venue" type="text" placeholder="Venue" value=(gig.venue);
		input name="address" type="text" placeholder="Address" value=(gig.address);
		input name="contact" type="text" placeholder="Contact" value=(gig.contact);
		input name="instagram" type="text" placeholder="@handle" value=(gig.instagram);
		textarea name="description" placeholder="Description" { (gig.description) }
	}
}

pub fn index(gigs: &[Gig]) -> Markup {
	layout("Gigs", html! {
		h1 { "Gigs" }
		@if gigs.is_empty() {
			p { "No gigs yet." }
		} @else {
			table {
				thead { tr {
					th { "Name" }
					th { "Recurrence" }
					th { "Venue" }
				} }
				tbody {
					@for gig in gigs {
						tr {
							td { a href={ "/gig?id=" (gig.id) } { (gig.name) } }
							td { (gig.recurrence) }
							td { (gig.venue) }
						}
					}
				}
			}
		}
		h2 { "New gig" }
		form method="POST" action="/" {
			(gig_fields(None))
			button { "Add gig" }
		}
	})
}

fn lineup_cell(name: &Option<String>) -> Markup {
	html! {
		@match name {
			Some(name) => { (name) },
			None => { span class="open" { "open" } },
		}
	}
}

pub fn gig_page(gig: &Gig, events: &[(Event, EventDisplay)]) -> Markup {
	layout(&gig.name, html! {
		h1 { (gig.name) }
		@if !gig.recurrence.is_empty() { p { (gig.recurrence) } }
		@if !gig.venue.is_empty() || !gig.address.is_empty() {
			p { (gig.venue) " " (gig.address) }
		}
		@if !gig.instagram.is_empty() { p { "Instagram: " (gig.instagram) } }
		@if !gig.contact.is_empty() { p { "Contact: " (gig.contact) } }
		@if !gig.description.is_empty() { p { (gig.description) } }

		h2 { "Events" }
		@if events.is_empty() {
			p { "No events scheduled." }
		}
		@for (event, display) in events {
			section class="event" {
				h3 {
					a href={ "/event?id=" (event.id) } { (event.display_name()) }
					small { " · " (display.booked_comics()) " booked" }
				}
				dl {
					dt { "MC" }
					dd { (lineup_cell(&display.mc)) }
					dt { "Headliner" }
					dd { (lineup_cell(&display.headliner)) }
				}
				ol class="slots" {
					@for slot in &display.comics {
						li { (lineup_cell(slot)) }
					}
				}
			}
		}

		h2 { "Add event" }
		form method="POST" action={ "/gig?id=" (gig.id) } {
			input name="date" type="date" required;
			input name="time" type="time" required;
			button { "Add event" }
		}

		h2 { "Edit gig" }
		form method="POST" action={ "/gig?id=" (gig.id) } {
			(gig_fields(Some(gig)))
			button name="update_gig" value="1" { "Save" }
		}
		form method="POST" action={ "/gig?id=" (gig.id) } {
			button name="delete" value="1" { "Delete gig" }
		}
	})
}

pub fn event_page(event: &Event, gig: &Gig, comics: &[Comic], lineup: &[LineupItem]) -> Markup {
	let action = format!("/event?id={}", event.id);
	layout(&event.display_name(), html! {
		p { a href={ "/gig?id=" (gig.id) } { "← " (gig.name) } }
		h1 { (event.display_name()) }

		h2 { "Lineup" }
		@if lineup.is_empty() {
			p { "Nobody booked yet." }
		} @else {
			table {
				thead { tr {
					th { "Role" }
					th { "#" }
					th { "Comic" }
					th { "Fee / paid" }
					th {}
				} }
				tbody {
					@for item in lineup {
						tr {
							td { (item.entry.role.label()) }
							td {
								@if item.entry.role == Role::Comic {
									@if let Some(pos) = item.entry.position { (pos) }
								}
							}
							td { a href={ "/comic?id=" (item.entry.comic_id) } { (item.comic_name) } }
							td {
								form method="POST" action=(action) {
									input type="hidden" name="lineup_id" value=(item.entry.id);
									input name="fee" type="text" value=(item.entry.fee);
									label {
										input type="checkbox" name="paid" value="1" checked[item.entry.paid];
										" paid"
									}
									button { "Save" }
								}
							}
							td {
								form method="POST" action=(action) {
									input type="hidden" name="lineup_id" value=(item.entry.id);
									button name="remove" value="1" { "Remove" }
								}
							}
						}
					}
				}
			}
		}

		h2 { "Book a comic" }
		@if comics.is_empty() {
			p { "Add comics on the " a href="/comics" { "comics page" } " first." }
		} @else {
			form method="POST" action=(action) {
				select name="comic_id" id="comicSelect" {
					@for comic in comics {
						option value=(comic.id)
							data-bio=(comic.bio)
							data-notes=(comic.notes)
							data-fee=(comic.default_fee) { (comic.name) }
					}
				}
				select name="role" id="roleSelect" {
					@for role in Role::ALL {
						option value=(role.as_str()) selected[role == Role::Comic] { (role.as_str()) }
					}
				}
				input name="fee" id="feeInput" type="text" placeholder="Fee";
				button { "Book" }
			}
			p id="comicInfo" {}
		}

		h2 { "Timeline / notes" }
		form method="POST" action=(action) {
			textarea name="notes" rows="8" { (event.notes) }
			button name="update_notes" value="1" { "Save notes" }
		}

		form method="POST" action=(action) {
			button name="delete_event" value="1" { "Delete event" }
		}
		script src="/static/event.js" {}
	})
}

pub fn comics_page(comics: &[Comic]) -> Markup {
	layout("Comics", html! {
		h1 { "Comics" }
		@if comics.is_empty() {
			p { "No comics yet." }
		} @else {
			ul {
				@for comic in comics {
					li {
						a href={ "/comic?id=" (comic.id) } { (comic.name) }
						@if !comic.default_fee.is_empty() { " (" (comic.default_fee) ")" }
					}
				}
			}
		}
		h2 { "New comic" }
		form method="POST" action="/comics" {
			(comic_fields(None))
			button { "Add comic" }
		}
	})
}

fn comic_fields(comic: Option<&Comic>) -> Markup {
	let blank = Comic::default();
	let comic = comic.unwrap_or(&blank);
	html! {
		input name="name" type="text" placeholder="Name" required value=(comic.name);
		input name="contact" type="text" placeholder="Contact" value=(comic.contact);
		input name="fee" type="text" placeholder="Default fee" value=(comic.default_fee);
		textarea name="bio" placeholder="Bio" { (comic.bio) }
		textarea name="notes" placeholder="Notes" { (comic.notes) }
	}
}

pub fn comic_page(comic: &Comic) -> Markup {
	let action = format!("/comic?id={}", comic.id);
	layout(&comic.name, html! {
		h1 { (comic.name) }
		form method="POST" action=(action) {
			(comic_fields(Some(comic)))
			button { "Save" }
		}
		form method="POST" action=(action) {
			button name="delete" value="1" { "Delete comic" }
		}
	})
}
