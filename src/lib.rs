//! Booking board for a recurring comedy show: gigs (the recurring show at a
//! venue), their dated events, the comics on file, and who is booked as MC,
//! Headliner or supporting comic on each event, with fees and payment status.
//!
//! Pages are rendered server side with maud and every change is a plain form
//! POST followed by a redirect.

use std::path::Path;
use std::sync::Arc;

use axum::{routing::get, Router};
use tokio::{net::TcpListener, signal};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

pub mod config;
pub mod error;
pub mod lineup;
pub mod routes;
pub mod sql;
pub mod store;
pub mod types;
pub mod views;

use config::Config;
use error::AppResult;
use routes::{
	display_comic, display_comics, display_event, display_gig, display_gigs, perform_comic,
	perform_comics, perform_event, perform_gig, perform_gigs,
};
use store::Store;

pub struct ServerState {
	pub store: Arc<dyn Store>,
	/// Minimum number of numbered comic slots shown per event.
	pub comic_slots: usize,
}

pub type SharedState = Arc<ServerState>;

pub fn new_shared_state(store: Arc<dyn Store>, comic_slots: usize) -> SharedState {
	Arc::new(ServerState { store, comic_slots })
}

pub fn app(state: SharedState, static_dir: impl AsRef<Path>) -> Router {
	Router::new()
		.route("/", get(display_gigs).post(perform_gigs))
		.route("/gig", get(display_gig).post(perform_gig))
		.route("/event", get(display_event).post(perform_event))
		.route("/comics", get(display_comics).post(perform_comics))
		.route("/comic", get(display_comic).post(perform_comic))
		.nest_service("/static", ServeDir::new(static_dir.as_ref()))
		.layer(TraceLayer::new_for_http())
		.with_state(state)
}

pub async fn start_server() -> AppResult<()> {
	fmt().with_env_filter(EnvFilter::from_default_env()).init();

	info!("Loading configuration...");
	let config = Config::load()?;

	let store = store::open(&config).await?;
	let state = new_shared_state(store, config.comic_slots);
	let router = app(state, &config.static_dir);

	let address = format!("0.0.0.0:{}", config.port);
	let listener = TcpListener::bind(&address).await?;
	info!("gigbook running at http://{address}");

	axum::serve(listener, router)
		.with_graceful_shutdown(shutdown_signal())
		.await?;

	info!("Server shut down");
	Ok(())
}

async fn shutdown_signal() {
	let ctrl_c = async {
		if signal::ctrl_c().await.is_ok() {
			info!("Received Ctrl+C, shutting down");
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match signal::unix::signal(signal::unix::SignalKind::terminate()) {
			Ok(mut sig) => {
				sig.recv().await;
				info!("Received terminate signal, shutting down");
			}
			Err(_) => std::future::pending::<()>().await,
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}
}
