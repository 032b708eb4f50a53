use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use tracing::{info, warn};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
	Sqlite,
	Json,
}

impl FromStr for Backend {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"sqlite" | "sql" => Ok(Backend::Sqlite),
			"json" => Ok(Backend::Json),
			other => Err(format!("expected `sqlite` or `json`, got `{other}`")),
		}
	}
}

#[derive(Debug, Clone)]
pub struct Config {
	pub port: u16,
	pub data_dir: PathBuf,
	pub backend: Backend,
	pub database_url: String,
	pub static_dir: PathBuf,
	pub comic_slots: usize,
}

impl Config {
	pub fn load() -> AppResult<Self> {
		if let Err(e) = dotenvy::dotenv() {
			info!("No .env file loaded ({e})");
		}

		let data_dir: PathBuf = try_load("GIGBOOK_DATA_DIR", "data")?;
		let default_url = format!("sqlite://{}?mode=rwc", data_dir.join("app.db").display());

		Ok(Self {
			port: try_load("GIGBOOK_PORT", "8101")?,
			backend: try_load("GIGBOOK_BACKEND", "sqlite")?,
			database_url: try_load("DATABASE_URL", &default_url)?,
			static_dir: try_load("GIGBOOK_STATIC_DIR", "static")?,
			comic_slots: try_load("GIGBOOK_COMIC_SLOTS", "6")?,
			data_dir,
		})
	}

	pub fn json_path(&self) -> PathBuf {
		self.data_dir.join("data.json")
	}
}

fn var(key: &str) -> Option<String> {
	env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn try_load<T: FromStr>(key: &str, default: &str) -> AppResult<T>
where
	T::Err: Display,
{
	let raw = var(key).unwrap_or_else(|| {
		info!("{key} not set, using default: {default}");
		default.to_string()
	});
	parse_value(key, &raw)
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> AppResult<T>
where
	T::Err: Display,
{
	raw.trim().parse().map_err(|e| {
		warn!("Invalid {key} value: {e}");
		AppError::Config(format!("{key}={raw}: {e}"))
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn backend_names() {
		assert_eq!("sqlite".parse::<Backend>(), Ok(Backend::Sqlite));
		assert_eq!("JSON".parse::<Backend>(), Ok(Backend::Json));
		assert!("postgres".parse::<Backend>().is_err());
	}

	#[test]
	fn bad_port_is_a_config_error() {
		let port: AppResult<u16> = parse_value("GIGBOOK_PORT", "eighty");
		assert!(matches!(port, Err(AppError::Config(_))));

		let port: u16 = parse_value("GIGBOOK_PORT", " 8101 ").unwrap();
		assert_eq!(port, 8101);
	}
}
