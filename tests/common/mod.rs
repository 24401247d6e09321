#![allow(dead_code)]

use std::{fmt, net::SocketAddr};

use anyhow::Context;
use chrono::NaiveDate;
use tempfile::TempDir;
use tripboard::{
    config::AppConfig,
    db::{init_pool, run_migrations},
    models::trip::{NewTrip, TripKind},
    state::AppState,
};

/// Application state backed by a throwaway SQLite file.
pub struct TestApp {
    pub state: AppState,
    _root: TempDir,
}

impl fmt::Debug for TestApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestApp").finish()
    }
}

impl TestApp {
    pub async fn new() -> anyhow::Result<Self> {
        let root = TempDir::new().context("create temp dir for test database")?;
        let db_path = root.path().join("tripboard.sqlite");
        let database_url = format!("sqlite://{}", db_path.to_string_lossy());

        let config = AppConfig {
            database_url,
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            max_connections: 8,
            cors_allowed_origins: Vec::new(),
        };

        let db = init_pool(&config.database_url, config.max_connections).await?;
        run_migrations(&db).await?;

        Ok(Self {
            state: AppState::new(config, db),
            _root: root,
        })
    }
}

pub fn date(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("valid test date")
}

pub fn new_trip(start: &str, end: &str, max_participants: Option<u32>) -> NewTrip {
    NewTrip {
        kind: TripKind::Trip,
        user_discord_id: "100000000000000001".into(),
        user_name: "Aki".into(),
        user_avatar: String::new(),
        country: "Japan".into(),
        city: "Kyoto".into(),
        start_date: date(start),
        end_date: date(end),
        description: String::new(),
        is_recruitment: false,
        recruitment_details: String::new(),
        min_participants: None,
        max_participants,
    }
}
