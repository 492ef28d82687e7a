//! Test helpers for database-backed integration tests
//!
//! These tests need a PostgreSQL instance. They connect to the database
//! named by DATABASE_URL and pass vacuously when the variable is not set,
//! so the unit test suite stays runnable without infrastructure.

#![allow(dead_code)]

use chrono::{Duration, Utc};

use afisha::config::{DatabaseConfig, Settings};
use afisha::database::{create_pool, run_migrations, DatabasePool, DatabaseService};
use afisha::models::event::{Location, NewEvent};
use afisha::ServiceFactory;

pub struct TestContext {
    pub services: ServiceFactory,
    pub pool: DatabasePool,
}

impl TestContext {
    /// Connect to the test database, or `None` when DATABASE_URL is unset.
    pub async fn new() -> Option<TestContext> {
        let url = std::env::var("DATABASE_URL").ok()?;

        let config = DatabaseConfig {
            url,
            max_connections: 5,
            min_connections: 1,
        };
        let pool = create_pool(&config).await.expect("connect to test database");
        run_migrations(&pool).await.expect("run migrations");

        // The stats collector is intentionally unreachable: every read
        // must still succeed, with views defaulting to 0.
        let mut settings = Settings::default();
        settings.stats.base_url = "http://127.0.0.1:9".to_string();
        settings.stats.timeout_seconds = 1;

        let db = DatabaseService::new(pool.clone());
        let services = ServiceFactory::new(&settings, &db).expect("build services");

        Some(TestContext { services, pool })
    }

    /// Wipe all rows so every test starts from a clean slate
    pub async fn reset(&self) {
        sqlx::query(
            "TRUNCATE comments, requests, events, categories, users RESTART IDENTITY CASCADE",
        )
        .execute(&self.pool)
        .await
        .expect("truncate tables");
    }

    pub async fn create_user(&self, name: &str) -> i32 {
        sqlx::query_scalar("INSERT INTO users (name, email) VALUES ($1, $2) RETURNING id")
            .bind(name)
            .bind(format!("{name}@example.com"))
            .fetch_one(&self.pool)
            .await
            .expect("insert user")
    }

    pub async fn create_category(&self, name: &str) -> i32 {
        sqlx::query_scalar("INSERT INTO categories (name) VALUES ($1) RETURNING id")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .expect("insert category")
    }
}

/// A valid event draft starting comfortably in the future
pub fn event_draft(category_id: i32, starts_in: Duration) -> NewEvent {
    NewEvent {
        title: "Swing picnic".to_string(),
        annotation: "Dancing in the park".to_string(),
        description: Some("Bring your own shoes".to_string()),
        category_id,
        event_date: Utc::now() + starts_in,
        location: Location {
            lat: 55.75,
            lon: 37.62,
        },
        paid: false,
        participant_limit: 0,
        request_moderation: true,
    }
}
