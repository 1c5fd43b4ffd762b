//! tests/api/helpers.rs
use secrecy::Secret;
use sqlx::{Connection, Executor, PgConnection, PgPool, Row};
use std::sync::LazyLock;
use uuid::Uuid;
use waitlist::configuration::{DatabaseSettings, Settings, get_configuration};
use waitlist::startup::{Application, get_connection_pool};
use waitlist::telemetry::{get_subscriber, init_subscriber};

static TRACING: LazyLock<()> = LazyLock::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();

    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::stdout);
        init_subscriber(subscriber);
    } else {
        let subscriber = get_subscriber("test".into(), "debug".into(), std::io::sink);
        init_subscriber(subscriber);
    }
});

pub struct TestApp {
    pub address: String,
    pub db_pool: PgPool,
    api_client: reqwest::Client,
}

impl TestApp {
    pub async fn post_waitlist(&self, body: String) -> reqwest::Response {
        self.api_client
            .post(format!("{}/api/waitlist", self.address))
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_waitlist(&self) -> reqwest::Response {
        self.api_client
            .get(format!("{}/api/waitlist", self.address))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn stored_emails(&self) -> Vec<String> {
        sqlx::query("SELECT email FROM waitlist_entries")
            .fetch_all(&self.db_pool)
            .await
            .expect("Failed to fetch saved waitlist entries.")
            .into_iter()
            .map(|row| row.get("email"))
            .collect()
    }
}

/// An application spawned without any database configuration, to observe
/// how submissions fare when store credentials are missing.
pub struct UnconfiguredApp {
    pub address: String,
    api_client: reqwest::Client,
}

impl UnconfiguredApp {
    pub async fn post_waitlist(&self, body: String) -> reqwest::Response {
        self.api_client
            .post(format!("{}/api/waitlist", self.address))
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

#[allow(clippy::let_underscore_future)]
pub async fn spawn_app_with<F>(customize: F) -> TestApp
where
    F: FnOnce(&mut Settings),
{
    LazyLock::force(&TRACING);

    let configuration = {
        let mut c = get_configuration().expect("Failed to read configuration.");
        let database = c
            .database
            .as_mut()
            .expect("Missing database configuration.");
        database.database_name = Uuid::new_v4().to_string();
        c.application.port = 0;
        customize(&mut c);
        c
    };
    let database_settings = configuration
        .database
        .clone()
        .expect("Missing database configuration.");

    let app = Application::build(&configuration)
        .await
        .expect("Failed to build application server.");

    let connection_pool = get_connection_pool(&database_settings).await;
    configure_database(&database_settings, &connection_pool).await;

    let address = format!("http://127.0.0.1:{}", app.port());
    let _ = tokio::spawn(app.run_until_stopped());

    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        address,
        db_pool: connection_pool,
        api_client: client,
    }
}

#[allow(clippy::let_underscore_future)]
pub async fn spawn_app_without_store() -> UnconfiguredApp {
    LazyLock::force(&TRACING);

    let configuration = {
        let mut c = get_configuration().expect("Failed to read configuration.");
        c.application.port = 0;
        c.database = None;
        c
    };

    let app = Application::build(&configuration)
        .await
        .expect("Failed to build application server.");
    let address = format!("http://127.0.0.1:{}", app.port());
    let _ = tokio::spawn(app.run_until_stopped());

    UnconfiguredApp {
        address,
        api_client: reqwest::Client::new(),
    }
}

pub async fn configure_database(config: &DatabaseSettings, connection_pool: &PgPool) {
    let maintenance_settings = DatabaseSettings {
        database_name: "postgres".to_string(),
        username: "postgres".to_string(),
        password: Secret::new("password".to_string()),
        ..config.clone()
    };
    let mut connection = PgConnection::connect_with(&maintenance_settings.connection_options())
        .await
        .expect("Failed to connect to Postgres");
    connection
        .execute(format!(r#"CREATE DATABASE "{}";"#, config.database_name).as_str())
        .await
        .expect("Failed to create database.");

    sqlx::migrate!("./migrations")
        .run(connection_pool)
        .await
        .expect("Failed to migrate the database.");
}

pub async fn count_waitlist_entries(pool: &PgPool) -> i64 {
    sqlx::query("SELECT COUNT(*) AS count FROM waitlist_entries")
        .fetch_one(pool)
        .await
        .expect("Failed to count waitlist entries.")
        .get("count")
}
