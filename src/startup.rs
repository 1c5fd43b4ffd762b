//! src/startup.rs
use crate::configuration::{DatabaseSettings, Settings, WaitlistSettings};
use crate::routes::{health_check, submission_method_not_allowed, subscribe};
use actix_web::dev::Server;
use actix_web::{App, HttpServer, web};
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::net::TcpListener;
use tracing_actix_web::TracingLogger;

pub struct Application {
    port: u16,
    server: Server,
}

impl Application {
    pub async fn build(configuration: &Settings) -> Result<Self, anyhow::Error> {
        let connection_pool = match &configuration.database {
            Some(database) => Some(get_connection_pool(database).await),
            None => {
                tracing::error!(
                    "No database configuration found. Waitlist submissions will be rejected."
                );
                None
            }
        };
        let address = format!(
            "{}:{}",
            configuration.application.host, configuration.application.port
        );

        let listener = TcpListener::bind(address)?;
        let port = listener.local_addr()?.port();
        let server = run(
            listener,
            connection_pool,
            configuration.waitlist.clone(),
        )
        .await?;

        Ok(Self { port, server })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

pub async fn get_connection_pool(configuration: &DatabaseSettings) -> PgPool {
    PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_secs(2))
        .connect_lazy_with(configuration.connection_options())
}

pub async fn run(
    listener: TcpListener,
    pool: Option<PgPool>,
    waitlist: WaitlistSettings,
) -> Result<Server, anyhow::Error> {
    let pool = pool.map(web::Data::new);
    let waitlist = web::Data::new(waitlist);

    let server = HttpServer::new(move || {
        let mut app = App::new()
            .wrap(TracingLogger::default())
            .route("/health_check", web::get().to(health_check))
            .service(
                web::resource("/api/waitlist")
                    .route(web::post().to(subscribe))
                    .default_service(web::route().to(submission_method_not_allowed)),
            )
            .app_data(waitlist.clone());
        // Without credentials there is no pool to share; the handler turns
        // its absence into a configuration-error response.
        if let Some(pool) = &pool {
            app = app.app_data(pool.clone());
        }
        app
    })
    .listen(listener)?
    .run();
    Ok(server)
}
