//! main.rs

use waitlist::configuration::get_configuration;
use waitlist::startup::Application;
use waitlist::telemetry::{get_subscriber, init_subscriber};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let subscriber = get_subscriber("waitlist".into(), "info".into(), std::io::stdout);
    init_subscriber(subscriber);

    let configuration = get_configuration().expect("Failed to read configuration file.");
    let application = Application::build(&configuration).await?;
    application.run_until_stopped().await?;
    Ok(())
}
