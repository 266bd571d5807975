//! Demo binary: log into the HMS backend and print the profile.
//! Usage: hms_login <username> <password>  (configuration via HMS_* env vars)

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use hms_client::{ClientConfig, SessionController, SessionStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    fmt().with_env_filter(filter).init();

    let cfg = ClientConfig::from_env()?;
    info!(
        target: "hms_client",
        "hms-client starting: base_url='{}', timeout={}s, auto_login_on_register={}",
        cfg.base_url,
        cfg.timeout.as_secs(),
        cfg.auto_login_on_register
    );

    let mut args = std::env::args().skip(1);
    let (Some(username), Some(password)) = (args.next(), args.next()) else {
        anyhow::bail!("usage: hms_login <username> <password>");
    };

    let store = SessionStore::on_disk("hms_session.json");
    let controller = SessionController::new(&cfg, store)?;

    // Reuse a persisted session when it still verifies; log in otherwise.
    let user = match controller.init().await {
        Some(user) => user,
        None => match controller.login(&username, &password).await {
            Ok(user) => user,
            Err(e) => {
                let msg = controller
                    .session()
                    .last_error
                    .unwrap_or_else(|| e.display_message());
                anyhow::bail!("login failed: {}", msg);
            }
        },
    };

    println!(
        "logged in: {} (role={}, landing route {})",
        user.username,
        user.role.as_str(),
        controller.landing_route()
    );
    Ok(())
}
