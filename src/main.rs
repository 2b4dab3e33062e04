use std::process::ExitCode;

use actions_oidc_verify::{TokenValidator, ValidatorConfig};
use anyhow::{anyhow, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();

    let Some(token) = std::env::args_os().nth(1) else {
        println!("Pass jwt as argument to script");
        return Ok(ExitCode::from(1));
    };
    let token = token
        .into_string()
        .map_err(|_| anyhow!("malformed token: argument is not valid UTF-8"))?;

    let validator = TokenValidator::new(ValidatorConfig::default())?;
    let claims = validator.validate(&token).await?;
    println!("{}", serde_json::to_string(&claims)?);

    Ok(ExitCode::SUCCESS)
}

/// Logs go to stderr; stdout only ever carries the claim set.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
