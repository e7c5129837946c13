use crate::{
    api,
    api::handlers::auth::{parse_expiry, AdminBootstrap, AuthConfig},
    cli::globals::GlobalArgs,
};
use anyhow::Result;
use secrecy::SecretString;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub redis_url: String,
    pub access_secret: SecretString,
    pub refresh_secret: SecretString,
    pub access_expiry: String,
    pub refresh_expiry: String,
    pub frontend_base_url: String,
    pub admin_email: Option<String>,
    pub admin_username: Option<String>,
    pub admin_password: Option<SecretString>,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let globals = GlobalArgs::new(args.access_secret, args.refresh_secret);

    let auth_config = AuthConfig::new(args.frontend_base_url)
        .with_access_ttl(parse_expiry(&args.access_expiry))
        .with_refresh_ttl(parse_expiry(&args.refresh_expiry));

    let admin = match (args.admin_email, args.admin_username, args.admin_password) {
        (Some(email), Some(username), Some(password)) => Some(AdminBootstrap {
            email,
            username,
            password,
        }),
        _ => None,
    };

    api::new(
        args.port,
        args.dsn,
        args.redis_url,
        &globals,
        auth_config,
        admin,
    )
    .await
}
