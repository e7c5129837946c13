pub mod logging;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let command = Command::new("gatehouse")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("GATEHOUSE_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("dsn")
                .short('d')
                .long("dsn")
                .help("Database connection string")
                .env("GATEHOUSE_DSN")
                .required(true),
        )
        .arg(
            Arg::new("redis-url")
                .long("redis-url")
                .help("Redis connection URL for the token/CSRF registries")
                .env("GATEHOUSE_REDIS_URL")
                .required(true),
        )
        .arg(
            Arg::new("access-secret")
                .long("access-secret")
                .help("HS256 signing secret for access tokens")
                .env("GATEHOUSE_ACCESS_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new("refresh-secret")
                .long("refresh-secret")
                .help("HS256 signing secret for refresh tokens")
                .env("GATEHOUSE_REFRESH_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new("access-expiry")
                .long("access-expiry")
                .help("Access token lifetime, e.g. 15m, 12h, 7d")
                .default_value("15m")
                .env("GATEHOUSE_ACCESS_EXPIRY"),
        )
        .arg(
            Arg::new("refresh-expiry")
                .long("refresh-expiry")
                .help("Refresh token lifetime, e.g. 15m, 12h, 7d")
                .default_value("7d")
                .env("GATEHOUSE_REFRESH_EXPIRY"),
        )
        .arg(
            Arg::new("frontend-url")
                .long("frontend-url")
                .help("Frontend base URL, used for CORS and the cookie Secure flag")
                .default_value("http://localhost:5173")
                .env("GATEHOUSE_FRONTEND_URL"),
        )
        .arg(
            Arg::new("admin-email")
                .long("admin-email")
                .help("Admin account to reconcile at startup")
                .env("GATEHOUSE_ADMIN_EMAIL")
                .requires_all(["admin-username", "admin-password"]),
        )
        .arg(
            Arg::new("admin-username")
                .long("admin-username")
                .help("Username for the bootstrap admin account")
                .env("GATEHOUSE_ADMIN_USERNAME"),
        )
        .arg(
            Arg::new("admin-password")
                .long("admin-password")
                .help("Password for the bootstrap admin account")
                .env("GATEHOUSE_ADMIN_PASSWORD")
                .hide_env_values(true),
        );

    logging::with_args(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_metadata() {
        let command = new();
        assert_eq!(command.get_name(), "gatehouse");
        assert_eq!(
            command.get_version().map(ToString::to_string),
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
    }

    #[test]
    fn required_args_from_env() {
        temp_env::with_vars(
            [
                ("GATEHOUSE_DSN", Some("postgres://localhost:5432/gatehouse")),
                ("GATEHOUSE_REDIS_URL", Some("redis://127.0.0.1:6379")),
                ("GATEHOUSE_ACCESS_SECRET", Some("access")),
                ("GATEHOUSE_REFRESH_SECRET", Some("refresh")),
            ],
            || {
                let matches = new()
                    .try_get_matches_from(vec!["gatehouse"])
                    .expect("env should satisfy required args");
                assert_eq!(
                    matches.get_one::<String>("dsn").map(String::as_str),
                    Some("postgres://localhost:5432/gatehouse")
                );
                assert_eq!(matches.get_one::<u16>("port").copied(), Some(8080));
                assert_eq!(
                    matches
                        .get_one::<String>("access-expiry")
                        .map(String::as_str),
                    Some("15m")
                );
            },
        );
    }

    #[test]
    fn missing_dsn_fails() {
        temp_env::with_vars(
            [
                ("GATEHOUSE_DSN", None::<&str>),
                ("GATEHOUSE_REDIS_URL", Some("redis://127.0.0.1:6379")),
                ("GATEHOUSE_ACCESS_SECRET", Some("access")),
                ("GATEHOUSE_REFRESH_SECRET", Some("refresh")),
            ],
            || {
                assert!(new().try_get_matches_from(vec!["gatehouse"]).is_err());
            },
        );
    }

    #[test]
    fn admin_email_requires_full_bootstrap_config() {
        temp_env::with_vars(
            [
                ("GATEHOUSE_DSN", Some("postgres://localhost:5432/gatehouse")),
                ("GATEHOUSE_REDIS_URL", Some("redis://127.0.0.1:6379")),
                ("GATEHOUSE_ACCESS_SECRET", Some("access")),
                ("GATEHOUSE_REFRESH_SECRET", Some("refresh")),
                ("GATEHOUSE_ADMIN_EMAIL", Some("admin@blog.example")),
                ("GATEHOUSE_ADMIN_USERNAME", None::<&str>),
                ("GATEHOUSE_ADMIN_PASSWORD", None::<&str>),
            ],
            || {
                assert!(new().try_get_matches_from(vec!["gatehouse"]).is_err());
            },
        );
    }
}
