use clap::{builder::ValueParser, Arg, Command};

pub const ARG_VERBOSITY: &str = "verbosity";

#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
            .env("GATEHOUSE_LOG_LEVEL")
            .global(true)
            .action(clap::ArgAction::Count)
            .value_parser(validator_log_level()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_level(input: &str) -> Result<u8, String> {
        let command = Command::new("probe").arg(
            Arg::new("level")
                .long("level")
                .value_parser(validator_log_level()),
        );
        let matches = command
            .try_get_matches_from(vec!["probe", "--level", input])
            .map_err(|err| err.to_string())?;
        matches
            .get_one::<u8>("level")
            .copied()
            .ok_or_else(|| "missing".to_string())
    }

    #[test]
    fn named_levels_map_to_counts() {
        assert_eq!(parse_level("error"), Ok(0));
        assert_eq!(parse_level("WARN"), Ok(1));
        assert_eq!(parse_level("info"), Ok(2));
        assert_eq!(parse_level("debug"), Ok(3));
        assert_eq!(parse_level("trace"), Ok(4));
    }

    #[test]
    fn numeric_levels_pass_through() {
        assert_eq!(parse_level("0"), Ok(0));
        assert_eq!(parse_level("5"), Ok(5));
        assert!(parse_level("6").is_err());
        assert!(parse_level("loud").is_err());
    }
}
