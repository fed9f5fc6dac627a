use clap::{Parser, Subcommand};
use infrastructure::config::{LogFormat, LogLevel};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/admissiond/config.yaml";

#[derive(Parser, Debug)]
#[command(
    name = "admissiond",
    about = "Rule-driven admission control service",
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Listen address override (takes precedence over config file)
    #[arg(short, long)]
    pub listen: Option<String>,

    /// Log level override (takes precedence over config file)
    #[arg(long)]
    pub log_level: Option<LogLevel>,

    /// Log format: json (default, production) or text (development)
    #[arg(long)]
    pub log_format: Option<LogFormat>,

    /// Skip installing the default rules at startup
    #[arg(long)]
    pub no_seed: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Display version information
    Version,
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_path() {
        let cli = Cli::try_parse_from(["admissiond"]).unwrap();
        assert_eq!(cli.config, DEFAULT_CONFIG_PATH);
        assert!(cli.listen.is_none());
        assert!(cli.command.is_none());
        assert!(!cli.no_seed);
    }

    #[test]
    fn custom_config_path() {
        let cli = Cli::try_parse_from(["admissiond", "--config", "/tmp/test.yaml"]).unwrap();
        assert_eq!(cli.config, "/tmp/test.yaml");
    }

    #[test]
    fn listen_override() {
        let cli = Cli::try_parse_from(["admissiond", "--listen", "127.0.0.1:9000"]).unwrap();
        assert_eq!(cli.listen.as_deref(), Some("127.0.0.1:9000"));
    }

    #[test]
    fn log_level_override() {
        let cli = Cli::try_parse_from(["admissiond", "--log-level", "debug"]).unwrap();
        assert_eq!(cli.log_level, Some(LogLevel::Debug));
    }

    #[test]
    fn log_format_text() {
        let cli = Cli::try_parse_from(["admissiond", "--log-format", "text"]).unwrap();
        assert_eq!(cli.log_format, Some(LogFormat::Text));
    }

    #[test]
    fn invalid_log_level_rejected() {
        assert!(Cli::try_parse_from(["admissiond", "--log-level", "banana"]).is_err());
    }

    #[test]
    fn no_seed_flag() {
        let cli = Cli::try_parse_from(["admissiond", "--no-seed"]).unwrap();
        assert!(cli.no_seed);
    }

    #[test]
    fn version_subcommand() {
        let cli = Cli::try_parse_from(["admissiond", "version"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Version)));
    }
}
