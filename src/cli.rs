//! Command-line interface for secure-gateway.
//!
//! Uses lexopt for minimal binary size overhead.

use std::ffi::OsString;
use std::path::PathBuf;

use crate::session::UserRole;

/// Command-line arguments.
#[derive(Debug, Clone, Default)]
pub struct Args {
    /// Path to configuration file.
    pub config: Option<PathBuf>,
    /// Persona to send as.
    pub role: UserRole,
    /// Use the advanced-mode endpoint.
    pub advanced: bool,
    /// Mode name for normal mode (overrides config).
    pub mode: Option<String>,
    /// Disable rate limiting.
    pub no_rate_limit: bool,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
    /// Print the security event log as JSON after sending.
    pub show_events: bool,
    /// Message to send.
    pub message: Option<String>,
    /// Show version and exit.
    pub version: bool,
    /// Show help and exit.
    pub help: bool,
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = Args::default();
    let mut words: Vec<String> = Vec::new();
    let mut parser = lexopt::Parser::from_iter(args);

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                result.help = true;
            }
            Short('V') | Long("version") => {
                result.version = true;
            }
            Short('c') | Long("config") => {
                result.config = Some(parser.value()?.parse()?);
            }
            Short('r') | Long("role") => {
                let value: String = parser.value()?.parse()?;
                result.role =
                    UserRole::parse(&value).ok_or(ArgsError::InvalidValue("role", value))?;
            }
            Short('a') | Long("advanced") => {
                result.advanced = true;
            }
            Short('m') | Long("mode") => {
                result.mode = Some(parser.value()?.parse()?);
            }
            Long("no-rate-limit") => {
                result.no_rate_limit = true;
            }
            Long("show-events") => {
                result.show_events = true;
            }
            Short('l') | Long("log-level") => {
                result.log_level = Some(parser.value()?.parse()?);
            }
            Value(val) => {
                words.push(val.string()?);
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    if !words.is_empty() {
        result.message = Some(words.join(" "));
    }

    Ok(result)
}

/// Print help message.
pub fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        r#"secure-gateway {version}
Send a chat message through the sanitizing, rate-limited webhook gateway

USAGE:
    secure-gateway [OPTIONS] <MESSAGE>...

OPTIONS:
    -c, --config <FILE>     Path to configuration file (JSON)
    -r, --role <ROLE>       client, parents or rm (or 0, 1, 2) [default: client]
    -a, --advanced          Use the advanced-mode webhook
    -m, --mode <MODE>       Mode name sent in normal mode [default: finance]
    -l, --log-level <LVL>   Log level (error, warn, info, debug, trace)
        --no-rate-limit     Disable rate limiting
        --show-events       Print the security event log as JSON
    -h, --help              Print help
    -V, --version           Print version

ENVIRONMENT VARIABLES:
    SECURE_GATEWAY_NORMAL_WEBHOOK    Normal-mode endpoint (overrides config)
    SECURE_GATEWAY_ADVANCED_WEBHOOK  Advanced-mode endpoint (overrides config)
    SECURE_GATEWAY_ENV               development or production
    SECURE_GATEWAY_TIMEOUT_MS        Per-attempt timeout in milliseconds
    SECURE_GATEWAY_LOG_LEVEL         Log level (overrides config)
    RUST_LOG                         Alternative log level setting

EXAMPLES:
    # Ask a question in normal mode
    secure-gateway "Give me the latest research on AAPL"

    # Relationship manager persona on the advanced endpoint
    secure-gateway -r rm -a "Summarize my client's exposure to tech"

    # Custom endpoints and a dump of security events
    secure-gateway -c ./gateway.json --show-events "hello"
"#
    );
}

/// Print version.
pub fn print_version() {
    println!("secure-gateway {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug)]
pub enum ArgsError {
    /// Lexopt parsing error.
    Lexopt(lexopt::Error),
    /// Invalid argument value.
    InvalidValue(&'static str, String),
}

impl std::fmt::Display for ArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexopt(e) => write!(f, "{}", e),
            Self::InvalidValue(name, value) => {
                write!(f, "invalid value for --{}: '{}'", name, value)
            }
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<lexopt::Error> for ArgsError {
    fn from(e: lexopt::Error) -> Self {
        Self::Lexopt(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(args: &[&str]) -> Vec<OsString> {
        std::iter::once("secure-gateway")
            .chain(args.iter().copied())
            .map(OsString::from)
            .collect()
    }

    #[test]
    fn test_default_args() {
        let result = parse_args_from(args(&[])).unwrap();
        assert_eq!(result.role, UserRole::Client);
        assert!(!result.advanced);
        assert!(result.message.is_none());
    }

    #[test]
    fn test_message_words_joined() {
        let result = parse_args_from(args(&["how", "is", "AAPL?"])).unwrap();
        assert_eq!(result.message.as_deref(), Some("how is AAPL?"));
    }

    #[test]
    fn test_role() {
        let result = parse_args_from(args(&["-r", "rm", "hi"])).unwrap();
        assert_eq!(result.role, UserRole::RelationManager);

        let result = parse_args_from(args(&["--role", "1", "hi"])).unwrap();
        assert_eq!(result.role, UserRole::Parents);
    }

    #[test]
    fn test_invalid_role() {
        let result = parse_args_from(args(&["-r", "3"]));
        assert!(matches!(result, Err(ArgsError::InvalidValue("role", _))));
    }

    #[test]
    fn test_config_file() {
        let result = parse_args_from(args(&["-c", "/etc/gateway.json"])).unwrap();
        assert_eq!(result.config, Some(PathBuf::from("/etc/gateway.json")));
    }

    #[test]
    fn test_flags() {
        let result =
            parse_args_from(args(&["-a", "--no-rate-limit", "--show-events", "x"])).unwrap();
        assert!(result.advanced);
        assert!(result.no_rate_limit);
        assert!(result.show_events);
    }

    #[test]
    fn test_help_flag() {
        let result = parse_args_from(args(&["-h"])).unwrap();
        assert!(result.help);

        let result = parse_args_from(args(&["--help"])).unwrap();
        assert!(result.help);
    }

    #[test]
    fn test_version_flag() {
        let result = parse_args_from(args(&["-V"])).unwrap();
        assert!(result.version);
    }

    #[test]
    fn test_log_level_and_mode() {
        let result = parse_args_from(args(&["-l", "debug", "-m", "crypto", "hi"])).unwrap();
        assert_eq!(result.log_level, Some("debug".to_string()));
        assert_eq!(result.mode, Some("crypto".to_string()));
    }

    #[test]
    fn test_unknown_option() {
        let result = parse_args_from(args(&["--bogus"]));
        assert!(result.is_err());
    }
}
