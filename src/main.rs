//! secure-gateway binary entry point.

use std::process::ExitCode;

use secure_gateway::chat::{ChatService, ChatSession};
use secure_gateway::cli::{self, Args};
use secure_gateway::config::Config;
use secure_gateway::logging;
use tracing::{debug, info};

#[tokio::main]
async fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("Try 'secure-gateway --help' for more information.");
            return ExitCode::from(2);
        }
    };

    if args.help {
        cli::print_help();
        return ExitCode::SUCCESS;
    }

    if args.version {
        cli::print_version();
        return ExitCode::SUCCESS;
    }

    let config = match Config::load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    logging::try_init_with(config.log_filter()).ok();
    info!(
        environment = %config.environment,
        "secure-gateway v{}",
        env!("CARGO_PKG_VERSION")
    );

    run(args, config).await
}

async fn run(args: Args, config: Config) -> ExitCode {
    let Some(message) = args.message.as_deref() else {
        eprintln!("error: no message given");
        eprintln!("Try 'secure-gateway --help' for more information.");
        return ExitCode::from(2);
    };

    let service = ChatService::from_config(&config);
    let session = ChatSession::new(args.role)
        .with_advanced(args.advanced)
        .with_mode(args.mode.clone().unwrap_or_else(|| config.chat.default_mode.clone()));
    debug!(user_id = %session.user_id, role = %session.role, "session created");

    let cancel = async {
        tokio::signal::ctrl_c().await.ok();
    };

    let code = match service.send_until(&session, message, cancel).await {
        Ok(reply) => {
            println!("{}", secure_gateway::security::decode_html_entities(&reply.content));
            eprintln!("({} requests remaining this minute)", reply.remaining);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", service.describe_error(&e));
            ExitCode::FAILURE
        }
    };

    if args.show_events {
        match serde_json::to_string_pretty(&service.security_log().all()) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("error: failed to serialize security events: {}", e),
        }
    }

    code
}
