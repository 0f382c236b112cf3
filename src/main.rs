use clap::Parser;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use serde_json::json;
use std::io::{self, Write};
use token_issuer::application::engine::IssuanceEngine;
use token_issuer::config::AppConfig;
use token_issuer::domain::ports::{KeyDeriver, KeyDeriverBox, LedgerConnectorBox};
use token_issuer::domain::request::Credential;
use token_issuer::infrastructure::ledger::RpcLedgerConnector;
use token_issuer::infrastructure::rpc::build_http_client;
use token_issuer::infrastructure::signer::NodeKeyDeriver;
use token_issuer::interfaces::cli::{Cli, Command, DerivedKey, EXIT_FAILED, EXIT_OK, exit_code};
use token_issuer::logging::init_logging;

fn print_json(value: &impl Serialize) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, value).into_diagnostic()?;
    writeln!(out).into_diagnostic()?;
    out.flush().into_diagnostic()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::from_toml_file(path).into_diagnostic()?,
        None => AppConfig::default(),
    };
    let level = if cli.verbose {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };
    init_logging(cli.log_format.unwrap_or(config.logging.format), &level);

    let code = match cli.command {
        Command::Issue(args) => {
            if let Some(secs) = args.timeout_secs {
                config.workflow.finalization_timeout_secs = secs;
                config.workflow.validate().into_diagnostic()?;
            }

            let http = build_http_client(config.workflow.request_timeout()).into_diagnostic()?;
            let connector: LedgerConnectorBox = Box::new(RpcLedgerConnector::new(
                http.clone(),
                config.workflow.clone(),
            ));
            let keys: KeyDeriverBox = Box::new(NodeKeyDeriver::new(http, &config.signer.url));
            let engine = IssuanceEngine::from_config(&config, connector, keys);

            let result = engine.issue_token(args.into_request()).await;
            print_json(&result)?;
            exit_code(&result)
        }
        Command::Derive { seed } => {
            let http = build_http_client(config.workflow.request_timeout()).into_diagnostic()?;
            let keys = NodeKeyDeriver::new(http, &config.signer.url);

            match keys.derive_signer(&Credential::new(seed.trim())).await {
                Ok(signer) => {
                    print_json(&DerivedKey {
                        address: signer.address().to_string(),
                        public_key: signer.public_key().to_string(),
                        key_type: signer.key_type().to_string(),
                    })?;
                    EXIT_OK
                }
                Err(err) => {
                    print_json(&json!({
                        "ok": false,
                        "errorKind": err.kind(),
                        "errorMessage": err.to_string(),
                    }))?;
                    EXIT_FAILED
                }
            }
        }
    };

    std::process::exit(code)
}
