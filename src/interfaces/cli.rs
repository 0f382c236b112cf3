//! Command-line boundary: argument parsing, result rendering, exit codes.

use crate::domain::request::{Credential, IssuanceRequest, Network};
use crate::domain::result::IssuanceResult;
use crate::logging::LogFormat;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

/// Full success.
pub const EXIT_OK: i32 = 0;
/// Workflow failed; the payment did not land.
pub const EXIT_FAILED: i32 = 2;
/// Payment landed but the requested freeze did not.
pub const EXIT_PARTIAL: i32 = 3;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Overrides the configured log format.
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormat>,

    /// Log at debug level.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Issue a token to a holder, optionally freezing the line afterwards.
    Issue(IssueArgs),
    /// Print the address and public key a seed controls.
    Derive {
        #[arg(long)]
        seed: String,
    },
}

#[derive(Args, Debug)]
pub struct IssueArgs {
    #[arg(long)]
    pub issuer_secret: String,

    #[arg(long, conflicts_with = "holder_secret", required_unless_present = "holder_secret")]
    pub holder_address: Option<String>,

    /// Holder seed; with `--limit` the holder opens its trust line first.
    #[arg(long)]
    pub holder_secret: Option<String>,

    #[arg(long)]
    pub currency_code: String,

    #[arg(long)]
    pub amount: String,

    /// Trust line limit for the holder-side setup.
    #[arg(long)]
    pub limit: Option<String>,

    #[arg(long)]
    pub freeze: bool,

    #[arg(long, value_enum)]
    pub network: Network,

    /// Overrides `workflow.finalization_timeout_secs`.
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

impl IssueArgs {
    pub fn into_request(self) -> IssuanceRequest {
        IssuanceRequest {
            issuer_credential: Credential::new(self.issuer_secret.trim()),
            holder_address: self.holder_address,
            holder_credential: self
                .holder_secret
                .map(|secret| Credential::new(secret.trim())),
            currency_code: self.currency_code,
            amount: self.amount,
            trust_limit: self.limit,
            network: self.network,
            freeze_requested: self.freeze,
        }
    }
}

/// Output of the `derive` command.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedKey {
    pub address: String,
    pub public_key: String,
    pub key_type: String,
}

pub fn exit_code(result: &IssuanceResult) -> i32 {
    if !result.ok {
        EXIT_FAILED
    } else if result.is_partial() {
        EXIT_PARTIAL
    } else {
        EXIT_OK
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::result::{StepReport, WorkflowState};
    use clap::CommandFactory;

    fn report(ok: bool) -> StepReport {
        StepReport {
            ok,
            transaction_hash: Some("AB".repeat(32)),
            engine_result: Some(if ok { "tesSUCCESS" } else { "tecNO_PERMISSION" }.into()),
            finalized: true,
            error_kind: None,
            error_message: None,
        }
    }

    fn result(payment: Option<bool>, freeze: Option<bool>) -> IssuanceResult {
        IssuanceResult {
            ok: payment.unwrap_or(false),
            state: WorkflowState::Done,
            failed_at: None,
            trust_set: None,
            payment: payment.map(report),
            freeze: freeze.map(report),
            error_kind: None,
            error_message: None,
        }
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(&result(Some(true), None)), EXIT_OK);
        assert_eq!(exit_code(&result(Some(true), Some(true))), EXIT_OK);
        assert_eq!(exit_code(&result(Some(true), Some(false))), EXIT_PARTIAL);
        assert_eq!(exit_code(&result(Some(false), None)), EXIT_FAILED);
        assert_eq!(exit_code(&result(None, None)), EXIT_FAILED);
    }

    #[test]
    fn test_issue_args_map_onto_request() {
        let cli = Cli::parse_from([
            "token-issuer",
            "issue",
            "--issuer-secret",
            " sEdTM1uX8pu2do5XvTnutH6HsouMaM2 ",
            "--holder-address",
            "rPT1Sjq2YGrBMTttX4GZHjKu9dyfzbpAYe",
            "--currency-code",
            "USD",
            "--amount",
            "12.5",
            "--network",
            "mainnet",
            "--freeze",
        ]);
        let Command::Issue(args) = cli.command else {
            panic!("expected issue");
        };

        let request = args.into_request();
        assert_eq!(request.issuer_credential.expose(), "sEdTM1uX8pu2do5XvTnutH6HsouMaM2");
        assert_eq!(request.network, Network::MainnetPrimary);
        assert!(request.freeze_requested);
        assert!(request.holder_credential.is_none());
    }

    #[test]
    fn test_holder_flags_conflict() {
        let parsed = Cli::try_parse_from([
            "token-issuer",
            "issue",
            "--issuer-secret",
            "sEdTM1uX8pu2do5XvTnutH6HsouMaM2",
            "--holder-address",
            "rPT1Sjq2YGrBMTttX4GZHjKu9dyfzbpAYe",
            "--holder-secret",
            "sEdSKaCy2JT7JaM7v95H9SxkhP9wS2r",
            "--currency-code",
            "USD",
            "--amount",
            "1",
            "--network",
            "testnet",
        ]);
        assert!(parsed.is_err());
    }
}
