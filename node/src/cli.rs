//! # CLI Interface
//!
//! Defines the command-line argument structure for `graft-rta-inspect`
//! using `clap` derive.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use graft_rta_core::rta::UnlockPolicy;

/// Inspect Graft transaction and block blobs.
///
/// Decodes hex blobs, prints their canonical hashes and extra records, and
/// runs the RTA stake and quorum checks offline. Output is JSON on stdout;
/// logs go to stderr.
#[derive(Parser, Debug)]
#[command(
    name = "graft-rta-inspect",
    about = "Graft RTA blob inspector",
    version,
    propagate_version = true
)]
pub struct InspectCli {
    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormatArg::Pretty)]
    pub log_format: LogFormatArg,

    /// Default log filter when `RUST_LOG` is not set.
    #[arg(long, global = true, default_value = "graft_rta_inspect=info,graft_rta_core=info")]
    pub log_level: String,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Decode a transaction blob and print its fields, hashes and RTA state.
    DecodeTx(BlobArgs),
    /// Decode a block blob and print its header, id and height.
    DecodeBlock(BlobArgs),
    /// Split an amount into canonical denominations.
    Decompose(DecomposeArgs),
    /// Validate a stake transaction against the stake rules.
    StakeCheck(StakeCheckArgs),
    /// Verify the RTA quorum signatures of a transaction.
    QuorumCheck(QuorumCheckArgs),
    /// Print the effective stake rule set.
    StakeConfig(ConfigArgs),
    /// Print version information and exit.
    Version,
}

/// Where to read a hex blob from.
#[derive(Args, Debug)]
pub struct BlobArgs {
    /// Hex-encoded blob. Read from `--file` when omitted.
    #[arg(required_unless_present = "file")]
    pub hex: Option<String>,

    /// File holding the hex-encoded blob.
    #[arg(long, short = 'f', conflicts_with = "hex")]
    pub file: Option<PathBuf>,

    /// Also print hash cache statistics.
    #[arg(long)]
    pub stats: bool,
}

#[derive(Args, Debug)]
pub struct DecomposeArgs {
    /// Amount in coins, e.g. `12.5`.
    pub amount: String,

    /// Chunks summing to at most this many atomic units are pooled as dust.
    #[arg(long, default_value_t = 0)]
    pub dust: u64,
}

/// Stake rule file shared by the stake commands.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// JSON stake rule file. Mainnet rules when omitted.
    #[arg(long, short = 'c', env = "GRAFT_STAKE_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct StakeCheckArgs {
    #[command(flatten)]
    pub blob: BlobArgs,

    #[command(flatten)]
    pub config: ConfigArgs,

    /// Staked amount in atomic units.
    #[arg(long)]
    pub amount: u64,

    /// Height of the block the transaction is included in.
    #[arg(long)]
    pub height: u64,

    /// Which unlock window applies.
    #[arg(long, value_enum, default_value_t = PolicyArg::Node)]
    pub policy: PolicyArg,
}

#[derive(Args, Debug)]
pub struct QuorumCheckArgs {
    #[command(flatten)]
    pub blob: BlobArgs,

    /// Hex id of an auth sample member. Repeat for each member; the header
    /// keys are trusted when none are given.
    #[arg(long = "member")]
    pub members: Vec<String>,

    /// Valid signatures required. Defaults to every header key.
    #[arg(long)]
    pub threshold: Option<usize>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormatArg {
    Pretty,
    Json,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PolicyArg {
    Node,
    NodeV15,
    Wallet,
}

impl From<PolicyArg> for UnlockPolicy {
    fn from(p: PolicyArg) -> Self {
        match p {
            PolicyArg::Node => UnlockPolicy::Node,
            PolicyArg::NodeV15 => UnlockPolicy::NodeV15,
            PolicyArg::Wallet => UnlockPolicy::Wallet,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        InspectCli::command().debug_assert();
    }

    #[test]
    fn stake_check_parses() {
        let cli = InspectCli::try_parse_from([
            "graft-rta-inspect",
            "stake-check",
            "0200",
            "--amount",
            "500000000000000",
            "--height",
            "10",
            "--policy",
            "node-v15",
        ])
        .unwrap();
        let Commands::StakeCheck(args) = cli.command else {
            panic!("wrong subcommand");
        };
        assert_eq!(args.policy, PolicyArg::NodeV15);
        assert_eq!(args.blob.hex.as_deref(), Some("0200"));
    }

    #[test]
    fn blob_source_required() {
        assert!(InspectCli::try_parse_from(["graft-rta-inspect", "decode-tx"]).is_err());
    }
}
