// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Graft RTA Inspector
//!
//! Entry point for the `graft-rta-inspect` binary. Parses CLI arguments,
//! initializes logging, and runs one offline check against a blob.
//!
//! Subcommands:
//!
//! - `decode-tx`    : fields, hashes, extra records and RTA state
//! - `decode-block` : header, id, height
//! - `decompose`    : canonical denomination split of an amount
//! - `stake-check`  : stake tier, unlock window and declaration signature
//! - `quorum-check` : RTA quorum signatures
//! - `stake-config` : effective stake rules
//! - `version`      : build version information

mod cli;
mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::{json, Value};

use graft_rta_core::block::Block;
use graft_rta_core::codec::to_blob;
use graft_rta_core::config::{StakeConfig, CRYPTONOTE_DISPLAY_DECIMAL_POINT};
use graft_rta_core::crypto::SupernodeKey;
use graft_rta_core::extra::parse_extra;
use graft_rta_core::hashing::{hash_stats, parse_and_validate_block_from_blob, parse_and_validate_tx_from_blob};
use graft_rta_core::payment_id::{get_payment_id_from_extra, PaymentId};
use graft_rta_core::rta::{
    get_rta_header_from_extra, rta_state, validate_stake_transaction, verify_rta_signatures,
    StaticQuorum, UnlockPolicy,
};
use graft_rta_core::transaction::amount::get_tx_fee;
use graft_rta_core::transaction::{decompose_amount, parse_amount, print_money, Transaction};

use cli::{BlobArgs, Commands, ConfigArgs, InspectCli};
use logging::LogFormat;

fn main() -> Result<()> {
    let cli = InspectCli::parse();
    logging::init_logging(&cli.log_level, LogFormat::from(cli.log_format));

    let output = match cli.command {
        Commands::DecodeTx(args) => decode_tx(&args)?,
        Commands::DecodeBlock(args) => decode_block(&args)?,
        Commands::Decompose(args) => decompose(&args)?,
        Commands::StakeCheck(args) => stake_check(&args)?,
        Commands::QuorumCheck(args) => quorum_check(&args)?,
        Commands::StakeConfig(args) => serde_json::to_value(load_stake_config(&args)?)?,
        Commands::Version => {
            print_version();
            return Ok(());
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Hex blob from the positional argument or the `--file` path.
fn read_blob(args: &BlobArgs) -> Result<Vec<u8>> {
    let text = match (&args.hex, &args.file) {
        (Some(hex), _) => hex.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read blob file {}", path.display()))?,
        (None, None) => anyhow::bail!("no blob given"),
    };
    hex::decode(text.trim()).context("blob is not valid hex")
}

fn read_tx(args: &BlobArgs) -> Result<Transaction> {
    let blob = read_blob(args)?;
    let (tx, hash, _) =
        parse_and_validate_tx_from_blob(&blob).context("failed to decode transaction blob")?;
    tracing::info!(%hash, size = blob.len(), "transaction decoded");
    Ok(tx)
}

/// A fallible part of the report: the value, or the error as a string.
fn or_error<T: serde::Serialize, E: std::fmt::Display>(r: Result<T, E>) -> Value {
    match r {
        Ok(v) => serde_json::to_value(v).unwrap_or(Value::Null),
        Err(e) => json!({ "error": e.to_string() }),
    }
}

fn payment_id_json(id: PaymentId) -> Value {
    match id {
        PaymentId::Long(id) => json!({ "kind": "long", "id": id }),
        PaymentId::Short(id) => json!({ "kind": "short_encrypted", "id": id }),
    }
}

fn decode_tx(args: &BlobArgs) -> Result<Value> {
    let tx = read_tx(args)?;
    let (hash, size) = tx.hash_and_size();

    let mut report = json!({
        "hash": hash,
        "prefix_hash": tx.prefix_hash(),
        "blob_size": size,
        "coinbase": tx.is_coinbase(),
        "fee": get_tx_fee(&tx).map(|f| print_money(f, CRYPTONOTE_DISPLAY_DECIMAL_POINT)),
        "transaction": tx,
        "extra": or_error(parse_extra(tx.extra())),
        "extra2": or_error(parse_extra(tx.extra2())),
        "payment_id": or_error(get_payment_id_from_extra(tx.extra()).map(|p| p.map(payment_id_json))),
        "rta_state": or_error(rta_state(&tx)),
    });
    if args.stats {
        report["hash_stats"] = serde_json::to_value(hash_stats())?;
    }
    Ok(report)
}

fn decode_block(args: &BlobArgs) -> Result<Value> {
    let blob = read_blob(args)?;
    let (block, id): (Block, _) =
        parse_and_validate_block_from_blob(&blob).context("failed to decode block blob")?;
    tracing::info!(%id, size = blob.len(), "block decoded");

    let mut report = json!({
        "id": id,
        "height": block.height(),
        "header": block.header(),
        "miner_tx_hash": block.miner_tx().hash(),
        "tx_hashes": block.tx_hashes(),
        "blob_size": to_blob(&block).len(),
    });
    if args.stats {
        report["hash_stats"] = serde_json::to_value(hash_stats())?;
    }
    Ok(report)
}

fn decompose(args: &cli::DecomposeArgs) -> Result<Value> {
    let amount = parse_amount(&args.amount, CRYPTONOTE_DISPLAY_DECIMAL_POINT)
        .with_context(|| format!("cannot parse amount {:?}", args.amount))?;
    let d = decompose_amount(amount, args.dust);
    Ok(json!({
        "amount": amount,
        "display": print_money(amount, CRYPTONOTE_DISPLAY_DECIMAL_POINT),
        "chunks": d.chunks,
        "dust": d.dust,
    }))
}

/// Load the stake rules from `--config` (mainnet if absent) and install
/// them as the process-wide rule set.
fn load_stake_config(args: &ConfigArgs) -> Result<&'static StakeConfig> {
    if let Some(path) = &args.config {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read stake config {}", path.display()))?;
        StakeConfig::from_json(&text)
            .with_context(|| format!("bad stake config {}", path.display()))?
            .install()?;
        tracing::info!(path = %path.display(), "stake config loaded");
    }
    Ok(StakeConfig::global())
}

fn stake_check(args: &cli::StakeCheckArgs) -> Result<Value> {
    let cfg = load_stake_config(&args.config)?;
    let tx = read_tx(&args.blob)?;
    let policy: UnlockPolicy = args.policy.into();

    let tier = validate_stake_transaction(&tx, args.amount, args.height, policy, cfg)
        .context("stake transaction rejected")?;
    Ok(json!({
        "hash": tx.hash(),
        "tier": tier.number(),
        "amount": print_money(args.amount, CRYPTONOTE_DISPLAY_DECIMAL_POINT),
        "policy": policy,
    }))
}

fn quorum_check(args: &cli::QuorumCheckArgs) -> Result<Value> {
    let tx = read_tx(&args.blob)?;
    let header = get_rta_header_from_extra(&tx)?.context("transaction has no RTA header")?;

    let members = if args.members.is_empty() {
        header.keys.clone()
    } else {
        args.members
            .iter()
            .map(|id| SupernodeKey::from_id(id))
            .collect::<Result<Vec<_>, _>>()
            .context("bad --member id")?
    };
    let mut quorum = StaticQuorum::new(members);
    if let Some(t) = args.threshold {
        quorum = quorum.with_threshold(t);
    }

    verify_rta_signatures(&tx, &quorum).context("RTA signatures rejected")?;
    Ok(json!({
        "hash": tx.hash(),
        "payment_id": header.payment_id,
        "auth_sample_height": header.auth_sample_height,
        "quorum_size": quorum.len(),
    }))
}

fn print_version() {
    println!("graft-rta-inspect {}", env!("CARGO_PKG_VERSION"));
    println!("rustc             {}", rustc_version());
}

fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}
