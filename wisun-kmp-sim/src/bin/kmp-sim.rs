// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Wi-SUN Initial-Key exchange simulator
//!
//! This binary:
//! 1. Sets up a supplicant and an authenticator with the given key material
//! 2. Runs the supplicant's Initial-Key request through a loopback link
//! 3. Prints what the authenticator learned about the supplicant's keys

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use tracing::error;
use wisun_crypto::KeyIdAlgorithm;
use wisun_kmp::config::SEC_TOTAL_TIMEOUT;
use wisun_kmp::{KmpType, NodeRole, SecProtConfig, SecResult};
use wisun_kmp_sim::{
    parse_eui64, parse_hex, run_initial_key_exchange, ExchangeReport, NodeSetup, Scenario, TxMode,
};

#[derive(ValueEnum, Clone, Copy, Debug)]
enum KeyType {
    /// Initial-Key ahead of EAP-TLS / MKA
    MkaKey,
    /// Initial-Key ahead of group key handshake
    GkhKey,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Role {
    Br,
    Ffn,
    Lfn,
    Unknown,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Link {
    Deliver,
    NoAck,
    Reject,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Algorithm {
    Sha1,
    Sha256,
}

#[derive(Parser, Debug)]
#[command(name = "kmp-sim")]
#[command(about = "Wi-SUN Initial-Key exchange simulator", long_about = None)]
struct Args {
    /// Supplicant EUI-64
    #[arg(long, default_value = "02:00:00:00:00:00:00:02")]
    supp_eui64: String,

    /// Authenticator EUI-64
    #[arg(long, default_value = "02:00:00:00:00:00:00:01")]
    auth_eui64: String,

    /// Supplicant PMK (64 hex digits)
    #[arg(long)]
    supp_pmk: Option<String>,

    /// Supplicant PTK (96 hex digits)
    #[arg(long)]
    supp_ptk: Option<String>,

    /// Authenticator PMK (64 hex digits)
    #[arg(long)]
    auth_pmk: Option<String>,

    /// Authenticator PTK (96 hex digits)
    #[arg(long)]
    auth_ptk: Option<String>,

    /// Supplicant node role
    #[arg(long, value_enum, default_value_t = Role::Ffn)]
    node_role: Role,

    /// Bitmask of GTK slots the supplicant holds live keys for
    #[arg(long, default_value_t = 0b0001)]
    gtk_live: u8,

    /// Bitmask of LGTK slots the supplicant holds live keys for
    #[arg(long, default_value_t = 0)]
    lgtk_live: u8,

    /// KMP type to run
    #[arg(long, value_enum, default_value_t = KeyType::GkhKey)]
    kmp_type: KeyType,

    /// What the link does with the supplicant's frame
    #[arg(long, value_enum, default_value_t = Link::Deliver)]
    link: Link,

    /// Bytes reserved in front of each PDU for lower layer headers
    #[arg(long, default_value_t = 0)]
    header_size: usize,

    /// Key identifier MAC
    #[arg(long, value_enum, default_value_t = Algorithm::Sha1)]
    algorithm: Algorithm,

    /// Instance lifetime in 100 ms ticks
    #[arg(long, default_value_t = SEC_TOTAL_TIMEOUT)]
    total_timeout: u16,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    println!();
    println!(
        "{}",
        "=== Wi-SUN Initial-Key Exchange ===".bright_cyan().bold()
    );
    println!();

    match run(&args) {
        Ok(()) => {
            println!();
            println!("{}", "OK: Exchange completed".bright_green().bold());
            Ok(())
        }
        Err(e) => {
            println!();
            error!("Exchange failed: {:?}", e);
            println!("{} {:?}", "FAIL: Exchange failed:".bright_red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn optional_key<const N: usize>(value: Option<&String>, what: &str) -> Result<Option<[u8; N]>> {
    value
        .map(|s| parse_hex::<N>(s).with_context(|| format!("invalid {what}")))
        .transpose()
}

fn scenario(args: &Args) -> Result<Scenario> {
    let mut supplicant =
        NodeSetup::new(parse_eui64(&args.supp_eui64).context("invalid supplicant EUI-64")?);
    supplicant.pmk = optional_key(args.supp_pmk.as_ref(), "supplicant PMK")?;
    supplicant.ptk = optional_key(args.supp_ptk.as_ref(), "supplicant PTK")?;
    supplicant.node_role = match args.node_role {
        Role::Br => NodeRole::BorderRouter,
        Role::Ffn => NodeRole::Ffn,
        Role::Lfn => NodeRole::Lfn,
        Role::Unknown => NodeRole::Unknown,
    };
    supplicant.live_gtks = args.gtk_live;
    supplicant.live_lgtks = args.lgtk_live;

    let mut authenticator =
        NodeSetup::new(parse_eui64(&args.auth_eui64).context("invalid authenticator EUI-64")?);
    authenticator.pmk = optional_key(args.auth_pmk.as_ref(), "authenticator PMK")?;
    authenticator.ptk = optional_key(args.auth_ptk.as_ref(), "authenticator PTK")?;
    authenticator.node_role = NodeRole::BorderRouter;

    let mut scenario = Scenario::new(supplicant, authenticator);
    scenario.kmp_type = match args.kmp_type {
        KeyType::MkaKey => KmpType::Ieee8021xMkaKey,
        KeyType::GkhKey => KmpType::Ieee80211GkhKey,
    };
    scenario.tx_mode = match args.link {
        Link::Deliver => TxMode::Deliver,
        Link::NoAck => TxMode::NoAck,
        Link::Reject => TxMode::Reject,
    };
    scenario.header_size = args.header_size;
    scenario.algorithm = match args.algorithm {
        Algorithm::Sha1 => KeyIdAlgorithm::HmacSha1_128,
        Algorithm::Sha256 => KeyIdAlgorithm::HmacSha256_128,
    };
    scenario.config = SecProtConfig::new().with_total_timeout(args.total_timeout);
    Ok(scenario)
}

fn run(args: &Args) -> Result<()> {
    let scenario = scenario(args)?;
    println!("- Supplicant:    {}", scenario.supplicant.eui64);
    println!("- Authenticator: {}", scenario.authenticator.eui64);
    println!("- KMP type:      {:?}", scenario.kmp_type);
    println!();

    let report =
        run_initial_key_exchange(&scenario).context("failed to run Initial-Key exchange")?;
    print_report(&report);

    if let Some(e) = report.receive_error {
        anyhow::bail!("authenticator rejected the Initial-Key PDU: {e}");
    }
    Ok(())
}

fn result_str(result: SecResult) -> colored::ColoredString {
    let text = format!("{result:?}");
    if result.is_ok() {
        text.bright_green()
    } else {
        text.bright_yellow()
    }
}

fn live_str(live: bool) -> colored::ColoredString {
    if live {
        "live".bright_green()
    } else {
        "not live".bright_yellow()
    }
}

fn print_report(report: &ExchangeReport) {
    match &report.pdu {
        Some(pdu) => {
            println!("- Initial-Key PDU ({} bytes)", pdu.len());
            println!("  {}", hex::encode(pdu).dimmed());
        }
        None => println!("- No Initial-Key PDU sent"),
    }
    println!();
    println!("{}", "Supplicant".bold());
    println!("  Events: {:?}", report.supplicant_events);
    println!("  Result: {}", result_str(report.supplicant_result));
    println!("{}", "Authenticator".bold());
    println!("  Events: {:?}", report.authenticator_events);
    println!("  Result: {}", result_str(report.authenticator_result));
    println!("  PMK:    {}", live_str(report.pmk_live));
    println!("  PTK:    {}", live_str(report.ptk_live));
    println!("  Role:   {:?}", report.node_role);
    println!("  GTKL:   {:#06b}", report.gtkl);
    println!("  LGTKL:  {:#05b}", report.lgtkl);
}
