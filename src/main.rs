//! Entry point for `gbn-rdt`.
//!
//! Parses CLI arguments and dispatches into either **sim** (discrete-event)
//! or **live** (tokio, real time) mode.  All protocol work is delegated to the
//! library; `main.rs` owns only process setup (logging, argument parsing,
//! report printing).

use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use gbn_rdt::channel::ChannelConfig;
use gbn_rdt::gbn_session::{GbnSession, SessionConfig};
use gbn_rdt::simulator::{SimReport, Simulator, SimulatorConfig};
use gbn_rdt::{Message, ProtocolConfig, StatsSnapshot, MAX_PAYLOAD};

/// Go-Back-N reliable data transfer over a lossy, corrupting channel.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Run the discrete-event simulation.
    Sim {
        #[command(flatten)]
        common: CommonArgs,
        /// Mean time between generated messages.
        #[arg(long, default_value_t = 100.0)]
        interval: f64,
        /// Stop the run once the clock passes this point.
        #[arg(long, default_value_t = 1_000_000.0)]
        max_time: f64,
    },
    /// Drive the same protocol in real time on the tokio runtime.
    Live {
        #[command(flatten)]
        common: CommonArgs,
        /// Wall-clock milliseconds per protocol time unit.
        #[arg(long, default_value_t = 1)]
        unit_ms: u64,
        /// Consecutive timeouts without progress before giving up.
        #[arg(long, default_value_t = 16)]
        max_retries: u32,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Number of messages to send.
    #[arg(short = 'n', long, default_value_t = 10)]
    messages: usize,
    /// Probability that a segment is lost.
    #[arg(long, default_value_t = 0.0)]
    loss: f64,
    /// Probability that a segment is corrupted.
    #[arg(long, default_value_t = 0.0)]
    corrupt: f64,
    /// Sender window size (1 = stop-and-wait).
    #[arg(short, long, default_value_t = 8)]
    window: usize,
    /// Capacity of the sender's pending-message queue.
    #[arg(long, default_value_t = 50)]
    buffer: usize,
    /// Retransmit timeout in protocol time units.
    #[arg(long, default_value_t = 500.0)]
    timeout: f64,
    /// RNG seed.
    #[arg(long, default_value_t = 1)]
    seed: u64,
    /// Print the statistics as JSON.
    #[arg(long)]
    json: bool,
}

impl CommonArgs {
    fn protocol(&self) -> ProtocolConfig {
        ProtocolConfig {
            window_size: self.window,
            pending_capacity: self.buffer,
            retransmit_timeout: self.timeout,
        }
    }

    fn channel(&self) -> ChannelConfig {
        ChannelConfig {
            loss_prob: self.loss,
            corrupt_prob: self.corrupt,
            seed: self.seed,
            ..ChannelConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise env_logger; set RUST_LOG to control verbosity.
    env_logger::init();

    let cli = Cli::parse();

    match cli.mode {
        Mode::Sim {
            common,
            interval,
            max_time,
        } => {
            log::info!(
                "Starting simulation: {} message(s), loss={}, corrupt={}, window={}",
                common.messages,
                common.loss,
                common.corrupt,
                common.window
            );
            let config = SimulatorConfig {
                num_messages: common.messages,
                avg_message_interval: interval,
                max_time,
                seed: common.seed,
            };
            let mut sim = Simulator::new(&common.protocol(), config, common.channel())?;
            let report = sim.run().context("simulation aborted")?;
            print_sim_report(&report, common.json)?;
        }
        Mode::Live {
            common,
            unit_ms,
            max_retries,
        } => {
            log::info!("Starting live session: {} message(s)", common.messages);
            let config = SessionConfig {
                protocol: common.protocol(),
                channel: common.channel(),
                time_unit: Duration::from_millis(unit_ms),
                max_retries,
            };
            let session = GbnSession::spawn(config)?;
            for i in 0..common.messages {
                let letter = char::from(b'a' + (i % 26) as u8);
                let msg = Message::new(Some(&letter.to_string().repeat(MAX_PAYLOAD)));
                if let Err(e) = session.send(msg).await {
                    log::warn!("stopped submitting after {i} message(s): {e}");
                    break;
                }
            }

            let outcome = session.close().await;
            for (i, payload) in outcome.delivered.iter().enumerate() {
                log::info!("delivered #{}: {payload}", i + 1);
            }
            print_stats(&outcome.stats, common.json)?;
            if let Some(err) = outcome.error {
                return Err(anyhow::Error::new(err).context("live session aborted"));
            }
        }
    }

    Ok(())
}

fn print_sim_report(report: &SimReport, json: bool) -> anyhow::Result<()> {
    print_stats(&report.stats, json)?;
    if !json {
        println!("End time:             {:.3}", report.end_time);
        println!("Unacked at end:       {}", report.unacked);
        println!("Pending at end:       {}", report.pending);
    }
    Ok(())
}

fn print_stats(stats: &StatsSnapshot, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(stats)?);
    } else {
        println!("{stats}");
    }
    Ok(())
}
