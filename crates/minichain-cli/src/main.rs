use anyhow::Result;
use clap::{Parser, Subcommand};
use minichain_core::ledger::Ledger;
use minichain_core::{CandidateBlock, Entry};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "minichain-cli")]
#[command(about = "Batch driver for the in-process proof-of-work ledger")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mine a batch of entries into a fresh ledger and validate the result
    Mine {
        /// Sender
        #[arg(long, default_value = "alice")]
        from: String,
        /// Recipient
        #[arg(long, default_value = "bob")]
        to: String,
        /// Amount (non-numeric input is recorded as 0)
        #[arg(long, default_value = "10")]
        amount: String,
        /// Leading zero hex digits required of each block hash
        #[arg(long, default_value_t = 2)]
        difficulty: usize,
        /// Number of blocks to mine
        #[arg(long, default_value_t = 3)]
        count: u32,
        /// Creator id recorded on each mined block
        #[arg(long, default_value_t = 42)]
        creator: u64,
        /// Dump the resulting chain as pretty JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .pretty()
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Mine {
            from,
            to,
            amount,
            difficulty,
            count,
            creator,
            json,
        } => {
            let mut ledger = Ledger::new(difficulty);
            for i in 1..=count {
                let entry = Entry::from_input(&from, &to, &amount);
                let candidate = CandidateBlock::new(entry, creator, ledger.tip_hash());
                ledger.add(candidate);
                let tip = ledger.tip();
                println!("block {i}: nonce {} hash {}", tip.nonce, tip.hash());
            }
            println!("chain valid: {}", ledger.validate());
            if json {
                println!("{}", serde_json::to_string_pretty(ledger.blocks())?);
            }
        }
    }
    Ok(())
}
