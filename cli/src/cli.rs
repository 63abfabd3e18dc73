use clap::{Parser, Subcommand};

use mixer::RecipientRequest;

#[derive(Debug, Parser)]
#[clap(name = "tumbler", version)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the scheduling daemon.
    Run,
    /// Create a deposit and schedule its distribution.
    Mix {
        /// Deposit amount in minimal ledger units.
        #[clap(long)]
        amount: u64,
        /// Pool index on the contract.
        #[clap(long)]
        pool: u32,
        /// Free-form label stored with the history record.
        #[clap(long)]
        note: Option<String>,
        /// Payout leg as recipient:amount:delay_ms. Repeatable.
        #[clap(long = "to", required = true)]
        recipients: Vec<String>,
    },
    /// Print the mix history, newest first.
    History,
    /// Clear the mix history. Scheduled deliveries keep running.
    ClearHistory,
}

/// Parses one `recipient:amount:delay_ms` payout leg. The recipient part may
/// itself contain colons; the last two fields are numeric.
pub(crate) fn parse_recipient(s: &str) -> anyhow::Result<RecipientRequest> {
    let mut parts = s.rsplitn(3, ':');

    let delay_ms = parts
        .next()
        .ok_or_else(|| anyhow::anyhow!("missing delay in {s:?}"))?
        .parse::<u64>()
        .map_err(|_| anyhow::anyhow!("bad delay in {s:?}"))?;

    let amount = parts
        .next()
        .ok_or_else(|| anyhow::anyhow!("missing amount in {s:?}"))?
        .parse::<u64>()
        .map_err(|_| anyhow::anyhow!("bad amount in {s:?}"))?;

    let recipient = parts
        .next()
        .filter(|r| !r.is_empty())
        .ok_or_else(|| anyhow::anyhow!("missing recipient in {s:?}"))?;

    Ok(RecipientRequest {
        recipient: recipient.to_string(),
        amount,
        delay_ms,
    })
}
