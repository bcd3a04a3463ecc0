use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "abonbot")]
#[command(author, version, about = "Telegram bot for selling and tracking lesson season tickets", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bot
    Run {
        /// Use webhook mode instead of long polling (requires WEBHOOK_URL)
        #[arg(long)]
        webhook: bool,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
