// Administrative seed/clear tool for the portal store.
use clap::{Parser, Subcommand};

use ateneo::backend::config::PortalConfig;
use ateneo::seed;
use ateneo::Portal;

#[derive(Parser)]
#[command(name = "ateneo-seed", about = "Seed or clear the portal database")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Clear everything, then populate the demo cast
    Seed,
    /// Delete every document in every collection
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = PortalConfig::from_env();
    std::env::set_var("RUST_LOG", &config.log_level);
    env_logger::init();

    let cli = Cli::parse();
    let portal = Portal::open(config).await?;

    match cli.command {
        Command::Seed => {
            let summary = seed::seed_all(&portal.db, &portal.bus, &portal.auth).await?;
            println!(
                "Seeded {} users, {} classes, {} meetings, {} chats, {} messages, {} notifications",
                summary.users,
                summary.classes,
                summary.meetings,
                summary.chats,
                summary.messages,
                summary.notifications
            );
            println!("Demo password for every account: {}", seed::DEMO_PASSWORD);
        }
        Command::Clear => {
            seed::clear_all(&portal.db, &portal.bus).await?;
            println!("All collections cleared");
        }
    }

    Ok(())
}
