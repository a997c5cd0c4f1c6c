// main.rs
mod cli;

use clap::Parser;
use cli::{Args, Commands};
use lovematch::LoveMatchError;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lovematch=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let data_dir = args.data_dir;

    let result = match args.command {
        Commands::Register { name, password } => cli::handle_register(name, password, data_dir).await,
        Commands::Login { name, password } => cli::handle_login(name, password, data_dir).await,
        Commands::Logout => cli::handle_logout(data_dir).await,
        Commands::Whoami => cli::handle_whoami(data_dir).await,
        Commands::Check {
            your_name,
            partner_name,
        } => cli::handle_check(your_name, partner_name, data_dir).await,
        Commands::Predict { id } => cli::handle_predict(id, data_dir).await,
        Commands::Chat { message } => cli::handle_chat(message, data_dir).await,
        Commands::History => cli::handle_history(data_dir).await,
        Commands::Watch => cli::handle_watch(data_dir).await,
        Commands::Admin { command } => cli::handle_admin(command, data_dir).await,
    };

    if let Err(e) = result {
        match e.downcast_ref::<LoveMatchError>() {
            Some(err) => eprintln!("❌ {}", err.user_message()),
            None => eprintln!("❌ {:#}", e),
        }
        std::process::exit(1);
    }
}
