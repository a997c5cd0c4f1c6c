use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lovematch")]
#[command(about = "Relationship compatibility checks with an AI love specialist")]
#[command(version)]
pub struct Args {
    /// Data directory holding config.json and the store
    #[arg(long, env = "LOVEMATCH_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create an account and log in
    Register { name: String, password: String },
    /// Log in to an existing account
    Login { name: String, password: String },
    /// Forget the logged-in user
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Check compatibility between two names
    Check { your_name: String, partner_name: String },
    /// Request a future prediction (latest analysis unless --id is given)
    Predict {
        #[arg(long)]
        id: Option<String>,
    },
    /// Send a message to the love specialist
    Chat { message: String },
    /// Show past analyses and the chat transcript
    History,
    /// Follow analyses, chat replies and the AI switch until Ctrl-C
    Watch,
    /// Administration
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

#[derive(Subcommand)]
pub enum AdminCommands {
    /// Start an admin session
    Login { username: String, password: String },
    /// End the admin session
    Logout,
    /// Show AI mode and totals
    Status,
    /// Turn AI responses on or off for everyone
    Ai {
        #[arg(value_enum)]
        state: Toggle,
    },
    /// List registered users
    Users,
    /// List all relationships
    Relationships,
    /// Show every chat transcript
    Chats,
    /// Reply to a user's chat as the specialist
    Reply { user_id: String, text: String },
    /// Overwrite a relationship's results; unset fields keep their stored value
    Override {
        relationship_id: String,
        #[arg(long)]
        percentage: Option<String>,
        #[arg(long)]
        level: Option<String>,
        #[arg(long)]
        advice: Option<String>,
        #[arg(long)]
        strengths: Option<String>,
        #[arg(long)]
        areas: Option<String>,
        #[arg(long)]
        short_term: Option<String>,
        #[arg(long)]
        long_term: Option<String>,
        #[arg(long)]
        challenges: Option<String>,
        #[arg(long)]
        trajectory: Option<String>,
        #[arg(long)]
        key_advice: Option<String>,
        #[arg(long)]
        outlook: Option<String>,
    },
    /// Follow totals until Ctrl-C
    Watch,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_override() {
        let args = Args::parse_from([
            "lovematch",
            "--data-dir",
            "/tmp/lm",
            "admin",
            "override",
            "rel-1",
            "--percentage",
            "80",
            "--short-term",
            "Bright",
        ]);
        assert_eq!(args.data_dir, Some(PathBuf::from("/tmp/lm")));
        match args.command {
            Commands::Admin {
                command:
                    AdminCommands::Override {
                        relationship_id,
                        percentage,
                        short_term,
                        level,
                        ..
                    },
            } => {
                assert_eq!(relationship_id, "rel-1");
                assert_eq!(percentage.as_deref(), Some("80"));
                assert_eq!(short_term.as_deref(), Some("Bright"));
                assert!(level.is_none());
            }
            _ => panic!("expected admin override"),
        }
    }

    #[test]
    fn test_parse_ai_toggle() {
        let args = Args::parse_from(["lovematch", "admin", "ai", "off"]);
        assert!(matches!(
            args.command,
            Commands::Admin {
                command: AdminCommands::Ai { state: Toggle::Off }
            }
        ));
    }
}
