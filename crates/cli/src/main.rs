//! CLI for the team visibility store.
//!
//! Every command opens the journal, applies one operation, and exits.
//! Results go to stdout; logs go to stderr.

use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use teamvis_authz::{Report, VisibilityStore};
use teamvis_core::TeamId;
use teamvis_storage::JournalAdapter;

#[derive(Parser, Debug)]
#[command(name = "teamvis", version, about = "Cross-team statistics visibility permissions")]
struct Cli {
    /// NDJSON journal holding the permission edges.
    #[arg(
        short,
        long,
        global = true,
        env = "TEAMVIS_JOURNAL",
        default_value = "teamvis.ndjson"
    )]
    journal: PathBuf,

    /// Machine-readable JSON output.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Let SUBJECT view OBJECT's detailed statistics.
    Grant {
        #[arg(allow_negative_numbers = true)]
        subject: TeamId,
        #[arg(allow_negative_numbers = true)]
        object: TeamId,
    },
    /// Withdraw SUBJECT's view of OBJECT.
    Revoke {
        #[arg(allow_negative_numbers = true)]
        subject: TeamId,
        #[arg(allow_negative_numbers = true)]
        object: TeamId,
    },
    /// Decide whether SUBJECT may view OBJECT.
    Check {
        #[arg(allow_negative_numbers = true)]
        subject: TeamId,
        #[arg(allow_negative_numbers = true)]
        object: TeamId,
    },
    /// List every granted permission.
    List,
    /// Teams that can see OBJECT.
    CanSee {
        #[arg(allow_negative_numbers = true)]
        object: TeamId,
    },
    /// Teams that SUBJECT sees.
    Sees {
        #[arg(allow_negative_numbers = true)]
        subject: TeamId,
    },
    /// Drop every edge naming TEAM, e.g. after the team was deleted.
    Purge {
        #[arg(allow_negative_numbers = true)]
        team: TeamId,
    },
    /// Collapse the journal to one line per live permission.
    Compact,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    tracing::debug!(journal = %cli.journal.display(), "opening store");
    let adapter = JournalAdapter::new(&cli.journal)?;
    let store = match VisibilityStore::open(Arc::new(adapter)).await {
        Ok(store) => store,
        Err(e) => {
            if e.is_unavailable() {
                tracing::error!(journal = %cli.journal.display(), "journal unreachable, retry once storage is back");
            }
            return Err(e.into());
        }
    };

    match cli.command {
        Commands::Grant { subject, object } => {
            store.grant(subject, object).await?;
            tracing::info!(%subject, %object, "granted");
        }
        Commands::Revoke { subject, object } => {
            store.revoke(subject, object).await?;
            tracing::info!(%subject, %object, "revoked");
        }
        Commands::Check { subject, object } => {
            let permitted = store.is_permitted(subject, object).await;
            if cli.json {
                println!("{}", serde_json::json!({ "subject": subject, "object": object, "permitted": permitted }));
            } else {
                println!("{}", if permitted { "permitted" } else { "denied" });
            }
        }
        Commands::List => {
            let edges = store.all_permissions().await;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&edges)?);
            } else {
                print!("{}", Report::build(&edges).render());
            }
        }
        Commands::CanSee { object } => {
            print_teams(&store.teams_that_can_see(object).await, cli.json)?;
        }
        Commands::Sees { subject } => {
            print_teams(&store.teams_that_it_sees(subject).await, cli.json)?;
        }
        Commands::Purge { team } => {
            let removed = store.purge_team(team).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&removed)?);
            } else {
                for edge in &removed {
                    println!("{edge}");
                }
            }
        }
        Commands::Compact => {
            let live = store.compact().await?;
            tracing::info!(live, journal = %cli.journal.display(), "compaction done");
        }
    }

    Ok(())
}

fn print_teams(teams: &BTreeSet<TeamId>, json: bool) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string(teams)?);
    } else {
        for team in teams {
            println!("{team}");
        }
    }
    Ok(())
}
