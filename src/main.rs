use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use rand::Rng;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter};

use plenary::vote::{Choice, NewBallot, SessionId, Status};

#[derive(Parser, Debug)]
#[command(name = "plenary", version, about = "Live votes for a legislative assembly.")]
struct Cli {
    /// Location of the config file.
    #[arg(long, value_name = "PATH", default_value = "Plenary.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Runs a vote with simulated members and approves the result.
    Simulate {
        #[arg(long)]
        title: String,
        /// Number of simulated members.
        #[arg(long, default_value_t = 10)]
        voters: usize,
        /// Votes needed to close early. Defaults to the configured quorum.
        #[arg(long)]
        quorum: Option<usize>,
        #[arg(long, default_value = "speaker")]
        approver: String,
        #[arg(long, default_value = "Results confirmed by the chair.")]
        notes: String,
    },
    /// Lists stored sessions.
    List {
        #[arg(long)]
        status: Option<Status>,
    },
    /// Prints one stored session as JSON.
    Show { id: SessionId },
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with(fmt::Layer::new().compact().with_writer(std::io::stderr));
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let config = plenary::config::config(&cli.config)?;
    let server = plenary::plenary(&config)?;

    let shutdown = server.shutdown_handle();
    ctrlc::set_handler(move || shutdown.shutdown())?;

    match cli.command {
        Cmd::Simulate {
            title,
            voters,
            quorum,
            approver,
            notes,
        } => {
            let mut draft = NewBallot::new(title).created_by(approver.as_str());
            if let Some(quorum) = quorum {
                draft = draft.quorum(quorum);
            }
            let session = server.registry().create(draft)?;
            let countdown = server.start(session.id())?;

            let window = config.voting.window();
            let mut rng = rand::thread_rng();
            let members: Vec<_> = (1..=voters)
                .map(|n| {
                    let delay = window.mul_f64(rng.gen_range(0.0..1.2));
                    let choice = Choice::ALL[rng.gen_range(0..Choice::ALL.len())];
                    (format!("member-{}", n), delay, choice)
                })
                .collect();

            let casts = members.into_iter().map(|(member, delay, choice)| {
                let session = session.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    match session.cast_choice(&member, choice) {
                        Ok(()) => tracing::info!(%member, %choice, "vote cast"),
                        Err(err) => tracing::warn!(%member, %err, "vote refused"),
                    }
                })
            });
            let casts = futures::future::join_all(casts);

            let mut shutdown = server.shutdown_handle();
            tokio::select! {
                _ = session.reached(Status::Completed) => {},
                _ = shutdown.wait() => {
                    return Err(anyhow!("interrupted while session {} was open", session.id()));
                },
            }
            countdown.await??;
            // stragglers are refused once the session has closed
            let _ = tokio::time::timeout(window, casts).await;

            session.approve(&approver, &notes)?;
            println!("{}", serde_json::to_string_pretty(&session.snapshot()?)?);
        }
        Cmd::List { status } => {
            let registry = server.registry();
            for session in &registry.list_sessions(status) {
                let snapshot = session.snapshot()?;
                let total = snapshot.tally.map(|t| t.total).unwrap_or(0);
                println!(
                    "{}  {:<9}  {:>3}/{:<3}  {}",
                    snapshot.id(),
                    snapshot.status,
                    total,
                    snapshot.ballot.quorum,
                    snapshot.title()
                );
            }
            let stats = registry.stats();
            println!(
                "total {}, created {}, active {}, completed {}, approved {}",
                stats.total, stats.created, stats.active, stats.completed, stats.approved
            );
        }
        Cmd::Show { id } => {
            let snapshot = server.registry().get_session(id)?.snapshot()?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
    }

    Ok(())
}
