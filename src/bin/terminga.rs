use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use terminga::{
    ClientConfig, CurrentState, IcingaClient, Item, ItemKind,
    diff::StateDiff,
    util::{downtime_window, expiry_after, parse_duration},
};
use tracing::{debug, info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
#[command(name = "terminga")]
#[command(about = "Icinga status and batch actions from the terminal", long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.config/terminga/config.toml)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Show hosts and services, worst first
    Status {
        /// Include objects in OK state
        #[arg(short, long)]
        all: bool,
    },

    /// Force an immediate check
    Recheck {
        #[command(flatten)]
        selection: Selection,
    },

    /// Acknowledge problems
    Ack {
        #[command(flatten)]
        selection: Selection,

        #[arg(short = 'm', long)]
        comment: String,

        /// Clear the acknowledgement after this long (e.g. 2h, 1d)
        #[arg(short, long, value_name = "DURATION")]
        expire: Option<String>,

        /// Acknowledge every object on the selected hosts
        #[arg(long)]
        whole_host: bool,
    },

    /// Schedule a downtime starting now
    Downtime {
        #[command(flatten)]
        selection: Selection,

        #[arg(short = 'm', long)]
        comment: String,

        /// Length of the downtime (e.g. 30m, 2h, 1d)
        #[arg(short, long, value_name = "DURATION", default_value = "2h")]
        duration: String,

        /// Put the selected hosts themselves into downtime
        #[arg(long)]
        whole_host: bool,
    },

    /// Poll periodically and print what changed
    Watch {
        /// Seconds between polls
        #[arg(short, long, default_value_t = 15)]
        interval: u64,
    },
}

#[derive(Debug, Clone, Default, Args)]
struct Selection {
    /// Host to act on (repeatable)
    #[arg(long = "host", value_name = "HOST")]
    hosts: Vec<String>,

    /// Service on the selected hosts (repeatable); without it the hosts are selected
    #[arg(long = "service", value_name = "SERVICE")]
    services: Vec<String>,

    /// Select every object currently in a problem state
    #[arg(long)]
    problems: bool,
}

impl Selection {
    fn is_empty(&self) -> bool {
        self.hosts.is_empty() && self.services.is_empty() && !self.problems
    }

    fn resolve(&self, state: &CurrentState) -> Vec<Item> {
        let on_host = |item: &Item| {
            self.hosts.is_empty() || self.hosts.iter().any(|host| host == item.host_name())
        };

        let mut items: Vec<Item> = if self.problems {
            state.problems().into_iter().filter(|item| on_host(item)).collect()
        } else {
            state
                .all()
                .filter(|item| on_host(*item))
                .filter(|item| match item.kind() {
                    ItemKind::Host => self.services.is_empty(),
                    ItemKind::Service => self.services.iter().any(|s| s == item.service_name()),
                })
                .cloned()
                .collect()
        };

        items.sort();
        items.dedup();
        items
    }
}

fn init(verbose: u8) {
    dotenv::dotenv().ok();

    let level = match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = filter::Targets::new().with_targets(vec![("terminga", level)]);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init(cli.verbose);
    trace!("started with args: {cli:?}");

    let config = ClientConfig::load(cli.config.as_deref())?;
    let client = IcingaClient::new(config).context("failed to set up Icinga client")?;

    match cli.command {
        Command::Status { all } => status(&client, all).await,
        Command::Recheck { selection } => {
            let (_, items) = select(&client, &selection).await?;
            client.queue_check(&items).await?;
            info!("queued checks for {} objects", items.len());
            Ok(())
        }
        Command::Ack {
            selection,
            comment,
            expire,
            whole_host,
        } => {
            let expiry = expire
                .as_deref()
                .map(parse_duration)
                .transpose()?
                .map(|duration| expiry_after(Utc::now(), duration))
                .transpose()?;

            let (state, items) = select(&client, &selection).await?;
            if whole_host {
                client.set_ack_for_host(&items, &state, &comment, expiry).await?;
            } else {
                client.set_ack(&items, &comment, expiry).await?;
            }
            info!("acknowledged {} selected objects", items.len());
            Ok(())
        }
        Command::Downtime {
            selection,
            comment,
            duration,
            whole_host,
        } => {
            let duration = parse_duration(&duration)?;
            let (start, end) = downtime_window(Utc::now(), duration)?;

            let (_, items) = select(&client, &selection).await?;
            if whole_host {
                client.set_downtime_for_host(&items, &comment, start, end).await?;
            } else {
                client.set_downtime(&items, &comment, start, end).await?;
            }
            info!("scheduled downtime for {} selected objects", items.len());
            Ok(())
        }
        Command::Watch { interval } => watch(&client, interval).await,
    }
}

async fn select(client: &IcingaClient, selection: &Selection) -> Result<(CurrentState, Vec<Item>)> {
    if selection.is_empty() {
        anyhow::bail!("nothing selected: pass --host, --service or --problems");
    }

    let state = client.fetch_state().await.context("failed to fetch current state")?;
    let items = selection.resolve(&state);
    if items.is_empty() {
        anyhow::bail!("selection matched no objects");
    }

    debug!("selected {} objects", items.len());
    Ok((state, items))
}

fn column_width(items: &[Item]) -> usize {
    items.iter().map(|item| item.host_name().len()).max().unwrap_or(0)
}

fn render(item: &Item, width: usize) -> String {
    let output = item.output_lines().first().map(String::as_str).unwrap_or("");
    format!("{:<8} {}  {output}", item.state_label(), item.display_line(width))
}

async fn status(client: &IcingaClient, all: bool) -> Result<()> {
    let state = client.fetch_state().await.context("failed to fetch current state")?;
    let items = if all { state.sorted() } else { state.problems() };

    let width = column_width(&items);
    for item in &items {
        println!("{}", render(item, width));
    }

    info!("{} of {} objects shown", items.len(), state.len());
    Ok(())
}

async fn watch(client: &IcingaClient, interval: u64) -> Result<()> {
    let mut ticker = tokio::time::interval(Duration::from_secs(interval.max(1)));
    let mut previous: Option<CurrentState> = None;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                debug!("interrupted, stopping watch");
                return Ok(());
            }
        }

        let current = match client.fetch_state().await {
            Ok(state) => state,
            Err(e) => {
                warn!("poll failed: {e}");
                continue;
            }
        };

        if let Some(previous) = &previous {
            let diff = StateDiff::between(previous.all(), current.all());
            print_diff(&diff);
        } else {
            let problems = current.problems();
            let width = column_width(&problems);
            for item in &problems {
                println!("{}", render(item, width));
            }
        }

        previous = Some(current);
    }
}

fn print_diff(diff: &StateDiff) {
    if diff.is_empty() {
        return;
    }

    let now = Utc::now().format("%H:%M:%S");
    let width = diff
        .appeared
        .iter()
        .chain(diff.vanished.iter())
        .chain(diff.changed.iter().map(|(_, current)| current))
        .map(|item| item.host_name().len())
        .max()
        .unwrap_or(0);

    for item in &diff.appeared {
        println!("{now} + {}", render(item, width));
    }
    for item in &diff.vanished {
        println!("{now} - {}", render(item, width));
    }
    for (previous, current) in &diff.changed {
        println!(
            "{now} ~ {}  (was {})",
            render(current, width),
            previous.state_label()
        );
    }
}
