use clap::{Parser, Subcommand};

use sredash_domain::{ConfigKey, StaticSource};

/// Terminal dashboard for the SRE demo backend.
#[derive(Parser, Debug, Clone)]
#[command(name = "dashboard")]
#[command(version, about = "Watch and poke the backend's health, metrics and metadata")]
pub struct Cli {
    /// Backend base URL
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// OTLP/HTTP traces endpoint
    #[arg(long, global = true)]
    pub collector_url: Option<String>,

    /// Uptrace DSN; overrides the collector URL
    #[arg(long, global = true)]
    pub dsn: Option<String>,

    /// Deployment environment reported on spans
    #[arg(long, global = true)]
    pub environment: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Refresh on an interval until interrupted
    Watch {
        /// Seconds between refreshes
        #[arg(long, default_value = "5")]
        interval: u64,
    },
    /// Refresh once and print the result
    Snapshot {
        /// Print the full snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Flip readiness, or force it with --enable/--disable
    ToggleReady {
        #[arg(long, conflicts_with = "disable")]
        enable: bool,
        #[arg(long)]
        disable: bool,
    },
    /// Flip liveness, or force it with --enable/--disable
    ToggleLive {
        #[arg(long, conflicts_with = "disable")]
        enable: bool,
        #[arg(long)]
        disable: bool,
    },
    /// Ask the backend to panic
    Panic,
}

impl Default for Command {
    fn default() -> Self {
        Self::Watch { interval: 5 }
    }
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Watch { .. } => "watch",
            Self::Snapshot { .. } => "snapshot",
            Self::ToggleReady { .. } => "toggle-ready",
            Self::ToggleLive { .. } => "toggle-live",
            Self::Panic => "panic",
        }
    }
}

/// Forced toggle direction, `None` to flip the current state.
pub fn forced_state(enable: bool, disable: bool) -> Option<bool> {
    match (enable, disable) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or_default()
    }

    /// Flags as the highest-priority configuration source.
    pub fn flag_source(&self) -> StaticSource {
        let mut source = StaticSource::new("flags");
        source.set(ConfigKey::ApiUrl, self.api_url.clone());
        source.set(ConfigKey::CollectorUrl, self.collector_url.clone());
        source.set(ConfigKey::UptraceDsn, self.dsn.clone());
        source.set(ConfigKey::Environment, self.environment.clone());
        source
    }
}
