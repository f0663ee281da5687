//! Offline checks for LabPresence configuration files.
//!
//! Loads a config, then lints it, renders a profile or template, or runs a
//! simulated play session against a logging publisher. Nothing here needs
//! the game or a Discord client.

mod logging;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use labpresence_core::config::{AppConfig, app_config_path, load_app_config, load_file, save_file};
use labpresence_core::events::{GameEvent, LevelInfo};
use labpresence_core::manager::RichPresenceManager;
use labpresence_core::placeholders::{
    DelayResolver, FrameCounter, Placeholder, PlaceholderRegistry, TemplateEngine, register_builtins,
};
use labpresence_core::presence::{
    LogPublisher, Presence, PresencePublisher, PresenceRequest, PresenceScheduler, PublishOutcome,
    RateLimitedPublisher, TickOutcome,
};
use labpresence_core::session::{LobbyInfo, LobbyPrivacy, SharedSession};
use labpresence_core::{PublishError, RpcConfig, RpcLogLevel};

#[derive(Parser)]
#[command(version, about = "Validate and preview LabPresence configuration")]
struct Cli {
    /// Config file to use instead of the default location
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Also write logs to a daily file in this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report unknown placeholders, oversized fields and refresh delays
    Check,
    /// Render one profile or an ad-hoc template
    Render {
        /// Profile name, e.g. LevelLoaded or Multiplayer.LevelLoading
        #[arg(short, long, conflicts_with = "template")]
        profile: Option<String>,

        /// Template text, e.g. "In %levelName%"
        #[arg(short, long)]
        template: Option<String>,

        /// Fixed placeholder value as name=value; may repeat
        #[arg(short, long = "set", value_name = "NAME=VALUE")]
        set: Vec<String>,

        /// Print the rendered presence as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run a simulated session and report what would have been published
    Simulate {
        #[arg(long, default_value_t = 60.0)]
        seconds: f32,

        #[arg(long, default_value_t = 72.0)]
        fps: f32,

        #[arg(long, default_value = "15 - Void G114")]
        level: String,

        /// Join a lobby halfway through
        #[arg(long)]
        lobby: bool,
    },
    /// Write a config file with the default settings
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<(), String> {
    let cli = Cli::parse();

    if let Commands::Init { force } = &cli.command {
        let _guard = logging::init_logging(cli.log_dir.as_deref(), RpcLogLevel::default());
        return init(cli.config.as_deref(), *force);
    }

    let config = load_config(cli.config.as_deref())?;
    let _guard = logging::init_logging(cli.log_dir.as_deref(), config.presence.rpc_log_level);

    match cli.command {
        Commands::Check => check(&config),
        Commands::Render {
            profile,
            template,
            set,
            json,
        } => render(&config, profile.as_deref(), template.as_deref(), &set, json),
        Commands::Simulate {
            seconds,
            fps,
            level,
            lobby,
        } => simulate(config, seconds, fps, &level, lobby),
        Commands::Init { .. } => Ok(()),
    }
}

fn load_config(path: Option<&Path>) -> Result<AppConfig, String> {
    match path {
        Some(path) => load_file(path),
        None => load_app_config(),
    }
    .map_err(|e| e.to_string())
}

/// Every profile in both sections, multiplayer ones prefixed.
fn profiles(config: &AppConfig) -> Vec<(String, &RpcConfig)> {
    let single = config.presence.profiles().into_iter().map(|(name, cfg)| (name.to_string(), cfg));
    let multi = config
        .multiplayer
        .profiles()
        .into_iter()
        .map(|(name, cfg)| (format!("Multiplayer.{name}"), cfg));
    single.chain(multi).collect()
}

/// Registry with the builtin placeholders over an empty session.
fn builtin_registry(config: &AppConfig) -> Result<PlaceholderRegistry, String> {
    let mut registry = PlaceholderRegistry::new();
    register_builtins(
        &mut registry,
        &FrameCounter::new(),
        &SharedSession::new(),
        config.presence.remove_level_numbers,
    )
    .map_err(|e| e.to_string())?;
    Ok(registry)
}

// ─── check ──────────────────────────────────────────────────────────────────

fn check(config: &AppConfig) -> Result<(), String> {
    let registry = builtin_registry(config)?;
    let engine = TemplateEngine::new(&registry);
    let delays = DelayResolver::new(&registry);
    let scheduler = PresenceScheduler::new(config.presence.refresh_delay);

    for warning in config.warnings() {
        println!("warning: {warning}");
    }

    let mut problems = 0;
    for (name, profile) in profiles(config) {
        if !profile.enabled {
            println!("{name}: disabled");
            continue;
        }

        let mut unknown = Vec::new();
        for template in profile.templates() {
            unknown.extend(engine.unknown_tokens(template));
        }
        unknown.dedup();
        for token in &unknown {
            println!("error: {name}: unknown placeholder %{token}%");
        }
        problems += unknown.len();

        let request = PresenceRequest::new(Arc::new(profile.clone()));
        if let Err(e) = scheduler.render(&request, &registry) {
            println!("error: {name}: {e}");
            problems += 1;
        }

        println!(
            "{name}: refresh every {:.2}s (placeholder minimum {:.2}s)",
            delays.effective_delay(profile, config.presence.refresh_delay),
            delays.minimum_delay_for(profile)
        );
    }

    if problems > 0 {
        return Err(format!("{problems} problem(s) found"));
    }
    println!("ok");
    Ok(())
}

// ─── render ─────────────────────────────────────────────────────────────────

fn render(
    config: &AppConfig,
    profile: Option<&str>,
    template: Option<&str>,
    set: &[String],
    json: bool,
) -> Result<(), String> {
    let mut registry = builtin_registry(config)?;
    for pair in set {
        let (name, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("error: --set expects NAME=VALUE, got '{pair}'"))?;
        let value = value.to_string();
        registry.unregister(name);
        registry
            .register(Placeholder::new(name, move |_| Ok(value.clone())))
            .map_err(|e| e.to_string())?;
    }

    let profile = match (profile, template) {
        (Some(name), _) => profiles(config)
            .into_iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            .map(|(_, cfg)| cfg.clone())
            .ok_or_else(|| format!("error: no profile named '{name}'"))?,
        (None, Some(text)) => RpcConfig::new(text),
        (None, None) => return Err("error: pass --profile or --template".to_string()),
    };

    let scheduler = PresenceScheduler::new(config.presence.refresh_delay);
    let presence = scheduler
        .render(&PresenceRequest::new(Arc::new(profile)), &registry)
        .map_err(|e| e.to_string())?;

    if json {
        let text = serde_json::to_string_pretty(&presence).map_err(|e| e.to_string())?;
        println!("{text}");
    } else {
        println!("details: {}", presence.details.as_deref().unwrap_or(""));
        println!("state:   {}", presence.state.as_deref().unwrap_or(""));
    }
    Ok(())
}

// ─── simulate ───────────────────────────────────────────────────────────────

/// Rate limited log publisher on a simulated clock, so a minute of play
/// runs instantly but is throttled as if it took a minute.
struct SimulatedPublisher {
    inner: RateLimitedPublisher<LogPublisher>,
    now: Instant,
}

impl SimulatedPublisher {
    fn advance(&mut self, dt: f32) {
        self.now += Duration::from_secs_f32(dt);
    }
}

impl PresencePublisher for SimulatedPublisher {
    fn name(&self) -> &str {
        "simulated"
    }

    fn is_ready(&self) -> bool {
        self.inner.is_ready()
    }

    fn publish(&mut self, presence: &Presence) -> Result<PublishOutcome, PublishError> {
        self.inner.publish_at(presence, self.now)
    }

    fn clear(&mut self) -> Result<(), PublishError> {
        self.inner.clear()
    }
}

#[derive(Debug, Default)]
struct SimulationStats {
    sent: usize,
    skipped: usize,
    rate_limited: usize,
    failed: usize,
}

impl SimulationStats {
    fn record(&mut self, outcome: Option<TickOutcome>) {
        match outcome {
            Some(TickOutcome::Published(PublishOutcome::Sent)) => self.sent += 1,
            Some(TickOutcome::Published(PublishOutcome::SkippedIdentical)) => self.skipped += 1,
            Some(TickOutcome::Failed(PublishError::RateLimited { .. })) => self.rate_limited += 1,
            Some(TickOutcome::Failed(_)) => self.failed += 1,
            _ => {}
        }
    }
}

fn sample_lobby() -> LobbyInfo {
    LobbyInfo {
        id: 76561198000000000,
        name: None,
        host: Some("Ford".to_string()),
        current_players: 4,
        max_players: 10,
        privacy: LobbyPrivacy::Public,
        network_layer: Some("Steam".to_string()),
        code: Some("SIM42".to_string()),
        allow_invites: true,
    }
}

fn simulate(config: AppConfig, seconds: f32, fps: f32, level: &str, lobby: bool) -> Result<(), String> {
    let publisher = SimulatedPublisher {
        inner: RateLimitedPublisher::new(LogPublisher::new()).skip_identical(true),
        now: Instant::now(),
    };
    let mut manager =
        RichPresenceManager::new(config.presence, config.multiplayer, publisher).map_err(|e| e.to_string())?;
    {
        let mut session = manager.session().write();
        session.avatar = Some("Ford".to_string());
        session.code_mods_count = 3;
    }

    let mut stats = SimulationStats::default();
    stats.record(manager.start());

    let level = LevelInfo::new("simulated.level", level);
    let dt = 1.0 / fps.max(1.0);
    let mut t = 0.0_f32;
    while t < seconds {
        let crossed = |mark: f32| t < mark && t + dt >= mark;

        if crossed(0.5) {
            manager.session().write().mods_count = Some(42);
            stats.record(manager.handle_event(GameEvent::AssetWarehouseLoaded));
        }
        if crossed(1.0) {
            stats.record(manager.handle_event(GameEvent::LevelLoading(level.clone())));
        }
        if crossed(3.0) {
            stats.record(manager.handle_event(GameEvent::LevelLoaded(level.clone())));
        }
        if lobby && crossed(seconds / 2.0) {
            stats.record(manager.set_lobby(Some(sample_lobby())));
        }

        manager.publisher_mut().advance(dt);
        stats.record(Some(manager.update(dt)));
        t += dt;
    }

    if let Some(last) = manager.scheduler().last_published() {
        let text = serde_json::to_string_pretty(last).map_err(|e| e.to_string())?;
        println!("last presence:\n{text}");
    }
    manager.shutdown().map_err(|e| e.to_string())?;

    println!(
        "{seconds:.0}s at {fps:.0} FPS: {} sent, {} identical skipped, {} rate limited, {} failed",
        stats.sent, stats.skipped, stats.rate_limited, stats.failed
    );
    println!("transport received {} update(s)", manager.publisher().inner.inner().published());
    Ok(())
}

// ─── init ───────────────────────────────────────────────────────────────────

fn init(path: Option<&Path>, force: bool) -> Result<(), String> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => app_config_path().map_err(|e| e.to_string())?,
    };
    if path.exists() && !force {
        return Err(format!("error: {} already exists (pass --force to overwrite)", path.display()));
    }

    save_file(&path, &AppConfig::default()).map_err(|e| e.to_string())?;
    println!("wrote {}", path.display());
    Ok(())
}
