use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use console::{style, Key, Term};
use zenoh::key_expr::KeyExpr;
use zenoh_lobby::{
    CoordinatorConfig, GameHost, SessionCoordinator, SessionEvent, SessionExt, StepResult, UserId,
};

/// z_lobby - Zenoh Lobby Demo
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Local player id
    #[arg(short, long, default_value = "player_1")]
    name: String,

    /// Advertised room name
    #[arg(short, long, default_value = "Lobby Room")]
    room: String,

    /// Advertised host label (defaults to a generated name)
    #[arg(long)]
    host: Option<String>,

    /// Player capacity of created rooms
    #[arg(short, long, default_value_t = 4)]
    max_players: u32,

    /// Create and find LAN-only rooms
    #[arg(short, long)]
    lan: bool,

    /// Maximum number of search results
    #[arg(long, default_value_t = 10)]
    max_results: usize,

    /// Address joiners of our rooms travel to
    #[arg(short, long, default_value = "127.0.0.1:7777")]
    address: String,

    /// Key expression prefix
    #[arg(short, long)]
    prefix: Option<KeyExpr<'static>>,

    /// Path to Zenoh config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to a JSON coordinator config file
    #[arg(long)]
    lobby_config: Option<PathBuf>,
}

/// Commands read from the keyboard
#[derive(Debug, Clone, Copy)]
enum Command {
    Create,
    Find,
    Join(usize),
    Destroy,
    Quit,
}

/// Host game printing what a real game would do
struct TerminalHost {
    player: UserId,
}

impl GameHost for TerminalHost {
    fn local_player(&self) -> Option<UserId> {
        Some(self.player.clone())
    }

    fn open_level(&self, entry: &str, listen: bool) {
        let mode = if listen { " (listen)" } else { "" };
        println!("{} {}{}", style("⇒ open level").cyan(), entry, mode);
    }

    fn client_travel(&self, address: &str) {
        println!("{} {}", style("⇒ travel to").cyan(), address);
    }
}

fn print_event(event: &SessionEvent) {
    match event {
        SessionEvent::ResultDiscovered(_) => println!("  {}", event),
        SessionEvent::ProviderUnavailable
        | SessionEvent::CreateFailed { .. }
        | SessionEvent::JoinFailed { .. }
        | SessionEvent::SearchStopped { success: false }
        | SessionEvent::DestroyCompleted { success: false, .. } => {
            println!("{}", style(event).red())
        }
        _ => println!("{}", style(event).green()),
    }
}

fn load_lobby_config(path: Option<&PathBuf>) -> anyhow::Result<CoordinatorConfig> {
    let Some(path) = path else {
        return Ok(CoordinatorConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read lobby config {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse lobby config {}", path.display()))
}

#[tokio::main(flavor = "multi_thread", worker_threads = 1)]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    let mut lobby_config = load_lobby_config(args.lobby_config.as_ref())?
        // Short steps keep the keyboard responsive
        .with_step_timeout_ms(200);
    if let Some(host) = args.host.clone() {
        lobby_config = lobby_config.with_host_label(host);
    }

    // Create zenoh config
    let zenoh_config = match &args.config {
        Some(config_path) => zenoh::Config::from_file(config_path)
            .map_err(|e| anyhow::anyhow!("Failed to load config file: {}", e))?,
        None => zenoh::Config::default(),
    };

    // Create zenoh session
    let session = zenoh::open(zenoh_config)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to open zenoh session: {}", e))?;

    // Declare the provider with configured parameters
    let mut services_builder = session
        .declare_online_services()
        .connect_address(args.address.clone());
    if let Some(prefix) = args.prefix.clone() {
        services_builder = services_builder.prefix(prefix);
    }
    let services = services_builder.await?;
    let prefix = services.prefix().clone();

    let host = Arc::new(TerminalHost {
        player: UserId::new(args.name.clone()),
    });
    let host_label = lobby_config.host_label.clone();
    let mut coordinator = SessionCoordinator::new(lobby_config, Arc::new(services), host);
    let (_, events) = coordinator.subscribe();
    if let Err(e) = coordinator.initialize() {
        for event in events.drain() {
            print_event(&event);
        }
        return Err(e.into());
    }

    println!("=== z_lobby - Zenoh Lobby Demo ===");
    println!("Player: {}", args.name);
    println!("Host label: {}", host_label);
    println!("Prefix: {}", prefix);
    println!("LAN only: {}", args.lan);
    println!("Commands:");
    println!("  c - Create room '{}'", args.room);
    println!("  f - Find rooms");
    println!("  0-9 - Join a found room");
    println!("  d - Leave or close the current room");
    println!("  q - Quit");
    println!();

    let (command_tx, command_rx) = flume::unbounded();

    // Spawn keyboard input task
    let keyboard_task = tokio::task::spawn_blocking(move || {
        let input_term = Term::stdout();
        loop {
            let Ok(key) = input_term.read_key() else {
                break;
            };
            let command = match key {
                Key::Char('c') | Key::Char('C') => Command::Create,
                Key::Char('f') | Key::Char('F') => Command::Find,
                Key::Char('d') | Key::Char('D') => Command::Destroy,
                Key::Char(digit @ '0'..='9') => {
                    Command::Join(digit.to_digit(10).unwrap_or_default() as usize)
                }
                Key::Char('q') | Key::Char('Q') => Command::Quit,
                _ => continue,
            };
            let quit = matches!(command, Command::Quit);
            if command_tx.send(command).is_err() || quit {
                break;
            }
        }
    });

    // Main step loop - runs commands, dispatches completions and prints events
    'main: loop {
        while let Ok(command) = command_rx.try_recv() {
            let request = match command {
                Command::Create => {
                    println!("→ Creating room '{}'...", args.room);
                    coordinator.create_room(
                        args.room.clone(),
                        host_label.clone(),
                        args.max_players,
                        args.lan,
                    )
                }
                Command::Find => coordinator.find_rooms(args.max_results, args.lan),
                Command::Join(index) => {
                    println!("→ Joining room {}...", index);
                    coordinator.join_room(index)
                }
                Command::Destroy => {
                    println!("→ Leaving room...");
                    coordinator.leave_room()
                }
                Command::Quit => {
                    println!("→ Quit requested");
                    break 'main;
                }
            };
            if let Err(e) = request {
                println!("{}", style(format!("Request rejected: {}", e)).red());
            }
        }

        if coordinator.step().await == StepResult::Stop {
            println!("Provider stopped");
            break;
        }

        for event in events.drain() {
            print_event(&event);
        }
    }

    // Wait for keyboard task to finish
    keyboard_task.abort();
    let _ = keyboard_task.await;

    println!("Goodbye!");
    Ok(())
}
