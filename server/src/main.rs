use clap::Parser;
use log::{error, info};
use serde_json::Value;
use server::auth::{TokenAuthenticator, UserDirectory};
use server::network::{Server, ServerError};
use server::registry::SessionRegistry;
use shared::{CreateGameRequest, GameId, LegalityOptions};
use std::path::{Path, PathBuf};

/// Command line arguments; every option can also come from the environment
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, env = "SERVER_HOST", default_value = "127.0.0.1")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, env = "SERVER_PORT", default_value = "8080")]
    port: u16,
    /// Secret used to sign identity tokens
    #[clap(long, env = "SERVER_TOKEN_SECRET", hide_env_values = true)]
    token_secret: String,
    /// Known users as `id:username`; repeat or comma separate
    #[clap(
        long = "user",
        env = "SERVER_USERS",
        value_delimiter = ',',
        required = true,
        value_parser = parse_user
    )]
    users: Vec<(String, String)>,
    /// JSON file with an array of games to create at start-up
    #[clap(long)]
    games: Option<PathBuf>,
    /// Create the two demonstration games
    #[clap(long)]
    demo_games: bool,
    /// Forbid targets holding cyan, magenta and yellow of one intensity
    #[clap(long, env = "SERVER_STRICT_COLORS")]
    strict_colors: bool,
}

fn parse_user(value: &str) -> Result<(String, String), String> {
    match value.split_once(':') {
        Some((id, name)) if !id.trim().is_empty() && !name.trim().is_empty() => {
            Ok((id.trim().to_string(), name.trim().to_string()))
        }
        _ => Err(format!("expected `id:username`, got `{}`", value)),
    }
}

/// One entry of the `--games` file: a creation request plus an optional `gameId`
#[derive(Debug)]
struct SeedGame {
    game_id: Option<GameId>,
    request: CreateGameRequest,
}

impl SeedGame {
    // `gameId` is split off by hand so the request keeps rejecting unknown fields
    fn from_value(value: Value) -> Result<Self, ServerError> {
        let Value::Object(mut fields) = value else {
            return Err("each seed game must be a JSON object".into());
        };
        let game_id = match fields.remove("gameId") {
            None | Some(Value::Null) => None,
            Some(id) => Some(serde_json::from_value(id)?),
        };
        let request = serde_json::from_value(Value::Object(fields))?;
        Ok(SeedGame { game_id, request })
    }
}

fn demo_games() -> Vec<SeedGame> {
    vec![
        SeedGame {
            game_id: Some("first-game".to_string()),
            request: CreateGameRequest {
                game_title: "First Game".to_string(),
                max_players: 4,
                timer_duration: 15,
                min_cards: 2,
                max_cards: 4,
                max_rounds: 2,
                invite_code: Some("aaaa-bbbb".to_string()),
            },
        },
        SeedGame {
            game_id: Some("second-game".to_string()),
            request: CreateGameRequest {
                game_title: "Second Game".to_string(),
                max_players: 1,
                timer_duration: 20,
                min_cards: 2,
                max_cards: 2,
                max_rounds: 2,
                invite_code: None,
            },
        },
    ]
}

fn parse_seed_games(contents: &str) -> Result<Vec<SeedGame>, ServerError> {
    let values: Vec<Value> = serde_json::from_str(contents)?;
    values.into_iter().map(SeedGame::from_value).collect()
}

fn load_seed_file(path: &Path) -> Result<Vec<SeedGame>, ServerError> {
    let contents = std::fs::read_to_string(path)?;
    parse_seed_games(&contents)
}

fn seed_games(registry: &mut SessionRegistry, games: Vec<SeedGame>) -> Result<(), ServerError> {
    for seed in games {
        let game_id = registry.create_game(seed.game_id, &seed.request)?;
        info!("Seeded game {}", game_id);
    }
    Ok(())
}

/// Main-method of the application.
/// Parses configuration, seeds games and runs the server until Ctrl+C.
#[tokio::main]
async fn main() -> Result<(), ServerError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let users: UserDirectory = args.users.iter().cloned().collect();
    let legality = LegalityOptions {
        allow_black_mix: !args.strict_colors,
    };

    // Fatal configuration problems surface before the listener starts serving
    let mut seeds = Vec::new();
    if let Some(path) = &args.games {
        seeds.extend(load_seed_file(path)?);
    }
    if args.demo_games {
        seeds.extend(demo_games());
    }

    let address = format!("{}:{}", args.host, args.port);
    let mut server = Server::bind(
        &address,
        users,
        TokenAuthenticator::new(args.token_secret)?,
        legality,
    )
    .await?;
    seed_games(server.registry_mut(), seeds)?;

    let events = server.event_sender();
    let server_handle = tokio::spawn(server.run());

    // Handle shutdown gracefully
    tokio::select! {
        result = server_handle => {
            match result {
                Ok(Err(e)) => error!("Server stopped with error: {}", e),
                Err(e) => error!("Server task panicked: {}", e),
                Ok(Ok(())) => info!("Server stopped"),
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
            if events.send(server::network::ServerEvent::Shutdown).is_err() {
                error!("Server loop already stopped");
            }
        }
    }

    Ok(())
}
