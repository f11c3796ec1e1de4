use clap::Parser;
use futures::{SinkExt, StreamExt};
use server::auth::{TokenAuthenticator, DEFAULT_TOKEN_TTL};
use shared::{Card, ClientMessage, ServerMessage};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use url::form_urlencoded;

/// Manual test client: mints a token, joins a game and relays stdin commands
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server address
    #[clap(long, default_value = "127.0.0.1:8080")]
    server: String,
    /// Secret the server signs tokens with
    #[clap(long, env = "SERVER_TOKEN_SECRET", hide_env_values = true)]
    token_secret: String,
    /// User id to log in as
    #[clap(long)]
    user: String,
    /// Game to join
    #[clap(long, default_value = "first-game")]
    game: String,
}

// Parse one stdin line into a client message
fn parse_command(line: &str) -> Result<ClientMessage, String> {
    let line = line.trim();
    let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
    match command {
        "chat" => Ok(ClientMessage::Chat {
            content: rest.to_string(),
        }),
        "pick" => {
            let cards = rest
                .split_whitespace()
                .map(|name| {
                    serde_json::from_value::<Card>(serde_json::Value::String(name.to_uppercase()))
                        .map_err(|_| format!("unknown card {}", name))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ClientMessage::CardsPicked { cards })
        }
        "start" => Ok(ClientMessage::StartRound),
        "new" => Ok(ClientMessage::NewRound),
        _ => Err(format!(
            "unknown command `{}` (try: chat <text>, pick <cards>, start, new)",
            command
        )),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let token =
        TokenAuthenticator::new(args.token_secret)?.issue(&args.user, DEFAULT_TOKEN_TTL);
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("token", &token)
        .append_pair("gameId", &args.game)
        .finish();
    let url = format!("ws://{}/?{}", args.server, query);

    println!("Connecting to {} as {}", args.server, args.user);
    let (socket, _) = connect_async(url.as_str()).await?;
    let (mut sink, mut frames) = socket.split();

    // Print everything the server sends
    let printer = tokio::spawn(async move {
        while let Some(frame) = frames.next().await {
            match frame {
                Ok(Message::Text(text)) => match serde_json::from_str::<ServerMessage>(&text) {
                    Ok(message) => println!("<- {:?}", message.payload),
                    Err(_) => println!("<- {}", text),
                },
                Ok(Message::Close(_)) => {
                    println!("Server closed the connection");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    println!("Connection error: {}", e);
                    break;
                }
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match parse_command(&line) {
            Ok(message) => {
                let json = serde_json::to_string(&message)?;
                sink.send(Message::Text(json)).await?;
            }
            Err(e) => println!("{}", e),
        }
        if printer.is_finished() {
            break;
        }
    }

    println!("Test client finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            parse_command("chat hello there"),
            Ok(ClientMessage::Chat {
                content: "hello there".to_string()
            })
        );
        assert_eq!(
            parse_command("pick c10 M30"),
            Ok(ClientMessage::CardsPicked {
                cards: vec![Card::C10, Card::M30]
            })
        );
        assert_eq!(parse_command("start"), Ok(ClientMessage::StartRound));
        assert_eq!(parse_command("new"), Ok(ClientMessage::NewRound));
        assert!(parse_command("pick Z99").is_err());
        assert!(parse_command("dance").is_err());
    }
}
