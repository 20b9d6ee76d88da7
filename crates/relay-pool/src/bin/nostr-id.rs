use clap::{Parser, Subcommand};
use serde_json::json;

use nostr_protocol::nip19::{self, KeyPointer};

#[derive(Debug, Parser)]
#[command(name = "nostr-id")]
#[command(about = "Encode and decode shareable identifiers")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Decode any identifier, with or without a `nostr:` prefix.
    Decode { input: String },
    Npub { pubkey: String },
    Note { id: String },
    Nprofile {
        pubkey: String,
        #[arg(long)]
        relay: Vec<String>,
    },
    Nevent {
        id: String,
        #[arg(long)]
        relay: Vec<String>,
        #[arg(long)]
        author: Option<String>,
        #[arg(long)]
        kind: Option<u32>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    match args.command {
        Command::Decode { input } => {
            let decoded = match nip19::decode(&input)? {
                KeyPointer::PublicKey(pubkey) => json!({ "type": "npub", "pubkey": pubkey }),
                KeyPointer::PrivateKey(_) => json!({ "type": "nsec", "secret_key": "<redacted>" }),
                KeyPointer::EventId(id) => json!({ "type": "note", "id": id }),
                KeyPointer::Profile { pubkey, relays } => {
                    json!({ "type": "nprofile", "pubkey": pubkey, "relays": relays })
                }
                KeyPointer::Event {
                    id,
                    relays,
                    author,
                    kind,
                } => json!({
                    "type": "nevent",
                    "id": id,
                    "relays": relays,
                    "author": author,
                    "kind": kind,
                }),
            };
            println!("{}", serde_json::to_string_pretty(&decoded)?);
        }
        Command::Npub { pubkey } => println!("{}", nip19::encode_public_key(&pubkey)?),
        Command::Note { id } => println!("{}", nip19::encode_event_id(&id)?),
        Command::Nprofile { pubkey, relay } => {
            println!("{}", nip19::encode_profile_pointer(&pubkey, &relay)?)
        }
        Command::Nevent {
            id,
            relay,
            author,
            kind,
        } => println!(
            "{}",
            nip19::encode_event_pointer(&id, &relay, author.as_deref(), kind)?
        ),
    }

    Ok(())
}
