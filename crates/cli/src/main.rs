use cardcrafter_core::{
    config::{generation_config_from_env_values, GenerationEnvValues},
    constants::{DEFAULT_DATA_DIR, FLASHCARDS_DIR_NAME, SYSTEM_PROMPT},
    FileFlashcardStore, FlashcardGenerationService, FlashcardStore, OpenAiCompletionClient,
    ShardableUuid, UserId,
};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cardcrafter")]
#[command(about = "CardCrafter flashcard generator CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate flashcards from a text file, or stdin when no file is given
    Generate {
        /// File containing the source text
        file: Option<PathBuf>,
        /// Save the generated cards for this user id
        #[arg(long)]
        save_for: Option<String>,
    },
    /// List saved flashcards of a user, newest first
    List {
        /// Owner user id
        user_id: String,
    },
    /// Delete a saved flashcard
    Delete {
        /// Owner user id
        user_id: String,
        /// Flashcard id
        id: String,
    },
    /// Print the system prompt sent to the model
    Prompt,
}

fn flashcard_store() -> FileFlashcardStore {
    let data_dir =
        std::env::var("FLASHCARD_DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.into());
    FileFlashcardStore::with_root(PathBuf::from(data_dir).join(FLASHCARDS_DIR_NAME))
}

fn read_source_text(file: Option<PathBuf>) -> std::io::Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path),
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
    }
}

fn delete_flashcard(
    store: &dyn FlashcardStore,
    user_id: &str,
    id: &str,
) -> Result<ShardableUuid, Box<dyn std::error::Error>> {
    let owner = UserId::parse(user_id)?;
    let id = ShardableUuid::parse(id)?;
    store.delete(&owner, &id)?;
    Ok(id)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("cardcrafter=warn".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Generate { file, save_for }) => {
            let owner = save_for.map(|id| UserId::parse(&id)).transpose()?;
            let source_text = read_source_text(file)?;

            let cfg = generation_config_from_env_values(GenerationEnvValues {
                api_key: std::env::var("OPENAI_API_KEY").ok(),
                model: std::env::var("OPENAI_MODEL").ok(),
                base_url: std::env::var("OPENAI_BASE_URL").ok(),
                json_mode: std::env::var("OPENAI_JSON_MODE").ok(),
                timeout_secs: std::env::var("OPENAI_TIMEOUT_SECS").ok(),
                category_policy: std::env::var("FLASHCARD_CATEGORY_POLICY").ok(),
            })?;
            let client = Arc::new(OpenAiCompletionClient::new(&cfg)?);
            let service = FlashcardGenerationService::new(client, &cfg);

            let set = service.generate(&source_text).await?;

            match owner {
                Some(owner) => {
                    let stored = flashcard_store().create_many(&owner, set.into_vec())?;
                    for card in stored {
                        println!("{}  [{}] {}", card.id, card.card.category, card.card.question);
                    }
                }
                None => println!("{}", serde_json::to_string_pretty(&set)?),
            }
        }
        Some(Commands::List { user_id }) => {
            let owner = UserId::parse(&user_id)?;
            let cards = flashcard_store().list(&owner)?;
            if cards.is_empty() {
                println!("No flashcards found.");
            } else {
                for card in cards {
                    println!(
                        "ID: {}, Category: {}, Created: {}\n  Q: {}\n  A: {}",
                        card.id,
                        card.card.category,
                        card.created_at.to_rfc3339(),
                        card.card.question,
                        card.card.answer
                    );
                }
            }
        }
        Some(Commands::Delete { user_id, id }) => {
            let id = delete_flashcard(&flashcard_store(), &user_id, &id)?;
            println!("Deleted flashcard {id}");
        }
        Some(Commands::Prompt) => {
            println!("{SYSTEM_PROMPT}");
        }
        None => {
            println!("Use 'cardcrafter --help' for commands");
        }
    }

    Ok(())
}
