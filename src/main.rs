use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use kbchat::{
    ChatEngine, ClientConfig, Conversation, Credentials, EngineConfig, HttpGateway, Message,
    MessageId, Role,
};

#[derive(Debug, Parser)]
#[command(name = "kbchat", version, about = "Chat with a knowledge-base service")]
struct Cli {
    /// JSON config file; KBCHAT_* environment variables override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List conversations, pinned first.
    List,
    /// Show the messages of a conversation.
    Messages { conversation_id: String },
    /// Ask a question, in a new conversation unless one is given.
    Send {
        text: String,
        #[arg(long)]
        conversation: Option<String>,
        #[arg(long)]
        kb: Option<String>,
        #[arg(long)]
        model: Option<String>,
    },
    Delete { conversation_id: String },
    Rename { conversation_id: String, title: String },
    Pin {
        conversation_id: String,
        #[arg(long)]
        unpin: bool,
    },
    /// Rate an answer from 1 (poor) to 3 (good).
    Feedback {
        message_id: String,
        rating: u8,
        #[arg(long)]
        comment: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::default(),
    }
    .with_env()?;

    let credentials = Credentials::new(config.token.clone());
    let gateway = HttpGateway::from_config(&config, credentials)
        .context("Failed to set up the chat service client")?;
    let engine = ChatEngine::new(Arc::new(gateway), EngineConfig::from(&config));

    match cli.command {
        Command::List => {
            for conv in engine.load_conversations().await? {
                print_conversation(&conv);
            }
        }
        Command::Messages { conversation_id } => {
            for msg in engine.load_messages(&conversation_id).await? {
                print_message(&msg);
            }
        }
        Command::Send {
            text,
            conversation,
            kb,
            model,
        } => {
            if let Some(id) = conversation {
                let conversations = engine.load_conversations().await?;
                let selected = conversations
                    .into_iter()
                    .find(|c| c.id == id)
                    .with_context(|| format!("Conversation {} not found", id))?;
                engine.select_conversation(Some(selected));
            }

            let reply = engine
                .send(&text, kb.as_deref(), model.as_deref())
                .await
                .context("Message was not delivered")?;
            print_message(&reply);
            if let Some(current) = engine.snapshot().current_conversation {
                println!("(conversation {})", current.id);
            }
        }
        Command::Delete { conversation_id } => {
            engine.delete_conversation(&conversation_id).await?;
            println!("Deleted {}", conversation_id);
        }
        Command::Rename {
            conversation_id,
            title,
        } => {
            engine.rename_conversation(&conversation_id, &title).await?;
            println!("Renamed {} to {:?}", conversation_id, title);
        }
        Command::Pin {
            conversation_id,
            unpin,
        } => {
            engine.toggle_pinned(&conversation_id, !unpin).await?;
            println!(
                "{} {}",
                if unpin { "Unpinned" } else { "Pinned" },
                conversation_id
            );
        }
        Command::Feedback {
            message_id,
            rating,
            comment,
        } => {
            engine
                .submit_feedback(&MessageId::from(message_id.as_str()), rating, comment.as_deref())
                .await?;
            println!("Feedback recorded");
        }
    }

    Ok(())
}

fn print_conversation(conv: &Conversation) {
    println!(
        "{} {}  {}  (updated {})",
        if conv.pinned { "*" } else { " " },
        conv.id,
        conv.title,
        conv.updated_at.format("%Y-%m-%d %H:%M")
    );
}

fn print_message(msg: &Message) {
    let label = match msg.role {
        Role::User => "You",
        Role::Assistant => "Assistant",
    };
    println!("### {} [{}]\n\n{}\n", label, msg.id, msg.content);
    if let Some(confidence) = msg.confidence {
        println!("confidence: {:.2}", confidence);
    }
    for (i, citation) in msg.citations.iter().flatten().enumerate() {
        println!(
            "[{}] {} ({}, score {:.2})",
            i + 1,
            citation.filename,
            citation.chunk_id,
            citation.score
        );
    }
}
