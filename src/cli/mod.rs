//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the
//! appropriate commands.

pub mod say;

use std::error::Error;

use clap::{Parser, Subcommand};

use crate::core::config::ChatConfig;
use crate::server;
use crate::ui::run_chat;

#[derive(Parser)]
#[command(name = "trickle")]
#[command(about = "A terminal chat client and pacing relay for hosted text-generation APIs")]
#[command(
    long_about = "Trickle is a full-screen terminal chat interface backed by a small relay \
server. The relay performs one completion call against the Hugging Face \
Inference API per turn and re-emits the result as a paced byte stream, which \
the client renders incrementally.\n\n\
Getting started:\n\
  trickle set api-key <KEY>   Store your inference API key\n\
  trickle set model <MODEL>   Pick a hosted model\n\
  trickle serve               Run the relay (in another terminal)\n\
  trickle                     Start chatting\n\n\
Controls:\n\
  Type              Enter your message in the input field\n\
  Enter             Send the message\n\
  Up/Down           Scroll through chat history\n\
  Esc               Dismiss the error banner\n\
  Ctrl+C            Quit the application\n\n\
Commands:\n\
  /attach <path>    Attach an image to your next message (requires vision on)"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the chat interface (default)
    Chat,
    /// Run the relay server
    Serve {
        /// Address to listen on
        #[arg(long, default_value = server::DEFAULT_LISTEN_ADDR)]
        listen: String,
    },
    /// Send a one-shot prompt and print the streamed reply
    Say {
        /// The prompt to send
        #[arg(trailing_var_arg = true)]
        prompt: Vec<String>,
    },
    /// Set a configuration value
    Set {
        /// Configuration key to set
        key: String,
        /// Value to set for the key
        value: String,
    },
    /// Reset a configuration value to its default
    Unset {
        /// Configuration key to unset
        key: String,
    },
    /// Print the current configuration
    Config,
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    match args.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            let config = ChatConfig::load()?;
            run_chat(config).await
        }
        Commands::Serve { listen } => {
            init_tracing();
            server::run(&listen).await
        }
        Commands::Say { prompt } => say::run_say(prompt).await,
        Commands::Set { key, value } => {
            let mut config = ChatConfig::load()?;
            if let Err(message) = config.set_value(&key, &value) {
                eprintln!("❌ {message}");
                std::process::exit(1);
            }
            config.save()?;
            println!("Set {key}");
            Ok(())
        }
        Commands::Unset { key } => {
            let mut config = ChatConfig::load()?;
            if let Err(message) = config.unset_value(&key) {
                eprintln!("❌ {message}");
                std::process::exit(1);
            }
            config.save()?;
            println!("Unset {key}");
            Ok(())
        }
        Commands::Config => {
            let config = ChatConfig::load()?;
            config.print_all();
            Ok(())
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,trickle=debug".into()),
        )
        .with_target(false)
        .init();
}
