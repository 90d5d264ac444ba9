//! TUI-less "say" command

use std::error::Error;
use std::io::{self, Write};

use crate::core::chat_stream::{ChatStreamService, StreamMessage};
use crate::core::config::ChatConfig;
use crate::core::session::{ChatSession, SubmitOutcome};

pub async fn run_say(prompt: Vec<String>) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.join(" ");
    if prompt.is_empty() {
        eprintln!("Usage: trickle say <prompt>");
        std::process::exit(1);
    }

    let config = ChatConfig::load()?;
    let mut session = ChatSession::new(config);

    let params = match session.submit(prompt, Vec::new()) {
        SubmitOutcome::Started(params) => params,
        SubmitOutcome::ConfigurationRequired => {
            eprintln!("❌ No API key or model configured.");
            eprintln!("Run `trickle set api-key <KEY>` and `trickle set model <MODEL>` first.");
            std::process::exit(1);
        }
        SubmitOutcome::Busy => return Ok(()),
    };

    let (stream_service, mut rx) = ChatStreamService::new();
    stream_service.spawn_stream(params);

    loop {
        match rx.recv().await {
            Some(StreamMessage::Chunk(content)) => {
                print!("{}", content);
                io::stdout().flush()?;
            }
            Some(StreamMessage::Error(err)) => {
                eprintln!("\n\n❌ Error: {}", err);
                std::process::exit(1);
            }
            Some(StreamMessage::End) | None => {
                println!();
                break;
            }
        }
    }

    Ok(())
}
