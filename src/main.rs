use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use voiceline::{
    Config, ConversationEvent, CpalCapture, HttpSynthesizer, RodioOutput, Speaker, SpeechPlayer,
    VoiceSession, WsTransport,
};

#[derive(Debug, Parser)]
#[command(name = "voiceline", about = "Real-time voice conversation client")]
struct Cli {
    /// Path to the configuration file (without extension)
    #[arg(long, default_value = "config/voiceline")]
    config: String,

    /// List available input devices and exit
    #[arg(long)]
    list_devices: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if cli.list_devices {
        for name in CpalCapture::list_input_devices()? {
            println!("{name}");
        }
        return Ok(());
    }

    let cfg = Config::load(&cli.config)?;
    info!("{} starting", cfg.service.name);

    let session_config = cfg.session_config();

    let transport = Arc::new(WsTransport::new());
    let capture = Box::new(CpalCapture::new(session_config.capture_config()));
    let synthesizer = Arc::new(HttpSynthesizer::new(session_config.api_base_url.clone()));
    let output = Arc::new(RodioOutput::new()?);
    let player = Arc::new(SpeechPlayer::new(synthesizer, output));

    let (mut session, mut events) =
        VoiceSession::new(session_config, transport, capture, player);

    let uuid = session.start().await?;
    println!("conversation {uuid} started — speak freely, press Enter to end");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            maybe_event = events.recv() => {
                match maybe_event {
                    Some(ConversationEvent::MessageAppended(msg)) => {
                        let who = match msg.speaker {
                            Speaker::User => "you",
                            Speaker::Assistant => "assistant",
                        };
                        let flag = if msg.needs_intervention {
                            " [needs human follow-up]"
                        } else {
                            ""
                        };
                        println!("{who}: {}{flag}", msg.text);
                    }
                    Some(ConversationEvent::Error(message)) => {
                        eprintln!("error: {message}");
                    }
                    Some(ConversationEvent::InterventionNeeded) => {
                        println!("** a human should take over this conversation **");
                    }
                    None => break,
                }
            }
            _ = lines.next_line() => break,
        }
    }

    session.end().await?;

    let stats = session.stats().await;
    info!(
        "conversation lasted {:.1}s with {} messages",
        stats.duration_secs, stats.message_count
    );

    Ok(())
}
