use anyhow::{Context, Result};
use clap::Parser;
use gemini_chat_adapter::config::ENV_AGENT;
use gemini_chat_adapter::llm::{
    ChatMessage, ChatService, CompletionOptions, ContentPart, GeminiService, Retrying,
};
use gemini_chat_adapter::Config;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "gemini-chat")]
#[command(about = "Send one chat completion request to Gemini")]
struct CliArgs {
    /// User prompt text.
    prompt: String,

    /// System instruction sent before the prompt.
    #[arg(long)]
    system: Option<String>,

    /// Image file attached after the prompt text (repeatable).
    #[arg(long = "image", value_name = "PATH")]
    images: Vec<PathBuf>,

    /// JSON configuration file. Falls back to environment variables.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Agent section of the configuration to use.
    #[arg(long, default_value = ENV_AGENT)]
    agent: String,

    #[arg(long)]
    temperature: Option<f64>,

    #[arg(long)]
    max_tokens: Option<u32>,

    #[arg(long)]
    top_p: Option<f64>,

    /// Per-request timeout in seconds.
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Retry transient failures up to MAX_RETRY times.
    #[arg(long)]
    retry: bool,
}

impl CliArgs {
    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            top_p: self.top_p,
            ..Default::default()
        }
    }

    fn messages(&self) -> Result<Vec<ChatMessage>> {
        let mut parts = vec![ContentPart::text(self.prompt.clone())];
        for path in &self.images {
            let bytes = std::fs::read(path)
                .with_context(|| format!("Failed to read image {}", path.display()))?;
            parts.push(ContentPart::image_from_bytes(&bytes));
        }

        let mut messages = Vec::new();
        if let Some(system) = &self.system {
            messages.push(ChatMessage::system(system.clone()));
        }
        messages.push(ChatMessage::user(parts));
        Ok(messages)
    }
}

async fn run(args: CliArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::from_env()?,
    };

    let mut gemini = GeminiService::new(&config, &args.agent)?;
    if let Some(secs) = args.timeout {
        gemini = gemini.with_timeout(Duration::from_secs(secs));
    }
    info!("Using Gemini model {}", gemini.model_name());

    let service: Box<dyn ChatService> = if args.retry {
        let max_retry = gemini.max_retry();
        Box::new(Retrying::new(gemini, max_retry))
    } else {
        Box::new(gemini)
    };

    let completion = service
        .chat_completion(args.messages()?.into(), &args.options())
        .await?;

    for (index, text) in completion.candidates.iter().enumerate() {
        match text {
            Some(text) => println!("[{}] {}", index, text),
            None => println!("[{}] <no text>", index),
        }
    }
    println!("Estimated cost: {:.6}", completion.cost);

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gemini_chat_adapter=info,gemini_chat=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = CliArgs::parse();

    if let Err(e) = run(args).await {
        error!("Chat completion failed: {:#}", e);
        std::process::exit(1);
    }
    Ok(())
}
