use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use lex_bot::channels::{ConsoleChannel, DiscordChannel};
use lex_bot::generation::{HttpGenerator, TextGenerator};
use lex_bot::modules::{self, ModuleDeps};
use lex_bot::nlp::{CachedLemmatizer, HttpLemmatizer, Lemmatizer, WhitespaceLemmatizer};
use lex_bot::{Channel, Config, InboundMessage, Normalizer, Router};

/// Lex - Intent routing chat bot
#[derive(Parser)]
#[command(name = "lex", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Connect to Discord and serve (default)
    Serve,
    /// Chat with the bot on stdin/stdout
    Chat {
        /// Name the bot answers to
        #[arg(long, default_value = "Lex")]
        bot_name: String,
        /// Name you speak as
        #[arg(long, default_value = "you")]
        author: String,
    },
    /// List the fully-qualified names of all registered intents
    Intents,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,lex_bot=info",
        1 => "info,lex_bot=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load();
    tracing::debug!(?config, "loaded configuration");

    let router = build_router(&config)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let token = config.require_discord_token()?;
            let (mut channel, rx) = DiscordChannel::with_receiver(token);
            channel.connect().await?;
            serve(&router, rx, Arc::new(channel)).await;
        }
        Command::Chat { bot_name, author } => {
            let (mut channel, rx) = ConsoleChannel::with_receiver(&bot_name, &author);
            channel.connect().await?;
            println!("Talking to {bot_name}. Prefix a line with @{bot_name} to address it.");
            serve(&router, rx, Arc::new(channel)).await;
        }
        Command::Intents => {
            let mut names: Vec<String> = router
                .registry()
                .all()
                .iter()
                .map(|intent| intent.fq_name())
                .collect();
            names.sort();
            for name in names {
                println!("{name}");
            }
        }
    }

    Ok(())
}

/// Wire collaborators and enabled modules into a router
fn build_router(config: &Config) -> anyhow::Result<Router> {
    let capacity = config.nlp.cache_capacity;
    let lemmatizer: Arc<dyn Lemmatizer> = match &config.nlp.url {
        Some(url) => {
            tracing::info!(url = %url, "using nlp service");
            Arc::new(CachedLemmatizer::new(HttpLemmatizer::new(url.clone()), capacity))
        }
        None => {
            tracing::info!("no nlp service configured, using whitespace tokens");
            Arc::new(CachedLemmatizer::new(WhitespaceLemmatizer, capacity))
        }
    };

    let generator = config.generation.url.as_ref().map(|url| {
        Arc::new(HttpGenerator::new(url.clone(), config.generation.model.clone()))
            as Arc<dyn TextGenerator>
    });

    let mut router = Router::new(Normalizer::new(config.mention_workaround.clone()));
    let deps = ModuleDeps {
        lemmatizer,
        generator,
    };
    for module in modules::build_modules(config, router.registry_mut(), &deps)? {
        router.add_module(module);
    }

    Ok(router)
}

/// Route messages until the transport closes or Ctrl-C
async fn serve(router: &Router, rx: mpsc::Receiver<InboundMessage>, channel: Arc<dyn Channel>) {
    tokio::select! {
        () = router.run(rx, channel) => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::warn!(error = %e, "failed to listen for ctrl-c");
            }
            tracing::info!("shutting down");
        }
    }
}
