mod cli;

use crate::cli::{Command, LogFormat, CLI};
use clap::Parser;
use shorturl_generator::RandomGenerator;
use shorturl_shortener::{ReduceRequest, Shortener, ShortenerConfig, ShortenerService};
use shorturl_storage::{AnyRepository, StorageConfig};
use tokio::io::AsyncReadExt;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CLI::parse();
    init_tracing(config.log_format);

    let storage = StorageConfig::from_settings(config.database_dsn, config.file_storage_path);
    info!(
        base_url = %config.base_url,
        batch_size = config.batch_size,
        token_length = config.token_length,
        storage_backend = %storage,
        "starting shortener"
    );

    let repository = AnyRepository::open(storage).await?;
    let service = ShortenerService::new(
        repository,
        RandomGenerator::with_length(config.token_length),
        ShortenerConfig::builder()
            .base_url(config.base_url)
            .batch_size(config.batch_size)
            .build(),
    );

    run(&service, config.command).await
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run<S: Shortener>(
    service: &S,
    command: Command,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Reduce { urls } => {
            for (index, url) in urls.into_iter().enumerate() {
                let short_url = service
                    .reduce_url(ReduceRequest::new((index + 1).to_string(), url))
                    .await?;
                println!("{short_url}");
            }
        }
        Command::Batch => {
            let mut input = String::new();
            tokio::io::stdin().read_to_string(&mut input).await?;
            let requests: Vec<ReduceRequest> = serde_json::from_str(&input)?;

            match service.batch_reduce_url(requests).await {
                Ok(reduced) => println!("{}", serde_json::to_string_pretty(&reduced)?),
                Err(err) => {
                    if let Some(partial) = err.partial_result() {
                        println!("{}", serde_json::to_string_pretty(partial)?);
                    }
                    return Err(err.into());
                }
            }
        }
        Command::Resolve { token } => match service.get_url(&token).await {
            Some(original_url) => println!("{original_url}"),
            None => return Err(format!("short url {token} not found").into()),
        },
    }

    Ok(())
}
