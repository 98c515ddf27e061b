mod cli;

use crate::cli::{Command, GeneratorArg, CLI};
use anyhow::Context;
use clap::Parser;
use petit_core::{Alias, UrlRecord};
use petit_generator::{AlphanumericGenerator, AlphanumericSettings, Generator, SeqGenerator};
use petit_shortener::{ShortenParams, ShortenerService};
use petit_storage::Backend;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::parse();
    petit_telemetry::init(config.log_format)?;

    let storage = config.storage_config()?;
    info!(storage_backend = storage.name(), generator = ?config.generator, "starting petit");

    let backend = Backend::open(&storage)
        .await
        .context("failed to open storage backend")?;

    match config.generator {
        GeneratorArg::Seq => {
            let generator = SeqGenerator::with_prefix(config.generator_prefix.clone());
            run(&config, ShortenerService::new(backend, generator)).await
        }
        GeneratorArg::Alphanumeric => {
            let settings = AlphanumericSettings::builder()
                .length(config.alias_length)
                .build();
            let generator = AlphanumericGenerator::new(settings)?;
            run(&config, ShortenerService::new(backend, generator)).await
        }
    }
}

async fn run<G: Generator>(
    config: &CLI,
    service: ShortenerService<Backend, G>,
) -> anyhow::Result<()> {
    match &config.command {
        Command::Shorten { target, alias } => {
            let mut params = ShortenParams::new(target.as_str());
            if let Some(alias) = alias {
                params = params.with_alias(Alias::new(alias)?);
            }

            let alias = service.shorten(params).await?;
            let target = target.trim().to_owned();
            print_record(config, UrlRecord { alias, target })?;
        }
        Command::Resolve { alias } => {
            let alias = Alias::new(alias)?;
            let target = service.resolve(&alias).await?;
            print_record(config, UrlRecord { alias, target })?;
        }
        Command::Delete { alias } => {
            let alias = Alias::new(alias)?;
            if service.delete(&alias).await? {
                println!("deleted {alias}");
            } else {
                anyhow::bail!("alias not found: {alias}");
            }
        }
    }

    Ok(())
}

fn print_record(config: &CLI, record: UrlRecord) -> anyhow::Result<()> {
    if config.json {
        println!("{}", serde_json::to_string(&record)?);
        return Ok(());
    }

    match &config.base_url {
        Some(base_url) => println!("{}\t{}", record.alias.to_url(base_url), record.target),
        None => println!("{}\t{}", record.alias, record.target),
    }
    Ok(())
}
