mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{AssetCommands, Cli, Commands};
use folio::cache::or_empty;
use folio::config::Config;
use folio::db::Database;
use folio::overlay::{Capability, EditMode};
use folio::page::compose;
use folio::types::MediaAsset;
use folio::Folio;

// The operator CLI acts with editor rights.
const CAPABILITY: Capability = Capability::Editor;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("folio=info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = Config::load(cli.config.as_deref())?;

    if let Commands::Init = cli.command {
        let db = Database::connect(cfg.database_url.as_deref()).await?;
        db.run_migrations().await?;
        println!("Database ready");
        return Ok(());
    }

    let folio = Folio::connect(&cfg).await?;
    let default_locale = cfg.default_locale;

    match cli.command {
        Commands::Init => {}
        Commands::Get { key, locale, fallback } => {
            let text = folio.text(&key, locale.unwrap_or(default_locale), &fallback).await;
            println!("{text}");
        }
        Commands::Set { key, value, locale } => {
            let locale = locale.unwrap_or(default_locale);
            folio.save_text(CAPABILITY, &key, locale, &value).await.with_context(|| format!("saving {key}"))?;
            println!("Saved {key} ({locale})");
        }
        Commands::Publish { key } => {
            folio.publish(CAPABILITY, &key).await.with_context(|| format!("publishing {key}"))?;
            println!("Published {key}");
        }
        Commands::Page { page, locale, edit } => {
            let mode = if edit { EditMode::editor(true) } else { EditMode::visitor() };
            let page = page.trim_end_matches('.');
            let prefix = format!("{page}.");
            let bundle = or_empty(folio.bundle(locale.unwrap_or(default_locale), &prefix, &prefix).await)?;
            let composed = compose(folio.store(), &bundle, page, mode).await;
            println!("{}", serde_json::to_string_pretty(&composed)?);
        }
        Commands::Slots { prefix } => {
            for row in folio.slots(&prefix).await? {
                let b = &row.binding;
                let rank = b.sort_rank.map(|r| r.to_string()).unwrap_or_else(|| "-".into());
                let asset = b.asset_id.as_deref().unwrap_or("(empty)");
                let public = match &row.asset {
                    Some(a) if a.is_public => "public",
                    Some(_) => "private",
                    None => "",
                };
                println!("{}\t{}\t{}\t{}", b.slot_key, rank, asset, public);
            }
        }
        Commands::Slot { slot_key, asset, rank } => {
            folio.set_slot(CAPABILITY, &slot_key, asset.as_deref(), rank).await?;
            println!("Updated {slot_key}");
        }
        Commands::Asset { command: AssetCommands::Add { bucket, path, title, kind, category, private } } => {
            let asset = MediaAsset {
                id: uuid::Uuid::new_v4().to_string(),
                title,
                bucket,
                object_path: path,
                is_public: !private,
                kind,
                category,
            };
            folio.upsert_asset(CAPABILITY, &asset).await?;
            println!("{}", asset.id);
        }
        Commands::Gallery { prefix, count, assets } => {
            let selection: Vec<Option<String>> =
                assets.into_iter().map(|a| if a == "-" { None } else { Some(a) }).collect();
            let bindings = folio
                .rewrite_gallery(CAPABILITY, &prefix, count, &selection)
                .await
                .with_context(|| format!("rewriting gallery {prefix}"))?;
            for b in bindings {
                println!("{}\t{}", b.slot_key, b.asset_id.as_deref().unwrap_or("(empty)"));
            }
        }
    }
    Ok(())
}
