use std::path::PathBuf;

use clap::{Parser, Subcommand};
use folio::types::{Locale, MediaKind};

/// Operator CLI for inspecting and editing page content
#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Resolve, compose, and edit locale-aware page content", long_about = None)]
pub struct Cli {
    /// Config file (defaults to $FOLIO_CONFIG or the platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create or upgrade the local database
    Init,
    /// Resolve one text key
    Get {
        key: String,
        #[arg(short, long)]
        locale: Option<Locale>,
        /// Printed when the key has no value
        #[arg(long, default_value = "")]
        fallback: String,
    },
    /// Save a text value (Spanish saves go to the draft)
    Set {
        key: String,
        value: String,
        #[arg(short, long)]
        locale: Option<Locale>,
    },
    /// Publish the Spanish draft of a key
    Publish { key: String },
    /// Compose a page and print its sections as JSON
    Page {
        page: String,
        #[arg(short, long)]
        locale: Option<Locale>,
        /// Read fields through the editor overlay
        #[arg(long)]
        edit: bool,
    },
    /// List slot bindings under a prefix
    Slots { prefix: String },
    /// Bind a slot to an asset, or clear it when --asset is omitted
    Slot {
        slot_key: String,
        #[arg(long)]
        asset: Option<String>,
        #[arg(long)]
        rank: Option<i64>,
    },
    /// Manage media assets
    Asset {
        #[command(subcommand)]
        command: AssetCommands,
    },
    /// Replace a gallery: `folio gallery gallery.images. 3 A - C` (`-` leaves a slot empty)
    Gallery {
        prefix: String,
        count: usize,
        assets: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum AssetCommands {
    /// Register an asset and print its id
    Add {
        #[arg(long)]
        bucket: String,
        #[arg(long)]
        path: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, default_value = "photo")]
        kind: MediaKind,
        #[arg(long)]
        category: Option<String>,
        /// Keep the asset out of public bundles
        #[arg(long)]
        private: bool,
    },
}
