//! CLI Module
//!
//! Command-line interface for inspecting and editing the profiles of one
//! lighting context.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::context::ContextConfig;

/// Lumen - lighting profile manager
#[derive(Parser, Debug)]
#[command(name = "lumen")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Data root (defaults to the platform data directory)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Context id, i.e. the folder under <root>/Profiles
    #[arg(short, long, global = true, default_value = "desktop")]
    pub context: String,

    /// JSON context configuration; overrides --context
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Extra handler id available in this context (repeatable)
    #[arg(long = "extra-layer", global = true)]
    pub extra_layers: Vec<String>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Context configuration selected by the global flags.
    pub fn context_config(&self) -> crate::Result<ContextConfig> {
        let mut config = match &self.config {
            Some(path) => ContextConfig::from_file(path)?,
            None => ContextConfig::new(self.context.clone()),
        };
        if let Some(root) = &self.root {
            config.root = Some(root.clone());
        }
        config.extra_layers.extend(self.extra_layers.iter().cloned());
        config.validate()?;
        Ok(config)
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List profiles, marking the active one
    #[command(name = "list")]
    List,

    /// Print a profile's layers
    #[command(name = "show")]
    Show {
        /// Profile id (file stem)
        profile: String,
    },

    /// Create a profile and make it active
    #[command(name = "add")]
    Add {
        /// Display name; the file name is derived from it
        name: String,
    },

    /// Delete a profile and its document
    #[command(name = "delete")]
    Delete {
        /// Profile id (file stem)
        profile: String,
    },

    /// Make a profile active
    #[command(name = "switch")]
    Switch {
        /// Profile id (file stem)
        profile: String,
    },

    /// Restore a profile's layers to their defaults
    #[command(name = "reset")]
    Reset {
        /// Profile id (file stem)
        profile: String,
    },

    /// Add a layer on top of a profile
    #[command(name = "add-layer")]
    AddLayer {
        /// Profile id (file stem)
        profile: String,

        /// Layer type tag
        tag: String,

        /// Add to the overlay region instead of the main one
        #[arg(long)]
        overlay: bool,

        /// Layer name (defaults to the type's display name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Copy an external profile document into the context
    #[command(name = "import")]
    Import {
        /// Path of the document
        path: PathBuf,
    },

    /// List registered layer types and profile kinds
    #[command(name = "tags")]
    Tags,

    /// Load the context and report recovered problems
    #[command(name = "check")]
    Check,
}
