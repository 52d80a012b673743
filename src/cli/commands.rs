//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command. Every command opens
//! the context, does its work, and closes it so pending saves are flushed.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::context::{ContextConfig, LightingContext};
use crate::error::Result;
use crate::layers::{LayerEntry, ProfileId, Region, TypeRegistry};

fn open(config: ContextConfig) -> Result<LightingContext> {
    info!(context = %config.id, folder = %config.profile_folder().display(), "Opening context");
    LightingContext::load(config, Arc::new(TypeRegistry::with_builtins()))
}

/// List profiles of the context.
pub fn list(config: ContextConfig) -> Result<()> {
    let mut ctx = open(config)?;

    for profile in ctx.profiles() {
        let marker = if ctx.active_id() == Some(profile.id()) {
            "*"
        } else {
            " "
        };
        println!(
            "{} {:<24} {:<24} {} layers",
            marker,
            profile.id(),
            profile.name(),
            profile.layer_count()
        );
    }

    ctx.close()
}

/// Print one profile's layers.
pub fn show(config: ContextConfig, profile: &str) -> Result<()> {
    let mut ctx = open(config)?;
    let id = ProfileId::from(profile);
    let profile = ctx
        .profile(&id)
        .ok_or_else(|| crate::LumenError::ProfileNotFound { id: id.to_string() })?;

    println!("{} ({})", profile.name(), profile.filepath().display());
    println!("Kind: {}", profile.kind());
    for region in [Region::Main, Region::Overlay] {
        println!("[{}]", region);
        let layers = profile.layers(region);
        if layers.is_empty() {
            println!("  (empty)");
        }
        for (index, entry) in layers.iter().enumerate() {
            println!("  {:>2}. {}", index, describe(entry));
        }
    }

    ctx.close()
}

fn describe(entry: &LayerEntry) -> String {
    let state = match (entry.is_inert(), entry.is_enabled()) {
        (true, _) => "inert",
        (false, true) => "on",
        (false, false) => "off",
    };
    format!("{:<24} {:<18} {}", entry.name(), entry.variant_tag(), state)
}

/// Create a profile and switch to it.
pub fn add(config: ContextConfig, name: &str) -> Result<()> {
    let mut ctx = open(config)?;
    let id = ctx.add(name)?;
    println!("Added profile '{}' ({})", name, id);
    ctx.close()
}

/// Delete a profile.
pub fn delete(config: ContextConfig, profile: &str) -> Result<()> {
    let mut ctx = open(config)?;
    let id = ProfileId::from(profile);

    if ctx.delete(&id)? {
        println!("Deleted profile '{}'", id);
        if let Some(active) = ctx.active_id() {
            println!("Active profile: {}", active);
        }
    } else {
        println!("Profile '{}' was not deleted (unknown, or the last profile)", id);
    }

    ctx.close()
}

/// Make a profile active.
pub fn switch(config: ContextConfig, profile: &str) -> Result<()> {
    let mut ctx = open(config)?;
    let id = ProfileId::from(profile);

    if ctx.switch_to(&id)? {
        println!("Active profile: {}", id);
    } else {
        println!("'{}' is already active", id);
    }

    ctx.close()
}

/// Restore a profile to defaults.
pub fn reset(config: ContextConfig, profile: &str) -> Result<()> {
    let mut ctx = open(config)?;
    let id = ProfileId::from(profile);
    ctx.reset(&id)?;
    println!("Reset profile '{}'", id);
    ctx.close()
}

/// Add a layer to a profile.
pub fn add_layer(
    config: ContextConfig,
    profile: &str,
    tag: &str,
    overlay: bool,
    name: Option<&str>,
) -> Result<()> {
    let mut ctx = open(config)?;
    let id = ProfileId::from(profile);
    let region = if overlay { Region::Overlay } else { Region::Main };

    let layer = ctx.add_layer(&id, region, tag, name)?;
    println!("Added {} layer {} to '{}' [{}]", tag, layer, id, region);

    ctx.close()
}

/// Import an external document.
pub fn import(config: ContextConfig, path: &Path) -> Result<()> {
    let mut ctx = open(config)?;
    let id = ctx.import_profile(path)?;
    println!("Imported {} as '{}'", path.display(), id);
    ctx.close()
}

/// List registered layer types.
pub fn tags(config: ContextConfig) -> Result<()> {
    let registry = TypeRegistry::with_builtins();
    let catalog = config.catalog();

    println!("Layer types:");
    for (tag, display_name) in registry.list_tags() {
        let available = registry
            .handler_id(tag)
            .map(|id| catalog.is_available(id))
            .unwrap_or(false);
        println!(
            "  {:<20} {:<20} {}",
            tag,
            display_name,
            if available { "" } else { "(not in this context)" }
        );
    }

    println!("Profile kinds:");
    for kind in registry.list_profile_kinds() {
        println!("  {}", kind);
    }

    Ok(())
}

/// Load the context and report what had to be recovered.
pub fn check(config: ContextConfig) -> Result<()> {
    let mut ctx = open(config)?;
    let report = ctx.load_report().clone();

    println!("Folder: {}", ctx.folder().display());
    println!("Profiles: {}", ctx.profiles().len());
    if let Some(active) = ctx.active_id() {
        println!("Active: {}", active);
    }

    for (path, moved_to) in &report.quarantined {
        println!(
            "Quarantined: {} -> {}",
            path.display(),
            moved_to.display()
        );
    }
    for path in &report.skipped {
        println!("Skipped: {}", path.display());
    }
    for (id, decoded) in &report.decoded {
        if let Some(from) = &decoded.migrated_from {
            println!("Migrated: {} (from schema {})", id, from);
        }
        for issue in &decoded.inert {
            println!(
                "Inert layer: {} [{}] #{} '{}': {}",
                id, issue.region, issue.index, issue.tag, issue.reason
            );
        }
        for issue in &decoded.dropped {
            println!(
                "Dropped layer: {} [{}] #{} '{}': {}",
                id, issue.region, issue.index, issue.tag, issue.reason
            );
        }
    }
    if report.synthesized_default {
        println!("Created a fresh default profile");
    }

    println!(
        "Summary: {} quarantined, {} skipped, {} inert, {} dropped",
        report.quarantined.len(),
        report.skipped.len(),
        report.inert_layers(),
        report.dropped_layers()
    );

    ctx.close()
}
