//! Custom-section CLI commands.
//!
//! Section deletion runs the documented two-step cascade: the tag is
//! swept from every note first, then the section record is dropped.

use anyhow::Result;
use clap::Subcommand;
use uuid::Uuid;

use crate::domain::SectionPatch;

use super::{open_blob, open_pipeline};
use crate::store::SectionStore;

/// Section subcommands
#[derive(Subcommand, Debug)]
pub enum SectionCommands {
    /// Create a section
    Add {
        /// Display name (doubles as the tag value)
        name: String,

        /// Symbolic icon identifier
        #[arg(short, long, default_value = "folder")]
        icon: String,

        /// Keywords used for auto-tagging (comma-separated)
        #[arg(short, long)]
        keywords: Option<String>,
    },

    /// List sections
    List,

    /// Update a section's icon or keywords
    Update {
        /// Section name or id
        section: String,

        /// New icon
        #[arg(short, long)]
        icon: Option<String>,

        /// New keywords (comma-separated, replaces the old list)
        #[arg(short, long)]
        keywords: Option<String>,
    },

    /// Delete a section (sweeps its tag from all notes first)
    Delete {
        /// Section name or id
        section: String,
    },
}

/// Execute a section command
pub async fn execute(command: SectionCommands) -> Result<()> {
    match command {
        SectionCommands::Add { name, icon, keywords } => add(&name, &icon, keywords).await,
        SectionCommands::List => list().await,
        SectionCommands::Update { section, icon, keywords } => {
            update(&section, icon, keywords).await
        }
        SectionCommands::Delete { section } => delete(&section).await,
    }
}

fn split_keywords(raw: Option<String>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

/// Resolve a section from a name or a full/prefix id
fn resolve_section_id(store: &SectionStore, raw: &str) -> Result<Uuid> {
    if let Some(section) = store.find_by_name(raw) {
        return Ok(section.id);
    }
    if let Ok(id) = Uuid::parse_str(raw) {
        if store.get(id).is_some() {
            return Ok(id);
        }
    }

    let needle = raw.to_lowercase();
    let matches: Vec<Uuid> = store
        .all()
        .iter()
        .filter(|s| s.id.to_string().starts_with(&needle))
        .map(|s| s.id)
        .collect();

    match matches.as_slice() {
        [id] => Ok(*id),
        _ => anyhow::bail!("No section matches '{}'", raw),
    }
}

async fn add(name: &str, icon: &str, keywords: Option<String>) -> Result<()> {
    let blob = open_blob()?;
    let mut store = SectionStore::load(blob)?;

    let section = store.add(name, icon, split_keywords(keywords))?;
    println!("Section '{}' ({})", section.name, section.icon);
    Ok(())
}

async fn list() -> Result<()> {
    let blob = open_blob()?;
    let store = SectionStore::load(blob)?;

    if store.is_empty() {
        println!("No sections.");
        return Ok(());
    }

    for section in store.all() {
        let short_id: String = section.id.to_string().chars().take(8).collect();
        println!(
            "{}  {}  keywords: {}  [{}]",
            section.icon,
            section.name,
            if section.keywords.is_empty() {
                "-".to_string()
            } else {
                section.keywords.join(", ")
            },
            short_id,
        );
    }
    Ok(())
}

async fn update(raw: &str, icon: Option<String>, keywords: Option<String>) -> Result<()> {
    let blob = open_blob()?;
    let mut store = SectionStore::load(blob)?;
    let id = resolve_section_id(&store, raw)?;

    let patch = SectionPatch {
        name: None,
        icon,
        keywords: keywords.map(|k| split_keywords(Some(k))),
    };

    match store.update(id, patch)? {
        Some(section) => println!("Updated '{}'", section.name),
        None => println!("No section with id {}", id),
    }
    Ok(())
}

async fn delete(raw: &str) -> Result<()> {
    let mut pipeline = open_pipeline()?;
    let id = resolve_section_id(pipeline.sections(), raw)?;
    let name = pipeline
        .sections()
        .get(id)
        .map(|s| s.name.clone())
        .unwrap_or_default();

    if pipeline.remove_section(id).await? {
        println!("Deleted section '{}'", name);
    } else {
        println!("No section with id {}", id);
    }
    Ok(())
}
