//! Command-line interface for voxnote.
//!
//! Commands for capturing voice notes, asking questions about them,
//! listing categorized views, manual note operations, and managing
//! custom sections and settings.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use uuid::Uuid;

use crate::capture::{AudioClip, DropFolderWatcher, WatcherConfig};
use crate::config;
use crate::core::VoicePipeline;
use crate::domain::{Category, LocalClock, Note};
use crate::reminder::{LogReminderBackend, ReminderScheduler};
use crate::speech::HttpTranscriber;
use crate::store::{BlobStore, NoteStore, SectionStore, Settings, SqliteBlobStore};
use crate::understand::ChatClient;

pub mod section;

/// voxnote - voice-captured notes
#[derive(Parser, Debug)]
#[command(name = "voxnote")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Capture a voice memo into structured notes
    Capture {
        /// Audio file to transcribe
        audio: Option<PathBuf>,

        /// Skip transcription and extract from this text
        #[arg(long)]
        text: Option<String>,
    },

    /// Ask a question or issue a bulk command by voice
    Ask {
        /// Audio file to transcribe
        audio: Option<PathBuf>,

        /// Skip transcription and interpret this text
        #[arg(long)]
        text: Option<String>,
    },

    /// List notes
    List {
        /// Filter by category
        #[arg(short, long, value_enum)]
        category: Option<CategoryArg>,

        /// Filter by custom-section tag
        #[arg(short, long)]
        section: Option<String>,

        /// Show archived notes instead of active ones
        #[arg(long)]
        archived: bool,

        /// Order by due date instead of creation time
        #[arg(long)]
        timeline: bool,

        /// Maximum number of notes to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Search notes (including archived ones)
    Search {
        /// Search query
        query: String,
    },

    /// Toggle a note's completion flag
    Complete {
        /// Note id (or unique prefix)
        id: String,
    },

    /// Archive a note
    Archive {
        /// Note id (or unique prefix)
        id: String,
    },

    /// Bring an archived note back
    Unarchive {
        /// Note id (or unique prefix)
        id: String,
    },

    /// Delete a note permanently
    Delete {
        /// Note id (or unique prefix)
        id: String,
    },

    /// Watch the drop folder and capture new clips as they appear
    Watch {
        /// Folder to watch (defaults to the configured drop folder)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Process the files already present and exit
        #[arg(long)]
        once: bool,
    },

    /// Manage custom sections
    Section {
        #[command(subcommand)]
        command: section::SectionCommands,
    },

    /// Show or change settings
    Settings {
        /// Reminder hour for today-notes (0-23)
        #[arg(long)]
        today_hour: Option<u32>,

        /// Reminder hour for tomorrow-notes (0-23)
        #[arg(long)]
        tomorrow_hour: Option<u32>,

        /// Reminder hour for shopping notes (0-23)
        #[arg(long)]
        shopping_hour: Option<u32>,

        /// Minutes before a due date at which reminders fire
        #[arg(long)]
        lead_minutes: Option<i64>,

        /// IANA timezone name
        #[arg(long)]
        timezone: Option<String>,

        /// UTC offset in minutes for local rendering
        #[arg(long)]
        utc_offset: Option<i32>,
    },

    /// Show resolved configuration (debug)
    Config,
}

/// Category filter for the CLI (maps to Category)
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CategoryArg {
    Today,
    Tomorrow,
    Idea,
    Shopping,
    Other,
}

impl From<CategoryArg> for Category {
    fn from(c: CategoryArg) -> Self {
        match c {
            CategoryArg::Today => Category::Today,
            CategoryArg::Tomorrow => Category::Tomorrow,
            CategoryArg::Idea => Category::Idea,
            CategoryArg::Shopping => Category::Shopping,
            CategoryArg::Other => Category::Other,
        }
    }
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Capture { audio, text } => capture(audio, text).await,
            Commands::Ask { audio, text } => ask(audio, text).await,
            Commands::List {
                category,
                section,
                archived,
                timeline,
                limit,
            } => list_notes(category, section, archived, timeline, limit).await,
            Commands::Search { query } => search_notes(&query).await,
            Commands::Complete { id } => complete_note(&id).await,
            Commands::Archive { id } => archive_note(&id).await,
            Commands::Unarchive { id } => unarchive_note(&id).await,
            Commands::Delete { id } => delete_note(&id).await,
            Commands::Watch { path, once } => watch(path, once).await,
            Commands::Section { command } => section::execute(command).await,
            Commands::Settings {
                today_hour,
                tomorrow_hour,
                shopping_hour,
                lead_minutes,
                timezone,
                utc_offset,
            } => {
                update_settings(
                    today_hour,
                    tomorrow_hour,
                    shopping_hour,
                    lead_minutes,
                    timezone,
                    utc_offset,
                )
                .await
            }
            Commands::Config => show_config().await,
        }
    }
}

/// Open the blob store at the configured location
pub(crate) fn open_blob() -> Result<Arc<dyn BlobStore>> {
    let config = config::config()?;
    let store = SqliteBlobStore::open(&config.db_path())
        .with_context(|| format!("Failed to open store at {}", config.db_path().display()))?;
    Ok(Arc::new(store))
}

/// Wire the full pipeline from config and the persisted settings
pub(crate) fn open_pipeline() -> Result<VoicePipeline> {
    let config = config::config()?;
    let blob = open_blob()?;
    let settings = Settings::load(&blob)?;

    let transcriber = Arc::new(HttpTranscriber::new(
        &config.speech_url,
        config.api_key.clone(),
    )?);
    let language = Arc::new(ChatClient::new(
        &config.language_url,
        &config.language_model,
        config.api_key.clone(),
    )?);

    let notes = NoteStore::load(blob.clone())?;
    let sections = SectionStore::load(blob.clone())?;
    let scheduler = ReminderScheduler::load(
        blob,
        Arc::new(LogReminderBackend),
        settings.reminder_policy(),
    )?;

    Ok(VoicePipeline::new(
        transcriber,
        language,
        notes,
        sections,
        scheduler,
        settings.clock(),
    ))
}

/// Resolve a note id from a full UUID or a unique prefix
pub(crate) fn resolve_note_id(store: &NoteStore, raw: &str) -> Result<Uuid> {
    if let Ok(id) = Uuid::parse_str(raw) {
        return Ok(id);
    }

    let needle = raw.to_lowercase();
    let matches: Vec<Uuid> = store
        .all()
        .iter()
        .filter(|n| n.id.to_string().starts_with(&needle))
        .map(|n| n.id)
        .collect();

    match matches.as_slice() {
        [id] => Ok(*id),
        [] => anyhow::bail!("No note matches id '{}'", raw),
        _ => anyhow::bail!("Id prefix '{}' is ambiguous ({} matches)", raw, matches.len()),
    }
}

async fn load_clip(audio: Option<PathBuf>) -> Result<AudioClip> {
    let path = audio.context("No audio file provided. Pass a path or use --text")?;
    Ok(AudioClip::from_file(&path).await?)
}

async fn capture(audio: Option<PathBuf>, text: Option<String>) -> Result<()> {
    let mut pipeline = open_pipeline()?;

    let stored = if let Some(text) = text {
        pipeline.capture_text(&text).await?
    } else {
        let clip = load_clip(audio).await?;
        pipeline.capture_notes(&clip).await?
    };

    if stored.is_empty() {
        println!("Nothing actionable in that memo.");
        return Ok(());
    }

    println!("Captured {} note(s):", stored.len());
    for note in &stored {
        print_note(note, pipeline.clock());
    }
    Ok(())
}

async fn ask(audio: Option<PathBuf>, text: Option<String>) -> Result<()> {
    let mut pipeline = open_pipeline()?;

    let result = if let Some(text) = text {
        pipeline.query_text(&text).await?
    } else {
        let clip = load_clip(audio).await?;
        pipeline.run_command(&clip).await?
    };

    println!("{}", result.response);

    if !result.matched_notes.is_empty() {
        println!();
        for note in &result.matched_notes {
            print_note(note, pipeline.clock());
        }
    }
    if let Some(action) = result.action {
        println!();
        println!("Applied action: {:?}", action);
    }
    Ok(())
}

async fn list_notes(
    category: Option<CategoryArg>,
    section: Option<String>,
    archived: bool,
    timeline: bool,
    limit: usize,
) -> Result<()> {
    let blob = open_blob()?;
    let settings = Settings::load(&blob)?;
    let clock = settings.clock();
    let store = NoteStore::load(blob)?;

    let notes: Vec<&Note> = if archived {
        store.archived()
    } else if let Some(category) = category {
        store.by_category(category.into())
    } else if let Some(ref section) = section {
        store.by_tag(section)
    } else if timeline {
        store.timeline()
    } else {
        store.active()
    };

    if notes.is_empty() {
        println!("No notes.");
        return Ok(());
    }

    for note in notes.iter().take(limit) {
        print_note(note, &clock);
    }
    if notes.len() > limit {
        println!("... and {} more", notes.len() - limit);
    }
    Ok(())
}

async fn search_notes(query: &str) -> Result<()> {
    let blob = open_blob()?;
    let settings = Settings::load(&blob)?;
    let clock = settings.clock();
    let store = NoteStore::load(blob)?;

    let hits = store.search(query);
    if hits.is_empty() {
        println!("No notes match '{}'.", query);
        return Ok(());
    }

    for note in hits {
        print_note(note, &clock);
    }
    Ok(())
}

async fn complete_note(raw_id: &str) -> Result<()> {
    let mut pipeline = open_pipeline()?;
    let id = resolve_note_id(pipeline.notes(), raw_id)?;

    match pipeline.toggle_complete(id).await? {
        Some(note) if note.completed => println!("Completed: {}", note.title),
        Some(note) => println!("Reopened: {}", note.title),
        None => println!("No note with id {}", id),
    }
    Ok(())
}

async fn archive_note(raw_id: &str) -> Result<()> {
    let mut pipeline = open_pipeline()?;
    let id = resolve_note_id(pipeline.notes(), raw_id)?;

    match pipeline.archive_note(id).await? {
        Some(note) => println!("Archived: {}", note.title),
        None => println!("No note with id {}", id),
    }
    Ok(())
}

async fn unarchive_note(raw_id: &str) -> Result<()> {
    let mut pipeline = open_pipeline()?;
    let id = resolve_note_id(pipeline.notes(), raw_id)?;

    match pipeline.unarchive_note(id).await? {
        Some(note) => println!("Unarchived: {}", note.title),
        None => println!("No note with id {}", id),
    }
    Ok(())
}

async fn delete_note(raw_id: &str) -> Result<()> {
    let mut pipeline = open_pipeline()?;
    let id = resolve_note_id(pipeline.notes(), raw_id)?;

    if pipeline.delete_note(id).await? {
        println!("Deleted note {}", id);
    } else {
        println!("No note with id {}", id);
    }
    Ok(())
}

async fn watch(path: Option<PathBuf>, once: bool) -> Result<()> {
    let config = config::config()?;
    let watch_path = path.unwrap_or_else(|| config.drop_dir.clone());
    std::fs::create_dir_all(&watch_path)
        .with_context(|| format!("Failed to create drop folder: {}", watch_path.display()))?;

    let watcher = DropFolderWatcher::new(WatcherConfig::new(&watch_path));
    let mut pipeline = open_pipeline()?;

    if once {
        let clips = watcher.scan_once().await?;
        println!("Found {} clip(s) in {}", clips.len(), watch_path.display());
        for dropped in clips {
            process_clip(&mut pipeline, &dropped.path).await;
        }
        return Ok(());
    }

    println!("Watching {} (Ctrl-C to stop)", watch_path.display());
    let (mut events, _handle) = watcher.watch()?;
    while let Some(dropped) = events.recv().await {
        process_clip(&mut pipeline, &dropped.path).await;
    }
    Ok(())
}

/// Capture one dropped clip, surfacing failures without stopping the watch
async fn process_clip(pipeline: &mut VoicePipeline, path: &std::path::Path) {
    println!("Processing {}", path.display());

    let clip = match AudioClip::from_file(path).await {
        Ok(clip) => clip,
        Err(e) => {
            eprintln!("  Skipped: {}", e);
            return;
        }
    };

    match pipeline.capture_notes(&clip).await {
        Ok(stored) => {
            for note in &stored {
                print_note(note, pipeline.clock());
            }
        }
        Err(e) => eprintln!("  Failed: {:#}", e),
    }
}

async fn update_settings(
    today_hour: Option<u32>,
    tomorrow_hour: Option<u32>,
    shopping_hour: Option<u32>,
    lead_minutes: Option<i64>,
    timezone: Option<String>,
    utc_offset: Option<i32>,
) -> Result<()> {
    let blob = open_blob()?;
    let mut settings = Settings::load(&blob)?;

    let changed = today_hour.is_some()
        || tomorrow_hour.is_some()
        || shopping_hour.is_some()
        || lead_minutes.is_some()
        || timezone.is_some()
        || utc_offset.is_some();

    if let Some(hour) = today_hour {
        settings.today_hour = hour;
    }
    if let Some(hour) = tomorrow_hour {
        settings.tomorrow_hour = hour;
    }
    if let Some(hour) = shopping_hour {
        settings.shopping_hour = hour;
    }
    if let Some(minutes) = lead_minutes {
        settings.lead_minutes = minutes;
    }
    if let Some(tz) = timezone {
        settings.timezone = tz;
    }
    if let Some(offset) = utc_offset {
        settings.utc_offset_minutes = offset;
    }

    if changed {
        settings.save(&blob)?;
        println!("Settings updated.");
    }

    println!();
    println!("Reminder hours:  today {:02}:00 | tomorrow {:02}:00 | shopping {:02}:00",
        settings.today_hour, settings.tomorrow_hour, settings.shopping_hour);
    println!("Lead minutes:    {}", settings.lead_minutes);
    println!("Timezone:        {} (UTC offset {} min)", settings.timezone, settings.utc_offset_minutes);
    Ok(())
}

async fn show_config() -> Result<()> {
    let config = config::config()?;

    println!();
    println!("voxnote configuration");
    println!("══════════════════════════════════════════════════════════════");
    println!();
    println!("Home:          {}", config.home.display());
    println!("Store:         {}", config.db_path().display());
    println!("Drop folder:   {}", config.drop_dir.display());
    println!("Speech URL:    {}", config.speech_url);
    println!("Language URL:  {}", config.language_url);
    println!("Model:         {}", config.language_model);
    println!(
        "API key:       {}",
        if config.api_key.is_some() { "set" } else { "not set" }
    );
    match config.config_file {
        Some(ref path) => println!("Config file:   {}", path.display()),
        None => println!("Config file:   (none found)"),
    }
    Ok(())
}

/// One-line note rendering shared by list/search/capture output
pub(crate) fn print_note(note: &Note, clock: &LocalClock) {
    let check = if note.completed { "x" } else { " " };
    let due = note
        .due_date
        .map(|d| format!("  due {}", clock.render_local(d)))
        .unwrap_or_default();
    let tags = if note.tags.is_empty() {
        String::new()
    } else {
        format!("  #{}", note.tags.join(" #"))
    };
    let short_id: String = note.id.to_string().chars().take(8).collect();

    println!(
        "[{}] {}  ({}){}{}  [{}]",
        check,
        note.title,
        note.category.as_str(),
        due,
        tags,
        short_id,
    );
}
