//! Turntable - manage a model capture workspace from the command line

mod config;

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use turntable_capture::Session;
use turntable_core::{
    archive_name, calculate_positions, catalog, CameraPatch, ControlDescriptor, ModelId,
    ModelSettings, NewModel,
};

#[derive(Parser, Debug)]
#[command(name = "turntable")]
#[command(about = "3D model viewer workspace and multi-view capture manager")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "turntable.toml")]
    config: PathBuf,

    /// Workspace directory (overrides the configuration file)
    #[arg(short, long)]
    workspace: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the component type catalog as JSON
    Catalog,
    /// Print the component tree with each setting and its control
    Scene,
    /// Print the capture positions for a camera distance
    Positions {
        #[arg(short, long, default_value_t = 100.0)]
        distance: f64,
    },
    /// Manage models
    Models {
        #[command(subcommand)]
        action: ModelsCommand,
    },
    /// Manage captured screenshots
    Screenshots {
        #[command(subcommand)]
        action: ScreenshotsCommand,
    },
    /// Write all screenshots as `{model}/{position}.png` into a new directory
    Export {
        #[arg(short, long)]
        out: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum ModelsCommand {
    List,
    Add {
        file: PathBuf,
        /// Display name (defaults to the file stem)
        #[arg(long)]
        name: Option<String>,
        /// Saved camera zoom
        #[arg(long)]
        zoom: Option<f64>,
        /// Thumbnail image
        #[arg(long)]
        thumbnail: Option<PathBuf>,
    },
    Select {
        id: String,
    },
    Remove {
        id: String,
    },
}

#[derive(Subcommand, Debug)]
enum ScreenshotsCommand {
    List,
    Delete { id: String },
    Clear,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Turntable v{}", env!("CARGO_PKG_VERSION"));

    match &args.command {
        Command::InitConfig { force } => {
            if args.config.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", args.config.display());
            }
            config::save_default_config(&args.config)?;
            println!("Wrote {}", args.config.display());
            return Ok(());
        }
        Command::Catalog => {
            let entries: serde_json::Map<String, serde_json::Value> = catalog()
                .into_iter()
                .map(|(kind, descriptor)| Ok((kind.tag().to_string(), serde_json::to_value(descriptor)?)))
                .collect::<Result<_>>()?;
            println!("{}", serde_json::to_string_pretty(&entries)?);
            return Ok(());
        }
        Command::Positions { distance } => {
            for position in calculate_positions(*distance) {
                let [x, y, z] = position.vector;
                println!("{:<20} {:>10.3} {:>10.3} {:>10.3}", position.name, x, y, z);
            }
            return Ok(());
        }
        _ => {}
    }

    // Load configuration
    let config = config::load_config(&args.config)?;
    let workspace = args
        .workspace
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.workspace.path));
    info!(workspace = %workspace.display(), "Opening workspace");

    let mut session = Session::open(&workspace, config.session_config())
        .with_context(|| format!("Failed to open workspace {}", workspace.display()))?;

    match args.command {
        Command::Scene => print_scene(&session),
        Command::Models { action } => run_models(&mut session, action)?,
        Command::Screenshots { action } => run_screenshots(&mut session, action)?,
        Command::Export { out } => export(&session, &out)?,
        Command::InitConfig { .. } | Command::Catalog | Command::Positions { .. } => {}
    }

    session.save()?;
    Ok(())
}

fn control_name(control: &ControlDescriptor) -> &'static str {
    match control {
        ControlDescriptor::Slider { .. } => "slider",
        ControlDescriptor::Color { .. } => "color",
        ControlDescriptor::Checkbox { .. } => "checkbox",
        ControlDescriptor::Text { .. } => "text",
        ControlDescriptor::SliderArray { .. } => "slider-array",
    }
}

fn print_scene(session: &Session) {
    for entry in session.tree.walk() {
        let component = entry.component;
        let indent = "  ".repeat(entry.depth);
        let descriptor = component.kind().descriptor();
        println!(
            "{}{} ({}){}",
            indent,
            descriptor.name,
            component.id,
            if component.is_core { " [core]" } else { "" }
        );
        for (key, value) in component.settings.entries() {
            let control = descriptor.control_for(key, &value);
            println!("{}  {} = {} <{}>", indent, key, value, control_name(&control));
        }
    }

    let orphans = session.tree.orphans();
    if !orphans.is_empty() {
        println!("{} component(s) with a missing parent", orphans.len());
    }
}

fn run_models(session: &mut Session, action: ModelsCommand) -> Result<()> {
    match action {
        ModelsCommand::List => {
            let selected = session.models.selected_id().cloned();
            for model in session.models.models() {
                let marker = if Some(&model.id) == selected.as_ref() { "*" } else { " " };
                let zoom = model
                    .saved_zoom()
                    .map(|z| format!("zoom {}", z))
                    .unwrap_or_default();
                println!("{} {}  {}  {}", marker, model.id, model.name, zoom);
            }
        }
        ModelsCommand::Add {
            file,
            name,
            zoom,
            thumbnail,
        } => {
            let data = std::fs::read(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let thumbnail = thumbnail.map(std::fs::read).transpose()?;
            let name = match name {
                Some(name) => name,
                None => file
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "model".to_string()),
            };

            let id = session.add_model(
                NewModel {
                    name,
                    data,
                    thumbnail,
                    settings: ModelSettings {
                        camera: zoom.map(CameraPatch::zoom),
                        canvas: None,
                    },
                },
                true,
            )?;
            println!("{}", id);
        }
        ModelsCommand::Select { id } => {
            session.select_model(&ModelId(id))?;
        }
        ModelsCommand::Remove { id } => {
            if !session.delete_model(&ModelId(id.clone()))? {
                bail!("No model with id {}", id);
            }
        }
    }
    Ok(())
}

fn run_screenshots(session: &mut Session, action: ScreenshotsCommand) -> Result<()> {
    match action {
        ScreenshotsCommand::List => {
            for shot in session.screenshots.screenshots() {
                println!("{}  {}  {}", shot.id, shot.model_name, shot.position.name);
            }
        }
        ScreenshotsCommand::Delete { id } => {
            if !session.delete_screenshot(&id)? {
                bail!("No screenshot with id {}", id);
            }
        }
        ScreenshotsCommand::Clear => session.reset_screenshots()?,
    }
    Ok(())
}

fn export(session: &Session, out: &Path) -> Result<()> {
    let entries = session.export_entries()?;
    if entries.is_empty() {
        bail!("No screenshots to export");
    }

    let dir = out.join(archive_name(&Local::now()));
    for entry in &entries {
        let path = dir.join(&entry.path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, &entry.bytes)?;
    }
    info!(count = entries.len(), dir = %dir.display(), "Exported screenshots");
    println!("{}", dir.display());
    Ok(())
}
