//! `livesketch` command-line shell.

mod commands;
mod error;

use clap::{Args, Parser, Subcommand};
use commands::{Session, Sketch, parse_point, report};
use error::AppResult;
use kurbo::Point;
use livesketch_core::{
    AuthorId, CanvasConfig, CanvasRoute, FileStorage, IdentityProvider, Notice, SerializableColor,
    StaticIdentity, ToolKind, WsEventStore, open_drawing,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "livesketch", about = "Shared drawing canvas shell")]
struct Cli {
    /// JSON canvas configuration.
    #[arg(long, env = "LIVESKETCH_CONFIG")]
    config: Option<PathBuf>,

    /// Participant to act as. Without one, drawings are read-only.
    #[arg(long, env = "LIVESKETCH_AUTHOR")]
    author: Option<String>,

    /// Event store WebSocket endpoint.
    #[arg(long, env = "LIVESKETCH_EVENT_STORE")]
    event_store: Option<String>,

    /// Directory holding saved drawings.
    #[arg(long, env = "LIVESKETCH_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a drawing.
    New {
        #[arg(long)]
        title: Option<String>,
    },
    /// List saved drawings.
    List,
    /// Render a saved drawing to `<title>.png`.
    Export {
        #[arg(long)]
        drawing: Uuid,
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Draw one stroke or shape into a live drawing and save it.
    Draw(DrawCommand),
    /// Follow a live drawing.
    Watch {
        #[arg(long)]
        drawing: Uuid,
        /// Stop after this many seconds.
        #[arg(long)]
        seconds: Option<u64>,
        #[arg(long, default_value_t = 50)]
        interval_ms: u64,
        /// Export the final state into this directory.
        #[arg(long)]
        out: Option<PathBuf>,
        /// Save the final state back to the drawing.
        #[arg(long)]
        save: bool,
    },
}

#[derive(Args, Debug)]
struct DrawCommand {
    #[arg(long)]
    drawing: Uuid,
    #[arg(long, default_value = "brush")]
    tool: ToolKind,
    #[arg(long, value_parser = SerializableColor::from_hex)]
    color: Option<SerializableColor>,
    #[arg(long)]
    width: Option<f64>,
    /// Pointer positions as `x,y`; shapes use the first and last.
    #[arg(required = true, value_parser = parse_point)]
    points: Vec<Point>,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> AppResult<()> {
    let mut config = match &cli.config {
        Some(path) => CanvasConfig::load(path)?,
        None => CanvasConfig::default(),
    };
    if let Some(url) = cli.event_store {
        config.event_store_url = url;
    }
    if let Some(dir) = cli.data_dir {
        config.storage_dir = Some(dir);
    }

    let docs = match &config.storage_dir {
        Some(dir) => FileStorage::new(dir.clone())?,
        None => FileStorage::default_location()?,
    };
    log::info!("Drawings stored in {}", docs.base_path().display());

    let identity = match cli.author {
        Some(author) => StaticIdentity::new(AuthorId::new(author)),
        None => StaticIdentity::anonymous(),
    };

    match cli.command {
        Command::New { title } => {
            let drawing = commands::create(&docs, &identity, title.as_deref())?;
            println!("{}", CanvasRoute::Drawing(drawing.id));
        }
        Command::List => {
            for drawing in commands::list(&docs)? {
                println!(
                    "{}  {}  ({} events)",
                    drawing.id,
                    drawing.title,
                    drawing.canvas_data.len()
                );
            }
        }
        Command::Export { drawing, out } => {
            let path = commands::export(&docs, &identity, &config, drawing, &out)?;
            report(&Notice::success(format!("Exported {}", path.display())));
        }
        Command::Draw(draw) => {
            let opened = pollster::block_on(open_drawing(
                CanvasRoute::Drawing(draw.drawing),
                &docs,
                &identity,
            ))?;
            let store = WsEventStore::connect(&config.event_store_url)?;
            let mut session =
                Session::open(&opened.drawing, identity.current_author(), store, &config)?;
            session.draw(&Sketch {
                tool: draw.tool,
                color: draw.color,
                stroke_width: draw.width,
                points: draw.points,
            });
            session.save(&docs)?;
        }
        Command::Watch {
            drawing,
            seconds,
            interval_ms,
            out,
            save,
        } => {
            let opened = pollster::block_on(open_drawing(
                CanvasRoute::Drawing(drawing),
                &docs,
                &identity,
            ))?;
            let store = WsEventStore::connect(&config.event_store_url)?;
            let mut session =
                Session::open(&opened.drawing, identity.current_author(), store, &config)?;
            session.watch(
                Duration::from_millis(interval_ms),
                seconds.map(Duration::from_secs),
            );
            if save {
                session.save(&docs)?;
            }
            if let Some(dir) = out {
                let path = commands::write_png(session.surface(), &opened.drawing.title, &dir)?;
                report(&Notice::success(format!("Exported {}", path.display())));
            }
        }
    }
    Ok(())
}
