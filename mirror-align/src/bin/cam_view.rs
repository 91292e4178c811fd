//! Live camera viewer without guides.
//!
//! Press `p` for a snapshot and `q` or Escape to quit.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use mirror_align::camera_init::{initialize_camera, CameraArgs, ExposureArgs};
use mirror_align::display::open_display;
use mirror_align::Key;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Show the camera feed")]
struct Args {
    #[command(flatten)]
    camera: CameraArgs,

    #[command(flatten)]
    exposure: ExposureArgs,

    #[arg(short, long, help = "Save the last frame here on exit")]
    save: Option<PathBuf>,

    #[arg(
        long,
        help = "Write frames to this image file instead of opening a window"
    )]
    preview: Option<PathBuf>,

    #[arg(
        long,
        default_value = "5",
        help = "Write the preview every N frames"
    )]
    preview_every: u64,

    #[arg(
        long,
        default_value = ".",
        help = "Directory for snapshots taken with p"
    )]
    snapshot_dir: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    info!("Initializing camera...");
    let mut session = initialize_camera(&args.camera, &args.exposure)?;
    let mut display = open_display(
        "cam_view",
        args.preview.clone(),
        args.preview_every,
        session.sensor_size(),
    )?;

    let mut snapshots = 0;
    loop {
        let frame = session.capture_frame()?;
        match display.show(frame.image())? {
            Some(Key::Char('q')) | Some(Key::Escape) => break,
            Some(Key::Char('p')) => {
                snapshots += 1;
                let path = args
                    .snapshot_dir
                    .join(format!("cam_view_{snapshots:03}.png"));
                session
                    .save_frame(&path)
                    .with_context(|| format!("Failed to save snapshot {}", path.display()))?;
                println!("Snapshot saved to {}", path.display());
            }
            _ => {}
        }
    }
    info!("Captured {} frames", session.frames_captured());

    if let Some(path) = &args.save {
        session
            .save_frame(path)
            .with_context(|| format!("Failed to save {}", path.display()))?;
        println!("Last frame saved to {}", path.display());
    }

    session.close()?;
    Ok(())
}
