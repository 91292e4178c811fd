//! Interactive MEMS mirror alignment.
//!
//! Shows the camera feed with the chip, mirror and extra guides drawn on
//! top. Move and resize the guides with the keyboard until they sit on the
//! parts, then press the quit key: the mirror and extra feature offsets from
//! the chip centre are printed in millimetres.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use hardware::camera::CameraSdk;
use mirror_align::camera_init::{initialize_camera, CameraArgs, ExposureArgs};
use mirror_align::display::open_display;
use mirror_align::{ControlPanel, FrameDisplay, Key, MirrorAligner};
use serde::Serialize;
use shared::config_storage::ConfigStorage;
use shared::guide::GuideSet;
use shared::mirror_alignment::AlignmentResult;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Align a MEMS mirror package against on-screen guides",
    long_about = "Overlays a square guide for the chip carrier and circle guides for the \
        mirror and an extra feature on the live camera image.\n\n\
        Keys:\n  \
        1 2 3 / Tab     select chip / mirror / extra\n  \
        arrows, w a s d move the selected guide\n  \
        + -             grow / shrink it\n  \
        [ ]             step size 1, 5, 25 px\n  \
        p               save a snapshot\n  \
        q, Escape       finish and print the measurement"
)]
struct Args {
    #[command(flatten)]
    camera: CameraArgs,

    #[command(flatten)]
    exposure: ExposureArgs,

    #[arg(
        long,
        default_value = "10.0",
        help = "Physical side length of the chip carrier in mm"
    )]
    chip_size_mm: f64,

    #[arg(long, default_value = "q", help = "Key that ends the session")]
    quit_key: char,

    #[arg(long, help = "Start from the guide placement saved by the last run")]
    resume: bool,

    #[arg(long, help = "Do not store the result and guide placement")]
    no_save: bool,

    #[arg(short, long, help = "Write the measurement and guides as JSON")]
    output: Option<PathBuf>,

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

#[derive(Serialize)]
struct AlignmentReport<'a> {
    result: &'a AlignmentResult,
    guides: &'a GuideSet,
    frames_captured: u64,
}

fn initial_controls(args: &Args, storage: &ConfigStorage) -> ControlPanel {
    if !args.resume {
        return ControlPanel::new();
    }
    match storage.get_guide_preset() {
        Some(Ok(guides)) => {
            info!("Resuming from saved guide placement");
            ControlPanel::from_guides(&guides)
        }
        Some(Err(e)) => {
            warn!("Ignoring unreadable guide preset: {e}");
            ControlPanel::new()
        }
        None => {
            info!("No saved guide placement, starting from defaults");
            ControlPanel::new()
        }
    }
}

/// Store the result and guide placement for the next run.
///
/// Failures are logged and reported as `false`; the measurement has already
/// been printed by then.
fn save_session(storage: &ConfigStorage, result: &AlignmentResult, guides: &GuideSet) -> bool {
    let saved = storage
        .save_alignment(result)
        .and_then(|path| storage.save_guide_preset(guides).map(|_| path));
    match saved {
        Ok(path) => {
            info!("Saved alignment to {}", path.display());
            true
        }
        Err(e) => {
            warn!(
                "Could not save alignment under {}: {e}",
                storage.root_path().display()
            );
            false
        }
    }
}

fn run<S: CameraSdk, D: FrameDisplay>(
    args: &Args,
    aligner: &mut MirrorAligner<S, D, ControlPanel>,
) -> Result<()> {
    let status = aligner.controls().status_line();
    aligner.display_mut().set_status(&status);

    let mut snapshots = 0;
    loop {
        aligner.capture_frame()?;
        let Some(key) = aligner.render_guides()? else {
            continue;
        };

        if key == Key::Char(args.quit_key) || key == Key::Escape {
            info!("Quit requested");
            return Ok(());
        }

        if key == Key::Char('p') {
            snapshots += 1;
            let path = args
                .snapshot_dir
                .join(format!("mirror_align_{snapshots:03}.png"));
            aligner
                .save_frame(&path)
                .with_context(|| format!("Failed to save snapshot {}", path.display()))?;
            println!("Snapshot saved to {}", path.display());
        } else if aligner.controls_mut().apply_key(key) {
            let status = aligner.controls().status_line();
            aligner.display_mut().set_status(&status);
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let storage = ConfigStorage::default();

    info!("Initializing camera...");
    let session = initialize_camera(&args.camera, &args.exposure)?;
    let display = open_display(
        "mirror_align",
        args.preview.clone(),
        args.preview_every,
        session.sensor_size(),
    )?;
    let controls = initial_controls(&args, &storage);
    let mut aligner = MirrorAligner::new(session, display, controls);

    run(&args, &mut aligner)?;

    let result = aligner.compute_alignment(args.chip_size_mm)?;
    println!("{result}");

    let guides = aligner.current_guides();
    if !args.no_save {
        save_session(&storage, &result, &guides);
    }

    if let Some(output) = &args.output {
        let report = AlignmentReport {
            result: &result,
            guides: &guides,
            frames_captured: aligner.session().frames_captured(),
        };
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(output, json)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        info!("Wrote report to {}", output.display());
    }

    aligner.close()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::mirror_alignment::compute_alignment;

    #[test]
    fn test_save_session_stores_result_and_preset() {
        let dir = tempfile::tempdir().unwrap();
        let storage = ConfigStorage::with_path(dir.path().join("config"));
        let guides = GuideSet::default();
        let result = compute_alignment(&guides, 10.0).unwrap();

        assert!(save_session(&storage, &result, &guides));
        assert!(storage.get_alignment().is_some());
        assert_eq!(storage.get_guide_preset().unwrap().unwrap(), guides);
    }

    #[test]
    fn test_save_session_failure_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        // Root is a plain file, so no directory can be created under it
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let storage = ConfigStorage::with_path(blocker);
        let guides = GuideSet::default();
        let result = compute_alignment(&guides, 10.0).unwrap();

        assert!(!save_session(&storage, &result, &guides));
    }

    #[test]
    fn test_resume_with_unreadable_preset_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let storage = ConfigStorage::with_path(dir.path().to_path_buf());
        std::fs::write(dir.path().join("guide_preset.json"), "not json").unwrap();
        let args = Args::parse_from(["mirror_align", "--resume"]);

        assert_eq!(initial_controls(&args, &storage), ControlPanel::new());
    }

    #[test]
    fn test_no_flags_start_from_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let storage = ConfigStorage::with_path(dir.path().to_path_buf());
        let args = Args::parse_from(["mirror_align"]);

        assert!(!args.no_save);
        assert_eq!(initial_controls(&args, &storage), ControlPanel::new());
    }
}
