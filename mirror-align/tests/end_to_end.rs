use approx::assert_relative_eq;
use hardware::camera::simulated::SimulatedSdk;
use hardware::camera::{CameraSession, ErrorPolicy};
use image::Rgb;
use mirror_align::display::ScriptedDisplay;
use mirror_align::{ControlPanel, Key, MirrorAligner};
use shared::config_storage::ConfigStorage;
use shared::guide::{CHIP_COLOR, MIRROR_COLOR};
use shared::image_size::ImageSize;
use std::sync::atomic::Ordering;

fn sensor() -> ImageSize {
    ImageSize::from_width_height(1280, 1024)
}

#[test]
fn test_capture_render_save() {
    let sdk = SimulatedSdk::new(sensor());
    let session = CameraSession::open(sdk, 0, ErrorPolicy::Advisory).unwrap();
    let mut aligner = MirrorAligner::new(session, ScriptedDisplay::default(), ControlPanel::new());

    let frame = aligner.capture_frame().unwrap();
    assert_eq!(frame.size(), sensor());

    let key = aligner.render_guides().unwrap();
    assert_eq!(key, None);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test_output.png");
    aligner.save_frame(&path).unwrap();
    assert!(path.exists());

    let saved = image::open(&path).unwrap().to_rgb8();
    assert_eq!(saved.dimensions(), (1280, 1024));
    assert_eq!(*saved.get_pixel(540, 412), Rgb(CHIP_COLOR));
    assert_eq!(*saved.get_pixel(740, 612), Rgb(CHIP_COLOR));
    // Mirror circle, radius 100, drawn after the chip
    assert_eq!(*saved.get_pixel(740, 512), Rgb(MIRROR_COLOR));
}

#[test]
fn test_keyboard_session_measures_offsets() {
    let sdk = SimulatedSdk::new(sensor());
    let exits = sdk.exit_counter();
    let session = CameraSession::open(sdk, 0, ErrorPolicy::Strict).unwrap();

    // Mirror 50 px right and 25 px down at the default 200 px chip size
    let mut keys = vec![Key::Char('2'), Key::Char(']'), Key::Char(']')];
    keys.extend([Key::Right, Key::Right, Key::Down]);
    keys.push(Key::Char('q'));
    let display = ScriptedDisplay::pressing(&keys);
    let mut aligner = MirrorAligner::new(session, display, ControlPanel::new());

    loop {
        aligner.capture_frame().unwrap();
        match aligner.render_guides().unwrap() {
            Some(Key::Char('q')) | None => break,
            Some(key) => {
                aligner.controls_mut().apply_key(key);
            }
        }
    }

    let result = aligner.compute_alignment(10.0).unwrap();
    assert_relative_eq!(result.pixels_per_mm, 20.0);
    assert_relative_eq!(result.mirror_offset_mm.0, 2.5);
    assert_relative_eq!(result.mirror_offset_mm.1, 1.25);
    assert_relative_eq!(result.mirror_diameter_mm, 10.0);
    assert_eq!(aligner.display().frames_shown(), keys.len());

    aligner.close().unwrap();
    drop(aligner);
    assert_eq!(exits.load(Ordering::SeqCst), 1);
}

#[test]
fn test_rendering_preserves_dimensions() {
    let sdk = SimulatedSdk::new(ImageSize::from_width_height(320, 200));
    let session = CameraSession::open(sdk, 0, ErrorPolicy::Strict).unwrap();
    // Default guides sit far outside a 320x200 sensor
    let mut aligner = MirrorAligner::new(session, ScriptedDisplay::default(), ControlPanel::new());

    for _ in 0..3 {
        aligner.capture_frame().unwrap();
        aligner.render_guides().unwrap();
    }
    let sizes = aligner.display().shown_sizes();
    assert_eq!(sizes.len(), 3);
    assert!(sizes
        .iter()
        .all(|s| *s == ImageSize::from_width_height(320, 200)));
}

#[test]
fn test_result_and_preset_persist() {
    let dir = tempfile::tempdir().unwrap();
    let storage = ConfigStorage::with_path(dir.path().to_path_buf());

    let sdk = SimulatedSdk::new(sensor());
    let session = CameraSession::open(sdk, 0, ErrorPolicy::Strict).unwrap();
    let mut controls = ControlPanel::new();
    controls.set("Mirror X pos", 700);
    let mut aligner = MirrorAligner::new(session, ScriptedDisplay::default(), controls);
    aligner.capture_frame().unwrap();
    aligner.render_guides().unwrap();

    let result = aligner.compute_alignment(10.0).unwrap();
    storage.save_alignment(&result).unwrap();
    storage.save_guide_preset(&aligner.current_guides()).unwrap();

    let loaded = storage.get_alignment().unwrap().unwrap();
    assert_relative_eq!(loaded.mirror_offset_mm.0, 3.0);

    let preset = storage.get_guide_preset().unwrap().unwrap();
    let resumed = ControlPanel::from_guides(&preset);
    assert_eq!(resumed.guides(), aligner.current_guides());
}
