use std::path::PathBuf;

use storeshot::{
    BatchOptions, CaptionSource, Defaults, DeviceClass, DeviceConfig, FrameRegistry, resolve,
    run_batch,
};

struct TempDirGuard(PathBuf);

impl TempDirGuard {
    fn new(label: &str) -> Self {
        let path = std::env::temp_dir().join(format!(
            "storeshot_{label}_{}_{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0)
        ));
        std::fs::create_dir_all(&path).unwrap();
        Self(path)
    }
}

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

fn write_png(path: &std::path::Path, w: u32, h: u32) {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba([50, 100, 150, 255]));
    img.save_with_format(path, image::ImageFormat::Png).unwrap();
}

fn device_config(input_dir: PathBuf) -> DeviceConfig {
    DeviceConfig {
        input_dir,
        class: DeviceClass::Phone,
        output_width: 200,
        output_height: 420,
        frame: None,
        auto_frame: None,
        frame_position: None,
        frame_scale: None,
        partial_frame: None,
        corner_radius: None,
        caption: None,
        background: None,
    }
}

fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[test]
fn batch_processes_in_sorted_order_and_survives_corrupt_input() {
    init_logging();
    let input = TempDirGuard::new("in");
    let output = TempDirGuard::new("out");

    write_png(&input.0.join("02-detail.png"), 129, 280);
    write_png(&input.0.join("01-home.png"), 129, 280);
    // Corrupt screenshot: per-item fatal, caught at the batch boundary.
    std::fs::write(input.0.join("03-broken.png"), b"not a png").unwrap();
    // Background image by naming convention is not a batch input.
    write_png(&input.0.join("background.png"), 10, 10);
    // Non-image files are ignored.
    std::fs::write(input.0.join("notes.txt"), b"ignore me").unwrap();

    let registry = FrameRegistry::builtin();
    let config = resolve(&Defaults::default(), &device_config(input.0.clone())).unwrap();
    let opts = BatchOptions {
        concurrency: 2,
        output_dir: output.0.clone(),
        frames_dir: None,
        preview: false,
    };

    let (outcomes, stats) =
        run_batch(&registry, &config, &CaptionSource::Uniform("Hello".into()), &opts).unwrap();

    assert_eq!(stats.total, 3);
    assert_eq!(stats.succeeded, 2);
    assert_eq!(stats.failed, 1);

    // Records come back in filename-sorted input order.
    let names: Vec<_> = outcomes
        .iter()
        .map(|o| o.input.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["01-home.png", "02-detail.png", "03-broken.png"]);

    assert!(outcomes[0].succeeded());
    assert!(outcomes[1].succeeded());
    assert!(!outcomes[2].succeeded());
    assert!(outcomes[2].error.is_some());

    // Successful outputs exist and decode at the configured resolution.
    for outcome in &outcomes[..2] {
        let out_path = outcome.output.as_ref().unwrap();
        let img = image::open(out_path).unwrap();
        assert_eq!(img.width(), 200);
        assert_eq!(img.height(), 420);
        assert!(outcome.frame_used.is_some());
    }
    assert!(!output.0.join("03-broken.png").exists());
    assert!(!output.0.join("background.png").exists());
}

#[test]
fn empty_input_dir_yields_empty_batch() {
    let input = TempDirGuard::new("empty_in");
    let output = TempDirGuard::new("empty_out");

    let registry = FrameRegistry::builtin();
    let config = resolve(&Defaults::default(), &device_config(input.0.clone())).unwrap();
    let opts = BatchOptions {
        concurrency: 4,
        output_dir: output.0.clone(),
        frames_dir: None,
        preview: false,
    };

    let (outcomes, stats) = run_batch(&registry, &config, &CaptionSource::None, &opts).unwrap();
    assert!(outcomes.is_empty());
    assert_eq!(stats, storeshot::BatchStats::default());
}

#[test]
fn preview_batch_downsamples_outputs() {
    let input = TempDirGuard::new("prev_in");
    let output = TempDirGuard::new("prev_out");

    write_png(&input.0.join("shot.png"), 129, 280);

    let registry = FrameRegistry::builtin();
    let mut device = device_config(input.0.clone());
    device.output_width = 1290;
    device.output_height = 2796;
    let config = resolve(&Defaults::default(), &device).unwrap();
    let opts = BatchOptions {
        concurrency: 1,
        output_dir: output.0.clone(),
        frames_dir: None,
        preview: true,
    };

    let (outcomes, stats) = run_batch(&registry, &config, &CaptionSource::None, &opts).unwrap();
    assert_eq!(stats.succeeded, 1);
    let img = image::open(outcomes[0].output.as_ref().unwrap()).unwrap();
    assert_eq!(img.height(), 640);
    assert!(img.width() < 640);
}
