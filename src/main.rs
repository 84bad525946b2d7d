use std::sync::Arc;

use ct_viewport::{
    RenderPipeline, ViewerSettings, Volume, WindowLevel,
    volume_loader::{VolumeCache, VolumeSource},
};
use glam::DVec2;
use ndarray::Array3;

/// Water cylinder with a denser core, in Hounsfield units, on air.
fn phantom() -> Volume {
    let (depth, height, width) = (64, 256, 256);
    let data = Array3::from_shape_fn((depth, height, width), |(_, y, x)| {
        let dx = x as f64 - width as f64 / 2.0;
        let dy = y as f64 - height as f64 / 2.0;
        let r = (dx * dx + dy * dy).sqrt();
        if r < 30.0 {
            700
        } else if r < 100.0 {
            0
        } else {
            -1000
        }
    });
    Volume::from_array(&data)
        .expect("should have built phantom")
        .with_spacing((0.8, 0.8, 2.0))
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::init();

    let mut cache = VolumeCache::new();
    cache.insert("phantom", "CT", phantom());
    let volume = cache
        .load_volume("phantom", "CT")
        .expect("should have found phantom");

    let mut pipeline =
        RenderPipeline::new(&ViewerSettings::default()).expect("should have valid settings");
    pipeline.resize(DVec2::new(512.0, 512.0));
    pipeline.set_window(WindowLevel::new(400.0, 40.0));
    pipeline.set_volume(Some(Arc::clone(&volume)));
    pipeline.zoom_at(5.0, DVec2::new(300.0, 260.0));

    let frame = pipeline
        .refresh()
        .await
        .expect("should have rendered a slice");
    log::info!("{}", frame.info_text);
    frame
        .pixels
        .to_rgba_image()
        .expect("should have converted frame")
        .save("result.png")
        .expect("should have saved result.png");
}
