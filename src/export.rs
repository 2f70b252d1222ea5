use std::{
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use anyhow::Context;
use image::{ImageFormat, RgbImage};

use crate::canvas::Raster;

/// File name for a snapshot taken at `now`, inside `dir`.
pub fn snapshot_path(dir: &Path, now: SystemTime) -> PathBuf {
    let millis = now
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    dir.join(format!("fingertip_painting_{millis}.png"))
}

/// Writes `raster` to `path` as an 8-bit RGB PNG.
pub fn save_png(raster: &Raster, path: &Path) -> anyhow::Result<()> {
    let image = RgbImage::from_raw(raster.width(), raster.height(), raster.as_bytes().to_vec())
        .context("raster size does not match its pixel data")?;
    image
        .save_with_format(path, ImageFormat::Png)
        .with_context(|| format!("failed to write '{}'", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{fs, time::Duration};

    use super::*;
    use crate::{
        canvas::{Canvas, CanvasConfig, Rgb},
        math::vec2,
    };

    #[test]
    fn snapshot_name() {
        let now = UNIX_EPOCH + Duration::from_millis(1_700_000_000_123);
        assert_eq!(
            snapshot_path(Path::new("out"), now),
            Path::new("out/fingertip_painting_1700000000123.png")
        );
    }

    #[test]
    fn saved_png_matches_canvas() {
        let mut canvas = Canvas::new(&CanvasConfig {
            width: 64,
            height: 48,
            ..Default::default()
        });
        canvas.set_tool(Rgb::new(255, 0, 0), 3, false);
        canvas.begin_stroke(vec2(10.0, 10.0));
        canvas.continue_stroke(vec2(40.0, 30.0));

        let path = std::env::temp_dir().join(format!(
            "fingerpaint_export_test_{}.png",
            std::process::id()
        ));
        save_png(canvas.export(), &path).unwrap();
        let loaded = image::open(&path).unwrap().to_rgb8();
        fs::remove_file(&path).ok();

        assert_eq!(loaded.dimensions(), (64, 48));
        assert_eq!(loaded.as_raw().as_slice(), canvas.export().as_bytes());
    }
}
