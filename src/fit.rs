/// Aspect-preserving placement of a raster inside a target box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageFit {
    pub scale: f64,
    pub render_width: f64,
    pub render_height: f64,
    pub x_offset: f64,
    pub y_offset: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot fit a {width}x{height} raster: intrinsic size must be non-zero")]
pub struct FitError {
    pub width: u32,
    pub height: u32,
}

impl ImageFit {
    /// Largest uniform scale that keeps the raster inside `target_width` x
    /// `target_height`, centered on both axes.
    pub fn resolve(
        target_width: f64,
        target_height: f64,
        intrinsic_width: u32,
        intrinsic_height: u32,
    ) -> Result<ImageFit, FitError> {
        if intrinsic_width == 0 || intrinsic_height == 0 {
            return Err(FitError {
                width: intrinsic_width,
                height: intrinsic_height,
            });
        }
        let iw = f64::from(intrinsic_width);
        let ih = f64::from(intrinsic_height);
        let scale = (target_width / iw).min(target_height / ih);
        let render_width = iw * scale;
        let render_height = ih * scale;
        Ok(ImageFit {
            scale,
            render_width,
            render_height,
            x_offset: (target_width - render_width) / 2.0,
            y_offset: (target_height - render_height) / 2.0,
        })
    }
}
