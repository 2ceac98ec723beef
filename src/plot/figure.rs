use std::io::Cursor;
use std::sync::OnceLock;

use image::{ImageFormat, RgbImage};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::{FontStyle, register_font};

use super::{PlotError, PlotImage};

/// Output resolution; figure sizes are given in inches.
pub const DPI: f64 = 150.0;

/// Bundled so rendering never depends on fonts installed on the host.
static SANS_SERIF: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

static FONTS: OnceLock<Result<(), String>> = OnceLock::new();

/// Register the bundled face as `sans-serif` once per process.
fn ensure_fonts() -> Result<(), PlotError> {
    FONTS
        .get_or_init(|| {
            register_font("sans-serif", FontStyle::Normal, SANS_SERIF)
                .map_err(|_| "invalid bundled font".to_string())
        })
        .clone()
        .map_err(PlotError::Font)
}

pub type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

// ---------------------------------------------------------------------------
// Figure – one RGB pixel buffer per render
// ---------------------------------------------------------------------------

/// An owned RGB canvas. Each render call creates its own figure, so nothing
/// is shared between concurrent requests; the buffer is freed when the
/// figure is dropped, whether drawing succeeded or not.
pub struct Figure {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Figure {
    /// A white canvas of `width_in` × `height_in` inches at [`DPI`].
    pub fn new(width_in: f64, height_in: f64) -> Self {
        let width = (width_in * DPI).round().max(1.0) as u32;
        let height = (height_in * DPI).round().max(1.0) as u32;
        Self {
            width,
            height,
            pixels: vec![255; width as usize * height as usize * 3],
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Run `paint` against a fresh drawing area over this figure's pixels.
    /// The backend borrowing the buffer lives only for this call.
    pub fn draw<F>(&mut self, paint: F) -> Result<(), PlotError>
    where
        F: FnOnce(&Area<'_>) -> Result<(), PlotError>,
    {
        ensure_fonts()?;
        let root = BitMapBackend::with_buffer(&mut self.pixels, (self.width, self.height))
            .into_drawing_area();
        root.fill(&WHITE)?;
        paint(&root)?;
        root.present()?;
        Ok(())
    }

    /// Encode the canvas as PNG, consuming the figure.
    pub fn into_png(self) -> Result<PlotImage, PlotError> {
        let (width, height) = (self.width, self.height);
        let image = RgbImage::from_raw(width, height, self.pixels)
            .ok_or_else(|| PlotError::Encode("pixel buffer does not match figure size".into()))?;

        let mut out = Cursor::new(Vec::new());
        image
            .write_to(&mut out, ImageFormat::Png)
            .map_err(|e| PlotError::Encode(e.to_string()))?;

        Ok(PlotImage {
            bytes: out.into_inner(),
            width,
            height,
        })
    }
}

// ---------------------------------------------------------------------------
// Shared text sizes (pixels at 150 DPI)
// ---------------------------------------------------------------------------

pub const CAPTION_PX: u32 = 26;
pub const LABEL_PX: u32 = 20;
pub const ANNOTATION_PX: u32 = 18;
pub const MARGIN_PX: u32 = 16;

pub fn font(px: u32) -> TextStyle<'static> {
    ("sans-serif", px).into_font().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_follows_dpi() {
        assert_eq!(Figure::new(6.0, 4.0).size(), (900, 600));
        assert_eq!(Figure::new(8.0, 5.0).size(), (1200, 750));
    }

    #[test]
    fn blank_figure_encodes_as_png() {
        let mut figure = Figure::new(1.0, 1.0);
        figure.draw(|_| Ok(())).unwrap();
        let png = figure.into_png().unwrap();
        assert_eq!(&png.bytes()[..8], b"\x89PNG\r\n\x1a\n");
        assert_eq!((png.width(), png.height()), (150, 150));
    }

    #[test]
    fn failed_paint_propagates() {
        let mut figure = Figure::new(1.0, 1.0);
        let err = figure
            .draw(|_| Err(PlotError::Degenerate("boom".into())))
            .unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn text_renders_with_bundled_font() {
        let mut figure = Figure::new(2.0, 1.0);
        figure
            .draw(|root| {
                root.draw(&Text::new("Survived", (10, 10), font(LABEL_PX)))?;
                Ok(())
            })
            .unwrap();
        assert!(figure.into_png().unwrap().len() > 0);
    }
}
