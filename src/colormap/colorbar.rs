use image::{ImageBuffer, Rgb as Pixel, RgbImage};

use super::{Colormap, InterpolationMode};
use crate::range::Range;

impl Colormap {
    /// The values labelling the ends of a colour bar: the control points
    /// span the focus window in linear mode and the whole bar otherwise.
    pub fn colorbar_boundaries(&self, bar_range: Range, focus_range: Range) -> Range {
        match self.interpolation_mode {
            InterpolationMode::Linear => focus_range,
            InterpolationMode::Constant => bar_range,
        }
    }

    /// Render the colour function over `bar_range` as a horizontal bar,
    /// one column per sample.
    pub fn render_colorbar(
        &self,
        bar_range: Range,
        focus_range: Range,
        width: u32,
        height: u32,
    ) -> Option<RgbImage> {
        let colors = self
            .compute_color_function(bar_range, focus_range)
            .sample_over(bar_range, width as usize);
        let columns: Vec<[u8; 3]> = colors.into_iter().map(|color| color.to_u8()).collect();
        if columns.len() != width as usize {
            return None;
        }
        Some(ImageBuffer::from_fn(width, height, |x, _| {
            Pixel(columns[x as usize])
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;

    #[test]
    fn grayscale_bar_goes_from_black_to_white() {
        let bar = Colormap::new()
            .render_colorbar(Range::new(0.0, 255.0), Range::new(0.0, 255.0), 256, 4)
            .unwrap();

        assert_eq!(bar.dimensions(), (256, 4));
        assert_eq!(bar.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(bar.get_pixel(255, 3).0, [255, 255, 255]);
        assert_eq!(bar.get_pixel(128, 2).0, [128, 128, 128]);
    }

    #[test]
    fn boundaries_follow_interpolation_mode() {
        let bar = Range::new(-1000.0, 1000.0);
        let focus = Range::new(-100.0, 100.0);
        let mut colormap = Colormap::new();
        colormap.add_color(0.0, Rgb::WHITE);

        assert_eq!(colormap.colorbar_boundaries(bar, focus), focus);
        colormap.set_interpolation_mode(InterpolationMode::Constant);
        assert_eq!(colormap.colorbar_boundaries(bar, focus), bar);
    }
}
