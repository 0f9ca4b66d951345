//! RGB colour value and HSV conversions.

/// An RGB colour with channels in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

/// HSV colour representation
/// - h (hue): 0.0-360.0 degrees
/// - s (saturation): 0.0-1.0
/// - v (value): 0.0-1.0
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsv {
    pub h: f64,
    pub s: f64,
    pub v: f64,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0.0, 0.0, 0.0);
    pub const WHITE: Rgb = Rgb::new(1.0, 1.0, 1.0);

    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    pub fn from_u8(r: u8, g: u8, b: u8) -> Self {
        Self::new(r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0)
    }

    pub fn to_u8(self) -> [u8; 3] {
        let quantize = |c: f64| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [quantize(self.r), quantize(self.g), quantize(self.b)]
    }

    /// Linear interpolation, `t = 0` gives `self` and `t = 1` gives `other`.
    pub fn lerp(self, other: Rgb, t: f64) -> Rgb {
        Rgb::new(
            self.r + (other.r - self.r) * t,
            self.g + (other.g - self.g) * t,
            self.b + (other.b - self.b) * t,
        )
    }

    /// Euclidean distance in normalized RGB space.
    pub fn distance(self, other: Rgb) -> f64 {
        ((self.r - other.r).powi(2) + (self.g - other.g).powi(2) + (self.b - other.b).powi(2))
            .sqrt()
    }

    pub fn to_hsv(self) -> Hsv {
        let r = self.r.clamp(0.0, 1.0);
        let g = self.g.clamp(0.0, 1.0);
        let b = self.b.clamp(0.0, 1.0);

        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;

        if max <= 0.0 || delta <= f64::EPSILON {
            // achromatic, hue is meaningless
            return Hsv { h: 0.0, s: 0.0, v: max };
        }

        let s = delta / max;
        let h = if max == r {
            let h = (g - b) / delta;
            if h < 0.0 { h + 6.0 } else { h }
        } else if max == g {
            (b - r) / delta + 2.0
        } else {
            (r - g) / delta + 4.0
        };

        Hsv { h: (h * 60.0) % 360.0, s, v: max }
    }

    /// Keep hue and saturation, replace the HSV value (brightness).
    pub fn change_value(self, value: f64) -> Rgb {
        let hsv = self.to_hsv();
        Hsv { v: value, ..hsv }.to_rgb()
    }
}

impl Hsv {
    pub fn to_rgb(self) -> Rgb {
        let v = self.v.clamp(0.0, 1.0);
        let s = self.s.clamp(0.0, 1.0);
        let h = self.h.rem_euclid(360.0);

        let c = v * s;
        let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
        let m = v - c;

        let (r, g, b) = if h < 60.0 {
            (c, x, 0.0)
        } else if h < 120.0 {
            (x, c, 0.0)
        } else if h < 180.0 {
            (0.0, c, x)
        } else if h < 240.0 {
            (0.0, x, c)
        } else if h < 300.0 {
            (x, 0.0, c)
        } else {
            (c, 0.0, x)
        };

        Rgb::new(r + m, g + m, b + m)
    }
}
