/// Display adapter: panel geometry, pixel packing and the flush seam.
///
/// The panel is addressed in its native frame (landscape, `width × height`).
/// Every flush is a tight rectangle of 16-bit pixels in the configured
/// colour order.

use crate::config::DisplayConfig;
use crate::error::{CoreError, Result};

/// Smallest native panel that holds the rotated, doubled 28×36 field.
pub const MIN_WIDTH: u16 = 2 * (36 * 8 + 16);
pub const MIN_HEIGHT: u16 = 2 * (28 * 8 + 16);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ColorOrder {
    Rgb,
    Bgr,
}

impl ColorOrder {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "rgb" => Ok(ColorOrder::Rgb),
            "bgr" => Ok(ColorOrder::Bgr),
            _ => Err(CoreError::UnsupportedColorSpace(s.to_string())),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DisplaySpec {
    pub width: u16,
    pub height: u16,
    pub bits_per_pixel: u8,
    pub order: ColorOrder,
}

impl DisplaySpec {
    /// Validate the configured panel. Anything the compositor cannot
    /// drive is rejected here, before the loop starts.
    pub fn from_config(cfg: &DisplayConfig) -> Result<Self> {
        if cfg.bits_per_pixel != 16 && cfg.bits_per_pixel != 18 {
            return Err(CoreError::UnsupportedPixelWidth(cfg.bits_per_pixel));
        }
        let order = ColorOrder::parse(&cfg.color_order)?;
        if cfg.width < MIN_WIDTH || cfg.height < MIN_HEIGHT {
            return Err(CoreError::Config(format!(
                "panel {}x{} is smaller than {}x{}",
                cfg.width, cfg.height, MIN_WIDTH, MIN_HEIGHT
            )));
        }
        Ok(DisplaySpec { width: cfg.width, height: cfg.height, bits_per_pixel: cfg.bits_per_pixel, order })
    }

    pub fn pack(&self, (r, g, b): (u8, u8, u8)) -> u16 {
        match self.order {
            ColorOrder::Rgb => pack_rgb565(r, g, b),
            ColorOrder::Bgr => pack_bgr565(r, g, b),
        }
    }

    /// Inverse of `pack`, widened back to 8 bits per channel.
    pub fn unpack(&self, px: u16) -> (u8, u8, u8) {
        let hi5 = ((px >> 11) & 0x1F) as u8;
        let mid5 = ((px >> 6) & 0x1F) as u8;
        let mid6 = ((px >> 5) & 0x3F) as u8;
        let lo5 = (px & 0x1F) as u8;
        let lo6 = (px & 0x3F) as u8;
        match self.order {
            ColorOrder::Rgb => (hi5 << 3, mid6 << 2, lo5 << 3),
            ColorOrder::Bgr => (mid5 << 3, lo6 << 2, hi5 << 3),
        }
    }
}

pub fn pack_rgb565(r: u8, g: u8, b: u8) -> u16 {
    ((r as u16 & 0xF8) << 8) | ((g as u16 & 0xFC) << 3) | (b as u16 >> 3)
}

pub fn pack_bgr565(r: u8, g: u8, b: u8) -> u16 {
    ((b as u16 & 0xF8) << 8) | ((r as u16 & 0xF8) << 3) | (g as u16 >> 2)
}

/// Platform display output.
pub trait DisplaySink {
    /// Write `pixels` (row-major, `(x1 − x0) × (y1 − y0)`) into the
    /// native rectangle `[x0, x1) × [y0, y1)`.
    fn flush(&mut self, x0: u16, y0: u16, x1: u16, y1: u16, pixels: &[u16]) -> Result<()>;
}

// ── Panel memory ──

/// A native-frame framebuffer. Flushes are clipped to the panel.
pub struct PanelMemory {
    pub width: u16,
    pub height: u16,
    pixels: Vec<u16>,
}

impl PanelMemory {
    pub fn new(width: u16, height: u16) -> Self {
        PanelMemory { width, height, pixels: vec![0; width as usize * height as usize] }
    }

    pub fn get(&self, x: u16, y: u16) -> u16 {
        if x < self.width && y < self.height {
            self.pixels[y as usize * self.width as usize + x as usize]
        } else {
            0
        }
    }

    pub fn fill_rect(&mut self, x0: u16, y0: u16, w: u16, h: u16, color: u16) {
        for y in y0..y0.saturating_add(h).min(self.height) {
            for x in x0..x0.saturating_add(w).min(self.width) {
                self.pixels[y as usize * self.width as usize + x as usize] = color;
            }
        }
    }
}

impl DisplaySink for PanelMemory {
    fn flush(&mut self, x0: u16, y0: u16, x1: u16, y1: u16, pixels: &[u16]) -> Result<()> {
        let w = x1.saturating_sub(x0) as usize;
        let h = y1.saturating_sub(y0) as usize;
        if pixels.len() != w * h {
            return Err(CoreError::Config(format!(
                "flush of {}x{} got {} pixels",
                w, h, pixels.len()
            )));
        }
        for (row, line) in pixels.chunks(w.max(1)).enumerate().take(h) {
            let y = y0 as usize + row;
            if y >= self.height as usize {
                break;
            }
            for (col, &px) in line.iter().enumerate() {
                let x = x0 as usize + col;
                if x < self.width as usize {
                    self.pixels[y * self.width as usize + x] = px;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(bpp: u8, order: &str) -> DisplayConfig {
        DisplayConfig { width: 800, height: 480, bits_per_pixel: bpp, color_order: order.into() }
    }

    #[test]
    fn accepts_supported_panels() {
        assert_eq!(DisplaySpec::from_config(&cfg(16, "rgb")).unwrap().order, ColorOrder::Rgb);
        assert_eq!(DisplaySpec::from_config(&cfg(18, "BGR")).unwrap().order, ColorOrder::Bgr);
    }

    #[test]
    fn rejects_unsupported_panels() {
        assert!(matches!(
            DisplaySpec::from_config(&cfg(24, "rgb")),
            Err(CoreError::UnsupportedPixelWidth(24))
        ));
        assert!(matches!(
            DisplaySpec::from_config(&cfg(16, "yuv")),
            Err(CoreError::UnsupportedColorSpace(_))
        ));
        let mut small = cfg(16, "rgb");
        small.height = 320;
        assert!(matches!(DisplaySpec::from_config(&small), Err(CoreError::Config(_))));
    }

    #[test]
    fn packing_per_order() {
        assert_eq!(pack_rgb565(255, 0, 0), 0xF800);
        assert_eq!(pack_rgb565(0, 255, 0), 0x07E0);
        assert_eq!(pack_rgb565(0, 0, 255), 0x001F);
        assert_eq!(pack_bgr565(0, 0, 255), 0xF800);
        assert_eq!(pack_bgr565(255, 0, 0), 0x07C0);
        assert_eq!(pack_bgr565(0, 255, 0), 0x003F);
    }

    #[test]
    fn unpack_inverts_pack() {
        for order in ["rgb", "bgr"] {
            let spec = DisplaySpec::from_config(&cfg(16, order)).unwrap();
            for rgb in [(255, 0, 0), (0, 255, 0), (0, 0, 255), (222, 151, 81)] {
                let (r, g, b) = spec.unpack(spec.pack(rgb));
                assert_eq!((r, g, b), (rgb.0 & 0xF8, rgb.1 & 0xFC, rgb.2 & 0xF8), "{order}");
            }
        }
    }

    #[test]
    fn flush_is_clipped_and_checked() {
        let mut mem = PanelMemory::new(20, 10);
        mem.flush(16, 8, 24, 12, &[7; 32]).unwrap();
        assert_eq!(mem.get(19, 9), 7);
        assert_eq!(mem.get(15, 9), 0);
        assert!(mem.flush(0, 0, 4, 4, &[1; 15]).is_err());
    }
}
