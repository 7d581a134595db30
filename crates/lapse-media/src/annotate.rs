//! Frame resizing and text overlays.

use std::io::Cursor;
use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::draw_text_mut;

use lapse_models::encoding::MAX_FRAME_WIDTH;
use lapse_models::{LocationConfig, WeatherSnapshot};

use crate::error::{MediaError, MediaResult};

/// Translucent white used for every overlay.
pub const TEXT_COLOR: Rgba<u8> = Rgba([255, 255, 255, 225]);

/// Glyph height in pixels.
pub const TEXT_SIZE: f32 = 16.0;

const MARGIN: u32 = 10;
const RIGHT_COLUMN_OFFSET: u32 = 300;

/// `YYYY-MM-DD Weekday HH:MM:SS`
pub fn format_timestamp(local: &DateTime<Tz>) -> String {
    local.format("%Y-%m-%d %A %H:%M:%S").to_string()
}

/// Text to draw on one frame. `None` disables that overlay.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overlays {
    /// Temperature line then wind line
    pub weather: Option<(String, String)>,
    pub time: Option<String>,
    pub title: Option<String>,
}

impl Overlays {
    /// Overlay text for a frame captured at `now` under `config`'s toggles.
    pub fn for_frame(config: &LocationConfig, weather: &WeatherSnapshot, now: DateTime<Utc>) -> Self {
        Self {
            weather: config
                .overlay_weather
                .then(|| (weather.temperature_line(), weather.wind_line())),
            time: config
                .overlay_time
                .then(|| format_timestamp(&weather.local(now))),
            title: config.title_text().map(str::to_string),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.weather.is_none() && self.time.is_none() && self.title.is_none()
    }
}

/// Top-left corner of each text line for a `width` x `height` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayLayout {
    pub time: (u32, u32),
    pub temperature: (u32, u32),
    pub wind: (u32, u32),
    pub title: (u32, u32),
}

impl OverlayLayout {
    /// Positions saturate at 0 on frames smaller than the text block.
    pub fn for_size(width: u32, height: u32) -> Self {
        let right = width.saturating_sub(RIGHT_COLUMN_OFFSET);
        Self {
            time: (MARGIN, MARGIN),
            temperature: (right, height.saturating_sub(60)),
            wind: (right, height.saturating_sub(40)),
            title: (right, height.saturating_sub(20)),
        }
    }
}

/// Downscale to `max_width` preserving aspect ratio; narrower images pass through.
pub fn resize_to_width(image: DynamicImage, max_width: u32) -> DynamicImage {
    if image.width() <= max_width {
        return image;
    }

    let height = ((max_width as f64 / image.width() as f64) * image.height() as f64) as u32;
    image.resize_exact(max_width, height.max(1), FilterType::Lanczos3)
}

/// Draws overlays on captured frames.
#[derive(Clone)]
pub struct Annotator {
    font: Option<FontArc>,
}

impl Annotator {
    pub fn new(font: Option<FontArc>) -> Self {
        Self { font }
    }

    /// Load a TTF/OTF font from disk.
    pub fn from_font_file(path: impl AsRef<Path>) -> MediaResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            MediaError::font(format!("failed to read {}: {}", path.display(), e))
        })?;
        let font = FontArc::try_from_vec(bytes)
            .map_err(|e| MediaError::font(format!("invalid font {}: {}", path.display(), e)))?;
        Ok(Self::new(Some(font)))
    }

    /// Annotator for locations with every text overlay disabled.
    pub fn without_text() -> Self {
        Self::new(None)
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Resize and composite overlays. Output is always RGBA.
    ///
    /// Each overlay is drawn on its own transparent layer and alpha-blended
    /// onto the frame, so the base pixels are only touched by compositing.
    pub fn annotate(&self, image: DynamicImage, overlays: &Overlays) -> MediaResult<RgbaImage> {
        let mut frame = resize_to_width(image, MAX_FRAME_WIDTH).to_rgba8();
        if overlays.is_empty() {
            return Ok(frame);
        }

        let font = self
            .font
            .as_ref()
            .ok_or_else(|| MediaError::font("text overlays are enabled but no font is loaded"))?;
        let layout = OverlayLayout::for_size(frame.width(), frame.height());

        if let Some(time) = &overlays.time {
            self.composite(&mut frame, font, &[(layout.time, time.as_str())]);
        }
        if let Some(title) = &overlays.title {
            self.composite(&mut frame, font, &[(layout.title, title.as_str())]);
        }
        if let Some((temperature, wind)) = &overlays.weather {
            self.composite(
                &mut frame,
                font,
                &[
                    (layout.temperature, temperature.as_str()),
                    (layout.wind, wind.as_str()),
                ],
            );
        }

        Ok(frame)
    }

    fn composite(&self, frame: &mut RgbaImage, font: &FontArc, lines: &[((u32, u32), &str)]) {
        let mut layer = RgbaImage::new(frame.width(), frame.height());
        for ((x, y), text) in lines {
            draw_text_mut(
                &mut layer,
                TEXT_COLOR,
                *x as i32,
                *y as i32,
                PxScale::from(TEXT_SIZE),
                font,
                text,
            );
        }
        alpha_composite(frame, &layer);
    }
}

/// Straight-alpha "over" of `layer` onto `base`, same size.
///
/// An opaque base stays opaque; channels are rounded, not truncated.
pub fn alpha_composite(base: &mut RgbaImage, layer: &RgbaImage) {
    for (dst, src) in base.pixels_mut().zip(layer.pixels()) {
        let fg_a = src.0[3] as f32 / 255.0;
        if fg_a == 0.0 {
            continue;
        }
        let bg_a = dst.0[3] as f32 / 255.0;
        let out_a = fg_a + bg_a * (1.0 - fg_a);

        for c in 0..3 {
            let fg = src.0[c] as f32 * fg_a;
            let bg = dst.0[c] as f32 * bg_a * (1.0 - fg_a);
            dst.0[c] = ((fg + bg) / out_a).round().clamp(0.0, 255.0) as u8;
        }
        dst.0[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
    }
}

/// Encode an annotated frame as PNG.
pub fn encode_png(frame: &RgbaImage) -> MediaResult<Vec<u8>> {
    let mut bytes = Vec::new();
    frame.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use image::{GrayImage, Luma, RgbImage};

    fn fixture_font() -> Annotator {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/DejaVuSansMono-Bold.ttf");
        Annotator::from_font_file(path).unwrap()
    }

    fn weather() -> WeatherSnapshot {
        WeatherSnapshot {
            apparent_temperature_f: 70.0,
            wind_speed_mph: 12.9,
            wind_bearing_deg: 200.0,
            sunrise: Utc.with_ymd_and_hms(2024, 6, 1, 11, 52, 0).unwrap(),
            sunset: Utc.with_ymd_and_hms(2024, 6, 2, 2, 41, 0).unwrap(),
            timezone: chrono_tz::America::Denver,
        }
    }

    fn solid(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([0, 0, 0])))
    }

    #[test]
    fn test_resize_caps_width() {
        let resized = resize_to_width(solid(2560, 1440), MAX_FRAME_WIDTH);
        assert_eq!((resized.width(), resized.height()), (1280, 720));

        let small = resize_to_width(solid(640, 480), MAX_FRAME_WIDTH);
        assert_eq!((small.width(), small.height()), (640, 480));
    }

    #[test]
    fn test_output_is_rgba_without_overlays() {
        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(32, 16, Luma([128])));
        let frame = Annotator::without_text().annotate(gray, &Overlays::default()).unwrap();

        assert_eq!(frame.dimensions(), (32, 16));
        assert_eq!(frame.get_pixel(0, 0), &Rgba([128, 128, 128, 255]));
    }

    #[test]
    fn test_text_without_font_is_an_error() {
        let overlays = Overlays {
            time: Some("2024-06-01 Saturday 12:00:00".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            Annotator::without_text().annotate(solid(64, 64), &overlays),
            Err(MediaError::Font(_))
        ));
    }

    #[test]
    fn test_overlays_follow_config_toggles() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap();
        let config = LocationConfig::new("https://cam.example.com/a.jpg", 38.5, -109.5, "moab");

        let overlays = Overlays::for_frame(&config, &weather(), now);
        assert_eq!(
            overlays.weather,
            Some(("70.0° F | 21.1° C".to_string(), "12 MPH SSW".to_string()))
        );
        assert_eq!(overlays.time.as_deref(), Some("2024-06-01 Saturday 12:00:00"));
        assert_eq!(overlays.title, None);

        let titled = config.with_overlays(false, false, true).with_title("Moab, UT");
        let overlays = Overlays::for_frame(&titled, &weather(), now);
        assert_eq!(overlays.weather, None);
        assert_eq!(overlays.time, None);
        assert_eq!(overlays.title.as_deref(), Some("Moab, UT"));
    }

    #[test]
    fn test_layout_saturates_on_small_frames() {
        let layout = OverlayLayout::for_size(1280, 720);
        assert_eq!(layout.time, (10, 10));
        assert_eq!(layout.temperature, (980, 660));
        assert_eq!(layout.wind, (980, 680));
        assert_eq!(layout.title, (980, 700));

        let tiny = OverlayLayout::for_size(200, 30);
        assert_eq!(tiny.temperature, (0, 0));
        assert_eq!(tiny.title, (0, 10));
    }

    #[test]
    fn test_text_keeps_opaque_frame_opaque() {
        let overlays = Overlays {
            time: Some("2024-06-01 Saturday 12:00:00".to_string()),
            ..Default::default()
        };

        let frame = fixture_font().annotate(solid(400, 100), &overlays).unwrap();

        // glyph cores carry the full overlay colour, blended to 225 over black
        let max_red = frame.pixels().map(|p| p.0[0]).max().unwrap();
        assert!((200..=225).contains(&max_red), "max red {max_red}");
        assert!(frame.pixels().all(|p| p.0[3] == 255));
        // text lands in the top-left corner only
        assert!(frame.get_pixel(399, 99).0[0] == 0);
    }

    #[test]
    fn test_alpha_composite_blend() {
        let mut base = RgbaImage::from_pixel(3, 1, Rgba([0, 0, 0, 255]));
        let mut layer = RgbaImage::new(3, 1);
        layer.put_pixel(0, 0, TEXT_COLOR);
        layer.put_pixel(1, 0, Rgba([255, 0, 0, 128]));

        alpha_composite(&mut base, &layer);

        assert_eq!(base.get_pixel(0, 0), &Rgba([225, 225, 225, 255]));
        assert_eq!(base.get_pixel(1, 0), &Rgba([128, 0, 0, 255]));
        assert_eq!(base.get_pixel(2, 0), &Rgba([0, 0, 0, 255]));

        // over a transparent base the layer is copied as is
        let mut clear = RgbaImage::new(1, 1);
        let mut fg = RgbaImage::new(1, 1);
        fg.put_pixel(0, 0, TEXT_COLOR);
        alpha_composite(&mut clear, &fg);
        assert_eq!(clear.get_pixel(0, 0), &TEXT_COLOR);
    }

    #[test]
    fn test_weather_and_title_lines_drawn_bottom_right() {
        let overlays = Overlays {
            weather: Some(("70.0° F | 21.1° C".to_string(), "12 MPH SSW".to_string())),
            title: Some("Moab, UT".to_string()),
            ..Default::default()
        };

        let frame = fixture_font().annotate(solid(640, 360), &overlays).unwrap();

        let lit_left = (0..330).flat_map(|x| (0..360).map(move |y| (x, y)))
            .filter(|&(x, y)| frame.get_pixel(x, y).0[0] > 0)
            .count();
        let lit_right = (340..640).flat_map(|x| (290..360).map(move |y| (x, y)))
            .filter(|&(x, y)| frame.get_pixel(x, y).0[0] > 0)
            .count();
        assert_eq!(lit_left, 0);
        assert!(lit_right > 0);
    }

    #[test]
    fn test_encode_png_round_trips() {
        let frame = RgbaImage::from_pixel(8, 8, Rgba([1, 2, 3, 255]));
        let bytes = encode_png(&frame).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded, frame);
    }
}
