use std::{fmt, str::FromStr};

use crate::foundation::error::{BoothError, BoothResult};

pub use kurbo::{Affine, Rect};

/// Opaque RGB8 color.
///
/// Serialized as a `#rrggbb` string. Parsing also accepts `#rgb` shorthand and the named entries
/// of [`Rgb8::PALETTE`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb8 {
    pub const WHITE: Self = Self::new(0xff, 0xff, 0xff);
    pub const BLUSH: Self = Self::new(0xf8, 0xe8, 0xe8);
    pub const MINT: Self = Self::new(0xe8, 0xf8, 0xf8);
    pub const LEMON: Self = Self::new(0xf8, 0xf8, 0xe8);
    pub const LAVENDER: Self = Self::new(0xe8, 0xe8, 0xf8);
    pub const BLACK: Self = Self::new(0x22, 0x22, 0x22);

    /// Named frame colors offered by the booth.
    pub const PALETTE: [(&'static str, Self); 6] = [
        ("white", Self::WHITE),
        ("blush", Self::BLUSH),
        ("mint", Self::MINT),
        ("lemon", Self::LEMON),
        ("lavender", Self::LAVENDER),
        ("black", Self::BLACK),
    ];

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn palette_name(self) -> Option<&'static str> {
        Self::PALETTE
            .iter()
            .find(|(_, c)| *c == self)
            .map(|(name, _)| *name)
    }
}

impl Default for Rgb8 {
    fn default() -> Self {
        Self::WHITE
    }
}

impl fmt::Display for Rgb8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Rgb8 {
    type Err = BoothError;

    fn from_str(s: &str) -> BoothResult<Self> {
        let s = s.trim();
        let lower = s.to_ascii_lowercase();
        if let Some((_, c)) = Self::PALETTE.iter().find(|(name, _)| *name == lower) {
            return Ok(*c);
        }

        let Some(hex) = lower.strip_prefix('#') else {
            return Err(BoothError::validation(format!(
                "unknown color '{s}' (expected a palette name or #rgb/#rrggbb)"
            )));
        };
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(BoothError::validation(format!(
                "color '{s}' has non-hex digits"
            )));
        }

        let channel = |digits: &str| -> BoothResult<u8> {
            u8::from_str_radix(digits, 16)
                .map_err(|_| BoothError::validation(format!("invalid color channel in '{s}'")))
        };

        match hex.len() {
            3 => {
                let expand = |i: usize| channel(&hex[i..i + 1].repeat(2));
                Ok(Self::new(expand(0)?, expand(1)?, expand(2)?))
            }
            6 => Ok(Self::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            _ => Err(BoothError::validation(format!(
                "color '{s}' must be #rgb or #rrggbb"
            ))),
        }
    }
}

impl TryFrom<String> for Rgb8 {
    type Error = BoothError;

    fn try_from(value: String) -> BoothResult<Self> {
        value.parse()
    }
}

impl From<Rgb8> for String {
    fn from(value: Rgb8) -> Self {
        value.to_hex()
    }
}

/// Capture mode: one photo, or a three-photo strip.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    Single,
    #[default]
    Strip,
}

impl CaptureMode {
    pub fn shots_required(self) -> usize {
        match self {
            Self::Single => 1,
            Self::Strip => 3,
        }
    }

    pub fn from_shot_count(n: usize) -> BoothResult<Self> {
        match n {
            1 => Ok(Self::Single),
            3 => Ok(Self::Strip),
            _ => Err(BoothError::validation(format!(
                "a composition takes 1 or 3 frames, got {n}"
            ))),
        }
    }

    /// File stem used for exported images in this mode.
    pub fn file_stem(self) -> &'static str {
        match self {
            Self::Single => "photo",
            Self::Strip => "photobooth-strip",
        }
    }
}

impl FromStr for CaptureMode {
    type Err = BoothError;

    fn from_str(s: &str) -> BoothResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" | "photo" | "regular" => Ok(Self::Single),
            "strip" | "photobooth" => Ok(Self::Strip),
            other => Err(BoothError::validation(format!(
                "unknown capture mode '{other}'"
            ))),
        }
    }
}

/// Raster format of an exported image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    #[serde(alias = "jpeg")]
    Jpg,
    Png,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpg => "jpg",
            Self::Png => "png",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            Self::Jpg => "image/jpeg",
            Self::Png => "image/png",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = BoothError;

    fn from_str(s: &str) -> BoothResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(Self::Jpg),
            "png" => Ok(Self::Png),
            other => Err(BoothError::validation(format!(
                "unknown output format '{other}' (expected jpg or png)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_palette_names_and_hex_forms() {
        assert_eq!("Blush".parse::<Rgb8>().unwrap(), Rgb8::BLUSH);
        assert_eq!("#fff".parse::<Rgb8>().unwrap(), Rgb8::WHITE);
        assert_eq!("#222".parse::<Rgb8>().unwrap(), Rgb8::BLACK);
        assert_eq!("#E8F8F8".parse::<Rgb8>().unwrap(), Rgb8::MINT);
        assert_eq!(Rgb8::MINT.palette_name(), Some("mint"));
    }

    #[test]
    fn rejects_malformed_colors() {
        assert!("fff".parse::<Rgb8>().is_err());
        assert!("#ffff".parse::<Rgb8>().is_err());
        assert!("#gggggg".parse::<Rgb8>().is_err());
        assert!("teal".parse::<Rgb8>().is_err());
    }

    #[test]
    fn color_serializes_as_hex_string() {
        let json = serde_json::to_string(&Rgb8::LEMON).unwrap();
        assert_eq!(json, "\"#f8f8e8\"");
        let back: Rgb8 = serde_json::from_str("\"lavender\"").unwrap();
        assert_eq!(back, Rgb8::LAVENDER);
    }

    #[test]
    fn mode_and_format_names() {
        assert_eq!(CaptureMode::Strip.shots_required(), 3);
        assert_eq!(CaptureMode::Single.file_stem(), "photo");
        assert!(CaptureMode::from_shot_count(2).is_err());
        assert_eq!("JPEG".parse::<OutputFormat>().unwrap(), OutputFormat::Jpg);
        assert_eq!(OutputFormat::Png.mime(), "image/png");
    }
}
