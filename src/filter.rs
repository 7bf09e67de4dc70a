use std::{fmt, str::FromStr};

use crate::foundation::error::{BoothError, BoothResult};

/// Named visual treatment applied to every photo of a composition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterSpec {
    #[default]
    Normal,
    Monochrome,
    SepiaTone,
    Polaroid,
    #[serde(alias = "disposable")]
    Film,
    #[serde(alias = "faded")]
    OldPhoto,
}

impl FilterSpec {
    pub const ALL: [Self; 6] = [
        Self::Normal,
        Self::Monochrome,
        Self::SepiaTone,
        Self::Polaroid,
        Self::Film,
        Self::OldPhoto,
    ];

    /// Display name shown in filter pickers.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Monochrome => "Monochrome",
            Self::SepiaTone => "Sepia Tone",
            Self::Polaroid => "Polaroid",
            Self::Film => "Disposable / Film",
            Self::OldPhoto => "Old Photo",
        }
    }

    /// Export-time definition of this filter.
    pub fn pipeline(self) -> FilterPipeline {
        use ColorOp::*;

        match self {
            Self::Normal => FilterPipeline::default(),
            Self::Monochrome => FilterPipeline {
                color: vec![Grayscale(1.0), Contrast(1.3), Brightness(1.1)],
                overlays: vec![],
            },
            Self::SepiaTone => FilterPipeline {
                color: vec![Sepia(1.0), Contrast(1.15), Brightness(1.05)],
                overlays: vec![],
            },
            Self::Polaroid => FilterPipeline {
                color: vec![Contrast(1.1), Brightness(1.05), Saturate(1.1)],
                overlays: vec![Overlay::Border {
                    rgb: [255, 255, 255],
                    side: 12.0 / 360.0,
                    bottom: 32.0 / 270.0,
                }],
            },
            Self::Film => FilterPipeline {
                color: vec![
                    Contrast(1.2),
                    Brightness(1.08),
                    Saturate(1.2),
                    Sepia(0.18),
                    HueRotate(-8.0),
                ],
                overlays: vec![
                    Overlay::Vignette {
                        rgb: [0, 0, 0],
                        blend: Blend::Multiply,
                        start: 0.5,
                        max_alpha: 0.28,
                    },
                    Overlay::Grain {
                        opacity: 0.25,
                        cell: 1.0 / 300.0,
                        seed: GRAIN_SEED,
                    },
                    Overlay::Tint {
                        rgb: [255, 200, 180],
                        alpha: 0.05,
                        blend: Blend::SoftLight,
                    },
                ],
            },
            Self::OldPhoto => FilterPipeline {
                color: vec![Contrast(0.85), Brightness(1.08), Sepia(0.25), Saturate(0.8)],
                overlays: vec![Overlay::Vignette {
                    rgb: [255, 255, 255],
                    blend: Blend::Normal,
                    start: 0.6,
                    max_alpha: 0.35,
                }],
            },
        }
    }
}

const GRAIN_SEED: u64 = 0x5EED_F11A;

impl fmt::Display for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for FilterSpec {
    type Err = BoothError;

    fn from_str(s: &str) -> BoothResult<Self> {
        let key: String = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        if key.is_empty() {
            return Err(BoothError::validation("filter name must be non-empty"));
        }

        match key.as_str() {
            "normal" | "none" => Ok(Self::Normal),
            "monochrome" | "mono" | "grayscale" | "greyscale" => Ok(Self::Monochrome),
            "sepiatone" | "sepia" => Ok(Self::SepiaTone),
            "polaroid" => Ok(Self::Polaroid),
            "film" | "disposable" | "disposablefilm" => Ok(Self::Film),
            "oldphoto" | "faded" => Ok(Self::OldPhoto),
            _ => Err(BoothError::validation(format!("unknown filter '{}'", s.trim()))),
        }
    }
}

/// Per-pixel color operation, CSS filter semantics on straight RGB in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ColorOp {
    Grayscale(f32),
    Sepia(f32),
    Saturate(f32),
    /// Degrees.
    HueRotate(f32),
    Contrast(f32),
    Brightness(f32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Blend {
    Normal,
    Multiply,
    SoftLight,
}

/// Frame-relative overlay composited after the color operations.
///
/// All lengths are fractions of the frame's own width/height so overlays scale with the frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Overlay {
    /// Solid border; `side` is a fraction of the width (left, right, top), `bottom` of the height.
    Border { rgb: [u8; 3], side: f32, bottom: f32 },
    /// Radial ramp on the farthest-corner ellipse from `start` (alpha 0) to 1.0 (`max_alpha`).
    Vignette {
        rgb: [u8; 3],
        blend: Blend,
        start: f32,
        max_alpha: f32,
    },
    /// Hash-noise grain with overlay blending; `cell` is a fraction of the longer frame side.
    Grain { opacity: f32, cell: f32, seed: u64 },
    Tint { rgb: [u8; 3], alpha: f32, blend: Blend },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterPipeline {
    pub color: Vec<ColorOp>,
    pub overlays: Vec<Overlay>,
}

impl FilterPipeline {
    pub fn is_identity(&self) -> bool {
        self.color.is_empty() && self.overlays.is_empty()
    }

    /// Fold the color operations into a single 3x4 affine color matrix.
    ///
    /// Valid only when no intermediate clamping would occur; the CPU path applies ops one by one
    /// and uses this for diagnostics and tests.
    pub fn color_matrix(&self) -> ColorMatrix {
        self.color
            .iter()
            .fold(ColorMatrix::IDENTITY, |acc, op| op.matrix().then(&acc))
    }
}

/// Row-major 3x4 affine color matrix: `out = M[..3] * rgb + M[3]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorMatrix(pub [[f32; 4]; 3]);

impl ColorMatrix {
    pub const IDENTITY: Self = Self([
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
    ]);

    pub fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        let m = &self.0;
        let mut out = [0.0f32; 3];
        for (i, row) in m.iter().enumerate() {
            out[i] = row[0] * rgb[0] + row[1] * rgb[1] + row[2] * rgb[2] + row[3];
        }
        out
    }

    /// `self` applied after `first`.
    pub fn then(&self, first: &Self) -> Self {
        let a = &self.0;
        let b = &first.0;
        let mut out = [[0.0f32; 4]; 3];
        for i in 0..3 {
            for j in 0..4 {
                let mut v = a[i][0] * b[0][j] + a[i][1] * b[1][j] + a[i][2] * b[2][j];
                if j == 3 {
                    v += a[i][3];
                }
                out[i][j] = v;
            }
        }
        Self(out)
    }
}

impl ColorOp {
    pub fn matrix(self) -> ColorMatrix {
        match self {
            Self::Grayscale(amount) => {
                let a = 1.0 - amount.clamp(0.0, 1.0);
                ColorMatrix([
                    [0.2126 + 0.7874 * a, 0.7152 - 0.7152 * a, 0.0722 - 0.0722 * a, 0.0],
                    [0.2126 - 0.2126 * a, 0.7152 + 0.2848 * a, 0.0722 - 0.0722 * a, 0.0],
                    [0.2126 - 0.2126 * a, 0.7152 - 0.7152 * a, 0.0722 + 0.9278 * a, 0.0],
                ])
            }
            Self::Sepia(amount) => {
                let a = 1.0 - amount.clamp(0.0, 1.0);
                ColorMatrix([
                    [0.393 + 0.607 * a, 0.769 - 0.769 * a, 0.189 - 0.189 * a, 0.0],
                    [0.349 - 0.349 * a, 0.686 + 0.314 * a, 0.168 - 0.168 * a, 0.0],
                    [0.272 - 0.272 * a, 0.534 - 0.534 * a, 0.131 + 0.869 * a, 0.0],
                ])
            }
            Self::Saturate(s) => {
                let s = s.max(0.0);
                ColorMatrix([
                    [0.213 + 0.787 * s, 0.715 - 0.715 * s, 0.072 - 0.072 * s, 0.0],
                    [0.213 - 0.213 * s, 0.715 + 0.285 * s, 0.072 - 0.072 * s, 0.0],
                    [0.213 - 0.213 * s, 0.715 - 0.715 * s, 0.072 + 0.928 * s, 0.0],
                ])
            }
            Self::HueRotate(deg) => {
                let (sin, cos) = deg.to_radians().sin_cos();
                ColorMatrix([
                    [
                        0.213 + cos * 0.787 - sin * 0.213,
                        0.715 - cos * 0.715 - sin * 0.715,
                        0.072 - cos * 0.072 + sin * 0.928,
                        0.0,
                    ],
                    [
                        0.213 - cos * 0.213 + sin * 0.143,
                        0.715 + cos * 0.285 + sin * 0.140,
                        0.072 - cos * 0.072 - sin * 0.283,
                        0.0,
                    ],
                    [
                        0.213 - cos * 0.213 - sin * 0.787,
                        0.715 - cos * 0.715 + sin * 0.715,
                        0.072 + cos * 0.928 + sin * 0.072,
                        0.0,
                    ],
                ])
            }
            Self::Contrast(c) => {
                let c = c.max(0.0);
                let off = 0.5 - 0.5 * c;
                ColorMatrix([[c, 0.0, 0.0, off], [0.0, c, 0.0, off], [0.0, 0.0, c, off]])
            }
            Self::Brightness(b) => {
                let b = b.max(0.0);
                ColorMatrix([[b, 0.0, 0.0, 0.0], [0.0, b, 0.0, 0.0], [0.0, 0.0, b, 0.0]])
            }
        }
    }
}
