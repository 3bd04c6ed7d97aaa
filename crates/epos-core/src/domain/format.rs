//! Formatting parameters attached to individual staging calls.
//!
//! Text formatting is *per call*, not job-global: every `printText` command
//! carries its own font, size and alignment.  Image parameters likewise travel
//! with each `printImage` command.
//!
//! All parameters are encoded on the wire as small integers:
//!
//! | Parameter   | Values                                                         |
//! |-------------|----------------------------------------------------------------|
//! | font        | 0 = A, 1 = B, 2 = C, 3 = D, 4 = E                              |
//! | size        | 1..=8                                                          |
//! | align       | 0 = left, 1 = center, 2 = right                                |
//! | print mode  | 0 = monochrome, 1 = 16-level gradation, 2 = mono double density |
//! | halftone    | 0 = dithering, 1 = error diffusion, 2 = threshold              |

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for out-of-range parameter codes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("font code {0} is out of range (0..=4)")]
    Font(u8),
    #[error("text size {0} is out of range (1..=8)")]
    Size(u8),
    #[error("alignment code {0} is out of range (0..=2)")]
    Align(u8),
    #[error("print mode code {0} is out of range (0..=2)")]
    PrintMode(u8),
    #[error("halftone code {0} is out of range (0..=2)")]
    HalfTone(u8),
}

// ── Text parameters ───────────────────────────────────────────────────────────

/// Printer font selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Font {
    #[default]
    A = 0,
    B = 1,
    C = 2,
    D = 3,
    E = 4,
}

impl Font {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Font {
    type Error = FormatError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Font::A),
            1 => Ok(Font::B),
            2 => Ok(Font::C),
            3 => Ok(Font::D),
            4 => Ok(Font::E),
            other => Err(FormatError::Font(other)),
        }
    }
}

/// Character magnification, 1 (normal) to 8.
///
/// The same factor is applied horizontally and vertically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct TextSize(u8);

impl TextSize {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 8;

    /// Creates a size, rejecting values outside `1..=8`.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Size`] for out-of-range values.
    pub fn new(size: u8) -> Result<Self, FormatError> {
        if (Self::MIN..=Self::MAX).contains(&size) {
            Ok(Self(size))
        } else {
            Err(FormatError::Size(size))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for TextSize {
    fn default() -> Self {
        Self(Self::MIN)
    }
}

impl TryFrom<u8> for TextSize {
    type Error = FormatError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TextSize> for u8 {
    fn from(size: TextSize) -> u8 {
        size.0
    }
}

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Alignment {
    #[default]
    Left = 0,
    Center = 1,
    Right = 2,
}

impl Alignment {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Alignment {
    type Error = FormatError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Alignment::Left),
            1 => Ok(Alignment::Center),
            2 => Ok(Alignment::Right),
            other => Err(FormatError::Align(other)),
        }
    }
}

/// Formatting for one `printText` call.
///
/// The default is font A, size 1, left aligned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TextStyle {
    pub font: Font,
    pub size: TextSize,
    pub align: Alignment,
}

impl TextStyle {
    /// Builds a style from raw wire codes.
    ///
    /// # Errors
    ///
    /// Returns the [`FormatError`] of the first out-of-range code.
    pub fn from_codes(font: u8, size: u8, align: u8) -> Result<Self, FormatError> {
        Ok(Self {
            font: Font::try_from(font)?,
            size: TextSize::new(size)?,
            align: Alignment::try_from(align)?,
        })
    }
}

// ── Image parameters ──────────────────────────────────────────────────────────

/// Colour mode used when rasterising an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum PrintMode {
    #[default]
    Monochrome = 0,
    Gradation16 = 1,
    MonochromeDoubleDensity = 2,
}

impl PrintMode {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for PrintMode {
    type Error = FormatError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PrintMode::Monochrome),
            1 => Ok(PrintMode::Gradation16),
            2 => Ok(PrintMode::MonochromeDoubleDensity),
            other => Err(FormatError::PrintMode(other)),
        }
    }
}

/// Halftone processing method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum HalfTone {
    #[default]
    Dithering = 0,
    ErrorDiffusion = 1,
    Threshold = 2,
}

impl HalfTone {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for HalfTone {
    type Error = FormatError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(HalfTone::Dithering),
            1 => Ok(HalfTone::ErrorDiffusion),
            2 => Ok(HalfTone::Threshold),
            other => Err(FormatError::HalfTone(other)),
        }
    }
}

/// Parameters for one `printImage` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageStyle {
    pub mode: PrintMode,
    pub halftone: HalfTone,
}

impl ImageStyle {
    /// Builds image parameters from raw wire codes.
    ///
    /// # Errors
    ///
    /// Returns the [`FormatError`] of the first out-of-range code.
    pub fn from_codes(mode: u8, halftone: u8) -> Result<Self, FormatError> {
        Ok(Self {
            mode: PrintMode::try_from(mode)?,
            halftone: HalfTone::try_from(halftone)?,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
