use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Scribble-strip colors of the mixing console.
///
/// Serialized by name. [`code`](Self::code) is the console's numeric color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WingColor {
    GrayBlue,
    MediumBlue,
    DarkBlue,
    Turquoise,
    Green,
    OliveGreen,
    Yellow,
    Orange,
    Red,
    Coral,
    Pink,
    Mauve,
}

impl WingColor {
    /// All colors, in console order.
    pub const ALL: [WingColor; 12] = [
        WingColor::GrayBlue,
        WingColor::MediumBlue,
        WingColor::DarkBlue,
        WingColor::Turquoise,
        WingColor::Green,
        WingColor::OliveGreen,
        WingColor::Yellow,
        WingColor::Orange,
        WingColor::Red,
        WingColor::Coral,
        WingColor::Pink,
        WingColor::Mauve,
    ];

    /// Console color code, `1..=12`.
    pub fn code(self) -> u8 {
        match self {
            WingColor::GrayBlue => 1,
            WingColor::MediumBlue => 2,
            WingColor::DarkBlue => 3,
            WingColor::Turquoise => 4,
            WingColor::Green => 5,
            WingColor::OliveGreen => 6,
            WingColor::Yellow => 7,
            WingColor::Orange => 8,
            WingColor::Red => 9,
            WingColor::Coral => 10,
            WingColor::Pink => 11,
            WingColor::Mauve => 12,
        }
    }

    /// Display color as `0xRRGGBB`.
    pub fn rgb(self) -> u32 {
        match self {
            WingColor::GrayBlue => 0x9FE0EA,
            WingColor::MediumBlue => 0x0BF1FB,
            WingColor::DarkBlue => 0x28B6E8,
            WingColor::Turquoise => 0x00FBEE,
            WingColor::Green => 0x00EE4D,
            WingColor::OliveGreen => 0xC6DC52,
            WingColor::Yellow => 0xFFEF3D,
            WingColor::Orange => 0xFF8D3D,
            WingColor::Red => 0xFF3933,
            WingColor::Coral => 0xFF916B,
            WingColor::Pink => 0xFDA5F6,
            WingColor::Mauve => 0x9F92FA,
        }
    }

    /// Display color as `#RRGGBB`.
    pub fn hex(self) -> String {
        format!("#{:06X}", self.rgb())
    }

    pub fn name(self) -> &'static str {
        match self {
            WingColor::GrayBlue => "Gray Blue",
            WingColor::MediumBlue => "Medium Blue",
            WingColor::DarkBlue => "Dark Blue",
            WingColor::Turquoise => "Turquoise",
            WingColor::Green => "Green",
            WingColor::OliveGreen => "Olive Green",
            WingColor::Yellow => "Yellow",
            WingColor::Orange => "Orange",
            WingColor::Red => "Red",
            WingColor::Coral => "Coral",
            WingColor::Pink => "Pink",
            WingColor::Mauve => "Mauve",
        }
    }
}

impl TryFrom<u8> for WingColor {
    type Error = ModelError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        code.checked_sub(1)
            .and_then(|index| WingColor::ALL.get(usize::from(index)).copied())
            .ok_or(ModelError::ColorOutOfRange(code))
    }
}

impl fmt::Display for WingColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
