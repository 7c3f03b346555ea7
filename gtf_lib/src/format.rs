//! RSX texture format codes and the per-format lookup tables shared by the
//! layout planner and the byte mover.
use bilge::prelude::*;
use binrw::{BinRead, BinWrite};

/// Base texture format codes used by the RSX.
///
/// The serialized format byte also carries [TextureFormat::LINEAR] and
/// [TextureFormat::UNNORMALIZED] above these values.
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[derive(Debug, BinRead, BinWrite, PartialEq, Eq, Clone, Copy)]
#[brw(repr(u8))]
pub enum BaseFormat {
    B8 = 0x81,
    A1R5G5B5 = 0x82,
    A4R4G4B4 = 0x83,
    R5G6B5 = 0x84,
    A8R8G8B8 = 0x85,
    CompressedDxt1 = 0x86,
    CompressedDxt23 = 0x87,
    CompressedDxt45 = 0x88,
    G8B8 = 0x8B,
    CompressedB8R8G8R8 = 0x8D,
    CompressedR8B8R8G8 = 0x8E,
    R6G5B5 = 0x8F,
    Depth24D8 = 0x90,
    Depth24D8Float = 0x91,
    Depth16 = 0x92,
    Depth16Float = 0x93,
    X16 = 0x94,
    Y16X16 = 0x95,
    R5G5B5A1 = 0x97,
    CompressedHilo8 = 0x98,
    CompressedHiloS8 = 0x99,
    W16Z16Y16X16Float = 0x9A,
    W32Z32Y32X32Float = 0x9B,
    X32Float = 0x9C,
    D1R5G5B5 = 0x9D,
    D8R8G8B8 = 0x9E,
    Y16X16Float = 0x9F,
}

impl BaseFormat {
    pub fn from_repr(value: u8) -> Option<Self> {
        Some(match value {
            0x81 => Self::B8,
            0x82 => Self::A1R5G5B5,
            0x83 => Self::A4R4G4B4,
            0x84 => Self::R5G6B5,
            0x85 => Self::A8R8G8B8,
            0x86 => Self::CompressedDxt1,
            0x87 => Self::CompressedDxt23,
            0x88 => Self::CompressedDxt45,
            0x8B => Self::G8B8,
            0x8D => Self::CompressedB8R8G8R8,
            0x8E => Self::CompressedR8B8R8G8,
            0x8F => Self::R6G5B5,
            0x90 => Self::Depth24D8,
            0x91 => Self::Depth24D8Float,
            0x92 => Self::Depth16,
            0x93 => Self::Depth16Float,
            0x94 => Self::X16,
            0x95 => Self::Y16X16,
            0x97 => Self::R5G5B5A1,
            0x98 => Self::CompressedHilo8,
            0x99 => Self::CompressedHiloS8,
            0x9A => Self::W16Z16Y16X16Float,
            0x9B => Self::W32Z32Y32X32Float,
            0x9C => Self::X32Float,
            0x9D => Self::D1R5G5B5,
            0x9E => Self::D8R8G8B8,
            0x9F => Self::Y16X16Float,
            _ => return None,
        })
    }

    pub fn is_dxtn(self) -> bool {
        matches!(
            self,
            Self::CompressedDxt1 | Self::CompressedDxt23 | Self::CompressedDxt45
        )
    }

    /// The packed pair formats store two pixels in every 32 bit group and
    /// share the chroma byte between them.
    pub fn is_packed_pair(self) -> bool {
        matches!(self, Self::CompressedB8R8G8R8 | Self::CompressedR8B8R8G8)
    }

    /// Bytes per pixel, or bytes per 4x4 block for the DXT formats.
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            Self::B8 => 1,
            Self::A1R5G5B5
            | Self::A4R4G4B4
            | Self::R5G6B5
            | Self::G8B8
            | Self::R6G5B5
            | Self::Depth16
            | Self::Depth16Float
            | Self::X16
            | Self::D1R5G5B5
            | Self::R5G5B5A1
            | Self::CompressedHilo8
            | Self::CompressedHiloS8
            | Self::CompressedB8R8G8R8
            | Self::CompressedR8B8R8G8 => 2,
            Self::A8R8G8B8
            | Self::Depth24D8
            | Self::Depth24D8Float
            | Self::Y16X16
            | Self::X32Float
            | Self::D8R8G8B8
            | Self::Y16X16Float => 4,
            Self::W16Z16Y16X16Float => 8,
            Self::W32Z32Y32X32Float => 16,
            Self::CompressedDxt1 => 8,
            Self::CompressedDxt23 | Self::CompressedDxt45 => 16,
        }
    }

    /// Row stride in bytes for a linear layout.
    pub fn pitch(self, width: u32) -> u32 {
        if self.is_dxtn() {
            width.div_ceil(4) * self.bytes_per_pixel()
        } else if self.is_packed_pair() {
            width.div_ceil(2) * 4
        } else {
            width * self.bytes_per_pixel()
        }
    }

    /// The byte group reversal needed when moving pixels across the
    /// little endian / big endian boundary.
    pub fn invert_kind(self) -> InvertKind {
        match self {
            Self::CompressedB8R8G8R8 | Self::CompressedR8B8R8G8 => InvertKind::Swap32Even,
            Self::W32Z32Y32X32Float | Self::X32Float => InvertKind::Swap32,
            Self::X16 | Self::Y16X16 | Self::Y16X16Float | Self::W16Z16Y16X16Float => {
                InvertKind::Swap16
            }
            Self::CompressedDxt1 | Self::CompressedDxt23 | Self::CompressedDxt45 => {
                InvertKind::None
            }
            _ => match self.bytes_per_pixel() {
                2 => InvertKind::Swap16,
                _ => InvertKind::Swap32,
            },
        }
    }
}

/// How the byte mover reorders each pixel's bytes.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum InvertKind {
    None,
    /// Reverse every 2 byte group.
    Swap16,
    /// Reverse every 4 byte group.
    Swap32,
    /// Reverse the 4 byte group starting at every even pixel.
    Swap32Even,
}

/// The serialized format byte with its layout flag bits decoded.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct TextureFormat {
    pub base: BaseFormat,
    /// Row major layout with an explicit pitch instead of swizzling.
    pub linear: bool,
    /// Sample with unnormalized coordinates.
    pub unnormalized: bool,
}

impl TextureFormat {
    pub const LINEAR: u8 = 0x20;
    pub const UNNORMALIZED: u8 = 0x40;

    pub fn swizzled(base: BaseFormat) -> Self {
        Self {
            base,
            linear: false,
            unnormalized: false,
        }
    }

    pub fn linear(base: BaseFormat) -> Self {
        Self {
            base,
            linear: true,
            unnormalized: false,
        }
    }

    pub fn from_byte(value: u8) -> Option<Self> {
        let base = BaseFormat::from_repr(value & !(Self::LINEAR | Self::UNNORMALIZED))?;
        Some(Self {
            base,
            linear: value & Self::LINEAR != 0,
            unnormalized: value & Self::UNNORMALIZED != 0,
        })
    }

    pub fn to_byte(self) -> u8 {
        let mut value = self.base as u8;
        if self.linear {
            value |= Self::LINEAR;
        }
        if self.unnormalized {
            value |= Self::UNNORMALIZED;
        }
        value
    }
}

impl BinRead for TextureFormat {
    type Args<'a> = ();

    fn read_options<R: std::io::Read + std::io::Seek>(
        reader: &mut R,
        endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> binrw::BinResult<Self> {
        let pos = reader.stream_position()?;
        let value = u8::read_options(reader, endian, ())?;
        Self::from_byte(value).ok_or(binrw::Error::AssertFail {
            pos,
            message: format!("invalid texture format {value:#04X}"),
        })
    }
}

impl BinWrite for TextureFormat {
    type Args<'a> = ();

    fn write_options<W: std::io::Write + std::io::Seek>(
        &self,
        writer: &mut W,
        endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> binrw::BinResult<()> {
        self.to_byte().write_options(writer, endian, ())
    }
}

#[cfg(feature = "arbitrary")]
impl<'a> arbitrary::Arbitrary<'a> for TextureFormat {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        Ok(Self {
            base: u.arbitrary()?,
            linear: u.arbitrary()?,
            unnormalized: u.arbitrary()?,
        })
    }
}

/// Which source channel a remapped output position reads from.
#[bitsize(2)]
#[derive(FromBits, Debug, PartialEq, Eq, Clone, Copy)]
pub enum RemapSource {
    Alpha = 0,
    Red = 1,
    Green = 2,
    Blue = 3,
}

impl RemapSource {
    pub(crate) fn from_rank(rank: usize) -> Self {
        match rank {
            0 => Self::Alpha,
            1 => Self::Red,
            2 => Self::Green,
            _ => Self::Blue,
        }
    }
}

/// Whether a remapped output position passes its source channel through or
/// substitutes a constant.
#[bitsize(2)]
#[derive(TryFromBits, Debug, PartialEq, Eq, Clone, Copy)]
pub enum RemapMode {
    Zero = 0,
    One = 1,
    Remap = 2,
}

/// The 16 bit sampler crossbar word stored in the low half of the texture
/// remap field. Output positions are ordered A, R, G, B from the least
/// significant bits.
#[bitsize(16)]
#[derive(DebugBits, TryFromBits, PartialEq, Eq, Clone, Copy)]
pub struct Remap {
    pub alpha: RemapSource,
    pub red: RemapSource,
    pub green: RemapSource,
    pub blue: RemapSource,
    pub alpha_mode: RemapMode,
    pub red_mode: RemapMode,
    pub green_mode: RemapMode,
    pub blue_mode: RemapMode,
}

impl Remap {
    /// Identity crossbar.
    pub fn order_argb() -> Self {
        Self::new(
            RemapSource::Alpha,
            RemapSource::Red,
            RemapSource::Green,
            RemapSource::Blue,
            RemapMode::Remap,
            RemapMode::Remap,
            RemapMode::Remap,
            RemapMode::Remap,
        )
    }

    /// Fully reversed channel order.
    pub fn order_bgra() -> Self {
        Self::new(
            RemapSource::Blue,
            RemapSource::Green,
            RemapSource::Red,
            RemapSource::Alpha,
            RemapMode::Remap,
            RemapMode::Remap,
            RemapMode::Remap,
            RemapMode::Remap,
        )
    }

    /// Reversed color order with alpha in place.
    pub fn order_abgr() -> Self {
        Self::new(
            RemapSource::Alpha,
            RemapSource::Blue,
            RemapSource::Green,
            RemapSource::Red,
            RemapMode::Remap,
            RemapMode::Remap,
            RemapMode::Remap,
            RemapMode::Remap,
        )
    }

    /// Red and green swapped, used by the packed pair formats.
    pub fn order_agrb() -> Self {
        Self::new(
            RemapSource::Alpha,
            RemapSource::Green,
            RemapSource::Red,
            RemapSource::Blue,
            RemapMode::Remap,
            RemapMode::Remap,
            RemapMode::Remap,
            RemapMode::Remap,
        )
    }

    /// Green and blue swapped, used by the YUV packed pair orderings.
    pub fn order_arbg() -> Self {
        Self::new(
            RemapSource::Alpha,
            RemapSource::Red,
            RemapSource::Blue,
            RemapSource::Green,
            RemapMode::Remap,
            RemapMode::Remap,
            RemapMode::Remap,
            RemapMode::Remap,
        )
    }

    /// Identity color with constant one alpha, used for alphaless 24 and
    /// 32 bit layouts.
    pub fn order_1rgb() -> Self {
        Self::new(
            RemapSource::Alpha,
            RemapSource::Red,
            RemapSource::Green,
            RemapSource::Blue,
            RemapMode::One,
            RemapMode::Remap,
            RemapMode::Remap,
            RemapMode::Remap,
        )
    }

    /// Luminance replicated to every color channel with constant one alpha.
    pub fn order_1bbb() -> Self {
        Self::new(
            RemapSource::Alpha,
            RemapSource::Blue,
            RemapSource::Blue,
            RemapSource::Blue,
            RemapMode::One,
            RemapMode::Remap,
            RemapMode::Remap,
            RemapMode::Remap,
        )
    }

    /// Alpha only, every color channel forced to zero.
    pub fn order_b000() -> Self {
        Self::new(
            RemapSource::Blue,
            RemapSource::Blue,
            RemapSource::Blue,
            RemapSource::Blue,
            RemapMode::Remap,
            RemapMode::Zero,
            RemapMode::Zero,
            RemapMode::Zero,
        )
    }
}
