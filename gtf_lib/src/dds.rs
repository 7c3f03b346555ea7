//! DirectDraw Surface (`.dds`) containers.
//!
//! A DDS file is a 4 byte magic, a 124 byte little endian header with an
//! embedded 32 byte pixel format, and the image payload. The payload is
//! ordered mip major within each face, face major for cube maps.
use std::io::Write;
use std::path::Path;

use binrw::{BinRead, BinReaderExt, BinWrite, Endian};
use bitflags::bitflags;
use thiserror::Error;

use crate::binrw_bitflags_impl;

pub const MAGIC: [u8; 4] = *b"DDS ";

/// Magic plus declared header size.
pub const HEADER_SIZE: usize = 128;

pub const fn four_cc(bytes: [u8; 4]) -> u32 {
    u32::from_le_bytes(bytes)
}

pub const FOURCC_DXT1: u32 = four_cc(*b"DXT1");
pub const FOURCC_DXT2: u32 = four_cc(*b"DXT2");
pub const FOURCC_DXT3: u32 = four_cc(*b"DXT3");
pub const FOURCC_DXT4: u32 = four_cc(*b"DXT4");
pub const FOURCC_DXT5: u32 = four_cc(*b"DXT5");
pub const FOURCC_DX10: u32 = four_cc(*b"DX10");
pub const FOURCC_R8G8_B8G8: u32 = four_cc(*b"RGBG");
pub const FOURCC_G8R8_G8B8: u32 = four_cc(*b"GRGB");
pub const FOURCC_YUY2: u32 = four_cc(*b"YUY2");
pub const FOURCC_YVYU: u32 = four_cc(*b"YVYU");

// D3DFMT codes stored directly in the fourcc word by float format writers.
pub const FOURCC_R16F: u32 = 111;
pub const FOURCC_G16R16F: u32 = 112;
pub const FOURCC_A16B16G16R16F: u32 = 113;
pub const FOURCC_R32F: u32 = 114;
pub const FOURCC_A32B32G32R32F: u32 = 116;

bitflags! {
    /// DDSD_* header flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct HeaderFlags: u32 {
        const CAPS = 0x1;
        const HEIGHT = 0x2;
        const WIDTH = 0x4;
        const PITCH = 0x8;
        const PIXEL_FORMAT = 0x1000;
        const MIPMAP_COUNT = 0x20000;
        const LINEAR_SIZE = 0x80000;
        const DEPTH = 0x800000;
    }
}

bitflags! {
    /// DDPF_* pixel format flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PixelFormatFlags: u32 {
        const ALPHA_PIXELS = 0x1;
        /// Alpha only, no color channels.
        const ALPHA = 0x2;
        const FOURCC = 0x4;
        const RGB = 0x40;
        const YUV = 0x200;
        const LUMINANCE = 0x20000;
        /// Mixed bump and luminance layouts such as L6V5U5.
        const BUMP_LUMINANCE = 0x40000;
        const BUMP_DUDV = 0x80000;
        /// Nonstandard marker some writers set on normal maps.
        const NORMAL = 0x80000000;
    }
}

bitflags! {
    /// DDSCAPS_* capability flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Caps1: u32 {
        const ALPHA = 0x2;
        /// Required for any file with more than one surface.
        const COMPLEX = 0x8;
        const TEXTURE = 0x1000;
        const MIPMAP = 0x400000;
    }
}

// Identical to the flags used by NUT textures on the Wii U.
bitflags! {
    /// DDSCAPS2_* capability flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Caps2: u32 {
        /// Required for a cube map
        const CUBEMAP = 0x200;
        /// Required when these surfaces are stored in a cubemap
        const CUBEMAP_POSITIVEX = 0x400;
        /// Required when these surfaces are stored in a cubemap
        const CUBEMAP_NEGATIVEX = 0x800;
        /// Required when these surfaces are stored in a cubemap
        const CUBEMAP_POSITIVEY = 0x1000;
        /// Required when these surfaces are stored in a cubemap
        const CUBEMAP_NEGATIVEY = 0x2000;
        /// Required when these surfaces are stored in a cubemap
        const CUBEMAP_POSITIVEZ = 0x4000;
        /// Required when these surfaces are stored in a cubemap
        const CUBEMAP_NEGATIVEZ = 0x8000;
        /// Required for a volume texture
        const VOLUME = 0x200000;
        /// Identical to setting all cubemap direction flags
        const CUBEMAP_ALLFACES = Self::CUBEMAP_POSITIVEX.bits()
            | Self::CUBEMAP_NEGATIVEX.bits()
            | Self::CUBEMAP_POSITIVEY.bits()
            | Self::CUBEMAP_NEGATIVEY.bits()
            | Self::CUBEMAP_POSITIVEZ.bits()
            | Self::CUBEMAP_NEGATIVEZ.bits();
    }
}

binrw_bitflags_impl!(HeaderFlags, PixelFormatFlags, Caps1, Caps2);

#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[derive(Debug, BinRead, BinWrite, PartialEq, Eq, Clone)]
pub struct DdsPixelFormat {
    /// Always 32.
    pub size: u32,
    pub flags: PixelFormatFlags,
    pub four_cc: u32,
    pub rgb_bit_count: u32,
    pub r_bit_mask: u32,
    pub g_bit_mask: u32,
    pub b_bit_mask: u32,
    pub a_bit_mask: u32,
}

impl Default for DdsPixelFormat {
    fn default() -> Self {
        Self {
            size: 32,
            flags: PixelFormatFlags::empty(),
            four_cc: 0,
            rgb_bit_count: 0,
            r_bit_mask: 0,
            g_bit_mask: 0,
            b_bit_mask: 0,
            a_bit_mask: 0,
        }
    }
}

/// The 124 byte header following the magic.
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[derive(Debug, BinRead, BinWrite, PartialEq, Eq, Clone)]
pub struct DdsHeader {
    /// Always 124.
    pub size: u32,
    pub flags: HeaderFlags,
    pub height: u32,
    pub width: u32,
    /// Row pitch or total size of the base level, depending on
    /// [HeaderFlags::PITCH] and [HeaderFlags::LINEAR_SIZE].
    pub pitch_or_linear_size: u32,
    pub depth: u32,
    pub mipmap_count: u32,
    pub reserved1: [u32; 11],
    pub pixel_format: DdsPixelFormat,
    pub caps1: Caps1,
    pub caps2: Caps2,
    pub caps3: u32,
    pub caps4: u32,
    pub reserved2: u32,
}

impl Default for DdsHeader {
    fn default() -> Self {
        Self {
            size: 124,
            flags: HeaderFlags::empty(),
            height: 0,
            width: 0,
            pitch_or_linear_size: 0,
            depth: 0,
            mipmap_count: 0,
            reserved1: [0; 11],
            pixel_format: DdsPixelFormat::default(),
            caps1: Caps1::empty(),
            caps2: Caps2::empty(),
            caps3: 0,
            caps4: 0,
            reserved2: 0,
        }
    }
}

impl DdsHeader {
    /// Declared mipmap count, or 1 when the header stores none.
    pub fn mipmaps(&self) -> u32 {
        if self.flags.contains(HeaderFlags::MIPMAP_COUNT) {
            self.mipmap_count.max(1)
        } else {
            1
        }
    }

    pub fn is_volume(&self) -> bool {
        self.caps2.contains(Caps2::VOLUME) && self.flags.contains(HeaderFlags::DEPTH)
    }

    pub fn is_cubemap(&self) -> bool {
        self.caps2.contains(Caps2::CUBEMAP)
    }
}

#[derive(Debug, Error)]
pub enum DdsError {
    #[error("expected at least {HEADER_SIZE} header bytes, found {0}")]
    UnexpectedEof(usize),

    #[error("invalid magic {0:?}, expected \"DDS \"")]
    InvalidMagic([u8; 4]),

    #[error("declared header size {0}, expected 124")]
    InvalidHeaderSize(u32),

    #[error("declared pixel format size {0}, expected 32")]
    InvalidPixelFormatSize(u32),

    #[error("DX10 extended headers are not supported")]
    Dx10Unsupported,

    #[error("error reading DDS header")]
    Header(#[from] binrw::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A parsed DDS file: the header plus the raw image payload.
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Dds {
    pub header: DdsHeader,
    /// Every byte after the header, in file order.
    pub data: Vec<u8>,
}

impl Dds {
    pub fn from_bytes<T: AsRef<[u8]>>(bytes: T) -> Result<Self, DdsError> {
        let bytes = bytes.as_ref();
        if bytes.len() < HEADER_SIZE {
            return Err(DdsError::UnexpectedEof(bytes.len()));
        }
        let magic: [u8; 4] = bytes[..4].try_into().unwrap();
        if magic != MAGIC {
            return Err(DdsError::InvalidMagic(magic));
        }

        let mut reader = std::io::Cursor::new(&bytes[4..HEADER_SIZE]);
        let header: DdsHeader = reader.read_le()?;
        if header.size != 124 {
            return Err(DdsError::InvalidHeaderSize(header.size));
        }
        if header.pixel_format.size != 32 {
            return Err(DdsError::InvalidPixelFormatSize(header.pixel_format.size));
        }
        if header.pixel_format.four_cc == FOURCC_DX10 {
            return Err(DdsError::Dx10Unsupported);
        }

        Ok(Self {
            header,
            data: bytes[HEADER_SIZE..].to_vec(),
        })
    }

    /// Read from `path` using a fully buffered reader for performance.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, DdsError> {
        Self::from_bytes(std::fs::read(path)?)
    }

    pub fn write<W: Write + std::io::Seek>(&self, writer: &mut W) -> Result<(), DdsError> {
        writer.write_all(&MAGIC)?;
        self.header.write_options(writer, Endian::Little, ())?;
        writer.write_all(&self.data)?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, DdsError> {
        let mut writer = std::io::Cursor::new(Vec::new());
        self.write(&mut writer)?;
        Ok(writer.into_inner())
    }

    /// Write to `path` using a buffered writer for better performance.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), DdsError> {
        let mut writer = std::io::BufWriter::new(std::fs::File::create(path)?);
        self.write(&mut writer)
    }
}
