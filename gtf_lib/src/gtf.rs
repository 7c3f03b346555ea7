//! Graphics Texture Format (`.gtf`) containers.
//!
//! A GTF file is big endian: a 12 byte header, one 48 byte attribute record
//! per texture, then the texture payloads. The header block and every
//! payload start on a 128 byte boundary, and the file length is a multiple
//! of 128.
use std::io::{Seek, Write};
use std::path::Path;

use binrw::{BinRead, BinReaderExt, BinWrite, Endian};
use thiserror::Error;

use crate::format::TextureFormat;

/// Placement granularity for the header block and every texture payload.
pub const ALIGNMENT: u32 = 128;

pub const DEFAULT_VERSION: u32 = 0x0202_0000;

pub const HEADER_SIZE: u32 = 12;
pub const ATTRIBUTE_SIZE: u32 = 48;

/// Size of the header plus attribute records, padded to the alignment.
pub fn header_block_size(num_texture: u32) -> u32 {
    (HEADER_SIZE + ATTRIBUTE_SIZE * num_texture).next_multiple_of(ALIGNMENT)
}

#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[derive(Debug, BinRead, BinWrite, PartialEq, Eq, Clone)]
pub struct GtfHeader {
    pub version: u32,
    /// Size of the texture payload region, excluding the header block.
    pub size: u32,
    pub num_texture: u32,
}

#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[derive(Debug, BinRead, BinWrite, PartialEq, Eq, Clone, Copy)]
#[brw(repr(u8))]
pub enum Dimension {
    D1 = 1,
    D2 = 2,
    D3 = 3,
}

/// The texture descriptor the RSX samples from, as stored in a GTF
/// attribute record.
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[derive(Debug, BinRead, BinWrite, PartialEq, Eq, Clone, Copy)]
pub struct GtfTextureInfo {
    pub format: TextureFormat,
    pub mipmap: u8,
    pub dimension: Dimension,
    #[br(map = |x: u8| x != 0)]
    #[bw(map = |&x| u8::from(x))]
    pub cubemap: bool,
    /// Sampler crossbar word in the low 16 bits; see
    /// [Remap](crate::format::Remap).
    pub remap: u32,
    pub width: u16,
    pub height: u16,
    pub depth: u16,
    /// Memory pool the texture is sampled from, 0 for local memory.
    pub location: u8,
    pub padding: u8,
    /// Row stride in bytes for linear layouts, 0 when swizzled.
    pub pitch: u32,
    pub offset: u32,
    pub reserved: [u32; 2],
}

#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[derive(Debug, BinRead, BinWrite, PartialEq, Eq, Clone, Copy)]
pub struct GtfTextureAttribute {
    pub id: u32,
    /// Absolute file offset of this texture's payload, a multiple of 128.
    pub offset_to_tex: u32,
    pub texture_size: u32,
    pub padding: u32,
    pub info: GtfTextureInfo,
}

#[derive(Debug, Error)]
pub enum GtfError {
    #[error("file length {0} is not a multiple of 128")]
    UnalignedFile(usize),

    #[error("expected at least {HEADER_SIZE} header bytes, found {0}")]
    UnexpectedEof(usize),

    #[error("file length {len} is shorter than the {expected} byte header block")]
    AttributesPastEof { len: usize, expected: u64 },

    #[error("a GTF file holds 1 to 255 textures, got {0}")]
    TextureCount(u32),

    #[error("declared size {0} is not a multiple of 128")]
    UnalignedSize(u32),

    #[error("texture id {0} out of range")]
    TextureId(u32),

    #[error("texture offset {0} is not a multiple of 128")]
    UnalignedOffset(u32),

    #[error("texture at offset {offset} with size {size} extends past the {len} byte file")]
    TexturePastEof { offset: u32, size: u32, len: usize },

    #[error("error reading GTF header")]
    Header(#[from] binrw::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A parsed GTF file.
///
/// `data` keeps the entire file image so texture payloads can be borrowed
/// at their absolute offsets. [Gtf::write] reserializes the header and
/// attribute records over the front of the block, so edits to those fields
/// win over the stored bytes.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Gtf {
    pub header: GtfHeader,
    pub textures: Vec<GtfTextureAttribute>,
    pub data: Vec<u8>,
}

/// A borrowed view of one texture in a [Gtf].
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct GtfTexture<'a> {
    pub attribute: GtfTextureAttribute,
    pub payload: &'a [u8],
}

impl Gtf {
    pub fn from_bytes<T: AsRef<[u8]>>(bytes: T) -> Result<Self, GtfError> {
        let bytes = bytes.as_ref();
        if bytes.len() % ALIGNMENT as usize != 0 {
            return Err(GtfError::UnalignedFile(bytes.len()));
        }
        if bytes.len() < HEADER_SIZE as usize {
            return Err(GtfError::UnexpectedEof(bytes.len()));
        }

        let mut reader = std::io::Cursor::new(bytes);
        let header: GtfHeader = reader.read_be()?;

        // Avoid overflowing the block size for absurd texture counts.
        let block = (HEADER_SIZE as u64 + ATTRIBUTE_SIZE as u64 * header.num_texture as u64)
            .next_multiple_of(ALIGNMENT as u64);
        if (bytes.len() as u64) < block {
            return Err(GtfError::AttributesPastEof {
                len: bytes.len(),
                expected: block,
            });
        }
        if !(1..=255).contains(&header.num_texture) {
            return Err(GtfError::TextureCount(header.num_texture));
        }
        if header.size % ALIGNMENT != 0 {
            return Err(GtfError::UnalignedSize(header.size));
        }

        let mut textures = Vec::with_capacity(header.num_texture as usize);
        for _ in 0..header.num_texture {
            let attribute: GtfTextureAttribute = reader.read_be()?;
            if attribute.id > 255 {
                return Err(GtfError::TextureId(attribute.id));
            }
            if attribute.offset_to_tex % ALIGNMENT != 0 {
                return Err(GtfError::UnalignedOffset(attribute.offset_to_tex));
            }
            if attribute.offset_to_tex as u64 + attribute.texture_size as u64
                > bytes.len() as u64
            {
                return Err(GtfError::TexturePastEof {
                    offset: attribute.offset_to_tex,
                    size: attribute.texture_size,
                    len: bytes.len(),
                });
            }
            textures.push(attribute);
        }

        Ok(Self {
            header,
            textures,
            data: bytes.to_vec(),
        })
    }

    /// Read from `path` using a fully buffered reader for performance.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, GtfError> {
        Self::from_bytes(std::fs::read(path)?)
    }

    /// The texture with the given attribute id, if present.
    pub fn texture(&self, id: u32) -> Option<GtfTexture<'_>> {
        let attribute = *self.textures.iter().find(|a| a.id == id)?;
        let start = attribute.offset_to_tex as usize;
        let end = start + attribute.texture_size as usize;
        Some(GtfTexture {
            attribute,
            payload: &self.data[start..end],
        })
    }

    pub fn write<W: Write + Seek>(&self, writer: &mut W) -> Result<(), GtfError> {
        self.header.write_options(writer, Endian::Big, ())?;
        for texture in &self.textures {
            texture.write_options(writer, Endian::Big, ())?;
        }
        let block = header_block_size(self.header.num_texture) as usize;
        let written = HEADER_SIZE as usize + ATTRIBUTE_SIZE as usize * self.textures.len();
        writer.write_all(&vec![0u8; block - written])?;
        writer.write_all(&self.data[block.min(self.data.len())..])?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, GtfError> {
        let mut writer = std::io::Cursor::new(Vec::new());
        self.write(&mut writer)?;
        Ok(writer.into_inner())
    }

    /// Write to `path` using a buffered writer for better performance.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), GtfError> {
        let mut writer = std::io::BufWriter::new(std::fs::File::create(path)?);
        self.write(&mut writer)
    }
}
