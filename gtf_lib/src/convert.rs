//! Conversion drivers between the two containers.
//!
//! DDS to GTF classifies the pixel format, synthesizes the texture
//! descriptor, plans the sub-image layout, and moves bytes. GTF to DDS
//! synthesizes a DDS header from the stored descriptor and runs the same
//! layout in reverse. Neither direction touches pixel values beyond the
//! endian swap, so converting back reproduces the original payload.
use binrw::{BinWrite, Endian};
use log::debug;
use thiserror::Error;

use crate::dds::{
    Caps1, Caps2, Dds, DdsError, DdsHeader, DdsPixelFormat, FOURCC_A16B16G16R16F,
    FOURCC_A32B32G32R32F, FOURCC_DXT1, FOURCC_DXT2, FOURCC_DXT3, FOURCC_DXT4, FOURCC_DXT5,
    FOURCC_G16R16F, FOURCC_G8R8_G8B8, FOURCC_R16F, FOURCC_R32F, FOURCC_R8G8_B8G8, FOURCC_YUY2,
    FOURCC_YVYU, HeaderFlags, PixelFormatFlags,
};
use crate::format::{BaseFormat, Remap, RemapMode, RemapSource, TextureFormat};
use crate::gtf::{
    DEFAULT_VERSION, Dimension, Gtf, GtfError, GtfHeader, GtfTextureAttribute, GtfTextureInfo,
    header_block_size,
};
use crate::layout::{self, pow2_or_zero};
use crate::transfer::{Buffers, move_layout};

/// Options for the DDS to GTF direction. Ignored by [gtf_to_dds].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Keep non DXT textures in a linear layout even when their dimensions
    /// would allow swizzling.
    pub linearize: bool,
    /// Mark the texture for sampling with unnormalized coordinates.
    pub unnormalize: bool,
}

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error(transparent)]
    Dds(#[from] DdsError),

    #[error(transparent)]
    Gtf(#[from] GtfError),

    #[error("cube maps must store all six faces")]
    PartialCubemap,

    #[error("volume dimensions {0}x{1}x{2} exceed the 512 limit")]
    VolumeTooLarge(u32, u32, u32),

    #[error("dimensions {0}x{1} exceed the 4096 limit")]
    TextureTooLarge(u32, u32),

    #[error("mipmap count {mipmaps} exceeds the limit {max} for the base level")]
    TooManyMipmaps { mipmaps: u32, max: u32 },

    #[error("the swizzled layout requires power of two dimensions")]
    NotSwizzlable,

    #[error("pixel format has no GTF equivalent")]
    UnsupportedPixelFormat,

    #[error("texture format {0:?} has no DDS equivalent")]
    UnsupportedTextureFormat(BaseFormat),

    #[error("DDS payload is shorter than the layout requires")]
    DdsEof,

    #[error("GTF payload is shorter than the layout requires")]
    GtfEof,

    #[error("copy range exceeds the DDS buffer")]
    DdsOverflow,

    #[error("copy range exceeds the GTF buffer")]
    GtfOverflow,

    #[error("no texture with id {0}")]
    TextureNotFound(u32),

    #[error("a GTF container holds 1 to 255 textures, got {0}")]
    ImageCount(usize),

    #[error("output exceeds the 4 GiB GTF file limit")]
    FileTooLong,

    #[error("error serializing header")]
    Serialize(#[from] binrw::Error),
}

/// Convert a single DDS image into a one texture GTF file.
pub fn dds_to_gtf(dds: &Dds, options: &ConvertOptions) -> Result<Gtf, ConvertError> {
    pack_gtf(std::slice::from_ref(dds), options)
}

/// Pack 1 to 255 DDS images into one GTF file, placing every texture on a
/// 128 byte boundary.
pub fn pack_gtf(images: &[Dds], options: &ConvertOptions) -> Result<Gtf, ConvertError> {
    if images.is_empty() || images.len() > 255 {
        return Err(ConvertError::ImageCount(images.len()));
    }
    let num_texture = images.len() as u32;
    let block = header_block_size(num_texture) as u64;

    let mut textures = Vec::with_capacity(images.len());
    let mut plans = Vec::with_capacity(images.len());
    let mut offset = block;
    for (index, dds) in images.iter().enumerate() {
        let info = texture_info_from_dds(&dds.header, options)?;
        let plan = layout::plan(&info, dds_expansion(&dds.header));
        if plan.dds_image_size > dds.data.len() as u64 {
            return Err(ConvertError::DdsEof);
        }
        if offset > u32::MAX as u64 || plan.gtf_image_size > u32::MAX as u64 {
            return Err(ConvertError::FileTooLong);
        }
        debug!(
            "texture {index}: {:?} {}x{}x{} at {offset}",
            info.format.base, info.width, info.height, info.depth
        );
        textures.push(GtfTextureAttribute {
            id: index as u32,
            offset_to_tex: offset as u32,
            texture_size: plan.gtf_image_size as u32,
            padding: 0,
            info,
        });
        offset = (offset + plan.gtf_image_size).next_multiple_of(crate::gtf::ALIGNMENT as u64);
        plans.push(plan);
    }
    let file_size = offset;
    if file_size > u32::MAX as u64 {
        return Err(ConvertError::FileTooLong);
    }

    let mut data = vec![0u8; file_size as usize];
    for ((dds, plan), attribute) in images.iter().zip(&plans).zip(&textures) {
        let start = attribute.offset_to_tex as usize;
        let end = start + attribute.texture_size as usize;
        let mut buffers = Buffers::DdsToGtf {
            dds: &dds.data,
            gtf: &mut data[start..end],
        };
        for layout in &plan.layouts {
            move_layout(&mut buffers, layout, &attribute.info)?;
        }
    }

    let header = GtfHeader {
        version: DEFAULT_VERSION,
        size: (file_size - block) as u32,
        num_texture,
    };
    // Keep the stored file image complete by serializing the front matter.
    let mut cursor = std::io::Cursor::new(&mut data[..]);
    header.write_options(&mut cursor, Endian::Big, ())?;
    for texture in &textures {
        texture.write_options(&mut cursor, Endian::Big, ())?;
    }

    Ok(Gtf {
        header,
        textures,
        data,
    })
}

/// Extract one texture from a GTF file as a DDS image.
pub fn gtf_to_dds(gtf: &Gtf, texture_id: u32) -> Result<Dds, ConvertError> {
    let texture = gtf
        .texture(texture_id)
        .ok_or(ConvertError::TextureNotFound(texture_id))?;
    let info = texture.attribute.info;
    validate_descriptor(&info)?;
    let header = dds_header_from_info(&info)?;

    let plan = layout::plan(&info, 0);
    if plan.gtf_image_size > texture.payload.len() as u64 {
        return Err(ConvertError::GtfEof);
    }
    if plan.dds_image_size > u32::MAX as u64 {
        return Err(ConvertError::FileTooLong);
    }

    let mut data = vec![0u8; plan.dds_image_size as usize];
    let mut buffers = Buffers::GtfToDds {
        gtf: texture.payload,
        dds: &mut data,
    };
    for layout in &plan.layouts {
        move_layout(&mut buffers, layout, &info)?;
    }

    Ok(Dds { header, data })
}

/// Bytes per pixel of DDS payloads that are narrower than their GTF
/// format, 0 for everything else.
fn dds_expansion(header: &DdsHeader) -> u32 {
    if header.pixel_format.flags.contains(PixelFormatFlags::FOURCC)
        && header.pixel_format.four_cc == FOURCC_R16F
    {
        2
    } else if header.pixel_format.rgb_bit_count == 24 {
        3
    } else {
        0
    }
}

fn validate_descriptor(info: &GtfTextureInfo) -> Result<(), ConvertError> {
    let width = info.width as u32;
    let height = info.height as u32;
    let depth = info.depth as u32;
    if info.dimension == Dimension::D3 {
        if width > 512 || height > 512 || depth > 512 {
            return Err(ConvertError::VolumeTooLarge(width, height, depth));
        }
    } else if width > 4096 || height > 4096 {
        return Err(ConvertError::TextureTooLarge(width, height));
    }
    let max = 1 + width.max(height).max(depth).max(1).ilog2();
    if info.mipmap as u32 > max {
        return Err(ConvertError::TooManyMipmaps {
            mipmaps: info.mipmap as u32,
            max,
        });
    }
    let base = info.format.base;
    if !info.format.linear
        && !base.is_dxtn()
        && (base.is_packed_pair()
            || !(pow2_or_zero(width) && pow2_or_zero(height) && pow2_or_zero(depth)))
    {
        return Err(ConvertError::NotSwizzlable);
    }
    Ok(())
}

/// Build the texture descriptor a DDS header converts into.
fn texture_info_from_dds(
    header: &DdsHeader,
    options: &ConvertOptions,
) -> Result<GtfTextureInfo, ConvertError> {
    let (base, remap) = classify_pixel_format(&header.pixel_format)?;

    if header.is_cubemap() && !header.caps2.contains(Caps2::CUBEMAP_ALLFACES) {
        return Err(ConvertError::PartialCubemap);
    }
    let volume = header.is_volume();
    let width = header.width;
    let height = header.height;
    let depth = if volume { header.depth } else { 1 };
    if volume {
        if width > 512 || height > 512 || depth > 512 {
            return Err(ConvertError::VolumeTooLarge(width, height, depth));
        }
    } else if width > 4096 || height > 4096 {
        return Err(ConvertError::TextureTooLarge(width, height));
    }
    let mipmap = header.mipmaps();
    let max = 1 + width.max(height).max(depth).max(1).ilog2();
    if mipmap > max {
        return Err(ConvertError::TooManyMipmaps { mipmaps: mipmap, max });
    }

    let swizzlable = !base.is_packed_pair()
        && pow2_or_zero(width)
        && pow2_or_zero(height)
        && pow2_or_zero(depth);
    let swizzle = swizzlable && (base.is_dxtn() || !options.linearize);
    let format = TextureFormat {
        base,
        // DXT payloads never advertise the linear layout; non power of two
        // block data falls back to the pitch implicitly.
        linear: !swizzle && !base.is_dxtn(),
        unnormalized: options.unnormalize,
    };

    Ok(GtfTextureInfo {
        format,
        mipmap: mipmap as u8,
        dimension: if volume { Dimension::D3 } else { Dimension::D2 },
        cubemap: header.is_cubemap(),
        remap: u16::from(remap) as u32,
        width: width as u16,
        height: height as u16,
        depth: depth as u16,
        location: 0,
        padding: 0,
        pitch: if swizzle { 0 } else { base.pitch(width) },
        offset: 0,
        reserved: [0; 2],
    })
}

/// Map a DDS pixel format onto a base format and sampler crossbar.
fn classify_pixel_format(pf: &DdsPixelFormat) -> Result<(BaseFormat, Remap), ConvertError> {
    let classified = if pf.flags.contains(PixelFormatFlags::FOURCC) {
        four_cc_format(pf)
    } else if pf.flags.intersects(
        PixelFormatFlags::RGB
            | PixelFormatFlags::ALPHA
            | PixelFormatFlags::ALPHA_PIXELS
            | PixelFormatFlags::LUMINANCE
            | PixelFormatFlags::BUMP_LUMINANCE
            | PixelFormatFlags::BUMP_DUDV,
    ) {
        mask_format(pf)
    } else {
        None
    };
    classified
        .or_else(|| fallback_format(pf))
        .ok_or(ConvertError::UnsupportedPixelFormat)
}

fn four_cc_format(pf: &DdsPixelFormat) -> Option<(BaseFormat, Remap)> {
    let argb = Remap::order_argb();
    match pf.four_cc {
        FOURCC_DXT1 => Some((BaseFormat::CompressedDxt1, argb)),
        FOURCC_DXT2 | FOURCC_DXT3 => Some((BaseFormat::CompressedDxt23, argb)),
        FOURCC_DXT4 | FOURCC_DXT5 => Some((BaseFormat::CompressedDxt45, argb)),
        // R16F widens into the two channel format. The reverse direction
        // emits G16R16F, so this mapping does not round trip the fourcc.
        FOURCC_R16F | FOURCC_G16R16F => Some((BaseFormat::Y16X16Float, argb)),
        FOURCC_A16B16G16R16F => Some((BaseFormat::W16Z16Y16X16Float, argb)),
        FOURCC_R32F => Some((BaseFormat::X32Float, argb)),
        FOURCC_A32B32G32R32F => Some((BaseFormat::W32Z32Y32X32Float, argb)),
        FOURCC_R8G8_B8G8 => Some((BaseFormat::CompressedB8R8G8R8, Remap::order_agrb())),
        FOURCC_G8R8_G8B8 => Some((BaseFormat::CompressedR8B8R8G8, Remap::order_agrb())),
        FOURCC_YVYU => Some((BaseFormat::CompressedR8B8R8G8, Remap::order_arbg())),
        FOURCC_YUY2 => Some((BaseFormat::CompressedB8R8G8R8, Remap::order_arbg())),
        _ => None,
    }
}

fn mask_format(pf: &DdsPixelFormat) -> Option<(BaseFormat, Remap)> {
    let remap = remap_from_masks(pf);
    let a = pf.a_bit_mask.count_ones();
    let r = pf.r_bit_mask.count_ones();
    let g = pf.g_bit_mask.count_ones();
    let b = pf.b_bit_mask.count_ones();

    match pf.rgb_bit_count {
        8 => {
            if pf.r_bit_mask != 0 {
                Some((BaseFormat::B8, Remap::order_1bbb()))
            } else {
                Some((BaseFormat::B8, Remap::order_b000()))
            }
        }
        16 => {
            if pf.flags.contains(PixelFormatFlags::BUMP_DUDV) {
                return Some((BaseFormat::Y16X16, remap));
            }
            if pf.flags.contains(PixelFormatFlags::LUMINANCE) {
                if r == 16 {
                    return Some((BaseFormat::X16, remap));
                }
                if (a == 8 && r == 8) || (g == 8 && b == 8) {
                    return Some((BaseFormat::G8B8, remap));
                }
            }
            if a == 1 && pf.a_bit_mask == 0x8000 {
                Some((BaseFormat::A1R5G5B5, remap))
            } else if a == 1 && pf.a_bit_mask == 0x0001 {
                Some((BaseFormat::R5G5B5A1, remap))
            } else if a == 4 || (a == 0 && r == 4 && g == 4 && b == 4) {
                Some((BaseFormat::A4R4G4B4, remap))
            } else if a == 0 && r == 5 && g == 6 && b == 5 {
                Some((BaseFormat::R5G6B5, remap))
            } else if a == 0 && r == 6 && g == 5 && b == 5 {
                Some((BaseFormat::R6G5B5, remap))
            } else if a == 0 && r == 5 && g == 5 && b == 5 {
                Some((BaseFormat::D1R5G5B5, remap))
            } else if (a == 8 && r == 8) || (g == 8 && b == 8) {
                Some((BaseFormat::G8B8, remap))
            } else if a == 16 || r == 16 || g == 16 || b == 16 {
                Some((BaseFormat::X16, remap))
            } else {
                None
            }
        }
        24 => Some((BaseFormat::D8R8G8B8, Remap::order_1rgb())),
        32 => {
            if pf.flags.contains(PixelFormatFlags::BUMP_DUDV) {
                return Some((BaseFormat::A8R8G8B8, remap));
            }
            if pf.flags.contains(PixelFormatFlags::ALPHA_PIXELS) {
                Some((BaseFormat::A8R8G8B8, remap))
            } else if [a, r, g, b].iter().filter(|&&bits| bits == 16).count() >= 2 && r != 8 {
                Some((BaseFormat::Y16X16, remap))
            } else {
                Some((BaseFormat::D8R8G8B8, Remap::order_1rgb()))
            }
        }
        _ => None,
    }
}

/// Classify by bit count alone when neither the fourcc nor the masks
/// matched a known layout.
fn fallback_format(pf: &DdsPixelFormat) -> Option<(BaseFormat, Remap)> {
    let argb = Remap::order_argb();
    match pf.rgb_bit_count {
        8 => Some((BaseFormat::B8, argb)),
        16 => Some((BaseFormat::X16, argb)),
        32 => Some((BaseFormat::A8R8G8B8, argb)),
        64 => Some((BaseFormat::W16Z16Y16X16Float, argb)),
        128 => Some((BaseFormat::W32Z32Y32X32Float, argb)),
        _ => None,
    }
}

/// Derive the sampler crossbar from the channel mask magnitudes.
///
/// Each output position reads the channel whose mask ranks the same as its
/// own. Without an alpha mask, alpha is given the largest rank and then
/// pinned to constant one.
fn remap_from_masks(pf: &DdsPixelFormat) -> Remap {
    let alpha_pixels = pf.flags.contains(PixelFormatFlags::ALPHA_PIXELS);
    let mut masks = [pf.a_bit_mask, pf.r_bit_mask, pf.g_bit_mask, pf.b_bit_mask];
    if !alpha_pixels {
        masks[0] = ((pf.r_bit_mask | pf.g_bit_mask | pf.b_bit_mask) & 1) << 31;
    }

    let mut ranks = [0usize; 4];
    for i in 0..4 {
        ranks[i] = (0..4).filter(|&j| j != i && masks[i] < masks[j]).count();
    }
    let sources = ranks.map(RemapSource::from_rank);
    let mut modes = [RemapMode::Remap; 4];
    if !alpha_pixels {
        if let Some(position) = ranks.iter().position(|&rank| rank == 0) {
            modes[position] = RemapMode::One;
        }
    }
    Remap::new(
        sources[0], sources[1], sources[2], sources[3], modes[0], modes[1], modes[2], modes[3],
    )
}

/// Synthesize a DDS header from a texture descriptor.
fn dds_header_from_info(info: &GtfTextureInfo) -> Result<DdsHeader, ConvertError> {
    let base = info.format.base;
    let mut pf = DdsPixelFormat::default();
    match base {
        BaseFormat::B8 => {
            pf.flags = PixelFormatFlags::LUMINANCE;
            pf.rgb_bit_count = 8;
            pf.r_bit_mask = 0xFF;
        }
        BaseFormat::A1R5G5B5 => {
            pf.flags = PixelFormatFlags::RGB | PixelFormatFlags::ALPHA_PIXELS;
            pf.rgb_bit_count = 16;
            pf.a_bit_mask = 0x8000;
            pf.r_bit_mask = 0x7C00;
            pf.g_bit_mask = 0x03E0;
            pf.b_bit_mask = 0x001F;
        }
        BaseFormat::A4R4G4B4 => {
            pf.flags = PixelFormatFlags::RGB | PixelFormatFlags::ALPHA_PIXELS;
            pf.rgb_bit_count = 16;
            pf.a_bit_mask = 0xF000;
            pf.r_bit_mask = 0x0F00;
            pf.g_bit_mask = 0x00F0;
            pf.b_bit_mask = 0x000F;
        }
        BaseFormat::R5G6B5 => {
            pf.flags = PixelFormatFlags::RGB;
            pf.rgb_bit_count = 16;
            pf.r_bit_mask = 0xF800;
            pf.g_bit_mask = 0x07E0;
            pf.b_bit_mask = 0x001F;
        }
        BaseFormat::R6G5B5 => {
            pf.flags = PixelFormatFlags::BUMP_LUMINANCE;
            pf.rgb_bit_count = 16;
            pf.r_bit_mask = 0xFC00;
            pf.g_bit_mask = 0x03E0;
            pf.b_bit_mask = 0x001F;
        }
        BaseFormat::D1R5G5B5 => {
            pf.flags = PixelFormatFlags::RGB;
            pf.rgb_bit_count = 16;
            pf.r_bit_mask = 0x7C00;
            pf.g_bit_mask = 0x03E0;
            pf.b_bit_mask = 0x001F;
        }
        BaseFormat::R5G5B5A1 => {
            pf.flags = PixelFormatFlags::RGB | PixelFormatFlags::ALPHA_PIXELS;
            pf.rgb_bit_count = 16;
            pf.a_bit_mask = 0x0001;
            pf.r_bit_mask = 0xF800;
            pf.g_bit_mask = 0x07C0;
            pf.b_bit_mask = 0x003E;
        }
        BaseFormat::G8B8 => {
            pf.flags = PixelFormatFlags::LUMINANCE | PixelFormatFlags::ALPHA_PIXELS;
            pf.rgb_bit_count = 16;
            pf.a_bit_mask = 0xFF00;
            pf.r_bit_mask = 0x00FF;
        }
        BaseFormat::X16 => {
            pf.flags = PixelFormatFlags::LUMINANCE;
            pf.rgb_bit_count = 16;
            pf.r_bit_mask = 0xFFFF;
        }
        BaseFormat::A8R8G8B8 => {
            pf.flags = PixelFormatFlags::RGB | PixelFormatFlags::ALPHA_PIXELS;
            pf.rgb_bit_count = 32;
            pf.a_bit_mask = 0xFF000000;
            pf.r_bit_mask = 0x00FF0000;
            pf.g_bit_mask = 0x0000FF00;
            pf.b_bit_mask = 0x000000FF;
        }
        BaseFormat::D8R8G8B8 => {
            pf.flags = PixelFormatFlags::RGB;
            pf.rgb_bit_count = 32;
            pf.r_bit_mask = 0x00FF0000;
            pf.g_bit_mask = 0x0000FF00;
            pf.b_bit_mask = 0x000000FF;
        }
        BaseFormat::Y16X16 => {
            pf.flags = PixelFormatFlags::RGB;
            pf.rgb_bit_count = 32;
            pf.r_bit_mask = 0x0000FFFF;
            pf.g_bit_mask = 0xFFFF0000;
        }
        BaseFormat::CompressedDxt1 => {
            pf.flags = PixelFormatFlags::FOURCC;
            pf.four_cc = FOURCC_DXT1;
        }
        BaseFormat::CompressedDxt23 => {
            pf.flags = PixelFormatFlags::FOURCC;
            pf.four_cc = FOURCC_DXT3;
        }
        BaseFormat::CompressedDxt45 => {
            pf.flags = PixelFormatFlags::FOURCC;
            pf.four_cc = FOURCC_DXT5;
        }
        BaseFormat::Y16X16Float => {
            pf.flags = PixelFormatFlags::FOURCC;
            pf.four_cc = FOURCC_G16R16F;
        }
        BaseFormat::W16Z16Y16X16Float => {
            pf.flags = PixelFormatFlags::FOURCC;
            pf.four_cc = FOURCC_A16B16G16R16F;
        }
        BaseFormat::X32Float => {
            pf.flags = PixelFormatFlags::FOURCC;
            pf.four_cc = FOURCC_R32F;
        }
        BaseFormat::W32Z32Y32X32Float => {
            pf.flags = PixelFormatFlags::FOURCC;
            pf.four_cc = FOURCC_A32B32G32R32F;
        }
        BaseFormat::CompressedB8R8G8R8 => {
            pf.flags = PixelFormatFlags::FOURCC;
            pf.four_cc = FOURCC_R8G8_B8G8;
        }
        BaseFormat::CompressedR8B8R8G8 => {
            pf.flags = PixelFormatFlags::FOURCC;
            pf.four_cc = FOURCC_G8R8_G8B8;
        }
        // Depth and HILO surfaces have no standard DDS encoding.
        BaseFormat::Depth24D8
        | BaseFormat::Depth24D8Float
        | BaseFormat::Depth16
        | BaseFormat::Depth16Float
        | BaseFormat::CompressedHilo8
        | BaseFormat::CompressedHiloS8 => {
            return Err(ConvertError::UnsupportedTextureFormat(base));
        }
    }

    let mut header = DdsHeader {
        flags: HeaderFlags::CAPS
            | HeaderFlags::HEIGHT
            | HeaderFlags::WIDTH
            | HeaderFlags::PIXEL_FORMAT,
        height: info.height as u32,
        width: info.width as u32,
        caps1: Caps1::TEXTURE,
        ..Default::default()
    };
    if info.mipmap > 1 {
        header.flags |= HeaderFlags::MIPMAP_COUNT;
        header.caps1 |= Caps1::MIPMAP | Caps1::COMPLEX;
        header.mipmap_count = info.mipmap as u32;
    }
    if info.dimension == Dimension::D3 {
        header.flags |= HeaderFlags::DEPTH;
        header.caps1 |= Caps1::COMPLEX;
        header.caps2 |= Caps2::VOLUME;
        header.depth = info.depth as u32;
    }
    if info.cubemap {
        header.caps1 |= Caps1::COMPLEX;
        header.caps2 |= Caps2::CUBEMAP | Caps2::CUBEMAP_ALLFACES;
    }
    if pf.flags.contains(PixelFormatFlags::ALPHA_PIXELS) {
        header.caps1 |= Caps1::ALPHA;
    }

    if base.is_packed_pair() {
        header.pitch_or_linear_size = 0;
    } else if base.is_dxtn() {
        header.flags |= HeaderFlags::LINEAR_SIZE;
        header.pitch_or_linear_size = (info.width as u32).div_ceil(4)
            * (info.height as u32).div_ceil(4)
            * base.bytes_per_pixel();
    } else if info.pitch != 0 {
        header.flags |= HeaderFlags::PITCH;
        header.pitch_or_linear_size = info.pitch;
    }
    header.pixel_format = pf;
    Ok(header)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::swizzle::swizzle_offset_2d;

    fn fourcc_pf(four_cc: u32) -> DdsPixelFormat {
        DdsPixelFormat {
            flags: PixelFormatFlags::FOURCC,
            four_cc,
            ..Default::default()
        }
    }

    fn rgb_pf(bit_count: u32, masks: [u32; 4], alpha: bool) -> DdsPixelFormat {
        DdsPixelFormat {
            flags: if alpha {
                PixelFormatFlags::RGB | PixelFormatFlags::ALPHA_PIXELS
            } else {
                PixelFormatFlags::RGB
            },
            rgb_bit_count: bit_count,
            a_bit_mask: masks[0],
            r_bit_mask: masks[1],
            g_bit_mask: masks[2],
            b_bit_mask: masks[3],
            ..Default::default()
        }
    }

    fn dds_2d(pixel_format: DdsPixelFormat, width: u32, height: u32, data: Vec<u8>) -> Dds {
        Dds {
            header: DdsHeader {
                flags: HeaderFlags::CAPS
                    | HeaderFlags::HEIGHT
                    | HeaderFlags::WIDTH
                    | HeaderFlags::PIXEL_FORMAT,
                height,
                width,
                caps1: Caps1::TEXTURE,
                pixel_format,
                ..Default::default()
            },
            data,
        }
    }

    #[test]
    fn minimal_dxt1_dds_to_gtf() {
        let dds = dds_2d(fourcc_pf(FOURCC_DXT1), 1, 1, vec![0xFF; 8]);
        let gtf = dds_to_gtf(&dds, &ConvertOptions::default()).unwrap();

        assert_eq!(256, gtf.data.len());
        assert_eq!(DEFAULT_VERSION, gtf.header.version);
        assert_eq!(128, gtf.header.size);
        assert_eq!(1, gtf.header.num_texture);

        let attribute = gtf.textures[0];
        assert_eq!(0, attribute.id);
        assert_eq!(128, attribute.offset_to_tex);
        assert_eq!(8, attribute.texture_size);

        let info = attribute.info;
        assert_eq!(0x86, info.format.to_byte());
        assert_eq!(1, info.mipmap);
        assert_eq!(Dimension::D2, info.dimension);
        assert_eq!(0xAAE4, info.remap);
        assert_eq!((1, 1, 1), (info.width, info.height, info.depth));
        assert_eq!(0, info.pitch);

        assert_eq!([0x02, 0x02, 0x00, 0x00], gtf.data[0..4]);
        assert_eq!(&[0xFF; 8], &gtf.data[128..136]);
        assert!(gtf.data[136..].iter().all(|&b| b == 0));
        // The stored image matches a full reserialization.
        assert_eq!(gtf.data, gtf.to_bytes().unwrap());
    }

    #[test]
    fn unnormalize_option_sets_flag() {
        let dds = dds_2d(fourcc_pf(FOURCC_DXT1), 1, 1, vec![0xFF; 8]);
        let options = ConvertOptions {
            linearize: false,
            unnormalize: true,
        };
        let gtf = dds_to_gtf(&dds, &options).unwrap();
        assert_eq!(0xC6, gtf.textures[0].info.format.to_byte());
    }

    #[test]
    fn dxt5_round_trip() {
        let block: Vec<u8> = (0..16).collect();
        let dds = dds_2d(fourcc_pf(FOURCC_DXT5), 4, 4, block.clone());
        let gtf = dds_to_gtf(&dds, &ConvertOptions::default()).unwrap();
        assert_eq!(16, gtf.textures[0].texture_size);
        assert_eq!(&block[..], &gtf.data[128..144]);

        let back = gtf_to_dds(&gtf, 0).unwrap();
        assert_eq!(block, back.data);
        assert_eq!(FOURCC_DXT5, back.header.pixel_format.four_cc);
        assert!(back.header.flags.contains(HeaderFlags::LINEAR_SIZE));
        assert_eq!(16, back.header.pitch_or_linear_size);
    }

    #[test]
    fn packed_file_sizes() {
        let image = dds_2d(fourcc_pf(FOURCC_DXT1), 1, 1, vec![0xFF; 8]);
        for count in [1usize, 2, 18, 255] {
            let images = vec![image.clone(); count];
            let gtf = pack_gtf(&images, &ConvertOptions::default()).unwrap();
            let block = header_block_size(count as u32);
            assert_eq!(block as usize + 128 * count, gtf.data.len());
            assert_eq!(0, gtf.data.len() % 128);
            for (index, attribute) in gtf.textures.iter().enumerate() {
                assert_eq!(index as u32, attribute.id);
                assert_eq!(block + 128 * index as u32, attribute.offset_to_tex);
            }
            assert_eq!(gtf.data, gtf.to_bytes().unwrap());
        }
    }

    #[test]
    fn pack_rejects_bad_counts() {
        assert!(matches!(
            pack_gtf(&[], &ConvertOptions::default()),
            Err(ConvertError::ImageCount(0))
        ));
        let image = dds_2d(fourcc_pf(FOURCC_DXT1), 1, 1, vec![0xFF; 8]);
        assert!(matches!(
            pack_gtf(&vec![image; 256], &ConvertOptions::default()),
            Err(ConvertError::ImageCount(256))
        ));
    }

    #[test]
    fn volume_dxt1_interleaves_depth_blocks() {
        // 8x8x8 DXT1: 2x2 blocks per slice, 8 slices of 32 bytes. Every
        // block is filled with slice * 4 + block index.
        let mut payload = vec![0u8; 256];
        for slice in 0..8 {
            for block in 0..4 {
                let offset = slice * 32 + block * 8;
                payload[offset..offset + 8].fill((slice * 4 + block) as u8);
            }
        }
        let mut dds = dds_2d(fourcc_pf(FOURCC_DXT1), 8, 8, payload.clone());
        dds.header.flags |= HeaderFlags::DEPTH;
        dds.header.caps2 |= Caps2::VOLUME;
        dds.header.depth = 8;

        let gtf = dds_to_gtf(&dds, &ConvertOptions::default()).unwrap();
        assert_eq!(256, gtf.textures[0].texture_size);
        assert_eq!(384, gtf.data.len());
        assert_eq!(Dimension::D3, gtf.textures[0].info.dimension);

        // Up to four depth slices interleave per super block.
        let blocks: Vec<u8> = gtf.data[128..384].chunks(8).map(|c| c[0]).collect();
        assert_eq!([0, 4, 8, 12], blocks[0..4]);
        assert_eq!(1, blocks[4]);
        assert_eq!(16, blocks[16]);

        let back = gtf_to_dds(&gtf, 0).unwrap();
        assert_eq!(payload, back.data);
        assert!(back.header.flags.contains(HeaderFlags::DEPTH));
        assert!(back.header.caps2.contains(Caps2::VOLUME));
        assert_eq!(8, back.header.depth);
    }

    #[test]
    fn a8r8g8b8_linearize() {
        let pf = rgb_pf(32, [0xFF000000, 0x00FF0000, 0x0000FF00, 0x000000FF], true);
        let payload: Vec<u8> = [1, 2, 3, 4].repeat(64 * 64);
        let dds = dds_2d(pf, 64, 64, payload.clone());
        let options = ConvertOptions {
            linearize: true,
            unnormalize: false,
        };
        let gtf = dds_to_gtf(&dds, &options).unwrap();

        let info = gtf.textures[0].info;
        assert_eq!(0xA5, info.format.to_byte());
        assert_eq!(256, info.pitch);
        assert_eq!(0xAAE4, info.remap);
        // Linear rows keep their order; every pixel is byte reversed.
        assert_eq!([4, 3, 2, 1], gtf.data[128..132]);

        let back = gtf_to_dds(&gtf, 0).unwrap();
        assert_eq!(payload, back.data);
        assert!(back.header.flags.contains(HeaderFlags::PITCH));
        assert_eq!(256, back.header.pitch_or_linear_size);
    }

    #[test]
    fn a8r8g8b8_swizzles_by_default() {
        let pf = rgb_pf(32, [0xFF000000, 0x00FF0000, 0x0000FF00, 0x000000FF], true);
        let payload: Vec<u8> = (0..64).collect();
        let dds = dds_2d(pf, 4, 4, payload.clone());
        let gtf = dds_to_gtf(&dds, &ConvertOptions::default()).unwrap();

        let info = gtf.textures[0].info;
        assert_eq!(0x85, info.format.to_byte());
        assert_eq!(0, info.pitch);
        for y in 0..4u32 {
            for x in 0..4u32 {
                let src = ((y * 4 + x) * 4) as usize;
                let dst = 128 + swizzle_offset_2d(x, y, 2, 2) as usize * 4;
                assert_eq!(
                    [
                        payload[src + 3],
                        payload[src + 2],
                        payload[src + 1],
                        payload[src]
                    ],
                    gtf.data[dst..dst + 4]
                );
            }
        }

        let back = gtf_to_dds(&gtf, 0).unwrap();
        assert_eq!(payload, back.data);
    }

    #[test]
    fn cubemap_round_trip() {
        let pf = rgb_pf(32, [0xFF000000, 0x00FF0000, 0x0000FF00, 0x000000FF], true);
        let payload: Vec<u8> = (0..96).collect();
        let mut dds = dds_2d(pf, 2, 2, payload.clone());
        dds.header.caps1 |= Caps1::COMPLEX;
        dds.header.caps2 |= Caps2::CUBEMAP | Caps2::CUBEMAP_ALLFACES;

        let gtf = dds_to_gtf(&dds, &ConvertOptions::default()).unwrap();
        assert!(gtf.textures[0].info.cubemap);
        // Five aligned faces plus one 16 byte face.
        assert_eq!(656, gtf.textures[0].texture_size);

        let back = gtf_to_dds(&gtf, 0).unwrap();
        assert_eq!(payload, back.data);
        assert!(back.header.caps2.contains(Caps2::CUBEMAP | Caps2::CUBEMAP_ALLFACES));
    }

    #[test]
    fn r16f_expands_to_two_channels() {
        let dds = dds_2d(
            fourcc_pf(FOURCC_R16F),
            2,
            2,
            vec![0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF, 0x11, 0x22],
        );
        let gtf = dds_to_gtf(&dds, &ConvertOptions::default()).unwrap();

        let info = gtf.textures[0].info;
        assert_eq!(BaseFormat::Y16X16Float, info.format.base);
        assert_eq!(16, gtf.textures[0].texture_size);
        // Each half float lands in a zero extended 32 bit texel.
        assert_eq!([0xBB, 0xAA, 0x00, 0x00], gtf.data[128..132]);
        assert_eq!([0xDD, 0xCC, 0x00, 0x00], gtf.data[132..136]);
        assert_eq!([0xFF, 0xEE, 0x00, 0x00], gtf.data[136..140]);
    }

    #[test]
    fn packed_pair_swaps_even_groups() {
        let dds = dds_2d(
            fourcc_pf(FOURCC_R8G8_B8G8),
            2,
            2,
            vec![1, 2, 3, 4, 5, 6, 7, 8],
        );
        let gtf = dds_to_gtf(&dds, &ConvertOptions::default()).unwrap();

        let info = gtf.textures[0].info;
        assert_eq!(BaseFormat::CompressedB8R8G8R8, info.format.base);
        assert!(info.format.linear);
        assert_eq!(4, info.pitch);
        assert_eq!(0xAAD8, info.remap);
        assert_eq!([4, 3, 2, 1, 8, 7, 6, 5], gtf.data[128..136]);

        let back = gtf_to_dds(&gtf, 0).unwrap();
        assert_eq!(dds.data, back.data);
        assert_eq!(FOURCC_R8G8_B8G8, back.header.pixel_format.four_cc);
        assert_eq!(0, back.header.pitch_or_linear_size);
    }

    #[test]
    fn partial_cubemap_is_rejected() {
        let mut dds = dds_2d(fourcc_pf(FOURCC_DXT1), 4, 4, vec![0; 8]);
        dds.header.caps2 |= Caps2::CUBEMAP | Caps2::CUBEMAP_POSITIVEX;
        assert!(matches!(
            dds_to_gtf(&dds, &ConvertOptions::default()),
            Err(ConvertError::PartialCubemap)
        ));
    }

    #[test]
    fn oversized_volume_is_rejected() {
        let mut dds = dds_2d(fourcc_pf(FOURCC_DXT1), 4, 4, vec![0; 8]);
        dds.header.flags |= HeaderFlags::DEPTH;
        dds.header.caps2 |= Caps2::VOLUME;
        dds.header.depth = 600;
        assert!(matches!(
            dds_to_gtf(&dds, &ConvertOptions::default()),
            Err(ConvertError::VolumeTooLarge(4, 4, 600))
        ));
    }

    #[test]
    fn oversized_texture_is_rejected() {
        let pf = rgb_pf(32, [0xFF000000, 0x00FF0000, 0x0000FF00, 0x000000FF], true);
        let dds = dds_2d(pf, 8192, 4, Vec::new());
        assert!(matches!(
            dds_to_gtf(&dds, &ConvertOptions::default()),
            Err(ConvertError::TextureTooLarge(8192, 4))
        ));
    }

    #[test]
    fn excess_mipmaps_are_rejected() {
        let mut dds = dds_2d(fourcc_pf(FOURCC_DXT1), 4, 4, vec![0; 16]);
        dds.header.flags |= HeaderFlags::MIPMAP_COUNT;
        dds.header.mipmap_count = 5;
        assert!(matches!(
            dds_to_gtf(&dds, &ConvertOptions::default()),
            Err(ConvertError::TooManyMipmaps { mipmaps: 5, max: 3 })
        ));
    }

    #[test]
    fn short_payload_is_rejected() {
        let dds = dds_2d(fourcc_pf(FOURCC_DXT1), 4, 4, vec![0; 4]);
        assert!(matches!(
            dds_to_gtf(&dds, &ConvertOptions::default()),
            Err(ConvertError::DdsEof)
        ));
    }

    #[test]
    fn unknown_fourcc_is_rejected() {
        let dds = dds_2d(fourcc_pf(crate::dds::four_cc(*b"ATI1")), 4, 4, vec![0; 16]);
        assert!(matches!(
            dds_to_gtf(&dds, &ConvertOptions::default()),
            Err(ConvertError::UnsupportedPixelFormat)
        ));
    }

    #[test]
    fn missing_texture_id() {
        let dds = dds_2d(fourcc_pf(FOURCC_DXT1), 1, 1, vec![0xFF; 8]);
        let gtf = dds_to_gtf(&dds, &ConvertOptions::default()).unwrap();
        assert!(matches!(
            gtf_to_dds(&gtf, 3),
            Err(ConvertError::TextureNotFound(3))
        ));
    }

    #[test]
    fn depth_formats_have_no_dds_equivalent() {
        let dds = dds_2d(fourcc_pf(FOURCC_DXT1), 1, 1, vec![0xFF; 8]);
        let mut gtf = dds_to_gtf(&dds, &ConvertOptions::default()).unwrap();
        gtf.textures[0].info.format.base = BaseFormat::Depth16;
        assert!(matches!(
            gtf_to_dds(&gtf, 0),
            Err(ConvertError::UnsupportedTextureFormat(BaseFormat::Depth16))
        ));
    }

    #[test]
    fn classify_masked_layouts() {
        let (format, remap) =
            classify_pixel_format(&rgb_pf(32, [0, 0xFF0000, 0xFF00, 0xFF], false)).unwrap();
        assert_eq!(BaseFormat::D8R8G8B8, format);
        assert_eq!(u16::from(Remap::order_1rgb()), u16::from(remap));

        let (format, remap) =
            classify_pixel_format(&rgb_pf(32, [0xFF000000, 0xFF, 0xFF00, 0xFF0000], true))
                .unwrap();
        assert_eq!(BaseFormat::A8R8G8B8, format);
        assert_eq!(u16::from(Remap::order_abgr()), u16::from(remap));

        let (format, remap) =
            classify_pixel_format(&rgb_pf(16, [0, 0xF800, 0x07E0, 0x001F], false)).unwrap();
        assert_eq!(BaseFormat::R5G6B5, format);
        assert_eq!(u16::from(Remap::order_1rgb()), u16::from(remap));

        let (format, _) =
            classify_pixel_format(&rgb_pf(16, [0x8000, 0x7C00, 0x03E0, 0x001F], true)).unwrap();
        assert_eq!(BaseFormat::A1R5G5B5, format);

        let (format, _) =
            classify_pixel_format(&rgb_pf(32, [0, 0xFFFF, 0xFFFF0000, 0], false)).unwrap();
        assert_eq!(BaseFormat::Y16X16, format);

        let (format, _) =
            classify_pixel_format(&rgb_pf(24, [0, 0xFF0000, 0xFF00, 0xFF], false)).unwrap();
        assert_eq!(BaseFormat::D8R8G8B8, format);
    }

    #[test]
    fn classify_luminance_and_alpha() {
        let l8 = DdsPixelFormat {
            flags: PixelFormatFlags::LUMINANCE,
            rgb_bit_count: 8,
            r_bit_mask: 0xFF,
            ..Default::default()
        };
        let (format, remap) = classify_pixel_format(&l8).unwrap();
        assert_eq!(BaseFormat::B8, format);
        assert_eq!(u16::from(Remap::order_1bbb()), u16::from(remap));

        let a8 = DdsPixelFormat {
            flags: PixelFormatFlags::ALPHA,
            rgb_bit_count: 8,
            a_bit_mask: 0xFF,
            ..Default::default()
        };
        let (format, remap) = classify_pixel_format(&a8).unwrap();
        assert_eq!(BaseFormat::B8, format);
        assert_eq!(u16::from(Remap::order_b000()), u16::from(remap));

        let l16 = DdsPixelFormat {
            flags: PixelFormatFlags::LUMINANCE,
            rgb_bit_count: 16,
            r_bit_mask: 0xFFFF,
            ..Default::default()
        };
        assert_eq!(BaseFormat::X16, classify_pixel_format(&l16).unwrap().0);

        let a8l8 = DdsPixelFormat {
            flags: PixelFormatFlags::LUMINANCE | PixelFormatFlags::ALPHA_PIXELS,
            rgb_bit_count: 16,
            a_bit_mask: 0xFF00,
            r_bit_mask: 0x00FF,
            ..Default::default()
        };
        assert_eq!(BaseFormat::G8B8, classify_pixel_format(&a8l8).unwrap().0);
    }

    #[test]
    fn classify_bump_layouts() {
        let v8u8 = DdsPixelFormat {
            flags: PixelFormatFlags::BUMP_DUDV,
            rgb_bit_count: 16,
            r_bit_mask: 0x00FF,
            g_bit_mask: 0xFF00,
            ..Default::default()
        };
        assert_eq!(BaseFormat::Y16X16, classify_pixel_format(&v8u8).unwrap().0);

        let q8w8v8u8 = DdsPixelFormat {
            flags: PixelFormatFlags::BUMP_DUDV,
            rgb_bit_count: 32,
            a_bit_mask: 0xFF000000,
            r_bit_mask: 0x00FF0000,
            g_bit_mask: 0x0000FF00,
            b_bit_mask: 0x000000FF,
            ..Default::default()
        };
        assert_eq!(
            BaseFormat::A8R8G8B8,
            classify_pixel_format(&q8w8v8u8).unwrap().0
        );
    }

    #[test]
    fn classify_falls_back_on_bit_count() {
        let bare = DdsPixelFormat {
            rgb_bit_count: 128,
            ..Default::default()
        };
        assert_eq!(
            BaseFormat::W32Z32Y32X32Float,
            classify_pixel_format(&bare).unwrap().0
        );
    }
}
