//! Sub-image layout planning.
//!
//! Conversion walks a table with one record per face and mip level. Each
//! record carries the region the sub-image occupies on the DDS side and on
//! both possible GTF sides, so the byte mover never recomputes geometry.
use crate::gtf::{ALIGNMENT, Dimension, GtfTextureInfo};

/// Placement of one face and mip level in both containers.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct Layout {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    /// GTF row stride for a linear destination.
    pub pitch: u32,
    /// Bytes per pixel, or per block for DXT formats.
    pub color_depth: u32,
    /// Bytes per pixel on the DDS side when the payload is narrower than
    /// the GTF format, 0 otherwise.
    pub dds_depth: u32,
    pub dds_expand: bool,
    pub dds_offset: u64,
    pub dds_size: u64,
    pub dds_pitch: u32,
    pub gtf_linear_offset: u64,
    pub gtf_linear_size: u64,
    pub gtf_swizzle_offset: u64,
    pub gtf_swizzle_size: u64,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct LayoutPlan {
    pub layouts: Vec<Layout>,
    pub dds_image_size: u64,
    /// Total payload size on the GTF side for the layout the texture
    /// actually uses.
    pub gtf_image_size: u64,
}

/// Whether the payload described by `info` is stored swizzled.
///
/// DXT formats never set the linear flag. Their payload is tightly packed
/// block data when every dimension is a power of two and row major with an
/// explicit pitch otherwise.
pub fn uses_swizzled_layout(info: &GtfTextureInfo) -> bool {
    if info.format.base.is_dxtn() {
        pow2_or_zero(info.width as u32)
            && pow2_or_zero(info.height as u32)
            && pow2_or_zero(info.depth as u32)
    } else {
        !info.format.linear
    }
}

pub(crate) fn pow2_or_zero(value: u32) -> bool {
    value == 0 || value.is_power_of_two()
}

/// Lay out every face and mip level of `info`.
///
/// `dds_depth` is nonzero only for DDS payloads that are narrower than the
/// GTF pixel (R16F and 24 bit RGB) and overrides the DDS side geometry.
pub fn plan(info: &GtfTextureInfo, dds_depth: u32) -> LayoutPlan {
    let raw = info.format.base;
    let color_depth = raw.bytes_per_pixel();
    let swizzled = uses_swizzled_layout(info);
    let faces = if info.cubemap { 6 } else { 1 };
    let mipmaps = info.mipmap.max(1) as u32;
    let base_depth = if info.dimension == Dimension::D3 {
        info.depth as u32
    } else {
        1
    };

    let mut layouts = Vec::with_capacity((faces * mipmaps) as usize);
    let mut dds_offset = 0u64;
    let mut linear_offset = 0u64;
    let mut swizzle_offset = 0u64;

    for face in 0..faces {
        for mip in 0..mipmaps {
            let shifted_w = info.width as u32 >> mip;
            let shifted_h = info.height as u32 >> mip;
            let shifted_d = base_depth >> mip;
            if shifted_w == 0 && shifted_h == 0 && shifted_d == 0 {
                break;
            }
            let width = shifted_w.max(1);
            let height = shifted_h.max(1);
            let depth = shifted_d.max(1);

            let pitch = raw.pitch(width);
            let (dds_size, swizzle_size, linear_size) = if raw.is_dxtn() {
                let blocks =
                    (width.div_ceil(4) * height.div_ceil(4)) as u64 * color_depth as u64;
                (blocks, blocks, height.div_ceil(4) as u64 * pitch as u64)
            } else if raw.is_packed_pair() {
                let packed = width.div_ceil(2) as u64 * height as u64 * 4;
                (packed, packed, height as u64 * pitch as u64)
            } else {
                let tight = width as u64 * height as u64 * color_depth as u64;
                (tight, tight, height as u64 * pitch as u64)
            };
            let mut dds_size = dds_size * depth as u64;
            let swizzle_size = swizzle_size * depth as u64;
            let linear_size = linear_size * depth as u64;

            let mut dds_pitch = pitch;
            if dds_depth != 0 {
                dds_pitch = width * dds_depth;
                dds_size = dds_pitch as u64 * height as u64;
            }

            // Swizzled cube faces start on an alignment boundary.
            if swizzled && face > 0 && mip == 0 {
                swizzle_offset = swizzle_offset.next_multiple_of(ALIGNMENT as u64);
            }

            layouts.push(Layout {
                width,
                height,
                depth,
                pitch,
                color_depth,
                dds_depth,
                dds_expand: dds_depth != 0,
                dds_offset,
                dds_size,
                dds_pitch,
                gtf_linear_offset: linear_offset,
                gtf_linear_size: linear_size,
                gtf_swizzle_offset: swizzle_offset,
                gtf_swizzle_size: swizzle_size,
            });
            dds_offset += dds_size;
            linear_offset += linear_size;
            swizzle_offset += swizzle_size;
        }
    }

    LayoutPlan {
        layouts,
        dds_image_size: dds_offset,
        gtf_image_size: if swizzled {
            swizzle_offset
        } else {
            linear_offset
        },
    }
}
