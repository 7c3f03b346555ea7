//! Byte movement between DDS and GTF payloads.
//!
//! The copy primitives reverse fixed byte groups to cross the little
//! endian / big endian boundary. Group reversal is an involution, so the
//! same primitives serve both directions; [Buffers] names which side is
//! the destination.
use std::ops::Range;

use crate::convert::ConvertError;
use crate::format::{BaseFormat, InvertKind};
use crate::gtf::{Dimension, GtfTextureInfo};
use crate::layout::{Layout, uses_swizzled_layout};
use crate::swizzle::swizzle_offset_3d;

/// Copy bytes unmodified.
pub fn copy(dst: &mut [u8], src: &[u8]) {
    dst.copy_from_slice(src);
}

/// Copy bytes, reversing every 2 byte group. A trailing byte that does not
/// fill a group is copied unmodified.
pub fn copy_swap16(dst: &mut [u8], src: &[u8]) {
    for (d, s) in dst.chunks_exact_mut(2).zip(src.chunks_exact(2)) {
        d[0] = s[1];
        d[1] = s[0];
    }
    let tail = src.len() - src.len() % 2;
    dst[tail..].copy_from_slice(&src[tail..]);
}

/// Copy bytes, reversing every 4 byte group. Trailing bytes that do not
/// fill a group are copied unmodified.
pub fn copy_swap32(dst: &mut [u8], src: &[u8]) {
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        d[0] = s[3];
        d[1] = s[2];
        d[2] = s[1];
        d[3] = s[0];
    }
    let tail = src.len() - src.len() % 4;
    dst[tail..].copy_from_slice(&src[tail..]);
}

fn apply(kind: InvertKind, dst: &mut [u8], src: &[u8]) {
    match kind {
        InvertKind::None => copy(dst, src),
        InvertKind::Swap16 => copy_swap16(dst, src),
        // The even pixel rule is handled by the caller, which only visits
        // group starts; the group itself is a plain 32 bit reversal.
        InvertKind::Swap32 | InvertKind::Swap32Even => copy_swap32(dst, src),
    }
}

/// The two payload buffers of one conversion, tagged with the direction so
/// every transfer writes the correct side.
pub(crate) enum Buffers<'a> {
    DdsToGtf { dds: &'a [u8], gtf: &'a mut [u8] },
    GtfToDds { gtf: &'a [u8], dds: &'a mut [u8] },
}

impl Buffers<'_> {
    fn dds_len(&self) -> usize {
        match self {
            Self::DdsToGtf { dds, .. } => dds.len(),
            Self::GtfToDds { dds, .. } => dds.len(),
        }
    }

    fn gtf_len(&self) -> usize {
        match self {
            Self::DdsToGtf { gtf, .. } => gtf.len(),
            Self::GtfToDds { gtf, .. } => gtf.len(),
        }
    }

    fn transfer(&mut self, dds: Range<usize>, gtf: Range<usize>, kind: InvertKind) {
        match self {
            Self::DdsToGtf { dds: src, gtf: dst } => apply(kind, &mut dst[gtf], &src[dds]),
            Self::GtfToDds { gtf: src, dds: dst } => apply(kind, &mut dst[dds], &src[gtf]),
        }
    }

    /// Transfer one pixel whose DDS encoding is narrower than its GTF
    /// encoding. The missing bytes read as zero so a tightly sized DDS
    /// buffer is never overrun.
    fn transfer_expanded(
        &mut self,
        dds_offset: usize,
        dds_depth: usize,
        gtf: Range<usize>,
        kind: InvertKind,
    ) {
        let mut staging = [0u8; 4];
        match self {
            Self::DdsToGtf { dds: src, gtf: dst } => {
                staging[..dds_depth].copy_from_slice(&src[dds_offset..dds_offset + dds_depth]);
                apply(kind, &mut dst[gtf.clone()], &staging[..gtf.len()]);
            }
            Self::GtfToDds { gtf: src, dds: dst } => {
                apply(kind, &mut staging[..gtf.len()], &src[gtf.clone()]);
                dst[dds_offset..dds_offset + dds_depth].copy_from_slice(&staging[..dds_depth]);
            }
        }
    }
}

/// Move one layout record between the two payloads.
pub(crate) fn move_layout(
    buffers: &mut Buffers<'_>,
    layout: &Layout,
    info: &GtfTextureInfo,
) -> Result<(), ConvertError> {
    if layout.width == 0 || layout.height == 0 || layout.depth == 0 {
        return Ok(());
    }
    let raw = info.format.base;
    let swizzled = uses_swizzled_layout(info);
    if raw.is_dxtn() {
        if !swizzled {
            move_dxt_linear(buffers, layout)
        } else if info.dimension == Dimension::D3 {
            move_dxt_volume(buffers, layout)
        } else {
            move_dxt_packed(buffers, layout)
        }
    } else {
        move_pixels(buffers, layout, raw, swizzled)
    }
}

/// Volume texture compression ordering: DXT blocks are regrouped so up to
/// four depth slices interleave within each super block.
fn move_dxt_volume(buffers: &mut Buffers<'_>, layout: &Layout) -> Result<(), ConvertError> {
    let block_bytes = layout.color_depth as usize;
    let block_w = layout.width.div_ceil(4) as usize;
    let block_h = layout.height.div_ceil(4) as usize;
    let block_d = layout.depth.div_ceil(4) as usize;
    let depth_block_num = (layout.depth as usize - 1) % 4 + 1;
    let slice_size = block_w * block_h * block_bytes;

    let dds_base = layout.dds_offset as usize;
    let gtf_base = layout.gtf_swizzle_offset as usize;
    check_dds(buffers, dds_base + layout.dds_size as usize)?;
    check_gtf(buffers, gtf_base + layout.gtf_swizzle_size as usize)?;

    let mut gtf_pos = gtf_base;
    for z in 0..block_d {
        for y in 0..block_h {
            for x in 0..block_w {
                for d in 0..depth_block_num {
                    let dds_pos =
                        dds_base + slice_size * (z * 4 + d) + block_bytes * (x + y * block_w);
                    buffers.transfer(
                        dds_pos..dds_pos + block_bytes,
                        gtf_pos..gtf_pos + block_bytes,
                        InvertKind::None,
                    );
                    gtf_pos += block_bytes;
                }
            }
        }
    }
    Ok(())
}

/// Power of two 2D DXT payloads are identical on both sides.
fn move_dxt_packed(buffers: &mut Buffers<'_>, layout: &Layout) -> Result<(), ConvertError> {
    let dds_base = layout.dds_offset as usize;
    let gtf_base = layout.gtf_swizzle_offset as usize;
    let size = layout.dds_size as usize;
    check_dds(buffers, dds_base + size)?;
    check_gtf(buffers, gtf_base + size)?;
    buffers.transfer(dds_base..dds_base + size, gtf_base..gtf_base + size, InvertKind::None);
    Ok(())
}

/// Non power of two DXT payloads copy block row by block row onto the GTF
/// pitch.
fn move_dxt_linear(buffers: &mut Buffers<'_>, layout: &Layout) -> Result<(), ConvertError> {
    let block_pitch = (layout.width.div_ceil(4) * layout.color_depth) as usize;
    let block_h = layout.height.div_ceil(4) as usize;
    let depth = layout.depth as usize;
    let gtf_pitch = layout.pitch as usize;

    let dds_base = layout.dds_offset as usize;
    let gtf_base = layout.gtf_linear_offset as usize;
    check_dds(buffers, dds_base + depth * block_h * block_pitch)?;
    check_gtf(buffers, gtf_base + depth * block_h * gtf_pitch)?;

    for z in 0..depth {
        for y in 0..block_h {
            let dds_pos = dds_base + (z * block_h + y) * block_pitch;
            let gtf_pos = gtf_base + (z * block_h + y) * gtf_pitch;
            buffers.transfer(
                dds_pos..dds_pos + block_pitch,
                gtf_pos..gtf_pos + block_pitch,
                InvertKind::None,
            );
        }
    }
    Ok(())
}

fn move_pixels(
    buffers: &mut Buffers<'_>,
    layout: &Layout,
    raw: BaseFormat,
    swizzled: bool,
) -> Result<(), ConvertError> {
    let kind = raw.invert_kind();
    let mut width = layout.width as usize;
    let mut color_depth = layout.color_depth as usize;
    let height = layout.height as usize;
    let depth = layout.depth as usize;

    // Swizzle addressing works on at most 32 bit cells, so wide float
    // pixels swizzle as runs of consecutive cells.
    if swizzled && raw == BaseFormat::W32Z32Y32X32Float {
        width *= 4;
        color_depth = 4;
    }
    if swizzled && raw == BaseFormat::W16Z16Y16X16Float {
        width *= 2;
        color_depth = 4;
    }
    if raw.is_packed_pair() {
        width = width.next_multiple_of(2);
    }

    let copy_size = match kind {
        InvertKind::None => 0,
        InvertKind::Swap16 | InvertKind::Swap32 => color_depth,
        InvertKind::Swap32Even => 4,
    };
    if copy_size == 0 {
        return Ok(());
    }

    let (dds_depth, dds_pitch) = if layout.dds_expand {
        (layout.dds_depth as usize, layout.dds_pitch as usize)
    } else {
        (color_depth, width * color_depth)
    };
    let gtf_pitch = layout.pitch as usize;
    let dds_base = layout.dds_offset as usize;
    let gtf_base = if swizzled {
        layout.gtf_swizzle_offset
    } else {
        layout.gtf_linear_offset
    } as usize;

    let last_x = if kind == InvertKind::Swap32Even {
        width - 2
    } else {
        width - 1
    };
    let pixel_read = if layout.dds_expand { dds_depth } else { copy_size };
    check_dds(
        buffers,
        dds_base + ((depth - 1) * height + height - 1) * dds_pitch + last_x * dds_depth + pixel_read,
    )?;
    let gtf_max = if swizzled {
        gtf_base + width * height * depth * color_depth
    } else {
        gtf_base + ((depth - 1) * height + height - 1) * gtf_pitch + last_x * color_depth + copy_size
    };
    check_gtf(buffers, gtf_max)?;

    let (log2_w, log2_h, log2_d) = if swizzled {
        (
            (width as u32).trailing_zeros(),
            (height as u32).trailing_zeros(),
            (depth as u32).trailing_zeros(),
        )
    } else {
        (0, 0, 0)
    };

    for z in 0..depth {
        for y in 0..height {
            for x in 0..width {
                if kind == InvertKind::Swap32Even && x % 2 != 0 {
                    continue;
                }
                let gtf_pos = if swizzled {
                    gtf_base
                        + swizzle_offset_3d(x as u32, y as u32, z as u32, log2_w, log2_h, log2_d)
                            as usize
                            * color_depth
                } else {
                    gtf_base + (z * height + y) * gtf_pitch + x * color_depth
                };
                let dds_pos = dds_base + (z * height + y) * dds_pitch + x * dds_depth;
                if layout.dds_expand {
                    buffers.transfer_expanded(dds_pos, dds_depth, gtf_pos..gtf_pos + copy_size, kind);
                } else {
                    buffers.transfer(
                        dds_pos..dds_pos + copy_size,
                        gtf_pos..gtf_pos + copy_size,
                        kind,
                    );
                }
            }
        }
    }
    Ok(())
}

fn check_dds(buffers: &Buffers<'_>, max_offset: usize) -> Result<(), ConvertError> {
    if max_offset > buffers.dds_len() {
        Err(ConvertError::DdsOverflow)
    } else {
        Ok(())
    }
}

fn check_gtf(buffers: &Buffers<'_>, max_offset: usize) -> Result<(), ConvertError> {
    if max_offset > buffers.gtf_len() {
        Err(ConvertError::GtfOverflow)
    } else {
        Ok(())
    }
}
