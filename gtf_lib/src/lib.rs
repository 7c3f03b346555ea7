//! # gtf_lib
//! gtf_lib converts between DirectDraw Surface (`.dds`) files and the
//! PLAYSTATION 3 Graphics Texture Format (`.gtf`) without decoding any
//! pixels. Headers are translated, and image bytes are moved with the
//! per-format endian swap and, for power-of-two textures, the Morton-order
//! swizzle the RSX samples from.
//!
//! # Overview
//! A DDS file is little-endian and stores its payload row-major in the
//! order `Face 0 Mip 0, Face 0 Mip 1, ... Face F-1 Mip M-1`. A GTF file is
//! big-endian and places each texture's payload on a 128 byte boundary,
//! either linear with an explicit pitch or swizzled. [convert::dds_to_gtf],
//! [convert::gtf_to_dds], and [convert::pack_gtf] drive a conversion end to
//! end; [Dds] and [Gtf] are the parsed containers.
//!
//! Pixels are never resampled or recompressed, so converting a file and
//! converting it back reproduces the original payload bit for bit.
pub mod convert;
pub mod dds;
pub mod format;
pub mod gtf;
pub mod layout;
pub mod swizzle;
pub mod transfer;

pub use convert::{ConvertError, ConvertOptions, dds_to_gtf, gtf_to_dds, pack_gtf};
pub use dds::Dds;
pub use gtf::Gtf;

macro_rules! binrw_bitflags_impl {
    ($($ty:ty),*) => {
        $(
            impl binrw::BinRead for $ty {
                type Args<'a> = ();

                fn read_options<R: std::io::Read + std::io::Seek>(
                    reader: &mut R,
                    endian: binrw::Endian,
                    _args: Self::Args<'_>,
                ) -> binrw::BinResult<Self> {
                    // Unknown bits are preserved so files round trip.
                    let value = u32::read_options(reader, endian, ())?;
                    Ok(Self::from_bits_retain(value))
                }
            }

            impl binrw::BinWrite for $ty {
                type Args<'a> = ();

                fn write_options<W: std::io::Write + std::io::Seek>(
                    &self,
                    writer: &mut W,
                    endian: binrw::Endian,
                    _args: Self::Args<'_>,
                ) -> binrw::BinResult<()> {
                    self.bits().write_options(writer, endian, ())
                }
            }

            #[cfg(feature = "arbitrary")]
            impl<'a> arbitrary::Arbitrary<'a> for $ty {
                fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
                    Ok(Self::from_bits_retain(u.arbitrary()?))
                }
            }
        )*
    };
}
pub(crate) use binrw_bitflags_impl;
