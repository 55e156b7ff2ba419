use crate::dataloader::error::{DataLoaderError, Result};

use super::volume::Volume;

/// Unsigned integer element of a packed label map. Each bit marks membership
/// in one ROI.
pub trait LabelMapElement: Copy + Send + Sync {
    const BITS: u32;

    fn bit_is_set(self, bit: u32) -> bool;
}

macro_rules! impl_label_map_element {
    ($($t:ty),*) => {
        $(
            impl LabelMapElement for $t {
                const BITS: u32 = <$t>::BITS;

                fn bit_is_set(self, bit: u32) -> bool {
                    (self >> bit) & 1 != 0
                }
            }
        )*
    };
}

impl_label_map_element!(u8, u16, u32, u64);

/// Extracts the boolean mask of one ROI from a packed label map.
///
/// ROI numbers are 0-based bit indices: ROI `k` tests bit `k`, with bit 0 the
/// least significant. `roi_number` must be below the element width.
pub fn extract_roi_mask<T: LabelMapElement>(
    label_map: &Volume<T>,
    roi_number: u32,
) -> Result<Volume<bool>> {
    if roi_number >= T::BITS {
        return Err(DataLoaderError::RoiOutOfRange {
            roi: roi_number,
            bits: T::BITS,
        });
    }

    Ok(label_map.map(|v| v.bit_is_set(roi_number)))
}
