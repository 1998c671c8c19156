//! HID report descriptor scanning
//!
//! Walks the item stream of a report descriptor (HID 1.11, section 6.2.2) far
//! enough to find the device's top-level Usage Page and Usage. Only the first
//! pair is reported; no attempt is made to interpret collections or report
//! layouts.
//!
//! Malformed input never panics: values whose bytes would run past the end of
//! the buffer read as zero, and a truncated descriptor simply ends the scan.

use crate::types::{DT_HID, DT_REPORT, MAX_REPORT_DESCRIPTOR_SIZE};

/// Item tag (with size bits masked off) for Usage Page
pub const TAG_USAGE_PAGE: u8 = 0x04;

/// Item tag (with size bits masked off) for Usage
pub const TAG_USAGE: u8 = 0x08;

/// Header byte prefix marking a Long Item
const LONG_ITEM_PREFIX: u8 = 0xf0;

/// A single item header located in a report descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Item {
    /// Offset of the item's first header byte
    pub offset: usize,
    /// The raw header (key) byte
    pub key: u8,
    /// Length of the item's data section
    pub data_len: usize,
    /// Length of the item header (1 for short items, 3 for long items)
    pub header_len: usize,
}

impl Item {
    /// Tag and type bits of a short item's key
    pub fn tag(&self) -> u8 {
        self.key & 0xfc
    }

    /// Whether this is a Long Item
    pub fn is_long(&self) -> bool {
        self.key & 0xf0 == LONG_ITEM_PREFIX
    }
}

/// Iterator over the items of a report descriptor
#[derive(Debug, Clone)]
pub struct Items<'a> {
    bytes: &'a [u8],
    pos: usize,
}

/// Iterate over the items of `bytes`
pub fn items(bytes: &[u8]) -> Items<'_> {
    Items { bytes, pos: 0 }
}

impl Iterator for Items<'_> {
    type Item = Item;

    fn next(&mut self) -> Option<Item> {
        let key = *self.bytes.get(self.pos)?;

        let item = if key & 0xf0 == LONG_ITEM_PREFIX {
            // bDataSize follows the prefix; a missing size byte means a
            // truncated descriptor, treated as an empty item.
            let data_len = self.bytes.get(self.pos + 1).copied().unwrap_or(0) as usize;
            Item {
                offset: self.pos,
                key,
                data_len,
                header_len: 3,
            }
        } else {
            let data_len = match key & 0x3 {
                3 => 4,
                n => n as usize,
            };
            Item {
                offset: self.pos,
                key,
                data_len,
                header_len: 1,
            }
        };

        self.pos = self.pos.saturating_add(item.data_len + item.header_len);
        Some(item)
    }
}

/// Read a little-endian value of `num_bytes` (0, 1, 2 or 4) that follows the
/// one-byte header at `cur`. Returns 0 if the value would run past the buffer.
fn item_value(bytes: &[u8], num_bytes: usize, cur: usize) -> u32 {
    if num_bytes == 0 || cur + num_bytes >= bytes.len() {
        return 0;
    }

    match num_bytes {
        1 => bytes[cur + 1] as u32,
        2 => u16::from_le_bytes([bytes[cur + 1], bytes[cur + 2]]) as u32,
        4 => u32::from_le_bytes([
            bytes[cur + 1],
            bytes[cur + 2],
            bytes[cur + 3],
            bytes[cur + 4],
        ]),
        _ => 0,
    }
}

/// A Usage Page / Usage pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Usage {
    pub usage_page: u16,
    pub usage: u16,
}

/// Result of scanning for the first Usage Page / Usage
///
/// Either field may be missing when the descriptor ends first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UsageScan {
    pub usage_page: Option<u16>,
    pub usage: Option<u16>,
}

impl UsageScan {
    /// Both values, if both were found
    pub fn complete(&self) -> Option<Usage> {
        Some(Usage {
            usage_page: self.usage_page?,
            usage: self.usage?,
        })
    }

    /// Whatever was found, with missing values reported as zero
    pub fn or_zero(&self) -> Usage {
        Usage {
            usage_page: self.usage_page.unwrap_or(0),
            usage: self.usage.unwrap_or(0),
        }
    }
}

/// Find the first Usage Page and Usage in a report descriptor
///
/// Scanning stops as soon as both are known. A 4-byte Usage item carries an
/// extended usage: the upper 16 bits are the Usage Page and the lower 16 bits
/// the Usage (HID 1.11, section 6.2.2.8).
pub fn find_first_usage(descriptor: &[u8]) -> UsageScan {
    let mut scan = UsageScan::default();

    for item in items(descriptor) {
        if item.is_long() {
            continue;
        }

        match item.tag() {
            TAG_USAGE_PAGE => {
                scan.usage_page = Some(item_value(descriptor, item.data_len, item.offset) as u16);
            }
            TAG_USAGE if item.data_len == 4 => {
                scan.usage_page = Some(item_value(descriptor, 2, item.offset + 2) as u16);
                scan.usage = Some(item_value(descriptor, 2, item.offset) as u16);
            }
            TAG_USAGE => {
                scan.usage = Some(item_value(descriptor, item.data_len, item.offset) as u16);
            }
            _ => {}
        }

        if scan.complete().is_some() {
            break;
        }
    }

    scan
}

/// Declared report descriptor length from an interface's class descriptors
///
/// `extra` holds the descriptors that follow the interface descriptor; the
/// HID class descriptor (HID 1.11, section 6.2.1) lists the length of each
/// subordinate descriptor. Returns [`MAX_REPORT_DESCRIPTOR_SIZE`] when no
/// usable HID descriptor is present.
pub fn report_descriptor_length(extra: &[u8]) -> u16 {
    let mut rest = extra;

    while rest.len() >= 2 {
        if rest[1] == DT_HID {
            if rest.len() < 6 {
                break;
            }

            let num_descriptors = rest[5] as usize;
            if rest.len() < 6 + 3 * num_descriptors {
                break;
            }

            return (0..num_descriptors)
                .map(|i| &rest[6 + 3 * i..9 + 3 * i])
                .find(|entry| entry[0] == DT_REPORT)
                .map(|entry| u16::from_le_bytes([entry[1], entry[2]]))
                .unwrap_or(MAX_REPORT_DESCRIPTOR_SIZE);
        }

        let len = rest[0] as usize;
        if len == 0 || len > rest.len() {
            break;
        }
        rest = &rest[len..];
    }

    MAX_REPORT_DESCRIPTOR_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    // Generic desktop / mouse, as emitted by most boot mice
    const MOUSE: &[u8] = &[
        0x05, 0x01, // Usage Page (Generic Desktop)
        0x09, 0x02, // Usage (Mouse)
        0xa1, 0x01, // Collection (Application)
        0x09, 0x01, //   Usage (Pointer)
        0xc0, // End Collection
    ];

    #[test]
    fn test_mouse_descriptor() {
        let usage = find_first_usage(MOUSE).complete().unwrap();
        assert_eq!(usage.usage_page, 0x01);
        assert_eq!(usage.usage, 0x02);
    }

    #[test]
    fn test_two_byte_usage_page() {
        // Vendor page 0xff00, usage 0x01
        let desc = [0x06, 0x00, 0xff, 0x09, 0x01, 0xa1, 0x01];
        let usage = find_first_usage(&desc).complete().unwrap();
        assert_eq!(usage.usage_page, 0xff00);
        assert_eq!(usage.usage, 0x01);
    }

    #[test]
    fn test_extended_usage() {
        // 4-byte Usage: usage 0x0005, page 0x000c
        let desc = [0x0b, 0x05, 0x00, 0x0c, 0x00];
        let usage = find_first_usage(&desc).complete().unwrap();
        assert_eq!(usage.usage_page, 0x000c);
        assert_eq!(usage.usage, 0x0005);
    }

    #[test]
    fn test_long_item_is_skipped() {
        let desc = [
            0xfe, 0x02, 0x10, 0xaa, 0xbb, // Long item, 2 data bytes
            0x05, 0x0d, // Usage Page (Digitizer)
            0x09, 0x04, // Usage (Touch Screen)
        ];
        let usage = find_first_usage(&desc).complete().unwrap();
        assert_eq!(usage, Usage { usage_page: 0x0d, usage: 0x04 });
    }

    #[test]
    fn test_missing_usage_is_partial() {
        let desc = [0x05, 0x01, 0xa1, 0x01, 0xc0];
        let scan = find_first_usage(&desc);
        assert_eq!(scan.usage_page, Some(0x01));
        assert_eq!(scan.usage, None);
        assert!(scan.complete().is_none());
        assert_eq!(scan.or_zero(), Usage { usage_page: 1, usage: 0 });
    }

    #[test]
    fn test_truncated_value_reads_zero() {
        // Usage Page claims 2 data bytes but only 1 is present
        let desc = [0x09, 0x30, 0x06, 0x01];
        let scan = find_first_usage(&desc);
        assert_eq!(scan.usage, Some(0x30));
        assert_eq!(scan.usage_page, Some(0));
    }

    #[test]
    fn test_truncated_long_item() {
        let scan = find_first_usage(&[0xfe]);
        assert_eq!(scan, UsageScan::default());
    }

    #[test]
    fn test_empty_descriptor() {
        assert_eq!(find_first_usage(&[]), UsageScan::default());
        assert_eq!(items(&[]).count(), 0);
    }

    #[test]
    fn test_item_iteration() {
        let offsets: Vec<usize> = items(MOUSE).map(|i| i.offset).collect();
        assert_eq!(offsets, vec![0, 2, 4, 6, 8]);
    }

    #[test]
    fn test_report_descriptor_length() {
        // HID descriptor: bLength 9, type 0x21, bcdHID 1.11, country 0,
        // 1 descriptor: type 0x22 length 0x003f
        let extra = [0x09, 0x21, 0x11, 0x01, 0x00, 0x01, 0x22, 0x3f, 0x00];
        assert_eq!(report_descriptor_length(&extra), 0x3f);
    }

    #[test]
    fn test_report_descriptor_length_after_other_descriptor() {
        let extra = [
            0x03, 0x24, 0x00, // unrelated class descriptor
            0x09, 0x21, 0x11, 0x01, 0x00, 0x01, 0x22, 0x34, 0x12,
        ];
        assert_eq!(report_descriptor_length(&extra), 0x1234);
    }

    #[test]
    fn test_report_descriptor_length_broken() {
        assert_eq!(report_descriptor_length(&[]), MAX_REPORT_DESCRIPTOR_SIZE);
        // zero-sized descriptor stops the walk
        assert_eq!(
            report_descriptor_length(&[0x00, 0x24, 0x00]),
            MAX_REPORT_DESCRIPTOR_SIZE
        );
        // HID descriptor that claims more entries than it carries
        assert_eq!(
            report_descriptor_length(&[0x09, 0x21, 0x11, 0x01, 0x00, 0x02, 0x22, 0x10, 0x00]),
            MAX_REPORT_DESCRIPTOR_SIZE
        );
        // HID descriptor without a report entry
        assert_eq!(
            report_descriptor_length(&[0x09, 0x21, 0x11, 0x01, 0x00, 0x01, 0x23, 0x10, 0x00]),
            MAX_REPORT_DESCRIPTOR_SIZE
        );
    }
}

/// Property-based tests using proptest
#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Arbitrary bytes, mostly not a well-formed descriptor
    fn descriptor_strategy() -> impl Strategy<Value = Vec<u8>> {
        proptest::collection::vec(any::<u8>(), 0..256)
    }

    proptest! {
        /// Property: scanning never panics, whatever the input
        #[test]
        fn prop_scan_never_panics(desc in descriptor_strategy()) {
            let _ = find_first_usage(&desc);
            let _ = report_descriptor_length(&desc);
        }

        /// Property: item offsets are strictly increasing and start inside the buffer
        #[test]
        fn prop_items_stay_in_bounds(desc in descriptor_strategy()) {
            let mut last = None;
            for item in items(&desc) {
                prop_assert!(item.offset < desc.len());
                if let Some(prev) = last {
                    prop_assert!(item.offset > prev);
                }
                last = Some(item.offset);
            }
        }

        /// Property: a leading 1-byte Usage Page and Usage are always found
        #[test]
        fn prop_leading_pair_is_found(
            page in any::<u8>(),
            usage in any::<u8>(),
            tail in descriptor_strategy(),
        ) {
            let mut desc = vec![0x05, page, 0x09, usage];
            desc.extend_from_slice(&tail);
            // the final value byte must not be the last byte of the buffer
            desc.push(0xc0);

            let found = find_first_usage(&desc).complete();
            prop_assert_eq!(found, Some(Usage { usage_page: page as u16, usage: usage as u16 }));
        }
    }
}
