//! HID report descriptor parser.
//!
//! Turns the raw descriptor a device hands out at open time into the schema the
//! [`decoder`](crate::decoder) needs:
//! - one [`DeviceItem`] per top-level collection, tagged with its usage
//!   (Mouse, Joystick, Gamepad, ...);
//! - for each item, the [`ReportField`]s of its input reports: report ID, bit
//!   position, element size/count, logical range, flags and usages.
//!
//! Only what input decoding needs is kept. Output/feature items are skipped,
//! physical ranges/units are ignored, and constant (padding) fields only advance
//! the bit cursor.
//!
//! ## Usage resolution
//! One- and two-byte `Usage`/`Usage Minimum`/`Usage Maximum` items are combined with
//! the usage page in effect when the local item is read. Four-byte items carry
//! their own page.

use std::collections::BTreeMap;

use crate::error::DescriptorError;
use crate::usage;

/// Upper bound on usages expanded from a single `Usage Minimum..Maximum` pair.
const MAX_EXPANDED_USAGES: usize = 4096;

/// Largest input report payload accepted, in bits.
pub const MAX_REPORT_BITS: u32 = 8 * 4096;

const ITEM_TYPE_MAIN: u8 = 0;
const ITEM_TYPE_GLOBAL: u8 = 1;
const ITEM_TYPE_LOCAL: u8 = 2;
const LONG_ITEM_PREFIX: u8 = 0xFE;

// Main item tags.
const TAG_INPUT: u8 = 0x8;
const TAG_OUTPUT: u8 = 0x9;
const TAG_COLLECTION: u8 = 0xA;
const TAG_FEATURE: u8 = 0xB;
const TAG_END_COLLECTION: u8 = 0xC;

// Global item tags.
const TAG_USAGE_PAGE: u8 = 0x0;
const TAG_LOGICAL_MIN: u8 = 0x1;
const TAG_LOGICAL_MAX: u8 = 0x2;
const TAG_REPORT_SIZE: u8 = 0x7;
const TAG_REPORT_ID: u8 = 0x8;
const TAG_REPORT_COUNT: u8 = 0x9;
const TAG_PUSH: u8 = 0xA;
const TAG_POP: u8 = 0xB;

// Local item tags.
const TAG_USAGE: u8 = 0x0;
const TAG_USAGE_MIN: u8 = 0x1;
const TAG_USAGE_MAX: u8 = 0x2;

/// Data bits of an Input main item.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MainFlags(u32);

impl MainFlags {
    pub fn new(bits: u32) -> Self {
        Self(bits)
    }

    /// Constant (padding) rather than data.
    pub fn is_constant(self) -> bool {
        self.0 & 0x01 != 0
    }

    /// One value per usage (`true`) vs. an array of usage indices (`false`).
    pub fn is_variable(self) -> bool {
        self.0 & 0x02 != 0
    }

    /// Values are deltas since the last report.
    pub fn is_relative(self) -> bool {
        self.0 & 0x04 != 0
    }
}

/// One data field of an input report.
#[derive(Clone, Debug, PartialEq)]
pub struct ReportField {
    pub report_id: u8,
    /// Bit position of element 0 within the report payload (report ID byte excluded).
    pub bit_offset: u32,
    pub bit_size: u32,
    pub count: u32,
    pub logical_min: i32,
    pub logical_max: i32,
    pub flags: MainFlags,
    /// Variable fields: usage of each element (the last one repeats).
    /// Array fields: the usage selected by each index, starting at `logical_min`.
    pub usages: Vec<u32>,
}

impl ReportField {
    /// Usage carried by element `element` of a variable field.
    pub fn usage_for_element(&self, element: u32) -> Option<u32> {
        self.usages
            .get(element as usize)
            .or_else(|| self.usages.last())
            .copied()
    }

    /// Read element `element` out of `payload`.
    ///
    /// Returns `None` when the payload is too short or the element size is not
    /// representable. Values are sign-extended when the logical range is signed.
    pub fn read_element(&self, payload: &[u8], element: u32) -> Option<i32> {
        if element >= self.count || self.bit_size == 0 || self.bit_size > 32 {
            return None;
        }
        let start = (element as usize)
            .checked_mul(self.bit_size as usize)?
            .checked_add(self.bit_offset as usize)?;
        let end = start.checked_add(self.bit_size as usize)?;
        if end > payload.len().saturating_mul(8) {
            return None;
        }

        let mut raw: u32 = 0;
        for i in 0..self.bit_size as usize {
            let bit = start + i;
            if (payload[bit / 8] >> (bit % 8)) & 1 == 1 {
                raw |= 1 << i;
            }
        }

        Some(if self.logical_min < 0 {
            sign_extend(raw, self.bit_size)
        } else {
            raw as i32
        })
    }

    /// Whether an array field currently reports `usage` as active.
    pub fn array_contains(&self, payload: &[u8], usage: u32) -> bool {
        (0..self.count).any(|element| {
            self.read_element(payload, element)
                .and_then(|v| usize::try_from(v.checked_sub(self.logical_min)?).ok())
                .and_then(|idx| self.usages.get(idx))
                == Some(&usage)
        })
    }
}

/// A top-level collection and the input fields declared inside it.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceItem {
    pub usage: u32,
    pub inputs: Vec<ReportField>,
}

impl DeviceItem {
    /// Every usage this item's input reports can carry, in declaration order.
    pub fn input_usages(&self) -> impl Iterator<Item = u32> + '_ {
        self.inputs.iter().flat_map(|f| {
            let n = if f.flags.is_variable() {
                (f.count as usize).min(f.usages.len())
            } else {
                f.usages.len()
            };
            f.usages[..n].iter().copied()
        })
    }
}

/// Parsed report descriptor.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReportDescriptor {
    items: Vec<DeviceItem>,
    uses_report_ids: bool,
    /// Total input bits per report ID.
    input_bits: BTreeMap<u8, u32>,
}

#[derive(Clone, Copy, Debug, Default)]
struct Globals {
    usage_page: u16,
    logical_min: i32,
    logical_max: i32,
    logical_max_unsigned: u32,
    report_size: u32,
    report_id: u8,
    report_count: u32,
}

impl Globals {
    /// Logical maximum, read unsigned when the descriptor encodes e.g. 255 as `0x25 0xFF`.
    fn effective_logical_max(&self) -> i32 {
        if self.logical_min >= 0 && self.logical_max < self.logical_min {
            self.logical_max_unsigned.min(i32::MAX as u32) as i32
        } else {
            self.logical_max
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum LocalUsage {
    Single(u32),
    Range(u32, u32),
}

#[derive(Default)]
struct Locals {
    usages: Vec<LocalUsage>,
    pending_min: Option<u32>,
}

impl Locals {
    fn first(&self) -> Option<u32> {
        self.usages.first().map(|u| match *u {
            LocalUsage::Single(u) | LocalUsage::Range(u, _) => u,
        })
    }

    fn expand(&self, limit: usize) -> Vec<u32> {
        let mut out = Vec::new();
        for u in &self.usages {
            if out.len() >= limit {
                break;
            }
            match *u {
                LocalUsage::Single(u) => out.push(u),
                LocalUsage::Range(min, max) => {
                    let room = limit - out.len();
                    out.extend((min..=max).take(room));
                }
            }
        }
        out
    }
}

impl ReportDescriptor {
    /// Parse a raw report descriptor.
    pub fn parse(bytes: &[u8]) -> Result<Self, DescriptorError> {
        if bytes.is_empty() {
            return Err(DescriptorError::Empty);
        }

        let mut out = ReportDescriptor::default();
        let mut globals = Globals::default();
        let mut stack: Vec<Globals> = Vec::new();
        let mut locals = Locals::default();
        let mut depth: usize = 0;
        let mut current_item: Option<usize> = None;

        let mut pos = 0;
        while pos < bytes.len() {
            let offset = pos;
            let prefix = bytes[pos];
            pos += 1;

            if prefix == LONG_ITEM_PREFIX {
                let size = *bytes.get(pos).ok_or(DescriptorError::Truncated { offset })? as usize;
                pos += 2 + size;
                if pos > bytes.len() {
                    return Err(DescriptorError::Truncated { offset });
                }
                continue;
            }

            let size = match prefix & 0x03 {
                3 => 4,
                n => n as usize,
            };
            let data = bytes
                .get(pos..pos + size)
                .ok_or(DescriptorError::Truncated { offset })?;
            pos += size;

            let unsigned = data.iter().rev().fold(0u32, |acc, b| (acc << 8) | *b as u32);
            let signed = if size == 0 {
                0
            } else {
                sign_extend(unsigned, size as u32 * 8)
            };
            let tag = prefix >> 4;

            match (prefix >> 2) & 0x03 {
                ITEM_TYPE_MAIN => {
                    match tag {
                        TAG_INPUT => {
                            let field =
                                out.add_input(&globals, &locals, MainFlags(unsigned), offset)?;
                            if let (Some(field), Some(item)) = (field, current_item) {
                                out.items[item].inputs.push(field);
                            }
                        }
                        TAG_COLLECTION => {
                            if depth == 0 {
                                out.items.push(DeviceItem {
                                    usage: locals.first().unwrap_or(0),
                                    inputs: Vec::new(),
                                });
                                current_item = Some(out.items.len() - 1);
                            }
                            depth += 1;
                        }
                        TAG_END_COLLECTION => {
                            if depth == 0 {
                                return Err(DescriptorError::UnbalancedCollection { offset });
                            }
                            depth -= 1;
                            if depth == 0 {
                                current_item = None;
                            }
                        }
                        TAG_OUTPUT | TAG_FEATURE => {}
                        _ => {}
                    }
                    locals = Locals::default();
                }
                ITEM_TYPE_GLOBAL => match tag {
                    TAG_USAGE_PAGE => globals.usage_page = unsigned as u16,
                    TAG_LOGICAL_MIN => globals.logical_min = signed,
                    TAG_LOGICAL_MAX => {
                        globals.logical_max = signed;
                        globals.logical_max_unsigned = unsigned;
                    }
                    TAG_REPORT_SIZE => globals.report_size = unsigned,
                    TAG_REPORT_ID => {
                        globals.report_id = unsigned as u8;
                        out.uses_report_ids = true;
                    }
                    TAG_REPORT_COUNT => globals.report_count = unsigned,
                    TAG_PUSH => stack.push(globals),
                    TAG_POP => {
                        globals = stack
                            .pop()
                            .ok_or(DescriptorError::PopWithoutPush { offset })?;
                    }
                    _ => {}
                },
                ITEM_TYPE_LOCAL => {
                    let resolved = if size == 4 {
                        unsigned
                    } else {
                        usage::extended(globals.usage_page, unsigned as u16)
                    };
                    match tag {
                        TAG_USAGE => locals.usages.push(LocalUsage::Single(resolved)),
                        TAG_USAGE_MIN => locals.pending_min = Some(resolved),
                        TAG_USAGE_MAX => {
                            if let Some(min) = locals.pending_min.take() {
                                if min <= resolved {
                                    locals.usages.push(LocalUsage::Range(min, resolved));
                                }
                            }
                        }
                        _ => {}
                    }
                }
                _ => {}
            }
        }

        Ok(out)
    }

    /// Reserve the field's bits in its report and build it, unless it is padding.
    fn add_input(
        &mut self,
        g: &Globals,
        locals: &Locals,
        flags: MainFlags,
        offset: usize,
    ) -> Result<Option<ReportField>, DescriptorError> {
        let cursor = self.input_bits.entry(g.report_id).or_insert(0);
        let bit_offset = *cursor;
        let end = g
            .report_size
            .checked_mul(g.report_count)
            .and_then(|bits| bits.checked_add(bit_offset))
            .filter(|&end| end <= MAX_REPORT_BITS)
            .ok_or(DescriptorError::ReportTooLarge {
                offset,
                report_id: g.report_id,
            })?;
        *cursor = end;

        if flags.is_constant() || end == bit_offset {
            return Ok(None);
        }

        let limit = if flags.is_variable() {
            g.report_count as usize
        } else {
            MAX_EXPANDED_USAGES
        };
        let usages = locals.expand(limit.min(MAX_EXPANDED_USAGES));
        if usages.is_empty() {
            return Ok(None);
        }

        Ok(Some(ReportField {
            report_id: g.report_id,
            bit_offset,
            bit_size: g.report_size,
            count: g.report_count,
            logical_min: g.logical_min,
            logical_max: g.effective_logical_max(),
            flags,
            usages,
        }))
    }

    pub fn device_items(&self) -> &[DeviceItem] {
        &self.items
    }

    /// Whether input reports are prefixed with a report ID byte.
    pub fn uses_report_ids(&self) -> bool {
        self.uses_report_ids
    }

    /// Report IDs that carry input data.
    pub fn input_report_ids(&self) -> impl Iterator<Item = u8> + '_ {
        self.input_bits.keys().copied()
    }

    /// Size in bytes of the longest input report, including the ID byte when used.
    pub fn max_input_report_len(&self) -> usize {
        let payload = self
            .input_bits
            .values()
            .map(|bits| (*bits as usize).div_ceil(8))
            .max()
            .unwrap_or(0);
        if self.uses_report_ids {
            payload + 1
        } else {
            payload
        }
    }
}

/// Sign-extend the low `bits` bits of `raw`.
fn sign_extend(raw: u32, bits: u32) -> i32 {
    if bits == 0 || bits >= 32 {
        raw as i32
    } else {
        let shift = 32 - bits;
        ((raw << shift) as i32) >> shift
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::virtual_hid::{JOYSTICK_DESCRIPTOR, MOUSE_DESCRIPTOR};

    #[test]
    fn parses_joystick_layout() {
        let d = ReportDescriptor::parse(JOYSTICK_DESCRIPTOR).expect("parse");
        assert!(!d.uses_report_ids());
        assert_eq!(d.max_input_report_len(), 4);

        let items = d.device_items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].usage, usage::JOYSTICK);

        let axes = &items[0].inputs[0];
        assert_eq!(axes.usages, vec![usage::X, usage::Y, usage::Z]);
        assert_eq!((axes.bit_offset, axes.bit_size, axes.count), (0, 8, 3));
        assert_eq!((axes.logical_min, axes.logical_max), (0, 255));

        let buttons = &items[0].inputs[1];
        assert_eq!(buttons.bit_offset, 24);
        assert_eq!(buttons.usages.len(), 8);
        assert_eq!(buttons.usages[0], usage::BUTTON_FIRST);
    }

    #[test]
    fn parses_mouse_and_skips_padding() {
        let d = ReportDescriptor::parse(MOUSE_DESCRIPTOR).expect("parse");
        let item = &d.device_items()[0];
        assert_eq!(item.usage, usage::MOUSE);
        assert_eq!(item.inputs.len(), 2);

        let motion = &item.inputs[1];
        assert_eq!(motion.bit_offset, 8);
        assert_eq!(motion.logical_min, -127);
        assert!(motion.flags.is_relative());
        assert_eq!(motion.usages, vec![usage::X, usage::Y, usage::WHEEL]);
    }

    #[test]
    fn report_ids_are_tracked_per_report() {
        #[rustfmt::skip]
        let bytes = [
            0x05, 0x01, 0x09, 0x04, 0xA1, 0x01,
            0x85, 0x01,             // Report ID 1
            0x09, 0x30, 0x15, 0x00, 0x26, 0xFF, 0x00, 0x75, 0x08, 0x95, 0x01, 0x81, 0x02,
            0x85, 0x02,             // Report ID 2
            0x09, 0x31, 0x75, 0x10, 0x95, 0x01, 0x81, 0x02,
            0xC0,
        ];
        let d = ReportDescriptor::parse(&bytes).expect("parse");
        assert!(d.uses_report_ids());
        assert_eq!(d.input_report_ids().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(d.max_input_report_len(), 3);

        let inputs = &d.device_items()[0].inputs;
        assert_eq!((inputs[0].report_id, inputs[0].bit_offset), (1, 0));
        assert_eq!((inputs[1].report_id, inputs[1].bit_offset), (2, 0));
    }

    #[test]
    fn reads_signed_and_unsigned_elements() {
        let field = ReportField {
            report_id: 0,
            bit_offset: 4,
            bit_size: 8,
            count: 2,
            logical_min: -127,
            logical_max: 127,
            flags: MainFlags::new(0x06),
            usages: vec![usage::X, usage::Y],
        };
        // element 0 spans bits 4..12 = 0xFF (-1), element 1 spans 12..20 = 0x05
        let payload = [0xF0, 0x5F, 0x00];
        assert_eq!(field.read_element(&payload, 0), Some(-1));
        assert_eq!(field.read_element(&payload, 1), Some(5));
        assert_eq!(field.read_element(&payload[..1], 0), None);
    }

    #[test]
    fn array_field_lookup() {
        let field = ReportField {
            report_id: 0,
            bit_offset: 0,
            bit_size: 8,
            count: 2,
            logical_min: 1,
            logical_max: 4,
            flags: MainFlags::new(0x00),
            usages: (1..=4).map(|i| usage::extended(usage::PAGE_BUTTON, i)).collect(),
        };
        let payload = [3, 0];
        assert!(field.array_contains(&payload, usage::extended(usage::PAGE_BUTTON, 3)));
        assert!(!field.array_contains(&payload, usage::extended(usage::PAGE_BUTTON, 1)));
    }

    #[test]
    fn malformed_descriptors_are_rejected() {
        assert_eq!(ReportDescriptor::parse(&[]), Err(DescriptorError::Empty));
        assert_eq!(
            ReportDescriptor::parse(&[0x05]),
            Err(DescriptorError::Truncated { offset: 0 })
        );
        assert_eq!(
            ReportDescriptor::parse(&[0x05, 0x01, 0xC0]),
            Err(DescriptorError::UnbalancedCollection { offset: 2 })
        );
        assert_eq!(
            ReportDescriptor::parse(&[0xB4]),
            Err(DescriptorError::PopWithoutPush { offset: 0 })
        );
    }

    #[test]
    fn oversized_report_count_is_rejected() {
        #[rustfmt::skip]
        let bytes = [
            0x05, 0x01, 0x09, 0x04, 0xA1, 0x01,
            0x09, 0x30, 0x15, 0x00, 0x26, 0xFF, 0x00, 0x75, 0x08,
            0x97, 0x00, 0x00, 0x00, 0x02, // Report Count 0x0200_0000
            0x81, 0x02,
            0xC0,
        ];
        assert_eq!(
            ReportDescriptor::parse(&bytes),
            Err(DescriptorError::ReportTooLarge { offset: 20, report_id: 0 })
        );
    }

    #[test]
    fn report_size_is_bounded_across_fields() {
        let mut bytes = vec![0x05, 0x01, 0x09, 0x04, 0xA1, 0x01, 0x09, 0x30, 0x75, 0x08, 0x95, 0xFF];
        let per_field = 8 * 255;
        let fits = (MAX_REPORT_BITS / per_field) as usize;
        for _ in 0..fits {
            bytes.extend_from_slice(&[0x81, 0x02]);
        }
        bytes.push(0xC0);
        let d = ReportDescriptor::parse(&bytes).expect("fits");
        assert_eq!(d.max_input_report_len(), fits * 255);

        bytes.pop();
        bytes.extend_from_slice(&[0x81, 0x02, 0xC0]);
        assert!(matches!(
            ReportDescriptor::parse(&bytes),
            Err(DescriptorError::ReportTooLarge { .. })
        ));
    }

    #[test]
    fn huge_element_index_reads_nothing() {
        let field = ReportField {
            report_id: 0,
            bit_offset: u32::MAX - 8,
            bit_size: 32,
            count: u32::MAX,
            logical_min: 0,
            logical_max: 1,
            flags: MainFlags::new(0x02),
            usages: vec![usage::X],
        };
        assert_eq!(field.read_element(&[0xFF; 16], u32::MAX - 1), None);
    }
}
