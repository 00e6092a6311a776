//! Input report decoder for one device item.
//!
//! [`ItemDecoder`] flattens a [`DeviceItem`]'s input fields into value slots (one
//! per variable element, one per possible array usage) and, for each raw report,
//! emits a [`UsageChange`] for every slot whose logical value changed.
//!
//! Relative slots (mouse motion, wheels) are reported on every report that carries
//! a non-zero delta, even when the delta equals the previous one: a mouse moving
//! at constant speed sends identical deltas.
//!
//! Changes are delivered in slot order, which is descriptor declaration order.

use crate::descriptor::{DeviceItem, ReportDescriptor, ReportField};

/// One usage whose logical value changed in the last decoded report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UsageChange {
    pub usage: u32,
    pub previous: i32,
    pub value: i32,
}

#[derive(Clone, Copy, Debug)]
enum SlotKind {
    /// Element `n` of a variable field.
    Variable(u32),
    /// Presence of a usage in an array field (0 or 1).
    ArrayMember,
}

#[derive(Clone, Copy, Debug)]
struct Slot {
    usage: u32,
    field: usize,
    kind: SlotKind,
    relative: bool,
}

/// Decoder for the input reports of a single [`DeviceItem`].
#[derive(Clone, Debug)]
pub struct ItemDecoder {
    uses_report_ids: bool,
    fields: Vec<ReportField>,
    slots: Vec<Slot>,
    values: Vec<i32>,
}

impl ItemDecoder {
    /// Build a decoder for `item` of `descriptor`.
    pub fn new(descriptor: &ReportDescriptor, item: &DeviceItem) -> Self {
        let fields = item.inputs.clone();
        let mut slots = Vec::new();

        for (field_idx, field) in fields.iter().enumerate() {
            let relative = field.flags.is_relative();
            if field.flags.is_variable() {
                for element in 0..field.count {
                    if let Some(usage) = field.usage_for_element(element) {
                        slots.push(Slot {
                            usage,
                            field: field_idx,
                            kind: SlotKind::Variable(element),
                            relative,
                        });
                    }
                }
            } else {
                for &usage in &field.usages {
                    slots.push(Slot {
                        usage,
                        field: field_idx,
                        kind: SlotKind::ArrayMember,
                        relative,
                    });
                }
            }
        }

        let values = vec![0; slots.len()];
        Self {
            uses_report_ids: descriptor.uses_report_ids(),
            fields,
            slots,
            values,
        }
    }

    /// Usages this decoder can report, in slot order (duplicates possible).
    pub fn usages(&self) -> impl Iterator<Item = u32> + '_ {
        self.slots.iter().map(|s| s.usage)
    }

    /// Current logical value of the first slot carrying `usage`.
    pub fn value(&self, usage: u32) -> Option<i32> {
        self.slots
            .iter()
            .position(|s| s.usage == usage)
            .map(|i| self.values[i])
    }

    /// Decode one raw report as read from the device.
    ///
    /// Returns `false` when the report does not belong to this item (unknown report
    /// ID or empty buffer); `changes` is left untouched in that case.
    pub fn decode(&mut self, report: &[u8], changes: &mut Vec<UsageChange>) -> bool {
        let (report_id, payload) = if self.uses_report_ids {
            match report.split_first() {
                Some((id, rest)) => (*id, rest),
                None => return false,
            }
        } else {
            (0, report)
        };

        if !self.fields.iter().any(|f| f.report_id == report_id) {
            return false;
        }

        for (slot, old) in self.slots.iter().zip(self.values.iter_mut()) {
            let field = &self.fields[slot.field];
            if field.report_id != report_id {
                continue;
            }
            let new = match slot.kind {
                SlotKind::Variable(element) => match field.read_element(payload, element) {
                    Some(v) => v,
                    None => continue,
                },
                SlotKind::ArrayMember => field.array_contains(payload, slot.usage) as i32,
            };
            if new != *old || (slot.relative && new != 0) {
                changes.push(UsageChange {
                    usage: slot.usage,
                    previous: *old,
                    value: new,
                });
                *old = new;
            }
        }
        true
    }
}
