//! Fixed-capacity watch slot table.
//!
//! The table is an arena of [`MAX_WATCHES`] slots whose indices never move, so
//! a slot index doubles as a stable handle. Allocation is a linear scan for the
//! first free slot, which is fine for a table this small. Nothing here
//! allocates, so the firing routine can index the table from interrupt context.
//!
//! The table does not check that two live watches use different pins; keeping
//! pins unique is up to the caller of `register`.

use arrayvec::ArrayVec;
use axerrno::{ax_err, ax_err_type, AxResult};

use crate::slot::{WatchId, WatchSlot};

/// Maximum number of simultaneously registered watches.
pub const MAX_WATCHES: usize = 16;

/// Table of watch slots.
pub struct SlotTable {
    slots: [WatchSlot; MAX_WATCHES],
}

impl SlotTable {
    /// Creates a table with every slot free.
    pub const fn new() -> Self {
        Self {
            slots: [const { WatchSlot::new() }; MAX_WATCHES],
        }
    }

    /// Claims the first free slot.
    ///
    /// Returns `(index, generation)` of the reserved slot.
    ///
    /// # Errors
    ///
    /// Returns `NoMemory` if all slots are occupied.
    pub fn allocate(&self) -> AxResult<(usize, u32)> {
        for (index, slot) in self.slots.iter().enumerate() {
            if let Some(generation) = slot.lifecycle().try_reserve() {
                return Ok((index, generation));
            }
        }
        ax_err!(NoMemory, "no free watch slot")
    }

    /// Returns a reserved slot to the free pool and zeroes its record.
    pub fn release(&self, index: usize) {
        if let Some(slot) = self.slots.get(index) {
            slot.clear();
            slot.lifecycle().release();
        }
    }

    /// Gets a slot by index.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&WatchSlot> {
        self.slots.get(index)
    }

    /// Resolves a watch id to its slot index.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the id is zero or beyond the table, and
    /// `NotFound` if the slot is not live.
    pub fn slot_of(&self, id: WatchId) -> AxResult<usize> {
        let index = id
            .slot_index()
            .filter(|index| *index < MAX_WATCHES)
            .ok_or_else(|| ax_err_type!(InvalidInput, "watch id out of range"))?;

        if !self.slots[index].is_armed() {
            return ax_err!(NotFound, "watch is not registered");
        }
        Ok(index)
    }

    /// Lists the ids of all live watches, in slot order.
    pub fn active(&self) -> ArrayVec<WatchId, MAX_WATCHES> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_armed())
            .map(|(index, _)| WatchId::from_slot(index))
            .collect()
    }

    /// Gets the number of live watches.
    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_armed()).count()
    }

    /// Iterates over all slots.
    pub fn iter(&self) -> impl Iterator<Item = &WatchSlot> {
        self.slots.iter()
    }

    /// Frees every slot.
    ///
    /// Generations are kept, so firing tokens issued before the reset stay inert.
    /// Returns the number of slots that were live.
    pub fn reset(&self) -> usize {
        let mut live = 0;
        for slot in &self.slots {
            if slot.is_armed() {
                live += 1;
            }
            slot.clear();
            slot.stats().reset();
            slot.lifecycle().release();
        }
        live
    }
}

impl Default for SlotTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axerrno::AxError;

    fn arm(table: &SlotTable) -> usize {
        let (index, generation) = table.allocate().unwrap();
        assert!(table.get(index).unwrap().lifecycle().arm(generation));
        index
    }

    #[test]
    fn test_table_allocates_first_free() {
        let table = SlotTable::new();
        assert_eq!(arm(&table), 0);
        assert_eq!(arm(&table), 1);
        assert_eq!(arm(&table), 2);

        table.release(1);
        assert_eq!(arm(&table), 1);
        assert_eq!(table.active_count(), 3);
    }

    #[test]
    fn test_table_exhaustion() {
        let table = SlotTable::new();
        for expected in 0..MAX_WATCHES {
            assert_eq!(arm(&table), expected);
        }
        assert_eq!(table.allocate().unwrap_err(), AxError::NoMemory);
        assert_eq!(table.active().len(), MAX_WATCHES);
    }

    #[test]
    fn test_table_reserved_slot_not_active() {
        let table = SlotTable::new();
        let (index, _) = table.allocate().unwrap();
        assert_eq!(table.active_count(), 0);
        assert_eq!(
            table.slot_of(WatchId::from_slot(index)).unwrap_err(),
            AxError::NotFound
        );
        // But it is not handed out twice.
        assert_eq!(table.allocate().unwrap().0, index + 1);
    }

    #[test]
    fn test_table_slot_of_rejects_bad_ids() {
        let table = SlotTable::new();
        let index = arm(&table);
        assert_eq!(table.slot_of(WatchId::from_slot(index)).unwrap(), index);
        assert_eq!(table.slot_of(WatchId(0)).unwrap_err(), AxError::InvalidInput);
        assert_eq!(table.slot_of(WatchId(17)).unwrap_err(), AxError::InvalidInput);
        assert_eq!(table.slot_of(WatchId(2)).unwrap_err(), AxError::NotFound);
    }

    #[test]
    fn test_table_reset_frees_everything() {
        let table = SlotTable::new();
        arm(&table);
        arm(&table);
        let _ = table.allocate().unwrap();

        assert_eq!(table.reset(), 2);
        assert_eq!(table.active_count(), 0);
        assert!(table.iter().all(|slot| slot.lifecycle().armed_generation().is_none()));
        assert_eq!(arm(&table), 0);
    }
}
