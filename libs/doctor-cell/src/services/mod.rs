pub mod allocator;

pub use allocator::{find_consecutive_pair, find_single_slot, provider_key, DayRow, SlotAllocator};
