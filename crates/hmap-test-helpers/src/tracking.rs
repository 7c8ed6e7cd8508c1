//! Allocation tracking for the report dispatch path.
//!
//! Install [`TrackingAllocator`] as the `#[global_allocator]` of a test
//! binary, then wrap the code under test in [`track`] and check the guard
//! with [`assert_no_alloc!`](crate::assert_no_alloc).

use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;

thread_local! {
    static ALLOCS: Cell<usize> = const { Cell::new(0) };
    static ALLOC_BYTES: Cell<usize> = const { Cell::new(0) };
    static ARMED: Cell<u32> = const { Cell::new(0) };
}

fn armed() -> bool {
    ARMED.with(|a| a.get() > 0)
}

fn record(bytes: usize) {
    ALLOCS.with(|c| c.set(c.get().saturating_add(1)));
    ALLOC_BYTES.with(|b| b.set(b.get().saturating_add(bytes)));
}

/// System allocator that counts allocations made on the current thread
/// while a [`AllocationGuard`] is alive.
pub struct TrackingAllocator;

unsafe impl GlobalAlloc for TrackingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() && armed() {
            record(layout.size());
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc_zeroed(layout) };
        if !ptr.is_null() && armed() {
            record(layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) };
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = unsafe { System.realloc(ptr, layout, new_size) };
        if !new_ptr.is_null() && armed() {
            record(new_size.saturating_sub(layout.size()));
        }
        new_ptr
    }
}

/// Counts allocations between its creation and drop.
///
/// Guards nest; tracking stays armed until the outermost guard drops.
pub struct AllocationGuard {
    start_count: usize,
    start_bytes: usize,
}

impl AllocationGuard {
    pub fn new() -> Self {
        ARMED.with(|a| a.set(a.get().saturating_add(1)));
        Self {
            start_count: ALLOCS.with(Cell::get),
            start_bytes: ALLOC_BYTES.with(Cell::get),
        }
    }

    pub fn allocations(&self) -> usize {
        ALLOCS.with(Cell::get).saturating_sub(self.start_count)
    }

    pub fn bytes(&self) -> usize {
        ALLOC_BYTES.with(Cell::get).saturating_sub(self.start_bytes)
    }

    pub fn has_allocations(&self) -> bool {
        self.allocations() > 0
    }
}

impl Default for AllocationGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AllocationGuard {
    fn drop(&mut self) {
        ARMED.with(|a| a.set(a.get().saturating_sub(1)));
    }
}

pub fn track() -> AllocationGuard {
    AllocationGuard::new()
}

/// Panic if the guard observed any allocation.
#[macro_export]
macro_rules! assert_no_alloc {
    ($guard:expr) => {
        $crate::assert_no_alloc!($guard, "tracked section")
    };
    ($guard:expr, $context:expr) => {{
        let guard = &$guard;
        let allocs = guard.allocations();
        if allocs > 0 {
            panic!(
                "allocation in '{}': {} allocations ({} bytes) at {}:{}",
                $context,
                allocs,
                guard.bytes(),
                file!(),
                line!()
            );
        }
    }};
}
