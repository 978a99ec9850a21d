//! Dispatch table hooks via pointer replacement
//!
//! A [`HookRecord`] replaces one dispatch table slot with a replacement
//! function and keeps the original so the replacement can forward to it.

use std::fmt;

use overlayhook_engine::DispatchSlot;

use super::error::HookInstallError;

/// One intercepted entry point
///
/// Either fully installed (slot holds the replacement, original reachable)
/// or fully removed. Removal happens at most once; dropping an installed
/// record removes it.
pub struct HookRecord {
    /// Debug name
    name: &'static str,

    /// Address of the dispatch table slot
    slot: DispatchSlot,

    /// Original function pointer (the target)
    original: *const (),

    /// Our replacement function
    replacement: *const (),

    /// Whether the slot currently holds the replacement
    installed: bool,
}

// SAFETY: The record only holds addresses; slot writes happen under the
// owning render hook's lifecycle lock.
unsafe impl Send for HookRecord {}
unsafe impl Sync for HookRecord {}

impl HookRecord {
    /// Replace the function in `slot` with `replacement`
    ///
    /// # Safety
    /// - `slot` must point into a live dispatch table
    /// - `replacement` must have a signature compatible with the original
    pub unsafe fn install(
        name: &'static str,
        slot: DispatchSlot,
        replacement: *const (),
    ) -> Result<Self, HookInstallError> {
        let original = slot.read();

        tracing::debug!(
            "Creating dispatch hook '{}': slot={:x}, original={:x}, replacement={:x}",
            name,
            slot.as_ptr() as usize,
            original as usize,
            replacement as usize
        );

        if original.is_null() {
            return Err(HookInstallError::MemoryProtection {
                entry: name,
                reason: "slot holds a null function pointer".to_string(),
            });
        }
        if original == replacement {
            return Err(HookInstallError::AlreadyHooked(name));
        }

        write_slot(name, slot, replacement)?;

        tracing::info!("Installed dispatch hook '{}'", name);

        Ok(Self {
            name,
            slot,
            original,
            replacement,
            installed: true,
        })
    }

    /// Restore the original function pointer
    ///
    /// No-op if already removed. If another agent re-patched the slot after
    /// us, the slot is left alone so their hook keeps working.
    pub fn remove(&mut self) -> Result<(), HookInstallError> {
        if !self.installed {
            return Ok(());
        }

        // SAFETY: The slot was valid at install time and dispatch tables live
        // for the life of the graphics runtime.
        unsafe {
            let current = self.slot.read();
            if current == self.replacement {
                write_slot(self.name, self.slot, self.original)?;
            } else {
                tracing::warn!(
                    "Dispatch hook '{}' was re-patched ({:x}); leaving slot untouched",
                    self.name,
                    current as usize
                );
            }
        }

        self.installed = false;
        tracing::info!("Removed dispatch hook '{}'", self.name);
        Ok(())
    }

    /// Original function pointer to forward to
    #[inline]
    pub fn original(&self) -> *const () {
        self.original
    }

    #[inline]
    pub fn is_installed(&self) -> bool {
        self.installed
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl Drop for HookRecord {
    fn drop(&mut self) {
        if let Err(e) = self.remove() {
            tracing::error!("Failed to remove dispatch hook '{}': {}", self.name, e);
        }
    }
}

impl fmt::Debug for HookRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRecord")
            .field("name", &self.name)
            .field("slot", &self.slot)
            .field("original", &self.original)
            .field("replacement", &self.replacement)
            .field("installed", &self.installed)
            .finish()
    }
}

/// Write a function pointer into a slot, making it writable for the duration
///
/// The previous page protection is restored when the guard drops.
unsafe fn write_slot(
    name: &'static str,
    slot: DispatchSlot,
    value: *const (),
) -> Result<(), HookInstallError> {
    let _guard = region::protect_with_handle(
        slot.as_ptr() as *const u8,
        std::mem::size_of::<usize>(),
        region::Protection::READ_WRITE,
    )
    .map_err(|e| HookInstallError::MemoryProtection {
        entry: name,
        reason: e.to_string(),
    })?;

    slot.as_ptr().write_volatile(value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn original_fn() -> u32 {
        1
    }
    extern "C" fn replacement_fn() -> u32 {
        2
    }
    extern "C" fn other_agent_fn() -> u32 {
        3
    }

    fn table() -> Box<[*const (); 4]> {
        Box::new([original_fn as *const (); 4])
    }

    fn slot_of(table: &mut [*const (); 4], index: usize) -> DispatchSlot {
        DispatchSlot::new(&mut table[index] as *mut *const ()).unwrap()
    }

    #[test]
    fn test_install_and_remove() {
        let mut table = table();
        let slot = slot_of(&mut table, 2);

        let mut record =
            unsafe { HookRecord::install("test", slot, replacement_fn as *const ()) }.unwrap();
        assert!(record.is_installed());
        assert_eq!(record.original(), original_fn as *const ());
        assert_eq!(table[2], replacement_fn as *const ());

        record.remove().unwrap();
        assert!(!record.is_installed());
        assert_eq!(table[2], original_fn as *const ());

        // Second removal is a no-op
        record.remove().unwrap();
        assert_eq!(table[2], original_fn as *const ());
    }

    #[test]
    fn test_drop_removes_hook() {
        let mut table = table();
        let slot = slot_of(&mut table, 0);
        {
            let _record =
                unsafe { HookRecord::install("drop", slot, replacement_fn as *const ()) }.unwrap();
            assert_eq!(table[0], replacement_fn as *const ());
        }
        assert_eq!(table[0], original_fn as *const ());
    }

    #[test]
    fn test_already_hooked_rejected() {
        let mut table = table();
        table[1] = replacement_fn as *const ();
        let slot = slot_of(&mut table, 1);

        let result = unsafe { HookRecord::install("dup", slot, replacement_fn as *const ()) };
        assert!(matches!(result, Err(HookInstallError::AlreadyHooked("dup"))));
    }

    #[test]
    fn test_null_slot_rejected() {
        let mut table = table();
        table[3] = std::ptr::null();
        let slot = slot_of(&mut table, 3);

        let result = unsafe { HookRecord::install("null", slot, replacement_fn as *const ()) };
        assert!(matches!(
            result,
            Err(HookInstallError::MemoryProtection { entry: "null", .. })
        ));
    }

    #[test]
    fn test_repatched_slot_left_alone() {
        let mut table = table();
        let slot = slot_of(&mut table, 2);
        let mut record =
            unsafe { HookRecord::install("chain", slot, replacement_fn as *const ()) }.unwrap();

        table[2] = other_agent_fn as *const ();
        record.remove().unwrap();
        assert!(!record.is_installed());
        assert_eq!(table[2], other_agent_fn as *const ());
    }
}
