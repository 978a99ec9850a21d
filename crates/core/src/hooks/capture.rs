//! Render pipeline hook
//!
//! Intercepts the device's present and reset entry points, keeps track of
//! the host's device and tells listeners when it is captured, lost and
//! restored.
//!
//! # State machine
//!
//! ```text
//! Uninitialized -> Installed -> Capturing <-> Lost -> ... -> Disposed
//! ```
//!
//! `Lost` is entered when a reset begins, on [`RenderHook::free_capture`] and
//! when the host presents a different device. `Capturing` is only re-entered
//! by a fresh successful [`RenderHook::try_capture`] (or a successful reset
//! that can resolve the device's window). `Disposed` is terminal.
//!
//! Install and dispose are driven by the control thread. Present and reset
//! run on the host's render thread and only touch the device state.
//!
//! With a [`WindowSubclasser`] the captured window's procedure is replaced
//! on capture, so message listeners see the window's input before the host.
//! The procedure is put back on [`RenderHook::free_capture`], on dispose and
//! when the window is destroyed.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use overlayhook_engine::{
    call_window_proc, check_control_thread, EntryPoint, EntryPointLocator, WindowResolver,
    WindowSubclasser,
};
use overlayhook_sdk::window::WM_NCDESTROY;
use overlayhook_sdk::{
    succeeded, DeviceHandle, HResult, PresentFn, ResetFn, WindowHandle, WindowMessage,
};

use super::detours;
use super::device::{CapturedDevice, DevicePhase, DeviceState};
use super::error::{CaptureError, HookInstallError};
use super::listeners::{CaptureEvent, CaptureListenerKey, ListenerRegistry};
use super::vtable::HookRecord;

/// Observable state of the render hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// Interception points not installed yet
    Uninitialized,
    /// Installed, no device captured yet
    Installed,
    /// A usable device is captured
    Capturing,
    /// The captured device was invalidated
    Lost,
    /// Interception points removed; terminal
    Disposed,
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CaptureState::Uninitialized => "uninitialized",
            CaptureState::Installed => "installed",
            CaptureState::Capturing => "capturing",
            CaptureState::Lost => "lost",
            CaptureState::Disposed => "disposed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Uninitialized,
    Installed,
    Disposed,
}

struct InstalledHooks {
    present: HookRecord,
    reset: HookRecord,
}

struct Lifecycle {
    phase: Phase,
    hooks: Option<InstalledHooks>,
}

#[derive(Debug, Clone, Copy)]
struct Subclass {
    window: WindowHandle,
    previous: usize,
}

/// Interception of the host's render pipeline
pub struct RenderHook {
    locator: Arc<dyn EntryPointLocator>,
    windows: Arc<dyn WindowResolver>,

    /// Install/dispose state, written by the control thread only
    lifecycle: RwLock<Lifecycle>,

    /// Captured device, written by present and reset
    device: RwLock<DeviceState>,

    listeners: ListenerRegistry,

    subclasser: Option<Arc<dyn WindowSubclasser>>,

    /// Window whose procedure is currently replaced
    subclassed: Mutex<Option<Subclass>>,

    /// Original entry points, kept after dispose so in-flight calls can
    /// still forward
    original_present: AtomicUsize,
    original_reset: AtomicUsize,
    original_window_proc: AtomicUsize,
}

impl RenderHook {
    /// Create an uninstalled render hook
    pub fn new(locator: Arc<dyn EntryPointLocator>, windows: Arc<dyn WindowResolver>) -> Self {
        Self {
            locator,
            windows,
            lifecycle: RwLock::new(Lifecycle {
                phase: Phase::Uninitialized,
                hooks: None,
            }),
            device: RwLock::new(DeviceState::new()),
            listeners: ListenerRegistry::new(),
            subclasser: None,
            subclassed: Mutex::new(None),
            original_present: AtomicUsize::new(0),
            original_reset: AtomicUsize::new(0),
            original_window_proc: AtomicUsize::new(0),
        }
    }

    /// Intercept the captured window's messages through `subclasser`
    pub fn with_subclasser(mut self, subclasser: Arc<dyn WindowSubclasser>) -> Self {
        self.subclasser = Some(subclasser);
        self
    }

    /// Install interception on the present and reset entry points
    ///
    /// Idempotent once installed. If either entry point cannot be located or
    /// patched, nothing stays installed.
    pub fn initialize(&self) -> Result<(), HookInstallError> {
        check_control_thread("RenderHook::initialize");
        let mut lifecycle = self.lifecycle.write();
        match lifecycle.phase {
            Phase::Installed => return Ok(()),
            Phase::Disposed => return Err(HookInstallError::Disposed),
            Phase::Uninitialized => {}
        }

        let hooks = self.install_hooks().inspect_err(|e| {
            tracing::error!("Failed to install render hook: {}", e);
        })?;

        self.original_present
            .store(hooks.present.original() as usize, Ordering::Release);
        self.original_reset
            .store(hooks.reset.original() as usize, Ordering::Release);

        lifecycle.hooks = Some(hooks);
        lifecycle.phase = Phase::Installed;

        tracing::info!("Render hook installed");
        Ok(())
    }

    fn install_hooks(&self) -> Result<InstalledHooks, HookInstallError> {
        let present_slot = self
            .locator
            .locate(EntryPoint::Present)
            .ok_or(HookInstallError::EntryPointNotFound(EntryPoint::Present))?;
        let reset_slot = self
            .locator
            .locate(EntryPoint::Reset)
            .ok_or(HookInstallError::EntryPointNotFound(EntryPoint::Reset))?;

        // SAFETY: The locator hands out slots of the live device dispatch
        // table and the detours match the entry point signatures.
        // If the reset hook fails, dropping `present` rolls it back.
        unsafe {
            let present = HookRecord::install(
                EntryPoint::Present.name(),
                present_slot,
                detours::present_detour as *const (),
            )?;
            let reset = HookRecord::install(
                EntryPoint::Reset.name(),
                reset_slot,
                detours::reset_detour as *const (),
            )?;
            Ok(InstalledHooks { present, reset })
        }
    }

    /// Remove all interception points and drop every listener
    ///
    /// Safe to call multiple times; only the first call does anything.
    pub fn dispose(&self) {
        check_control_thread("RenderHook::dispose");
        let hooks = {
            let mut lifecycle = self.lifecycle.write();
            if lifecycle.phase == Phase::Disposed {
                return;
            }
            lifecycle.phase = Phase::Disposed;
            lifecycle.hooks.take()
        };

        if let Some(mut hooks) = hooks {
            for record in [&mut hooks.present, &mut hooks.reset] {
                if let Err(e) = record.remove() {
                    tracing::error!("Failed to remove '{}': {}", record.name(), e);
                }
            }
        }
        self.restore_window_proc();

        let lost = self.device.write().invalidate();
        if let Some(previous) = lost {
            self.listeners.fire_capture(&CaptureEvent::Lost {
                generation: previous.generation,
            });
        }
        self.listeners.clear();

        tracing::info!("Render hook disposed");
    }

    fn check_installed(&self) -> Result<(), CaptureError> {
        match self.lifecycle.read().phase {
            Phase::Installed => Ok(()),
            Phase::Uninitialized => Err(CaptureError::NotInstalled),
            Phase::Disposed => Err(CaptureError::Disposed),
        }
    }

    /// Capture `handle` as the current device
    ///
    /// Called from the present interception point every frame. While the
    /// cached device is valid this returns it without resolving anything.
    pub fn try_capture(&self, handle: DeviceHandle) -> Result<CapturedDevice, CaptureError> {
        self.check_installed()?;

        {
            let device = self.device.read();
            if device.is_resetting() {
                return Err(CaptureError::DeviceLost);
            }
            if let Some(cached) = device.cached(handle) {
                return Ok(cached);
            }
        }

        let Some(window) = self.windows.resolve_window(handle) else {
            tracing::trace!("No window for device {:#x} yet", handle.addr());
            return Err(CaptureError::NoWindow);
        };

        let mut events = Vec::with_capacity(2);
        let captured = {
            let mut device = self.device.write();
            if device.is_resetting() {
                return Err(CaptureError::DeviceLost);
            }
            if let Some(cached) = device.cached(handle) {
                return Ok(cached);
            }

            if let Some(replaced) = device.invalidate() {
                tracing::info!(
                    "Device replaced: {:#x} -> {:#x}",
                    replaced.handle.addr(),
                    handle.addr()
                );
                events.push(CaptureEvent::Lost {
                    generation: replaced.generation,
                });
            }

            let first = device.phase() == DevicePhase::Idle;
            let captured = device.capture(handle, window);
            events.push(if first {
                CaptureEvent::Captured(captured)
            } else {
                CaptureEvent::Restored(captured)
            });
            captured
        };

        self.subclass_window(captured.window);

        tracing::info!(
            "Captured device {:#x} (window {:#x}, generation {})",
            captured.handle.addr(),
            captured.window.as_raw() as usize,
            captured.generation
        );

        for event in &events {
            self.listeners.fire_capture(event);
        }
        Ok(captured)
    }

    /// Per-frame work of the present interception point
    ///
    /// Captures the device and runs the present listeners against it.
    pub fn present(&self, handle: DeviceHandle) {
        match self.try_capture(handle) {
            Ok(captured) => self.listeners.fire_present(&captured),
            Err(e) if e.is_retryable() => {}
            Err(e) => tracing::trace!("Skipping present: {}", e),
        }
    }

    /// First phase of a reset: invalidate the device before the host resets it
    ///
    /// Listeners receive [`CaptureEvent::Lost`] and must release everything
    /// created against the device.
    pub fn begin_reset(&self) {
        if self.check_installed().is_err() {
            return;
        }

        let lost = {
            let mut device = self.device.write();
            device.set_resetting(true);
            device.invalidate()
        };

        tracing::debug!("Device reset started");

        if let Some(previous) = lost {
            self.listeners.fire_capture(&CaptureEvent::Lost {
                generation: previous.generation,
            });
        }
    }

    /// Second phase of a reset: re-validate after the host reset the device
    ///
    /// On success the device is captured again with a new generation. On
    /// failure it stays lost until a later present recaptures it.
    pub fn end_reset(&self, handle: DeviceHandle, result: HResult) {
        self.device.write().set_resetting(false);

        if self.check_installed().is_err() {
            return;
        }

        if !succeeded(result) {
            tracing::warn!("Device reset failed: {:#x}", result);
            return;
        }

        match self.try_capture(handle) {
            Ok(captured) => tracing::debug!(
                "Device reset finished (generation {})",
                captured.generation
            ),
            Err(e) => tracing::debug!("Device reset finished, recapture deferred: {}", e),
        }
    }

    /// Run `reset` between [`begin_reset`](Self::begin_reset) and
    /// [`end_reset`](Self::end_reset)
    pub fn do_reset<F>(&self, handle: DeviceHandle, reset: F) -> HResult
    where
        F: FnOnce() -> HResult,
    {
        self.begin_reset();
        let result = reset();
        self.end_reset(handle, result);
        result
    }

    /// Release the captured device without uninstalling interception
    pub fn free_capture(&self) {
        self.restore_window_proc();
        let lost = self.device.write().invalidate();
        if let Some(previous) = lost {
            tracing::debug!("Released device capture (generation {})", previous.generation);
            self.listeners.fire_capture(&CaptureEvent::Lost {
                generation: previous.generation,
            });
        }
    }

    fn subclass_window(&self, window: WindowHandle) {
        let Some(subclasser) = self.subclasser.as_deref() else {
            return;
        };

        let mut subclassed = self.subclassed.lock();
        if matches!(*subclassed, Some(current) if current.window == window) {
            return;
        }
        // Dispose restores under the same lock after leaving `Installed`
        if self.check_installed().is_err() {
            return;
        }
        if let Some(stale) = subclassed.take() {
            restore_subclass(subclasser, stale);
        }

        match subclasser.subclass(window, detours::window_proc_detour) {
            Some(previous) => {
                self.original_window_proc.store(previous, Ordering::Release);
                detours::remember_window_proc(previous);
                *subclassed = Some(Subclass { window, previous });
                tracing::info!(
                    "Intercepting messages of window {:#x}",
                    window.as_raw() as usize
                );
            }
            None => tracing::warn!(
                "Could not intercept messages of window {:#x}",
                window.as_raw() as usize
            ),
        }
    }

    fn restore_window_proc(&self) {
        let Some(subclasser) = self.subclasser.as_deref() else {
            return;
        };
        if let Some(subclass) = self.subclassed.lock().take() {
            restore_subclass(subclasser, subclass);
        }
    }

    /// Window whose procedure is currently replaced
    pub fn subclassed_window(&self) -> Option<WindowHandle> {
        self.subclassed.lock().map(|subclass| subclass.window)
    }

    /// Offer a message of the captured window to the message listeners
    ///
    /// Returns the result of the listener that consumed it. `WM_NCDESTROY`
    /// is never consumed; it puts the window's procedure back.
    pub fn window_message(&self, message: &WindowMessage) -> Option<isize> {
        if self.check_installed().is_err() {
            return None;
        }

        let consumed = self.listeners.fire_message(message);
        if message.msg != WM_NCDESTROY {
            return consumed;
        }

        let mut subclassed = self.subclassed.lock();
        if matches!(*subclassed, Some(current) if current.window == message.window) {
            if let (Some(subclasser), Some(subclass)) =
                (self.subclasser.as_deref(), subclassed.take())
            {
                tracing::debug!("Window destroyed while intercepted");
                restore_subclass(subclasser, subclass);
            }
        }
        None
    }

    /// Pass `message` on to the procedure the window had before
    ///
    /// `None` if no window was ever subclassed.
    pub fn call_original_window_proc(&self, message: &WindowMessage) -> Option<isize> {
        let previous = self.original_window_proc.load(Ordering::Acquire);
        if previous == 0 {
            return None;
        }
        // SAFETY: Only ever stored from a procedure the subclasser replaced.
        Some(unsafe { call_window_proc(previous, message) })
    }

    /// Currently captured device
    pub fn current_device(&self) -> Result<CapturedDevice, CaptureError> {
        self.check_installed()?;
        self.device.read().current()
    }

    /// Whether `captured` is still the usable device
    pub fn is_current(&self, captured: &CapturedDevice) -> bool {
        self.check_installed().is_ok() && self.device.read().is_current(captured)
    }

    pub fn state(&self) -> CaptureState {
        match self.lifecycle.read().phase {
            Phase::Uninitialized => CaptureState::Uninitialized,
            Phase::Disposed => CaptureState::Disposed,
            Phase::Installed => match self.device.read().phase() {
                DevicePhase::Idle => CaptureState::Installed,
                DevicePhase::Capturing => CaptureState::Capturing,
                DevicePhase::Lost => CaptureState::Lost,
            },
        }
    }

    /// Register a capture lifecycle listener
    pub fn on_capture<F>(&self, callback: F) -> CaptureListenerKey
    where
        F: Fn(&CaptureEvent) + Send + Sync + 'static,
    {
        self.listeners.on_capture(Arc::new(callback))
    }

    /// Register a listener called on every frame with a captured device
    pub fn on_present<F>(&self, callback: F) -> CaptureListenerKey
    where
        F: Fn(&CapturedDevice) + Send + Sync + 'static,
    {
        self.listeners.on_present(Arc::new(callback))
    }

    /// Register a listener offered every message of the captured window
    ///
    /// Returning `Some(result)` consumes the message; the host's window
    /// procedure does not see it.
    pub fn on_window_message<F>(&self, callback: F) -> CaptureListenerKey
    where
        F: Fn(&WindowMessage) -> Option<isize> + Send + Sync + 'static,
    {
        self.listeners.on_message(Arc::new(callback))
    }

    /// Remove a listener
    ///
    /// # Returns
    /// `true` if the listener was found and removed
    pub fn remove_listener(&self, key: CaptureListenerKey) -> bool {
        self.listeners.remove(key)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Original present entry point, if interception was ever installed
    pub fn original_present(&self) -> Option<PresentFn> {
        let addr = self.original_present.load(Ordering::Acquire);
        if addr == 0 {
            return None;
        }
        // SAFETY: Only ever stored from the present slot of a device
        // dispatch table.
        Some(unsafe { std::mem::transmute::<*const (), PresentFn>(addr as *const ()) })
    }

    /// Original reset entry point, if interception was ever installed
    pub fn original_reset(&self) -> Option<ResetFn> {
        let addr = self.original_reset.load(Ordering::Acquire);
        if addr == 0 {
            return None;
        }
        // SAFETY: Only ever stored from the reset slot of a device dispatch
        // table.
        Some(unsafe { std::mem::transmute::<*const (), ResetFn>(addr as *const ()) })
    }
}

impl fmt::Debug for RenderHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderHook")
            .field("state", &self.state())
            .field("listeners", &self.listener_count())
            .field("window", &self.subclassed_window())
            .finish()
    }
}

fn restore_subclass(subclasser: &dyn WindowSubclasser, subclass: Subclass) {
    if subclasser.restore(subclass.window, subclass.previous) {
        tracing::info!(
            "Restored procedure of window {:#x}",
            subclass.window.as_raw() as usize
        );
    } else {
        tracing::warn!(
            "Failed to restore procedure of window {:#x}",
            subclass.window.as_raw() as usize
        );
    }
}

impl Drop for RenderHook {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::ffi::c_void;
    use std::sync::atomic::AtomicBool;

    use overlayhook_engine::DispatchSlot;
    use overlayhook_sdk::{
        indices, IDirect3DDevice9, PresentParameters, WindowProcFn, D3DERR_DEVICELOST, S_OK,
    };

    pub(crate) unsafe extern "system" fn stub_present(_device: *mut IDirect3DDevice9) -> HResult {
        S_OK
    }

    pub(crate) unsafe extern "system" fn stub_reset(
        _device: *mut IDirect3DDevice9,
        _params: *mut PresentParameters,
    ) -> HResult {
        S_OK
    }

    /// Heap-allocated dispatch table standing in for the runtime's
    pub(crate) struct FakeVTable {
        pub slots: Mutex<Vec<*const ()>>,
        pub present_index: usize,
        pub reset_index: usize,
        pub hide: Option<EntryPoint>,
    }

    // SAFETY: Test-only table of function addresses.
    unsafe impl Send for FakeVTable {}
    unsafe impl Sync for FakeVTable {}

    impl FakeVTable {
        pub fn new() -> Self {
            let mut slots = vec![std::ptr::null::<()>(); indices::DEVICE_VTABLE_LEN];
            slots[indices::END_SCENE] = stub_present as *const ();
            slots[indices::RESET] = stub_reset as *const ();
            Self {
                slots: Mutex::new(slots),
                present_index: indices::END_SCENE,
                reset_index: indices::RESET,
                hide: None,
            }
        }

        pub fn slot(&self, index: usize) -> *const () {
            self.slots.lock()[index]
        }

        pub fn set_slot(&self, index: usize, value: *const ()) {
            self.slots.lock()[index] = value;
        }

        pub fn present_slot(&self) -> *const () {
            self.slot(self.present_index)
        }

        pub fn reset_slot(&self) -> *const () {
            self.slot(self.reset_index)
        }
    }

    impl EntryPointLocator for FakeVTable {
        fn locate(&self, entry: EntryPoint) -> Option<DispatchSlot> {
            if self.hide == Some(entry) {
                return None;
            }
            let index = match entry {
                EntryPoint::Present => self.present_index,
                EntryPoint::Reset => self.reset_index,
            };
            let mut slots = self.slots.lock();
            DispatchSlot::new(&mut slots[index] as *mut *const ())
        }
    }

    pub(crate) const HOST_WINDOW: usize = 0x5000;

    /// Window resolver that can be switched off to simulate startup
    pub(crate) struct FakeWindows {
        pub available: AtomicBool,
        pub window: AtomicUsize,
    }

    impl FakeWindows {
        pub fn new(available: bool) -> Self {
            Self {
                available: AtomicBool::new(available),
                window: AtomicUsize::new(HOST_WINDOW),
            }
        }
    }

    impl WindowResolver for FakeWindows {
        fn resolve_window(&self, _device: DeviceHandle) -> Option<WindowHandle> {
            if self.available.load(Ordering::SeqCst) {
                WindowHandle::from_raw(self.window.load(Ordering::SeqCst) as *mut _)
            } else {
                None
            }
        }
    }

    /// The host's own window procedure
    pub(crate) unsafe extern "system" fn host_window_proc(
        _hwnd: *mut c_void,
        msg: u32,
        _wparam: usize,
        _lparam: isize,
    ) -> isize {
        msg as isize + 1000
    }

    /// Window procedure table of the host's windows
    #[derive(Default)]
    pub(crate) struct FakeSubclasser {
        procedures: Mutex<HashMap<usize, usize>>,
        pub restores: AtomicUsize,
    }

    impl FakeSubclasser {
        pub fn with_windows(windows: &[usize]) -> Self {
            let subclasser = Self::default();
            for &window in windows {
                subclasser.add_window(window);
            }
            subclasser
        }

        pub fn add_window(&self, window: usize) {
            self.procedures
                .lock()
                .insert(window, host_window_proc as usize);
        }

        pub fn procedure(&self, window: usize) -> Option<usize> {
            self.procedures.lock().get(&window).copied()
        }
    }

    impl WindowSubclasser for FakeSubclasser {
        fn subclass(&self, window: WindowHandle, procedure: WindowProcFn) -> Option<usize> {
            let mut procedures = self.procedures.lock();
            let slot = procedures.get_mut(&(window.as_raw() as usize))?;
            Some(std::mem::replace(slot, procedure as usize))
        }

        fn restore(&self, window: WindowHandle, previous: usize) -> bool {
            self.restores.fetch_add(1, Ordering::SeqCst);
            self.procedures
                .lock()
                .insert(window.as_raw() as usize, previous)
                .is_some()
        }
    }

    pub(crate) fn message(window: usize, msg: u32) -> WindowMessage {
        WindowMessage {
            window: WindowHandle::from_raw(window as *mut c_void).unwrap(),
            msg,
            wparam: 0,
            lparam: 0,
        }
    }

    pub(crate) fn device(addr: usize) -> DeviceHandle {
        DeviceHandle::from_raw(addr as *mut IDirect3DDevice9).unwrap()
    }

    fn hook_with(table: FakeVTable, windows: bool) -> (Arc<FakeVTable>, Arc<FakeWindows>, RenderHook) {
        let table = Arc::new(table);
        let windows = Arc::new(FakeWindows::new(windows));
        let hook = RenderHook::new(table.clone(), windows.clone());
        (table, windows, hook)
    }

    fn recorded_events(hook: &RenderHook) -> Arc<Mutex<Vec<CaptureEvent>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        hook.on_capture(move |event| sink.lock().push(*event));
        events
    }

    #[test]
    fn test_initialize_installs_both_hooks() {
        let (table, _, hook) = hook_with(FakeVTable::new(), true);
        assert_eq!(hook.state(), CaptureState::Uninitialized);

        hook.initialize().unwrap();
        assert_eq!(hook.state(), CaptureState::Installed);
        assert_eq!(table.present_slot(), detours::present_detour as *const ());
        assert_eq!(table.reset_slot(), detours::reset_detour as *const ());
        assert_eq!(
            hook.original_present().map(|f| f as *const ()),
            Some(stub_present as *const ())
        );
        assert_eq!(
            hook.original_reset().map(|f| f as *const ()),
            Some(stub_reset as *const ())
        );

        // Idempotent
        hook.initialize().unwrap();
        assert_eq!(hook.state(), CaptureState::Installed);
    }

    #[test]
    fn test_missing_entry_point_fails() {
        let mut table = FakeVTable::new();
        table.hide = Some(EntryPoint::Reset);
        let (table, _, hook) = hook_with(table, true);

        let result = hook.initialize();
        assert!(matches!(
            result,
            Err(HookInstallError::EntryPointNotFound(EntryPoint::Reset))
        ));
        assert_eq!(hook.state(), CaptureState::Uninitialized);
        assert_eq!(table.present_slot(), stub_present as *const ());
    }

    #[test]
    fn test_failed_reset_hook_rolls_back_present() {
        let table = FakeVTable::new();
        table.set_slot(indices::RESET, std::ptr::null());
        let (table, _, hook) = hook_with(table, true);

        assert!(hook.initialize().is_err());
        assert_eq!(hook.state(), CaptureState::Uninitialized);
        assert_eq!(table.present_slot(), stub_present as *const ());
        assert!(hook.original_present().is_none());
    }

    #[test]
    fn test_capture_is_cached() {
        let (_, _, hook) = hook_with(FakeVTable::new(), true);
        let events = recorded_events(&hook);
        hook.initialize().unwrap();

        let first = hook.try_capture(device(0x1000)).unwrap();
        let second = hook.try_capture(device(0x1000)).unwrap();

        assert_eq!(first, second);
        assert_eq!(hook.state(), CaptureState::Capturing);
        assert_eq!(*events.lock(), vec![CaptureEvent::Captured(first)]);
    }

    #[test]
    fn test_capture_before_initialize() {
        let (_, _, hook) = hook_with(FakeVTable::new(), true);
        assert_eq!(
            hook.try_capture(device(0x1000)),
            Err(CaptureError::NotInstalled)
        );
        assert_eq!(hook.current_device(), Err(CaptureError::NotInstalled));
    }

    #[test]
    fn test_no_window_is_retryable() {
        let (_, windows, hook) = hook_with(FakeVTable::new(), false);
        hook.initialize().unwrap();

        let err = hook.try_capture(device(0x1000)).unwrap_err();
        assert_eq!(err, CaptureError::NoWindow);
        assert!(err.is_retryable());
        assert_eq!(hook.state(), CaptureState::Installed);

        windows.available.store(true, Ordering::SeqCst);
        assert!(hook.try_capture(device(0x1000)).is_ok());
        assert_eq!(hook.state(), CaptureState::Capturing);
    }

    #[test]
    fn test_do_reset_two_phases() {
        let (_, _, hook) = hook_with(FakeVTable::new(), true);
        let events = recorded_events(&hook);
        hook.initialize().unwrap();
        let before = hook.try_capture(device(0x1000)).unwrap();

        let observed = Mutex::new(None);
        let result = hook.do_reset(device(0x1000), || {
            *observed.lock() = Some((
                hook.state(),
                hook.current_device(),
                hook.try_capture(device(0x1000)),
                hook.is_current(&before),
            ));
            S_OK
        });
        assert_eq!(result, S_OK);

        let (state, current, capture, still_current) = observed.lock().take().unwrap();
        assert_eq!(state, CaptureState::Lost);
        assert_eq!(current, Err(CaptureError::DeviceLost));
        assert_eq!(capture, Err(CaptureError::DeviceLost));
        assert!(!still_current);

        let after = hook.current_device().unwrap();
        assert!(after.generation > before.generation);
        assert!(!hook.is_current(&before));
        assert!(hook.is_current(&after));
        assert_eq!(
            *events.lock(),
            vec![
                CaptureEvent::Captured(before),
                CaptureEvent::Lost {
                    generation: before.generation
                },
                CaptureEvent::Restored(after),
            ]
        );
    }

    #[test]
    fn test_failed_reset_stays_lost() {
        let (_, _, hook) = hook_with(FakeVTable::new(), true);
        hook.initialize().unwrap();
        let before = hook.try_capture(device(0x1000)).unwrap();

        assert_eq!(
            hook.do_reset(device(0x1000), || D3DERR_DEVICELOST),
            D3DERR_DEVICELOST
        );
        assert_eq!(hook.state(), CaptureState::Lost);

        let after = hook.try_capture(device(0x1000)).unwrap();
        assert!(after.generation > before.generation);
        assert_eq!(hook.state(), CaptureState::Capturing);
    }

    #[test]
    fn test_device_replacement_is_loss_then_recapture() {
        let (_, _, hook) = hook_with(FakeVTable::new(), true);
        let events = recorded_events(&hook);
        hook.initialize().unwrap();

        let old = hook.try_capture(device(0x1000)).unwrap();
        let new = hook.try_capture(device(0x2000)).unwrap();

        assert_ne!(old.handle, new.handle);
        assert_eq!(
            *events.lock(),
            vec![
                CaptureEvent::Captured(old),
                CaptureEvent::Lost {
                    generation: old.generation
                },
                CaptureEvent::Restored(new),
            ]
        );
    }

    #[test]
    fn test_free_capture_keeps_hooks() {
        let (table, _, hook) = hook_with(FakeVTable::new(), true);
        hook.initialize().unwrap();
        let before = hook.try_capture(device(0x1000)).unwrap();

        hook.free_capture();
        assert_eq!(hook.state(), CaptureState::Lost);
        assert_eq!(table.present_slot(), detours::present_detour as *const ());

        let after = hook.try_capture(device(0x1000)).unwrap();
        assert!(after.generation > before.generation);
    }

    #[test]
    fn test_present_fires_listeners_only_when_captured() {
        let (_, windows, hook) = hook_with(FakeVTable::new(), false);
        hook.initialize().unwrap();
        let frames = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&frames);
        hook.on_present(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        hook.present(device(0x1000));
        assert_eq!(frames.load(Ordering::SeqCst), 0);

        windows.available.store(true, Ordering::SeqCst);
        hook.present(device(0x1000));
        hook.present(device(0x1000));
        assert_eq!(frames.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_dispose_twice() {
        let (table, _, hook) = hook_with(FakeVTable::new(), true);
        let events = recorded_events(&hook);
        hook.initialize().unwrap();
        let captured = hook.try_capture(device(0x1000)).unwrap();

        hook.dispose();
        assert_eq!(hook.state(), CaptureState::Disposed);
        assert_eq!(table.present_slot(), stub_present as *const ());
        assert_eq!(table.reset_slot(), stub_reset as *const ());
        assert_eq!(hook.listener_count(), 0);
        assert_eq!(
            events.lock().last(),
            Some(&CaptureEvent::Lost {
                generation: captured.generation
            })
        );

        hook.dispose();
        assert_eq!(hook.state(), CaptureState::Disposed);
        assert_eq!(hook.try_capture(device(0x1000)), Err(CaptureError::Disposed));
        assert!(matches!(hook.initialize(), Err(HookInstallError::Disposed)));
    }

    #[test]
    fn test_window_subclassed_while_captured() {
        let subclasser = Arc::new(FakeSubclasser::with_windows(&[HOST_WINDOW, 0x6000]));
        let (_, windows, hook) = hook_with(FakeVTable::new(), true);
        let hook = hook.with_subclasser(subclasser.clone());
        hook.initialize().unwrap();
        assert_eq!(hook.subclassed_window(), None);

        hook.try_capture(device(0x1000)).unwrap();
        assert_eq!(
            subclasser.procedure(HOST_WINDOW),
            Some(detours::window_proc_detour as usize)
        );
        assert_eq!(
            hook.subclassed_window().map(|w| w.as_raw() as usize),
            Some(HOST_WINDOW)
        );

        // A new device presenting into the same window keeps the subclass
        hook.try_capture(device(0x2000)).unwrap();
        assert_eq!(subclasser.restores.load(Ordering::SeqCst), 0);

        hook.free_capture();
        assert_eq!(hook.subclassed_window(), None);
        assert_eq!(
            subclasser.procedure(HOST_WINDOW),
            Some(host_window_proc as usize)
        );

        // Recapture into another window
        windows.window.store(0x6000, Ordering::SeqCst);
        hook.try_capture(device(0x2000)).unwrap();
        assert_eq!(
            subclasser.procedure(0x6000),
            Some(detours::window_proc_detour as usize)
        );
        assert_eq!(
            subclasser.procedure(HOST_WINDOW),
            Some(host_window_proc as usize)
        );

        hook.dispose();
        assert_eq!(hook.subclassed_window(), None);
        assert_eq!(subclasser.procedure(0x6000), Some(host_window_proc as usize));
        assert_eq!(subclasser.restores.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_window_switch_restores_previous_window() {
        let subclasser = Arc::new(FakeSubclasser::with_windows(&[HOST_WINDOW, 0x6000]));
        let (_, windows, hook) = hook_with(FakeVTable::new(), true);
        let hook = hook.with_subclasser(subclasser.clone());
        hook.initialize().unwrap();

        hook.try_capture(device(0x1000)).unwrap();
        windows.window.store(0x6000, Ordering::SeqCst);
        hook.try_capture(device(0x2000)).unwrap();

        assert_eq!(
            subclasser.procedure(HOST_WINDOW),
            Some(host_window_proc as usize)
        );
        assert_eq!(
            hook.subclassed_window().map(|w| w.as_raw() as usize),
            Some(0x6000)
        );
    }

    #[test]
    fn test_window_messages_consumed_or_passed_on() {
        let subclasser = Arc::new(FakeSubclasser::with_windows(&[HOST_WINDOW]));
        let (_, _, hook) = hook_with(FakeVTable::new(), true);
        let hook = hook.with_subclasser(subclasser);
        hook.initialize().unwrap();

        // Nothing to pass on to before a window was subclassed
        assert_eq!(hook.call_original_window_proc(&message(HOST_WINDOW, 0x0F)), None);

        hook.try_capture(device(0x1000)).unwrap();
        hook.on_window_message(|message| (message.msg == 0x0100).then_some(1));

        assert_eq!(hook.window_message(&message(HOST_WINDOW, 0x0100)), Some(1));
        assert_eq!(hook.window_message(&message(HOST_WINDOW, 0x0F)), None);
        assert_eq!(
            hook.call_original_window_proc(&message(HOST_WINDOW, 0x0F)),
            Some(0x0F + 1000)
        );
    }

    #[test]
    fn test_window_destroy_restores_procedure() {
        let subclasser = Arc::new(FakeSubclasser::with_windows(&[HOST_WINDOW]));
        let (_, _, hook) = hook_with(FakeVTable::new(), true);
        let hook = hook.with_subclasser(subclasser.clone());
        hook.initialize().unwrap();
        hook.try_capture(device(0x1000)).unwrap();
        hook.on_window_message(|_| Some(1));

        let destroy = message(HOST_WINDOW, WM_NCDESTROY);
        assert_eq!(hook.window_message(&destroy), None);
        assert_eq!(hook.subclassed_window(), None);
        assert_eq!(
            subclasser.procedure(HOST_WINDOW),
            Some(host_window_proc as usize)
        );
    }

    #[test]
    fn test_no_subclasser_leaves_windows_alone() {
        let (_, _, hook) = hook_with(FakeVTable::new(), true);
        hook.initialize().unwrap();
        hook.try_capture(device(0x1000)).unwrap();
        hook.on_window_message(|_| Some(1));

        assert_eq!(hook.subclassed_window(), None);
        assert_eq!(hook.call_original_window_proc(&message(HOST_WINDOW, 0x0F)), None);
    }
}
