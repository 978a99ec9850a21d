//! Dispatch table slot indices
//!
//! Positions of the entry points inside the `IDirect3DDevice9` vtable.
//! Derived from the declaration order in `d3d9.h`.

/// `IDirect3DDevice9::GetCreationParameters`
pub const GET_CREATION_PARAMETERS: usize = 9;

/// `IDirect3DDevice9::Reset`
pub const RESET: usize = 16;

/// `IDirect3DDevice9::Present`
pub const PRESENT: usize = 17;

/// `IDirect3DDevice9::EndScene`
///
/// The overlay draws from here rather than from `Present` so the scene is
/// still open for drawing calls.
pub const END_SCENE: usize = 42;

/// Number of slots in the `IDirect3DDevice9` vtable
pub const DEVICE_VTABLE_LEN: usize = 119;

