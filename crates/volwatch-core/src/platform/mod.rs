/// Platform bindings — the only code that talks to the OS.
///
/// Windows-only: volume enumeration via the Win32 FindVolume API family.
/// The engine itself is platform-independent; on other hosts this module
/// is empty and embedders supply their own [`crate::source::SnapshotSource`].
#[cfg(windows)]
pub mod volumes;

#[cfg(windows)]
pub use volumes::WindowsVolumeSource;
