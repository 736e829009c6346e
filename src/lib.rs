//! Minimal system-tray icon abstraction.
//!
//! One hidden window, one notification icon, one cooperative message pump.
//! The Windows backend wraps `Shell_NotifyIconW`, popup-menu construction,
//! and `RegisterHotKey` behind a small safe interface; other platforms fall
//! back to an inert stub so hosts compile unchanged.
//!
//! Everything is single-threaded: menu callbacks and the hotkey handler run
//! synchronously on the thread driving [`TrayHost::pump`].

mod error;
pub mod hotkey;
mod icon;
pub mod menu;
mod tray;

pub use error::{Error, Result};
pub use hotkey::{Hotkey, Modifiers};
pub use icon::TrayIcon;
pub use menu::{MenuItem, SEPARATOR};
pub use tray::{HotkeyHandler, PumpOutcome, Tray, TrayHost};
