//! Inert backend for platforms without a tray implementation. It mirrors
//! the Windows backend's surface so hosts and tests compile everywhere:
//! descriptors are validated and projected, but nothing reaches any OS.

use crate::error::Result;
use crate::hotkey::Hotkey;
use crate::icon::{self, TrayIcon};
use crate::menu::{self, MenuItem};
use crate::tray::{HotkeyHandler, PumpOutcome, Tray};
use log::warn;
use std::collections::HashMap;

pub(crate) struct Backend {
    arena: HashMap<u32, MenuItem>,
    hotkey_handler: Option<HotkeyHandler>,
}

fn validate_icon(source: &TrayIcon) -> Result<()> {
    if let TrayIcon::Image {
        width,
        height,
        bytes,
    } = source
    {
        icon::check_bgra32_len(*width, *height, bytes)?;
    }
    Ok(())
}

impl Backend {
    pub(crate) fn init(tray: Tray) -> Result<Self> {
        warn!("tray icons are not supported on this platform; running inert");
        let mut backend = Self {
            arena: HashMap::new(),
            hotkey_handler: None,
        };
        backend.update(tray)?;
        Ok(backend)
    }

    pub(crate) fn pump(&mut self, blocking: bool) -> PumpOutcome {
        // No event source exists here; a blocking wait would never wake.
        if blocking {
            PumpOutcome::Quit
        } else {
            PumpOutcome::Continue
        }
    }

    pub(crate) fn update(&mut self, tray: Tray) -> Result<()> {
        validate_icon(&tray.icon)?;
        self.arena = menu::project(&tray.menu).arena;
        Ok(())
    }

    pub(crate) fn set_hotkey_handler(&mut self, handler: HotkeyHandler) {
        self.hotkey_handler = Some(handler);
    }

    pub(crate) fn register_hotkey(&mut self, _hotkey: &Hotkey) -> Result<()> {
        Ok(())
    }

    pub(crate) fn unregister_hotkey(&mut self, _spec: &str) {}
}

#[cfg(test)]
mod tests {
    use crate::{Error, MenuItem, PumpOutcome, Tray, TrayHost, TrayIcon};

    fn host() -> TrayHost {
        let tray = Tray::new(TrayIcon::image(1, 1, vec![0; 4]))
            .tooltip("test")
            .item(MenuItem::new("Open"))
            .item(MenuItem::separator())
            .item(MenuItem::new("Quit"));
        TrayHost::init(tray).expect("stub init accepts a valid descriptor")
    }

    #[test]
    fn poll_pump_returns_immediately_without_dispatching() {
        let mut host = host();
        assert_eq!(host.pump(false), PumpOutcome::Continue);
    }

    #[test]
    fn invalid_hotkey_is_rejected_before_registration() {
        let mut host = host();
        assert!(matches!(
            host.register_hotkey("ctrl"),
            Err(Error::InvalidHotkey(_))
        ));
    }

    #[test]
    fn valid_hotkey_registers_twice_without_error() {
        let mut host = host();
        host.register_hotkey("ctrl+shift+a").unwrap();
        host.register_hotkey("ctrl+shift+a").unwrap();
        host.unregister_hotkey("ctrl+shift+a");
    }

    #[test]
    fn update_replaces_the_menu_tree() {
        let mut host = host();
        let replacement =
            Tray::new(TrayIcon::image(1, 1, vec![0; 4])).menu(vec![MenuItem::new("Only")]);
        host.update(replacement).unwrap();
    }

    #[test]
    fn mismatched_icon_buffer_is_rejected() {
        let tray = Tray::new(TrayIcon::image(16, 16, vec![0; 8]));
        assert!(matches!(TrayHost::init(tray), Err(Error::IconLoad(_))));
    }
}
