use crate::error::Result;
use crate::hotkey::Hotkey;
use crate::icon::TrayIcon;
use crate::menu::MenuItem;

#[cfg(windows)]
mod tray_windows;

#[cfg(not(windows))]
mod tray_stub;

#[cfg(windows)]
use tray_windows as backend;

#[cfg(not(windows))]
use tray_stub as backend;

/// Result of a single [`TrayHost::pump`] step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PumpOutcome {
    /// One message was handled, or none was pending in poll mode.
    Continue,
    /// A quit message was observed; the host should leave its loop.
    Quit,
}

/// Handler invoked with the canonical hotkey string whenever a registered
/// combination fires. The case of the trailing key character follows the
/// live Caps Lock toggle state.
pub type HotkeyHandler = Box<dyn FnMut(&str)>;

/// Descriptor for the tray: which icon to show, the tooltip, and the
/// context menu tree.
pub struct Tray {
    pub(crate) icon: TrayIcon,
    pub(crate) tooltip: String,
    pub(crate) menu: Vec<MenuItem>,
}

impl Tray {
    pub fn new(icon: TrayIcon) -> Self {
        Self {
            icon,
            tooltip: String::new(),
            menu: Vec::new(),
        }
    }

    /// Tooltip shown on hover. An empty tooltip is left unset.
    pub fn tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = tooltip.into();
        self
    }

    pub fn item(mut self, item: MenuItem) -> Self {
        self.menu.push(item);
        self
    }

    pub fn menu(mut self, menu: Vec<MenuItem>) -> Self {
        self.menu = menu;
        self
    }
}

/// The live tray: one hidden window, one notification icon, one message
/// pump. Owns every OS resource the tray needs and releases them on
/// [`exit`](Self::exit) or drop.
///
/// Single-threaded by construction. Menu callbacks and the hotkey handler
/// run synchronously inside [`pump`](Self::pump) on the calling thread, and
/// while the popup menu is open the pump does not return.
pub struct TrayHost {
    backend: backend::Backend,
}

impl TrayHost {
    /// Register the window class, create the hidden window, add the
    /// notification icon, then apply `tray` as the initial state.
    pub fn init(tray: Tray) -> Result<Self> {
        Ok(Self {
            backend: backend::Backend::init(tray)?,
        })
    }

    /// Process at most one pending OS message.
    ///
    /// In blocking mode this waits for the next message; in poll mode it
    /// returns [`PumpOutcome::Continue`] immediately when the queue is
    /// empty.
    pub fn pump(&mut self, blocking: bool) -> PumpOutcome {
        self.backend.pump(blocking)
    }

    /// Re-apply icon, tooltip, and menu tree to the live tray icon.
    ///
    /// The previous native menu is destroyed only after the new one is
    /// installed, so there is no window where the tray has no menu.
    pub fn update(&mut self, tray: Tray) -> Result<()> {
        self.backend.update(tray)
    }

    /// Install the single host-wide hotkey handler.
    pub fn set_hotkey_handler(&mut self, handler: impl FnMut(&str) + 'static) {
        self.backend.set_hotkey_handler(Box::new(handler));
    }

    /// Register a global hotkey such as `"ctrl+shift+a"`.
    ///
    /// Registering a combination that is already registered succeeds.
    pub fn register_hotkey(&mut self, spec: &str) -> Result<()> {
        let hotkey = Hotkey::parse(spec)?;
        self.backend.register_hotkey(&hotkey)
    }

    /// Release a previously registered hotkey. Unknown specs are a no-op.
    pub fn unregister_hotkey(&mut self, spec: &str) {
        self.backend.unregister_hotkey(spec);
    }

    /// Tear down the tray icon, window, and any remaining registrations.
    /// Dropping the host does the same.
    pub fn exit(self) {}
}
