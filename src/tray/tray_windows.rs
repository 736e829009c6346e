use crate::error::{Error, Result};
use crate::hotkey::{self, Hotkey, Modifiers};
use crate::icon::{self, TrayIcon};
use crate::menu::{self, ID_FIRST, MenuItem, NativeNode};
use crate::tray::{HotkeyHandler, PumpOutcome, Tray};
use log::{debug, warn};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::mem;
use std::os::windows::ffi::OsStrExt as _;
use std::ptr;
use std::sync::OnceLock;
use windows_sys::Win32::{
    Foundation::{
        ERROR_CLASS_ALREADY_EXISTS, ERROR_HOTKEY_ALREADY_REGISTERED, GetLastError, HMODULE, HWND,
        LPARAM, LRESULT, POINT, WPARAM,
    },
    Graphics::Gdi::{
        BI_RGB, BITMAPINFO, BITMAPINFOHEADER, CreateBitmap, CreateDIBSection, DIB_RGB_COLORS,
        DeleteObject,
    },
    System::{
        DataExchange::{GlobalAddAtomW, GlobalDeleteAtom, GlobalFindAtomW, GlobalGetAtomNameW},
        LibraryLoader::GetModuleHandleW,
    },
    UI::{
        Input::KeyboardAndMouse::{
            GetKeyState, GetKeyboardLayout, MOD_ALT, MOD_CONTROL, MOD_NOREPEAT, MOD_SHIFT, MOD_WIN,
            RegisterHotKey, UnregisterHotKey, VK_CAPITAL, VkKeyScanExW,
        },
        Shell::{
            ExtractIconExW, NIF_ICON, NIF_MESSAGE, NIF_TIP, NIM_ADD, NIM_DELETE, NIM_MODIFY,
            NOTIFYICONDATAW, Shell_NotifyIconW,
        },
        WindowsAndMessaging::{
            AppendMenuW, CREATESTRUCTW, CW_USEDEFAULT, CreateIconIndirect, CreatePopupMenu,
            CreateWindowExW, DefWindowProcW, DestroyIcon, DestroyMenu, DestroyWindow,
            DispatchMessageW, GWLP_USERDATA, GetCursorPos, GetMessageW, GetWindowLongPtrW, HICON,
            HMENU, ICONINFO, IDC_ARROW, InsertMenuItemW, LoadCursorW, MENUITEMINFOW, MF_SEPARATOR,
            MFS_CHECKED, MFS_DISABLED, MIIM_ID, MIIM_STATE, MIIM_STRING, MIIM_SUBMENU, MSG,
            PM_REMOVE, PeekMessageW, PostQuitMessage, RegisterClassW, RegisterWindowMessageW,
            SendMessageW, SetForegroundWindow, SetWindowLongPtrW, TPM_LEFTALIGN, TPM_NONOTIFY,
            TPM_RETURNCMD, TPM_RIGHTBUTTON, TrackPopupMenu, TranslateMessage, UnregisterClassW,
            WM_CLOSE, WM_COMMAND, WM_CREATE, WM_DESTROY, WM_HOTKEY, WM_INITMENUPOPUP, WM_LBUTTONUP,
            WM_QUIT, WM_RBUTTONUP, WM_USER, WNDCLASSW, WS_OVERLAPPEDWINDOW,
        },
    },
};

// Tray callback must be in WM_USER..0x7FFF per Shell_NotifyIconW requirements.
const TRAY_CALLBACK_MESSAGE: u32 = WM_USER + 1;

/// Everything the hidden window needs at message time. Heap-pinned so the
/// window can hold a stable pointer to it in `GWLP_USERDATA`.
struct TrayState {
    hwnd: HWND,
    menu: HMENU,
    hicon: HICON,
    tooltip: String,
    /// Dynamically registered "the taskbar process restarted" message.
    taskbar_created: u32,
    /// Command identifier -> source descriptor, rebuilt on every update.
    arena: HashMap<u32, MenuItem>,
    hotkey_handler: Option<HotkeyHandler>,
}

pub(crate) struct Backend {
    state: Box<TrayState>,
}

fn to_wide_null(text: impl AsRef<OsStr>) -> Vec<u16> {
    text.as_ref().encode_wide().chain(Some(0)).collect()
}

fn class_name() -> &'static [u16] {
    static NAME: OnceLock<Vec<u16>> = OnceLock::new();
    NAME.get_or_init(|| to_wide_null("MinitrayHiddenWindow"))
        .as_slice()
}

unsafe fn state_from_window(hwnd: HWND) -> Option<&'static mut TrayState> {
    let state_ptr = unsafe { GetWindowLongPtrW(hwnd, GWLP_USERDATA) } as *mut TrayState;
    unsafe { state_ptr.as_mut() }
}

unsafe extern "system" fn wndproc(
    hwnd: HWND,
    message: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    match message {
        WM_CREATE => {
            let create = lparam as *const CREATESTRUCTW;
            if let Some(create) = unsafe { create.as_ref() } {
                unsafe {
                    SetWindowLongPtrW(hwnd, GWLP_USERDATA, create.lpCreateParams as isize);
                }
            }
            0
        }
        WM_CLOSE => {
            unsafe {
                let _ = DestroyWindow(hwnd);
            }
            0
        }
        WM_DESTROY => {
            unsafe {
                PostQuitMessage(0);
            }
            0
        }
        TRAY_CALLBACK_MESSAGE
            if lparam as u32 == WM_LBUTTONUP || lparam as u32 == WM_RBUTTONUP =>
        {
            let Some(state) = (unsafe { state_from_window(hwnd) }) else {
                return 0;
            };

            // Modal popup: this blocks until the user selects or dismisses,
            // and the selection comes back as the return value.
            unsafe {
                let mut point = POINT { x: 0, y: 0 };
                let _ = GetCursorPos(&mut point);
                let _ = SetForegroundWindow(hwnd);
                let command = TrackPopupMenu(
                    state.menu,
                    TPM_LEFTALIGN | TPM_RIGHTBUTTON | TPM_RETURNCMD | TPM_NONOTIFY,
                    point.x,
                    point.y,
                    0,
                    hwnd,
                    ptr::null(),
                );
                // Zero means dismissed; WM_COMMAND ignores it below ID_FIRST.
                let _ = SendMessageW(hwnd, WM_COMMAND, command as u32 as usize, 0);
            }
            0
        }
        WM_COMMAND if (wparam & 0xFFFF) as u32 >= ID_FIRST => {
            let id = (wparam & 0xFFFF) as u32;
            let entry =
                unsafe { state_from_window(hwnd) }.and_then(|state| state.arena.get(&id).cloned());
            match entry {
                Some(item) => {
                    if let Some(callback) = item.callback.clone() {
                        callback(&item);
                    }
                }
                None => debug!("menu command {id} has no backing item; dropping"),
            }
            0
        }
        WM_HOTKEY => {
            let atom = wparam as u16;
            let mut name = [0u16; 128];
            let len = unsafe { GlobalGetAtomNameW(atom, name.as_mut_ptr(), name.len() as i32) };
            if len == 0 {
                // Unknown atom, most likely a stale registration.
                debug!("hotkey atom {atom} has no name; unregistering it");
                unsafe {
                    let _ = UnregisterHotKey(hwnd, atom as i32);
                }
                return 0;
            }
            let spec = String::from_utf16_lossy(&name[..len as usize]);
            let caps_on = unsafe { GetKeyState(VK_CAPITAL as i32) } & 1 != 0;
            let delivered = hotkey::caps_adjusted(&spec, caps_on);
            if let Some(state) = unsafe { state_from_window(hwnd) } {
                if let Some(handler) = state.hotkey_handler.as_mut() {
                    handler(&delivered);
                }
            }
            0
        }
        message => {
            if let Some(state) = unsafe { state_from_window(hwnd) } {
                if state.taskbar_created != 0 && message == state.taskbar_created {
                    // The shell purges every icon when it restarts.
                    unsafe {
                        let data = state.notify_data();
                        if Shell_NotifyIconW(NIM_ADD, &data) == 0 {
                            warn!("failed to re-add tray icon after shell restart");
                        }
                    }
                    return 0;
                }
            }
            unsafe { DefWindowProcW(hwnd, message, wparam, lparam) }
        }
    }
}

fn register_window_class(instance: HMODULE) -> Result<()> {
    unsafe {
        let class = WNDCLASSW {
            style: 0,
            lpfnWndProc: Some(wndproc),
            cbClsExtra: 0,
            cbWndExtra: 0,
            hInstance: instance,
            hIcon: 0,
            hCursor: LoadCursorW(0, IDC_ARROW),
            hbrBackground: 0,
            lpszMenuName: ptr::null(),
            lpszClassName: class_name().as_ptr(),
        };
        if RegisterClassW(&class) == 0 && GetLastError() != ERROR_CLASS_ALREADY_EXISTS {
            return Err(Error::ClassRegistrationFailed);
        }
    }
    Ok(())
}

impl TrayState {
    /// Shared `NOTIFYICONDATAW` skeleton for add/modify/delete calls.
    fn notify_data(&self) -> NOTIFYICONDATAW {
        let mut data: NOTIFYICONDATAW = unsafe { mem::zeroed() };
        data.cbSize = mem::size_of::<NOTIFYICONDATAW>() as u32;
        data.hWnd = self.hwnd;
        data.uID = 0;
        data.uFlags = NIF_ICON | NIF_MESSAGE;
        data.uCallbackMessage = TRAY_CALLBACK_MESSAGE;
        data.hIcon = self.hicon;
        if !self.tooltip.is_empty() {
            data.uFlags |= NIF_TIP;
            let tip = to_wide_null(self.tooltip.as_str());
            let copy_len = (tip.len() - 1).min(data.szTip.len() - 1);
            data.szTip[..copy_len].copy_from_slice(&tip[..copy_len]);
        }
        data
    }
}

impl Backend {
    pub(crate) fn init(tray: Tray) -> Result<Self> {
        let instance = unsafe { GetModuleHandleW(ptr::null()) };
        if instance == 0 {
            return Err(Error::ClassRegistrationFailed);
        }
        register_window_class(instance)?;

        let taskbar_created =
            unsafe { RegisterWindowMessageW(to_wide_null("TaskbarCreated").as_ptr()) };

        let mut state = Box::new(TrayState {
            hwnd: 0,
            menu: 0,
            hicon: 0,
            tooltip: String::new(),
            taskbar_created,
            arena: HashMap::new(),
            hotkey_handler: None,
        });

        unsafe {
            let hwnd = CreateWindowExW(
                0,
                class_name().as_ptr(),
                class_name().as_ptr(),
                WS_OVERLAPPEDWINDOW,
                CW_USEDEFAULT,
                CW_USEDEFAULT,
                CW_USEDEFAULT,
                CW_USEDEFAULT,
                0,
                0,
                instance,
                state.as_mut() as *mut TrayState as *const _,
            );
            if hwnd == 0 {
                return Err(Error::WindowCreationFailed);
            }
            state.hwnd = hwnd;

            let data = state.notify_data();
            if Shell_NotifyIconW(NIM_ADD, &data) == 0 {
                // Not fatal: the TaskbarCreated path re-adds the icon.
                warn!("Shell_NotifyIconW(NIM_ADD) failed");
            }
        }

        let mut backend = Self { state };
        backend.update(tray)?;
        Ok(backend)
    }

    pub(crate) fn pump(&mut self, blocking: bool) -> PumpOutcome {
        let mut msg: MSG = unsafe { mem::zeroed() };
        unsafe {
            if blocking {
                if GetMessageW(&mut msg, self.state.hwnd, 0, 0) == -1 {
                    warn!("GetMessageW failed (os error {})", GetLastError());
                    return PumpOutcome::Quit;
                }
            } else if PeekMessageW(&mut msg, self.state.hwnd, 0, 0, PM_REMOVE) == 0 {
                return PumpOutcome::Continue;
            }
            if msg.message == WM_QUIT {
                return PumpOutcome::Quit;
            }
            let _ = TranslateMessage(&msg);
            let _ = DispatchMessageW(&msg);
        }
        PumpOutcome::Continue
    }

    pub(crate) fn update(&mut self, tray: Tray) -> Result<()> {
        let layout = menu::project(&tray.menu);
        let new_menu = build_native_menu(&layout.nodes)?;
        let new_icon = match load_icon(&tray.icon) {
            Ok(hicon) => hicon,
            Err(err) => {
                unsafe {
                    let _ = DestroyMenu(new_menu);
                }
                return Err(err);
            }
        };

        let state = self.state.as_mut();
        state.arena = layout.arena;
        let prev_menu = state.menu;
        state.menu = new_menu;
        if state.hicon != 0 {
            unsafe {
                let _ = DestroyIcon(state.hicon);
            }
        }
        state.hicon = new_icon;
        state.tooltip = tray.tooltip;

        unsafe {
            let _ = SendMessageW(state.hwnd, WM_INITMENUPOPUP, new_menu as usize, 0);
            let data = state.notify_data();
            if Shell_NotifyIconW(NIM_MODIFY, &data) == 0 {
                warn!("Shell_NotifyIconW(NIM_MODIFY) failed");
            }
            // The previous menu goes away only after the new one is live.
            if prev_menu != 0 {
                let _ = DestroyMenu(prev_menu);
            }
        }
        Ok(())
    }

    pub(crate) fn set_hotkey_handler(&mut self, handler: HotkeyHandler) {
        self.state.hotkey_handler = Some(handler);
    }

    pub(crate) fn register_hotkey(&mut self, hotkey: &Hotkey) -> Result<()> {
        let canonical = hotkey.canonical();
        let scan = unsafe {
            let layout = GetKeyboardLayout(0);
            VkKeyScanExW(hotkey.key() as u16, layout)
        };
        if scan == -1 {
            return Err(Error::InvalidHotkey(canonical.to_owned()));
        }
        let vk = (scan as u16 & 0xFF) as u32;
        let mods = modifier_mask(hotkey.modifiers()) | MOD_NOREPEAT;

        let atom = unsafe { GlobalAddAtomW(to_wide_null(canonical).as_ptr()) };
        if unsafe { RegisterHotKey(self.state.hwnd, atom as i32, mods, vk) } != 0 {
            return Ok(());
        }

        let code = unsafe { GetLastError() };
        if code == ERROR_HOTKEY_ALREADY_REGISTERED {
            // Idempotent: the combination is already live.
            return Ok(());
        }
        unsafe {
            let _ = GlobalDeleteAtom(atom);
        }
        Err(Error::HotkeyRegistrationFailed {
            spec: canonical.to_owned(),
            code,
        })
    }

    pub(crate) fn unregister_hotkey(&mut self, spec: &str) {
        let canonical = spec.to_ascii_lowercase();
        let atom = unsafe { GlobalFindAtomW(to_wide_null(canonical.as_str()).as_ptr()) };
        if atom == 0 {
            debug!("hotkey `{canonical}` was not registered; nothing to do");
            return;
        }
        unsafe {
            let _ = UnregisterHotKey(self.state.hwnd, atom as i32);
            let _ = GlobalDeleteAtom(atom);
        }
    }
}

impl Drop for Backend {
    fn drop(&mut self) {
        let state = self.state.as_mut();
        unsafe {
            let data = state.notify_data();
            let _ = Shell_NotifyIconW(NIM_DELETE, &data);
            if state.hicon != 0 {
                let _ = DestroyIcon(state.hicon);
                state.hicon = 0;
            }
            if state.menu != 0 {
                let _ = DestroyMenu(state.menu);
                state.menu = 0;
            }
            if state.hwnd != 0 {
                // Detach the state pointer, then let WM_DESTROY post the quit.
                SetWindowLongPtrW(state.hwnd, GWLP_USERDATA, 0);
                let _ = DestroyWindow(state.hwnd);
                state.hwnd = 0;
            }
            let _ = UnregisterClassW(class_name().as_ptr(), GetModuleHandleW(ptr::null()));
        }
    }
}

fn modifier_mask(modifiers: Modifiers) -> u32 {
    let mut mask = 0;
    if modifiers.ctrl {
        mask |= MOD_CONTROL;
    }
    if modifiers.win {
        mask |= MOD_WIN;
    }
    if modifiers.shift {
        mask |= MOD_SHIFT;
    }
    if modifiers.alt {
        mask |= MOD_ALT;
    }
    mask
}

/// Realize a projected layout as a native popup menu, depth-first so every
/// submenu handle exists before its parent row is inserted.
fn build_native_menu(nodes: &[NativeNode]) -> Result<HMENU> {
    let menu = unsafe { CreatePopupMenu() };
    if menu == 0 {
        return Err(Error::MenuCreationFailed);
    }

    for (position, node) in nodes.iter().enumerate() {
        match node {
            NativeNode::Separator => unsafe {
                let _ = AppendMenuW(menu, MF_SEPARATOR, 0, ptr::null());
            },
            NativeNode::Command {
                id,
                label,
                disabled,
                checked,
                submenu,
            } => {
                let mut info: MENUITEMINFOW = unsafe { mem::zeroed() };
                info.cbSize = mem::size_of::<MENUITEMINFOW>() as u32;
                info.fMask = MIIM_ID | MIIM_STRING | MIIM_STATE;
                info.wID = *id;
                if *disabled {
                    info.fState |= MFS_DISABLED;
                }
                if *checked {
                    info.fState |= MFS_CHECKED;
                }
                if !submenu.is_empty() {
                    info.fMask |= MIIM_SUBMENU;
                    info.hSubMenu = build_native_menu(submenu)?;
                }
                let mut label_w = to_wide_null(label.as_str());
                info.dwTypeData = label_w.as_mut_ptr();
                unsafe {
                    let _ = InsertMenuItemW(menu, position as u32, 1, &info);
                }
            }
        }
    }

    Ok(menu)
}

fn load_icon(source: &TrayIcon) -> Result<HICON> {
    match source {
        TrayIcon::Path(path) => {
            let wide = to_wide_null(path.as_os_str());
            let mut hicon: HICON = 0;
            let count = unsafe { ExtractIconExW(wide.as_ptr(), 0, ptr::null_mut(), &mut hicon, 1) };
            if count == 0 || hicon == 0 {
                return Err(Error::IconLoad(format!(
                    "no icon resource in {}",
                    path.display()
                )));
            }
            Ok(hicon)
        }
        TrayIcon::Image {
            width,
            height,
            bytes,
        } => hicon_from_bgra32(*width, *height, bytes),
    }
}

/// Build an `HICON` from top-down BGRA32 pixels via a DIB section plus an
/// all-opaque 1bpp mask.
fn hicon_from_bgra32(width: u32, height: u32, bgra: &[u8]) -> Result<HICON> {
    icon::check_bgra32_len(width, height, bgra)?;

    let mut bmi: BITMAPINFO = unsafe { mem::zeroed() };
    bmi.bmiHeader = BITMAPINFOHEADER {
        biSize: mem::size_of::<BITMAPINFOHEADER>() as u32,
        biWidth: width as i32,
        // Negative height = top-down, so we don't need to flip rows.
        biHeight: -(height as i32),
        biPlanes: 1,
        biBitCount: 32,
        biCompression: BI_RGB as u32,
        biSizeImage: 0,
        biXPelsPerMeter: 0,
        biYPelsPerMeter: 0,
        biClrUsed: 0,
        biClrImportant: 0,
    };

    unsafe {
        let mut bits_ptr: *mut core::ffi::c_void = ptr::null_mut();
        let color_bmp = CreateDIBSection(0, &bmi, DIB_RGB_COLORS, &mut bits_ptr, 0, 0);
        if color_bmp == 0 || bits_ptr.is_null() {
            return Err(Error::IconLoad("CreateDIBSection failed".into()));
        }
        ptr::copy_nonoverlapping(bgra.as_ptr(), bits_ptr.cast::<u8>(), bgra.len());

        // 1bpp mask rows are padded to 32 bits; all zero = fully opaque.
        let mask_stride = ((width as usize + 31) / 32) * 4;
        let mask_bytes = vec![0u8; mask_stride * height as usize];
        let mask_bmp = CreateBitmap(width as i32, height as i32, 1, 1, mask_bytes.as_ptr().cast());
        if mask_bmp == 0 {
            let _ = DeleteObject(color_bmp);
            return Err(Error::IconLoad("CreateBitmap(mask) failed".into()));
        }

        let mut ii: ICONINFO = mem::zeroed();
        ii.fIcon = 1;
        ii.xHotspot = 0;
        ii.yHotspot = 0;
        ii.hbmColor = color_bmp;
        ii.hbmMask = mask_bmp;

        let hicon = CreateIconIndirect(&ii);
        // The icon copies the bitmaps; we can delete them afterwards.
        let _ = DeleteObject(color_bmp);
        let _ = DeleteObject(mask_bmp);

        if hicon == 0 {
            return Err(Error::IconLoad("CreateIconIndirect failed".into()));
        }
        Ok(hicon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifier_mask_covers_every_modifier() {
        let all = Modifiers {
            ctrl: true,
            win: true,
            shift: true,
            alt: true,
        };
        assert_eq!(
            modifier_mask(all),
            MOD_CONTROL | MOD_WIN | MOD_SHIFT | MOD_ALT
        );
        assert_eq!(modifier_mask(Modifiers::default()), 0);
    }

    #[test]
    fn wide_strings_are_null_terminated() {
        let wide = to_wide_null("abc");
        assert_eq!(wide, vec![b'a' as u16, b'b' as u16, b'c' as u16, 0]);
    }
}
