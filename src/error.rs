use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced to the host application.
///
/// Event-dispatch failures inside the message pump (a delivered menu or
/// hotkey identifier that no longer resolves) are logged and swallowed
/// there; they never appear here.
#[derive(Debug, Error)]
pub enum Error {
    #[error("window class registration failed")]
    ClassRegistrationFailed,

    #[error("hidden window creation failed")]
    WindowCreationFailed,

    #[error("native menu creation failed")]
    MenuCreationFailed,

    #[error("icon load failed: {0}")]
    IconLoad(String),

    #[error("invalid hotkey `{0}`: expected `[modifier+]*key` with a single trailing key character")]
    InvalidHotkey(String),

    #[error("hotkey `{spec}` registration failed (os error {code})")]
    HotkeyRegistrationFailed { spec: String, code: u32 },
}
