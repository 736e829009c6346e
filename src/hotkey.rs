//! Hotkey spec codec.
//!
//! Specs are case-insensitive `+`-joined tokens such as `"ctrl+shift+a"`:
//! any of `ctrl`, `win`, `shift`, `alt` as modifiers, then exactly one key
//! character. The lowercase canonical form keys the registration table.

use crate::error::{Error, Result};

/// Modifier keys recognized in a hotkey spec.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub win: bool,
    pub shift: bool,
    pub alt: bool,
}

/// A parsed global hotkey combination.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hotkey {
    modifiers: Modifiers,
    key: char,
    canonical: String,
}

impl Hotkey {
    /// Parse a spec of the form `[modifier+]*key`.
    ///
    /// Modifier tokens are order-independent and duplicates are harmless.
    /// The token after the last `+` must be exactly one character; anything
    /// else, including a bare key with no `+` at all, is
    /// [`Error::InvalidHotkey`].
    pub fn parse(spec: &str) -> Result<Self> {
        let canonical = spec.to_ascii_lowercase();
        let Some((_, key_token)) = canonical.rsplit_once('+') else {
            return Err(Error::InvalidHotkey(spec.to_owned()));
        };
        let mut chars = key_token.chars();
        let (Some(key), None) = (chars.next(), chars.next()) else {
            return Err(Error::InvalidHotkey(spec.to_owned()));
        };

        let modifiers = Modifiers {
            ctrl: canonical.contains("ctrl+"),
            win: canonical.contains("win+"),
            shift: canonical.contains("shift+"),
            alt: canonical.contains("alt+"),
        };

        Ok(Self {
            modifiers,
            key,
            canonical,
        })
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// The single trailing key character, lowercased.
    pub fn key(&self) -> char {
        self.key
    }

    /// The lowercase string the registration table is keyed by.
    pub fn canonical(&self) -> &str {
        &self.canonical
    }
}

/// Rewrite the trailing key character of a canonical spec to match the
/// current Caps Lock toggle, for delivery to the hotkey handler.
pub fn caps_adjusted(canonical: &str, caps_on: bool) -> String {
    let mut chars: Vec<char> = canonical.chars().collect();
    if let Some(last) = chars.last_mut() {
        *last = if caps_on {
            last.to_ascii_uppercase()
        } else {
            last.to_ascii_lowercase()
        };
    }
    chars.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ctrl_shift_a() {
        let hotkey = Hotkey::parse("ctrl+shift+a").unwrap();
        assert_eq!(
            hotkey.modifiers(),
            Modifiers {
                ctrl: true,
                shift: true,
                ..Modifiers::default()
            }
        );
        assert_eq!(hotkey.key(), 'a');
        assert_eq!(hotkey.canonical(), "ctrl+shift+a");
    }

    #[test]
    fn parse_is_case_insensitive() {
        let hotkey = Hotkey::parse("Ctrl+Shift+A").unwrap();
        assert_eq!(hotkey.canonical(), "ctrl+shift+a");
        assert_eq!(hotkey.key(), 'a');
    }

    #[test]
    fn modifier_order_does_not_matter() {
        let a = Hotkey::parse("ctrl+shift+a").unwrap();
        let b = Hotkey::parse("shift+ctrl+a").unwrap();
        assert_eq!(a.modifiers(), b.modifiers());
    }

    #[test]
    fn duplicate_modifiers_are_harmless() {
        let hotkey = Hotkey::parse("ctrl+ctrl+alt+x").unwrap();
        assert!(hotkey.modifiers().ctrl);
        assert!(hotkey.modifiers().alt);
        assert_eq!(hotkey.key(), 'x');
    }

    #[test]
    fn modifierless_key_after_plus_is_accepted() {
        let hotkey = Hotkey::parse("+a").unwrap();
        assert_eq!(hotkey.modifiers(), Modifiers::default());
        assert_eq!(hotkey.key(), 'a');
    }

    #[test]
    fn bare_key_is_rejected() {
        assert!(matches!(
            Hotkey::parse("a"),
            Err(Error::InvalidHotkey(_))
        ));
    }

    #[test]
    fn missing_trailing_key_is_rejected() {
        for spec in ["", "ctrl", "ctrl+", "ctrl+shift+"] {
            assert!(
                matches!(Hotkey::parse(spec), Err(Error::InvalidHotkey(_))),
                "spec {spec:?} should be invalid"
            );
        }
    }

    #[test]
    fn multi_character_key_is_rejected() {
        assert!(matches!(
            Hotkey::parse("ctrl+enter"),
            Err(Error::InvalidHotkey(_))
        ));
    }

    #[test]
    fn caps_lock_controls_trailing_key_case() {
        assert_eq!(caps_adjusted("ctrl+shift+a", true), "ctrl+shift+A");
        assert_eq!(caps_adjusted("ctrl+shift+A", false), "ctrl+shift+a");
        assert_eq!(caps_adjusted("ctrl+shift+a", false), "ctrl+shift+a");
    }
}
