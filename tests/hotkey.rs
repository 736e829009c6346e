use minitray::{Error, Hotkey, Modifiers};

#[test]
fn canonical_form_is_lowercase() {
    let hotkey = Hotkey::parse("Ctrl+Shift+A").unwrap();
    assert_eq!(hotkey.canonical(), "ctrl+shift+a");
}

#[test]
fn ctrl_shift_a_resolves_both_modifiers_and_the_key() {
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
}

#[test]
fn all_four_modifiers_are_recognized() {
    let hotkey = Hotkey::parse("ctrl+win+shift+alt+z").unwrap();
    assert_eq!(
        hotkey.modifiers(),
        Modifiers {
            ctrl: true,
            win: true,
            shift: true,
            alt: true,
        }
    );
}

#[test]
fn specs_without_a_single_trailing_key_are_rejected() {
    for spec in ["", "a", "ctrl", "ctrl+", "ctrl+shift+", "ctrl+ab"] {
        assert!(
            matches!(Hotkey::parse(spec), Err(Error::InvalidHotkey(_))),
            "spec {spec:?} should be invalid"
        );
    }
}
