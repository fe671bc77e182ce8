//! winit keyboard events to DOM-style `key`/`code` pairs.

use ssrt_core::KeyEvent;
use winit::event::{ElementState, KeyEvent as WinitKeyEvent};
use winit::keyboard::{Key, NamedKey, PhysicalKey};

/// Fresh presses only; releases and auto-repeat are dropped.
pub fn translate(event: &WinitKeyEvent) -> Option<KeyEvent> {
    if event.state != ElementState::Pressed || event.repeat {
        return None;
    }
    Some(KeyEvent::new(
        logical_key_name(&event.logical_key),
        physical_code_name(event.physical_key),
    ))
}

pub fn logical_key_name(key: &Key) -> String {
    match key {
        Key::Character(text) => text.to_string(),
        Key::Named(NamedKey::Space) => " ".to_string(),
        Key::Named(named) => format!("{named:?}"),
        _ => "Unidentified".to_string(),
    }
}

/// `KeyCode` debug names already follow the DOM `code` spelling (`KeyS`, `Space`, `F8`).
pub fn physical_code_name(key: PhysicalKey) -> String {
    match key {
        PhysicalKey::Code(code) => format!("{code:?}"),
        PhysicalKey::Unidentified(_) => String::new(),
    }
}
