//! Terminal keyboard heatmap.
//!
//! Renders a US-layout key grid where each cell is shaded by that key's
//! share of the busiest key's total, summed over all days and modifier
//! combinations.

use std::collections::HashMap;

use crossterm::style::{Color, Stylize};

use crate::core::CounterTable;
use crate::store::{Store, StoreError};

/// (display label, stored identifier) per key, one slice per physical row.
const LAYOUT: &[&[(&str, &str)]] = &[
    &[
        ("Esc", "KEY_ESC"),
        ("F1", "KEY_F1"),
        ("F2", "KEY_F2"),
        ("F3", "KEY_F3"),
        ("F4", "KEY_F4"),
        ("F5", "KEY_F5"),
        ("F6", "KEY_F6"),
        ("F7", "KEY_F7"),
        ("F8", "KEY_F8"),
        ("F9", "KEY_F9"),
        ("F10", "KEY_F10"),
        ("F11", "KEY_F11"),
        ("F12", "KEY_F12"),
    ],
    &[
        ("`", "KEY_GRAVE"),
        ("1", "KEY_1"),
        ("2", "KEY_2"),
        ("3", "KEY_3"),
        ("4", "KEY_4"),
        ("5", "KEY_5"),
        ("6", "KEY_6"),
        ("7", "KEY_7"),
        ("8", "KEY_8"),
        ("9", "KEY_9"),
        ("0", "KEY_0"),
        ("-", "KEY_MINUS"),
        ("=", "KEY_EQUAL"),
        ("Bksp", "KEY_BACKSPACE"),
    ],
    &[
        ("Tab", "KEY_TAB"),
        ("Q", "KEY_Q"),
        ("W", "KEY_W"),
        ("E", "KEY_E"),
        ("R", "KEY_R"),
        ("T", "KEY_T"),
        ("Y", "KEY_Y"),
        ("U", "KEY_U"),
        ("I", "KEY_I"),
        ("O", "KEY_O"),
        ("P", "KEY_P"),
        ("[", "KEY_LEFTBRACE"),
        ("]", "KEY_RIGHTBRACE"),
        ("\\", "KEY_BACKSLASH"),
    ],
    &[
        ("Caps", "KEY_CAPSLOCK"),
        ("A", "KEY_A"),
        ("S", "KEY_S"),
        ("D", "KEY_D"),
        ("F", "KEY_F"),
        ("G", "KEY_G"),
        ("H", "KEY_H"),
        ("J", "KEY_J"),
        ("K", "KEY_K"),
        ("L", "KEY_L"),
        (";", "KEY_SEMICOLON"),
        ("'", "KEY_APOSTROPHE"),
        ("Enter", "KEY_ENTER"),
    ],
    &[
        ("Shift", "KEY_LEFTSHIFT"),
        ("Z", "KEY_Z"),
        ("X", "KEY_X"),
        ("C", "KEY_C"),
        ("V", "KEY_V"),
        ("B", "KEY_B"),
        ("N", "KEY_N"),
        ("M", "KEY_M"),
        (",", "KEY_COMMA"),
        (".", "KEY_DOT"),
        ("/", "KEY_SLASH"),
        ("Shift", "KEY_RIGHTSHIFT"),
    ],
    &[
        ("Ctrl", "KEY_LEFTCTRL"),
        ("Sup", "KEY_LEFTMETA"),
        ("Alt", "KEY_LEFTALT"),
        ("Space", "KEY_SPACE"),
        ("AltGr", "KEY_RIGHTALT"),
        ("Menu", "KEY_COMPOSE"),
        ("Ctrl", "KEY_RIGHTCTRL"),
    ],
];

/// Cold-to-hot background ramp (ANSI 256 values).
const SHADES: [u8; 6] = [236, 24, 31, 37, 208, 196];

/// Map a count onto the shade ramp. Zero is always the coldest shade; the
/// busiest key is always the hottest.
fn shade_index(count: u64, max: u64) -> usize {
    if count == 0 || max == 0 {
        return 0;
    }
    let hot = (SHADES.len() - 1) as u64;
    let scaled = ((count * hot + max - 1) / max) as usize;
    scaled.clamp(1, hot as usize)
}

fn cell(label: &str, count: u64, max: u64) -> String {
    let index = shade_index(count, max);
    let text = format!("{label:^5}");
    let styled = if index >= SHADES.len() - 2 {
        text.with(Color::Black).on(Color::AnsiValue(SHADES[index]))
    } else {
        text.with(Color::White).on(Color::AnsiValue(SHADES[index]))
    };
    styled.to_string()
}

/// Render the keyboard heatmap for everything in the keyboard table.
pub fn render_heatmap(store: &Store) -> Result<(), StoreError> {
    let totals: HashMap<String, u64> = store
        .identifier_totals(CounterTable::Keyboard)?
        .into_iter()
        .collect();

    if totals.is_empty() {
        println!("No keyboard data recorded yet.");
        return Ok(());
    }

    let max = totals.values().copied().max().unwrap_or(0);
    let total: u64 = totals.values().sum();
    println!("Keyboard heatmap ({total} presses recorded)");
    println!();

    for row in LAYOUT {
        let mut line = String::new();
        for (label, identifier) in *row {
            let count = totals.get(*identifier).copied().unwrap_or(0);
            line.push_str(&cell(label, count, max));
            line.push(' ');
        }
        println!("  {line}");
    }

    println!();
    let mut legend = String::new();
    for shade in SHADES {
        legend.push_str(&"  ".on(Color::AnsiValue(shade)).to_string());
        legend.push(' ');
    }
    println!("  0 {legend} {max}");
    Ok(())
}
