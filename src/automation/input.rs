//! Keyboard and mouse input simulation.
//!
//! The game reads hardware-level input (DirectInput/RawInput), so window
//! messages are ignored: everything goes through SendInput with scan codes and
//! absolute mouse coordinates. Points are given in client pixels and converted
//! to screen coordinates per event.

use anyhow::Result;

use crate::calibration::Point;

/// A keyboard key identified by its set-1 scan code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Key {
    pub scan: u16,
    /// Needs the E0 prefix (navigation keys).
    pub extended: bool,
    /// Typed with Shift held (symbols on the number row).
    pub shifted: bool,
}

impl Key {
    pub const ESCAPE: Key = Key::plain(0x01);
    pub const ENTER: Key = Key::plain(0x1C);
    pub const CTRL: Key = Key::plain(0x1D);
    pub const SHIFT: Key = Key::plain(0x2A);
    pub const V: Key = Key::plain(0x2F);

    const fn plain(scan: u16) -> Self {
        Self {
            scan,
            extended: false,
            shifted: false,
        }
    }

    const fn extended(scan: u16) -> Self {
        Self {
            scan,
            extended: true,
            shifted: false,
        }
    }

    const fn shifted(scan: u16) -> Self {
        Self {
            scan,
            extended: false,
            shifted: true,
        }
    }

    /// Parses a key name or a single character, case-insensitive.
    pub fn parse(name: &str) -> Option<Key> {
        let lower = name.trim().to_lowercase();
        let key = match lower.as_str() {
            "esc" | "escape" => Self::ESCAPE,
            "enter" | "return" => Self::ENTER,
            "ctrl" | "control" => Self::CTRL,
            "shift" => Self::SHIFT,
            "alt" => Self::plain(0x38),
            "tab" => Self::plain(0x0F),
            "space" => Self::plain(0x39),
            "capslock" => Self::plain(0x3A),
            "delete" => Self::extended(0x53),
            "end" => Self::extended(0x4F),
            "win" => Self::extended(0x5B),
            "f1" => Self::plain(0x3B),
            "f2" => Self::plain(0x3C),
            "f3" => Self::plain(0x3D),
            "f4" => Self::plain(0x3E),
            "f5" => Self::plain(0x3F),
            "f6" => Self::plain(0x40),
            "f7" => Self::plain(0x41),
            "f8" => Self::plain(0x42),
            "f9" => Self::plain(0x43),
            "f10" => Self::plain(0x44),
            "f11" => Self::plain(0x57),
            "f12" => Self::plain(0x58),
            _ => {
                let mut chars = name.trim().chars();
                let (Some(c), None) = (chars.next(), chars.next()) else {
                    return None;
                };
                // Keybinds name the key, not the character: no Shift
                return Self::from_char(c.to_ascii_lowercase());
            }
        };
        Some(key)
    }

    /// Key that types `c` on a US layout.
    pub fn from_char(c: char) -> Option<Key> {
        let scan = match c.to_ascii_lowercase() {
            '1' => 0x02,
            '2' => 0x03,
            '3' => 0x04,
            '4' => 0x05,
            '5' => 0x06,
            '6' => 0x07,
            '7' => 0x08,
            '8' => 0x09,
            '9' => 0x0A,
            '0' => 0x0B,
            '-' => 0x0C,
            '=' => 0x0D,
            'q' => 0x10,
            'w' => 0x11,
            'e' => 0x12,
            'r' => 0x13,
            't' => 0x14,
            'y' => 0x15,
            'u' => 0x16,
            'i' => 0x17,
            'o' => 0x18,
            'p' => 0x19,
            '[' => 0x1A,
            ']' => 0x1B,
            'a' => 0x1E,
            's' => 0x1F,
            'd' => 0x20,
            'f' => 0x21,
            'g' => 0x22,
            'h' => 0x23,
            'j' => 0x24,
            'k' => 0x25,
            'l' => 0x26,
            ';' => 0x27,
            '\'' => 0x28,
            '`' => 0x29,
            '\\' => 0x2B,
            'z' => 0x2C,
            'x' => 0x2D,
            'c' => 0x2E,
            'v' => 0x2F,
            'b' => 0x30,
            'n' => 0x31,
            'm' => 0x32,
            ',' => 0x33,
            '.' => 0x34,
            '/' => 0x35,
            ' ' => 0x39,
            '!' => return Some(Self::shifted(0x02)),
            '@' => return Some(Self::shifted(0x03)),
            '#' => return Some(Self::shifted(0x04)),
            '$' => return Some(Self::shifted(0x05)),
            '%' => return Some(Self::shifted(0x06)),
            '^' => return Some(Self::shifted(0x07)),
            '&' => return Some(Self::shifted(0x08)),
            '*' => return Some(Self::shifted(0x09)),
            '(' => return Some(Self::shifted(0x0A)),
            ')' => return Some(Self::shifted(0x0B)),
            '_' => return Some(Self::shifted(0x0C)),
            '+' => return Some(Self::shifted(0x0D)),
            '?' => return Some(Self::shifted(0x35)),
            ':' => return Some(Self::shifted(0x27)),
            '"' => return Some(Self::shifted(0x28)),
            '~' => return Some(Self::shifted(0x29)),
            _ => return None,
        };
        Some(Key {
            scan,
            extended: false,
            shifted: c.is_ascii_uppercase(),
        })
    }
}

/// Synthetic input. Coordinates are client pixels of the game window.
pub trait InputDriver: Send {
    fn move_to(&mut self, point: Point) -> Result<()>;

    /// Moves to `point` and presses the left button.
    fn click(&mut self, point: Point) -> Result<()>;

    /// Scrolls the wheel by `amount` notches. Negative scrolls down.
    fn scroll(&mut self, amount: f32) -> Result<()>;

    fn key_press(&mut self, key: Key) -> Result<()>;

    /// Presses `keys` in order and releases them in reverse.
    fn hotkey(&mut self, keys: &[Key]) -> Result<()>;

    /// Types `text` key by key, or pastes it through the clipboard when it
    /// contains characters without a key.
    fn type_text(&mut self, text: &str) -> Result<()>;
}

/// Wheel delta for `amount` notches.
pub fn wheel_delta(amount: f32) -> i32 {
    (amount * 120.0) as i32
}

/// Keys that type `text`, or `None` if some character has no key.
pub fn keys_for_text(text: &str) -> Option<Vec<Key>> {
    text.chars().map(Key::from_char).collect()
}

#[cfg(windows)]
pub use self::win32::SendInputDriver;

#[cfg(windows)]
mod win32 {
    use anyhow::{anyhow, Result};
    use std::thread;
    use std::time::Duration;

    use windows::Win32::Foundation::{HANDLE, HWND, POINT};
    use windows::Win32::Graphics::Gdi::ClientToScreen;
    use windows::Win32::System::DataExchange::{
        CloseClipboard, EmptyClipboard, OpenClipboard, SetClipboardData,
    };
    use windows::Win32::System::Memory::{GlobalAlloc, GlobalLock, GlobalUnlock, GMEM_MOVEABLE};
    use windows::Win32::UI::Input::KeyboardAndMouse::{
        SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, INPUT_MOUSE, KEYBDINPUT, KEYBD_EVENT_FLAGS,
        KEYEVENTF_EXTENDEDKEY, KEYEVENTF_KEYUP, KEYEVENTF_SCANCODE, MOUSEEVENTF_ABSOLUTE,
        MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP, MOUSEEVENTF_MOVE, MOUSEEVENTF_WHEEL,
        MOUSE_EVENT_FLAGS, MOUSEINPUT, VIRTUAL_KEY,
    };
    use windows::Win32::UI::WindowsAndMessaging::{GetSystemMetrics, SM_CXSCREEN, SM_CYSCREEN};

    use super::{keys_for_text, wheel_delta, InputDriver, Key};
    use crate::calibration::Point;
    use crate::capture::GameWindow;

    /// Clipboard format for UTF-16 text.
    const CF_UNICODETEXT: u32 = 13;

    /// Gap between the events of one key press or click.
    const EVENT_GAP: Duration = Duration::from_millis(30);

    /// SendInput-based driver for one game window.
    pub struct SendInputDriver {
        hwnd_raw: isize,
    }

    impl SendInputDriver {
        pub fn new(window: &GameWindow) -> Self {
            Self {
                hwnd_raw: window.handle,
            }
        }

        fn hwnd(&self) -> HWND {
            HWND(self.hwnd_raw as *mut std::ffi::c_void)
        }

        /// Client point → normalized absolute coordinates (0..65535).
        fn normalized(&self, point: Point) -> Result<(i32, i32)> {
            let mut screen_point = POINT {
                x: point.x,
                y: point.y,
            };
            unsafe {
                if !ClientToScreen(self.hwnd(), &mut screen_point).as_bool() {
                    return Err(anyhow!("ClientToScreen failed"));
                }
            }
            let screen_width = unsafe { GetSystemMetrics(SM_CXSCREEN) }.max(1);
            let screen_height = unsafe { GetSystemMetrics(SM_CYSCREEN) }.max(1);
            let norm_x = ((screen_point.x as i64 * 65535) / screen_width as i64) as i32;
            let norm_y = ((screen_point.y as i64 * 65535) / screen_height as i64) as i32;
            Ok((norm_x, norm_y))
        }

        fn send_mouse(&self, dx: i32, dy: i32, data: i32, flags: MOUSE_EVENT_FLAGS) -> Result<()> {
            let input = INPUT {
                r#type: INPUT_MOUSE,
                Anonymous: INPUT_0 {
                    mi: MOUSEINPUT {
                        dx,
                        dy,
                        mouseData: data,
                        dwFlags: flags,
                        ..Default::default()
                    },
                },
            };
            send(&[input])
        }

        fn send_key(&self, key: Key, up: bool) -> Result<()> {
            let mut flags = KEYEVENTF_SCANCODE;
            if key.extended {
                flags = flags | KEYEVENTF_EXTENDEDKEY;
            }
            if up {
                flags = flags | KEYEVENTF_KEYUP;
            }
            send(&[key_input(key.scan, flags)])
        }

        fn tap(&self, key: Key) -> Result<()> {
            if key.shifted {
                self.send_key(Key::SHIFT, false)?;
            }
            self.send_key(key, false)?;
            thread::sleep(EVENT_GAP);
            self.send_key(key, true)?;
            if key.shifted {
                self.send_key(Key::SHIFT, true)?;
            }
            Ok(())
        }
    }

    fn key_input(scan: u16, flags: KEYBD_EVENT_FLAGS) -> INPUT {
        INPUT {
            r#type: INPUT_KEYBOARD,
            Anonymous: INPUT_0 {
                ki: KEYBDINPUT {
                    wVk: VIRTUAL_KEY(0),
                    wScan: scan,
                    dwFlags: flags,
                    ..Default::default()
                },
            },
        }
    }

    fn send(inputs: &[INPUT]) -> Result<()> {
        let sent = unsafe { SendInput(inputs, std::mem::size_of::<INPUT>() as i32) };
        if sent as usize != inputs.len() {
            return Err(anyhow!(
                "SendInput injected {} of {} events",
                sent,
                inputs.len()
            ));
        }
        Ok(())
    }

    /// Places `text` on the clipboard as CF_UNICODETEXT.
    fn copy_to_clipboard(text: &str) -> Result<()> {
        unsafe {
            OpenClipboard(HWND::default()).map_err(|e| anyhow!("Failed to open clipboard: {}", e))?;

            if let Err(e) = EmptyClipboard() {
                let _ = CloseClipboard();
                return Err(anyhow!("Failed to empty clipboard: {}", e));
            }

            let mut wide_text: Vec<u16> = text.encode_utf16().collect();
            wide_text.push(0);
            let data_size = wide_text.len() * std::mem::size_of::<u16>();

            let h_mem = match GlobalAlloc(GMEM_MOVEABLE, data_size) {
                Ok(mem) => mem,
                Err(e) => {
                    let _ = CloseClipboard();
                    return Err(anyhow!("Failed to allocate clipboard memory: {}", e));
                }
            };

            let mem_ptr = GlobalLock(h_mem);
            if mem_ptr.is_null() {
                let _ = CloseClipboard();
                return Err(anyhow!("Failed to lock clipboard memory"));
            }
            std::ptr::copy_nonoverlapping(
                wide_text.as_ptr() as *const std::ffi::c_void,
                mem_ptr,
                data_size,
            );
            let _ = GlobalUnlock(h_mem);

            if let Err(e) = SetClipboardData(CF_UNICODETEXT, HANDLE(h_mem.0)) {
                let _ = CloseClipboard();
                return Err(anyhow!("Failed to set clipboard data: {}", e));
            }

            CloseClipboard().map_err(|e| anyhow!("Failed to close clipboard: {}", e))?;
        }
        Ok(())
    }

    impl InputDriver for SendInputDriver {
        fn move_to(&mut self, point: Point) -> Result<()> {
            let (x, y) = self.normalized(point)?;
            self.send_mouse(x, y, 0, MOUSEEVENTF_MOVE | MOUSEEVENTF_ABSOLUTE)
        }

        fn click(&mut self, point: Point) -> Result<()> {
            let (x, y) = self.normalized(point)?;
            self.send_mouse(x, y, 0, MOUSEEVENTF_MOVE | MOUSEEVENTF_ABSOLUTE)?;
            thread::sleep(EVENT_GAP);
            self.send_mouse(
                x,
                y,
                0,
                MOUSEEVENTF_LEFTDOWN | MOUSEEVENTF_ABSOLUTE | MOUSEEVENTF_MOVE,
            )?;
            thread::sleep(EVENT_GAP);
            self.send_mouse(
                x,
                y,
                0,
                MOUSEEVENTF_LEFTUP | MOUSEEVENTF_ABSOLUTE | MOUSEEVENTF_MOVE,
            )
        }

        fn scroll(&mut self, amount: f32) -> Result<()> {
            self.send_mouse(0, 0, wheel_delta(amount), MOUSEEVENTF_WHEEL)
        }

        fn key_press(&mut self, key: Key) -> Result<()> {
            self.tap(key)
        }

        fn hotkey(&mut self, keys: &[Key]) -> Result<()> {
            for key in keys {
                self.send_key(*key, false)?;
                thread::sleep(EVENT_GAP);
            }
            for key in keys.iter().rev() {
                self.send_key(*key, true)?;
                thread::sleep(EVENT_GAP);
            }
            Ok(())
        }

        fn type_text(&mut self, text: &str) -> Result<()> {
            match keys_for_text(text) {
                Some(keys) => {
                    for key in keys {
                        self.tap(key)?;
                    }
                    Ok(())
                }
                None => {
                    copy_to_clipboard(text)?;
                    self.hotkey(&[Key::CTRL, Key::V])
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Debug, PartialEq)]
    pub(crate) enum InputEvent {
        Move(Point),
        Click(Point),
        Scroll(f32),
        Key(Key),
        Hotkey(Vec<Key>),
        Text(String),
    }

    /// Records every event into a shared log.
    #[derive(Clone, Default)]
    pub(crate) struct RecordingDriver {
        pub events: Arc<Mutex<Vec<InputEvent>>>,
    }

    impl RecordingDriver {
        pub fn events(&self) -> Vec<InputEvent> {
            self.events.lock().unwrap().clone()
        }

        fn push(&self, event: InputEvent) -> Result<()> {
            self.events.lock().unwrap().push(event);
            Ok(())
        }
    }

    impl InputDriver for RecordingDriver {
        fn move_to(&mut self, point: Point) -> Result<()> {
            self.push(InputEvent::Move(point))
        }

        fn click(&mut self, point: Point) -> Result<()> {
            self.push(InputEvent::Click(point))
        }

        fn scroll(&mut self, amount: f32) -> Result<()> {
            self.push(InputEvent::Scroll(amount))
        }

        fn key_press(&mut self, key: Key) -> Result<()> {
            self.push(InputEvent::Key(key))
        }

        fn hotkey(&mut self, keys: &[Key]) -> Result<()> {
            self.push(InputEvent::Hotkey(keys.to_vec()))
        }

        fn type_text(&mut self, text: &str) -> Result<()> {
            self.push(InputEvent::Text(text.to_string()))
        }
    }

    #[test]
    fn test_parse_keybinds() {
        assert_eq!(Key::parse("B").map(|k| k.scan), Some(0x30));
        assert!(!Key::parse("B").unwrap().shifted);
        assert_eq!(Key::parse("c").map(|k| k.scan), Some(0x2E));
        assert_eq!(Key::parse("ESC"), Some(Key::ESCAPE));
        assert_eq!(Key::parse("enter"), Some(Key::ENTER));
        assert!(Key::parse("delete").unwrap().extended);
        assert_eq!(Key::parse("F11").map(|k| k.scan), Some(0x57));
        assert!(Key::parse("hyper").is_none());
    }

    #[test]
    fn test_uppercase_and_symbols_are_shifted() {
        let upper = Key::from_char('A').unwrap();
        assert_eq!(upper.scan, 0x1E);
        assert!(upper.shifted);
        assert!(!Key::from_char('a').unwrap().shifted);
        assert!(Key::from_char('!').unwrap().shifted);
    }

    #[test]
    fn test_keys_for_text_rejects_non_ascii() {
        assert_eq!(keys_for_text("ab").map(|k| k.len()), Some(2));
        assert!(keys_for_text("Ñame").is_none());
    }

    #[test]
    fn test_wheel_delta() {
        assert_eq!(wheel_delta(1.0), 120);
        assert_eq!(wheel_delta(-31.25), -3750);
        assert_eq!(wheel_delta(-56.0), -6720);
    }
}
