//! Win32 window discovery, foreground and privilege queries.

use anyhow::{anyhow, Result};
use std::ffi::OsString;
use std::os::windows::ffi::OsStringExt;

use windows::Win32::Foundation::{BOOL, HWND, LPARAM, POINT, RECT, TRUE};
use windows::Win32::Graphics::Gdi::ClientToScreen;
use windows::Win32::System::Threading::{
    OpenProcess, QueryFullProcessImageNameW, PROCESS_NAME_WIN32, PROCESS_QUERY_LIMITED_INFORMATION,
};
use windows::Win32::UI::HiDpi::{
    GetDpiForWindow, SetProcessDpiAwarenessContext, DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2,
};
use windows::Win32::UI::Input::KeyboardAndMouse::GetAsyncKeyState;
use windows::Win32::UI::Shell::IsUserAnAdmin;
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GetClientRect, GetForegroundWindow, GetWindowRect, GetWindowTextLengthW,
    GetWindowTextW, GetWindowThreadProcessId, IsIconic, IsWindowVisible, SetForegroundWindow,
    ShowWindow, SW_RESTORE,
};

use super::{GameWindow, WindowService};

pub(crate) fn hwnd_of(window: &GameWindow) -> HWND {
    HWND(window.handle as *mut core::ffi::c_void)
}

/// Desktop queries backed by the Win32 API.
pub struct Win32Desktop;

impl Win32Desktop {
    /// Makes the process per-monitor DPI aware so client sizes and input
    /// coordinates are physical pixels.
    pub fn new() -> Self {
        unsafe {
            if SetProcessDpiAwarenessContext(DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2).is_err() {
                crate::log_debug("DPI awareness was already set for this process");
            }
        }
        Self
    }
}

impl WindowService for Win32Desktop {
    fn find_window(&self, title: &str, process: &str) -> Result<Option<GameWindow>> {
        Ok(find_window_by_process(title, process))
    }

    fn bring_to_foreground(&self, window: &GameWindow) -> Result<()> {
        let hwnd = hwnd_of(window);
        unsafe {
            if IsIconic(hwnd).as_bool() {
                let _ = ShowWindow(hwnd, SW_RESTORE);
            }
            if !SetForegroundWindow(hwnd).as_bool() {
                return Err(anyhow!("SetForegroundWindow failed"));
            }
        }
        // Give window time to activate
        std::thread::sleep(std::time::Duration::from_millis(100));
        Ok(())
    }

    fn client_size(&self, window: &GameWindow) -> Result<(u32, u32)> {
        let (client_rect, _) = get_client_area_info(hwnd_of(window))?;
        let width = (client_rect.right - client_rect.left).max(0) as u32;
        let height = (client_rect.bottom - client_rect.top).max(0) as u32;
        Ok((width, height))
    }

    fn dpi_scale(&self, window: &GameWindow) -> f32 {
        let dpi = unsafe { GetDpiForWindow(hwnd_of(window)) };
        if dpi == 0 { 1.0 } else { dpi as f32 / 96.0 }
    }

    fn is_foreground(&self, window: &GameWindow) -> bool {
        let mut process_id: u32 = 0;
        unsafe {
            let foreground = GetForegroundWindow();
            GetWindowThreadProcessId(foreground, Some(&mut process_id));
        }
        process_id == window.pid
    }

    fn is_key_held(&self, vk: u16) -> bool {
        let state = unsafe { GetAsyncKeyState(vk as i32) };
        (state as u16 & 0x8000) != 0
    }

    fn is_elevated(&self) -> bool {
        unsafe { IsUserAnAdmin().as_bool() }
    }
}

/// Enumerates visible top-level windows and returns the first whose process
/// executable name equals `process` (case-insensitive) and whose title equals
/// `title`. An empty `title` matches any window of the process.
fn find_window_by_process(title: &str, process: &str) -> Option<GameWindow> {
    struct EnumData {
        title: String,
        process: String,
        found: Option<GameWindow>,
    }

    unsafe extern "system" fn enum_callback(hwnd: HWND, lparam: LPARAM) -> BOOL {
        unsafe {
            let data = &mut *(lparam.0 as *mut EnumData);

            if !IsWindowVisible(hwnd).as_bool() {
                return TRUE;
            }

            let title_len = GetWindowTextLengthW(hwnd);
            if title_len <= 0 {
                return TRUE;
            }
            let mut title_buf: Vec<u16> = vec![0; (title_len + 1) as usize];
            GetWindowTextW(hwnd, &mut title_buf);
            let window_title = OsString::from_wide(&title_buf[..title_len as usize])
                .to_string_lossy()
                .to_string();

            if !data.title.is_empty() && window_title.trim() != data.title {
                return TRUE;
            }

            let mut process_id: u32 = 0;
            GetWindowThreadProcessId(hwnd, Some(&mut process_id));
            if process_id == 0 {
                return TRUE;
            }

            let Ok(process_handle) =
                OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, process_id)
            else {
                crate::log_debug(&format!(
                    "  [{}] \"{}\" - failed to open process",
                    process_id, window_title
                ));
                return TRUE;
            };

            let mut name_buf: Vec<u16> = vec![0; 1024];
            let mut len = name_buf.len() as u32;
            let result = QueryFullProcessImageNameW(
                process_handle,
                PROCESS_NAME_WIN32,
                windows::core::PWSTR(name_buf.as_mut_ptr()),
                &mut len,
            );
            let _ = windows::Win32::Foundation::CloseHandle(process_handle);

            if result.is_err() || len == 0 {
                return TRUE;
            }

            let full_path = OsString::from_wide(&name_buf[..len as usize])
                .to_string_lossy()
                .to_string();
            let process_name = full_path.rsplit('\\').next().unwrap_or(&full_path);

            crate::log_debug(&format!(
                "  [{}] {} - \"{}\"",
                process_id, process_name, window_title
            ));

            if process_name.eq_ignore_ascii_case(&data.process) {
                data.found = Some(GameWindow {
                    handle: hwnd.0 as isize,
                    pid: process_id,
                });
                return BOOL(0); // Stop enumeration
            }

            TRUE
        }
    }

    crate::log(&format!("Searching for \"{}\" ({})...", title, process));
    let mut data = EnumData {
        title: title.trim().to_string(),
        process: process.to_string(),
        found: None,
    };
    unsafe {
        // EnumWindows returns FALSE when the callback stops it early
        let _ = EnumWindows(Some(enum_callback), LPARAM(&mut data as *mut _ as isize));
    }

    if let Some(window) = &data.found {
        crate::log(&format!("Found game window, pid {}", window.pid));
    }
    data.found
}

/// Gets the client area rectangle and its offset relative to the window origin.
///
/// Returns `(client_rect, offset)` where offset is the position of the client
/// area's top-left corner relative to the window's top-left corner.
pub fn get_client_area_info(hwnd: HWND) -> Result<(RECT, POINT)> {
    let mut client_rect = RECT::default();
    unsafe { GetClientRect(hwnd, &mut client_rect)? };

    let mut client_origin = POINT { x: 0, y: 0 };
    unsafe {
        if !ClientToScreen(hwnd, &mut client_origin).as_bool() {
            return Err(anyhow!("ClientToScreen failed"));
        }
    }

    let mut window_rect = RECT::default();
    unsafe { GetWindowRect(hwnd, &mut window_rect)? };

    let offset = POINT {
        x: client_origin.x - window_rect.left,
        y: client_origin.y - window_rect.top,
    };

    Ok((client_rect, offset))
}
