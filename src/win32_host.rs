/*
 * Win32 implementation of `NativeHost`. Interception uses comctl32 window
 * subclassing: one `SetWindowSubclass` per intercepted handle, with the host
 * itself as reference data, routing every message into
 * `Dispatcher::dispatch`. Default processing inside that call chain goes to
 * `DefSubclassProc`, i.e. to the next procedure in the subclass chain.
 *
 * Handles cross the boundary as `NativeHandle` integers and are turned back
 * into `HWND`/`HDC`/`HBRUSH` here only.
 */
use crate::dispatch::Dispatcher;
use crate::error::{PlatformError, Result as PlatformResult};
use crate::host::NativeHost;
use crate::messages::WM_NOTIFY;
use crate::types::{
    AccelTable, BrushHandle, ClassConfig, ColorRef, CreateParams, DEFAULT_POSITION, DcHandle,
    LParam, Msg, NativeHandle, Point, PumpMessage, Rect, WParam,
};

use windows::Win32::{
    Foundation::{COLORREF, GetLastError, HINSTANCE, HWND, LPARAM, LRESULT, POINT, RECT, WPARAM},
    Graphics::Gdi::{
        COLOR_WINDOW, CreateSolidBrush, DeleteObject, GetMonitorInfoW, HBRUSH, HDC,
        InvalidateRect, MONITOR_DEFAULTTONEAREST, MONITORINFO, MonitorFromWindow, ScreenToClient,
        SetBkColor, SetTextColor,
    },
    System::LibraryLoader::GetModuleHandleW,
    UI::Controls::NMHDR,
    UI::Input::KeyboardAndMouse::{EnableWindow, GetFocus, IsWindowEnabled, SetFocus},
    UI::Shell::{DefSubclassProc, RemoveWindowSubclass, SetWindowSubclass},
    UI::WindowsAndMessaging::{
        CS_HREDRAW, CS_VREDRAW, CW_USEDEFAULT, CreateWindowExW, DefWindowProcW, DestroyWindow,
        DispatchMessageW, GA_ROOT, GWL_EXSTYLE, GetAncestor, GetClassInfoExW, GetMessageW,
        GetWindowLongW, GetWindowRect, HACCEL, HICON, HMENU, IDC_ARROW, IDI_APPLICATION,
        IsWindowVisible, LoadCursorW, LoadIconW, MSG, MoveWindow, PostQuitMessage,
        RegisterClassExW, SW_HIDE, SW_SHOW, SendMessageW, SetWindowLongW, SetWindowTextW,
        ShowWindow, TranslateAcceleratorW, TranslateMessage, WINDOW_EX_STYLE, WINDOW_STYLE,
        WNDCLASSEXW, WS_EX_LAYOUTRTL,
    },
};
use windows::core::{HSTRING, PCWSTR};

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::ffi::c_void;
use std::rc::{Rc, Weak};

// Same id for every handle; the host pointer in the reference data tells instances apart.
const NATIVE_SUBCLASS_ID: usize = 0x5744_5350; // "WDSP"

fn to_hwnd(handle: NativeHandle) -> HWND {
    HWND(handle.0 as *mut c_void)
}

fn from_hwnd(hwnd: HWND) -> NativeHandle {
    NativeHandle(hwnd.0 as isize)
}

fn to_colorref(color: ColorRef) -> COLORREF {
    COLORREF(color.0)
}

pub struct Win32Host {
    h_instance: HINSTANCE,
    dispatcher: RefCell<Weak<Dispatcher>>,
    attached: RefCell<HashSet<NativeHandle>>,
    // Full MSG (time, cursor) of the last fetched message, for TranslateMessage.
    last_msg: RefCell<MSG>,
    // > 0 while a subclass procedure of this host is on the stack.
    proc_depth: Cell<usize>,
    // (lparam, NMHDR::hwndFrom) of WM_NOTIFY messages being delivered natively.
    notify_in_flight: RefCell<Vec<(isize, NativeHandle)>>,
}

impl Win32Host {
    pub fn new() -> PlatformResult<Rc<Self>> {
        let module = unsafe { GetModuleHandleW(PCWSTR::null()) }.map_err(|e| {
            log::error!("Win32Host: GetModuleHandleW failed: {e:?}");
            PlatformError::InitializationFailed(format!("GetModuleHandleW failed: {e:?}"))
        })?;
        Ok(Rc::new(Self {
            h_instance: module.into(),
            dispatcher: RefCell::new(Weak::new()),
            attached: RefCell::new(HashSet::new()),
            last_msg: RefCell::new(MSG::default()),
            proc_depth: Cell::new(0),
            notify_in_flight: RefCell::new(Vec::new()),
        }))
    }

    fn route(
        &self,
        hwnd: HWND,
        msg: u32,
        wparam: WPARAM,
        lparam: LPARAM,
        notify_from: Option<NativeHandle>,
    ) -> LRESULT {
        let dispatcher = self.dispatcher.borrow().upgrade();
        let Some(dispatcher) = dispatcher else {
            return unsafe { DefSubclassProc(hwnd, msg, wparam, lparam) };
        };
        if let Some(source) = notify_from {
            self.notify_in_flight.borrow_mut().push((lparam.0, source));
        }
        self.proc_depth.set(self.proc_depth.get() + 1);
        let result = dispatcher.dispatch(
            from_hwnd(hwnd),
            msg,
            WParam(wparam.0),
            LParam(lparam.0),
        );
        self.proc_depth.set(self.proc_depth.get() - 1);
        if notify_from.is_some() {
            self.notify_in_flight.borrow_mut().pop();
        }
        LRESULT(result)
    }

    fn to_native_msg(&self, msg: &Msg) -> MSG {
        let last = *self.last_msg.borrow();
        if from_hwnd(last.hwnd) == msg.hwnd && last.message == msg.msg {
            return last;
        }
        MSG {
            hwnd: to_hwnd(msg.hwnd),
            message: msg.msg,
            wParam: WPARAM(msg.wparam.0),
            lParam: LPARAM(msg.lparam.0),
            ..MSG::default()
        }
    }
}

/*
 * Subclass procedure installed on every intercepted handle. `ref_data` is the
 * owning `Win32Host`, which stays alive as long as any subclass it installed
 * (see `Drop`).
 */
unsafe extern "system" fn dispatch_subclass_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
    _subclass_id: usize,
    ref_data: usize,
) -> LRESULT {
    let host = ref_data as *const Win32Host;
    if host.is_null() {
        return unsafe { DefSubclassProc(hwnd, msg, wparam, lparam) };
    }
    let host = unsafe { &*host };
    // The system guarantees lparam points at an NMHDR for a delivered WM_NOTIFY.
    let notify_from = if msg == WM_NOTIFY && lparam.0 != 0 {
        let source = unsafe { (*(lparam.0 as *const NMHDR)).hwndFrom };
        (!source.is_invalid()).then(|| from_hwnd(source))
    } else {
        None
    };
    host.route(hwnd, msg, wparam, lparam, notify_from)
}

// Class procedure of windows registered here; all behaviour comes from subclassing.
unsafe extern "system" fn class_window_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) }
}

impl NativeHost for Win32Host {
    fn bind(&self, dispatcher: Weak<Dispatcher>) {
        *self.dispatcher.borrow_mut() = dispatcher;
    }

    fn register_class(&self, class: &ClassConfig) -> PlatformResult<()> {
        let class_name = HSTRING::from(class.class_name.as_str());
        let menu_name = class.menu_name.as_deref().map(HSTRING::from);
        unsafe {
            let mut existing = WNDCLASSEXW::default();
            if GetClassInfoExW(Some(self.h_instance), &class_name, &mut existing).is_ok() {
                log::debug!("Win32Host: window class '{}' already registered", class.class_name);
                return Ok(());
            }

            let default_icon = LoadIconW(None, IDI_APPLICATION)?;
            let wc = WNDCLASSEXW {
                cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
                style: CS_HREDRAW | CS_VREDRAW,
                lpfnWndProc: Some(class_window_proc),
                cbClsExtra: 0,
                cbWndExtra: 0,
                hInstance: self.h_instance,
                hIcon: class
                    .icon
                    .map_or(default_icon, |icon| HICON(icon.0 as *mut c_void)),
                hCursor: LoadCursorW(None, IDC_ARROW)?,
                hbrBackground: HBRUSH((COLOR_WINDOW.0 + 1) as *mut c_void),
                lpszMenuName: menu_name
                    .as_ref()
                    .map_or(PCWSTR::null(), |name| PCWSTR(name.as_ptr())),
                lpszClassName: PCWSTR(class_name.as_ptr()),
                hIconSm: class
                    .icon_small
                    .map_or(default_icon, |icon| HICON(icon.0 as *mut c_void)),
            };

            if RegisterClassExW(&wc) == 0 {
                let error = GetLastError();
                log::error!("Win32Host: RegisterClassExW failed: {error:?}");
                return Err(PlatformError::InitializationFailed(format!(
                    "RegisterClassExW failed: {error:?}"
                )));
            }
        }
        log::debug!("Win32Host: window class '{}' registered", class.class_name);
        Ok(())
    }

    fn create_window(&self, params: &CreateParams) -> PlatformResult<NativeHandle> {
        let (x, y) = if params.pos == DEFAULT_POSITION {
            (CW_USEDEFAULT, CW_USEDEFAULT)
        } else {
            (params.pos.x, params.pos.y)
        };
        let (width, height) = if params.parent.is_none() && params.size.width <= 0 {
            (CW_USEDEFAULT, CW_USEDEFAULT)
        } else {
            (params.size.width, params.size.height)
        };
        // For child windows the menu slot carries the control id.
        let menu = (params.menu_id != 0).then(|| HMENU(params.menu_id as isize as *mut c_void));
        let hwnd = unsafe {
            CreateWindowExW(
                WINDOW_EX_STYLE(params.ex_style),
                &HSTRING::from(params.class_name.as_str()),
                &HSTRING::from(params.title.as_str()),
                WINDOW_STYLE(params.style),
                x,
                y,
                width,
                height,
                params.parent.map(to_hwnd),
                menu,
                Some(self.h_instance),
                None,
            )
        }
        .map_err(|e| {
            log::error!(
                "Win32Host: CreateWindowExW for class '{}' failed: {e:?}",
                params.class_name
            );
            PlatformError::CreationFailed(format!("{}: {e:?}", params.class_name))
        })?;
        Ok(from_hwnd(hwnd))
    }

    fn destroy_window(&self, hwnd: NativeHandle) -> bool {
        match unsafe { DestroyWindow(to_hwnd(hwnd)) } {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Win32Host: DestroyWindow({hwnd:?}) failed: {e:?}");
                false
            }
        }
    }

    fn attach(&self, hwnd: NativeHandle) -> PlatformResult<()> {
        let ok = unsafe {
            SetWindowSubclass(
                to_hwnd(hwnd),
                Some(dispatch_subclass_proc),
                NATIVE_SUBCLASS_ID,
                self as *const Win32Host as usize,
            )
        };
        if !ok.as_bool() {
            log::error!("Win32Host: SetWindowSubclass({hwnd:?}) failed");
            return Err(PlatformError::SubclassFailed(hwnd));
        }
        self.attached.borrow_mut().insert(hwnd);
        log::trace!("Win32Host: subclassed {hwnd:?}");
        Ok(())
    }

    fn detach(&self, hwnd: NativeHandle) -> bool {
        self.attached.borrow_mut().remove(&hwnd);
        let ok = unsafe {
            RemoveWindowSubclass(
                to_hwnd(hwnd),
                Some(dispatch_subclass_proc),
                NATIVE_SUBCLASS_ID,
            )
        };
        if !ok.as_bool() {
            log::warn!("Win32Host: RemoveWindowSubclass({hwnd:?}) failed");
        }
        ok.as_bool()
    }

    fn default_proc(&self, hwnd: NativeHandle, msg: u32, wparam: WParam, lparam: LParam) -> isize {
        let (hwnd, wparam, lparam) = (to_hwnd(hwnd), WPARAM(wparam.0), LPARAM(lparam.0));
        let result = if self.proc_depth.get() > 0 {
            unsafe { DefSubclassProc(hwnd, msg, wparam, lparam) }
        } else {
            unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) }
        };
        result.0
    }

    fn send_message(&self, hwnd: NativeHandle, msg: u32, wparam: WParam, lparam: LParam) -> isize {
        unsafe {
            SendMessageW(
                to_hwnd(hwnd),
                msg,
                Some(WPARAM(wparam.0)),
                Some(LPARAM(lparam.0)),
            )
        }
        .0
    }

    // Only answers for notifications the system delivered; a synthetic lparam is never read.
    fn notify_source(&self, lparam: LParam) -> Option<NativeHandle> {
        self.notify_in_flight
            .borrow()
            .iter()
            .rev()
            .find(|(header, _)| *header == lparam.0)
            .map(|(_, source)| *source)
    }

    fn screen_to_client(&self, hwnd: NativeHandle, point: Point) -> Point {
        let mut pt = POINT {
            x: point.x,
            y: point.y,
        };
        if unsafe { ScreenToClient(to_hwnd(hwnd), &mut pt) }.as_bool() {
            Point::new(pt.x, pt.y)
        } else {
            point
        }
    }

    fn next_message(&self) -> PumpMessage {
        let mut msg = MSG::default();
        let ret = unsafe { GetMessageW(&mut msg, None, 0, 0) };
        match ret.0 {
            -1 => {
                let error = unsafe { GetLastError() };
                log::error!("Win32Host: GetMessageW failed: {error:?}");
                PumpMessage::Quit(-1)
            }
            0 => PumpMessage::Quit(msg.wParam.0 as i32),
            _ => {
                *self.last_msg.borrow_mut() = msg;
                PumpMessage::Message(Msg::new(
                    from_hwnd(msg.hwnd),
                    msg.message,
                    WParam(msg.wParam.0),
                    LParam(msg.lParam.0),
                ))
            }
        }
    }

    fn translate_accelerator(&self, accel: AccelTable, msg: &Msg) -> bool {
        if msg.hwnd.is_null() {
            return false;
        }
        let native = self.to_native_msg(msg);
        // Commands go to the top-level window, not to the focused control.
        let root = unsafe { GetAncestor(native.hwnd, GA_ROOT) };
        let target = if root.is_invalid() { native.hwnd } else { root };
        unsafe { TranslateAcceleratorW(target, HACCEL(accel.0 as *mut c_void), &native) != 0 }
    }

    fn dispatch_message(&self, msg: &Msg) -> isize {
        let native = self.to_native_msg(msg);
        unsafe {
            let _ = TranslateMessage(&native);
            DispatchMessageW(&native).0
        }
    }

    fn post_quit(&self, exit_code: i32) {
        log::debug!("Win32Host: posting WM_QUIT({exit_code})");
        unsafe { PostQuitMessage(exit_code) };
    }

    fn set_text(&self, hwnd: NativeHandle, text: &str) -> bool {
        match unsafe { SetWindowTextW(to_hwnd(hwnd), &HSTRING::from(text)) } {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Win32Host: SetWindowTextW({hwnd:?}) failed: {e:?}");
                false
            }
        }
    }

    fn set_bounds(&self, hwnd: NativeHandle, bounds: Rect) -> bool {
        unsafe {
            MoveWindow(
                to_hwnd(hwnd),
                bounds.x,
                bounds.y,
                bounds.width,
                bounds.height,
                true,
            )
        }
        .is_ok()
    }

    fn window_rect(&self, hwnd: NativeHandle) -> Option<Rect> {
        let mut rc = RECT::default();
        unsafe { GetWindowRect(to_hwnd(hwnd), &mut rc) }.ok()?;
        Some(Rect::new(
            rc.left,
            rc.top,
            rc.right - rc.left,
            rc.bottom - rc.top,
        ))
    }

    fn work_area(&self, hwnd: NativeHandle) -> Option<Rect> {
        let monitor = unsafe { MonitorFromWindow(to_hwnd(hwnd), MONITOR_DEFAULTTONEAREST) };
        let mut info = MONITORINFO {
            cbSize: std::mem::size_of::<MONITORINFO>() as u32,
            ..Default::default()
        };
        if !unsafe { GetMonitorInfoW(monitor, &mut info) }.as_bool() {
            return None;
        }
        let rc = info.rcWork;
        Some(Rect::new(
            rc.left,
            rc.top,
            rc.right - rc.left,
            rc.bottom - rc.top,
        ))
    }

    fn set_enabled(&self, hwnd: NativeHandle, enabled: bool) {
        // The return value is the previous state, not success.
        let _ = unsafe { EnableWindow(to_hwnd(hwnd), enabled) };
    }

    fn is_enabled(&self, hwnd: NativeHandle) -> bool {
        unsafe { IsWindowEnabled(to_hwnd(hwnd)) }.as_bool()
    }

    fn set_visible(&self, hwnd: NativeHandle, visible: bool) {
        let cmd = if visible { SW_SHOW } else { SW_HIDE };
        unsafe { _ = ShowWindow(to_hwnd(hwnd), cmd) };
    }

    fn is_visible(&self, hwnd: NativeHandle) -> bool {
        unsafe { IsWindowVisible(to_hwnd(hwnd)) }.as_bool()
    }

    fn set_focus(&self, hwnd: NativeHandle) {
        if let Err(e) = unsafe { SetFocus(Some(to_hwnd(hwnd))) } {
            log::warn!("Win32Host: SetFocus({hwnd:?}) failed: {e:?}");
        }
    }

    fn is_focused(&self, hwnd: NativeHandle) -> bool {
        from_hwnd(unsafe { GetFocus() }) == hwnd
    }

    fn set_rtl(&self, hwnd: NativeHandle, rtl: bool) {
        let hwnd = to_hwnd(hwnd);
        unsafe {
            let ex_style = GetWindowLongW(hwnd, GWL_EXSTYLE) as u32;
            let ex_style = if rtl {
                ex_style | WS_EX_LAYOUTRTL.0
            } else {
                ex_style & !WS_EX_LAYOUTRTL.0
            };
            let _ = SetWindowLongW(hwnd, GWL_EXSTYLE, ex_style as i32);
            let _ = InvalidateRect(Some(hwnd), None, true);
        }
    }

    fn invalidate(&self, hwnd: NativeHandle) {
        let _ = unsafe { InvalidateRect(Some(to_hwnd(hwnd)), None, true) };
    }

    fn create_solid_brush(&self, color: ColorRef) -> Option<BrushHandle> {
        let brush = unsafe { CreateSolidBrush(to_colorref(color)) };
        if brush.is_invalid() {
            log::error!("Win32Host: CreateSolidBrush({color:?}) failed");
            return None;
        }
        Some(BrushHandle(brush.0 as isize))
    }

    fn delete_brush(&self, brush: BrushHandle) {
        let brush = HBRUSH(brush.0 as *mut c_void);
        let _ = unsafe { DeleteObject(brush.into()) };
    }

    fn apply_ctl_colors(
        &self,
        hdc: DcHandle,
        text: Option<ColorRef>,
        background: Option<ColorRef>,
    ) {
        let hdc = HDC(hdc.0 as *mut c_void);
        unsafe {
            if let Some(text) = text {
                let _ = SetTextColor(hdc, to_colorref(text));
            }
            if let Some(background) = background {
                let _ = SetBkColor(hdc, to_colorref(background));
            }
        }
    }
}

impl Drop for Win32Host {
    fn drop(&mut self) {
        // Subclasses still installed point at this host; take them down first.
        let handles: Vec<NativeHandle> = self.attached.get_mut().drain().collect();
        if !handles.is_empty() {
            log::warn!(
                "Win32Host: dropped with {} subclassed handle(s), removing",
                handles.len()
            );
        }
        for hwnd in handles {
            unsafe {
                let _ = RemoveWindowSubclass(
                    to_hwnd(hwnd),
                    Some(dispatch_subclass_proc),
                    NATIVE_SUBCLASS_ID,
                );
            }
        }
    }
}
