/*
 * The windowing system as seen by the dispatch core. Everything the core needs
 * from the native side goes through this trait: window and class creation,
 * installing the interception hook on a handle, default message processing,
 * the message queue used by the pump, and the handful of state/geometry calls
 * the owning objects expose. The Win32 implementation lives in `win32_host`;
 * tests use an in-memory host.
 *
 * Implementations must never unwind out of these calls; native failures are
 * reported through the return values.
 */
use crate::dispatch::Dispatcher;
use crate::error::Result as PlatformResult;
use crate::types::{
    AccelTable, BrushHandle, ClassConfig, ColorRef, CreateParams, DcHandle, LParam, Msg,
    NativeHandle, Point, PumpMessage, Rect, WParam,
};

use std::rc::Weak;

pub trait NativeHost {
    /// Called once by `Dispatcher::new` so native callbacks can find their way back.
    fn bind(&self, _dispatcher: Weak<Dispatcher>) {}

    /// Registers a window class; registering an existing class succeeds.
    fn register_class(&self, class: &ClassConfig) -> PlatformResult<()>;
    fn create_window(&self, params: &CreateParams) -> PlatformResult<NativeHandle>;
    fn destroy_window(&self, hwnd: NativeHandle) -> bool;

    // Routes the handle's messages into `Dispatcher::dispatch`.
    fn attach(&self, hwnd: NativeHandle) -> PlatformResult<()>;
    fn detach(&self, hwnd: NativeHandle) -> bool;

    /// Native default processing for a message currently being dispatched.
    fn default_proc(&self, hwnd: NativeHandle, msg: u32, wparam: WParam, lparam: LParam) -> isize;
    fn send_message(&self, hwnd: NativeHandle, msg: u32, wparam: WParam, lparam: LParam) -> isize;

    /// Source control of a `WM_NOTIFY` payload the host delivered itself; `None` otherwise.
    fn notify_source(&self, lparam: LParam) -> Option<NativeHandle>;
    fn screen_to_client(&self, hwnd: NativeHandle, point: Point) -> Point;

    // Message queue of the calling thread.
    fn next_message(&self) -> PumpMessage;
    fn translate_accelerator(&self, accel: AccelTable, msg: &Msg) -> bool;
    fn dispatch_message(&self, msg: &Msg) -> isize;
    fn post_quit(&self, exit_code: i32);

    fn set_text(&self, hwnd: NativeHandle, text: &str) -> bool;
    fn set_bounds(&self, hwnd: NativeHandle, bounds: Rect) -> bool;
    fn window_rect(&self, hwnd: NativeHandle) -> Option<Rect>;
    fn work_area(&self, hwnd: NativeHandle) -> Option<Rect>;
    fn set_enabled(&self, hwnd: NativeHandle, enabled: bool);
    fn is_enabled(&self, hwnd: NativeHandle) -> bool;
    fn set_visible(&self, hwnd: NativeHandle, visible: bool);
    fn is_visible(&self, hwnd: NativeHandle) -> bool;
    fn set_focus(&self, hwnd: NativeHandle);
    fn is_focused(&self, hwnd: NativeHandle) -> bool;
    fn set_rtl(&self, hwnd: NativeHandle, rtl: bool);
    fn invalidate(&self, hwnd: NativeHandle);

    fn create_solid_brush(&self, color: ColorRef) -> Option<BrushHandle>;
    fn delete_brush(&self, brush: BrushHandle);
    fn apply_ctl_colors(&self, hdc: DcHandle, text: Option<ColorRef>, background: Option<ColorRef>);
}
