/*
 * In-memory windowing system for tests. Handles are plain counters, window
 * state lives in a table, and the few native behaviours the dispatch core
 * relies on are emulated: DestroyWindow sends WM_DESTROY / WM_NCDESTROY
 * (children in between), default processing of WM_CLOSE destroys the window,
 * and the message queue is scripted.
 *
 * The state borrow is always released before a message is delivered, since
 * delivery re-enters the dispatcher and from there this host.
 */
use crate::dispatch::Dispatcher;
use crate::error::{PlatformError, Result as PlatformResult};
use crate::host::NativeHost;
use crate::messages::{
    WM_CLOSE, WM_COMMAND, WM_CONTEXTMENU, WM_DESTROY, WM_KEYDOWN, WM_NCDESTROY, WM_SETFONT,
    WM_SETREDRAW, make_wparam,
};
use crate::types::{
    AccelTable, BrushHandle, ClassConfig, ColorRef, CreateParams, DEFAULT_POSITION, DcHandle,
    FontHandle, LParam, Msg, NativeHandle, Point, PumpMessage, Rect, WParam,
};

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::rc::{Rc, Weak};

const WS_VISIBLE: u32 = 0x1000_0000;

struct FakeWindow {
    parent: Option<NativeHandle>,
    text: String,
    bounds: Rect,
    enabled: bool,
    visible: bool,
    rtl: bool,
    font: Option<FontHandle>,
    redraw: bool,
}

#[derive(Default)]
struct State {
    next_handle: isize,
    next_brush: isize,
    windows: BTreeMap<NativeHandle, FakeWindow>,
    dying: HashSet<NativeHandle>,
    attached: HashSet<NativeHandle>,
    focus: Option<NativeHandle>,
    created: Vec<CreateParams>,
    destroyed: Vec<NativeHandle>,
    default_calls: Vec<(NativeHandle, u32)>,
    classes: Vec<ClassConfig>,
    queue: VecDeque<PumpMessage>,
    // (table, virtual key) -> command id
    accelerators: HashMap<(AccelTable, usize), i32>,
    dispatched: usize,
    quit: Option<i32>,
    deleted_brushes: Vec<BrushHandle>,
    ctl_colors: Vec<(DcHandle, Option<ColorRef>, Option<ColorRef>)>,
    notify_sources: HashMap<isize, NativeHandle>,
    fail_create: bool,
    fail_attach: bool,
}

pub struct FakeHost {
    state: RefCell<State>,
    dispatcher: RefCell<Weak<Dispatcher>>,
}

impl FakeHost {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            state: RefCell::new(State {
                next_handle: 0x100,
                next_brush: 0x900,
                ..State::default()
            }),
            dispatcher: RefCell::new(Weak::new()),
        })
    }

    // Routes through the dispatcher like a subclassed window, else to default processing.
    fn deliver(&self, hwnd: NativeHandle, msg: u32, wparam: WParam, lparam: LParam) -> isize {
        let attached = self.state.borrow().attached.contains(&hwnd);
        let dispatcher = self.dispatcher.borrow().upgrade();
        match dispatcher {
            Some(dispatcher) if attached => dispatcher.dispatch(hwnd, msg, wparam, lparam),
            _ => self.default_proc(hwnd, msg, wparam, lparam),
        }
    }

    fn with_window<R>(
        &self,
        hwnd: NativeHandle,
        f: impl FnOnce(&mut FakeWindow) -> R,
    ) -> Option<R> {
        self.state.borrow_mut().windows.get_mut(&hwnd).map(f)
    }

    pub fn push_message(&self, msg: Msg) {
        self.state
            .borrow_mut()
            .queue
            .push_back(PumpMessage::Message(msg));
    }

    pub fn push_quit(&self, exit_code: i32) {
        self.state
            .borrow_mut()
            .queue
            .push_back(PumpMessage::Quit(exit_code));
    }

    pub fn add_accelerator(&self, table: AccelTable, virt_key: usize, command_id: i32) {
        self.state
            .borrow_mut()
            .accelerators
            .insert((table, virt_key), command_id);
    }

    pub fn register_notify_source(&self, lparam: LParam, source: NativeHandle) {
        self.state
            .borrow_mut()
            .notify_sources
            .insert(lparam.0, source);
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.state.borrow_mut().fail_create = fail;
    }

    pub fn set_fail_attach(&self, fail: bool) {
        self.state.borrow_mut().fail_attach = fail;
    }

    pub fn created(&self) -> Vec<CreateParams> {
        self.state.borrow().created.clone()
    }

    pub fn destroyed(&self) -> Vec<NativeHandle> {
        self.state.borrow().destroyed.clone()
    }

    pub fn default_calls(&self) -> Vec<(NativeHandle, u32)> {
        self.state.borrow().default_calls.clone()
    }

    pub fn registered_classes(&self) -> Vec<ClassConfig> {
        self.state.borrow().classes.clone()
    }

    pub fn dispatched_count(&self) -> usize {
        self.state.borrow().dispatched
    }

    pub fn quit_posted(&self) -> Option<i32> {
        self.state.borrow().quit
    }

    pub fn deleted_brushes(&self) -> Vec<BrushHandle> {
        self.state.borrow().deleted_brushes.clone()
    }

    pub fn ctl_colors(&self) -> Vec<(DcHandle, Option<ColorRef>, Option<ColorRef>)> {
        self.state.borrow().ctl_colors.clone()
    }

    pub fn is_alive(&self, hwnd: NativeHandle) -> bool {
        self.state.borrow().windows.contains_key(&hwnd)
    }

    pub fn is_attached(&self, hwnd: NativeHandle) -> bool {
        self.state.borrow().attached.contains(&hwnd)
    }

    pub fn text_of(&self, hwnd: NativeHandle) -> Option<String> {
        self.state.borrow().windows.get(&hwnd).map(|w| w.text.clone())
    }

    pub fn bounds_of(&self, hwnd: NativeHandle) -> Option<Rect> {
        self.state.borrow().windows.get(&hwnd).map(|w| w.bounds)
    }

    pub fn font_of(&self, hwnd: NativeHandle) -> Option<FontHandle> {
        self.state.borrow().windows.get(&hwnd).and_then(|w| w.font)
    }

    pub fn redraw_of(&self, hwnd: NativeHandle) -> Option<bool> {
        self.state.borrow().windows.get(&hwnd).map(|w| w.redraw)
    }

    pub fn is_rtl(&self, hwnd: NativeHandle) -> bool {
        self.state
            .borrow()
            .windows
            .get(&hwnd)
            .is_some_and(|w| w.rtl)
    }
}

impl NativeHost for FakeHost {
    fn bind(&self, dispatcher: Weak<Dispatcher>) {
        *self.dispatcher.borrow_mut() = dispatcher;
    }

    fn register_class(&self, class: &ClassConfig) -> PlatformResult<()> {
        let mut state = self.state.borrow_mut();
        if !state.classes.iter().any(|c| c.class_name == class.class_name) {
            state.classes.push(class.clone());
        }
        Ok(())
    }

    fn create_window(&self, params: &CreateParams) -> PlatformResult<NativeHandle> {
        let mut state = self.state.borrow_mut();
        if state.fail_create {
            return Err(PlatformError::CreationFailed(params.class_name.clone()));
        }
        let hwnd = NativeHandle(state.next_handle);
        state.next_handle += 0x10;
        let origin = if params.pos == DEFAULT_POSITION {
            Point::default()
        } else {
            params.pos
        };
        state.windows.insert(
            hwnd,
            FakeWindow {
                parent: params.parent,
                text: params.title.clone(),
                bounds: Rect::new(origin.x, origin.y, params.size.width, params.size.height),
                enabled: true,
                visible: params.style & WS_VISIBLE != 0,
                rtl: false,
                font: None,
                redraw: true,
            },
        );
        state.created.push(params.clone());
        Ok(hwnd)
    }

    fn destroy_window(&self, hwnd: NativeHandle) -> bool {
        {
            let mut state = self.state.borrow_mut();
            if !state.windows.contains_key(&hwnd) || !state.dying.insert(hwnd) {
                return false;
            }
        }
        self.deliver(hwnd, WM_DESTROY, WParam(0), LParam(0));
        let children: Vec<NativeHandle> = self
            .state
            .borrow()
            .windows
            .iter()
            .filter(|(_, w)| w.parent == Some(hwnd))
            .map(|(h, _)| *h)
            .collect();
        for child in children {
            self.destroy_window(child);
        }
        self.deliver(hwnd, WM_NCDESTROY, WParam(0), LParam(0));

        let mut state = self.state.borrow_mut();
        state.windows.remove(&hwnd);
        state.attached.remove(&hwnd);
        state.dying.remove(&hwnd);
        if state.focus == Some(hwnd) {
            state.focus = None;
        }
        state.destroyed.push(hwnd);
        true
    }

    fn attach(&self, hwnd: NativeHandle) -> PlatformResult<()> {
        let mut state = self.state.borrow_mut();
        if state.fail_attach {
            return Err(PlatformError::SubclassFailed(hwnd));
        }
        if !state.windows.contains_key(&hwnd) {
            return Err(PlatformError::InvalidHandle(format!("{hwnd:?}")));
        }
        state.attached.insert(hwnd);
        Ok(())
    }

    fn detach(&self, hwnd: NativeHandle) -> bool {
        self.state.borrow_mut().attached.remove(&hwnd)
    }

    fn default_proc(&self, hwnd: NativeHandle, msg: u32, wparam: WParam, lparam: LParam) -> isize {
        self.state.borrow_mut().default_calls.push((hwnd, msg));
        match msg {
            WM_CLOSE => {
                self.destroy_window(hwnd);
            }
            // DefWindowProc hands an unhandled context menu up to the parent.
            WM_CONTEXTMENU => {
                let parent = self.with_window(hwnd, |w| w.parent).flatten();
                if let Some(parent) = parent {
                    return self.send_message(parent, msg, wparam, lparam);
                }
            }
            WM_SETFONT => {
                self.with_window(hwnd, |w| w.font = Some(FontHandle(wparam.0 as isize)));
            }
            WM_SETREDRAW => {
                self.with_window(hwnd, |w| w.redraw = wparam.0 != 0);
            }
            _ => {}
        }
        0
    }

    fn send_message(&self, hwnd: NativeHandle, msg: u32, wparam: WParam, lparam: LParam) -> isize {
        if !self.is_alive(hwnd) {
            return 0;
        }
        self.deliver(hwnd, msg, wparam, lparam)
    }

    fn notify_source(&self, lparam: LParam) -> Option<NativeHandle> {
        self.state.borrow().notify_sources.get(&lparam.0).copied()
    }

    fn screen_to_client(&self, hwnd: NativeHandle, point: Point) -> Point {
        match self.bounds_of(hwnd) {
            Some(bounds) => Point::new(point.x - bounds.x, point.y - bounds.y),
            None => point,
        }
    }

    fn next_message(&self) -> PumpMessage {
        self.state
            .borrow_mut()
            .queue
            .pop_front()
            .unwrap_or(PumpMessage::Quit(0))
    }

    fn translate_accelerator(&self, accel: AccelTable, msg: &Msg) -> bool {
        if msg.msg != WM_KEYDOWN {
            return false;
        }
        let command_id = self
            .state
            .borrow()
            .accelerators
            .get(&(accel, msg.wparam.0))
            .copied();
        match command_id {
            Some(id) => {
                self.send_message(msg.hwnd, WM_COMMAND, make_wparam(id, 1), LParam(0));
                true
            }
            None => false,
        }
    }

    fn dispatch_message(&self, msg: &Msg) -> isize {
        self.state.borrow_mut().dispatched += 1;
        if msg.hwnd.is_null() {
            return 0;
        }
        self.send_message(msg.hwnd, msg.msg, msg.wparam, msg.lparam)
    }

    fn post_quit(&self, exit_code: i32) {
        let mut state = self.state.borrow_mut();
        state.quit = Some(exit_code);
        state.queue.push_back(PumpMessage::Quit(exit_code));
    }

    fn set_text(&self, hwnd: NativeHandle, text: &str) -> bool {
        self.with_window(hwnd, |w| w.text = text.to_string())
            .is_some()
    }

    fn set_bounds(&self, hwnd: NativeHandle, bounds: Rect) -> bool {
        self.with_window(hwnd, |w| w.bounds = bounds).is_some()
    }

    fn window_rect(&self, hwnd: NativeHandle) -> Option<Rect> {
        self.bounds_of(hwnd)
    }

    fn work_area(&self, hwnd: NativeHandle) -> Option<Rect> {
        self.is_alive(hwnd).then(|| Rect::new(0, 0, 1920, 1080))
    }

    fn set_enabled(&self, hwnd: NativeHandle, enabled: bool) {
        self.with_window(hwnd, |w| w.enabled = enabled);
    }

    fn is_enabled(&self, hwnd: NativeHandle) -> bool {
        self.with_window(hwnd, |w| w.enabled).unwrap_or(false)
    }

    fn set_visible(&self, hwnd: NativeHandle, visible: bool) {
        self.with_window(hwnd, |w| w.visible = visible);
    }

    fn is_visible(&self, hwnd: NativeHandle) -> bool {
        self.with_window(hwnd, |w| w.visible).unwrap_or(false)
    }

    fn set_focus(&self, hwnd: NativeHandle) {
        if self.is_alive(hwnd) {
            self.state.borrow_mut().focus = Some(hwnd);
        }
    }

    fn is_focused(&self, hwnd: NativeHandle) -> bool {
        self.state.borrow().focus == Some(hwnd)
    }

    fn set_rtl(&self, hwnd: NativeHandle, rtl: bool) {
        self.with_window(hwnd, |w| w.rtl = rtl);
    }

    fn invalidate(&self, _hwnd: NativeHandle) {}

    fn create_solid_brush(&self, _color: ColorRef) -> Option<BrushHandle> {
        let mut state = self.state.borrow_mut();
        let brush = BrushHandle(state.next_brush);
        state.next_brush += 1;
        Some(brush)
    }

    fn delete_brush(&self, brush: BrushHandle) {
        self.state.borrow_mut().deleted_brushes.push(brush);
    }

    fn apply_ctl_colors(
        &self,
        hdc: DcHandle,
        text: Option<ColorRef>,
        background: Option<ColorRef>,
    ) {
        self.state
            .borrow_mut()
            .ctl_colors
            .push((hdc, text, background));
    }
}
