/*
 * Common state and behaviour of every owning object (top-level windows and
 * embedded controls). `WindowBase` carries the pre-creation configuration, the
 * live handle, the two interception ids, the text buffer, colors and the
 * handler slots; the `Window` trait is the capability surface the dispatcher
 * talks to.
 *
 * All state uses interior mutability: objects are shared as `Rc<dyn Window>`
 * and a handler may re-enter the dispatcher for the very object that is being
 * dispatched, so nothing here is borrowed across a call into user code.
 */
use crate::dispatch::Dispatcher;
use crate::error::{PlatformError, Result as PlatformResult};
use crate::event::{
    CharEvent, CloseEvent, CommandEvent, ContextMenuEvent, DestroyEvent, KeyEvent,
    MouseWheelEvent, SizeEvent, WndEvent,
};
use crate::host::NativeHost;
use crate::messages::{WM_SETFONT, WM_SETREDRAW, is_ctlcolor};
use crate::registry::SubclassId;
use crate::types::{
    BrushHandle, ColorRef, CreateParams, DcHandle, FontHandle, LParam, NativeHandle, Rect, Size,
    WParam, WindowConfig,
};

use std::cell::{Cell, Ref, RefCell};
use std::rc::{Rc, Weak};

pub type MsgFilter = Rc<dyn Fn(&mut WndEvent)>;
pub type SizeHandler = Rc<dyn Fn(&mut SizeEvent)>;
pub type ContextMenuHandler = Rc<dyn Fn(&mut ContextMenuEvent)>;
pub type CommandHandler = Rc<dyn Fn(&mut CommandEvent)>;
pub type DestroyHandler = Rc<dyn Fn(&mut DestroyEvent)>;
pub type CloseHandler = Rc<dyn Fn(&mut CloseEvent)>;
pub type KeyHandler = Rc<dyn Fn(&mut KeyEvent)>;
pub type CharHandler = Rc<dyn Fn(&mut CharEvent)>;
pub type MouseWheelHandler = Rc<dyn Fn(&mut MouseWheelEvent)>;

/*
 * Snapshot of the handler slots. The dispatcher clones this at the start of a
 * pipeline run, so replacing a handler from inside a handler only affects the
 * next message.
 */
#[derive(Clone, Default)]
pub(crate) struct Handlers {
    pub msg_filter: Option<MsgFilter>,
    pub on_context_menu: Option<ContextMenuHandler>,
    pub on_size: Option<SizeHandler>,
    pub on_command: Option<CommandHandler>,
    // WM_NCDESTROY
    pub on_destroy: Option<DestroyHandler>,
    pub on_close: Option<CloseHandler>,
    pub on_key_down: Option<KeyHandler>,
    pub on_key_up: Option<KeyHandler>,
    pub on_char: Option<CharHandler>,
    // vertical and horizontal wheel
    pub on_mouse_wheel: Option<MouseWheelHandler>,
}

/*
 * Capability interface of an owning object. `create` builds the native window
 * and installs interception; `handle_message` and `handle_reflected_message`
 * are the object-specific part of the typed-dispatch stage for direct and
 * reflected delivery; `ideal_size` feeds the layout adapter.
 */
pub trait Window {
    fn base(&self) -> &WindowBase;

    fn create(self: Rc<Self>, dispatcher: &Rc<Dispatcher>) -> PlatformResult<NativeHandle>;

    fn handle_message(&self, _dispatcher: &Dispatcher, _ev: &mut WndEvent) {}

    fn handle_reflected_message(&self, dispatcher: &Dispatcher, ev: &mut WndEvent) {
        self.base().reflect_ctl_colors(dispatcher.host().as_ref(), ev);
    }

    fn ideal_size(&self) -> Size {
        self.base().config().initial_size
    }
}

pub struct WindowBase {
    config: RefCell<WindowConfig>,
    hwnd: Cell<Option<NativeHandle>>,
    subclass_id: Cell<Option<SubclassId>>,
    subclass_parent_id: Cell<Option<SubclassId>>,
    text: RefCell<String>,
    text_color: Cell<Option<ColorRef>>,
    background_color: Cell<Option<ColorRef>>,
    background_brush: Cell<Option<BrushHandle>>,
    handlers: RefCell<Handlers>,
    // Set on create; the object never keeps its dispatcher alive.
    dispatcher: RefCell<Weak<Dispatcher>>,
}

impl WindowBase {
    pub fn new(config: WindowConfig) -> Self {
        let text_color = config.text_color;
        let background_color = config.background_color;
        Self {
            config: RefCell::new(config),
            hwnd: Cell::new(None),
            subclass_id: Cell::new(None),
            subclass_parent_id: Cell::new(None),
            text: RefCell::new(String::new()),
            text_color: Cell::new(text_color),
            background_color: Cell::new(background_color),
            background_brush: Cell::new(None),
            handlers: RefCell::new(Handlers::default()),
            dispatcher: RefCell::new(Weak::new()),
        }
    }

    pub fn config(&self) -> Ref<'_, WindowConfig> {
        self.config.borrow()
    }

    /// Only meaningful before `create`.
    pub fn configure(&self, update: impl FnOnce(&mut WindowConfig)) {
        if self.hwnd.get().is_some() {
            log::warn!("WindowBase: configuration changed after creation has no effect");
        }
        update(&mut self.config.borrow_mut());
    }

    pub fn hwnd(&self) -> Option<NativeHandle> {
        self.hwnd.get()
    }

    pub fn subclass_id(&self) -> Option<SubclassId> {
        self.subclass_id.get()
    }

    pub fn subclass_parent_id(&self) -> Option<SubclassId> {
        self.subclass_parent_id.get()
    }

    pub(crate) fn set_subclass_id(&self, id: Option<SubclassId>) {
        self.subclass_id.set(id);
    }

    pub(crate) fn set_subclass_parent_id(&self, id: Option<SubclassId>) {
        self.subclass_parent_id.set(id);
    }

    pub(crate) fn handlers(&self) -> Handlers {
        self.handlers.borrow().clone()
    }

    pub(crate) fn dispatcher(&self) -> Option<Rc<Dispatcher>> {
        self.dispatcher.borrow().upgrade()
    }

    fn host(&self) -> Option<Rc<dyn NativeHost>> {
        self.dispatcher().map(|d| Rc::clone(d.host()))
    }

    // Both the handle and a live host, i.e. "created and still reachable".
    pub(crate) fn live(&self) -> Option<(NativeHandle, Rc<dyn NativeHost>)> {
        Some((self.hwnd.get()?, self.host()?))
    }

    pub(crate) fn attach_native(&self, hwnd: NativeHandle, dispatcher: &Rc<Dispatcher>) {
        self.hwnd.set(Some(hwnd));
        *self.dispatcher.borrow_mut() = Rc::downgrade(dispatcher);
    }

    pub(crate) fn clear_hwnd(&self) {
        self.hwnd.set(None);
    }

    // Handler slots. A new value takes effect on the next dispatched message.

    pub fn set_msg_filter(&self, filter: impl Fn(&mut WndEvent) + 'static) {
        self.handlers.borrow_mut().msg_filter = Some(Rc::new(filter));
    }

    pub fn clear_msg_filter(&self) {
        self.handlers.borrow_mut().msg_filter = None;
    }

    pub fn set_on_context_menu(&self, handler: impl Fn(&mut ContextMenuEvent) + 'static) {
        self.handlers.borrow_mut().on_context_menu = Some(Rc::new(handler));
    }

    pub fn set_on_size(&self, handler: impl Fn(&mut SizeEvent) + 'static) {
        self.handlers.borrow_mut().on_size = Some(Rc::new(handler));
    }

    pub fn set_on_command(&self, handler: impl Fn(&mut CommandEvent) + 'static) {
        self.handlers.borrow_mut().on_command = Some(Rc::new(handler));
    }

    pub fn set_on_destroy(&self, handler: impl Fn(&mut DestroyEvent) + 'static) {
        self.handlers.borrow_mut().on_destroy = Some(Rc::new(handler));
    }

    pub fn set_on_close(&self, handler: impl Fn(&mut CloseEvent) + 'static) {
        self.handlers.borrow_mut().on_close = Some(Rc::new(handler));
    }

    pub fn set_on_key_down(&self, handler: impl Fn(&mut KeyEvent) + 'static) {
        self.handlers.borrow_mut().on_key_down = Some(Rc::new(handler));
    }

    pub fn set_on_key_up(&self, handler: impl Fn(&mut KeyEvent) + 'static) {
        self.handlers.borrow_mut().on_key_up = Some(Rc::new(handler));
    }

    pub fn set_on_char(&self, handler: impl Fn(&mut CharEvent) + 'static) {
        self.handlers.borrow_mut().on_char = Some(Rc::new(handler));
    }

    pub fn set_on_mouse_wheel(&self, handler: impl Fn(&mut MouseWheelEvent) + 'static) {
        self.handlers.borrow_mut().on_mouse_wheel = Some(Rc::new(handler));
    }

    pub fn clear_handlers(&self) {
        *self.handlers.borrow_mut() = Handlers::default();
    }

    /*
     * Removes both interceptions (own handle and parent reflection). Safe to
     * call repeatedly and before creation.
     */
    pub fn unsubclass(&self) {
        let Some(dispatcher) = self.dispatcher() else {
            self.subclass_id.set(None);
            self.subclass_parent_id.set(None);
            return;
        };
        self.unsubclass_with(&dispatcher);
    }

    pub(crate) fn unsubclass_with(&self, dispatcher: &Dispatcher) {
        if let Some(id) = self.subclass_id.take() {
            dispatcher.unsubclass(id);
        }
        if let Some(id) = self.subclass_parent_id.take() {
            dispatcher.unsubclass(id);
        }
    }

    /// Destroys the native window; teardown of interceptions follows on `WM_NCDESTROY`.
    pub fn destroy(&self) {
        if let Some((hwnd, host)) = self.live() {
            log::debug!("WindowBase: destroying {hwnd:?}");
            if !host.destroy_window(hwnd) {
                log::warn!("WindowBase: destroy_window for {hwnd:?} reported failure");
            }
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        if let Some((hwnd, host)) = self.live() {
            host.set_enabled(hwnd, enabled);
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.live()
            .is_some_and(|(hwnd, host)| host.is_enabled(hwnd))
    }

    pub fn set_visible(&self, visible: bool) {
        if let Some((hwnd, host)) = self.live() {
            host.set_visible(hwnd, visible);
        }
    }

    pub fn is_visible(&self) -> bool {
        self.live()
            .is_some_and(|(hwnd, host)| host.is_visible(hwnd))
    }

    pub fn suspend_redraw(&self) {
        if let Some((hwnd, host)) = self.live() {
            host.send_message(hwnd, WM_SETREDRAW, WParam(0), LParam(0));
        }
    }

    pub fn resume_redraw(&self) {
        if let Some((hwnd, host)) = self.live() {
            host.send_message(hwnd, WM_SETREDRAW, WParam(1), LParam(0));
            host.invalidate(hwnd);
        }
    }

    pub fn set_focus(&self) {
        if let Some((hwnd, host)) = self.live() {
            host.set_focus(hwnd);
        }
    }

    pub fn is_focused(&self) -> bool {
        self.live()
            .is_some_and(|(hwnd, host)| host.is_focused(hwnd))
    }

    pub fn set_font(&self, font: FontHandle) {
        self.config.borrow_mut().font = Some(font);
        if let Some((hwnd, host)) = self.live() {
            host.send_message(hwnd, WM_SETFONT, WParam(font.0 as usize), LParam(1));
        }
    }

    /// Updates the text buffer and, once created, the native window text.
    pub fn set_text(&self, text: &str) {
        {
            let mut buffer = self.text.borrow_mut();
            buffer.clear();
            buffer.push_str(text);
        }
        if let Some((hwnd, host)) = self.live()
            && !host.set_text(hwnd, text)
        {
            log::warn!("WindowBase: set_text failed for {hwnd:?}");
        }
    }

    pub fn text(&self) -> String {
        self.text.borrow().clone()
    }

    pub fn set_bounds(&self, bounds: Rect) {
        if let Some((hwnd, host)) = self.live()
            && !host.set_bounds(hwnd, bounds)
        {
            log::warn!("WindowBase: set_bounds {bounds:?} failed for {hwnd:?}");
        }
    }

    pub fn set_text_color(&self, color: ColorRef) {
        self.text_color.set(Some(color));
        if let Some((hwnd, host)) = self.live() {
            host.invalidate(hwnd);
        }
    }

    /*
     * Stores the color and replaces the owned background brush, releasing the
     * previous one. Before creation only the color is recorded; the brush is
     * made on first use.
     */
    pub fn set_background_color(&self, color: ColorRef) {
        self.background_color.set(Some(color));
        let Some(host) = self.host() else {
            return;
        };
        self.release_brush(host.as_ref());
        self.background_brush.set(host.create_solid_brush(color));
        if let Some(hwnd) = self.hwnd.get() {
            host.invalidate(hwnd);
        }
    }

    pub fn set_colors(&self, background: ColorRef, text: ColorRef) {
        self.set_background_color(background);
        self.set_text_color(text);
    }

    pub fn text_color(&self) -> Option<ColorRef> {
        self.text_color.get()
    }

    pub fn background_color(&self) -> Option<ColorRef> {
        self.background_color.get()
    }

    pub fn set_rtl(&self, rtl: bool) {
        if let Some((hwnd, host)) = self.live() {
            host.set_rtl(hwnd, rtl);
        }
    }

    fn release_brush(&self, host: &dyn NativeHost) {
        if let Some(brush) = self.background_brush.take() {
            host.delete_brush(brush);
        }
    }

    /*
     * Answers a parent's WM_CTLCOLOR* for this control: applies the configured
     * colors to the supplied DC and returns the background brush.
     */
    pub(crate) fn reflect_ctl_colors(&self, host: &dyn NativeHost, ev: &mut WndEvent) {
        if !is_ctlcolor(ev.msg) {
            return;
        }
        let text = self.text_color.get();
        let background = self.background_color.get();
        if text.is_none() && background.is_none() {
            return;
        }
        host.apply_ctl_colors(DcHandle(ev.wparam.0 as isize), text, background);
        let brush = match (self.background_brush.get(), background) {
            (Some(brush), _) => Some(brush),
            (None, Some(color)) => {
                let brush = host.create_solid_brush(color);
                self.background_brush.set(brush);
                brush
            }
            (None, None) => None,
        };
        match brush {
            Some(brush) => ev.set_handled(brush.0),
            // Only a text color: let the default brush through but keep the DC changes.
            None => log::trace!("WindowBase: ctlcolor for {:?} without brush", self.hwnd.get()),
        }
    }
}

impl Drop for WindowBase {
    fn drop(&mut self) {
        if let Some(dispatcher) = self.dispatcher() {
            self.unsubclass_with(&dispatcher);
            let host = Rc::clone(dispatcher.host());
            if let Some(hwnd) = self.hwnd.take() {
                log::debug!("WindowBase: dropped while {hwnd:?} still alive, destroying it");
                host.destroy_window(hwnd);
            }
            self.release_brush(host.as_ref());
        }
    }
}

/*
 * Shared creation sequence: create the native window from the configuration,
 * bind it to the dispatcher, intercept its messages and apply font and colors.
 * A failed interception destroys the fresh window again so no unmanaged handle
 * is left behind.
 */
pub fn create_native(
    this: &Rc<dyn Window>,
    dispatcher: &Rc<Dispatcher>,
) -> PlatformResult<NativeHandle> {
    let base = this.base();
    if let Some(existing) = base.hwnd() {
        return Err(PlatformError::OperationFailed(format!(
            "window already created as {existing:?}"
        )));
    }
    let params = CreateParams::from_config(&base.config(), &base.text());
    let host = Rc::clone(dispatcher.host());
    let hwnd = host.create_window(&params)?;
    log::debug!(
        "WindowBase: created {hwnd:?} of class '{}'",
        params.class_name
    );
    base.attach_native(hwnd, dispatcher);

    if let Err(e) = dispatcher.subclass(this) {
        log::error!("WindowBase: interception of {hwnd:?} failed: {e}");
        base.clear_hwnd();
        host.destroy_window(hwnd);
        return Err(e);
    }

    let font = base.config().font;
    if let Some(font) = font {
        base.set_font(font);
    }
    if let Some(color) = base.background_color() {
        base.set_background_color(color);
    }
    Ok(hwnd)
}

/*
 * Places `window` just below the window `target`, flipping above it when the
 * result would leave the work area, and clamping horizontally.
 */
pub fn position_close_to(window: &dyn Window, target: NativeHandle) {
    let base = window.base();
    let Some((hwnd, host)) = base.live() else {
        return;
    };
    let (Some(anchor), Some(own)) = (host.window_rect(target), host.window_rect(hwnd)) else {
        log::warn!("WindowBase: position_close_to could not query geometry");
        return;
    };
    let mut x = anchor.x;
    let mut y = anchor.bottom();
    if let Some(work) = host.work_area(target) {
        if y + own.height > work.bottom() {
            y = anchor.y - own.height;
        }
        y = y.max(work.y);
        if x + own.width > work.right() {
            x = work.right() - own.width;
        }
        x = x.max(work.x);
    }
    base.set_bounds(Rect::new(x, y, own.width, own.height));
}
