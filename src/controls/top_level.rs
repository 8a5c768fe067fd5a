/*
 * Top-level (frame) window. Registers its window class on create, routes close
 * requests through the dispatch pipeline so the close handler can veto them,
 * and posts the quit message when its native window is destroyed.
 */
use crate::dispatch::Dispatcher;
use crate::error::{PlatformError, Result as PlatformResult};
use crate::event::WndEvent;
use crate::messages::{WM_CLOSE, WM_DESTROY};
use crate::types::{LParam, NativeHandle, WParam, WindowConfig};
use crate::window_common::{Window, WindowBase, create_native};

use std::cell::Cell;
use std::rc::Rc;

pub struct TopLevelWindow {
    base: WindowBase,
    // Exit code posted on WM_DESTROY; `None` leaves the pump running.
    quit_on_destroy: Cell<Option<i32>>,
}

impl TopLevelWindow {
    pub fn new(config: WindowConfig) -> Rc<Self> {
        Rc::new(Self {
            base: WindowBase::new(config),
            quit_on_destroy: Cell::new(Some(0)),
        })
    }

    pub fn set_title(&self, title: &str) {
        self.base.set_text(title);
    }

    pub fn set_quit_on_destroy(&self, exit_code: Option<i32>) {
        self.quit_on_destroy.set(exit_code);
    }

    /// Asks the window to close. The close handler may veto; otherwise the window is destroyed.
    pub fn close(&self) {
        let Some(hwnd) = self.base.hwnd() else {
            log::debug!("TopLevelWindow: close requested before creation");
            return;
        };
        let Some(dispatcher) = self.base.dispatcher() else {
            return;
        };
        dispatcher
            .host()
            .send_message(hwnd, WM_CLOSE, WParam(0), LParam(0));
    }
}

impl Window for TopLevelWindow {
    fn base(&self) -> &WindowBase {
        &self.base
    }

    fn create(self: Rc<Self>, dispatcher: &Rc<Dispatcher>) -> PlatformResult<NativeHandle> {
        let class = self.base.config().class_config();
        if class.class_name.is_empty() {
            return Err(PlatformError::InitializationFailed(
                "top-level window needs a class name".to_string(),
            ));
        }
        dispatcher.host().register_class(&class)?;
        let this: Rc<dyn Window> = self;
        create_native(&this, dispatcher)
    }

    fn handle_message(&self, dispatcher: &Dispatcher, ev: &mut WndEvent) {
        // Not marked handled: default processing still has to see WM_DESTROY.
        if ev.msg == WM_DESTROY
            && let Some(exit_code) = self.quit_on_destroy.get()
        {
            log::debug!(
                "TopLevelWindow: {:?} destroyed, posting quit({exit_code})",
                ev.hwnd
            );
            dispatcher.host().post_quit(exit_code);
        }
    }
}

// Interception is gone before the base destroys the window, so WM_DESTROY
// never reaches `handle_message`; post the quit here instead.
impl Drop for TopLevelWindow {
    fn drop(&mut self) {
        if let Some((hwnd, host)) = self.base.live()
            && let Some(exit_code) = self.quit_on_destroy.get()
        {
            log::debug!("TopLevelWindow: {hwnd:?} dropped while alive, posting quit({exit_code})");
            host.post_quit(exit_code);
        }
    }
}
