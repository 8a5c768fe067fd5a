/*
 * Embedded control: a child window of a stock or custom class. Besides the
 * direct interception on its own handle it installs a reflection on its
 * parent, so notifications the parent receives about it (WM_COMMAND,
 * WM_NOTIFY, WM_CTLCOLOR*, scrolling, context menu) reach its handlers first.
 */
use crate::dispatch::Dispatcher;
use crate::error::{PlatformError, Result as PlatformResult};
use crate::types::{NativeHandle, Size, WindowConfig};
use crate::window_common::{Window, WindowBase, create_native};

use std::cell::Cell;
use std::rc::Rc;

const WS_CHILD: u32 = 0x4000_0000;

pub struct Control {
    base: WindowBase,
    ideal_size: Cell<Option<Size>>,
}

impl Control {
    pub fn new(config: WindowConfig) -> Rc<Self> {
        Rc::new(Self {
            base: WindowBase::new(config),
            ideal_size: Cell::new(None),
        })
    }

    /// Overrides the configured initial size as the control's preferred size.
    pub fn set_ideal_size(&self, size: Size) {
        self.ideal_size.set(Some(size));
    }
}

impl Window for Control {
    fn base(&self) -> &WindowBase {
        &self.base
    }

    fn create(self: Rc<Self>, dispatcher: &Rc<Dispatcher>) -> PlatformResult<NativeHandle> {
        let Some(parent) = self.base.config().parent else {
            return Err(PlatformError::InitializationFailed(
                "control needs a parent window".to_string(),
            ));
        };
        if self.base.hwnd().is_none() {
            self.base.configure(|config| config.style |= WS_CHILD);
        }
        let this: Rc<dyn Window> = self;
        let hwnd = create_native(&this, dispatcher)?;

        if let Err(e) = dispatcher.subclass_parent(&this, parent) {
            log::error!("Control: reflection from {parent:?} for {hwnd:?} failed: {e}");
            this.base().destroy();
            return Err(e);
        }
        Ok(hwnd)
    }

    fn ideal_size(&self) -> Size {
        self.ideal_size
            .get()
            .unwrap_or_else(|| self.base.config().initial_size)
    }
}
