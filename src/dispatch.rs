/*
 * The dispatch pipeline. `Dispatcher` owns the handle -> object registry and
 * the host, and is the single entry point for every intercepted message:
 *
 *   1. reflection: objects that reflect from the addressed handle and that the
 *      message concerns run their reflected pipeline first;
 *   2. direct: the object owning the handle runs Filtered -> Typed-Dispatch;
 *   3. default: native default processing when nothing short-circuited.
 *
 * The registry is only borrowed while resolving; every object taking part in a
 * dispatch is captured as an `Rc` up front, so handlers may re-enter the
 * dispatcher, install or remove interceptions (their own included) and create
 * or destroy windows while the current message completes against the captured
 * state.
 */
use crate::error::{PlatformError, Result as PlatformResult};
use crate::event::{CloseArgs, Event, EventCopy, EventKind, WndEvent};
use crate::host::NativeHost;
use crate::messages::{
    WM_CLOSE, WM_COMMAND, WM_CONTEXTMENU, WM_HSCROLL, WM_NCDESTROY, WM_NOTIFY, WM_VSCROLL,
    is_ctlcolor,
};
use crate::registry::{InterceptionKind, Registry, SubclassId};
use crate::types::{LParam, NativeHandle, WParam};
use crate::window_common::Window;

use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    Direct,
    Reflected,
}

/// Where a pipeline run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Filtered,
    Handled,
    // The close handler set `cancel`.
    CloseVetoed,
    // The close handler handled the request without vetoing it.
    CloseAccepted,
    Default,
}

pub struct Dispatcher {
    host: Rc<dyn NativeHost>,
    registry: RefCell<Registry>,
    // (handle, message) pairs whose direct delivery is on the stack.
    in_flight: RefCell<Vec<(NativeHandle, u32)>>,
}

impl Dispatcher {
    pub fn new(host: Rc<dyn NativeHost>) -> Rc<Self> {
        Rc::new_cyclic(|weak| {
            host.bind(weak.clone());
            log::debug!("Dispatcher: initialized");
            Self {
                host,
                registry: RefCell::new(Registry::new()),
                in_flight: RefCell::new(Vec::new()),
            }
        })
    }

    pub fn host(&self) -> &Rc<dyn NativeHost> {
        &self.host
    }

    /// Install: intercept messages sent to the object's own handle.
    pub fn subclass(&self, object: &Rc<dyn Window>) -> PlatformResult<SubclassId> {
        let handle = object.base().hwnd().ok_or(PlatformError::NotCreated)?;
        let installed = self.registry.borrow_mut().install(object, handle)?;
        self.attach_if_first(installed.first_on_handle, installed.id, handle)?;
        object.base().set_subclass_id(Some(installed.id));
        Ok(installed.id)
    }

    /// InstallOnParent: intercept messages sent to `parent` that concern the object.
    pub fn subclass_parent(
        &self,
        object: &Rc<dyn Window>,
        parent: NativeHandle,
    ) -> PlatformResult<SubclassId> {
        let installed = self.registry.borrow_mut().install_on_parent(object, parent)?;
        self.attach_if_first(installed.first_on_handle, installed.id, parent)?;
        object.base().set_subclass_parent_id(Some(installed.id));
        Ok(installed.id)
    }

    fn attach_if_first(
        &self,
        first_on_handle: bool,
        id: SubclassId,
        handle: NativeHandle,
    ) -> PlatformResult<()> {
        if !first_on_handle {
            return Ok(());
        }
        if let Err(e) = self.host.attach(handle) {
            log::error!("Dispatcher: native interception of {handle:?} failed: {e}");
            self.registry.borrow_mut().remove(id);
            return Err(e);
        }
        Ok(())
    }

    /// Remove: idempotent, unknown ids are ignored. Returns whether anything was removed.
    pub fn unsubclass(&self, id: SubclassId) -> bool {
        let removed = self.registry.borrow_mut().remove(id);
        match removed {
            Some(removed) => {
                if removed.last_on_handle {
                    self.host.detach(removed.handle);
                }
                true
            }
            None => false,
        }
    }

    pub fn resolve(&self, hwnd: NativeHandle) -> Option<Rc<dyn Window>> {
        self.registry.borrow().resolve(hwnd)
    }

    pub fn is_intercepted(&self, hwnd: NativeHandle) -> bool {
        self.registry.borrow().is_intercepted(hwnd)
    }

    /// Clears the table and removes every native interception still installed.
    pub fn shutdown(&self) {
        let handles = self.registry.borrow_mut().clear();
        log::debug!(
            "Dispatcher: shutdown, detaching {} handle(s)",
            handles.len()
        );
        for handle in handles {
            self.host.detach(handle);
        }
    }

    /*
     * Entry point for one message delivered to `hwnd`. Returns the value handed
     * back to the windowing system.
     */
    pub fn dispatch(&self, hwnd: NativeHandle, msg: u32, wparam: WParam, lparam: LParam) -> isize {
        let (direct, reflectors) = {
            let registry = self.registry.borrow();
            (registry.resolve(hwnd), registry.reflection_targets(hwnd))
        };

        let mut reflected_result = None;
        if !reflectors.is_empty()
            && let Some(child) = self.concerned_child(msg, wparam, lparam)
            && !self.forwarded_by(child, msg)
        {
            for target in &reflectors {
                if target.base().hwnd() != Some(child) {
                    continue;
                }
                let mut ev = self.record(hwnd, msg, wparam, lparam, target);
                let stage = self.run_pipeline(target, &mut ev, Delivery::Reflected);
                log::trace!(
                    "Dispatcher: reflected {msg:#06x} from {hwnd:?} to {child:?}, {stage:?}"
                );
                if ev.parent_handled {
                    return ev.result;
                }
                if ev.handled {
                    reflected_result = Some(ev.result);
                }
            }
        }

        let Some(object) = direct else {
            let result = match reflected_result {
                Some(result) => result,
                None => self.host.default_proc(hwnd, msg, wparam, lparam),
            };
            if msg == WM_NCDESTROY {
                self.purge(hwnd);
            }
            return result;
        };

        self.in_flight.borrow_mut().push((hwnd, msg));
        let mut ev = self.record(hwnd, msg, wparam, lparam, &object);
        let stage = self.run_pipeline(&object, &mut ev, Delivery::Direct);
        log::trace!("Dispatcher: {msg:#06x} for {hwnd:?} stopped at {stage:?}");
        let result = match stage {
            Stage::Filtered | Stage::Handled | Stage::CloseVetoed => ev.result,
            Stage::CloseAccepted => {
                // Default processing is skipped, so destroy explicitly.
                log::debug!("Dispatcher: close of {hwnd:?} handled and accepted, destroying");
                self.host.destroy_window(hwnd);
                ev.result
            }
            Stage::Default => match reflected_result {
                Some(result) => result,
                None => self.host.default_proc(hwnd, msg, wparam, lparam),
            },
        };
        self.in_flight.borrow_mut().pop();

        if msg == WM_NCDESTROY {
            self.finish_destroy(&object, hwnd);
        }
        result
    }

    /*
     * Default processing of a child can hand a message up to its parent
     * (WM_CONTEXTMENU). The child's handlers already saw it on direct
     * delivery, so it is not reflected back to them.
     */
    fn forwarded_by(&self, child: NativeHandle, msg: u32) -> bool {
        let forwarded = self.in_flight.borrow().contains(&(child, msg));
        if forwarded {
            log::trace!("Dispatcher: {msg:#06x} forwarded up by {child:?}, not reflected");
        }
        forwarded
    }

    // Decodes once, with points relative to `object` (the child under reflection).
    fn record(
        &self,
        hwnd: NativeHandle,
        msg: u32,
        wparam: WParam,
        lparam: LParam,
        object: &Rc<dyn Window>,
    ) -> WndEvent {
        let window = object.base().hwnd().unwrap_or(hwnd);
        let owner = Some(Rc::clone(object));
        WndEvent::new_in_window(hwnd, msg, wparam, lparam, owner, |point| {
            self.host.screen_to_client(window, point)
        })
    }

    /*
     * Filtered -> Typed-Dispatch. Returns `Stage::Default` when the caller has
     * to continue (default processing for direct delivery, the parent's own
     * pipeline for reflected delivery).
     */
    fn run_pipeline(
        &self,
        object: &Rc<dyn Window>,
        ev: &mut WndEvent,
        delivery: Delivery,
    ) -> Stage {
        let handlers = object.base().handlers();

        if let Some(filter) = &handlers.msg_filter {
            filter(ev);
            if ev.handled {
                return Stage::Filtered;
            }
        }

        match ev.kind() {
            EventKind::Size(args) => {
                invoke(ev, args, handlers.on_size.as_deref());
            }
            EventKind::ContextMenu(args) => {
                invoke(ev, args, handlers.on_context_menu.as_deref());
            }
            EventKind::Command(args) => {
                invoke(ev, args, handlers.on_command.as_deref());
            }
            EventKind::Close(args) => {
                if let Some(CloseArgs { cancel: true }) =
                    invoke(ev, args, handlers.on_close.as_deref())
                {
                    ev.handled = true;
                    return Stage::CloseVetoed;
                }
                if ev.handled {
                    return Stage::CloseAccepted;
                }
            }
            EventKind::Destroy(args) => {
                invoke(ev, args, handlers.on_destroy.as_deref());
            }
            EventKind::KeyDown(args) => {
                invoke(ev, args, handlers.on_key_down.as_deref());
            }
            EventKind::KeyUp(args) => {
                invoke(ev, args, handlers.on_key_up.as_deref());
            }
            EventKind::Char(args) => {
                invoke(ev, args, handlers.on_char.as_deref());
            }
            EventKind::MouseWheel(args) => {
                invoke(ev, args, handlers.on_mouse_wheel.as_deref());
            }
            EventKind::Other => {}
        }
        if ev.handled {
            return Stage::Handled;
        }

        match delivery {
            Delivery::Direct => object.handle_message(self, ev),
            Delivery::Reflected => object.handle_reflected_message(self, ev),
        }
        if ev.handled {
            Stage::Handled
        } else {
            Stage::Default
        }
    }

    /// The child control a parent-addressed notification is about, if any.
    fn concerned_child(&self, msg: u32, wparam: WParam, lparam: LParam) -> Option<NativeHandle> {
        let child = match msg {
            WM_COMMAND | WM_HSCROLL | WM_VSCROLL => NativeHandle(lparam.0),
            m if is_ctlcolor(m) => NativeHandle(lparam.0),
            WM_CONTEXTMENU => NativeHandle(wparam.0 as isize),
            WM_NOTIFY => self.host.notify_source(lparam)?,
            _ => return None,
        };
        (!child.is_null()).then_some(child)
    }

    // Final message for the handle: nothing may resolve to it afterwards.
    fn finish_destroy(&self, object: &Rc<dyn Window>, hwnd: NativeHandle) {
        let base = object.base();
        base.unsubclass_with(self);
        if base.hwnd() == Some(hwnd) {
            base.clear_hwnd();
        }
        self.purge(hwnd);
        log::debug!("Dispatcher: {hwnd:?} destroyed, interceptions removed");
    }

    fn purge(&self, hwnd: NativeHandle) {
        let leftovers = self.registry.borrow_mut().purge_handle(hwnd);
        for (id, removed) in leftovers {
            if removed.kind == InterceptionKind::Direct {
                log::warn!("Dispatcher: stale {id:?} on destroyed {hwnd:?} purged");
            } else {
                log::warn!("Dispatcher: reflection {id:?} from destroyed parent {hwnd:?} purged");
            }
            if removed.last_on_handle {
                self.host.detach(hwnd);
            }
        }
    }
}

/*
 * Runs `handler` on a typed view of `ev`, if the slot is filled. Returns the
 * payload as the handler left it.
 */
fn invoke<A: Default + 'static>(
    ev: &mut WndEvent,
    args: A,
    handler: Option<&(dyn Fn(&mut Event<A>) + 'static)>,
) -> Option<A> {
    let handler = handler?;
    let mut view = EventCopy::new(ev, args);
    handler(&mut *view);
    Some(view.finish())
}
