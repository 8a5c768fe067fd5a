/*
 * Typed event records. Every incoming message becomes one `WndEvent`: the raw
 * base fields plus an `EventKind` decoded once at construction. Category
 * handlers receive a typed view (`Event<SizeArgs>`, `Event<CloseArgs>`, ...)
 * produced through `EventCopy`, which copies the base fields in and writes the
 * outcome (handled, result, parent veto) back when the view is finished or
 * dropped. Records are deliberately neither `Clone` nor `Copy`.
 */
use crate::messages::{
    WM_CHAR, WM_CLOSE, WM_COMMAND, WM_CONTEXTMENU, WM_KEYDOWN, WM_KEYUP, WM_MOUSEHWHEEL,
    WM_MOUSEWHEEL, WM_NCDESTROY, WM_SIZE, hiword_from_wparam, loword_from_wparam,
    signed_hiword_from_lparam, signed_hiword_from_wparam, signed_loword_from_lparam,
};
use crate::types::{LParam, NativeHandle, Point, WParam};
use crate::window_common::Window;

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SizeArgs {
    pub dx: i32,
    pub dy: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContextMenuArgs {
    // mouse position relative to the window
    pub mouse_window: Point,
    // screen position; (-1, -1) when invoked from the keyboard
    pub mouse_global: Point,
}

impl ContextMenuArgs {
    pub fn from_keyboard(&self) -> bool {
        self.mouse_global == Point::new(-1, -1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommandArgs {
    pub id: i32,
    pub ev: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CloseArgs {
    pub cancel: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DestroyArgs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyArgs {
    pub virt_code: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CharArgs {
    pub key_code: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MouseWheelArgs {
    pub is_vertical: bool,
    pub delta: i32,
    // MK_* modifier bitmask
    pub keys: u32,
    pub x: i32,
    pub y: i32,
}

/// Decoded payload of one message; `Other` when no specialization exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Size(SizeArgs),
    ContextMenu(ContextMenuArgs),
    Command(CommandArgs),
    Close(CloseArgs),
    Destroy(DestroyArgs),
    KeyDown(KeyArgs),
    KeyUp(KeyArgs),
    Char(CharArgs),
    MouseWheel(MouseWheelArgs),
    Other,
}

impl EventKind {
    /// Decodes without window geometry: window-relative points equal screen points.
    pub fn decode(msg: u32, wparam: WParam, lparam: LParam) -> Self {
        Self::decode_with(msg, wparam, lparam, |point| point)
    }

    /*
     * Full decode. `to_window` maps a screen point into the receiving window's
     * client coordinates; it is only called for messages that carry one.
     */
    pub fn decode_with(
        msg: u32,
        wparam: WParam,
        lparam: LParam,
        to_window: impl FnOnce(Point) -> Point,
    ) -> Self {
        match msg {
            WM_SIZE => EventKind::Size(SizeArgs {
                dx: signed_loword_from_lparam(lparam),
                dy: signed_hiword_from_lparam(lparam),
            }),
            WM_CONTEXTMENU => {
                let mouse_global = Point::new(
                    signed_loword_from_lparam(lparam),
                    signed_hiword_from_lparam(lparam),
                );
                let mut args = ContextMenuArgs {
                    mouse_window: mouse_global,
                    mouse_global,
                };
                if !args.from_keyboard() {
                    args.mouse_window = to_window(mouse_global);
                }
                EventKind::ContextMenu(args)
            }
            WM_COMMAND => EventKind::Command(CommandArgs {
                id: loword_from_wparam(wparam),
                ev: hiword_from_wparam(wparam),
            }),
            WM_CLOSE => EventKind::Close(CloseArgs::default()),
            WM_NCDESTROY => EventKind::Destroy(DestroyArgs),
            WM_KEYDOWN => EventKind::KeyDown(KeyArgs {
                virt_code: wparam.0 as i32,
            }),
            WM_KEYUP => EventKind::KeyUp(KeyArgs {
                virt_code: wparam.0 as i32,
            }),
            WM_CHAR => EventKind::Char(CharArgs {
                key_code: wparam.0 as i32,
            }),
            WM_MOUSEWHEEL | WM_MOUSEHWHEEL => EventKind::MouseWheel(MouseWheelArgs {
                is_vertical: msg == WM_MOUSEWHEEL,
                delta: signed_hiword_from_wparam(wparam),
                keys: loword_from_wparam(wparam) as u32,
                x: signed_loword_from_lparam(lparam),
                y: signed_hiword_from_lparam(lparam),
            }),
            _ => EventKind::Other,
        }
    }
}

/*
 * One in-flight notification. `hwnd` is the handle the message was physically
 * sent to; `owner` is the object that logically receives it, which under
 * reflection is the child control rather than the parent being addressed.
 */
pub struct Event<A> {
    pub hwnd: NativeHandle,
    pub msg: u32,
    pub wparam: WParam,
    pub lparam: LParam,
    pub handled: bool,
    pub result: isize,
    // Only meaningful on reflected delivery: stops the parent's own pipeline.
    pub parent_handled: bool,
    owner: Option<Rc<dyn Window>>,
    pub args: A,
}

/// The generic record every pipeline starts from.
pub type WndEvent = Event<EventKind>;

pub type SizeEvent = Event<SizeArgs>;
pub type ContextMenuEvent = Event<ContextMenuArgs>;
pub type CommandEvent = Event<CommandArgs>;
pub type CloseEvent = Event<CloseArgs>;
pub type DestroyEvent = Event<DestroyArgs>;
pub type KeyEvent = Event<KeyArgs>;
pub type CharEvent = Event<CharArgs>;
pub type MouseWheelEvent = Event<MouseWheelArgs>;

impl WndEvent {
    pub fn new(
        hwnd: NativeHandle,
        msg: u32,
        wparam: WParam,
        lparam: LParam,
        owner: Option<Rc<dyn Window>>,
    ) -> Self {
        let args = EventKind::decode(msg, wparam, lparam);
        Self::with_args(hwnd, msg, wparam, lparam, owner, args)
    }

    /// Like `new`, with screen points mapped through `to_window` while decoding.
    pub fn new_in_window(
        hwnd: NativeHandle,
        msg: u32,
        wparam: WParam,
        lparam: LParam,
        owner: Option<Rc<dyn Window>>,
        to_window: impl FnOnce(Point) -> Point,
    ) -> Self {
        let args = EventKind::decode_with(msg, wparam, lparam, to_window);
        Self::with_args(hwnd, msg, wparam, lparam, owner, args)
    }

    fn with_args(
        hwnd: NativeHandle,
        msg: u32,
        wparam: WParam,
        lparam: LParam,
        owner: Option<Rc<dyn Window>>,
        args: EventKind,
    ) -> Self {
        Self {
            hwnd,
            msg,
            wparam,
            lparam,
            handled: false,
            result: 0,
            parent_handled: false,
            owner,
            args,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.args
    }
}

impl<A> Event<A> {
    pub fn owner(&self) -> Option<&Rc<dyn Window>> {
        self.owner.as_ref()
    }

    /// Marks the record handled with `result`; later stages will not run.
    pub fn set_handled(&mut self, result: isize) {
        self.handled = true;
        self.result = result;
    }

    /// On reflected delivery, also keeps the parent from processing the message.
    pub fn suppress_parent(&mut self, result: isize) {
        self.set_handled(result);
        self.parent_handled = true;
    }
}

impl<A: fmt::Debug> fmt::Debug for Event<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("hwnd", &self.hwnd)
            .field("msg", &format_args!("{:#06x}", self.msg))
            .field("wparam", &self.wparam)
            .field("lparam", &self.lparam)
            .field("handled", &self.handled)
            .field("result", &self.result)
            .field("parent_handled", &self.parent_handled)
            .field("has_owner", &self.owner.is_some())
            .field("args", &self.args)
            .finish()
    }
}

/*
 * Scoped typed view of another record. Construction copies every base field
 * from `src` in one step; finishing or dropping the view copies the outcome
 * back, so a nested dispatch can never leave the two views disagreeing about
 * whether the message was handled.
 */
pub struct EventCopy<'a, S, A> {
    dst: Event<A>,
    src: &'a mut Event<S>,
}

impl<'a, S, A> EventCopy<'a, S, A> {
    pub fn new(src: &'a mut Event<S>, args: A) -> Self {
        let dst = Event {
            hwnd: src.hwnd,
            msg: src.msg,
            wparam: src.wparam,
            lparam: src.lparam,
            handled: src.handled,
            result: src.result,
            parent_handled: src.parent_handled,
            owner: src.owner.clone(),
            args,
        };
        Self { dst, src }
    }

    /// Writes the outcome back and hands out the (possibly modified) payload.
    pub fn finish(mut self) -> A
    where
        A: Default,
    {
        self.write_back();
        std::mem::take(&mut self.dst.args)
    }

    fn write_back(&mut self) {
        self.src.handled = self.dst.handled;
        self.src.result = self.dst.result;
        self.src.parent_handled = self.dst.parent_handled;
    }
}

impl<S, A> Deref for EventCopy<'_, S, A> {
    type Target = Event<A>;

    fn deref(&self) -> &Event<A> {
        &self.dst
    }
}

impl<S, A> DerefMut for EventCopy<'_, S, A> {
    fn deref_mut(&mut self) -> &mut Event<A> {
        &mut self.dst
    }
}

impl<S, A> Drop for EventCopy<'_, S, A> {
    fn drop(&mut self) {
        self.write_back();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{WM_PAINT, make_lparam, make_wparam};

    fn record(msg: u32, wparam: WParam, lparam: LParam) -> WndEvent {
        WndEvent::new(NativeHandle(0x10), msg, wparam, lparam, None)
    }

    #[test]
    fn new_record_starts_unhandled_with_zero_result() {
        let ev = record(WM_PAINT, WParam(1), LParam(2));
        assert!(!ev.handled);
        assert_eq!(ev.result, 0);
        assert!(!ev.parent_handled);
        assert!(ev.owner().is_none());
        assert_eq!(ev.kind(), EventKind::Other);
    }

    #[test]
    fn size_decodes_signed_words() {
        let ev = record(WM_SIZE, WParam(0), make_lparam(10, -4));
        assert_eq!(ev.kind(), EventKind::Size(SizeArgs { dx: 10, dy: -4 }));
    }

    #[test]
    fn command_splits_id_and_event_code() {
        let ev = record(WM_COMMAND, make_wparam(1001, 0x0300), LParam(0x55));
        assert_eq!(
            ev.kind(),
            EventKind::Command(CommandArgs {
                id: 1001,
                ev: 0x0300
            })
        );
    }

    #[test]
    fn wheel_decodes_axis_delta_keys_and_position() {
        let ev = record(WM_MOUSEHWHEEL, make_wparam(0x0004, 120), make_lparam(300, -20));
        let EventKind::MouseWheel(args) = ev.kind() else {
            panic!("expected a wheel event");
        };
        assert!(!args.is_vertical);
        assert_eq!(args.delta, 120);
        assert_eq!(args.keys, 0x0004);
        assert_eq!((args.x, args.y), (300, -20));
    }

    #[test]
    fn keyboard_context_menu_is_flagged() {
        let ev = record(WM_CONTEXTMENU, WParam(0), LParam(-1));
        let EventKind::ContextMenu(args) = ev.kind() else {
            panic!("expected a context menu event");
        };
        assert!(args.from_keyboard());
    }

    #[test]
    fn context_menu_maps_point_into_window_once() {
        let calls = std::cell::Cell::new(0);
        let ev = WndEvent::new_in_window(
            NativeHandle(0x10),
            WM_CONTEXTMENU,
            WParam(0x10),
            make_lparam(130, 70),
            None,
            |p| {
                calls.set(calls.get() + 1);
                Point::new(p.x - 100, p.y - 50)
            },
        );
        assert_eq!(
            ev.kind(),
            EventKind::ContextMenu(ContextMenuArgs {
                mouse_window: Point::new(30, 20),
                mouse_global: Point::new(130, 70),
            })
        );
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn keyboard_context_menu_and_other_messages_skip_mapping() {
        let mapped = std::cell::Cell::new(false);
        let keyboard = WndEvent::new_in_window(
            NativeHandle(0x10),
            WM_CONTEXTMENU,
            WParam(0),
            LParam(-1),
            None,
            |p| {
                mapped.set(true);
                p
            },
        );
        let size = WndEvent::new_in_window(
            NativeHandle(0x10),
            WM_SIZE,
            WParam(0),
            make_lparam(1, 2),
            None,
            |p| {
                mapped.set(true);
                p
            },
        );
        assert!(!mapped.get());
        assert!(matches!(keyboard.kind(), EventKind::ContextMenu(a) if a.from_keyboard()));
        assert_eq!(size.kind(), EventKind::Size(SizeArgs { dx: 1, dy: 2 }));
    }

    #[test]
    fn key_char_and_close_records() {
        assert_eq!(
            record(WM_KEYDOWN, WParam(0x41), LParam(0)).kind(),
            EventKind::KeyDown(KeyArgs { virt_code: 0x41 })
        );
        assert_eq!(
            record(WM_KEYUP, WParam(0x0D), LParam(0)).kind(),
            EventKind::KeyUp(KeyArgs { virt_code: 0x0D })
        );
        assert_eq!(
            record(WM_CHAR, WParam('x' as usize), LParam(0)).kind(),
            EventKind::Char(CharArgs {
                key_code: 'x' as i32
            })
        );
        assert_eq!(
            record(WM_CLOSE, WParam(0), LParam(0)).kind(),
            EventKind::Close(CloseArgs { cancel: false })
        );
    }

    #[test]
    fn typed_view_writes_outcome_back_on_finish() {
        // Arrange
        let mut ev = record(WM_CLOSE, WParam(0), LParam(0));
        // Act
        let mut view = EventCopy::new(&mut ev, CloseArgs::default());
        assert_eq!(view.hwnd, NativeHandle(0x10));
        view.args.cancel = true;
        view.set_handled(5);
        let args = view.finish();
        // Assert
        assert!(args.cancel);
        assert!(ev.handled);
        assert_eq!(ev.result, 5);
    }

    #[test]
    fn typed_view_writes_outcome_back_on_drop() {
        let mut ev = record(WM_SIZE, WParam(0), make_lparam(1, 2));
        {
            let mut view = EventCopy::new(&mut ev, SizeArgs { dx: 1, dy: 2 });
            view.suppress_parent(3);
        }
        assert!(ev.handled);
        assert!(ev.parent_handled);
        assert_eq!(ev.result, 3);
    }
}
