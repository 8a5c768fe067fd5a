/*
 * Typed window-message dispatch for Win32. Every message arriving at an
 * intercepted handle becomes a typed event record, runs through the owning
 * object's filter and category handler, and either short-circuits or falls
 * through to default native processing. Notifications a parent receives about
 * a child control are reflected to the child's object first.
 *
 * The dispatch core (registry, pipeline, event model, pump, layout adapter)
 * is portable and talks to the windowing system only through `NativeHost`;
 * the Win32 implementation of that trait is compiled on Windows only, so the
 * core can be built and tested on every platform.
 */
pub mod controls;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod host;
pub mod layout;
pub mod message_loop;
pub mod messages;
pub mod registry;
pub mod types;
#[cfg(target_os = "windows")]
pub mod win32_host;
pub mod window_common;

#[cfg(test)]
pub(crate) mod fake_host;

pub use controls::{Control, TopLevelWindow};
pub use dispatch::{Dispatcher, Stage};
pub use error::{PlatformError, Result as PlatformResult};
pub use event::{
    CharArgs, CloseArgs, CommandArgs, ContextMenuArgs, DestroyArgs, Event, EventCopy, EventKind,
    KeyArgs, MouseWheelArgs, SizeArgs, WndEvent,
};
pub use host::NativeHost;
pub use layout::{Constraints, Layout, WindowLayout};
pub use message_loop::run_message_loop;
pub use registry::SubclassId;
pub use types::{
    AccelTable, BrushHandle, ColorRef, FontHandle, IconHandle, LParam, NativeHandle, Point, Rect,
    Size, WParam, WindowConfig,
};
#[cfg(target_os = "windows")]
pub use win32_host::Win32Host;
pub use window_common::{Window, WindowBase, position_close_to};
