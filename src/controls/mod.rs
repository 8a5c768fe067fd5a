/*
 * The two owning-object specializations the dispatch core knows about: the
 * top-level window, which owns the message pump's exit condition, and the
 * embedded control, which always has a parent toward which reflected messages
 * travel. Concrete visual controls build on `Control` with their own class name
 * and handlers.
 */
mod control;
mod top_level;

pub use control::Control;
pub use top_level::TopLevelWindow;
