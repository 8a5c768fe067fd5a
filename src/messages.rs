/*
 * Message identifiers and parameter-unpacking helpers. The numeric values are
 * the Win32 ones; they are duplicated here so the portable dispatch core does
 * not depend on the `windows` crate.
 */
use crate::types::{LParam, WParam};

pub const WM_DESTROY: u32 = 0x0002;
pub const WM_SIZE: u32 = 0x0005;
pub const WM_SETREDRAW: u32 = 0x000B;
pub const WM_PAINT: u32 = 0x000F;
pub const WM_CLOSE: u32 = 0x0010;
pub const WM_SETFONT: u32 = 0x0030;
pub const WM_NOTIFY: u32 = 0x004E;
pub const WM_CONTEXTMENU: u32 = 0x007B;
pub const WM_NCDESTROY: u32 = 0x0082;
pub const WM_KEYDOWN: u32 = 0x0100;
pub const WM_KEYUP: u32 = 0x0101;
pub const WM_CHAR: u32 = 0x0102;
pub const WM_COMMAND: u32 = 0x0111;
pub const WM_HSCROLL: u32 = 0x0114;
pub const WM_VSCROLL: u32 = 0x0115;
pub const WM_CTLCOLOREDIT: u32 = 0x0133;
pub const WM_CTLCOLORLISTBOX: u32 = 0x0134;
pub const WM_CTLCOLORBTN: u32 = 0x0135;
pub const WM_CTLCOLORSTATIC: u32 = 0x0138;
pub const WM_MOUSEWHEEL: u32 = 0x020A;
pub const WM_MOUSEHWHEEL: u32 = 0x020E;
pub const WM_APP: u32 = 0x8000;

/// Notification messages whose `lparam` names the child control they concern.
pub(crate) fn is_ctlcolor(msg: u32) -> bool {
    matches!(
        msg,
        WM_CTLCOLOREDIT | WM_CTLCOLORLISTBOX | WM_CTLCOLORBTN | WM_CTLCOLORSTATIC
    )
}

#[inline]
pub(crate) fn loword_from_wparam(wparam: WParam) -> i32 {
    (wparam.0 & 0xFFFF) as i32
}
#[inline]
pub(crate) fn hiword_from_wparam(wparam: WParam) -> i32 {
    ((wparam.0 >> 16) & 0xFFFF) as i32
}
#[inline]
pub(crate) fn signed_hiword_from_wparam(wparam: WParam) -> i32 {
    ((wparam.0 >> 16) & 0xFFFF) as u16 as i16 as i32
}
// Coordinates and size words are signed (GET_X_LPARAM / GET_Y_LPARAM).
#[inline]
pub(crate) fn signed_loword_from_lparam(lparam: LParam) -> i32 {
    (lparam.0 & 0xFFFF) as u16 as i16 as i32
}
#[inline]
pub(crate) fn signed_hiword_from_lparam(lparam: LParam) -> i32 {
    ((lparam.0 >> 16) & 0xFFFF) as u16 as i16 as i32
}

/// Packs two words the way the windowing system does for coordinates.
pub fn make_lparam(lo: i32, hi: i32) -> LParam {
    LParam((((hi as u32 & 0xFFFF) << 16) | (lo as u32 & 0xFFFF)) as i32 as isize)
}

pub fn make_wparam(lo: i32, hi: i32) -> WParam {
    WParam((((hi as u32 & 0xFFFF) << 16) | (lo as u32 & 0xFFFF)) as usize)
}
