/*
 * Platform-neutral value types used throughout the dispatch core. Native
 * handles are carried as opaque integers so the registry, the pipeline and the
 * pump can be exercised without a live windowing system; the Win32 backend
 * converts them to and from `HWND`, `HFONT`, etc. at its boundary.
 */

/// Opaque identifier the windowing system uses to address a window or control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeHandle(pub isize);

impl NativeHandle {
    pub const NULL: NativeHandle = NativeHandle(0);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FontHandle(pub isize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BrushHandle(pub isize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IconHandle(pub isize);

/// Device context handed out with `WM_CTLCOLOR*` notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DcHandle(pub isize);

/// Keyboard accelerator table consulted by the message pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccelTable(pub isize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WParam(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LParam(pub isize);

/// Win32 `COLORREF` layout: 0x00BBGGRR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorRef(pub u32);

impl ColorRef {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        ColorRef((r as u32) | ((g as u32) << 8) | ((b as u32) << 16))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }
}

/// One message as retrieved from the thread's queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Msg {
    pub hwnd: NativeHandle,
    pub msg: u32,
    pub wparam: WParam,
    pub lparam: LParam,
}

impl Msg {
    pub fn new(hwnd: NativeHandle, msg: u32, wparam: WParam, lparam: LParam) -> Self {
        Self {
            hwnd,
            msg,
            wparam,
            lparam,
        }
    }
}

/// Result of a blocking fetch from the message queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpMessage {
    Message(Msg),
    Quit(i32),
}

/// Position value meaning "let the windowing system choose".
pub const DEFAULT_POSITION: Point = Point { x: -1, y: -1 };

/*
 * Configuration an owning object carries before its native handle exists.
 * Everything here is consumed by `create`; changing it afterwards has no effect
 * on the live window (use the runtime setters on `WindowBase` instead).
 */
#[derive(Debug, Clone, PartialEq)]
pub struct WindowConfig {
    // Either a class registered by this crate or a stock control class.
    pub class_name: String,
    pub parent: Option<NativeHandle>,
    pub initial_pos: Point,
    pub initial_size: Size,
    pub style: u32,
    pub ex_style: u32,
    pub font: Option<FontHandle>,
    pub menu_id: i32,
    // Those only matter when the class is registered by us.
    pub icon: Option<IconHandle>,
    pub icon_small: Option<IconHandle>,
    pub menu_name: Option<String>,
    pub text_color: Option<ColorRef>,
    pub background_color: Option<ColorRef>,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            class_name: String::new(),
            parent: None,
            initial_pos: DEFAULT_POSITION,
            initial_size: Size::default(),
            style: 0,
            ex_style: 0,
            font: None,
            menu_id: 0,
            icon: None,
            icon_small: None,
            menu_name: None,
            text_color: None,
            background_color: None,
        }
    }
}

impl WindowConfig {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            ..Self::default()
        }
    }

    pub fn with_parent(mut self, parent: NativeHandle) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_position(mut self, pos: Point) -> Self {
        self.initial_pos = pos;
        self
    }

    pub fn with_size(mut self, size: Size) -> Self {
        self.initial_size = size;
        self
    }

    pub fn with_style(mut self, style: u32, ex_style: u32) -> Self {
        self.style = style;
        self.ex_style = ex_style;
        self
    }

    pub fn with_font(mut self, font: FontHandle) -> Self {
        self.font = Some(font);
        self
    }

    pub fn with_menu_id(mut self, menu_id: i32) -> Self {
        self.menu_id = menu_id;
        self
    }

    pub fn with_icons(mut self, icon: IconHandle, icon_small: IconHandle) -> Self {
        self.icon = Some(icon);
        self.icon_small = Some(icon_small);
        self
    }

    pub fn with_colors(mut self, background: ColorRef, text: ColorRef) -> Self {
        self.background_color = Some(background);
        self.text_color = Some(text);
        self
    }

    pub(crate) fn class_config(&self) -> ClassConfig {
        ClassConfig {
            class_name: self.class_name.clone(),
            icon: self.icon,
            icon_small: self.icon_small,
            menu_name: self.menu_name.clone(),
        }
    }
}

/// Parameters for registering a custom window class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassConfig {
    pub class_name: String,
    pub icon: Option<IconHandle>,
    pub icon_small: Option<IconHandle>,
    pub menu_name: Option<String>,
}

/// Everything the host needs to create one native window.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateParams {
    pub class_name: String,
    pub title: String,
    pub parent: Option<NativeHandle>,
    pub pos: Point,
    pub size: Size,
    pub style: u32,
    pub ex_style: u32,
    pub menu_id: i32,
}

impl CreateParams {
    pub(crate) fn from_config(config: &WindowConfig, title: &str) -> Self {
        Self {
            class_name: config.class_name.clone(),
            title: title.to_owned(),
            parent: config.parent,
            pos: config.initial_pos,
            size: config.initial_size,
            style: config.style,
            ex_style: config.ex_style,
            menu_id: config.menu_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colorref_rgb_uses_bgr_layout() {
        assert_eq!(ColorRef::rgb(0x11, 0x22, 0x33).0, 0x0033_2211);
    }

    #[test]
    fn create_params_copy_configuration() {
        // Arrange
        let config = WindowConfig::new("EDIT")
            .with_parent(NativeHandle(9))
            .with_size(Size::new(120, 24))
            .with_style(0x5000_0000, 0x200)
            .with_menu_id(17);
        // Act
        let params = CreateParams::from_config(&config, "hello");
        // Assert
        assert_eq!(params.class_name, "EDIT");
        assert_eq!(params.title, "hello");
        assert_eq!(params.parent, Some(NativeHandle(9)));
        assert_eq!(params.pos, DEFAULT_POSITION);
        assert_eq!(params.size, Size::new(120, 24));
        assert_eq!(params.menu_id, 17);
    }

    #[test]
    fn rect_edges() {
        let r = Rect::new(10, 20, 30, 40);
        assert_eq!(r.right(), 40);
        assert_eq!(r.bottom(), 60);
    }
}
