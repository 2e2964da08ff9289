use std::collections::HashMap;
use std::fmt;
use std::io::Cursor;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};

use log::{debug, warn};
use parking_lot::Mutex;
use winit::event_loop::ActiveEventLoop;
use winit::window::{CursorIcon, CustomCursor, Window};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum CursorKind {
    Arrow,
    Cross,
    Hand,
    Move,
    Text,
    Wait,
}

impl CursorKind {
    pub const ALL: [CursorKind; 6] = [
        CursorKind::Arrow,
        CursorKind::Cross,
        CursorKind::Hand,
        CursorKind::Move,
        CursorKind::Text,
        CursorKind::Wait,
    ];

    /// Maps the runtime's numeric cursor constants.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(CursorKind::Arrow),
            1 => Some(CursorKind::Cross),
            2 => Some(CursorKind::Text),
            3 => Some(CursorKind::Wait),
            12 => Some(CursorKind::Hand),
            13 => Some(CursorKind::Move),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            CursorKind::Arrow => 0,
            CursorKind::Cross => 1,
            CursorKind::Text => 2,
            CursorKind::Wait => 3,
            CursorKind::Hand => 12,
            CursorKind::Move => 13,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CursorKind::Arrow => "arrow",
            CursorKind::Cross => "cross",
            CursorKind::Hand => "hand",
            CursorKind::Move => "move",
            CursorKind::Text => "text",
            CursorKind::Wait => "wait",
        }
    }

    fn bitmap(self) -> &'static [u8] {
        match self {
            CursorKind::Arrow => {
                include_bytes!("../../assets/cursors/arrow.png")
            }
            CursorKind::Cross => {
                include_bytes!("../../assets/cursors/cross.png")
            }
            CursorKind::Hand => {
                include_bytes!("../../assets/cursors/hand.png")
            }
            CursorKind::Move => {
                include_bytes!("../../assets/cursors/move.png")
            }
            CursorKind::Text => {
                include_bytes!("../../assets/cursors/text.png")
            }
            CursorKind::Wait => {
                include_bytes!("../../assets/cursors/wait.png")
            }
        }
    }

    /// Centered unless the bitmap's point of interest sits elsewhere.
    pub fn hotspot(self, width: u32, height: u32) -> (u32, u32) {
        match self {
            CursorKind::Arrow => (10, 7),
            CursorKind::Hand => (12, 8),
            CursorKind::Text => (16, 22),
            _ => (width / 2, height / 2),
        }
    }

    pub(crate) fn system_icon(self) -> CursorIcon {
        match self {
            CursorKind::Arrow => CursorIcon::Default,
            CursorKind::Cross => CursorIcon::Crosshair,
            CursorKind::Hand => CursorIcon::Pointer,
            CursorKind::Move => CursorIcon::Move,
            CursorKind::Text => CursorIcon::Text,
            CursorKind::Wait => CursorIcon::Wait,
        }
    }
}

impl fmt::Display for CursorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for CursorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CursorKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown cursor kind '{}'", s))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CursorImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
    pub hotspot: (u32, u32),
}

impl CursorImage {
    pub fn from_rgba(
        width: u32,
        height: u32,
        rgba: Vec<u8>,
        hotspot: (u32, u32),
    ) -> Result<Self, String> {
        if width == 0 || height == 0 {
            return Err("cursor image has zero area".to_string());
        }

        let expected = (width * height * 4) as usize;
        if rgba.len() != expected {
            return Err(format!(
                "cursor image is {}x{} but has {} bytes (expected {})",
                width,
                height,
                rgba.len(),
                expected
            ));
        }

        Ok(Self {
            width,
            height,
            rgba,
            hotspot: (hotspot.0.min(width - 1), hotspot.1.min(height - 1)),
        })
    }

    pub fn decode_png(
        bytes: &[u8],
        hotspot: impl FnOnce(u32, u32) -> (u32, u32),
    ) -> Result<Self, String> {
        let decoder = png::Decoder::new(Cursor::new(bytes));
        let mut reader = decoder
            .read_info()
            .map_err(|err| format!("failed to decode cursor PNG: {}", err))?;
        let output_buffer_size = reader.output_buffer_size().ok_or_else(|| {
            "failed to determine cursor PNG buffer size".to_string()
        })?;
        let mut buf = vec![0; output_buffer_size];
        let info = reader
            .next_frame(&mut buf)
            .map_err(|err| format!("failed to read cursor PNG: {}", err))?;
        let src = &buf[..info.buffer_size()];

        let rgba = match (info.color_type, info.bit_depth) {
            (png::ColorType::Rgba, png::BitDepth::Eight) => src.to_vec(),
            (png::ColorType::Rgb, png::BitDepth::Eight) => src
                .chunks_exact(3)
                .flat_map(|px| [px[0], px[1], px[2], 255])
                .collect(),
            (color, depth) => {
                return Err(format!(
                    "unsupported cursor PNG format: {:?} {:?}",
                    color, depth
                ));
            }
        };

        let spot = hotspot(info.width, info.height);
        Self::from_rgba(info.width, info.height, rgba, spot)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum CursorSpec {
    Named(CursorKind, Arc<CursorImage>),
    Custom(Arc<CursorImage>),
}

impl CursorSpec {
    pub fn image(&self) -> &CursorImage {
        match self {
            CursorSpec::Named(_, image) | CursorSpec::Custom(image) => image,
        }
    }

    pub fn kind(&self) -> Option<CursorKind> {
        match self {
            CursorSpec::Named(kind, _) => Some(*kind),
            CursorSpec::Custom(_) => None,
        }
    }
}

/// Named cursor bitmaps, decoded on first use and kept for the life of the
/// process.
#[derive(Default)]
pub struct CursorCache {
    entries: Mutex<HashMap<CursorKind, Arc<CursorImage>>>,
}

static CURSOR_CACHE: LazyLock<CursorCache> =
    LazyLock::new(CursorCache::default);

impl CursorCache {
    pub fn global() -> &'static CursorCache {
        &CURSOR_CACHE
    }

    pub fn get_or_load(
        &self,
        kind: CursorKind,
    ) -> Result<Arc<CursorImage>, String> {
        let mut entries = self.entries.lock();
        if let Some(image) = entries.get(&kind) {
            return Ok(image.clone());
        }

        let image = Arc::new(CursorImage::decode_png(kind.bitmap(), |w, h| {
            kind.hotspot(w, h)
        })?);
        debug!("loaded {} cursor", kind);
        entries.insert(kind, image.clone());
        Ok(image)
    }

    pub fn contains(&self, kind: CursorKind) -> bool {
        self.entries.lock().contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Backend hook that puts a cursor on screen.
pub trait CursorTarget {
    fn apply_cursor(&mut self, cursor: &CursorSpec);
    fn set_cursor_visible(&mut self, visible: bool);
}

pub struct CursorManager {
    cache: &'static CursorCache,
    current: Option<CursorSpec>,
    visible: bool,
}

impl Default for CursorManager {
    fn default() -> Self {
        Self::new(CursorCache::global())
    }
}

impl CursorManager {
    pub fn new(cache: &'static CursorCache) -> Self {
        Self {
            cache,
            current: None,
            visible: true,
        }
    }

    pub fn current(&self) -> Option<&CursorSpec> {
        self.current.as_ref()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_cursor(
        &mut self,
        kind: CursorKind,
        target: &mut dyn CursorTarget,
    ) {
        match self.cache.get_or_load(kind) {
            Ok(image) => {
                let spec = CursorSpec::Named(kind, image);
                target.apply_cursor(&spec);
                self.current = Some(spec);
            }
            Err(err) => warn!("cannot load {} cursor: {}", kind, err),
        }
    }

    /// Unknown codes leave the current cursor untouched.
    pub fn set_cursor_code(
        &mut self,
        code: i32,
        target: &mut dyn CursorTarget,
    ) -> bool {
        match CursorKind::from_code(code) {
            Some(kind) => {
                self.set_cursor(kind, target);
                true
            }
            None => {
                warn!("unknown cursor type {}, cursor unchanged", code);
                false
            }
        }
    }

    /// Custom images bypass the cache.
    pub fn set_custom_cursor(
        &mut self,
        image: CursorImage,
        target: &mut dyn CursorTarget,
    ) {
        let spec = CursorSpec::Custom(Arc::new(image));
        target.apply_cursor(&spec);
        self.current = Some(spec);
    }

    pub fn show_cursor(&mut self, target: &mut dyn CursorTarget) {
        if !self.visible {
            self.visible = true;
            target.set_cursor_visible(true);
        }
    }

    pub fn hide_cursor(&mut self, target: &mut dyn CursorTarget) {
        if self.visible {
            self.visible = false;
            target.set_cursor_visible(false);
        }
    }

    /// Re-applies the current state to a freshly created window.
    pub fn reapply(&self, target: &mut dyn CursorTarget) {
        if let Some(spec) = self.current.as_ref() {
            target.apply_cursor(spec);
        }
        target.set_cursor_visible(self.visible);
    }
}

/// Applies cursors to a winit window. Custom cursors need the active event
/// loop to be realized.
pub struct WinitCursorTarget<'a> {
    pub event_loop: &'a ActiveEventLoop,
    pub window: &'a Window,
}

impl CursorTarget for WinitCursorTarget<'_> {
    fn apply_cursor(&mut self, cursor: &CursorSpec) {
        let image = cursor.image();
        let source = CustomCursor::from_rgba(
            image.rgba.clone(),
            image.width as u16,
            image.height as u16,
            image.hotspot.0 as u16,
            image.hotspot.1 as u16,
        );

        match source {
            Ok(source) => {
                let custom = self.event_loop.create_custom_cursor(source);
                self.window.set_cursor(custom);
            }
            Err(err) => {
                warn!("cursor image rejected by the window system: {}", err);
                if let Some(kind) = cursor.kind() {
                    self.window.set_cursor(kind.system_icon());
                }
            }
        }
    }

    fn set_cursor_visible(&mut self, visible: bool) {
        self.window.set_cursor_visible(visible);
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        applied: Vec<CursorSpec>,
        visibility: Vec<bool>,
    }

    impl CursorTarget for Recorder {
        fn apply_cursor(&mut self, cursor: &CursorSpec) {
            self.applied.push(cursor.clone());
        }

        fn set_cursor_visible(&mut self, visible: bool) {
            self.visibility.push(visible);
        }
    }

    #[test]
    fn codes_round_trip_through_kinds() {
        for kind in CursorKind::ALL {
            assert_eq!(CursorKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(CursorKind::from_code(5), None);
        assert_eq!("HAND".parse::<CursorKind>(), Ok(CursorKind::Hand));
        assert!("spinner".parse::<CursorKind>().is_err());
    }

    #[test]
    fn hotspots_follow_bitmap_overrides() {
        assert_eq!(CursorKind::Arrow.hotspot(32, 32), (10, 7));
        assert_eq!(CursorKind::Hand.hotspot(32, 32), (12, 8));
        assert_eq!(CursorKind::Text.hotspot(32, 32), (16, 22));
        assert_eq!(CursorKind::Cross.hotspot(32, 32), (16, 16));
        assert_eq!(CursorKind::Wait.hotspot(24, 20), (12, 10));
    }

    #[test]
    fn bundled_bitmaps_decode() {
        let cache = CursorCache::default();
        for kind in CursorKind::ALL {
            let image = cache.get_or_load(kind).unwrap();
            assert_eq!((image.width, image.height), (32, 32));
            assert_eq!(image.rgba.len(), 32 * 32 * 4);
            assert_eq!(image.hotspot, kind.hotspot(32, 32));
        }
        assert_eq!(cache.len(), CursorKind::ALL.len());
    }

    #[test]
    fn rejects_mismatched_rgba() {
        assert!(CursorImage::from_rgba(2, 2, vec![0; 15], (0, 0)).is_err());
        assert!(CursorImage::from_rgba(0, 2, vec![], (0, 0)).is_err());

        let image = CursorImage::from_rgba(2, 2, vec![0; 16], (9, 9)).unwrap();
        assert_eq!(image.hotspot, (1, 1));
    }

    #[test]
    #[serial]
    fn unknown_code_keeps_current_cursor() {
        let mut manager = CursorManager::default();
        let mut target = Recorder::default();

        assert!(manager.set_cursor_code(12, &mut target));
        assert!(!manager.set_cursor_code(99, &mut target));

        assert_eq!(target.applied.len(), 1);
        assert_eq!(
            manager.current().and_then(CursorSpec::kind),
            Some(CursorKind::Hand)
        );
    }

    #[test]
    #[serial]
    fn cache_entries_are_shared() {
        let first =
            CursorCache::global().get_or_load(CursorKind::Move).unwrap();
        let second =
            CursorCache::global().get_or_load(CursorKind::Move).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(CursorCache::global().contains(CursorKind::Move));
    }

    #[test]
    fn concurrent_loads_decode_once() {
        let cache: &'static CursorCache =
            Box::leak(Box::new(CursorCache::default()));

        let handles: Vec<_> = (0..2)
            .map(|_| {
                std::thread::spawn(move || {
                    cache.get_or_load(CursorKind::Wait).unwrap()
                })
            })
            .collect();
        let images: Vec<_> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(Arc::ptr_eq(&images[0], &images[1]));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn state_set_while_detached_reaches_new_window() {
        let mut manager = CursorManager::new(CursorCache::global());
        let mut detached = Recorder::default();
        let image = CursorImage::from_rgba(2, 2, vec![7; 16], (0, 0)).unwrap();

        manager.set_custom_cursor(image.clone(), &mut detached);
        manager.hide_cursor(&mut detached);

        let mut window = Recorder::default();
        manager.reapply(&mut window);

        assert_eq!(window.applied.len(), 1);
        assert_eq!(window.applied[0].image(), &image);
        assert_eq!(window.visibility, vec![false]);
    }

    #[test]
    fn visibility_toggles_without_touching_cursor() {
        let mut manager = CursorManager::new(CursorCache::global());
        let mut target = Recorder::default();

        manager.hide_cursor(&mut target);
        manager.hide_cursor(&mut target);
        manager.show_cursor(&mut target);

        assert_eq!(target.visibility, vec![false, true]);
        assert!(target.applied.is_empty());
        assert!(manager.is_visible());
    }

    #[test]
    fn custom_cursor_is_applied_directly() {
        let mut manager = CursorManager::new(CursorCache::global());
        let mut target = Recorder::default();
        let image =
            CursorImage::from_rgba(4, 4, vec![255; 64], (2, 2)).unwrap();

        manager.set_custom_cursor(image.clone(), &mut target);
        assert_eq!(target.applied[0].image(), &image);
        assert_eq!(manager.current().and_then(CursorSpec::kind), None);
    }
}
