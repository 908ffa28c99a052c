use crate::host::{CursorPosition, SurfaceEvent, SurfaceListener, TextSurface};

/// 不含畫面的文字元件，供命令列與測試使用。 / Headless [`TextSurface`] used by the CLI and tests.
///
/// Listeners are notified synchronously, both for simulated user edits and from
/// inside [`set_value`](TextSurface::set_value), the way real editor widgets do.
#[derive(Default)]
pub struct BufferSurface {
    text: String,
    language: String,
    cursor: CursorPosition,
    revealed_line: Option<usize>,
    focused: bool,
    disposed: bool,
    layout_passes: usize,
    pushed_values: Vec<String>,
    listeners: Vec<SurfaceListener>,
}

impl BufferSurface {
    pub fn new() -> Self {
        Self {
            cursor: CursorPosition::new(1, 1),
            ..Self::default()
        }
    }

    /// 模擬使用者輸入。 / Simulates the user replacing the text.
    pub fn user_edit(&mut self, text: &str) {
        self.text = text.to_string();
        self.notify(SurfaceEvent::ContentChanged);
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn revealed_line(&self) -> Option<usize> {
        self.revealed_line
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn layout_passes(&self) -> usize {
        self.layout_passes
    }

    /// 所有透過 `set_value` 推入的文字。 / Every text pushed through `set_value`, oldest first.
    pub fn pushed_values(&self) -> &[String] {
        &self.pushed_values
    }

    pub fn line_count(&self) -> usize {
        self.text.split('\n').count()
    }

    fn notify(&mut self, event: SurfaceEvent) {
        for listener in &mut self.listeners {
            listener(event);
        }
    }
}

impl std::fmt::Debug for BufferSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferSurface")
            .field("language", &self.language)
            .field("cursor", &self.cursor)
            .field("len", &self.text.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl TextSurface for BufferSurface {
    fn value(&self) -> String {
        self.text.clone()
    }

    fn set_value(&mut self, text: &str) {
        self.text = text.to_string();
        self.pushed_values.push(self.text.clone());
        self.cursor = CursorPosition::new(1, 1);
        self.notify(SurfaceEvent::ContentChanged);
    }

    fn set_language(&mut self, language: &str) {
        self.language = language.to_string();
    }

    fn cursor(&self) -> CursorPosition {
        self.cursor
    }

    fn set_cursor(&mut self, position: CursorPosition) {
        let line = position.line.clamp(1, self.line_count());
        self.cursor = CursorPosition::new(line, position.column.max(1));
    }

    fn reveal_line(&mut self, line: usize) {
        self.revealed_line = Some(line);
    }

    fn layout(&mut self) {
        self.layout_passes += 1;
    }

    fn focus(&mut self) {
        self.focused = true;
    }

    fn dispose(&mut self) {
        self.disposed = true;
        self.listeners.clear();
    }

    fn subscribe(&mut self, listener: SurfaceListener) {
        if !self.disposed {
            self.listeners.push(listener);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn set_value_notifies_listeners_synchronously() {
        let mut surface = BufferSurface::new();
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        surface.subscribe(Box::new(move |_| counter.set(counter.get() + 1)));

        surface.set_value("a\nb");
        assert_eq!(hits.get(), 1);
        surface.user_edit("a\nb\nc");
        assert_eq!(hits.get(), 2);
        assert_eq!(surface.pushed_values(), ["a\nb".to_string()]);
    }

    #[test]
    fn cursor_is_clamped_to_existing_lines() {
        let mut surface = BufferSurface::new();
        surface.set_value("one\ntwo");
        surface.set_cursor(CursorPosition::new(9, 0));
        assert_eq!(surface.cursor(), CursorPosition::new(2, 1));
    }

    #[test]
    fn dispose_drops_listeners() {
        let mut surface = BufferSurface::new();
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        surface.subscribe(Box::new(move |_| counter.set(counter.get() + 1)));
        surface.dispose();
        surface.user_edit("x");
        assert_eq!(hits.get(), 0);
        assert!(surface.is_disposed());
    }
}
