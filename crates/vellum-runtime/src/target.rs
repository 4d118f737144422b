#![forbid(unsafe_code)]

//! Render targets: where a component writes its markup.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// A region whose whole content is replaced on every render.
pub trait RenderTarget {
    fn replace_content(&mut self, markup: &str);
}

impl<F> RenderTarget for F
where
    F: FnMut(&str),
{
    fn replace_content(&mut self, markup: &str) {
        self(markup);
    }
}

/// In-memory target shared between the component and its host.
///
/// Clones observe the same buffer, so a host can keep one handle and give
/// another to the component.
///
/// ```
/// use vellum_runtime::{RenderTarget, SharedTarget};
///
/// let target = SharedTarget::new();
/// let mut handle = target.clone();
/// handle.replace_content("<p>hi</p>");
/// assert_eq!(target.content(), "<p>hi</p>");
/// assert_eq!(target.write_count(), 1);
/// ```
#[derive(Clone, Default)]
pub struct SharedTarget {
    content: Rc<RefCell<String>>,
    writes: Rc<Cell<usize>>,
}

impl SharedTarget {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current content.
    #[must_use]
    pub fn content(&self) -> String {
        self.content.borrow().clone()
    }

    /// Number of times the content has been replaced.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.get()
    }
}

impl RenderTarget for SharedTarget {
    fn replace_content(&mut self, markup: &str) {
        let mut content = self.content.borrow_mut();
        content.clear();
        content.push_str(markup);
        self.writes.set(self.writes.get() + 1);
    }
}

impl fmt::Debug for SharedTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedTarget")
            .field("content", &*self.content.borrow())
            .field("writes", &self.writes.get())
            .finish()
    }
}
