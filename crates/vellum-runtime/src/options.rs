//! Builder for [`Component`] construction.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use vellum_core::{DataContainer, Value};
use vellum_template::TemplateCompiler;

use crate::component::Component;
use crate::error::Result;
use crate::target::RenderTarget;
use crate::tick::TaskQueue;

pub type HookFn = Rc<dyn Fn(&Component)>;
pub type ComputedFn = Rc<dyn Fn(&Component) -> Value>;
pub type MethodFn = Rc<dyn Fn(&Component, &[Value]) -> Value>;
/// Watcher callback: `(component, new_value, old_value)`.
pub type WatchFn = Rc<dyn Fn(&Component, &Value, &Value)>;

/// Lifecycle points at which hooks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    /// During construction, before observation, computed and watchers.
    Created,
    BeforeMount,
    /// After the first render into a target.
    Mounted,
    BeforeUpdate,
    /// After each re-render caused by a data change.
    Updated,
    BeforeDestroy,
    Destroyed,
}

impl Hook {
    pub const ALL: [Hook; 7] = [
        Hook::Created,
        Hook::BeforeMount,
        Hook::Mounted,
        Hook::BeforeUpdate,
        Hook::Updated,
        Hook::BeforeDestroy,
        Hook::Destroyed,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Hook::Created => "created",
            Hook::BeforeMount => "beforeMount",
            Hook::Mounted => "mounted",
            Hook::BeforeUpdate => "beforeUpdate",
            Hook::Updated => "updated",
            Hook::BeforeDestroy => "beforeDestroy",
            Hook::Destroyed => "destroyed",
        }
    }
}

/// Everything a component is built from.
///
/// ```
/// use vellum_core::{data, Value};
/// use vellum_runtime::{ComponentOptions, SharedTarget};
///
/// let target = SharedTarget::new();
/// let component = ComponentOptions::new()
///     .data(data! { "count" => 3 })
///     .computed("double", |c| {
///         Value::from(c.get("count").map_or(0.0, |v| v.to_number()) * 2.0)
///     })
///     .template("{{ count }} x2 = {{ double }}")
///     .target(target.clone())
///     .build()
///     .unwrap();
///
/// assert_eq!(target.content(), "3 x2 = 6");
/// component.set("count", 4).unwrap();
/// assert_eq!(target.content(), "4 x2 = 8");
/// ```
#[derive(Default)]
pub struct ComponentOptions {
    pub(crate) data: DataContainer,
    pub(crate) computed: IndexMap<String, ComputedFn>,
    pub(crate) methods: IndexMap<String, MethodFn>,
    pub(crate) watch: Vec<(String, WatchFn)>,
    pub(crate) template: Option<String>,
    pub(crate) target: Option<Box<dyn RenderTarget>>,
    pub(crate) hooks: Vec<(Hook, HookFn)>,
    pub(crate) compiler: Option<Rc<TemplateCompiler>>,
    pub(crate) task_queue: Option<TaskQueue>,
}

impl ComponentOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Initial data. The component takes a handle to this container; the
    /// caller's clones see every change.
    #[must_use]
    pub fn data(mut self, data: DataContainer) -> Self {
        self.data = data;
        self
    }

    /// Computed entry, evaluated on every access and every render.
    #[must_use]
    pub fn computed(
        mut self,
        name: impl Into<String>,
        getter: impl Fn(&Component) -> Value + 'static,
    ) -> Self {
        self.computed.insert(name.into(), Rc::new(getter));
        self
    }

    #[must_use]
    pub fn method(
        mut self,
        name: impl Into<String>,
        method: impl Fn(&Component, &[Value]) -> Value + 'static,
    ) -> Self {
        self.methods.insert(name.into(), Rc::new(method));
        self
    }

    /// Watcher registered during construction. Several watchers per key
    /// are allowed; they run in the order given.
    #[must_use]
    pub fn watch(
        mut self,
        key: impl Into<String>,
        callback: impl Fn(&Component, &Value, &Value) + 'static,
    ) -> Self {
        self.watch.push((key.into(), Rc::new(callback)));
        self
    }

    #[must_use]
    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Mount into `target` at the end of construction.
    #[must_use]
    pub fn target(mut self, target: impl RenderTarget + 'static) -> Self {
        self.target = Some(Box::new(target));
        self
    }

    #[must_use]
    pub fn hook(mut self, hook: Hook, callback: impl Fn(&Component) + 'static) -> Self {
        self.hooks.push((hook, Rc::new(callback)));
        self
    }

    /// Compiler to render with. Defaults to the thread's shared compiler.
    #[must_use]
    pub fn compiler(mut self, compiler: Rc<TemplateCompiler>) -> Self {
        self.compiler = Some(compiler);
        self
    }

    /// Queue for `next_tick`. Defaults to [`TaskQueue::global`].
    #[must_use]
    pub fn task_queue(mut self, queue: TaskQueue) -> Self {
        self.task_queue = Some(queue);
        self
    }

    pub fn build(self) -> Result<Component> {
        Component::new(self)
    }
}

impl fmt::Debug for ComponentOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentOptions")
            .field("data", &self.data)
            .field("computed", &self.computed.keys().collect::<Vec<_>>())
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field(
                "watch",
                &self.watch.iter().map(|(k, _)| k).collect::<Vec<_>>(),
            )
            .field("template", &self.template)
            .field("target", &self.target.is_some())
            .field(
                "hooks",
                &self.hooks.iter().map(|(h, _)| h.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
