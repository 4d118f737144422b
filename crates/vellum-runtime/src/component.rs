#![forbid(unsafe_code)]

//! Reactive component: data, computed entries, watchers, and a template
//! re-rendered on every tracked change.
//!
//! # Render cycle
//!
//! ```text
//! Idle --(tracked write)--> Dispatching watchers --> Rendering --> Idle
//! ```
//!
//! Every tracked write runs its own cycle synchronously inside
//! [`Component::set`]. Rendering only happens when a template is set and
//! the component is mounted. Inside [`Component::set_many`] the render
//! step is deferred until the last key has been written, so a batch
//! renders once.
//!
//! # Invariants
//!
//! 1. Watchers for a key run in registration order, before the render
//!    that the same write triggers.
//! 2. A render reads data and computed entries at the moment it runs.
//!    When a render is started while another is in progress (a computed
//!    getter that writes data), the newer render's output is the one
//!    written to the target.
//! 3. After [`Component::destroy`] every operation returns
//!    [`ComponentError::Destroyed`].
//! 4. No `RefCell` borrow is held while user code (hooks, watchers,
//!    computed getters, methods, targets) runs.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Watching a key that does not exist | Registered; fires once the key is added and later changed |
//! | Interpolation error during render | Logged, interpolation renders `""` |
//! | Cyclic value passed to `set` | `ComponentError::Observe`, nothing stored |
//!
//! Writes must go through [`Component::set`] (or
//! [`DataContainer::set`] on the component's container). A callback that
//! captures a clone of the component keeps it alive until `destroy`.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use vellum_core::{ChangeCallback, DataContainer, Value, observe};
use vellum_expr::Scope;
use vellum_template::TemplateCompiler;
use web_time::Instant;

use crate::error::{ComponentError, Result};
use crate::events::{DATA_CHANGE, DataChange, EventEmitter, Unwatch};
use crate::options::{ComponentOptions, ComputedFn, Hook, HookFn, MethodFn, WatchFn};
use crate::target::RenderTarget;
use crate::tick::{NextTick, TaskQueue};

thread_local! {
    static SHARED_COMPILER: Rc<TemplateCompiler> = Rc::new(TemplateCompiler::new());
}

/// The thread's default compiler, shared by components built without an
/// explicit one.
#[must_use]
pub fn shared_compiler() -> Rc<TemplateCompiler> {
    SHARED_COMPILER.with(Rc::clone)
}

struct Inner {
    /// `None` once destroyed.
    data: RefCell<Option<DataContainer>>,
    computed: RefCell<IndexMap<String, ComputedFn>>,
    methods: RefCell<IndexMap<String, MethodFn>>,
    hooks: RefCell<Vec<(Hook, HookFn)>>,
    watchers: EventEmitter<DataChange>,
    events: EventEmitter<DataChange>,
    template: Option<String>,
    target: RefCell<Option<Box<dyn RenderTarget>>>,
    compiler: Rc<TemplateCompiler>,
    tasks: TaskQueue,
    on_change: ChangeCallback,
    mounted: Cell<bool>,
    batch_depth: Cell<usize>,
    render_pending: Cell<bool>,
    render_epoch: Cell<u64>,
    render_count: Cell<u64>,
}

/// Handle to a reactive component. Clones refer to the same component.
#[derive(Clone)]
pub struct Component {
    inner: Rc<Inner>,
}

impl Component {
    /// Build a component. Equivalent to [`ComponentOptions::build`].
    ///
    /// Order: `created` hook, observation of the data graph, computed and
    /// method tables, option watchers, then mounting if a target was given.
    pub fn new(options: ComponentOptions) -> Result<Self> {
        let ComponentOptions {
            data,
            computed,
            methods,
            watch,
            template,
            target,
            hooks,
            compiler,
            task_queue,
        } = options;

        let inner = Rc::new_cyclic(|weak: &Weak<Inner>| {
            let weak = weak.clone();
            let on_change: ChangeCallback = Rc::new(move |key: &str, new: &Value, old: &Value| {
                if let Some(inner) = weak.upgrade() {
                    Component { inner }.tracked_change(key, new, old);
                }
            });
            Inner {
                data: RefCell::new(Some(data)),
                computed: RefCell::new(IndexMap::new()),
                methods: RefCell::new(IndexMap::new()),
                hooks: RefCell::new(hooks),
                watchers: EventEmitter::new(),
                events: EventEmitter::new(),
                template,
                target: RefCell::new(None),
                compiler: compiler.unwrap_or_else(shared_compiler),
                tasks: task_queue.unwrap_or_else(TaskQueue::global),
                on_change,
                mounted: Cell::new(false),
                batch_depth: Cell::new(0),
                render_pending: Cell::new(false),
                render_epoch: Cell::new(0),
                render_count: Cell::new(0),
            }
        });
        let component = Component { inner };

        component.fire(Hook::Created);
        let data = component.data()?;
        observe(&Value::Map(data.clone()), &component.inner.on_change)?;
        *component.inner.computed.borrow_mut() = computed;
        *component.inner.methods.borrow_mut() = methods;
        for (key, callback) in watch {
            component.add_watcher(&key, callback);
        }
        tracing::debug!(
            keys = data.len(),
            computed = component.inner.computed.borrow().len(),
            has_template = component.inner.template.is_some(),
            "component created"
        );

        if let Some(target) = target {
            component.mount_boxed(target)?;
        }
        Ok(component)
    }

    /// Write `key`. A new key becomes tracked and triggers a render but no
    /// watchers; an existing key runs the full render cycle if the value
    /// changed.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        let data = self.data()?;
        if data.is_tracked(key) {
            data.set(key, value)?;
        } else {
            data.insert_tracked(key, value, &self.inner.on_change)?;
            tracing::debug!(key, "reactive key added");
            self.schedule_update();
        }
        Ok(())
    }

    /// Write several keys in order, rendering once after the last one.
    ///
    /// Watchers still run per key. On error the keys written before the
    /// failing one stay written and the pending render still happens.
    pub fn set_many<I, K, V>(&self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        self.data()?;
        let result = {
            let _batch = Batch::enter(&self.inner.batch_depth);
            entries
                .into_iter()
                .try_for_each(|(key, value)| self.set(key.as_ref(), value))
        };
        if self.inner.batch_depth.get() == 0 && self.inner.render_pending.replace(false) {
            self.update();
        }
        result
    }

    /// Value of `key`, falling back to a computed entry of that name, then
    /// to `undefined`.
    pub fn get(&self, key: &str) -> Result<Value> {
        let data = self.data()?;
        if let Some(value) = data.get(key) {
            return Ok(value);
        }
        Ok(self.computed(key)?.unwrap_or_default())
    }

    /// The component's container. Writes to keys it already holds are
    /// tracked. A key added through it stays untracked; add new keys with
    /// [`Component::set`].
    pub fn data(&self) -> Result<DataContainer> {
        self.inner
            .data
            .borrow()
            .clone()
            .ok_or(ComponentError::Destroyed)
    }

    /// Evaluate the computed entry `name`, if there is one.
    pub fn computed(&self, name: &str) -> Result<Option<Value>> {
        self.data()?;
        let getter = self.inner.computed.borrow().get(name).cloned();
        Ok(getter.map(|getter| getter(self)))
    }

    /// Invoke a registered method.
    pub fn call(&self, method: &str, args: &[Value]) -> Result<Value> {
        self.data()?;
        let found = self.inner.methods.borrow().get(method).cloned();
        let method_fn = found.ok_or_else(|| ComponentError::UnknownMethod(method.to_string()))?;
        Ok(method_fn(self, args))
    }

    /// Run `callback(component, new, old)` after every change to `key`.
    pub fn watch(
        &self,
        key: &str,
        callback: impl Fn(&Component, &Value, &Value) + 'static,
    ) -> Result<Unwatch> {
        self.data()?;
        Ok(self.add_watcher(key, Rc::new(callback)))
    }

    /// Subscribe to every tracked change, on the `dataChange` channel.
    pub fn on_data_change(&self, callback: impl Fn(&DataChange) + 'static) -> Result<Unwatch> {
        self.data()?;
        Ok(self.inner.events.subscribe(DATA_CHANGE, callback))
    }

    /// Defer `callback` to the component's task queue. It runs after
    /// everything the current synchronous phase does, renders included.
    pub fn next_tick<R: 'static>(
        &self,
        callback: impl FnOnce() -> R + 'static,
    ) -> Result<NextTick<R>> {
        self.data()?;
        Ok(self.inner.tasks.defer(callback))
    }

    /// Bind `target` and render into it, bracketed by `beforeMount` and
    /// `mounted`. Mounting again replaces the target.
    pub fn mount(&self, target: impl RenderTarget + 'static) -> Result<()> {
        self.mount_boxed(Box::new(target))
    }

    fn mount_boxed(&self, target: Box<dyn RenderTarget>) -> Result<()> {
        self.data()?;
        self.fire(Hook::BeforeMount);
        *self.inner.target.borrow_mut() = Some(target);
        self.inner.mounted.set(true);
        self.render_now();
        self.fire(Hook::Mounted);
        tracing::debug!("component mounted");
        Ok(())
    }

    /// Render the template now and return the markup. Writes the target
    /// when mounted. Does not run update hooks.
    pub fn render(&self) -> Result<String> {
        self.data()?;
        Ok(self.render_now().unwrap_or_default())
    }

    /// Tear down: `beforeDestroy`, drop watchers, observer, computed
    /// entries, methods and target, then `destroyed`.
    pub fn destroy(&self) -> Result<()> {
        self.data()?;
        self.fire(Hook::BeforeDestroy);
        let data = self.inner.data.borrow_mut().take();
        let Some(data) = data else {
            return Err(ComponentError::Destroyed);
        };
        data.detach();
        self.inner.watchers.clear();
        self.inner.events.clear();
        let computed = std::mem::take(&mut *self.inner.computed.borrow_mut());
        let methods = std::mem::take(&mut *self.inner.methods.borrow_mut());
        let target = self.inner.target.borrow_mut().take();
        drop((computed, methods, target));
        self.inner.mounted.set(false);
        self.inner.render_pending.set(false);

        self.fire(Hook::Destroyed);
        let hooks = std::mem::take(&mut *self.inner.hooks.borrow_mut());
        drop(hooks);
        tracing::debug!("component destroyed");
        Ok(())
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.inner.data.borrow().is_none()
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.inner.mounted.get()
    }

    #[must_use]
    pub fn template(&self) -> Option<&str> {
        self.inner.template.as_deref()
    }

    /// Renders completed so far, including the mount render.
    #[must_use]
    pub fn render_count(&self) -> u64 {
        self.inner.render_count.get()
    }

    /// Whether two handles refer to the same component.
    #[must_use]
    pub fn ptr_eq(&self, other: &Component) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // -- internals ---------------------------------------------------------

    fn add_watcher(&self, key: &str, callback: WatchFn) -> Unwatch {
        let weak = Rc::downgrade(&self.inner);
        self.inner.watchers.subscribe(key, move |change: &DataChange| {
            if let Some(inner) = weak.upgrade() {
                callback(&Component { inner }, &change.new_value, &change.old_value);
            }
        })
    }

    fn tracked_change(&self, key: &str, new: &Value, old: &Value) {
        if self.is_destroyed() {
            return;
        }
        let change = DataChange {
            key: key.to_string(),
            new_value: new.clone(),
            old_value: old.clone(),
        };
        let watchers = self.inner.watchers.emit(key, &change);
        self.inner.events.emit(DATA_CHANGE, &change);
        tracing::trace!(key, watchers, "tracked change dispatched");
        self.schedule_update();
    }

    fn schedule_update(&self) {
        if self.inner.batch_depth.get() > 0 {
            self.inner.render_pending.set(true);
        } else {
            self.update();
        }
    }

    /// Re-render bracketed by the update hooks.
    fn update(&self) {
        if self.is_destroyed() || !self.is_mounted() || self.inner.template.is_none() {
            return;
        }
        self.fire(Hook::BeforeUpdate);
        self.render_now();
        self.fire(Hook::Updated);
    }

    fn render_now(&self) -> Option<String> {
        let template = self.inner.template.as_deref()?;
        let epoch = self.inner.render_epoch.get() + 1;
        self.inner.render_epoch.set(epoch);

        let span = tracing::debug_span!(
            "component.render",
            epoch,
            template_len = template.len(),
            render_duration_us = tracing::field::Empty
        );
        let _guard = span.enter();
        let start = Instant::now();

        let compiled = self.inner.compiler.compile(template);
        let markup = compiled.render(&RenderScope(self));
        if self.inner.render_epoch.get() == epoch {
            self.write_target(&markup);
        } else {
            tracing::debug!(epoch, "render superseded by a newer one");
        }
        self.inner.render_count.set(self.inner.render_count.get() + 1);

        let elapsed_us = start.elapsed().as_micros() as u64;
        span.record("render_duration_us", elapsed_us);
        Some(markup)
    }

    fn write_target(&self, markup: &str) {
        let taken = self.inner.target.borrow_mut().take();
        let Some(mut target) = taken else { return };
        target.replace_content(markup);
        if self.is_destroyed() {
            return;
        }
        let mut slot = self.inner.target.borrow_mut();
        if slot.is_none() {
            *slot = Some(target);
        }
    }

    fn fire(&self, hook: Hook) {
        let callbacks: Vec<HookFn> = self
            .inner
            .hooks
            .borrow()
            .iter()
            .filter(|(h, _)| *h == hook)
            .map(|(_, f)| Rc::clone(f))
            .collect();
        if callbacks.is_empty() {
            return;
        }
        tracing::debug!(hook = hook.name(), "lifecycle hook");
        for callback in callbacks {
            callback(self);
        }
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("data", &*self.inner.data.borrow())
            .field(
                "computed",
                &self.inner.computed.borrow().keys().collect::<Vec<_>>(),
            )
            .field("template", &self.inner.template)
            .field("mounted", &self.inner.mounted.get())
            .field("renders", &self.inner.render_count.get())
            .finish()
    }
}

/// Render scope: computed entries shadow data keys.
struct RenderScope<'a>(&'a Component);

impl Scope for RenderScope<'_> {
    fn lookup(&self, name: &str) -> Option<Value> {
        let getter = self.0.inner.computed.borrow().get(name).cloned();
        if let Some(getter) = getter {
            return Some(getter(self.0));
        }
        self.0.inner.data.borrow().as_ref()?.get(name)
    }
}

/// Nesting guard for `set_many`.
struct Batch<'a> {
    depth: &'a Cell<usize>,
}

impl<'a> Batch<'a> {
    fn enter(depth: &'a Cell<usize>) -> Self {
        depth.set(depth.get() + 1);
        Self { depth }
    }
}

impl Drop for Batch<'_> {
    fn drop(&mut self) {
        self.depth.set(self.depth.get() - 1);
    }
}
