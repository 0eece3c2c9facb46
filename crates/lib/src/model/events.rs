//! Path bindings and change dispatch to an external view adapter.
//!
//! A binding associates a path pattern with a [`HandlerSpec`] describing
//! which view element to patch and how. When the model mutates a real path,
//! every active binding re-resolves its own pattern and fires if:
//!
//! - its current real path is the mutated path, or
//! - the mutated path is an ancestor of its real path (a subtree was
//!   replaced), or
//! - its resolution passes through the mutated path: a reference location,
//!   a reference target or key path, or a computed value's argument path.
//!
//! The last rule is what re-fires `user.name` when the `userIndex` a keyed
//! reference reads from changes. For a set, a dependency below the mutated
//! path counts too, since replacing the object that holds a key or a marker
//! replaces them as well. The real path and dependencies recorded at the
//! previous notification are consulted alongside the current ones, so
//! replacing a reference marker still reaches bindings that went through it.
//!
//! Delivery goes through the [`Adapter`]. An adapter reporting
//! [`Delivery::TargetGone`] means the view element no longer exists and the
//! binding is unbound for good.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use tracing::{debug, trace, warn};

use super::{ModelError, Value, path::PathBuf};

/// Method name used for push deliveries.
pub const APPEND_HTML: &str = "appendHtml";

/// Outcome of one adapter update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The view target received the update.
    Delivered,
    /// The view target no longer exists.
    TargetGone,
}

impl Delivery {
    pub fn is_delivered(self) -> bool {
        matches!(self, Delivery::Delivered)
    }
}

impl From<bool> for Delivery {
    fn from(delivered: bool) -> Self {
        if delivered {
            Delivery::Delivered
        } else {
            Delivery::TargetGone
        }
    }
}

/// The view property a binding targets: a plain name such as `"height"`, or
/// a property path such as `["style", "color"]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Property {
    Name(String),
    Path(Vec<String>),
}

impl From<&str> for Property {
    fn from(name: &str) -> Self {
        Property::Name(name.to_string())
    }
}

impl From<String> for Property {
    fn from(name: String) -> Self {
        Property::Name(name)
    }
}

impl From<Vec<&str>> for Property {
    fn from(path: Vec<&str>) -> Self {
        Property::Path(path.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Property {
    fn from(path: [&str; N]) -> Self {
        Property::Path(path.iter().map(|s| s.to_string()).collect())
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Property::Name(name) => write!(f, "{name}"),
            Property::Path(path) => write!(f, "{}", path.join(".")),
        }
    }
}

/// What a binding asks the adapter to do: `[id, method, property, viewFunc]`.
///
/// ```
/// # use livemodel::model::events::{HandlerSpec, Property};
/// let spec = HandlerSpec::new("list", "html").view_func("stuff");
/// assert_eq!(spec.property, None);
///
/// let spec = HandlerSpec::new("test", "prop").property(["style", "color"]);
/// assert_eq!(spec.property, Some(Property::Path(vec!["style".into(), "color".into()])));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerSpec {
    pub id: String,
    pub method: String,
    pub property: Option<Property>,
    pub view_func: Option<String>,
}

impl HandlerSpec {
    pub fn new(id: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            method: method.into(),
            property: None,
            view_func: None,
        }
    }

    pub fn property(mut self, property: impl Into<Property>) -> Self {
        self.property = Some(property.into());
        self
    }

    pub fn view_func(mut self, view_func: impl Into<String>) -> Self {
        self.view_func = Some(view_func.into());
        self
    }
}

impl From<(&str, &str)> for HandlerSpec {
    fn from((id, method): (&str, &str)) -> Self {
        HandlerSpec::new(id, method)
    }
}

impl From<(&str, &str, &str)> for HandlerSpec {
    fn from((id, method, property): (&str, &str, &str)) -> Self {
        HandlerSpec::new(id, method).property(property)
    }
}

/// The external view layer.
///
/// `update` patches the element `id` using `method`. Returning
/// [`Delivery::TargetGone`] unbinds the binding that triggered the call.
///
/// Closures with the same shape implement the trait:
///
/// ```
/// # use livemodel::model::{Model, Value, events::{Delivery, Property}};
/// let mut model = Model::new();
/// model.link(|_id: &str, _method: &str, _prop: Option<&Property>, _view: Option<&str>, _value: &Value| {
///     Delivery::Delivered
/// });
/// ```
pub trait Adapter: Send {
    fn update(
        &mut self,
        id: &str,
        method: &str,
        property: Option<&Property>,
        view_func: Option<&str>,
        value: &Value,
    ) -> Delivery;
}

impl<F> Adapter for F
where
    F: FnMut(&str, &str, Option<&Property>, Option<&str>, &Value) -> Delivery + Send,
{
    fn update(
        &mut self,
        id: &str,
        method: &str,
        property: Option<&Property>,
        view_func: Option<&str>,
        value: &Value,
    ) -> Delivery {
        self(id, method, property, view_func, value)
    }
}

/// Which kind of mutation is being announced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Set,
    Push,
}

/// Identifies one binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(u64);

/// Lifecycle of a binding. `Unbound` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    Active,
    Unbound,
}

/// What a binding's pattern currently resolves to.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingView {
    pub real_path: PathBuf,
    pub dependencies: BTreeSet<PathBuf>,
    pub value: Option<Value>,
}

#[derive(Debug, Clone)]
struct Binding {
    id: BindingId,
    pattern: PathBuf,
    spec: HandlerSpec,
    state: BindingState,
    last_real_path: Option<PathBuf>,
    last_dependencies: BTreeSet<PathBuf>,
}

impl Binding {
    /// Whether a mutation of `mutated` can change what this binding shows,
    /// given its fresh resolution.
    fn is_affected(
        &self,
        mutated: &PathBuf,
        kind: MutationKind,
        real_path: &PathBuf,
        dependencies: &BTreeSet<PathBuf>,
    ) -> bool {
        let mut dependencies = dependencies.iter().chain(&self.last_dependencies);
        match kind {
            MutationKind::Set => {
                real_path.starts_with(mutated)
                    || self
                        .last_real_path
                        .as_ref()
                        .is_some_and(|last| last.starts_with(mutated))
                    || dependencies.any(|dependency| dependency.starts_with(mutated))
            }
            MutationKind::Push => {
                real_path == mutated || dependencies.any(|dependency| dependency == mutated)
            }
        }
    }
}

/// Path pattern → handler bindings.
#[derive(Debug, Default)]
pub struct EventDispatcher {
    bindings: BTreeMap<String, Vec<Binding>>,
    next_id: u64,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `spec` to `pattern`. A pattern may carry any number of bindings.
    pub fn bind(&mut self, pattern: impl Into<PathBuf>, spec: impl Into<HandlerSpec>) -> BindingId {
        let pattern = pattern.into();
        let spec = spec.into();
        let id = BindingId(self.next_id);
        self.next_id += 1;

        debug!(pattern = %pattern, id = %spec.id, method = %spec.method, "binding");
        self.bindings
            .entry(pattern.to_string())
            .or_default()
            .push(Binding {
                id,
                pattern,
                spec,
                state: BindingState::Active,
                last_real_path: None,
                last_dependencies: BTreeSet::new(),
            });
        id
    }

    /// Removes one binding. Returns whether it existed.
    pub fn unbind(&mut self, id: BindingId) -> bool {
        let mut removed = false;
        self.bindings.retain(|_, list| {
            let before = list.len();
            list.retain(|b| b.id != id);
            removed |= list.len() != before;
            !list.is_empty()
        });
        removed
    }

    /// Removes every binding on `pattern`, returning how many there were.
    pub fn unbind_path(&mut self, pattern: impl Into<PathBuf>) -> usize {
        self.bindings
            .remove(&pattern.into().to_string())
            .map_or(0, |list| list.len())
    }

    /// Number of active bindings on `pattern`.
    pub fn bindings_for(&self, pattern: impl Into<PathBuf>) -> usize {
        self.bindings
            .get(&pattern.into().to_string())
            .map_or(0, |list| {
                list.iter()
                    .filter(|b| b.state == BindingState::Active)
                    .count()
            })
    }

    /// Patterns that currently carry at least one binding.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    /// Total number of active bindings.
    pub fn len(&self) -> usize {
        self.bindings
            .values()
            .flatten()
            .filter(|b| b.state == BindingState::Active)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Announces a mutation of `mutated` and drives the adapter.
    ///
    /// `resolve` re-resolves a binding pattern against the already mutated
    /// tree. A binding whose pattern fails to resolve is skipped for this
    /// notification only. `pushed` is the appended value for
    /// [`MutationKind::Push`] and the written value for [`MutationKind::Set`].
    ///
    /// Returns the number of adapter calls made.
    pub fn notify<R>(
        &mut self,
        mutated: &PathBuf,
        kind: MutationKind,
        pushed: &Value,
        mut resolve: R,
        adapter: &mut dyn Adapter,
    ) -> usize
    where
        R: FnMut(&PathBuf) -> Result<BindingView, ModelError>,
    {
        let mut calls = 0;

        for binding in self.bindings.values_mut().flatten() {
            if binding.state != BindingState::Active {
                continue;
            }

            let view = match resolve(&binding.pattern) {
                Ok(view) => view,
                Err(err) => {
                    warn!(pattern = %binding.pattern, error = %err, "skipping binding that failed to resolve");
                    continue;
                }
            };

            let BindingView {
                real_path,
                dependencies,
                value,
            } = view;
            let exact = real_path == *mutated;
            let affected = binding.is_affected(mutated, kind, &real_path, &dependencies);
            binding.last_real_path = Some(real_path.clone());
            binding.last_dependencies = dependencies;
            if !affected {
                continue;
            }

            let spec = &binding.spec;
            let delivery = if exact && kind == MutationKind::Push {
                trace!(pattern = %binding.pattern, id = %spec.id, "delivering push");
                adapter.update(&spec.id, APPEND_HTML, None, spec.view_func.as_deref(), pushed)
            } else {
                let current = value.unwrap_or_default();
                trace!(pattern = %binding.pattern, id = %spec.id, real_path = %real_path, "delivering update");
                adapter.update(
                    &spec.id,
                    &spec.method,
                    spec.property.as_ref(),
                    spec.view_func.as_deref(),
                    &current,
                )
            };
            calls += 1;

            if delivery == Delivery::TargetGone {
                debug!(pattern = %binding.pattern, id = %spec.id, "view target gone, unbinding");
                binding.state = BindingState::Unbound;
            }
        }

        self.prune();
        calls
    }

    /// Records the current real path and dependencies of every binding
    /// without delivering.
    ///
    /// Notifications compare against what is recorded here as well as the
    /// current resolution, so a binding still fires for a path it only used
    /// to go through.
    pub fn refresh<R>(&mut self, mut resolve: R)
    where
        R: FnMut(&PathBuf) -> Result<BindingView, ModelError>,
    {
        for binding in self.bindings.values_mut().flatten() {
            if let Ok(view) = resolve(&binding.pattern) {
                binding.last_real_path = Some(view.real_path);
                binding.last_dependencies = view.dependencies;
            }
        }
    }

    fn prune(&mut self) {
        self.bindings.retain(|_, list| {
            list.retain(|b| b.state == BindingState::Active);
            !list.is_empty()
        });
    }
}
