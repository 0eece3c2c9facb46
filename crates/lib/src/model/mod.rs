//! The path-addressed document model.
//!
//! A [`Model`] owns one document tree and exposes it through dotted paths.
//! Three things sit on top of plain storage:
//!
//! - **References** ([`Model::reference`], [`Model::reference_keyed`]) are live
//!   aliases. Reads and writes through them land on the aliased path.
//! - **Computed functions** ([`Model::func`], [`Model::make_func`]) derive a value
//!   from argument paths every time they are read.
//! - **Bindings** ([`Model::events_mut`]) connect paths to a view [`Adapter`]
//!   that is told about every relevant mutation.
//!
//! # Usage
//!
//! ```
//! use livemodel::model::{Model, Value};
//! # fn main() -> livemodel::Result<()> {
//! let mut model = Model::new();
//! model.init(Value::object([
//!     ("info", Value::object([(
//!         "users",
//!         Value::array([
//!             Value::object([("name", "user1")]),
//!             Value::object([("name", "ben")]),
//!         ]),
//!     )])),
//!     ("userIndex", 1.into()),
//!     ("user", model.reference_keyed("info.users", "userIndex").into()),
//! ]));
//!
//! assert_eq!(model.get("user.name")?, Some(Value::from("ben")));
//!
//! model.set("userIndex", 0)?;
//! assert_eq!(model.get("user.name")?, Some(Value::from("user1")));
//! # Ok(())
//! # }
//! ```

use std::{collections::BTreeMap, fmt};

use tracing::{debug, warn};

pub mod config;
pub mod errors;
pub mod events;
pub mod functions;
pub mod path;
pub mod resolve;
pub mod shared;
pub mod value;

pub use config::{Environment, ModelConfig};
pub use errors::ModelError;
pub use events::{
    Adapter, BindingId, BindingView, Delivery, EventDispatcher, HandlerSpec, MutationKind,
    Property,
};
pub use functions::FunctionRegistry;
pub use path::{PathBuf, Segment};
pub use resolve::{Follow, Outcome, Resolution, Resolver};
pub use shared::SharedModel;
pub use value::{FunctionMarker, Reference, Value};

use crate::Result;

/// A hierarchical in-memory document with references, computed values and
/// view bindings.
///
/// The model is single-owner and fully synchronous: every call, including
/// the adapter updates a mutation triggers, completes before it returns.
/// Use [`SharedModel`] to share one model between threads.
pub struct Model {
    config: ModelConfig,
    root: Value,
    functions: FunctionRegistry,
    events: EventDispatcher,
    adapter: Option<Box<dyn Adapter>>,
}

impl Model {
    /// Creates an empty model with the default configuration (browser).
    pub fn new() -> Self {
        Self::with_config(ModelConfig::default())
    }

    pub fn with_config(config: ModelConfig) -> Self {
        Self {
            config,
            root: Value::Object(BTreeMap::new()),
            functions: FunctionRegistry::new(),
            events: EventDispatcher::new(),
            adapter: None,
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn environment(&self) -> Environment {
        self.config.environment
    }

    /// Replaces the whole document.
    ///
    /// Reference and function markers inside `doc` become live. Bindings are
    /// not notified.
    pub fn init(&mut self, doc: impl Into<Value>) {
        self.root = doc.into();
        debug!(markers = self.root.contains_marker(), "model initialised");

        let resolver = Resolver::new(&self.root, &self.functions);
        self.events
            .refresh(|pattern| binding_view(&resolver, pattern));
    }

    /// Replaces the whole document with one parsed from JSON text.
    ///
    /// Tagged marker objects such as `{"$ref": {"target": "a.b"}}` become live
    /// markers. On a parse error the current document is left untouched.
    pub fn init_json(&mut self, json: &str) -> Result<()> {
        let doc: Value = serde_json::from_str(json).map_err(ModelError::from)?;
        self.init(doc);
        Ok(())
    }

    /// Reads the value at `path`; the empty path reads the whole document.
    ///
    /// Returns `Ok(None)` if a container on the way does not exist. Containers
    /// are returned as snapshots in which references are resolved and
    /// computed values evaluated.
    pub fn get(&self, path: impl Into<PathBuf>) -> Result<Option<Value>> {
        Ok(self.resolver().read(&path.into())?)
    }

    /// Reads the value at `path` and converts it.
    ///
    /// Returns `Ok(None)` when there is no value or it has a different type.
    pub fn get_as<T>(&self, path: impl Into<PathBuf>) -> Result<Option<T>>
    where
        T: for<'a> TryFrom<&'a Value, Error = ModelError>,
    {
        Ok(self
            .get(path)?
            .and_then(|value| T::try_from(&value).ok()))
    }

    /// Resolves `path` to the real path it addresses, following references.
    pub fn resolve(&self, path: impl Into<PathBuf>) -> Result<Resolution> {
        Ok(self.resolver().resolve(&path.into(), Follow::All)?)
    }

    /// Writes `value` at `path` and notifies bindings.
    ///
    /// Missing intermediate objects are created. A marker stored exactly at
    /// `path` is replaced, not written through; writes to paths *below* a
    /// reference land on the referenced object.
    pub fn set(&mut self, path: impl Into<PathBuf>, value: impl Into<Value>) -> Result<()> {
        let path = path.into();
        let value = value.into();

        let resolution = self.resolver().resolve(&path, Follow::ExceptLast)?;
        if let Outcome::Computed { .. } = resolution.outcome {
            return Err(ModelError::WriteThroughFunction {
                path: resolution.real_path.to_string(),
            }
            .into());
        }

        let real_path = resolution.real_path;
        write_at(&mut self.root, &real_path, value.clone())?;
        debug!(path = %path, real_path = %real_path, "set");

        self.notify(&real_path, MutationKind::Set, &value);
        Ok(())
    }

    /// Appends `value` to the array at `path` and notifies bindings.
    ///
    /// A missing array is created with `value` as its only element.
    pub fn push(&mut self, path: impl Into<PathBuf>, value: impl Into<Value>) -> Result<()> {
        let path = path.into();
        let value = value.into();

        let resolution = self.resolver().resolve(&path, Follow::All)?;
        let real_path = resolution.real_path;
        let index = match resolution.outcome {
            Outcome::Computed { .. } => {
                return Err(ModelError::WriteThroughFunction {
                    path: real_path.to_string(),
                }
                .into());
            }
            Outcome::Absent => {
                write_at(&mut self.root, &real_path, Value::Array(vec![value.clone()]))?;
                0
            }
            Outcome::Found => match node_at_mut(&mut self.root, &real_path) {
                Some(Value::Array(items)) => {
                    items.push(value.clone());
                    items.len() - 1
                }
                Some(Value::Func(_)) => {
                    return Err(ModelError::WriteThroughFunction {
                        path: real_path.to_string(),
                    }
                    .into());
                }
                other => {
                    return Err(ModelError::NotAnArray {
                        path: real_path.to_string(),
                        actual: other.map_or("nothing", |v| v.type_name()).to_string(),
                    }
                    .into());
                }
            },
        };
        debug!(path = %path, real_path = %real_path, index, "push");

        let element = real_path.clone().push(index);
        let pushed = match self.resolver().read(&element) {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => value,
            Err(err) => {
                warn!(path = %element, error = %err, "pushed value does not resolve");
                value
            }
        };
        self.notify(&real_path, MutationKind::Push, &pushed);
        Ok(())
    }

    /// Returns a reference marker aliasing `target`, for embedding in a document.
    pub fn reference(&self, target: impl Into<PathBuf>) -> Reference {
        Reference::new(target)
    }

    /// Returns a reference marker aliasing `target.<value at key>`.
    ///
    /// The key is re-read on every access, so the alias follows it.
    pub fn reference_keyed(&self, target: impl Into<PathBuf>, key: impl Into<PathBuf>) -> Reference {
        Reference::keyed(target, key)
    }

    /// Returns a function marker for embedding in a document.
    pub fn func(&self, name: impl Into<String>) -> FunctionMarker {
        FunctionMarker::new(name)
    }

    /// Registers the computed function `name` over the given argument paths.
    ///
    /// The function receives the arguments' current values in declared order;
    /// absent arguments are [`Value::Null`].
    pub fn make_func<P, F>(&mut self, name: impl Into<String>, args: impl IntoIterator<Item = P>, compute: F)
    where
        P: Into<PathBuf>,
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        self.functions
            .register(name, args.into_iter().map(Into::into).collect(), compute);
    }

    /// Installs the view adapter. Ignored on the server.
    pub fn link(&mut self, adapter: impl Adapter + 'static) {
        if !self.config.environment.delivers_updates() {
            debug!(environment = %self.config.environment, "adapter not linked");
            return;
        }
        self.adapter = Some(Box::new(adapter));
    }

    /// Removes the view adapter, returning it.
    pub fn unlink(&mut self) -> Option<Box<dyn Adapter>> {
        self.adapter.take()
    }

    pub fn is_linked(&self) -> bool {
        self.adapter.is_some()
    }

    pub fn events(&self) -> &EventDispatcher {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventDispatcher {
        &mut self.events
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    /// Serializes a resolved snapshot of the whole document.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(self.get(PathBuf::root())?.unwrap_or_default().to_json())
    }

    fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.root, &self.functions)
    }

    fn notify(&mut self, real_path: &PathBuf, kind: MutationKind, value: &Value) {
        if !self.config.environment.delivers_updates() {
            return;
        }
        let Some(adapter) = self.adapter.as_deref_mut() else {
            return;
        };

        let resolver = Resolver::new(&self.root, &self.functions);
        let calls = self.events.notify(
            real_path,
            kind,
            value,
            |pattern| binding_view(&resolver, pattern),
            adapter,
        );
        if calls > 0 {
            debug!(real_path = %real_path, ?kind, calls, "notified bindings");
        }
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("config", &self.config)
            .field("root", &self.root)
            .field("functions", &self.functions)
            .field("events", &self.events)
            .field("linked", &self.adapter.is_some())
            .finish()
    }
}

/// Resolves a binding pattern into its real path, value and dependencies.
///
/// Computed leaves add their argument paths (and whatever those go through)
/// to the dependencies.
fn binding_view(resolver: &Resolver<'_>, pattern: &PathBuf) -> std::result::Result<BindingView, ModelError> {
    let resolution = resolver.resolve(pattern, Follow::All)?;
    let mut dependencies = resolution.dependencies;

    let computed = match &resolution.outcome {
        Outcome::Computed { name, .. } => Some(name.as_str()),
        Outcome::Found => match resolver.node_at(&resolution.real_path) {
            Some(Value::Func(marker)) => Some(marker.name()),
            _ => None,
        },
        Outcome::Absent => None,
    };
    if let Some(function) = computed.and_then(|name| resolver.functions().get(name)) {
        for arg in function.args() {
            let arg = resolver.resolve(arg, Follow::All)?;
            dependencies.extend(arg.dependencies);
            dependencies.insert(arg.real_path);
        }
    }

    let value = resolver.read(pattern)?;
    Ok(BindingView {
        real_path: resolution.real_path,
        dependencies,
        value,
    })
}

/// Mutable lookup along a real (marker-free) path.
fn node_at_mut<'v>(root: &'v mut Value, real_path: &PathBuf) -> Option<&'v mut Value> {
    let mut node = root;
    for segment in real_path.segments() {
        node = match (node, segment) {
            (Value::Object(map), segment) => map.get_mut(&segment.as_key())?,
            (Value::Array(items), Segment::Index(i)) => items.get_mut(*i)?,
            _ => return None,
        };
    }
    Some(node)
}

/// Stores `value` at a real path, creating missing intermediate objects.
fn write_at(root: &mut Value, real_path: &PathBuf, value: Value) -> std::result::Result<(), ModelError> {
    let segments = real_path.segments();
    let Some((last, parents)) = segments.split_last() else {
        *root = value;
        return Ok(());
    };

    let mut node = root;
    for (i, segment) in parents.iter().enumerate() {
        node = child_for_write(node, &segments[..i], segment)?;
    }

    let parent_path = || PathBuf::from_segments(parents.to_vec()).to_string();
    match (node, last) {
        (Value::Object(map), segment) => {
            map.insert(segment.as_key(), value);
            Ok(())
        }
        (Value::Array(items), Segment::Index(i)) => {
            let len = items.len();
            match *i {
                i if i < len => items[i] = value,
                i if i == len => items.push(value),
                index => {
                    return Err(ModelError::IndexOutOfBounds {
                        path: parent_path(),
                        index,
                        len,
                    });
                }
            }
            Ok(())
        }
        (Value::Array(_), Segment::Key(key)) => Err(ModelError::NonIndexSegment {
            path: parent_path(),
            segment: key.clone(),
        }),
        (Value::Func(_), _) => Err(ModelError::WriteThroughFunction {
            path: parent_path(),
        }),
        (_, segment) => Err(ModelError::ScalarTraversal {
            path: parent_path(),
            segment: segment.to_string(),
        }),
    }
}

/// Steps into (or creates) the child container a write passes through.
fn child_for_write<'v>(
    node: &'v mut Value,
    consumed: &[Segment],
    segment: &Segment,
) -> std::result::Result<&'v mut Value, ModelError> {
    let path = || PathBuf::from_segments(consumed.to_vec()).to_string();
    match node {
        Value::Object(map) => Ok(map
            .entry(segment.as_key())
            .or_insert_with(|| Value::Object(BTreeMap::new()))),
        Value::Array(items) => {
            let Segment::Index(index) = *segment else {
                return Err(ModelError::NonIndexSegment {
                    path: path(),
                    segment: segment.to_string(),
                });
            };
            let len = items.len();
            if index == len {
                items.push(Value::Object(BTreeMap::new()));
            }
            items
                .get_mut(index)
                .ok_or_else(|| ModelError::IndexOutOfBounds {
                    path: path(),
                    index,
                    len,
                })
        }
        Value::Func(_) => Err(ModelError::WriteThroughFunction { path: path() }),
        _ => Err(ModelError::ScalarTraversal {
            path: path(),
            segment: segment.to_string(),
        }),
    }
}
