//! Path resolution over a document tree.
//!
//! The [`Resolver`] walks parsed paths segment by segment. Whenever it meets a
//! [`Reference`] marker it substitutes the reference's target (plus the current
//! value of its key path, if any) for the consumed prefix and starts over from
//! the root with the unconsumed segments appended. The result is the *real*
//! path: the marker-free location the original path addresses.
//!
//! Cycles are tracked with a [`Trail`] of reference locations that are in
//! progress. A location is on the trail while its target and key are being
//! resolved, and again while its value is being copied into a snapshot.
//! Meeting a location that is already on the trail is a
//! [`ModelError::ReferenceCycle`]. Once a marker has been substituted its
//! location leaves the trail, so a finite chain may pass the same alias more
//! than once. A walk that comes back to a path it already restarted from
//! is a cycle as well.
//!
//! Reads of [`FunctionMarker`] leaves are delegated to the
//! [`FunctionRegistry`], with a stack of active function names guarding
//! against functions that read themselves.

use std::{
    cell::RefCell,
    collections::{BTreeMap, BTreeSet},
};

use tracing::trace;

use super::{
    ModelError,
    functions::FunctionRegistry,
    path::{PathBuf, Segment},
    value::{FunctionMarker, Reference, Value},
};

/// Whether a marker sitting at the final segment is followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Follow {
    /// Follow references through to the node they alias. Used for reads.
    All,
    /// Stop at the final segment even if it holds a marker. Used for writes,
    /// which replace whatever is stored there.
    ExceptLast,
}

/// What the real path of a [`Resolution`] points at.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A node exists at the real path.
    Found,
    /// Some container on the way does not exist.
    Absent,
    /// The walk reached a function marker at the real path while segments
    /// remained. Those segments address the computed value.
    Computed { name: String, rest: Vec<Segment> },
}

/// The result of resolving one path.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub real_path: PathBuf,
    pub outcome: Outcome,
    /// Paths whose mutation can change what this resolution yields: locations
    /// of the references passed through, their targets and their key paths.
    pub dependencies: BTreeSet<PathBuf>,
}

impl Resolution {
    pub fn is_found(&self) -> bool {
        matches!(self.outcome, Outcome::Found)
    }
}

/// Reference locations currently in progress.
#[derive(Debug, Default)]
struct Trail {
    /// Markers whose target and key are being resolved.
    following: Vec<PathBuf>,
    /// Markers whose value is being copied into a snapshot.
    expanding: Vec<PathBuf>,
}

fn cycle_at(location: &PathBuf) -> ModelError {
    ModelError::ReferenceCycle {
        path: location.to_string(),
    }
}

/// Read-only resolver over one document tree.
///
/// Resolvers are cheap and built per operation; the function-evaluation stack
/// they carry only lives as long as that operation.
pub struct Resolver<'a> {
    root: &'a Value,
    functions: &'a FunctionRegistry,
    evaluating: RefCell<Vec<String>>,
}

impl<'a> Resolver<'a> {
    pub fn new(root: &'a Value, functions: &'a FunctionRegistry) -> Self {
        Self {
            root,
            functions,
            evaluating: RefCell::new(Vec::new()),
        }
    }

    pub fn functions(&self) -> &'a FunctionRegistry {
        self.functions
    }

    /// Resolves `path` to its real path.
    pub fn resolve(&self, path: &PathBuf, follow: Follow) -> Result<Resolution, ModelError> {
        self.resolve_with(path.segments().to_vec(), follow, &mut Trail::default())
    }

    /// Reads the value at `path`.
    ///
    /// Returns `Ok(None)` when an intermediate container is missing. Containers
    /// come back as snapshots with every nested marker resolved.
    pub fn read(&self, path: &PathBuf) -> Result<Option<Value>, ModelError> {
        self.read_with(path.segments().to_vec(), &mut Trail::default())
    }

    /// Returns the stored node at a real path without following anything.
    pub fn node_at(&self, real_path: &PathBuf) -> Option<&'a Value> {
        let mut node = self.root;
        for segment in real_path.segments() {
            node = child(node, segment)?;
        }
        Some(node)
    }

    fn resolve_with(
        &self,
        mut segments: Vec<Segment>,
        follow: Follow,
        trail: &mut Trail,
    ) -> Result<Resolution, ModelError> {
        let mut dependencies = BTreeSet::new();
        let mut restarts = BTreeSet::from([segments.clone()]);

        'walk: loop {
            let mut node = self.root;
            for i in 0..segments.len() {
                let next = match step(node, &segments[..i], &segments[i])? {
                    Some(next) => next,
                    None => {
                        return Ok(Resolution {
                            real_path: PathBuf::from_segments(segments),
                            outcome: Outcome::Absent,
                            dependencies,
                        });
                    }
                };
                let is_last = i + 1 == segments.len();

                match next {
                    Value::Ref(reference) if !(is_last && follow == Follow::ExceptLast) => {
                        let location = PathBuf::from_segments(segments[..=i].to_vec());
                        if trail.following.contains(&location) {
                            return Err(cycle_at(&location));
                        }
                        trail.following.push(location.clone());
                        let prefix = self.follow_reference(reference, trail, &mut dependencies);
                        trail.following.pop();
                        let prefix = prefix?;
                        trace!(from = %location, to = %prefix, "following reference");

                        let mut substituted = prefix.into_segments();
                        substituted.extend_from_slice(&segments[i + 1..]);
                        if !restarts.insert(substituted.clone()) {
                            return Err(cycle_at(&location));
                        }
                        dependencies.insert(location);
                        segments = substituted;
                        continue 'walk;
                    }
                    Value::Func(marker) if !is_last => {
                        return Ok(Resolution {
                            real_path: PathBuf::from_segments(segments[..=i].to_vec()),
                            outcome: Outcome::Computed {
                                name: marker.name().to_string(),
                                rest: segments[i + 1..].to_vec(),
                            },
                            dependencies,
                        });
                    }
                    _ => node = next,
                }
            }

            return Ok(Resolution {
                real_path: PathBuf::from_segments(segments),
                outcome: Outcome::Found,
                dependencies,
            });
        }
    }

    /// Computes the real path a reference stands for: the resolved target,
    /// extended by the current value of the key path when there is one.
    fn follow_reference(
        &self,
        reference: &Reference,
        trail: &mut Trail,
        dependencies: &mut BTreeSet<PathBuf>,
    ) -> Result<PathBuf, ModelError> {
        let target =
            self.resolve_with(reference.target().segments().to_vec(), Follow::All, trail)?;
        dependencies.extend(target.dependencies);
        dependencies.insert(target.real_path.clone());

        let mut prefix = target.real_path;
        if let Outcome::Computed { rest, .. } = target.outcome {
            prefix = prefix.join(&PathBuf::from_segments(rest));
        }

        let Some(key_path) = reference.key() else {
            return Ok(prefix);
        };

        let key = self.resolve_with(key_path.segments().to_vec(), Follow::All, trail)?;
        dependencies.extend(key.dependencies.iter().cloned());
        dependencies.insert(key.real_path.clone());

        let key_value = self.read_resolution(key, trail)?;
        let segment = key_value
            .as_ref()
            .and_then(Value::to_segment)
            .ok_or_else(|| ModelError::InvalidKey {
                path: key_path.to_string(),
                actual: key_value
                    .as_ref()
                    .map_or("nothing", Value::type_name)
                    .to_string(),
            })?;

        Ok(prefix.push(segment))
    }

    fn read_with(
        &self,
        segments: Vec<Segment>,
        trail: &mut Trail,
    ) -> Result<Option<Value>, ModelError> {
        let resolution = self.resolve_with(segments, Follow::All, trail)?;
        self.read_resolution(resolution, trail)
    }

    fn read_resolution(
        &self,
        resolution: Resolution,
        trail: &mut Trail,
    ) -> Result<Option<Value>, ModelError> {
        match resolution.outcome {
            Outcome::Absent => Ok(None),
            Outcome::Found => match self.node_at(&resolution.real_path) {
                Some(node) => self
                    .snapshot(node, &resolution.real_path, trail)
                    .map(Some),
                None => Ok(None),
            },
            Outcome::Computed { name, rest } => {
                let computed = self.evaluate(&FunctionMarker::new(name))?;
                select(computed, &resolution.real_path, &rest)
            }
        }
    }

    /// Copies `node` with every nested marker replaced by what it resolves to.
    fn snapshot(
        &self,
        node: &Value,
        at: &PathBuf,
        trail: &mut Trail,
    ) -> Result<Value, ModelError> {
        match node {
            Value::Object(map) => {
                let mut copy = BTreeMap::new();
                for (key, child) in map {
                    let child_path = at.clone().push(Segment::Key(key.clone()));
                    copy.insert(key.clone(), self.snapshot(child, &child_path, trail)?);
                }
                Ok(Value::Object(copy))
            }
            Value::Array(items) => {
                let mut copy = Vec::with_capacity(items.len());
                for (i, child) in items.iter().enumerate() {
                    copy.push(self.snapshot(child, &at.clone().push(i), trail)?);
                }
                Ok(Value::Array(copy))
            }
            Value::Ref(reference) => {
                // A snapshot that reaches the marker it is expanding is infinite
                if trail.expanding.contains(at) || trail.following.contains(at) {
                    return Err(cycle_at(at));
                }
                trail.expanding.push(at.clone());
                trail.following.push(at.clone());
                let prefix = self.follow_reference(reference, trail, &mut BTreeSet::new());
                trail.following.pop();
                let value = prefix.and_then(|prefix| self.read_with(prefix.into_segments(), trail));
                trail.expanding.pop();
                Ok(value?.unwrap_or(Value::Null))
            }
            Value::Func(marker) => self.evaluate(marker),
            scalar => Ok(scalar.clone()),
        }
    }

    /// Evaluates a function marker from the current values of its arguments.
    pub fn evaluate(&self, marker: &FunctionMarker) -> Result<Value, ModelError> {
        let name = marker.name();
        if self.evaluating.borrow().iter().any(|active| active == name) {
            return Err(ModelError::FunctionCycle {
                name: name.to_string(),
            });
        }

        self.evaluating.borrow_mut().push(name.to_string());
        let result = self.functions.evaluate(name, |arg| self.read(arg));
        self.evaluating.borrow_mut().pop();
        result
    }
}

/// Looks up one segment in a container. Scalars have no children.
pub(crate) fn child<'v>(node: &'v Value, segment: &Segment) -> Option<&'v Value> {
    match (node, segment) {
        (Value::Object(map), segment) => map.get(&segment.as_key()),
        (Value::Array(items), Segment::Index(i)) => items.get(*i),
        _ => None,
    }
}

/// One traversal step with the error rules for reads: scalars and
/// key-indexed arrays are fatal, missing children are absent.
fn step<'v>(
    node: &'v Value,
    consumed: &[Segment],
    segment: &Segment,
) -> Result<Option<&'v Value>, ModelError> {
    match (node, segment) {
        (Value::Object(map), segment) => Ok(map.get(&segment.as_key())),
        (Value::Array(items), Segment::Index(i)) => Ok(items.get(*i)),
        (Value::Array(_), Segment::Key(key)) => Err(ModelError::NonIndexSegment {
            path: PathBuf::from_segments(consumed.to_vec()).to_string(),
            segment: key.clone(),
        }),
        _ => Err(ModelError::ScalarTraversal {
            path: PathBuf::from_segments(consumed.to_vec()).to_string(),
            segment: segment.to_string(),
        }),
    }
}

/// Navigates into an already computed (marker-free) value.
fn select(value: Value, base: &PathBuf, rest: &[Segment]) -> Result<Option<Value>, ModelError> {
    let mut node = &value;
    let mut consumed = base.segments().to_vec();
    for segment in rest {
        match step(node, &consumed, segment)? {
            Some(next) => node = next,
            None => return Ok(None),
        }
        consumed.push(segment.clone());
    }
    Ok(Some(node.clone()))
}
