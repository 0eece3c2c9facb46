//! Registry of named computed values.
//!
//! A function is registered with an ordered list of argument paths. Reading a
//! [`FunctionMarker`](super::FunctionMarker) leaf reads every argument path's
//! current value and calls the function with them, in declared order. Nothing
//! is cached, so a computed value can never go stale.

use std::{collections::HashMap, fmt, sync::Arc};

use tracing::trace;

use super::{ModelError, Value, path::PathBuf};

/// The callable behind a computed value.
pub type ComputeFn = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;

/// A registered function: its argument paths and the callable.
#[derive(Clone)]
pub struct Function {
    args: Vec<PathBuf>,
    compute: ComputeFn,
}

impl Function {
    pub fn args(&self) -> &[PathBuf] {
        &self.args
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

/// Named computed values, evaluated on demand.
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Function>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `compute` under `name`, replacing any previous definition.
    pub fn register<F>(&mut self, name: impl Into<String>, args: Vec<PathBuf>, compute: F)
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        let name = name.into();
        trace!(name = %name, arg_count = args.len(), "registering function");
        self.functions.insert(
            name,
            Function {
                args,
                compute: Arc::new(compute),
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Evaluates `name`, reading each argument through `read`.
    ///
    /// Absent arguments are passed as [`Value::Null`]. Errors from reading an
    /// argument abort the evaluation.
    pub fn evaluate<R>(&self, name: &str, mut read: R) -> Result<Value, ModelError>
    where
        R: FnMut(&PathBuf) -> Result<Option<Value>, ModelError>,
    {
        let function = self
            .functions
            .get(name)
            .ok_or_else(|| ModelError::UnknownFunction {
                name: name.to_string(),
            })?;

        let args = function
            .args
            .iter()
            .map(|path| read(path).map(Option::unwrap_or_default))
            .collect::<Result<Vec<_>, _>>()?;

        Ok((function.compute)(&args))
    }
}
