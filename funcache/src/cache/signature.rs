//! Call signature derivation
//!
//! A signature pairs the identity of a cached function with a canonical JSON
//! rendering of its arguments. Object keys are sorted recursively before
//! rendering, so two argument sets that differ only in map ordering produce
//! the same signature and the same SHA-256 argument hash. Argument sets with
//! different JSON forms never share a signature.

use crate::cache::canonical::{canonical, Shape};
use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt;

/// Qualified identity of a cached function
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionIdentity {
    /// Module path the function lives in
    pub namespace: String,

    /// Function name
    pub name: String,
}

impl FunctionIdentity {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Namespace as a single path segment (`a::b` becomes `a.b`)
    pub fn namespace_dir(&self) -> String {
        self.namespace.replace("::", ".")
    }
}

impl fmt::Display for FunctionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.namespace, self.name)
    }
}

/// Build a [`FunctionIdentity`] for a function in the calling module.
///
/// ```
/// let id = funcache::function_identity!(sum_lines);
/// assert_eq!(id.name, "sum_lines");
/// assert_eq!(id.namespace, module_path!());
/// ```
#[macro_export]
macro_rules! function_identity {
    ($name:ident) => {
        $crate::FunctionIdentity::new(module_path!(), stringify!($name))
    };
    ($name:expr) => {
        $crate::FunctionIdentity::new(module_path!(), $name)
    };
}

/// Deterministic identifier of one call: function plus arguments
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallSignature {
    /// The function being called
    pub function: FunctionIdentity,

    /// Canonical JSON text of `[positional, keyword]`
    pub canonical_args: String,

    /// SHA-256 hex digest of `canonical_args`
    pub args_hash: String,
}

impl fmt::Display for CallSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.function, &self.args_hash[..12.min(self.args_hash.len())])
    }
}

/// Derives [`CallSignature`]s from call arguments
pub struct SignatureBuilder;

impl SignatureBuilder {
    /// Build a signature from explicit positional and keyword arguments.
    ///
    /// `positional` should serialize to a sequence; any other value is taken as
    /// a single positional argument. `keyword` must serialize to a map (or to
    /// nothing, e.g. `()`).
    pub fn build<P, K>(function: &FunctionIdentity, positional: &P, keyword: &K) -> Result<CallSignature>
    where
        P: Serialize + ?Sized,
        K: Serialize + ?Sized,
    {
        let positional = match canonical(positional)?.1 {
            Value::Null => Value::Array(Vec::new()),
            Value::Array(items) => Value::Array(items),
            other => Value::Array(vec![other]),
        };
        let keyword = match canonical(keyword)?.1 {
            Value::Null => Value::Object(Map::new()),
            Value::Object(map) => Value::Object(map),
            other => {
                return Err(CacheError::UnserializableArguments(format!(
                    "keyword arguments must serialize to a map, got {}",
                    value_kind(&other)
                )))
            }
        };

        Self::from_parts(function, positional, keyword)
    }

    /// Build a signature from a single argument value, split the way a call is.
    ///
    /// A tuple supplies positional arguments and a struct with named fields
    /// supplies keyword arguments. `()` means no arguments. Any other value,
    /// including vecs, maps and options, is one positional argument.
    pub fn from_args<A>(function: &FunctionIdentity, args: &A) -> Result<CallSignature>
    where
        A: Serialize + ?Sized,
    {
        let (positional, keyword) = match canonical(args)? {
            (Shape::Unit, _) => (Vec::new(), Map::new()),
            (Shape::Tuple, Value::Array(items)) => (items, Map::new()),
            (Shape::Struct, Value::Object(map)) => (Vec::new(), map),
            (_, other) => (vec![other], Map::new()),
        };

        Self::from_parts(function, Value::Array(positional), Value::Object(keyword))
    }

    fn from_parts(function: &FunctionIdentity, positional: Value, keyword: Value) -> Result<CallSignature> {
        let canonical_args = serde_json::to_string(&Value::Array(vec![positional, keyword]))
            .map_err(|e| CacheError::UnserializableArguments(e.to_string()))?;
        let args_hash = hex::encode(Sha256::digest(canonical_args.as_bytes()));

        Ok(CallSignature {
            function: function.clone(),
            canonical_args,
            args_hash,
        })
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "map",
    }
}
