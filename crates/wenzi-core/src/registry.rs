//! Resolution of stored `module` + `class_name` pairs to known classes.
//!
//! Model metadata names classes by path so a saved directory can be rebuilt
//! without knowing its type up front. Each family keeps a static table of
//! the classes it can rebuild.

use crate::error::{Result, WenziError};

/// A registered class: module path, class name, and the value it maps to.
pub type ClassEntry<T> = (&'static str, &'static str, T);

/// Look `module.class_name` up in `table`.
pub fn locate<T: Copy>(module: &str, class_name: &str, table: &[ClassEntry<T>]) -> Result<T> {
    if let Some((_, _, value)) = table
        .iter()
        .find(|(m, c, _)| *m == module && *c == class_name)
    {
        return Ok(*value);
    }

    let path = format!("{module}.{class_name}");
    let suggestion = table
        .iter()
        .map(|(m, c, _)| format!("{m}.{c}"))
        .map(|candidate| (strsim::jaro_winkler(&path, &candidate), candidate))
        .filter(|(score, _)| *score > 0.85)
        .max_by(|(a, _), (b, _)| a.total_cmp(b))
        .map(|(_, candidate)| candidate);

    Err(WenziError::UnknownClass { path, suggestion })
}
