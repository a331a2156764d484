//! Immutable application of structural operations.
//!
//! The engine never mutates its input: every level walked is copied, and
//! the result is a new document value. Intermediate containers are created
//! on demand; operation semantics apply to the leaf only.

use crate::{ArborError, ArborResult, Op, Path, Seg};
use serde_json::{Map, Value};

/// Read the value at a path.
///
/// Walks segments from the document root. A non-array segment descends into
/// the named property; an array segment descends into the named property
/// and indexes into it. Returns `None` as soon as any step is absent, the
/// property is not an array where an index is required, or the index is out
/// of bounds.
pub fn get_at_path<'a>(doc: &'a Value, path: &Path) -> Option<&'a Value> {
    let mut current = doc;
    for seg in path.iter() {
        current = current.as_object()?.get(&seg.key)?;
        if let Some(index) = seg.index {
            current = current.as_array()?.get(index)?;
        }
    }
    Some(current)
}

/// Apply a structural operation, producing a new document.
///
/// The input document is left untouched. Missing intermediate objects are
/// created empty; missing or too-short intermediate arrays are padded with
/// empty-object placeholders up to the needed index.
///
/// # Examples
///
/// ```
/// use arbor_state::{apply_op, Op, Path};
/// use serde_json::json;
///
/// let doc = json!({});
/// let out = apply_op(&doc, &Op::append(Path::parse("/a/b"), json!("x"))).unwrap();
/// assert_eq!(out, json!({"a": {"b": ["x"]}}));
/// ```
pub fn apply_op(doc: &Value, op: &Op) -> ArborResult<Value> {
    let segments = op.path().segments();
    if segments.is_empty() {
        return Ok(apply_root(doc, op));
    }
    write_segments(doc, segments, op)
}

/// Root-path writes replace or clear the whole document.
fn apply_root(doc: &Value, op: &Op) -> Value {
    match op {
        Op::Merge { value, .. } => match (doc.as_object(), value.as_object()) {
            (Some(current), Some(incoming)) => {
                let mut merged = current.clone();
                for (k, v) in incoming {
                    merged.insert(k.clone(), v.clone());
                }
                Value::Object(merged)
            }
            _ => value.clone(),
        },
        Op::Delete { .. } => Value::Object(Map::new()),
        Op::Replace { value, .. } | Op::Append { value, .. } => value.clone(),
    }
}

fn write_segments(node: &Value, segments: &[Seg], op: &Op) -> ArborResult<Value> {
    let (head, rest) = segments
        .split_first()
        .expect("write_segments requires at least one segment");

    // Descending always happens through an object copy; a scalar or array in
    // an intermediate position is replaced by a fresh object.
    let mut map = node.as_object().cloned().unwrap_or_default();

    match head.index {
        None => {
            if rest.is_empty() {
                match op {
                    Op::Delete { .. } => {
                        map.remove(&head.key);
                    }
                    _ => {
                        let updated = apply_leaf(map.get(&head.key), op)?;
                        map.insert(head.key.clone(), updated);
                    }
                }
            } else {
                let child = map
                    .get(&head.key)
                    .cloned()
                    .unwrap_or_else(|| Value::Object(Map::new()));
                map.insert(head.key.clone(), write_segments(&child, rest, op)?);
            }
        }
        Some(index) => {
            let mut array = map
                .get(&head.key)
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();

            if rest.is_empty() {
                match op {
                    Op::Delete { .. } => {
                        if index >= array.len() {
                            return Err(ArborError::index_out_of_bounds(
                                op.path().clone(),
                                index,
                                array.len(),
                            ));
                        }
                        array.remove(index);
                    }
                    _ => {
                        if index < array.len() {
                            array[index] = apply_leaf(Some(&array[index]), op)?;
                        } else {
                            pad_with_placeholders(&mut array, index);
                            array.push(apply_leaf(None, op)?);
                        }
                    }
                }
            } else {
                if index >= array.len() {
                    pad_with_placeholders(&mut array, index);
                    array.push(Value::Object(Map::new()));
                }
                let child = array[index].clone();
                array[index] = write_segments(&child, rest, op)?;
            }

            map.insert(head.key.clone(), Value::Array(array));
        }
    }

    Ok(Value::Object(map))
}

/// Apply operation semantics to the addressed leaf value.
fn apply_leaf(existing: Option<&Value>, op: &Op) -> ArborResult<Value> {
    match op {
        Op::Replace { value, .. } => Ok(value.clone()),
        Op::Merge { value, .. } => match (existing.and_then(Value::as_object), value.as_object()) {
            (Some(current), Some(incoming)) => {
                let mut merged = current.clone();
                for (k, v) in incoming {
                    merged.insert(k.clone(), v.clone());
                }
                Ok(Value::Object(merged))
            }
            _ => Ok(value.clone()),
        },
        Op::Append { value, .. } => match existing {
            None => Ok(Value::Array(vec![value.clone()])),
            Some(Value::Array(items)) => {
                let mut items = items.clone();
                items.push(value.clone());
                Ok(Value::Array(items))
            }
            Some(_) => Err(ArborError::append_requires_array(op.path().clone())),
        },
        Op::Delete { .. } => Err(ArborError::invalid_operation(
            "delete has no leaf value semantics",
        )),
    }
}

fn pad_with_placeholders(array: &mut Vec<Value>, index: usize) {
    while array.len() < index {
        array.push(Value::Object(Map::new()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;
    use serde_json::json;

    #[test]
    fn test_get_at_path_walks_keys_and_indices() {
        let doc = json!({"users": [{"name": "Alice"}, {"name": "Bob"}]});
        assert_eq!(
            get_at_path(&doc, &path!("users[1]", "name")),
            Some(&json!("Bob"))
        );
    }

    #[test]
    fn test_get_at_path_absent_short_circuits() {
        let doc = json!({"a": {"b": 1}});
        assert_eq!(get_at_path(&doc, &path!("a", "x", "y")), None);
        assert_eq!(get_at_path(&doc, &path!("a[0]")), None);
        assert_eq!(get_at_path(&doc, &path!("a", "b", "c")), None);
    }

    #[test]
    fn test_get_at_path_index_out_of_bounds() {
        let doc = json!({"items": [1, 2]});
        assert_eq!(get_at_path(&doc, &path!("items[2]")), None);
    }

    #[test]
    fn test_get_at_path_root() {
        let doc = json!({"a": 1});
        assert_eq!(get_at_path(&doc, &Path::root()), Some(&doc));
    }

    #[test]
    fn test_replace_creates_intermediates() {
        let doc = json!({});
        let out = apply_op(&doc, &Op::replace(path!("a", "b", "c"), json!(42))).unwrap();
        assert_eq!(out, json!({"a": {"b": {"c": 42}}}));
    }

    #[test]
    fn test_replace_pads_arrays() {
        let doc = json!({});
        let out = apply_op(&doc, &Op::replace(path!("a", "b[2]"), json!("x"))).unwrap();
        assert_eq!(out, json!({"a": {"b": [{}, {}, "x"]}}));
    }

    #[test]
    fn test_replace_through_indexed_intermediate() {
        let doc = json!({"rows": [{"cell": 1}]});
        let out = apply_op(&doc, &Op::replace(path!("rows[1]", "cell"), json!(2))).unwrap();
        assert_eq!(out, json!({"rows": [{"cell": 1}, {"cell": 2}]}));
    }

    #[test]
    fn test_replace_never_mutates_input() {
        let doc = json!({"a": {"b": [1, 2]}});
        let before = doc.clone();
        let _ = apply_op(&doc, &Op::replace(path!("a", "b[0]"), json!(9))).unwrap();
        let _ = apply_op(&doc, &Op::delete(path!("a", "b[1]"))).unwrap();
        let _ = apply_op(&doc, &Op::append(path!("a", "b"), json!(3))).unwrap();
        assert_eq!(doc, before);
    }

    #[test]
    fn test_merge_shallow() {
        let doc = json!({"user": {"name": "Alice", "age": 30}});
        let out = apply_op(&doc, &Op::merge(path!("user"), json!({"email": "a@b.c"}))).unwrap();
        assert_eq!(
            out,
            json!({"user": {"name": "Alice", "age": 30, "email": "a@b.c"}})
        );
    }

    #[test]
    fn test_merge_non_object_replaces() {
        let doc = json!({"x": 1});
        let out = apply_op(&doc, &Op::merge(path!("x"), json!({"y": 2}))).unwrap();
        assert_eq!(out, json!({"x": {"y": 2}}));

        let out = apply_op(&doc, &Op::merge(path!("x"), json!(5))).unwrap();
        assert_eq!(out, json!({"x": 5}));
    }

    #[test]
    fn test_append_creates_array() {
        let doc = json!({});
        let out = apply_op(&doc, &Op::append(path!("a", "b"), json!("x"))).unwrap();
        assert_eq!(out, json!({"a": {"b": ["x"]}}));
    }

    #[test]
    fn test_append_pushes() {
        let doc = json!({"tags": ["a"]});
        let out = apply_op(&doc, &Op::append(path!("tags"), json!("b"))).unwrap();
        assert_eq!(out, json!({"tags": ["a", "b"]}));
    }

    #[test]
    fn test_append_to_non_array_fails() {
        let doc = json!({"x": 1});
        let err = apply_op(&doc, &Op::append(path!("x"), json!(2))).unwrap_err();
        assert!(matches!(err, ArborError::AppendRequiresArray { .. }));
    }

    #[test]
    fn test_delete_removes_key() {
        let doc = json!({"a": {"b": 1, "c": 2}});
        let out = apply_op(&doc, &Op::delete(path!("a", "b"))).unwrap();
        assert_eq!(out, json!({"a": {"c": 2}}));
    }

    #[test]
    fn test_delete_absent_key_is_noop() {
        let doc = json!({"a": {}});
        let out = apply_op(&doc, &Op::delete(path!("a", "missing"))).unwrap();
        assert_eq!(out, json!({"a": {}}));
    }

    #[test]
    fn test_delete_splices_index() {
        let doc = json!({"items": [1, 2, 3]});
        let out = apply_op(&doc, &Op::delete(path!("items[1]"))).unwrap();
        assert_eq!(out, json!({"items": [1, 3]}));
    }

    #[test]
    fn test_delete_out_of_bounds_fails() {
        let doc = json!({"items": [1]});
        let err = apply_op(&doc, &Op::delete(path!("items[4]"))).unwrap_err();
        assert!(matches!(
            err,
            ArborError::IndexOutOfBounds { index: 4, len: 1, .. }
        ));
    }

    #[test]
    fn test_root_replace() {
        let doc = json!({"a": 1});
        let out = apply_op(&doc, &Op::replace(Path::root(), json!({"b": 2}))).unwrap();
        assert_eq!(out, json!({"b": 2}));
    }

    #[test]
    fn test_root_merge_shallow() {
        let doc = json!({"a": 1, "b": 1});
        let out = apply_op(&doc, &Op::merge(Path::root(), json!({"b": 2, "c": 3}))).unwrap();
        assert_eq!(out, json!({"a": 1, "b": 2, "c": 3}));
    }

    #[test]
    fn test_root_merge_non_object_replaces() {
        let doc = json!({"a": 1});
        let out = apply_op(&doc, &Op::merge(Path::root(), json!([1, 2]))).unwrap();
        assert_eq!(out, json!([1, 2]));
    }

    #[test]
    fn test_root_delete_clears() {
        let doc = json!({"a": 1});
        let out = apply_op(&doc, &Op::delete(Path::root())).unwrap();
        assert_eq!(out, json!({}));
    }

    #[test]
    fn test_root_append_replaces_wholesale() {
        let doc = json!({"a": 1});
        let out = apply_op(&doc, &Op::append(Path::root(), json!("x"))).unwrap();
        assert_eq!(out, json!("x"));
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let doc = json!({});
        for expr in ["/a", "/a/b", "/list[0]", "/list[2]/deep", "/x/y[1]/z"] {
            let path = Path::parse(expr);
            let out = apply_op(&doc, &Op::replace(path.clone(), json!("v"))).unwrap();
            assert_eq!(get_at_path(&out, &path), Some(&json!("v")), "path {expr}");
        }
    }

    #[test]
    fn test_scalar_intermediate_is_replaced() {
        let doc = json!({"a": 5});
        let out = apply_op(&doc, &Op::replace(path!("a", "b"), json!(1))).unwrap();
        assert_eq!(out, json!({"a": {"b": 1}}));
    }
}
