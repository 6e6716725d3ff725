//! Array edits applied to a single field while resolving a copy.
//!
//! Indices follow the upstream data's JavaScript `splice` conventions:
//! negative starts count back from the end, and out-of-range values clamp.

use codex::copy::{Modification, ReplaceSelector};
use serde_json::Value;
use tracing::debug;

/// Apply one array operation. `replaceTxt` and unsupported modes are not
/// array operations and leave the array alone.
pub fn apply(array: &mut Vec<Value>, operation: &Modification) {
    match operation {
        Modification::PrependArr { items } => splice(array, 0, 0, items.to_vec()),
        Modification::AppendArr { items } => array.extend(items.to_vec()),
        Modification::InsertArr { index, items } => splice(array, *index, 0, items.to_vec()),
        Modification::ReplaceArr { replace, items } => {
            let index = match replace {
                ReplaceSelector::Name(name) => position_by_name(array, name),
                ReplaceSelector::Index { index } => *index,
            };
            // The upstream data is written against `splice(index, index, ...)`:
            // the index doubles as the delete count, so index 0 only inserts,
            // and a miss (-1) inserts before the last element.
            splice(array, index, index, items.to_vec());
        }
        Modification::RemoveArr { names } => {
            for name in names.to_vec() {
                let before = array.len();
                array.retain(|element| element_name(element) != Some(name.as_str()));
                if array.len() == before {
                    debug!(name = %name, "removeArr matched nothing");
                }
            }
        }
        Modification::ReplaceTxt { .. } | Modification::Unsupported => {}
    }
}

/// Whether `operation` edits an array field.
pub fn is_array_operation(operation: &Modification) -> bool {
    !matches!(
        operation,
        Modification::ReplaceTxt { .. } | Modification::Unsupported
    )
}

/// Remove `delete_count` elements at `start` and insert `items` there.
pub fn splice(array: &mut Vec<Value>, start: i64, delete_count: i64, items: Vec<Value>) {
    let len = array.len() as i64;
    let start = if start < 0 {
        (len + start).max(0)
    } else {
        start.min(len)
    };
    let delete_count = delete_count.clamp(0, len - start);
    let (start, end) = (start as usize, (start + delete_count) as usize);
    array.splice(start..end, items);
}

/// Index of the first element named `name`, or -1.
fn position_by_name(array: &[Value], name: &str) -> i64 {
    array
        .iter()
        .position(|element| element_name(element) == Some(name))
        .map_or(-1, |index| index as i64)
}

fn element_name(element: &Value) -> Option<&str> {
    element.get("name").and_then(Value::as_str)
}
