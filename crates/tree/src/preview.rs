use crate::value::Value;

/// Sequences longer than this are previewed by their first elements only.
pub const MAX_PREVIEW_ELEMENTS: usize = 4;
/// Text longer than this many code points is truncated with an ellipsis.
pub const MAX_PREVIEW_CHARS: usize = 64;

const ELLIPSIS: char = '…';

/// Display summary of a value, computed without building any children.
///
/// Returns the preview (if the value has one) and whether the preview is the
/// complete value.
pub fn preview(value: &Value) -> (Option<Value>, bool) {
    match value {
        // Memory-backed data is shown by its descriptor; elements stay unloaded.
        Value::Pointer(_) | Value::Slice(_) => (Some(value.clone()), true),
        Value::Bool(_) | Value::Int(_) | Value::Uint(_) | Value::Float(_) => {
            (Some(value.clone()), true)
        }
        Value::Sequence(seq) => {
            if seq.len() > MAX_PREVIEW_ELEMENTS {
                (
                    Some(Value::Sequence(seq.slice(0, MAX_PREVIEW_ELEMENTS))),
                    false,
                )
            } else {
                (Some(value.clone()), true)
            }
        }
        Value::Text(text) => {
            if text.chars().count() > MAX_PREVIEW_CHARS {
                let truncated: String = text
                    .chars()
                    .take(MAX_PREVIEW_CHARS - 1)
                    .chain(std::iter::once(ELLIPSIS))
                    .collect();
                (Some(Value::text(truncated)), false)
            } else {
                (Some(value.clone()), true)
            }
        }
        Value::Ref(Some(inner)) => preview(inner),
        Value::Ref(None) => (Some(Value::ABSENT), true),
        Value::Map(_) | Value::Record(_) => (None, false),
    }
}
