//! Native operations forwarded to the value at a cursor.
//!
//! Sequence operations follow the familiar array semantics: negative
//! positions count from the end, out-of-range positions clamp, and each
//! operation returns what the native call would (removed element, new
//! length, extracted range). String operations never modify the document.

use crate::core::error::{Error, Result};
use crate::types::{value_type_name, Document, Path};

/// An operation invoked on the node at a cursor's path
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Append items; returns the new length
    Push(Vec<Document>),
    /// Remove the last element; returns it
    Pop,
    /// Remove the first element; returns it
    Shift,
    /// Prepend items; returns the new length
    Unshift(Vec<Document>),
    /// Copy out `[start, end)`; returns the range
    Slice {
        /// First position (negative counts from the end)
        start: i64,
        /// Position after the last element copied, defaults to the length
        end: Option<i64>,
    },
    /// Remove `delete_count` elements at `start` and insert `items` there;
    /// returns the removed elements
    Splice {
        /// First position (negative counts from the end)
        start: i64,
        /// Elements to remove, defaults to everything after `start`
        delete_count: Option<usize>,
        /// Elements inserted at `start`
        items: Vec<Document>,
    },
    /// Reverse in place; returns the reversed sequence
    Reverse,
    /// Position of the first equal element, or -1
    IndexOf(Document),
    /// Whether an equal element exists
    Includes(Document),
    /// Upper-cased copy of a string
    ToUpperCase,
    /// Lower-cased copy of a string
    ToLowerCase,
    /// Copy of a string without surrounding whitespace
    Trim,
    /// Number of elements in a sequence, or characters in a string
    Length,
}

const NAMES: &[&str] = &[
    "push",
    "pop",
    "shift",
    "unshift",
    "slice",
    "splice",
    "reverse",
    "indexOf",
    "includes",
    "toUpperCase",
    "toLowerCase",
    "trim",
    "length",
];

impl Operation {
    /// Whether `name` names a forwardable operation
    pub fn is_known(name: &str) -> bool {
        NAMES.contains(&canonical(name))
    }

    /// Build an operation from its name and positional arguments
    pub fn parse(name: &str, args: Vec<Document>) -> Result<Self> {
        let mut args = args.into_iter();
        let op = match canonical(name) {
            "push" => Operation::Push(args.collect()),
            "pop" => Operation::Pop,
            "shift" => Operation::Shift,
            "unshift" => Operation::Unshift(args.collect()),
            "slice" => Operation::Slice {
                start: int_arg(args.next(), name)?.unwrap_or(0),
                end: int_arg(args.next(), name)?,
            },
            "splice" => {
                let start = int_arg(args.next(), name)?.unwrap_or(0);
                let delete_count = int_arg(args.next(), name)?.map(|n| n.max(0) as usize);
                Operation::Splice {
                    start,
                    delete_count,
                    items: args.collect(),
                }
            }
            "reverse" => Operation::Reverse,
            "indexOf" => Operation::IndexOf(required_arg(args.next(), name)?),
            "includes" => Operation::Includes(required_arg(args.next(), name)?),
            "toUpperCase" => Operation::ToUpperCase,
            "toLowerCase" => Operation::ToLowerCase,
            "trim" => Operation::Trim,
            "length" => Operation::Length,
            _ => return Err(Error::usage(format!("unknown operation '{}'", name))),
        };
        Ok(op)
    }

    /// Operation name
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Push(_) => "push",
            Operation::Pop => "pop",
            Operation::Shift => "shift",
            Operation::Unshift(_) => "unshift",
            Operation::Slice { .. } => "slice",
            Operation::Splice { .. } => "splice",
            Operation::Reverse => "reverse",
            Operation::IndexOf(_) => "indexOf",
            Operation::Includes(_) => "includes",
            Operation::ToUpperCase => "toUpperCase",
            Operation::ToLowerCase => "toLowerCase",
            Operation::Trim => "trim",
            Operation::Length => "length",
        }
    }

    /// Whether the operation changes the value it runs on
    pub fn mutates(&self) -> bool {
        matches!(
            self,
            Operation::Push(_)
                | Operation::Pop
                | Operation::Shift
                | Operation::Unshift(_)
                | Operation::Splice { .. }
                | Operation::Reverse
        )
    }

    /// Run the operation on the value in `slot`.
    ///
    /// `None` is the native "undefined" result (popping an empty sequence).
    /// Targets of the wrong type are a usage error and stay untouched.
    pub fn apply(self, slot: &mut Option<Document>, path: &Path) -> Result<Option<Document>> {
        match self {
            Operation::Length => match slot {
                Some(Document::Array(items)) => Ok(Some(Document::from(items.len()))),
                Some(Document::String(s)) => Ok(Some(Document::from(s.chars().count()))),
                other => Err(wrong_target("length", "array or string", other.as_ref(), path)),
            },
            Operation::ToUpperCase | Operation::ToLowerCase | Operation::Trim => {
                let s = match slot {
                    Some(Document::String(s)) => s,
                    other => return Err(wrong_target(self.name(), "string", other.as_ref(), path)),
                };
                let out = match self {
                    Operation::ToUpperCase => s.to_uppercase(),
                    Operation::ToLowerCase => s.to_lowercase(),
                    _ => s.trim().to_string(),
                };
                Ok(Some(Document::String(out)))
            }
            op => {
                let items = match slot {
                    Some(Document::Array(items)) => items,
                    other => return Err(wrong_target(op.name(), "array", other.as_ref(), path)),
                };
                Ok(op.apply_to_sequence(items))
            }
        }
    }

    fn apply_to_sequence(self, items: &mut Vec<Document>) -> Option<Document> {
        let len = items.len();
        match self {
            Operation::Push(values) => {
                items.extend(values);
                Some(Document::from(items.len()))
            }
            Operation::Pop => items.pop(),
            Operation::Shift => (!items.is_empty()).then(|| items.remove(0)),
            Operation::Unshift(values) => {
                items.splice(0..0, values);
                Some(Document::from(items.len()))
            }
            Operation::Slice { start, end } => {
                let from = relative_index(start, len);
                let to = end.map_or(len, |e| relative_index(e, len));
                let range = if from < to { items[from..to].to_vec() } else { Vec::new() };
                Some(Document::Array(range))
            }
            Operation::Splice {
                start,
                delete_count,
                items: inserted,
            } => {
                let from = relative_index(start, len);
                let count = delete_count.map_or(len - from, |c| c.min(len - from));
                let removed: Vec<Document> = items.splice(from..from + count, inserted).collect();
                Some(Document::Array(removed))
            }
            Operation::Reverse => {
                items.reverse();
                Some(Document::Array(items.clone()))
            }
            Operation::IndexOf(needle) => {
                let position = items.iter().position(|v| *v == needle);
                Some(Document::from(position.map_or(-1, |p| p as i64)))
            }
            Operation::Includes(needle) => Some(Document::Bool(items.contains(&needle))),
            Operation::ToUpperCase | Operation::ToLowerCase | Operation::Trim | Operation::Length => None,
        }
    }
}

fn canonical(name: &str) -> &str {
    match name {
        "index_of" => "indexOf",
        "to_upper_case" => "toUpperCase",
        "to_lower_case" => "toLowerCase",
        other => other,
    }
}

fn relative_index(position: i64, len: usize) -> usize {
    if position < 0 {
        (len as i64 + position).max(0) as usize
    } else {
        (position as usize).min(len)
    }
}

fn int_arg(arg: Option<Document>, op: &str) -> Result<Option<i64>> {
    match arg {
        None | Some(Document::Null) => Ok(None),
        Some(value) => value
            .as_i64()
            .map(Some)
            .ok_or_else(|| Error::usage(format!("{} expects integer arguments, got {}", op, value))),
    }
}

fn required_arg(arg: Option<Document>, op: &str) -> Result<Document> {
    arg.ok_or_else(|| Error::usage(format!("{} expects an argument", op)))
}

fn wrong_target(op: &str, expected: &str, found: Option<&Document>, path: &Path) -> Error {
    let found = found.map_or("nothing", value_type_name);
    Error::usage(format!("{} requires {} at {}, found {}", op, expected, path, found))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(op: Operation, target: Document) -> (Option<Document>, Document) {
        let mut slot = Some(target);
        let out = op.apply(&mut slot, &Path::root()).unwrap();
        (out, slot.unwrap())
    }

    #[test]
    fn test_push_pop() {
        let (len, seq) = run(Operation::Push(vec![json!(4)]), json!([1, 2, 3]));
        assert_eq!(len, Some(json!(4)));
        assert_eq!(seq, json!([1, 2, 3, 4]));

        let (last, seq) = run(Operation::Pop, json!([1, 2, 3, 4]));
        assert_eq!(last, Some(json!(4)));
        assert_eq!(seq, json!([1, 2, 3]));

        let (nothing, _) = run(Operation::Pop, json!([]));
        assert_eq!(nothing, None);
    }

    #[test]
    fn test_shift_unshift() {
        let (first, seq) = run(Operation::Shift, json!(["a", "b"]));
        assert_eq!(first, Some(json!("a")));
        assert_eq!(seq, json!(["b"]));

        let (len, seq) = run(Operation::Unshift(vec![json!(0), json!(1)]), json!([2]));
        assert_eq!(len, Some(json!(3)));
        assert_eq!(seq, json!([0, 1, 2]));
    }

    #[test]
    fn test_slice_leaves_sequence_alone() {
        let op = Operation::parse("slice", vec![json!(1), json!(3)]).unwrap();
        assert!(!op.mutates());
        let (range, seq) = run(op, json!([1, 2, 3, 4]));
        assert_eq!(range, Some(json!([2, 3])));
        assert_eq!(seq, json!([1, 2, 3, 4]));

        let (tail, _) = run(Operation::Slice { start: -2, end: None }, json!([1, 2, 3, 4]));
        assert_eq!(tail, Some(json!([3, 4])));

        let (empty, _) = run(Operation::Slice { start: 3, end: Some(1) }, json!([1, 2, 3, 4]));
        assert_eq!(empty, Some(json!([])));
    }

    #[test]
    fn test_splice() {
        let op = Operation::parse("splice", vec![json!(1), json!(2)]).unwrap();
        let (removed, seq) = run(op, json!(["foo", "bar", "baz", "test"]));
        assert_eq!(removed, Some(json!(["bar", "baz"])));
        assert_eq!(seq, json!(["foo", "test"]));

        let op = Operation::parse("splice", vec![json!(-1), json!(0), json!("x"), json!("y")]).unwrap();
        let (removed, seq) = run(op, json!([1, 2]));
        assert_eq!(removed, Some(json!([])));
        assert_eq!(seq, json!([1, "x", "y", 2]));

        let op = Operation::parse("splice", vec![json!(1)]).unwrap();
        let (removed, seq) = run(op, json!([1, 2, 3]));
        assert_eq!(removed, Some(json!([2, 3])));
        assert_eq!(seq, json!([1]));
    }

    #[test]
    fn test_search_operations() {
        let (pos, _) = run(Operation::IndexOf(json!("b")), json!(["a", "b"]));
        assert_eq!(pos, Some(json!(1)));
        let (pos, _) = run(Operation::IndexOf(json!("z")), json!(["a", "b"]));
        assert_eq!(pos, Some(json!(-1)));
        let (found, _) = run(Operation::Includes(json!({"k": 1})), json!([{"k": 1}]));
        assert_eq!(found, Some(json!(true)));
    }

    #[test]
    fn test_string_operations() {
        let (upper, original) = run(Operation::parse("toUpperCase", vec![]).unwrap(), json!("foo bar"));
        assert_eq!(upper, Some(json!("FOO BAR")));
        assert_eq!(original, json!("foo bar"));

        let (trimmed, _) = run(Operation::Trim, json!("  x "));
        assert_eq!(trimmed, Some(json!("x")));
    }

    #[test]
    fn test_length() {
        let (len, _) = run(Operation::Length, json!([1, 2, 3]));
        assert_eq!(len, Some(json!(3)));
        let (len, _) = run(Operation::Length, json!("héllo"));
        assert_eq!(len, Some(json!(5)));
        assert!(!Operation::Length.mutates());
        assert!(Operation::Length.apply(&mut Some(json!({})), &Path::root()).is_err());
    }

    #[test]
    fn test_wrong_target_is_usage_error() {
        let mut slot = Some(json!({"not": "a list"}));
        let err = Operation::Push(vec![json!(1)])
            .apply(&mut slot, &Path::from_keys(["example"]))
            .unwrap_err();
        assert!(err.is_usage());
        assert_eq!(slot, Some(json!({"not": "a list"})));

        let mut empty = None;
        assert!(Operation::Pop.apply(&mut empty, &Path::root()).is_err());
        assert!(Operation::ToLowerCase.apply(&mut Some(json!(3)), &Path::root()).is_err());
    }

    #[test]
    fn test_parse_names_and_arguments() {
        assert!(Operation::is_known("push"));
        assert!(Operation::is_known("to_upper_case"));
        assert!(!Operation::is_known("delete"));
        assert!(Operation::parse("frobnicate", vec![]).is_err());
        assert!(Operation::parse("slice", vec![json!("one")]).is_err());
        assert!(Operation::parse("includes", vec![]).is_err());
        assert_eq!(Operation::parse("index_of", vec![json!(1)]).unwrap().name(), "indexOf");
    }
}
