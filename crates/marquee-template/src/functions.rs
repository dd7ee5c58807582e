//! Built-in template functions
//!
//! Argument order follows the pipeline convention: the value being worked on
//! comes last, so `{{ .x | replace "a" "b" }}` reads naturally.

use crate::value::Value;

const FUNCTIONS: &[(&str, usize)] = &[
    ("split", 2),
    ("join", 2),
    ("lower", 1),
    ("upper", 1),
    ("trim", 1),
    ("replace", 3),
    ("default", 2),
    ("quote", 1),
];

/// Number of arguments a function takes, `None` if it is not defined
pub(crate) fn arity(name: &str) -> Option<usize> {
    FUNCTIONS
        .iter()
        .find(|(func, _)| *func == name)
        .map(|(_, arity)| *arity)
}

/// Call a function. Arity has already been checked by the parser.
pub(crate) fn call(name: &str, args: Vec<Value>) -> Result<Value, String> {
    match (name, args.as_slice()) {
        ("split", [s, sep]) => {
            let s = expect_str(s, 1)?;
            let sep = expect_str(sep, 2)?;
            Ok(Value::List(split(s, sep)))
        }
        ("join", [list, sep]) => {
            let sep = expect_str(sep, 2)?;
            match list {
                Value::List(items) => Ok(Value::Str(items.join(sep))),
                other => Err(format!(
                    "argument 1 must be a list, got {}",
                    other.type_name()
                )),
            }
        }
        ("lower", [s]) => Ok(Value::Str(expect_str(s, 1)?.to_lowercase())),
        ("upper", [s]) => Ok(Value::Str(expect_str(s, 1)?.to_uppercase())),
        ("trim", [s]) => Ok(Value::Str(expect_str(s, 1)?.trim().to_string())),
        ("replace", [old, new, s]) => {
            let old = expect_str(old, 1)?;
            let new = expect_str(new, 2)?;
            let s = expect_str(s, 3)?;
            Ok(Value::Str(s.replace(old, new)))
        }
        ("default", [fallback, value]) => {
            if value.is_truthy() {
                Ok(value.clone())
            } else {
                Ok(fallback.clone())
            }
        }
        ("quote", [s]) => {
            let s = expect_str(s, 1)?;
            serde_json::to_string(s)
                .map(Value::Str)
                .map_err(|e| e.to_string())
        }
        _ => Err(format!("function {} called with {} args", name, args.len())),
    }
}

fn expect_str(value: &Value, position: usize) -> Result<&str, String> {
    match value {
        Value::Str(s) => Ok(s),
        other => Err(format!(
            "argument {} must be a string, got {}",
            position,
            other.type_name()
        )),
    }
}

/// Split semantics: an empty separator splits into characters
fn split(s: &str, sep: &str) -> Vec<String> {
    if sep.is_empty() {
        return s.chars().map(String::from).collect();
    }
    s.split(sep).map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Value {
        Value::Str(v.to_string())
    }

    #[test]
    fn test_split_and_join() {
        let list = call("split", vec![s("a,b,,c"), s(",")]).unwrap();
        assert_eq!(
            list,
            Value::List(vec!["a".into(), "b".into(), "".into(), "c".into()])
        );
        assert_eq!(call("join", vec![list, s("-")]).unwrap(), s("a-b--c"));
    }

    #[test]
    fn test_split_empty_separator() {
        assert_eq!(
            call("split", vec![s("ab"), s("")]).unwrap(),
            Value::List(vec!["a".into(), "b".into()])
        );
    }

    #[test]
    fn test_join_requires_list() {
        let err = call("join", vec![s("abc"), s(",")]).unwrap_err();
        assert!(err.contains("must be a list"));
    }

    #[test]
    fn test_default_and_quote() {
        assert_eq!(call("default", vec![s("x"), s("")]).unwrap(), s("x"));
        assert_eq!(call("default", vec![s("x"), s("y")]).unwrap(), s("y"));
        assert_eq!(call("quote", vec![s("say \"hi\"")]).unwrap(), s(r#""say \"hi\"""#));
    }

    #[test]
    fn test_arity_table() {
        assert_eq!(arity("replace"), Some(3));
        assert_eq!(arity("printf"), None);
    }
}
