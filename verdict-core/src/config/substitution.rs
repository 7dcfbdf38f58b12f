//! Variable substitution over configuration trees.
//!
//! Project configurations may embed `${NAME}` (or `$NAME`) tokens whose values
//! live in a separate variables file kept out of version control. Substitution
//! is a pure function over the YAML tree: it never mutates its input and it is
//! deliberately best-effort — tokens naming unknown variables pass through
//! literally, so a missing secret only surfaces where the real value is
//! actually needed.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_yaml::Value;

/// A loaded set of config variables, keyed by name.
pub type Variables = IndexMap<String, Value>;

static CONFIG_VARIABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)")
        .expect("config variable pattern is valid")
});

/// Substitutes config variables throughout a YAML tree.
///
/// Mappings and sequences are walked recursively; string leaves have every
/// `${NAME}`/`$NAME` occurrence replaced from `variables`; all other scalars
/// pass through unchanged. The result is a structurally new tree.
pub fn substitute_value(value: &Value, variables: &Variables) -> Value {
    match value {
        Value::String(s) => substitute_string(s, variables),
        Value::Sequence(seq) => Value::Sequence(
            seq.iter()
                .map(|item| substitute_value(item, variables))
                .collect(),
        ),
        Value::Mapping(map) => Value::Mapping(
            map.iter()
                .map(|(key, item)| (key.clone(), substitute_value(item, variables)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Substitutes config variables in a single string value.
///
/// When the entire string is exactly one token (`"${NAME}"`) and the variable
/// exists, the variable's value is returned type-preservingly — a numeric
/// variable stays numeric. Embedded tokens interpolate a string rendering of
/// scalar variables; tokens naming unknown (or non-scalar, when embedded)
/// variables stay literal.
pub fn substitute_string(input: &str, variables: &Variables) -> Value {
    if let Some(m) = CONFIG_VARIABLE.find(input) {
        if m.start() == 0 && m.end() == input.len() {
            let caps = CONFIG_VARIABLE
                .captures(input)
                .expect("find and captures agree");
            if let Some(value) = variables.get(capture_name(&caps)) {
                return value.clone();
            }
        }
    }

    let replaced = CONFIG_VARIABLE.replace_all(input, |caps: &Captures<'_>| {
        match variables.get(capture_name(caps)).and_then(render_scalar) {
            Some(text) => text,
            // Unknown variable: keep the token literal.
            None => caps[0].to_string(),
        }
    });
    Value::String(replaced.into_owned())
}

fn capture_name<'a>(caps: &'a Captures<'_>) -> &'a str {
    caps.get(1)
        .or_else(|| caps.get(2))
        .expect("pattern has exactly one matching group")
        .as_str()
}

fn render_scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, Value)]) -> Variables {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_whole_string_token_preserves_type() {
        let variables = vars(&[("PORT", Value::Number(5432.into()))]);
        let result = substitute_string("${PORT}", &variables);
        assert_eq!(result, Value::Number(5432.into()));
    }

    #[test]
    fn test_embedded_token_interpolates() {
        let variables = vars(&[
            ("HOST", Value::String("db.internal".into())),
            ("PORT", Value::Number(5432.into())),
        ]);
        let result = substitute_string("postgresql://${HOST}:${PORT}/metrics", &variables);
        assert_eq!(
            result,
            Value::String("postgresql://db.internal:5432/metrics".into())
        );
    }

    #[test]
    fn test_bare_dollar_form() {
        let variables = vars(&[("USER", Value::String("verdict".into()))]);
        let result = substitute_string("run as $USER please", &variables);
        assert_eq!(result, Value::String("run as verdict please".into()));
    }

    #[test]
    fn test_missing_variable_stays_literal() {
        let variables = Variables::new();
        let result = substitute_string("token ${MISSING} stays", &variables);
        assert_eq!(result, Value::String("token ${MISSING} stays".into()));
    }

    #[test]
    fn test_recursive_walk() {
        let variables = vars(&[("SECRET", Value::String("hunter2".into()))]);
        let tree: Value = serde_yaml::from_str(
            r"
            stores:
              metrics:
                class_name: SqlMetricStore
                credentials:
                  drivername: sqlite
                  password: ${SECRET}
            counts: [1, 2, 3]
            ",
        )
        .unwrap();

        let substituted = substitute_value(&tree, &variables);
        let rendered = serde_yaml::to_string(&substituted).unwrap();
        assert!(rendered.contains("password: hunter2"));
        assert!(!rendered.contains("${SECRET}"));

        // Input tree is untouched.
        let original = serde_yaml::to_string(&tree).unwrap();
        assert!(original.contains("${SECRET}"));
    }

    #[test]
    fn test_idempotent_when_fully_resolved() {
        let variables = vars(&[("A", Value::String("alpha".into()))]);
        let once = substitute_string("${A}/$A", &variables);
        let twice = substitute_value(&once, &variables);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_unresolved_token_stable_across_repeated_application() {
        let variables = Variables::new();
        let once = substitute_string("${NOPE}", &variables);
        let twice = substitute_value(&once, &variables);
        assert_eq!(once, Value::String("${NOPE}".into()));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_non_string_scalars_pass_through() {
        let variables = vars(&[("X", Value::String("y".into()))]);
        assert_eq!(
            substitute_value(&Value::Bool(true), &variables),
            Value::Bool(true)
        );
        assert_eq!(
            substitute_value(&Value::Null, &variables),
            Value::Null
        );
    }
}
