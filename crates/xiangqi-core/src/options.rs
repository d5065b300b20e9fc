//! Engine option store.

use std::collections::HashMap;
use std::fmt;

use crate::error::OptionError;
use crate::eval_file::{EVAL_FILE_DEFAULT_NAME, EVAL_FILE_OPTION};

/// Read-only view of option values used by the network loader.
pub trait OptionSource {
    /// Current value of `name`, or an empty string if it is not set.
    fn option_value(&self, name: &str) -> &str;
}

impl OptionSource for HashMap<String, String> {
    fn option_value(&self, name: &str) -> &str {
        self.get(name).map_or("", String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionKind {
    String,
    Spin { min: i64, max: i64 },
    Check,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOption {
    name: String,
    kind: OptionKind,
    default: String,
    value: String,
}

impl EngineOption {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &OptionKind {
        &self.kind
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for EngineOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "option name {} type ", self.name)?;
        match self.kind {
            OptionKind::String => write!(f, "string default {}", self.default),
            OptionKind::Spin { min, max } => {
                write!(f, "spin default {} min {min} max {max}", self.default)
            }
            OptionKind::Check => write!(f, "check default {}", self.default),
        }
    }
}

/// Options in declaration order. Names are matched case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct OptionsMap {
    options: Vec<EngineOption>,
}

impl OptionsMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// The options the engine advertises.
    ///
    /// Only `EvalFile` affects evaluation. `Threads` and `Hash` are validated
    /// and stored so that GUIs which always send them are not rejected; the
    /// evaluator has no thread pool or hash table that reads them.
    pub fn engine_defaults() -> Self {
        let mut options = Self::new();
        options.add(EVAL_FILE_OPTION, OptionKind::String, EVAL_FILE_DEFAULT_NAME);
        options.add("Threads", OptionKind::Spin { min: 1, max: 1024 }, "1");
        options.add("Hash", OptionKind::Spin { min: 1, max: 33_554_432 }, "16");
        options
    }

    /// Declares an option. Redeclaring a name replaces the previous entry.
    pub fn add(&mut self, name: &str, kind: OptionKind, default: &str) {
        let option = EngineOption {
            name: name.to_string(),
            kind,
            default: default.to_string(),
            value: default.to_string(),
        };
        match self.position(name) {
            Some(i) => self.options[i] = option,
            None => self.options.push(option),
        }
    }

    /// Sets an option from a `setoption` command.
    ///
    /// A missing value clears string options and is rejected for the other
    /// kinds. Spin values must be integers inside the declared range.
    pub fn set(&mut self, name: &str, value: Option<&str>) -> Result<&EngineOption, OptionError> {
        let index = self.position(name).ok_or_else(|| OptionError::Unknown {
            name: name.to_string(),
        })?;
        let option = &mut self.options[index];
        let raw = value.unwrap_or("").trim();

        let normalized = match option.kind {
            OptionKind::String => raw.to_string(),
            OptionKind::Spin { min, max } => {
                let v: i64 = raw.parse().map_err(|_| OptionError::InvalidValue {
                    name: option.name.clone(),
                    value: raw.to_string(),
                })?;
                if !(min..=max).contains(&v) {
                    return Err(OptionError::OutOfRange {
                        name: option.name.clone(),
                        value: v,
                        min,
                        max,
                    });
                }
                v.to_string()
            }
            OptionKind::Check => match raw.to_ascii_lowercase().as_str() {
                "true" => "true".to_string(),
                "false" => "false".to_string(),
                _ => {
                    return Err(OptionError::InvalidValue {
                        name: option.name.clone(),
                        value: raw.to_string(),
                    });
                }
            },
        };

        option.value = normalized;
        Ok(&*option)
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.position(name).map(|i| self.options[i].value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &EngineOption> {
        self.options.iter()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.options
            .iter()
            .position(|o| o.name.eq_ignore_ascii_case(name))
    }
}

impl OptionSource for OptionsMap {
    fn option_value(&self, name: &str) -> &str {
        self.value(name).unwrap_or("")
    }
}

impl fmt::Display for OptionsMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for option in &self.options {
            writeln!(f, "{option}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_case_insensitive() {
        let mut options = OptionsMap::engine_defaults();
        options.set("evalfile", Some("custom.nnue")).unwrap();
        assert_eq!(options.option_value("EvalFile"), "custom.nnue");
        assert_eq!(options.option_value("EVALFILE"), "custom.nnue");
    }

    #[test]
    fn empty_string_value_is_allowed() {
        let mut options = OptionsMap::engine_defaults();
        options.set("EvalFile", None).unwrap();
        assert_eq!(options.option_value("EvalFile"), "");
    }

    #[test]
    fn spin_values_are_range_checked() {
        let mut options = OptionsMap::engine_defaults();
        assert_eq!(options.set("Threads", Some("8")).unwrap().value(), "8");
        assert_eq!(
            options.set("Threads", Some("0")),
            Err(OptionError::OutOfRange {
                name: "Threads".to_string(),
                value: 0,
                min: 1,
                max: 1024
            })
        );
        assert!(matches!(
            options.set("Hash", Some("lots")),
            Err(OptionError::InvalidValue { .. })
        ));
        assert_eq!(options.option_value("Threads"), "8");
    }

    #[test]
    fn check_options() {
        let mut options = OptionsMap::new();
        options.add("Ponder", OptionKind::Check, "false");
        options.set("ponder", Some("TRUE")).unwrap();
        assert_eq!(options.option_value("Ponder"), "true");
        assert!(options.set("Ponder", Some("yes")).is_err());
    }

    #[test]
    fn unknown_option_is_rejected() {
        let mut options = OptionsMap::engine_defaults();
        assert_eq!(
            options.set("Skill Level", Some("3")),
            Err(OptionError::Unknown {
                name: "Skill Level".to_string()
            })
        );
        assert_eq!(options.option_value("Skill Level"), "");
    }

    #[test]
    fn display_lists_options_in_order() {
        let text = OptionsMap::engine_defaults().to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            format!("option name EvalFile type string default {EVAL_FILE_DEFAULT_NAME}")
        );
        assert_eq!(lines[1], "option name Threads type spin default 1 min 1 max 1024");
        assert_eq!(lines.len(), 3);
    }
}
