//! Handler names exempt from the delivery watchdog.
//!
//! | Entry | Exempts |
//! |-------|---------|
//! | `org.example.Audit` | exactly that handler |
//! | `org.example.` | handlers directly in `org.example` |
//! | `org.example.*` | handlers in `org.example` and every sub-package |
//! | `org.example*` | any handler whose name starts with `org.example` |

use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct IgnoreTimeout {
    exact: HashSet<String>,
    packages: Vec<String>,
    prefixes: Vec<String>,
}

impl IgnoreTimeout {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ignore = Self::default();
        for entry in entries {
            let entry = entry.as_ref().trim();
            if entry.is_empty() {
                continue;
            }
            if let Some(prefix) = entry.strip_suffix('*') {
                ignore.prefixes.push(prefix.to_string());
            } else if entry.ends_with('.') {
                ignore.packages.push(entry.to_string());
            } else {
                ignore.exact.insert(entry.to_string());
            }
        }
        ignore
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.packages.is_empty() && self.prefixes.is_empty()
    }

    pub fn is_ignored(&self, handler_name: &str) -> bool {
        if self.exact.contains(handler_name) {
            return true;
        }
        if self.prefixes.iter().any(|p| handler_name.starts_with(p.as_str())) {
            return true;
        }
        self.packages.iter().any(|p| {
            handler_name
                .strip_prefix(p.as_str())
                .is_some_and(|rest| !rest.is_empty() && !rest.contains('.'))
        })
    }
}
