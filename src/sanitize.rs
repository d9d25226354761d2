use std::fmt;

pub const SEPARATOR: char = '_';

/// Filesystem and window-manager safe token derived from a contest title.
///
/// Only ASCII alphanumerics and single `_` separators survive, never at the
/// ends. Distinct titles may collapse to the same name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SafeName(String);

impl SafeName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SafeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SafeName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

pub fn sanitize(event_name: &str) -> SafeName {
    let mut out = String::with_capacity(event_name.len());
    let mut pending_separator = false;
    for ch in event_name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !out.is_empty() {
                out.push(SEPARATOR);
            }
            out.push(ch);
            pending_separator = false;
        } else {
            pending_separator = true;
        }
    }
    SafeName(out)
}
