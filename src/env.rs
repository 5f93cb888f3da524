//! # Process environment as a value.
//!
//! [`Env`] holds `NAME=value` pairs so that runs (and tests) can be given an
//! environment other than the process one. Clones share the same storage.

use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;

/// Invalid boolean environment variable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("${name} must be 0, 1, false or true but got {value:?}")]
pub struct EnvError {
    /// Variable name.
    pub name: String,
    /// Offending value.
    pub value: String,
}

/// Shared, mutable set of `NAME=value` entries.
#[derive(Clone, Debug, Default)]
pub struct Env {
    environ: Arc<RwLock<Vec<String>>>,
}

impl Env {
    /// Builds an environment from `NAME=value` entries.
    pub fn new<I, S>(environ: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            environ: Arc::new(RwLock::new(environ.into_iter().map(Into::into).collect())),
        }
    }

    /// Snapshot of the current process environment.
    ///
    /// Entries that are not valid UTF-8 are converted lossily.
    pub fn from_os() -> Self {
        Self::new(std::env::vars_os().map(|(k, v)| {
            format!("{}={}", k.to_string_lossy(), v.to_string_lossy())
        }))
    }

    /// Copy of all entries.
    pub fn environ(&self) -> Vec<String> {
        self.environ
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Sets `name` to `value`, replacing an existing entry in place.
    pub fn setenv(&self, name: &str, value: &str) {
        let line = format!("{name}={value}");
        let mut environ = self
            .environ
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        match environ
            .iter_mut()
            .find(|l| l.split_once('=').is_some_and(|(n, _)| n == name))
        {
            Some(existing) => *existing = line,
            None => environ.push(line),
        }
    }

    /// Value of `name`, if set.
    pub fn getenv(&self, name: &str) -> Option<String> {
        self.environ
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter_map(|l| l.split_once('='))
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.to_string())
    }

    /// Parses `name` as a boolean: unset or empty is `None`.
    pub fn bool(&self, name: &str) -> Result<Option<bool>, EnvError> {
        match self.getenv(name).as_deref() {
            None | Some("") => Ok(None),
            Some("0" | "false") => Ok(Some(false)),
            Some("1" | "true") => Ok(Some(true)),
            Some(other) => Err(EnvError {
                name: name.to_string(),
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setenv_replaces_in_place() {
        let env = Env::new(["A=1", "B=2"]);
        env.setenv("A", "3");
        env.setenv("C", "4");
        assert_eq!(env.environ(), vec!["A=3", "B=2", "C=4"]);
        assert_eq!(env.getenv("A").as_deref(), Some("3"));
        assert_eq!(env.getenv("missing"), None);
    }

    #[cfg(unix)]
    #[test]
    #[allow(unsafe_code)]
    fn from_os_tolerates_non_utf8_entries() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let name = "GRACEVISOR_ENV_NON_UTF8";
        // SAFETY: no other test reads or writes this variable.
        unsafe { std::env::set_var(name, OsStr::from_bytes(b"ok\xff")) };
        let env = Env::from_os();
        unsafe { std::env::remove_var(name) };

        assert_eq!(env.getenv(name).as_deref(), Some("ok\u{FFFD}"));
    }

    #[test]
    fn clones_share_storage() {
        let env = Env::default();
        let other = env.clone();
        other.setenv("HELLO_FLAG", "world");
        assert_eq!(env.getenv("HELLO_FLAG").as_deref(), Some("world"));
    }

    #[test]
    fn bool_parsing() {
        let env = Env::new(["T=true", "ONE=1", "F=false", "ZERO=0", "EMPTY=", "BAD=yes"]);
        assert_eq!(env.bool("T"), Ok(Some(true)));
        assert_eq!(env.bool("ONE"), Ok(Some(true)));
        assert_eq!(env.bool("F"), Ok(Some(false)));
        assert_eq!(env.bool("ZERO"), Ok(Some(false)));
        assert_eq!(env.bool("EMPTY"), Ok(None));
        assert_eq!(env.bool("UNSET"), Ok(None));

        let err = env.bool("BAD").unwrap_err();
        assert_eq!(err.to_string(), r#"$BAD must be 0, 1, false or true but got "yes""#);
    }
}
