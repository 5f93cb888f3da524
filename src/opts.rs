//! # Command-line options of a run.
//!
//! [`Opts`] carries the arguments and environment of a run and parses them
//! with `clap`. Help and version requests are not errors: they come back as
//! [`Parsed::Help`] so the task can print the text and exit successfully.
//! Every other parse failure becomes a [`UsageError`].

use clap::Parser;
use clap::error::ErrorKind;

use crate::env::Env;
use crate::error::UsageError;

/// Outcome of [`Opts::parse`].
#[derive(Debug)]
pub enum Parsed<P> {
    /// Arguments parsed successfully.
    Args(P),
    /// Help or version text was requested; print it and exit 0.
    Help(String),
}

/// Arguments and environment of one run.
#[derive(Clone, Debug)]
pub struct Opts {
    name: String,
    args: Vec<String>,
    env: Env,
}

impl Opts {
    /// `name` is `argv[0]`; `args` are the remaining arguments.
    pub fn new(env: Env, name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            args,
            env,
        }
    }

    /// Invocation name (`argv[0]`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Arguments after the invocation name.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Environment consulted by [`or_env`](Self::or_env).
    pub fn env(&self) -> &Env {
        &self.env
    }

    /// Parses the arguments into `P`.
    pub fn parse<P: Parser>(&self) -> Result<Parsed<P>, UsageError> {
        let argv = std::iter::once(self.name.clone()).chain(self.args.iter().cloned());
        match P::try_parse_from(argv) {
            Ok(p) => Ok(Parsed::Args(p)),
            Err(err) => match err.kind() {
                ErrorKind::DisplayHelp
                | ErrorKind::DisplayVersion
                | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                    Ok(Parsed::Help(err.render().to_string()))
                }
                _ => Err(UsageError::new(usage_message(&err))),
            },
        }
    }

    /// `value` if set, else the environment variable `name`.
    pub fn or_env(&self, value: Option<String>, name: &str) -> Option<String> {
        value
            .filter(|v| !v.is_empty())
            .or_else(|| self.env.getenv(name).filter(|v| !v.is_empty()))
    }
}

/// First line of a clap error without its `error: ` prefix.
fn usage_message(err: &clap::Error) -> String {
    let rendered = err.render().to_string();
    let first = rendered.lines().next().unwrap_or_default();
    first.strip_prefix("error: ").unwrap_or(first).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Parser, Debug)]
    struct Hello {
        #[arg(short, long)]
        flag: Option<String>,
    }

    fn opts(args: &[&str]) -> Opts {
        Opts::new(
            Env::default(),
            "hello",
            args.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn parses_flags() {
        match opts(&["--flag", "x"]).parse::<Hello>().unwrap() {
            Parsed::Args(h) => assert_eq!(h.flag.as_deref(), Some("x")),
            Parsed::Help(_) => panic!("unexpected help"),
        }
    }

    #[test]
    fn help_is_not_an_error() {
        match opts(&["--help"]).parse::<Hello>().unwrap() {
            Parsed::Help(text) => assert!(text.contains("Usage:")),
            Parsed::Args(_) => panic!("expected help"),
        }
    }

    #[test]
    fn unknown_flag_is_usage_error() {
        let err = opts(&["--nope"]).parse::<Hello>().unwrap_err();
        assert!(err.message.contains("--nope"), "{}", err.message);
        assert!(err.to_string().starts_with("bad usage: "));
    }

    #[test]
    fn env_fallback() {
        let o = opts(&[]);
        o.env().setenv("HELLO_FLAG", "world");
        assert_eq!(o.or_env(None, "HELLO_FLAG").as_deref(), Some("world"));
        assert_eq!(
            o.or_env(Some("flag".into()), "HELLO_FLAG").as_deref(),
            Some("flag")
        );
    }
}
