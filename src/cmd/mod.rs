// src/cmd/mod.rs

//! Owned argument vectors.
//!
//! A [`Cmd`] is nothing more than an ordered list of owned strings: the
//! program name followed by its arguments. It is never parsed by a shell; the
//! argv is handed to the OS as-is. [`Cmd::render`] produces a POSIX-quoted
//! string for logs only.

use std::fmt;

/// Build a [`Cmd`] from a list of expressions that implement `AsRef<str>`.
///
/// ```
/// let c = procbuild::cmd!["cc", "-c", "main.c"];
/// assert_eq!(c.len(), 3);
/// ```
#[macro_export]
macro_rules! cmd {
    ($($arg:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut c = $crate::cmd::Cmd::new();
        $( c.arg($arg); )*
        c
    }};
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cmd {
    args: Vec<String>,
}

impl Cmd {
    pub fn new() -> Self {
        Self { args: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            args: Vec::with_capacity(capacity),
        }
    }

    /// Append a single argument (copied).
    pub fn arg(&mut self, arg: impl AsRef<str>) -> &mut Self {
        self.args.push(arg.as_ref().to_owned());
        self
    }

    /// Append every argument of `args` in order. No deduplication.
    pub fn append<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for a in args {
            self.arg(a);
        }
        self
    }

    /// Append a copy of another command's full argument list.
    pub fn extend_from(&mut self, other: &Cmd) -> &mut Self {
        self.args.extend(other.args.iter().cloned());
        self
    }

    /// Drop all arguments but keep the backing storage for reuse.
    pub fn reset(&mut self) {
        self.args.clear();
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn program(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.args.capacity()
    }

    /// Render as a single, space-joined line.
    ///
    /// Arguments containing a space or a single quote are wrapped in single
    /// quotes; embedded quotes become `'\''`. An empty argument renders as
    /// `''` so it stays visible.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            quote_into(&mut out, arg);
        }
        out
    }

    /// Build the `std::process::Command` for this argv.
    ///
    /// Returns `None` for an empty command.
    pub(crate) fn to_process(&self) -> Option<std::process::Command> {
        let (program, rest) = self.args.split_first()?;
        let mut c = std::process::Command::new(program);
        c.args(rest);
        Some(c)
    }
}

fn quote_into(out: &mut String, arg: &str) {
    if !arg.is_empty() && !arg.contains([' ', '\'']) {
        out.push_str(arg);
        return;
    }

    out.push('\'');
    for ch in arg.chars() {
        if ch == '\'' {
            out.push_str("'\\''");
        } else {
            out.push(ch);
        }
    }
    out.push('\'');
}

impl fmt::Display for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl<S: AsRef<str>> FromIterator<S> for Cmd {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut c = Cmd::new();
        c.append(iter);
        c
    }
}

impl<S: AsRef<str>> Extend<S> for Cmd {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.append(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_plain_args_are_space_joined() {
        let c = crate::cmd!["cc", "-O2", "-o", "app", "main.c"];
        assert_eq!(c.render(), "cc -O2 -o app main.c");
    }

    #[test]
    fn render_quotes_spaces_and_single_quotes() {
        let c = crate::cmd!["echo", "hello world", "it's"];
        assert_eq!(c.render(), r#"echo 'hello world' 'it'\''s'"#);
    }

    #[test]
    fn render_keeps_empty_args_visible() {
        let c = crate::cmd!["echo", "", "x"];
        assert_eq!(c.render(), "echo '' x");
    }

    #[test]
    fn render_leaves_other_metacharacters_alone() {
        let c = crate::cmd!["grep", "a|b", "$HOME"];
        assert_eq!(c.to_string(), "grep a|b $HOME");
    }

    #[test]
    fn reset_keeps_capacity() {
        let mut c = Cmd::new();
        c.append(["a", "b", "c", "d"]);
        let cap = c.capacity();
        c.reset();
        assert!(c.is_empty());
        assert_eq!(c.capacity(), cap);

        c.append(["x", "y"]);
        assert_eq!(c.args(), ["x", "y"]);
        assert_eq!(c.capacity(), cap);
    }

    #[test]
    fn extend_from_copies_in_order() {
        let base = crate::cmd!["-Wall", "-Wextra"];
        let mut c = crate::cmd!["cc"];
        c.extend_from(&base).arg("main.c");
        assert_eq!(c.args(), ["cc", "-Wall", "-Wextra", "main.c"]);
        assert_eq!(base.len(), 2);
    }

    #[test]
    fn empty_command_has_no_process() {
        assert!(Cmd::new().to_process().is_none());
        assert_eq!(Cmd::new().program(), None);
    }
}
