// tests/property_render.rs

use proptest::prelude::*;
use procbuild::Cmd;

/// Split a rendered line back into words, understanding single quotes and
/// `\'` outside of them. That is all `Cmd::render` ever emits.
fn split_rendered(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut in_quotes = false;
    let mut chars = line.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '\'' => {
                in_quotes = !in_quotes;
                in_word = true;
            }
            '\\' if !in_quotes => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
                in_word = true;
            }
            ' ' if !in_quotes => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            other => {
                current.push(other);
                in_word = true;
            }
        }
    }
    if in_word {
        words.push(current);
    }
    words
}

proptest! {
    #[test]
    fn render_splits_back_into_the_same_args(
        args in proptest::collection::vec("[a-zA-Z0-9 '._-]{0,12}", 1..6)
    ) {
        let cmd: Cmd = args.iter().collect();
        let rendered = cmd.render();
        prop_assert_eq!(split_rendered(&rendered), args);
    }

    #[test]
    fn plain_args_render_verbatim(
        args in proptest::collection::vec("[a-zA-Z0-9._=/-]{1,12}", 1..6)
    ) {
        let cmd: Cmd = args.iter().collect();
        prop_assert_eq!(cmd.render(), args.join(" "));
    }

    #[test]
    fn reset_then_append_reuses_storage(
        first in proptest::collection::vec("[a-z]{1,8}", 1..10),
        second in proptest::collection::vec("[a-z]{1,8}", 0..10),
    ) {
        let mut cmd: Cmd = first.iter().collect();
        let cap = cmd.capacity();
        cmd.reset();
        prop_assert!(cmd.is_empty());
        cmd.append(&second);
        prop_assert_eq!(cmd.args(), second.as_slice());
        if second.len() <= cap {
            prop_assert_eq!(cmd.capacity(), cap);
        }
    }
}
