//! `$` interpolation.
//!
//! A single left-to-right pass; substituted values are never re-scanned.
//!
//! | input        | result                                   |
//! |--------------|------------------------------------------|
//! | `$$n`        | newline                                  |
//! | `$$s`        | space                                    |
//! | `$$`         | `$`                                      |
//! | `$_PI`       | `3.141592653589793`                      |
//! | `$_E`        | `2.718281828459045`                      |
//! | `$_`         | removed                                  |
//! | `$name`      | the variable's text, or left as written  |
//! | `$` + other  | `$`                                      |
//!
//! A name is an ASCII letter followed by letters and digits.

use super::scope::Scope;

const PI: &str = "3.141592653589793";
const E: &str = "2.718281828459045";

/// Expand `$` references in `text`.
///
/// `lookup` returns the text of a variable, or `None` when the name is
/// undefined or not a text variable; such references stay literal.
pub fn interpolate<F>(text: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos + 1..];

        // Bytes of `tail` consumed by this reference.
        let consumed = if let Some(after) = tail.strip_prefix('$') {
            if after.starts_with('n') {
                out.push('\n');
                2
            } else if after.starts_with('s') {
                out.push(' ');
                2
            } else {
                out.push('$');
                1
            }
        } else if tail.starts_with("_PI") {
            out.push_str(PI);
            3
        } else if tail.starts_with("_E") {
            out.push_str(E);
            2
        } else if tail.starts_with('_') {
            1
        } else if tail.starts_with(|c: char| c.is_ascii_alphabetic()) {
            let len = tail
                .find(|c: char| !c.is_ascii_alphanumeric())
                .unwrap_or(tail.len());
            let name = &tail[..len];
            match lookup(name) {
                Some(value) => out.push_str(&value),
                None => {
                    out.push('$');
                    out.push_str(name);
                }
            }
            len
        } else {
            out.push('$');
            0
        };

        rest = &tail[consumed..];
    }

    out.push_str(rest);
    out
}

/// Merged read view: `local` shadows `global`.
pub fn lookup_text(local: Option<&Scope>, global: &Scope, name: &str) -> Option<String> {
    let var = local
        .and_then(|scope| scope.get(name))
        .or_else(|| global.get(name))?;
    var.as_text().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use neet_types::Variable;
    use rstest::rstest;

    fn vars(name: &str) -> Option<String> {
        match name {
            "x" => Some("five".to_string()),
            "name" => Some("Ada".to_string()),
            "money" => Some("$$n".to_string()),
            _ => None,
        }
    }

    #[rstest]
    #[case::newline("a$$nb", "a\nb")]
    #[case::space("a$$sb", "a b")]
    #[case::dollar("cost: $$5", "cost: $5")]
    #[case::pi("$_PI", "3.141592653589793")]
    #[case::e("$_E", "2.718281828459045")]
    #[case::underscore_removed("a$_b", "ab")]
    #[case::variable("x is $x", "x is five")]
    #[case::variable_then_punct("$name!", "Ada!")]
    #[case::undefined("hello $foo", "hello $foo")]
    #[case::lone_dollar("a $ b", "a $ b")]
    #[case::trailing_dollar("end$", "end$")]
    #[case::digit_after_dollar("$5", "$5")]
    #[case::adjacent("$x$x", "fivefive")]
    #[case::underscore_ends_name("$x_y", "five_y")]
    #[case::no_rescan("$money", "$$n")]
    #[case::empty("", "")]
    fn grammar(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(interpolate(input, vars), expected);
    }

    #[test]
    fn local_shadows_global() {
        let mut global = Scope::new();
        let mut local = Scope::new();
        global.assign("v", Variable::text("global")).unwrap();
        local.assign("v", Variable::text("local")).unwrap();

        assert_eq!(lookup_text(Some(&local), &global, "v").as_deref(), Some("local"));
        assert_eq!(lookup_text(None, &global, "v").as_deref(), Some("global"));
    }

    #[test]
    fn non_text_stays_literal() {
        let mut global = Scope::new();
        global.assign("l", Variable::empty_list()).unwrap();
        let out = interpolate("$l", |n| lookup_text(None, &global, n));
        assert_eq!(out, "$l");
    }
}
