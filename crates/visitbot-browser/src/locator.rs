//! Element locators.
//!
//! A [`Locator`] is either a CSS selector or an XPath expression. The XPath
//! builders mirror how a human finds things on a form: a field by its label,
//! a button by its caption, a checkbox by the text next to it. All builders
//! produce relative expressions (`.//`) so they honour a lookup scope.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn xpath(expression: impl Into<String>) -> Self {
        Locator::XPath(expression.into())
    }

    /// Text input or textarea identified by id, name, placeholder or label text.
    pub fn field(label: &str) -> Self {
        let lit = xpath_literal(label);
        Locator::XPath(format!(
            ".//*[self::input or self::textarea][not(@type='hidden')]\
             [@id={lit} or @name={lit} or @placeholder={lit} \
             or @id=//label[normalize-space(.)={lit}]/@for]"
        ))
    }

    /// Link or button whose caption (or submit value) equals `text`.
    pub fn link_or_button(text: &str) -> Self {
        let lit = xpath_literal(text);
        Locator::XPath(format!(
            ".//a[normalize-space(.)={lit}] \
             | .//button[normalize-space(.)={lit}] \
             | .//input[@type='submit' or @type='button'][@value={lit}]"
        ))
    }

    /// Checkbox identified by id, name, or the text of its label.
    pub fn checkbox(label: &str) -> Self {
        let lit = xpath_literal(label);
        Locator::XPath(format!(
            ".//input[@type='checkbox']\
             [@id={lit} or @name={lit} \
             or @id=//label[normalize-space(.)={lit}]/@for \
             or ancestor::label[normalize-space(.)={lit}]]"
        ))
    }

    /// Select option by its visible text.
    pub fn option(text: &str) -> Self {
        let lit = xpath_literal(text);
        Locator::XPath(format!(".//option[normalize-space(.)={lit}]"))
    }

    /// W3C location strategy name.
    pub fn strategy(&self) -> &'static str {
        match self {
            Locator::Css(_) => "css selector",
            Locator::XPath(_) => "xpath",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Locator::Css(value) | Locator::XPath(value) => value,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(value) => write!(f, "css `{}`", value),
            Locator::XPath(value) => write!(f, "xpath `{}`", value),
        }
    }
}

/// Quote a string for use inside an XPath 1.0 expression.
pub fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        return format!("'{}'", value);
    }
    if !value.contains('"') {
        return format!("\"{}\"", value);
    }

    let parts = value
        .split('\'')
        .map(|part| format!("'{}'", part))
        .collect::<Vec<_>>()
        .join(", \"'\", ");
    format!("concat({})", parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_quoting_picks_safe_delimiters() {
        assert_eq!(xpath_literal("Hasło"), "'Hasło'");
        assert_eq!(xpath_literal("it's"), "\"it's\"");
        assert_eq!(
            xpath_literal(r#"a'b"c"#),
            r#"concat('a', "'", 'b"c')"#
        );
    }

    #[test]
    fn builders_are_scoped_xpath() {
        for locator in [
            Locator::field("Login"),
            Locator::link_or_button("Zaloguj się"),
            Locator::checkbox("Akceptuję regulamin"),
            Locator::option("Kraków"),
        ] {
            assert_eq!(locator.strategy(), "xpath");
            assert!(locator.value().starts_with(".//"), "{locator}");
        }
        assert!(Locator::option("Kraków").value().contains("'Kraków'"));
    }

    #[test]
    fn css_locator_display() {
        let locator = Locator::css("#Results");
        assert_eq!(locator.strategy(), "css selector");
        assert_eq!(locator.to_string(), "css `#Results`");
    }
}
