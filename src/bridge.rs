use crate::error::ApplyError;
use crate::models::{Language, Template};

/// A host application that owns named text fields a template can be applied to.
pub trait PromptHost {
    fn text_field_mut(&mut self, name: &str) -> Option<&mut String>;
}

/// Appends the template's prompt in `lang` to the host field `field`, separated
/// by a blank line when the field already holds text. Returns the committed value.
pub fn apply_template<H>(
    host: &mut H,
    field: &str,
    template: &Template,
    lang: Language,
) -> Result<String, ApplyError>
where
    H: PromptHost + ?Sized,
{
    let text = template
        .prompt
        .get(lang)
        .ok_or(ApplyError::MissingLanguageText(lang))?;
    let value = host
        .text_field_mut(field)
        .ok_or_else(|| ApplyError::NoTextFieldFound(field.to_string()))?;

    if !value.trim().is_empty() {
        value.push_str("\n\n");
    }
    value.push_str(text);
    Ok(value.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LocalizedText;
    use crate::testing::template;
    use std::collections::HashMap;

    struct Widgets(HashMap<String, String>);

    impl Widgets {
        fn with_prompt(value: &str) -> Self {
            Self(HashMap::from([("prompt".to_string(), value.to_string())]))
        }
    }

    impl PromptHost for Widgets {
        fn text_field_mut(&mut self, name: &str) -> Option<&mut String> {
            self.0.get_mut(name)
        }
    }

    fn with_prompt(zh: &str, en: &str) -> Template {
        let mut t = template("1", "Portrait", "1");
        t.prompt = LocalizedText::new(zh, en);
        t
    }

    #[test]
    fn appends_after_a_blank_line() {
        let mut host = Widgets::with_prompt("A");
        let committed = apply_template(&mut host, "prompt", &with_prompt("乙", "B"), Language::En)
            .expect("applied");
        assert_eq!(committed, "A\n\nB");
        assert_eq!(host.0["prompt"], "A\n\nB");
    }

    #[test]
    fn empty_field_takes_the_prompt_as_is() {
        let mut host = Widgets::with_prompt("");
        let committed = apply_template(&mut host, "prompt", &with_prompt("乙", "B"), Language::En)
            .expect("applied");
        assert_eq!(committed, "B");
    }

    #[test]
    fn whitespace_only_field_gets_no_separator() {
        let mut host = Widgets::with_prompt("  ");
        let committed = apply_template(&mut host, "prompt", &with_prompt("乙", "B"), Language::Zh)
            .expect("applied");
        assert_eq!(committed, "  乙");
    }

    #[test]
    fn empty_language_text_is_reported() {
        let mut host = Widgets::with_prompt("A");
        let err = apply_template(&mut host, "prompt", &with_prompt("乙", ""), Language::En)
            .expect_err("no english prompt");
        assert_eq!(err, ApplyError::MissingLanguageText(Language::En));
        assert_eq!(host.0["prompt"], "A");
    }

    #[test]
    fn missing_field_is_reported() {
        let mut host = Widgets(HashMap::new());
        let err = apply_template(&mut host, "prompt", &with_prompt("乙", "B"), Language::En)
            .expect_err("no field");
        assert_eq!(err, ApplyError::NoTextFieldFound("prompt".into()));
    }
}
