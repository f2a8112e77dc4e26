//! Prompt templating.
//!
//! Two syntaxes are supported:
//! - [`TemplateSyntax::Plain`]: Jinja-style named slots (`{{ skills }}`), rendered with `tera`.
//! - [`TemplateSyntax::Block`]: Handlebars substitution inside role-tagged
//!   `<message role="...">` blocks. Every block is rendered on its own and the
//!   text around the blocks is kept as-is, so the result is still one string.
//!
//! Every `{{name}}` reference, including Handlebars helper arguments such as
//! `{{#if name}}`, must be bound; rendering fails with
//! [`TemplateError::UnboundParameter`] otherwise. In the plain syntax only
//! `{{ }}` tags are syntax: `{%` and `{#` are ordinary text. `\{{` is a
//! literal `{{` in both syntaxes.
mod blocks;
mod scan;

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use crate::error::TemplateError;
use crate::transcript::Turn;

/// Parameter name to value.
pub type Bindings = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TemplateSyntax {
    #[default]
    Plain,
    Block,
}

/// Render `template` against `bindings` into the prompt text sent as one user turn.
pub fn render(
    template: &str,
    syntax: TemplateSyntax,
    bindings: &Bindings,
) -> Result<String, TemplateError> {
    check_bindings(template, syntax, bindings)?;

    let rendered = match syntax {
        TemplateSyntax::Plain => render_plain(template, bindings)?,
        TemplateSyntax::Block => blocks::render(template, bindings)?,
    };

    tracing::debug!(?syntax, bytes = rendered.len(), "Rendered prompt template");
    Ok(rendered)
}

/// Render a block template into its role/content pairs.
/// A template without any `<message>` block becomes a single user turn.
pub fn render_messages(template: &str, bindings: &Bindings) -> Result<Vec<Turn>, TemplateError> {
    check_bindings(template, TemplateSyntax::Block, bindings)?;
    blocks::render_messages(template, bindings)
}

/// Binding names a template reads, in order of first appearance.
/// Dotted paths report their root (`{{user.name}}` yields `user`).
pub fn placeholders(template: &str, syntax: TemplateSyntax) -> Vec<&str> {
    let mut names = Vec::new();

    for piece in scan::pieces(template, syntax) {
        if let scan::Piece::Tag { text, inner } = piece {
            for name in scan::references(text, inner, syntax) {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
    }

    names
}

fn check_bindings(
    template: &str,
    syntax: TemplateSyntax,
    bindings: &Bindings,
) -> Result<(), TemplateError> {
    match placeholders(template, syntax)
        .into_iter()
        .find(|name| !bindings.contains_key(*name))
    {
        Some(name) => Err(TemplateError::UnboundParameter(name.to_string())),
        None => Ok(()),
    }
}

fn render_plain(template: &str, bindings: &Bindings) -> Result<String, TemplateError> {
    let context = tera::Context::from_serialize(bindings)?;
    Ok(tera::Tera::one_off(&scan::escape_plain(template), &context, false)?)
}

/// A template together with its syntax and variables.
/// Set variables with the fluent builder (or from any type that implements Serialize), then render.
///
/// Usage:
/// ```rust
/// use rig_prompt_turns::PromptTemplate;
///
/// let str = "Hello {{ user }}!";
///
/// let template = PromptTemplate::new(str)
///     .with_variable("user", "Rig");
///
/// let res = template.render_to_string().unwrap();
/// assert_eq!(res, "Hello Rig!".to_string());
/// ```
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
    syntax: TemplateSyntax,
    variables: Bindings,
}

impl PromptTemplate {
    /// Create a new plain-syntax PromptTemplate from a string.
    pub fn new(str: &str) -> Self {
        Self {
            template: str.to_string(),
            syntax: TemplateSyntax::Plain,
            variables: Bindings::new(),
        }
    }

    /// Create a new PromptTemplate from the text contents of a file.
    /// Files ending in `.hbs` or `.handlebars` use the block syntax.
    pub fn from_file<P>(path: P) -> Result<Self, TemplateError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let str = std::fs::read_to_string(path)?;

        let syntax = match path.extension().and_then(|ext| ext.to_str()) {
            Some("hbs" | "handlebars") => TemplateSyntax::Block,
            _ => TemplateSyntax::Plain,
        };

        Ok(Self::new(&str).with_syntax(syntax))
    }

    pub fn with_syntax(mut self, syntax: TemplateSyntax) -> Self {
        self.syntax = syntax;
        self
    }

    /// Set a variable for use in the prompt template.
    pub fn with_variable<V>(mut self, k: &str, v: V) -> Self
    where
        V: Into<String>,
    {
        self.set_variable(k, v);
        self
    }

    /// Add variables from a type that serializes to a flat map (ie, a hashmap, a struct, etc...).
    /// Numbers and booleans are stringified, null becomes an empty string.
    pub fn with_variables_from_serialize<V>(mut self, v: V) -> Result<Self, TemplateError>
    where
        V: Serialize,
    {
        let value =
            serde_json::to_value(v).map_err(|e| TemplateError::Variables(e.to_string()))?;

        let map = match value {
            serde_json::Value::Object(map) => map,
            other => {
                return Err(TemplateError::Variables(format!("expected a map, got {other}")));
            }
        };

        for (k, v) in map {
            let v = match v {
                serde_json::Value::String(s) => s,
                serde_json::Value::Null => String::new(),
                scalar @ (serde_json::Value::Bool(_) | serde_json::Value::Number(_)) => {
                    scalar.to_string()
                }
                other => {
                    return Err(TemplateError::Variables(format!(
                        "`{k}` is not a scalar: {other}"
                    )));
                }
            };
            self.variables.insert(k, v);
        }

        Ok(self)
    }

    /// Sets a variable using &mut.
    pub fn set_variable<V>(&mut self, k: &str, v: V)
    where
        V: Into<String>,
    {
        self.variables.insert(k.to_string(), v.into());
    }

    pub fn syntax(&self) -> TemplateSyntax {
        self.syntax
    }

    /// Binding names this template reads.
    pub fn placeholders(&self) -> Vec<&str> {
        placeholders(&self.template, self.syntax)
    }

    /// Renders the template as a string.
    pub fn render_to_string(&self) -> Result<String, TemplateError> {
        render(&self.template, self.syntax, &self.variables)
    }

    /// Renders the template as role-tagged turns.
    /// Plain templates always produce a single user turn.
    pub fn render_messages(&self) -> Result<Vec<Turn>, TemplateError> {
        match self.syntax {
            TemplateSyntax::Plain => Ok(vec![Turn::user(self.render_to_string()?)]),
            TemplateSyntax::Block => render_messages(&self.template, &self.variables),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::Role;

    fn bindings(pairs: &[(&str, &str)]) -> Bindings {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn prompt_template_works() {
        let res = PromptTemplate::new("Hello, {{user}}!")
            .with_variable("user", "world")
            .render_to_string()
            .unwrap();
        assert_eq!(res, "Hello, world!");
    }

    #[test]
    fn plain_substitutes_named_slots() {
        let res = render(
            "Skills: {{skills}}. Interests: {{interests}}.",
            TemplateSyntax::Plain,
            &bindings(&[("skills", "Python"), ("interests", "Music")]),
        )
        .unwrap();
        assert_eq!(res, "Skills: Python. Interests: Music.");
    }

    #[test]
    fn rendering_is_deterministic() {
        let b = bindings(&[("a", "1"), ("b", "2")]);
        let first = render("{{a}}-{{b}}-{{a}}", TemplateSyntax::Plain, &b).unwrap();
        let second = render("{{a}}-{{b}}-{{a}}", TemplateSyntax::Plain, &b).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, "1-2-1");
    }

    #[test]
    fn template_without_placeholders_is_unchanged() {
        let text = "Return JSON:\n{\n  \"recommendedRoles\": []\n}";
        let empty = Bindings::new();
        assert_eq!(render(text, TemplateSyntax::Plain, &empty).unwrap(), text);

        let block = "<message role=\"system\">Be kind.</message>\n\n<message role=\"user\">Hi</message>";
        assert_eq!(render(block, TemplateSyntax::Block, &empty).unwrap(), block);
    }

    #[test]
    fn unbound_parameter_fails() {
        let err = render(
            "Skills: {{skills}}. Interests: {{interests}}.",
            TemplateSyntax::Plain,
            &bindings(&[("skills", "Python")]),
        )
        .unwrap_err();
        assert!(matches!(err, TemplateError::UnboundParameter(name) if name == "interests"));

        let err = render(
            "<message role=\"user\">{{x}}</message>",
            TemplateSyntax::Block,
            &Bindings::new(),
        )
        .unwrap_err();
        assert!(matches!(err, TemplateError::UnboundParameter(name) if name == "x"));
    }

    #[test]
    fn block_renders_every_occurrence() {
        let template = "<message role=\"user\">{{x}}</message>\n<message role=\"user\">{{x}}</message>";
        let b = bindings(&[("x", "A")]);

        let rendered = render(template, TemplateSyntax::Block, &b).unwrap();
        assert_eq!(
            rendered,
            "<message role=\"user\">A</message>\n<message role=\"user\">A</message>"
        );

        let turns = render_messages(template, &b).unwrap();
        assert_eq!(turns, vec![Turn::user("A"), Turn::user("A")]);
    }

    #[test]
    fn block_does_not_escape_html() {
        let res = render(
            "<message role=\"user\">{{x}}</message>",
            TemplateSyntax::Block,
            &bindings(&[("x", "C# & <Rust>")]),
        )
        .unwrap();
        assert_eq!(res, "<message role=\"user\">C# & <Rust></message>");
    }

    #[test]
    fn placeholders_follow_the_syntax() {
        let block = PromptTemplate::new(
            "{{#if a}}{{ b }}{{else if h}}{{{c}}}{{/if}} {{!-- {{z}} --}} {{lookup e.f key=k}} {{~g~}} \\{{y}} {{b}}",
        )
        .with_syntax(TemplateSyntax::Block);
        assert_eq!(block.placeholders(), vec!["a", "b", "h", "c", "e", "g"]);

        let plain = PromptTemplate::new(
            "{{ a }} {{- b -}} {{ c | upper }} {{ d.e }} {{ 1 + 2 }} {{ true }} \\{{ f }} {# g #} {% h %}",
        );
        assert_eq!(plain.placeholders(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn engine_delimiters_render_unchanged() {
        let empty = Bindings::new();

        for text in [
            "Rate C# {#1 to 10}",
            "Give a {% of time",
            "{% raw %}{# not a comment #}{% endraw %}",
            "JSON: {\"a\": {\"b\": []}} and {{ unclosed",
        ] {
            assert_eq!(render(text, TemplateSyntax::Plain, &empty).unwrap(), text);
        }

        let block = "<message role=\"system\">Rate C# {#1 to 10}</message>\n<message role=\"user\">Give a {% of time</message>";
        assert_eq!(render(block, TemplateSyntax::Block, &empty).unwrap(), block);
    }

    #[test]
    fn escaped_braces_are_literal() {
        let empty = Bindings::new();
        assert_eq!(
            render("a \\{{b}}", TemplateSyntax::Plain, &empty).unwrap(),
            "a {{b}}"
        );
        assert_eq!(
            render("<message role=\"user\">a \\{{b}}</message>", TemplateSyntax::Block, &empty)
                .unwrap(),
            "<message role=\"user\">a {{b}}</message>"
        );
    }

    #[test]
    fn helper_arguments_must_be_bound() {
        let template = "<message role=\"user\">{{#if x}}y{{/if}}</message>";

        let err = render(template, TemplateSyntax::Block, &Bindings::new()).unwrap_err();
        assert!(matches!(err, TemplateError::UnboundParameter(name) if name == "x"));

        let res = render(template, TemplateSyntax::Block, &bindings(&[("x", "yes")])).unwrap();
        assert_eq!(res, "<message role=\"user\">y</message>");
    }

    #[test]
    fn engine_failures_keep_their_source() {
        let err = render(
            "{{ x | no_such_filter }}",
            TemplateSyntax::Plain,
            &bindings(&[("x", "1")]),
        )
        .unwrap_err();
        assert!(matches!(err, TemplateError::Tera(_)));

        let err = render(
            "<message role=\"user\">{{#if x}}open</message>",
            TemplateSyntax::Block,
            &bindings(&[("x", "1")]),
        )
        .unwrap_err();
        assert!(matches!(err, TemplateError::Handlebars(_)));
    }

    #[test]
    fn variables_from_serialize_stringify_scalars() {
        #[derive(Serialize)]
        struct Vars {
            name: &'static str,
            years: u32,
            remote: bool,
        }

        let template = PromptTemplate::new("{{name}} / {{years}} / {{remote}}")
            .with_variables_from_serialize(Vars {
                name: "Ada",
                years: 3,
                remote: true,
            })
            .unwrap();
        assert_eq!(template.render_to_string().unwrap(), "Ada / 3 / true");

        let err = PromptTemplate::new("x")
            .with_variables_from_serialize(vec![1, 2])
            .unwrap_err();
        assert!(matches!(err, TemplateError::Variables(_)));
    }

    #[test]
    fn plain_template_renders_to_one_user_turn() {
        let turns = PromptTemplate::new("Hi {{who}}")
            .with_variable("who", "there")
            .render_messages()
            .unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].content, "Hi there");
    }

    #[test]
    fn from_file_picks_syntax_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gap.hbs");
        std::fs::write(&path, "<message role=\"user\">{{role}}</message>").unwrap();

        let template = PromptTemplate::from_file(&path)
            .unwrap()
            .with_variable("role", "Game Developer");
        assert_eq!(template.syntax(), TemplateSyntax::Block);
        assert_eq!(
            template.render_messages().unwrap(),
            vec![Turn::user("Game Developer")]
        );

        assert!(matches!(
            PromptTemplate::from_file(dir.path().join("missing.txt")),
            Err(TemplateError::Io(_))
        ));
    }
}
