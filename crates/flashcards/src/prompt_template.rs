use include_dir::{include_dir, Dir};
use serde::Serialize;
use tera::{Context, Error as TeraError, Tera};

static PROMPTS: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/prompts");

/// Every prompt template, parsed once and shared by the services that render them.
#[derive(Debug, Clone)]
pub struct PromptSet {
    tera: Tera,
}

impl PromptSet {
    /// The templates compiled into the crate
    pub fn embedded() -> Result<Self, TeraError> {
        let templates = PROMPTS.files().filter_map(|file| {
            let name = file.path().to_str()?;
            let source = file.contents_utf8()?;
            Some((name, source))
        });
        Self::from_templates(templates)
    }

    /// Build a set from `(name, source)` pairs, e.g. to override the wording of a prompt
    pub fn from_templates<'a>(
        templates: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, TeraError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(templates)?;
        Ok(Self { tera })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|template| template == name)
    }

    pub fn render<T: Serialize>(&self, name: &str, context_data: &T) -> Result<String, TeraError> {
        let context = Context::from_serialize(context_data)?;
        self.tera.render(name, &context)
    }
}
