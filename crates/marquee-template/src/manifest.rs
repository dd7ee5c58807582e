//! Named manifest templates

use crate::error::Result;
use crate::Template;
use std::collections::BTreeMap;

/// A manifest template as loaded from the manifest directory.
///
/// The source text is kept alongside the parsed form so it can be shown by
/// tooling and re-parsed if needed.
#[derive(Debug, Clone)]
pub struct Manifest {
    source: String,
    template: Template,
}

impl Manifest {
    /// Parse a manifest. The name is the file stem it was loaded from.
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Result<Self> {
        let source = text.into();
        let template = Template::parse(name, &source)?;
        Ok(Self { source, template })
    }

    pub fn name(&self) -> &str {
        self.template.name()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Render the manifest to YAML or JSON text
    pub fn render(&self, vars: &BTreeMap<String, String>) -> Result<String> {
        self.template.render(vars)
    }
}
