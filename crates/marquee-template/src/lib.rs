//! Marquee Template - Manifest template engine
//!
//! Renders manifest templates against an instance's variables. The syntax is
//! the familiar `{{ }}` action language:
//!
//! ```text
//! name: {{ .instance_id }}-web
//! {{- $hosts := split .hosts "," }}
//! hosts: {{ join $hosts "," | quote }}
//! {{ if .debug }}debug: true{{ else }}debug: false{{ end }}
//! {{ range $i, $h := $hosts }}- {{ $h }}{{ end }}
//! ```
//!
//! Templates are parsed once; rendering is a pure function of the parsed
//! template and the variable mapping. Undefined variables are errors rather
//! than empty output.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

mod error;
mod exec;
mod functions;
mod lexer;
mod manifest;
mod parser;
mod value;

pub use error::{Result, TemplateError};
pub use manifest::Manifest;
pub use value::Value;

use std::collections::BTreeMap;

/// A parsed template
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    nodes: Vec<parser::Node>,
}

impl Template {
    /// Parse template text. Syntax errors, unknown functions and arity
    /// mismatches are reported here.
    pub fn parse(name: impl Into<String>, text: &str) -> Result<Self> {
        let name = name.into();
        let nodes = parser::parse(&name, text)?;
        Ok(Self { name, nodes })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Render against a variable mapping
    pub fn render(&self, vars: &BTreeMap<String, String>) -> Result<String> {
        exec::Exec::new(&self.name, vars).run(&self.nodes)
    }
}

/// Parse and render in one go
pub fn render(name: &str, text: &str, vars: &BTreeMap<String, String>) -> Result<String> {
    Template::parse(name, text)?.render(vars)
}
