//! Executor: walks the node tree and produces output

use crate::error::{Result, TemplateError};
use crate::functions;
use crate::parser::{Command, Node, Operand, Pipeline};
use crate::value::Value;
use std::collections::{BTreeMap, HashMap};

pub(crate) struct Exec<'a> {
    template: &'a str,
    vars: &'a BTreeMap<String, String>,
    scopes: Vec<HashMap<String, Value>>,
    out: String,
}

impl<'a> Exec<'a> {
    pub(crate) fn new(template: &'a str, vars: &'a BTreeMap<String, String>) -> Self {
        Self {
            template,
            vars,
            scopes: vec![HashMap::new()],
            out: String::new(),
        }
    }

    pub(crate) fn run(mut self, nodes: &[Node]) -> Result<String> {
        self.walk(nodes)?;
        Ok(self.out)
    }

    fn walk(&mut self, nodes: &[Node]) -> Result<()> {
        for node in nodes {
            match node {
                Node::Text(text) => self.out.push_str(text),
                Node::Output(pipeline) => {
                    let value = self.eval_pipeline(pipeline)?;
                    self.out.push_str(&value.to_string());
                }
                Node::Declare {
                    var,
                    pipeline,
                    reassign,
                } => {
                    let value = self.eval_pipeline(pipeline)?;
                    let template = self.template;
                    if *reassign {
                        let slot = self
                            .scopes
                            .iter_mut()
                            .rev()
                            .find_map(|scope| scope.get_mut(var))
                            .ok_or_else(|| undefined(template, pipeline.line, &format!("${}", var)))?;
                        *slot = value;
                    } else if let Some(scope) = self.scopes.last_mut() {
                        scope.insert(var.clone(), value);
                    }
                }
                Node::If {
                    cond,
                    then,
                    otherwise,
                } => {
                    let branch = if self.eval_pipeline(cond)?.is_truthy() {
                        then
                    } else {
                        otherwise
                    };
                    self.scoped(branch, Vec::new())?;
                }
                Node::Range {
                    index_var,
                    value_var,
                    pipeline,
                    body,
                    otherwise,
                } => {
                    let items = match self.eval_pipeline(pipeline)? {
                        Value::List(items) => items,
                        other => {
                            return Err(TemplateError::exec(
                                self.template,
                                pipeline.line,
                                format!("range can't iterate over {}", other.type_name()),
                            ))
                        }
                    };

                    if items.is_empty() {
                        self.scoped(otherwise, Vec::new())?;
                        continue;
                    }

                    for (i, item) in items.into_iter().enumerate() {
                        let mut bindings = Vec::new();
                        if let Some(index_var) = index_var {
                            bindings.push((index_var.clone(), Value::Str(i.to_string())));
                        }
                        if let Some(value_var) = value_var {
                            bindings.push((value_var.clone(), Value::Str(item)));
                        }
                        self.scoped(body, bindings)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Walk nodes inside a fresh variable scope
    fn scoped(&mut self, nodes: &[Node], bindings: Vec<(String, Value)>) -> Result<()> {
        self.scopes.push(bindings.into_iter().collect());
        let result = self.walk(nodes);
        self.scopes.pop();
        result
    }

    fn eval_pipeline(&self, pipeline: &Pipeline) -> Result<Value> {
        let mut piped: Option<Value> = None;
        for command in &pipeline.commands {
            piped = Some(self.eval_command(command, piped.take(), pipeline.line)?);
        }
        piped.ok_or_else(|| TemplateError::exec(self.template, pipeline.line, "empty pipeline"))
    }

    fn eval_command(&self, command: &Command, piped: Option<Value>, line: usize) -> Result<Value> {
        match command {
            Command::Call { func, args } => {
                let mut values = args
                    .iter()
                    .map(|arg| self.eval_operand(arg, line))
                    .collect::<Result<Vec<_>>>()?;
                values.extend(piped);
                functions::call(func, values).map_err(|message| TemplateError::Function {
                    template: self.template.to_string(),
                    line,
                    func: func.clone(),
                    message,
                })
            }
            Command::Operand(operand) => self.eval_operand(operand, line),
        }
    }

    fn eval_operand(&self, operand: &Operand, line: usize) -> Result<Value> {
        match operand {
            Operand::Field(name) => self
                .vars
                .get(name)
                .map(|v| Value::Str(v.clone()))
                .ok_or_else(|| undefined(self.template, line, &format!(".{}", name))),
            Operand::Variable(name) => self
                .scopes
                .iter()
                .rev()
                .find_map(|scope| scope.get(name))
                .cloned()
                .ok_or_else(|| undefined(self.template, line, &format!("${}", name))),
            Operand::Literal(value) => Ok(value.clone()),
            Operand::Sub(pipeline) => self.eval_pipeline(pipeline),
        }
    }
}

fn undefined(template: &str, line: usize, var: &str) -> TemplateError {
    TemplateError::UndefinedVariable {
        template: template.to_string(),
        line,
        var: var.to_string(),
    }
}
