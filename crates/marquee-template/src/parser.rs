//! Parser: recursive descent over lexer items
//!
//! Produces the node tree the executor walks. Function names and arities are
//! checked here so a bad manifest fails when it is loaded, not when an
//! instance is deployed.

use crate::error::{Result, TemplateError};
use crate::functions;
use crate::lexer::{lex, Item, Token};
use crate::value::Value;

#[derive(Debug, Clone)]
pub(crate) enum Node {
    Text(String),
    Output(Pipeline),
    Declare {
        var: String,
        pipeline: Pipeline,
        reassign: bool,
    },
    If {
        cond: Pipeline,
        then: Vec<Node>,
        otherwise: Vec<Node>,
    },
    Range {
        index_var: Option<String>,
        value_var: Option<String>,
        pipeline: Pipeline,
        body: Vec<Node>,
        otherwise: Vec<Node>,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct Pipeline {
    pub commands: Vec<Command>,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub(crate) enum Command {
    Call { func: String, args: Vec<Operand> },
    Operand(Operand),
}

#[derive(Debug, Clone)]
pub(crate) enum Operand {
    Field(String),
    Variable(String),
    Literal(Value),
    Sub(Pipeline),
}

/// How a list of nodes ended
enum Terminator {
    Eof,
    End { line: usize },
    Else { line: usize, tokens: Vec<Token> },
}

struct Parser<'a> {
    template: &'a str,
    items: Vec<Item>,
    pos: usize,
}

/// Parse template text into a node tree
pub(crate) fn parse(template: &str, input: &str) -> Result<Vec<Node>> {
    let items = lex(template, input)?;
    let mut parser = Parser {
        template,
        items,
        pos: 0,
    };

    let (nodes, term) = parser.parse_list()?;
    match term {
        Terminator::Eof => Ok(nodes),
        Terminator::End { line } => Err(parser.error(line, "unexpected {{end}}")),
        Terminator::Else { line, .. } => Err(parser.error(line, "unexpected {{else}}")),
    }
}

impl<'a> Parser<'a> {
    fn error(&self, line: usize, message: impl Into<String>) -> TemplateError {
        TemplateError::parse(self.template, line, message)
    }

    fn parse_list(&mut self) -> Result<(Vec<Node>, Terminator)> {
        let mut nodes = Vec::new();

        while self.pos < self.items.len() {
            let item = self.items[self.pos].clone();
            self.pos += 1;

            let (tokens, line) = match item {
                Item::Text(text) => {
                    nodes.push(Node::Text(text));
                    continue;
                }
                Item::Action { tokens, line } => (tokens, line),
            };

            match tokens.first() {
                Some(Token::Ident(kw)) if kw == "end" => {
                    if tokens.len() != 1 {
                        return Err(self.error(line, "unexpected arguments after end"));
                    }
                    return Ok((nodes, Terminator::End { line }));
                }
                Some(Token::Ident(kw)) if kw == "else" => {
                    return Ok((
                        nodes,
                        Terminator::Else {
                            line,
                            tokens: tokens[1..].to_vec(),
                        },
                    ));
                }
                Some(Token::Ident(kw)) if kw == "if" => {
                    let cond = self.parse_pipeline(&tokens[1..], line)?;
                    nodes.push(self.parse_if(cond, line)?);
                }
                Some(Token::Ident(kw)) if kw == "range" => {
                    nodes.push(self.parse_range(&tokens[1..], line)?);
                }
                Some(Token::Variable(var))
                    if matches!(tokens.get(1), Some(Token::Declare | Token::Assign)) =>
                {
                    let pipeline = self.parse_pipeline(&tokens[2..], line)?;
                    nodes.push(Node::Declare {
                        var: var.clone(),
                        pipeline,
                        reassign: tokens[1] == Token::Assign,
                    });
                }
                _ => nodes.push(Node::Output(self.parse_pipeline(&tokens, line)?)),
            }
        }

        Ok((nodes, Terminator::Eof))
    }

    fn parse_if(&mut self, cond: Pipeline, line: usize) -> Result<Node> {
        let (then, term) = self.parse_list()?;

        let otherwise = match term {
            Terminator::End { .. } => Vec::new(),
            Terminator::Else { line, tokens } if tokens.is_empty() => {
                let (otherwise, term) = self.parse_list()?;
                self.expect_end(term, line, "else")?;
                otherwise
            }
            Terminator::Else { line, tokens } => match tokens.first() {
                // `else if` shares the outer `end`
                Some(Token::Ident(kw)) if kw == "if" => {
                    let cond = self.parse_pipeline(&tokens[1..], line)?;
                    vec![self.parse_if(cond, line)?]
                }
                _ => return Err(self.error(line, "expected if after else")),
            },
            Terminator::Eof => return Err(self.error(line, "missing {{end}} for {{if}}")),
        };

        Ok(Node::If {
            cond,
            then,
            otherwise,
        })
    }

    fn parse_range(&mut self, tokens: &[Token], line: usize) -> Result<Node> {
        let (index_var, value_var, rest) = match tokens {
            [Token::Variable(i), Token::Comma, Token::Variable(v), Token::Declare, rest @ ..] => {
                (Some(i.clone()), Some(v.clone()), rest)
            }
            [Token::Variable(v), Token::Declare, rest @ ..] => (None, Some(v.clone()), rest),
            rest => (None, None, rest),
        };
        let pipeline = self.parse_pipeline(rest, line)?;

        let (body, term) = self.parse_list()?;
        let otherwise = match term {
            Terminator::End { .. } => Vec::new(),
            Terminator::Else { line, tokens } if tokens.is_empty() => {
                let (otherwise, term) = self.parse_list()?;
                self.expect_end(term, line, "else")?;
                otherwise
            }
            Terminator::Else { line, .. } => {
                return Err(self.error(line, "unexpected arguments after else in range"))
            }
            Terminator::Eof => return Err(self.error(line, "missing {{end}} for {{range}}")),
        };

        Ok(Node::Range {
            index_var,
            value_var,
            pipeline,
            body,
            otherwise,
        })
    }

    fn expect_end(&self, term: Terminator, line: usize, context: &str) -> Result<()> {
        match term {
            Terminator::End { .. } => Ok(()),
            Terminator::Else { line, .. } => Err(self.error(line, "unexpected {{else}}")),
            Terminator::Eof => Err(self.error(line, format!("missing {{{{end}}}} after {}", context))),
        }
    }

    fn parse_pipeline(&self, tokens: &[Token], line: usize) -> Result<Pipeline> {
        if tokens.is_empty() {
            return Err(self.error(line, "missing value for command"));
        }

        let mut commands = Vec::new();
        let mut depth = 0usize;
        let mut start = 0;
        for (i, token) in tokens.iter().enumerate() {
            match token {
                Token::LParen => depth += 1,
                Token::RParen => {
                    depth = depth
                        .checked_sub(1)
                        .ok_or_else(|| self.error(line, "unexpected )"))?;
                }
                Token::Pipe if depth == 0 => {
                    commands.push(self.parse_command(&tokens[start..i], line, !commands.is_empty())?);
                    start = i + 1;
                }
                _ => {}
            }
        }
        if depth != 0 {
            return Err(self.error(line, "unclosed ("));
        }
        commands.push(self.parse_command(&tokens[start..], line, !commands.is_empty())?);

        Ok(Pipeline { commands, line })
    }

    fn parse_command(&self, tokens: &[Token], line: usize, piped: bool) -> Result<Command> {
        let Some(first) = tokens.first() else {
            return Err(self.error(line, "missing command in pipeline"));
        };

        if let Token::Ident(func) = first {
            let args = self.parse_operands(&tokens[1..], line)?;
            let Some(arity) = functions::arity(func) else {
                return Err(self.error(line, format!("function {:?} not defined", func)));
            };
            let given = args.len() + usize::from(piped);
            if given != arity {
                return Err(self.error(
                    line,
                    format!("wrong number of args for {}: want {} got {}", func, arity, given),
                ));
            }
            return Ok(Command::Call {
                func: func.clone(),
                args,
            });
        }

        if piped {
            return Err(self.error(line, "non-function in pipeline stage"));
        }
        let mut operands = self.parse_operands(tokens, line)?;
        if operands.len() != 1 {
            return Err(self.error(line, "can't give argument to non-function"));
        }
        Ok(Command::Operand(operands.remove(0)))
    }

    fn parse_operands(&self, tokens: &[Token], line: usize) -> Result<Vec<Operand>> {
        let mut operands = Vec::new();
        let mut i = 0;

        while i < tokens.len() {
            let operand = match &tokens[i] {
                Token::Field(name) => Operand::Field(name.clone()),
                Token::Variable(name) => Operand::Variable(name.clone()),
                Token::Str(s) | Token::Number(s) => Operand::Literal(Value::Str(s.clone())),
                Token::Bool(b) => Operand::Literal(Value::Bool(*b)),
                Token::LParen => {
                    let close = matching_paren(tokens, i)
                        .ok_or_else(|| self.error(line, "unclosed ("))?;
                    let sub = self.parse_pipeline(&tokens[i + 1..close], line)?;
                    i = close;
                    Operand::Sub(sub)
                }
                Token::Ident(func) => {
                    return Err(self.error(
                        line,
                        format!("function {} used as an argument; wrap the call in parentheses", func),
                    ))
                }
                other => return Err(self.error(line, format!("unexpected {:?} in operand", other))),
            };
            operands.push(operand);
            i += 1;
        }

        Ok(operands)
    }
}

fn matching_paren(tokens: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}
