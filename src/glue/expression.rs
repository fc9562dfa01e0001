//! Step patterns
//!
//! Supports Cucumber expressions (`I have {int} cukes`) and raw regular
//! expressions (anything anchored with `^` or `$`).

use regex::Regex;
use std::fmt;

use crate::error::{RunnerError, RunnerResult};

/// Parameter types understood inside `{...}`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamType {
    Int,
    Float,
    Word,
    String,
    Anonymous,
    /// Capture group of a raw regular expression
    Group,
}

impl ParamType {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "int" => Some(ParamType::Int),
            "float" => Some(ParamType::Float),
            "word" => Some(ParamType::Word),
            "string" => Some(ParamType::String),
            "" => Some(ParamType::Anonymous),
            _ => None,
        }
    }

    fn regex(&self) -> &'static str {
        match self {
            ParamType::Int => r"(-?\d+)",
            ParamType::Float => r"(-?\d*\.?\d+)",
            ParamType::Word => r"([^\s]+)",
            ParamType::String => r#"(?:"([^"]*)"|'([^']*)')"#,
            ParamType::Anonymous => r"(.*)",
            ParamType::Group => "",
        }
    }

    /// Capture groups the parameter occupies
    fn groups(&self) -> usize {
        match self {
            ParamType::String => 2,
            _ => 1,
        }
    }
}

/// A compiled step pattern
#[derive(Clone, Debug)]
pub struct StepExpression {
    source: String,
    regex: Regex,
    params: Vec<ParamType>,
}

impl StepExpression {
    pub fn parse(pattern: &str) -> RunnerResult<Self> {
        if pattern.starts_with('^') || pattern.ends_with('$') {
            let mut anchored = pattern.to_string();
            if !anchored.starts_with('^') {
                anchored.insert(0, '^');
            }
            if !anchored.ends_with('$') {
                anchored.push('$');
            }
            let regex = Regex::new(&anchored).map_err(|e| invalid(pattern, e))?;
            let params = vec![ParamType::Group; regex.captures_len() - 1];
            return Ok(Self {
                source: pattern.to_string(),
                regex,
                params,
            });
        }

        let (body, params) = translate(pattern).map_err(|e| invalid(pattern, e))?;
        let regex = Regex::new(&format!("^{body}$")).map_err(|e| invalid(pattern, e))?;

        Ok(Self {
            source: pattern.to_string(),
            regex,
            params,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn params(&self) -> &[ParamType] {
        &self.params
    }

    /// Match the full step text, returning one argument per parameter
    pub fn captures(&self, text: &str) -> Option<Vec<String>> {
        let caps = self.regex.captures(text)?;
        let mut args = Vec::with_capacity(self.params.len());
        let mut group = 1;

        for param in &self.params {
            let value = (group..group + param.groups())
                .find_map(|g| caps.get(g))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            args.push(value);
            group += param.groups();
        }

        Some(args)
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl fmt::Display for StepExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn invalid(pattern: &str, e: impl fmt::Display) -> RunnerError {
    RunnerError::config(format!("Invalid step pattern '{pattern}': {e}"))
}

/// Translate a Cucumber expression into a regex body
fn translate(pattern: &str) -> Result<(String, Vec<ParamType>), String> {
    let mut out = String::new();
    let mut params = Vec::new();
    let mut chars = pattern.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    out.push_str(&regex::escape(&next.to_string()));
                }
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(ch) => name.push(ch),
                        None => return Err("unterminated parameter".to_string()),
                    }
                }
                let param = ParamType::from_name(name.trim())
                    .ok_or_else(|| format!("unknown parameter type {{{name}}}"))?;
                out.push_str(param.regex());
                params.push(param);
            }
            '(' => {
                let mut optional = String::new();
                loop {
                    match chars.next() {
                        Some(')') => break,
                        Some(ch) => optional.push(ch),
                        None => return Err("unterminated optional text".to_string()),
                    }
                }
                out.push_str(&format!("(?:{})?", regex::escape(&optional)));
            }
            _ => out.push_str(&regex::escape(&c.to_string())),
        }
    }

    Ok((out, params))
}

/// Suggest a Cucumber expression for an undefined step
pub fn suggest_expression(text: &str) -> String {
    let mut out = String::new();
    let mut rest = text;

    while !rest.is_empty() {
        let c = rest.chars().next().unwrap_or_default();
        if c == '"' || c == '\'' {
            if let Some(end) = rest[1..].find(c) {
                out.push_str("{string}");
                rest = &rest[end + 2..];
                continue;
            }
        }
        if c.is_ascii_digit() || (c == '-' && rest[1..].starts_with(|d: char| d.is_ascii_digit())) {
            let prev_is_word = out.chars().last().is_some_and(|p| p.is_alphanumeric());
            if !prev_is_word {
                let len = rest
                    .char_indices()
                    .skip(1)
                    .find(|(_, ch)| !(ch.is_ascii_digit() || *ch == '.'))
                    .map(|(i, _)| i)
                    .unwrap_or(rest.len());
                let number = &rest[..len];
                let next_is_word = rest[len..].starts_with(|ch: char| ch.is_alphanumeric());
                if !next_is_word && !number.ends_with('.') {
                    out.push_str(if number.contains('.') { "{float}" } else { "{int}" });
                    rest = &rest[len..];
                    continue;
                }
            }
        }
        match c {
            '{' | '}' | '(' | ')' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
        rest = &rest[c.len_utf8()..];
    }

    out
}

/// Rust snippet for an undefined step
pub fn snippet(keyword: &str, text: &str, has_docstring: bool, has_table: bool) -> String {
    let method = match keyword.trim().to_lowercase().as_str() {
        "when" => "when",
        "then" => "then",
        _ => "given",
    };
    let mut extra = String::new();
    if has_docstring {
        extra.push_str("        let _body = ctx.docstring()?;\n");
    }
    if has_table {
        extra.push_str("        let _rows = ctx.table()?;\n");
    }
    format!(
        "registry.{method}({:?}, |world, ctx| {{\n    Box::pin(async move {{\n{extra}        Err(anyhow::anyhow!(\"pending\"))\n    }})\n}})?;",
        suggest_expression(text)
    )
}
