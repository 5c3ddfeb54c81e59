/*!
output.rs - result renderers.

Formats (selected with --format):
  pretty : Python literal repr (sorted keys), containers broken one item
           per line when they would run past 80 columns
  json   : compact JSON on one line
  shell  : flattened `NAME=value` assignments suitable for `eval`

Shell flattening for base name `x`:
  {"a":1,"b":2} -> x_keys="x_a x_b", x_a=1, x_b=2
  [10,20]       -> x_length=2, x_0=10, x_1=20
  nested values recurse with the derived name.

Key characters outside [A-Za-z0-9_] become `_`. When two keys of one mapping
land on the same name, later ones (in sorted key order) get `_2`, `_3`, ...
  {"a-b":1,"a_b":2} -> x_keys="x_a_b x_a_b_2", x_a_b=1, x_a_b_2=2

None of these touch ANSI styling; output is meant to be piped.
*/

use std::collections::HashSet;
use std::fmt;
use std::io::{self, Write};

use serde_json::Value;

const PRETTY_WIDTH: usize = 80;

#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum OutputFormat {
    #[default]
    Pretty,
    Json,
    Shell,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OutputFormat::Pretty => "pretty",
            OutputFormat::Json => "json",
            OutputFormat::Shell => "shell",
        };
        f.write_str(s)
    }
}

/// Write `value` to `out` in the chosen format. `name` is the base variable
/// name for shell output and ignored otherwise.
pub fn render<W: Write>(
    format: OutputFormat,
    name: &str,
    value: &Value,
    out: &mut W,
) -> io::Result<()> {
    match format {
        OutputFormat::Pretty => writeln!(out, "{}", pretty(value)),
        OutputFormat::Json => {
            serde_json::to_writer(&mut *out, value)?;
            writeln!(out)
        }
        OutputFormat::Shell => {
            for line in shell_lines(name, value) {
                writeln!(out, "{line}")?;
            }
            Ok(())
        }
    }
}

/* ---- Pretty ---- */

pub fn pretty(value: &Value) -> String {
    let mut out = String::new();
    write_pretty(&mut out, value, 0, 0);
    out
}

/// `allowance` counts the closing brackets and comma that will follow the
/// value on its last line.
fn write_pretty(out: &mut String, value: &Value, column: usize, allowance: usize) {
    let flat = repr(value);
    if column + flat.chars().count() + allowance <= PRETTY_WIDTH {
        out.push_str(&flat);
        return;
    }
    match value {
        Value::Array(items) => {
            out.push('[');
            let last = items.len().saturating_sub(1);
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(",\n");
                    out.push_str(&" ".repeat(column + 1));
                }
                let tail = if i == last { allowance + 1 } else { 1 };
                write_pretty(out, item, column + 1, tail);
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            let last = map.len().saturating_sub(1);
            for (i, (k, v)) in sorted_entries(map).into_iter().enumerate() {
                if i > 0 {
                    out.push_str(",\n");
                    out.push_str(&" ".repeat(column + 1));
                }
                let key = format!("{}: ", quote_str(k));
                out.push_str(&key);
                let tail = if i == last { allowance + 1 } else { 1 };
                write_pretty(out, v, column + 1 + key.chars().count(), tail);
            }
            out.push('}');
        }
        // long scalars stay on one line
        _ => out.push_str(&flat),
    }
}

/// Single-line repr in Python literal syntax.
fn repr(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote_str(s),
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(repr).collect();
            format!("[{}]", inner.join(", "))
        }
        Value::Object(map) => {
            let inner: Vec<String> = sorted_entries(map)
                .into_iter()
                .map(|(k, v)| format!("{}: {}", quote_str(k), repr(v)))
                .collect();
            format!("{{{}}}", inner.join(", "))
        }
    }
}

/// Single quotes unless the text contains `'` and no `"`.
fn quote_str(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

fn sorted_entries(map: &serde_json::Map<String, Value>) -> Vec<(&String, &Value)> {
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
}

/* ---- Shell ---- */

/// Flatten `value` into shell assignments rooted at `name`.
pub fn shell_lines(name: &str, value: &Value) -> Vec<String> {
    let mut lines = Vec::new();
    push_shell(&mut lines, &shell_ident(name), value);
    lines
}

fn push_shell(lines: &mut Vec<String>, name: &str, value: &Value) {
    match value {
        Value::Object(map) => {
            let entries = sorted_entries(map);
            let mut taken = HashSet::new();
            let children: Vec<String> = entries
                .iter()
                .map(|(k, _)| {
                    let base = format!("{name}_{}", shell_ident(k));
                    let mut child = base.clone();
                    let mut n = 2;
                    while !taken.insert(child.clone()) {
                        child = format!("{base}_{n}");
                        n += 1;
                    }
                    child
                })
                .collect();
            lines.push(format!("{name}_keys={}", shell_escape(&children.join(" "))));
            for (child, (_, v)) in children.iter().zip(entries) {
                push_shell(lines, child, v);
            }
        }
        Value::Array(items) => {
            lines.push(format!("{name}_length={}", items.len()));
            for (idx, item) in items.iter().enumerate() {
                push_shell(lines, &format!("{name}_{idx}"), item);
            }
        }
        scalar => lines.push(format!("{name}={}", shell_escape(&scalar_text(scalar)))),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Variable-name safe form: anything outside `[A-Za-z0-9_]` becomes `_`.
fn shell_ident(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Leave simple words bare, otherwise double-quote with `\ " $ `` escaped.
pub fn shell_escape(s: &str) -> String {
    let is_safe = |c: char| c.is_ascii_alphanumeric() || "_@%+=:,./-".contains(c);
    if !s.is_empty() && s.chars().all(is_safe) {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        if matches!(c, '\\' | '"' | '$' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/* ---- Tests ---- */
