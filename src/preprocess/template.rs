//! Embedded-expression evaluation over raw config text.
//!
//! Supported tags:
//! - `<%= expr %>` emits the value of `expr` (`nil` emits nothing)
//! - `<% expr %>` evaluates `expr` and discards the result
//! - `<%# comment %>` is removed
//! - `<%%` emits a literal `<%`
//! - `-%>` swallows the newline that follows the tag
//! - `<%-` strips the indentation in front of the tag
//!
//! Expressions are deliberately small: string and number literals,
//! `true`/`false`/`nil`, `ENV['NAME']`, `ENV.fetch('NAME')`,
//! `ENV.fetch('NAME', default)`, `left || right` and `raise 'message'`.

use regex::Regex;
use std::sync::LazyLock;

static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(
		r#"^\s*(?:(?P<str>'(?:[^'\\]|\\.)*'|"(?:[^"\\]|\\.)*")|(?P<num>-?\d+(?:\.\d+)?)|(?P<ident>[A-Za-z_][A-Za-z0-9_]*)|(?P<punct>\|\||[\[\](),.]))"#,
	)
	.expect("token pattern is valid")
});

/// Errors raised while evaluating a config template.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
	#[error("Unterminated tag starting on line {line}")]
	Unterminated { line: usize },

	#[error("Syntax error on line {line}: {message}")]
	Syntax { line: usize, message: String },

	#[error("Template raised on line {line}: {message}")]
	Raised { line: usize, message: String },

	#[error("Environment variable not set on line {line}: {name}")]
	MissingVariable { line: usize, name: String },
}

/// Render a template against the process environment.
pub fn render(source: &str) -> Result<String, TemplateError> {
	render_with(source, &|name| std::env::var(name).ok())
}

/// Render a template, resolving `ENV` lookups through `lookup`.
pub fn render_with<F>(source: &str, lookup: &F) -> Result<String, TemplateError>
where
	F: Fn(&str) -> Option<String>,
{
	let mut output = String::with_capacity(source.len());
	let mut rest = source;

	while let Some(start) = rest.find("<%") {
		let line = line_at(source, source.len() - rest.len() + start);
		let text = &rest[..start];
		let after_open = &rest[start + 2..];

		if let Some(literal_rest) = after_open.strip_prefix('%') {
			output.push_str(text);
			output.push_str("<%");
			rest = literal_rest;
			continue;
		}

		let end = after_open
			.find("%>")
			.ok_or(TemplateError::Unterminated { line })?;
		let mut body = &after_open[..end];
		let mut remaining = &after_open[end + 2..];

		if let Some(stripped) = body.strip_prefix('-') {
			body = stripped;
			output.push_str(strip_indent(text));
		} else {
			output.push_str(text);
		}

		if let Some(stripped) = body.strip_suffix('-') {
			body = stripped;
			remaining = remaining
				.strip_prefix("\r\n")
				.or_else(|| remaining.strip_prefix('\n'))
				.unwrap_or(remaining);
		}

		if body.starts_with('#') {
			// comment
		} else if let Some(expr) = body.strip_prefix('=') {
			let value = evaluate(expr, line, lookup)?;
			output.push_str(&value.render());
		} else {
			evaluate(body, line, lookup)?;
		}

		rest = remaining;
	}

	output.push_str(rest);
	Ok(output)
}

/// Drop trailing spaces and tabs when they are the only thing on the line.
fn strip_indent(text: &str) -> &str {
	let trimmed = text.trim_end_matches([' ', '\t']);
	if trimmed.is_empty() || trimmed.ends_with('\n') {
		trimmed
	} else {
		text
	}
}

fn line_at(source: &str, offset: usize) -> usize {
	source[..offset].matches('\n').count() + 1
}

fn evaluate<F>(source: &str, line: usize, lookup: &F) -> Result<Scalar, TemplateError>
where
	F: Fn(&str) -> Option<String>,
{
	let tokens = tokenize(source, line)?;
	if tokens.is_empty() {
		return Ok(Scalar::Nil);
	}

	let mut parser = Parser {
		tokens,
		pos: 0,
		line,
	};
	let expr = parser.expression()?;
	if let Some(token) = parser.peek() {
		return Err(parser.syntax(format!("unexpected {token}")));
	}

	expr.eval(line, lookup)
}

/// Result of evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
enum Scalar {
	Nil,
	Bool(bool),
	Text(String),
}

impl Scalar {
	fn is_falsy(&self) -> bool {
		matches!(self, Scalar::Nil | Scalar::Bool(false))
	}

	fn render(&self) -> String {
		match self {
			Scalar::Nil => String::new(),
			Scalar::Bool(b) => b.to_string(),
			Scalar::Text(s) => s.clone(),
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
	Str(String),
	Num(String),
	Ident(String),
	Punct(String),
}

impl std::fmt::Display for Token {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Token::Str(s) => write!(f, "string '{s}'"),
			Token::Num(n) => write!(f, "number {n}"),
			Token::Ident(i) => write!(f, "`{i}`"),
			Token::Punct(p) => write!(f, "`{p}`"),
		}
	}
}

fn tokenize(source: &str, line: usize) -> Result<Vec<Token>, TemplateError> {
	let mut tokens = Vec::new();
	let mut rest = source;

	while !rest.trim().is_empty() {
		let caps = TOKEN.captures(rest).ok_or_else(|| TemplateError::Syntax {
			line,
			message: format!("unexpected input near `{}`", rest.trim()),
		})?;

		let token = if let Some(m) = caps.name("str") {
			Token::Str(unquote(m.as_str()))
		} else if let Some(m) = caps.name("num") {
			Token::Num(m.as_str().to_string())
		} else if let Some(m) = caps.name("ident") {
			Token::Ident(m.as_str().to_string())
		} else if let Some(m) = caps.name("punct") {
			Token::Punct(m.as_str().to_string())
		} else {
			unreachable!("token pattern always captures one group")
		};

		tokens.push(token);
		rest = &rest[caps[0].len()..];
	}

	Ok(tokens)
}

/// Strip the surrounding quotes from a string literal and resolve escapes.
fn unquote(literal: &str) -> String {
	let double = literal.starts_with('"');
	let inner = &literal[1..literal.len() - 1];
	let mut out = String::with_capacity(inner.len());
	let mut chars = inner.chars();

	while let Some(c) = chars.next() {
		if c != '\\' {
			out.push(c);
			continue;
		}
		match chars.next() {
			Some('n') if double => out.push('\n'),
			Some('t') if double => out.push('\t'),
			Some(escaped @ ('\\' | '\'' | '"')) => out.push(escaped),
			Some(other) => {
				out.push('\\');
				out.push(other);
			}
			None => out.push('\\'),
		}
	}

	out
}

#[derive(Debug)]
enum Expr {
	Literal(Scalar),
	Env(String),
	Fetch(String, Option<Box<Expr>>),
	Or(Box<Expr>, Box<Expr>),
	Raise(Box<Expr>),
}

impl Expr {
	fn eval<F>(&self, line: usize, lookup: &F) -> Result<Scalar, TemplateError>
	where
		F: Fn(&str) -> Option<String>,
	{
		match self {
			Expr::Literal(value) => Ok(value.clone()),
			Expr::Env(name) => Ok(lookup(name).map_or(Scalar::Nil, Scalar::Text)),
			Expr::Fetch(name, default) => match (lookup(name), default) {
				(Some(value), _) => Ok(Scalar::Text(value)),
				(None, Some(default)) => default.eval(line, lookup),
				(None, None) => Err(TemplateError::MissingVariable {
					line,
					name: name.clone(),
				}),
			},
			Expr::Or(left, right) => {
				let value = left.eval(line, lookup)?;
				if value.is_falsy() {
					right.eval(line, lookup)
				} else {
					Ok(value)
				}
			}
			Expr::Raise(message) => Err(TemplateError::Raised {
				line,
				message: message.eval(line, lookup)?.render(),
			}),
		}
	}
}

struct Parser {
	tokens: Vec<Token>,
	pos: usize,
	line: usize,
}

impl Parser {
	fn peek(&self) -> Option<&Token> {
		self.tokens.get(self.pos)
	}

	fn advance(&mut self) -> Option<Token> {
		let token = self.tokens.get(self.pos).cloned();
		self.pos += 1;
		token
	}

	fn eat_punct(&mut self, punct: &str) -> bool {
		if matches!(self.peek(), Some(Token::Punct(p)) if p == punct) {
			self.pos += 1;
			true
		} else {
			false
		}
	}

	fn expect_punct(&mut self, punct: &str) -> Result<(), TemplateError> {
		if self.eat_punct(punct) {
			Ok(())
		} else {
			Err(self.unexpected(&format!("`{punct}`")))
		}
	}

	fn expect_string(&mut self) -> Result<String, TemplateError> {
		match self.advance() {
			Some(Token::Str(s)) => Ok(s),
			_ => {
				self.pos -= 1;
				Err(self.unexpected("a string literal"))
			}
		}
	}

	fn syntax(&self, message: String) -> TemplateError {
		TemplateError::Syntax {
			line: self.line,
			message,
		}
	}

	fn unexpected(&self, wanted: &str) -> TemplateError {
		match self.peek() {
			Some(token) => self.syntax(format!("expected {wanted}, found {token}")),
			None => self.syntax(format!("expected {wanted}, found end of expression")),
		}
	}

	fn expression(&mut self) -> Result<Expr, TemplateError> {
		let mut expr = self.primary()?;
		while self.eat_punct("||") {
			let right = self.primary()?;
			expr = Expr::Or(Box::new(expr), Box::new(right));
		}
		Ok(expr)
	}

	fn primary(&mut self) -> Result<Expr, TemplateError> {
		match self.advance() {
			Some(Token::Str(s)) | Some(Token::Num(s)) => Ok(Expr::Literal(Scalar::Text(s))),
			Some(Token::Ident(ident)) => match ident.as_str() {
				"nil" => Ok(Expr::Literal(Scalar::Nil)),
				"true" => Ok(Expr::Literal(Scalar::Bool(true))),
				"false" => Ok(Expr::Literal(Scalar::Bool(false))),
				"ENV" => self.env(),
				"raise" => {
					let message = if self.eat_punct("(") {
						let inner = self.expression()?;
						self.expect_punct(")")?;
						inner
					} else {
						self.primary()?
					};
					Ok(Expr::Raise(Box::new(message)))
				}
				other => Err(self.syntax(format!("unknown identifier `{other}`"))),
			},
			Some(Token::Punct(p)) if p == "(" => {
				let inner = self.expression()?;
				self.expect_punct(")")?;
				Ok(inner)
			}
			Some(token) => Err(self.syntax(format!("unexpected {token}"))),
			None => Err(self.syntax("unexpected end of expression".to_string())),
		}
	}

	fn env(&mut self) -> Result<Expr, TemplateError> {
		if self.eat_punct("[") {
			let name = self.expect_string()?;
			self.expect_punct("]")?;
			return Ok(Expr::Env(name));
		}

		self.expect_punct(".")?;
		match self.advance() {
			Some(Token::Ident(method)) if method == "fetch" => {}
			_ => {
				self.pos -= 1;
				return Err(self.unexpected("`fetch`"));
			}
		}

		self.expect_punct("(")?;
		let name = self.expect_string()?;
		let default = if self.eat_punct(",") {
			Some(Box::new(self.expression()?))
		} else {
			None
		};
		self.expect_punct(")")?;

		Ok(Expr::Fetch(name, default))
	}
}
