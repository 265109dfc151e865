//! Tokenizer and recursive-descent parser for condition expressions
//!
//! The grammar, lowest precedence first:
//!
//! ```text
//! program    := statement ((';' | newline) statement)*
//! statement  := oror (('and' | 'or') oror)*
//! oror       := andand ('||' andand)*
//! andand     := equality ('&&' equality)*
//! equality   := postfix (('==' | '!=') postfix)?
//! postfix    := primary ('.' name args? | '[' args ']')*
//! primary    := literal | CONST | ident args? | '(' statement ')' | '[' args ']' | shell-escape
//! ```

use crate::core::error::ConditionError;
use std::iter::Peekable;
use std::str::CharIndices;

/// Nesting limit for parentheses, arrays and argument lists
const MAX_DEPTH: usize = 32;

/// Words that start Ruby constructs the language does not support
const RESERVED: &[&str] = &[
    "alias", "begin", "break", "case", "class", "def", "defined?", "do", "else", "elsif", "end",
    "ensure", "for", "if", "in", "module", "next", "nil", "not", "redo", "rescue", "retry",
    "return", "self", "super", "then", "undef", "unless", "until", "when", "while", "yield",
];

/// Syntax tree for a condition expression
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Program(Vec<Node>),
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
    /// Method call. Comparisons are calls to `==`/`!=` on the left operand,
    /// subscripts are calls to `[]`.
    Call {
        receiver: Option<Box<Node>>,
        method: String,
        args: Vec<Node>,
    },
    Const(String),
    Str(String),
    Bool(bool),
    Int(i64),
    Symbol(String),
    Array(Vec<Node>),
    Parens(Box<Node>),
    /// Backtick or `%x{}` command
    ShellEscape(String),
}

impl Node {
    /// Short label used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Program(_) => "program",
            Node::And(..) => "and",
            Node::Or(..) => "or",
            Node::Call { .. } => "call",
            Node::Const(_) => "constant",
            Node::Str(_) => "string",
            Node::Bool(_) => "boolean",
            Node::Int(_) => "integer",
            Node::Symbol(_) => "symbol",
            Node::Array(_) => "array",
            Node::Parens(_) => "parentheses",
            Node::ShellEscape(_) => "shell escape",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Const(String),
    Str(String),
    Int(i64),
    Symbol(String),
    ShellEscape(String),
    True,
    False,
    KeywordAnd,
    KeywordOr,
    AndAnd,
    OrOr,
    Eq,
    NotEq,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Separator,
}

#[derive(Debug, Clone)]
struct Spanned {
    token: Token,
    offset: usize,
}

/// Parse a condition expression into a [`Node::Program`]
pub fn parse(input: &str) -> Result<Node, ConditionError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        end: input.len(),
    };
    parser.parse_program()
}

fn parse_error(offset: usize, message: impl Into<String>) -> ConditionError {
    ConditionError::Parse {
        offset,
        message: message.into(),
    }
}

fn tokenize(input: &str) -> Result<Vec<Spanned>, ConditionError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(offset, ch)) = chars.peek() {
        let token = match ch {
            ' ' | '\t' | '\r' => {
                chars.next();
                continue;
            }
            '\\' => {
                // line continuation
                chars.next();
                if matches!(chars.peek(), Some((_, '\n'))) {
                    chars.next();
                    continue;
                }
                return Err(parse_error(offset, "unexpected '\\'"));
            }
            '#' => {
                while let Some(&(_, c)) = chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    chars.next();
                }
                continue;
            }
            '\n' | ';' => {
                chars.next();
                Token::Separator
            }
            '\'' | '"' => {
                chars.next();
                Token::Str(consume_string(&mut chars, ch, offset)?)
            }
            '`' => {
                chars.next();
                Token::ShellEscape(consume_until(&mut chars, '`', offset)?)
            }
            '%' => {
                chars.next();
                match chars.next() {
                    Some((_, 'x')) => {
                        let close = match chars.next() {
                            Some((_, '{')) => '}',
                            Some((_, '(')) => ')',
                            Some((_, '[')) => ']',
                            Some((_, '<')) => '>',
                            Some((_, c)) if !c.is_alphanumeric() && !c.is_whitespace() => c,
                            _ => return Err(parse_error(offset, "malformed %x literal")),
                        };
                        Token::ShellEscape(consume_until(&mut chars, close, offset)?)
                    }
                    _ => return Err(parse_error(offset, "unsupported % literal")),
                }
            }
            '0'..='9' => Token::Int(consume_number(&mut chars, offset)?),
            ':' => {
                chars.next();
                match chars.peek() {
                    Some(&(_, c)) if c.is_alphabetic() || c == '_' => {
                        Token::Symbol(consume_word(&mut chars))
                    }
                    _ => return Err(parse_error(offset, "unsupported ':' syntax")),
                }
            }
            c if c.is_alphabetic() || c == '_' => {
                let word = consume_word(&mut chars);
                match word.as_str() {
                    "true" => Token::True,
                    "false" => Token::False,
                    "and" => Token::KeywordAnd,
                    "or" => Token::KeywordOr,
                    w if RESERVED.contains(&w) => {
                        return Err(parse_error(offset, format!("unsupported keyword `{}`", w)));
                    }
                    _ if word.starts_with(|c: char| c.is_uppercase()) => Token::Const(word),
                    _ => Token::Ident(word),
                }
            }
            '(' | ')' | '[' | ']' | ',' | '.' => {
                chars.next();
                match ch {
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    '[' => Token::LBracket,
                    ']' => Token::RBracket,
                    ',' => Token::Comma,
                    _ => Token::Dot,
                }
            }
            '&' | '|' => {
                chars.next();
                match chars.next() {
                    Some((_, c)) if c == ch => {
                        if ch == '&' {
                            Token::AndAnd
                        } else {
                            Token::OrOr
                        }
                    }
                    _ => return Err(parse_error(offset, format!("unsupported operator '{}'", ch))),
                }
            }
            '=' => {
                chars.next();
                match chars.next() {
                    Some((_, '=')) if !matches!(chars.peek(), Some((_, '='))) => Token::Eq,
                    Some((_, '=')) => return Err(parse_error(offset, "unsupported operator '==='")),
                    _ => return Err(ConditionError::UnsafeNode("assignment".to_string())),
                }
            }
            '!' => {
                chars.next();
                match chars.next() {
                    Some((_, '=')) => Token::NotEq,
                    _ => return Err(parse_error(offset, "unsupported operator '!'")),
                }
            }
            other => return Err(parse_error(offset, format!("unexpected character '{}'", other))),
        };
        tokens.push(Spanned { token, offset });
    }

    Ok(tokens)
}

fn consume_string(
    chars: &mut Peekable<CharIndices>,
    quote: char,
    start: usize,
) -> Result<String, ConditionError> {
    let mut result = String::new();
    while let Some((_, ch)) = chars.next() {
        match ch {
            c if c == quote => return Ok(result),
            '\\' => match chars.next() {
                Some((_, c)) if c == quote || c == '\\' => result.push(c),
                Some((_, 'n')) if quote == '"' => result.push('\n'),
                Some((_, 't')) if quote == '"' => result.push('\t'),
                Some((_, c)) if quote == '\'' => {
                    result.push('\\');
                    result.push(c);
                }
                Some((_, c)) => result.push(c),
                None => break,
            },
            '#' if quote == '"' && matches!(chars.peek(), Some((_, '{'))) => {
                return Err(ConditionError::UnsafeNode("string interpolation".to_string()));
            }
            c => result.push(c),
        }
    }
    Err(parse_error(start, "unterminated string"))
}

fn consume_until(
    chars: &mut Peekable<CharIndices>,
    end: char,
    start: usize,
) -> Result<String, ConditionError> {
    let mut result = String::new();
    for (_, ch) in chars.by_ref() {
        if ch == end {
            return Ok(result);
        }
        result.push(ch);
    }
    Err(parse_error(start, format!("expected closing '{}'", end)))
}

fn consume_word(chars: &mut Peekable<CharIndices>) -> String {
    let mut word = String::new();
    while let Some(&(_, ch)) = chars.peek() {
        if ch.is_alphanumeric() || ch == '_' {
            word.push(ch);
            chars.next();
        } else {
            break;
        }
    }

    // predicate/bang suffix, unless it begins `!=`
    if let Some(&(_, suffix)) = chars.peek() {
        if suffix == '?' || suffix == '!' {
            let mut lookahead = chars.clone();
            lookahead.next();
            if !matches!(lookahead.peek(), Some((_, '='))) {
                word.push(suffix);
                chars.next();
            }
        }
    }
    word
}

fn consume_number(chars: &mut Peekable<CharIndices>, start: usize) -> Result<i64, ConditionError> {
    let mut digits = String::new();
    while let Some(&(_, ch)) = chars.peek() {
        if ch.is_ascii_digit() {
            digits.push(ch);
        } else if ch != '_' {
            break;
        }
        chars.next();
    }
    digits
        .parse()
        .map_err(|_| parse_error(start, format!("invalid integer '{}'", digits)))
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map(|t| t.offset).unwrap_or(self.end)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|t| t.token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<(), ConditionError> {
        if self.eat(&expected) {
            Ok(())
        } else {
            Err(parse_error(self.offset(), format!("expected {}", what)))
        }
    }

    fn enter(&mut self) -> Result<(), ConditionError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(parse_error(self.offset(), "expression nested too deeply"));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn skip_separators(&mut self) {
        while self.eat(&Token::Separator) {}
    }

    fn parse_program(&mut self) -> Result<Node, ConditionError> {
        let mut statements = Vec::new();
        self.skip_separators();
        while self.peek().is_some() {
            statements.push(self.parse_statement()?);
            match self.peek() {
                None => break,
                Some(Token::Separator) => self.skip_separators(),
                Some(_) => return Err(parse_error(self.offset(), "unexpected token")),
            }
        }
        if statements.is_empty() {
            return Err(parse_error(0, "empty expression"));
        }
        Ok(Node::Program(statements))
    }

    fn parse_statement(&mut self) -> Result<Node, ConditionError> {
        let mut left = self.parse_oror()?;
        loop {
            if self.eat(&Token::KeywordAnd) {
                let right = self.parse_oror()?;
                left = Node::And(Box::new(left), Box::new(right));
            } else if self.eat(&Token::KeywordOr) {
                let right = self.parse_oror()?;
                left = Node::Or(Box::new(left), Box::new(right));
            } else {
                return Ok(left);
            }
        }
    }

    fn parse_oror(&mut self) -> Result<Node, ConditionError> {
        let mut left = self.parse_andand()?;
        while self.eat(&Token::OrOr) {
            let right = self.parse_andand()?;
            left = Node::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_andand(&mut self) -> Result<Node, ConditionError> {
        let mut left = self.parse_equality()?;
        while self.eat(&Token::AndAnd) {
            let right = self.parse_equality()?;
            left = Node::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Node, ConditionError> {
        let left = self.parse_postfix()?;
        let method = match self.peek() {
            Some(Token::Eq) => "==",
            Some(Token::NotEq) => "!=",
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_postfix()?;
        if matches!(self.peek(), Some(Token::Eq) | Some(Token::NotEq)) {
            return Err(parse_error(self.offset(), "comparisons cannot be chained"));
        }
        Ok(Node::Call {
            receiver: Some(Box::new(left)),
            method: method.to_string(),
            args: vec![right],
        })
    }

    fn parse_postfix(&mut self) -> Result<Node, ConditionError> {
        let mut node = self.parse_primary()?;
        loop {
            if self.eat(&Token::Dot) {
                let method = match self.advance() {
                    Some(Token::Ident(name)) | Some(Token::Const(name)) => name,
                    _ => return Err(parse_error(self.offset(), "expected method name after '.'")),
                };
                let args = if self.eat(&Token::LParen) {
                    self.parse_args(Token::RParen, "')'")?
                } else {
                    Vec::new()
                };
                node = Node::Call {
                    receiver: Some(Box::new(node)),
                    method,
                    args,
                };
            } else if self.eat(&Token::LBracket) {
                let args = self.parse_args(Token::RBracket, "']'")?;
                node = Node::Call {
                    receiver: Some(Box::new(node)),
                    method: "[]".to_string(),
                    args,
                };
            } else {
                return Ok(node);
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Node, ConditionError> {
        let offset = self.offset();
        match self.advance() {
            Some(Token::Str(s)) => Ok(Node::Str(s)),
            Some(Token::Int(i)) => Ok(Node::Int(i)),
            Some(Token::Symbol(s)) => Ok(Node::Symbol(s)),
            Some(Token::True) => Ok(Node::Bool(true)),
            Some(Token::False) => Ok(Node::Bool(false)),
            Some(Token::Const(name)) => Ok(Node::Const(name)),
            Some(Token::ShellEscape(cmd)) => Ok(Node::ShellEscape(cmd)),
            Some(Token::Ident(name)) => {
                let args = if self.eat(&Token::LParen) {
                    self.parse_args(Token::RParen, "')'")?
                } else {
                    Vec::new()
                };
                Ok(Node::Call {
                    receiver: None,
                    method: name,
                    args,
                })
            }
            Some(Token::LParen) => {
                self.enter()?;
                let inner = self.parse_statement()?;
                self.expect(Token::RParen, "')'")?;
                self.leave();
                Ok(Node::Parens(Box::new(inner)))
            }
            Some(Token::LBracket) => Ok(Node::Array(self.parse_args(Token::RBracket, "']'")?)),
            Some(_) => Err(parse_error(offset, "unexpected token")),
            None => Err(parse_error(offset, "unexpected end of expression")),
        }
    }

    /// Comma-separated expressions up to `close`; the opening token is already consumed
    fn parse_args(&mut self, close: Token, what: &str) -> Result<Vec<Node>, ConditionError> {
        self.enter()?;
        let mut args = Vec::new();
        if !self.eat(&close) {
            loop {
                args.push(self.parse_oror()?);
                if self.eat(&Token::Comma) {
                    continue;
                }
                self.expect(close.clone(), what)?;
                break;
            }
        }
        self.leave();
        Ok(args)
    }
}
