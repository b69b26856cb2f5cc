use thiserror::Error;

use super::Expr;

/// Syntax errors reported with the byte offset of the offending input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty expression")]
    Empty,
    #[error("unexpected character '{ch}' at byte {pos}")]
    UnexpectedChar { ch: char, pos: usize },
    #[error("expected an identifier or '(' at byte {pos}")]
    ExpectedOperand { pos: usize },
    #[error("expected ')' at byte {pos}")]
    ExpectedClose { pos: usize },
    #[error("unexpected end of expression at byte {pos}")]
    UnexpectedEnd { pos: usize },
    #[error("unexpected trailing input at byte {pos}")]
    TrailingInput { pos: usize },
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    AndAnd,
    OrOr,
    Bang,
    LParen,
    RParen,
}

#[derive(Debug, Clone)]
struct Lexed {
    tok: Tok,
    pos: usize,
}

fn lex(input: &str) -> Result<Vec<Lexed>, ParseError> {
    let bytes = input.as_bytes();
    let mut out: Vec<Lexed> = Vec::new();
    let mut i = 0usize;
    while i < bytes.len() {
        let b = bytes[i];
        if b.is_ascii_whitespace() {
            i += 1;
            continue;
        }
        match b {
            b'(' => { out.push(Lexed { tok: Tok::LParen, pos: i }); i += 1; }
            b')' => { out.push(Lexed { tok: Tok::RParen, pos: i }); i += 1; }
            b'!' => { out.push(Lexed { tok: Tok::Bang, pos: i }); i += 1; }
            b'&' => {
                if i + 1 < bytes.len() && bytes[i + 1] == b'&' {
                    out.push(Lexed { tok: Tok::AndAnd, pos: i });
                    i += 2;
                } else {
                    return Err(ParseError::UnexpectedChar { ch: '&', pos: i });
                }
            }
            b'|' => {
                if i + 1 < bytes.len() && bytes[i + 1] == b'|' {
                    out.push(Lexed { tok: Tok::OrOr, pos: i });
                    i += 2;
                } else {
                    return Err(ParseError::UnexpectedChar { ch: '|', pos: i });
                }
            }
            b'A'..=b'Z' | b'a'..=b'z' | b'_' => {
                let start = i;
                while i < bytes.len()
                    && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_')
                {
                    i += 1;
                }
                out.push(Lexed { tok: Tok::Ident(input[start..i].to_string()), pos: start });
            }
            _ => {
                // Report the full char, not the lead byte, for non-ASCII input
                let ch = input[i..].chars().next().unwrap_or('\u{fffd}');
                return Err(ParseError::UnexpectedChar { ch, pos: i });
            }
        }
    }
    Ok(out)
}

struct Parser {
    toks: Vec<Lexed>,
    i: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Tok> {
        self.toks.get(self.i).map(|l| &l.tok)
    }

    fn pos(&self) -> usize {
        self.toks.get(self.i).map(|l| l.pos).unwrap_or(self.end)
    }

    fn bump(&mut self) -> Option<Lexed> {
        let l = self.toks.get(self.i).cloned();
        if l.is_some() {
            self.i += 1;
        }
        l
    }

    // Or := And ('||' And)*
    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        while matches!(self.peek(), Some(Tok::OrOr)) {
            self.bump();
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    // And := Unary ('&&' Unary)*
    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        while matches!(self.peek(), Some(Tok::AndAnd)) {
            self.bump();
            let right = self.parse_unary()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    // Unary := '!' Unary | Primary
    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if matches!(self.peek(), Some(Tok::Bang)) {
            self.bump();
            let inner = self.parse_unary()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    // Primary := Identifier | '(' Or ')'
    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let pos = self.pos();
        match self.bump().map(|l| l.tok) {
            Some(Tok::Ident(name)) => Ok(Expr::Ident(name)),
            Some(Tok::LParen) => {
                let inner = self.parse_or()?;
                match self.peek() {
                    Some(Tok::RParen) => {
                        self.bump();
                        Ok(inner)
                    }
                    Some(_) => Err(ParseError::ExpectedClose { pos: self.pos() }),
                    None => Err(ParseError::UnexpectedEnd { pos: self.end }),
                }
            }
            Some(_) => Err(ParseError::ExpectedOperand { pos }),
            None => Err(ParseError::UnexpectedEnd { pos: self.end }),
        }
    }
}

/// Compile expression text into an AST. Whitespace between tokens is
/// insignificant; identifiers match `[A-Za-z_][A-Za-z0-9_]*`.
pub fn parse(text: &str) -> Result<Expr, ParseError> {
    let toks = lex(text)?;
    if toks.is_empty() {
        return Err(ParseError::Empty);
    }
    let mut p = Parser { toks, i: 0, end: text.len() };
    let expr = p.parse_or()?;
    if p.peek().is_some() {
        return Err(ParseError::TrailingInput { pos: p.pos() });
    }
    Ok(expr)
}
