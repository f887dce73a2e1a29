use im_rc::Vector;
use lazy_static::lazy_static;
use regex::Regex;

use std::{
    fmt::{self, Display},
    iter::Peekable,
    rc::Rc,
};

use crate::error::{self as e, Error};

lazy_static! {
    static ref PAD_RE: Regex = Regex::new(r"[(),]").unwrap();
}

pub const COMMA: &str = ",";

/// Deepest sequence nesting the reader accepts and the evaluator descends.
pub const MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub enum Atom {
    Integer(i64),
    Float(f64),
    Symbol(Rc<str>),
}

/// Tree produced by the reader. Never mutated once built.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Atom(Atom),
    List(Vector<Expr>),
}

impl Expr {
    #[inline]
    pub fn make_symbol<S: AsRef<str>>(s: S) -> Self {
        Expr::Atom(Atom::Symbol(Rc::from(s.as_ref())))
    }

    #[inline]
    pub fn symbol(&self) -> Option<&Rc<str>> {
        match self {
            Expr::Atom(Atom::Symbol(s)) => Some(s),
            _ => None,
        }
    }

    #[inline]
    pub fn list(&self) -> Option<&Vector<Expr>> {
        match self {
            Expr::List(l) => Some(l),
            _ => None,
        }
    }

    #[inline]
    pub fn is_comma(&self) -> bool {
        self.symbol().map_or(false, |s| &**s == COMMA)
    }

    #[inline]
    pub fn is_numeric(&self) -> bool {
        matches!(self, Expr::Atom(Atom::Integer(_)) | Expr::Atom(Atom::Float(_)))
    }
}

impl Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{}", n),
            Self::Float(n) => crate::value::write_float(*n, f),
            Self::Symbol(s) => write!(f, "{}", s),
        }
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Atom(a) => write!(f, "{}", a),
            Self::List(l) => {
                write!(f, "(")?;
                let mut iter = l.iter();
                if let Some(e) = iter.next() {
                    write!(f, "{}", e)?;
                }
                for e in iter {
                    write!(f, " {}", e)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Splits `text` into tokens. Parentheses and commas are always tokens of
/// their own, everything else is separated by whitespace.
pub fn tokenize(text: &str) -> Vec<String> {
    PAD_RE
        .replace_all(text, " $0 ")
        .split_whitespace()
        .map(String::from)
        .collect()
}

/// Reads the first expression of `text`. Trailing tokens are ignored.
pub fn parse(text: &str) -> Result<Expr, Error> {
    Reader::new(tokenize(text).into_iter()).read()
}

struct Reader<I: Iterator<Item = String>> {
    tokens: Peekable<I>,
    depth: usize,
}

impl<I: Iterator<Item = String>> Reader<I> {
    fn new(tokens: I) -> Self {
        Reader {
            tokens: tokens.peekable(),
            depth: 0,
        }
    }

    fn read(&mut self) -> Result<Expr, Error> {
        let token = self.tokens.next().ok_or_else(e::unexpected_end)?;

        match token.as_str() {
            "(" => self.read_list(),
            ")" => Err(e::unexpected_close()),
            token => Ok(Expr::Atom(Self::read_atom(token))),
        }
    }

    fn read_list(&mut self) -> Result<Expr, Error> {
        if self.depth == MAX_DEPTH {
            return Err(e::too_deep(MAX_DEPTH));
        }
        self.depth += 1;

        let mut list = Vector::new();
        loop {
            let token = self.tokens.peek().ok_or_else(e::unexpected_end)?;
            if token == ")" {
                self.tokens.next();
                self.depth -= 1;
                return Ok(Expr::List(list));
            }
            list.push_back(self.read()?);
        }
    }

    // Integer first, then float, then symbol. "1e2" is a float.
    fn read_atom(token: &str) -> Atom {
        token
            .parse()
            .map(Atom::Integer)
            .or_else(|_| token.parse().map(Atom::Float))
            .unwrap_or_else(|_| Atom::Symbol(Rc::from(token)))
    }
}

#[cfg(test)]
mod reader_tests {
    use super::*;
    use crate::error::SyntaxError;
    use im_rc::vector;

    fn int(n: i64) -> Expr {
        Expr::Atom(Atom::Integer(n))
    }

    #[test]
    fn tokens() {
        assert_eq!(tokenize("(+ 1 2)"), vec!["(", "+", "1", "2", ")"]);
        assert_eq!(tokenize("(a,b)"), vec!["(", "a", ",", "b", ")"]);
        assert_eq!(tokenize("  \t\n "), Vec::<String>::new());
        assert_eq!(tokenize("((x))"), vec!["(", "(", "x", ")", ")"]);
    }

    #[test]
    fn atoms() {
        assert_eq!(parse("42").unwrap(), int(42));
        assert_eq!(parse("-7").unwrap(), int(-7));
        assert_eq!(parse("3.14").unwrap(), Expr::Atom(Atom::Float(3.14)));
        assert_eq!(parse("1e2").unwrap(), Expr::Atom(Atom::Float(100.0)));
        assert_eq!(parse("foo").unwrap(), Expr::make_symbol("foo"));
        assert_eq!(parse("list?").unwrap(), Expr::make_symbol("list?"));
    }

    #[test]
    fn integer_overflow_reads_as_float() {
        assert_eq!(
            parse("99999999999999999999").unwrap(),
            Expr::Atom(Atom::Float(1e20))
        );
    }

    #[test]
    fn sequences() {
        assert_eq!(
            parse("(+ 1 2)").unwrap(),
            Expr::List(vector![Expr::make_symbol("+"), int(1), int(2)])
        );
        assert_eq!(
            parse("(1 (2) ())").unwrap(),
            Expr::List(vector![
                int(1),
                Expr::List(vector![int(2)]),
                Expr::List(vector![])
            ])
        );
        assert_eq!(
            parse("(a ,)").unwrap(),
            Expr::List(vector![Expr::make_symbol("a"), Expr::make_symbol(",")])
        );
    }

    #[test]
    fn reads_only_first_form() {
        assert_eq!(parse("1 2 3").unwrap(), int(1));
        assert_eq!(parse("(x) )").unwrap(), Expr::List(vector![Expr::make_symbol("x")]));
    }

    #[test]
    fn syntax_errors() {
        assert_eq!(parse(""), Err(Error::Syntax(SyntaxError::UnexpectedEnd)));
        assert_eq!(parse("(+ 1"), Err(Error::Syntax(SyntaxError::UnexpectedEnd)));
        assert_eq!(parse("((1)"), Err(Error::Syntax(SyntaxError::UnexpectedEnd)));
        assert_eq!(parse(")"), Err(Error::Syntax(SyntaxError::UnexpectedClose)));
    }

    #[test]
    fn nesting_is_bounded() {
        let nested = |n: usize| format!("{}1{}", "(".repeat(n), ")".repeat(n));
        assert!(parse(&nested(MAX_DEPTH)).is_ok());
        assert_eq!(
            parse(&nested(MAX_DEPTH + 1)),
            Err(Error::Syntax(SyntaxError::TooDeep(MAX_DEPTH)))
        );
        assert_eq!(
            parse(&nested(200_000)),
            Err(Error::Syntax(SyntaxError::TooDeep(MAX_DEPTH)))
        );
        let siblings = format!("({} {})", nested(MAX_DEPTH - 1), nested(MAX_DEPTH - 1));
        assert!(parse(&siblings).is_ok());
    }

    #[test]
    fn prints_back() {
        assert_eq!(parse("(+ 1 (* 2 3.5))").unwrap().to_string(), "(+ 1 (* 2 3.5))");
        assert_eq!(parse("(a , b)").unwrap().to_string(), "(a , b)");
    }
}
