//! Tokens and the token stream consumed by the parser.

use std::{collections::VecDeque, fmt::Display, ops::Range};

use logos::{FilterResult, Lexer, Logos};
use miette::{Diagnostic, Result, SourceSpan};
use thiserror::Error;

/// Lexical category of a token.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[logos(skip r"([ \t\r\n\f]+|//[^\n]*)")]
#[allow(missing_docs)]
pub enum TokenKind {
    // Braces
    // --------------------
    #[token("{")]
    LeftBrace,
    #[token("}")]
    RightBrace,
    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token("[")]
    LeftSquare,
    #[token("]")]
    RightSquare,
    #[token(";")]
    Semicolon,

    // Skipped
    // --------------------
    #[token("/*", block_comment)]
    BlockComment,

    // Keywords
    // --------------------
    #[token("break")]
    Break,
    #[token("case")]
    Case,
    #[token("char")]
    Char,
    #[token("const")]
    Const,
    #[token("continue")]
    Continue,
    #[token("default")]
    Default,
    #[token("do")]
    Do,
    #[token("double")]
    Double,
    #[token("else")]
    Else,
    #[token("enum")]
    Enum,
    #[token("extern")]
    Extern,
    #[token("float")]
    Float,
    #[token("for")]
    For,
    #[token("goto")]
    Goto,
    #[token("if")]
    If,
    #[token("inline")]
    Inline,
    #[token("int")]
    Int,
    #[token("long")]
    Long,
    #[token("register")]
    Register,
    #[token("restrict")]
    Restrict,
    #[token("return")]
    Return,
    #[token("short")]
    Short,
    #[token("signed")]
    Signed,
    #[token("sizeof")]
    Sizeof,
    #[token("static")]
    Static,
    #[token("struct")]
    Struct,
    #[token("switch")]
    Switch,
    #[token("typedef")]
    Typedef,
    #[token("union")]
    Union,
    #[token("unsigned")]
    Unsigned,
    #[token("void")]
    Void,
    #[token("volatile")]
    Volatile,
    #[token("while")]
    While,
    #[token("auto")]
    Auto,

    // Identifiers and literals
    // --------------------
    #[regex("[A-Za-z_][A-Za-z0-9_]*")]
    Identifier,
    #[regex("[1-9][0-9]*[uUlL]*")]
    IntLiteral,
    #[regex("0[xX][0-9a-fA-F]+[uUlL]*")]
    HexLiteral,
    #[regex("0[0-7]*[uUlL]*")]
    OctLiteral,
    #[regex(r"'([^'\\\n]|\\[^\n])'")]
    CharLiteral,

    // Operators
    // --------------------
    #[token("!")]
    LogicalNot,
    #[token("~")]
    BitwiseNot,
    #[token("-")]
    Minus,
    #[token("+")]
    Plus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("==")]
    Equal,
    #[token("!=")]
    NotEqual,
    #[token("&&")]
    And,
    #[token("||")]
    Or,
    #[token("<")]
    LessThan,
    #[token("<=")]
    LessEqual,
    #[token(">")]
    GreaterThan,
    #[token(">=")]
    GreaterEqual,
    #[token("%")]
    Percent,
    #[token("&")]
    BitAnd,
    #[token("|")]
    BitOr,
    #[token("^")]
    BitXor,
    #[token("<<")]
    LeftShift,
    #[token(">>")]
    RightShift,
    #[token("=")]
    Assign,
    #[token("+=")]
    PlusAssign,
    #[token("-=")]
    MinusAssign,
    #[token("*=")]
    StarAssign,
    #[token("/=")]
    SlashAssign,
    #[token("%=")]
    PercentAssign,
    #[token("<<=")]
    LeftShiftAssign,
    #[token(">>=")]
    RightShiftAssign,
    #[token("&=")]
    AndAssign,
    #[token("|=")]
    OrAssign,
    #[token("^=")]
    XorAssign,
    #[token(",")]
    Comma,
    #[token("++")]
    PlusPlus,
    #[token("--")]
    MinusMinus,
    #[token("?")]
    Question,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token("->")]
    Arrow,
}

impl TokenKind {
    /// Whether tokens of this kind carry their source text.
    pub fn has_payload(self) -> bool {
        matches!(
            self,
            TokenKind::Identifier
                | TokenKind::IntLiteral
                | TokenKind::HexLiteral
                | TokenKind::OctLiteral
                | TokenKind::CharLiteral
        )
    }

    /// Whether this is an integer or character literal.
    pub fn is_literal(self) -> bool {
        self.has_payload() && self != TokenKind::Identifier
    }

    /// Whether this keyword may start a declaration.
    pub fn is_type_specifier(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Char | Short
                | Int
                | Long
                | Signed
                | Unsigned
                | Const
                | Volatile
                | Restrict
                | Auto
                | Static
                | Extern
                | Register
                | Float
                | Double
                | Void
                | Struct
                | Union
                | Enum
                | Typedef
                | Inline
        )
    }

    /// Source form of the token kind, used in diagnostics.
    pub fn as_str(self) -> &'static str {
        use TokenKind::*;
        match self {
            LeftBrace => "{",
            RightBrace => "}",
            LeftParen => "(",
            RightParen => ")",
            LeftSquare => "[",
            RightSquare => "]",
            Semicolon => ";",
            BlockComment => "/*",
            Break => "break",
            Case => "case",
            Char => "char",
            Const => "const",
            Continue => "continue",
            Default => "default",
            Do => "do",
            Double => "double",
            Else => "else",
            Enum => "enum",
            Extern => "extern",
            Float => "float",
            For => "for",
            Goto => "goto",
            If => "if",
            Inline => "inline",
            Int => "int",
            Long => "long",
            Register => "register",
            Restrict => "restrict",
            Return => "return",
            Short => "short",
            Signed => "signed",
            Sizeof => "sizeof",
            Static => "static",
            Struct => "struct",
            Switch => "switch",
            Typedef => "typedef",
            Union => "union",
            Unsigned => "unsigned",
            Void => "void",
            Volatile => "volatile",
            While => "while",
            Auto => "auto",
            Identifier => "identifier",
            IntLiteral => "integer literal",
            HexLiteral => "hex literal",
            OctLiteral => "octal literal",
            CharLiteral => "character literal",
            LogicalNot => "!",
            BitwiseNot => "~",
            Minus => "-",
            Plus => "+",
            Star => "*",
            Slash => "/",
            Equal => "==",
            NotEqual => "!=",
            And => "&&",
            Or => "||",
            LessThan => "<",
            LessEqual => "<=",
            GreaterThan => ">",
            GreaterEqual => ">=",
            Percent => "%",
            BitAnd => "&",
            BitOr => "|",
            BitXor => "^",
            LeftShift => "<<",
            RightShift => ">>",
            Assign => "=",
            PlusAssign => "+=",
            MinusAssign => "-=",
            StarAssign => "*=",
            SlashAssign => "/=",
            PercentAssign => "%=",
            LeftShiftAssign => "<<=",
            RightShiftAssign => ">>=",
            AndAssign => "&=",
            OrAssign => "|=",
            XorAssign => "^=",
            Comma => ",",
            PlusPlus => "++",
            MinusMinus => "--",
            Question => "?",
            Colon => ":",
            Dot => ".",
            Arrow => "->",
        }
    }
}

/// Skip the rest of a block comment. Never yields a token.
fn block_comment(lex: &mut Lexer<TokenKind>) -> FilterResult<(), ()> {
    match lex.remainder().find("*/") {
        Some(end) => {
            lex.bump(end + 2);
            FilterResult::Skip
        }
        None => FilterResult::Error(()),
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A token with its optional source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Lexical category.
    pub kind: TokenKind,
    /// Identifier or literal text.
    pub value: Option<String>,
    /// Byte range in the source.
    pub span: Range<usize>,
}

impl Token {
    /// Text of an identifier or literal, empty for other tokens.
    pub fn text(&self) -> &str {
        self.value.as_deref().unwrap_or_default()
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{:?}: {}", self.kind, value),
            None => write!(f, "{:?}", self.kind),
        }
    }
}

/// Error type for the tokenizer.
#[derive(Error, Debug, Diagnostic)]
pub enum LexError {
    /// Invalid token
    #[error("invalid token")]
    #[diagnostic(code(subc::invalid_token))]
    InvalidToken {
        /// Span of the invalid token
        #[label("invalid token")]
        span: SourceSpan,
    },

    /// Block comment without `*/`
    #[error("unterminated comment")]
    #[diagnostic(code(subc::unterminated_comment))]
    UnterminatedComment {
        /// Span of the comment opener
        #[label("comment starts here")]
        span: SourceSpan,
    },
}

/// Double-ended token stream.
///
/// The parser needs one-token lookahead, arbitrary peeking for paren
/// matching, and pushing tokens back.
#[derive(Debug, Clone, Default)]
pub struct TokenStream {
    tokens: VecDeque<Token>,
    end: usize,
}

impl TokenStream {
    /// Create a token stream. `end` is the source length, used to point
    /// end-of-input diagnostics.
    pub fn new(tokens: impl IntoIterator<Item = Token>, end: usize) -> Self {
        Self {
            tokens: tokens.into_iter().collect(),
            end,
        }
    }

    /// Remove and return the first token.
    pub fn pop_front(&mut self) -> Option<Token> {
        self.tokens.pop_front()
    }

    /// Put a token back at the front.
    pub fn push_front(&mut self, token: Token) {
        self.tokens.push_front(token);
    }

    /// Peek the first token.
    pub fn peek_front(&self) -> Option<&Token> {
        self.tokens.front()
    }

    /// Peek the token `n` positions after the front.
    pub fn peek_at(&self, n: usize) -> Option<&Token> {
        self.tokens.get(n)
    }

    /// Whether all tokens are consumed.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Number of remaining tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Span pointing at the end of the input.
    pub fn eof_span(&self) -> Range<usize> {
        self.end..self.end
    }

    /// Iterate over the remaining tokens.
    pub fn iter(&self) -> impl Iterator<Item = &Token> + '_ {
        self.tokens.iter()
    }
}

/// Split source text into a token stream.
pub fn lex(source: &str) -> Result<TokenStream> {
    let mut tokens = Vec::new();
    for (kind, span) in TokenKind::lexer(source).spanned() {
        let kind = kind.map_err(|_| {
            if source[span.clone()].starts_with("/*") {
                LexError::UnterminatedComment {
                    span: span.clone().into(),
                }
            } else {
                LexError::InvalidToken {
                    span: span.clone().into(),
                }
            }
        })?;
        let value = kind.has_payload().then(|| source[span.clone()].to_string());
        tokens.push(Token { kind, value, span });
    }
    Ok(TokenStream::new(tokens, source.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source).unwrap().iter().map(|t| t.kind).collect()
    }

    #[test]
    fn keywords_and_identifiers() {
        use TokenKind::*;
        assert_eq!(
            kinds("int main unsigned x_1 returnx"),
            vec![Int, Identifier, Unsigned, Identifier, Identifier]
        );
    }

    #[test]
    fn literals_carry_text() {
        let stream = lex("42 0x1F 017 0 'a' 10ul").unwrap();
        let tokens: Vec<_> = stream.iter().map(|t| (t.kind, t.text().to_string())).collect();
        assert_eq!(
            tokens,
            vec![
                (TokenKind::IntLiteral, "42".to_string()),
                (TokenKind::HexLiteral, "0x1F".to_string()),
                (TokenKind::OctLiteral, "017".to_string()),
                (TokenKind::OctLiteral, "0".to_string()),
                (TokenKind::CharLiteral, "'a'".to_string()),
                (TokenKind::IntLiteral, "10ul".to_string()),
            ]
        );
    }

    #[test]
    fn longest_operator_wins() {
        use TokenKind::*;
        assert_eq!(
            kinds("a <<= b >> c ++ -> --"),
            vec![Identifier, LeftShiftAssign, Identifier, RightShift, Identifier, PlusPlus, Arrow, MinusMinus]
        );
    }

    #[test]
    fn comments_are_skipped() {
        use TokenKind::*;
        assert_eq!(
            kinds("int /* block\n comment */ x; // line\nreturn"),
            vec![Int, Identifier, Semicolon, Return]
        );
    }

    #[test]
    fn block_comment_edges() {
        use TokenKind::*;
        assert_eq!(kinds("/**/ int"), vec![Int]);
        assert_eq!(kinds("/* a **/ int"), vec![Int]);
        assert_eq!(kinds("/* a */ int"), vec![Int]);
        assert_eq!(kinds("a /* x * / y */ / b"), vec![Identifier, Slash, Identifier]);
        assert_eq!(kinds("/* // */ x"), vec![Identifier]);
    }

    #[test]
    fn unterminated_comment() {
        let err = lex("int x; /* never closed").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LexError>(),
            Some(LexError::UnterminatedComment { .. })
        ));
    }

    #[test]
    fn invalid_token() {
        let err = lex("int x = 1 @ 2;").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LexError>(),
            Some(LexError::InvalidToken { .. })
        ));
    }

    #[test]
    fn stream_operations() {
        let mut stream = lex("a + b").unwrap();
        assert_eq!(stream.peek_at(1).map(|t| t.kind), Some(TokenKind::Plus));
        let a = stream.pop_front().unwrap();
        assert_eq!(a.text(), "a");
        stream.push_front(a);
        assert_eq!(stream.len(), 3);
        assert_eq!(stream.peek_front().map(|t| t.text()), Some("a"));
        assert_eq!(stream.eof_span(), 5..5);
    }
}
