//! The query parser: surface syntax → iterator tree.
//!
//! Precedence, loosest first: `or`, explicit `and`, implied and (adjacent
//! terms), `not`. Reserved words: `and`, `or`, `not`, `literally(`,
//! `hasreaction(`, `zgramid(`. A field-specifier list (`sender,body:`)
//! scopes the adjacency group it precedes; `^`/`$` anchor the group's first
//! and last words to their field boundaries; `"…"` groups with adjacency 1
//! and `~…~` with the configured near margin.
//!
//! All error-prone work happens here; the iterator tree that comes out
//! cannot fail during execution.

use bon::builder;
use logos::Logos;
use tracing::debug;

use crate::automaton::Dfa;
use crate::error::{Error, Result};
use crate::fields::{FieldMask, FieldTag};
use crate::iters::boundary::Near;
use crate::iters::word::{Anchored, Pattern};
use crate::iters::zgram::{And, HavingReaction, Not, Or, PopOrNot, ZgramIdIterator};
use crate::iters::{WordIterator, ZgramIterator};
use crate::types::ZgramId;

use super::words;

/// Word-distance bound for `~...~` groups when the caller does not choose
/// one.
pub const DEFAULT_NEAR_MARGIN: usize = 3;

#[derive(Logos, Clone, Copy, Debug, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
enum QueryToken {
    /// Adjacency-1 group; escapes allowed inside.
    #[regex(r#""([^"\\]|\\.)*""#)]
    Quoted,

    /// Near-margin group.
    #[regex(r"~[^~]*~")]
    Tilded,

    /// Comma-separated field list ending in `:`. Spaces are only allowed
    /// after commas; a bare-space separator would swallow following terms.
    #[regex(r"[A-Za-z]+(,[ ]*[A-Za-z]+)*:")]
    Fields,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("^")]
    LAnchor,

    #[token("$")]
    RAnchor,

    /// One run of unquoted pattern text (possibly several adjacent words;
    /// the query-run splitter decides).
    #[regex(r#"[^ \t\r\n()^$~":]+"#)]
    Word,
}

struct Lexed<'a> {
    token: QueryToken,
    slice: &'a str,
    start: usize,
}

fn lex(text: &str) -> Result<Vec<Lexed<'_>>> {
    let mut tokens = Vec::new();
    for (result, span) in QueryToken::lexer(text).spanned() {
        match result {
            Ok(token) => tokens.push(Lexed {
                token,
                slice: &text[span.clone()],
                start: span.start,
            }),
            Err(()) => {
                return Err(Error::Parse {
                    position: span.start,
                    message: format!("unrecognized input {:?}", &text[span]),
                })
            }
        }
    }
    Ok(tokens)
}

/// Strips the surrounding delimiters and resolves backslash escapes.
fn unescape(slice: &str) -> String {
    let inner = &slice[1..slice.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some(next) => out.push(next),
                None => break,
            }
        } else {
            out.push(ch);
        }
    }
    out
}

struct Parser<'a> {
    tokens: Vec<Lexed<'a>>,
    pos: usize,
    near_margin: usize,
    text_len: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Lexed<'a>> {
        self.tokens.get(self.pos)
    }

    fn peek2(&self) -> Option<&Lexed<'a>> {
        self.tokens.get(self.pos + 1)
    }

    fn advance(&mut self) -> &Lexed<'a> {
        let lexed = &self.tokens[self.pos];
        self.pos += 1;
        lexed
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::Parse {
            position: self.peek().map_or(self.text_len, |t| t.start),
            message: message.into(),
        }
    }

    fn expect(&mut self, token: QueryToken, what: &str) -> Result<&Lexed<'a>> {
        match self.peek() {
            Some(t) if t.token == token => Ok(self.advance()),
            _ => Err(self.error(format!("expected {what}"))),
        }
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        self.peek()
            .is_some_and(|t| t.token == QueryToken::Word && t.slice == keyword)
    }

    fn eat(&mut self, token: QueryToken) -> bool {
        if self.peek().is_some_and(|t| t.token == token) {
            self.pos += 1;
            return true;
        }
        false
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.peek_keyword(keyword) {
            self.pos += 1;
            return true;
        }
        false
    }

    /// Does the next token begin a term of an implied and?
    fn starts_term(&self) -> bool {
        match self.peek() {
            None => false,
            Some(t) => match t.token {
                QueryToken::RParen => false,
                QueryToken::Word => t.slice != "and" && t.slice != "or",
                _ => true,
            },
        }
    }

    fn parse_or(&mut self) -> Result<Box<dyn ZgramIterator>> {
        let mut children = vec![self.parse_and()?];
        while self.eat_keyword("or") {
            children.push(self.parse_and()?);
        }
        Ok(Or::create(children))
    }

    fn parse_and(&mut self) -> Result<Box<dyn ZgramIterator>> {
        let mut children = vec![self.parse_implied_and()?];
        while self.eat_keyword("and") {
            children.push(self.parse_implied_and()?);
        }
        Ok(And::create(children))
    }

    fn parse_implied_and(&mut self) -> Result<Box<dyn ZgramIterator>> {
        let mut children = vec![self.parse_unary()?];
        while self.starts_term() {
            children.push(self.parse_unary()?);
        }
        Ok(And::create(children))
    }

    fn parse_unary(&mut self) -> Result<Box<dyn ZgramIterator>> {
        if self.eat_keyword("not") {
            return Ok(Not::create(self.parse_unary()?));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Box<dyn ZgramIterator>> {
        match self.peek() {
            Some(t) if t.token == QueryToken::LParen => {
                self.advance();
                let inner = self.parse_or()?;
                self.expect(QueryToken::RParen, "closing parenthesis")?;
                Ok(inner)
            }
            Some(t) if t.token == QueryToken::Word && (t.slice == "and" || t.slice == "or") => {
                Err(self.error(format!("unexpected keyword {:?}", t.slice)))
            }
            Some(t)
                if t.token == QueryToken::Word
                    && t.slice == "hasreaction"
                    && self.peek2().is_some_and(|t2| t2.token == QueryToken::LParen) =>
            {
                self.advance();
                self.advance();
                let literal = self.expect(QueryToken::Quoted, "quoted reaction")?.slice;
                let reaction = unescape(literal);
                self.expect(QueryToken::RParen, "closing parenthesis")?;
                Ok(HavingReaction::create(reaction))
            }
            Some(t)
                if t.token == QueryToken::Word
                    && t.slice == "zgramid"
                    && self.peek2().is_some_and(|t2| t2.token == QueryToken::LParen) =>
            {
                self.advance();
                self.advance();
                let number = self.expect(QueryToken::Word, "zgram id")?.slice;
                let id: u64 = number
                    .parse()
                    .map_err(|_| self.error(format!("invalid zgram id {number:?}")))?;
                self.expect(QueryToken::RParen, "closing parenthesis")?;
                Ok(ZgramIdIterator::create(ZgramId::new(id)))
            }
            Some(_) => self.parse_scoped_adjacency(),
            None => Err(self.error("expected a search term")),
        }
    }

    /// `(fields ':')? '^'? (words | quoted | tilded | literally) '$'?`
    fn parse_scoped_adjacency(&mut self) -> Result<Box<dyn ZgramIterator>> {
        let field_mask = match self.peek() {
            Some(t) if t.token == QueryToken::Fields => {
                let slice = self.advance().slice;
                self.parse_field_mask(slice)?
            }
            _ => FieldMask::INSTANCE | FieldMask::BODY,
        };
        let anchored_left = self.eat(QueryToken::LAnchor);
        let (margin, group) = self.parse_adjacency_group()?;
        let anchored_right = self.eat(QueryToken::RAnchor);

        if group.is_empty() {
            // e.g. signature:"", meaning zgrams where a selected field is empty.
            return Ok(PopOrNot::create(FieldMask::empty(), field_mask));
        }

        let mut word_iterators: Vec<Box<dyn WordIterator>> = group
            .iter()
            .map(|word| {
                let chars: Vec<char> = word.chars().collect();
                let pattern = words::translate_to_pattern_chars(&chars);
                Pattern::create(Dfa::compile(&pattern, word.clone()), field_mask)
            })
            .collect();

        // A single word takes both anchors; the anchor-merge rewrite makes
        // that work out.
        if anchored_left {
            let first = word_iterators.remove(0);
            word_iterators.insert(0, Anchored::create(first, true, false));
        }
        if anchored_right {
            let last = word_iterators.pop().expect("nonempty group");
            word_iterators.push(Anchored::create(last, false, true));
        }
        Ok(Near::create(margin, word_iterators))
    }

    fn parse_adjacency_group(&mut self) -> Result<(usize, Vec<String>)> {
        match self.peek() {
            Some(t) if t.token == QueryToken::Quoted => {
                let content = unescape(self.advance().slice);
                Ok((1, owned(words::split_query_run(&content))))
            }
            Some(t) if t.token == QueryToken::Tilded => {
                let slice = self.advance().slice;
                let content = &slice[1..slice.len() - 1];
                Ok((self.near_margin, owned(words::split_query_run(content))))
            }
            Some(t)
                if t.token == QueryToken::Word
                    && t.slice == "literally"
                    && self.peek2().is_some_and(|t2| t2.token == QueryToken::LParen) =>
            {
                self.advance();
                self.advance();
                let literal = self.expect(QueryToken::Quoted, "quoted text")?.slice;
                let content = unescape(literal);
                self.expect(QueryToken::RParen, "closing parenthesis")?;
                Ok((1, owned(words::split(&content))))
            }
            Some(t) if t.token == QueryToken::Word => {
                let slice = self.advance().slice;
                Ok((1, owned(words::split_query_run(slice))))
            }
            _ => Err(self.error("expected a search term")),
        }
    }

    fn parse_field_mask(&self, slice: &str) -> Result<FieldMask> {
        let list = &slice[..slice.len() - 1];
        let mut mask = FieldMask::empty();
        for part in list.split(',') {
            let part = part.trim();
            match FieldTag::parse(part) {
                Some(tag) => mask |= FieldMask::of(tag),
                None => return Err(self.error(format!("unrecognized field tag {part:?}"))),
            }
        }
        Ok(mask)
    }
}

fn owned(parts: Vec<&str>) -> Vec<String> {
    parts.into_iter().map(str::to_owned).collect()
}

/// Parses `text` into an executable iterator tree.
///
/// ```
/// use zg_index::syntax::parse_query;
///
/// let it = parse_query().call("sender:kosak and not signature:kosak").unwrap();
/// assert_eq!(
///     it.to_string(),
///     "And([Adapt(Pattern(sender, kosak)), Not(Adapt(Pattern(signature, kosak)))])"
/// );
/// ```
#[builder]
pub fn parse_query(
    #[builder(finish_fn)] text: &str,
    /// Whether an empty query matches every zgram (or none).
    #[builder(default = false)] empty_means_everything: bool,
    /// Word-distance bound for `~...~` groups.
    #[builder(default = DEFAULT_NEAR_MARGIN)] near_margin: usize,
) -> Result<Box<dyn ZgramIterator>> {
    let tokens = lex(text)?;
    if tokens.is_empty() {
        let mask = if empty_means_everything {
            FieldMask::all()
        } else {
            FieldMask::empty()
        };
        return Ok(PopOrNot::create(mask, mask));
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        near_margin,
        text_len: text.len(),
    };
    let result = parser.parse_or()?;
    if parser.pos != parser.tokens.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    debug!(query = %result, "parsed");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(text: &str) -> String {
        parse_query()
            .empty_means_everything(true)
            .call(text)
            .unwrap()
            .to_string()
    }

    fn fails(text: &str) {
        assert!(
            parse_query().empty_means_everything(true).call(text).is_err(),
            "expected parse failure for {text:?}"
        );
    }

    #[test]
    fn implied_and() {
        assert_eq!(
            parsed("corey kosak"),
            "And([Adapt(Pattern(instance|body, corey)), Adapt(Pattern(instance|body, kosak))])"
        );
        assert_eq!(
            parsed("corey louis kosak"),
            "And([Adapt(Pattern(instance|body, corey)), Adapt(Pattern(instance|body, louis)), \
             Adapt(Pattern(instance|body, kosak))])"
        );
        assert_eq!(
            parsed("sender:corey instance:louis signature:kosak"),
            "And([Adapt(Pattern(sender, corey)), Adapt(Pattern(instance, louis)), \
             Adapt(Pattern(signature, kosak))])"
        );
    }

    #[test]
    fn apostrophes() {
        assert_eq!(parsed("kosak"), "Adapt(Pattern(instance|body, kosak))");
        assert_eq!(parsed("k'osak"), "Adapt(Pattern(instance|body, k'osak))");
        assert_eq!(parsed("k'osa'k"), "Adapt(Pattern(instance|body, k'osa'k))");
        assert_eq!(
            parsed("'kosak"),
            "Near(1, [Pattern(instance|body, '), Pattern(instance|body, kosak)])"
        );
        assert_eq!(
            parsed("kosak'"),
            "Near(1, [Pattern(instance|body, kosak), Pattern(instance|body, ')])"
        );
        assert_eq!(
            parsed("'kosak'"),
            "Near(1, [Pattern(instance|body, '), Pattern(instance|body, kosak), \
             Pattern(instance|body, ')])"
        );
    }

    #[test]
    fn quotation_marks() {
        fails(r#"kosak""#);
        fails(r#""kosak"#);
        assert_eq!(parsed(r#""""#), "PopOrNot(pop=(none), unpop=instance|body)");
        assert_eq!(parsed(r#""kosak""#), "Adapt(Pattern(instance|body, kosak))");
        assert_eq!(
            parsed(r#""corey kosak""#),
            "Near(1, [Pattern(instance|body, corey), Pattern(instance|body, kosak)])"
        );
        assert_eq!(
            parsed(r#"signature:"corey kosak""#),
            "Near(1, [Pattern(signature, corey), Pattern(signature, kosak)])"
        );
        // Field specifiers lose their meaning inside quotes.
        assert_eq!(
            parsed(r#""sender:kosak""#),
            "Near(1, [Pattern(instance|body, sender), Pattern(instance|body, :), \
             Pattern(instance|body, kosak)])"
        );
        assert_eq!(
            parsed(r#""kosak)""#),
            "Near(1, [Pattern(instance|body, kosak), Pattern(instance|body, ))])"
        );
        assert_eq!(
            parsed(r#""kosak)$""#),
            "Near(1, [Pattern(instance|body, kosak), Pattern(instance|body, )), \
             Pattern(instance|body, $)])"
        );
    }

    #[test]
    fn tildes() {
        fails("kosak~");
        fails("~kosak");
        assert_eq!(parsed("~~"), "PopOrNot(pop=(none), unpop=instance|body)");
        assert_eq!(parsed("~kosak~"), "Adapt(Pattern(instance|body, kosak))");
        assert_eq!(
            parsed("~corey kosak~"),
            "Near(3, [Pattern(instance|body, corey), Pattern(instance|body, kosak)])"
        );
        assert_eq!(
            parsed("signature:~corey kosak~"),
            "Near(3, [Pattern(signature, corey), Pattern(signature, kosak)])"
        );
        assert_eq!(
            parsed("~sender:kosak~"),
            "Near(3, [Pattern(instance|body, sender), Pattern(instance|body, :), \
             Pattern(instance|body, kosak)])"
        );
    }

    #[test]
    fn custom_near_margin() {
        let it = parse_query().near_margin(2).call("~a b~").unwrap();
        assert_eq!(
            it.to_string(),
            "Near(2, [Pattern(instance|body, a), Pattern(instance|body, b)])"
        );
    }

    #[test]
    fn empty_field_restriction() {
        assert_eq!(
            parsed(r#"signature:"""#),
            "PopOrNot(pop=(none), unpop=signature)"
        );
    }

    #[test]
    fn booleans_and_precedence() {
        assert_eq!(
            parsed("kosak and not cinnabon"),
            "And([Adapt(Pattern(instance|body, kosak)), Not(Adapt(Pattern(instance|body, \
             cinnabon)))])"
        );
        assert_eq!(
            parsed("kosak or cinnabon"),
            "Or([Adapt(Pattern(instance|body, kosak)), Adapt(Pattern(instance|body, cinnabon))])"
        );
        // Implied and binds tighter than or.
        assert_eq!(
            parsed("a b or c"),
            "Or([And([Adapt(Pattern(instance|body, a)), Adapt(Pattern(instance|body, b))]), \
             Adapt(Pattern(instance|body, c))])"
        );
        assert_eq!(
            parsed("not not kosak"),
            "Adapt(Pattern(instance|body, kosak))"
        );
        assert_eq!(
            parsed("(kosak)"),
            "Adapt(Pattern(instance|body, kosak))"
        );
    }

    #[test]
    fn metadata_functions() {
        assert_eq!(parsed(r##"hasreaction("#C++")"##), "HavingReaction(#C++)");
        assert_eq!(parsed("zgramid(42)"), "ZgramId(42)");
        fails("zgramid(pie)");
        fails(r#"hasreaction(42)"#);
    }

    #[test]
    fn anchors() {
        assert_eq!(
            parsed("body:^this"),
            "Adapt(Anchor(left, Pattern(body, this)))"
        );
        assert_eq!(
            parsed("instance:^*$"),
            "Adapt(Anchor(left, right, AnyWord(instance)))"
        );
    }

    #[test]
    fn pattern_simplification() {
        // A star pattern accepts everything, and adapting an any-word
        // iterator is just a population test.
        assert_eq!(parsed("*"), "PopOrNot(pop=instance|body, unpop=(none))");
    }

    #[test]
    fn empty_queries() {
        assert_eq!(parsed(""), "PopOrNot(pop=sender|signature|instance|body, \
             unpop=sender|signature|instance|body)");
        assert_eq!(
            parse_query().call("  ").unwrap().to_string(),
            "PopOrNot(pop=(none), unpop=(none))"
        );
    }

    #[test]
    fn unknown_field_tag_fails() {
        fails("subject:kosak");
    }

    #[test]
    fn trailing_garbage_fails() {
        fails("kosak )");
    }
}
