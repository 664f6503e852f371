//! Filter language parser.
//!
//! Recursive descent parser for the ranking filter grammar:
//!
//! ```text
//! filter := ABOVE(field, num) | BELOW(field, num) | AT_LEAST(field, num)
//!         | AT_MOST(field, num) | EQUALS(field, num) | BETWEEN(field, num, num)
//!         | SYMBOL(text) | TREND(UP | DOWN | FLAT)
//!         | AND(filter, filter, ...) | OR(filter, filter, ...) | NOT(filter)
//! field  := smoothed | score21 | score63
//! text   := "quoted" | bare-token
//! ```
//!
//! Errors carry the character offset and the expected/found tokens.

use crate::domain::error::ParseError;
use crate::domain::filter::{Field, Filter};
use crate::domain::momentum::Trend;

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn error<T>(&self, message: String) -> Result<T, ParseError> {
        Err(ParseError {
            message,
            position: self.pos,
        })
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            Some(ch) => self.error(format!("expected '{}', found '{}'", expected, ch)),
            None => self.error(format!("expected '{}', found end of input", expected)),
        }
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        let remaining = self.remaining();
        remaining.starts_with(keyword)
            && !remaining[keyword.len()..]
                .chars()
                .next()
                .is_some_and(|c| c.is_alphanumeric() || c == '_')
    }

    fn consume_keyword(&mut self, keyword: &str) -> bool {
        if self.peek_keyword(keyword) {
            self.pos += keyword.len();
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), ParseError> {
        self.skip_whitespace();
        if self.consume_keyword(keyword) {
            Ok(())
        } else {
            let found = self.peek_word();
            self.error(format!("expected '{}', found '{}'", keyword, found))
        }
    }

    fn peek_word(&self) -> String {
        let word: String = self
            .remaining()
            .chars()
            .take_while(|ch| ch.is_alphanumeric() || *ch == '_')
            .collect();
        if word.is_empty() {
            self.peek()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "end of input".to_string())
        } else {
            word
        }
    }

    fn parse_number(&mut self) -> Result<f64, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let mut has_dot = false;
        let mut digits = 0;

        if self.peek() == Some('-') {
            self.advance();
        }

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                digits += 1;
                self.advance();
            } else if ch == '.' && !has_dot {
                has_dot = true;
                self.advance();
            } else {
                break;
            }
        }

        if digits == 0 {
            return Err(ParseError {
                message: "expected number".to_string(),
                position: start,
            });
        }

        let num_str = &self.input[start..self.pos];
        num_str.parse::<f64>().map_err(|_| ParseError {
            message: format!("invalid number: {}", num_str),
            position: start,
        })
    }

    fn parse_field(&mut self) -> Result<Field, ParseError> {
        self.skip_whitespace();
        let word = self.peek_word();
        let field = match word.as_str() {
            "smoothed" => Field::Smoothed,
            "score21" => Field::Score21,
            "score63" => Field::Score63,
            _ => {
                return self.error(format!(
                    "expected field (smoothed, score21, score63), found '{}'",
                    word
                ));
            }
        };
        self.pos += word.len();
        Ok(field)
    }

    fn parse_text(&mut self) -> Result<String, ParseError> {
        self.skip_whitespace();
        if self.peek() == Some('"') {
            self.advance();
            let start = self.pos;
            while let Some(ch) = self.peek() {
                if ch == '"' {
                    let text = self.input[start..self.pos].to_string();
                    self.advance();
                    return Ok(text);
                }
                self.advance();
            }
            return Err(ParseError {
                message: "unterminated string".to_string(),
                position: start - 1,
            });
        }

        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() || ch == ')' || ch == ',' {
                break;
            }
            self.advance();
        }
        if self.pos == start {
            return self.error("expected symbol text".to_string());
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn parse_comparison(&mut self, keyword: &str) -> Result<Filter, ParseError> {
        self.expect_keyword(keyword)?;
        self.expect_char('(')?;
        let field = self.parse_field()?;
        self.expect_char(',')?;
        let value = self.parse_number()?;
        self.expect_char(')')?;

        match keyword {
            "ABOVE" => Ok(Filter::Above { field, value }),
            "BELOW" => Ok(Filter::Below { field, value }),
            "AT_LEAST" => Ok(Filter::AtLeast { field, value }),
            "AT_MOST" => Ok(Filter::AtMost { field, value }),
            "EQUALS" => Ok(Filter::Equals { field, value }),
            _ => unreachable!(),
        }
    }

    fn parse_between(&mut self) -> Result<Filter, ParseError> {
        self.expect_keyword("BETWEEN")?;
        self.expect_char('(')?;
        let field = self.parse_field()?;
        self.expect_char(',')?;
        let lower = self.parse_number()?;
        self.expect_char(',')?;
        let upper = self.parse_number()?;
        self.expect_char(')')?;

        if lower > upper {
            return self.error(format!(
                "BETWEEN lower bound {} exceeds upper bound {}",
                lower, upper
            ));
        }

        Ok(Filter::Between {
            field,
            lower,
            upper,
        })
    }

    fn parse_symbol(&mut self) -> Result<Filter, ParseError> {
        self.expect_keyword("SYMBOL")?;
        self.expect_char('(')?;
        let text = self.parse_text()?;
        self.expect_char(')')?;
        Ok(Filter::SymbolContains(text))
    }

    fn parse_trend(&mut self) -> Result<Filter, ParseError> {
        self.expect_keyword("TREND")?;
        self.expect_char('(')?;
        self.skip_whitespace();
        let word = self.peek_word();
        let trend = match word.to_uppercase().as_str() {
            "UP" => Trend::Up,
            "DOWN" => Trend::Down,
            "FLAT" => Trend::Flat,
            _ => {
                return self.error(format!("expected trend (UP, DOWN, FLAT), found '{}'", word));
            }
        };
        self.pos += word.len();
        self.expect_char(')')?;
        Ok(Filter::TrendIs(trend))
    }

    fn parse_list(&mut self, keyword: &str) -> Result<Vec<Filter>, ParseError> {
        self.expect_keyword(keyword)?;
        self.expect_char('(')?;

        let mut filters = vec![self.parse_filter()?];
        loop {
            self.skip_whitespace();
            if self.peek() == Some(')') {
                self.advance();
                break;
            }
            self.expect_char(',')?;
            filters.push(self.parse_filter()?);
        }

        if filters.len() < 2 {
            return self.error(format!("{} requires at least 2 filters", keyword));
        }
        Ok(filters)
    }

    fn parse_not(&mut self) -> Result<Filter, ParseError> {
        self.expect_keyword("NOT")?;
        self.expect_char('(')?;
        let filter = self.parse_filter()?;
        self.expect_char(')')?;
        Ok(Filter::Not(Box::new(filter)))
    }

    fn parse_filter(&mut self) -> Result<Filter, ParseError> {
        self.skip_whitespace();

        for keyword in ["ABOVE", "BELOW", "AT_LEAST", "AT_MOST", "EQUALS"] {
            if self.peek_keyword(keyword) {
                return self.parse_comparison(keyword);
            }
        }
        if self.peek_keyword("BETWEEN") {
            return self.parse_between();
        }
        if self.peek_keyword("SYMBOL") {
            return self.parse_symbol();
        }
        if self.peek_keyword("TREND") {
            return self.parse_trend();
        }
        if self.peek_keyword("AND") {
            return self.parse_list("AND").map(Filter::And);
        }
        if self.peek_keyword("OR") {
            return self.parse_list("OR").map(Filter::Or);
        }
        if self.peek_keyword("NOT") {
            return self.parse_not();
        }

        let word = self.peek_word();
        self.error(format!("expected filter, found '{}'", word))
    }

    fn parse(&mut self) -> Result<Filter, ParseError> {
        let filter = self.parse_filter()?;
        self.skip_whitespace();
        if self.pos < self.input.len() {
            return self.error(format!(
                "unexpected input after filter: '{}'",
                self.remaining()
            ));
        }
        Ok(filter)
    }
}

pub fn parse(input: &str) -> Result<Filter, ParseError> {
    Parser::new(input).parse()
}
