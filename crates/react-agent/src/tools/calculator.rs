use std::future::ready;
use std::iter::Peekable;
use std::str::CharIndices;

use react_agent_core::Language;
use react_agent_core::tool::{Error as ToolError, Tool, ToolResult};

/// A tool for evaluating arithmetic expressions.
///
/// Only numbers, `+ - * / **` and parentheses are accepted, anything else
/// (names, calls, attribute access) is rejected before evaluation.
pub struct CalculatorTool {
    language: Language,
}

impl CalculatorTool {
    /// Creates a new calculator tool, named and described in `language`.
    #[inline]
    pub fn new(language: Language) -> Self {
        Self { language }
    }
}

impl Default for CalculatorTool {
    #[inline]
    fn default() -> Self {
        Self::new(Language::default())
    }
}

impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        match self.language {
            Language::English => "calculate",
            Language::Portuguese => "calcular",
        }
    }

    fn description(&self) -> &str {
        match self.language {
            Language::English => {
                r#"
Runs a calculation and returns a number, using floating point numbers when needed.
Supports + - * / ** and parentheses.
ex: calculate: 4 * 7 / 3"#
            }
            Language::Portuguese => {
                r#"
Executa um cálculo e retorna um número, usando números de ponto flutuante quando necessário.
Aceita + - * / ** e parênteses.
ex: calcular: 4 * 7 / 3"#
            }
        }
    }

    fn execute(
        &self,
        argument: String,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        ready(evaluate(&argument).map(|value| format!("{value}")))
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    LeftParen,
    RightParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, ToolError> {
    let mut tokens = vec![];
    let mut chars = input.char_indices().peekable();
    while let Some(&(start, ch)) = chars.peek() {
        let token = match ch {
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '0'..='9' | '.' => {
                tokens.push(Token::Number(read_number(input, start, &mut chars)?));
                continue;
            }
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => {
                chars.next();
                if matches!(chars.peek(), Some((_, '*'))) {
                    chars.next();
                    tokens.push(Token::DoubleStar);
                } else {
                    tokens.push(Token::Star);
                }
                continue;
            }
            '/' => Token::Slash,
            '(' => Token::LeftParen,
            ')' => Token::RightParen,
            c if c.is_alphabetic() || c == '_' => {
                let name: String = input[start..]
                    .chars()
                    .take_while(|c| c.is_alphanumeric() || *c == '_')
                    .collect();
                return Err(ToolError::evaluation()
                    .with_reason(format!("names are not allowed: `{name}`")));
            }
            c => {
                return Err(ToolError::evaluation()
                    .with_reason(format!("unexpected character `{c}`")));
            }
        };
        chars.next();
        tokens.push(token);
    }
    Ok(tokens)
}

fn read_number(
    input: &str,
    start: usize,
    chars: &mut Peekable<CharIndices<'_>>,
) -> Result<f64, ToolError> {
    let mut end = start;
    let mut seen_exponent = false;
    while let Some(&(idx, ch)) = chars.peek() {
        let accepted = match ch {
            '0'..='9' | '.' => true,
            'e' | 'E' if !seen_exponent => {
                seen_exponent = true;
                true
            }
            '+' | '-' => matches!(input[..idx].chars().last(), Some('e' | 'E')),
            _ => false,
        };
        if !accepted {
            break;
        }
        end = idx + ch.len_utf8();
        chars.next();
    }
    let literal = &input[start..end];
    literal.parse().map_err(|_| {
        ToolError::evaluation().with_reason(format!("invalid number `{literal}`"))
    })
}

/// How deep parentheses, signs and exponents may nest.
const MAX_NESTING: usize = 200;

/// A recursive descent evaluator following Python's precedence rules.
struct Evaluator {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Evaluator {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    /// Runs `rule` one nesting level deeper.
    fn nested(
        &mut self,
        rule: fn(&mut Self) -> Result<f64, ToolError>,
    ) -> Result<f64, ToolError> {
        if self.depth >= MAX_NESTING {
            return Err(
                ToolError::evaluation().with_reason("expression nested too deeply")
            );
        }
        self.depth += 1;
        let result = rule(self);
        self.depth -= 1;
        result
    }

    // expr := term (('+' | '-') term)*
    fn expr(&mut self) -> Result<f64, ToolError> {
        let mut value = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.advance();
                    value += self.term()?;
                }
                Some(Token::Minus) => {
                    self.advance();
                    value -= self.term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    // term := unary (('*' | '/') unary)*
    fn term(&mut self) -> Result<f64, ToolError> {
        let mut value = self.unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.advance();
                    value *= self.unary()?;
                }
                Some(Token::Slash) => {
                    self.advance();
                    let divisor = self.unary()?;
                    if divisor == 0.0 {
                        return Err(
                            ToolError::evaluation().with_reason("division by zero")
                        );
                    }
                    value /= divisor;
                }
                _ => return Ok(value),
            }
        }
    }

    // unary := ('+' | '-') unary | power
    fn unary(&mut self) -> Result<f64, ToolError> {
        match self.peek() {
            Some(Token::Plus) => {
                self.advance();
                self.nested(Self::unary)
            }
            Some(Token::Minus) => {
                self.advance();
                Ok(-self.nested(Self::unary)?)
            }
            _ => self.power(),
        }
    }

    // power := primary ('**' unary)?
    fn power(&mut self) -> Result<f64, ToolError> {
        let base = self.primary()?;
        if self.peek() == Some(Token::DoubleStar) {
            self.advance();
            let exponent = self.nested(Self::unary)?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    // primary := number | '(' expr ')'
    fn primary(&mut self) -> Result<f64, ToolError> {
        match self.advance() {
            Some(Token::Number(value)) => Ok(value),
            Some(Token::LeftParen) => {
                let value = self.nested(Self::expr)?;
                match self.advance() {
                    Some(Token::RightParen) => Ok(value),
                    _ => Err(ToolError::evaluation().with_reason("missing `)`")),
                }
            }
            Some(token) => Err(ToolError::evaluation()
                .with_reason(format!("unexpected token {token:?}"))),
            None => Err(
                ToolError::evaluation().with_reason("unexpected end of expression")
            ),
        }
    }
}

/// Evaluates an arithmetic expression.
pub fn evaluate(expression: &str) -> Result<f64, ToolError> {
    let tokens = tokenize(expression)?;
    if tokens.is_empty() {
        return Err(ToolError::evaluation().with_reason("empty expression"));
    }

    let mut evaluator = Evaluator::new(tokens);
    let value = evaluator.expr()?;
    if let Some(token) = evaluator.peek() {
        return Err(ToolError::evaluation()
            .with_reason(format!("unexpected token {token:?}")));
    }
    if !value.is_finite() {
        return Err(ToolError::evaluation().with_reason("result is not finite"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use react_agent_core::tool::ErrorKind;

    use super::*;

    #[test]
    fn test_precedence() {
        assert_eq!(evaluate("4 * 7 / 3").unwrap(), 28.0 / 3.0);
        assert_eq!(evaluate("2 + 3 * 4").unwrap(), 14.0);
        assert_eq!(evaluate("(2 + 3) * 4").unwrap(), 20.0);
        assert_eq!(evaluate("10 - 4 - 3").unwrap(), 3.0);
        assert_eq!(evaluate("2 ** 3 ** 2").unwrap(), 512.0);
        assert_eq!(evaluate("-2 ** 2").unwrap(), -4.0);
        assert_eq!(evaluate("2 ** -1").unwrap(), 0.5);
        assert_eq!(evaluate("--3").unwrap(), 3.0);
    }

    #[test]
    fn test_number_literals() {
        assert_eq!(evaluate("1.5e3 + .5").unwrap(), 1500.5);
        assert_eq!(evaluate("2E-2").unwrap(), 0.02);
        assert!(evaluate("1.2.3").is_err());
    }

    #[test]
    fn test_rejects_non_arithmetic() {
        for expression in [
            "__import__('os')",
            "abs(-1)",
            "x + 1",
            "(1).real",
            "1 % 2",
            "2 +",
            "(1 + 2",
            "1 2",
        ] {
            let err = evaluate(expression).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Evaluation, "{expression}");
        }
        for expression in ["", "  "] {
            let err = evaluate(expression).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Evaluation);
            assert_eq!(err.reason(), "empty expression");
        }
    }

    #[test]
    fn test_nesting_limit() {
        assert_eq!(
            evaluate(&format!("{}7{}", "(".repeat(150), ")".repeat(150))).unwrap(),
            7.0
        );
        assert_eq!(evaluate(&format!("{}1", "-".repeat(100))).unwrap(), 1.0);

        for expression in [
            format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000)),
            format!("{}1", "-".repeat(10_000)),
            format!("{}1", "+".repeat(10_000)),
            format!("{}1", "1 ** ".repeat(10_000)),
        ] {
            let err = evaluate(&expression).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Evaluation);
            assert_eq!(err.reason(), "expression nested too deeply");
        }
    }

    #[test]
    fn test_division_by_zero() {
        let err = evaluate("1 / (2 - 2)").unwrap_err();
        assert_eq!(err.reason(), "division by zero");
        assert!(evaluate("10 ** 400").is_err());
    }

    #[tokio::test]
    async fn test_execute_formats_result() {
        let tool = CalculatorTool::new(Language::Portuguese);
        assert_eq!(tool.name(), "calcular");
        assert_eq!(
            tool.execute("4 * 7 / 3".to_owned()).await.unwrap(),
            "9.333333333333334"
        );
        assert_eq!(tool.execute("2 * 3".to_owned()).await.unwrap(), "6");
        assert_eq!(CalculatorTool::default().name(), "calculate");
    }
}
