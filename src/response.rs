//! SMTP reply parsing.

use std::fmt::{self, Display, Formatter};

use nom::branch::alt;
use nom::bytes::streaming::{tag, take_while, take_while_m_n};
use nom::combinator::{map, map_res, peek};
use nom::multi::many0;
use nom::sequence::{pair, preceded, separated_pair, terminated};
use nom::IResult;

use crate::error::Reason;

/// A parsed SMTP reply: the three-digit code of its final line and the text
/// of every line, in order.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Response {
    /// Reply code carried by the final line
    pub code: u16,
    /// Text of each line, without codes or line endings
    pub message: Vec<String>,
}

impl Response {
    /// Tells whether the reply carries the given code.
    pub fn has_code(&self, code: u16) -> bool {
        self.code == code
    }

    /// Text of the first line, if any.
    pub fn first_line(&self) -> Option<&str> {
        self.message.first().map(String::as_str)
    }

    /// Keeps the reply only when it carries `code`; otherwise the full reply
    /// is preserved inside the error for diagnostics.
    pub fn require(self, code: u16) -> Result<Response, Reason> {
        if self.has_code(code) {
            Ok(self)
        } else {
            Err(Reason::UnexpectedReply(self))
        }
    }
}

impl Display for Response {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.code)?;
        if let Some(line) = self.first_line() {
            write!(f, " {}", line)?;
        }
        Ok(())
    }
}

fn reply_code(i: &str) -> IResult<&str, u16> {
    map_res(
        take_while_m_n(3, 3, |c: char| c.is_ascii_digit()),
        |code: &str| code.parse::<u16>(),
    )(i)
}

fn line_text(i: &str) -> IResult<&str, &str> {
    take_while(|c: char| c != '\r' && c != '\n')(i)
}

// "250-STARTTLS\r\n"
fn intermediate_line(i: &str) -> IResult<&str, (u16, &str)> {
    terminated(separated_pair(reply_code, tag("-"), line_text), tag("\r\n"))(i)
}

// "250 OK\r\n" or the bare "250\r\n"
fn final_line(i: &str) -> IResult<&str, (u16, &str)> {
    terminated(
        pair(
            reply_code,
            alt((preceded(tag(" "), line_text), map(peek(tag("\r\n")), |_| ""))),
        ),
        tag("\r\n"),
    )(i)
}

/// Parses one complete reply, multi-line or not.
///
/// Streaming: returns `Incomplete` while the final line has not arrived yet,
/// so the caller keeps reading.
pub fn parse_response(i: &str) -> IResult<&str, Response> {
    map(
        pair(many0(intermediate_line), final_line),
        |(lines, (code, text))| {
            let mut message: Vec<String> = lines.into_iter().map(|(_, t)| t.to_string()).collect();
            if !text.is_empty() {
                message.push(text.to_string());
            }
            Response { code, message }
        },
    )(i)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test {
    use super::*;

    #[test]
    fn parses_single_line_reply() {
        let (rest, response) = parse_response("250 OK\r\n").unwrap();
        assert!(rest.is_empty());
        assert_eq!(response.code, 250);
        assert_eq!(response.message, vec!["OK"]);
    }

    #[test]
    fn parses_multiline_reply() {
        let input = "250-mail.example greets you\r\n250-STARTTLS\r\n250 AUTH PLAIN LOGIN\r\n";
        let (rest, response) = parse_response(input).unwrap();
        assert!(rest.is_empty());
        assert_eq!(response.code, 250);
        assert_eq!(
            response.message,
            vec!["mail.example greets you", "STARTTLS", "AUTH PLAIN LOGIN"]
        );
    }

    #[test]
    fn parses_bare_code_reply() {
        let (_, response) = parse_response("354\r\n").unwrap();
        assert_eq!(response.code, 354);
        assert!(response.message.is_empty());
        assert_eq!(response.first_line(), None);
    }

    #[test]
    fn incomplete_multiline_reply_requests_more_input() {
        assert!(matches!(
            parse_response("250-more to come\r\n"),
            Err(nom::Err::Incomplete(_))
        ));
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            parse_response("not smtp\r\n"),
            Err(nom::Err::Error(_))
        ));
    }

    #[test]
    fn require_preserves_the_offending_reply() {
        let (_, response) = parse_response("550 no such user\r\n").unwrap();
        match response.require(250) {
            Err(Reason::UnexpectedReply(reply)) => {
                assert_eq!(reply.code, 550);
                assert_eq!(reply.first_line(), Some("no such user"));
            }
            other => panic!("expected UnexpectedReply, got {:?}", other),
        }
    }
}
