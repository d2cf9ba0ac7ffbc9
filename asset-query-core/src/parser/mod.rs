use lalrpop_util::{lalrpop_mod, ParseError};

use crate::error::FilterError;
use crate::query::filter::FilterNode;

pub mod lexeme;

// LALRPOP genera esto
lalrpop_mod!(#[allow(clippy::all, unused_parens)] filter, "/parser/filter.rs");

const END_OF_INPUT: &str = "<end of input>";

/// Parse filter text into an AST.
///
/// Only the shape of the text is checked here; whether the fields exist and
/// the operators fit their types is the validator's job.
pub fn parse_filter(input: &str) -> Result<FilterNode, FilterError> {
    if input.trim().is_empty() {
        return Err(FilterError::Syntax {
            fragment: END_OF_INPUT.to_string(),
            position: 0,
            message: "filter is empty".to_string(),
        });
    }

    filter::FilterParser::new()
        .parse(input)
        .map_err(|e| {
            let err = syntax_error(input, e);
            tracing::debug!(filter = input, error = %err, "Filter rejected by parser");
            err
        })
}

fn syntax_error<T>(input: &str, err: ParseError<usize, T, &'static str>) -> FilterError {
    match err {
        ParseError::InvalidToken { location } => FilterError::Syntax {
            fragment: word_at(input, location),
            position: location,
            message: "unrecognized token".to_string(),
        },
        ParseError::UnrecognizedEof { location, expected } => FilterError::Syntax {
            fragment: END_OF_INPUT.to_string(),
            position: location,
            message: format!("unexpected end of input, expected {}", describe_expected(&expected)),
        },
        ParseError::UnrecognizedToken {
            token: (start, _, end),
            expected,
        } => FilterError::Syntax {
            fragment: slice(input, start, end),
            position: start,
            message: format!("unexpected token, expected {}", describe_expected(&expected)),
        },
        ParseError::ExtraToken {
            token: (start, _, end),
        } => FilterError::Syntax {
            fragment: slice(input, start, end),
            position: start,
            message: "unexpected trailing token".to_string(),
        },
        ParseError::User { error } => FilterError::Syntax {
            fragment: String::new(),
            position: 0,
            message: error.to_string(),
        },
    }
}

fn slice(input: &str, start: usize, end: usize) -> String {
    input.get(start..end).unwrap_or_default().to_string()
}

/// The whitespace-delimited word starting at `location`
fn word_at(input: &str, location: usize) -> String {
    input
        .get(location..)
        .and_then(|rest| rest.split_whitespace().next())
        .unwrap_or(END_OF_INPUT)
        .to_string()
}

fn describe_expected(expected: &[String]) -> String {
    let names: Vec<String> = expected
        .iter()
        .map(|e| match e.as_str() {
            "IDENT" => "a field name".to_string(),
            "QUOTED" => "a quoted string".to_string(),
            "NUMBER" => "a number".to_string(),
            "DATETIME" => "a date-time".to_string(),
            "GUID" => "a GUID".to_string(),
            other => other.trim_matches('"').to_string(),
        })
        .collect();
    if names.is_empty() {
        "nothing more".to_string()
    } else {
        names.join(", ")
    }
}
