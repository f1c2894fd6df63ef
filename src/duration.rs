//! Clock-time and free-form duration text handling.
//!
//! Every parser here is total: text coming from collaborators is not
//! guaranteed to be well formed, so unparsable input maps to a default
//! instead of an error.

pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Minutes assumed when a duration text cannot be understood.
pub const DEFAULT_DURATION_MINUTES: u32 = 60;

/// Minutes assumed when a travel time text cannot be understood.
pub const DEFAULT_TRAVEL_MINUTES: u32 = 15;

/// Parses `"HH:MM"` into minutes since midnight.
pub fn parse_clock_time(text: &str) -> Option<u32> {
    let (hours, minutes) = text.trim().split_once(':')?;
    let hours: u32 = hours.trim().parse().ok()?;
    let minutes: u32 = minutes.trim().parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some(hours * 60 + minutes)
}

/// Formats minutes since midnight as `"HH:MM"`, wrapping past midnight.
pub fn format_clock_time(minutes: u32) -> String {
    let minutes = minutes % MINUTES_PER_DAY;
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Parses a visit duration such as `"2-3 hours"`, `"1.5 hours"` or
/// `"45 minutes"` into minutes.
///
/// Recognized forms, first match wins: an hour range (mean of the bounds),
/// hours followed by minutes, decimal hours, minutes, whole hours, and
/// finally the first bare number read as minutes.
pub fn parse_duration_text(text: &str) -> u32 {
    let tokens = tokenize(text);

    if let Some(minutes) = hour_range(&tokens) {
        return minutes;
    }

    let hours = unit_values(&tokens, is_hour_unit);
    let minutes = unit_values(&tokens, is_minute_unit);

    if let (Some(h), Some(m)) = (hours.first(), minutes.first()) {
        return to_minutes(h.value * 60.0 + m.value);
    }
    if let Some(h) = hours.iter().find(|number| number.decimal) {
        return to_minutes(h.value * 60.0);
    }
    if let Some(m) = minutes.first() {
        return to_minutes(m.value);
    }
    if let Some(h) = hours.first() {
        return to_minutes(h.value * 60.0);
    }

    first_number(&tokens)
        .map(to_minutes)
        .unwrap_or(DEFAULT_DURATION_MINUTES)
}

/// Parses a travel time text such as `"15 mins"`, `"1h 30m"` or
/// `"1 hour 5 mins"`, summing every component.
pub fn parse_travel_minutes(text: &str) -> u32 {
    let tokens = tokenize(text);
    let total: f64 = unit_values(&tokens, is_day_unit)
        .iter()
        .map(|n| n.value * MINUTES_PER_DAY as f64)
        .chain(unit_values(&tokens, is_hour_unit).iter().map(|n| n.value * 60.0))
        .chain(unit_values(&tokens, is_minute_unit).iter().map(|n| n.value))
        .sum();

    let has_units = tokens.iter().any(|token| {
        matches!(token, Token::Word(word) if is_day_unit(word) || is_hour_unit(word) || is_minute_unit(word))
    });

    if has_units {
        to_minutes(total)
    } else {
        first_number(&tokens)
            .map(to_minutes)
            .unwrap_or(DEFAULT_TRAVEL_MINUTES)
    }
}

/// Renders a travel duration the way mapping services do: `"1 min"`,
/// `"25 mins"`, `"1 hour 5 mins"`.
pub fn format_duration_text(seconds: u32) -> String {
    let total_minutes = (seconds + 30) / 60;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    let minutes_text = match minutes {
        1 => "1 min".to_string(),
        m => format!("{m} mins"),
    };

    match hours {
        0 => minutes_text,
        1 if minutes == 0 => "1 hour".to_string(),
        1 => format!("1 hour {minutes_text}"),
        h if minutes == 0 => format!("{h} hours"),
        h => format!("{h} hours {minutes_text}"),
    }
}

pub fn format_distance_text(meters: u32) -> String {
    if meters < 1000 {
        format!("{meters} m")
    } else {
        format!("{:.1} km", f64::from(meters) / 1000.0)
    }
}

/// Compact span used for itinerary totals: `"45m"`, `"2h"`, `"6h 30m"`.
pub fn format_span_text(minutes: u64) -> String {
    let hours = minutes / 60;
    let rest = minutes % 60;
    match (hours, rest) {
        (0, m) => format!("{m}m"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h {m}m"),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(Number),
    Word(String),
    Dash,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Number {
    value: f64,
    decimal: bool,
}

fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();

    while let Some(&ch) = chars.peek() {
        if ch.is_ascii_digit() {
            let mut literal = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_ascii_digit() || (c == '.' && !literal.contains('.')) {
                    literal.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            let literal = literal.trim_end_matches('.');
            if let Ok(value) = literal.parse::<f64>() {
                tokens.push(Token::Number(Number {
                    value,
                    decimal: literal.contains('.'),
                }));
            }
        } else if ch.is_alphabetic() {
            let mut word = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_alphabetic() {
                    word.extend(c.to_lowercase());
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token::Word(word));
        } else {
            if matches!(ch, '-' | '\u{2013}' | '\u{2014}') {
                tokens.push(Token::Dash);
            }
            chars.next();
        }
    }

    tokens
}

fn is_hour_unit(word: &str) -> bool {
    matches!(word, "h" | "hr" | "hrs" | "hour" | "hours")
}

fn is_minute_unit(word: &str) -> bool {
    matches!(word, "m" | "min" | "mins" | "minute" | "minutes")
}

fn is_day_unit(word: &str) -> bool {
    matches!(word, "d" | "day" | "days")
}

fn hour_range(tokens: &[Token]) -> Option<u32> {
    tokens.windows(4).find_map(|window| match window {
        [Token::Number(low), separator, Token::Number(high), Token::Word(unit)]
            if is_range_separator(separator) && is_hour_unit(unit) =>
        {
            Some(to_minutes((low.value + high.value) / 2.0 * 60.0))
        }
        _ => None,
    })
}

fn is_range_separator(token: &Token) -> bool {
    match token {
        Token::Dash => true,
        Token::Word(word) => word == "to",
        Token::Number(_) => false,
    }
}

/// Numbers immediately followed by a unit word accepted by `is_unit`.
fn unit_values(tokens: &[Token], is_unit: fn(&str) -> bool) -> Vec<Number> {
    tokens
        .windows(2)
        .filter_map(|pair| match pair {
            [Token::Number(number), Token::Word(unit)] if is_unit(unit) => Some(*number),
            _ => None,
        })
        .collect()
}

fn first_number(tokens: &[Token]) -> Option<f64> {
    tokens.iter().find_map(|token| match token {
        Token::Number(number) => Some(number.value),
        _ => None,
    })
}

fn to_minutes(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.round().min(u32::MAX as f64) as u32
    } else {
        0
    }
}
