//! Lenient literal decoding.
//!
//! Converts literal-expression syntax often produced by language models
//! (single quotes, `True`/`False`/`None`, trailing commas, bare keys, tuples)
//! into strict JSON text. Key order is untouched.

/// Normalize a literal block into JSON. Errors describe the first offending
/// character.
pub fn normalize(input: &str) -> std::result::Result<String, String> {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len() + 16);
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        match ch {
            '"' | '\'' => {
                let (literal, next) = read_string(&chars, i)?;
                out.push_str(&serde_json::Value::String(literal).to_string());
                i = next;
            }
            '{' | '[' | ':' => {
                out.push(ch);
                i += 1;
            }
            '(' => {
                out.push('[');
                i += 1;
            }
            '}' | ']' | ')' => {
                out.push(if ch == ')' { ']' } else { ch });
                i += 1;
            }
            ',' => {
                // Drop trailing commas before a closing delimiter.
                let next = skip_whitespace(&chars, i + 1);
                if !matches!(chars.get(next), Some('}') | Some(']') | Some(')')) {
                    out.push(',');
                }
                i += 1;
            }
            '#' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            c if c.is_whitespace() => {
                out.push(c);
                i += 1;
            }
            c if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_ascii_alphanumeric() || matches!(chars[i], '.' | '-' | '+' | '_'))
                {
                    i += 1;
                }
                let number: String = chars[start..i].iter().filter(|c| **c != '_').collect();
                let number = number.trim_start_matches('+');
                if number.parse::<f64>().is_err() {
                    return Err(format!("invalid number '{}' at {}", number, start));
                }
                out.push_str(number);
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                let next = skip_whitespace(&chars, i);
                if chars.get(next) == Some(&':') {
                    out.push_str(&serde_json::Value::String(word).to_string());
                } else {
                    out.push_str(match word.as_str() {
                        "True" | "true" => "true",
                        "False" | "false" => "false",
                        "None" | "null" => "null",
                        _ => return Err(format!("unexpected identifier '{}' at {}", word, start)),
                    });
                }
            }
            other => return Err(format!("unexpected character '{}' at {}", other, i)),
        }
    }

    Ok(out)
}

fn skip_whitespace(chars: &[char], mut i: usize) -> usize {
    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }
    i
}

/// Read a quoted string starting at `start`, returning its value and the
/// index just past the closing quote.
fn read_string(chars: &[char], start: usize) -> std::result::Result<(String, usize), String> {
    let quote = chars[start];
    let mut value = String::new();
    let mut i = start + 1;

    while i < chars.len() {
        let ch = chars[i];
        if ch == quote {
            return Ok((value, i + 1));
        }
        if ch == '\\' {
            let escaped = chars
                .get(i + 1)
                .ok_or_else(|| format!("dangling escape at {}", i))?;
            match escaped {
                'n' => value.push('\n'),
                't' => value.push('\t'),
                'r' => value.push('\r'),
                '\\' => value.push('\\'),
                '\'' => value.push('\''),
                '"' => value.push('"'),
                'x' | 'u' | 'U' => {
                    let width = match escaped {
                        'x' => 2,
                        'u' => 4,
                        _ => 8,
                    };
                    let mut code = read_hex(chars, i + 2, width)?;
                    i += 2 + width;

                    // A high surrogate pairs with a following "\uXXXX" low surrogate.
                    if (0xD800..0xDC00).contains(&code)
                        && chars.get(i) == Some(&'\\')
                        && chars.get(i + 1) == Some(&'u')
                    {
                        let low = read_hex(chars, i + 2, 4)?;
                        if (0xDC00..0xE000).contains(&low) {
                            code = 0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00);
                            i += 6;
                        }
                    }

                    let decoded = char::from_u32(code)
                        .ok_or_else(|| format!("invalid code point {:#x} at {}", code, i))?;
                    value.push(decoded);
                    continue;
                }
                other => {
                    value.push('\\');
                    value.push(*other);
                }
            }
            i += 2;
            continue;
        }
        value.push(ch);
        i += 1;
    }

    Err(format!("unterminated string starting at {}", start))
}

/// Parse `width` hex digits starting at `start`.
fn read_hex(chars: &[char], start: usize, width: usize) -> std::result::Result<u32, String> {
    let digits: String = chars
        .get(start..start + width)
        .ok_or_else(|| format!("truncated escape at {}", start))?
        .iter()
        .collect();
    u32::from_str_radix(&digits, 16).map_err(|_| format!("invalid escape '{}' at {}", digits, start))
}
