use serde::Deserialize;
use std::fmt::{self, Write as _};
use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberDataType {
    Int,
    #[default]
    Float,
}

/// Value of a number input. Integers stay exact instead of passing through
/// `f64`; the wire accepts either JSON number form.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn to_f64(self) -> f64 {
        match self {
            Number::Int(value) => value as f64,
            Number::Float(value) => value,
        }
    }

    /// Integer value; floats are rounded and saturate at the `i64` range.
    pub fn to_i64(self) -> i64 {
        match self {
            Number::Int(value) => value,
            Number::Float(value) => value.round() as i64,
        }
    }

    /// The same number in `data_type`'s domain.
    pub fn coerce(self, data_type: NumberDataType) -> Number {
        match data_type {
            NumberDataType::Int => Number::Int(self.to_i64()),
            NumberDataType::Float => Number::Float(self.to_f64()),
        }
    }

    fn is_negative(self) -> bool {
        match self {
            Number::Int(value) => value < 0,
            Number::Float(value) => value.is_sign_negative() && value != 0.0,
        }
    }

    fn offset(self, step: f64) -> Option<Number> {
        match self {
            Number::Int(value) => value.checked_add(step.round() as i64).map(Number::Int),
            Number::Float(value) => Some(Number::Float(value + step)),
        }
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Number::Float(value)
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number::Int(value)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(value) => write!(f, "{value}"),
            Number::Float(value) => write!(f, "{value}"),
        }
    }
}

const DEFAULT_INT_STEP: f64 = 1.0;
const DEFAULT_FLOAT_STEP: f64 = 0.01;

pub fn get_step(step: Option<f64>, data_type: NumberDataType) -> f64 {
    match step {
        Some(step) if step != 0.0 && step.is_finite() => step,
        _ => match data_type {
            NumberDataType::Int => DEFAULT_INT_STEP,
            NumberDataType::Float => DEFAULT_FLOAT_STEP,
        },
    }
}

/// `value` moved one step up, if that stays representable.
pub fn step_up(value: Number, step: f64) -> Option<Number> {
    value.offset(step)
}

pub fn step_down(value: Number, step: f64) -> Option<Number> {
    value.offset(-step)
}

pub fn can_increment(value: Option<Number>, step: f64, max: f64) -> bool {
    value
        .and_then(|value| step_up(value, step))
        .is_some_and(|next| next.to_f64() <= max)
}

pub fn can_decrement(value: Option<Number>, step: f64, min: f64) -> bool {
    value
        .and_then(|value| step_down(value, step))
        .is_some_and(|next| next.to_f64() >= min)
}

/// Display text for a number input. Never changes the value itself.
///
/// An explicit printf-style `format` wins; floats without one are shown with
/// as many decimals as the step has. A format that cannot be applied falls
/// back to the plain value.
pub fn format_value(
    value: Option<Number>,
    data_type: NumberDataType,
    format: Option<&str>,
    step: f64,
) -> Option<String> {
    let value = value?;

    let format = match format.filter(|format| !format.is_empty()) {
        Some(format) => Some(format.to_string()),
        None => step_format(data_type, step),
    };

    let Some(format) = format else {
        return Some(plain(value));
    };

    match sprintf(&format, value) {
        Ok(text) => Some(text),
        Err(err) => {
            log::warn!("error in number format {format:?}: {err}");
            Some(plain(value))
        }
    }
}

fn step_format(data_type: NumberDataType, step: f64) -> Option<String> {
    if data_type != NumberDataType::Float || step == 0.0 {
        return None;
    }

    let step_text = step.to_string();
    let (_, decimals) = step_text.split_once('.')?;
    Some(format!("%0.{}f", decimals.len()))
}

fn plain(value: Number) -> String {
    match value {
        Number::Float(value) if value == 0.0 => "0".to_string(),
        value => value.to_string(),
    }
}

/// Largest width or precision a format may ask for.
pub const MAX_FIELD_LEN: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("unsupported conversion %{0}")]
    UnknownConversion(char),
    #[error("format ends inside a conversion")]
    Truncated,
    #[error("width or precision exceeds {}", MAX_FIELD_LEN)]
    FieldTooLarge,
}

#[derive(Debug, Default)]
struct Spec {
    left_align: bool,
    plus_sign: bool,
    space_sign: bool,
    zero_pad: bool,
    grouping: bool,
    width: usize,
    precision: Option<usize>,
}

/// printf subset used by number input formats: `%d %i %u %f %F %e %E %%`
/// with `- + space 0 '` flags, width and precision.
pub fn sprintf(format: &str, value: impl Into<Number>) -> Result<String, FormatError> {
    let value = value.into();
    let mut out = String::with_capacity(format.len() + 8);
    let mut chars = format.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '%' {
            out.push(ch);
            continue;
        }

        if chars.peek() == Some(&'%') {
            chars.next();
            out.push('%');
            continue;
        }

        let mut spec = Spec::default();
        while let Some(&flag) = chars.peek() {
            match flag {
                '-' => spec.left_align = true,
                '+' => spec.plus_sign = true,
                ' ' => spec.space_sign = true,
                '0' => spec.zero_pad = true,
                '\'' => spec.grouping = true,
                _ => break,
            }
            chars.next();
        }

        spec.width = read_field_len(&mut chars)?;

        if chars.peek() == Some(&'.') {
            chars.next();
            spec.precision = Some(read_field_len(&mut chars)?);
        }

        let conversion = chars.next().ok_or(FormatError::Truncated)?;
        let body = match conversion {
            'd' | 'i' | 'u' => integer_body(value, &spec),
            'f' | 'F' => fixed_body(value, &spec),
            'e' | 'E' => exponent_body(value, &spec, conversion == 'E'),
            other => return Err(FormatError::UnknownConversion(other)),
        };

        pad_into(&mut out, value.is_negative(), body, &spec);
    }

    Ok(out)
}

fn read_field_len(chars: &mut Peekable<Chars<'_>>) -> Result<usize, FormatError> {
    let mut len: usize = 0;
    while let Some(digit) = chars.peek().and_then(|ch| ch.to_digit(10)) {
        len = len
            .checked_mul(10)
            .and_then(|len| len.checked_add(digit as usize))
            .filter(|len| *len <= MAX_FIELD_LEN)
            .ok_or(FormatError::FieldTooLarge)?;
        chars.next();
    }
    Ok(len)
}

fn integer_body(value: Number, spec: &Spec) -> String {
    let digits = match value {
        Number::Int(value) => value.unsigned_abs().to_string(),
        Number::Float(value) => format!("{}", value.abs().trunc() as u64),
    };
    if spec.grouping {
        group_thousands(&digits)
    } else {
        digits
    }
}

fn fixed_body(value: Number, spec: &Spec) -> String {
    let value = value.to_f64();
    let precision = spec.precision.unwrap_or(6);
    let text = format!("{:.*}", precision, value.abs());
    if !spec.grouping {
        return text;
    }

    match text.split_once('.') {
        Some((int_part, frac)) => format!("{}.{frac}", group_thousands(int_part)),
        None => group_thousands(&text),
    }
}

fn exponent_body(value: Number, spec: &Spec, upper: bool) -> String {
    let value = value.to_f64();
    let precision = spec.precision.unwrap_or(6);
    let text = format!("{:.*e}", precision, value.abs());
    let (mantissa, exponent) = text.split_once('e').unwrap_or((text.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    let mut body = String::with_capacity(mantissa.len() + 5);
    body.push_str(mantissa);
    body.push(if upper { 'E' } else { 'e' });
    body.push(if exponent < 0 { '-' } else { '+' });
    let _ = write!(body, "{:02}", exponent.abs());
    body
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

fn pad_into(out: &mut String, negative: bool, body: String, spec: &Spec) {
    let sign = if negative {
        "-"
    } else if spec.plus_sign {
        "+"
    } else if spec.space_sign {
        " "
    } else {
        ""
    };

    let len = sign.len() + body.chars().count();
    let fill = spec.width.saturating_sub(len);

    if spec.left_align {
        out.push_str(sign);
        out.push_str(&body);
        out.extend(std::iter::repeat_n(' ', fill));
    } else if spec.zero_pad {
        out.push_str(sign);
        out.extend(std::iter::repeat_n('0', fill));
        out.push_str(&body);
    } else {
        out.extend(std::iter::repeat_n(' ', fill));
        out.push_str(sign);
        out.push_str(&body);
    }
}

/// Leading-integer parse of user text (`"12abc"` is 12).
pub fn parse_int_text(text: &str) -> Option<i64> {
    let trimmed = text.trim_start();
    let prefix_len = numeric_prefix_len(trimmed, false);
    trimmed[..prefix_len].parse::<i64>().ok()
}

/// Leading-float parse of user text (`"1.5e3x"` is 1500).
pub fn parse_float_text(text: &str) -> Option<f64> {
    let trimmed = text.trim_start();
    let prefix_len = numeric_prefix_len(trimmed, true);
    trimmed[..prefix_len]
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

fn numeric_prefix_len(text: &str, allow_fraction: bool) -> usize {
    let bytes = text.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }

    let int_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let mut digits = end - int_start;

    if !allow_fraction {
        return if digits > 0 { end } else { 0 };
    }

    if bytes.get(end) == Some(&b'.') {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while bytes.get(frac_end).is_some_and(u8::is_ascii_digit) {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        end = frac_end;
    }

    if digits == 0 {
        return 0;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    end
}
