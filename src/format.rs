//! # Format — Decimal Expansion and Column Layout
//!
//! Renders a computed value as `3.` followed by exactly the requested number of
//! decimals, either as one block or laid out in columns of ten:
//!
//! ```text
//! 3.1415926535 8979323846 2643383279 5028841971  :   40
//!   6939937510 5820974944 5923078164 0628620899  :   80
//!   8628034825 3421170679                        :  100
//! ```
//!
//! Every full line ends with the running digit count, right-aligned to the
//! width of the comma-grouped total. A blank line follows every tenth full
//! line, and a final partial line is padded so its count lines up with the
//! column above.

use rug::Float;
use std::io::{self, Write};
use std::str::FromStr;

/// Digits per group.
const GROUP: usize = 10;
/// Full lines between blank separator lines.
const LINES_PER_BLOCK: usize = 10;
/// Largest column count the layout supports.
pub const MAX_COLUMNS: usize = 14;
/// Extra significant digits requested before truncating.
const EXTRA_DIGITS: usize = 16;

/// `n` with `,` between every group of three digits.
pub fn commify(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// `value` as `<integer part>.<decimals>` with exactly `decimals` digits after
/// the point, truncated from a slightly longer correctly rounded conversion.
///
/// Expects a positive finite value of at least 1, which pi always is.
pub fn decimal_expansion(value: &Float, decimals: usize) -> String {
    let (_, mantissa, exp) = value.to_sign_string_exp(10, Some(decimals + EXTRA_DIGITS));
    let int_len = exp.unwrap_or(0).max(0) as usize;

    let mut out = String::with_capacity(int_len + decimals + 2);
    if int_len == 0 {
        out.push('0');
    } else {
        out.push_str(&mantissa[..int_len.min(mantissa.len())]);
    }
    out.push('.');
    let frac = mantissa.get(int_len..).unwrap_or("");
    out.push_str(&frac[..decimals.min(frac.len())]);
    out
}

/// How the digits are written to stdout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputMode {
    /// Compute only.
    Silent,
    /// One unbroken line.
    Block,
    /// `n` groups of ten per line, 2 ≤ n ≤ 14.
    Columns(usize),
}

impl OutputMode {
    /// Map the numeric command-line code: 0 silent, 1 block, 2..=14 columns.
    pub fn from_code(code: u8) -> Option<OutputMode> {
        match code as usize {
            0 => Some(OutputMode::Silent),
            1 => Some(OutputMode::Block),
            n @ 2..=MAX_COLUMNS => Some(OutputMode::Columns(n)),
            _ => None,
        }
    }

    pub fn write<W: Write>(&self, out: &mut W, expansion: &str) -> io::Result<()> {
        match *self {
            OutputMode::Silent => Ok(()),
            OutputMode::Block => write_block(out, expansion),
            OutputMode::Columns(n) => write_columns(out, expansion, n),
        }
    }
}

impl FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u8>()
            .ok()
            .and_then(OutputMode::from_code)
            .ok_or_else(|| format!("invalid output mode '{}': expected 0 to {}", s, MAX_COLUMNS))
    }
}

pub fn write_block<W: Write>(out: &mut W, expansion: &str) -> io::Result<()> {
    out.write_all(expansion.as_bytes())?;
    out.write_all(b"\n")?;
    out.flush()
}

/// Write `expansion` in `columns` groups of ten decimals per line.
pub fn write_columns<W: Write>(out: &mut W, expansion: &str, columns: usize) -> io::Result<()> {
    let columns = columns.max(1);
    let (head, decimals) = match expansion.find('.') {
        Some(dot) => expansion.split_at(dot + 1),
        None => (expansion, ""),
    };
    let decimals = decimals.as_bytes();
    let total = decimals.len();
    let width = commify(total as u64).len();
    let per_line = columns * GROUP;

    let mut line: Vec<u8> = Vec::with_capacity(columns * (GROUP + 1) + 1);
    let mut count = 0u64;
    let mut in_line = 0usize;
    let mut full_lines = 0usize;
    let mut wrapped = false;

    out.write_all(head.as_bytes())?;
    for (pos, &digit) in decimals.iter().enumerate() {
        line.push(digit);
        in_line += 1;
        if in_line % GROUP != 0 {
            continue;
        }
        line.push(b' ');
        if in_line % per_line == 0 {
            count += per_line as u64;
            out.write_all(&line)?;
            writeln!(out, " :  {:>width$}", commify(count), width = width)?;
            full_lines += 1;
            if full_lines % LINES_PER_BLOCK == 0 {
                writeln!(out)?;
            }
            if pos + 1 < total {
                out.write_all(b"  ")?;
            }
            line.clear();
            wrapped = true;
            in_line = 0;
        }
    }

    if in_line != 0 || total == 0 {
        count += in_line as u64;
        if wrapped {
            // One space per missing group separator, then one per missing digit.
            for k in (GROUP..per_line).step_by(GROUP) {
                if in_line < k {
                    line.push(b' ');
                }
            }
            out.write_all(&line)?;
            write!(out, " {:pad$}", "", pad = per_line - in_line)?;
        } else {
            if in_line == 0 || in_line % GROUP != 0 {
                line.push(b' ');
            }
            out.write_all(&line)?;
        }
        writeln!(out, " :  {:>width$}", commify(count), width = width)?;
    }
    out.flush()
}
