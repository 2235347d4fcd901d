use regex::Regex;

/// `"D.F"` numeric format: at most `D` integer digits, exactly `F` fractional digits.
#[derive(Debug, Clone)]
pub struct NumberFormat {
    source: String,
    integer_digits: usize,
    fraction_digits: usize,
    pattern: Regex,
}

impl NumberFormat {
    /// Parses a format spec such as `"3.2"`; returns `None` when malformed.
    pub fn parse(spec: &str) -> Option<Self> {
        let trimmed = spec.trim();
        let (integer, fraction) = trimmed.split_once('.')?;
        let integer_digits = integer.trim().parse::<usize>().ok()?;
        let fraction_digits = fraction.trim().parse::<usize>().ok()?;
        if integer_digits == 0 {
            return None;
        }

        let source = if fraction_digits == 0 {
            format!(r"^-?\d{{1,{}}}$", integer_digits)
        } else {
            format!(r"^-?\d{{1,{}}}\.\d{{{}}}$", integer_digits, fraction_digits)
        };
        let pattern = Regex::new(&source).ok()?;

        Some(Self {
            source: spec.to_string(),
            integer_digits,
            fraction_digits,
            pattern,
        })
    }

    pub fn matches(&self, value: &str) -> bool {
        self.pattern.is_match(value.trim())
    }

    /// The spec string as authored, e.g. `"3.2"`.
    pub fn spec(&self) -> &str {
        &self.source
    }

    pub fn integer_digits(&self) -> usize {
        self.integer_digits
    }

    pub fn fraction_digits(&self) -> usize {
        self.fraction_digits
    }

    pub fn mismatch_message(&self) -> String {
        format!("Value does not match expected format: {}", self.source)
    }
}

impl PartialEq for NumberFormat {
    fn eq(&self, other: &Self) -> bool {
        self.integer_digits == other.integer_digits
            && self.fraction_digits == other.fraction_digits
    }
}
