use {super::error::PipelineError, std::fmt};

/// Non-negative amount in cents. Displays as a two-digit decimal (`27.90`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct MoneyAmount(i64);

impl MoneyAmount {
    pub fn new(cents: i64) -> Result<Self, PipelineError> {
        if cents < 0 {
            return Err(PipelineError::malformed(format!(
                "amount cannot be negative, got: {cents}"
            )));
        }
        Ok(Self(cents))
    }

    /// Parse a decimal string such as `"27.90"`, `"27.9"` or `"27"`.
    /// At most two fractional digits; no sign, no thousands separators.
    pub fn parse_decimal(raw: &str) -> Result<Self, PipelineError> {
        let s = raw.trim();
        let (whole, frac) = match s.split_once('.') {
            Some((whole, frac)) if !frac.is_empty() => (whole, frac),
            Some(_) => return Err(invalid_amount(raw)),
            None => (s, ""),
        };

        let digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if whole.is_empty() || !digits(whole) || !digits(frac) || frac.len() > 2 {
            return Err(invalid_amount(raw));
        }

        let whole: i64 = whole.parse().map_err(|_| invalid_amount(raw))?;
        let frac_cents: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| invalid_amount(raw))? * 10,
            _ => frac.parse::<i64>().map_err(|_| invalid_amount(raw))?,
        };

        whole
            .checked_mul(100)
            .and_then(|v| v.checked_add(frac_cents))
            .map(MoneyAmount)
            .ok_or_else(|| invalid_amount(raw))
    }

    pub fn cents(&self) -> i64 {
        self.0
    }
}

fn invalid_amount(raw: &str) -> PipelineError {
    PipelineError::malformed(format!("invalid sale_amount: {raw:?}"))
}

impl fmt::Display for MoneyAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}
