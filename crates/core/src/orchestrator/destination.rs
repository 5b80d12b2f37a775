//! Destination parsing for telephone cells.

/// A dialable number plus the digits to send once the call connects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub number: String,
    pub digits: Option<String>,
}

impl Destination {
    /// Split a telephone cell at the first `marker`.
    ///
    /// `"+15557770000W123"` with marker `W` yields number `+15557770000` and
    /// digits `123`. Returns `None` when no number remains.
    pub fn parse(raw: &str, marker: char) -> Option<Self> {
        let raw = raw.trim();
        let (number, digits) = match raw.split_once(marker) {
            Some((number, digits)) => (number.trim(), Some(digits.trim())),
            None => (raw, None),
        };

        if number.is_empty() {
            return None;
        }

        Some(Self {
            number: number.to_string(),
            digits: digits.filter(|d| !d.is_empty()).map(str::to_string),
        })
    }
}
