/// Errors that can occur when creating validated identifier types.
#[derive(Debug, thiserror::Error)]
pub enum IdentifierError {
    /// The input was empty or contained only whitespace
    #[error("Identifier cannot be empty")]
    Empty,
    /// The input exceeded the maximum permitted length
    #[error("Identifier exceeds maximum length of {0} characters")]
    TooLong(usize),
    /// The input contained characters outside the permitted set
    #[error("Identifier contains invalid characters (only alphanumeric, '.', '-', '_', '/' allowed)")]
    InvalidCharacters,
}

const MAX_IDENTIFIER_LEN: usize = 64;

fn validate_identifier(input: &str) -> Result<&str, IdentifierError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(IdentifierError::Empty);
    }
    if trimmed.len() > MAX_IDENTIFIER_LEN {
        return Err(IdentifierError::TooLong(MAX_IDENTIFIER_LEN));
    }

    let ok = trimmed
        .bytes()
        .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'.' | b'-' | b'_' | b'/'));
    if !ok {
        return Err(IdentifierError::InvalidCharacters);
    }

    Ok(trimmed)
}

/// A prescription number as issued by the practice.
///
/// This type wraps a `String` and guarantees a trimmed, non-empty identifier
/// drawn from a conservative character set, so it is safe to embed in invoice
/// numbers, URLs and log lines. Prescription numbers are the stable key for
/// every status and settlement operation in the system.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrescriptionNumber(String);

impl PrescriptionNumber {
    /// Creates a new `PrescriptionNumber` from the given input.
    ///
    /// The input is trimmed of leading and trailing whitespace and then
    /// validated against the identifier rules.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError`] if the trimmed input is empty, too long,
    /// or contains characters outside the permitted set.
    pub fn new(input: impl AsRef<str>) -> Result<Self, IdentifierError> {
        let trimmed = validate_identifier(input.as_ref())?;
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PrescriptionNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for PrescriptionNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for PrescriptionNumber {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for PrescriptionNumber {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        PrescriptionNumber::new(&s).map_err(serde::de::Error::custom)
    }
}

/// An invoice number for a copayment document.
///
/// Invoice numbers are derived from prescription numbers
/// (see [`InvoiceNumber::for_copayment`]) and a refund correction letter
/// reuses the original number with a `-R` suffix
/// (see [`InvoiceNumber::refund_variant`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InvoiceNumber(String);

impl InvoiceNumber {
    /// Creates an `InvoiceNumber` from a pre-formed identifier.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError`] if the trimmed input is empty, too long,
    /// or contains characters outside the permitted set.
    pub fn new(input: impl AsRef<str>) -> Result<Self, IdentifierError> {
        let trimmed = validate_identifier(input.as_ref())?;
        Ok(Self(trimmed.to_owned()))
    }

    /// Mints the copayment invoice number for a prescription: `CP-<number>`.
    pub fn for_copayment(prescription: &PrescriptionNumber) -> Self {
        Self(format!("CP-{prescription}"))
    }

    /// Derives the refund correction invoice number: `<original>-R`.
    pub fn refund_variant(&self) -> Self {
        Self(format!("{}-R", self.0))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for InvoiceNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for InvoiceNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for InvoiceNumber {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for InvoiceNumber {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        InvoiceNumber::new(&s).map_err(serde::de::Error::custom)
    }
}
