use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Number of trailing characters left readable in logs.
const VISIBLE_TAIL: usize = 3;

/// Wrapper for customer identifiers (phone numbers, DNI) that keeps only the
/// last few characters visible in Debug/Display output.
///
/// Serialization is untouched: API responses need the real value, the wrapper
/// only exists so `tracing::info!("{}", phone)` does not leak it.
#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct Masked<T>(pub T);

impl<T: fmt::Display> Masked<T> {
    fn masked(&self) -> String {
        let raw = self.0.to_string();
        let count = raw.chars().count();
        if count <= VISIBLE_TAIL {
            return "*".repeat(count);
        }
        let tail: String = raw.chars().skip(count - VISIBLE_TAIL).collect();
        format!("{}{}", "*".repeat(count - VISIBLE_TAIL), tail)
    }
}

impl<T: fmt::Display> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Masked({})", self.masked())
    }
}

impl<T: fmt::Display> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<T> Masked<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_is_masked_in_display() {
        let phone = Masked("987654417".to_string());
        assert_eq!(phone.to_string(), "******417");
        assert_eq!(format!("{:?}", phone), "Masked(******417)");
    }

    #[test]
    fn test_serialization_keeps_value() {
        let phone = Masked("987654417".to_string());
        assert_eq!(serde_json::to_string(&phone).unwrap(), "\"987654417\"");
    }

    #[test]
    fn test_short_values_fully_masked() {
        assert_eq!(Masked("12").to_string(), "**");
    }
}
