//! Macro for implementing Display and FromStr for label enums
//!
//! Sync modes, run phases and operation kinds all travel through logs and
//! reports as short lowercase labels. This macro keeps the two directions of
//! that conversion in one table.
//!
//! # Example
//!
//! ```rust
//! use sheetsync_domain::impl_label_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Direction {
//!     Pull,
//!     Push,
//! }
//!
//! impl_label_conversions!(Direction {
//!     Pull => "pull",
//!     Push => "push",
//! });
//! ```

/// Implements Display and FromStr traits for label enums
///
/// Parsing is case-insensitive; display is always the declared label.
#[macro_export]
macro_rules! impl_label_conversions {
    ($enum_name:ident { $($variant:ident => $str:literal),+ $(,)? }) => {
        impl $enum_name {
            /// Stable label used in logs and reports.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum TestLabel {
        Full,
        Incremental,
    }

    impl_label_conversions!(TestLabel {
        Full => "full",
        Incremental => "incremental",
    });

    #[test]
    fn test_display_conversion() {
        assert_eq!(TestLabel::Full.to_string(), "full");
        assert_eq!(TestLabel::Incremental.as_str(), "incremental");
    }

    #[test]
    fn test_fromstr_mixed_case() {
        assert_eq!(TestLabel::from_str("FULL").unwrap(), TestLabel::Full);
        assert_eq!(TestLabel::from_str("Incremental").unwrap(), TestLabel::Incremental);
    }

    #[test]
    fn test_fromstr_invalid() {
        let result = TestLabel::from_str("partial");
        assert!(result.unwrap_err().contains("Invalid TestLabel: partial"));
    }
}
