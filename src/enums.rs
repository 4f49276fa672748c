//! API constant enumerations.
//!
//! ARM enums are strings on the wire, compared case-insensitively, and new
//! values appear without an API version bump. Unknown values therefore decode
//! into an `Other` variant instead of failing.

macro_rules! arm_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($variant:ident => $value:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)+
            Other(String),
        }

        impl $name {
            pub fn as_str(&self) -> &str {
                match self {
                    $(Self::$variant => $value,)+
                    Self::Other(value) => value.as_str(),
                }
            }

            pub fn possible_values() -> &'static [&'static str] {
                &[$($value),+]
            }

            pub fn is_known(&self) -> bool {
                !matches!(self, Self::Other(_))
            }
        }

        impl From<&str> for $name {
            fn from(input: &str) -> Self {
                $(
                    if input.eq_ignore_ascii_case($value) {
                        return Self::$variant;
                    }
                )+
                Self::Other(input.to_string())
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::convert::Infallible;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self::from(s))
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let decoded = <String as serde::Deserialize>::deserialize(deserializer)?;
                Ok(Self::from(decoded.as_str()))
            }
        }
    };
}

#[cfg(test)]
mod tests {
    arm_enum! {
        pub enum AccessTier {
            Cool => "Cool",
            Hot => "Hot",
            Premium => "Premium",
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("hot".parse::<AccessTier>().unwrap(), AccessTier::Hot);
        assert_eq!(AccessTier::from("COOL"), AccessTier::Cool);
    }

    #[test]
    fn test_unknown_values_are_preserved() {
        let tier = AccessTier::from("Archive");
        assert_eq!(tier, AccessTier::Other("Archive".to_string()));
        assert_eq!(tier.as_str(), "Archive");
        assert!(!tier.is_known());
    }

    #[test]
    fn test_possible_values() {
        assert_eq!(AccessTier::possible_values(), &["Cool", "Hot", "Premium"]);
    }

    #[test]
    fn test_serde_uses_canonical_casing() {
        let tier: AccessTier = serde_json::from_str("\"premium\"").unwrap();
        assert_eq!(tier, AccessTier::Premium);
        assert_eq!(serde_json::to_string(&tier).unwrap(), "\"Premium\"");
    }

    #[test]
    fn test_deserialize_rejects_non_strings() {
        let result: Result<AccessTier, _> = serde_json::from_str("42");
        assert!(result.is_err());
    }
}
