//! Resource ID codecs.
//!
//! Every ARM resource is addressed by a path-shaped ID. Each typed ID in this
//! module is described by a fixed list of [`Segment`]s; parsing walks the
//! input component by component, and formatting walks the same list back.

mod error;
mod parser;

pub use error::ResourceIdError;
pub use parser::{ParseResult, Segment, example_id, parse_segments, parse_with};

use serde_json::Value;

/// A typed Azure Resource ID.
pub trait ResourceId: Sized {
    /// Human readable name used in messages, e.g. `"Agent Pool"`.
    const DESCRIPTION: &'static str;
    const SEGMENTS: &'static [Segment];

    fn from_parse_result(result: &ParseResult) -> Result<Self, ResourceIdError>;

    /// The user-specified segment values, in segment order.
    fn user_values(&self) -> Vec<(&'static str, &str)>;

    fn parse(input: &str) -> Result<Self, ResourceIdError> {
        let result = parse_with(Self::DESCRIPTION, Self::SEGMENTS, input, false)?;
        Self::from_parse_result(&result)
    }

    /// Parses `input` ignoring the casing of the fixed segments.
    ///
    /// The API is inconsistent about the casing it returns (`resourcegroups`
    /// vs `resourceGroups`), so IDs read back from responses go through here.
    fn parse_insensitively(input: &str) -> Result<Self, ResourceIdError> {
        let result = parse_with(Self::DESCRIPTION, Self::SEGMENTS, input, true)?;
        Self::from_parse_result(&result)
    }

    fn id(&self) -> String {
        let values = self.user_values();
        let mut values = values.iter().map(|(_, v)| *v);
        Self::SEGMENTS
            .iter()
            .map(|segment| match segment.fixed_value() {
                Some(fixed) => format!("/{}", fixed),
                None => format!("/{}", values.next().unwrap_or_default()),
            })
            .collect()
    }

    fn example() -> String {
        example_id(Self::SEGMENTS)
    }

    fn describe(&self) -> String {
        let components: Vec<String> = self
            .user_values()
            .into_iter()
            .map(|(name, value)| format!("{}: {:?}", segment_label(name), value))
            .collect();
        format!("{} ({})", Self::DESCRIPTION, components.join("\n"))
    }
}

/// `resource_group_name` -> `Resource Group Name`, `subscription_id` -> `Subscription`.
fn segment_label(name: &str) -> String {
    if name == "subscription_id" {
        return "Subscription".to_string();
    }
    name.split('_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Schema validator for attributes holding a Resource ID of type `T`.
pub fn validate_resource_id<T: ResourceId>(value: &Value, key: &str) -> Vec<String> {
    let Some(input) = value.as_str() else {
        return vec![format!("expected {:?} to be a string", key)];
    };

    match T::parse(input) {
        Ok(_) => Vec::new(),
        Err(e) => vec![format!("{:?}: {}", key, e)],
    }
}

macro_rules! resource_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident($description:literal) {
            $($field:ident),+ $(,)?
        }
        segments = [$($segment:expr),+ $(,)?];
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name {
            $(pub $field: String),+
        }

        impl $name {
            #[allow(clippy::too_many_arguments)]
            pub fn new($($field: impl Into<String>),+) -> Self {
                Self {
                    $($field: $field.into()),+
                }
            }
        }

        impl $crate::resourceids::ResourceId for $name {
            const DESCRIPTION: &'static str = $description;
            const SEGMENTS: &'static [$crate::resourceids::Segment] = &[$($segment),+];

            fn from_parse_result(
                result: &$crate::resourceids::ParseResult,
            ) -> Result<Self, $crate::resourceids::ResourceIdError> {
                Ok(Self {
                    $($field: result.get(stringify!($field))?.to_string()),+
                })
            }

            fn user_values(&self) -> Vec<(&'static str, &str)> {
                vec![$((stringify!($field), self.$field.as_str())),+]
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                use $crate::resourceids::ResourceId;
                f.write_str(&self.describe())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::resourceids::ResourceIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <Self as $crate::resourceids::ResourceId>::parse(s)
            }
        }
    };
}

mod common;

pub use common::*;

/// ID type names accepted by [`parse_by_type`].
pub const ID_TYPES: &[&str] = &[
    "subscription",
    "resource_group",
    "kubernetes_cluster",
    "agent_pool",
    "storage_account",
    "virtual_network",
    "subnet",
    "frontdoor_profile",
    "frontdoor_rule_set",
    "frontdoor_rule",
];

/// A parsed ID reduced to its description and user-specified segments.
pub type ParsedId = (&'static str, Vec<(&'static str, String)>);

fn parsed<T: ResourceId>(input: &str) -> Result<ParsedId, ResourceIdError> {
    let id = T::parse(input)?;
    let values = id
        .user_values()
        .into_iter()
        .map(|(name, value)| (name, value.to_string()))
        .collect();
    Ok((T::DESCRIPTION, values))
}

/// Parses `input` as the ID type named `id_type` (one of [`ID_TYPES`]).
/// Returns `None` for an unknown type name.
pub fn parse_by_type(id_type: &str, input: &str) -> Option<Result<ParsedId, ResourceIdError>> {
    let result = match id_type {
        "subscription" => parsed::<SubscriptionId>(input),
        "resource_group" => parsed::<ResourceGroupId>(input),
        "kubernetes_cluster" => parsed::<KubernetesClusterId>(input),
        "agent_pool" => parsed::<AgentPoolId>(input),
        "storage_account" => parsed::<StorageAccountId>(input),
        "virtual_network" => parsed::<VirtualNetworkId>(input),
        "subnet" => parsed::<SubnetId>(input),
        "frontdoor_profile" => parsed::<FrontDoorProfileId>(input),
        "frontdoor_rule_set" => parsed::<FrontDoorRuleSetId>(input),
        "frontdoor_rule" => parsed::<FrontDoorRuleId>(input),
        _ => return None,
    };
    Some(result)
}
