use std::collections::HashMap;

use super::ResourceIdError;

/// One component of a Resource ID template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    /// A fixed path component such as `resourceGroups`.
    Static {
        name: &'static str,
        value: &'static str,
    },
    /// A resource provider namespace such as `Microsoft.Storage`.
    ResourceProvider {
        name: &'static str,
        value: &'static str,
    },
    SubscriptionId {
        name: &'static str,
    },
    ResourceGroup {
        name: &'static str,
    },
    /// A user-specified value such as a cluster or account name.
    UserSpecified {
        name: &'static str,
        example: &'static str,
    },
}

impl Segment {
    pub const fn fixed(name: &'static str, value: &'static str) -> Self {
        Segment::Static { name, value }
    }

    pub const fn provider(name: &'static str, value: &'static str) -> Self {
        Segment::ResourceProvider { name, value }
    }

    pub const fn subscription(name: &'static str) -> Self {
        Segment::SubscriptionId { name }
    }

    pub const fn resource_group(name: &'static str) -> Self {
        Segment::ResourceGroup { name }
    }

    pub const fn user(name: &'static str, example: &'static str) -> Self {
        Segment::UserSpecified { name, example }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Segment::Static { name, .. }
            | Segment::ResourceProvider { name, .. }
            | Segment::SubscriptionId { name }
            | Segment::ResourceGroup { name }
            | Segment::UserSpecified { name, .. } => name,
        }
    }

    /// The literal for fixed segments; `None` for user-supplied values.
    pub fn fixed_value(&self) -> Option<&'static str> {
        match self {
            Segment::Static { value, .. } | Segment::ResourceProvider { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn example_value(&self) -> &'static str {
        match self {
            Segment::Static { value, .. } | Segment::ResourceProvider { value, .. } => value,
            Segment::SubscriptionId { .. } => "12345678-1234-9876-4563-123456789012",
            Segment::ResourceGroup { .. } => "example-resource-group",
            Segment::UserSpecified { example, .. } => example,
        }
    }
}

/// The user-specified values captured while parsing a Resource ID.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseResult {
    parsed: HashMap<&'static str, String>,
}

impl ParseResult {
    pub fn get(&self, segment: &str) -> Result<&str, ResourceIdError> {
        self.parsed
            .get(segment)
            .map(String::as_str)
            .ok_or_else(|| ResourceIdError::MissingSegment {
                segment: segment.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.parsed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsed.is_empty()
    }
}

pub fn example_id(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|s| format!("/{}", s.example_value()))
        .collect()
}

fn split_components(input: &str) -> Vec<&str> {
    let trimmed = input.strip_prefix('/').unwrap_or(input);
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
    trimmed.split('/').collect()
}

/// Matches `input` against `segments`, component by component.
///
/// When `insensitively` is set, fixed segments are compared ignoring ASCII
/// case; user-specified values are always returned verbatim.
pub fn parse_with(
    description: &'static str,
    segments: &[Segment],
    input: &str,
    insensitively: bool,
) -> Result<ParseResult, ResourceIdError> {
    if input.trim().is_empty() {
        return Err(ResourceIdError::Empty {
            description,
            example: example_id(segments),
        });
    }

    let components = split_components(input);
    if components.len() != segments.len() {
        return Err(ResourceIdError::SegmentCount {
            input: input.to_string(),
            expected: segments.len(),
            actual: components.len(),
            example: example_id(segments),
        });
    }

    let mut parsed = HashMap::new();
    for (position, (segment, component)) in segments.iter().zip(components).enumerate() {
        match segment.fixed_value() {
            Some(expected) => {
                let matches = if insensitively {
                    expected.eq_ignore_ascii_case(component)
                } else {
                    expected == component
                };
                if !matches {
                    return Err(ResourceIdError::SegmentMismatch {
                        input: input.to_string(),
                        position,
                        expected: expected.to_string(),
                        actual: component.to_string(),
                    });
                }
            }
            None => {
                if component.is_empty() {
                    return Err(ResourceIdError::MissingValue {
                        input: input.to_string(),
                        segment: segment.name(),
                        example: segment.example_value(),
                    });
                }
                parsed.insert(segment.name(), component.to_string());
            }
        }
    }

    Ok(ParseResult { parsed })
}

/// Pairs up the components of an arbitrary ARM ID as `(key, value)`.
///
/// Used for displaying IDs whose type isn't known up front. A trailing key
/// without a value is returned with an empty value.
pub fn parse_segments(input: &str) -> Vec<(String, String)> {
    let components: Vec<&str> = split_components(input)
        .into_iter()
        .filter(|c| !c.is_empty())
        .collect();

    components
        .chunks(2)
        .map(|pair| {
            (
                pair[0].to_string(),
                pair.get(1).map(|v| v.to_string()).unwrap_or_default(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEGMENTS: &[Segment] = &[
        Segment::fixed("staticSubscriptions", "subscriptions"),
        Segment::subscription("subscription_id"),
        Segment::fixed("staticResourceGroups", "resourceGroups"),
        Segment::resource_group("resource_group_name"),
        Segment::fixed("staticProviders", "providers"),
        Segment::provider("staticMicrosoftStorage", "Microsoft.Storage"),
        Segment::fixed("staticStorageAccounts", "storageAccounts"),
        Segment::user("storage_account_name", "storageAccountName"),
    ];

    #[test]
    fn test_parse_with_valid_input() {
        let result = parse_with(
            "Storage Account",
            SEGMENTS,
            "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Storage/storageAccounts/acct1",
            false,
        )
        .unwrap();

        assert_eq!(result.len(), 3);
        assert_eq!(result.get("subscription_id").unwrap(), "sub1");
        assert_eq!(result.get("resource_group_name").unwrap(), "rg1");
        assert_eq!(result.get("storage_account_name").unwrap(), "acct1");
    }

    #[test]
    fn test_parse_with_trailing_slash() {
        let result = parse_with(
            "Storage Account",
            SEGMENTS,
            "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Storage/storageAccounts/acct1/",
            false,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_parse_with_wrong_case_is_rejected_sensitively() {
        let result = parse_with(
            "Storage Account",
            SEGMENTS,
            "/subscriptions/sub1/resourcegroups/rg1/providers/Microsoft.Storage/storageAccounts/acct1",
            false,
        );
        assert!(matches!(
            result,
            Err(ResourceIdError::SegmentMismatch { position: 2, .. })
        ));
    }

    #[test]
    fn test_parse_with_wrong_case_is_accepted_insensitively() {
        let result = parse_with(
            "Storage Account",
            SEGMENTS,
            "/SUBSCRIPTIONS/sub1/resourcegroups/RG1/providers/microsoft.storage/storageaccounts/Acct1",
            true,
        )
        .unwrap();
        assert_eq!(result.get("resource_group_name").unwrap(), "RG1");
        assert_eq!(result.get("storage_account_name").unwrap(), "Acct1");
    }

    #[test]
    fn test_parse_with_extra_segments() {
        let result = parse_with(
            "Storage Account",
            SEGMENTS,
            "/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Storage/storageAccounts/acct1/blobServices/default",
            false,
        );
        match result {
            Err(ResourceIdError::SegmentCount {
                expected, actual, ..
            }) => {
                assert_eq!(expected, 8);
                assert_eq!(actual, 10);
            }
            other => panic!("expected SegmentCount, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_with_empty_user_value() {
        let result = parse_with(
            "Storage Account",
            SEGMENTS,
            "/subscriptions//resourceGroups/rg1/providers/Microsoft.Storage/storageAccounts/acct1",
            false,
        );
        assert!(matches!(
            result,
            Err(ResourceIdError::MissingValue {
                segment: "subscription_id",
                ..
            })
        ));
    }

    #[test]
    fn test_parse_with_empty_input() {
        let result = parse_with("Storage Account", SEGMENTS, "   ", false);
        assert!(matches!(result, Err(ResourceIdError::Empty { .. })));
    }

    #[test]
    fn test_example_id() {
        assert_eq!(
            example_id(SEGMENTS),
            "/subscriptions/12345678-1234-9876-4563-123456789012/resourceGroups/example-resource-group/providers/Microsoft.Storage/storageAccounts/storageAccountName"
        );
    }

    #[test]
    fn test_parse_segments_pairs() {
        let pairs = parse_segments("/subscriptions/sub1/resourceGroups/rg1/providers/Microsoft.Web");
        assert_eq!(
            pairs,
            vec![
                ("subscriptions".to_string(), "sub1".to_string()),
                ("resourceGroups".to_string(), "rg1".to_string()),
                ("providers".to_string(), "Microsoft.Web".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_segments_dangling_key() {
        let pairs = parse_segments("/subscriptions/sub1/resourceGroups");
        assert_eq!(pairs[1], ("resourceGroups".to_string(), String::new()));
    }
}
