//! Metric keys.
//!
//! A key names one numeric attribute on one remote resource:
//!
//! ```text
//! java.lang:type=Memory@HeapMemoryUsage/used
//! \___________________/ \_____________/ \__/
//!       resource           attribute    path
//! ```
//!
//! The resource part is a JMX object name and may be a pattern
//! (`java.lang:type=GarbageCollector,name=*`). Patterns are expanded once at
//! startup by [`crate::resolve`].

use std::fmt;

use crate::error::ConfigError;

/// Separator between the resource and attribute parts of a key.
pub const KEY_SEPARATOR: char = '@';

/// Separator between an attribute name and its inner path.
pub const PATH_SEPARATOR: char = '/';

/// Characters that mark a resource part as a pattern.
const WILDCARD_MARKERS: [char; 2] = ['*', '?'];

/// A parsed `<resource>@<attribute>` key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetricKey {
    resource: String,
    attribute: String,
}

impl MetricKey {
    /// Builds a key from its two parts.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MalformedKey`] if either part is empty, or if
    /// the attribute contains `@` (the display form would then parse back
    /// into a different key).
    pub fn new(
        resource: impl Into<String>,
        attribute: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let resource = resource.into();
        let attribute = attribute.into();
        let malformed = |reason: String| ConfigError::MalformedKey {
            input: format!("{resource}{KEY_SEPARATOR}{attribute}"),
            reason,
        };

        if resource.is_empty() || attribute.is_empty() {
            return Err(malformed("resource and attribute must both be non-empty".to_string()));
        }
        if attribute.contains(KEY_SEPARATOR) {
            return Err(malformed(format!("attribute must not contain '{KEY_SEPARATOR}'")));
        }
        Ok(Self { resource, attribute })
    }

    /// Parses a key, splitting at the last `@`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MalformedKey`] if there is no separator or
    /// either side of it is empty.
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let Some((resource, attribute)) = input.rsplit_once(KEY_SEPARATOR) else {
            return Err(ConfigError::MalformedKey {
                input: input.to_string(),
                reason: format!("missing '{KEY_SEPARATOR}' between resource and attribute"),
            });
        };
        Self::new(resource, attribute)
    }

    /// The resource locator (a JMX object name or pattern).
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// The full attribute part, including any inner path.
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// The attribute name without its inner path.
    pub fn attribute_name(&self) -> &str {
        self.attribute
            .split_once(PATH_SEPARATOR)
            .map_or(self.attribute.as_str(), |(name, _)| name)
    }

    /// The inner path into a composite attribute, if any.
    pub fn attribute_path(&self) -> Option<&str> {
        self.attribute
            .split_once(PATH_SEPARATOR)
            .map(|(_, path)| path)
            .filter(|path| !path.is_empty())
    }

    /// Whether the resource part is a pattern that needs discovery.
    pub fn is_pattern(&self) -> bool {
        self.resource.contains(WILDCARD_MARKERS)
    }

    /// Returns a key for `resource` carrying this key's attribute part.
    #[must_use]
    pub fn with_resource(&self, resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            attribute: self.attribute.clone(),
        }
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{KEY_SEPARATOR}{}", self.resource, self.attribute)
    }
}

impl std::str::FromStr for MetricKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_key() {
        let key = MetricKey::parse("java.lang:type=Threading@ThreadCount").unwrap();
        assert_eq!(key.resource(), "java.lang:type=Threading");
        assert_eq!(key.attribute(), "ThreadCount");
        assert_eq!(key.attribute_name(), "ThreadCount");
        assert_eq!(key.attribute_path(), None);
        assert!(!key.is_pattern());
        assert_eq!(key.to_string(), "java.lang:type=Threading@ThreadCount");
    }

    #[test]
    fn test_parse_splits_at_last_separator() {
        let key = MetricKey::parse("app:name=\"a@b\"@Count").unwrap();
        assert_eq!(key.resource(), "app:name=\"a@b\"");
        assert_eq!(key.attribute(), "Count");
    }

    #[test]
    fn test_parse_composite_path() {
        let key = MetricKey::parse("java.lang:type=Memory@HeapMemoryUsage/used").unwrap();
        assert_eq!(key.attribute_name(), "HeapMemoryUsage");
        assert_eq!(key.attribute_path(), Some("used"));
    }

    #[test]
    fn test_trailing_slash_has_no_path() {
        let key = MetricKey::parse("java.lang:type=Memory@HeapMemoryUsage/").unwrap();
        assert_eq!(key.attribute_name(), "HeapMemoryUsage");
        assert_eq!(key.attribute_path(), None);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(
            MetricKey::parse("java.lang:type=Memory"),
            Err(ConfigError::MalformedKey { .. })
        ));
        assert!(MetricKey::parse("@Count").is_err());
        assert!(MetricKey::parse("java.lang:type=Memory@").is_err());
        assert!(MetricKey::new("", "Count").is_err());
    }

    #[test]
    fn test_attribute_with_separator_rejected() {
        assert!(matches!(
            MetricKey::new("app:type=Mail", "user@host"),
            Err(ConfigError::MalformedKey { .. })
        ));

        // resources may carry '@'; the display form still parses back
        let key = MetricKey::new("app:name=a@b", "Count").unwrap();
        assert_eq!(MetricKey::parse(&key.to_string()).unwrap(), key);
    }

    #[test]
    fn test_pattern_detection() {
        assert!(MetricKey::parse("java.lang:type=GarbageCollector,name=*@CollectionCount")
            .unwrap()
            .is_pattern());
        assert!(MetricKey::parse("java.lang:type=Memory?ool@Usage").unwrap().is_pattern());
    }

    #[test]
    fn test_with_resource_keeps_attribute() {
        let pattern =
            MetricKey::parse("java.lang:type=GarbageCollector,name=*@CollectionCount").unwrap();
        let concrete =
            pattern.with_resource("java.lang:type=GarbageCollector,name=G1 Young Generation");
        assert!(!concrete.is_pattern());
        assert_eq!(
            concrete.to_string(),
            "java.lang:type=GarbageCollector,name=G1 Young Generation@CollectionCount"
        );
    }
}
