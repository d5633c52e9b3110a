use std::fmt;

// ---------------------------------------------------------------------------
// String-based identity newtypes
// ---------------------------------------------------------------------------

macro_rules! string_newtype {
    ($name:ident) => {
        #[derive(
            Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }
    };
}

string_newtype!(Style);
string_newtype!(VersionId);

// ---------------------------------------------------------------------------
// Style labels
// ---------------------------------------------------------------------------

/// Style used when nothing has been learned yet.
pub const DEFAULT_STYLE: &str = "engaging";

/// Style recorded for feedback that arrives without one.
pub const UNKNOWN_STYLE: &str = "unknown";

/// Styles the selection engine samples from when generating variants.
pub const VARIANT_STYLES: [&str; 5] = ["engaging", "professional", "creative", "concise", "detailed"];

impl Style {
    pub fn default_style() -> Self {
        Self::new(DEFAULT_STYLE)
    }

    pub fn unknown() -> Self {
        Self::new(UNKNOWN_STYLE)
    }
}

// ---------------------------------------------------------------------------
// HumanFeedback — a human judgement attached to a piece of content
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HumanFeedback {
    /// Rating in [0, 1]. Values outside the range are clamped when used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl HumanFeedback {
    pub fn rated(rating: f64) -> Self {
        Self {
            rating: Some(rating),
            comment: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
