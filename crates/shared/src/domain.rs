use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(ImageId);
id_newtype!(ClusterId);

impl ClusterId {
    /// 1-based number shown to users ("Group 1" is cluster 0).
    pub fn display_number(self) -> i64 {
        self.0 + 1
    }

    pub fn archive_filename(self) -> String {
        format!("group_{}.zip", self.display_number())
    }
}

/// One uploaded image as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub id: ImageId,
    pub filename: String,
    /// Path relative to the service base, e.g. `/uploads/cat.png`.
    pub url: String,
    #[serde(default)]
    pub cluster_id: Option<ClusterId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Coherence {
    Excellent,
    Good,
    Moderate,
    Other(String),
}

impl Coherence {
    pub fn as_str(&self) -> &str {
        match self {
            Coherence::Excellent => "excellent",
            Coherence::Good => "good",
            Coherence::Moderate => "moderate",
            Coherence::Other(label) => label,
        }
    }

    /// Rating shown next to the label; three marks for excellent down to none.
    pub fn rating(&self) -> u8 {
        match self {
            Coherence::Excellent => 3,
            Coherence::Good => 2,
            Coherence::Moderate => 1,
            Coherence::Other(_) => 0,
        }
    }
}

impl From<String> for Coherence {
    fn from(value: String) -> Self {
        match value.as_str() {
            "excellent" => Coherence::Excellent,
            "good" => Coherence::Good,
            "moderate" => Coherence::Moderate,
            _ => Coherence::Other(value),
        }
    }
}

impl From<Coherence> for String {
    fn from(value: Coherence) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Coherence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterStats {
    pub similarity_percent: f64,
    pub coherence: Coherence,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_coherence_labels_are_preserved() {
        let parsed: Coherence = serde_json::from_str("\"perfect\"").expect("coherence");
        assert_eq!(parsed, Coherence::Other("perfect".to_string()));
        assert_eq!(parsed.rating(), 0);

        let parsed: Coherence = serde_json::from_str("\"good\"").expect("coherence");
        assert_eq!(parsed, Coherence::Good);
        assert_eq!(serde_json::to_string(&parsed).expect("encode"), "\"good\"");
    }

    #[test]
    fn archive_names_use_one_based_numbering() {
        assert_eq!(ClusterId(0).archive_filename(), "group_1.zip");
        assert_eq!(ClusterId(4).archive_filename(), "group_5.zip");
    }

    #[test]
    fn image_without_cluster_field_is_unassigned() {
        let image: Image =
            serde_json::from_str(r#"{"id":3,"filename":"c.png","url":"/uploads/c.png"}"#)
                .expect("image");
        assert_eq!(image.cluster_id, None);

        let image: Image = serde_json::from_str(
            r#"{"id":3,"filename":"c.png","url":"/uploads/c.png","cluster_id":null}"#,
        )
        .expect("image");
        assert_eq!(image.cluster_id, None);
    }
}
