use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const ALL_KEYS: &str = "ALL_KEYS";
pub const NO_KEYS: &str = "NO_KEYS";

/// Keys a response listener accepts
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum KeyChoices {
    #[default]
    AllKeys,
    NoKeys,
    Keys(Vec<String>),
}

impl KeyChoices {
    pub fn keys<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        KeyChoices::Keys(keys.into_iter().map(Into::into).collect())
    }

    pub fn is_none(&self) -> bool {
        matches!(self, KeyChoices::NoKeys)
    }

    /// Whether `key` is a valid response. Case-insensitive unless asked otherwise.
    pub fn allows(&self, key: &str, case_sensitive: bool) -> bool {
        match self {
            KeyChoices::AllKeys => true,
            KeyChoices::NoKeys => false,
            KeyChoices::Keys(keys) => keys.iter().any(|k| {
                if case_sensitive {
                    k == key
                } else {
                    k.eq_ignore_ascii_case(key)
                }
            }),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawChoices {
    One(String),
    Many(Vec<String>),
}

impl<'de> Deserialize<'de> for KeyChoices {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawChoices::deserialize(deserializer)? {
            RawChoices::One(s) if s == ALL_KEYS => KeyChoices::AllKeys,
            RawChoices::One(s) if s == NO_KEYS => KeyChoices::NoKeys,
            RawChoices::One(s) => KeyChoices::Keys(vec![s]),
            RawChoices::Many(keys) if keys.len() == 1 && keys[0] == NO_KEYS => KeyChoices::NoKeys,
            RawChoices::Many(keys) => KeyChoices::Keys(keys),
        })
    }
}

impl Serialize for KeyChoices {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            KeyChoices::AllKeys => serializer.serialize_str(ALL_KEYS),
            KeyChoices::NoKeys => serializer.serialize_str(NO_KEYS),
            KeyChoices::Keys(keys) => keys.serialize(serializer),
        }
    }
}
