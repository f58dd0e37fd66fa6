use serde_json::{Map, Value};

/// Number of emotion classes. The class set is closed.
pub const NUM_CLASSES: usize = 7;

/// One value per emotion, indexed by `Emotion::index()`.
pub type ClassVec = [f64; NUM_CLASSES];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Emotion {
    Neutral,
    Happy,
    Sad,
    Angry,
    Fearful,
    Disgusted,
    Surprised,
}

impl Emotion {
    /// Canonical class order. Column `i` of every matrix is `ALL[i]`.
    pub const ALL: [Emotion; NUM_CLASSES] = [
        Emotion::Neutral,
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Angry,
        Emotion::Fearful,
        Emotion::Disgusted,
        Emotion::Surprised,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn from_index(idx: usize) -> Option<Self> {
        Self::ALL.get(idx).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Happy => "happy",
            Self::Sad => "sad",
            Self::Angry => "angry",
            Self::Fearful => "fearful",
            Self::Disgusted => "disgusted",
            Self::Surprised => "surprised",
        }
    }

    /// Exact label match, as written in the `y_true` column.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|e| e.as_str() == label)
    }

    /// Name of the probability column for this class (`p_<emotion>`).
    pub fn column_name(self) -> String {
        format!("p_{}", self.as_str())
    }
}

impl std::fmt::Display for Emotion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named per-class mapping (temperatures, biases, distributions).
/// Serialises as `{"neutral": .., "happy": .., ...}` in canonical order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassValues(pub ClassVec);

impl ClassValues {
    pub fn uniform(value: f64) -> Self {
        Self([value; NUM_CLASSES])
    }

    #[inline]
    pub fn get(&self, emotion: Emotion) -> f64 {
        self.0[emotion.index()]
    }

    pub fn to_json(&self) -> Value {
        let mut map = Map::with_capacity(NUM_CLASSES);
        for e in Emotion::ALL {
            map.insert(e.as_str().to_string(), Value::from(self.get(e)));
        }
        Value::Object(map)
    }

    /// Read a per-class mapping. Entries that are missing or non-numeric
    /// take `fill`. Returns `None` if `value` is not an object.
    pub fn from_json(value: &Value, fill: f64) -> Option<Self> {
        let obj = value.as_object()?;
        let mut out = [fill; NUM_CLASSES];
        for e in Emotion::ALL {
            if let Some(v) = obj.get(e.as_str()).and_then(Value::as_f64) {
                out[e.index()] = v;
            }
        }
        Some(Self(out))
    }
}

impl std::fmt::Display for ClassValues {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, e) in Emotion::ALL.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", e, self.get(*e))?;
        }
        write!(f, "}}")
    }
}
