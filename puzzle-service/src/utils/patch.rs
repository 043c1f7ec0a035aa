use serde::{Deserialize, Deserializer};

/// One field of a partial update. A key missing from the JSON body
/// deserializes (with `#[serde(default)]`) to `Absent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch<T> {
    Absent,
    Present(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Absent
    }
}

impl<T> Patch<T> {
    pub fn apply_to(self, target: &mut T) {
        if let Patch::Present(value) = self {
            *target = value;
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        T::deserialize(deserializer).map(Patch::Present)
    }
}
