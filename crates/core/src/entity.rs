//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    /// Name of the record collection the entity lives in (e.g. `"goals"`).
    ///
    /// Validation rules and ownership checks refer to records by
    /// `(collection, id)`, so this must be stable.
    fn collection() -> &'static str;
}
