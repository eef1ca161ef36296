//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects have no identity and are immutable: two `Amount`s holding
/// the same minor units are the same amount, and "changing" a line price
/// means replacing its `Amount` with a new one.
///
/// ```ignore
/// let a = Amount::from_major(50_000);
/// let b: Amount = "50000.00".parse()?;
/// assert_eq!(a, b);
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
