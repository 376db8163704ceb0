pub mod stub;

#[cfg(feature = "backend-tract")]
pub mod tract;

pub use stub::StubBackend;

#[cfg(feature = "backend-tract")]
pub use tract::TractBackend;

/// Class name table for the clothing detection model.
pub(crate) const CLOTHING_CLASSES: &[&str] = &[
    "Jacket", "Jeans", "Jogger", "Polo", "Shirt", "Short", "T-Shirt", "Trouser",
];

pub(crate) fn clothing_class_names() -> Vec<String> {
    CLOTHING_CLASSES.iter().map(|s| s.to_string()).collect()
}
