//! Slot descriptors and the link validation framework.
//!
//! The connector never decides on its own whether two slots may be linked.
//! It asks a [`LinkValidator`], which sees the output and input slot
//! descriptors of a candidate connection.

use crate::layout::SlotKey;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Name and data type of one slot, as declared by the graph model.
///
/// `slot_type` follows the usual node editor conventions: `"*"` or `""`
/// accepts anything and a comma separated list accepts any of its members.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SlotDescriptor {
    pub name: String,
    pub slot_type: String,
}

impl SlotDescriptor {
    pub fn new(name: impl Into<String>, slot_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slot_type: slot_type.into(),
        }
    }

    /// Slot that accepts any type
    pub fn any(name: impl Into<String>) -> Self {
        Self::new(name, "*")
    }
}

// ============================================================================
// Link Validation Framework
// ============================================================================

/// Result of link validation with optional rejection reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// Link is valid
    Valid,
    /// Link is invalid with a reason
    Invalid(ValidationError),
}

impl ValidationResult {
    /// Check if the result is valid
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    /// Combine two results (AND logic): returns first error if any
    pub fn and(self, other: ValidationResult) -> ValidationResult {
        match self {
            ValidationResult::Valid => other,
            invalid => invalid,
        }
    }

    /// Like [`and`](Self::and) but only evaluates `other` when still valid
    pub fn and_then(self, other: impl FnOnce() -> ValidationResult) -> ValidationResult {
        match self {
            ValidationResult::Valid => other(),
            invalid => invalid,
        }
    }
}

/// Reasons why a link validation failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Slot does not exist on its node
    SlotNotFound(SlotKey),
    /// Cannot link a node to itself
    SameNode,
    /// Both slots are inputs or both are outputs
    IncompatibleDirection,
    /// A moving link was dropped back onto the slot it already uses
    AlreadyConnected,
    /// Data types are incompatible
    TypeMismatch { expected: String, found: String },
    /// Custom validation failure
    Custom(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SlotNotFound(key) => write!(
                f,
                "Slot {} {} of node {} not found",
                key.kind, key.index, key.node_id
            ),
            Self::SameNode => write!(f, "Cannot link slots on same node"),
            Self::IncompatibleDirection => write!(f, "Must connect input to output"),
            Self::AlreadyConnected => write!(f, "Link already uses this slot"),
            Self::TypeMismatch { expected, found } => {
                write!(f, "Type mismatch: expected {}, found {}", expected, found)
            }
            Self::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

/// Trait for link validation logic.
///
/// Implement this to decide which slot types may be connected. Any
/// `Fn(&SlotDescriptor, &SlotDescriptor) -> bool` closure implements it too.
///
/// # Example
///
/// ```
/// use node_editor_layout::{LinkValidator, SlotDescriptor, ValidationError, ValidationResult};
///
/// struct NoImages;
///
/// impl LinkValidator for NoImages {
///     fn validate(&self, output: &SlotDescriptor, _input: &SlotDescriptor) -> ValidationResult {
///         if output.slot_type == "IMAGE" {
///             ValidationResult::Invalid(ValidationError::Custom("images are disabled".into()))
///         } else {
///             ValidationResult::Valid
///         }
///     }
/// }
///
/// let out = SlotDescriptor::new("pixels", "IMAGE");
/// let input = SlotDescriptor::any("in");
/// assert!(!NoImages.validate(&out, &input).is_valid());
/// ```
pub trait LinkValidator {
    /// Check if a link from `output` into `input` is allowed
    fn validate(&self, output: &SlotDescriptor, input: &SlotDescriptor) -> ValidationResult;
}

impl<F> LinkValidator for F
where
    F: Fn(&SlotDescriptor, &SlotDescriptor) -> bool,
{
    fn validate(&self, output: &SlotDescriptor, input: &SlotDescriptor) -> ValidationResult {
        if self(output, input) {
            ValidationResult::Valid
        } else {
            ValidationResult::Invalid(ValidationError::Custom(format!(
                "Link from {} to {} rejected",
                output.name, input.name
            )))
        }
    }
}

/// Default validator: slot types must be compatible
///
/// Rules:
/// 1. `""` or `"*"` on either side matches anything
/// 2. Otherwise types compare case-insensitively
/// 3. Comma separated lists match when any member of one equals any member of the other
#[derive(Clone, Copy, Debug, Default)]
pub struct TypeMatchValidator;

impl TypeMatchValidator {
    pub fn types_compatible(a: &str, b: &str) -> bool {
        let a = a.trim();
        let b = b.trim();
        if a.is_empty() || b.is_empty() || a == "*" || b == "*" {
            return true;
        }

        let a = a.to_lowercase();
        let b = b.to_lowercase();
        if !a.contains(',') && !b.contains(',') {
            return a == b;
        }

        // Check all permutations to see if one is valid
        a.split(',')
            .map(str::trim)
            .any(|ta| b.split(',').map(str::trim).any(|tb| ta == tb))
    }
}

impl LinkValidator for TypeMatchValidator {
    fn validate(&self, output: &SlotDescriptor, input: &SlotDescriptor) -> ValidationResult {
        if Self::types_compatible(&output.slot_type, &input.slot_type) {
            ValidationResult::Valid
        } else {
            ValidationResult::Invalid(ValidationError::TypeMismatch {
                expected: input.slot_type.clone(),
                found: output.slot_type.clone(),
            })
        }
    }
}

/// Composite validator that combines multiple validators
///
/// All validators must return Valid for the link to be valid (AND logic).
/// Returns the first error encountered (short-circuits on failure).
///
/// # Example
///
/// ```
/// use node_editor_layout::{CompositeValidator, LinkValidator, SlotDescriptor, TypeMatchValidator};
///
/// let validator = CompositeValidator::new()
///     .add(TypeMatchValidator)
///     .add(|out: &SlotDescriptor, _: &SlotDescriptor| out.name != "locked");
///
/// let out = SlotDescriptor::new("value", "FLOAT");
/// let input = SlotDescriptor::new("x", "float");
/// assert!(validator.validate(&out, &input).is_valid());
/// ```
#[derive(Default)]
pub struct CompositeValidator {
    validators: Vec<Box<dyn LinkValidator>>,
}

impl CompositeValidator {
    /// Create a new empty composite validator
    pub fn new() -> Self {
        Self {
            validators: Vec::new(),
        }
    }

    /// Add a validator to the composite
    ///
    /// Validators are checked in the order they were added.
    /// The first validator to return Invalid will short-circuit.
    pub fn add<V: LinkValidator + 'static>(mut self, validator: V) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

impl LinkValidator for CompositeValidator {
    fn validate(&self, output: &SlotDescriptor, input: &SlotDescriptor) -> ValidationResult {
        for v in &self.validators {
            let result = v.validate(output, input);
            if !result.is_valid() {
                return result;
            }
        }
        ValidationResult::Valid
    }
}

/// Convenience function to validate a link with any validator
pub fn validate_link<V>(output: &SlotDescriptor, input: &SlotDescriptor, validator: &V) -> ValidationResult
where
    V: LinkValidator + ?Sized,
{
    validator.validate(output, input)
}

// ============================================================================
// Tests
// ============================================================================
