//! Constraint result types.
//!
//! Every constraint family (FAR, lot coverage, heights, density, parking,
//! yards) produces one [`ConstraintResult`]. The [`ConstraintValue`] union
//! carries exactly the fields that are valid for its kind; the wrapper
//! carries the fields every kind shares (notes, citation, review flag).

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Unit attached to a scalar [`Quantity`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Unit {
    /// Floor area ratio
    Ratio,
    /// Linear feet
    Feet,
    /// Square feet
    SquareFeet,
    /// Percent of lot area
    Percent,
    /// Dwelling units
    DwellingUnits,
    /// Accessory off-street parking spaces
    ParkingSpaces,
}

/// A resolved regulatory quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Quantity {
    /// A single number with a unit.
    #[serde(rename_all = "camelCase")]
    Scalar {
        /// Numeric value.
        value: f64,
        /// Unit of `value`.
        unit: Unit,
    },
    /// A height envelope (base height and overall building height).
    #[serde(rename_all = "camelCase")]
    Envelope {
        /// Maximum street wall / base height in feet.
        max_base_height_ft: f64,
        /// Maximum building height in feet.
        max_building_height_ft: f64,
    },
}

impl Quantity {
    /// Shorthand for a [`Quantity::Scalar`].
    #[must_use]
    pub const fn scalar(value: f64, unit: Unit) -> Self {
        Self::Scalar { value, unit }
    }

    /// Returns the scalar value, or `None` for envelopes.
    #[must_use]
    pub const fn as_scalar(&self) -> Option<f64> {
        match self {
            Self::Scalar { value, .. } => Some(*value),
            Self::Envelope { .. } => None,
        }
    }
}

/// One legally possible value together with the condition under which it
/// applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// The value if `condition` holds.
    pub quantity: Quantity,
    /// Human-readable applicability condition.
    pub condition: String,
    /// ZR citation for this candidate.
    pub citation: String,
}

/// A named alternative scenario of a toggle result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    /// Machine-readable scenario key (e.g. `"duf_applies"`).
    pub key: String,
    /// Human-readable label.
    pub label: String,
    /// Resolved value, `None` when the scenario imposes no numeric cap.
    pub quantity: Option<Quantity>,
    /// Optional explanation.
    pub note: Option<String>,
}

/// The discriminant of a [`ConstraintValue`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConstraintKind {
    /// Single resolved value
    Fixed,
    /// Several legally valid values for one district
    Conditional,
    /// No single number; read the cited section
    SeeSection,
    /// Named alternative scenarios
    Toggle,
    /// Several values from several inputs (districts, regimes)
    Candidates,
    /// The rule family does not apply
    NotApplicable,
    /// No rule for this input
    Unsupported,
}

/// The outcome of evaluating one constraint family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConstraintValue {
    /// Single resolved value.
    Fixed {
        /// The value.
        quantity: Quantity,
    },
    /// The law gives several values for this district and the inputs do
    /// not say which applies.
    Conditional {
        /// Every known candidate, in table order.
        candidates: Vec<Candidate>,
    },
    /// No single value exists; the caller must read the cited section.
    SeeSection {
        /// ZR section to consult.
        section: String,
    },
    /// Alternative scenarios the end user picks between.
    Toggle {
        /// Scenarios in presentation order.
        scenarios: Vec<Scenario>,
    },
    /// One value per input (district, parking regime). `controlling` is
    /// set when a conservative choice among them is well defined.
    Candidates {
        /// Every candidate, in input order.
        candidates: Vec<Candidate>,
        /// The value used for derived calculations, if any.
        controlling: Option<Quantity>,
    },
    /// The rule family does not apply to these facts.
    NotApplicable {
        /// Why not.
        reason: String,
    },
    /// The engine has no rule for this input.
    Unsupported {
        /// Why not.
        reason: String,
    },
}

impl ConstraintValue {
    /// Returns the discriminant.
    #[must_use]
    pub const fn kind(&self) -> ConstraintKind {
        match self {
            Self::Fixed { .. } => ConstraintKind::Fixed,
            Self::Conditional { .. } => ConstraintKind::Conditional,
            Self::SeeSection { .. } => ConstraintKind::SeeSection,
            Self::Toggle { .. } => ConstraintKind::Toggle,
            Self::Candidates { .. } => ConstraintKind::Candidates,
            Self::NotApplicable { .. } => ConstraintKind::NotApplicable,
            Self::Unsupported { .. } => ConstraintKind::Unsupported,
        }
    }
}

/// A constraint family's result with its citation and caveats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintResult {
    /// The value, tagged by kind.
    pub value: ConstraintValue,
    /// Caveats about modifiers and exceptions that were not evaluated.
    pub notes: Vec<String>,
    /// Approximations the engine made to produce `value` (e.g. a base
    /// district substitution).
    pub assumptions: Vec<String>,
    /// Controlling ZR citation.
    pub source_section: String,
    /// Link to the cited section, passed through unmodified.
    pub source_url: Option<String>,
    /// Whether a person must confirm this result.
    pub requires_manual_review: bool,
}

impl ConstraintResult {
    /// Creates a result with no notes, no URL, and no review flag.
    #[must_use]
    pub fn new(value: ConstraintValue, source_section: impl Into<String>) -> Self {
        Self {
            value,
            notes: Vec::new(),
            assumptions: Vec::new(),
            source_section: source_section.into(),
            source_url: None,
            requires_manual_review: false,
        }
    }

    /// Creates an [`ConstraintValue::Unsupported`] result. The reason is
    /// also recorded as the first note.
    #[must_use]
    pub fn unsupported(reason: impl Into<String>, source_section: impl Into<String>) -> Self {
        let reason = reason.into();
        let mut result = Self::new(
            ConstraintValue::Unsupported {
                reason: reason.clone(),
            },
            source_section,
        );
        result.notes.push(reason);
        result
    }

    /// Creates a [`ConstraintValue::NotApplicable`] result.
    #[must_use]
    pub fn not_applicable(reason: impl Into<String>, source_section: impl Into<String>) -> Self {
        Self::new(
            ConstraintValue::NotApplicable {
                reason: reason.into(),
            },
            source_section,
        )
    }

    /// Sets the source URL.
    #[must_use]
    pub fn with_url(mut self, url: Option<impl Into<String>>) -> Self {
        self.source_url = url.map(Into::into);
        self
    }

    /// Appends a note.
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Appends an assumption.
    #[must_use]
    pub fn with_assumption(mut self, assumption: impl Into<String>) -> Self {
        self.assumptions.push(assumption.into());
        self
    }

    /// Sets the manual review flag.
    #[must_use]
    pub fn with_manual_review(mut self, requires_manual_review: bool) -> Self {
        self.requires_manual_review = requires_manual_review;
        self
    }

    /// Returns the discriminant of the value.
    #[must_use]
    pub const fn kind(&self) -> ConstraintKind {
        self.value.kind()
    }

    /// Returns the value of a [`ConstraintValue::Fixed`] scalar.
    #[must_use]
    pub const fn fixed_scalar(&self) -> Option<f64> {
        match &self.value {
            ConstraintValue::Fixed { quantity } => quantity.as_scalar(),
            _ => None,
        }
    }

    /// Returns the single scalar value downstream calculations may rely
    /// on: the fixed value, or the controlling value of a candidate list.
    #[must_use]
    pub const fn resolved_scalar(&self) -> Option<f64> {
        match &self.value {
            ConstraintValue::Fixed { quantity }
            | ConstraintValue::Candidates {
                controlling: Some(quantity),
                ..
            } => quantity.as_scalar(),
            _ => None,
        }
    }

    /// Returns the candidate list of a conditional or candidates result.
    #[must_use]
    pub fn candidates(&self) -> &[Candidate] {
        match &self.value {
            ConstraintValue::Conditional { candidates }
            | ConstraintValue::Candidates { candidates, .. } => candidates,
            _ => &[],
        }
    }

    /// Returns the scenarios of a toggle result.
    #[must_use]
    pub fn scenarios(&self) -> &[Scenario] {
        match &self.value {
            ConstraintValue::Toggle { scenarios } => scenarios,
            _ => &[],
        }
    }

    /// Whether the engine had no rule for this input.
    #[must_use]
    pub const fn is_unsupported(&self) -> bool {
        matches!(self.value, ConstraintValue::Unsupported { .. })
    }
}
