//! The choice-model definition and its single `simulate` entry point.
//!
//! A model is loaded once per worker and is read-only thereafter, with one
//! exception: the scheduler may toggle availability entries immediately
//! before a call, and must restore them after (see
//! [`availability_snapshot`][ChoiceModel::availability_snapshot]).

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;

use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use abm_core::PersonRng;
use abm_data::Record;

use crate::expr::{self, Bindings, Expr};
use crate::tree::ChoiceTree;
use crate::{logit, sample, ChoiceError, ChoiceResult};

// ── Binding ───────────────────────────────────────────────────────────────────

/// An availability or scale entry: a literal value, or the name of an
/// input-record field to resolve per call.  A field name that is absent from
/// the record but parses as a number acts as that literal; otherwise the
/// per-call default applies (1 for both availability and scale).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Binding {
    Literal(Decimal),
    Field(String),
}

// ── ModelSpec ─────────────────────────────────────────────────────────────────

/// The serialized form of one model definition file.
///
/// Field order here is the file section order; all maps are `IndexMap` so a
/// load→save round trip preserves declaration order exactly — sampling order
/// depends on it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    #[serde(rename = "Choiceset")]
    pub choiceset: ChoiceTree,

    #[serde(rename = "Parameters")]
    pub parameters: IndexMap<String, Decimal>,

    #[serde(rename = "Variable")]
    pub variables: IndexMap<String, String>,

    #[serde(rename = "Utility")]
    pub utility: IndexMap<String, String>,

    #[serde(rename = "Availability")]
    pub availability: IndexMap<String, Binding>,

    #[serde(rename = "Scale", default, skip_serializing_if = "IndexMap::is_empty")]
    pub scale: IndexMap<String, Binding>,
}

// ── ChoiceOutcome ─────────────────────────────────────────────────────────────

/// Everything one `simulate` call produced, for diagnostics and the caller's
/// decision logic.
#[derive(Clone, Debug)]
pub struct ChoiceOutcome {
    /// Every computed utility — leaves and nests.
    pub utilities: IndexMap<String, Decimal>,
    /// Leaf probabilities (sum to 1 over available leaves).
    pub probabilities: IndexMap<String, Decimal>,
    /// Resolved availability per name.
    pub availability: IndexMap<String, Decimal>,
    /// The sampled alternative.
    pub chosen: String,
}

// ── ChoiceModel ───────────────────────────────────────────────────────────────

/// A validated, ready-to-simulate choice model.
///
/// Utility formulas are parsed into expression trees at construction; no
/// string evaluation happens per call.
#[derive(Clone, Debug)]
pub struct ChoiceModel {
    spec:   ModelSpec,
    exprs:  IndexMap<String, Expr>,
    leaves: Vec<String>,
    names:  Vec<String>,
}

impl ChoiceModel {
    // ── Construction ──────────────────────────────────────────────────────

    /// Validate a spec and parse its formulas.
    ///
    /// Checks, in order: the choice set is non-empty and at most two levels
    /// deep; every leaf has a utility formula and an availability entry;
    /// every nest has a scale entry; every formula parses.
    pub fn from_spec(spec: ModelSpec) -> ChoiceResult<Self> {
        let leaves: Vec<String> = spec.choiceset.leaves().iter().map(|s| s.to_string()).collect();
        let names: Vec<String> = spec.choiceset.names().iter().map(|s| s.to_string()).collect();

        if leaves.is_empty() {
            return Err(ChoiceError::ModelDefinition("empty choice set".into()));
        }
        // The nested-logit probability formula is only valid for two levels;
        // deeper data must fail at load, not produce silently wrong numbers.
        if spec.choiceset.depth() > 2 {
            return Err(ChoiceError::ModelDefinition(format!(
                "choice set nests {} levels deep; at most two are supported",
                spec.choiceset.depth()
            )));
        }

        for leaf in &leaves {
            if !spec.utility.contains_key(leaf) {
                return Err(ChoiceError::ModelDefinition(format!(
                    "leaf {leaf:?} has no utility formula"
                )));
            }
            if !spec.availability.contains_key(leaf) {
                return Err(ChoiceError::ModelDefinition(format!(
                    "leaf {leaf:?} has no availability entry"
                )));
            }
        }
        if let ChoiceTree::Nests(nests) = &spec.choiceset {
            for nest in nests.keys() {
                if !spec.scale.contains_key(nest) {
                    return Err(ChoiceError::ModelDefinition(format!(
                        "nest {nest:?} has no scale entry"
                    )));
                }
            }
        }

        let mut exprs = IndexMap::with_capacity(spec.utility.len());
        for (name, formula) in &spec.utility {
            let expr = expr::parse(formula).map_err(|e| {
                ChoiceError::ModelDefinition(format!("utility formula for {name:?}: {e}"))
            })?;
            exprs.insert(name.clone(), expr);
        }

        Ok(Self { spec, exprs, leaves, names })
    }

    pub fn from_reader<R: Read>(reader: R) -> ChoiceResult<Self> {
        let spec: ModelSpec = serde_json::from_reader(reader)
            .map_err(|e| ChoiceError::ModelDefinition(e.to_string()))?;
        Self::from_spec(spec)
    }

    pub fn from_path(path: &Path) -> ChoiceResult<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file)).map_err(|e| match e {
            ChoiceError::ModelDefinition(msg) => {
                ChoiceError::ModelDefinition(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    // ── Persistence ───────────────────────────────────────────────────────

    pub fn save_writer<W: Write>(&self, writer: W) -> ChoiceResult<()> {
        serde_json::to_writer_pretty(writer, &self.spec)
            .map_err(|e| ChoiceError::ModelDefinition(format!("serializing model: {e}")))
    }

    pub fn save_path(&self, path: &Path) -> ChoiceResult<()> {
        let file = std::fs::File::create(path)?;
        self.save_writer(std::io::BufWriter::new(file))
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    /// Leaf names in the fixed sampling order.
    pub fn leaves(&self) -> &[String] {
        &self.leaves
    }

    pub fn has_leaf(&self, name: &str) -> bool {
        self.leaves.iter().any(|l| l == name)
    }

    // ── Availability toggling ─────────────────────────────────────────────

    /// Force one alternative's availability to a literal 0/1.
    ///
    /// Returns `false` (and changes nothing) for a name the model does not
    /// contain — callers toggling from external lists need not pre-filter.
    pub fn set_availability(&mut self, alternative: &str, available: bool) -> bool {
        if !self.names.iter().any(|n| n == alternative) {
            return false;
        }
        let value = if available { Decimal::ONE } else { Decimal::ZERO };
        self.spec
            .availability
            .insert(alternative.to_string(), Binding::Literal(value));
        true
    }

    /// Snapshot the availability section before toggling.
    pub fn availability_snapshot(&self) -> IndexMap<String, Binding> {
        self.spec.availability.clone()
    }

    /// Restore a snapshot taken with
    /// [`availability_snapshot`][Self::availability_snapshot].
    pub fn restore_availability(&mut self, snapshot: IndexMap<String, Binding>) {
        self.spec.availability = snapshot;
    }

    // ── Simulation ────────────────────────────────────────────────────────

    /// Run one decision: extract variables/availability/scales from the
    /// record, evaluate utilities, derive probabilities, sample.
    ///
    /// Missing record fields default per kind — variables to 0, availability
    /// and scale to 1.  A present but non-numeric field is a
    /// [`TypeCoercion`][ChoiceError::TypeCoercion] error.
    pub fn simulate(&self, record: &Record, rng: &mut PersonRng) -> ChoiceResult<ChoiceOutcome> {
        let variables = self.pick_variables(record)?;
        let availability = self.resolve_bindings(&self.spec.availability, record)?;
        let scales = self.resolve_scales(record)?;

        let bindings = Bindings {
            parameters: &self.spec.parameters,
            variables:  &variables,
        };
        let utilities = logit::utilities(
            &self.spec.choiceset,
            &self.exprs,
            &self.spec.utility,
            &bindings,
            &availability,
            &scales,
        )?;
        let probabilities =
            logit::probabilities(&self.spec.choiceset, &utilities, &availability, &scales)?;
        let chosen = sample::draw(&self.leaves, &probabilities, rng)?;

        Ok(ChoiceOutcome { utilities, probabilities, availability, chosen })
    }

    fn pick_variables(&self, record: &Record) -> ChoiceResult<HashMap<String, Decimal>> {
        let mut out = HashMap::with_capacity(self.spec.variables.len());
        for (logical, field) in &self.spec.variables {
            let value = match record.get(field) {
                None => Decimal::ZERO,
                Some(v) => v.as_number().ok_or_else(|| ChoiceError::TypeCoercion {
                    field: field.clone(),
                })?,
            };
            out.insert(logical.clone(), value);
        }
        Ok(out)
    }

    fn resolve_bindings(
        &self,
        map:    &IndexMap<String, Binding>,
        record: &Record,
    ) -> ChoiceResult<IndexMap<String, Decimal>> {
        let mut out = IndexMap::with_capacity(self.names.len());
        for name in &self.names {
            let value = match map.get(name) {
                None => Decimal::ONE,
                Some(Binding::Literal(d)) => *d,
                Some(Binding::Field(field)) => match record.get(field) {
                    Some(v) => v.as_number().ok_or_else(|| ChoiceError::TypeCoercion {
                        field: field.clone(),
                    })?,
                    None => field.trim().parse().unwrap_or(Decimal::ONE),
                },
            };
            out.insert(name.clone(), value);
        }
        Ok(out)
    }

    fn resolve_scales(&self, record: &Record) -> ChoiceResult<IndexMap<String, Decimal>> {
        self.resolve_bindings(&self.spec.scale, record)
    }
}
