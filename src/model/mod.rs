//! Domain records returned to callers
//!
//! Every model exposes a value-tree projection (`to_value`) so the
//! in-memory evaluator and comparator address it with the same selectors
//! the SQL compiler accepts.

pub mod genotype;
pub mod record;
mod sample;

pub use genotype::{Genotype, GenotypeType};
pub use record::{Record, SampleValues};
pub use sample::{
    AffectedStatus, OntologyClass, Person, Phenotype, PhenotypicFeature, Sample, Sex, Subject,
};
