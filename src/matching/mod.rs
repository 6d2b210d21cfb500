//! Repertoire-to-repertoire matching and scoring.

pub mod bidirectional;
pub mod multiplicity;
pub mod neighbor;
pub mod repertoire;

pub use bidirectional::BidirectionalMatch;
pub use multiplicity::MultiplicityRelation;
pub use neighbor::NeighborIndex;
pub use repertoire::RepertoireMatch;
