// =============================================================================
// CORE — Le moteur de types algébriques extensibles
// =============================================================================
//
// Tout est ici : familles, instances, opérations et le pilote de parcours.
// Aucune entrée/sortie, aucune persistance.
//
// Architecture (des feuilles vers le haut) :
//   error       → la taxonomie des erreurs
//   config      → réglages du moteur (borne de travail, signatures)
//   typeside    → valeurs, types de base, gardes
//   fields      → table ordonnée des champs d'un variant
//   validate    → gardes de champs puis invariant d'enregistrement
//   family      → registre des variants, modèle d'extension
//   instance    → valeurs immuables d'un variant
//   operation   → installeur commun, signatures, collisions de noms
//   transformer → les quatre facettes et leur fusion
//   eval        → le pilote : hylomorphisme sur liste de travail
//   fold        → catamorphisme (handlers, joker, surcharge)
//   unfold      → anamorphisme (cas ordonnés, constructeurs de substitution)
//   map         → foncteur sur les paramètres de type
//   merge       → fusion sans instance intermédiaire
//   codata      → observateurs, continuations mémorisées
//
// =============================================================================

pub mod error;
pub mod config;
pub mod typeside;
pub mod fields;
pub mod validate;
pub mod family;
pub mod instance;
pub mod operation;
pub mod transformer;
pub mod eval;
pub mod fold;
pub mod unfold;
pub mod map;
pub mod merge;
pub mod codata;
